//! Shared learner handle for async callers
//!
//! Fits are CPU-bound, so every call runs on the blocking pool. Mutating calls take the
//! write lock for their whole duration, which serialises `add_task` calls against each
//! other and against predictions. Predictions take the read lock and run concurrently.

use crate::error::LearnerResult;
use crate::learner::{AddTaskOptions, ProgressiveLearner};
use crate::registry::RegistrySummary;
use crate::types::{Dataset, Label, Matrix, TaskId, TransformerId};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Cloneable handle to one learner
#[derive(Clone)]
pub struct SharedLearner {
    inner: Arc<RwLock<ProgressiveLearner>>,
}

impl SharedLearner {
    pub fn new(learner: ProgressiveLearner) -> Self {
        Self {
            inner: Arc::new(RwLock::new(learner)),
        }
    }

    /// Run [`ProgressiveLearner::add_task`] on the blocking pool
    pub async fn add_task(&self, data: Dataset, options: AddTaskOptions) -> LearnerResult<TaskId> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || inner.blocking_write().add_task(data, options)).await?
    }

    /// Run [`ProgressiveLearner::predict`] on the blocking pool
    pub async fn predict(
        &self,
        x: Matrix,
        task_id: TaskId,
        transformer_ids: Option<Vec<TransformerId>>,
    ) -> LearnerResult<Vec<Label>> {
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            inner
                .blocking_read()
                .predict(&x, task_id, transformer_ids.as_deref())
        })
        .await?
    }

    pub async fn get_task_ids(&self) -> Vec<TaskId> {
        self.inner.read().await.get_task_ids()
    }

    pub async fn get_transformer_ids(&self) -> Vec<TransformerId> {
        self.inner.read().await.get_transformer_ids()
    }

    pub async fn summary(&self) -> RegistrySummary {
        self.inner.read().await.summary()
    }
}
