//! Prediction routing

use super::ProgressiveLearner;
use crate::error::{LearnerError, LearnerResult};
use crate::types::{Label, Matrix, TaskId, TransformerId};
use anyhow::anyhow;
use tracing::debug;

impl ProgressiveLearner {
    /// Predict labels for `x` with the current decider of `task_id`
    ///
    /// `transformer_ids` is passed to the decider unchanged; `None` lets the decider use
    /// every transformer it was fitted with.
    ///
    /// # Errors
    /// * `UnknownTask` - the task has no fitted decider
    /// * `UnknownTransformer` - an id was not part of the decider's fit
    pub fn predict(
        &self,
        x: &Matrix,
        task_id: TaskId,
        transformer_ids: Option<&[TransformerId]>,
    ) -> LearnerResult<Vec<Label>> {
        let record = self.store.decider(task_id)?;

        if let Some(ids) = transformer_ids {
            if let Some(unknown) = ids.iter().find(|id| !record.transformer_ids.contains(id)) {
                return Err(LearnerError::UnknownTransformer(*unknown));
            }
        }

        debug!(
            "Routing {} rows to decider of task {} (transformers: {:?})",
            x.len(),
            task_id,
            transformer_ids
        );
        let labels = record.decider.predict(x, transformer_ids)?;
        if labels.len() != x.len() {
            return Err(LearnerError::Model(anyhow!(
                "decider of task {} returned {} labels for {} rows",
                task_id,
                labels.len(),
                x.len()
            )));
        }
        Ok(labels)
    }
}
