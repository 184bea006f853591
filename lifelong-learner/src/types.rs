//! Shared identifiers and dataset types

use crate::error::{LearnerError, LearnerResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Class label
pub type Label = i64;

/// Row-major feature matrix
pub type Matrix = Vec<Vec<f64>>;

/// Constructor keyword arguments, opaque to the orchestrator
pub type Kwargs = Map<String, Value>;

/// Task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Transformer identifier
///
/// Lives in its own namespace, but `add_task` gives the transformer it creates the same
/// value as the task, so `TransformerId::from(task_id)` names "this task's transformer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TransformerId(pub u64);

impl From<TaskId> for TransformerId {
    fn from(task_id: TaskId) -> Self {
        TransformerId(task_id.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for TransformerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Labeled samples of one task
///
/// Row and label counts always match; deserialization goes through [`Dataset::new`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawDataset")]
pub struct Dataset {
    x: Matrix,
    y: Vec<Label>,
}

#[derive(Deserialize)]
struct RawDataset {
    x: Matrix,
    y: Vec<Label>,
}

impl TryFrom<RawDataset> for Dataset {
    type Error = LearnerError;

    fn try_from(raw: RawDataset) -> LearnerResult<Self> {
        Dataset::new(raw.x, raw.y)
    }
}

impl Dataset {
    /// Build a dataset, rejecting row/label count mismatches
    pub fn new(x: Matrix, y: Vec<Label>) -> LearnerResult<Self> {
        if x.len() != y.len() {
            return Err(LearnerError::InvalidInput(format!(
                "dataset has {} rows but {} labels",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y })
    }

    pub fn x(&self) -> &Matrix {
        &self.x
    }

    pub fn y(&self) -> &[Label] {
        &self.y
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    /// Rows at `indices`, in order; repeated indices repeat the row
    ///
    /// Indices must come from `0..self.len()`.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }
}
