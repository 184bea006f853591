//! Error types for the learner
//!
//! Every error is local to the call that raised it. `add_task` has no rollback: registry
//! entries committed by earlier bag members stay in place when a later one fails.

use crate::types::{TaskId, TransformerId};
use std::fmt;
use thiserror::Error;

/// Model role a default was being resolved for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Transformer,
    Voter,
    Decider,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Transformer => write!(f, "transformer"),
            Role::Voter => write!(f, "voter"),
            Role::Decider => write!(f, "decider"),
        }
    }
}

/// Which half of a (class, kwargs) pair was unresolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DefaultField {
    Class,
    Kwargs,
}

impl fmt::Display for DefaultField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DefaultField::Class => write!(f, "class"),
            DefaultField::Kwargs => write!(f, "kwargs"),
        }
    }
}

/// Learner error type
#[derive(Debug, Error)]
pub enum LearnerError {
    /// No value for a role's class or kwargs at any tier of the default chain
    #[error("Missing default: {role} {field} not given and no default is set")]
    MissingDefault { role: Role, field: DefaultField },

    /// An unfitted model was supplied where a fitted one is required
    #[error("Not fitted: {0}")]
    NotFitted(String),

    /// Transformer id absent from the registry
    #[error("Unknown transformer id: {0}")]
    UnknownTransformer(TransformerId),

    /// Task id without stored data or a fitted decider
    #[error("Unknown task id: {0}")]
    UnknownTask(TaskId),

    /// No voters stored for the pair
    #[error("No voters for task {task} and transformer {transformer}")]
    UnknownVoter {
        task: TaskId,
        transformer: TransformerId,
    },

    /// Bag index beyond the transformer's bag
    #[error("Transformer {transformer} has no bag member {bag}")]
    UnknownBagMember { transformer: TransformerId, bag: usize },

    /// Appending would give the pair more voters than the transformer has bag members
    #[error("Voter bag for task {task} and transformer {transformer} is full ({capacity} members)")]
    VoterBagFull {
        task: TaskId,
        transformer: TransformerId,
        capacity: usize,
    },

    /// Split fractions that cannot describe a sample allocation
    #[error("Invalid split: {0}")]
    InvalidSplit(String),

    /// Invalid caller input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Class name missing from the model catalog
    #[error("Unknown model class: {0}")]
    UnknownClass(String),

    /// Failure reported by a transformer, voter or decider
    #[error("Model error: {0}")]
    Model(#[from] anyhow::Error),

    /// lifelong-common error
    #[error("Common error: {0}")]
    Common(#[from] lifelong_common::Error),

    /// Blocking worker panicked or was cancelled
    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl LearnerError {
    /// True for lookups of ids absent from the registries
    pub fn is_unknown_id(&self) -> bool {
        matches!(
            self,
            LearnerError::UnknownTransformer(_)
                | LearnerError::UnknownTask(_)
                | LearnerError::UnknownVoter { .. }
                | LearnerError::UnknownBagMember { .. }
        )
    }
}

/// Result type for learner operations
pub type LearnerResult<T> = Result<T, LearnerError>;
