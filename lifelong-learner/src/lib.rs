//! # Lifelong Learner
//!
//! Transfer orchestration for progressive (lifelong) learning. A growing set of tasks shares
//! a pool of feature transformers; every task owns a decider that combines votes cast by
//! voters trained on each transformer's output.
//!
//! ## Roles
//! - **Transformer** - feature mapping fitted on one task's data, possibly bagged
//! - **Voter** - per `(task, transformer)` model fitted on transformed features
//! - **Decider** - per task, combines the votes of a set of transformers
//!
//! ## Transfer
//! - *Forward*: a new task trains voters against every existing transformer
//! - *Backward*: every existing task trains a voter against the new transformer and refits
//!   its decider
//!
//! Model implementations are pluggable through the traits in [`models`].

pub mod defaults;
pub mod error;
pub mod learner;
pub mod models;
pub mod partition;
pub mod registry;
pub mod shared;
pub mod types;

pub use defaults::{
    resolve, LearnerDefaults, ModelCatalog, ModelChoice, Resolution, ResolvedModel, Tier,
};
pub use error::{DefaultField, LearnerError, LearnerResult, Role};
pub use learner::{AddTaskOptions, ProgressiveLearner};
pub use models::{
    Decider, DeciderClass, ModelClass, Transformer, TransformerBags, TransformerClass, Voter,
    VoterBags, VoterClass,
};
pub use partition::{partition_indices, Partition, SplitSpec};
pub use registry::{DeciderRecord, ModelStore, RegistrySummary, TaskRecord};
pub use shared::SharedLearner;
pub use types::{Dataset, Kwargs, Label, Matrix, TaskId, TransformerId};
