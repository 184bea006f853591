//! Transfer workflow: `add_task`
//!
//! For each bag member of the new task's transformer:
//! 1. Partition the task's samples
//! 2. Fit a transformer member on the transformer subset
//! 3. Forward transfer: train this task's voters against every selected transformer
//! 4. Last member only: fit this task's decider on the decider subset
//! 5. Backward transfer: train every other selected task's voter against the new member;
//!    on the last member, refit those tasks' deciders on their full stored data
//!
//! Nothing is rolled back on failure. Bag members committed before the failing step stay.

use super::ProgressiveLearner;
use crate::defaults::ModelChoice;
use crate::error::{LearnerResult, Role};
use crate::models::{Decider, Transformer, Voter};
use crate::partition::{partition_indices, SplitSpec};
use crate::types::{Dataset, TaskId, TransformerId};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Options for [`ProgressiveLearner::add_task`]
#[derive(Debug, Clone)]
pub struct AddTaskOptions {
    /// Task id; allocated when `None`
    pub task_id: Option<TaskId>,
    /// Sample split; the learner's default split (if any) when `None`
    pub split: Option<SplitSpec>,
    /// Number of bagged transformer members to fit
    pub num_transformers: usize,
    pub transformer: ModelChoice<dyn Transformer>,
    pub voter: ModelChoice<dyn Voter>,
    pub decider: ModelChoice<dyn Decider>,
    /// Tasks receiving backward transfer; every task with a decider when `None` or empty
    pub backward_task_ids: Option<Vec<TaskId>>,
    /// Transformers used for forward transfer; every registered one when `None` or empty
    pub forward_transformer_ids: Option<Vec<TransformerId>>,
}

impl Default for AddTaskOptions {
    fn default() -> Self {
        Self {
            task_id: None,
            split: None,
            num_transformers: 1,
            transformer: ModelChoice::new(),
            voter: ModelChoice::new(),
            decider: ModelChoice::new(),
            backward_task_ids: None,
            forward_transformer_ids: None,
        }
    }
}

impl AddTaskOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_task_id(mut self, task_id: TaskId) -> Self {
        self.task_id = Some(task_id);
        self
    }

    pub fn with_split(mut self, split: SplitSpec) -> Self {
        self.split = Some(split);
        self
    }

    pub fn with_num_transformers(mut self, num_transformers: usize) -> Self {
        self.num_transformers = num_transformers;
        self
    }

    pub fn with_transformer(mut self, transformer: ModelChoice<dyn Transformer>) -> Self {
        self.transformer = transformer;
        self
    }

    pub fn with_voter(mut self, voter: ModelChoice<dyn Voter>) -> Self {
        self.voter = voter;
        self
    }

    pub fn with_decider(mut self, decider: ModelChoice<dyn Decider>) -> Self {
        self.decider = decider;
        self
    }

    pub fn with_backward_task_ids(mut self, task_ids: Vec<TaskId>) -> Self {
        self.backward_task_ids = Some(task_ids);
        self
    }

    pub fn with_forward_transformer_ids(mut self, transformer_ids: Vec<TransformerId>) -> Self {
        self.forward_transformer_ids = Some(transformer_ids);
        self
    }
}

/// `None` and an empty list both mean "use the default scope"
fn explicit_scope<T: Clone>(ids: &Option<Vec<T>>) -> Option<Vec<T>> {
    ids.as_ref().filter(|ids| !ids.is_empty()).cloned()
}

impl ProgressiveLearner {
    /// Add a task and run forward and backward transfer
    ///
    /// The new transformer gets the same id value as the task. Missing defaults and
    /// backward-transfer targets without stored data are detected before anything is stored.
    ///
    /// # Returns
    /// The task id (allocated when not given)
    pub fn add_task(&mut self, data: Dataset, options: AddTaskOptions) -> LearnerResult<TaskId> {
        let AddTaskOptions {
            task_id,
            split,
            num_transformers,
            transformer,
            voter,
            decider,
            backward_task_ids,
            forward_transformer_ids,
        } = options;

        if let Some(split) = &split {
            split.validate()?;
        }
        let split = split.or(self.default_split);

        let transformer_choice = if num_transformers > 0 {
            ModelChoice::resolve(Role::Transformer, &transformer, None, &self.defaults.transformer)?
                .to_choice()
        } else {
            ModelChoice::new()
        };
        let voter_choice =
            ModelChoice::resolve(Role::Voter, &voter, None, &self.defaults.voter)?.to_choice();
        let decider_choice =
            ModelChoice::resolve(Role::Decider, &decider, None, &self.defaults.decider)?
                .to_choice();

        // An allocated id is never a known task, so only an explicit id needs excluding
        let backward_targets: Vec<TaskId> = if num_transformers > 0 {
            explicit_scope(&backward_task_ids)
                .unwrap_or_else(|| self.store.task_ids())
                .into_iter()
                .filter(|&existing| Some(existing) != task_id)
                .collect()
        } else {
            Vec::new()
        };
        let refit_choice = if backward_targets.is_empty() {
            ModelChoice::new()
        } else {
            for &existing in &backward_targets {
                self.store.task_data(existing)?;
            }
            let learner_wide = &self.defaults.decider;
            ModelChoice::resolve(Role::Decider, &ModelChoice::new(), None, learner_wide)?
                .to_choice()
        };

        let task_id = self.task_id_or_allocate(task_id);
        let own_transformer = TransformerId::from(task_id);
        let data = Arc::new(data);
        self.store.put_task_data(task_id, Arc::clone(&data));

        info!(
            "Adding task {} ({} rows, {} transformer(s), split={:?})",
            task_id,
            data.len(),
            num_transformers,
            split
        );

        for bag in 0..num_transformers {
            let last = bag + 1 == num_transformers;
            let partition = partition_indices(data.len(), split.as_ref(), &mut self.rng)?;

            let transformer_data = data.select(&partition.transformer);
            let (_, member) = self.set_transformer(
                transformer_data.x(),
                Some(transformer_data.y()),
                Some(own_transformer),
                &transformer_choice,
                voter_choice.clone(),
            )?;

            // Forward transfer, scope re-read each member so it includes the new transformer
            let forward_ids = explicit_scope(&forward_transformer_ids)
                .unwrap_or_else(|| self.store.transformer_ids());
            for transformer_id in forward_ids {
                if transformer_id == own_transformer {
                    let voter_data = data.select(&partition.voter);
                    self.set_voter(
                        &voter_data,
                        transformer_id,
                        Some(task_id),
                        &voter_choice,
                        Some(member),
                    )?;
                    continue;
                }

                // Voter member i pairs with transformer member i
                let capacity = self.store.transformer_bag_len(transformer_id)?;
                let slot = self.store.voter_bag_len(task_id, transformer_id);
                if slot >= capacity {
                    warn!(
                        "Transformer {} has no free bag member for task {}, skipping",
                        transformer_id, task_id
                    );
                    continue;
                }
                self.set_voter(
                    &data,
                    transformer_id,
                    Some(task_id),
                    &ModelChoice::new(),
                    Some(slot),
                )?;
            }

            if last {
                let decider_data = data.select(&partition.decider);
                let transformer_ids = self.store.transformer_ids();
                self.set_decider(task_id, &transformer_ids, &decider_data, &decider_choice)?;
            }

            // Backward transfer
            for &existing_task in &backward_targets {
                let existing_data = self.store.task_data(existing_task)?;
                self.set_voter(
                    &existing_data,
                    own_transformer,
                    Some(existing_task),
                    &ModelChoice::new(),
                    Some(member),
                )?;

                if last {
                    let transformer_ids = self.store.transformer_ids();
                    self.set_decider(
                        existing_task,
                        &transformer_ids,
                        &existing_data,
                        &refit_choice,
                    )?;
                    debug!(
                        "Backward transfer refit decider of task {} with transformer {}",
                        existing_task, own_transformer
                    );
                }
            }
        }

        info!(
            "Task {} added: {} transformer(s), {} task(s) known",
            task_id,
            self.store.transformer_ids().len(),
            self.store.task_ids().len()
        );
        Ok(task_id)
    }
}
