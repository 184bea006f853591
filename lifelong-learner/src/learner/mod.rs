//! Progressive learner
//!
//! [`ProgressiveLearner`] owns a [`ModelStore`] and drives every fit through the default
//! resolution chain. The building-block operations live here; the transfer workflow is in
//! `transfer` and prediction dispatch in `router`.

use crate::defaults::{LearnerDefaults, ModelCatalog, ModelChoice};
use crate::error::{LearnerError, LearnerResult, Role};
use crate::models::{Decider, Transformer, Voter};
use crate::partition::SplitSpec;
use crate::registry::{DeciderRecord, ModelStore, RegistrySummary};
use crate::types::{Dataset, Label, Matrix, TaskId, TransformerId};
use lifelong_common::LearnerConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;
use tracing::{debug, info};

mod router;
mod transfer;

pub use transfer::AddTaskOptions;

/// Lifelong learning orchestrator
pub struct ProgressiveLearner {
    store: ModelStore,
    defaults: LearnerDefaults,
    default_split: Option<SplitSpec>,
    next_id: u64,
    rng: StdRng,
}

impl ProgressiveLearner {
    /// Create a learner with entropy-seeded partitioning
    pub fn new(defaults: LearnerDefaults) -> Self {
        Self::with_rng(defaults, StdRng::from_entropy())
    }

    /// Create a learner whose partitions are reproducible
    pub fn with_seed(defaults: LearnerDefaults, seed: u64) -> Self {
        Self::with_rng(defaults, StdRng::seed_from_u64(seed))
    }

    fn with_rng(defaults: LearnerDefaults, rng: StdRng) -> Self {
        Self {
            store: ModelStore::new(),
            defaults,
            default_split: None,
            next_id: 0,
            rng,
        }
    }

    /// Create a learner from TOML config, resolving class names through `catalog`
    pub fn from_config(config: &LearnerConfig, catalog: &ModelCatalog) -> LearnerResult<Self> {
        config.validate()?;
        let defaults = LearnerDefaults::from_config(config, catalog)?;
        let mut learner = match config.seed {
            Some(seed) => Self::with_seed(defaults, seed),
            None => Self::new(defaults),
        };
        learner.default_split = config.split.map(SplitSpec::from);
        info!(
            "Learner configured: seed={:?}, default split={:?}",
            config.seed, learner.default_split
        );
        Ok(learner)
    }

    /// Split used by `add_task` when the call gives none
    pub fn with_default_split(mut self, split: SplitSpec) -> LearnerResult<Self> {
        split.validate()?;
        self.default_split = Some(split);
        Ok(self)
    }

    pub fn defaults(&self) -> &LearnerDefaults {
        &self.defaults
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn get_transformer_ids(&self) -> Vec<TransformerId> {
        self.store.transformer_ids()
    }

    /// Tasks with a fitted decider
    pub fn get_task_ids(&self) -> Vec<TaskId> {
        self.store.task_ids()
    }

    pub fn summary(&self) -> RegistrySummary {
        self.store.summary()
    }

    /// Next id unused as both a task id and a transformer id
    fn allocate_id(&mut self) -> u64 {
        while self.id_in_use(self.next_id) {
            self.next_id += 1;
        }
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    fn id_in_use(&self, id: u64) -> bool {
        self.store.has_transformer(TransformerId(id))
            || self.store.has_task_data(TaskId(id))
            || self.store.decider(TaskId(id)).is_ok()
    }

    /// Keep auto-assigned ids clear of one the caller chose
    fn reserve_id(&mut self, id: u64) {
        if id >= self.next_id {
            self.next_id = id.saturating_add(1);
        }
    }

    fn task_id_or_allocate(&mut self, task_id: Option<TaskId>) -> TaskId {
        match task_id {
            Some(id) => {
                self.reserve_id(id.0);
                id
            }
            None => TaskId(self.allocate_id()),
        }
    }

    /// Fit a new transformer and append it to the bag of `transformer_id`
    ///
    /// `voter_defaults` becomes the per-transformer default for voters later trained
    /// against this transformer.
    ///
    /// # Returns
    /// The transformer id (allocated when `None`) and the new member's bag index
    pub fn set_transformer(
        &mut self,
        x: &Matrix,
        y: Option<&[Label]>,
        transformer_id: Option<TransformerId>,
        transformer: &ModelChoice<dyn Transformer>,
        voter_defaults: ModelChoice<dyn Voter>,
    ) -> LearnerResult<(TransformerId, usize)> {
        let resolved =
            ModelChoice::resolve(Role::Transformer, transformer, None, &self.defaults.transformer)?;

        let transformer_id = match transformer_id {
            Some(id) => {
                self.reserve_id(id.0);
                id
            }
            None => TransformerId(self.allocate_id()),
        };

        let mut instance = resolved.instantiate()?;
        instance.fit(x, y)?;
        let member = self
            .store
            .append_transformer(transformer_id, Arc::from(instance))?;
        self.store.set_voter_defaults(transformer_id, voter_defaults);

        debug!(
            "Fitted transformer {} member {} ({}) on {} rows",
            transformer_id,
            member,
            resolved.class.name(),
            x.len()
        );
        Ok((transformer_id, member))
    }

    /// Append an already fitted transformer without training data
    ///
    /// # Errors
    /// * `NotFitted` - the transformer reports itself unfitted
    pub fn register_transformer(
        &mut self,
        transformer_id: Option<TransformerId>,
        transformer: Arc<dyn Transformer>,
    ) -> LearnerResult<(TransformerId, usize)> {
        if !transformer.is_fitted() {
            return Err(LearnerError::NotFitted(
                "transformer registered without data must already be fitted".to_string(),
            ));
        }
        let transformer_id = match transformer_id {
            Some(id) => {
                self.reserve_id(id.0);
                id
            }
            None => TransformerId(self.allocate_id()),
        };
        let member = self.store.append_transformer(transformer_id, transformer)?;
        info!("Registered pre-fitted transformer {} member {}", transformer_id, member);
        Ok((transformer_id, member))
    }

    /// Fit voters for `(task, transformer)` on `data`
    ///
    /// One voter per transformer bag member, or only member `bag_id` when given. Voter class
    /// and kwargs resolve through call site, this transformer's recorded default, then the
    /// learner-wide default.
    ///
    /// # Returns
    /// The task id (allocated when `None`)
    pub fn set_voter(
        &mut self,
        data: &Dataset,
        transformer_id: TransformerId,
        task_id: Option<TaskId>,
        voter: &ModelChoice<dyn Voter>,
        bag_id: Option<usize>,
    ) -> LearnerResult<TaskId> {
        let bag = self.store.transformer_bag(transformer_id)?;
        let members: Vec<Arc<dyn Transformer>> = match bag_id {
            None => bag.to_vec(),
            Some(member) => vec![bag.get(member).cloned().ok_or(
                LearnerError::UnknownBagMember {
                    transformer: transformer_id,
                    bag: member,
                },
            )?],
        };

        let resolved = ModelChoice::resolve(
            Role::Voter,
            voter,
            self.store.voter_defaults(transformer_id),
            &self.defaults.voter,
        )?;
        let task_id = self.task_id_or_allocate(task_id);

        for transformer in members {
            let transformed = transformer.transform(data.x())?;
            let mut instance = resolved.instantiate()?;
            instance.fit(&transformed, data.y())?;
            self.store
                .append_voter(transformer_id, task_id, Arc::from(instance))?;
        }

        debug!(
            "Fitted voter(s) for task {} on transformer {} ({}) with {} rows",
            task_id,
            transformer_id,
            resolved.class.name(),
            data.len()
        );
        Ok(task_id)
    }

    /// Fit a decider for `task_id` over `transformer_ids`, replacing the current one
    ///
    /// # Errors
    /// * `UnknownTransformer` / `UnknownVoter` - an id has no transformer or no voters for
    ///   this task
    pub fn set_decider(
        &mut self,
        task_id: TaskId,
        transformer_ids: &[TransformerId],
        data: &Dataset,
        decider: &ModelChoice<dyn Decider>,
    ) -> LearnerResult<()> {
        let resolved = ModelChoice::resolve(Role::Decider, decider, None, &self.defaults.decider)?;

        let transformers = self.store.transformer_bags_for(transformer_ids)?;
        let voters = self.store.voter_bags_for(task_id, transformer_ids)?;

        let mut instance = resolved.instantiate()?;
        instance.fit(&transformers, &voters, data)?;
        if !instance.is_fitted() {
            return Err(LearnerError::NotFitted(format!(
                "decider for task {} after fit",
                task_id
            )));
        }

        self.store.put_decider(
            task_id,
            DeciderRecord {
                decider: Arc::from(instance),
                transformer_ids: transformer_ids.to_vec(),
                class_name: resolved.class.name().to_string(),
                kwargs: resolved.kwargs.clone(),
                fitted_at: lifelong_common::time::now(),
            },
        );
        self.reserve_id(task_id.0);

        info!(
            "Fitted decider for task {} over {} transformer(s) on {} rows",
            task_id,
            transformer_ids.len(),
            data.len()
        );
        Ok(())
    }
}
