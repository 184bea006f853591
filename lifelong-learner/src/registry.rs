//! Identity registries
//!
//! [`ModelStore`] owns every fitted artifact by identity:
//! - transformer bags by transformer id
//! - voter bags by `(task id, transformer id)`
//! - the current decider of each task
//! - each task's raw dataset (kept for backward transfer, never evicted)
//! - per-transformer voter defaults
//!
//! Growth is monotonic. Bags are appended to, never shrunk or reordered; a voter bag can
//! never outgrow the bag of the transformer it was trained against.

use crate::defaults::ModelChoice;
use crate::error::{LearnerError, LearnerResult};
use crate::models::{Decider, Transformer, TransformerBags, Voter, VoterBags};
use crate::types::{Dataset, Kwargs, TaskId, TransformerId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Stored raw data of a task
#[derive(Debug, Clone)]
pub struct TaskRecord {
    pub data: Arc<Dataset>,
    pub added_at: DateTime<Utc>,
}

/// A task's current decider and what it was fitted with
#[derive(Clone)]
pub struct DeciderRecord {
    pub decider: Arc<dyn Decider>,
    pub transformer_ids: Vec<TransformerId>,
    pub class_name: String,
    pub kwargs: Kwargs,
    pub fitted_at: DateTime<Utc>,
}

impl std::fmt::Debug for DeciderRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeciderRecord")
            .field("transformer_ids", &self.transformer_ids)
            .field("class_name", &self.class_name)
            .field("kwargs", &self.kwargs)
            .field("fitted_at", &self.fitted_at)
            .finish()
    }
}

/// Serialisable snapshot of registry sizes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RegistrySummary {
    pub transformer_bags: Vec<(TransformerId, usize)>,
    pub voter_bags: Vec<(TaskId, TransformerId, usize)>,
    pub deciders: Vec<(TaskId, Vec<TransformerId>)>,
    pub stored_tasks: Vec<TaskId>,
}

/// Owner of all fitted artifacts
#[derive(Default)]
pub struct ModelStore {
    transformers: BTreeMap<TransformerId, Vec<Arc<dyn Transformer>>>,
    voters: BTreeMap<TaskId, VoterBags>,
    deciders: BTreeMap<TaskId, DeciderRecord>,
    tasks: BTreeMap<TaskId, TaskRecord>,
    voter_defaults: BTreeMap<TransformerId, ModelChoice<dyn Voter>>,
}

impl ModelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a fitted transformer to its bag, creating the bag on first use
    ///
    /// # Returns
    /// Bag index of the appended member
    pub fn append_transformer(
        &mut self,
        transformer_id: TransformerId,
        transformer: Arc<dyn Transformer>,
    ) -> LearnerResult<usize> {
        if !transformer.is_fitted() {
            return Err(LearnerError::NotFitted(format!(
                "transformer for id {}",
                transformer_id
            )));
        }

        let bag = self.transformers.entry(transformer_id).or_default();
        bag.push(transformer);
        debug!(
            "Appended transformer {} bag member {}",
            transformer_id,
            bag.len() - 1
        );
        Ok(bag.len() - 1)
    }

    /// Append a fitted voter to the `(task, transformer)` bag
    ///
    /// # Errors
    /// * `UnknownTransformer` - transformer id not registered
    /// * `VoterBagFull` - the voter bag already matches the transformer bag length
    /// * `NotFitted` - voter reports itself unfitted
    pub fn append_voter(
        &mut self,
        transformer_id: TransformerId,
        task_id: TaskId,
        voter: Arc<dyn Voter>,
    ) -> LearnerResult<usize> {
        let capacity = self.transformer_bag_len(transformer_id)?;
        if !voter.is_fitted() {
            return Err(LearnerError::NotFitted(format!(
                "voter for task {} and transformer {}",
                task_id, transformer_id
            )));
        }

        let bag = self
            .voters
            .entry(task_id)
            .or_default()
            .entry(transformer_id)
            .or_default();
        if bag.len() >= capacity {
            return Err(LearnerError::VoterBagFull {
                task: task_id,
                transformer: transformer_id,
                capacity,
            });
        }

        bag.push(voter);
        debug!(
            "Appended voter ({}, {}) bag member {}",
            task_id,
            transformer_id,
            bag.len() - 1
        );
        Ok(bag.len() - 1)
    }

    /// Registered transformer ids, ascending
    pub fn transformer_ids(&self) -> Vec<TransformerId> {
        self.transformers.keys().copied().collect()
    }

    /// Tasks with a fitted decider, ascending
    ///
    /// A task whose data is stored but has no decider yet is not listed.
    pub fn task_ids(&self) -> Vec<TaskId> {
        self.deciders.keys().copied().collect()
    }

    pub fn has_transformer(&self, transformer_id: TransformerId) -> bool {
        self.transformers.contains_key(&transformer_id)
    }

    pub fn transformer_bag(
        &self,
        transformer_id: TransformerId,
    ) -> LearnerResult<&[Arc<dyn Transformer>]> {
        self.transformers
            .get(&transformer_id)
            .map(Vec::as_slice)
            .ok_or(LearnerError::UnknownTransformer(transformer_id))
    }

    pub fn transformer_bag_len(&self, transformer_id: TransformerId) -> LearnerResult<usize> {
        Ok(self.transformer_bag(transformer_id)?.len())
    }

    /// Voters for the pair; empty when none were trained yet
    pub fn voter_bag(&self, task_id: TaskId, transformer_id: TransformerId) -> &[Arc<dyn Voter>] {
        self.voters
            .get(&task_id)
            .and_then(|bags| bags.get(&transformer_id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn voter_bag_len(&self, task_id: TaskId, transformer_id: TransformerId) -> usize {
        self.voter_bag(task_id, transformer_id).len()
    }

    /// Store (or overwrite) a task's raw data
    pub fn put_task_data(&mut self, task_id: TaskId, data: Arc<Dataset>) {
        let replaced = self
            .tasks
            .insert(
                task_id,
                TaskRecord {
                    data,
                    added_at: lifelong_common::time::now(),
                },
            )
            .is_some();
        if replaced {
            debug!("Overwrote stored data for task {}", task_id);
        }
    }

    pub fn task_record(&self, task_id: TaskId) -> LearnerResult<&TaskRecord> {
        self.tasks
            .get(&task_id)
            .ok_or(LearnerError::UnknownTask(task_id))
    }

    pub fn task_data(&self, task_id: TaskId) -> LearnerResult<Arc<Dataset>> {
        Ok(Arc::clone(&self.task_record(task_id)?.data))
    }

    pub fn has_task_data(&self, task_id: TaskId) -> bool {
        self.tasks.contains_key(&task_id)
    }

    pub fn set_voter_defaults(
        &mut self,
        transformer_id: TransformerId,
        choice: ModelChoice<dyn Voter>,
    ) {
        self.voter_defaults.insert(transformer_id, choice);
    }

    pub fn voter_defaults(&self, transformer_id: TransformerId) -> Option<&ModelChoice<dyn Voter>> {
        self.voter_defaults.get(&transformer_id)
    }

    /// Install a task's decider, replacing any previous one
    pub fn put_decider(&mut self, task_id: TaskId, record: DeciderRecord) {
        debug!(
            "Installed decider for task {} over transformers {:?}",
            task_id, record.transformer_ids
        );
        self.deciders.insert(task_id, record);
    }

    pub fn decider(&self, task_id: TaskId) -> LearnerResult<&DeciderRecord> {
        self.deciders
            .get(&task_id)
            .ok_or(LearnerError::UnknownTask(task_id))
    }

    /// Snapshot of the transformer bags for `ids`
    pub fn transformer_bags_for(&self, ids: &[TransformerId]) -> LearnerResult<TransformerBags> {
        let mut bags = TransformerBags::new();
        for &id in ids {
            bags.insert(id, self.transformer_bag(id)?.to_vec());
        }
        Ok(bags)
    }

    /// Snapshot of one task's voter bags for `ids`
    ///
    /// # Errors
    /// * `UnknownTransformer` - an id is not registered
    /// * `UnknownVoter` - the task has no voters for an id
    pub fn voter_bags_for(
        &self,
        task_id: TaskId,
        ids: &[TransformerId],
    ) -> LearnerResult<VoterBags> {
        ids.iter()
            .map(|&id| {
                if !self.has_transformer(id) {
                    return Err(LearnerError::UnknownTransformer(id));
                }
                let bag = self.voter_bag(task_id, id);
                if bag.is_empty() {
                    return Err(LearnerError::UnknownVoter {
                        task: task_id,
                        transformer: id,
                    });
                }
                Ok((id, bag.to_vec()))
            })
            .collect()
    }

    pub fn summary(&self) -> RegistrySummary {
        RegistrySummary {
            transformer_bags: self
                .transformers
                .iter()
                .map(|(id, bag)| (*id, bag.len()))
                .collect(),
            voter_bags: self
                .voters
                .iter()
                .flat_map(|(task, bags)| {
                    bags.iter()
                        .map(move |(transformer, bag)| (*task, *transformer, bag.len()))
                })
                .collect(),
            deciders: self
                .deciders
                .iter()
                .map(|(task, record)| (*task, record.transformer_ids.clone()))
                .collect(),
            stored_tasks: self.tasks.keys().copied().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Label, Matrix};

    struct StubTransformer(bool);

    impl Transformer for StubTransformer {
        fn fit(&mut self, _x: &Matrix, _y: Option<&[Label]>) -> anyhow::Result<()> {
            self.0 = true;
            Ok(())
        }

        fn transform(&self, x: &Matrix) -> anyhow::Result<Matrix> {
            Ok(x.clone())
        }

        fn is_fitted(&self) -> bool {
            self.0
        }
    }

    struct StubVoter;

    impl Voter for StubVoter {
        fn fit(&mut self, _transformed: &Matrix, _y: &[Label]) -> anyhow::Result<()> {
            Ok(())
        }

        fn vote(&self, transformed: &Matrix) -> anyhow::Result<Matrix> {
            Ok(transformed.clone())
        }

        fn is_fitted(&self) -> bool {
            true
        }
    }

    struct UnfittedVoter;

    impl Voter for UnfittedVoter {
        fn fit(&mut self, _transformed: &Matrix, _y: &[Label]) -> anyhow::Result<()> {
            Ok(())
        }

        fn vote(&self, transformed: &Matrix) -> anyhow::Result<Matrix> {
            Ok(transformed.clone())
        }

        fn is_fitted(&self) -> bool {
            false
        }
    }

    fn fitted() -> Arc<dyn Transformer> {
        Arc::new(StubTransformer(true))
    }

    #[test]
    fn test_append_transformer_creates_then_extends_bag() {
        let mut store = ModelStore::new();
        assert_eq!(store.append_transformer(TransformerId(0), fitted()).unwrap(), 0);
        assert_eq!(store.append_transformer(TransformerId(0), fitted()).unwrap(), 1);
        assert_eq!(store.append_transformer(TransformerId(4), fitted()).unwrap(), 0);

        assert_eq!(store.transformer_ids(), vec![TransformerId(0), TransformerId(4)]);
        assert_eq!(store.transformer_bag_len(TransformerId(0)).unwrap(), 2);
    }

    #[test]
    fn test_unfitted_transformer_rejected() {
        let mut store = ModelStore::new();
        let result = store.append_transformer(TransformerId(0), Arc::new(StubTransformer(false)));
        assert!(matches!(result, Err(LearnerError::NotFitted(_))));
        assert!(store.transformer_ids().is_empty());
    }

    #[test]
    fn test_voter_requires_known_transformer() {
        let mut store = ModelStore::new();
        let result = store.append_voter(TransformerId(9), TaskId(0), Arc::new(StubVoter));
        assert!(matches!(result, Err(LearnerError::UnknownTransformer(TransformerId(9)))));
    }

    #[test]
    fn test_unfitted_voter_rejected() {
        let mut store = ModelStore::new();
        store.append_transformer(TransformerId(0), fitted()).unwrap();

        let result = store.append_voter(TransformerId(0), TaskId(0), Arc::new(UnfittedVoter));
        assert!(matches!(result, Err(LearnerError::NotFitted(_))));
        assert_eq!(store.voter_bag_len(TaskId(0), TransformerId(0)), 0);
    }

    #[test]
    fn test_voter_bag_never_outgrows_transformer_bag() {
        let mut store = ModelStore::new();
        store.append_transformer(TransformerId(0), fitted()).unwrap();
        store.append_transformer(TransformerId(0), fitted()).unwrap();

        store.append_voter(TransformerId(0), TaskId(1), Arc::new(StubVoter)).unwrap();
        store.append_voter(TransformerId(0), TaskId(1), Arc::new(StubVoter)).unwrap();
        let overflow = store.append_voter(TransformerId(0), TaskId(1), Arc::new(StubVoter));

        assert!(matches!(
            overflow,
            Err(LearnerError::VoterBagFull { capacity: 2, .. })
        ));
        assert_eq!(store.voter_bag_len(TaskId(1), TransformerId(0)), 2);
    }

    #[test]
    fn test_task_ids_come_from_deciders_not_data() {
        let mut store = ModelStore::new();
        let data = Arc::new(Dataset::new(vec![vec![1.0]], vec![0]).unwrap());
        store.put_task_data(TaskId(3), data);

        assert!(store.has_task_data(TaskId(3)));
        assert!(store.task_ids().is_empty());
        assert!(matches!(store.decider(TaskId(3)), Err(LearnerError::UnknownTask(_))));
    }

    #[test]
    fn test_voter_bags_for_reports_missing_pair() {
        let mut store = ModelStore::new();
        store.append_transformer(TransformerId(0), fitted()).unwrap();
        store.append_transformer(TransformerId(1), fitted()).unwrap();
        store.append_voter(TransformerId(0), TaskId(0), Arc::new(StubVoter)).unwrap();

        let ok = store.voter_bags_for(TaskId(0), &[TransformerId(0)]).unwrap();
        assert_eq!(ok.len(), 1);

        let missing = store.voter_bags_for(TaskId(0), &[TransformerId(0), TransformerId(1)]);
        assert!(matches!(
            missing,
            Err(LearnerError::UnknownVoter {
                task: TaskId(0),
                transformer: TransformerId(1)
            })
        ));
    }

    #[test]
    fn test_summary_lists_bag_sizes() {
        let mut store = ModelStore::new();
        store.append_transformer(TransformerId(0), fitted()).unwrap();
        store.append_voter(TransformerId(0), TaskId(0), Arc::new(StubVoter)).unwrap();

        let summary = store.summary();
        assert_eq!(summary.transformer_bags, vec![(TransformerId(0), 1)]);
        assert_eq!(summary.voter_bags, vec![(TaskId(0), TransformerId(0), 1)]);
        assert!(summary.deciders.is_empty());

        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["transformer_bags"][0][1], 1);
    }
}
