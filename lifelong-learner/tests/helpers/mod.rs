//! Test helpers: small reference models and synthetic task data
//!
//! - `MeanShiftTransformer` centres features on the training mean
//! - `CentroidVoter` predicts the label of the nearest class centroid
//! - `MajorityDecider` takes a majority vote over every consulted bag member
//!
//! Voter rows are `[label, rows_trained_on, weight]` so tests can inspect how a stored
//! voter was trained through the public registry accessors.

#![allow(dead_code)]

use anyhow::{anyhow, Result};
use lifelong_learner::{
    Dataset, Decider, DeciderClass, Kwargs, Label, LearnerDefaults, Matrix, ModelChoice,
    ModelClass, Transformer, TransformerBags, TransformerClass, TransformerId, Voter, VoterBags,
    VoterClass,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

pub struct MeanShiftTransformer {
    means: Option<Vec<f64>>,
}

impl Transformer for MeanShiftTransformer {
    fn fit(&mut self, x: &Matrix, _y: Option<&[Label]>) -> Result<()> {
        let first = x.first().ok_or_else(|| anyhow!("cannot fit on zero rows"))?;
        let mut means = vec![0.0; first.len()];
        for row in x {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= x.len() as f64;
        }
        self.means = Some(means);
        Ok(())
    }

    fn transform(&self, x: &Matrix) -> Result<Matrix> {
        let means = self.means.as_ref().ok_or_else(|| anyhow!("not fitted"))?;
        Ok(x.iter()
            .map(|row| row.iter().zip(means).map(|(v, m)| v - m).collect())
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.means.is_some()
    }
}

pub struct CentroidVoter {
    weight: f64,
    centroids: Vec<(Label, Vec<f64>)>,
    rows_trained: usize,
    fitted: bool,
}

impl Voter for CentroidVoter {
    fn fit(&mut self, transformed: &Matrix, y: &[Label]) -> Result<()> {
        if transformed.is_empty() {
            return Err(anyhow!("cannot fit on zero rows"));
        }
        let mut sums: BTreeMap<Label, (Vec<f64>, usize)> = BTreeMap::new();
        for (row, label) in transformed.iter().zip(y) {
            let entry = sums
                .entry(*label)
                .or_insert_with(|| (vec![0.0; row.len()], 0));
            for (sum, value) in entry.0.iter_mut().zip(row) {
                *sum += value;
            }
            entry.1 += 1;
        }
        self.centroids = sums
            .into_iter()
            .map(|(label, (sum, count))| (label, sum.iter().map(|s| s / count as f64).collect()))
            .collect();
        self.rows_trained = transformed.len();
        self.fitted = true;
        Ok(())
    }

    fn vote(&self, transformed: &Matrix) -> Result<Matrix> {
        Ok(transformed
            .iter()
            .map(|row| {
                let label = self
                    .centroids
                    .iter()
                    .map(|(label, centroid)| {
                        let dist: f64 = centroid
                            .iter()
                            .zip(row)
                            .map(|(c, v)| (c - v) * (c - v))
                            .sum();
                        (*label, dist)
                    })
                    .min_by(|a, b| a.1.total_cmp(&b.1))
                    .map(|(label, _)| label)
                    .unwrap_or_default();
                vec![label as f64, self.rows_trained as f64, self.weight]
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

pub struct MajorityDecider {
    transformers: TransformerBags,
    voters: VoterBags,
    fit_rows: Arc<Mutex<Vec<usize>>>,
    fitted: bool,
}

impl Decider for MajorityDecider {
    fn fit(
        &mut self,
        transformers: &TransformerBags,
        voters: &VoterBags,
        data: &Dataset,
    ) -> Result<()> {
        self.transformers = transformers.clone();
        self.voters = voters.clone();
        self.fit_rows.lock().unwrap().push(data.len());
        self.fitted = true;
        Ok(())
    }

    fn predict(&self, x: &Matrix, transformer_ids: Option<&[TransformerId]>) -> Result<Vec<Label>> {
        let ids: Vec<TransformerId> = match transformer_ids {
            Some(ids) => ids.to_vec(),
            None => self.transformers.keys().copied().collect(),
        };

        let mut tallies: Vec<BTreeMap<Label, f64>> = vec![BTreeMap::new(); x.len()];
        for id in ids {
            let transformers = self
                .transformers
                .get(&id)
                .ok_or_else(|| anyhow!("transformer {} not in fit", id))?;
            let voters = self
                .voters
                .get(&id)
                .ok_or_else(|| anyhow!("voters for {} not in fit", id))?;
            for (transformer, voter) in transformers.iter().zip(voters) {
                let votes = voter.vote(&transformer.transform(x)?)?;
                for (tally, vote) in tallies.iter_mut().zip(votes) {
                    *tally.entry(vote[0] as Label).or_default() += vote[2];
                }
            }
        }

        Ok(tallies
            .into_iter()
            .map(|tally| {
                tally
                    .into_iter()
                    .fold(None, |best: Option<(Label, f64)>, (label, score)| match best {
                        Some((_, best_score)) if best_score >= score => best,
                        _ => Some((label, score)),
                    })
                    .map(|(label, _)| label)
                    .unwrap_or_default()
            })
            .collect())
    }

    fn is_fitted(&self) -> bool {
        self.fitted
    }
}

pub fn mean_shift_class() -> TransformerClass {
    ModelClass::new("mean-shift", |_: &Kwargs| -> Result<Box<dyn Transformer>> {
        Ok(Box::new(MeanShiftTransformer { means: None }))
    })
}

pub fn centroid_class() -> VoterClass {
    ModelClass::new("nearest-centroid", |kwargs: &Kwargs| -> Result<Box<dyn Voter>> {
        let weight = kwargs.get("weight").and_then(|v| v.as_f64()).unwrap_or(1.0);
        Ok(Box::new(CentroidVoter {
            weight,
            centroids: Vec::new(),
            rows_trained: 0,
            fitted: false,
        }))
    })
}

/// Majority decider class plus the shared log of its fit sizes
pub fn majority_class() -> (DeciderClass, Arc<Mutex<Vec<usize>>>) {
    let fit_rows = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&fit_rows);
    let class = ModelClass::new("majority", move |_: &Kwargs| -> Result<Box<dyn Decider>> {
        Ok(Box::new(MajorityDecider {
            transformers: TransformerBags::new(),
            voters: VoterBags::new(),
            fit_rows: Arc::clone(&log),
            fitted: false,
        }))
    });
    (class, fit_rows)
}

pub fn weight_kwargs(weight: f64) -> Kwargs {
    let mut kwargs = Kwargs::new();
    kwargs.insert("weight".to_string(), json!(weight));
    kwargs
}

/// Learner-wide defaults for all three roles
pub fn full_defaults() -> (LearnerDefaults, Arc<Mutex<Vec<usize>>>) {
    let (decider, fit_rows) = majority_class();
    let defaults = LearnerDefaults {
        transformer: ModelChoice::new()
            .with_class(mean_shift_class())
            .with_kwargs(Kwargs::new()),
        voter: ModelChoice::new()
            .with_class(centroid_class())
            .with_kwargs(weight_kwargs(1.0)),
        decider: ModelChoice::new()
            .with_class(decider)
            .with_kwargs(Kwargs::new()),
    };
    (defaults, fit_rows)
}

/// Two well separated classes; `offset` shifts the whole task
pub fn two_blob_task(n: usize, offset: f64) -> Dataset {
    let mut x = Vec::with_capacity(n);
    let mut y = Vec::with_capacity(n);
    for i in 0..n {
        let label = (i % 2) as Label;
        let jitter = (i as f64) * 0.01;
        x.push(vec![
            offset + label as f64 * 10.0 + jitter,
            offset - label as f64 * 10.0 - jitter,
        ]);
        y.push(label);
    }
    Dataset::new(x, y).expect("rows and labels match")
}

/// Rows trained on by the first voter of a pair
pub fn voter_rows(
    learner: &lifelong_learner::ProgressiveLearner,
    task: lifelong_learner::TaskId,
    transformer: TransformerId,
) -> usize {
    let voter = &learner.store().voter_bag(task, transformer)[0];
    let transformer_member = &learner.store().transformer_bag(transformer).unwrap()[0];
    let probe = vec![vec![0.0, 0.0]];
    let votes = voter
        .vote(&transformer_member.transform(&probe).unwrap())
        .unwrap();
    votes[0][1] as usize
}

/// Weight kwarg the first voter of a pair was built with
pub fn voter_weight(
    learner: &lifelong_learner::ProgressiveLearner,
    task: lifelong_learner::TaskId,
    transformer: TransformerId,
) -> f64 {
    let voter = &learner.store().voter_bag(task, transformer)[0];
    voter.vote(&vec![vec![0.0, 0.0]]).unwrap()[0][2]
}
