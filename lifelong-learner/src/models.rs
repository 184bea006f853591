//! Collaborator capability contracts
//!
//! The learner never implements a learning algorithm itself. Transformers, voters and
//! deciders are supplied by the caller through these traits, and constructed from
//! `(class, kwargs)` pairs through [`ModelClass`].

use crate::types::{Dataset, Kwargs, Label, Matrix, TransformerId};
use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

/// Transformer bags by id, as handed to a decider
pub type TransformerBags = BTreeMap<TransformerId, Vec<Arc<dyn Transformer>>>;

/// One task's voter bags by transformer id, as handed to a decider
pub type VoterBags = BTreeMap<TransformerId, Vec<Arc<dyn Voter>>>;

/// Feature transformation fitted on one task's samples
pub trait Transformer: Send + Sync {
    /// Fit on `x`; `y` is `None` for unsupervised transformers
    fn fit(&mut self, x: &Matrix, y: Option<&[Label]>) -> Result<()>;

    /// Map raw rows to feature rows
    fn transform(&self, x: &Matrix) -> Result<Matrix>;

    fn is_fitted(&self) -> bool;
}

/// Per `(task, transformer)` model fitted on transformed features
pub trait Voter: Send + Sync {
    fn fit(&mut self, transformed: &Matrix, y: &[Label]) -> Result<()>;

    /// Per-row scores; their meaning is agreed between voter and decider
    fn vote(&self, transformed: &Matrix) -> Result<Matrix>;

    fn is_fitted(&self) -> bool;
}

/// Per-task combiner of transformer/voter outputs
pub trait Decider: Send + Sync {
    /// Fit over a set of transformer bags and this task's voter bags for the same ids
    fn fit(
        &mut self,
        transformers: &TransformerBags,
        voters: &VoterBags,
        data: &Dataset,
    ) -> Result<()>;

    /// Predict labels for `x`
    ///
    /// `transformer_ids` restricts which transformers' votes are consulted; `None` means
    /// every transformer the decider was fitted with.
    fn predict(&self, x: &Matrix, transformer_ids: Option<&[TransformerId]>) -> Result<Vec<Label>>;

    fn is_fitted(&self) -> bool;
}

type Constructor<M> = dyn Fn(&Kwargs) -> Result<Box<M>> + Send + Sync;

/// Named constructor for one model role
///
/// Stands in for "call this class with these keyword arguments".
pub struct ModelClass<M: ?Sized> {
    name: Arc<str>,
    ctor: Arc<Constructor<M>>,
}

pub type TransformerClass = ModelClass<dyn Transformer>;
pub type VoterClass = ModelClass<dyn Voter>;
pub type DeciderClass = ModelClass<dyn Decider>;

impl<M: ?Sized> ModelClass<M> {
    pub fn new<F>(name: impl Into<String>, ctor: F) -> Self
    where
        F: Fn(&Kwargs) -> Result<Box<M>> + Send + Sync + 'static,
    {
        let name: String = name.into();
        Self {
            name: Arc::from(name),
            ctor: Arc::new(ctor),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Build an unfitted instance
    pub fn instantiate(&self, kwargs: &Kwargs) -> Result<Box<M>> {
        (self.ctor)(kwargs)
    }
}

impl<M: ?Sized> Clone for ModelClass<M> {
    fn clone(&self) -> Self {
        Self {
            name: Arc::clone(&self.name),
            ctor: Arc::clone(&self.ctor),
        }
    }
}

impl<M: ?Sized> fmt::Debug for ModelClass<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelClass").field("name", &self.name).finish()
    }
}
