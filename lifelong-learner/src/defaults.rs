//! Default resolution chain
//!
//! A model role needs a class and kwargs. Each is resolved on its own, first hit wins:
//! 1. Value given at the call site
//! 2. Per-transformer default (voters only, recorded when the transformer was created)
//! 3. Learner-wide default
//! 4. `MissingDefault` error naming the role and field
//!
//! Learner-wide defaults can be built from a [`LearnerConfig`] by looking class names up in
//! a [`ModelCatalog`].

use crate::error::{DefaultField, LearnerError, LearnerResult, Role};
use crate::models::{
    Decider, DeciderClass, ModelClass, Transformer, TransformerClass, Voter, VoterClass,
};
use crate::types::Kwargs;
use lifelong_common::config::{LearnerConfig, RoleConfig};
use std::collections::HashMap;
use tracing::debug;

/// Tier of the chain that supplied a value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tier {
    CallSite,
    PerTransformer,
    LearnerWide,
}

/// Outcome of resolving one field
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<T> {
    Resolved { value: T, tier: Tier },
    Unresolved,
}

impl<T> Resolution<T> {
    pub fn tier(&self) -> Option<Tier> {
        match self {
            Resolution::Resolved { tier, .. } => Some(*tier),
            Resolution::Unresolved => None,
        }
    }

    /// Unwrap the value or fail with `MissingDefault`
    pub fn require(self, role: Role, field: DefaultField) -> LearnerResult<T> {
        match self {
            Resolution::Resolved { value, tier } => {
                debug!("Resolved {} {} from {:?}", role, field, tier);
                Ok(value)
            }
            Resolution::Unresolved => Err(LearnerError::MissingDefault { role, field }),
        }
    }
}

/// Three-tier lookup: call site, then per-entity default, then learner-wide default
pub fn resolve<T: Clone>(
    explicit: Option<&T>,
    per_entity: Option<&T>,
    global: Option<&T>,
) -> Resolution<T> {
    let candidates = [
        (explicit, Tier::CallSite),
        (per_entity, Tier::PerTransformer),
        (global, Tier::LearnerWide),
    ];

    candidates
        .into_iter()
        .find_map(|(value, tier)| {
            value.map(|v| Resolution::Resolved {
                value: v.clone(),
                tier,
            })
        })
        .unwrap_or(Resolution::Unresolved)
}

/// Optional class and kwargs for one role
///
/// Used for call-site overrides, per-transformer voter defaults and learner-wide defaults.
pub struct ModelChoice<M: ?Sized> {
    pub class: Option<ModelClass<M>>,
    pub kwargs: Option<Kwargs>,
}

impl<M: ?Sized> ModelChoice<M> {
    pub fn new() -> Self {
        Self {
            class: None,
            kwargs: None,
        }
    }

    pub fn with_class(mut self, class: ModelClass<M>) -> Self {
        self.class = Some(class);
        self
    }

    pub fn with_kwargs(mut self, kwargs: Kwargs) -> Self {
        self.kwargs = Some(kwargs);
        self
    }

    /// Resolve class and kwargs independently through the chain
    pub fn resolve(
        role: Role,
        explicit: &ModelChoice<M>,
        per_entity: Option<&ModelChoice<M>>,
        global: &ModelChoice<M>,
    ) -> LearnerResult<ResolvedModel<M>> {
        let class = resolve(
            explicit.class.as_ref(),
            per_entity.and_then(|p| p.class.as_ref()),
            global.class.as_ref(),
        )
        .require(role, DefaultField::Class)?;

        let kwargs = resolve(
            explicit.kwargs.as_ref(),
            per_entity.and_then(|p| p.kwargs.as_ref()),
            global.kwargs.as_ref(),
        )
        .require(role, DefaultField::Kwargs)?;

        Ok(ResolvedModel { class, kwargs })
    }
}

impl<M: ?Sized> Default for ModelChoice<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ?Sized> Clone for ModelChoice<M> {
    fn clone(&self) -> Self {
        Self {
            class: self.class.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

impl<M: ?Sized> std::fmt::Debug for ModelChoice<M> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelChoice")
            .field("class", &self.class.as_ref().map(|c| c.name()))
            .field("kwargs", &self.kwargs)
            .finish()
    }
}

/// Fully resolved class and kwargs
pub struct ResolvedModel<M: ?Sized> {
    pub class: ModelClass<M>,
    pub kwargs: Kwargs,
}

impl<M: ?Sized> ResolvedModel<M> {
    /// Build an unfitted instance
    pub fn instantiate(&self) -> LearnerResult<Box<M>> {
        Ok(self.class.instantiate(&self.kwargs)?)
    }

    /// Same values as a choice with both fields set
    pub fn to_choice(&self) -> ModelChoice<M> {
        ModelChoice {
            class: Some(self.class.clone()),
            kwargs: Some(self.kwargs.clone()),
        }
    }
}

impl<M: ?Sized> Clone for ResolvedModel<M> {
    fn clone(&self) -> Self {
        Self {
            class: self.class.clone(),
            kwargs: self.kwargs.clone(),
        }
    }
}

/// Learner-wide defaults for all three roles
#[derive(Debug, Clone, Default)]
pub struct LearnerDefaults {
    pub transformer: ModelChoice<dyn Transformer>,
    pub voter: ModelChoice<dyn Voter>,
    pub decider: ModelChoice<dyn Decider>,
}

impl LearnerDefaults {
    /// Build defaults from config, looking class names up in `catalog`
    pub fn from_config(config: &LearnerConfig, catalog: &ModelCatalog) -> LearnerResult<Self> {
        Ok(Self {
            transformer: choice_from_config(&config.transformer, |name| catalog.transformer(name))?,
            voter: choice_from_config(&config.voter, |name| catalog.voter(name))?,
            decider: choice_from_config(&config.decider, |name| catalog.decider(name))?,
        })
    }
}

fn choice_from_config<M: ?Sized>(
    role: &RoleConfig,
    lookup: impl Fn(&str) -> LearnerResult<ModelClass<M>>,
) -> LearnerResult<ModelChoice<M>> {
    let class = role.class.as_deref().map(lookup).transpose()?;
    Ok(ModelChoice {
        class,
        kwargs: role.kwargs.clone(),
    })
}

/// Model classes by name
#[derive(Debug, Clone, Default)]
pub struct ModelCatalog {
    transformers: HashMap<String, TransformerClass>,
    voters: HashMap<String, VoterClass>,
    deciders: HashMap<String, DeciderClass>,
}

impl ModelCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_transformer(&mut self, class: TransformerClass) -> &mut Self {
        self.transformers.insert(class.name().to_string(), class);
        self
    }

    pub fn register_voter(&mut self, class: VoterClass) -> &mut Self {
        self.voters.insert(class.name().to_string(), class);
        self
    }

    pub fn register_decider(&mut self, class: DeciderClass) -> &mut Self {
        self.deciders.insert(class.name().to_string(), class);
        self
    }

    pub fn transformer(&self, name: &str) -> LearnerResult<TransformerClass> {
        self.transformers
            .get(name)
            .cloned()
            .ok_or_else(|| LearnerError::UnknownClass(name.to_string()))
    }

    pub fn voter(&self, name: &str) -> LearnerResult<VoterClass> {
        self.voters
            .get(name)
            .cloned()
            .ok_or_else(|| LearnerError::UnknownClass(name.to_string()))
    }

    pub fn decider(&self, name: &str) -> LearnerResult<DeciderClass> {
        self.deciders
            .get(name)
            .cloned()
            .ok_or_else(|| LearnerError::UnknownClass(name.to_string()))
    }
}
