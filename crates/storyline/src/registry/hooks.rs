//! Lifecycle hooks registered alongside candidate steps.
//!
//! Hooks run around stories, scenarios or individual steps. On the way in
//! they run before the story's textual lifecycle steps; on the way out they
//! run after them.

use std::fmt;
use std::sync::Arc;

use crate::execution::{ExecutionError, StepError};
use crate::model::{Meta, MetaFilter, Outcome, Scope};

/// Whether a hook runs before or after the element it surrounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// Runs before the element.
    Before,
    /// Runs after the element.
    After,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Before => "before",
            Self::After => "after",
        })
    }
}

/// What a hook handler can observe.
#[derive(Debug, Clone, Copy)]
pub struct HookContext<'a> {
    meta: &'a Meta,
    failure: Option<&'a ExecutionError>,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(meta: &'a Meta, failure: Option<&'a ExecutionError>) -> Self {
        Self { meta, failure }
    }

    /// Effective meta of the surrounded story, scenario or step.
    #[must_use]
    pub fn meta(&self) -> &'a Meta {
        self.meta
    }

    /// The failure observed so far, if any.
    #[must_use]
    pub fn failure(&self) -> Option<&'a ExecutionError> {
        self.failure
    }
}

/// Handler invoked by a hook.
pub type HookHandler = Arc<dyn Fn(&HookContext<'_>) -> Result<(), StepError> + Send + Sync>;

/// A named hook with its stage, scope and filters.
///
/// # Examples
///
/// ```
/// use storyline::model::{Meta, MetaFilter, Outcome, Scope};
/// use storyline::LifecycleHook;
///
/// let hook = LifecycleHook::after("close browser", Scope::Scenario, Outcome::Failure, |_ctx| Ok(()))
///     .with_meta_filter(MetaFilter::parse("+browser"));
/// let mut meta = Meta::new();
/// meta.insert("browser", "firefox");
/// assert!(hook.applies_to(&meta));
/// assert!(!hook.applies_to(&Meta::new()));
/// ```
pub struct LifecycleHook {
    name: String,
    stage: Stage,
    scope: Scope,
    outcome: Outcome,
    meta_filter: Option<MetaFilter>,
    handler: HookHandler,
}

impl LifecycleHook {
    fn new<F>(name: impl Into<String>, stage: Stage, scope: Scope, outcome: Outcome, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            stage,
            scope,
            outcome,
            meta_filter: None,
            handler: Arc::new(handler),
        }
    }

    /// A hook running before every element of `scope`.
    pub fn before<F>(name: impl Into<String>, scope: Scope, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self::new(name, Stage::Before, scope, Outcome::Any, handler)
    }

    /// A hook running after every element of `scope` that ended with
    /// `outcome`.
    pub fn after<F>(name: impl Into<String>, scope: Scope, outcome: Outcome, handler: F) -> Self
    where
        F: Fn(&HookContext<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        Self::new(name, Stage::After, scope, outcome, handler)
    }

    /// Restrict the hook to elements whose meta `filter` allows.
    #[must_use]
    pub fn with_meta_filter(mut self, filter: MetaFilter) -> Self {
        self.meta_filter = Some(filter);
        self
    }

    /// Name used in reports.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stage.
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Scope.
    #[must_use]
    pub fn scope(&self) -> Scope {
        self.scope
    }

    /// Outcome required by an after hook.
    #[must_use]
    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Whether the hook applies to an element carrying `meta`.
    #[must_use]
    pub fn applies_to(&self, meta: &Meta) -> bool {
        self.meta_filter
            .as_ref()
            .is_none_or(|filter| filter.allow(meta))
    }

    /// Meta filter restricting the hook.
    #[must_use]
    pub fn meta_filter(&self) -> Option<&MetaFilter> {
        self.meta_filter.as_ref()
    }

    /// The handler.
    #[must_use]
    pub fn handler(&self) -> &HookHandler {
        &self.handler
    }
}

impl fmt::Debug for LifecycleHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LifecycleHook")
            .field("name", &self.name)
            .field("stage", &self.stage)
            .field("scope", &self.scope)
            .field("outcome", &self.outcome)
            .field("meta_filter", &self.meta_filter)
            .finish_non_exhaustive()
    }
}
