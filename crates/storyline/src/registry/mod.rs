//! Candidate step catalogue and lookup.
//!
//! A [`Catalogue`] is assembled once, before any story runs, from
//! [`CandidateStep`]s and [`LifecycleHook`]s. It is immutable while stories
//! run and is shared between worker threads by reference.
//!
//! Lookup picks, among every candidate of the resolved step type whose
//! pattern or alias matches, the one with the highest priority. Equal
//! priorities resolve to the candidate registered first.
//!
//! Patterns and aliases may hold option groups such as `{buy|sell}`; each
//! variant gets its own matcher on the same candidate.

use std::fmt;
use std::sync::Arc;

use log::debug;
use storyline_patterns::{
    DEFAULT_PARAMETER_PREFIX, PatternError, StepMatcher, StepType, pattern_variants,
};
use thiserror::Error;

use crate::binding::{
    DeclaredParameterNames, ParameterNameProvider, PatternParameterNames, StepArgs,
};
use crate::execution::StepError;
use crate::model::Scope;

#[cfg(feature = "diagnostics")]
pub(crate) mod diagnostics;
mod finder;
mod hooks;

pub(crate) use finder::StepCollector;
pub use hooks::{HookContext, HookHandler, LifecycleHook, Stage};

/// Composite nesting allowed unless configured otherwise.
pub const DEFAULT_MAX_COMPOSITE_DEPTH: usize = 32;

/// Handler invoked when a matched step is performed.
pub type StepHandler = Arc<dyn Fn(&StepArgs<'_>) -> Result<(), StepError> + Send + Sync>;

/// Error raised while building a candidate.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogueError {
    /// A pattern or alias failed to compile.
    #[error("invalid step pattern `{pattern}`: {source}")]
    InvalidPattern {
        /// Pattern text.
        pattern: String,
        /// Compilation error.
        #[source]
        source: PatternError,
    },
    /// Candidates cannot be typed `And`.
    #[error("candidate `{pattern}` cannot be declared as an And step")]
    AndCandidate {
        /// Pattern text.
        pattern: String,
    },
}

/// A compiled step definition.
///
/// # Examples
///
/// ```
/// use storyline::CandidateStep;
///
/// let candidate = CandidateStep::given("a trader of symbol $symbol")
///     .alias("a stock of symbol $symbol")
///     .priority(2)
///     .handler(|_args| Ok(()))
///     .build()
///     .expect("patterns compile");
/// assert_eq!(candidate.priority(), 2);
/// assert!(candidate.matches("a stock of symbol STK1"));
/// ```
pub struct CandidateStep {
    step_type: StepType,
    pattern: String,
    aliases: Vec<String>,
    matcher: StepMatcher,
    variants: Vec<StepMatcher>,
    priority: i32,
    composed: Vec<String>,
    handler: Option<StepHandler>,
    parameter_names: Vec<Arc<dyn ParameterNameProvider>>,
    pending: bool,
}

impl CandidateStep {
    /// Start building a candidate of `step_type`.
    pub fn new(step_type: StepType, pattern: impl Into<String>) -> CandidateStepBuilder {
        CandidateStepBuilder::new(step_type, pattern.into())
    }

    /// Start building a `Given` candidate.
    pub fn given(pattern: impl Into<String>) -> CandidateStepBuilder {
        Self::new(StepType::Given, pattern)
    }

    /// Start building a `When` candidate.
    pub fn when(pattern: impl Into<String>) -> CandidateStepBuilder {
        Self::new(StepType::When, pattern)
    }

    /// Start building a `Then` candidate.
    pub fn then(pattern: impl Into<String>) -> CandidateStepBuilder {
        Self::new(StepType::Then, pattern)
    }

    /// Declared step type.
    #[must_use]
    pub fn step_type(&self) -> StepType {
        self.step_type
    }

    /// Canonical pattern text as declared.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Matcher of the first variant of the canonical pattern.
    #[must_use]
    pub fn matcher(&self) -> &StepMatcher {
        &self.matcher
    }

    /// Alias pattern texts as declared.
    #[must_use]
    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    /// Every matcher: canonical variants first, then alias variants.
    pub fn matchers(&self) -> impl Iterator<Item = &StepMatcher> {
        std::iter::once(&self.matcher).chain(&self.variants)
    }

    /// Declared priority; higher wins.
    #[must_use]
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Whether the candidate expands into constituent steps.
    #[must_use]
    pub fn is_composite(&self) -> bool {
        !self.composed.is_empty()
    }

    /// Constituent step texts, possibly holding `<name>` markers.
    #[must_use]
    pub fn composed_steps(&self) -> &[String] {
        &self.composed
    }

    /// Bound handler, if any.
    #[must_use]
    pub fn handler(&self) -> Option<&StepHandler> {
        self.handler.as_ref()
    }

    /// Parameter name providers in consultation order.
    #[must_use]
    pub fn parameter_name_providers(&self) -> &[Arc<dyn ParameterNameProvider>] {
        &self.parameter_names
    }

    /// Whether the candidate is declared pending.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.pending
    }

    /// Whether the canonical pattern or an alias matches `body`.
    #[must_use]
    pub fn matches(&self, body: &str) -> bool {
        self.matchers().any(|matcher| matcher.matches(body))
    }

    /// First matcher accepting `body`, with its captures.
    #[must_use]
    pub fn find(&self, body: &str) -> Option<(&StepMatcher, Vec<String>)> {
        self.matchers()
            .find_map(|matcher| matcher.find(body).map(|captures| (matcher, captures)))
    }
}

impl fmt::Debug for CandidateStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CandidateStep")
            .field("step_type", &self.step_type)
            .field("pattern", &self.pattern)
            .field("aliases", &self.aliases)
            .field("variants", &self.variants.len())
            .field("priority", &self.priority)
            .field("composed", &self.composed)
            .field("has_handler", &self.handler.is_some())
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

/// Builder returned by [`CandidateStep::new`].
pub struct CandidateStepBuilder {
    step_type: StepType,
    pattern: String,
    aliases: Vec<String>,
    priority: i32,
    composed: Vec<String>,
    handler: Option<StepHandler>,
    declared: Vec<String>,
    providers: Vec<Arc<dyn ParameterNameProvider>>,
    pending: bool,
    prefix: char,
}

impl CandidateStepBuilder {
    fn new(step_type: StepType, pattern: String) -> Self {
        Self {
            step_type,
            pattern,
            aliases: Vec::new(),
            priority: 0,
            composed: Vec::new(),
            handler: None,
            declared: Vec::new(),
            providers: Vec::new(),
            pending: false,
            prefix: DEFAULT_PARAMETER_PREFIX,
        }
    }

    /// Set the priority; higher wins among matching candidates.
    #[must_use]
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Add an alias pattern sharing the handler.
    #[must_use]
    pub fn alias(mut self, pattern: impl Into<String>) -> Self {
        self.aliases.push(pattern.into());
        self
    }

    /// Expand into the given constituent step texts.
    #[must_use]
    pub fn composed_of<I, S>(mut self, steps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.composed.extend(steps.into_iter().map(Into::into));
        self
    }

    /// Bind the handler invoked when the step is performed.
    #[must_use]
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&StepArgs<'_>) -> Result<(), StepError> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Declare the handler's parameter names in order.
    #[must_use]
    pub fn parameter_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.declared = names.into_iter().map(Into::into).collect();
        self
    }

    /// Consult `provider` after any declared names and before the pattern.
    #[must_use]
    pub fn parameter_name_provider(mut self, provider: impl ParameterNameProvider + 'static) -> Self {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Mark the candidate pending: it matches but never runs.
    #[must_use]
    pub fn pending(mut self) -> Self {
        self.pending = true;
        self
    }

    /// Use `prefix` instead of `$` to introduce parameters.
    #[must_use]
    pub fn parameter_prefix(mut self, prefix: char) -> Self {
        self.prefix = prefix;
        self
    }

    /// Compile the patterns.
    ///
    /// # Errors
    ///
    /// Returns [`CatalogueError::AndCandidate`] for `And` candidates and
    /// [`CatalogueError::InvalidPattern`] when a pattern or alias does not
    /// compile.
    pub fn build(self) -> Result<CandidateStep, CatalogueError> {
        if self.step_type == StepType::And {
            return Err(CatalogueError::AndCandidate {
                pattern: self.pattern,
            });
        }
        let prefix = self.prefix;
        let compile = |pattern: String| {
            StepMatcher::with_prefix(&pattern, prefix)
                .map_err(|source| CatalogueError::InvalidPattern { pattern, source })
        };
        let mut texts = std::iter::once(&self.pattern)
            .chain(&self.aliases)
            .flat_map(|declared| pattern_variants(declared));
        let matcher = compile(texts.next().unwrap_or_else(|| self.pattern.clone()))?;
        let variants = texts.map(compile).collect::<Result<Vec<_>, _>>()?;
        let mut parameter_names: Vec<Arc<dyn ParameterNameProvider>> = Vec::new();
        if !self.declared.is_empty() {
            parameter_names.push(Arc::new(DeclaredParameterNames(self.declared)));
        }
        parameter_names.extend(self.providers);
        parameter_names.push(Arc::new(PatternParameterNames));
        Ok(CandidateStep {
            step_type: self.step_type,
            pattern: self.pattern,
            aliases: self.aliases,
            matcher,
            variants,
            priority: self.priority,
            composed: self.composed,
            handler: self.handler,
            parameter_names,
            pending: self.pending,
        })
    }
}

/// A candidate selected for a step body.
#[derive(Debug, Clone)]
pub struct CandidateMatch<'c> {
    /// Winning candidate.
    pub candidate: &'c CandidateStep,
    /// Pattern or alias that matched.
    pub matcher: &'c StepMatcher,
    /// Captured values in group order.
    pub captures: Vec<String>,
}

/// Candidate steps and lifecycle hooks available to a run.
///
/// # Examples
///
/// ```
/// use storyline::{CandidateStep, Catalogue};
/// use storyline_patterns::StepType;
///
/// let catalogue = Catalogue::new()
///     .with(CandidateStep::given("a value $n").build().expect("valid"))
///     .with(CandidateStep::given("a value 5").priority(1).build().expect("valid"));
/// let found = catalogue.find(StepType::Given, "a value 5").expect("match");
/// assert_eq!(found.candidate.pattern(), "a value 5");
/// ```
#[derive(Debug)]
pub struct Catalogue {
    candidates: Vec<CandidateStep>,
    hooks: Vec<LifecycleHook>,
    max_composite_depth: usize,
}

impl Default for Catalogue {
    fn default() -> Self {
        Self {
            candidates: Vec::new(),
            hooks: Vec::new(),
            max_composite_depth: DEFAULT_MAX_COMPOSITE_DEPTH,
        }
    }
}

impl Catalogue {
    /// Empty catalogue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a candidate.
    pub fn add(&mut self, candidate: CandidateStep) {
        self.candidates.push(candidate);
    }

    /// Append a candidate, builder style.
    #[must_use]
    pub fn with(mut self, candidate: CandidateStep) -> Self {
        self.add(candidate);
        self
    }

    /// Append a lifecycle hook.
    pub fn add_hook(&mut self, hook: LifecycleHook) {
        self.hooks.push(hook);
    }

    /// Append a lifecycle hook, builder style.
    #[must_use]
    pub fn with_hook(mut self, hook: LifecycleHook) -> Self {
        self.add_hook(hook);
        self
    }

    /// Limit composite nesting to `depth` levels.
    #[must_use]
    pub fn with_max_composite_depth(mut self, depth: usize) -> Self {
        self.max_composite_depth = depth;
        self
    }

    /// Candidates in registration order.
    #[must_use]
    pub fn candidates(&self) -> &[CandidateStep] {
        &self.candidates
    }

    /// Hooks in registration order.
    #[must_use]
    pub fn hooks(&self) -> &[LifecycleHook] {
        &self.hooks
    }

    /// Maximum composite nesting.
    #[must_use]
    pub fn max_composite_depth(&self) -> usize {
        self.max_composite_depth
    }

    /// Hooks of `stage` and `scope`, in registration order.
    pub fn hooks_for(&self, stage: Stage, scope: Scope) -> impl Iterator<Item = &LifecycleHook> {
        self.hooks
            .iter()
            .filter(move |hook| hook.stage() == stage && hook.scope() == scope)
    }

    /// Best candidate of `step_type` matching `body`.
    #[must_use]
    pub fn find(&self, step_type: StepType, body: &str) -> Option<CandidateMatch<'_>> {
        let mut best: Option<CandidateMatch<'_>> = None;
        for candidate in self.candidates.iter().filter(|c| c.step_type == step_type) {
            let Some((matcher, captures)) = candidate.find(body) else {
                continue;
            };
            if best
                .as_ref()
                .is_none_or(|current| candidate.priority > current.candidate.priority)
            {
                best = Some(CandidateMatch {
                    candidate,
                    matcher,
                    captures,
                });
            }
        }
        if let Some(found) = &best {
            debug!(
                "`{body}` matched {step_type} `{}` (priority {})",
                found.matcher.pattern(),
                found.candidate.priority
            );
        }
        best
    }
}
