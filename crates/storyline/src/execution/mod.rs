//! Deferred executable steps and their results.
//!
//! The performable tree holds [`Step`] values built by the matching engine.
//! A step is performed at most once per run: the runner either performs it
//! or, after an earlier problem, asks it not to perform. Either way it yields
//! exactly one [`StepResult`].
//!
//! # Key Components
//!
//! - [`Step`]: a matched, pending, ignorable, hook or outcome-gated step.
//! - [`StepError`] and [`StepSignal`]: what handlers report back.
//! - [`ExecutionError`]: the cause attached to non-successful results.

mod error;
mod result;

use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use log::debug;
use storyline_patterns::StepMatcher;

use crate::binding::{StepArgs, ValueConverters, bind};
use crate::model::{Meta, Outcome};
use crate::panic::panic_message;
use crate::registry::{CandidateStep, HookContext, LifecycleHook};
use crate::table::NamedParameters;

pub use error::{ExecutionError, HandlerError, StepError, StepSignal};
pub use result::{StepOutcome, StepResult};

/// Inputs shared by every step performed in one scenario attempt.
#[derive(Clone, Copy)]
pub(crate) struct StepContext<'a> {
    pub(crate) converters: &'a ValueConverters,
    pub(crate) dry_run: bool,
    pub(crate) failure: Option<&'a Arc<ExecutionError>>,
}

/// Control flow requested by a performed step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Signal {
    RestartScenario,
    RestartStory,
    IgnoringSteps,
}

/// Result of one perform or do-not-perform call.
#[derive(Debug, Clone)]
pub(crate) struct Performed {
    pub(crate) result: StepResult,
    pub(crate) signal: Option<Signal>,
}

impl From<StepResult> for Performed {
    fn from(result: StepResult) -> Self {
        Self {
            result,
            signal: None,
        }
    }
}

/// A step matched against a candidate.
#[derive(Debug)]
pub struct MatchedStep<'c> {
    text: String,
    parametrised: Option<String>,
    candidate: &'c CandidateStep,
    matcher: &'c StepMatcher,
    captures: Vec<String>,
    named: NamedParameters,
    composed: Vec<Step<'c>>,
}

impl<'c> MatchedStep<'c> {
    pub(crate) fn new(
        text: &str,
        parametrised: Option<String>,
        candidate: &'c CandidateStep,
        matcher: &'c StepMatcher,
        captures: Vec<String>,
        named: NamedParameters,
        composed: Vec<Step<'c>>,
    ) -> Self {
        Self {
            text: text.to_string(),
            parametrised,
            candidate,
            matcher,
            captures,
            named,
            composed,
        }
    }

    /// Declared step text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Candidate the step matched.
    #[must_use]
    pub fn candidate(&self) -> &'c CandidateStep {
        self.candidate
    }

    /// Pattern, or alias, that matched.
    #[must_use]
    pub fn matcher(&self) -> &'c StepMatcher {
        self.matcher
    }

    /// Values captured from the step text.
    #[must_use]
    pub fn captures(&self) -> &[String] {
        &self.captures
    }

    /// Constituent steps of a composite candidate.
    #[must_use]
    pub fn composed(&self) -> &[Step<'c>] {
        &self.composed
    }

    fn result(&self, result: StepResult) -> StepResult {
        result.with_parametrised(self.parametrised.clone())
    }

    fn perform(&self, ctx: &StepContext<'_>) -> Performed {
        if self.candidate.is_pending() {
            let cause = ExecutionError::MarkedPending {
                text: self.text.clone(),
            };
            return self.result(StepResult::pending(&self.text, Arc::new(cause))).into();
        }
        let bound = match bind(
            &self.text,
            self.matcher,
            &self.captures,
            self.candidate.parameter_name_providers(),
            &self.named,
        ) {
            Ok(bound) => bound,
            Err(cause) => {
                return self.result(StepResult::pending(&self.text, Arc::new(cause))).into();
            }
        };
        let Some(handler) = self.candidate.handler().filter(|_| !ctx.dry_run) else {
            return self.result(StepResult::successful(&self.text)).into();
        };
        let performed_text = self.parametrised.as_deref().unwrap_or(&self.text);
        let args = StepArgs::from_bound(performed_text, bound, ctx.converters);
        debug!("performing `{performed_text}`");
        let mut performed = outcome_of(&self.text, || handler(&args));
        performed.result = self.result(performed.result);
        performed
    }
}

/// A step that cannot run, with the reason.
#[derive(Debug, Clone)]
pub struct PendingStep {
    text: String,
    parametrised: Option<String>,
    cause: Arc<ExecutionError>,
}

impl PendingStep {
    pub(crate) fn new(text: &str, parametrised: Option<String>, cause: ExecutionError) -> Self {
        Self {
            text: text.to_string(),
            parametrised,
            cause: Arc::new(cause),
        }
    }

    /// Declared step text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Why the step is pending.
    #[must_use]
    pub fn cause(&self) -> &ExecutionError {
        &self.cause
    }

    fn result(&self) -> Performed {
        StepResult::pending(&self.text, Arc::clone(&self.cause))
            .with_parametrised(self.parametrised.clone())
            .into()
    }
}

/// A catalogue hook bound to the meta of the element it surrounds.
#[derive(Debug)]
pub struct HookStep<'c> {
    hook: &'c LifecycleHook,
    meta: Meta,
}

impl<'c> HookStep<'c> {
    pub(crate) fn new(hook: &'c LifecycleHook, meta: Meta) -> Self {
        Self { hook, meta }
    }

    /// The hook performed by this step.
    #[must_use]
    pub fn hook(&self) -> &'c LifecycleHook {
        self.hook
    }

    fn perform(&self, ctx: &StepContext<'_>) -> Performed {
        let name = self.hook.name();
        if ctx.dry_run {
            return StepResult::successful(name).into();
        }
        let context = HookContext::new(&self.meta, ctx.failure.map(|failure| &**failure));
        debug!("running {} hook `{name}`", self.hook.stage());
        outcome_of(name, || (self.hook.handler())(&context))
    }
}

/// A deferred executable unit of the performable tree.
#[derive(Debug)]
pub enum Step<'c> {
    /// A step matched against a candidate.
    Matched(MatchedStep<'c>),
    /// A step that cannot run.
    Pending(PendingStep),
    /// A comment step.
    Ignorable(String),
    /// A catalogue lifecycle hook.
    Hook(HookStep<'c>),
    /// An after step that only runs for the given outcome.
    UponOutcome(Outcome, Box<Step<'c>>),
}

impl<'c> Step<'c> {
    /// Declared text of the step, or the hook name.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Matched(step) => step.text(),
            Self::Pending(step) => step.text(),
            Self::Ignorable(text) => text,
            Self::Hook(step) => step.hook.name(),
            Self::UponOutcome(_, inner) => inner.text(),
        }
    }

    /// Whether the step is a catalogue hook, reported only when it fails.
    #[must_use]
    pub fn is_hook(&self) -> bool {
        match self {
            Self::Hook(_) => true,
            Self::UponOutcome(_, inner) => inner.is_hook(),
            _ => false,
        }
    }

    /// Constituent steps of a matched composite.
    #[must_use]
    pub fn composed(&self) -> &[Step<'c>] {
        match self {
            Self::Matched(step) => step.composed(),
            Self::UponOutcome(_, inner) => inner.composed(),
            _ => &[],
        }
    }

    /// Perform the step while nothing has gone wrong.
    pub(crate) fn perform(&self, ctx: &StepContext<'_>) -> Performed {
        match self {
            Self::Matched(step) => step.perform(ctx),
            Self::Pending(step) => step.result(),
            Self::Ignorable(text) => StepResult::ignorable(text).into(),
            Self::Hook(step) => step.perform(ctx),
            Self::UponOutcome(Outcome::Failure, inner) => StepResult::skipped(inner.text()).into(),
            Self::UponOutcome(_, inner) => inner.perform(ctx),
        }
    }

    /// Account for the step after an earlier step failed or was pending.
    ///
    /// Hooks and after steps accepting a failure still run.
    pub(crate) fn do_not_perform(&self, ctx: &StepContext<'_>) -> Performed {
        match self {
            Self::Matched(step) => step
                .result(StepResult::not_performed(&step.text))
                .into(),
            Self::Pending(step) => StepResult::not_performed(&step.text)
                .with_parametrised(step.parametrised.clone())
                .into(),
            Self::Ignorable(text) => StepResult::ignorable(text).into(),
            Self::Hook(step) => step.perform(ctx),
            Self::UponOutcome(Outcome::Success, inner) => StepResult::skipped(inner.text()).into(),
            Self::UponOutcome(_, inner) => inner.perform(ctx),
        }
    }
}

/// Invoke a handler, translating returned errors and panics into a result.
fn outcome_of(text: &str, invoke: impl FnOnce() -> Result<(), StepError>) -> Performed {
    let error = match panic::catch_unwind(AssertUnwindSafe(invoke)) {
        Ok(Ok(())) => return StepResult::successful(text).into(),
        Ok(Err(error)) => error,
        Err(payload) => match payload.downcast::<StepSignal>() {
            Ok(signal) => StepError::from(*signal),
            Err(payload) => {
                let cause = ExecutionError::HandlerPanicked {
                    text: text.to_string(),
                    message: panic_message(payload.as_ref()),
                };
                return StepResult::failed(text, Arc::new(cause)).into();
            }
        },
    };
    let signal = match &error {
        StepError::RestartScenario(_) => Some(Signal::RestartScenario),
        StepError::RestartStory(_) => Some(Signal::RestartStory),
        StepError::IgnoringSteps(_) => Some(Signal::IgnoringSteps),
        _ => None,
    };
    let result = match ExecutionError::from_step_error(text, error) {
        None => StepResult::ignorable(text),
        Some(cause) if cause.is_pending() => StepResult::pending(text, Arc::new(cause)),
        Some(cause) => StepResult::failed(text, Arc::new(cause)),
    };
    Performed { result, signal }
}

#[cfg(test)]
mod tests;
