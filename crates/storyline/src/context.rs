//! Per-story run context.
//!
//! One [`RunContext`] exists per concurrently running top-level story. It
//! carries the story's reporter, the shared read-only run settings and the
//! story's failure tally down through the runner, in place of ambient
//! thread-local state.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use storyline_policy::PendingStepStrategy;

use crate::binding::ValueConverters;
use crate::config::{Configuration, StoryControls};
use crate::execution::{ExecutionError, StepContext, StepOutcome, StepResult};
use crate::model::MetaFilter;
use crate::reporting::StoryReporter;

/// Cancellation flag shared between a story and whoever may abandon it.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    /// A flag that is not set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the story to stop before its next step.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Failures and pending steps observed within one story.
#[derive(Debug, Clone, Default)]
pub(crate) struct Tally {
    pub(crate) failure: Option<Arc<ExecutionError>>,
    pub(crate) pending: bool,
}

impl Tally {
    pub(crate) fn absorb(&mut self, other: &Self) {
        if self.failure.is_none() {
            self.failure.clone_from(&other.failure);
        }
        self.pending |= other.pending;
    }
}

/// State threaded through the run of one top-level story.
pub struct RunContext<'a> {
    story_path: String,
    reporter: Arc<dyn StoryReporter>,
    converters: &'a ValueConverters,
    configuration: &'a Configuration,
    cancel: CancelFlag,
    tally: Tally,
}

impl<'a> RunContext<'a> {
    /// Context for the story at `story_path`.
    #[must_use]
    pub fn new(
        story_path: impl Into<String>,
        reporter: Arc<dyn StoryReporter>,
        converters: &'a ValueConverters,
        configuration: &'a Configuration,
        cancel: CancelFlag,
    ) -> Self {
        Self {
            story_path: story_path.into(),
            reporter,
            converters,
            configuration,
            cancel,
            tally: Tally::default(),
        }
    }

    /// Path of the top-level story.
    #[must_use]
    pub fn story_path(&self) -> &str {
        &self.story_path
    }

    /// Reporter receiving the story's events.
    #[must_use]
    pub fn reporter(&self) -> &dyn StoryReporter {
        self.reporter.as_ref()
    }

    /// Whether handlers are skipped.
    #[must_use]
    pub fn dry_run(&self) -> bool {
        self.configuration.dry_run
    }

    /// Filter the story's tree was built with.
    #[must_use]
    pub fn meta_filter(&self) -> &'a MetaFilter {
        &self.configuration.meta_filter
    }

    /// How pending steps affect the story.
    #[must_use]
    pub fn pending_step_strategy(&self) -> PendingStepStrategy {
        self.configuration.pending_step_strategy
    }

    /// Story walking switches.
    #[must_use]
    pub fn story_controls(&self) -> StoryControls {
        self.configuration.story_controls
    }

    /// Timeout bounding the story, if any.
    #[must_use]
    pub fn story_timeout(&self) -> Option<Duration> {
        self.configuration.story_timeout
    }

    /// Whether the story was asked to stop.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// The first failure recorded for the current story.
    #[must_use]
    pub fn failure(&self) -> Option<&Arc<ExecutionError>> {
        self.tally.failure.as_ref()
    }

    /// Whether a pending step was recorded for the current story.
    #[must_use]
    pub fn pending_found(&self) -> bool {
        self.tally.pending
    }

    pub(crate) fn step_context<'s>(
        &'s self,
        failure: Option<&'s Arc<ExecutionError>>,
    ) -> StepContext<'s> {
        StepContext {
            converters: self.converters,
            dry_run: self.configuration.dry_run,
            failure,
        }
    }

    /// Count a step result against the current story.
    pub(crate) fn record(&mut self, result: &StepResult) {
        match result.outcome() {
            StepOutcome::Failed if self.tally.failure.is_none() => {
                self.tally.failure = result.cause().cloned();
            }
            StepOutcome::Pending => self.tally.pending = true,
            _ => {}
        }
    }

    pub(crate) fn tally(&self) -> &Tally {
        &self.tally
    }

    /// Start counting a nested story, returning the enclosing tally.
    pub(crate) fn take_tally(&mut self) -> Tally {
        std::mem::take(&mut self.tally)
    }

    /// Restore the enclosing tally, returning the nested one.
    pub(crate) fn replace_tally(&mut self, outer: Tally) -> Tally {
        std::mem::replace(&mut self.tally, outer)
    }

    /// Merge a nested story's tally into the current one.
    pub(crate) fn absorb(&mut self, nested: &Tally) {
        self.tally.absorb(nested);
    }
}

impl std::fmt::Debug for RunContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("story_path", &self.story_path)
            .field("configuration", &self.configuration)
            .field("cancelled", &self.is_cancelled())
            .field("tally", &self.tally)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporting::RecordingReporter;
    use crate::reporting::ReporterFactory;

    fn context<'a>(converters: &'a ValueConverters, config: &'a Configuration) -> RunContext<'a> {
        let reporter = RecordingReporter::new().reporter_for("a.story");
        RunContext::new("a.story", reporter, converters, config, CancelFlag::new())
    }

    #[test]
    fn keeps_the_first_failure() {
        let converters = ValueConverters::default();
        let config = Configuration::default();
        let mut ctx = context(&converters, &config);
        let first = Arc::new(ExecutionError::Cancelled);
        ctx.record(&StepResult::failed("When one", Arc::clone(&first)));
        ctx.record(&StepResult::failed(
            "When two",
            Arc::new(ExecutionError::MarkedPending { text: "x".into() }),
        ));
        assert!(ctx.failure().is_some_and(|cause| Arc::ptr_eq(cause, &first)));
        assert!(!ctx.pending_found());
    }

    #[test]
    fn nested_tallies_merge_into_the_enclosing_story() {
        let converters = ValueConverters::default();
        let config = Configuration::default();
        let mut ctx = context(&converters, &config);
        let outer = ctx.take_tally();
        ctx.record(&StepResult::pending(
            "Given later",
            Arc::new(ExecutionError::MarkedPending {
                text: "Given later".into(),
            }),
        ));
        let nested = ctx.replace_tally(outer);
        assert!(!ctx.pending_found());
        ctx.absorb(&nested);
        assert!(ctx.pending_found());
    }

    #[test]
    fn cancel_flags_are_shared() {
        let flag = CancelFlag::new();
        let converters = ValueConverters::default();
        let config = Configuration::default();
        let reporter = RecordingReporter::new().reporter_for("a.story");
        let ctx = RunContext::new("a.story", reporter, &converters, &config, flag.clone());
        assert!(!ctx.is_cancelled());
        flag.cancel();
        assert!(ctx.is_cancelled());
    }
}
