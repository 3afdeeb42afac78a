//! Reporter callbacks emitted while stories run.
//!
//! The runner drives a [`StoryReporter`] in strict execution order. Reporters
//! are sinks only: the engine never queries them. Every declared step yields
//! exactly one of `successful`, `pending`, `not_performed`, `failed`,
//! `ignorable` or `skipped`.
//!
//! Stories run concurrently, so reporters are obtained per story from a
//! [`ReporterFactory`]. Any `Fn(&str) -> Arc<dyn StoryReporter>` closure is a
//! factory; [`RecordingReporter`] is one that keeps every event for later
//! inspection.

#[cfg(feature = "diagnostics")]
mod json;
mod record;

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info, warn};

use crate::execution::ExecutionError;
use crate::model::{Meta, MetaFilter, Narrative, Story};
use crate::table::NamedParameters;

pub use record::{RecordingReporter, ReportEvent, StoryRecording};

/// Receives lifecycle and per-step callbacks for one story.
///
/// Every method defaults to doing nothing so implementors override only the
/// events they care about.
pub trait StoryReporter: Send + Sync {
    /// A story, or a given story when `given` is set, is about to run.
    fn before_story(&self, _story: &Story, _given: bool) {}

    /// The meta filter excluded the story.
    fn story_excluded(&self, _story: &Story, _filter: &MetaFilter) {}

    /// Steps are matched and reported but no handler runs.
    fn dry_run(&self) {}

    /// The story's narrative.
    fn narrative(&self, _narrative: &Narrative) {}

    /// Given stories with these paths are about to run.
    fn before_given_stories(&self, _paths: &[&str]) {}

    /// The given stories finished.
    fn after_given_stories(&self) {}

    /// A scenario is about to run.
    fn before_scenario(&self, _title: &str, _meta: &Meta) {}

    /// The meta filter excluded the scenario.
    fn scenario_excluded(&self, _title: &str, _filter: &MetaFilter) {}

    /// The scenario runs once more with the values of examples row `index`.
    fn example(&self, _index: usize, _row: &NamedParameters) {}

    /// A step is about to run.
    fn before_step(&self, _step: &str) {}

    /// The step succeeded.
    fn successful(&self, _step: &str) {}

    /// The step could not run.
    fn pending(&self, _step: &str, _cause: &Arc<ExecutionError>) {}

    /// The step was short-circuited after an earlier problem.
    fn not_performed(&self, _step: &str) {}

    /// The step failed.
    fn failed(&self, _step: &str, _cause: &Arc<ExecutionError>) {}

    /// The step is a comment or follows an ignoring signal.
    fn ignorable(&self, _step: &str) {}

    /// An outcome-restricted after step did not apply.
    fn skipped(&self, _step: &str) {}

    /// The constituents of the composite step just reported follow.
    fn before_composed_steps(&self) {}

    /// The constituents of a composite step finished.
    fn after_composed_steps(&self) {}

    /// The scenario attempt was abandoned and runs again.
    fn restarted(&self, _step: &str, _cause: &Arc<ExecutionError>) {}

    /// The story attempt was abandoned and runs again.
    fn restarted_story(&self, _story: &Story, _cause: &Arc<ExecutionError>) {}

    /// The story exceeded its timeout and was abandoned.
    fn story_cancelled(&self, _story: &Story, _timeout: Duration) {}

    /// The scenario finished, after all of its examples.
    fn after_scenario(&self) {}

    /// The story, or a given story when `given` is set, finished.
    fn after_story(&self, _given: bool) {}
}

/// Supplies the reporter used for one top-level story.
pub trait ReporterFactory: Send + Sync {
    /// Reporter receiving the events of the story at `story_path`, including
    /// the events of its given stories.
    fn reporter_for(&self, story_path: &str) -> Arc<dyn StoryReporter>;
}

impl<F> ReporterFactory for F
where
    F: Fn(&str) -> Arc<dyn StoryReporter> + Send + Sync,
{
    fn reporter_for(&self, story_path: &str) -> Arc<dyn StoryReporter> {
        self(story_path)
    }
}

/// Reporter writing every callback to the `log` facade.
///
/// Step outcomes log at `info`, failures and pending steps at `warn`,
/// structural events at `debug`.
#[derive(Debug, Clone)]
pub struct LoggingReporter {
    path: String,
}

impl LoggingReporter {
    /// Reporter tagging its records with `story_path`.
    #[must_use]
    pub fn new(story_path: impl Into<String>) -> Self {
        Self {
            path: story_path.into(),
        }
    }

    /// Factory handing a logging reporter to every story.
    #[must_use]
    pub fn factory() -> impl ReporterFactory {
        |path: &str| -> Arc<dyn StoryReporter> { Arc::new(Self::new(path)) }
    }
}

impl StoryReporter for LoggingReporter {
    fn before_story(&self, story: &Story, given: bool) {
        let kind = if given { "given story" } else { "story" };
        info!("[{}] {kind} `{}`", self.path, story.path());
    }

    fn story_excluded(&self, story: &Story, filter: &MetaFilter) {
        info!("[{}] story `{}` excluded by `{filter}`", self.path, story.path());
    }

    fn dry_run(&self) {
        info!("[{}] dry run", self.path);
    }

    fn before_given_stories(&self, paths: &[&str]) {
        debug!("[{}] given stories: {}", self.path, paths.join(", "));
    }

    fn before_scenario(&self, title: &str, _meta: &Meta) {
        info!("[{}] scenario `{title}`", self.path);
    }

    fn scenario_excluded(&self, title: &str, filter: &MetaFilter) {
        info!("[{}] scenario `{title}` excluded by `{filter}`", self.path);
    }

    fn example(&self, index: usize, row: &NamedParameters) {
        debug!("[{}] example {index}: {row:?}", self.path);
    }

    fn successful(&self, step: &str) {
        info!("[{}] {step}", self.path);
    }

    fn pending(&self, step: &str, cause: &Arc<ExecutionError>) {
        warn!("[{}] {step} (PENDING: {cause})", self.path);
    }

    fn not_performed(&self, step: &str) {
        info!("[{}] {step} (NOT PERFORMED)", self.path);
    }

    fn failed(&self, step: &str, cause: &Arc<ExecutionError>) {
        warn!("[{}] {step} (FAILED: {cause})", self.path);
    }

    fn ignorable(&self, step: &str) {
        debug!("[{}] {step}", self.path);
    }

    fn skipped(&self, step: &str) {
        debug!("[{}] {step} (SKIPPED)", self.path);
    }

    fn restarted(&self, step: &str, cause: &Arc<ExecutionError>) {
        warn!("[{}] scenario restarted at `{step}`: {cause}", self.path);
    }

    fn restarted_story(&self, story: &Story, cause: &Arc<ExecutionError>) {
        warn!("[{}] story `{}` restarted: {cause}", self.path, story.path());
    }

    fn story_cancelled(&self, story: &Story, timeout: Duration) {
        warn!(
            "[{}] story `{}` cancelled after {timeout:?}",
            self.path,
            story.path()
        );
    }
}

/// Fans every callback out to several reporters, in order.
#[derive(Default, Clone)]
pub struct CompositeReporter {
    reporters: Vec<Arc<dyn StoryReporter>>,
}

impl CompositeReporter {
    /// Reporter delegating to `reporters`.
    #[must_use]
    pub fn new(reporters: impl IntoIterator<Item = Arc<dyn StoryReporter>>) -> Self {
        Self {
            reporters: reporters.into_iter().collect(),
        }
    }

    fn each(&self, callback: impl Fn(&dyn StoryReporter)) {
        for reporter in &self.reporters {
            callback(reporter.as_ref());
        }
    }
}

impl std::fmt::Debug for CompositeReporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeReporter")
            .field("reporters", &self.reporters.len())
            .finish()
    }
}

impl StoryReporter for CompositeReporter {
    fn before_story(&self, story: &Story, given: bool) {
        self.each(|r| r.before_story(story, given));
    }
    fn story_excluded(&self, story: &Story, filter: &MetaFilter) {
        self.each(|r| r.story_excluded(story, filter));
    }
    fn dry_run(&self) {
        self.each(|r| r.dry_run());
    }
    fn narrative(&self, narrative: &Narrative) {
        self.each(|r| r.narrative(narrative));
    }
    fn before_given_stories(&self, paths: &[&str]) {
        self.each(|r| r.before_given_stories(paths));
    }
    fn after_given_stories(&self) {
        self.each(|r| r.after_given_stories());
    }
    fn before_scenario(&self, title: &str, meta: &Meta) {
        self.each(|r| r.before_scenario(title, meta));
    }
    fn scenario_excluded(&self, title: &str, filter: &MetaFilter) {
        self.each(|r| r.scenario_excluded(title, filter));
    }
    fn example(&self, index: usize, row: &NamedParameters) {
        self.each(|r| r.example(index, row));
    }
    fn before_step(&self, step: &str) {
        self.each(|r| r.before_step(step));
    }
    fn successful(&self, step: &str) {
        self.each(|r| r.successful(step));
    }
    fn pending(&self, step: &str, cause: &Arc<ExecutionError>) {
        self.each(|r| r.pending(step, cause));
    }
    fn not_performed(&self, step: &str) {
        self.each(|r| r.not_performed(step));
    }
    fn failed(&self, step: &str, cause: &Arc<ExecutionError>) {
        self.each(|r| r.failed(step, cause));
    }
    fn ignorable(&self, step: &str) {
        self.each(|r| r.ignorable(step));
    }
    fn skipped(&self, step: &str) {
        self.each(|r| r.skipped(step));
    }
    fn before_composed_steps(&self) {
        self.each(|r| r.before_composed_steps());
    }
    fn after_composed_steps(&self) {
        self.each(|r| r.after_composed_steps());
    }
    fn restarted(&self, step: &str, cause: &Arc<ExecutionError>) {
        self.each(|r| r.restarted(step, cause));
    }
    fn restarted_story(&self, story: &Story, cause: &Arc<ExecutionError>) {
        self.each(|r| r.restarted_story(story, cause));
    }
    fn story_cancelled(&self, story: &Story, timeout: Duration) {
        self.each(|r| r.story_cancelled(story, timeout));
    }
    fn after_scenario(&self) {
        self.each(|r| r.after_scenario());
    }
    fn after_story(&self, given: bool) {
        self.each(|r| r.after_story(given));
    }
}
