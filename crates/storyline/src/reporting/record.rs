//! In-memory recording of reporter events.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use super::{ReporterFactory, StoryReporter};
use crate::execution::ExecutionError;
use crate::model::{Meta, MetaFilter, Story};
use crate::table::NamedParameters;

/// One reporter callback, with causes rendered as text.
#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ReportEvent {
    /// A story or given story started.
    BeforeStory {
        /// Story path.
        path: String,
        /// Whether it runs as a given story.
        given: bool,
    },
    /// The story was excluded by the meta filter.
    StoryExcluded(String),
    /// The run is a dry run.
    DryRun,
    /// Given stories are about to run.
    BeforeGivenStories(Vec<String>),
    /// Given stories finished.
    AfterGivenStories,
    /// A scenario started.
    BeforeScenario(String),
    /// A scenario was excluded by the meta filter.
    ScenarioExcluded(String),
    /// An examples row started.
    Example(usize),
    /// A step is about to run.
    BeforeStep(String),
    /// A step succeeded.
    Successful(String),
    /// A step could not run.
    Pending {
        /// Step text.
        step: String,
        /// Rendered cause.
        cause: String,
    },
    /// A step was short-circuited.
    NotPerformed(String),
    /// A step failed.
    Failed {
        /// Step text.
        step: String,
        /// Rendered cause.
        cause: String,
    },
    /// A comment step, or a step after an ignoring signal.
    Ignorable(String),
    /// An after step whose outcome did not apply.
    Skipped(String),
    /// Constituents of a composite step follow.
    BeforeComposedSteps,
    /// Constituents of a composite step finished.
    AfterComposedSteps,
    /// A scenario attempt was restarted at the step.
    Restarted(String),
    /// A story attempt was restarted.
    RestartedStory(String),
    /// A story was cancelled after its timeout.
    StoryCancelled(String),
    /// A scenario finished, after all of its examples.
    AfterScenario,
    /// A story or given story finished.
    AfterStory {
        /// Whether it ran as a given story.
        given: bool,
    },
}

impl ReportEvent {
    /// The step outcome events, as `(label, step text)`, ignoring structure.
    #[must_use]
    pub fn step_outcome(&self) -> Option<(&'static str, &str)> {
        match self {
            Self::Successful(step) => Some(("successful", step)),
            Self::Pending { step, .. } => Some(("pending", step)),
            Self::NotPerformed(step) => Some(("not_performed", step)),
            Self::Failed { step, .. } => Some(("failed", step)),
            Self::Ignorable(step) => Some(("ignorable", step)),
            Self::Skipped(step) => Some(("skipped", step)),
            _ => None,
        }
    }
}

type Recorded = BTreeMap<String, Vec<ReportEvent>>;
type Events = Arc<Mutex<Recorded>>;

fn lock(events: &Mutex<Recorded>) -> MutexGuard<'_, Recorded> {
    match events.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Thread-safe recorder of events, grouped by top-level story path.
///
/// # Examples
///
/// ```
/// use storyline::reporting::{RecordingReporter, ReportEvent, ReporterFactory, StoryReporter};
///
/// let recorder = RecordingReporter::new();
/// recorder.reporter_for("a.story").successful("Given a value 5");
/// assert_eq!(
///     recorder.events("a.story"),
///     [ReportEvent::Successful("Given a value 5".into())]
/// );
/// ```
#[derive(Debug, Clone, Default)]
pub struct RecordingReporter {
    events: Events,
}

impl RecordingReporter {
    /// Empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded for the story at `path`, in order.
    #[must_use]
    pub fn events(&self, path: &str) -> Vec<ReportEvent> {
        lock(&self.events).get(path).cloned().unwrap_or_default()
    }

    /// Step outcome labels and texts recorded for the story at `path`.
    #[must_use]
    pub fn step_outcomes(&self, path: &str) -> Vec<(&'static str, String)> {
        self.events(path)
            .iter()
            .filter_map(ReportEvent::step_outcome)
            .map(|(label, step)| (label, step.to_string()))
            .collect()
    }

    /// Paths of every story with recorded events.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        lock(&self.events).keys().cloned().collect()
    }

    /// Remove and return every recorded event.
    #[must_use]
    pub fn drain(&self) -> Recorded {
        std::mem::take(&mut *lock(&self.events))
    }
}

impl ReporterFactory for RecordingReporter {
    fn reporter_for(&self, story_path: &str) -> Arc<dyn StoryReporter> {
        Arc::new(StoryRecording {
            path: story_path.to_string(),
            events: Arc::clone(&self.events),
        })
    }
}

/// Reporter appending to a [`RecordingReporter`] under one story path.
#[derive(Debug, Clone)]
pub struct StoryRecording {
    path: String,
    events: Events,
}

impl StoryRecording {
    fn push(&self, event: ReportEvent) {
        lock(&self.events)
            .entry(self.path.clone())
            .or_default()
            .push(event);
    }
}

impl StoryReporter for StoryRecording {
    fn before_story(&self, story: &Story, given: bool) {
        self.push(ReportEvent::BeforeStory {
            path: story.path().to_string(),
            given,
        });
    }
    fn story_excluded(&self, story: &Story, _filter: &MetaFilter) {
        self.push(ReportEvent::StoryExcluded(story.path().to_string()));
    }
    fn dry_run(&self) {
        self.push(ReportEvent::DryRun);
    }
    fn before_given_stories(&self, paths: &[&str]) {
        self.push(ReportEvent::BeforeGivenStories(
            paths.iter().map(ToString::to_string).collect(),
        ));
    }
    fn after_given_stories(&self) {
        self.push(ReportEvent::AfterGivenStories);
    }
    fn before_scenario(&self, title: &str, _meta: &Meta) {
        self.push(ReportEvent::BeforeScenario(title.to_string()));
    }
    fn scenario_excluded(&self, title: &str, _filter: &MetaFilter) {
        self.push(ReportEvent::ScenarioExcluded(title.to_string()));
    }
    fn example(&self, index: usize, _row: &NamedParameters) {
        self.push(ReportEvent::Example(index));
    }
    fn before_step(&self, step: &str) {
        self.push(ReportEvent::BeforeStep(step.to_string()));
    }
    fn successful(&self, step: &str) {
        self.push(ReportEvent::Successful(step.to_string()));
    }
    fn pending(&self, step: &str, cause: &Arc<ExecutionError>) {
        self.push(ReportEvent::Pending {
            step: step.to_string(),
            cause: cause.to_string(),
        });
    }
    fn not_performed(&self, step: &str) {
        self.push(ReportEvent::NotPerformed(step.to_string()));
    }
    fn failed(&self, step: &str, cause: &Arc<ExecutionError>) {
        self.push(ReportEvent::Failed {
            step: step.to_string(),
            cause: cause.to_string(),
        });
    }
    fn ignorable(&self, step: &str) {
        self.push(ReportEvent::Ignorable(step.to_string()));
    }
    fn skipped(&self, step: &str) {
        self.push(ReportEvent::Skipped(step.to_string()));
    }
    fn before_composed_steps(&self) {
        self.push(ReportEvent::BeforeComposedSteps);
    }
    fn after_composed_steps(&self) {
        self.push(ReportEvent::AfterComposedSteps);
    }
    fn restarted(&self, step: &str, _cause: &Arc<ExecutionError>) {
        self.push(ReportEvent::Restarted(step.to_string()));
    }
    fn restarted_story(&self, story: &Story, _cause: &Arc<ExecutionError>) {
        self.push(ReportEvent::RestartedStory(story.path().to_string()));
    }
    fn story_cancelled(&self, story: &Story, _timeout: Duration) {
        self.push(ReportEvent::StoryCancelled(story.path().to_string()));
    }
    fn after_scenario(&self) {
        self.push(ReportEvent::AfterScenario);
    }
    fn after_story(&self, given: bool) {
        self.push(ReportEvent::AfterStory { given });
    }
}
