//! Outcomes collected while stories run.

use storyline_policy::FailureMode;

use super::failures::{BatchFailures, RunError, StoryFailure};
use crate::execution::{StepOutcome, StepResult};

/// Final results of one scenario run: the whole scenario, or one examples
/// row of it.
#[derive(Debug, Clone)]
pub struct ScenarioOutcome {
    pub(crate) title: String,
    pub(crate) example: Option<usize>,
    pub(crate) excluded: bool,
    pub(crate) restarted: bool,
    pub(crate) given_stories: Vec<StoryOutcome>,
    pub(crate) steps: Vec<StepResult>,
}

impl ScenarioOutcome {
    pub(crate) fn excluded(title: &str) -> Self {
        Self {
            title: title.to_string(),
            example: None,
            excluded: true,
            restarted: false,
            given_stories: Vec::new(),
            steps: Vec::new(),
        }
    }

    /// Scenario title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Examples row index, when the run came from a row.
    #[must_use]
    pub fn example(&self) -> Option<usize> {
        self.example
    }

    /// Whether the meta filter excluded the scenario.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Whether a restart signal made the scenario run a second time.
    #[must_use]
    pub fn was_restarted(&self) -> bool {
        self.restarted
    }

    /// Outcomes of the scenario's given stories.
    #[must_use]
    pub fn given_stories(&self) -> &[StoryOutcome] {
        &self.given_stories
    }

    /// Reported step results of the final attempt, in order.
    #[must_use]
    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    /// Outcomes of [`Self::steps`].
    #[must_use]
    pub fn outcomes(&self) -> Vec<StepOutcome> {
        self.steps.iter().map(StepResult::outcome).collect()
    }

    /// Whether any step failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.steps
            .iter()
            .any(|step| step.outcome() == StepOutcome::Failed)
    }
}

/// Final results of one story.
#[derive(Debug, Clone)]
pub struct StoryOutcome {
    pub(crate) path: String,
    pub(crate) given: bool,
    pub(crate) excluded: bool,
    pub(crate) restarted: bool,
    pub(crate) cancelled: bool,
    pub(crate) before: Vec<StepResult>,
    pub(crate) given_stories: Vec<StoryOutcome>,
    pub(crate) scenarios: Vec<ScenarioOutcome>,
    pub(crate) after: Vec<StepResult>,
    pub(crate) failure: Option<StoryFailure>,
}

impl StoryOutcome {
    pub(crate) fn new(path: &str, given: bool) -> Self {
        Self {
            path: path.to_string(),
            given,
            excluded: false,
            restarted: false,
            cancelled: false,
            before: Vec::new(),
            given_stories: Vec::new(),
            scenarios: Vec::new(),
            after: Vec::new(),
            failure: None,
        }
    }

    /// A story that never ran, recorded with `failure`.
    pub(crate) fn not_run(path: &str, failure: StoryFailure) -> Self {
        Self {
            cancelled: matches!(failure, StoryFailure::Timeout { .. }),
            failure: Some(failure),
            ..Self::new(path, false)
        }
    }

    /// Story path.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Whether the story ran as a given story.
    #[must_use]
    pub fn is_given_story(&self) -> bool {
        self.given
    }

    /// Whether the meta filter excluded the story.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Whether a restart signal made the story run a second time.
    #[must_use]
    pub fn was_restarted(&self) -> bool {
        self.restarted
    }

    /// Whether the story was abandoned after its timeout.
    #[must_use]
    pub fn was_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Before-story step results, including failed story-level given
    /// stories.
    #[must_use]
    pub fn before_steps(&self) -> &[StepResult] {
        &self.before
    }

    /// Outcomes of the story-level given stories.
    #[must_use]
    pub fn given_stories(&self) -> &[StoryOutcome] {
        &self.given_stories
    }

    /// Scenario outcomes, one per scenario run.
    #[must_use]
    pub fn scenarios(&self) -> &[ScenarioOutcome] {
        &self.scenarios
    }

    /// After-story step results.
    #[must_use]
    pub fn after_steps(&self) -> &[StepResult] {
        &self.after
    }

    /// Why the story failed, if it did.
    #[must_use]
    pub fn failure(&self) -> Option<&StoryFailure> {
        self.failure.as_ref()
    }

    /// Whether the story failed.
    #[must_use]
    pub fn failed(&self) -> bool {
        self.failure.is_some()
    }
}

/// Outcomes of every dispatched top-level story, in dispatch order.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    pub(crate) stories: Vec<StoryOutcome>,
}

impl RunReport {
    /// Story outcomes in dispatch order.
    #[must_use]
    pub fn stories(&self) -> &[StoryOutcome] {
        &self.stories
    }

    /// The outcome of the story at `path`.
    #[must_use]
    pub fn story(&self, path: &str) -> Option<&StoryOutcome> {
        self.stories.iter().find(|story| story.path == path)
    }

    /// Failed stories with their failures, in dispatch order.
    pub fn failures(&self) -> impl Iterator<Item = (&str, &StoryFailure)> {
        self.stories
            .iter()
            .filter_map(|story| story.failure().map(|failure| (story.path(), failure)))
    }

    /// Whether every story passed.
    #[must_use]
    pub fn passed(&self) -> bool {
        self.failures().next().is_none()
    }

    /// Raise the run's failures according to `mode`.
    ///
    /// # Errors
    ///
    /// [`RunError::Story`] with the first failure in immediate mode,
    /// [`RunError::Batch`] with every failure in batch mode.
    pub fn into_result(self, mode: FailureMode) -> Result<Self, RunError> {
        let Some((path, failure)) = self
            .failures()
            .next()
            .map(|(path, failure)| (path.to_string(), failure.clone()))
        else {
            return Ok(self);
        };
        match mode {
            FailureMode::Immediate => Err(RunError::Story { path, failure }),
            FailureMode::Batch => Err(RunError::Batch(
                self.failures()
                    .map(|(path, failure)| (path.to_string(), failure.clone()))
                    .collect::<BatchFailures>(),
            )),
        }
    }
}
