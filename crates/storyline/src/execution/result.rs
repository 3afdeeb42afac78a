//! Terminal results of performed steps.

use std::fmt;
use std::sync::Arc;

use super::ExecutionError;
use crate::reporting::StoryReporter;

/// Terminal outcome of one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "diagnostics", derive(serde::Serialize))]
#[cfg_attr(feature = "diagnostics", serde(rename_all = "snake_case"))]
pub enum StepOutcome {
    /// The step ran and succeeded.
    Successful,
    /// The step could not run: unmatched, unbound or signalled pending.
    Pending,
    /// The step was short-circuited after an earlier problem.
    NotPerformed,
    /// The step ran and failed.
    Failed,
    /// The step is a comment or follows an ignoring signal.
    Ignorable,
    /// An outcome-restricted after step whose condition did not hold.
    Skipped,
}

impl StepOutcome {
    /// Lowercase label used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Successful => "successful",
            Self::Pending => "pending",
            Self::NotPerformed => "not_performed",
            Self::Failed => "failed",
            Self::Ignorable => "ignorable",
            Self::Skipped => "skipped",
        }
    }

    /// Whether the outcome interrupts the rest of the scenario.
    #[must_use]
    pub const fn interrupts(self) -> bool {
        matches!(self, Self::Pending | Self::Failed)
    }
}

impl fmt::Display for StepOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of performing, or declining to perform, one step.
#[derive(Debug, Clone)]
pub struct StepResult {
    text: String,
    parametrised: Option<String>,
    outcome: StepOutcome,
    cause: Option<Arc<ExecutionError>>,
}

impl StepResult {
    fn new(text: &str, outcome: StepOutcome, cause: Option<Arc<ExecutionError>>) -> Self {
        Self {
            text: text.to_string(),
            parametrised: None,
            outcome,
            cause,
        }
    }

    /// A successful step.
    #[must_use]
    pub fn successful(text: &str) -> Self {
        Self::new(text, StepOutcome::Successful, None)
    }

    /// A pending step with the reason it could not run.
    #[must_use]
    pub fn pending(text: &str, cause: Arc<ExecutionError>) -> Self {
        Self::new(text, StepOutcome::Pending, Some(cause))
    }

    /// A short-circuited step.
    #[must_use]
    pub fn not_performed(text: &str) -> Self {
        Self::new(text, StepOutcome::NotPerformed, None)
    }

    /// A failed step.
    #[must_use]
    pub fn failed(text: &str, cause: Arc<ExecutionError>) -> Self {
        Self::new(text, StepOutcome::Failed, Some(cause))
    }

    /// An ignorable step.
    #[must_use]
    pub fn ignorable(text: &str) -> Self {
        Self::new(text, StepOutcome::Ignorable, None)
    }

    /// A skipped after step.
    #[must_use]
    pub fn skipped(text: &str) -> Self {
        Self::new(text, StepOutcome::Skipped, None)
    }

    /// Attach the step text with example values substituted.
    #[must_use]
    pub fn with_parametrised(mut self, parametrised: Option<String>) -> Self {
        self.parametrised = parametrised;
        self
    }

    /// Declared step text.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Step text with example values substituted, when they differ.
    #[must_use]
    pub fn parametrised(&self) -> Option<&str> {
        self.parametrised.as_deref()
    }

    /// Text reporters show: the parametrised text when present.
    #[must_use]
    pub fn display_text(&self) -> &str {
        self.parametrised.as_deref().unwrap_or(&self.text)
    }

    /// Terminal outcome.
    #[must_use]
    pub fn outcome(&self) -> StepOutcome {
        self.outcome
    }

    /// Why the step did not succeed.
    #[must_use]
    pub fn cause(&self) -> Option<&Arc<ExecutionError>> {
        self.cause.as_ref()
    }

    /// Forward the result to the callback matching its outcome.
    pub fn describe_to(&self, reporter: &dyn StoryReporter) {
        let text = self.display_text();
        match (self.outcome, &self.cause) {
            (StepOutcome::Successful, _) => reporter.successful(text),
            (StepOutcome::Pending, Some(cause)) => reporter.pending(text, cause),
            (StepOutcome::Failed, Some(cause)) => reporter.failed(text, cause),
            (StepOutcome::Pending | StepOutcome::Failed | StepOutcome::NotPerformed, _) => {
                reporter.not_performed(text);
            }
            (StepOutcome::Ignorable, _) => reporter.ignorable(text),
            (StepOutcome::Skipped, _) => reporter.skipped(text),
        }
    }
}
