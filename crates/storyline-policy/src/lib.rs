//! Shared execution policy types for storyline.
//!
//! This crate centralizes the runtime policy enums so the engine, its
//! configuration layer and embedding applications agree on a single,
//! canonical definition.

use std::fmt;
use std::str::FromStr;

/// How a step without a matching candidate (or one signalling pending)
/// affects the outcome of its story.
///
/// # Examples
///
/// ```
/// use storyline_policy::PendingStepStrategy;
///
/// let strategy = PendingStepStrategy::default();
/// assert!(!strategy.fails_story());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PendingStepStrategy {
    /// Pending steps are reported but the story still passes (default).
    #[default]
    Passing,
    /// A story containing pending steps is recorded as failed.
    Failing,
}

impl PendingStepStrategy {
    /// Returns `true` if pending steps turn the story into a failure.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline_policy::PendingStepStrategy;
    ///
    /// assert!(!PendingStepStrategy::Passing.fails_story());
    /// assert!(PendingStepStrategy::Failing.fails_story());
    /// ```
    #[must_use]
    pub const fn fails_story(self) -> bool {
        matches!(self, Self::Failing)
    }
}

/// How story failures propagate out of a run.
///
/// # Examples
///
/// ```
/// use storyline_policy::FailureMode;
///
/// assert_eq!(FailureMode::default(), FailureMode::Immediate);
/// assert!(FailureMode::Immediate.stops_on_failure());
/// assert!(!FailureMode::Batch.stops_on_failure());
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailureMode {
    /// The first failing story stops the scheduling of further stories and
    /// its failure is raised once in-flight stories finish (default).
    #[default]
    Immediate,
    /// Every story runs; all failures are raised together, keyed by path.
    Batch,
}

impl FailureMode {
    /// Returns `true` if a failing story stops the run.
    #[must_use]
    pub const fn stops_on_failure(self) -> bool {
        matches!(self, Self::Immediate)
    }

    /// Lowercase label used in configuration values.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::Batch => "batch",
        }
    }
}

impl fmt::Display for FailureMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a [`FailureMode`] label is not recognised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureModeParseError(pub String);

impl fmt::Display for FailureModeParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid failure mode: {} (expected immediate or batch)", self.0)
    }
}

impl std::error::Error for FailureModeParseError {}

impl FromStr for FailureMode {
    type Err = FailureModeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("immediate") {
            Ok(Self::Immediate)
        } else if trimmed.eq_ignore_ascii_case("batch") {
            Ok(Self::Batch)
        } else {
            Err(FailureModeParseError(trimmed.to_string()))
        }
    }
}
