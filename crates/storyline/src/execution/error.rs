//! Errors raised by step handlers and the causes carried by step results.
//!
//! Handlers return [`StepError`]. Besides plain failures it carries the
//! control signals the runner acts upon: pending, restarts and ignoring the
//! remaining steps. A handler that cannot return early may instead panic with
//! a [`StepSignal`] through [`StepSignal::raise`].
//!
//! [`ExecutionError`] is the engine's own description of why a step did not
//! succeed. It is attached to every non-successful [`StepResult`] and handed
//! to reporters.
//!
//! [`StepResult`]: super::StepResult

use std::error::Error as StdError;
use std::panic;
use std::sync::Arc;

use thiserror::Error;

use crate::binding::ConversionError;
use crate::tree::LoadError;

/// Shared, thread-safe error produced by a step handler.
pub type HandlerError = Arc<dyn StdError + Send + Sync + 'static>;

/// Error returned by a step or hook handler.
///
/// # Examples
///
/// ```
/// use storyline::execution::StepError;
///
/// fn check(actual: i64, expected: i64) -> Result<(), StepError> {
///     if actual == expected {
///         Ok(())
///     } else {
///         Err(format!("expected {expected}, got {actual}").into())
///     }
/// }
///
/// assert!(check(8, 8).is_ok());
/// assert!(matches!(check(8, 9), Err(StepError::Failed(_))));
/// ```
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StepError {
    /// The step failed.
    #[error("{0}")]
    Failed(HandlerError),
    /// The step is not implemented yet.
    #[error("pending: {0}")]
    Pending(String),
    /// The current scenario should run again from its start.
    #[error("restart scenario: {0}")]
    RestartScenario(String),
    /// The current story should run again from its start.
    #[error("restart story: {0}")]
    RestartStory(String),
    /// The remaining steps of the scenario should be ignored.
    #[error("ignoring steps: {0}")]
    IgnoringSteps(String),
}

impl StepError {
    /// Wrap any error as a step failure.
    pub fn failed(error: impl StdError + Send + Sync + 'static) -> Self {
        Self::Failed(Arc::new(error))
    }
}

#[derive(Debug, Error)]
#[error("{0}")]
struct Message(String);

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::failed(Message(message))
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::from(message.to_string())
    }
}

impl From<ConversionError> for StepError {
    fn from(error: ConversionError) -> Self {
        Self::failed(error)
    }
}

/// Control signal carried by a panic payload.
///
/// Lets deeply nested handler code request pending, a restart or ignoring
/// without threading a [`StepError`] back to the step boundary.
///
/// # Examples
///
/// ```
/// use std::panic;
/// use storyline::execution::StepSignal;
///
/// let payload = panic::catch_unwind(|| {
///     StepSignal::Pending("wire the broker".into()).raise()
/// })
/// .expect_err("signal unwinds");
/// let signal = payload.downcast::<StepSignal>().expect("signal payload");
/// assert_eq!(*signal, StepSignal::Pending("wire the broker".into()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepSignal {
    /// Mark the step pending.
    Pending(String),
    /// Restart the current scenario.
    RestartScenario(String),
    /// Restart the current story.
    RestartStory(String),
    /// Ignore the remaining steps of the scenario.
    IgnoringSteps(String),
}

impl StepSignal {
    /// Unwind with this signal as the panic payload.
    #[track_caller]
    pub fn raise(self) -> ! {
        panic::resume_unwind(Box::new(self));
    }
}

impl From<StepSignal> for StepError {
    fn from(signal: StepSignal) -> Self {
        match signal {
            StepSignal::Pending(message) => Self::Pending(message),
            StepSignal::RestartScenario(message) => Self::RestartScenario(message),
            StepSignal::RestartStory(message) => Self::RestartStory(message),
            StepSignal::IgnoringSteps(message) => Self::IgnoringSteps(message),
        }
    }
}

/// Why a step did not succeed.
///
/// Causes are shared between the step result, the runner state and the
/// reporters, so they travel as `Arc<ExecutionError>`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ExecutionError {
    /// No candidate matched the step text.
    #[error("no step definition matches `{text}`")]
    StepNotFound {
        /// Text of the unmatched step.
        text: String,
    },
    /// An `And` step opened the step list.
    #[error("`{text}` has no preceding step to continue")]
    NoPreviousStep {
        /// Text of the `And` step.
        text: String,
    },
    /// Composite expansion went deeper than the catalogue allows.
    #[error("composite expansion of `{text}` exceeds depth {depth}")]
    CompositeTooDeep {
        /// Text of the step that would have been expanded.
        text: String,
        /// Configured maximum depth.
        depth: usize,
    },
    /// The candidate is declared pending.
    #[error("step definition for `{text}` is marked pending")]
    MarkedPending {
        /// Text of the step.
        text: String,
    },
    /// A handler parameter could not be bound.
    #[error("parameter `{name}` not found for `{text}`")]
    ParameterNotFound {
        /// Text of the step.
        text: String,
        /// Name or position of the parameter.
        name: String,
    },
    /// The handler signalled pending.
    #[error("`{text}` is pending: {message}")]
    PendingSignal {
        /// Text of the step.
        text: String,
        /// Message supplied by the handler.
        message: String,
    },
    /// The handler returned an error.
    #[error("`{text}` failed: {source}")]
    HandlerFailed {
        /// Text of the step.
        text: String,
        /// Error returned by the handler.
        #[source]
        source: HandlerError,
    },
    /// The handler panicked.
    #[error("`{text}` panicked: {message}")]
    HandlerPanicked {
        /// Text of the step.
        text: String,
        /// Panic message.
        message: String,
    },
    /// The handler asked to restart the scenario.
    #[error("`{text}` requested a scenario restart: {message}")]
    RestartScenario {
        /// Text of the step.
        text: String,
        /// Message supplied by the handler.
        message: String,
    },
    /// The handler asked to restart the story.
    #[error("`{text}` requested a story restart: {message}")]
    RestartStory {
        /// Text of the step.
        text: String,
        /// Message supplied by the handler.
        message: String,
    },
    /// A given story could not be loaded.
    #[error("given story `{path}` could not be loaded: {source}")]
    GivenStoryLoad {
        /// Path of the given story.
        path: String,
        /// Loader error.
        #[source]
        source: Arc<LoadError>,
    },
    /// The story was cancelled before the step ran.
    #[error("story cancelled")]
    Cancelled,
}

impl ExecutionError {
    /// Returns `true` for causes that leave the step pending rather than
    /// failed.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::execution::ExecutionError;
    ///
    /// let missing = ExecutionError::StepNotFound { text: "a value 5".into() };
    /// assert!(missing.is_pending());
    /// assert!(!ExecutionError::Cancelled.is_pending());
    /// ```
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            Self::StepNotFound { .. }
                | Self::NoPreviousStep { .. }
                | Self::CompositeTooDeep { .. }
                | Self::MarkedPending { .. }
                | Self::ParameterNotFound { .. }
                | Self::PendingSignal { .. }
        )
    }

    /// Convert a handler error for the step `text`.
    ///
    /// Restart and ignoring signals are not causes; callers handle them
    /// before reaching this conversion and receive `None` for them.
    #[must_use]
    pub fn from_step_error(text: &str, error: StepError) -> Option<Self> {
        let text = text.to_string();
        match error {
            StepError::Failed(source) => Some(Self::HandlerFailed { text, source }),
            StepError::Pending(message) => Some(Self::PendingSignal { text, message }),
            StepError::RestartScenario(message) => Some(Self::RestartScenario { text, message }),
            StepError::RestartStory(message) => Some(Self::RestartStory { text, message }),
            StepError::IgnoringSteps(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn string_errors_become_failures() {
        let error = StepError::from("expected 9, got 8");
        assert!(matches!(error, StepError::Failed(_)));
        assert_eq!(error.to_string(), "expected 9, got 8");
    }

    #[test]
    fn signals_convert_to_matching_errors() {
        let error = StepError::from(StepSignal::RestartStory("flaky".into()));
        assert!(matches!(error, StepError::RestartStory(ref m) if m == "flaky"));
    }

    #[test]
    fn handler_failure_keeps_its_source() {
        let cause = ExecutionError::from_step_error("Then the result is 9", "boom".into());
        let Some(cause) = cause else {
            panic!("failure should convert");
        };
        assert!(!cause.is_pending());
        assert!(StdError::source(&cause).is_some());
        assert!(cause.to_string().contains("Then the result is 9"));
    }

    #[test]
    fn ignoring_is_not_a_cause() {
        assert!(
            ExecutionError::from_step_error("x", StepError::IgnoringSteps("rest".into())).is_none()
        );
    }
}
