//! Story failures and run errors.

use std::sync::Arc;
use std::time::Duration;

use derive_more::{Deref, From, IntoIterator};
use thiserror::Error;

use crate::execution::ExecutionError;
use crate::tree::LoadError;

/// Why a story is recorded as failed.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum StoryFailure {
    /// A step, hook or given story failed.
    #[error("{cause}")]
    StepFailed {
        /// The first failure observed in the story.
        #[source]
        cause: Arc<ExecutionError>,
    },
    /// The story has pending steps and pending steps fail stories.
    #[error("story has pending steps")]
    PendingStepsFound,
    /// The story exceeded its timeout and was abandoned.
    #[error("story timed out after {timeout:?}")]
    Timeout {
        /// The timeout that expired.
        timeout: Duration,
    },
    /// The story text could not be loaded.
    #[error("story could not be loaded: {source}")]
    Load {
        /// The loader error.
        #[source]
        source: Arc<LoadError>,
    },
    /// The thread running the story ended without an outcome.
    #[error("story runner failed: {message}")]
    RunnerFailed {
        /// What went wrong.
        message: String,
    },
}

/// Failures of a batch run keyed by story path, in dispatch order.
///
/// A path dispatched twice keeps one entry per run.
#[derive(Debug, Clone, Default, Deref, From, IntoIterator)]
#[into_iterator(owned, ref)]
pub struct BatchFailures(Vec<(String, StoryFailure)>);

impl BatchFailures {
    /// Paths of the failed stories, in dispatch order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(path, _)| path.as_str())
    }

    /// First failure recorded for `path`.
    #[must_use]
    pub fn failure(&self, path: &str) -> Option<&StoryFailure> {
        self.0
            .iter()
            .find_map(|(failed, failure)| (failed == path).then_some(failure))
    }
}

impl FromIterator<(String, StoryFailure)> for BatchFailures {
    fn from_iter<I: IntoIterator<Item = (String, StoryFailure)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Error raised at the end of a run with failed stories.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum RunError {
    /// Immediate mode: the first failed story.
    #[error("story `{path}` failed: {failure}")]
    Story {
        /// Path of the story.
        path: String,
        /// Its failure.
        #[source]
        failure: StoryFailure,
    },
    /// Batch mode: every failed story.
    #[error("{} stories failed: {}", .0.len(), .0.paths().collect::<Vec<_>>().join(", "))]
    Batch(BatchFailures),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_failures_keep_dispatch_order() {
        let failures: BatchFailures = [
            ("b.story".to_string(), StoryFailure::PendingStepsFound),
            (
                "a.story".to_string(),
                StoryFailure::Timeout {
                    timeout: Duration::from_secs(1),
                },
            ),
        ]
        .into_iter()
        .collect();
        assert_eq!(failures.paths().collect::<Vec<_>>(), ["b.story", "a.story"]);
        assert!(matches!(
            failures.failure("a.story"),
            Some(StoryFailure::Timeout { .. })
        ));
        assert!(failures.failure("c.story").is_none());
        assert_eq!(
            RunError::Batch(failures).to_string(),
            "2 stories failed: b.story, a.story"
        );
    }

    #[test]
    fn repeated_paths_keep_every_failure() {
        let failures: BatchFailures = ["a.story", "a.story"]
            .into_iter()
            .map(|path| (path.to_string(), StoryFailure::PendingStepsFound))
            .collect();
        assert_eq!(failures.len(), 2);
    }

    #[test]
    fn step_failures_display_their_cause() {
        let failure = StoryFailure::StepFailed {
            cause: Arc::new(ExecutionError::StepNotFound {
                text: "Given nothing".into(),
            }),
        };
        assert_eq!(
            failure.to_string(),
            ExecutionError::StepNotFound {
                text: "Given nothing".into()
            }
            .to_string()
        );
    }
}
