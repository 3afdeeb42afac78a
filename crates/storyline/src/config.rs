//! Run configuration.
//!
//! Settings come from builder methods or from environment variables prefixed
//! with `STORYLINE_`:
//!
//! - `STORYLINE_THREADS`: worker threads, at least one
//! - `STORYLINE_STORY_TIMEOUT_SECS`: per-story timeout in seconds
//! - `STORYLINE_FAILURE_MODE`: `immediate` or `batch`
//! - `STORYLINE_FAIL_ON_PENDING`: boolean, pending steps fail their story
//! - `STORYLINE_DRY_RUN`: boolean, match and report without running handlers
//! - `STORYLINE_META_FILTER`: meta filter expression such as `+theme smoke`
//! - `STORYLINE_SKIP_SCENARIOS_AFTER_FAILURE`: boolean, see [`StoryControls`]
//! - `STORYLINE_SKIP_STORY_IF_GIVEN_STORY_FAILED`: boolean
//! - `STORYLINE_META_BY_ROW`: boolean
//! - `STORYLINE_SKIP_SCENARIO_HOOKS_IN_GIVEN_STORIES`: boolean
//!
//! Invalid values are logged and ignored.

use std::env;
use std::time::Duration;

use log::warn;
use storyline_policy::{FailureMode, PendingStepStrategy};

use crate::model::MetaFilter;

const THREADS: &str = "STORYLINE_THREADS";
const STORY_TIMEOUT_SECS: &str = "STORYLINE_STORY_TIMEOUT_SECS";
const FAILURE_MODE: &str = "STORYLINE_FAILURE_MODE";
const FAIL_ON_PENDING: &str = "STORYLINE_FAIL_ON_PENDING";
const DRY_RUN: &str = "STORYLINE_DRY_RUN";
const META_FILTER: &str = "STORYLINE_META_FILTER";
const SKIP_SCENARIOS_AFTER_FAILURE: &str = "STORYLINE_SKIP_SCENARIOS_AFTER_FAILURE";
const SKIP_STORY_IF_GIVEN_STORY_FAILED: &str = "STORYLINE_SKIP_STORY_IF_GIVEN_STORY_FAILED";
const META_BY_ROW: &str = "STORYLINE_META_BY_ROW";
const SKIP_SCENARIO_HOOKS_IN_GIVEN_STORIES: &str = "STORYLINE_SKIP_SCENARIO_HOOKS_IN_GIVEN_STORIES";

fn parse_env_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Switches changing how stories and their scenarios are walked.
///
/// Every switch is off by default.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoryControls {
    /// Once a story has failed, its remaining scenarios are not run.
    pub skip_scenarios_after_failure: bool,
    /// A story whose before steps or given stories failed runs no scenarios.
    /// Its after steps still run.
    pub skip_story_if_given_story_failed: bool,
    /// An example row's `Meta:` column is parsed as meta for that row, and
    /// rows the meta filter excludes are dropped.
    pub meta_by_row: bool,
    /// Catalogue before- and after-scenario hooks are left out of given
    /// stories.
    pub skip_before_and_after_scenario_steps_if_given_story: bool,
}

/// Settings shared by every story of a run.
#[derive(Debug, Clone)]
pub struct Configuration {
    /// Worker threads running stories concurrently.
    pub threads: usize,
    /// Wall-clock bound per top-level story.
    pub story_timeout: Option<Duration>,
    /// How story failures surface at the end of the run.
    pub failure_mode: FailureMode,
    /// Whether pending steps fail their story.
    pub pending_step_strategy: PendingStepStrategy,
    /// Report every step as matched without invoking handlers.
    pub dry_run: bool,
    /// Filter selecting stories and scenarios by meta.
    pub meta_filter: MetaFilter,
    /// Story walking switches.
    pub story_controls: StoryControls,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            threads: 1,
            story_timeout: None,
            failure_mode: FailureMode::default(),
            pending_step_strategy: PendingStepStrategy::default(),
            dry_run: false,
            meta_filter: MetaFilter::empty(),
            story_controls: StoryControls::default(),
        }
    }
}

impl Configuration {
    /// Defaults overridden by the `STORYLINE_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Defaults overridden by values `lookup` returns for each variable name.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::Configuration;
    /// use storyline_policy::FailureMode;
    ///
    /// let config = Configuration::from_lookup(|name| match name {
    ///     "STORYLINE_THREADS" => Some("4".into()),
    ///     "STORYLINE_FAILURE_MODE" => Some("batch".into()),
    ///     _ => None,
    /// });
    /// assert_eq!(config.threads, 4);
    /// assert_eq!(config.failure_mode, FailureMode::Batch);
    /// ```
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(value) = lookup(THREADS) {
            match value.trim().parse::<usize>() {
                Ok(threads) if threads > 0 => config.threads = threads,
                _ => warn!("ignoring {THREADS}={value}: expected a positive integer"),
            }
        }
        if let Some(value) = lookup(STORY_TIMEOUT_SECS) {
            match value.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => config.story_timeout = Some(Duration::from_secs(secs)),
                _ => warn!("ignoring {STORY_TIMEOUT_SECS}={value}: expected a positive integer"),
            }
        }
        if let Some(value) = lookup(FAILURE_MODE) {
            match value.parse() {
                Ok(mode) => config.failure_mode = mode,
                Err(err) => warn!("ignoring {FAILURE_MODE}: {err}"),
            }
        }
        if let Some(value) = lookup(FAIL_ON_PENDING) {
            match parse_env_bool(&value) {
                Some(true) => config.pending_step_strategy = PendingStepStrategy::Failing,
                Some(false) => config.pending_step_strategy = PendingStepStrategy::Passing,
                None => warn!("ignoring {FAIL_ON_PENDING}={value}: expected a boolean"),
            }
        }
        if let Some(value) = lookup(DRY_RUN) {
            match parse_env_bool(&value) {
                Some(dry_run) => config.dry_run = dry_run,
                None => warn!("ignoring {DRY_RUN}={value}: expected a boolean"),
            }
        }
        if let Some(value) = lookup(META_FILTER) {
            config.meta_filter = MetaFilter::parse(&value);
        }
        let controls = &mut config.story_controls;
        for (name, switch) in [
            (
                SKIP_SCENARIOS_AFTER_FAILURE,
                &mut controls.skip_scenarios_after_failure,
            ),
            (
                SKIP_STORY_IF_GIVEN_STORY_FAILED,
                &mut controls.skip_story_if_given_story_failed,
            ),
            (META_BY_ROW, &mut controls.meta_by_row),
            (
                SKIP_SCENARIO_HOOKS_IN_GIVEN_STORIES,
                &mut controls.skip_before_and_after_scenario_steps_if_given_story,
            ),
        ] {
            let Some(value) = lookup(name) else { continue };
            match parse_env_bool(&value) {
                Some(on) => *switch = on,
                None => warn!("ignoring {name}={value}: expected a boolean"),
            }
        }
        config
    }

    /// Use `threads` workers; zero is raised to one.
    #[must_use]
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Bound every top-level story by `timeout`.
    #[must_use]
    pub fn with_story_timeout(mut self, timeout: Duration) -> Self {
        self.story_timeout = Some(timeout);
        self
    }

    /// Surface story failures according to `mode`.
    #[must_use]
    pub fn with_failure_mode(mut self, mode: FailureMode) -> Self {
        self.failure_mode = mode;
        self
    }

    /// Treat pending steps according to `strategy`.
    #[must_use]
    pub fn with_pending_step_strategy(mut self, strategy: PendingStepStrategy) -> Self {
        self.pending_step_strategy = strategy;
        self
    }

    /// Enable or disable dry runs.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Select stories and scenarios with `filter`.
    #[must_use]
    pub fn with_meta_filter(mut self, filter: MetaFilter) -> Self {
        self.meta_filter = filter;
        self
    }

    /// Walk stories according to `controls`.
    #[must_use]
    pub fn with_story_controls(mut self, controls: StoryControls) -> Self {
        self.story_controls = controls;
        self
    }
}
