//! Worker pool dispatching top-level stories.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use log::{debug, error, warn};

use super::failures::{RunError, StoryFailure};
use super::outcome::{RunReport, StoryOutcome};
use super::StoryRunner;
use crate::binding::ValueConverters;
use crate::config::Configuration;
use crate::context::{CancelFlag, RunContext};
use crate::model::Story;
use crate::panic::panic_message;
use crate::parser::StoryParser;
use crate::registry::Catalogue;
use crate::reporting::{LoggingReporter, ReporterFactory, StoryReporter};
use crate::table::TableFactory;
use crate::tree::{StoryLoader, TreeBuilder};

/// Stops an [`Embedder`] from dispatching further stories.
///
/// Stories already running finish normally.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    /// Request that no new story is dispatched.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether a stop was requested.
    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Loads, builds and runs top-level stories on a pool of worker threads.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use storyline::{CandidateStep, Catalogue, Embedder, InMemoryStories};
///
/// let catalogue = Catalogue::new()
///     .with(CandidateStep::given("a stock of $symbol").build()?)
///     .with(CandidateStep::then("the alert is $status").build()?);
/// let stories = InMemoryStories::new()
///     .with("alerts.story", "Scenario: s1\nGiven a stock of STK1\nThen the alert is OFF");
/// let embedder = Embedder::new(Arc::new(catalogue), Arc::new(stories));
/// let report = embedder.run_stories(&["alerts.story"])?;
/// assert!(report.passed());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct Embedder {
    catalogue: Arc<Catalogue>,
    parser: Arc<StoryParser>,
    loader: Arc<dyn StoryLoader>,
    converters: Arc<ValueConverters>,
    reporters: Arc<dyn ReporterFactory>,
    configuration: Arc<Configuration>,
    stop: StopHandle,
}

impl Embedder {
    /// Embedder matching against `catalogue` and loading through `loader`,
    /// with the default parser, converters, configuration and a logging
    /// reporter. Examples tables given by path load through `loader` too.
    #[must_use]
    pub fn new(catalogue: Arc<Catalogue>, loader: Arc<dyn StoryLoader>) -> Self {
        let tables = TableFactory::default().with_loader(Arc::clone(&loader));
        Self {
            catalogue,
            parser: Arc::new(StoryParser::default().with_table_factory(tables)),
            loader,
            converters: Arc::new(ValueConverters::default()),
            reporters: Arc::new(LoggingReporter::factory()),
            configuration: Arc::new(Configuration::default()),
            stop: StopHandle::default(),
        }
    }

    /// Parse stories with `parser`.
    #[must_use]
    pub fn with_parser(mut self, parser: StoryParser) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    /// Convert parameters with `converters`.
    #[must_use]
    pub fn with_converters(mut self, converters: ValueConverters) -> Self {
        self.converters = Arc::new(converters);
        self
    }

    /// Report through reporters made by `factory`.
    #[must_use]
    pub fn with_reporters(mut self, factory: impl ReporterFactory + 'static) -> Self {
        self.reporters = Arc::new(factory);
        self
    }

    /// Run with `configuration`.
    #[must_use]
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configuration = Arc::new(configuration);
        self
    }

    /// The run configuration.
    #[must_use]
    pub fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Handle stopping further dispatch.
    #[must_use]
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run the stories at `paths` and raise their failures according to the
    /// configured failure mode.
    ///
    /// # Errors
    ///
    /// [`RunError`] when at least one story failed.
    pub fn run_stories<P: AsRef<str> + Sync>(&self, paths: &[P]) -> Result<RunReport, RunError> {
        self.execute(paths).into_result(self.configuration.failure_mode)
    }

    /// Run the stories at `paths`, returning every outcome.
    ///
    /// In immediate mode no story is dispatched after one has failed.
    #[must_use]
    pub fn execute<P: AsRef<str> + Sync>(&self, paths: &[P]) -> RunReport {
        let workers = self.configuration.threads.clamp(1, paths.len().max(1));
        debug!("running {} stories on {workers} workers", paths.len());
        let next = AtomicUsize::new(0);
        let halted = AtomicBool::new(false);
        let (tx, rx) = mpsc::channel();
        thread::scope(|scope| {
            for _ in 0..workers {
                let tx = tx.clone();
                let (next, halted) = (&next, &halted);
                scope.spawn(move || {
                    while !self.stop.is_stopped() && !halted.load(Ordering::SeqCst) {
                        let index = next.fetch_add(1, Ordering::SeqCst);
                        let Some(path) = paths.get(index) else { break };
                        let outcome = self.run_path(path.as_ref());
                        if outcome.failed() && self.configuration.failure_mode.stops_on_failure()
                        {
                            halted.store(true, Ordering::SeqCst);
                        }
                        if tx.send((index, outcome)).is_err() {
                            break;
                        }
                    }
                });
            }
        });
        drop(tx);
        let mut finished: Vec<(usize, StoryOutcome)> = rx.into_iter().collect();
        finished.sort_by_key(|(index, _)| *index);
        RunReport {
            stories: finished.into_iter().map(|(_, outcome)| outcome).collect(),
        }
    }

    fn run_path(&self, path: &str) -> StoryOutcome {
        let text = match self.loader.load_story_text(path) {
            Ok(text) => text,
            Err(err) => {
                error!("failed to load story `{path}`: {err}");
                let source = Arc::new(err);
                return StoryOutcome::not_run(path, StoryFailure::Load { source });
            }
        };
        let job = StoryJob {
            catalogue: Arc::clone(&self.catalogue),
            parser: Arc::clone(&self.parser),
            loader: Arc::clone(&self.loader),
            converters: Arc::clone(&self.converters),
            configuration: Arc::clone(&self.configuration),
            reporter: self.reporters.reporter_for(path),
            cancel: CancelFlag::new(),
            story: Arc::new(self.parser.parse_story(&text, Some(path))),
        };
        match self.configuration.story_timeout {
            Some(timeout) => job.run_with_timeout(timeout),
            None => job.run(),
        }
    }
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("catalogue", &self.catalogue)
            .field("configuration", &self.configuration)
            .field("stopped", &self.stop.is_stopped())
            .finish_non_exhaustive()
    }
}

/// Everything one story needs to run on a thread of its own.
struct StoryJob {
    catalogue: Arc<Catalogue>,
    parser: Arc<StoryParser>,
    loader: Arc<dyn StoryLoader>,
    converters: Arc<ValueConverters>,
    configuration: Arc<Configuration>,
    reporter: Arc<dyn StoryReporter>,
    cancel: CancelFlag,
    story: Arc<Story>,
}

impl StoryJob {
    fn run(&self) -> StoryOutcome {
        let path = self.story.path();
        let performed = panic::catch_unwind(AssertUnwindSafe(|| {
            let builder = TreeBuilder::new(
                &self.catalogue,
                &self.parser,
                self.loader.as_ref(),
                &self.configuration.meta_filter,
            )
            .with_story_controls(self.configuration.story_controls);
            let tree = builder.build(&self.story);
            let ctx = RunContext::new(
                path,
                Arc::clone(&self.reporter),
                &self.converters,
                &self.configuration,
                self.cancel.clone(),
            );
            StoryRunner::new(ctx).run(&tree)
        }));
        performed.unwrap_or_else(|payload| {
            let message = panic_message(&*payload);
            error!("story `{path}` aborted: {message}");
            StoryOutcome::not_run(path, StoryFailure::RunnerFailed { message })
        })
    }

    fn run_with_timeout(self, timeout: Duration) -> StoryOutcome {
        let path = self.story.path().to_string();
        let story = Arc::clone(&self.story);
        let reporter = Arc::clone(&self.reporter);
        let cancel = self.cancel.clone();
        let (tx, rx) = mpsc::channel();
        let spawned = thread::Builder::new()
            .name(format!("story {path}"))
            .spawn(move || {
                if tx.send(self.run()).is_err() {
                    debug!("story `{}` finished after it was abandoned", self.story.path());
                }
            });
        if let Err(err) = spawned {
            return StoryOutcome::not_run(
                &path,
                StoryFailure::RunnerFailed {
                    message: err.to_string(),
                },
            );
        }
        match rx.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.cancel();
                warn!("story `{path}` timed out after {timeout:?}");
                reporter.story_cancelled(&story, timeout);
                StoryOutcome::not_run(&path, StoryFailure::Timeout { timeout })
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => StoryOutcome::not_run(
                &path,
                StoryFailure::RunnerFailed {
                    message: "story thread ended without an outcome".into(),
                },
            ),
        }
    }
}
