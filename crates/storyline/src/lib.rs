//! Core library for `storyline`.
//! This crate parses plain-text stories, matches their steps against a
//! catalogue of candidate steps and runs the resulting plans on a pool of
//! worker threads, reporting every step outcome.
//!
//! # Examples
//!
//! ```
//! use std::sync::Arc;
//! use storyline::reporting::RecordingReporter;
//! use storyline::{CandidateStep, Catalogue, Embedder, InMemoryStories};
//!
//! let catalogue = Catalogue::new()
//!     .with(CandidateStep::given("a stock of $symbol").build()?)
//!     .with(CandidateStep::when("the stock is traded at $price").handler(|args| {
//!         let price: f64 = args.get(0)?;
//!         if price > 0.0 { Ok(()) } else { Err("non-positive price".into()) }
//!     }).build()?);
//! let stories = InMemoryStories::new().with(
//!     "trading.story",
//!     "Scenario: trade\nGiven a stock of STK1\nWhen the stock is traded at 5.0",
//! );
//! let recorder = RecordingReporter::new();
//! let report = Embedder::new(Arc::new(catalogue), Arc::new(stories))
//!     .with_reporters(recorder.clone())
//!     .run_stories(&["trading.story"])?;
//! assert!(report.passed());
//! assert_eq!(recorder.step_outcomes("trading.story").len(), 2);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod binding;
mod config;
mod context;
pub mod execution;
mod keywords;
pub mod model;
mod panic;
mod parser;
mod registry;
pub mod reporting;
mod runner;
pub mod table;
mod tree;

pub use binding::{
    ConversionError, DeclaredParameterNames, ParameterNameProvider, PatternParameterNames,
    StepArgs, ValueConverters,
};
pub use config::{Configuration, StoryControls};
pub use context::{CancelFlag, RunContext};
pub use keywords::{Keywords, SplitStep, StartingWord};
pub use model::{Anchor, GivenStories, GivenStory, Meta, MetaFilter, Narrative, Scenario, Story};
pub use panic::panic_message;
pub use parser::StoryParser;
pub use registry::{
    CandidateMatch, CandidateStep, CandidateStepBuilder, Catalogue, CatalogueError,
    DEFAULT_MAX_COMPOSITE_DEPTH, HookContext, HookHandler, LifecycleHook, Stage, StepHandler,
};
pub use runner::{
    BatchFailures, Embedder, RunError, RunReport, ScenarioOutcome, StopHandle, StoryFailure,
    StoryOutcome, StoryRunner,
};
pub use storyline_patterns::{PatternError, StepMatcher, StepType};
pub use storyline_policy::{FailureMode, PendingStepStrategy};
pub use tree::{
    GivenStoryNode, InMemoryStories, LoadError, LoadFromDirectory, PerformableScenario,
    PerformableStory, ScenarioRun, StoryLoader, TreeBuilder,
};
