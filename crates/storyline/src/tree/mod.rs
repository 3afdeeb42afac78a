//! Performable tree: the execution plan derived from a story.
//!
//! [`TreeBuilder::build`] resolves every step of a story against the
//! catalogue, loads given stories recursively, expands examples tables into
//! one run per row and interleaves lifecycle steps and catalogue hooks:
//!
//! - story: before-story, given stories, scenarios, after-story;
//! - scenario run: given stories, before-scenario, declared steps (each
//!   wrapped by step-scoped steps), after-scenario.
//!
//! Catalogue hooks run before textual lifecycle steps on the way in and
//! after them on the way out. After steps are gated by their outcome at run
//! time. Elements excluded by the meta filter stay in the tree, flagged and
//! without steps, so they can still be reported.
//!
//! [`StoryControls`] can drop example rows by their own meta and leave
//! catalogue scenario hooks out of given stories.
//!
//! Given stories are not guarded against cycles: a story that includes
//! itself, directly or indirectly, recurses without bound.

mod loader;

use std::sync::Arc;

use log::{debug, error};

use crate::config::StoryControls;
use crate::execution::{ExecutionError, HookStep, Step};
use crate::model::{Anchor, GivenStory, Lifecycle, Meta, MetaFilter, Scenario, Scope, Story};
use crate::parser::StoryParser;
use crate::registry::{Catalogue, Stage, StepCollector};
use crate::table::{ExamplesTable, NamedParameters};

pub use loader::{InMemoryStories, LoadError, LoadFromDirectory, StoryLoader};

/// A given story resolved for execution.
#[derive(Debug)]
pub enum GivenStoryNode<'c> {
    /// The given story's own tree.
    Story(Box<PerformableStory<'c>>),
    /// The given story could not be loaded.
    Failed {
        /// Path of the given story.
        path: String,
        /// Load failure, reported as a failure of the including element.
        cause: Arc<ExecutionError>,
    },
}

impl GivenStoryNode<'_> {
    /// Path of the given story.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Story(story) => story.path(),
            Self::Failed { path, .. } => path,
        }
    }
}

/// Execution plan of a story.
#[derive(Debug)]
pub struct PerformableStory<'c> {
    story: Story,
    given: bool,
    excluded: bool,
    before: Vec<Step<'c>>,
    given_stories: Vec<GivenStoryNode<'c>>,
    scenarios: Vec<PerformableScenario<'c>>,
    after: Vec<Step<'c>>,
}

impl<'c> PerformableStory<'c> {
    /// The parsed story.
    #[must_use]
    pub fn story(&self) -> &Story {
        &self.story
    }

    /// Story path.
    #[must_use]
    pub fn path(&self) -> &str {
        self.story.path()
    }

    /// Whether the story runs as another story's given story.
    #[must_use]
    pub fn is_given_story(&self) -> bool {
        self.given
    }

    /// Whether the meta filter excluded the story.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// Before-story hooks and lifecycle steps.
    #[must_use]
    pub fn before_steps(&self) -> &[Step<'c>] {
        &self.before
    }

    /// Story-level given stories.
    #[must_use]
    pub fn given_stories(&self) -> &[GivenStoryNode<'c>] {
        &self.given_stories
    }

    /// Scenarios in declaration order.
    #[must_use]
    pub fn scenarios(&self) -> &[PerformableScenario<'c>] {
        &self.scenarios
    }

    /// After-story lifecycle steps and hooks.
    #[must_use]
    pub fn after_steps(&self) -> &[Step<'c>] {
        &self.after
    }
}

/// Execution plan of a scenario.
#[derive(Debug)]
pub struct PerformableScenario<'c> {
    title: String,
    meta: Meta,
    excluded: bool,
    examples: Option<ExamplesTable>,
    runs: Vec<ScenarioRun<'c>>,
}

impl<'c> PerformableScenario<'c> {
    /// Scenario title.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Scenario meta inherited from the story meta.
    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Whether the meta filter excluded the scenario.
    #[must_use]
    pub fn is_excluded(&self) -> bool {
        self.excluded
    }

    /// The examples table when the scenario runs once per row.
    #[must_use]
    pub fn examples(&self) -> Option<&ExamplesTable> {
        self.examples.as_ref()
    }

    /// Runs: one per example row, or a single run.
    #[must_use]
    pub fn runs(&self) -> &[ScenarioRun<'c>] {
        &self.runs
    }
}

/// One pass through a scenario.
#[derive(Debug)]
pub struct ScenarioRun<'c> {
    example: Option<(usize, NamedParameters)>,
    given_stories: Vec<GivenStoryNode<'c>>,
    before: Vec<Step<'c>>,
    steps: Vec<Step<'c>>,
    after: Vec<Step<'c>>,
}

impl<'c> ScenarioRun<'c> {
    /// Row index and values when the run comes from an examples table.
    #[must_use]
    pub fn example(&self) -> Option<(usize, &NamedParameters)> {
        self.example.as_ref().map(|(index, row)| (*index, row))
    }

    /// Scenario-level given stories.
    #[must_use]
    pub fn given_stories(&self) -> &[GivenStoryNode<'c>] {
        &self.given_stories
    }

    /// Before-scenario hooks and lifecycle steps.
    #[must_use]
    pub fn before_steps(&self) -> &[Step<'c>] {
        &self.before
    }

    /// Declared steps interleaved with step-scoped steps.
    #[must_use]
    pub fn steps(&self) -> &[Step<'c>] {
        &self.steps
    }

    /// After-scenario lifecycle steps and hooks.
    #[must_use]
    pub fn after_steps(&self) -> &[Step<'c>] {
        &self.after
    }
}

/// How a story enters the tree.
struct Inclusion<'a> {
    given: bool,
    parameters: NamedParameters,
    selector: Option<&'a GivenStory>,
}

/// Builds performable trees against a catalogue.
///
/// # Examples
///
/// ```
/// use storyline::{CandidateStep, Catalogue, InMemoryStories, MetaFilter, StoryParser, TreeBuilder};
///
/// let catalogue = Catalogue::new()
///     .with(CandidateStep::given("a value $n").build().expect("valid"));
/// let parser = StoryParser::default();
/// let loader = InMemoryStories::new();
/// let filter = MetaFilter::empty();
/// let builder = TreeBuilder::new(&catalogue, &parser, &loader, &filter);
///
/// let story = parser.parse_story("Scenario: s1\nGiven a value 5", Some("s.story"));
/// let tree = builder.build(&story);
/// assert_eq!(tree.scenarios()[0].runs()[0].steps().len(), 1);
/// ```
#[derive(Clone, Copy)]
pub struct TreeBuilder<'c> {
    collector: StepCollector<'c>,
    parser: &'c StoryParser,
    loader: &'c dyn StoryLoader,
    meta_filter: &'c MetaFilter,
    controls: StoryControls,
}

impl<'c> TreeBuilder<'c> {
    /// Builder resolving steps in `catalogue` and given stories through
    /// `loader` and `parser`.
    #[must_use]
    pub fn new(
        catalogue: &'c Catalogue,
        parser: &'c StoryParser,
        loader: &'c dyn StoryLoader,
        meta_filter: &'c MetaFilter,
    ) -> Self {
        Self {
            collector: StepCollector::new(catalogue, parser.keywords()),
            parser,
            loader,
            meta_filter,
            controls: StoryControls::default(),
        }
    }

    /// Build trees according to `controls`.
    #[must_use]
    pub fn with_story_controls(mut self, controls: StoryControls) -> Self {
        self.controls = controls;
        self
    }

    /// Build the execution plan of a top-level story.
    #[must_use]
    pub fn build(&self, story: &Story) -> PerformableStory<'c> {
        self.build_story(
            story,
            &Inclusion {
                given: false,
                parameters: NamedParameters::new(),
                selector: None,
            },
        )
    }

    fn build_story(&self, story: &Story, inclusion: &Inclusion<'_>) -> PerformableStory<'c> {
        let scenarios: Vec<_> = story
            .scenarios()
            .iter()
            .filter(|scenario| {
                inclusion
                    .selector
                    .is_none_or(|given| given.selects(&scenario.meta().inherit_from(story.meta())))
            })
            .map(|scenario| self.build_scenario(story, scenario, inclusion))
            .collect();
        let excluded = !inclusion.given
            && self.meta_filter.excluded(story.meta())
            && scenarios.iter().all(PerformableScenario::is_excluded);
        let mut performable = PerformableStory {
            story: story.clone(),
            given: inclusion.given,
            excluded,
            before: Vec::new(),
            given_stories: Vec::new(),
            scenarios,
            after: Vec::new(),
        };
        if excluded {
            debug!("story `{}` excluded by `{}`", story.path(), self.meta_filter);
            return performable;
        }
        let named = &inclusion.parameters;
        let meta = story.meta();
        performable.before = self.hooks(Stage::Before, Scope::Story, meta);
        performable
            .before
            .extend(self.lifecycle_before(story.lifecycle(), Scope::Story, named));
        performable.given_stories = story
            .given_stories()
            .stories()
            .iter()
            .map(|given| self.given_story(given, named.clone()))
            .collect();
        performable.after = self.lifecycle_after(story.lifecycle(), Scope::Story, meta, named);
        performable
            .after
            .extend(self.hooks(Stage::After, Scope::Story, meta));
        performable
    }

    fn build_scenario(
        &self,
        story: &Story,
        scenario: &Scenario,
        inclusion: &Inclusion<'_>,
    ) -> PerformableScenario<'c> {
        let meta = scenario.meta().inherit_from(story.meta());
        let excluded = !inclusion.given && self.meta_filter.excluded(&meta);
        let table = scenario.examples_table();
        let by_examples = !table.is_empty() && !scenario.given_stories().requires_parameters();
        let mut performable = PerformableScenario {
            title: scenario.title().to_string(),
            meta,
            excluded,
            examples: by_examples.then(|| table.clone()),
            runs: Vec::new(),
        };
        if excluded {
            debug!("scenario `{}` excluded", scenario.title());
            return performable;
        }
        performable.runs = if by_examples {
            table
                .rows()
                .into_iter()
                .enumerate()
                .filter(|(index, row)| {
                    inclusion.given || self.keeps_row(*index, row, &performable.meta)
                })
                .map(|(index, row)| {
                    let mut named = inclusion.parameters.clone();
                    named.extend(row.clone());
                    let example = Some((index, row));
                    let meta = &performable.meta;
                    self.scenario_run(story, scenario, meta, example, &named, inclusion)
                })
                .collect()
        } else {
            vec![self.scenario_run(
                story,
                scenario,
                &performable.meta,
                None,
                &inclusion.parameters,
                inclusion,
            )]
        };
        performable
    }

    /// Whether example `row` survives the meta filter when rows carry meta.
    fn keeps_row(&self, index: usize, row: &NamedParameters, scenario_meta: &Meta) -> bool {
        if !self.controls.meta_by_row {
            return true;
        }
        let keywords = self.parser.keywords();
        let Some(text) = row.get(&keywords.meta) else {
            return true;
        };
        let meta = Meta::parse(text, keywords).inherit_from(scenario_meta);
        let excluded = self.meta_filter.excluded(&meta);
        if excluded {
            debug!("example row {index} excluded by `{}`", self.meta_filter);
        }
        !excluded
    }

    fn scenario_run(
        &self,
        story: &Story,
        scenario: &Scenario,
        meta: &Meta,
        example: Option<(usize, NamedParameters)>,
        named: &NamedParameters,
        inclusion: &Inclusion<'_>,
    ) -> ScenarioRun<'c> {
        let lifecycle = story.lifecycle();
        let row = example.as_ref().map(|(_, row)| row.clone()).unwrap_or_default();
        let given_stories = scenario
            .given_stories()
            .stories()
            .iter()
            .map(|given| {
                let parameters = match given.anchor() {
                    Some(Anchor::Row(_)) => given.parameters(scenario.examples_table()),
                    _ => row.clone(),
                };
                self.given_story(given, parameters)
            })
            .collect();
        let scenario_hooks = !(inclusion.given
            && self
                .controls
                .skip_before_and_after_scenario_steps_if_given_story);
        let mut before = if scenario_hooks {
            self.hooks(Stage::Before, Scope::Scenario, meta)
        } else {
            Vec::new()
        };
        before.extend(self.lifecycle_before(lifecycle, Scope::Scenario, named));
        let declared = self
            .collector
            .collect(scenario.steps().iter().map(String::as_str), named);
        let mut steps = Vec::with_capacity(declared.len());
        for step in declared {
            steps.extend(self.hooks(Stage::Before, Scope::Step, meta));
            steps.extend(self.lifecycle_before(lifecycle, Scope::Step, named));
            steps.push(step);
            steps.extend(self.lifecycle_after(lifecycle, Scope::Step, meta, named));
            steps.extend(self.hooks(Stage::After, Scope::Step, meta));
        }
        let mut after = self.lifecycle_after(lifecycle, Scope::Scenario, meta, named);
        if scenario_hooks {
            after.extend(self.hooks(Stage::After, Scope::Scenario, meta));
        }
        ScenarioRun {
            example,
            given_stories,
            before,
            steps,
            after,
        }
    }

    fn given_story(&self, given: &GivenStory, parameters: NamedParameters) -> GivenStoryNode<'c> {
        let path = given.path();
        match self.loader.load_story_text(path) {
            Ok(text) => {
                debug!("including given story `{path}`");
                let story = self.parser.parse_story(&text, Some(path));
                let inclusion = Inclusion {
                    given: true,
                    parameters,
                    selector: Some(given),
                };
                GivenStoryNode::Story(Box::new(self.build_story(&story, &inclusion)))
            }
            Err(source) => {
                error!("given story `{path}` could not be loaded: {source}");
                GivenStoryNode::Failed {
                    path: path.to_string(),
                    cause: Arc::new(ExecutionError::GivenStoryLoad {
                        path: path.to_string(),
                        source: Arc::new(source),
                    }),
                }
            }
        }
    }

    fn hooks(&self, stage: Stage, scope: Scope, meta: &Meta) -> Vec<Step<'c>> {
        self.collector
            .catalogue()
            .hooks_for(stage, scope)
            .filter(|hook| hook.applies_to(meta))
            .map(|hook| {
                let step = Step::Hook(HookStep::new(hook, meta.clone()));
                match stage {
                    Stage::Before => step,
                    Stage::After => Step::UponOutcome(hook.outcome(), Box::new(step)),
                }
            })
            .collect()
    }

    fn lifecycle_before(
        &self,
        lifecycle: &Lifecycle,
        scope: Scope,
        named: &NamedParameters,
    ) -> Vec<Step<'c>> {
        self.collector.collect(lifecycle.before_steps(scope), named)
    }

    fn lifecycle_after(
        &self,
        lifecycle: &Lifecycle,
        scope: Scope,
        meta: &Meta,
        named: &NamedParameters,
    ) -> Vec<Step<'c>> {
        let (outcomes, texts): (Vec<_>, Vec<_>) = lifecycle.after_steps(scope, meta).unzip();
        self.collector
            .collect(texts, named)
            .into_iter()
            .zip(outcomes)
            .map(|(step, outcome)| Step::UponOutcome(outcome, Box::new(step)))
            .collect()
    }
}
