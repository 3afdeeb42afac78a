//! Runs performable trees and reports every step.
//!
//! [`StoryRunner`] walks one story's tree strictly in order. Each scenario
//! run starts in the `FineSoFar` state; the first pending or failed step
//! moves it to `SomethingHappened`, after which remaining steps are not
//! performed but still reported. An ignoring signal moves it to `Ignoring`,
//! after which remaining steps report as ignorable and after-scenario steps
//! run as if nothing had happened.
//!
//! Once a story has recorded a failure, [`StoryControls`] can skip its
//! remaining scenarios, or all of them when the failure came from its before
//! steps or given stories. Skipped scenarios are neither reported nor
//! counted.
//!
//! Restart signals abandon the current scenario or story attempt and run it
//! once more from its before steps. A signal raised during that second
//! attempt is an ordinary failure.
//!
//! [`Embedder`] dispatches top-level stories to a worker pool.

mod embedder;
mod failures;
mod outcome;

use std::sync::Arc;

use log::debug;

use crate::config::StoryControls;
use crate::context::RunContext;
use crate::execution::{ExecutionError, Performed, Signal, Step, StepOutcome, StepResult};
use crate::reporting::StoryReporter;
use crate::tree::{GivenStoryNode, PerformableScenario, PerformableStory, ScenarioRun};

pub use embedder::{Embedder, StopHandle};
pub use failures::{BatchFailures, RunError, StoryFailure};
pub use outcome::{RunReport, ScenarioOutcome, StoryOutcome};

/// Scenario run state.
#[derive(Debug, Clone)]
enum State {
    FineSoFar,
    SomethingHappened(Arc<ExecutionError>),
    Ignoring,
}

impl State {
    fn failure(&self) -> Option<&Arc<ExecutionError>> {
        match self {
            Self::SomethingHappened(cause) => Some(cause),
            Self::FineSoFar | Self::Ignoring => None,
        }
    }
}

/// Why a story or scenario attempt stopped early.
#[derive(Debug)]
enum Interrupt {
    RestartScenario {
        step: String,
        cause: Arc<ExecutionError>,
    },
    RestartStory(Arc<ExecutionError>),
    Cancelled,
}

/// Performs one top-level story and its given stories.
#[derive(Debug)]
pub struct StoryRunner<'a> {
    ctx: RunContext<'a>,
    restart_scenario: bool,
    restart_story: bool,
}

impl<'a> StoryRunner<'a> {
    /// Runner reporting through `ctx`.
    #[must_use]
    pub fn new(ctx: RunContext<'a>) -> Self {
        Self {
            ctx,
            restart_scenario: false,
            restart_story: false,
        }
    }

    /// The run context.
    #[must_use]
    pub fn context(&self) -> &RunContext<'a> {
        &self.ctx
    }

    /// Perform `story`, restarting it at most once.
    #[must_use]
    pub fn run(mut self, story: &PerformableStory<'_>) -> StoryOutcome {
        let mut restarted = false;
        loop {
            self.restart_story = !restarted;
            self.ctx.take_tally();
            match self.run_story(story) {
                Ok(mut outcome) => {
                    outcome.restarted = restarted;
                    return outcome;
                }
                Err(Interrupt::Cancelled) => {
                    debug!("story `{}` abandoned", story.path());
                    let timeout = self.ctx.story_timeout().unwrap_or_default();
                    return StoryOutcome::not_run(story.path(), StoryFailure::Timeout { timeout });
                }
                Err(Interrupt::RestartStory(cause) | Interrupt::RestartScenario { cause, .. }) => {
                    debug!("restarting story `{}`", story.path());
                    self.reporter().restarted_story(story.story(), &cause);
                    restarted = true;
                }
            }
        }
    }

    fn reporter(&self) -> &dyn StoryReporter {
        self.ctx.reporter()
    }

    fn run_story(&mut self, story: &PerformableStory<'_>) -> Result<StoryOutcome, Interrupt> {
        let outer = self.ctx.take_tally();
        let result = self.story_body(story);
        let tally = self.ctx.replace_tally(outer);
        let mut outcome = result?;
        self.ctx.absorb(&tally);
        let fails_on_pending = self.ctx.pending_step_strategy().fails_story();
        outcome.failure = match tally.failure {
            Some(cause) => Some(StoryFailure::StepFailed { cause }),
            None if tally.pending && fails_on_pending => Some(StoryFailure::PendingStepsFound),
            None => None,
        };
        Ok(outcome)
    }

    fn story_body(&mut self, tree: &PerformableStory<'_>) -> Result<StoryOutcome, Interrupt> {
        let story = tree.story();
        let given = tree.is_given_story();
        let mut outcome = StoryOutcome::new(tree.path(), given);
        self.reporter().before_story(story, given);
        if tree.is_excluded() {
            self.reporter().story_excluded(story, self.ctx.meta_filter());
            self.reporter().after_story(given);
            outcome.excluded = true;
            return Ok(outcome);
        }
        if self.ctx.dry_run() && !given {
            self.reporter().dry_run();
        }
        if !story.narrative().is_empty() {
            self.reporter().narrative(story.narrative());
        }
        let mut state = State::FineSoFar;
        self.run_steps(tree.before_steps(), &mut state, &mut outcome.before)?;
        outcome.given_stories =
            self.run_given_stories(tree.given_stories(), &mut state, &mut outcome.before)?;
        let controls = self.ctx.story_controls();
        if controls.skip_story_if_given_story_failed && self.ctx.failure().is_some() {
            debug!("skipping the scenarios of `{}` after a failed setup", tree.path());
        } else {
            self.run_scenarios(tree.scenarios(), controls, &mut outcome)?;
        }
        let mut state = self
            .ctx
            .failure()
            .cloned()
            .map_or(State::FineSoFar, State::SomethingHappened);
        self.run_steps(tree.after_steps(), &mut state, &mut outcome.after)?;
        self.reporter().after_story(given);
        Ok(outcome)
    }

    fn run_scenarios(
        &mut self,
        scenarios: &[PerformableScenario<'_>],
        controls: StoryControls,
        outcome: &mut StoryOutcome,
    ) -> Result<(), Interrupt> {
        for scenario in scenarios {
            if controls.skip_scenarios_after_failure && self.ctx.failure().is_some() {
                debug!("skipping scenario `{}` after a failure", scenario.title());
                continue;
            }
            let runs = self.run_scenario(scenario)?;
            outcome.scenarios.extend(runs);
        }
        Ok(())
    }

    fn run_given_stories(
        &mut self,
        nodes: &[GivenStoryNode<'_>],
        state: &mut State,
        results: &mut Vec<StepResult>,
    ) -> Result<Vec<StoryOutcome>, Interrupt> {
        if nodes.is_empty() {
            return Ok(Vec::new());
        }
        let paths: Vec<&str> = nodes.iter().map(GivenStoryNode::path).collect();
        self.reporter().before_given_stories(&paths);
        let mut outcomes = Vec::with_capacity(nodes.len());
        for node in nodes {
            match node {
                GivenStoryNode::Story(story) => {
                    let outcome = self.run_story(story)?;
                    if let (State::FineSoFar, Some(StoryFailure::StepFailed { cause })) =
                        (&*state, outcome.failure())
                    {
                        *state = State::SomethingHappened(Arc::clone(cause));
                    }
                    outcomes.push(outcome);
                }
                GivenStoryNode::Failed { path, cause } => {
                    let result = StepResult::failed(path, Arc::clone(cause));
                    self.absorb(&result, state);
                    result.describe_to(self.reporter());
                    results.push(result);
                }
            }
        }
        self.reporter().after_given_stories();
        Ok(outcomes)
    }

    fn run_scenario(
        &mut self,
        scenario: &PerformableScenario<'_>,
    ) -> Result<Vec<ScenarioOutcome>, Interrupt> {
        self.reporter().before_scenario(scenario.title(), scenario.meta());
        if scenario.is_excluded() {
            self.reporter()
                .scenario_excluded(scenario.title(), self.ctx.meta_filter());
            self.reporter().after_scenario();
            return Ok(vec![ScenarioOutcome::excluded(scenario.title())]);
        }
        let mut outcomes = Vec::with_capacity(scenario.runs().len());
        for run in scenario.runs() {
            if let Some((index, row)) = run.example() {
                self.reporter().example(index, row);
            }
            outcomes.push(self.run_with_restart(scenario.title(), run)?);
        }
        self.reporter().after_scenario();
        Ok(outcomes)
    }

    fn run_with_restart(
        &mut self,
        title: &str,
        run: &ScenarioRun<'_>,
    ) -> Result<ScenarioOutcome, Interrupt> {
        let enclosing = self.restart_scenario;
        let tally = self.ctx.tally().clone();
        let mut restarted = false;
        let result = loop {
            self.restart_scenario = !restarted;
            match self.run_scenario_once(run) {
                Ok((given_stories, steps)) => {
                    break Ok(ScenarioOutcome {
                        title: title.to_string(),
                        example: run.example().map(|(index, _)| index),
                        excluded: false,
                        restarted,
                        given_stories,
                        steps,
                    });
                }
                Err(Interrupt::RestartScenario { step, cause }) => {
                    debug!("restarting scenario `{title}` after `{step}`");
                    self.reporter().restarted(&step, &cause);
                    self.ctx.replace_tally(tally.clone());
                    restarted = true;
                }
                Err(interrupt) => break Err(interrupt),
            }
        };
        self.restart_scenario = enclosing;
        result
    }

    fn run_scenario_once(
        &mut self,
        run: &ScenarioRun<'_>,
    ) -> Result<(Vec<StoryOutcome>, Vec<StepResult>), Interrupt> {
        let mut state = State::FineSoFar;
        let mut results = Vec::new();
        let given = self.run_given_stories(run.given_stories(), &mut state, &mut results)?;
        self.run_steps(run.before_steps(), &mut state, &mut results)?;
        self.run_steps(run.steps(), &mut state, &mut results)?;
        if matches!(state, State::Ignoring) {
            state = State::FineSoFar;
        }
        self.run_steps(run.after_steps(), &mut state, &mut results)?;
        Ok((given, results))
    }

    fn run_steps(
        &mut self,
        steps: &[Step<'_>],
        state: &mut State,
        results: &mut Vec<StepResult>,
    ) -> Result<(), Interrupt> {
        for step in steps {
            self.run_step(step, state, results)?;
        }
        Ok(())
    }

    fn run_step(
        &mut self,
        step: &Step<'_>,
        state: &mut State,
        results: &mut Vec<StepResult>,
    ) -> Result<(), Interrupt> {
        if self.ctx.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        let hook = step.is_hook();
        if hook && matches!(state, State::Ignoring) {
            return Ok(());
        }
        if !hook {
            self.reporter().before_step(step.text());
        }
        let Performed { mut result, signal } = self.attempt(step, state);
        match (signal, result.cause()) {
            (Some(Signal::RestartScenario), Some(cause)) if self.restart_scenario => {
                return Err(Interrupt::RestartScenario {
                    step: result.display_text().to_string(),
                    cause: Arc::clone(cause),
                });
            }
            (Some(Signal::RestartStory), Some(cause)) if self.restart_story => {
                return Err(Interrupt::RestartStory(Arc::clone(cause)));
            }
            (Some(Signal::IgnoringSteps), _) => *state = State::Ignoring,
            _ => {}
        }
        self.absorb(&result, state);
        let composed = step.composed();
        if !composed.is_empty() {
            self.reporter().before_composed_steps();
            self.run_steps(composed, state, results)?;
            self.reporter().after_composed_steps();
            if matches!(state, State::Ignoring) && result.outcome() == StepOutcome::Successful {
                result = StepResult::ignorable(result.display_text());
            }
        }
        if !hook || result.outcome().interrupts() {
            result.describe_to(self.reporter());
            results.push(result);
        }
        Ok(())
    }

    fn attempt(&self, step: &Step<'_>, state: &State) -> Performed {
        let ctx = self.ctx.step_context(state.failure());
        match state {
            State::FineSoFar => step.perform(&ctx),
            State::SomethingHappened(_) => step.do_not_perform(&ctx),
            State::Ignoring => StepResult::ignorable(step.text()).into(),
        }
    }

    fn absorb(&mut self, result: &StepResult, state: &mut State) {
        self.ctx.record(result);
        if !result.outcome().interrupts() || !matches!(state, State::FineSoFar) {
            return;
        }
        if let Some(cause) = result.cause() {
            *state = State::SomethingHappened(Arc::clone(cause));
        }
    }
}
