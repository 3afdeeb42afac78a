//! JSON rendering of run reports.
//!
//! The schema mirrors [`RunReport`]: stories nest their given stories and
//! scenarios, and every reported step carries its lowercase outcome label and
//! the rendered cause when it has one.

use std::io::Write;

use serde::Serialize;

use crate::execution::{StepOutcome, StepResult};
use crate::runner::{RunReport, ScenarioOutcome, StoryOutcome};

#[derive(Serialize)]
struct JsonReport<'a> {
    passed: bool,
    stories: Vec<JsonStory<'a>>,
}

#[derive(Serialize)]
struct JsonStory<'a> {
    path: &'a str,
    given: bool,
    excluded: bool,
    restarted: bool,
    cancelled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
    before: Vec<JsonStep<'a>>,
    given_stories: Vec<JsonStory<'a>>,
    scenarios: Vec<JsonScenario<'a>>,
    after: Vec<JsonStep<'a>>,
}

#[derive(Serialize)]
struct JsonScenario<'a> {
    title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    example: Option<usize>,
    excluded: bool,
    restarted: bool,
    given_stories: Vec<JsonStory<'a>>,
    steps: Vec<JsonStep<'a>>,
}

#[derive(Serialize)]
struct JsonStep<'a> {
    text: &'a str,
    outcome: StepOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    cause: Option<String>,
}

fn steps(results: &[StepResult]) -> Vec<JsonStep<'_>> {
    results.iter().map(JsonStep::from).collect()
}

fn stories(outcomes: &[StoryOutcome]) -> Vec<JsonStory<'_>> {
    outcomes.iter().map(JsonStory::from).collect()
}

impl<'a> From<&'a StepResult> for JsonStep<'a> {
    fn from(result: &'a StepResult) -> Self {
        Self {
            text: result.display_text(),
            outcome: result.outcome(),
            cause: result.cause().map(ToString::to_string),
        }
    }
}

impl<'a> From<&'a ScenarioOutcome> for JsonScenario<'a> {
    fn from(scenario: &'a ScenarioOutcome) -> Self {
        Self {
            title: scenario.title(),
            example: scenario.example(),
            excluded: scenario.is_excluded(),
            restarted: scenario.was_restarted(),
            given_stories: stories(scenario.given_stories()),
            steps: steps(scenario.steps()),
        }
    }
}

impl<'a> From<&'a StoryOutcome> for JsonStory<'a> {
    fn from(story: &'a StoryOutcome) -> Self {
        Self {
            path: story.path(),
            given: story.is_given_story(),
            excluded: story.is_excluded(),
            restarted: story.was_restarted(),
            cancelled: story.was_cancelled(),
            failure: story.failure().map(ToString::to_string),
            before: steps(story.before_steps()),
            given_stories: stories(story.given_stories()),
            scenarios: story.scenarios().iter().map(JsonScenario::from).collect(),
            after: steps(story.after_steps()),
        }
    }
}

impl<'a> From<&'a RunReport> for JsonReport<'a> {
    fn from(report: &'a RunReport) -> Self {
        Self {
            passed: report.passed(),
            stories: stories(report.stories()),
        }
    }
}

impl RunReport {
    /// Serialise the report into `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error when serialisation or writing fails.
    pub fn write_json<W: Write>(&self, writer: W) -> serde_json::Result<()> {
        serde_json::to_writer(writer, &JsonReport::from(self))
    }

    /// Serialise the report as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error when serialisation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::RunReport;
    ///
    /// let json = RunReport::default().to_json().expect("serialises");
    /// assert!(json.contains("\"passed\": true"));
    /// ```
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&JsonReport::from(self))
    }
}
