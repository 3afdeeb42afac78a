//! Keyword-driven story parser.
//!
//! The parser segments story text by the literals of a [`Keywords`] table.
//! It never fails: a section whose keyword is missing parses to its empty
//! value.

mod text;

use log::{debug, warn};

use crate::keywords::Keywords;
use crate::model::{
    GivenStories, Lifecycle, LifecycleSteps, Meta, MetaFilter, Narrative, Outcome, Scenario, Scope,
    Story,
};
use crate::table::{ExamplesTable, TableFactory};
use text::{first_line_where, section, until_first};

/// Turns story text into a [`Story`].
///
/// # Examples
///
/// ```
/// use storyline::StoryParser;
///
/// let story = StoryParser::default().parse_story(
///     "Scenario: s1\nGiven a value 5\nWhen I add 3\nThen the result is 8",
///     Some("math.story"),
/// );
/// let scenario = &story.scenarios()[0];
/// assert_eq!(scenario.title(), "s1");
/// assert_eq!(scenario.steps(), ["Given a value 5", "When I add 3", "Then the result is 8"]);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StoryParser {
    keywords: Keywords,
    tables: TableFactory,
}

impl StoryParser {
    /// Parser recognising `keywords`.
    #[must_use]
    pub fn new(keywords: Keywords) -> Self {
        Self {
            keywords,
            tables: TableFactory::default(),
        }
    }

    /// Use `tables` to build examples tables.
    #[must_use]
    pub fn with_table_factory(mut self, tables: TableFactory) -> Self {
        self.tables = tables;
        self
    }

    /// The keyword table.
    #[must_use]
    pub fn keywords(&self) -> &Keywords {
        &self.keywords
    }

    /// The examples table factory.
    #[must_use]
    pub fn table_factory(&self) -> &TableFactory {
        &self.tables
    }

    /// Parse an examples table.
    #[must_use]
    pub fn parse_examples_table(&self, text: &str) -> ExamplesTable {
        self.tables.create(text)
    }

    /// Parse a whole story. `path` is recorded on the story as given.
    #[must_use]
    pub fn parse_story(&self, text: &str, path: Option<&str>) -> Story {
        let text = text.replace("\r\n", "\n");
        let k = &self.keywords;
        let (pre_scenario, scenarios) = match text.split_once(k.scenario.as_str()) {
            Some((pre, rest)) => (pre, self.parse_scenarios(rest)),
            None => (text.as_str(), Vec::new()),
        };
        let story = Story::new(
            path.unwrap_or_default(),
            self.description(&text),
            self.story_meta(pre_scenario),
            self.narrative(pre_scenario),
            self.story_given_stories(pre_scenario),
            self.lifecycle(pre_scenario),
            scenarios,
        );
        debug!(
            "parsed story `{}` with {} scenario(s)",
            story.path(),
            story.scenarios().len()
        );
        story
    }

    fn description(&self, text: &str) -> String {
        let k = &self.keywords;
        let ends = [&k.meta, &k.narrative, &k.lifecycle, &k.scenario].map(String::as_str);
        let before = until_first(text, &ends);
        if before.len() == text.len() {
            String::new()
        } else {
            before.trim().to_string()
        }
    }

    fn story_meta(&self, pre_scenario: &str) -> Meta {
        let k = &self.keywords;
        section(
            pre_scenario,
            &k.meta,
            &[&k.narrative, &k.given_stories, &k.lifecycle],
        )
        .map(|text| Meta::parse(text, k))
        .unwrap_or_default()
    }

    fn narrative(&self, pre_scenario: &str) -> Narrative {
        let k = &self.keywords;
        section(pre_scenario, &k.narrative, &[&k.given_stories, &k.lifecycle])
            .and_then(|text| self.standard_narrative(text).or_else(|| self.alternative_narrative(text)))
            .unwrap_or_default()
    }

    fn standard_narrative(&self, text: &str) -> Option<Narrative> {
        let k = &self.keywords;
        let (_, rest) = text.split_once(k.in_order_to.as_str())?;
        let (in_order_to, rest) = rest.split_once(k.as_a.as_str())?;
        let (as_a, i_want_to) = rest.split_once(k.i_want_to.as_str())?;
        Some(Narrative {
            in_order_to: in_order_to.trim().to_string(),
            as_a: as_a.trim().to_string(),
            i_want_to: i_want_to.trim().to_string(),
            so_that: String::new(),
        })
    }

    fn alternative_narrative(&self, text: &str) -> Option<Narrative> {
        let k = &self.keywords;
        let (_, rest) = text.split_once(k.as_a.as_str())?;
        let (as_a, rest) = rest.split_once(k.i_want_to.as_str())?;
        let (i_want_to, so_that) = rest.split_once(k.so_that.as_str())?;
        Some(Narrative {
            in_order_to: String::new(),
            as_a: as_a.trim().to_string(),
            i_want_to: i_want_to.trim().to_string(),
            so_that: so_that.trim().to_string(),
        })
    }

    fn story_given_stories(&self, pre_scenario: &str) -> GivenStories {
        let k = &self.keywords;
        section(pre_scenario, &k.given_stories, &[&k.lifecycle])
            .map(GivenStories::parse)
            .unwrap_or_default()
    }

    fn lifecycle(&self, pre_scenario: &str) -> Lifecycle {
        let k = &self.keywords;
        let Some(text) = section(pre_scenario, &k.lifecycle, &[]) else {
            return Lifecycle::default();
        };
        let before = section(text, &k.before, &[&k.after])
            .map(|body| self.lifecycle_groups(body))
            .unwrap_or_default();
        let after = section(text, &k.after, &[])
            .map(|body| self.lifecycle_groups(body))
            .unwrap_or_default();
        Lifecycle::new(before, after)
    }

    /// Split a `Before:` or `After:` body into groups at `Scope:` and
    /// `Outcome:` lines.
    fn lifecycle_groups(&self, text: &str) -> Vec<LifecycleSteps> {
        let k = &self.keywords;
        let mut groups = vec![(LifecycleSteps::default(), String::new())];
        for line in text.lines() {
            let trimmed = line.trim();
            if let Some(value) = trimmed.strip_prefix(k.scope.as_str()) {
                let scope = Scope::from_keyword(value, k).unwrap_or_else(|| {
                    warn!("unknown lifecycle scope `{}`, using the scenario scope", value.trim());
                    Scope::default()
                });
                groups.push((
                    LifecycleSteps {
                        scope,
                        ..LifecycleSteps::default()
                    },
                    String::new(),
                ));
            } else if let Some(value) = trimmed.strip_prefix(k.outcome.as_str()) {
                let outcome = Outcome::from_keyword(value, k).unwrap_or_else(|| {
                    warn!("unknown lifecycle outcome `{}`, using any", value.trim());
                    Outcome::default()
                });
                let scope = groups.last().map_or_else(Scope::default, |(group, _)| group.scope);
                groups.push((
                    LifecycleSteps {
                        scope,
                        outcome,
                        ..LifecycleSteps::default()
                    },
                    String::new(),
                ));
            } else if let Some(value) = trimmed.strip_prefix(k.meta_filter.as_str()) {
                if let Some((group, _)) = groups.last_mut() {
                    group.meta_filter = Some(MetaFilter::parse(value));
                }
            } else if let Some((_, body)) = groups.last_mut() {
                body.push_str(line);
                body.push('\n');
            }
        }
        groups
            .into_iter()
            .filter_map(|(mut group, body)| {
                group.steps = self.find_steps(&body);
                (!group.steps.is_empty()).then_some(group)
            })
            .collect()
    }

    fn parse_scenarios(&self, text: &str) -> Vec<Scenario> {
        text.split(self.keywords.scenario.as_str())
            .filter(|chunk| !chunk.trim().is_empty())
            .map(|chunk| self.parse_scenario(chunk))
            .collect()
    }

    /// Parse the text following one `Scenario:` keyword.
    fn parse_scenario(&self, chunk: &str) -> Scenario {
        let k = &self.keywords;
        let body_start = first_line_where(chunk, 1, |line| self.opens_scenario_section(line))
            .unwrap_or(chunk.len());
        let (title, body) = chunk.split_at(body_start);
        let examples_start = first_line_where(body, 0, |line| {
            line.trim_start().starts_with(k.examples_table.as_str())
        });
        let (steps_text, table_text) = match examples_start {
            Some(start) => {
                let (steps, table) = body.split_at(start);
                let table = table.trim_start();
                (steps, table.strip_prefix(k.examples_table.as_str()).unwrap_or(table))
            }
            None => (body, ""),
        };
        let first_step = first_line_where(steps_text, 0, |line| k.starts_step(line))
            .unwrap_or(steps_text.len());
        let (header, _) = steps_text.split_at(first_step);
        let meta = section(header, &k.meta, &[&k.given_stories])
            .map(|text| Meta::parse(text, k))
            .unwrap_or_default();
        let given_stories = section(header, &k.given_stories, &[&k.meta])
            .map(GivenStories::parse)
            .unwrap_or_default();
        Scenario::new(
            title.trim(),
            meta,
            given_stories,
            self.tables.create(table_text),
            self.find_steps(steps_text),
        )
    }

    fn opens_scenario_section(&self, line: &str) -> bool {
        let k = &self.keywords;
        let line = line.trim_start();
        [&k.meta, &k.given_stories, &k.examples_table]
            .into_iter()
            .any(|keyword| line.starts_with(keyword.as_str()))
            || k.starts_step(line)
    }

    /// Steps start at lines opened by a starting word and absorb every
    /// following line that is not, so multi-line bodies stay verbatim.
    fn find_steps(&self, text: &str) -> Vec<String> {
        let mut steps: Vec<String> = Vec::new();
        for line in text.lines() {
            if self.keywords.starts_step(line) {
                steps.push(line.trim_start().to_string());
            } else if let Some(step) = steps.last_mut() {
                step.push('\n');
                step.push_str(line);
            }
        }
        for step in &mut steps {
            let end = step.trim_end().len();
            step.truncate(end);
        }
        steps
    }
}
