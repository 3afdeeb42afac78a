//! Immutable story model produced by the parser.
//!
//! A [`Story`] owns its scenarios, meta, narrative, given stories and
//! lifecycle. Nothing in the model changes once parsed; filtering produces
//! new values rather than mutating existing ones.

mod given_stories;
mod lifecycle;
mod meta;
mod meta_filter;

pub use given_stories::{Anchor, GivenStories, GivenStory};
pub use lifecycle::{Lifecycle, LifecycleSteps, Outcome, Scope};
pub use meta::Meta;
pub use meta_filter::MetaFilter;

use crate::table::ExamplesTable;

/// The optional narrative of a story.
///
/// Stories use either the `In order to / As a / I want to` form or the
/// alternative `As a / I want to / So that` form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Narrative {
    /// Benefit of the first form.
    pub in_order_to: String,
    /// Role, present in both forms.
    pub as_a: String,
    /// Feature, present in both forms.
    pub i_want_to: String,
    /// Benefit of the alternative form.
    pub so_that: String,
}

impl Narrative {
    /// Whether no clause is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.in_order_to.is_empty()
            && self.as_a.is_empty()
            && self.i_want_to.is_empty()
            && self.so_that.is_empty()
    }

    /// Whether the alternative form was used.
    #[must_use]
    pub fn is_alternative(&self) -> bool {
        !self.so_that.is_empty()
    }
}

/// A scenario as written in the story.
#[derive(Debug, Clone, Default)]
pub struct Scenario {
    title: String,
    meta: Meta,
    given_stories: GivenStories,
    examples_table: ExamplesTable,
    steps: Vec<String>,
}

impl Scenario {
    /// Assemble a scenario.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        meta: Meta,
        given_stories: GivenStories,
        examples_table: ExamplesTable,
        steps: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            meta,
            given_stories,
            examples_table,
            steps,
        }
    }

    /// Title, possibly empty.
    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Meta declared on the scenario itself.
    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Given stories run before the steps.
    #[must_use]
    pub fn given_stories(&self) -> &GivenStories {
        &self.given_stories
    }

    /// Examples table; empty when the scenario has none.
    #[must_use]
    pub fn examples_table(&self) -> &ExamplesTable {
        &self.examples_table
    }

    /// Raw step texts, starting words included.
    #[must_use]
    pub fn steps(&self) -> &[String] {
        &self.steps
    }
}

/// A parsed story.
#[derive(Debug, Clone, Default)]
pub struct Story {
    path: String,
    description: String,
    meta: Meta,
    narrative: Narrative,
    given_stories: GivenStories,
    lifecycle: Lifecycle,
    scenarios: Vec<Scenario>,
}

impl Story {
    /// Assemble a story.
    #[must_use]
    pub fn new(
        path: impl Into<String>,
        description: impl Into<String>,
        meta: Meta,
        narrative: Narrative,
        given_stories: GivenStories,
        lifecycle: Lifecycle,
        scenarios: Vec<Scenario>,
    ) -> Self {
        Self {
            path: path.into(),
            description: description.into(),
            meta,
            narrative,
            given_stories,
            lifecycle,
            scenarios,
        }
    }

    /// Path the story was loaded from; empty for in-memory text.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment, used as the display name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.rsplit(['/', '\\']).next().unwrap_or(&self.path)
    }

    /// Free text before the first section keyword.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Story-level meta.
    #[must_use]
    pub fn meta(&self) -> &Meta {
        &self.meta
    }

    /// Narrative; empty when absent.
    #[must_use]
    pub fn narrative(&self) -> &Narrative {
        &self.narrative
    }

    /// Story-level given stories.
    #[must_use]
    pub fn given_stories(&self) -> &GivenStories {
        &self.given_stories
    }

    /// Textual lifecycle.
    #[must_use]
    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Scenarios in declaration order.
    #[must_use]
    pub fn scenarios(&self) -> &[Scenario] {
        &self.scenarios
    }

    /// Copy of the story holding only `scenarios`.
    #[must_use]
    pub fn with_scenarios(&self, scenarios: Vec<Scenario>) -> Self {
        Self {
            scenarios,
            ..self.clone()
        }
    }

    /// Copy of the story with a different path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("stories/trading/buy.story", "buy.story")]
    #[case("buy.story", "buy.story")]
    #[case("", "")]
    fn name_is_last_path_segment(#[case] path: &str, #[case] name: &str) {
        assert_eq!(Story::default().with_path(path).name(), name);
    }

    #[test]
    fn with_scenarios_keeps_everything_else() {
        let story = Story::new(
            "a.story",
            "desc",
            Meta::from_iter([("theme", "x")]),
            Narrative::default(),
            GivenStories::default(),
            Lifecycle::default(),
            vec![Scenario::default(), Scenario::default()],
        );
        let trimmed = story.with_scenarios(Vec::new());
        assert!(trimmed.scenarios().is_empty());
        assert_eq!(trimmed.path(), "a.story");
        assert_eq!(trimmed.meta().property("theme"), Some("x"));
        assert_eq!(story.scenarios().len(), 2);
    }

    #[test]
    fn alternative_narrative_is_detected() {
        let narrative = Narrative {
            as_a: "trader".into(),
            i_want_to: "buy".into(),
            so_that: "I profit".into(),
            ..Narrative::default()
        };
        assert!(narrative.is_alternative());
        assert!(!narrative.is_empty());
        assert!(Narrative::default().is_empty());
    }
}
