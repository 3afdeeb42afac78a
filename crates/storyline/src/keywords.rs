//! Keyword table consulted by the story parser and the matching engine.
//!
//! Every literal the engine recognises in story text lives in [`Keywords`].
//! The defaults are English; localised tables are built with struct update
//! syntax over [`Keywords::default`].

use storyline_patterns::StepType;

/// Literal keywords recognised in story text.
///
/// # Examples
///
/// ```
/// use storyline::Keywords;
///
/// let german = Keywords {
///     given: "Gegeben sei".into(),
///     scenario: "Szenario:".into(),
///     ..Keywords::default()
/// };
/// assert_eq!(german.given, "Gegeben sei");
/// assert_eq!(german.when, "When");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Keywords {
    /// Introduces a meta block.
    pub meta: String,
    /// Prefix of each meta property.
    pub meta_property: String,
    /// Introduces the narrative.
    pub narrative: String,
    /// Narrative benefit clause.
    pub in_order_to: String,
    /// Narrative role clause.
    pub as_a: String,
    /// Narrative feature clause.
    pub i_want_to: String,
    /// Narrative benefit clause of the alternative form.
    pub so_that: String,
    /// Introduces a scenario.
    pub scenario: String,
    /// Introduces a given-stories list.
    pub given_stories: String,
    /// Introduces the story lifecycle.
    pub lifecycle: String,
    /// Opens the lifecycle before section.
    pub before: String,
    /// Opens the lifecycle after section.
    pub after: String,
    /// Declares the scope of a lifecycle group.
    pub scope: String,
    /// Story scope value.
    pub scope_story: String,
    /// Scenario scope value.
    pub scope_scenario: String,
    /// Step scope value.
    pub scope_step: String,
    /// Declares the outcome of a lifecycle after group.
    pub outcome: String,
    /// Outcome value running regardless of failures.
    pub outcome_any: String,
    /// Outcome value running only when nothing failed.
    pub outcome_success: String,
    /// Outcome value running only after a failure.
    pub outcome_failure: String,
    /// Declares the meta filter of a lifecycle after group.
    pub meta_filter: String,
    /// Introduces the examples table of a scenario.
    pub examples_table: String,
    /// Starting word of given steps.
    pub given: String,
    /// Starting word of when steps.
    pub when: String,
    /// Starting word of then steps.
    pub then: String,
    /// Starting word continuing the previous step type.
    pub and: String,
    /// Starting word of comment steps.
    pub ignorable: String,
}

impl Default for Keywords {
    fn default() -> Self {
        Self {
            meta: "Meta:".into(),
            meta_property: "@".into(),
            narrative: "Narrative:".into(),
            in_order_to: "In order to".into(),
            as_a: "As a".into(),
            i_want_to: "I want to".into(),
            so_that: "So that".into(),
            scenario: "Scenario:".into(),
            given_stories: "GivenStories:".into(),
            lifecycle: "Lifecycle:".into(),
            before: "Before:".into(),
            after: "After:".into(),
            scope: "Scope:".into(),
            scope_story: "STORY".into(),
            scope_scenario: "SCENARIO".into(),
            scope_step: "STEP".into(),
            outcome: "Outcome:".into(),
            outcome_any: "ANY".into(),
            outcome_success: "SUCCESS".into(),
            outcome_failure: "FAILURE".into(),
            meta_filter: "Filter:".into(),
            examples_table: "Examples:".into(),
            given: "Given".into(),
            when: "When".into(),
            then: "Then".into(),
            and: "And".into(),
            ignorable: "!--".into(),
        }
    }
}

/// What a step's leading word turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartingWord {
    /// A typed starting word: `Given`, `When`, `Then` or `And`.
    Typed(StepType),
    /// The comment marker.
    Ignorable,
}

/// A step split into its starting word and the remaining text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitStep<'a> {
    /// Classification of the starting word.
    pub word: StartingWord,
    /// Text after the starting word, with leading whitespace removed.
    pub body: &'a str,
}

impl Keywords {
    /// Words that open a step, in the order they are tried.
    #[must_use]
    pub fn starting_words(&self) -> [&str; 5] {
        [
            self.given.as_str(),
            self.when.as_str(),
            self.then.as_str(),
            self.and.as_str(),
            self.ignorable.as_str(),
        ]
    }

    /// Split `step` into its starting word and body.
    ///
    /// Typed words must be followed by whitespace or the end of the text so
    /// `Givenness` is not read as a `Given` step. The comment marker needs
    /// no separator.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::{Keywords, StartingWord};
    /// use storyline_patterns::StepType;
    ///
    /// let keywords = Keywords::default();
    /// let split = keywords.split_step("When I add 3").expect("typed step");
    /// assert_eq!(split.word, StartingWord::Typed(StepType::When));
    /// assert_eq!(split.body, "I add 3");
    /// assert!(keywords.split_step("Whence I came").is_none());
    /// ```
    #[must_use]
    pub fn split_step<'a>(&self, step: &'a str) -> Option<SplitStep<'a>> {
        let step = step.trim_start();
        if let Some(rest) = step.strip_prefix(self.ignorable.as_str()) {
            return Some(SplitStep {
                word: StartingWord::Ignorable,
                body: rest.trim_start(),
            });
        }
        [
            (&self.given, StepType::Given),
            (&self.when, StepType::When),
            (&self.then, StepType::Then),
            (&self.and, StepType::And),
        ]
        .into_iter()
        .find_map(|(word, ty)| {
            let rest = step.strip_prefix(word.as_str())?;
            let separated = rest.is_empty() || rest.starts_with(char::is_whitespace);
            separated.then(|| SplitStep {
                word: StartingWord::Typed(ty),
                body: rest.trim_start(),
            })
        })
    }

    /// Whether `line` opens a step.
    #[must_use]
    pub fn starts_step(&self, line: &str) -> bool {
        self.split_step(line).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Given a value 5", StartingWord::Typed(StepType::Given), "a value 5")]
    #[case("  Then the result is 8", StartingWord::Typed(StepType::Then), "the result is 8")]
    #[case("And", StartingWord::Typed(StepType::And), "")]
    #[case("!-- a note", StartingWord::Ignorable, "a note")]
    #[case("!--tight", StartingWord::Ignorable, "tight")]
    fn splits_starting_words(
        #[case] text: &str,
        #[case] word: StartingWord,
        #[case] body: &str,
    ) {
        let keywords = Keywords::default();
        assert_eq!(keywords.split_step(text), Some(SplitStep { word, body }));
    }

    #[rstest]
    #[case("Givenness")]
    #[case("Scenario: title")]
    #[case("")]
    fn rejects_non_steps(#[case] text: &str) {
        assert!(Keywords::default().split_step(text).is_none());
    }

    #[test]
    fn localised_words_replace_defaults() {
        let keywords = Keywords {
            given: "Angenommen".into(),
            ..Keywords::default()
        };
        assert!(keywords.starts_step("Angenommen ein Wert 5"));
        assert!(!keywords.starts_step("Given a value 5"));
    }
}
