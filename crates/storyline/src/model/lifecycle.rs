//! Textual lifecycle steps declared by a story.

use std::fmt;

use super::{Meta, MetaFilter};
use crate::keywords::Keywords;

/// Level at which a lifecycle group wraps execution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Scope {
    /// Once around the whole story.
    Story,
    /// Around every scenario (or examples row).
    #[default]
    Scenario,
    /// Around every declared step.
    Step,
}

impl Scope {
    /// Parse a scope value using the keyword table, ignoring case.
    #[must_use]
    pub fn from_keyword(value: &str, keywords: &Keywords) -> Option<Self> {
        let value = value.trim();
        [
            (&keywords.scope_story, Self::Story),
            (&keywords.scope_scenario, Self::Scenario),
            (&keywords.scope_step, Self::Step),
        ]
        .into_iter()
        .find_map(|(word, scope)| value.eq_ignore_ascii_case(word).then_some(scope))
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Story => "story",
            Self::Scenario => "scenario",
            Self::Step => "step",
        }
    }
}

/// Condition under which an after step runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Always.
    #[default]
    Any,
    /// Only when nothing failed before it.
    Success,
    /// Only when something failed before it.
    Failure,
}

impl Outcome {
    /// Parse an outcome value using the keyword table, ignoring case.
    #[must_use]
    pub fn from_keyword(value: &str, keywords: &Keywords) -> Option<Self> {
        let value = value.trim();
        [
            (&keywords.outcome_any, Self::Any),
            (&keywords.outcome_success, Self::Success),
            (&keywords.outcome_failure, Self::Failure),
        ]
        .into_iter()
        .find_map(|(word, outcome)| value.eq_ignore_ascii_case(word).then_some(outcome))
    }

    /// Lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Any => "any",
            Self::Success => "success",
            Self::Failure => "failure",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A run of lifecycle steps sharing scope, outcome and filter.
#[derive(Debug, Clone, Default)]
pub struct LifecycleSteps {
    /// Where the steps apply.
    pub scope: Scope,
    /// When after steps run; before steps ignore it.
    pub outcome: Outcome,
    /// Restricts after steps to matching meta.
    pub meta_filter: Option<MetaFilter>,
    /// Step texts in declaration order.
    pub steps: Vec<String>,
}

impl LifecycleSteps {
    /// Whether the group applies to an element carrying `meta`.
    #[must_use]
    pub fn applies_to(&self, meta: &Meta) -> bool {
        self.meta_filter
            .as_ref()
            .is_none_or(|filter| filter.allow(meta))
    }
}

/// Before and after groups of a story.
#[derive(Debug, Clone, Default)]
pub struct Lifecycle {
    before: Vec<LifecycleSteps>,
    after: Vec<LifecycleSteps>,
}

impl Lifecycle {
    /// Build from parsed groups.
    #[must_use]
    pub fn new(before: Vec<LifecycleSteps>, after: Vec<LifecycleSteps>) -> Self {
        Self { before, after }
    }

    /// Whether no group declares a step.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.before
            .iter()
            .chain(&self.after)
            .all(|group| group.steps.is_empty())
    }

    /// All before groups.
    #[must_use]
    pub fn before(&self) -> &[LifecycleSteps] {
        &self.before
    }

    /// All after groups.
    #[must_use]
    pub fn after(&self) -> &[LifecycleSteps] {
        &self.after
    }

    /// Before step texts of `scope`, in declaration order.
    pub fn before_steps(&self, scope: Scope) -> impl Iterator<Item = &str> {
        self.before
            .iter()
            .filter(move |group| group.scope == scope)
            .flat_map(|group| group.steps.iter().map(String::as_str))
    }

    /// After step texts of `scope` whose group applies to `meta`, each with
    /// the outcome it requires.
    pub fn after_steps<'a>(
        &'a self,
        scope: Scope,
        meta: &'a Meta,
    ) -> impl Iterator<Item = (Outcome, &'a str)> {
        self.after
            .iter()
            .filter(move |group| group.scope == scope && group.applies_to(meta))
            .flat_map(|group| group.steps.iter().map(|step| (group.outcome, step.as_str())))
    }
}
