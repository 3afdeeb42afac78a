//! Step type shared by the catalogue and the matching engine.
//!
//! [`StepType`] categorises both candidate step definitions and the textual
//! steps of a story. `And` never appears on a candidate: a textual `And` step
//! inherits the type of the previous non-`And` step through
//! [`StepType::resolve`].

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Type of a step, mirroring the starting word that introduced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepType {
    /// Setup preconditions for a scenario.
    Given,
    /// Perform an action.
    When,
    /// Assert an outcome.
    Then,
    /// Continue the previous step type.
    And,
}

impl StepType {
    /// Return the canonical English keyword.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline_patterns::StepType;
    ///
    /// assert_eq!(StepType::Given.as_str(), "Given");
    /// assert_eq!(StepType::And.as_str(), "And");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Given => "Given",
            Self::When => "When",
            Self::Then => "Then",
            Self::And => "And",
        }
    }

    /// Resolve the effective type of a textual step.
    ///
    /// `And` resolves to `previous`, the type of the last non-`And` step, and
    /// yields `None` when there is no such step: an `And` opening a step list
    /// has no type and can never match a candidate. Primary types resolve to
    /// themselves and become the new `previous`.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline_patterns::StepType;
    ///
    /// let mut previous = None;
    /// assert_eq!(StepType::And.resolve(&mut previous), None);
    /// assert_eq!(StepType::When.resolve(&mut previous), Some(StepType::When));
    /// assert_eq!(StepType::And.resolve(&mut previous), Some(StepType::When));
    /// ```
    pub fn resolve(self, previous: &mut Option<Self>) -> Option<Self> {
        if self == Self::And {
            *previous
        } else {
            *previous = Some(self);
            Some(self)
        }
    }
}

impl fmt::Display for StepType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a [`StepType`] from a string fails.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid step type: {0}")]
pub struct StepTypeParseError(pub String);

impl FromStr for StepType {
    type Err = StepTypeParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        [Self::Given, Self::When, Self::Then, Self::And]
            .into_iter()
            .find(|ty| trimmed.eq_ignore_ascii_case(ty.as_str()))
            .ok_or_else(|| StepTypeParseError(trimmed.to_string()))
    }
}
