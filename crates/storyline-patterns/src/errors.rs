//! Ways a step pattern can be rejected.
//!
//! Patterns compile once, while the catalogue is assembled, so every error
//! here points at a step definition and never at story text.

use thiserror::Error;

/// A step pattern that cannot become a [`crate::StepMatcher`].
///
/// # Examples
/// ```
/// use storyline_patterns::{PatternError, StepMatcher};
///
/// let err = StepMatcher::new("$a trades with $a").expect_err("names repeat");
/// assert!(matches!(err, PatternError::DuplicateParameter { ref name, offset: 15, .. } if name == "a"));
/// ```
#[derive(Debug, Error)]
pub enum PatternError {
    /// A parameter name is used twice; captured values bind by name, so the
    /// second occurrence would be unreachable.
    #[error("parameter `{prefix}{name}` is declared twice; the repeat starts at byte {offset}")]
    DuplicateParameter {
        /// Name without its prefix.
        name: String,
        /// Prefix introducing the parameter.
        prefix: char,
        /// Byte offset of the repeated token.
        offset: usize,
    },
    /// The prefix would be read as ordinary step text.
    #[error("{0:?} cannot introduce step parameters: whitespace and word characters are step text")]
    InvalidPrefix(char),
    /// The escaped pattern did not yield a usable expression.
    #[error("step pattern does not compile to a matcher: {0}")]
    Regex(#[from] regex::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_the_repeated_parameter() {
        let err = PatternError::DuplicateParameter {
            name: "price".into(),
            prefix: '$',
            offset: 21,
        };
        assert_eq!(
            err.to_string(),
            "parameter `$price` is declared twice; the repeat starts at byte 21"
        );
    }

    #[test]
    fn explains_rejected_prefixes() {
        let err = PatternError::InvalidPrefix('a');
        assert!(err.to_string().starts_with("'a' cannot introduce"));
    }

    #[test]
    fn wraps_expression_errors() {
        let err = PatternError::from(regex::Error::Syntax("bad".into()));
        assert!(err.to_string().ends_with("bad"));
    }
}
