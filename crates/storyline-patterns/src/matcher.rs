//! Compiled step matchers.

use regex::Regex;

use crate::capture::extract_captured_values;
use crate::errors::PatternError;
use crate::pattern::{compile_regex_from_pattern, lexer::is_word_char};

/// Prefix introducing a parameter in a step pattern unless configured
/// otherwise.
pub const DEFAULT_PARAMETER_PREFIX: char = '$';

/// A step pattern compiled once and reused for every match attempt.
///
/// The matcher is a pure value: matching never mutates it, so a single
/// instance can be shared between threads.
///
/// # Examples
/// ```
/// use storyline_patterns::StepMatcher;
///
/// let matcher = StepMatcher::new("a trader of symbol $symbol")
///     .expect("example ensures fallible call succeeds");
/// assert_eq!(matcher.parameter_names(), ["symbol"]);
/// assert_eq!(
///     matcher.find("a trader of symbol STK1"),
///     Some(vec!["STK1".to_string()])
/// );
/// assert!(matcher.find("a trader").is_none());
/// ```
#[derive(Debug, Clone)]
pub struct StepMatcher {
    pattern: String,
    regex: Regex,
    parameter_names: Vec<String>,
}

impl StepMatcher {
    /// Compile `pattern` using the [`DEFAULT_PARAMETER_PREFIX`].
    ///
    /// # Errors
    /// Returns [`PatternError`] when the pattern cannot be compiled.
    pub fn new(pattern: &str) -> Result<Self, PatternError> {
        Self::with_prefix(pattern, DEFAULT_PARAMETER_PREFIX)
    }

    /// Compile `pattern` treating `prefix` as the parameter marker.
    ///
    /// # Errors
    /// Returns [`PatternError::InvalidPrefix`] when `prefix` is whitespace or
    /// a word character, and other [`PatternError`] variants when the pattern
    /// cannot be compiled.
    pub fn with_prefix(pattern: &str, prefix: char) -> Result<Self, PatternError> {
        if prefix.is_whitespace() || is_word_char(prefix) {
            return Err(PatternError::InvalidPrefix(prefix));
        }
        let (regex, parameter_names) = compile_regex_from_pattern(pattern, prefix)?;
        Ok(Self {
            pattern: pattern.to_string(),
            regex,
            parameter_names,
        })
    }

    /// The pattern text the matcher was compiled from.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The compiled regular expression.
    #[must_use]
    pub fn regex(&self) -> &Regex {
        &self.regex
    }

    /// Parameter names in capture order.
    #[must_use]
    pub fn parameter_names(&self) -> &[String] {
        &self.parameter_names
    }

    /// Position of the capture group recorded for `name`.
    #[must_use]
    pub fn position_of(&self, name: &str) -> Option<usize> {
        self.parameter_names.iter().position(|n| n == name)
    }

    /// Whether `text` matches the whole pattern.
    #[must_use]
    pub fn matches(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    /// Captured parameter values when `text` matches, in capture order.
    #[must_use]
    pub fn find(&self, text: &str) -> Option<Vec<String>> {
        extract_captured_values(&self.regex, text)
    }
}

impl PartialEq for StepMatcher {
    fn eq(&self, other: &Self) -> bool {
        self.pattern == other.pattern && self.parameter_names == other.parameter_names
    }
}

impl Eq for StepMatcher {}
