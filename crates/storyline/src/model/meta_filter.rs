//! Include/exclude expressions over [`Meta`].
//!
//! A filter such as `+theme trading -skip` is a list of terms. `+name value`
//! includes, `-name value` excludes. A term value may use `*` as a wildcard
//! and a bare `-name` matches the property whatever its value.

use std::fmt;

use log::warn;
use regex::Regex;

use super::Meta;

#[derive(Debug, Clone)]
struct Term {
    name: String,
    value: String,
    glob: Option<Regex>,
}

impl Term {
    fn new(name: &str, value: &str) -> Self {
        let glob = if value.contains('*') {
            let source = value
                .split('*')
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(".*");
            Regex::new(&format!("(?s)^{source}$"))
                .map_err(|err| warn!("ignoring wildcard in meta filter value `{value}`: {err}"))
                .ok()
        } else {
            None
        };
        Self {
            name: name.to_string(),
            value: value.to_string(),
            glob,
        }
    }

    fn matches(&self, meta: &Meta) -> bool {
        let Some(actual) = meta.property(&self.name) else {
            return false;
        };
        if self.value.is_empty() || actual.is_empty() {
            return true;
        }
        self.glob
            .as_ref()
            .map_or_else(|| self.value == actual, |glob| glob.is_match(actual))
    }
}

/// Parsed meta filter expression.
///
/// The empty filter allows everything.
///
/// # Examples
///
/// ```
/// use storyline::{Meta, MetaFilter};
///
/// let filter = MetaFilter::parse("+theme trad* -skip");
/// assert!(filter.allow(&Meta::from_iter([("theme", "trading")])));
/// assert!(filter.excluded(&Meta::from_iter([("theme", "trading"), ("skip", "")])));
/// assert!(filter.excluded(&Meta::from_iter([("theme", "pricing")])));
/// ```
#[derive(Debug, Clone, Default)]
pub struct MetaFilter {
    text: String,
    include: Vec<Term>,
    exclude: Vec<Term>,
}

impl MetaFilter {
    /// Filter allowing every meta.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse a filter expression.
    ///
    /// Words are grouped into terms: a word starting with `+` or `-` opens a
    /// term whose name is the rest of the word, and following plain words
    /// form its value. Words before the first term are ignored with a
    /// warning.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let mut filter = Self {
            text: text.trim().to_string(),
            ..Self::default()
        };
        let mut current: Option<(bool, String, Vec<&str>)> = None;
        for word in text.split_whitespace() {
            let opened = word
                .strip_prefix('+')
                .map(|name| (true, name))
                .or_else(|| word.strip_prefix('-').map(|name| (false, name)));
            if let Some((include, name)) = opened {
                if let Some(term) = current.take() {
                    filter.push(term);
                }
                current = Some((include, name.to_string(), Vec::new()));
            } else if let Some((_, _, value)) = current.as_mut() {
                value.push(word);
            } else {
                warn!("ignoring `{word}` before the first term of meta filter `{text}`");
            }
        }
        if let Some(term) = current {
            filter.push(term);
        }
        filter
    }

    fn push(&mut self, (include, name, value): (bool, String, Vec<&str>)) {
        if name.is_empty() {
            warn!("ignoring meta filter term without a property name in `{}`", self.text);
            return;
        }
        let term = Term::new(&name, &value.join(" "));
        if include {
            self.include.push(term);
        } else {
            self.exclude.push(term);
        }
    }

    /// The expression this filter was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the filter has no terms.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.include.is_empty() && self.exclude.is_empty()
    }

    /// Whether `meta` passes: every include term list needs at least one
    /// match (when present) and no exclude term may match.
    #[must_use]
    pub fn allow(&self, meta: &Meta) -> bool {
        let included =
            self.include.is_empty() || self.include.iter().any(|term| term.matches(meta));
        let excluded = self.exclude.iter().any(|term| term.matches(meta));
        included && !excluded
    }

    /// Negation of [`MetaFilter::allow`].
    #[must_use]
    pub fn excluded(&self, meta: &Meta) -> bool {
        !self.allow(meta)
    }
}

impl fmt::Display for MetaFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn meta(pairs: &[(&str, &str)]) -> Meta {
        pairs.iter().copied().collect()
    }

    #[test]
    fn empty_filter_allows_everything() {
        let filter = MetaFilter::parse("   ");
        assert!(filter.is_empty());
        assert!(filter.allow(&Meta::new()));
        assert!(filter.allow(&meta(&[("skip", "")])));
    }

    #[rstest]
    #[case("+author Mauro", &[("author", "Mauro")], true)]
    #[case("+author Mauro", &[("author", "Paul")], false)]
    #[case("+author Mauro", &[], false)]
    #[case("-skip", &[("skip", "")], false)]
    #[case("-skip", &[("skip", "yes")], false)]
    #[case("-skip", &[("theme", "x")], true)]
    #[case("+theme smoke*", &[("theme", "smoke-tests")], true)]
    #[case("+theme *tests", &[("theme", "smoke-tests")], true)]
    #[case("+theme smoke*", &[("theme", "regression")], false)]
    #[case("+title a long value", &[("title", "a long value")], true)]
    #[case("+theme x +theme y", &[("theme", "y")], true)]
    fn evaluates_terms(#[case] text: &str, #[case] pairs: &[(&str, &str)], #[case] allowed: bool) {
        let filter = MetaFilter::parse(text);
        assert_eq!(filter.allow(&meta(pairs)), allowed, "{text} vs {pairs:?}");
        assert_eq!(filter.excluded(&meta(pairs)), !allowed);
    }

    #[test]
    fn property_without_value_matches_any_term_value() {
        let filter = MetaFilter::parse("+theme trading");
        assert!(filter.allow(&meta(&[("theme", "")])));
    }

    #[test]
    fn exclusion_wins_over_inclusion() {
        let filter = MetaFilter::parse("+theme trading -skip");
        assert!(filter.excluded(&meta(&[("theme", "trading"), ("skip", "")])));
    }

    #[test]
    fn leading_words_are_ignored() {
        let filter = MetaFilter::parse("stray +theme x");
        assert!(filter.allow(&meta(&[("theme", "x")])));
        assert_eq!(filter.as_str(), "stray +theme x");
    }
}
