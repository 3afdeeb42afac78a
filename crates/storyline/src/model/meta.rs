//! Meta properties attached to stories and scenarios.

use std::collections::BTreeMap;

use crate::keywords::Keywords;

/// Named string properties, keyed and iterated in name order.
///
/// A property written without a value holds the empty string.
///
/// # Examples
///
/// ```
/// use storyline::{Keywords, Meta};
///
/// let meta = Meta::parse("@author Mauro @theme parsing !-- draft", &Keywords::default());
/// assert_eq!(meta.property("author"), Some("Mauro"));
/// assert_eq!(meta.property("theme"), Some("parsing"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    properties: BTreeMap<String, String>,
}

impl Meta {
    /// Empty meta.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the text following a `Meta:` keyword.
    ///
    /// The text splits on the property prefix. Within each property anything
    /// after the comment marker is discarded; the first word is the name and
    /// the rest, trimmed, is the value. A repeated name keeps its last value.
    #[must_use]
    pub fn parse(text: &str, keywords: &Keywords) -> Self {
        let mut meta = Self::new();
        for property in text.split(keywords.meta_property.as_str()) {
            let property = property
                .split_once(keywords.ignorable.as_str())
                .map_or(property, |(before, _)| before)
                .trim();
            if property.is_empty() {
                continue;
            }
            let (name, value) = property
                .split_once(char::is_whitespace)
                .unwrap_or((property, ""));
            meta.insert(name, value.trim());
        }
        meta
    }

    /// Set `name` to `value`, replacing any previous value.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.properties.insert(name.into(), value.into());
    }

    /// Value of `name`, if present.
    #[must_use]
    pub fn property(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(String::as_str)
    }

    /// Whether `name` is present.
    #[must_use]
    pub fn has_property(&self, name: &str) -> bool {
        self.properties.contains_key(name)
    }

    /// Property names in sorted order.
    pub fn property_names(&self) -> impl Iterator<Item = &str> {
        self.properties.keys().map(String::as_str)
    }

    /// Name/value pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.properties
            .iter()
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Whether no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Number of properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Combine with `parent`: properties of `self` win, missing ones come
    /// from `parent`.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::Meta;
    ///
    /// let story = Meta::from_iter([("theme", "trading"), ("author", "Mauro")]);
    /// let scenario = Meta::from_iter([("theme", "pricing")]);
    /// let effective = scenario.inherit_from(&story);
    /// assert_eq!(effective.property("theme"), Some("pricing"));
    /// assert_eq!(effective.property("author"), Some("Mauro"));
    /// ```
    #[must_use]
    pub fn inherit_from(&self, parent: &Self) -> Self {
        let mut properties = parent.properties.clone();
        properties.extend(self.properties.clone());
        Self { properties }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Meta {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut meta = Self::new();
        for (name, value) in iter {
            meta.insert(name, value);
        }
        meta
    }
}
