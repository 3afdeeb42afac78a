//! Stories included by path before a story or scenario runs.
//!
//! Entries are comma separated. Each is a story path optionally followed by
//! an anchor: `path#2` hands row 2 of the including scenario's examples
//! table to the given story as named parameters, `path#{id:first;kind:smoke}`
//! runs only the given story's scenarios whose meta carries every listed
//! pair.

use std::collections::BTreeMap;

use log::warn;

use super::Meta;
use crate::table::{ExamplesTable, NamedParameters};

/// How a given story is narrowed by its including story.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Anchor {
    /// Examples row, by zero-based index, supplying named parameters.
    Row(usize),
    /// Meta values a given-story scenario must carry to run.
    Meta(BTreeMap<String, String>),
}

impl Anchor {
    /// Whether a scenario with `meta` is selected. Row anchors select every
    /// scenario.
    #[must_use]
    pub fn selects(&self, meta: &Meta) -> bool {
        match self {
            Self::Row(_) => true,
            Self::Meta(wanted) => wanted
                .iter()
                .all(|(name, value)| meta.property(name) == Some(value.as_str())),
        }
    }
}

/// One entry of a given-stories list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GivenStory {
    path: String,
    anchor: Option<Anchor>,
}

impl GivenStory {
    /// Parse a single entry such as `stories/login.story#1`.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::{Anchor, GivenStory};
    ///
    /// let given = GivenStory::parse(" stories/login.story#1 ");
    /// assert_eq!(given.path(), "stories/login.story");
    /// assert_eq!(given.anchor(), Some(&Anchor::Row(1)));
    /// ```
    #[must_use]
    pub fn parse(entry: &str) -> Self {
        let entry = entry.trim();
        let Some((path, anchor)) = entry.split_once('#') else {
            return Self {
                path: entry.to_string(),
                anchor: None,
            };
        };
        Self {
            path: path.trim().to_string(),
            anchor: parse_anchor(anchor.trim()),
        }
    }

    /// Path of the included story.
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Anchor selecting parameters, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<&Anchor> {
        self.anchor.as_ref()
    }

    /// Parameters handed to the given story: the row of `table` a row
    /// anchor names, or nothing.
    #[must_use]
    pub fn parameters(&self, table: &ExamplesTable) -> NamedParameters {
        match &self.anchor {
            Some(Anchor::Row(index)) => table.row(*index).unwrap_or_default(),
            _ => NamedParameters::new(),
        }
    }

    /// Whether the given story's scenario carrying `meta` should run.
    #[must_use]
    pub fn selects(&self, meta: &Meta) -> bool {
        self.anchor.as_ref().is_none_or(|anchor| anchor.selects(meta))
    }
}

fn parse_anchor(anchor: &str) -> Option<Anchor> {
    if anchor.is_empty() {
        return None;
    }
    if let Some(inner) = anchor
        .strip_prefix('{')
        .and_then(|rest| rest.strip_suffix('}'))
    {
        let values = inner
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.split_once(':')?;
                Some((name.trim().to_string(), value.trim().to_string()))
            })
            .collect();
        return Some(Anchor::Meta(values));
    }
    match anchor.parse() {
        Ok(index) => Some(Anchor::Row(index)),
        Err(_) => {
            warn!("ignoring unrecognised given story anchor `#{anchor}`");
            None
        }
    }
}

/// Ordered list of given stories.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GivenStories {
    text: String,
    stories: Vec<GivenStory>,
}

impl GivenStories {
    /// Parse a comma separated list of entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::GivenStories;
    ///
    /// let given = GivenStories::parse("a.story, b.story#2");
    /// assert_eq!(given.paths().collect::<Vec<_>>(), vec!["a.story", "b.story"]);
    /// assert!(given.requires_parameters());
    /// ```
    #[must_use]
    pub fn parse(text: &str) -> Self {
        let stories = text
            .split(',')
            .filter(|entry| !entry.trim().is_empty())
            .map(GivenStory::parse)
            .collect();
        Self {
            text: text.trim().to_string(),
            stories,
        }
    }

    /// Entries in declaration order.
    #[must_use]
    pub fn stories(&self) -> &[GivenStory] {
        &self.stories
    }

    /// Paths in declaration order.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.stories.iter().map(GivenStory::path)
    }

    /// The text the list was parsed from.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Whether the list is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stories.is_empty()
    }

    /// Whether any entry takes its parameters from an examples row.
    #[must_use]
    pub fn requires_parameters(&self) -> bool {
        self.stories
            .iter()
            .any(|story| matches!(story.anchor, Some(Anchor::Row(_))))
    }
}
