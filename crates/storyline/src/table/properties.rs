//! Properties controlling how an examples table is read.

use std::collections::BTreeMap;

use log::warn;

const HEADER_SEPARATOR: &str = "headerSeparator";
const VALUE_SEPARATOR: &str = "valueSeparator";
const IGNORABLE_SEPARATOR: &str = "ignorableSeparator";
const COMMENT_SEPARATOR: &str = "commentSeparator";
const TRIM: &str = "trim";
const TRANSFORMER: &str = "transformer";

/// Key/value properties of a table.
///
/// Well-known keys have typed accessors with defaults: `headerSeparator`
/// and `valueSeparator` default to `|`, `ignorableSeparator` to `|--`,
/// `commentSeparator` is unset and `trim` defaults to `true`. Other keys are
/// kept for transformers.
///
/// # Examples
///
/// ```
/// use storyline::table::TableProperties;
///
/// let properties = TableProperties::parse_block("valueSeparator=!, trim=false");
/// assert_eq!(properties.value_separator(), "!");
/// assert_eq!(properties.header_separator(), "|");
/// assert!(!properties.trim());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableProperties {
    values: BTreeMap<String, String>,
}

impl TableProperties {
    /// Parse the inside of a `{...}` block.
    ///
    /// Pairs are separated by unescaped commas; `\,`, `\{` and `\}` stand
    /// for the literal characters. Keys and values are trimmed.
    #[must_use]
    pub fn parse_block(block: &str) -> Self {
        let mut values = BTreeMap::new();
        for pair in split_unescaped(block, ',') {
            let pair = unescape(&pair);
            match pair.split_once('=') {
                Some((key, value)) => {
                    values.insert(key.trim().to_string(), value.trim().to_string());
                }
                None if pair.trim().is_empty() => {}
                None => warn!("ignoring table property without a value: `{}`", pair.trim()),
            }
        }
        Self { values }
    }

    /// Combine with `other`, whose keys win.
    #[must_use]
    pub fn overridden_by(&self, other: &Self) -> Self {
        let mut values = self.values.clone();
        values.extend(other.values.clone());
        Self { values }
    }

    /// Set `key` to `value`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    /// Raw value of `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Whether no property is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Separator between header cells.
    #[must_use]
    pub fn header_separator(&self) -> &str {
        self.get(HEADER_SEPARATOR).unwrap_or("|")
    }

    /// Separator between value cells.
    #[must_use]
    pub fn value_separator(&self) -> &str {
        self.get(VALUE_SEPARATOR).unwrap_or("|")
    }

    /// Prefix marking a line to skip.
    #[must_use]
    pub fn ignorable_separator(&self) -> &str {
        self.get(IGNORABLE_SEPARATOR).unwrap_or("|--")
    }

    /// Marker after which a cell's text is discarded.
    #[must_use]
    pub fn comment_separator(&self) -> Option<&str> {
        self.get(COMMENT_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Whether cells are trimmed.
    #[must_use]
    pub fn trim(&self) -> bool {
        self.get(TRIM).is_none_or(|value| !value.trim().eq_ignore_ascii_case("false"))
    }

    /// Name of the transformer to apply, if any.
    #[must_use]
    pub fn transformer(&self) -> Option<&str> {
        self.get(TRANSFORMER).map(str::trim).filter(|s| !s.is_empty())
    }
}

fn split_unescaped(text: &str, separator: char) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => {
                current.push(c);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            c if c == separator => parts.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    parts.push(current);
    parts
}

fn unescape(text: &str) -> String {
    text.replace("\\,", ",")
        .replace("\\{", "{")
        .replace("\\}", "}")
}

/// Split leading `{...}` property blocks off `text`.
///
/// Returns the blocks in order of appearance and the remaining table text.
/// A block whose closing brace is missing is left in the table text.
pub(crate) fn split_property_blocks(text: &str) -> (Vec<TableProperties>, &str) {
    let mut blocks = Vec::new();
    let mut rest = text.trim_start();
    while let Some(body) = rest.strip_prefix('{') {
        let Some(end) = closing_brace(body) else {
            break;
        };
        let (inside, after) = body.split_at(end);
        blocks.push(TableProperties::parse_block(inside));
        rest = after.strip_prefix('}').unwrap_or(after).trim_start();
    }
    (blocks, rest)
}

fn closing_brace(text: &str) -> Option<usize> {
    let mut escaped = false;
    for (index, c) in text.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '}' => return Some(index),
            _ => {}
        }
    }
    None
}
