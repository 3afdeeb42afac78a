//! Named rewrites applied to table text before it is parsed.

use std::fmt;
use std::sync::Arc;

use hashbrown::HashMap;

use super::{RowParser, TableProperties};

/// Rotates a table whose first column holds the headers.
pub const FROM_LANDSCAPE: &str = "FROM_LANDSCAPE";
/// Pads cells so columns line up.
pub const FORMATTING: &str = "FORMATTING";
/// Replaces the `replacing` property with `replacement` throughout the text.
pub const REPLACING: &str = "REPLACING";

/// A pure rewrite of table text.
///
/// Closures of the matching shape implement the trait.
pub trait TableTransformer: Send + Sync {
    /// Produce new table text from `table`.
    fn transform(&self, table: &str, rows: &RowParser<'_>, properties: &TableProperties) -> String;
}

impl<F> TableTransformer for F
where
    F: Fn(&str, &RowParser<'_>, &TableProperties) -> String + Send + Sync,
{
    fn transform(&self, table: &str, rows: &RowParser<'_>, properties: &TableProperties) -> String {
        self(table, rows, properties)
    }
}

/// Registry of transformers by name, seeded with the built-ins.
#[derive(Clone)]
pub struct TableTransformers {
    transformers: HashMap<String, Arc<dyn TableTransformer>>,
}

impl TableTransformers {
    /// Registry without any transformer.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            transformers: HashMap::new(),
        }
    }

    /// Register `transformer` under `name`, replacing any previous entry.
    pub fn register(&mut self, name: impl Into<String>, transformer: impl TableTransformer + 'static) {
        self.transformers.insert(name.into(), Arc::new(transformer));
    }

    /// Whether `name` is registered.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.transformers.contains_key(name)
    }

    /// Apply the transformer registered as `name`; `None` when unknown.
    #[must_use]
    pub fn transform(&self, name: &str, table: &str, properties: &TableProperties) -> Option<String> {
        let transformer = self.transformers.get(name)?;
        Some(transformer.transform(table, &RowParser::new(properties), properties))
    }
}

impl Default for TableTransformers {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(FROM_LANDSCAPE, from_landscape);
        registry.register(FORMATTING, formatting);
        registry.register(REPLACING, replacing);
        registry
    }
}

impl fmt::Debug for TableTransformers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.transformers.keys().collect();
        names.sort();
        f.debug_struct("TableTransformers").field("names", &names).finish()
    }
}

fn from_landscape(table: &str, rows: &RowParser<'_>, properties: &TableProperties) -> String {
    let columns: Vec<Vec<String>> = rows.lines(table).map(|line| rows.cells(line, false)).collect();
    let height = columns.iter().map(|c| c.len().saturating_sub(1)).max().unwrap_or(0);
    let header_sep = properties.header_separator();
    let value_sep = properties.value_separator();
    let mut out = String::new();
    out.push_str(&join_row(columns.iter().map(|c| c.first().map_or("", String::as_str)), header_sep));
    for index in 1..=height {
        out.push_str(&join_row(
            columns
                .iter()
                .map(|c| c.get(index).map_or("", String::as_str)),
            value_sep,
        ));
    }
    out
}

fn join_row<'a>(cells: impl Iterator<Item = &'a str>, separator: &str) -> String {
    let mut line = String::from(separator);
    for cell in cells {
        line.push_str(cell);
        line.push_str(separator);
    }
    line.push('\n');
    line
}

fn formatting(table: &str, rows: &RowParser<'_>, properties: &TableProperties) -> String {
    let parsed: Vec<Vec<String>> = rows
        .lines(table)
        .enumerate()
        .map(|(index, line)| rows.cells(line, index == 0))
        .collect();
    let mut widths: Vec<usize> = Vec::new();
    for row in &parsed {
        for (column, cell) in row.iter().enumerate() {
            let width = cell.chars().count();
            match widths.get_mut(column) {
                Some(current) => *current = (*current).max(width),
                None => widths.push(width),
            }
        }
    }
    parsed
        .iter()
        .enumerate()
        .map(|(index, row)| {
            let separator = if index == 0 {
                properties.header_separator()
            } else {
                properties.value_separator()
            };
            let mut line = String::from(separator);
            for (column, &width) in widths.iter().enumerate() {
                let cell = row.get(column).map_or("", String::as_str);
                line.push_str(&format!("{cell:<width$}"));
                line.push_str(separator);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn replacing(table: &str, _rows: &RowParser<'_>, properties: &TableProperties) -> String {
    match (properties.get("replacing"), properties.get("replacement")) {
        (Some(from), Some(to)) if !from.is_empty() => table.replace(from, to),
        _ => table.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(name: &str, table: &str, block: &str) -> Option<String> {
        TableTransformers::default().transform(name, table, &TableProperties::parse_block(block))
    }

    #[test]
    fn rotates_landscape_tables() {
        let out = apply(FROM_LANDSCAPE, "|one|1|2|\n|two|3|4|", "");
        assert_eq!(out.as_deref(), Some("|one|two|\n|1|3|\n|2|4|\n"));
    }

    #[test]
    fn landscape_pads_short_rows() {
        let out = apply(FROM_LANDSCAPE, "|one|1|2|\n|two|3|", "");
        assert_eq!(out.as_deref(), Some("|one|two|\n|1|3|\n|2||\n"));
    }

    #[test]
    fn formats_columns_to_equal_width() {
        let out = apply(FORMATTING, "|a|bbb|\n|cc|d|", "");
        assert_eq!(out.as_deref(), Some("|a |bbb|\n|cc|d  |"));
    }

    #[test]
    fn replaces_text() {
        let out = apply(REPLACING, "|a|\n|x-y|", "replacing=-, replacement=+");
        assert_eq!(out.as_deref(), Some("|a|\n|x+y|"));
    }

    #[test]
    fn replacing_without_properties_is_identity() {
        assert_eq!(apply(REPLACING, "|a|", "").as_deref(), Some("|a|"));
    }

    #[test]
    fn unknown_transformer_yields_none() {
        assert!(apply("NOPE", "|a|", "").is_none());
    }

    #[test]
    fn closures_register_as_transformers() {
        let mut registry = TableTransformers::empty();
        registry.register("UPPER", |table: &str, _: &RowParser<'_>, _: &TableProperties| {
            table.to_uppercase()
        });
        assert!(registry.contains("UPPER"));
        let out = registry.transform("UPPER", "|a|", &TableProperties::default());
        assert_eq!(out.as_deref(), Some("|A|"));
    }
}
