//! Examples tables: parsing, properties and transformers.
//!
//! A table is written as separator-delimited lines with a header row,
//! optionally preceded by one or more `{key=value,...}` property blocks.
//! Parsing is lenient: blank lines and lines opened by the ignorable
//! separator are skipped, extra cells are dropped and missing cells read as
//! the empty string.
//!
//! Text that does not open with the header separator names a table resource.
//! A [`TableFactory`] given a [`StoryLoader`] loads it from there.

mod properties;
mod rows;
mod transformers;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use log::{debug, error, warn};

pub use properties::TableProperties;
pub use rows::RowParser;
pub use transformers::{FORMATTING, FROM_LANDSCAPE, REPLACING, TableTransformer, TableTransformers};

use crate::tree::StoryLoader;
use properties::split_property_blocks;

/// Values keyed by column header.
pub type NamedParameters = BTreeMap<String, String>;

/// A parsed examples table.
///
/// Headers are unique and keep their first-appearance order; every row holds
/// exactly one value per header.
///
/// # Examples
///
/// ```
/// use storyline::table::ExamplesTable;
///
/// let table = ExamplesTable::parse("|symbol|price|\n|STK1|10|\n|STK2|20|");
/// assert_eq!(table.headers(), ["symbol", "price"]);
/// assert_eq!(table.row_count(), 2);
/// let second = table.row(1).expect("second row");
/// assert_eq!(second.get("price").map(String::as_str), Some("20"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExamplesTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    properties: TableProperties,
}

impl ExamplesTable {
    /// Table without headers or rows.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse `text` with the built-in transformers.
    #[must_use]
    pub fn parse(text: &str) -> Self {
        TableFactory::default().create(text)
    }

    /// Build a table from headers and rows, padding or truncating each row to
    /// the header count.
    #[must_use]
    pub fn from_rows<H, R, V>(headers: H, rows: R) -> Self
    where
        H: IntoIterator,
        H::Item: Into<String>,
        R: IntoIterator<Item = V>,
        V: IntoIterator,
        V::Item: Into<String>,
    {
        let headers: Vec<String> = headers.into_iter().map(Into::into).collect();
        let rows = rows
            .into_iter()
            .map(|row| {
                let mut values: Vec<String> = row.into_iter().map(Into::into).collect();
                values.resize(headers.len(), String::new());
                values
            })
            .collect();
        Self {
            headers,
            rows,
            properties: TableProperties::default(),
        }
    }

    /// Column headers in order.
    #[must_use]
    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    /// Number of data rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Properties the table was parsed with.
    #[must_use]
    pub fn properties(&self) -> &TableProperties {
        &self.properties
    }

    /// Cell values of row `index` in header order.
    #[must_use]
    pub fn cells(&self, index: usize) -> Option<&[String]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Row `index` keyed by header.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<NamedParameters> {
        self.rows.get(index).map(|values| self.named(values))
    }

    /// All rows keyed by header.
    #[must_use]
    pub fn rows(&self) -> Vec<NamedParameters> {
        self.rows.iter().map(|values| self.named(values)).collect()
    }

    fn named(&self, values: &[String]) -> NamedParameters {
        self.headers
            .iter()
            .cloned()
            .zip(values.iter().cloned())
            .collect()
    }

    /// Copy of the table with `values` written into row `index`. Unknown
    /// names become new columns, empty in every other row.
    #[must_use]
    pub fn with_row_values(&self, index: usize, values: &NamedParameters) -> Self {
        let mut table = self.clone();
        for (name, value) in values {
            let existing = table.headers.iter().position(|h| h == name);
            let column = existing.unwrap_or_else(|| {
                table.headers.push(name.clone());
                for row in &mut table.rows {
                    row.push(String::new());
                }
                table.headers.len() - 1
            });
            if let Some(cell) = table.rows.get_mut(index).and_then(|row| row.get_mut(column)) {
                cell.clone_from(value);
            }
        }
        table
    }

    /// Render back to table text; the empty string when there are no rows.
    ///
    /// Parsing the rendered text yields an equal table.
    #[must_use]
    pub fn as_string(&self) -> String {
        if self.rows.is_empty() {
            return String::new();
        }
        let mut out = String::new();
        push_line(&mut out, &self.headers, self.properties.header_separator());
        for row in &self.rows {
            push_line(&mut out, row, self.properties.value_separator());
        }
        out
    }
}

fn push_line(out: &mut String, cells: &[String], separator: &str) {
    out.push_str(separator);
    for cell in cells {
        out.push_str(cell);
        out.push_str(separator);
    }
    out.push('\n');
}

impl fmt::Display for ExamplesTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Builds [`ExamplesTable`]s with a configurable transformer registry and
/// default properties.
#[derive(Clone, Default)]
pub struct TableFactory {
    transformers: TableTransformers,
    defaults: TableProperties,
    loader: Option<Arc<dyn StoryLoader>>,
}

impl fmt::Debug for TableFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableFactory")
            .field("transformers", &self.transformers)
            .field("defaults", &self.defaults)
            .field("loads_resources", &self.loader.is_some())
            .finish()
    }
}

impl TableFactory {
    /// Factory using `transformers`.
    #[must_use]
    pub fn new(transformers: TableTransformers) -> Self {
        Self {
            transformers,
            defaults: TableProperties::default(),
            loader: None,
        }
    }

    /// Load tables given by path through `loader`.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use storyline::InMemoryStories;
    /// use storyline::table::TableFactory;
    ///
    /// let loader = InMemoryStories::new().with("data/prices.table", "|symbol|\n|STK1|");
    /// let factory = TableFactory::default().with_loader(Arc::new(loader));
    /// assert_eq!(factory.create("data/prices.table").row_count(), 1);
    /// ```
    #[must_use]
    pub fn with_loader(mut self, loader: Arc<dyn StoryLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Use `defaults` beneath every table's own properties.
    #[must_use]
    pub fn with_defaults(mut self, defaults: TableProperties) -> Self {
        self.defaults = defaults;
        self
    }

    /// The transformer registry.
    #[must_use]
    pub fn transformers(&self) -> &TableTransformers {
        &self.transformers
    }

    /// Mutable access to the transformer registry.
    pub fn transformers_mut(&mut self) -> &mut TableTransformers {
        &mut self.transformers
    }

    /// Parse `text` into a table.
    ///
    /// When the text after its property blocks does not start with the
    /// header separator it is a resource path: the resource's own blocks
    /// follow the inline ones and its body is parsed instead. A resource
    /// that cannot be loaded yields an empty table.
    ///
    /// Property blocks merge in order, later keys winning. Blocks naming a
    /// transformer are applied from the last block to the first, each seeing
    /// the merged properties overridden by its own block.
    #[must_use]
    pub fn create(&self, text: &str) -> ExamplesTable {
        let (mut blocks, body) = split_property_blocks(text.trim());
        let body = body.trim();
        let loaded = self.load_resource(&blocks, body);
        let body = match &loaded {
            Some(resource) => {
                let (resource_blocks, rest) = split_property_blocks(resource.trim());
                blocks.extend(resource_blocks);
                rest
            }
            None => body,
        };
        let properties = blocks
            .iter()
            .fold(self.defaults.clone(), |merged, block| merged.overridden_by(block));
        let mut body = body.to_string();
        for block in blocks.iter().rev() {
            let Some(name) = block.transformer() else {
                continue;
            };
            let stage = properties.overridden_by(block);
            match self.transformers.transform(name, &body, &stage) {
                Some(transformed) => body = transformed,
                None => warn!("ignoring unknown table transformer `{name}`"),
            }
        }
        parse_rows(&body, properties)
    }

    /// Text of the resource `body` names, when it is not table text.
    fn load_resource(&self, blocks: &[TableProperties], body: &str) -> Option<String> {
        let inline = blocks
            .iter()
            .fold(self.defaults.clone(), |merged, block| merged.overridden_by(block));
        if body.is_empty() || body.starts_with(inline.header_separator()) {
            return None;
        }
        let Some(loader) = &self.loader else {
            warn!("no loader for examples table `{body}`, reading it as table text");
            return None;
        };
        match loader.load_story_text(body) {
            Ok(text) => {
                debug!("loaded examples table `{body}`");
                Some(text)
            }
            Err(err) => {
                error!("examples table `{body}` could not be loaded: {err}");
                Some(String::new())
            }
        }
    }
}

fn parse_rows(text: &str, properties: TableProperties) -> ExamplesTable {
    let parser = RowParser::new(&properties);
    let mut lines = parser.lines(text);
    let mut headers: Vec<String> = Vec::new();
    let mut columns: Vec<usize> = Vec::new();
    if let Some(line) = lines.next() {
        for (column, header) in parser.cells(line, true).into_iter().enumerate() {
            if let Some(existing) = headers.iter().position(|h| *h == header) {
                if let Some(slot) = columns.get_mut(existing) {
                    *slot = column;
                }
            } else {
                headers.push(header);
                columns.push(column);
            }
        }
    }
    let rows = lines
        .map(|line| {
            let cells = parser.cells(line, false);
            columns
                .iter()
                .map(|&column| cells.get(column).cloned().unwrap_or_default())
                .collect()
        })
        .collect();
    ExamplesTable {
        headers,
        rows,
        properties,
    }
}

#[cfg(test)]
mod tests;
