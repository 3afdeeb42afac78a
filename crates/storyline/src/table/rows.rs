//! Line and cell splitting shared by the table parser and transformers.

use super::TableProperties;

/// Splits table text into rows and cells according to a set of
/// [`TableProperties`].
#[derive(Debug, Clone, Copy)]
pub struct RowParser<'a> {
    properties: &'a TableProperties,
}

impl<'a> RowParser<'a> {
    /// Parser honouring `properties`.
    #[must_use]
    pub fn new(properties: &'a TableProperties) -> Self {
        Self { properties }
    }

    /// Properties in effect.
    #[must_use]
    pub fn properties(&self) -> &'a TableProperties {
        self.properties
    }

    /// Whether `line` holds no row: blank, or opened by the ignorable
    /// separator.
    #[must_use]
    pub fn is_ignorable(&self, line: &str) -> bool {
        let line = line.trim_start();
        line.is_empty() || line.starts_with(self.properties.ignorable_separator())
    }

    /// Lines of `text` that carry rows.
    pub fn lines<'t>(&self, text: &'t str) -> impl Iterator<Item = &'t str> {
        let parser = *self;
        text.lines().filter(move |line| !parser.is_ignorable(line))
    }

    /// Cells of a row.
    ///
    /// The line splits on the header or value separator. Each cell loses
    /// the text after the comment separator and is trimmed when `trim` is
    /// set. A blank leading cell and a blank trailing cell, produced by the
    /// bordering separators, are dropped.
    #[must_use]
    pub fn cells(&self, line: &str, header: bool) -> Vec<String> {
        let separator = if header {
            self.properties.header_separator()
        } else {
            self.properties.value_separator()
        };
        let comment = self.properties.comment_separator();
        let trim = self.properties.trim();
        let mut cells: Vec<String> = line
            .trim_end_matches(['\r', '\n'])
            .split(separator)
            .map(|cell| {
                let cell = comment
                    .and_then(|marker| cell.split_once(marker))
                    .map_or(cell, |(before, _)| before);
                let cell = if trim { cell.trim() } else { cell };
                cell.to_string()
            })
            .collect();
        if cells.first().is_some_and(|cell| cell.trim().is_empty()) {
            cells.remove(0);
        }
        if cells.last().is_some_and(|cell| cell.trim().is_empty()) {
            cells.pop();
        }
        cells
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("|a|b|", vec!["a", "b"])]
    #[case("| a | b |", vec!["a", "b"])]
    #[case("a|b", vec!["a", "b"])]
    #[case("|a||c|", vec!["a", "", "c"])]
    #[case("|a|b|\r", vec!["a", "b"])]
    #[case("||", vec![""])]
    fn splits_cells(#[case] line: &str, #[case] expected: Vec<&str>) {
        let properties = TableProperties::default();
        assert_eq!(RowParser::new(&properties).cells(line, false), expected);
    }

    #[test]
    fn keeps_whitespace_without_trim() {
        let properties = TableProperties::parse_block("trim=false");
        assert_eq!(
            RowParser::new(&properties).cells("| a |b|", false),
            vec![" a ", "b"]
        );
    }

    #[test]
    fn strips_comments() {
        let properties = TableProperties::parse_block("commentSeparator=#");
        assert_eq!(
            RowParser::new(&properties).cells("|1 # first|2|", false),
            vec!["1", "2"]
        );
    }

    #[test]
    fn uses_distinct_header_separator() {
        let properties = TableProperties::parse_block("headerSeparator=!, valueSeparator=|");
        let parser = RowParser::new(&properties);
        assert_eq!(parser.cells("!a!b!", true), vec!["a", "b"]);
        assert_eq!(parser.cells("|1|2|", false), vec!["1", "2"]);
    }

    #[test]
    fn skips_ignorable_lines() {
        let properties = TableProperties::default();
        let text = "|a|\n|-- comment|\n\n   \n|1|";
        assert_eq!(
            RowParser::new(&properties).lines(text).collect::<Vec<_>>(),
            vec!["|a|", "|1|"]
        );
    }
}
