//! Tests for examples table parsing, rendering and transformer stages.

use super::*;
use crate::tree::InMemoryStories;
use rstest::rstest;

fn values(table: &ExamplesTable, index: usize) -> Vec<&str> {
    table
        .cells(index)
        .map(|cells| cells.iter().map(String::as_str).collect())
        .unwrap_or_default()
}

#[test]
fn parses_header_and_rows() {
    let table = ExamplesTable::parse("|a|b|\n|1|2|\n|3|4|");
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(values(&table, 0), vec!["1", "2"]);
    assert_eq!(values(&table, 1), vec!["3", "4"]);
    assert!(!table.is_empty());
}

#[rstest]
#[case("")]
#[case("   \n  ")]
#[case("|a|b|")]
fn tables_without_rows_are_empty(#[case] text: &str) {
    let table = ExamplesTable::parse(text);
    assert!(table.is_empty());
    assert_eq!(table.as_string(), "");
}

#[test]
fn pads_missing_and_drops_extra_cells() {
    let table = ExamplesTable::parse("|a|b|\n|1|\n|2|3|4|");
    assert_eq!(values(&table, 0), vec!["1", ""]);
    assert_eq!(values(&table, 1), vec!["2", "3"]);
}

#[test]
fn skips_blank_and_ignorable_lines() {
    let table = ExamplesTable::parse("|a|\n\n|-- a comment row|\n|1|\r\n|2|");
    assert_eq!(table.row_count(), 2);
    assert_eq!(values(&table, 1), vec!["2"]);
}

#[test]
fn duplicate_headers_keep_last_column_value() {
    let table = ExamplesTable::parse("|a|b|a|\n|1|2|3|");
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(values(&table, 0), vec!["3", "2"]);
}

#[test]
fn property_block_changes_separators() {
    let table = ExamplesTable::parse("{valueSeparator=!, headerSeparator=!}\n!a!b!\n!1!2!");
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(values(&table, 0), vec!["1", "2"]);
    assert_eq!(table.as_string(), "!a!b!\n!1!2!\n");
}

#[test]
fn comment_separator_cuts_cells() {
    let table = ExamplesTable::parse("{commentSeparator=#}\n|a|b|\n|1 #one|2|");
    assert_eq!(values(&table, 0), vec!["1", "2"]);
}

#[test]
fn untrimmed_tables_keep_whitespace() {
    let table = ExamplesTable::parse("{trim=false}\n|a|\n| 1 |");
    assert_eq!(values(&table, 0), vec![" 1 "]);
}

#[test]
fn applies_landscape_transformer() {
    let table = ExamplesTable::parse("{transformer=FROM_LANDSCAPE}\n|a|1|2|\n|b|3|4|");
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(values(&table, 0), vec!["1", "3"]);
    assert_eq!(values(&table, 1), vec!["2", "4"]);
}

#[test]
fn applies_stages_from_last_block_to_first() {
    // REPLACING runs first and turns the marker into a separator, then the
    // landscape rotation sees the completed table.
    let text = "{transformer=FROM_LANDSCAPE}\n\
                {transformer=REPLACING, replacing=;, replacement=|}\n\
                |a;1;2|\n|b;3;4|";
    let table = ExamplesTable::parse(text);
    assert_eq!(table.headers(), ["a", "b"]);
    assert_eq!(values(&table, 1), vec!["2", "4"]);
}

#[test]
fn unknown_transformer_leaves_text_unchanged() {
    let table = ExamplesTable::parse("{transformer=MISSING}\n|a|\n|1|");
    assert_eq!(values(&table, 0), vec!["1"]);
    assert_eq!(table.properties().transformer(), Some("MISSING"));
}

#[test]
fn custom_transformer_is_used() {
    let mut factory = TableFactory::default();
    factory.transformers_mut().register(
        "SWAP",
        |_: &str, _: &RowParser<'_>, _: &TableProperties| "|x|\n|swapped|".to_string(),
    );
    let table = factory.create("{transformer=SWAP}\n|a|\n|1|");
    assert_eq!(table.headers(), ["x"]);
    assert_eq!(values(&table, 0), vec!["swapped"]);
}

#[rstest]
#[case("|a|b|\n|1|2|\n|3|4|")]
#[case("|a|b|\n|1|\n|-- skipped|\n|2|3|")]
#[case("|name|note|\n|x|  padded  |\n|y||")]
fn rendering_round_trips(#[case] text: &str) {
    let table = ExamplesTable::parse(text);
    let reparsed = ExamplesTable::parse(&table.as_string());
    assert_eq!(reparsed.headers(), table.headers());
    assert_eq!(reparsed.rows(), table.rows());
}

#[test]
fn writes_row_values_and_adds_columns() {
    let table = ExamplesTable::parse("|a|\n|1|\n|2|");
    let updated = table.with_row_values(
        1,
        &NamedParameters::from([
            ("a".to_string(), "20".to_string()),
            ("b".to_string(), "new".to_string()),
        ]),
    );
    assert_eq!(updated.headers(), ["a", "b"]);
    assert_eq!(values(&updated, 0), vec!["1", ""]);
    assert_eq!(values(&updated, 1), vec!["20", "new"]);
    assert_eq!(values(&table, 1), vec!["2"]);
}

#[test]
fn builds_from_rows() {
    let table = ExamplesTable::from_rows(["a", "b"], [vec!["1"], vec!["2", "3", "4"]]);
    assert_eq!(values(&table, 0), vec!["1", ""]);
    assert_eq!(values(&table, 1), vec!["2", "3"]);
    assert_eq!(table.to_string(), "|a|b|\n|1||\n|2|3|\n");
}

fn loading(entries: &[(&str, &str)]) -> TableFactory {
    let loader = entries
        .iter()
        .fold(InMemoryStories::new(), |stories, (path, text)| {
            stories.with(*path, *text)
        });
    TableFactory::default().with_loader(Arc::new(loader))
}

#[test]
fn paths_load_the_table_they_name() {
    let factory = loading(&[("tables/prices.table", "|symbol|price|\n|STK1|10|\n|STK2|20|")]);
    let table = factory.create("  tables/prices.table\n");
    assert_eq!(table.headers(), ["symbol", "price"]);
    assert_eq!(values(&table, 1), vec!["STK2", "20"]);
}

#[test]
fn loaded_tables_keep_inline_and_own_properties() {
    let factory = loading(&[(
        "tables/bang.table",
        "{commentSeparator=#}\n!symbol!\n!STK1 #first!",
    )]);
    let table = factory.create("{valueSeparator=!, headerSeparator=!}\ntables/bang.table");
    assert_eq!(table.headers(), ["symbol"]);
    assert_eq!(values(&table, 0), vec!["STK1"]);
    assert_eq!(table.properties().header_separator(), "!");
}

#[rstest]
#[case("|a|\n|1|")]
#[case("")]
fn inline_tables_never_touch_the_loader(#[case] text: &str) {
    let factory = loading(&[]);
    assert_eq!(factory.create(text), ExamplesTable::parse(text));
}

#[test]
fn unloadable_paths_give_empty_tables() {
    let table = loading(&[]).create("tables/missing.table");
    assert!(table.headers().is_empty());
    assert_eq!(table.row_count(), 0);
}
