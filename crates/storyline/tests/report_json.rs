//! JSON rendering of run reports and catalogues.
#![expect(clippy::expect_used, reason = "tests should fail loudly")]

use serde_json::Value;
use storyline::{Configuration, FailureMode, InMemoryStories};

mod common;
use common::{calculator, execute};

fn pointer<'a>(value: &'a Value, path: &str) -> &'a Value {
    value
        .pointer(path)
        .unwrap_or_else(|| panic!("missing `{path}` in {value}"))
}

#[test]
fn reports_render_nested_outcomes() {
    let stories = InMemoryStories::new()
        .with("setup.story", "Scenario: setup\nGiven a value 1")
        .with(
            "main.story",
            "GivenStories: setup.story\n\n\
             Scenario: sums\nWhen I add 2\nThen the result is 4\n\n\
             Scenario: rows\nGiven a value <n>\n\nExamples:\n|n|\n|1|\n|2|",
        );
    let catalogue = calculator().expect("calculator candidates compile");
    let (report, _) = execute(
        catalogue,
        stories,
        Configuration::default().with_failure_mode(FailureMode::Batch),
        &["main.story"],
    );
    let json: Value = serde_json::from_str(&report.to_json().expect("report serialises"))
        .expect("valid json");

    assert_eq!(pointer(&json, "/passed"), &Value::Bool(false));
    assert_eq!(
        pointer(&json, "/stories/0/path").as_str(),
        Some("main.story")
    );
    assert!(
        pointer(&json, "/stories/0/failure")
            .as_str()
            .is_some_and(|failure| failure.contains("expected 4, got 3"))
    );
    assert_eq!(
        pointer(&json, "/stories/0/given_stories/0/path").as_str(),
        Some("setup.story")
    );
    assert_eq!(
        pointer(&json, "/stories/0/given_stories/0/given"),
        &Value::Bool(true)
    );
    assert_eq!(
        pointer(&json, "/stories/0/scenarios/0/steps/1/outcome").as_str(),
        Some("failed")
    );
    assert!(pointer(&json, "/stories/0/scenarios/0/steps/1/cause").is_string());
    assert_eq!(
        pointer(&json, "/stories/0/scenarios/2/example").as_u64(),
        Some(1)
    );
    assert_eq!(
        pointer(&json, "/stories/0/scenarios/2/steps/0/text").as_str(),
        Some("Given a value 2")
    );
    assert!(
        pointer(&json, "/stories/0/scenarios/0")
            .get("example")
            .is_none()
    );
}

#[test]
fn written_reports_match_rendered_ones() {
    let catalogue = calculator().expect("calculator candidates compile");
    let stories = InMemoryStories::new().with("a.story", "Scenario: s\nGiven a value 1");
    let (report, _) = execute(catalogue, stories, Configuration::default(), &["a.story"]);
    let mut buffer = Vec::new();
    report.write_json(&mut buffer).expect("report writes");
    let written: Value = serde_json::from_slice(&buffer).expect("valid json");
    let rendered: Value =
        serde_json::from_str(&report.to_json().expect("report serialises")).expect("valid json");
    assert_eq!(written, rendered);
    assert_eq!(pointer(&written, "/passed"), &Value::Bool(true));
}

#[test]
fn catalogues_dump_their_candidates() {
    let catalogue = calculator().expect("calculator candidates compile");
    let json: Value =
        serde_json::from_str(&catalogue.dump_json().expect("catalogue serialises"))
            .expect("valid json");
    let patterns: Vec<&str> = pointer(&json, "/candidates")
        .as_array()
        .expect("candidate list")
        .iter()
        .filter_map(|candidate| candidate.get("pattern").and_then(Value::as_str))
        .collect();
    assert_eq!(patterns, ["a value $n", "I add $n", "the result is $r"]);
}
