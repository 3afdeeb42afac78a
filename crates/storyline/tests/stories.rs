//! End-to-end tests running stories through the embedder.
#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "tests should fail loudly"
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use rstest::{fixture, rstest};
use storyline::execution::{StepError, StepOutcome};
use storyline::model::{Outcome, Scope};
use storyline::reporting::ReportEvent;
use storyline::{CandidateStep, Catalogue, Configuration, InMemoryStories, LifecycleHook};

mod common;
use common::{calculator, execute};

#[fixture]
fn catalogue() -> Catalogue {
    calculator().expect("calculator candidates compile")
}

fn run_one(catalogue: Catalogue, text: &str) -> Vec<(&'static str, String)> {
    let stories = InMemoryStories::new().with("main.story", text);
    let (_, recorder) = execute(catalogue, stories, Configuration::default(), &["main.story"]);
    recorder.step_outcomes("main.story")
}

fn labels(outcomes: &[(&'static str, String)]) -> Vec<&'static str> {
    outcomes.iter().map(|(label, _)| *label).collect()
}

#[rstest]
fn matching_steps_all_succeed(catalogue: Catalogue) {
    let outcomes = run_one(
        catalogue,
        "Scenario: s1\nGiven a value 5\nWhen I add 3\nThen the result is 8",
    );
    assert_eq!(
        outcomes,
        [
            ("successful", "Given a value 5".to_string()),
            ("successful", "When I add 3".to_string()),
            ("successful", "Then the result is 8".to_string()),
        ]
    );
}

#[rstest]
fn failed_assertions_carry_their_cause(catalogue: Catalogue) {
    let stories = InMemoryStories::new().with(
        "main.story",
        "Scenario: s1\nGiven a value 5\nWhen I add 3\nThen the result is 9",
    );
    let (report, recorder) = execute(catalogue, stories, Configuration::default(), &["main.story"]);
    assert_eq!(
        labels(&recorder.step_outcomes("main.story")),
        ["successful", "successful", "failed"]
    );
    let story = report.story("main.story").expect("story outcome");
    let steps = story.scenarios()[0].steps();
    assert_eq!(steps[2].outcome(), StepOutcome::Failed);
    let cause = steps[2].cause().expect("failure cause");
    assert!(cause.to_string().contains("expected 9, got 8"));
    assert!(!report.passed());
}

#[rstest]
fn restarted_scenarios_run_every_step_again(catalogue: Catalogue) {
    let restarts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&restarts);
    let catalogue = catalogue.with(
        CandidateStep::given("a flaky connection")
            .handler(move |_| {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(StepError::RestartScenario("reconnect".into()))
                } else {
                    Ok(())
                }
            })
            .build()
            .expect("valid pattern"),
    );
    let stories = InMemoryStories::new().with(
        "main.story",
        "Lifecycle:\nBefore:\nGiven a value 1\n\n\
         Scenario: s1\nGiven a flaky connection\nWhen I add 3\nThen the result is 4",
    );
    let (report, recorder) = execute(catalogue, stories, Configuration::default(), &["main.story"]);
    assert_eq!(restarts.load(Ordering::SeqCst), 2);
    let events = recorder.events("main.story");
    let lifecycle_runs = events
        .iter()
        .filter(|event| **event == ReportEvent::BeforeStep("Given a value 1".into()))
        .count();
    assert_eq!(lifecycle_runs, 2);
    assert!(events.contains(&ReportEvent::Restarted("Given a flaky connection".into())));
    let scenario = &report.stories()[0].scenarios()[0];
    assert!(scenario.was_restarted());
    assert_eq!(
        scenario.outcomes(),
        [StepOutcome::Successful; 4],
        "only the second attempt is final"
    );
    assert!(report.passed());
}

#[rstest]
#[case("Given the value 5", "successful")]
#[case("Given the value 6", "failed")]
fn higher_priority_candidates_win(#[case] step: &str, #[case] expected: &str) {
    let catalogue = Catalogue::new()
        .with(
            CandidateStep::given("the value $n")
                .handler(|_| Err("generic candidate".into()))
                .build()
                .expect("valid pattern"),
        )
        .with(
            CandidateStep::given("the value 5")
                .priority(1)
                .build()
                .expect("valid pattern"),
        );
    let outcomes = run_one(catalogue, &format!("Scenario: s\n{step}"));
    assert_eq!(labels(&outcomes), [expected]);
}

#[test]
fn equal_priorities_prefer_the_first_registration() {
    let catalogue = Catalogue::new()
        .with(CandidateStep::given("a $thing").build().expect("valid pattern"))
        .with(
            CandidateStep::given("a widget")
                .handler(|_| Err("second candidate".into()))
                .build()
                .expect("valid pattern"),
        );
    assert_eq!(labels(&run_one(catalogue, "Scenario: s\nGiven a widget")), ["successful"]);
}

#[rstest]
fn and_steps_inherit_the_previous_type(catalogue: Catalogue) {
    let outcomes = run_one(
        catalogue,
        "Scenario: s\nGiven a value 5\nWhen I add 3\nAnd I add 2\nThen the result is 10",
    );
    assert_eq!(labels(&outcomes), ["successful"; 4]);
}

#[rstest]
fn leading_and_steps_never_match(catalogue: Catalogue) {
    let outcomes = run_one(catalogue, "Scenario: s\nAnd I add 2\nGiven a value 1");
    assert_eq!(labels(&outcomes), ["pending", "not_performed"]);
}

#[rstest]
fn composites_substitute_captured_parameters(catalogue: Catalogue) {
    let catalogue = catalogue.with(
        CandidateStep::given("a doubled $x")
            .composed_of(["Given a value <x>", "When I add <x>"])
            .build()
            .expect("valid pattern"),
    );
    let outcomes = run_one(
        catalogue,
        "Scenario: s\nGiven a doubled 5\nThen the result is 10",
    );
    assert_eq!(
        outcomes,
        [
            ("successful", "Given a value 5".to_string()),
            ("successful", "When I add 5".to_string()),
            ("successful", "Given a doubled 5".to_string()),
            ("successful", "Then the result is 10".to_string()),
        ]
    );
}

#[rstest]
fn failures_short_circuit_only_later_steps(catalogue: Catalogue) {
    let outcomes = run_one(
        catalogue,
        "Scenario: s\nGiven a value 1\nThen the result is 2\nWhen I add 1\nThen the result is 2",
    );
    assert_eq!(
        labels(&outcomes),
        ["successful", "failed", "not_performed", "not_performed"]
    );
}

#[rstest]
fn example_rows_run_independently(catalogue: Catalogue) {
    let stories = InMemoryStories::new().with(
        "main.story",
        "Scenario: sums\nGiven a value <a>\nWhen I add <b>\nThen the result is <sum>\n\n\
         Examples:\n|a|b|sum|\n|1|2|3|\n|2|2|5|\n|4|4|8|",
    );
    let (report, _) = execute(catalogue, stories, Configuration::default(), &["main.story"]);
    let failed: Vec<bool> = report.stories()[0]
        .scenarios()
        .iter()
        .map(storyline::ScenarioOutcome::failed)
        .collect();
    assert_eq!(failed, [false, true, false]);
    let texts: Vec<&str> = report.stories()[0].scenarios()[1]
        .steps()
        .iter()
        .map(|step| step.display_text())
        .collect();
    assert_eq!(texts, ["Given a value 2", "When I add 2", "Then the result is 5"]);
}

#[test]
fn hooks_wrap_the_textual_lifecycle() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let note = |name: &'static str| {
        let log = Arc::clone(&log);
        move || {
            log.lock().expect("log lock").push(name);
        }
    };
    let (open, close, before, step, after) = (
        note("hook before"),
        note("hook after"),
        note("lifecycle before"),
        note("step"),
        note("lifecycle after"),
    );
    let candidates = [
        CandidateStep::given("a clean market").handler(move |_| {
            before();
            Ok(())
        }),
        CandidateStep::when("a trade happens").handler(move |_| {
            step();
            Ok(())
        }),
        CandidateStep::then("the book is dumped").handler(move |_| {
            after();
            Ok(())
        }),
    ];
    let catalogue = candidates
        .into_iter()
        .fold(Catalogue::new(), |catalogue, builder| {
            catalogue.with(builder.build().expect("valid pattern"))
        })
        .with_hook(LifecycleHook::before("open", Scope::Scenario, move |_| {
            open();
            Ok(())
        }))
        .with_hook(LifecycleHook::after("close", Scope::Scenario, Outcome::Any, move |_| {
            close();
            Ok(())
        }));
    let outcomes = run_one(
        catalogue,
        "Lifecycle:\nBefore:\nGiven a clean market\nAfter:\nThen the book is dumped\n\n\
         Scenario: s\nWhen a trade happens",
    );
    assert_eq!(labels(&outcomes), ["successful"; 3]);
    assert_eq!(
        *log.lock().expect("log lock"),
        ["hook before", "lifecycle before", "step", "lifecycle after", "hook after"]
    );
}
