//! Worker pool, failure mode and loader tests.
#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "tests should fail loudly"
)]

use std::fs;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use rstest::{fixture, rstest};
use storyline::reporting::{RecordingReporter, ReportEvent};
use storyline::{
    CandidateStep, Catalogue, Configuration, Embedder, FailureMode, InMemoryStories,
    LoadFromDirectory, RunError, StoryFailure,
};

mod common;
use common::{calculator, execute};

const PASSING: &str = "Scenario: s\nGiven a value 2\nWhen I add 2\nThen the result is 4";
const FAILING: &str = "Scenario: s\nGiven a value 2\nWhen I add 2\nThen the result is 5";

#[fixture]
fn catalogue() -> Catalogue {
    calculator().expect("calculator candidates compile")
}

fn stories(entries: &[(&str, &str)]) -> InMemoryStories {
    entries
        .iter()
        .fold(InMemoryStories::new(), |stories, (path, text)| {
            stories.with(*path, *text)
        })
}

#[rstest]
fn batch_mode_runs_everything_and_collects_failures(catalogue: Catalogue) {
    let loader = stories(&[("a.story", FAILING), ("b.story", PASSING), ("c.story", FAILING)]);
    let embedder = Embedder::new(Arc::new(catalogue), Arc::new(loader))
        .with_reporters(RecordingReporter::new())
        .with_configuration(Configuration::default().with_failure_mode(FailureMode::Batch));
    let error = embedder
        .run_stories(&["a.story", "b.story", "c.story"])
        .expect_err("two stories fail");
    let failures = match error {
        RunError::Batch(failures) => failures,
        other => panic!("expected batch failures, got {other}"),
    };
    assert_eq!(failures.paths().collect::<Vec<_>>(), ["a.story", "c.story"]);
    assert!(matches!(
        failures.failure("a.story"),
        Some(StoryFailure::StepFailed { .. })
    ));
}

#[rstest]
fn immediate_mode_stops_dispatching_after_a_failure(catalogue: Catalogue) {
    let loader = stories(&[("a.story", FAILING), ("b.story", PASSING)]);
    let (report, recorder) = execute(
        catalogue,
        loader,
        Configuration::default(),
        &["a.story", "b.story"],
    );
    assert_eq!(report.stories().len(), 1);
    assert!(recorder.events("b.story").is_empty());
    let error = report
        .into_result(FailureMode::Immediate)
        .expect_err("first story fails");
    assert!(matches!(error, RunError::Story { ref path, .. } if path == "a.story"));
}

#[rstest]
fn immediate_mode_finishes_the_failing_story(catalogue: Catalogue) {
    let text = format!("Lifecycle:\nAfter:\nScope: STORY\nGiven a value 0\n\n{FAILING}");
    let loader = stories(&[("a.story", text.as_str())]);
    let (report, recorder) = execute(catalogue, loader, Configuration::default(), &["a.story"]);
    assert_eq!(report.stories()[0].after_steps().len(), 1);
    assert_eq!(
        recorder.events("a.story").last(),
        Some(&ReportEvent::AfterStory { given: false })
    );
}

#[rstest]
#[case(1)]
#[case(4)]
fn reports_keep_dispatch_order(catalogue: Catalogue, #[case] threads: usize) {
    let paths: Vec<String> = (0..8).map(|i| format!("story-{i}.story")).collect();
    let loader = paths
        .iter()
        .fold(InMemoryStories::new(), |stories, path| {
            stories.with(path.as_str(), PASSING)
        });
    let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
    let configuration = Configuration::default().with_threads(threads);
    let (report, recorder) = execute(catalogue, loader, configuration, &refs);
    assert!(report.passed());
    let reported: Vec<&str> = report.stories().iter().map(|story| story.path()).collect();
    assert_eq!(reported, refs);
    assert_eq!(recorder.paths().len(), 8);
    for path in &refs {
        assert_eq!(recorder.step_outcomes(path).len(), 3);
    }
}

#[rstest]
fn timed_out_stories_are_abandoned(catalogue: Catalogue) {
    let catalogue = catalogue.with(
        CandidateStep::when("the market stalls")
            .handler(|_| {
                thread::sleep(Duration::from_secs(2));
                Ok(())
            })
            .build()
            .expect("valid pattern"),
    );
    let loader = stories(&[
        ("slow.story", "Scenario: s\nWhen the market stalls\nGiven a value 1"),
        ("fast.story", PASSING),
    ]);
    let configuration = Configuration::default()
        .with_threads(2)
        .with_failure_mode(FailureMode::Batch)
        .with_story_timeout(Duration::from_millis(250));
    let (report, recorder) = execute(catalogue, loader, configuration, &["slow.story", "fast.story"]);
    let slow = report.story("slow.story").expect("slow outcome");
    assert!(slow.was_cancelled());
    assert!(matches!(slow.failure(), Some(StoryFailure::Timeout { .. })));
    assert!(
        recorder
            .events("slow.story")
            .contains(&ReportEvent::StoryCancelled("slow.story".into()))
    );
    assert!(!report.story("fast.story").expect("fast outcome").failed());
}

#[rstest]
fn stopped_embedders_dispatch_nothing(catalogue: Catalogue) {
    let embedder = Embedder::new(Arc::new(catalogue), Arc::new(stories(&[("a.story", PASSING)])))
        .with_reporters(RecordingReporter::new());
    embedder.stop_handle().stop();
    let report = embedder.execute(&["a.story"]);
    assert!(report.stories().is_empty());
    assert!(report.passed());
}

#[rstest]
fn missing_stories_fail_to_load(catalogue: Catalogue) {
    let (report, _) = execute(
        catalogue,
        InMemoryStories::new(),
        Configuration::default().with_failure_mode(FailureMode::Batch),
        &["missing.story"],
    );
    let outcome = report.story("missing.story").expect("outcome recorded");
    assert!(matches!(outcome.failure(), Some(StoryFailure::Load { .. })));
}

#[rstest]
fn stories_load_from_a_directory(catalogue: Catalogue) {
    let dir = tempfile::tempdir().expect("temporary directory");
    fs::create_dir(dir.path().join("trading")).expect("story subdirectory");
    fs::write(dir.path().join("trading/buy.story"), PASSING).expect("story file");
    fs::write(dir.path().join("setup.story"), "Scenario: setup\nGiven a value 9")
        .expect("story file");
    let root = camino::Utf8Path::from_path(dir.path()).expect("utf-8 temporary path");
    let loader = LoadFromDirectory::open(root).expect("story directory opens");
    let recorder = RecordingReporter::new();
    let report = Embedder::new(Arc::new(catalogue), Arc::new(loader))
        .with_reporters(recorder.clone())
        .run_stories(&["trading/buy.story", "setup.story"])
        .expect("stories pass");
    assert_eq!(report.stories().len(), 2);
    assert_eq!(recorder.step_outcomes("setup.story").len(), 1);
}

#[rstest]
fn examples_tables_load_by_path(catalogue: Catalogue) {
    let loader = stories(&[
        (
            "sums.story",
            "Scenario: sums\nGiven a value <a>\nWhen I add <b>\nThen the result is <c>\n\n\
             Examples:\ntables/sums.table",
        ),
        ("tables/sums.table", "|a|b|c|\n|1|1|2|\n|2|3|5|"),
    ]);
    let report = Embedder::new(Arc::new(catalogue), Arc::new(loader))
        .with_reporters(RecordingReporter::new())
        .run_stories(&["sums.story"])
        .expect("both rows pass");
    let outcome = report.story("sums.story").expect("outcome recorded");
    assert_eq!(outcome.scenarios().len(), 2);
}
