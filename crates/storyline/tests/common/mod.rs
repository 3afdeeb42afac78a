//! Common helpers for story integration tests.

use std::cell::Cell;
use std::sync::Arc;

use storyline::reporting::RecordingReporter;
use storyline::{
    CandidateStep, Catalogue, CatalogueError, Configuration, Embedder, InMemoryStories, RunReport,
};

thread_local! {
    static TOTAL: Cell<i64> = const { Cell::new(0) };
}

/// Candidates of a running-total calculator.
///
/// The total lives in a thread-local cell, so stories running on different
/// worker threads keep separate totals.
///
/// # Errors
/// Returns an error if a candidate pattern fails to compile.
pub fn calculator() -> Result<Catalogue, CatalogueError> {
    Ok(Catalogue::new()
        .with(
            CandidateStep::given("a value $n")
                .handler(|args| {
                    let n: i64 = args.get(0)?;
                    TOTAL.with(|total| total.set(n));
                    Ok(())
                })
                .build()?,
        )
        .with(
            CandidateStep::when("I add $n")
                .handler(|args| {
                    let n: i64 = args.get(0)?;
                    TOTAL.with(|total| total.set(total.get() + n));
                    Ok(())
                })
                .build()?,
        )
        .with(
            CandidateStep::then("the result is $r")
                .handler(|args| {
                    let expected: i64 = args.get(0)?;
                    let actual = TOTAL.with(Cell::get);
                    if actual == expected {
                        Ok(())
                    } else {
                        Err(format!("expected {expected}, got {actual}").into())
                    }
                })
                .build()?,
        ))
}

/// Run `paths` from `stories` with `configuration`, recording every event.
#[must_use]
pub fn execute(
    catalogue: Catalogue,
    stories: InMemoryStories,
    configuration: Configuration,
    paths: &[&str],
) -> (RunReport, RecordingReporter) {
    let recorder = RecordingReporter::new();
    let report = Embedder::new(Arc::new(catalogue), Arc::new(stories))
        .with_configuration(configuration)
        .with_reporters(recorder.clone())
        .execute(paths);
    (report, recorder)
}
