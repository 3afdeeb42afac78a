//! Unit tests for step performance.
#![expect(
    clippy::expect_used,
    clippy::indexing_slicing,
    reason = "tests require explicit panic messages"
)]

use std::sync::atomic::{AtomicUsize, Ordering};

use rstest::{fixture, rstest};

use super::*;
use crate::keywords::Keywords;
use crate::model::Scope;
use crate::registry::{Catalogue, StepCollector};

static CALLS: AtomicUsize = AtomicUsize::new(0);

#[fixture]
fn catalogue() -> Catalogue {
    let candidates = [
        CandidateStep::given("a value $n").handler(|args| {
            let n: i64 = args.get(0)?;
            assert!(n >= 0, "negative value");
            Ok(())
        }),
        CandidateStep::when("it fails").handler(|_| Err("broken".into())),
        CandidateStep::when("it panics").handler(|_| panic!("kaboom")),
        CandidateStep::when("it is not ready").handler(|_| StepSignal::Pending("later".into()).raise()),
        CandidateStep::when("it restarts").handler(|_| Err(StepError::RestartScenario("again".into()))),
        CandidateStep::when("it ignores the rest").handler(|_| Err(StepError::IgnoringSteps("done".into()))),
        CandidateStep::when("it is counted").handler(|_| {
            CALLS.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }),
        CandidateStep::then("a marked step").pending(),
        CandidateStep::then("a bare step"),
    ];
    candidates.into_iter().fold(Catalogue::new(), |catalogue, builder| {
        catalogue.with(builder.build().expect("test candidate should compile"))
    })
}

fn step<'c>(catalogue: &'c Catalogue, keywords: &'c Keywords, text: &str) -> Step<'c> {
    StepCollector::new(catalogue, keywords)
        .collect([text], &NamedParameters::new())
        .pop()
        .expect("one step collected")
}

fn context(converters: &ValueConverters) -> StepContext<'_> {
    StepContext {
        converters,
        dry_run: false,
        failure: None,
    }
}

#[rstest]
#[case("Given a value 3", StepOutcome::Successful)]
#[case("Given a value -3", StepOutcome::Failed)]
#[case("Given a value three", StepOutcome::Failed)]
#[case("When it fails", StepOutcome::Failed)]
#[case("When it panics", StepOutcome::Failed)]
#[case("When it is not ready", StepOutcome::Pending)]
#[case("Then a marked step", StepOutcome::Pending)]
#[case("Then a bare step", StepOutcome::Successful)]
#[case("Then nothing matches", StepOutcome::Pending)]
#[case("!-- a remark", StepOutcome::Ignorable)]
fn performing_maps_handler_results(catalogue: Catalogue, #[case] text: &str, #[case] expected: StepOutcome) {
    let converters = ValueConverters::default();
    let performed = step(&catalogue, &Keywords::default(), text).perform(&context(&converters));
    assert_eq!(performed.result.outcome(), expected);
    assert_eq!(performed.result.text(), text);
    assert!(performed.signal.is_none());
}

#[rstest]
fn panics_carry_their_message(catalogue: Catalogue) {
    let converters = ValueConverters::default();
    let performed =
        step(&catalogue, &Keywords::default(), "When it panics").perform(&context(&converters));
    let cause = performed.result.cause().expect("failure has a cause");
    assert!(matches!(
        cause.as_ref(),
        ExecutionError::HandlerPanicked { message, .. } if message == "kaboom"
    ));
}

#[rstest]
#[case("When it restarts", Signal::RestartScenario, StepOutcome::Failed)]
#[case("When it ignores the rest", Signal::IgnoringSteps, StepOutcome::Ignorable)]
fn control_errors_raise_signals(
    catalogue: Catalogue,
    #[case] text: &str,
    #[case] signal: Signal,
    #[case] outcome: StepOutcome,
) {
    let converters = ValueConverters::default();
    let performed = step(&catalogue, &Keywords::default(), text).perform(&context(&converters));
    assert_eq!(performed.signal, Some(signal));
    assert_eq!(performed.result.outcome(), outcome);
}

#[rstest]
fn dry_run_skips_handlers(catalogue: Catalogue) {
    let converters = ValueConverters::default();
    let ctx = StepContext {
        dry_run: true,
        ..context(&converters)
    };
    let before = CALLS.load(Ordering::SeqCst);
    let performed = step(&catalogue, &Keywords::default(), "When it is counted").perform(&ctx);
    assert_eq!(performed.result.outcome(), StepOutcome::Successful);
    assert_eq!(CALLS.load(Ordering::SeqCst), before);
}

#[rstest]
#[case("When it fails", StepOutcome::NotPerformed)]
#[case("Then nothing matches", StepOutcome::NotPerformed)]
#[case("!-- a remark", StepOutcome::Ignorable)]
fn not_performing_short_circuits_all_but_comments(
    catalogue: Catalogue,
    #[case] text: &str,
    #[case] expected: StepOutcome,
) {
    let converters = ValueConverters::default();
    let performed =
        step(&catalogue, &Keywords::default(), text).do_not_perform(&context(&converters));
    assert_eq!(performed.result.outcome(), expected);
}

#[rstest]
#[case(Outcome::Any, StepOutcome::Successful, StepOutcome::Successful)]
#[case(Outcome::Success, StepOutcome::Successful, StepOutcome::Skipped)]
#[case(Outcome::Failure, StepOutcome::Skipped, StepOutcome::Successful)]
fn outcome_gated_steps(
    catalogue: Catalogue,
    #[case] outcome: Outcome,
    #[case] when_fine: StepOutcome,
    #[case] after_failure: StepOutcome,
) {
    let converters = ValueConverters::default();
    let keywords = Keywords::default();
    let gated = Step::UponOutcome(
        outcome,
        Box::new(step(&catalogue, &keywords, "Given a value 1")),
    );
    let ctx = context(&converters);
    assert_eq!(gated.perform(&ctx).result.outcome(), when_fine);
    assert_eq!(gated.do_not_perform(&ctx).result.outcome(), after_failure);
}

#[test]
fn hooks_observe_meta_and_failure() {
    let hook = LifecycleHook::after("inspect", Scope::Scenario, Outcome::Any, |ctx| {
        let failed = ctx
            .failure()
            .is_some_and(|failure| matches!(failure, ExecutionError::HandlerFailed { .. }));
        if failed && ctx.meta().has_property("strict") {
            return Err("strict scenario failed".into());
        }
        Ok(())
    });
    let mut meta = Meta::new();
    meta.insert("strict", "");
    let step = Step::Hook(HookStep::new(&hook, meta));
    let converters = ValueConverters::default();
    let failure = Arc::new(ExecutionError::HandlerFailed {
        text: "When it fails".into(),
        source: Arc::new(std::io::Error::other("broken")),
    });
    assert_eq!(
        step.perform(&context(&converters)).result.outcome(),
        StepOutcome::Successful
    );
    let ctx = StepContext {
        failure: Some(&failure),
        ..context(&converters)
    };
    let performed = step.do_not_perform(&ctx);
    assert_eq!(performed.result.outcome(), StepOutcome::Failed);
    assert_eq!(performed.result.text(), "inspect");
}

#[rstest]
fn parametrised_text_is_reported(catalogue: Catalogue) {
    let row: NamedParameters = [("n".to_string(), "4".to_string())].into_iter().collect();
    let keywords = Keywords::default();
    let steps = StepCollector::new(&catalogue, &keywords)
        .collect(["Given a value <n>"], &row);
    let converters = ValueConverters::default();
    let performed = steps[0].perform(&context(&converters));
    assert_eq!(performed.result.outcome(), StepOutcome::Successful);
    assert_eq!(performed.result.display_text(), "Given a value 4");
}
