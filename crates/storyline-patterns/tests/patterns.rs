//! Public pattern compilation and matching tests.
#![expect(clippy::expect_used, reason = "tests assert the public compilation path")]

use storyline_patterns::{
    PatternError, StepMatcher, StepType, build_regex_from_pattern, compile_regex_from_pattern,
    extract_captured_values,
};

#[test]
fn compiles_and_extracts_values() {
    let (regex, names) =
        compile_regex_from_pattern("I have $count cukes", '$').expect("pattern should compile");
    assert_eq!(names, vec!["count".to_string()]);
    let captures =
        extract_captured_values(&regex, "I have 12 cukes").expect("expected captures for step");
    assert_eq!(captures, vec!["12".to_string()]);
}

#[test]
fn reports_where_a_parameter_repeats() {
    let Err(err) = build_regex_from_pattern("$n then $n", '$') else {
        panic!("expected a duplicate parameter");
    };
    match err {
        PatternError::DuplicateParameter {
            name,
            prefix,
            offset,
        } => assert_eq!((name.as_str(), prefix, offset), ("n", '$', 8)),
        other => panic!("expected a duplicate parameter, got {other}"),
    }
}

#[test]
fn matcher_is_shareable_across_threads() {
    let matcher = std::sync::Arc::new(StepMatcher::new("a value $n").expect("compiles"));
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let matcher = std::sync::Arc::clone(&matcher);
            std::thread::spawn(move || matcher.find(&format!("a value {i}")))
        })
        .collect();
    for (i, handle) in handles.into_iter().enumerate() {
        let found = handle.join().expect("thread should not panic");
        assert_eq!(found, Some(vec![i.to_string()]));
    }
}

#[test]
fn step_type_round_trips_through_display() {
    for ty in [StepType::Given, StepType::When, StepType::Then, StepType::And] {
        assert_eq!(ty.to_string().parse::<StepType>().ok(), Some(ty));
    }
}
