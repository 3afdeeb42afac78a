//! Diagnostics-only catalogue export.
//!
//! Renders the candidates and hooks of a [`Catalogue`] as JSON for external
//! tooling that lists the step definitions available to a run.

use serde::Serialize;

use super::Catalogue;

#[derive(Serialize)]
struct DumpedCandidate<'a> {
    step_type: &'static str,
    pattern: &'a str,
    aliases: Vec<&'a str>,
    priority: i32,
    composed: &'a [String],
    parameters: &'a [String],
    has_handler: bool,
    pending: bool,
}

#[derive(Serialize)]
struct DumpedHook<'a> {
    name: &'a str,
    stage: String,
    scope: &'static str,
    outcome: &'static str,
    filtered: bool,
}

#[derive(Serialize)]
struct CatalogueDump<'a> {
    max_composite_depth: usize,
    candidates: Vec<DumpedCandidate<'a>>,
    hooks: Vec<DumpedHook<'a>>,
}

impl Catalogue {
    /// Serialise the catalogue as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyline::{CandidateStep, Catalogue};
    ///
    /// let catalogue = Catalogue::new()
    ///     .with(CandidateStep::when("I add $n").build().expect("valid"));
    /// let json = catalogue.dump_json().expect("serialises");
    /// assert!(json.contains("\"pattern\": \"I add $n\""));
    /// ```
    pub fn dump_json(&self) -> serde_json::Result<String> {
        let candidates = self
            .candidates
            .iter()
            .map(|candidate| DumpedCandidate {
                step_type: candidate.step_type().as_str(),
                pattern: candidate.pattern(),
                aliases: candidate
                    .aliases()
                    .iter()
                    .map(String::as_str)
                    .collect(),
                priority: candidate.priority(),
                composed: candidate.composed_steps(),
                parameters: candidate.matcher().parameter_names(),
                has_handler: candidate.handler().is_some(),
                pending: candidate.is_pending(),
            })
            .collect();
        let hooks = self
            .hooks
            .iter()
            .map(|hook| DumpedHook {
                name: hook.name(),
                stage: hook.stage().to_string(),
                scope: hook.scope().as_str(),
                outcome: hook.outcome().as_str(),
                filtered: hook.meta_filter().is_some(),
            })
            .collect();
        serde_json::to_string_pretty(&CatalogueDump {
            max_composite_depth: self.max_composite_depth,
            candidates,
            hooks,
        })
    }
}
