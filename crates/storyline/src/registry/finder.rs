//! Turning step texts into executable steps.

use log::{debug, warn};
use storyline_patterns::StepType;

use super::{CandidateMatch, Catalogue};
use crate::binding::substitute_markers;
use crate::execution::{ExecutionError, MatchedStep, PendingStep, Step};
use crate::keywords::{Keywords, StartingWord};
use crate::table::NamedParameters;

/// Resolves step texts against a catalogue.
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepCollector<'c> {
    catalogue: &'c Catalogue,
    keywords: &'c Keywords,
}

impl<'c> StepCollector<'c> {
    pub(crate) fn new(catalogue: &'c Catalogue, keywords: &'c Keywords) -> Self {
        Self {
            catalogue,
            keywords,
        }
    }

    pub(crate) fn catalogue(&self) -> &'c Catalogue {
        self.catalogue
    }

    /// Resolve one step list; `And` steps continue the previous typed step
    /// of the same list.
    pub(crate) fn collect<'t>(
        &self,
        texts: impl IntoIterator<Item = &'t str>,
        named: &NamedParameters,
    ) -> Vec<Step<'c>> {
        self.collect_at(texts, named, 0)
    }

    fn collect_at<'t>(
        &self,
        texts: impl IntoIterator<Item = &'t str>,
        named: &NamedParameters,
        depth: usize,
    ) -> Vec<Step<'c>> {
        let mut previous = None;
        texts
            .into_iter()
            .map(|text| self.step_for(text, &mut previous, named, depth))
            .collect()
    }

    fn step_for(
        &self,
        text: &str,
        previous: &mut Option<StepType>,
        named: &NamedParameters,
        depth: usize,
    ) -> Step<'c> {
        let parametrised = parametrised(text, named);
        let Some(split) = self.keywords.split_step(text) else {
            warn!("`{text}` does not open with a starting word");
            return pending(text, parametrised, ExecutionError::StepNotFound {
                text: text.to_string(),
            });
        };
        let step_type = match split.word {
            StartingWord::Ignorable => return Step::Ignorable(text.to_string()),
            StartingWord::Typed(step_type) => step_type,
        };
        let Some(resolved) = step_type.resolve(previous) else {
            return pending(text, parametrised, ExecutionError::NoPreviousStep {
                text: text.to_string(),
            });
        };
        let Some(found) = self.catalogue.find(resolved, split.body) else {
            warn!("no {resolved} step matches `{text}`");
            return pending(text, parametrised, ExecutionError::StepNotFound {
                text: text.to_string(),
            });
        };
        self.matched(text, parametrised, found, named, depth)
    }

    fn matched(
        &self,
        text: &str,
        parametrised: Option<String>,
        found: CandidateMatch<'c>,
        named: &NamedParameters,
        depth: usize,
    ) -> Step<'c> {
        let CandidateMatch {
            candidate,
            matcher,
            captures,
        } = found;
        if !candidate.is_composite() {
            return Step::Matched(MatchedStep::new(
                text,
                parametrised,
                candidate,
                matcher,
                captures,
                named.clone(),
                Vec::new(),
            ));
        }
        let max_depth = self.catalogue.max_composite_depth();
        if depth >= max_depth {
            warn!("composite expansion of `{text}` exceeds depth {max_depth}");
            return pending(text, parametrised, ExecutionError::CompositeTooDeep {
                text: text.to_string(),
                depth: max_depth,
            });
        }
        let mut composite = named.clone();
        for (name, value) in matcher.parameter_names().iter().zip(&captures) {
            composite.insert(name.clone(), substitute_markers(value, named));
        }
        let constituents: Vec<String> = candidate
            .composed_steps()
            .iter()
            .map(|step| substitute_markers(step, &composite))
            .collect();
        debug!(
            "expanding composite `{text}` into {} steps at depth {}",
            constituents.len(),
            depth + 1
        );
        let composed = self.collect_at(
            constituents.iter().map(String::as_str),
            &composite,
            depth + 1,
        );
        Step::Matched(MatchedStep::new(
            text,
            parametrised,
            candidate,
            matcher,
            captures,
            named.clone(),
            composed,
        ))
    }
}

fn parametrised(text: &str, named: &NamedParameters) -> Option<String> {
    let substituted = substitute_markers(text, named);
    (substituted != text).then_some(substituted)
}

fn pending<'c>(text: &str, parametrised: Option<String>, cause: ExecutionError) -> Step<'c> {
    Step::Pending(PendingStep::new(text, parametrised, cause))
}
