//! Step-pattern compilation utilities for storyline.
//!
//! A step pattern such as `a trader of symbol $symbol` is lexed into literal,
//! whitespace and parameter tokens, compiled into an anchored regular
//! expression and wrapped in a [`StepMatcher`] that remembers the parameter
//! names in declaration order. Option groups such as `{buy|sell}` are
//! expanded beforehand by [`pattern_variants`], one matcher per variant. The
//! runtime crate shares these helpers so the catalogue and the matching
//! engine agree on a single compilation path.

mod capture;
mod errors;
mod keyword;
mod matcher;
mod pattern;
mod variant;

pub use capture::extract_captured_values;
pub use errors::PatternError;
pub use keyword::{StepType, StepTypeParseError};
pub use matcher::{DEFAULT_PARAMETER_PREFIX, StepMatcher};
pub use pattern::{CompiledPattern, build_regex_from_pattern, compile_regex_from_pattern};
pub use variant::pattern_variants;
