//! Step-pattern lexing and compilation helpers.

mod compiler;
pub(crate) mod lexer;

use crate::errors::PatternError;
use regex::Regex;

pub use compiler::{CompiledPattern, build_regex_from_pattern};

/// Build and compile a regular expression from a step pattern, returning it
/// together with the ordered parameter names.
///
/// # Errors
/// Returns [`PatternError`] when parameter parsing fails or the generated
/// regex source cannot be compiled.
pub fn compile_regex_from_pattern(
    pat: &str,
    prefix: char,
) -> Result<(Regex, Vec<String>), PatternError> {
    let CompiledPattern {
        source,
        parameter_names,
    } = build_regex_from_pattern(pat, prefix)?;
    let regex = Regex::new(&source)?;
    Ok((regex, parameter_names))
}
