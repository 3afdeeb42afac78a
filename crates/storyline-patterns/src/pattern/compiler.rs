//! Convert lexed tokens into anchored regular-expression sources.

use crate::errors::PatternError;

use super::lexer::{Token, lex_pattern};

/// Regex source and parameter names produced from a step pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPattern {
    /// Anchored regular expression with one capture group per parameter.
    pub source: String,
    /// Parameter names in the order their groups appear.
    pub parameter_names: Vec<String>,
}

/// Build an anchored, dot-matches-newline regular expression from a step
/// pattern.
///
/// Literal text is escaped, every whitespace run relaxes to `\s+` and each
/// parameter token becomes a greedy `(.*)` group.
///
/// # Errors
/// Returns [`PatternError::DuplicateParameter`] when the same parameter name appears
/// twice, because name-based binding would be ambiguous.
///
/// # Examples
/// ```
/// # use storyline_patterns::build_regex_from_pattern;
/// let compiled = build_regex_from_pattern("a stock of $symbol", '$')
///     .expect("example ensures fallible call succeeds");
/// assert_eq!(compiled.source, r"(?s)^a\s+stock\s+of\s+(.*)$");
/// assert_eq!(compiled.parameter_names, vec!["symbol".to_string()]);
/// ```
pub fn build_regex_from_pattern(pat: &str, prefix: char) -> Result<CompiledPattern, PatternError> {
    let tokens = lex_pattern(pat, prefix);
    let mut source = String::with_capacity(pat.len().saturating_mul(2) + 6);
    let mut parameter_names: Vec<String> = Vec::new();
    source.push_str("(?s)^");

    for token in tokens {
        match token {
            Token::Literal(text) => source.push_str(&regex::escape(&text)),
            Token::Whitespace => source.push_str(r"\s+"),
            Token::Parameter { start, name } => {
                if parameter_names.contains(&name) {
                    return Err(PatternError::DuplicateParameter {
                        name,
                        prefix,
                        offset: start,
                    });
                }
                source.push_str("(.*)");
                parameter_names.push(name);
            }
        }
    }

    source.push('$');
    Ok(CompiledPattern {
        source,
        parameter_names,
    })
}
