//! Pattern lexer converting step patterns into semantic tokens.

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Token {
    Literal(String),
    Whitespace,
    Parameter { start: usize, name: String },
}

pub(crate) fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Split `pattern` into literals, whitespace runs and `prefix`-introduced
/// parameters. A prefix that is not followed by a word character stays
/// literal text.
pub(crate) fn lex_pattern(pattern: &str, prefix: char) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut literal = String::new();
    let mut chars = pattern.char_indices().peekable();

    let flush_literal = |literal: &mut String, tokens: &mut Vec<Token>| {
        if !literal.is_empty() {
            tokens.push(Token::Literal(std::mem::take(literal)));
        }
    };

    while let Some((pos, c)) = chars.next() {
        if c.is_whitespace() {
            flush_literal(&mut literal, &mut tokens);
            while chars.next_if(|(_, next)| next.is_whitespace()).is_some() {}
            tokens.push(Token::Whitespace);
            continue;
        }
        if c == prefix && chars.peek().is_some_and(|(_, next)| is_word_char(*next)) {
            flush_literal(&mut literal, &mut tokens);
            let mut name = String::new();
            while let Some((_, next)) = chars.next_if(|(_, next)| is_word_char(*next)) {
                name.push(next);
            }
            tokens.push(Token::Parameter { start: pos, name });
            continue;
        }
        literal.push(c);
    }

    flush_literal(&mut literal, &mut tokens);
    tokens
}
