//! Expansion of `{a|b|...}` option groups in step patterns.
//!
//! A pattern such as `the {buyer|seller} {places|submits} an order` stands
//! for every combination of its options. A group ending in `|` also offers
//! the empty option, so `a {red |}car` yields `a red car` and `a car`.
//! Patterns spanning several lines, and braces that do not close on the
//! same line, are left untouched.

/// Expand every option group in `pattern`.
///
/// Variants come back in declaration order, first option first, without
/// duplicates. Runs of whitespace left behind by empty options collapse to
/// a single space and each variant is trimmed.
///
/// # Examples
/// ```
/// use storyline_patterns::pattern_variants;
///
/// assert_eq!(
///     pattern_variants("the {buyer|seller} pays $amount"),
///     ["the buyer pays $amount", "the seller pays $amount"]
/// );
/// assert_eq!(pattern_variants("a {red |}car"), ["a red car", "a car"]);
/// assert_eq!(pattern_variants("no groups"), ["no groups"]);
/// ```
#[must_use]
pub fn pattern_variants(pattern: &str) -> Vec<String> {
    let mut variants: Vec<String> = Vec::new();
    for variant in expand(pattern) {
        let compressed = compress_whitespace(variant.trim());
        if !variants.contains(&compressed) {
            variants.push(compressed);
        }
    }
    variants
}

fn expand(input: &str) -> Vec<String> {
    let Some((head, options, tail)) = split_group(input) else {
        return vec![input.to_string()];
    };
    let tails = expand(tail);
    options
        .iter()
        .flat_map(|option| tails.iter().map(move |rest| format!("{head}{option}{rest}")))
        .collect()
}

/// Split `input` at its first option group.
fn split_group(input: &str) -> Option<(&str, Vec<&str>, &str)> {
    if input.contains('\n') {
        return None;
    }
    let (head, rest) = input.split_once('{')?;
    let (group, tail) = rest.split_once('}')?;
    let mut options: Vec<&str> = group.split('|').collect();
    while options.len() > 1 && options.last().is_some_and(|option| option.is_empty()) {
        options.pop();
    }
    if group.ends_with('|') {
        options.push("");
    }
    Some((head, options, tail))
}

fn compress_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = String::new();
    for ch in text.chars() {
        if ch.is_whitespace() {
            run.push(ch);
            continue;
        }
        flush(&mut out, &mut run);
        out.push(ch);
    }
    flush(&mut out, &mut run);
    out
}

fn flush(out: &mut String, run: &mut String) {
    if run.chars().count() > 1 {
        out.push(' ');
    } else {
        out.push_str(run);
    }
    run.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("a {b|c} d", &["a b d", "a c d"])]
    #[case("{x|y}{1|2}", &["x1", "x2", "y1", "y2"])]
    #[case("it {is |}ready", &["it is ready", "it ready"])]
    #[case("it {|really }works", &["it works", "it really works"])]
    #[case("a {b||c}", &["a b", "a", "a c"])]
    #[case("empty {} group", &["empty group"])]
    fn expands_option_groups(#[case] pattern: &str, #[case] expected: &[&str]) {
        assert_eq!(pattern_variants(pattern), expected);
    }

    #[rstest]
    #[case("an open { brace")]
    #[case("a {split|\ngroup}")]
    fn leaves_unbalanced_or_multiline_text_alone(#[case] pattern: &str) {
        assert_eq!(pattern_variants(pattern), [pattern]);
    }

    #[test]
    fn drops_repeated_variants() {
        assert_eq!(pattern_variants("a {b|b} c"), ["a b c"]);
    }
}
