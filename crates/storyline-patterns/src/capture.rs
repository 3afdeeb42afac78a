//! Regex capture helpers shared by the matcher and the runtime binder.

use regex::Regex;

/// Extract the parameter capture groups when `text` matches `re`, returning
/// `None` otherwise.
///
/// Capture group 0 (the full match) is ignored so only parameter groups
/// contribute to the result. Groups that did not participate yield empty
/// strings to keep positional alignment with the parameter names.
///
/// # Examples
/// ```
/// # use regex::Regex;
/// # use storyline_patterns::extract_captured_values;
/// let regex = Regex::new(r"^(\d+) of (\w+)$")
///     .expect("example ensures fallible call succeeds");
/// let values = extract_captured_values(&regex, "42 of STK1")
///     .expect("example ensures fallible call succeeds");
/// assert_eq!(values, vec!["42".to_string(), "STK1".to_string()]);
/// assert!(extract_captured_values(&regex, "nope").is_none());
/// ```
#[must_use]
pub fn extract_captured_values(re: &Regex, text: &str) -> Option<Vec<String>> {
    let caps = re.captures(text)?;
    Some(
        caps.iter()
            .skip(1)
            .map(|group| group.map_or_else(String::new, |m| m.as_str().to_string()))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[expect(clippy::expect_used, reason = "tests require descriptive panic messages")]
    fn regex(source: &str) -> Regex {
        Regex::new(source).expect("test regex must compile")
    }

    #[test]
    fn returns_none_without_a_match() {
        assert!(extract_captured_values(&regex(r"^(\d+)$"), "nope").is_none());
    }

    #[test]
    fn keeps_alignment_for_absent_groups() {
        let captures = extract_captured_values(&regex(r"^(a)?(b)?$"), "b");
        assert_eq!(captures, Some(vec![String::new(), String::from("b")]));
    }

    #[test]
    fn literal_pattern_yields_no_values() {
        let captures = extract_captured_values(&regex(r"^done$"), "done");
        assert_eq!(captures, Some(Vec::new()));
    }
}
