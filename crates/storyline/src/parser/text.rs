//! Text slicing helpers for keyword-delimited sections.

/// `text` up to the earliest occurrence of any of `ends`.
pub(super) fn until_first<'a>(text: &'a str, ends: &[&str]) -> &'a str {
    ends.iter()
        .filter(|end| !end.is_empty())
        .filter_map(|end| text.find(end))
        .min()
        .and_then(|end| text.get(..end))
        .unwrap_or(text)
}

/// Trimmed text after the last `start`, up to the earliest of `ends`.
///
/// A keyword repeated in the same block restarts the section, so only the
/// text after its final occurrence is kept.
pub(super) fn section<'a>(text: &'a str, start: &str, ends: &[&String]) -> Option<&'a str> {
    if start.is_empty() {
        return None;
    }
    let (_, after) = text.rsplit_once(start)?;
    let ends: Vec<&str> = ends.iter().map(|end| end.as_str()).collect();
    Some(until_first(after, &ends).trim())
}

/// Byte offset of the first line, from line `skip` on, satisfying `pred`.
pub(super) fn first_line_where(
    text: &str,
    skip: usize,
    pred: impl Fn(&str) -> bool,
) -> Option<usize> {
    let mut offset = 0;
    for (index, line) in text.split_inclusive('\n').enumerate() {
        if index >= skip && pred(line) {
            return Some(offset);
        }
        offset += line.len();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cuts_at_earliest_end() {
        assert_eq!(until_first("a B c A", &["A", "B"]), "a ");
        assert_eq!(until_first("abc", &["x"]), "abc");
        assert_eq!(until_first("abc", &[""]), "abc");
    }

    #[test]
    fn extracts_sections() {
        let end = String::from("End:");
        assert_eq!(section("x Start: body \nEnd: y", "Start:", &[&end]), Some("body"));
        assert_eq!(section("no start", "Start:", &[&end]), None);
    }

    #[test]
    fn repeated_start_keywords_keep_the_last_section() {
        let end = String::from("End:");
        assert_eq!(
            section("Start: one
Start: two
End: three", "Start:", &[&end]),
            Some("two")
        );
    }

    #[test]
    fn finds_lines_after_skip() {
        let text = "Given a\nGiven b\n";
        assert_eq!(first_line_where(text, 0, |l| l.starts_with("Given")), Some(0));
        assert_eq!(first_line_where(text, 1, |l| l.starts_with("Given")), Some(8));
        assert_eq!(first_line_where(text, 0, |l| l.starts_with("When")), None);
    }
}
