use regex::{Regex, RegexBuilder};

/// Case-insensitive matcher for the trimmed search query, used to highlight
/// hits in the list and editor. `None` when there is nothing to highlight.
pub fn build_highlight_regex(query: &str) -> Option<Regex> {
    let needle = query.trim();
    if needle.is_empty() {
        return None;
    }
    RegexBuilder::new(&regex::escape(needle))
        .case_insensitive(true)
        .build()
        .ok()
}

/// Splits `text` into `(segment, is_match)` pieces in order.
pub fn split_matches<'a>(text: &'a str, regex: Option<&Regex>) -> Vec<(&'a str, bool)> {
    let Some(regex) = regex else {
        return vec![(text, false)];
    };
    let mut pieces = Vec::new();
    let mut last = 0;
    for found in regex.find_iter(text) {
        if found.start() > last {
            pieces.push((&text[last..found.start()], false));
        }
        pieces.push((found.as_str(), true));
        last = found.end();
    }
    if last < text.len() || pieces.is_empty() {
        pieces.push((&text[last..], false));
    }
    pieces
}
