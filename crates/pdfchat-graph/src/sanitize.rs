//! Post-processing of raw model answers.
//!
//! The model is asked for a bare answer but often echoes the question or
//! opens with a lead-in such as "The answer is". [`clean`] removes both.
//! The heuristics are English-only and match case-insensitively, so a
//! legitimate answer that happens to start with a filler phrase loses it.

/// Lead-in phrases, checked in order; only the first match is stripped.
pub const FILLER_PREFIXES: [&str; 8] = [
    "the name is",
    "the mobile number is",
    "mobile number:",
    "phone number:",
    "the answer is",
    "based on the pdf",
    "according to the pdf",
    "from the pdf",
];

const SEPARATORS: [char; 4] = [' ', ':', ',', '-'];

/// Words left dangling when an answer starts by repeating the question
/// ("<question> is 42").
const ECHO_COPULAS: [&str; 4] = ["is", "are", "was", "were"];

/// Strip echoed question text and one filler prefix from `raw_response`.
///
/// May return an empty string when the response was nothing but echo and
/// boilerplate.
pub fn clean(raw_response: &str, user_question: &str) -> String {
    let (without_echo, echoed_at_start) = remove_echo(raw_response, user_question);

    let mut text = without_echo.trim();
    if echoed_at_start {
        text = drop_echo_residue(text);
    }

    strip_filler_prefix(text).trim().to_string()
}

/// Remove every case-insensitive occurrence of `question`. The flag reports
/// whether the first occurrence opened the response.
fn remove_echo(text: &str, question: &str) -> (String, bool) {
    if question.is_empty() {
        return (text.to_string(), false);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    let mut echoed_at_start = false;
    let mut first = true;

    while let Some((start, end)) = find_ignore_case(rest, question) {
        if first {
            echoed_at_start = rest[..start].trim().is_empty();
            first = false;
        }
        out.push_str(&rest[..start]);
        rest = &rest[end..];
    }
    out.push_str(rest);

    (out, echoed_at_start)
}

fn drop_echo_residue(text: &str) -> &str {
    let text = trim_separators(text);

    for copula in ECHO_COPULAS {
        if let Some(len) = match_prefix_ignore_case(text, copula) {
            let rest = &text[len..];
            let whole_word = rest
                .chars()
                .next()
                .map_or(true, |c| c.is_whitespace() || SEPARATORS.contains(&c));
            if whole_word {
                return trim_separators(rest);
            }
        }
    }

    text
}

fn strip_filler_prefix(text: &str) -> &str {
    for prefix in FILLER_PREFIXES {
        if let Some(len) = match_prefix_ignore_case(text, prefix) {
            return text[len..].trim().trim_start_matches(SEPARATORS);
        }
    }
    text
}

fn trim_separators(text: &str) -> &str {
    text.trim_start_matches(|c: char| c.is_whitespace() || SEPARATORS.contains(&c))
}

/// Byte range of the first case-insensitive occurrence of `needle`
fn find_ignore_case(haystack: &str, needle: &str) -> Option<(usize, usize)> {
    haystack.char_indices().find_map(|(start, _)| {
        match_prefix_ignore_case(&haystack[start..], needle).map(|len| (start, start + len))
    })
}

/// Byte length of the prefix of `text` that equals `prefix` ignoring case
fn match_prefix_ignore_case(text: &str, prefix: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !chars_eq_ignore_case(actual, expected) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(idx, _)| idx))
}

fn chars_eq_ignore_case(a: char, b: char) -> bool {
    a == b || a.to_lowercase().eq(b.to_lowercase())
}
