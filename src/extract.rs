//! Extraction of structured payloads from free-form capability output.
//!
//! Routing authorities answer in free text that is merely *expected* to
//! embed a JSON payload, sometimes wrapped in an XML-like tag, sometimes
//! surrounded by prose. These helpers pull the payload out before any
//! `serde_json` parsing is attempted; callers treat `None` as a parse
//! failure and fall back deterministically.

use regex::Regex;

/// Extracts the content of the first `<tag>...</tag>` block, trimmed.
pub fn extract_tagged(text: &str, tag: &str) -> Option<String> {
    let pattern = format!(r"(?s)<{tag}>(.*?)</{tag}>", tag = regex::escape(tag));

    if let Ok(regex) = Regex::new(&pattern)
        && let Some(captures) = regex.captures(text)
        && let Some(content) = captures.get(1)
    {
        return Some(content.as_str().trim().to_string());
    }

    None
}

/// Extracts the first complete JSON object from the text.
///
/// Scans for a balanced `{...}` span, ignoring braces inside string
/// literals and honoring backslash escapes. Returns the span verbatim,
/// including the braces.
pub fn extract_first_json_object(text: &str) -> Option<String> {
    let mut depth = 0usize;
    let mut start_pos = None;
    let mut in_string = false;
    let mut escape_next = false;

    for (i, ch) in text.char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => {
                if depth == 0 {
                    start_pos = Some(i);
                }
                depth += 1;
            }
            '}' if !in_string => {
                if depth > 0 {
                    depth -= 1;
                    if depth == 0
                        && let Some(p) = start_pos
                    {
                        return Some(text[p..=i].to_string());
                    }
                }
            }
            _ => {}
        }
    }

    None
}
