//! Structured result extraction from accumulated model output.
//!
//! Model output is requested as JSON but only approximately honored:
//! it may arrive wrapped in a fenced code block, preceded by prose, or
//! truncated mid-object. Extraction degrades through progressively more
//! tolerant strategies and never fails; after a successful, costly model
//! call a partial answer beats a hard error.

use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;

/// Content fields recovered from model output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    pub summary: String,
    pub revelations: Vec<String>,
    pub takeaways: Vec<String>,
}

/// Parse accumulated model output into an [`Analysis`].
///
/// Strategies, each attempted only if the previous fails:
/// 1. direct JSON parse of the full text;
/// 2. JSON parse of a ```json fenced block's contents;
/// 3. JSON parse of the first `{ ... }` span;
/// 4. per-field regex extraction;
/// 5. cleaned raw text as the summary.
pub fn parse_analysis(text: &str) -> Analysis {
    if let Some(analysis) = parse_json_object(text) {
        return analysis;
    }

    if let Some(inner) = fenced_json(text) {
        if let Some(analysis) = parse_json_object(&inner) {
            return analysis;
        }
    }

    if let Some(span) = object_span(text) {
        if let Some(analysis) = parse_json_object(&span) {
            return analysis;
        }
    }

    extract_fields(text)
}

/// Strategy 1-3 workhorse: a strict parse of one candidate string.
fn parse_json_object(candidate: &str) -> Option<Analysis> {
    let parsed: Value = serde_json::from_str(candidate.trim()).ok()?;
    parsed.as_object()?;

    Some(Analysis {
        summary: parsed["summary"].as_str().unwrap_or_default().to_string(),
        revelations: string_array(&parsed["revelations"]),
        takeaways: string_array(&parsed["takeaways"]),
    })
}

fn string_array(value: &Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

/// Contents of a ```json fenced block, if present.
fn fenced_json(text: &str) -> Option<String> {
    static FENCED_RE: OnceLock<Regex> = OnceLock::new();
    let re = FENCED_RE
        .get_or_init(|| Regex::new(r"(?s)```json\s*(.*?)\s*```").expect("Invalid regex"));
    re.captures(text).map(|c| c[1].to_string())
}

/// The widest `{ ... }` span in the text, if any.
fn object_span(text: &str) -> Option<String> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| text[start..=end].to_string())
}

/// Strategy 4: field-by-field regex extraction when the payload is not
/// parseable as a whole (e.g. truncated output), falling back to cleaned
/// raw text for the summary.
fn extract_fields(text: &str) -> Analysis {
    static SUMMARY_RE: OnceLock<Regex> = OnceLock::new();
    static REVELATIONS_RE: OnceLock<Regex> = OnceLock::new();
    static TAKEAWAYS_RE: OnceLock<Regex> = OnceLock::new();

    let summary_re = SUMMARY_RE.get_or_init(|| {
        Regex::new(r#"(?s)"summary"\s*:\s*"((?:[^"\\]|\\.)*)""#).expect("Invalid regex")
    });
    let mut summary = summary_re
        .captures(text)
        .map(|c| unescape(&c[1]))
        .unwrap_or_default();

    let revelations = array_items(
        text,
        REVELATIONS_RE.get_or_init(|| labeled_array_re("revelations")),
    );
    let takeaways = array_items(
        text,
        TAKEAWAYS_RE.get_or_init(|| labeled_array_re("takeaways")),
    );

    if summary.is_empty() {
        summary = clean_raw_text(text);
    }

    Analysis {
        summary,
        revelations,
        takeaways,
    }
}

fn labeled_array_re(label: &str) -> Regex {
    Regex::new(&format!(r#"(?s)"{}"\s*:\s*\[(.*?)\]"#, label)).expect("Invalid regex")
}

/// Extract each quoted string element of a matched JSON array
/// independently, so one broken element doesn't lose the rest.
fn array_items(text: &str, array_re: &Regex) -> Vec<String> {
    static ITEM_RE: OnceLock<Regex> = OnceLock::new();

    let Some(caps) = array_re.captures(text) else {
        return Vec::new();
    };

    let item_re =
        ITEM_RE.get_or_init(|| Regex::new(r#""((?:[^"\\]|\\.)*)""#).expect("Invalid regex"));
    item_re
        .captures_iter(&caps[1])
        .map(|c| unescape(&c[1]))
        .collect()
}

/// Unescape standard JSON escape sequences in an extracted string.
fn unescape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

/// Strategy 5: strip structural markup from raw text so plain prose (or
/// hopelessly mangled JSON) still reads as a summary.
fn clean_raw_text(text: &str) -> String {
    static CLEANUPS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

    let cleanups = CLEANUPS.get_or_init(|| {
        compile_cleanups(&[
            (r"```json\s*", ""),
            (r"```\s*", ""),
            (r"^\s*\{\s*", ""),
            (r"\s*\}\s*$", ""),
            (r#"(?i)"(summary|revelations|takeaways)"\s*:\s*"#, "\n"),
            (r"[\[\]]", ""),
            (r#"",\s*""#, "\n"),
            (r#"^"|"$"#, ""),
        ])
    });

    let mut cleaned = text.to_string();
    for (re, replacement) in cleanups {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }

    unescape(cleaned.trim())
}

fn compile_cleanups(pairs: &[(&str, &'static str)]) -> Vec<(Regex, &'static str)> {
    pairs
        .iter()
        .map(|(pattern, replacement)| (Regex::new(pattern).expect("Invalid regex"), *replacement))
        .collect()
}

/// Clean partial streaming text for display.
///
/// While the model is mid-answer the accumulated text is a JSON prefix;
/// observers want readable prose, not braces and keys. This strips the
/// structural markup without requiring the JSON to be complete.
pub fn clean_streaming_text(raw: &str) -> String {
    static MARKUP_CLEANUPS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    static SEPARATOR_CLEANUPS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

    if raw.trim().is_empty() {
        return String::new();
    }

    let markup = MARKUP_CLEANUPS.get_or_init(|| {
        compile_cleanups(&[
            (r"```json\s*", ""),
            (r"```\s*", ""),
            (r"^\s*\{\s*", ""),
            (r#"(?i)"(summary|revelations|takeaways)"\s*:\s*"#, "\n"),
            (r"\[\s*", ""),
            (r"\s*\]", ""),
            (r",\s*$", ""),
            (r"\}\s*$", ""),
            // Drop quotes around complete string values but keep contents.
            (r#""((?:[^"\\]|\\.)*)""#, "$1"),
        ])
    });
    // Collapses leftover separators between items.
    let separators = SEPARATOR_CLEANUPS.get_or_init(|| {
        compile_cleanups(&[
            (r",\s*,", ","),
            (r"\n\s*,\s*", "\n"),
            (r",\s*\n", "\n"),
            (r"\n{3,}", "\n\n"),
        ])
    });

    let mut cleaned = raw.to_string();
    for (re, replacement) in markup {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }

    cleaned = unescape(&cleaned);

    for (re, replacement) in separators {
        cleaned = re.replace_all(&cleaned, *replacement).into_owned();
    }

    cleaned.trim().to_string()
}
