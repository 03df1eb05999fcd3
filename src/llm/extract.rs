use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const BOM: char = '\u{feff}';
const ERROR_CONTEXT_RADIUS: usize = 150;

static CODE_FENCE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)^```[A-Za-z0-9_-]*[ \t]*\r?\n?(.*?)\r?\n?```$").expect("valid code fence regex")
});

// A quoted value, a bare word the model slipped in, then a closing brace.
static STRAY_BEFORE_CLOSE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("(?:[^"\\]|\\.)*")\s*\p{L}+\s*\}"#).expect("valid stray-token regex")
});

// Same artifact in front of an opening brace; here the model also dropped
// the separator, so a comma takes the word's place.
static STRAY_BEFORE_OPEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"("(?:[^"\\]|\\.)*")\s*\p{L}+\s*\{"#).expect("valid missing-separator regex")
});

#[derive(Debug, thiserror::Error)]
#[error("model response is not valid JSON: {source}")]
pub struct ExtractError {
    /// Text exactly as the model returned it.
    pub raw: String,
    /// Text after fence/BOM stripping and repair rules.
    pub repaired: String,
    /// Window around the position the parser flagged.
    pub context: String,
    #[source]
    pub source: serde_json::Error,
}

/// Deletes a stray bare word sitting between a string value and a closing
/// brace. `{"a": "x" stray }` becomes `{"a": "x"}`.
pub fn strip_stray_token_before_close(input: &str) -> String {
    STRAY_BEFORE_CLOSE_RE.replace_all(input, "${1}}").into_owned()
}

/// Replaces a stray bare word between a string value and an opening brace
/// with the comma the model omitted. `"x" stray {` becomes `"x",{`.
pub fn insert_missing_separator(input: &str) -> String {
    STRAY_BEFORE_OPEN_RE.replace_all(input, "${1},{").into_owned()
}

fn strip_bom(text: &str) -> &str {
    text.strip_prefix(BOM).unwrap_or(text)
}

fn unwrap_code_fence(text: &str) -> &str {
    match CODE_FENCE_RE.captures(text) {
        Some(caps) => caps.get(1).map(|inner| inner.as_str()).unwrap_or(text),
        None => text,
    }
}

fn clamp_to_char_boundary(text: &str, mut index: usize, forward: bool) -> usize {
    index = index.min(text.len());
    while index > 0 && index < text.len() && !text.is_char_boundary(index) {
        if forward {
            index += 1;
        } else {
            index -= 1;
        }
    }
    index.min(text.len())
}

fn error_context(text: &str, line: usize, column: usize) -> String {
    let mut offset = 0usize;
    for (index, content) in text.split('\n').enumerate() {
        if index + 1 == line {
            offset += column.saturating_sub(1).min(content.len());
            break;
        }
        offset += content.len() + 1;
    }
    let offset = offset.min(text.len());
    let start = clamp_to_char_boundary(text, offset.saturating_sub(ERROR_CONTEXT_RADIUS), false);
    let end = clamp_to_char_boundary(text, offset + ERROR_CONTEXT_RADIUS, true);
    text[start..end].to_string()
}

/// Pulls a JSON value out of a raw model response: trims, strips a single
/// leading byte-order mark, unwraps a fenced code block (checking for a
/// BOM again inside the fence), runs the repair rules, then parses. A
/// parse failure comes back as a structured error rather than a panic;
/// callers decide how to surface it.
pub fn extract_json(raw: &str) -> Result<Value, ExtractError> {
    let trimmed = strip_bom(raw.trim());
    let unfenced = strip_bom(unwrap_code_fence(trimmed).trim());

    let repaired = insert_missing_separator(&strip_stray_token_before_close(unfenced));
    match serde_json::from_str(&repaired) {
        Ok(value) => Ok(value),
        Err(source) => {
            let context = error_context(&repaired, source.line(), source.column());
            Err(ExtractError {
                raw: raw.to_string(),
                repaired,
                context,
                source,
            })
        }
    }
}
