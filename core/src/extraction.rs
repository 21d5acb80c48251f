//! Recovers a single JSON value embedded anywhere in a free-text model
//! completion. Models are prompted to return bare JSON but routinely wrap it
//! in prose, markdown fences, or trailing commentary — the scanner here
//! tolerates all of that without ever returning a truncated span.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// Which JSON shape the call site expects to find in the completion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractKind {
    Object,
    Array,
}

impl ExtractKind {
    fn open(self) -> char {
        match self {
            Self::Object => '{',
            Self::Array => '[',
        }
    }

    fn close(self) -> char {
        match self {
            Self::Object => '}',
            Self::Array => ']',
        }
    }
}

impl fmt::Display for ExtractKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Object => f.write_str("object"),
            Self::Array => f.write_str("array"),
        }
    }
}

#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The text contains no opening delimiter of the expected kind, or the
    /// delimiters never balance before the input ends.
    #[error("completion contains no balanced JSON {expected}")]
    NoDelimitedValue { expected: ExtractKind },
    /// A balanced span was found but is not valid JSON, even after one
    /// repair pass. Carries the span for diagnostics.
    #[error("extracted JSON {expected} does not parse: {reason}")]
    MalformedValue {
        expected: ExtractKind,
        span: String,
        reason: String,
    },
}

impl ExtractionError {
    /// Machine-readable failure kind, surfaced in API error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NoDelimitedValue { .. } => "no_delimited_value",
            Self::MalformedValue { .. } => "malformed_value",
        }
    }
}

/// Recover the first well-formed JSON value of `kind` from `raw`.
///
/// Scans from the first opening delimiter, tracking nesting depth and an
/// in-string flag so that braces inside string literals (a model writing
/// `"{tip}"` in an advice field, say) do not perturb the count. The span ends
/// at the character that returns depth to zero — trailing prose containing an
/// unrelated closing delimiter is never swallowed, which a greedy
/// first-to-last match gets wrong.
pub fn extract(raw: &str, kind: ExtractKind) -> Result<Value, ExtractionError> {
    let span = balanced_span(raw, kind)
        .ok_or(ExtractionError::NoDelimitedValue { expected: kind })?;

    match serde_json::from_str(span) {
        Ok(value) => Ok(value),
        Err(first_err) => {
            // One bounded repair pass: models most often break strict JSON
            // with trailing commas or by leaving fence markers attached.
            let repaired = strip_trailing_commas(&strip_code_fences(span));
            serde_json::from_str(&repaired).map_err(|_| ExtractionError::MalformedValue {
                expected: kind,
                span: span.to_string(),
                reason: first_err.to_string(),
            })
        }
    }
}

/// The minimal outer-delimited substring of `raw` starting at the first
/// opening delimiter of `kind`, or `None` if the delimiters never balance.
fn balanced_span(raw: &str, kind: ExtractKind) -> Option<&str> {
    let (open, close) = (kind.open(), kind.close());
    let start = raw.find(open)?;

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        if ch == '"' {
            in_string = true;
        } else if ch == open {
            depth += 1;
        } else if ch == close {
            depth -= 1;
            if depth == 0 {
                let end = start + offset + ch.len_utf8();
                return Some(&raw[start..end]);
            }
        }
    }

    None
}

/// Drop a leading/trailing markdown fence marker (```json ... ```), if any.
fn strip_code_fences(span: &str) -> String {
    let mut s = span.trim();
    if let Some(rest) = s.strip_prefix("```") {
        // The fence line may carry a language tag; skip through its newline.
        s = match rest.find('\n') {
            Some(idx) => rest[idx + 1..].trim(),
            None => rest.trim(),
        };
    }
    if let Some(rest) = s.strip_suffix("```") {
        s = rest.trim();
    }
    s.to_string()
}

/// Remove commas that directly precede a closing delimiter, outside string
/// literals. `{"a": 1,}` and `[1, 2,]` become parseable; commas inside
/// string values are left alone.
fn strip_trailing_commas(span: &str) -> String {
    let mut out = String::with_capacity(span.len());
    let mut in_string = false;
    let mut escaped = false;
    let chars: Vec<char> = span.chars().collect();

    for (i, &ch) in chars.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            out.push(ch);
            continue;
        }

        match ch {
            '"' => {
                in_string = true;
                out.push(ch);
            }
            ',' => {
                let next_meaningful = chars[i + 1..].iter().find(|c| !c.is_whitespace());
                if matches!(next_meaningful, Some('}') | Some(']')) {
                    continue;
                }
                out.push(ch);
            }
            _ => out.push(ch),
        }
    }

    out
}
