//! Bounded repair of semi-structured model output.
//!
//! A strict parse is tried first. When it fails, the candidates below are
//! tried in order and the first one that decodes wins:
//!
//! 1. contents of markdown code fences
//! 2. the largest balanced `{..}` / `[..]` slice (string-aware)
//! 3. the previous candidates with trailing commas removed
//!
//! Any candidate that decodes to a bare array is wrapped under the stage's
//! collection key before decoding into the envelope type.

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

static CODE_FENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)```[A-Za-z]*[ \t]*\r?\n?(.*?)```").expect("code fence pattern compiles")
});

static TRAILING_COMMA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("trailing comma pattern compiles"));

/// Which candidate produced the accepted value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepairStrategy {
    Strict,
    CodeFence,
    BalancedSlice,
    TrailingCommas,
}

impl RepairStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            RepairStrategy::Strict => "strict",
            RepairStrategy::CodeFence => "code_fence",
            RepairStrategy::BalancedSlice => "balanced_slice",
            RepairStrategy::TrailingCommas => "trailing_commas",
        }
    }
}

/// A decoded value and how it was obtained.
#[derive(Debug, Clone)]
pub struct Repaired<T> {
    pub value: T,
    pub strategy: RepairStrategy,
    /// A bare array was wrapped under the collection key.
    pub wrapped: bool,
}

impl<T> Repaired<T> {
    /// Whether any heuristic beyond the strict parse was needed.
    pub fn was_repaired(&self) -> bool {
        self.strategy != RepairStrategy::Strict || self.wrapped
    }
}

/// Decode `raw` into `T`, repairing common formatting damage.
///
/// Returns a human-readable reason when no candidate decodes.
pub fn parse_with_repair<T: DeserializeOwned>(
    raw: &str,
    collection_key: &str,
) -> Result<Repaired<T>, String> {
    let text = raw.trim();
    if text.is_empty() {
        return Err("empty output".to_string());
    }

    let mut candidates: Vec<(String, RepairStrategy)> =
        vec![(text.to_string(), RepairStrategy::Strict)];

    for caps in CODE_FENCE.captures_iter(text) {
        if let Some(body) = caps.get(1) {
            let body = body.as_str().trim();
            if !body.is_empty() {
                candidates.push((body.to_string(), RepairStrategy::CodeFence));
            }
        }
    }

    if let Some(slice) = largest_balanced(text) {
        candidates.push((slice.to_string(), RepairStrategy::BalancedSlice));
    }

    let stripped: Vec<(String, RepairStrategy)> = candidates
        .iter()
        .filter_map(|(candidate, _)| {
            let fixed = TRAILING_COMMA.replace_all(candidate, "$1");
            (fixed != candidate.as_str())
                .then(|| (fixed.into_owned(), RepairStrategy::TrailingCommas))
        })
        .collect();
    candidates.extend(stripped);

    let mut last_error = String::new();
    for (candidate, strategy) in &candidates {
        match decode::<T>(candidate, collection_key) {
            Ok((value, wrapped)) => {
                return Ok(Repaired {
                    value,
                    strategy: *strategy,
                    wrapped,
                })
            }
            Err(err) => last_error = err,
        }
    }

    Err(format!(
        "no candidate decoded into the `{}` envelope: {}",
        collection_key, last_error
    ))
}

fn decode<T: DeserializeOwned>(candidate: &str, collection_key: &str) -> Result<(T, bool), String> {
    let value: Value =
        serde_json::from_str(candidate).map_err(|e| format!("invalid JSON: {}", e))?;

    let (value, wrapped) = match value {
        Value::Array(items) => {
            let mut envelope = serde_json::Map::new();
            envelope.insert(collection_key.to_string(), Value::Array(items));
            (Value::Object(envelope), true)
        }
        other => (other, false),
    };

    serde_json::from_value::<T>(value)
        .map(|parsed| (parsed, wrapped))
        .map_err(|e| format!("schema mismatch: {}", e))
}

/// Largest substring starting at `{` or `[` whose brackets balance,
/// ignoring brackets inside JSON strings. Single pass over the text.
fn largest_balanced(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut best: Option<(usize, usize)> = None;
    // Open brackets of the span being scanned: (position, expected closer).
    let mut open: Vec<(usize, u8)> = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for (pos, &b) in bytes.iter().enumerate() {
        if in_string {
            if escaped {
                escaped = false;
            } else if b == b'\\' {
                escaped = true;
            } else if b == b'"' {
                in_string = false;
            }
            continue;
        }

        match b {
            // Quotes only matter inside a span; prose around it is free text.
            b'"' if !open.is_empty() => in_string = true,
            b'{' => open.push((pos, b'}')),
            b'[' => open.push((pos, b']')),
            b'}' | b']' => match open.pop() {
                Some((start, closer)) if closer == b => {
                    if best.map_or(true, |(s, e)| pos - start > e - s) {
                        best = Some((start, pos));
                    }
                }
                // A mismatched closer ends every span opened before it.
                Some(_) => open.clear(),
                None => {}
            },
            _ => {}
        }
    }

    best.map(|(s, e)| &text[s..=e])
}
