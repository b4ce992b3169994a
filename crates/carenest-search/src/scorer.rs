//! Text relevance scoring.

use serde_json::Value;

/// How a query matched a record's searchable text, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MatchTier {
    Exact,
    Prefix,
    Contains,
    WordPrefix,
    None,
}

impl MatchTier {
    pub fn score(self) -> u8 {
        match self {
            MatchTier::Exact => 100,
            MatchTier::Prefix => 80,
            MatchTier::Contains => 60,
            MatchTier::WordPrefix => 40,
            MatchTier::None => 0,
        }
    }
}

/// Classify `query` against `text`, case-insensitively.
///
/// Tiers are tested in order, so a word-prefix hit that is also a
/// substring hit reports `Contains`.
pub fn match_tier(text: &str, query: &str) -> MatchTier {
    let text = text.trim().to_lowercase();
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return MatchTier::None;
    }

    if text == query {
        MatchTier::Exact
    } else if text.starts_with(&query) {
        MatchTier::Prefix
    } else if text.contains(&query) {
        MatchTier::Contains
    } else if text.split_whitespace().any(|word| word.starts_with(&query)) {
        MatchTier::WordPrefix
    } else {
        MatchTier::None
    }
}

/// Score `text` against `query`: 100, 80, 60, 40 or 0.
pub fn score(text: &str, query: &str) -> u8 {
    match_tier(text, query).score()
}

/// Concatenate a row's searchable fields into one string.
///
/// Missing, null and empty fields contribute nothing. Arrays of scalars
/// (e.g. protocol steps) are flattened.
pub fn searchable_text(row: &Value, fields: &[&str]) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(fields.len());
    for field in fields {
        if let Some(value) = row.get(*field) {
            push_text(&mut parts, value);
        }
    }
    parts.join(" ")
}

fn push_text(parts: &mut Vec<String>, value: &Value) {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if !s.is_empty() {
                parts.push(s.to_string());
            }
        }
        Value::Number(n) => parts.push(n.to_string()),
        Value::Bool(b) => parts.push(b.to_string()),
        Value::Array(items) => {
            for item in items {
                push_text(parts, item);
            }
        }
        Value::Null | Value::Object(_) => {}
    }
}
