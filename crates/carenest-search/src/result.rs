//! Search result types.

use carenest_common::RecordCategory;
use serde::Serialize;
use serde_json::Value;

/// One ranked hit, ready for a result list.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    pub id: String,
    #[serde(rename = "type")]
    pub category: RecordCategory,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub url: String,
    pub icon: String,
    pub score: u8,
}

impl SearchResult {
    /// Build a result from a raw backend row. Rows without an `id` are
    /// skipped since they cannot be linked to.
    pub fn from_row(category: RecordCategory, row: &Value, score: u8) -> Option<Self> {
        let id = scalar_text(row.get("id")?)?;
        let title = row
            .get(category.title_field())
            .and_then(scalar_text)
            .unwrap_or_else(|| category.singular().to_string());

        Some(Self {
            url: format!("{}?highlight={}", category.route(), id),
            id,
            category,
            title,
            subtitle: row.get(category.subtitle_field()).and_then(scalar_text),
            description: row.get(category.description_field()).and_then(scalar_text),
            icon: category.icon().to_string(),
            score,
        })
    }
}

/// Merged, ranked output of one search.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SearchResponse {
    pub results: Vec<SearchResult>,
    /// Categories whose lookup failed; their records are absent.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<RecordCategory>,
}

impl SearchResponse {
    pub fn is_partial(&self) -> bool {
        !self.failed.is_empty()
    }
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
