//! Row-change events delivered by the change feed.

use carenest_common::RecordCategory;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    /// Past-tense action shown to the user.
    pub fn verb(self) -> &'static str {
        match self {
            ChangeKind::Insert => "added",
            ChangeKind::Update => "updated",
            ChangeKind::Delete => "removed",
        }
    }
}

/// One insert/update/delete on a watched table.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeEvent {
    pub category: RecordCategory,
    pub kind: ChangeKind,
    /// New row; empty object for deletes.
    pub record: Value,
    /// Previous row; for deletes under the default replica identity this
    /// only carries the primary key.
    pub old_record: Value,
    pub commit_timestamp: Option<String>,
}

#[derive(Deserialize)]
struct RawChange {
    table: String,
    #[serde(rename = "type")]
    kind: ChangeKind,
    #[serde(default)]
    record: Option<Value>,
    #[serde(default)]
    old_record: Option<Value>,
    #[serde(default)]
    commit_timestamp: Option<String>,
}

impl ChangeEvent {
    /// Parse the `data` object of a `postgres_changes` payload. Returns
    /// `None` for malformed payloads and tables outside the six categories.
    pub fn from_payload(data: &Value) -> Option<Self> {
        let raw: RawChange = serde_json::from_value(data.clone()).ok()?;
        let category = RecordCategory::from_table(&raw.table)?;
        Some(Self {
            category,
            kind: raw.kind,
            record: raw.record.unwrap_or_else(empty_object),
            old_record: raw.old_record.unwrap_or_else(empty_object),
            commit_timestamp: raw.commit_timestamp,
        })
    }

    /// The owning child id of the affected row, if the payload carries it.
    pub fn owner_id(&self) -> Option<&Value> {
        let column = self.category.owner_column();
        let row = match self.kind {
            ChangeKind::Delete => &self.old_record,
            ChangeKind::Insert | ChangeKind::Update => &self.record,
        };
        row.get(column)
            .or_else(|| self.old_record.get(column))
            .filter(|v| !v.is_null())
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}
