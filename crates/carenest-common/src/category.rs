//! The six record categories that can be searched and watched.
//!
//! Each category maps to one backend table and carries the metadata needed
//! to scope queries to a child, build searchable text, and label results.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::CareError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordCategory {
    Medications,
    Contacts,
    Protocols,
    Logs,
    Suppliers,
    ProfileInfo,
}

impl RecordCategory {
    /// All categories, in result tie-break order.
    pub const ALL: [RecordCategory; 6] = [
        RecordCategory::Medications,
        RecordCategory::Contacts,
        RecordCategory::Protocols,
        RecordCategory::Logs,
        RecordCategory::Suppliers,
        RecordCategory::ProfileInfo,
    ];

    /// Backend table name.
    pub fn table(self) -> &'static str {
        match self {
            Self::Medications => "medications",
            Self::Contacts => "contacts",
            Self::Protocols => "emergency_protocols",
            Self::Logs => "daily_logs",
            Self::Suppliers => "suppliers",
            Self::ProfileInfo => "children",
        }
    }

    /// Column holding the owning child id. Profile rows are the child itself.
    pub fn owner_column(self) -> &'static str {
        match self {
            Self::ProfileInfo => "id",
            _ => "child_id",
        }
    }

    /// Plural label, used as toast titles.
    pub fn label(self) -> &'static str {
        match self {
            Self::Medications => "Medications",
            Self::Contacts => "Contacts",
            Self::Protocols => "Emergency protocols",
            Self::Logs => "Daily logs",
            Self::Suppliers => "Suppliers",
            Self::ProfileInfo => "Profile",
        }
    }

    /// Singular label, used in toast bodies ("Medication added").
    pub fn singular(self) -> &'static str {
        match self {
            Self::Medications => "Medication",
            Self::Contacts => "Contact",
            Self::Protocols => "Emergency protocol",
            Self::Logs => "Daily log",
            Self::Suppliers => "Supplier",
            Self::ProfileInfo => "Profile info",
        }
    }

    /// Fields concatenated into the searchable text of one record.
    pub fn search_fields(self) -> &'static [&'static str] {
        match self {
            Self::Medications => &["name", "dosage", "frequency", "prescriber", "notes"],
            Self::Contacts => &["name", "role", "organization", "phone", "email", "notes"],
            Self::Protocols => &["title", "description", "steps"],
            Self::Logs => &["title", "category", "mood", "description", "notes"],
            Self::Suppliers => &["name", "category", "contact_person", "phone", "email", "notes"],
            Self::ProfileInfo => &["name", "diagnosis", "allergies", "school", "notes"],
        }
    }

    pub fn title_field(self) -> &'static str {
        match self {
            Self::Protocols | Self::Logs => "title",
            _ => "name",
        }
    }

    pub fn subtitle_field(self) -> &'static str {
        match self {
            Self::Medications => "dosage",
            Self::Contacts => "role",
            Self::Protocols => "severity",
            Self::Logs => "date",
            Self::Suppliers => "category",
            Self::ProfileInfo => "diagnosis",
        }
    }

    pub fn description_field(self) -> &'static str {
        match self {
            Self::Protocols | Self::Logs => "description",
            _ => "notes",
        }
    }

    /// Application route a result links to.
    pub fn route(self) -> &'static str {
        match self {
            Self::Medications => "/medications",
            Self::Contacts => "/contacts",
            Self::Protocols => "/emergency",
            Self::Logs => "/daily-log",
            Self::Suppliers => "/suppliers",
            Self::ProfileInfo => "/profile",
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            Self::Medications => "pill",
            Self::Contacts => "phone",
            Self::Protocols => "siren",
            Self::Logs => "notebook",
            Self::Suppliers => "truck",
            Self::ProfileInfo => "user",
        }
    }

    /// Look up a category by its backend table name.
    pub fn from_table(table: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.table() == table)
    }
}

impl fmt::Display for RecordCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Medications => "medications",
            Self::Contacts => "contacts",
            Self::Protocols => "protocols",
            Self::Logs => "logs",
            Self::Suppliers => "suppliers",
            Self::ProfileInfo => "profile_info",
        };
        f.write_str(name)
    }
}

/// Accepts either the short name (`logs`) or the table name (`daily_logs`).
impl FromStr for RecordCategory {
    type Err = CareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.to_string() == s || c.table() == s)
            .ok_or_else(|| CareError::UnknownCategory(s.to_string()))
    }
}
