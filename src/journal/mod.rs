//! Journal entries and the owner-checked repository over them

pub mod error;
pub mod repository;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use error::JournalError;
pub use repository::EntryRepository;

/// Persisted field names of an entry document
pub mod fields {
    pub const OWNER_ID: &str = "owner_id";
    pub const OWNER_LABEL: &str = "owner_label";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";
    pub const TITLE: &str = "title";
    pub const BODY: &str = "body";
}

/// Journal entry as seen by one caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalEntry {
    pub id: String,
    pub owner_id: String,
    pub owner_label: String,
    pub title: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Computed per read; never stored
    pub is_owned_by_current_user: bool,
}

/// Caller-supplied content of a new entry. Owner and timestamp fields are
/// not part of the schema, so payloads naming them are rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryContent {
    pub title: String,
    #[serde(default)]
    pub body: String,
}

/// Fields to merge into an existing entry; `None` leaves a field untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntryPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<String>,
}

impl EntryPatch {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.body.is_none()
    }
}
