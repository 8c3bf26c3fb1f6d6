use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Canonical descriptor produced by the normalizer, not yet in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComic {
    pub source_id: i64,
    pub native_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub cover_url: String,
}

/// A comic the ledger has recorded. Unique per `(source_id, native_id)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComicRecord {
    pub id: i64,
    pub source_id: i64,
    pub native_id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub cover_url: String,
    pub discovered_at: DateTime<Utc>,
}

impl ComicRecord {
    /// Message body shared by the document caption and the text fallback.
    pub fn caption(&self) -> String {
        format!("{}\n{}\n{}", self.title, self.url, self.description)
    }

    /// File name used for the cover attachment.
    pub fn cover_file_name(&self) -> String {
        format!("{}.jpg", self.native_id)
    }
}
