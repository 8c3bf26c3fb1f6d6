pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::app::Result;
use crate::domain::{ComicRecord, NewComic, SessionCredential, Source, SourceSeed};

pub use sqlite::SqliteStore;

/// The deduplication ledger.
///
/// `insert_comic` is the only way a comic enters the ledger, and callers
/// check `comic_exists` for the same key first within the same cycle.
pub trait Store {
    /// Seed sources and their initial credentials. Returns `false` when the
    /// ledger was already seeded.
    fn initialize(&self, seeds: &[SourceSeed], user_agent: &str) -> Result<bool>;

    // Source operations
    fn get_source(&self, name: &str) -> Result<Option<Source>>;
    fn get_sources(&self) -> Result<Vec<Source>>;

    // Comic operations
    fn comic_exists(&self, source_id: i64, native_id: &str) -> Result<bool>;
    fn insert_comic(&self, comic: &NewComic) -> Result<ComicRecord>;
    fn get_comic(&self, id: i64) -> Result<Option<ComicRecord>>;
    fn list_comics(&self, source_id: Option<i64>, limit: usize) -> Result<Vec<ComicRecord>>;
    fn count_comics(&self, source_id: i64) -> Result<i64>;

    // Credential operations
    fn get_credential(&self, source_id: i64) -> Result<Option<SessionCredential>>;
    fn update_credential(
        &self,
        source_id: i64,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()>;
}
