use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};

use crate::app::{PanelcastError, Result};
use crate::domain::{ComicRecord, NewComic, SessionCredential, Source, SourceSeed};
use crate::store::Store;

const COMIC_COLUMNS: &str =
    "id, source_id, native_id, title, description, url, cover_url, discovered_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        conn.execute("PRAGMA foreign_keys = ON", [])?;
        migrations.to_latest(&mut conn)?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            PanelcastError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn comic_from_row(row: &Row<'_>) -> rusqlite::Result<ComicRecord> {
        Ok(ComicRecord {
            id: row.get(0)?,
            source_id: row.get(1)?,
            native_id: row.get(2)?,
            title: row.get(3)?,
            description: row.get(4)?,
            url: row.get(5)?,
            cover_url: row.get(6)?,
            discovered_at: row
                .get::<_, String>(7)
                .ok()
                .and_then(|s| Self::parse_datetime(&s))
                .unwrap_or_else(Utc::now),
        })
    }
}

impl Store for SqliteStore {
    fn initialize(&self, seeds: &[SourceSeed], user_agent: &str) -> Result<bool> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;

        let existing: i64 = tx.query_row("SELECT COUNT(*) FROM sources", [], |row| row.get(0))?;
        if existing > 0 {
            return Ok(false);
        }

        // Epoch timestamp: the first cycle always refreshes the token.
        let placeholder_created_at = DateTime::<Utc>::UNIX_EPOCH.to_rfc3339();

        for seed in seeds {
            tx.execute(
                "INSERT INTO sources (name, url) VALUES (?1, ?2)",
                params![seed.name, seed.url],
            )?;
            let source_id = tx.last_insert_rowid();

            if seed.credentialed {
                tx.execute(
                    "INSERT INTO credentials (source_id, token, user_agent, created_at)
                     VALUES (?1, '', ?2, ?3)",
                    params![source_id, user_agent, placeholder_created_at],
                )?;
            }
        }

        tx.commit()?;
        Ok(true)
    }

    fn get_source(&self, name: &str) -> Result<Option<Source>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT id, name, url FROM sources WHERE name = ?1",
                params![name],
                |row| {
                    Ok(Source {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        url: row.get(2)?,
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn get_sources(&self) -> Result<Vec<Source>> {
        let conn = self.conn()?;

        let mut stmt = conn.prepare("SELECT id, name, url FROM sources ORDER BY id")?;
        let sources = stmt
            .query_map([], |row| {
                Ok(Source {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    url: row.get(2)?,
                })
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(sources)
    }

    fn comic_exists(&self, source_id: i64, native_id: &str) -> Result<bool> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comics WHERE source_id = ?1 AND native_id = ?2",
            params![source_id, native_id],
            |row| row.get(0),
        )?;

        Ok(count > 0)
    }

    fn insert_comic(&self, comic: &NewComic) -> Result<ComicRecord> {
        let conn = self.conn()?;
        let discovered_at = Utc::now();

        conn.execute(
            "INSERT INTO comics (source_id, native_id, title, description, url, cover_url, discovered_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                comic.source_id,
                comic.native_id,
                comic.title,
                comic.description,
                comic.url,
                comic.cover_url,
                discovered_at.to_rfc3339()
            ],
        )?;

        Ok(ComicRecord {
            id: conn.last_insert_rowid(),
            source_id: comic.source_id,
            native_id: comic.native_id.clone(),
            title: comic.title.clone(),
            description: comic.description.clone(),
            url: comic.url.clone(),
            cover_url: comic.cover_url.clone(),
            discovered_at,
        })
    }

    fn get_comic(&self, id: i64) -> Result<Option<ComicRecord>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                &format!("SELECT {COMIC_COLUMNS} FROM comics WHERE id = ?1"),
                params![id],
                Self::comic_from_row,
            )
            .optional()?;

        Ok(result)
    }

    fn list_comics(&self, source_id: Option<i64>, limit: usize) -> Result<Vec<ComicRecord>> {
        let conn = self.conn()?;
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);

        let comics = match source_id {
            Some(source_id) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COMIC_COLUMNS} FROM comics WHERE source_id = ?1
                     ORDER BY discovered_at DESC, id DESC LIMIT ?2"
                ))?;
                let rows = stmt.query_map(params![source_id, limit], Self::comic_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {COMIC_COLUMNS} FROM comics
                     ORDER BY discovered_at DESC, id DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit], Self::comic_from_row)?;
                rows.collect::<std::result::Result<Vec<_>, _>>()?
            }
        };

        Ok(comics)
    }

    fn count_comics(&self, source_id: i64) -> Result<i64> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM comics WHERE source_id = ?1",
            params![source_id],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn get_credential(&self, source_id: i64) -> Result<Option<SessionCredential>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT source_id, token, user_agent, created_at
                 FROM credentials WHERE source_id = ?1",
                params![source_id],
                |row| {
                    Ok(SessionCredential {
                        source_id: row.get(0)?,
                        token: row.get(1)?,
                        user_agent: row.get(2)?,
                        // An unreadable timestamp counts as stale.
                        created_at: row
                            .get::<_, String>(3)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn update_credential(
        &self,
        source_id: i64,
        token: &str,
        created_at: DateTime<Utc>,
    ) -> Result<()> {
        let conn = self.conn()?;

        let updated = conn.execute(
            "UPDATE credentials SET token = ?1, created_at = ?2 WHERE source_id = ?3",
            params![token, created_at.to_rfc3339(), source_id],
        )?;

        if updated == 0 {
            return Err(PanelcastError::CredentialMissing(source_id.to_string()));
        }

        Ok(())
    }
}
