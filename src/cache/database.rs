//! SQLite-backed entry cache.

use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use super::entry::{Entry, EntryMetadata, PathHash, PosterRef};

/// Current schema version.
const SCHEMA_VERSION: i32 = 2;

/// Upper bound for a single page.
pub const MAX_PAGE_SIZE: u32 = 500;

const ENTRY_COLUMNS: &str = "path_hash, parent_hash, abs_path, rel_path, name, is_dir, \
     poster_ref, title, depth, last_scanned, metadata, is_series";

/// Errors that can occur while using the cache.
#[derive(thiserror::Error, Debug)]
pub enum CacheError {
    /// The underlying SQLite call failed.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The database directory could not be created.
    #[error("I/O error for {path}: {source}")]
    Io {
        /// Path where the error occurred
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The database was created by a newer version of the catalog.
    #[error("Unsupported cache schema version {found} (expected <= {expected})")]
    SchemaVersion {
        /// Version found in the file
        found: i32,
        /// Version this build understands
        expected: i32,
    },

    /// The background writer has stopped.
    #[error("Cache writer is no longer running")]
    WriterClosed,
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

/// One page of a listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    /// Total number of matching rows.
    pub total: u64,
    /// 1-based page number.
    pub page: u32,
    /// Page size used.
    pub page_size: u32,
    /// Rows on this page.
    pub items: Vec<T>,
}

impl<T> Page<T> {
    /// Transform the items, keeping the paging information.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            total: self.total,
            page: self.page,
            page_size: self.page_size,
            items: self.items.into_iter().map(f).collect(),
        }
    }
}

/// Clamp a 1-based page request and compute its offset.
fn page_window(page: u32, page_size: u32) -> (u32, u32, i64) {
    let page = page.max(1);
    let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
    let offset = i64::from(page - 1) * i64::from(page_size);
    (page, page_size, offset)
}

/// Persistent table of [`Entry`] rows keyed by path hash.
///
/// Reads and writes use separate connections so listings keep working
/// while a scan is committing batches (WAL mode).
pub struct CacheStore {
    path: PathBuf,
    reader: Mutex<Connection>,
    writer: Mutex<Connection>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore").field("path", &self.path).finish()
    }
}

fn lock(conn: &Mutex<Connection>) -> MutexGuard<'_, Connection> {
    conn.lock().unwrap_or_else(PoisonError::into_inner)
}

impl CacheStore {
    /// Opens or creates the cache database at `path`.
    pub fn open(path: &Path) -> CacheResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| CacheError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let writer = Self::connect(path)?;
        Self::init_schema(&writer)?;
        let reader = Self::connect(path)?;

        log::debug!("Opened entry cache at {}", path.display());

        Ok(Self {
            path: path.to_path_buf(),
            reader: Mutex::new(reader),
            writer: Mutex::new(writer),
        })
    }

    fn connect(path: &Path) -> CacheResult<Connection> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(std::time::Duration::from_secs(60))?;
        conn.execute_batch(
            "PRAGMA journal_mode=WAL;
             PRAGMA synchronous=NORMAL;",
        )?;
        Ok(conn)
    }

    fn init_schema(conn: &Connection) -> CacheResult<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);
            CREATE TABLE IF NOT EXISTS entries (
                path_hash    TEXT PRIMARY KEY,
                parent_hash  TEXT NOT NULL,
                abs_path     TEXT NOT NULL,
                rel_path     TEXT NOT NULL,
                name         TEXT NOT NULL,
                is_dir       INTEGER NOT NULL,
                poster_ref   TEXT,
                title        TEXT NOT NULL,
                depth        INTEGER NOT NULL,
                last_scanned INTEGER NOT NULL,
                metadata     TEXT NOT NULL,
                is_series    INTEGER NOT NULL DEFAULT 0
            );
            CREATE INDEX IF NOT EXISTS idx_entries_parent ON entries(parent_hash);
            CREATE INDEX IF NOT EXISTS idx_entries_title ON entries(title);
            "#,
        )?;

        let found: Option<i32> = conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;

        match found {
            None => {
                conn.execute(
                    "INSERT INTO schema_version (version) VALUES (?1)",
                    params![SCHEMA_VERSION],
                )?;
            }
            Some(version) if version > SCHEMA_VERSION => {
                return Err(CacheError::SchemaVersion {
                    found: version,
                    expected: SCHEMA_VERSION,
                });
            }
            Some(1) => {
                // Version 1 rows carry no series flag; the next scan sets it.
                conn.execute_batch(
                    "ALTER TABLE entries ADD COLUMN is_series INTEGER NOT NULL DEFAULT 0;
                     DROP INDEX IF EXISTS idx_entries_depth;",
                )?;
                conn.execute("UPDATE schema_version SET version = ?1", params![SCHEMA_VERSION])?;
                log::info!("Migrated entry cache schema from version 1 to {}", SCHEMA_VERSION);
            }
            Some(_) => {}
        }
        conn.execute_batch("CREATE INDEX IF NOT EXISTS idx_entries_series ON entries(is_series);")?;
        Ok(())
    }

    /// Location of the database file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Insert or overwrite a batch of entries in one transaction.
    ///
    /// Rows are keyed by `path_hash`, so re-upserting the same path is a
    /// whole-row replacement.
    pub fn upsert(&self, entries: &[Entry]) -> CacheResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        let mut conn = lock(&self.writer);
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(&format!(
                "INSERT OR REPLACE INTO entries ({ENTRY_COLUMNS})
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
            ))?;
            for entry in entries {
                let metadata = serde_json::to_string(&entry.metadata)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                stmt.execute(params![
                    entry.path_hash.as_str(),
                    entry.parent_hash.as_str(),
                    entry.abs_path.to_string_lossy(),
                    entry.rel_path,
                    entry.name,
                    entry.is_dir,
                    entry.poster.as_ref().map(ToString::to_string),
                    entry.title,
                    entry.depth,
                    entry.last_scanned.timestamp_millis(),
                    metadata,
                    entry.is_series,
                ])?;
            }
        }
        tx.commit()?;

        log::trace!("Upserted {} cache rows", entries.len());
        Ok(entries.len())
    }

    /// Look up one entry.
    pub fn get(&self, hash: &PathHash) -> CacheResult<Option<Entry>> {
        let conn = lock(&self.reader);
        let entry = conn
            .query_row(
                &format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE path_hash = ?1"),
                params![hash.as_str()],
                row_to_entry,
            )
            .optional()?;
        Ok(entry)
    }

    /// Children of `parent`, sorted by title then name.
    pub fn query_children(
        &self,
        parent: &PathHash,
        page: u32,
        page_size: u32,
    ) -> CacheResult<Page<Entry>> {
        self.query_page(
            "parent_hash = ?1",
            &[&parent.as_str() as &dyn rusqlite::ToSql],
            page,
            page_size,
        )
    }

    /// Every series-level entry, whatever its depth, sorted by title then name.
    pub fn query_series(&self, page: u32, page_size: u32) -> CacheResult<Page<Entry>> {
        self.query_page("is_series = 1", &[], page, page_size)
    }

    /// Series whose title or name contains `query`.
    pub fn search_title(&self, query: &str, page: u32, page_size: u32) -> CacheResult<Page<Entry>> {
        let pattern = format!("%{}%", escape_like(query));
        self.query_page(
            "(title LIKE ?1 ESCAPE '\\' OR name LIKE ?1 ESCAPE '\\') AND is_series = 1",
            &[&pattern as &dyn rusqlite::ToSql],
            page,
            page_size,
        )
    }

    fn query_page(
        &self,
        filter: &str,
        args: &[&dyn rusqlite::ToSql],
        page: u32,
        page_size: u32,
    ) -> CacheResult<Page<Entry>> {
        let (page, page_size, offset) = page_window(page, page_size);
        let conn = lock(&self.reader);

        let total: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM entries WHERE {filter}"),
            args,
            |row| row.get(0),
        )?;

        let limit_idx = args.len() + 1;
        let offset_idx = args.len() + 2;
        let mut stmt = conn.prepare(&format!(
            "SELECT {ENTRY_COLUMNS} FROM entries WHERE {filter}
             ORDER BY title, name, path_hash LIMIT ?{limit_idx} OFFSET ?{offset_idx}"
        ))?;

        let mut bound: Vec<&dyn rusqlite::ToSql> = args.to_vec();
        bound.push(&page_size);
        bound.push(&offset);

        let items = stmt
            .query_map(bound.as_slice(), row_to_entry)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page {
            total: u64::try_from(total).unwrap_or(0),
            page,
            page_size,
            items,
        })
    }

    /// Delete every entry whose title equals `title` (NFC).
    ///
    /// Administrative operation; returns the number of rows removed.
    pub fn purge_by_title(&self, title: &str) -> CacheResult<usize> {
        let title = crate::scanner::path_utils::normalize_path_str(title);
        let conn = lock(&self.writer);
        let removed = conn.execute("DELETE FROM entries WHERE title = ?1", params![title])?;
        log::info!("Purged {} cache rows titled '{}'", removed, title);
        Ok(removed)
    }

    /// Number of cached entries.
    pub fn count(&self) -> CacheResult<u64> {
        let conn = lock(&self.reader);
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM entries", [], |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    /// Remove every entry.
    pub fn clear(&self) -> CacheResult<()> {
        let conn = lock(&self.writer);
        conn.execute("DELETE FROM entries", [])?;
        log::info!("Cleared entry cache at {}", self.path.display());
        Ok(())
    }
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in crate::scanner::path_utils::normalize_path_str(query).chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn row_to_entry(row: &Row<'_>) -> rusqlite::Result<Entry> {
    let poster: Option<String> = row.get(6)?;
    let millis: i64 = row.get(9)?;
    let metadata_json: String = row.get(10)?;

    let metadata: EntryMetadata = serde_json::from_str(&metadata_json)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(10, Type::Text, Box::new(e)))?;
    let last_scanned = DateTime::<Utc>::from_timestamp_millis(millis).unwrap_or_default();

    Ok(Entry {
        path_hash: PathHash::from_hex(row.get::<_, String>(0)?),
        parent_hash: PathHash::from_hex(row.get::<_, String>(1)?),
        abs_path: PathBuf::from(row.get::<_, String>(2)?),
        rel_path: row.get(3)?,
        name: row.get(4)?,
        is_dir: row.get(5)?,
        poster: poster.as_deref().and_then(PosterRef::parse),
        title: row.get(7)?,
        depth: row.get(8)?,
        is_series: row.get(11)?,
        last_scanned,
        metadata,
    })
}
