//! Persistent image store backed by an embedded SQLite database.

use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, Row, params};
use tracing::{debug, info};

use crate::domain::entities::{IdentityBinding, ImageRecord};
use crate::domain::errors::CacheError;

/// How long a writer waits on a held database lock before the operation
/// surfaces as `CacheError::StoreBusy`.
const BUSY_TIMEOUT: Duration = Duration::from_secs(1);

const DATE_FORMAT: &str = "%Y-%m-%d";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS images (
    sci_name     TEXT NOT NULL PRIMARY KEY,
    common_name  TEXT NOT NULL,
    image_url    TEXT NOT NULL,
    title        TEXT NOT NULL,
    external_id  TEXT NOT NULL UNIQUE,
    author_url   TEXT NOT NULL,
    license_url  TEXT NOT NULL,
    created_at   TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS binding (
    id            INTEGER PRIMARY KEY CHECK (id = 1),
    filter_value  TEXT NOT NULL,
    external_uid  TEXT NOT NULL,
    created_at    TEXT NOT NULL
);
";

/// Keyed store of the most recently fetched record per scientific name,
/// durable across restarts.
///
/// Overlapping requests contend on the database lock; acquisition waits a
/// bounded one second before the busy condition is surfaced to the caller.
pub struct SqliteImageStore {
    conn: Mutex<Connection>,
}

impl std::fmt::Debug for SqliteImageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteImageStore").finish_non_exhaustive()
    }
}

impl SqliteImageStore {
    /// Opens (and on first use creates) the store at the given path.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened or the schema cannot
    /// be created.
    pub fn open(path: &Path) -> Result<Self, CacheError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| CacheError::io(format!("failed to create store dir: {e}")))?;
        }
        let conn = Connection::open(path).map_err(map_sqlite_err)?;
        info!(path = %path.display(), "Opened image store");
        Self::init(conn)
    }

    /// Opens an in-memory store, used by tests.
    ///
    /// # Errors
    /// Returns error if the schema cannot be created.
    pub fn in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_err)?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, CacheError> {
        conn.busy_timeout(BUSY_TIMEOUT).map_err(map_sqlite_err)?;
        conn.execute_batch(SCHEMA).map_err(map_sqlite_err)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Returns the record for a scientific name, if one is cached.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn get(&self, sci_name: &str) -> Result<Option<ImageRecord>, CacheError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT sci_name, common_name, image_url, title, external_id, author_url,
                    license_url, created_at
             FROM images WHERE sci_name = ?1",
            params![sci_name],
            row_to_record,
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    /// Returns the record carrying the given external id, if any.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn find_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<ImageRecord>, CacheError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT sci_name, common_name, image_url, title, external_id, author_url,
                    license_url, created_at
             FROM images WHERE external_id = ?1",
            params![external_id],
            row_to_record,
        )
        .optional()
        .map_err(map_sqlite_err)
    }

    /// Upserts a record, keyed by scientific name.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn put(&self, record: &ImageRecord) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO images
                 (sci_name, common_name, image_url, title, external_id, author_url,
                  license_url, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.sci_name,
                record.common_name,
                record.image_url,
                record.title,
                record.external_id,
                record.author_url,
                record.license_url,
                record.created_at.format(DATE_FORMAT).to_string(),
            ],
        )
        .map_err(map_sqlite_err)?;
        debug!(sci_name = %record.sci_name, external_id = %record.external_id, "Stored image record");
        Ok(())
    }

    /// Removes the record for a scientific name.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn delete(&self, sci_name: &str) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM images WHERE sci_name = ?1", params![sci_name])
            .map_err(map_sqlite_err)?;
        debug!(sci_name, "Deleted image record");
        Ok(())
    }

    /// Clears every cached record. The binding row survives; the caller
    /// rewrites it as part of the same reconfiguration.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn reset(&self) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        let removed = conn
            .execute("DELETE FROM images", [])
            .map_err(map_sqlite_err)?;
        info!(removed, "Reset image store");
        Ok(())
    }

    /// Returns the singleton identity binding, if one was ever written.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn get_binding(&self) -> Result<Option<IdentityBinding>, CacheError> {
        let conn = self.conn.lock();
        conn.query_row(
            "SELECT filter_value, external_uid, created_at FROM binding WHERE id = 1",
            [],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()
        .map_err(map_sqlite_err)?
        .map(|(filter_value, external_uid, created_at)| {
            Ok(IdentityBinding {
                filter_value,
                external_uid,
                created_at: parse_date(&created_at)?,
            })
        })
        .transpose()
    }

    /// Writes the singleton identity binding.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn put_binding(&self, binding: &IdentityBinding) -> Result<(), CacheError> {
        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO binding (id, filter_value, external_uid, created_at)
             VALUES (1, ?1, ?2, ?3)",
            params![
                binding.filter_value,
                binding.external_uid,
                binding.created_at.format(DATE_FORMAT).to_string(),
            ],
        )
        .map_err(map_sqlite_err)?;
        info!(filter = %binding.filter_value, uid = %binding.external_uid, "Stored identity binding");
        Ok(())
    }

    /// Number of cached records.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn len(&self) -> Result<usize, CacheError> {
        let conn = self.conn.lock();
        let count = conn
            .query_row("SELECT COUNT(*) FROM images", [], |row| {
                row.get::<_, i64>(0)
            })
            .map_err(map_sqlite_err)?;
        usize::try_from(count).map_err(|e| CacheError::store(e.to_string()))
    }

    /// True if no records are cached.
    ///
    /// # Errors
    /// Returns `StoreBusy` when the lock wait expires, or `Store` on any
    /// other database failure.
    pub fn is_empty(&self) -> Result<bool, CacheError> {
        Ok(self.len()? == 0)
    }
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ImageRecord> {
    let created_at: String = row.get(7)?;
    Ok(ImageRecord {
        sci_name: row.get(0)?,
        common_name: row.get(1)?,
        image_url: row.get(2)?,
        title: row.get(3)?,
        external_id: row.get(4)?,
        author_url: row.get(5)?,
        license_url: row.get(6)?,
        created_at: NaiveDate::parse_from_str(&created_at, DATE_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?,
    })
}

fn parse_date(text: &str) -> Result<NaiveDate, CacheError> {
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map_err(|e| CacheError::store(format!("invalid stored date {text:?}: {e}")))
}

fn map_sqlite_err(e: rusqlite::Error) -> CacheError {
    match &e {
        rusqlite::Error::SqliteFailure(inner, _)
            if matches!(
                inner.code,
                rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
            ) =>
        {
            CacheError::StoreBusy
        }
        _ => CacheError::store(e.to_string()),
    }
}
