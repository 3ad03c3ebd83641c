//! Durable message archive backed by a single SQLite file.
//!
//! One logical table holds every archived message, keyed by its
//! content-hash identifier. The connection is shared across the ingestion
//! loop, the retention scheduler, and the read API through a single
//! process-wide mutex: every operation is a scoped critical section
//! (lock, one statement, unlock) so no two store operations ever run
//! concurrently, and the lock is never held across an await point.
//!
//! SQLite would serialize most of this on its own, but the exclusion is
//! owned here at the process level so correctness does not depend on the
//! engine's locking behavior across shared handles.

use crate::error::Result;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Arc;
use tracing::info;

/// Shared handle to the archive store.
///
/// Cloning is cheap and shares the same underlying connection and mutex.
#[derive(Clone)]
pub struct Archive {
    conn: Arc<Mutex<Connection>>,
}

impl Archive {
    /// Open (or create) the archive at the given path.
    ///
    /// Creates the parent directory and the `messages` table if they do not
    /// exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }

        info!("Opening archive at {}", path.display());
        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory archive. Used by tests and embedding callers.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS messages (
                 id      TEXT PRIMARY KEY,
                 payload BLOB NOT NULL,
                 created INTEGER NOT NULL
             );
             CREATE INDEX IF NOT EXISTS idx_messages_created ON messages (created);",
        )?;
        Ok(())
    }

    /// Insert a message, returning whether a new row was created.
    ///
    /// A duplicate `id` is not an error: the insert is ignored and `false`
    /// is returned. This is the deduplication boundary for redelivered
    /// messages.
    pub fn insert(&self, id: &str, created: i64, payload: &[u8]) -> Result<bool> {
        let conn = self.conn.lock();
        let changed = conn.execute(
            "INSERT OR IGNORE INTO messages (id, payload, created) VALUES (?1, ?2, ?3)",
            params![id, payload, created],
        )?;
        Ok(changed == 1)
    }

    /// Return the payloads of all messages with `created` in the inclusive
    /// range `[from, to]`, ordered by `created`.
    ///
    /// An empty result is a valid, non-error outcome.
    pub fn range_query(&self, from: i64, to: i64) -> Result<Vec<Vec<u8>>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT payload FROM messages WHERE created BETWEEN ?1 AND ?2 ORDER BY created",
        )?;
        let rows = stmt.query_map(params![from, to], |row| row.get::<_, Vec<u8>>(0))?;

        let mut payloads = Vec::new();
        for row in rows {
            payloads.push(row?);
        }
        Ok(payloads)
    }

    /// Delete every message with `created` strictly earlier than `cutoff`.
    ///
    /// Returns the number of rows deleted.
    pub fn delete_before(&self, cutoff: i64) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn.execute("DELETE FROM messages WHERE created < ?1", params![cutoff])?;
        Ok(deleted)
    }

    /// Return the maximum `created` timestamp currently stored, or `None`
    /// if the archive is empty.
    pub fn latest_created(&self) -> Result<Option<i64>> {
        let conn = self.conn.lock();
        let latest = conn.query_row("SELECT MAX(created) FROM messages", [], |row| {
            row.get::<_, Option<i64>>(0)
        })?;
        Ok(latest)
    }

    /// Total number of archived messages.
    pub fn count(&self) -> Result<u64> {
        let conn = self.conn.lock();
        let count = conn.query_row("SELECT COUNT(*) FROM messages", [], |row| row.get(0))?;
        Ok(count)
    }
}
