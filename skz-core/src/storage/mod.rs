// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Persistent Storage Module
//!
//! SQLite persistence for the control plane. The relational database is the
//! system of record; every write happens inside a transaction. Entity
//! operations are grouped into one file per concern, all implemented on the
//! [`Storage`] struct.

pub(crate) mod alerts;
mod artifacts;
mod assignments;
mod content;
pub(crate) mod devices;
mod error;
mod hubs;
mod layer_content;
pub(crate) mod layouts;
pub mod migration;
mod notifications;
mod pairing;
pub(crate) mod playlists;
mod records;
mod schema;
mod sync_rows;
mod tasks;
mod tenants;

pub use alerts::AlertQuery;
pub use error::StorageError;
pub use pairing::PairingCodeRow;
pub use tasks::ClaimedTask;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use std::path::Path;

/// SQLite-based storage implementation.
///
/// Owns a single connection; callers that share a `Storage` across threads
/// wrap it in a mutex. Time is stored as Unix seconds and surfaced as
/// `DateTime<Utc>`.
pub struct Storage {
    conn: Connection,
}

// `rusqlite::Connection` holds `RefCell`s internally and so is not `Sync`.
// `Storage` is only ever reached from behind the caller-held mutex this
// struct's doc comment describes (in practice `Arc<Mutex<CentralHub>>`),
// which already guarantees exclusive access, so it's sound to assert `Sync`
// here even though the connection migrates across threads.
unsafe impl Sync for Storage {}

impl Storage {
    /// Opens or creates a storage database at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Creates an in-memory storage (for testing).
    pub fn in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        let storage = Storage { conn };
        storage.run_migrations()?;
        Ok(storage)
    }

    /// Runs all pending schema migrations.
    fn run_migrations(&self) -> Result<(), StorageError> {
        let migrations = schema::all_migrations();
        migration::MigrationRunner::run(&self.conn, &migrations)
    }

    /// Returns the current schema version.
    pub fn schema_version(&self) -> Result<u32, StorageError> {
        migration::MigrationRunner::current_version(&self.conn)
    }

    /// Runs `f` inside a single write transaction.
    ///
    /// Commits on `Ok`, rolls back on `Err`. Nested calls are not supported.
    pub fn in_transaction<T>(
        &self,
        f: impl FnOnce(&Self) -> Result<T, StorageError>,
    ) -> Result<T, StorageError> {
        self.conn.execute_batch("BEGIN IMMEDIATE TRANSACTION;")?;
        match f(self) {
            Ok(value) => {
                self.conn.execute_batch("COMMIT;")?;
                Ok(value)
            }
            Err(e) => {
                let _ = self.conn.execute_batch("ROLLBACK;");
                Err(e)
            }
        }
    }

    pub(crate) fn conn(&self) -> &Connection {
        &self.conn
    }
}

/// Converts a timestamp to its stored form (Unix seconds).
pub(crate) fn to_db_ts(t: DateTime<Utc>) -> i64 {
    t.timestamp()
}

/// Converts a stored Unix-seconds value back to a timestamp.
pub(crate) fn from_db_ts(secs: i64) -> DateTime<Utc> {
    DateTime::from_timestamp(secs, 0).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Optional-timestamp variants of the conversion helpers.
pub(crate) fn to_db_ts_opt(t: Option<DateTime<Utc>>) -> Option<i64> {
    t.map(to_db_ts)
}

pub(crate) fn from_db_ts_opt(secs: Option<i64>) -> Option<DateTime<Utc>> {
    secs.map(from_db_ts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_storage_migrates_to_latest() {
        let storage = Storage::in_memory().unwrap();
        assert_eq!(storage.schema_version().unwrap(), 4);
    }

    #[test]
    fn transaction_rolls_back_on_error() {
        let storage = Storage::in_memory().unwrap();
        let result: Result<(), StorageError> = storage.in_transaction(|s| {
            s.conn()
                .execute("INSERT INTO tenants (id, slug, name, created_at) VALUES ('t', 's', 'n', 0)", [])?;
            Err(StorageError::NotFound("forced".into()))
        });
        assert!(result.is_err());

        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM tenants", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn timestamp_round_trip_is_second_precise() {
        let now = Utc::now();
        let back = from_db_ts(to_db_ts(now));
        assert_eq!(back.timestamp(), now.timestamp());
    }
}
