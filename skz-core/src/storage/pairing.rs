// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Pairing-code storage.
//!
//! Codes are short-lived and single-use; they live in the database rather
//! than process memory so a multi-replica service shares them.

use chrono::{DateTime, Utc};
use rusqlite::params;

use super::{from_db_ts, to_db_ts, Storage, StorageError};

/// A stored pairing code binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairingCodeRow {
    pub code: String,
    pub hardware_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Storage {
    /// Stores a pairing code, replacing any previous code with the same
    /// value.
    pub fn put_pairing_code(&self, row: &PairingCodeRow) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO pairing_codes (code, hardware_id, created_at, expires_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                row.code,
                row.hardware_id,
                to_db_ts(row.created_at),
                to_db_ts(row.expires_at),
            ],
        )?;
        Ok(())
    }

    /// Fetches a pairing code if it exists and has not expired at `now`.
    pub fn get_pairing_code(
        &self,
        code: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<PairingCodeRow>, StorageError> {
        let result = self.conn().query_row(
            "SELECT code, hardware_id, created_at, expires_at FROM pairing_codes \
             WHERE code = ?1 AND expires_at > ?2",
            params![code, to_db_ts(now)],
            |row| {
                Ok(PairingCodeRow {
                    code: row.get(0)?,
                    hardware_id: row.get(1)?,
                    created_at: from_db_ts(row.get(2)?),
                    expires_at: from_db_ts(row.get(3)?),
                })
            },
        );
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Deletes a pairing code (single-use consumption).
    pub fn delete_pairing_code(&self, code: &str) -> Result<(), StorageError> {
        self.conn()
            .execute("DELETE FROM pairing_codes WHERE code = ?1", params![code])?;
        Ok(())
    }

    /// Removes expired codes. Returns how many were purged.
    pub fn purge_expired_pairing_codes(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let purged = self.conn().execute(
            "DELETE FROM pairing_codes WHERE expires_at <= ?1",
            params![to_db_ts(now)],
        )?;
        Ok(purged)
    }
}
