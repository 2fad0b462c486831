// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device/playlist sync-row storage operations.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts_opt, to_db_ts, Storage, StorageError};
use crate::sync::{DevicePlaylistSync, SyncState};

const SYNC_COLUMNS: &str =
    "device_id, playlist_id, synced_version, state, last_attempt, last_success, error";

impl Storage {
    /// Creates or refreshes the sync row for `(device, playlist)` and puts
    /// it into `state`. Existing progress fields are preserved.
    pub fn upsert_sync_row(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        state: SyncState,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO device_playlist_sync (device_id, playlist_id, state) \
             VALUES (?1, ?2, ?3)
             ON CONFLICT(device_id, playlist_id) DO UPDATE SET state = excluded.state",
            params![
                device_id.to_string(),
                playlist_id.to_string(),
                state.as_str()
            ],
        )?;
        Ok(())
    }

    pub fn get_sync_row(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
    ) -> Result<Option<DevicePlaylistSync>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {SYNC_COLUMNS} FROM device_playlist_sync \
                 WHERE device_id = ?1 AND playlist_id = ?2"
            ),
            params![device_id.to_string(), playlist_id.to_string()],
            row_to_sync,
        );
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn sync_rows_for_playlist(
        &self,
        playlist_id: Uuid,
    ) -> Result<Vec<DevicePlaylistSync>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SYNC_COLUMNS} FROM device_playlist_sync WHERE playlist_id = ?1"
        ))?;
        let rows = stmt.query_map(params![playlist_id.to_string()], row_to_sync)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn sync_rows_for_device(
        &self,
        device_id: Uuid,
    ) -> Result<Vec<DevicePlaylistSync>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {SYNC_COLUMNS} FROM device_playlist_sync WHERE device_id = ?1"
        ))?;
        let rows = stmt.query_map(params![device_id.to_string()], row_to_sync)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Transition to `syncing`, stamping the attempt time.
    pub fn mark_sync_attempt(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE device_playlist_sync SET state = 'syncing', last_attempt = ?1, \
             error = NULL WHERE device_id = ?2 AND playlist_id = ?3",
            params![to_db_ts(at), device_id.to_string(), playlist_id.to_string()],
        )?;
        Ok(())
    }

    /// Success callback: record the delivered version.
    pub fn mark_sync_success(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        version: u32,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE device_playlist_sync SET state = 'synced', synced_version = ?1, \
             last_success = ?2, error = NULL WHERE device_id = ?3 AND playlist_id = ?4",
            params![
                version,
                to_db_ts(at),
                device_id.to_string(),
                playlist_id.to_string()
            ],
        )?;
        Ok(())
    }

    /// Failure callback: record the error text.
    pub fn mark_sync_failure(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        error: &str,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE device_playlist_sync SET state = 'failed', error = ?1 \
             WHERE device_id = ?2 AND playlist_id = ?3",
            params![error, device_id.to_string(), playlist_id.to_string()],
        )?;
        Ok(())
    }
}

fn row_to_sync(row: &rusqlite::Row<'_>) -> rusqlite::Result<DevicePlaylistSync> {
    let state_str: String = row.get(3)?;
    Ok(DevicePlaylistSync {
        device_id: parse_uuid(row.get::<_, String>(0)?)?,
        playlist_id: parse_uuid(row.get::<_, String>(1)?)?,
        synced_version: row.get::<_, Option<i64>>(2)?.map(|v| v as u32),
        state: SyncState::parse(&state_str).unwrap_or(SyncState::Pending),
        last_attempt: from_db_ts_opt(row.get(4)?),
        last_success: from_db_ts_opt(row.get(5)?),
        error: row.get(6)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sync_row_progression() {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-sync");
        let playlist = crate::storage::playlists::tests::seed_playlist(&storage, Uuid::new_v4());

        storage
            .upsert_sync_row(device.id, playlist.id, SyncState::Pending)
            .unwrap();
        let row = storage
            .get_sync_row(device.id, playlist.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.state, SyncState::Pending);
        assert_eq!(row.synced_version, None);

        storage
            .mark_sync_attempt(device.id, playlist.id, Utc::now())
            .unwrap();
        storage
            .mark_sync_success(device.id, playlist.id, 1, Utc::now())
            .unwrap();
        let row = storage
            .get_sync_row(device.id, playlist.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.state, SyncState::Synced);
        assert_eq!(row.synced_version, Some(1));
        assert!(row.last_attempt.is_some());
        assert!(row.last_success.is_some());
        assert!(row.is_up_to_date(1));

        // A later pending upsert keeps the recorded progress.
        storage
            .upsert_sync_row(device.id, playlist.id, SyncState::Pending)
            .unwrap();
        let row = storage
            .get_sync_row(device.id, playlist.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.state, SyncState::Pending);
        assert_eq!(row.synced_version, Some(1));
    }

    #[test]
    fn failure_records_error_text() {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-fail");
        let playlist = crate::storage::playlists::tests::seed_playlist(&storage, Uuid::new_v4());

        storage
            .upsert_sync_row(device.id, playlist.id, SyncState::Syncing)
            .unwrap();
        storage
            .mark_sync_failure(device.id, playlist.id, "agent unreachable")
            .unwrap();
        let row = storage
            .get_sync_row(device.id, playlist.id)
            .unwrap()
            .unwrap();
        assert_eq!(row.state, SyncState::Failed);
        assert_eq!(row.error.as_deref(), Some("agent unreachable"));
    }
}
