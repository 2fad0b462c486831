// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device/playlist assignment storage operations.

use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::playlist::{AssignmentTrigger, DevicePlaylistAssignment};

const ASSIGNMENT_COLUMNS: &str = "id, device_id, playlist_id, trigger_type, priority, \
                                  is_enabled, start_at, end_at, created_at";

impl Storage {
    /// Inserts an assignment. `(device_id, trigger_type)` is unique.
    pub fn create_assignment(
        &self,
        assignment: &DevicePlaylistAssignment,
    ) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO device_playlist_assignments (id, device_id, playlist_id, \
             trigger_type, priority, is_enabled, start_at, end_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                assignment.id.to_string(),
                assignment.device_id.to_string(),
                assignment.playlist_id.to_string(),
                assignment.trigger_type.as_str(),
                assignment.priority,
                assignment.is_enabled,
                to_db_ts_opt(assignment.start_at),
                to_db_ts_opt(assignment.end_at),
                to_db_ts(assignment.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "assignment trigger '{}' on device {}",
                        assignment.trigger_type.as_str(),
                        assignment.device_id
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    pub fn get_assignment(
        &self,
        id: Uuid,
    ) -> Result<Option<DevicePlaylistAssignment>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {ASSIGNMENT_COLUMNS} FROM device_playlist_assignments WHERE id = ?1"
            ),
            params![id.to_string()],
            row_to_assignment,
        );
        match result {
            Ok(assignment) => Ok(Some(assignment)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn assignments_for_device(
        &self,
        device_id: Uuid,
    ) -> Result<Vec<DevicePlaylistAssignment>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM device_playlist_assignments \
             WHERE device_id = ?1 ORDER BY priority DESC, created_at"
        ))?;
        let rows = stmt.query_map(params![device_id.to_string()], row_to_assignment)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn assignments_for_playlist(
        &self,
        playlist_id: Uuid,
    ) -> Result<Vec<DevicePlaylistAssignment>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ASSIGNMENT_COLUMNS} FROM device_playlist_assignments \
             WHERE playlist_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(params![playlist_id.to_string()], row_to_assignment)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Flips `is_enabled` and returns the new value.
    pub fn toggle_assignment(&self, id: Uuid) -> Result<bool, StorageError> {
        let updated = self.conn().execute(
            "UPDATE device_playlist_assignments SET is_enabled = NOT is_enabled WHERE id = ?1",
            params![id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("assignment {id}")));
        }
        let enabled: bool = self.conn().query_row(
            "SELECT is_enabled FROM device_playlist_assignments WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(enabled)
    }

    pub fn delete_assignment(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM device_playlist_assignments WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("assignment {id}")));
        }
        Ok(())
    }
}

fn row_to_assignment(row: &rusqlite::Row<'_>) -> rusqlite::Result<DevicePlaylistAssignment> {
    let trigger_str: String = row.get(3)?;
    let trigger_type = AssignmentTrigger::parse(&trigger_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            rusqlite::types::Type::Text,
            format!("bad trigger '{trigger_str}'").into(),
        )
    })?;
    Ok(DevicePlaylistAssignment {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        device_id: parse_uuid(row.get::<_, String>(1)?)?,
        playlist_id: parse_uuid(row.get::<_, String>(2)?)?,
        trigger_type,
        priority: row.get(4)?,
        is_enabled: row.get(5)?,
        start_at: from_db_ts_opt(row.get(6)?),
        end_at: from_db_ts_opt(row.get(7)?),
        created_at: from_db_ts(row.get(8)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn seed(storage: &Storage) -> (Uuid, Uuid) {
        let device = crate::storage::devices::tests::seed_device(storage, "hw-a");
        let playlist = crate::storage::playlists::tests::seed_playlist(storage, Uuid::new_v4());
        (device.id, playlist.id)
    }

    fn assignment(
        device_id: Uuid,
        playlist_id: Uuid,
        trigger: AssignmentTrigger,
        enabled: bool,
    ) -> DevicePlaylistAssignment {
        DevicePlaylistAssignment {
            id: Uuid::new_v4(),
            device_id,
            playlist_id,
            trigger_type: trigger,
            priority: 0,
            is_enabled: enabled,
            start_at: None,
            end_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn device_trigger_pair_is_unique() {
        let storage = Storage::in_memory().unwrap();
        let (device_id, playlist_id) = seed(&storage);

        storage
            .create_assignment(&assignment(
                device_id,
                playlist_id,
                AssignmentTrigger::Default,
                true,
            ))
            .unwrap();
        // Same trigger on the same device conflicts, even with another
        // playlist.
        let err = storage
            .create_assignment(&assignment(
                device_id,
                playlist_id,
                AssignmentTrigger::Default,
                true,
            ))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        // A different trigger is fine.
        storage
            .create_assignment(&assignment(
                device_id,
                playlist_id,
                AssignmentTrigger::LoyaltyRecognized,
                false,
            ))
            .unwrap();
        assert_eq!(storage.assignments_for_device(device_id).unwrap().len(), 2);
    }

    #[test]
    fn toggle_flips_enabled() {
        let storage = Storage::in_memory().unwrap();
        let (device_id, playlist_id) = seed(&storage);
        let a = assignment(
            device_id,
            playlist_id,
            AssignmentTrigger::FaceDetected,
            false,
        );
        storage.create_assignment(&a).unwrap();

        assert!(storage.toggle_assignment(a.id).unwrap());
        assert!(!storage.toggle_assignment(a.id).unwrap());
    }
}
