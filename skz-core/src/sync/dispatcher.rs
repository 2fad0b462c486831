// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync dispatch: change detection, push, and worker callbacks.
//!
//! Every content-affecting playlist write routes through
//! [`SyncDispatcher::mark_playlist_dirty`], which bumps the playlist
//! version and flags every assigned device's sync row in one transaction.
//! `push` hands per-device delivery to the background worker; the
//! worker's callbacks land here and fold each outcome back into the
//! playlist's aggregate status.

use chrono::{DateTime, Utc};
use tracing::info;
use uuid::Uuid;

use super::{SyncError, SyncState};
use crate::playlist::PlaylistSyncStatus;
use crate::storage::Storage;
use crate::worker::{TaskKind, TaskQueue};

/// Outcome of a push: one delivery task per assigned device.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub playlist_id: Uuid,
    pub version: u32,
    pub device_count: usize,
    pub task_ids: Vec<Uuid>,
}

/// Coordinates playlist/device sync state.
pub struct SyncDispatcher<'a> {
    storage: &'a Storage,
}

impl<'a> SyncDispatcher<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        SyncDispatcher { storage }
    }

    /// Content-affecting mutation hook: bump the playlist version, flag
    /// the playlist pending, and set every assigned device's sync row to
    /// pending, atomically. Returns the new version.
    pub fn mark_playlist_dirty(&self, playlist_id: Uuid) -> Result<u32, SyncError> {
        let version = self
            .storage
            .in_transaction(|s| mark_playlist_dirty_tx(s, playlist_id))?;
        info!(playlist = %playlist_id, version, "playlist marked dirty");
        Ok(version)
    }

    /// Device-shape mutation hook (layout, overrides, layer triggers):
    /// bump the device's monotonic change counter.
    pub fn mark_device_dirty(&self, device_id: Uuid) -> Result<i64, SyncError> {
        Ok(self.storage.bump_pending_sync_version(device_id)?)
    }

    /// Operator push: upsert and transition every assigned device's sync
    /// row to `syncing`, then enqueue one delivery task per device.
    pub fn push(
        &self,
        playlist_id: Uuid,
        max_attempts: u32,
    ) -> Result<PushOutcome, SyncError> {
        let playlist = self
            .storage
            .get_playlist(playlist_id)?
            .ok_or(SyncError::PlaylistNotFound(playlist_id))?;
        let assignments = self.storage.assignments_for_playlist(playlist_id)?;
        if assignments.is_empty() {
            return Err(SyncError::NoAssignedDevices(playlist_id));
        }

        let now = Utc::now();
        let queue = TaskQueue::new(self.storage);
        let task_ids = self.storage.in_transaction(|s| {
            s.set_playlist_sync_status(playlist_id, PlaylistSyncStatus::Syncing, None)?;
            let mut task_ids = Vec::with_capacity(assignments.len());
            for assignment in &assignments {
                s.upsert_sync_row(assignment.device_id, playlist_id, SyncState::Queued)?;
                s.mark_sync_attempt(assignment.device_id, playlist_id, now)?;
                let task_id = queue.enqueue_in_tx(
                    s,
                    TaskKind::SyncPlaylistToDevice {
                        playlist_id,
                        device_id: assignment.device_id,
                        version: playlist.version,
                    },
                    now,
                    max_attempts,
                )?;
                task_ids.push(task_id);
            }
            Ok(task_ids)
        })?;

        info!(
            playlist = %playlist_id,
            version = playlist.version,
            devices = assignments.len(),
            "playlist push dispatched"
        );
        Ok(PushOutcome {
            playlist_id,
            version: playlist.version,
            device_count: assignments.len(),
            task_ids,
        })
    }

    /// Worker success callback.
    pub fn complete_device_sync(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        version: u32,
        at: DateTime<Utc>,
    ) -> Result<(), SyncError> {
        self.storage.in_transaction(|s| {
            s.mark_sync_success(device_id, playlist_id, version, at)?;
            s.bump_pending_sync_version(device_id)?;
            Ok(())
        })?;
        self.recompute_playlist_status(playlist_id)?;
        Ok(())
    }

    /// Worker failure callback.
    pub fn fail_device_sync(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        error: &str,
    ) -> Result<(), SyncError> {
        self.storage.mark_sync_failure(device_id, playlist_id, error)?;
        self.recompute_playlist_status(playlist_id)?;
        Ok(())
    }

    /// Folds the per-device rows into the playlist's aggregate status:
    /// any failure is `error`; everything synced at the current version
    /// is `in_sync`; anything in flight is `syncing`; otherwise
    /// `pending`.
    pub fn recompute_playlist_status(&self, playlist_id: Uuid) -> Result<PlaylistSyncStatus, SyncError> {
        let playlist = self
            .storage
            .get_playlist(playlist_id)?
            .ok_or(SyncError::PlaylistNotFound(playlist_id))?;
        let assignments = self.storage.assignments_for_playlist(playlist_id)?;
        let rows = self.storage.sync_rows_for_playlist(playlist_id)?;

        let mut any_failed = false;
        let mut any_in_flight = false;
        let mut synced = 0usize;
        for assignment in &assignments {
            match rows.iter().find(|r| r.device_id == assignment.device_id) {
                None => {}
                Some(row) => match row.state {
                    SyncState::Failed => any_failed = true,
                    SyncState::Queued | SyncState::Syncing => any_in_flight = true,
                    SyncState::Synced if row.is_up_to_date(playlist.version) => synced += 1,
                    _ => {}
                },
            }
        }

        let status = if any_failed {
            PlaylistSyncStatus::Error
        } else if !assignments.is_empty() && synced == assignments.len() {
            PlaylistSyncStatus::InSync
        } else if any_in_flight {
            PlaylistSyncStatus::Syncing
        } else {
            PlaylistSyncStatus::Pending
        };

        let synced_at = (status == PlaylistSyncStatus::InSync).then(Utc::now);
        self.storage
            .set_playlist_sync_status(playlist_id, status, synced_at)?;
        Ok(status)
    }
}

/// The in-transaction body of [`SyncDispatcher::mark_playlist_dirty`],
/// for callers that fold a content mutation and the version bump into one
/// transaction.
pub(crate) fn mark_playlist_dirty_tx(
    s: &Storage,
    playlist_id: Uuid,
) -> Result<u32, crate::storage::StorageError> {
    let version = s.bump_playlist_version(playlist_id, Utc::now())?;
    for assignment in s.assignments_for_playlist(playlist_id)? {
        s.upsert_sync_row(assignment.device_id, playlist_id, SyncState::Pending)?;
    }
    Ok(version)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playlist::{AssignmentTrigger, DevicePlaylistAssignment};

    fn fixture() -> (Storage, Uuid, Uuid) {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-disp");
        let playlist = crate::storage::playlists::tests::seed_playlist(&storage, Uuid::new_v4());
        storage
            .create_assignment(&DevicePlaylistAssignment {
                id: Uuid::new_v4(),
                device_id: device.id,
                playlist_id: playlist.id,
                trigger_type: AssignmentTrigger::Default,
                priority: 0,
                is_enabled: true,
                start_at: None,
                end_at: None,
                created_at: Utc::now(),
            })
            .unwrap();
        (storage, device.id, playlist.id)
    }

    #[test]
    fn dirty_marking_is_atomic_across_rows() {
        let (storage, device_id, playlist_id) = fixture();
        let dispatcher = SyncDispatcher::new(&storage);

        let version = dispatcher.mark_playlist_dirty(playlist_id).unwrap();
        assert_eq!(version, 2);

        let playlist = storage.get_playlist(playlist_id).unwrap().unwrap();
        assert_eq!(playlist.sync_status, PlaylistSyncStatus::Pending);
        let row = storage.get_sync_row(device_id, playlist_id).unwrap().unwrap();
        assert_eq!(row.state, SyncState::Pending);
    }

    #[test]
    fn push_then_complete_reaches_in_sync() {
        let (storage, device_id, playlist_id) = fixture();
        let dispatcher = SyncDispatcher::new(&storage);

        let outcome = dispatcher.push(playlist_id, 3).unwrap();
        assert_eq!(outcome.device_count, 1);
        assert_eq!(outcome.version, 1);
        assert_eq!(outcome.task_ids.len(), 1);

        let row = storage.get_sync_row(device_id, playlist_id).unwrap().unwrap();
        assert_eq!(row.state, SyncState::Syncing);
        assert!(row.last_attempt.is_some());

        dispatcher
            .complete_device_sync(device_id, playlist_id, outcome.version, Utc::now())
            .unwrap();
        let row = storage.get_sync_row(device_id, playlist_id).unwrap().unwrap();
        assert_eq!(row.state, SyncState::Synced);
        assert_eq!(row.synced_version, Some(1));

        let playlist = storage.get_playlist(playlist_id).unwrap().unwrap();
        assert_eq!(playlist.sync_status, PlaylistSyncStatus::InSync);
        assert!(playlist.last_synced_at.is_some());
    }

    #[test]
    fn any_failed_device_poisons_the_aggregate() {
        let (storage, device_id, playlist_id) = fixture();
        let dispatcher = SyncDispatcher::new(&storage);
        dispatcher.push(playlist_id, 3).unwrap();

        dispatcher
            .fail_device_sync(device_id, playlist_id, "agent timeout")
            .unwrap();
        let playlist = storage.get_playlist(playlist_id).unwrap().unwrap();
        assert_eq!(playlist.sync_status, PlaylistSyncStatus::Error);
    }

    #[test]
    fn push_requires_assignments() {
        let storage = Storage::in_memory().unwrap();
        let playlist = crate::storage::playlists::tests::seed_playlist(&storage, Uuid::new_v4());
        let dispatcher = SyncDispatcher::new(&storage);
        assert!(matches!(
            dispatcher.push(playlist.id, 3),
            Err(SyncError::NoAssignedDevices(_))
        ));
        assert!(matches!(
            dispatcher.push(Uuid::new_v4(), 3),
            Err(SyncError::PlaylistNotFound(_))
        ));
    }

    #[test]
    fn stale_synced_version_invalidates_in_sync() {
        let (storage, device_id, playlist_id) = fixture();
        let dispatcher = SyncDispatcher::new(&storage);
        let outcome = dispatcher.push(playlist_id, 3).unwrap();
        dispatcher
            .complete_device_sync(device_id, playlist_id, outcome.version, Utc::now())
            .unwrap();

        // A content mutation makes the synced version stale.
        let version = dispatcher.mark_playlist_dirty(playlist_id).unwrap();
        assert_eq!(version, 2);
        let row = storage.get_sync_row(device_id, playlist_id).unwrap().unwrap();
        assert_eq!(row.state, SyncState::Pending);
        assert_eq!(row.synced_version, Some(1));
        assert!(!row.is_up_to_date(version));
    }
}
