// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Sync status reporting.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{SyncError, SyncState};
use crate::playlist::PlaylistSyncStatus;
use crate::storage::Storage;

/// Per-device breakdown row.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceSyncDetail {
    pub device_id: Uuid,
    pub device_external_id: String,
    pub device_name: Option<String>,
    pub state: SyncState,
    pub synced_version: Option<u32>,
    pub is_up_to_date: bool,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

/// Aggregate report for one playlist.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistSyncReport {
    pub playlist_id: Uuid,
    pub sync_status: PlaylistSyncStatus,
    pub version: u32,
    pub device_count: usize,
    pub synced_count: usize,
    pub pending_count: usize,
    pub failed_count: usize,
    pub last_synced_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub devices: Option<Vec<DeviceSyncDetail>>,
}

/// Builds the sync report for a playlist. A device counts as synced iff
/// its row is `synced` at the current version or newer; untracked
/// devices count as pending.
pub fn playlist_sync_report(
    storage: &Storage,
    playlist_id: Uuid,
    include_devices: bool,
) -> Result<PlaylistSyncReport, SyncError> {
    let playlist = storage
        .get_playlist(playlist_id)?
        .ok_or(SyncError::PlaylistNotFound(playlist_id))?;
    let assignments = storage.assignments_for_playlist(playlist_id)?;
    let rows = storage.sync_rows_for_playlist(playlist_id)?;

    let mut synced_count = 0;
    let mut pending_count = 0;
    let mut failed_count = 0;
    let mut details = Vec::new();

    for assignment in &assignments {
        let row = rows.iter().find(|r| r.device_id == assignment.device_id);
        match row {
            None => pending_count += 1,
            Some(row) => match row.state {
                SyncState::Synced if row.is_up_to_date(playlist.version) => synced_count += 1,
                SyncState::Failed => failed_count += 1,
                SyncState::Pending | SyncState::Queued | SyncState::Syncing => pending_count += 1,
                SyncState::Synced => pending_count += 1, // stale
            },
        }

        if include_devices {
            let device = storage.get_device(assignment.device_id)?;
            details.push(DeviceSyncDetail {
                device_id: assignment.device_id,
                device_external_id: device
                    .as_ref()
                    .map(|d| d.external_id.clone())
                    .unwrap_or_default(),
                device_name: device.and_then(|d| d.name),
                state: row.map(|r| r.state).unwrap_or(SyncState::Pending),
                synced_version: row.and_then(|r| r.synced_version),
                is_up_to_date: row.is_some_and(|r| r.is_up_to_date(playlist.version)),
                last_attempt: row.and_then(|r| r.last_attempt),
                last_success: row.and_then(|r| r.last_success),
                error: row.and_then(|r| r.error.clone()),
            });
        }
    }

    Ok(PlaylistSyncReport {
        playlist_id,
        sync_status: playlist.sync_status,
        version: playlist.version,
        device_count: assignments.len(),
        synced_count,
        pending_count,
        failed_count,
        last_synced_at: playlist.last_synced_at,
        devices: include_devices.then_some(details),
    })
}
