// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device sync state.
//!
//! Tracks, per `(device, playlist)`, which playlist version the device has
//! observed and where its delivery currently stands. The dispatcher keeps
//! these rows consistent with playlist mutations and push operations.

pub mod dispatcher;
mod status;

pub use dispatcher::{PushOutcome, SyncDispatcher};
pub use status::{playlist_sync_report, DeviceSyncDetail, PlaylistSyncReport};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("Playlist not found: {0}")]
    PlaylistNotFound(Uuid),

    #[error("No devices assigned to playlist {0}")]
    NoAssignedDevices(Uuid),
}

/// Delivery state of one playlist on one device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncState {
    /// A newer playlist version exists than the device has confirmed.
    Pending,
    /// Delivery task enqueued, not yet started.
    Queued,
    /// Delivery in progress.
    Syncing,
    /// Device confirmed the synced version.
    Synced,
    /// Delivery failed; error recorded.
    Failed,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Pending => "pending",
            SyncState::Queued => "queued",
            SyncState::Syncing => "syncing",
            SyncState::Synced => "synced",
            SyncState::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(SyncState::Pending),
            "queued" => Some(SyncState::Queued),
            "syncing" => Some(SyncState::Syncing),
            "synced" => Some(SyncState::Synced),
            "failed" => Some(SyncState::Failed),
            _ => None,
        }
    }
}

/// The `(device, playlist)` sync row.
#[derive(Debug, Clone, Serialize)]
pub struct DevicePlaylistSync {
    pub device_id: Uuid,
    pub playlist_id: Uuid,
    pub synced_version: Option<u32>,
    pub state: SyncState,
    pub last_attempt: Option<DateTime<Utc>>,
    pub last_success: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl DevicePlaylistSync {
    /// A device is up to date for a playlist iff it has confirmed at least
    /// the playlist's current version.
    pub fn is_up_to_date(&self, playlist_version: u32) -> bool {
        self.state == SyncState::Synced
            && self.synced_version.is_some_and(|v| v >= playlist_version)
    }
}
