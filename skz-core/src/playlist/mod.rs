// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlists and playlist items.
//!
//! A playlist's `version` is the identity used by device sync state: every
//! content-affecting mutation bumps it and marks the assigned devices
//! pending (see the sync dispatcher).

mod assignment;
pub mod service;

pub use assignment::{AssignmentTrigger, DevicePlaylistAssignment};
pub use service::{NewPlaylist, PlaylistError, PlaylistService, PlaylistSettings};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::ContentRef;

/// How a playlist is started on the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistTrigger {
    Time,
    Event,
    Manual,
}

impl PlaylistTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistTrigger::Time => "time",
            PlaylistTrigger::Event => "event",
            PlaylistTrigger::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "time" => Some(PlaylistTrigger::Time),
            "event" => Some(PlaylistTrigger::Event),
            "manual" => Some(PlaylistTrigger::Manual),
            _ => None,
        }
    }
}

/// Playback looping behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopMode {
    Continuous,
    PlayOnce,
    Scheduled,
}

impl LoopMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoopMode::Continuous => "continuous",
            LoopMode::PlayOnce => "play_once",
            LoopMode::Scheduled => "scheduled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "continuous" => Some(LoopMode::Continuous),
            "play_once" => Some(LoopMode::PlayOnce),
            "scheduled" => Some(LoopMode::Scheduled),
            _ => None,
        }
    }
}

/// Aggregate sync state of a playlist across its assigned devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaylistSyncStatus {
    InSync,
    Pending,
    Syncing,
    Error,
}

impl PlaylistSyncStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaylistSyncStatus::InSync => "in_sync",
            PlaylistSyncStatus::Pending => "pending",
            PlaylistSyncStatus::Syncing => "syncing",
            PlaylistSyncStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in_sync" => Some(PlaylistSyncStatus::InSync),
            "pending" => Some(PlaylistSyncStatus::Pending),
            "syncing" => Some(PlaylistSyncStatus::Syncing),
            "error" => Some(PlaylistSyncStatus::Error),
            _ => None,
        }
    }
}

/// A tenant's ordered content program.
#[derive(Debug, Clone, Serialize)]
pub struct Playlist {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: PlaylistTrigger,
    pub trigger_config: Option<serde_json::Value>,
    pub loop_mode: LoopMode,
    pub priority: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    /// Bumped on every content-affecting mutation.
    pub version: u32,
    pub sync_status: PlaylistSyncStatus,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Playlist {
    /// Schedule window check with open endpoints.
    pub fn is_scheduled_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(start) = self.start_at {
            if now < start {
                return false;
            }
        }
        if let Some(end) = self.end_at {
            if now > end {
                return false;
            }
        }
        true
    }
}

/// One entry in a playlist. `position` is a dense 0-based sequence;
/// removals close gaps.
#[derive(Debug, Clone, Serialize)]
pub struct PlaylistItem {
    pub id: Uuid,
    pub playlist_id: Uuid,
    pub content: ContentRef,
    pub position: u32,
    pub duration_override: Option<u32>,
}
