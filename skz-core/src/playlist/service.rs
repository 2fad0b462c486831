// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlist mutations.
//!
//! Every content-affecting mutation (items, schedule, trigger, loop mode)
//! folds the write and the version bump + device-sync invalidation into
//! one transaction.

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{LoopMode, Playlist, PlaylistItem, PlaylistSyncStatus, PlaylistTrigger};
use crate::content::ContentRef;
use crate::storage::{Storage, StorageError};
use crate::sync::dispatcher::mark_playlist_dirty_tx;

#[derive(Error, Debug)]
pub enum PlaylistError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("playlist not found: {0}")]
    NotFound(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Input for a new playlist.
#[derive(Debug, Clone)]
pub struct NewPlaylist {
    pub tenant_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: PlaylistTrigger,
    pub trigger_config: Option<serde_json::Value>,
    pub loop_mode: LoopMode,
    pub priority: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
}

/// Schedule/behaviour edits (content-affecting).
#[derive(Debug, Clone)]
pub struct PlaylistSettings {
    pub name: String,
    pub description: Option<String>,
    pub trigger_type: PlaylistTrigger,
    pub trigger_config: Option<serde_json::Value>,
    pub loop_mode: LoopMode,
    pub priority: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// Playlist mutation service.
pub struct PlaylistService<'a> {
    storage: &'a Storage,
}

impl<'a> PlaylistService<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        PlaylistService { storage }
    }

    pub fn create(&self, input: NewPlaylist) -> Result<Playlist, PlaylistError> {
        if input.name.trim().is_empty() {
            return Err(PlaylistError::InvalidInput("name is required".into()));
        }
        validate_window(input.start_at, input.end_at)?;

        let now = Utc::now();
        let playlist = Playlist {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            name: input.name,
            description: input.description,
            trigger_type: input.trigger_type,
            trigger_config: input.trigger_config,
            loop_mode: input.loop_mode,
            priority: input.priority,
            start_at: input.start_at,
            end_at: input.end_at,
            is_active: true,
            version: 1,
            sync_status: PlaylistSyncStatus::Pending,
            last_synced_at: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_playlist(&playlist)?;
        Ok(playlist)
    }

    /// Applies schedule/behaviour settings; bumps the version because the
    /// device-visible program changes.
    pub fn update_settings(
        &self,
        playlist_id: Uuid,
        settings: PlaylistSettings,
    ) -> Result<Playlist, PlaylistError> {
        if settings.name.trim().is_empty() {
            return Err(PlaylistError::InvalidInput("name is required".into()));
        }
        validate_window(settings.start_at, settings.end_at)?;

        let mut playlist = self
            .storage
            .get_playlist(playlist_id)?
            .ok_or(PlaylistError::NotFound(playlist_id))?;
        playlist.name = settings.name;
        playlist.description = settings.description;
        playlist.trigger_type = settings.trigger_type;
        playlist.trigger_config = settings.trigger_config;
        playlist.loop_mode = settings.loop_mode;
        playlist.priority = settings.priority;
        playlist.start_at = settings.start_at;
        playlist.end_at = settings.end_at;
        playlist.is_active = settings.is_active;
        playlist.updated_at = Utc::now();

        self.storage.in_transaction(|s| {
            s.update_playlist_attrs(&playlist)?;
            mark_playlist_dirty_tx(s, playlist_id)?;
            Ok(())
        })?;
        self.storage
            .get_playlist(playlist_id)?
            .ok_or(PlaylistError::NotFound(playlist_id))
    }

    /// Appends an item; returns the item and the bumped version.
    pub fn add_item(
        &self,
        playlist_id: Uuid,
        content: ContentRef,
        duration_override: Option<u32>,
    ) -> Result<(PlaylistItem, u32), PlaylistError> {
        self.require(playlist_id)?;
        let result = self.storage.in_transaction(|s| {
            let item = s.append_playlist_item(playlist_id, content, duration_override)?;
            let version = mark_playlist_dirty_tx(s, playlist_id)?;
            Ok((item, version))
        })?;
        Ok(result)
    }

    /// Removes an item, closing the position gap, and bumps the version.
    pub fn remove_item(&self, playlist_id: Uuid, item_id: Uuid) -> Result<u32, PlaylistError> {
        self.require(playlist_id)?;
        let version = self.storage.in_transaction(|s| {
            s.remove_playlist_item(playlist_id, item_id)?;
            mark_playlist_dirty_tx(s, playlist_id)
        })?;
        Ok(version)
    }

    /// Rewrites item order and bumps the version.
    pub fn reorder_items(
        &self,
        playlist_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<u32, PlaylistError> {
        self.require(playlist_id)?;
        let version = self.storage.in_transaction(|s| {
            s.reorder_playlist_items(playlist_id, ordered_ids)?;
            mark_playlist_dirty_tx(s, playlist_id)
        })?;
        Ok(version)
    }

    /// Edits one item's duration override and bumps the version.
    pub fn set_item_duration(
        &self,
        playlist_id: Uuid,
        item_id: Uuid,
        duration_override: Option<u32>,
    ) -> Result<u32, PlaylistError> {
        self.require(playlist_id)?;
        let version = self.storage.in_transaction(|s| {
            s.set_item_duration_override(item_id, duration_override)?;
            mark_playlist_dirty_tx(s, playlist_id)
        })?;
        Ok(version)
    }

    pub fn delete(&self, playlist_id: Uuid) -> Result<(), PlaylistError> {
        self.require(playlist_id)?;
        self.storage.delete_playlist(playlist_id)?;
        Ok(())
    }

    fn require(&self, playlist_id: Uuid) -> Result<(), PlaylistError> {
        if self.storage.get_playlist(playlist_id)?.is_none() {
            return Err(PlaylistError::NotFound(playlist_id));
        }
        Ok(())
    }
}

fn validate_window(
    start: Option<DateTime<Utc>>,
    end: Option<DateTime<Utc>>,
) -> Result<(), PlaylistError> {
    if let (Some(start), Some(end)) = (start, end) {
        if start > end {
            return Err(PlaylistError::InvalidInput(
                "schedule start must not be after end".into(),
            ));
        }
    }
    Ok(())
}
