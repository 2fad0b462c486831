// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Playlist and playlist-item storage operations.
//!
//! Item positions are a dense 0-based sequence per playlist; removal
//! closes the gap in the same transaction.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::content::ContentRef;
use crate::playlist::{LoopMode, Playlist, PlaylistItem, PlaylistSyncStatus, PlaylistTrigger};

const PLAYLIST_COLUMNS: &str = "id, tenant_id, name, description, trigger_type, \
                                trigger_config, loop_mode, priority, start_at, end_at, \
                                is_active, version, sync_status, last_synced_at, \
                                created_at, updated_at";

impl Storage {
    pub fn create_playlist(&self, playlist: &Playlist) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO playlists (id, tenant_id, name, description, trigger_type, \
             trigger_config, loop_mode, priority, start_at, end_at, is_active, version, \
             sync_status, last_synced_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
            params![
                playlist.id.to_string(),
                playlist.tenant_id.to_string(),
                playlist.name,
                playlist.description,
                playlist.trigger_type.as_str(),
                playlist
                    .trigger_config
                    .as_ref()
                    .map(|c| c.to_string()),
                playlist.loop_mode.as_str(),
                playlist.priority,
                to_db_ts_opt(playlist.start_at),
                to_db_ts_opt(playlist.end_at),
                playlist.is_active,
                playlist.version,
                playlist.sync_status.as_str(),
                to_db_ts_opt(playlist.last_synced_at),
                to_db_ts(playlist.created_at),
                to_db_ts(playlist.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_playlist(&self, id: Uuid) -> Result<Option<Playlist>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE id = ?1"),
            params![id.to_string()],
            row_to_playlist,
        );
        match result {
            Ok(playlist) => Ok(Some(playlist)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn list_playlists(&self, tenant_id: Uuid) -> Result<Vec<Playlist>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {PLAYLIST_COLUMNS} FROM playlists WHERE tenant_id = ?1 ORDER BY name"
        ))?;
        let rows = stmt.query_map(params![tenant_id.to_string()], row_to_playlist)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Updates playlist attributes without touching version or sync state.
    pub fn update_playlist_attrs(&self, playlist: &Playlist) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE playlists SET name = ?1, description = ?2, trigger_type = ?3, \
             trigger_config = ?4, loop_mode = ?5, priority = ?6, start_at = ?7, \
             end_at = ?8, is_active = ?9, updated_at = ?10 WHERE id = ?11",
            params![
                playlist.name,
                playlist.description,
                playlist.trigger_type.as_str(),
                playlist
                    .trigger_config
                    .as_ref()
                    .map(|c| c.to_string()),
                playlist.loop_mode.as_str(),
                playlist.priority,
                to_db_ts_opt(playlist.start_at),
                to_db_ts_opt(playlist.end_at),
                playlist.is_active,
                to_db_ts(playlist.updated_at),
                playlist.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("playlist {}", playlist.id)));
        }
        Ok(())
    }

    /// Bumps the content version and flags the playlist pending. Returns
    /// the new version.
    pub fn bump_playlist_version(&self, id: Uuid, now: DateTime<Utc>) -> Result<u32, StorageError> {
        let updated = self.conn().execute(
            "UPDATE playlists SET version = version + 1, sync_status = 'pending', \
             updated_at = ?1 WHERE id = ?2",
            params![to_db_ts(now), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("playlist {id}")));
        }
        let version: i64 = self.conn().query_row(
            "SELECT version FROM playlists WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(version as u32)
    }

    pub fn set_playlist_sync_status(
        &self,
        id: Uuid,
        status: PlaylistSyncStatus,
        synced_at: Option<DateTime<Utc>>,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE playlists SET sync_status = ?1, \
             last_synced_at = COALESCE(?2, last_synced_at) WHERE id = ?3",
            params![status.as_str(), to_db_ts_opt(synced_at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("playlist {id}")));
        }
        Ok(())
    }

    pub fn delete_playlist(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM playlists WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("playlist {id}")));
        }
        Ok(())
    }

    // === Playlist items ===

    /// Appends an item at the end of the playlist and returns it.
    pub fn append_playlist_item(
        &self,
        playlist_id: Uuid,
        content: ContentRef,
        duration_override: Option<u32>,
    ) -> Result<PlaylistItem, StorageError> {
        let next: i64 = self.conn().query_row(
            "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_items WHERE playlist_id = ?1",
            params![playlist_id.to_string()],
            |row| row.get(0),
        )?;
        let item = PlaylistItem {
            id: Uuid::new_v4(),
            playlist_id,
            content,
            position: next as u32,
            duration_override,
        };
        self.conn().execute(
            "INSERT INTO playlist_items (id, playlist_id, content_kind, content_id, \
             position, duration_override) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                item.id.to_string(),
                playlist_id.to_string(),
                content.kind_str(),
                content.content_id().to_string(),
                item.position,
                item.duration_override,
            ],
        )?;
        Ok(item)
    }

    /// Removes an item and closes the position gap it leaves.
    pub fn remove_playlist_item(&self, playlist_id: Uuid, item_id: Uuid) -> Result<(), StorageError> {
        let position: i64 = match self.conn().query_row(
            "SELECT position FROM playlist_items WHERE id = ?1 AND playlist_id = ?2",
            params![item_id.to_string(), playlist_id.to_string()],
            |row| row.get(0),
        ) {
            Ok(p) => p,
            Err(rusqlite::Error::QueryReturnedNoRows) => {
                return Err(StorageError::NotFound(format!("playlist item {item_id}")))
            }
            Err(e) => return Err(StorageError::Database(e)),
        };

        self.conn().execute(
            "DELETE FROM playlist_items WHERE id = ?1",
            params![item_id.to_string()],
        )?;
        self.conn().execute(
            "UPDATE playlist_items SET position = position - 1 \
             WHERE playlist_id = ?1 AND position > ?2",
            params![playlist_id.to_string(), position],
        )?;
        Ok(())
    }

    /// Rewrites item order to match `ordered_ids` (which must cover every
    /// item exactly once).
    pub fn reorder_playlist_items(
        &self,
        playlist_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> Result<(), StorageError> {
        let existing = self.playlist_items(playlist_id)?;
        if existing.len() != ordered_ids.len() {
            return Err(StorageError::Serialization(format!(
                "reorder lists {} items, playlist has {}",
                ordered_ids.len(),
                existing.len()
            )));
        }
        for item in &existing {
            if !ordered_ids.contains(&item.id) {
                return Err(StorageError::NotFound(format!(
                    "playlist item {} missing from reorder list",
                    item.id
                )));
            }
        }
        for (position, item_id) in ordered_ids.iter().enumerate() {
            self.conn().execute(
                "UPDATE playlist_items SET position = ?1 WHERE id = ?2 AND playlist_id = ?3",
                params![position as i64, item_id.to_string(), playlist_id.to_string()],
            )?;
        }
        Ok(())
    }

    pub fn set_item_duration_override(
        &self,
        item_id: Uuid,
        duration_override: Option<u32>,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE playlist_items SET duration_override = ?1 WHERE id = ?2",
            params![duration_override, item_id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("playlist item {item_id}")));
        }
        Ok(())
    }

    /// Items in position order.
    pub fn playlist_items(&self, playlist_id: Uuid) -> Result<Vec<PlaylistItem>, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, playlist_id, content_kind, content_id, position, duration_override \
             FROM playlist_items WHERE playlist_id = ?1 ORDER BY position",
        )?;
        let rows = stmt.query_map(params![playlist_id.to_string()], row_to_item)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }
}

fn row_to_playlist(row: &rusqlite::Row<'_>) -> rusqlite::Result<Playlist> {
    let trigger_str: String = row.get(4)?;
    let loop_str: String = row.get(6)?;
    let sync_str: String = row.get(12)?;
    let trigger_config: Option<String> = row.get(5)?;
    Ok(Playlist {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        description: row.get(3)?,
        trigger_type: PlaylistTrigger::parse(&trigger_str).unwrap_or(PlaylistTrigger::Manual),
        trigger_config: trigger_config.and_then(|c| serde_json::from_str(&c).ok()),
        loop_mode: LoopMode::parse(&loop_str).unwrap_or(LoopMode::Continuous),
        priority: row.get(7)?,
        start_at: from_db_ts_opt(row.get(8)?),
        end_at: from_db_ts_opt(row.get(9)?),
        is_active: row.get(10)?,
        version: row.get::<_, i64>(11)? as u32,
        sync_status: PlaylistSyncStatus::parse(&sync_str).unwrap_or(PlaylistSyncStatus::Pending),
        last_synced_at: from_db_ts_opt(row.get(13)?),
        created_at: from_db_ts(row.get(14)?),
        updated_at: from_db_ts(row.get(15)?),
    })
}

fn row_to_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlaylistItem> {
    let kind: String = row.get(2)?;
    let content_id = parse_uuid(row.get::<_, String>(3)?)?;
    let content = ContentRef::from_parts(&kind, content_id).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("bad content kind '{kind}'").into(),
        )
    })?;
    Ok(PlaylistItem {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        playlist_id: parse_uuid(row.get::<_, String>(1)?)?,
        content,
        position: row.get::<_, i64>(4)? as u32,
        duration_override: row.get(5)?,
    })
}
