// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-device layer overrides and trigger-playlist storage operations.

use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{Storage, StorageError};
use crate::layout::{DeviceLayerOverride, LayerContentMode, LayerPlaylistTrigger, TickerDirection};
use crate::playlist::AssignmentTrigger;

const OVERRIDE_COLUMNS: &str = "id, device_id, layer_id, content_mode, static_file_id, \
                                static_file_url, pdf_page_duration, ticker_items, \
                                ticker_speed, ticker_direction";

impl Storage {
    /// Creates or replaces the `(device, layer)` override.
    pub fn upsert_layer_override(
        &self,
        override_row: &DeviceLayerOverride,
    ) -> Result<(), StorageError> {
        let ticker_items = override_row
            .ticker_items
            .as_ref()
            .map(|items| serde_json::to_string(items))
            .transpose()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn().execute(
            "INSERT INTO device_layer_overrides (id, device_id, layer_id, content_mode, \
             static_file_id, static_file_url, pdf_page_duration, ticker_items, \
             ticker_speed, ticker_direction)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(device_id, layer_id) DO UPDATE SET
                 content_mode = excluded.content_mode,
                 static_file_id = excluded.static_file_id,
                 static_file_url = excluded.static_file_url,
                 pdf_page_duration = excluded.pdf_page_duration,
                 ticker_items = excluded.ticker_items,
                 ticker_speed = excluded.ticker_speed,
                 ticker_direction = excluded.ticker_direction",
            params![
                override_row.id.to_string(),
                override_row.device_id.to_string(),
                override_row.layer_id.to_string(),
                override_row.content_mode.as_str(),
                override_row.static_file_id.map(|f| f.to_string()),
                override_row.static_file_url,
                override_row.pdf_page_duration,
                ticker_items,
                override_row.ticker_speed,
                override_row.ticker_direction.as_str(),
            ],
        )?;
        Ok(())
    }

    pub fn get_layer_override(
        &self,
        device_id: Uuid,
        layer_id: Uuid,
    ) -> Result<Option<DeviceLayerOverride>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {OVERRIDE_COLUMNS} FROM device_layer_overrides \
                 WHERE device_id = ?1 AND layer_id = ?2"
            ),
            params![device_id.to_string(), layer_id.to_string()],
            row_to_override,
        );
        match result {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn delete_layer_override(
        &self,
        device_id: Uuid,
        layer_id: Uuid,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "DELETE FROM device_layer_overrides WHERE device_id = ?1 AND layer_id = ?2",
            params![device_id.to_string(), layer_id.to_string()],
        )?;
        Ok(())
    }

    // === Layer playlist triggers ===

    pub fn create_layer_trigger(
        &self,
        trigger: &LayerPlaylistTrigger,
    ) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO layer_playlist_triggers (id, device_id, layer_id, playlist_id, \
             trigger_type, priority) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                trigger.id.to_string(),
                trigger.device_id.to_string(),
                trigger.layer_id.to_string(),
                trigger.playlist_id.to_string(),
                trigger.trigger_type.as_str(),
                trigger.priority,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "trigger playlist {} on layer {}",
                        trigger.playlist_id, trigger.layer_id
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    /// Trigger rows for `(device, layer)`, highest priority first.
    pub fn layer_triggers(
        &self,
        device_id: Uuid,
        layer_id: Uuid,
    ) -> Result<Vec<LayerPlaylistTrigger>, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, device_id, layer_id, playlist_id, trigger_type, priority \
             FROM layer_playlist_triggers WHERE device_id = ?1 AND layer_id = ?2 \
             ORDER BY priority DESC",
        )?;
        let rows = stmt.query_map(
            params![device_id.to_string(), layer_id.to_string()],
            row_to_trigger,
        )?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn delete_layer_trigger(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM layer_playlist_triggers WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("layer trigger {id}")));
        }
        Ok(())
    }
}

fn row_to_override(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceLayerOverride> {
    let mode_str: String = row.get(3)?;
    let ticker_items: Option<String> = row.get(7)?;
    let direction_str: String = row.get(9)?;
    Ok(DeviceLayerOverride {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        device_id: parse_uuid(row.get::<_, String>(1)?)?,
        layer_id: parse_uuid(row.get::<_, String>(2)?)?,
        content_mode: LayerContentMode::parse(&mode_str).unwrap_or(LayerContentMode::Static),
        static_file_id: row
            .get::<_, Option<String>>(4)?
            .map(parse_uuid)
            .transpose()?,
        static_file_url: row.get(5)?,
        pdf_page_duration: row.get::<_, i64>(6)? as u32,
        ticker_items: ticker_items.and_then(|t| serde_json::from_str(&t).ok()),
        ticker_speed: row.get::<_, i64>(8)? as u32,
        ticker_direction: TickerDirection::parse(&direction_str).unwrap_or(TickerDirection::Left),
    })
}

fn row_to_trigger(row: &rusqlite::Row<'_>) -> rusqlite::Result<LayerPlaylistTrigger> {
    let trigger_str: String = row.get(4)?;
    let trigger_type = AssignmentTrigger::parse(&trigger_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("bad trigger '{trigger_str}'").into(),
        )
    })?;
    Ok(LayerPlaylistTrigger {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        device_id: parse_uuid(row.get::<_, String>(1)?)?,
        layer_id: parse_uuid(row.get::<_, String>(2)?)?,
        playlist_id: parse_uuid(row.get::<_, String>(3)?)?,
        trigger_type,
        priority: row.get(5)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ContentSource;

    #[test]
    fn override_upsert_replaces_fields() {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-ov");
        let layout = crate::storage::layouts::tests::seed_layout(&storage);
        let layer =
            crate::storage::layouts::tests::seed_layer(&storage, layout.id, ContentSource::Static);

        let mut ov = DeviceLayerOverride {
            id: Uuid::new_v4(),
            device_id: device.id,
            layer_id: layer.id,
            content_mode: LayerContentMode::Static,
            static_file_id: Some(Uuid::new_v4()),
            static_file_url: Some("/files/menu.pdf".into()),
            pdf_page_duration: 8,
            ticker_items: None,
            ticker_speed: 50,
            ticker_direction: TickerDirection::Left,
        };
        storage.upsert_layer_override(&ov).unwrap();

        ov.content_mode = LayerContentMode::Ticker;
        ov.ticker_items = Some(vec!["Sale today".into(), "Open late".into()]);
        ov.ticker_direction = TickerDirection::Up;
        storage.upsert_layer_override(&ov).unwrap();

        let fetched = storage
            .get_layer_override(device.id, layer.id)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.content_mode, LayerContentMode::Ticker);
        assert_eq!(fetched.ticker_items.unwrap().len(), 2);
        assert_eq!(fetched.ticker_direction, TickerDirection::Up);
    }

    #[test]
    fn trigger_unique_per_device_layer_playlist() {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-tr");
        let layout = crate::storage::layouts::tests::seed_layout(&storage);
        let layer = crate::storage::layouts::tests::seed_layer(
            &storage,
            layout.id,
            ContentSource::Playlist,
        );
        let playlist = crate::storage::playlists::tests::seed_playlist(&storage, Uuid::new_v4());

        let trigger = LayerPlaylistTrigger {
            id: Uuid::new_v4(),
            device_id: device.id,
            layer_id: layer.id,
            playlist_id: playlist.id,
            trigger_type: AssignmentTrigger::AgeChild,
            priority: 10,
        };
        storage.create_layer_trigger(&trigger).unwrap();

        let dup = LayerPlaylistTrigger {
            id: Uuid::new_v4(),
            ..trigger.clone()
        };
        let err = storage.create_layer_trigger(&dup).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        let rows = storage.layer_triggers(device.id, layer.id).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].trigger_type, AssignmentTrigger::AgeChild);
    }
}
