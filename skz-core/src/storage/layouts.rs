// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Layout, layer, and device-layout-assignment storage operations.

use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::layout::{
    BackgroundType, ContentSource, DeviceLayout, Layer, LayerType, Layout, Orientation,
};

const LAYOUT_COLUMNS: &str = "id, name, canvas_width, canvas_height, orientation, \
                              background_type, background_color, background_opacity, \
                              background_content, is_template, created_at, updated_at";

const LAYER_COLUMNS: &str = "id, layout_id, name, layer_type, x, y, width, height, z_index, \
                             opacity, background_type, background_color, is_visible, \
                             is_locked, content_source, playlist_id, content_id, is_primary, \
                             content_config";

impl Storage {
    // === Layouts ===

    pub fn create_layout(&self, layout: &Layout) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO layouts (id, name, canvas_width, canvas_height, orientation, \
             background_type, background_color, background_opacity, background_content, \
             is_template, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                layout.id.to_string(),
                layout.name,
                layout.canvas_width,
                layout.canvas_height,
                layout.orientation.as_str(),
                layout.background_type.as_str(),
                layout.background_color,
                layout.background_opacity,
                layout.background_content,
                layout.is_template,
                to_db_ts(layout.created_at),
                to_db_ts(layout.updated_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_layout(&self, id: Uuid) -> Result<Option<Layout>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {LAYOUT_COLUMNS} FROM layouts WHERE id = ?1"),
            params![id.to_string()],
            row_to_layout,
        );
        match result {
            Ok(layout) => Ok(Some(layout)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn list_layouts(&self) -> Result<Vec<Layout>, StorageError> {
        let mut stmt = self
            .conn()
            .prepare(&format!("SELECT {LAYOUT_COLUMNS} FROM layouts ORDER BY name"))?;
        let rows = stmt.query_map([], row_to_layout)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn delete_layout(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM layouts WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("layout {id}")));
        }
        Ok(())
    }

    // === Layers ===

    pub fn create_layer(&self, layer: &Layer) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO layers (id, layout_id, name, layer_type, x, y, width, height, \
             z_index, opacity, background_type, background_color, is_visible, is_locked, \
             content_source, playlist_id, content_id, is_primary, content_config)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, \
             ?16, ?17, ?18, ?19)",
            params![
                layer.id.to_string(),
                layer.layout_id.to_string(),
                layer.name,
                layer.layer_type.as_str(),
                layer.x,
                layer.y,
                layer.width,
                layer.height,
                layer.z_index,
                layer.opacity,
                layer.background_type.as_str(),
                layer.background_color,
                layer.is_visible,
                layer.is_locked,
                layer.content_source.as_str(),
                layer.playlist_id.map(|p| p.to_string()),
                layer.content_id.map(|c| c.to_string()),
                layer.is_primary,
                layer.content_config.as_ref().map(|c| c.to_string()),
            ],
        )?;
        Ok(())
    }

    pub fn get_layer(&self, id: Uuid) -> Result<Option<Layer>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {LAYER_COLUMNS} FROM layers WHERE id = ?1"),
            params![id.to_string()],
            row_to_layer,
        );
        match result {
            Ok(layer) => Ok(Some(layer)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// All layers of a layout in ascending z order.
    pub fn layers_for_layout(&self, layout_id: Uuid) -> Result<Vec<Layer>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LAYER_COLUMNS} FROM layers WHERE layout_id = ?1 ORDER BY z_index"
        ))?;
        let rows = stmt.query_map(params![layout_id.to_string()], row_to_layer)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Next free z index within a layout.
    pub fn next_layer_z(&self, layout_id: Uuid) -> Result<i32, StorageError> {
        let z: i64 = self.conn().query_row(
            "SELECT COALESCE(MAX(z_index) + 1, 0) FROM layers WHERE layout_id = ?1",
            params![layout_id.to_string()],
            |row| row.get(0),
        )?;
        Ok(z as i32)
    }

    pub fn update_layer(&self, layer: &Layer) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE layers SET name = ?1, layer_type = ?2, x = ?3, y = ?4, width = ?5, \
             height = ?6, z_index = ?7, opacity = ?8, background_type = ?9, \
             background_color = ?10, is_visible = ?11, is_locked = ?12, \
             content_source = ?13, playlist_id = ?14, content_id = ?15, is_primary = ?16, \
             content_config = ?17 WHERE id = ?18",
            params![
                layer.name,
                layer.layer_type.as_str(),
                layer.x,
                layer.y,
                layer.width,
                layer.height,
                layer.z_index,
                layer.opacity,
                layer.background_type.as_str(),
                layer.background_color,
                layer.is_visible,
                layer.is_locked,
                layer.content_source.as_str(),
                layer.playlist_id.map(|p| p.to_string()),
                layer.content_id.map(|c| c.to_string()),
                layer.is_primary,
                layer.content_config.as_ref().map(|c| c.to_string()),
                layer.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("layer {}", layer.id)));
        }
        Ok(())
    }

    pub fn delete_layer(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM layers WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("layer {id}")));
        }
        Ok(())
    }

    // === Device layout assignments ===

    pub fn create_device_layout(&self, assignment: &DeviceLayout) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO device_layouts (id, device_id, layout_id, priority, start_at, \
             end_at, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                assignment.id.to_string(),
                assignment.device_id.to_string(),
                assignment.layout_id.to_string(),
                assignment.priority,
                to_db_ts_opt(assignment.start_at),
                to_db_ts_opt(assignment.end_at),
                to_db_ts(assignment.created_at),
            ],
        )?;
        Ok(())
    }

    /// Layout assignments for a device, highest priority first.
    pub fn device_layouts(&self, device_id: Uuid) -> Result<Vec<DeviceLayout>, StorageError> {
        let mut stmt = self.conn().prepare(
            "SELECT id, device_id, layout_id, priority, start_at, end_at, created_at \
             FROM device_layouts WHERE device_id = ?1 ORDER BY priority DESC, created_at",
        )?;
        let rows = stmt.query_map(params![device_id.to_string()], row_to_device_layout)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn delete_device_layout(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM device_layouts WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("device layout {id}")));
        }
        Ok(())
    }
}

fn row_to_layout(row: &rusqlite::Row<'_>) -> rusqlite::Result<Layout> {
    let orientation_str: String = row.get(4)?;
    let bg_str: String = row.get(5)?;
    Ok(Layout {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        canvas_width: row.get(2)?,
        canvas_height: row.get(3)?,
        orientation: Orientation::parse(&orientation_str).unwrap_or(Orientation::Landscape),
        background_type: BackgroundType::parse(&bg_str).unwrap_or(BackgroundType::Solid),
        background_color: row.get(6)?,
        background_opacity: row.get(7)?,
        background_content: row.get(8)?,
        is_template: row.get(9)?,
        created_at: from_db_ts(row.get(10)?),
        updated_at: from_db_ts(row.get(11)?),
    })
}

fn row_to_layer(row: &rusqlite::Row<'_>) -> rusqlite::Result<Layer> {
    let type_str: String = row.get(3)?;
    let bg_str: String = row.get(10)?;
    let source_str: String = row.get(14)?;
    let config: Option<String> = row.get(18)?;
    Ok(Layer {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        layout_id: parse_uuid(row.get::<_, String>(1)?)?,
        name: row.get(2)?,
        layer_type: LayerType::parse(&type_str).unwrap_or(LayerType::Content),
        x: row.get(4)?,
        y: row.get(5)?,
        width: row.get(6)?,
        height: row.get(7)?,
        z_index: row.get(8)?,
        opacity: row.get(9)?,
        background_type: BackgroundType::parse(&bg_str).unwrap_or(BackgroundType::Transparent),
        background_color: row.get(11)?,
        is_visible: row.get(12)?,
        is_locked: row.get(13)?,
        content_source: ContentSource::parse(&source_str).unwrap_or(ContentSource::None),
        playlist_id: row
            .get::<_, Option<String>>(15)?
            .map(parse_uuid)
            .transpose()?,
        content_id: row
            .get::<_, Option<String>>(16)?
            .map(parse_uuid)
            .transpose()?,
        is_primary: row.get(17)?,
        content_config: config.and_then(|c| serde_json::from_str(&c).ok()),
    })
}

fn row_to_device_layout(row: &rusqlite::Row<'_>) -> rusqlite::Result<DeviceLayout> {
    Ok(DeviceLayout {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        device_id: parse_uuid(row.get::<_, String>(1)?)?,
        layout_id: parse_uuid(row.get::<_, String>(2)?)?,
        priority: row.get(3)?,
        start_at: from_db_ts_opt(row.get(4)?),
        end_at: from_db_ts_opt(row.get(5)?),
        created_at: from_db_ts(row.get(6)?),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use chrono::Utc;

    pub(crate) fn seed_layout(storage: &Storage) -> Layout {
        let layout = Layout {
            id: Uuid::new_v4(),
            name: "Main".into(),
            canvas_width: 1920,
            canvas_height: 1080,
            orientation: Orientation::Landscape,
            background_type: BackgroundType::Solid,
            background_color: "#000000".into(),
            background_opacity: 1.0,
            background_content: None,
            is_template: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        storage.create_layout(&layout).unwrap();
        layout
    }

    pub(crate) fn seed_layer(storage: &Storage, layout_id: Uuid, source: ContentSource) -> Layer {
        let z = storage.next_layer_z(layout_id).unwrap();
        let layer = Layer {
            id: Uuid::new_v4(),
            layout_id,
            name: format!("Layer {z}"),
            layer_type: LayerType::Content,
            x: 0,
            y: 0,
            width: 960,
            height: 540,
            z_index: z,
            opacity: 1.0,
            background_type: BackgroundType::Transparent,
            background_color: None,
            is_visible: true,
            is_locked: false,
            content_source: source,
            playlist_id: None,
            content_id: None,
            is_primary: z == 0,
            content_config: None,
        };
        storage.create_layer(&layer).unwrap();
        layer
    }

    #[test]
    fn layers_come_back_in_z_order() {
        let storage = Storage::in_memory().unwrap();
        let layout = seed_layout(&storage);
        let a = seed_layer(&storage, layout.id, ContentSource::Playlist);
        let b = seed_layer(&storage, layout.id, ContentSource::Static);
        let c = seed_layer(&storage, layout.id, ContentSource::None);
        assert_eq!(
            (a.z_index, b.z_index, c.z_index),
            (0, 1, 2)
        );

        let layers = storage.layers_for_layout(layout.id).unwrap();
        let ids: Vec<Uuid> = layers.iter().map(|l| l.id).collect();
        assert_eq!(ids, vec![a.id, b.id, c.id]);
    }

    #[test]
    fn deleting_layout_cascades_to_layers() {
        let storage = Storage::in_memory().unwrap();
        let layout = seed_layout(&storage);
        let layer = seed_layer(&storage, layout.id, ContentSource::None);

        storage.delete_layout(layout.id).unwrap();
        assert!(storage.get_layer(layer.id).unwrap().is_none());
    }

    #[test]
    fn device_layouts_ordered_by_priority() {
        let storage = Storage::in_memory().unwrap();
        let device = crate::storage::devices::tests::seed_device(&storage, "hw-layout");
        let layout_a = seed_layout(&storage);
        let layout_b = seed_layout(&storage);

        for (layout, priority) in [(layout_a.id, 1), (layout_b.id, 5)] {
            storage
                .create_device_layout(&DeviceLayout {
                    id: Uuid::new_v4(),
                    device_id: device.id,
                    layout_id: layout,
                    priority,
                    start_at: None,
                    end_at: None,
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        let assignments = storage.device_layouts(device.id).unwrap();
        assert_eq!(assignments[0].layout_id, layout_b.id);
        assert_eq!(assignments[1].layout_id, layout_a.id);
    }
}
