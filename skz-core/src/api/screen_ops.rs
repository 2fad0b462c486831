// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Screen-program operations on the facade: playlists, layouts, layers,
//! per-device overrides and triggers, composition, and sync.

use chrono::Utc;
use uuid::Uuid;

use super::central::CentralHub;
use super::error::{CoreError, CoreResult};
use crate::content::{Content, ContentRef};
use crate::layout::composer::ComposedLayout;
use crate::layout::{
    clamp_layer_bounds, BackgroundType, ContentSource, DeviceLayerOverride, DeviceLayout,
    Layer, LayerBounds, LayerContentMode, LayerPlaylistTrigger, LayerType, Layout, Orientation,
};
use crate::playlist::{
    AssignmentTrigger, NewPlaylist, Playlist, PlaylistItem, PlaylistSettings,
};
use crate::sync::{playlist_sync_report, PlaylistSyncReport, PushOutcome};

/// Input for a new layout.
#[derive(Debug, Clone)]
pub struct NewLayout {
    pub name: String,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub orientation: Orientation,
    pub background_type: BackgroundType,
    pub background_color: String,
    pub background_opacity: f64,
    pub background_content: Option<String>,
    pub is_template: bool,
}

/// Input for a new layer. Geometry is clamped into the canvas.
#[derive(Debug, Clone)]
pub struct NewLayer {
    pub layout_id: Uuid,
    pub name: String,
    pub layer_type: LayerType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub opacity: f64,
    pub content_source: ContentSource,
    pub playlist_id: Option<Uuid>,
    pub content_id: Option<Uuid>,
    pub is_primary: bool,
    pub content_config: Option<serde_json::Value>,
}

impl CentralHub {
    // === Content metadata ===

    pub fn create_content(&self, content: &Content) -> CoreResult<()> {
        Ok(self.storage().create_content(content)?)
    }

    // === Playlists ===

    pub fn create_playlist(&self, input: NewPlaylist) -> CoreResult<Playlist> {
        Ok(self.playlists().create(input)?)
    }

    pub fn update_playlist(
        &self,
        playlist_id: Uuid,
        settings: PlaylistSettings,
    ) -> CoreResult<Playlist> {
        Ok(self.playlists().update_settings(playlist_id, settings)?)
    }

    pub fn get_playlist(&self, playlist_id: Uuid) -> CoreResult<Playlist> {
        self.storage()
            .get_playlist(playlist_id)?
            .ok_or_else(|| CoreError::NotFound(format!("playlist {playlist_id}")))
    }

    pub fn add_playlist_item(
        &self,
        playlist_id: Uuid,
        content: ContentRef,
        duration_override: Option<u32>,
    ) -> CoreResult<(PlaylistItem, u32)> {
        Ok(self.playlists().add_item(playlist_id, content, duration_override)?)
    }

    pub fn remove_playlist_item(&self, playlist_id: Uuid, item_id: Uuid) -> CoreResult<u32> {
        Ok(self.playlists().remove_item(playlist_id, item_id)?)
    }

    pub fn reorder_playlist_items(
        &self,
        playlist_id: Uuid,
        ordered_ids: &[Uuid],
    ) -> CoreResult<u32> {
        Ok(self.playlists().reorder_items(playlist_id, ordered_ids)?)
    }

    pub fn set_playlist_item_duration(
        &self,
        playlist_id: Uuid,
        item_id: Uuid,
        duration_override: Option<u32>,
    ) -> CoreResult<u32> {
        Ok(self
            .playlists()
            .set_item_duration(playlist_id, item_id, duration_override)?)
    }

    // === Layouts and layers ===

    pub fn create_layout(&self, input: NewLayout) -> CoreResult<Layout> {
        let now = Utc::now();
        let layout = Layout {
            id: Uuid::new_v4(),
            name: input.name,
            canvas_width: input.canvas_width,
            canvas_height: input.canvas_height,
            orientation: input.orientation,
            background_type: input.background_type,
            background_color: input.background_color,
            background_opacity: input.background_opacity,
            background_content: input.background_content,
            is_template: input.is_template,
            created_at: now,
            updated_at: now,
        };
        layout.validate()?;
        self.storage().create_layout(&layout)?;
        Ok(layout)
    }

    pub fn get_layout(&self, layout_id: Uuid) -> CoreResult<Layout> {
        self.storage()
            .get_layout(layout_id)?
            .ok_or_else(|| CoreError::NotFound(format!("layout {layout_id}")))
    }

    /// Adds a layer at the top of the stack, clamped into the canvas.
    pub fn add_layer(&self, input: NewLayer) -> CoreResult<Layer> {
        let layout = self.get_layout(input.layout_id)?;
        let bounds = clamp_layer_bounds(
            LayerBounds {
                x: input.x,
                y: input.y,
                width: input.width,
                height: input.height,
            },
            layout.canvas_width,
            layout.canvas_height,
        );
        let layer = Layer {
            id: Uuid::new_v4(),
            layout_id: input.layout_id,
            name: input.name,
            layer_type: input.layer_type,
            x: bounds.x,
            y: bounds.y,
            width: bounds.width,
            height: bounds.height,
            z_index: self.storage().next_layer_z(input.layout_id)?,
            opacity: input.opacity.clamp(0.0, 1.0),
            background_type: BackgroundType::Transparent,
            background_color: None,
            is_visible: true,
            is_locked: false,
            content_source: input.content_source,
            playlist_id: input.playlist_id,
            content_id: input.content_id,
            is_primary: input.is_primary,
            content_config: input.content_config,
        };
        self.storage().create_layer(&layer)?;
        Ok(layer)
    }

    /// Full-layer update; geometry is re-clamped.
    pub fn update_layer(&self, mut layer: Layer) -> CoreResult<Layer> {
        let layout = self.get_layout(layer.layout_id)?;
        let bounds = clamp_layer_bounds(
            LayerBounds {
                x: layer.x,
                y: layer.y,
                width: layer.width,
                height: layer.height,
            },
            layout.canvas_width,
            layout.canvas_height,
        );
        layer.x = bounds.x;
        layer.y = bounds.y;
        layer.width = bounds.width;
        layer.height = bounds.height;
        layer.opacity = layer.opacity.clamp(0.0, 1.0);
        self.storage().update_layer(&layer)?;
        Ok(layer)
    }

    /// Rewrites the z order of a layout's layers to match `ordered_ids`.
    pub fn reorder_layers(&self, layout_id: Uuid, ordered_ids: &[Uuid]) -> CoreResult<()> {
        let layers = self.storage().layers_for_layout(layout_id)?;
        if layers.len() != ordered_ids.len()
            || !layers.iter().all(|l| ordered_ids.contains(&l.id))
        {
            return Err(CoreError::InvalidInput(
                "reorder list must cover every layer exactly once".into(),
            ));
        }
        for (z, layer_id) in ordered_ids.iter().enumerate() {
            let mut layer = layers
                .iter()
                .find(|l| l.id == *layer_id)
                .cloned()
                .ok_or_else(|| CoreError::NotFound(format!("layer {layer_id}")))?;
            layer.z_index = z as i32;
            self.storage().update_layer(&layer)?;
        }
        Ok(())
    }

    pub fn delete_layer(&self, layer_id: Uuid) -> CoreResult<()> {
        Ok(self.storage().delete_layer(layer_id)?)
    }

    /// Deletes a layout; its layers cascade.
    pub fn delete_layout(&self, layout_id: Uuid) -> CoreResult<()> {
        Ok(self.storage().delete_layout(layout_id)?)
    }

    // === Device layout binding ===

    /// Direct layout assignment; bumps the device change counter.
    pub fn set_device_layout(&self, device_id: Uuid, layout_id: Option<Uuid>) -> CoreResult<i64> {
        if let Some(layout_id) = layout_id {
            self.get_layout(layout_id)?;
        }
        self.storage().set_device_layout(device_id, layout_id)?;
        Ok(self.sync().mark_device_dirty(device_id)?)
    }

    /// Scheduled layout assignment (used when no direct layout is set).
    pub fn assign_device_layout(&self, assignment: DeviceLayout) -> CoreResult<i64> {
        self.get_layout(assignment.layout_id)?;
        self.storage().create_device_layout(&assignment)?;
        Ok(self.sync().mark_device_dirty(assignment.device_id)?)
    }

    /// Per-device layer override; bumps the device change counter.
    pub fn set_layer_override(&self, override_row: DeviceLayerOverride) -> CoreResult<i64> {
        if override_row.content_mode == LayerContentMode::Ticker
            && override_row.ticker_items.as_deref().unwrap_or_default().is_empty()
        {
            return Err(CoreError::InvalidInput(
                "ticker override requires ticker_items".into(),
            ));
        }
        let device_id = override_row.device_id;
        self.storage().upsert_layer_override(&override_row)?;
        Ok(self.sync().mark_device_dirty(device_id)?)
    }

    pub fn clear_layer_override(&self, device_id: Uuid, layer_id: Uuid) -> CoreResult<i64> {
        self.storage().delete_layer_override(device_id, layer_id)?;
        Ok(self.sync().mark_device_dirty(device_id)?)
    }

    /// Adds a trigger-conditional playlist to a layer for one device.
    pub fn add_layer_trigger(
        &self,
        device_id: Uuid,
        layer_id: Uuid,
        playlist_id: Uuid,
        trigger_type: AssignmentTrigger,
        priority: i32,
    ) -> CoreResult<LayerPlaylistTrigger> {
        self.get_playlist(playlist_id)?;
        let trigger = LayerPlaylistTrigger {
            id: Uuid::new_v4(),
            device_id,
            layer_id,
            playlist_id,
            trigger_type,
            priority,
        };
        self.storage().create_layer_trigger(&trigger)?;
        self.sync().mark_device_dirty(device_id)?;
        Ok(trigger)
    }

    pub fn remove_layer_trigger(&self, trigger_id: Uuid, device_id: Uuid) -> CoreResult<i64> {
        self.storage().delete_layer_trigger(trigger_id)?;
        Ok(self.sync().mark_device_dirty(device_id)?)
    }

    // === Composition ===

    /// The device-pull endpoint body: the composed layout document.
    pub fn compose_device_layout(&self, device_ref: &str) -> CoreResult<ComposedLayout> {
        Ok(self.composer().compose(device_ref)?)
    }

    // === Sync ===

    pub fn push_playlist(&self, playlist_id: Uuid) -> CoreResult<PushOutcome> {
        Ok(self
            .sync()
            .push(playlist_id, self.config().notification_max_retries)?)
    }

    pub fn playlist_sync_status(
        &self,
        playlist_id: Uuid,
        include_devices: bool,
    ) -> CoreResult<PlaylistSyncReport> {
        Ok(playlist_sync_report(
            self.storage(),
            playlist_id,
            include_devices,
        )?)
    }

    /// Worker entry: deliver one playlist version to one device. Devices
    /// with a known address are notified through their agent; pull-only
    /// devices converge via polling and count as delivered.
    pub(crate) async fn deliver_playlist_to_device(
        &self,
        playlist_id: Uuid,
        device_id: Uuid,
        version: u32,
    ) -> CoreResult<()> {
        let device = self.get_device(device_id)?;
        if device.ip.is_some() {
            self.agent().notify_sync(&device, playlist_id, version).await?;
        }
        self.sync()
            .complete_device_sync(device_id, playlist_id, version, Utc::now())?;
        Ok(())
    }

    /// Worker entry: terminal delivery failure for one device.
    pub(crate) fn record_delivery_failure(
        &self,
        playlist_id: Uuid,
        device_id: Uuid,
        error: &str,
    ) -> CoreResult<()> {
        self.sync().fail_device_sync(device_id, playlist_id, error)?;
        Ok(())
    }
}
