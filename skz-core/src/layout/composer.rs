// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Runtime layout composition for the edge.
//!
//! Resolves `(device) → layout → layers → content` into one JSON-ready
//! document: geometry and styling as stored, playlist items with resolved
//! URLs and effective durations, per-device static/ticker overrides, and
//! the ordered trigger-conditional playlists the edge selects from at
//! runtime. Everything here is a deterministic function of persisted
//! state.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::{ContentSource, DeviceLayerOverride, Layer, Layout};
use crate::fleet::{Device, DeviceStatus};
use crate::playlist::AssignmentTrigger;
use crate::storage::{Storage, StorageError};

/// Fallback duration for content without an intrinsic one (images).
pub const DEFAULT_IMAGE_DURATION: u32 = 10;

#[derive(thiserror::Error, Debug)]
pub enum ComposeError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("device not found: {0}")]
    DeviceNotFound(String),
}

/// The composed program for one device.
#[derive(Debug, Clone, Serialize)]
pub struct ComposedLayout {
    pub device_external_id: String,
    pub status: DeviceStatus,
    /// The device's change counter; the edge polls until it has observed
    /// the value it was told about.
    pub pending_sync_version: i64,
    pub layout: Option<LayoutDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayoutDocument {
    pub id: Uuid,
    pub name: String,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub orientation: super::Orientation,
    pub background_type: super::BackgroundType,
    pub background_color: String,
    pub background_opacity: f64,
    pub background_content: Option<String>,
    pub layers: Vec<LayerDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LayerDocument {
    pub id: Uuid,
    pub name: String,
    pub layer_type: super::LayerType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub z_index: i32,
    pub opacity: f64,
    pub background_type: super::BackgroundType,
    pub background_color: Option<String>,
    pub content_source: ContentSource,
    pub is_primary: bool,
    pub content_config: Option<serde_json::Value>,
    pub playlist: Option<PlaylistRef>,
    pub items: Vec<ItemDocument>,
    /// The `(device, layer)` override for static/ticker layers; absent
    /// when none is configured (a null-content layer, not an error).
    pub override_content: Option<OverrideDocument>,
    pub trigger_playlists: Vec<TriggerPlaylistDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlaylistRef {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ItemDocument {
    pub id: Uuid,
    pub content_id: Uuid,
    pub url: String,
    pub filename: String,
    pub content_type: String,
    /// `duration_override ?? content.duration ?? 10`.
    pub duration: u32,
    pub order: u32,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "content_mode", rename_all = "snake_case")]
pub enum OverrideDocument {
    Static {
        static_file_id: Option<Uuid>,
        static_file_url: Option<String>,
        pdf_page_duration: u32,
    },
    Playlist {},
    Ticker {
        ticker_items: Vec<String>,
        ticker_speed: u32,
        ticker_direction: super::TickerDirection,
    },
}

#[derive(Debug, Clone, Serialize)]
pub struct TriggerPlaylistDocument {
    pub id: Uuid,
    pub playlist_id: Uuid,
    pub playlist_name: String,
    pub trigger_type: AssignmentTrigger,
    pub priority: i32,
    pub items: Vec<ItemDocument>,
}

/// Composes runtime layout documents.
pub struct LayoutComposer<'a> {
    storage: &'a Storage,
}

impl<'a> LayoutComposer<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        LayoutComposer { storage }
    }

    /// Composes the program for a device referenced by hardware id or
    /// external id.
    pub fn compose(&self, device_ref: &str) -> Result<ComposedLayout, ComposeError> {
        let device = match self.storage.get_device_by_hardware_id(device_ref)? {
            Some(device) => device,
            None => self
                .storage
                .get_device_by_external_id(device_ref)?
                .ok_or_else(|| ComposeError::DeviceNotFound(device_ref.to_string()))?,
        };
        self.compose_for_device(&device, Utc::now())
    }

    /// Composition proper, with an injectable clock for schedule windows.
    pub fn compose_for_device(
        &self,
        device: &Device,
        now: DateTime<Utc>,
    ) -> Result<ComposedLayout, ComposeError> {
        let mut composed = ComposedLayout {
            device_external_id: device.external_id.clone(),
            status: device.status,
            pending_sync_version: device.pending_sync_version,
            layout: None,
        };

        // Non-active devices get a bare status document.
        if device.status != DeviceStatus::Active {
            return Ok(composed);
        }

        let layout = match self.resolve_active_layout(device, now)? {
            Some(layout) => layout,
            None => return Ok(composed),
        };

        let mut layer_docs = Vec::new();
        for layer in self.storage.layers_for_layout(layout.id)? {
            if !layer.is_visible {
                continue;
            }
            layer_docs.push(self.compose_layer(device, &layer)?);
        }

        composed.layout = Some(LayoutDocument {
            id: layout.id,
            name: layout.name,
            canvas_width: layout.canvas_width,
            canvas_height: layout.canvas_height,
            orientation: layout.orientation,
            background_type: layout.background_type,
            background_color: layout.background_color,
            background_opacity: layout.background_opacity,
            background_content: layout.background_content,
            layers: layer_docs,
        });
        Ok(composed)
    }

    /// `device.layout_id` wins; otherwise the highest-priority
    /// schedule-active assignment.
    fn resolve_active_layout(
        &self,
        device: &Device,
        now: DateTime<Utc>,
    ) -> Result<Option<Layout>, ComposeError> {
        if let Some(layout_id) = device.layout_id {
            if let Some(layout) = self.storage.get_layout(layout_id)? {
                return Ok(Some(layout));
            }
        }
        for assignment in self.storage.device_layouts(device.id)? {
            if !assignment.is_active_at(now) {
                continue;
            }
            if let Some(layout) = self.storage.get_layout(assignment.layout_id)? {
                return Ok(Some(layout));
            }
        }
        Ok(None)
    }

    fn compose_layer(&self, device: &Device, layer: &Layer) -> Result<LayerDocument, ComposeError> {
        let mut doc = LayerDocument {
            id: layer.id,
            name: layer.name.clone(),
            layer_type: layer.layer_type,
            x: layer.x,
            y: layer.y,
            width: layer.width,
            height: layer.height,
            z_index: layer.z_index,
            opacity: layer.opacity,
            background_type: layer.background_type,
            background_color: layer.background_color.clone(),
            content_source: layer.content_source,
            is_primary: layer.is_primary,
            content_config: layer.content_config.clone(),
            playlist: None,
            items: Vec::new(),
            override_content: None,
            trigger_playlists: Vec::new(),
        };

        match layer.content_source {
            ContentSource::Playlist => {
                if let Some(playlist_id) = layer.playlist_id {
                    if let Some(playlist) = self.storage.get_playlist(playlist_id)? {
                        doc.items = self.resolve_items(playlist_id)?;
                        doc.playlist = Some(PlaylistRef {
                            id: playlist.id,
                            name: playlist.name,
                        });
                    }
                }
            }
            ContentSource::Static => {
                doc.override_content = self
                    .storage
                    .get_layer_override(device.id, layer.id)?
                    .map(override_document);
            }
            ContentSource::None | ContentSource::Widget => {}
        }

        for trigger in self.storage.layer_triggers(device.id, layer.id)? {
            let Some(playlist) = self.storage.get_playlist(trigger.playlist_id)? else {
                continue;
            };
            doc.trigger_playlists.push(TriggerPlaylistDocument {
                id: trigger.id,
                playlist_id: trigger.playlist_id,
                playlist_name: playlist.name,
                trigger_type: trigger.trigger_type,
                priority: trigger.priority,
                items: self.resolve_items(trigger.playlist_id)?,
            });
        }

        Ok(doc)
    }

    /// Playlist items with resolved URLs and effective durations. Items
    /// whose content row is gone are dropped.
    fn resolve_items(&self, playlist_id: Uuid) -> Result<Vec<ItemDocument>, ComposeError> {
        let mut docs = Vec::new();
        for item in self.storage.playlist_items(playlist_id)? {
            let Some(content) = self.storage.get_content(item.content.content_id())? else {
                continue;
            };
            docs.push(ItemDocument {
                id: item.id,
                content_id: content.id,
                url: content.download_url,
                filename: content.filename,
                content_type: content.mime_type,
                duration: item
                    .duration_override
                    .or(content.duration)
                    .unwrap_or(DEFAULT_IMAGE_DURATION),
                order: item.position,
            });
        }
        Ok(docs)
    }
}

fn override_document(row: DeviceLayerOverride) -> OverrideDocument {
    match row.content_mode {
        super::LayerContentMode::Static => OverrideDocument::Static {
            static_file_id: row.static_file_id,
            static_file_url: row.static_file_url,
            pdf_page_duration: row.pdf_page_duration,
        },
        super::LayerContentMode::Playlist => OverrideDocument::Playlist {},
        super::LayerContentMode::Ticker => OverrideDocument::Ticker {
            ticker_items: row.ticker_items.unwrap_or_default(),
            ticker_speed: row.ticker_speed,
            ticker_direction: row.ticker_direction,
        },
    }
}
