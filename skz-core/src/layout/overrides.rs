// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Per-device layer content overrides.
//!
//! One layer of a shared layout can show different content on different
//! devices; the override row for `(device, layer)` decides what.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What an override puts in the layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerContentMode {
    Static,
    Playlist,
    Ticker,
}

impl LayerContentMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerContentMode::Static => "static",
            LayerContentMode::Playlist => "playlist",
            LayerContentMode::Ticker => "ticker",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "static" => Some(LayerContentMode::Static),
            "playlist" => Some(LayerContentMode::Playlist),
            "ticker" => Some(LayerContentMode::Ticker),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickerDirection {
    Left,
    Right,
    Up,
    Down,
}

impl TickerDirection {
    pub fn as_str(&self) -> &'static str {
        match self {
            TickerDirection::Left => "left",
            TickerDirection::Right => "right",
            TickerDirection::Up => "up",
            TickerDirection::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "left" => Some(TickerDirection::Left),
            "right" => Some(TickerDirection::Right),
            "up" => Some(TickerDirection::Up),
            "down" => Some(TickerDirection::Down),
            _ => None,
        }
    }
}

/// The `(device, layer)` content override row.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceLayerOverride {
    pub id: Uuid,
    pub device_id: Uuid,
    pub layer_id: Uuid,
    pub content_mode: LayerContentMode,
    pub static_file_id: Option<Uuid>,
    pub static_file_url: Option<String>,
    /// Seconds per page when the static file is a PDF.
    pub pdf_page_duration: u32,
    pub ticker_items: Option<Vec<String>>,
    pub ticker_speed: u32,
    pub ticker_direction: TickerDirection,
}
