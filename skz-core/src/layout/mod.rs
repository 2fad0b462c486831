// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Screen layouts: a canvas plus z-ordered layers.

pub mod composer;
mod overrides;
mod triggers;

pub use overrides::{DeviceLayerOverride, LayerContentMode, TickerDirection};
pub use triggers::LayerPlaylistTrigger;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Canvas dimension bounds.
pub const MIN_CANVAS_DIM: i32 = 20;
pub const MAX_CANVAS_DIM: i32 = 10_000;

/// Minimum layer width/height after clamping.
pub const MIN_LAYER_DIM: i32 = 20;

#[derive(Error, Debug)]
pub enum LayoutError {
    #[error("invalid layout: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Orientation {
    Landscape,
    Portrait,
}

impl Orientation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Orientation::Landscape => "landscape",
            Orientation::Portrait => "portrait",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "landscape" => Some(Orientation::Landscape),
            "portrait" => Some(Orientation::Portrait),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundType {
    Solid,
    Transparent,
    Image,
}

impl BackgroundType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackgroundType::Solid => "solid",
            BackgroundType::Transparent => "transparent",
            BackgroundType::Image => "image",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "solid" => Some(BackgroundType::Solid),
            "transparent" => Some(BackgroundType::Transparent),
            "image" => Some(BackgroundType::Image),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerType {
    Content,
    Text,
    Widget,
    Image,
    Ticker,
    Clock,
    Weather,
    Html,
    Shape,
}

impl LayerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LayerType::Content => "content",
            LayerType::Text => "text",
            LayerType::Widget => "widget",
            LayerType::Image => "image",
            LayerType::Ticker => "ticker",
            LayerType::Clock => "clock",
            LayerType::Weather => "weather",
            LayerType::Html => "html",
            LayerType::Shape => "shape",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "content" => Some(LayerType::Content),
            "text" => Some(LayerType::Text),
            "widget" => Some(LayerType::Widget),
            "image" => Some(LayerType::Image),
            "ticker" => Some(LayerType::Ticker),
            "clock" => Some(LayerType::Clock),
            "weather" => Some(LayerType::Weather),
            "html" => Some(LayerType::Html),
            "shape" => Some(LayerType::Shape),
            _ => None,
        }
    }
}

/// Where a layer's pixels come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    None,
    Playlist,
    Static,
    Widget,
}

impl ContentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentSource::None => "none",
            ContentSource::Playlist => "playlist",
            ContentSource::Static => "static",
            ContentSource::Widget => "widget",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "none" => Some(ContentSource::None),
            "playlist" => Some(ContentSource::Playlist),
            "static" => Some(ContentSource::Static),
            "widget" => Some(ContentSource::Widget),
            _ => None,
        }
    }
}

/// A screen program's canvas.
#[derive(Debug, Clone, Serialize)]
pub struct Layout {
    pub id: Uuid,
    pub name: String,
    pub canvas_width: i32,
    pub canvas_height: i32,
    pub orientation: Orientation,
    pub background_type: BackgroundType,
    pub background_color: String,
    pub background_opacity: f64,
    pub background_content: Option<String>,
    pub is_template: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Layout {
    /// Validates canvas geometry and opacity.
    pub fn validate(&self) -> Result<(), LayoutError> {
        for (label, value) in [("width", self.canvas_width), ("height", self.canvas_height)] {
            if !(MIN_CANVAS_DIM..=MAX_CANVAS_DIM).contains(&value) {
                return Err(LayoutError::Invalid(format!(
                    "canvas {label} {value} outside {MIN_CANVAS_DIM}..{MAX_CANVAS_DIM}"
                )));
            }
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            return Err(LayoutError::Invalid(format!(
                "background opacity {} outside 0..1",
                self.background_opacity
            )));
        }
        Ok(())
    }
}

/// One z-ordered region of a layout.
#[derive(Debug, Clone, Serialize)]
pub struct Layer {
    pub id: Uuid,
    pub layout_id: Uuid,
    pub name: String,
    pub layer_type: LayerType,
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    pub z_index: i32,
    pub opacity: f64,
    pub background_type: BackgroundType,
    pub background_color: Option<String>,
    pub is_visible: bool,
    pub is_locked: bool,
    pub content_source: ContentSource,
    pub playlist_id: Option<Uuid>,
    pub content_id: Option<Uuid>,
    pub is_primary: bool,
    pub content_config: Option<serde_json::Value>,
}

/// A layer bounding box, pre- or post-clamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LayerBounds {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
}

/// Constrains a layer's box into the canvas instead of rejecting it.
///
/// The box is first shrunk to fit (never below the 20px minimum, then the
/// canvas if even that does not fit), then shifted fully inside.
pub fn clamp_layer_bounds(
    bounds: LayerBounds,
    canvas_width: i32,
    canvas_height: i32,
) -> LayerBounds {
    let width = bounds.width.max(MIN_LAYER_DIM).min(canvas_width);
    let height = bounds.height.max(MIN_LAYER_DIM).min(canvas_height);
    let x = bounds.x.clamp(0, canvas_width - width);
    let y = bounds.y.clamp(0, canvas_height - height);
    LayerBounds {
        x,
        y,
        width,
        height,
    }
}

/// A scheduled, prioritised layout assignment to one device. Used when a
/// device has no direct `layout_id`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceLayout {
    pub id: Uuid,
    pub device_id: Uuid,
    pub layout_id: Uuid,
    pub priority: i32,
    pub start_at: Option<DateTime<Utc>>,
    pub end_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl DeviceLayout {
    /// Schedule window check with open endpoints.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamp_shrinks_and_shifts_into_canvas() {
        let clamped = clamp_layer_bounds(
            LayerBounds {
                x: 1800,
                y: -50,
                width: 400,
                height: 300,
            },
            1920,
            1080,
        );
        assert_eq!(
            clamped,
            LayerBounds {
                x: 1520,
                y: 0,
                width: 400,
                height: 300
            }
        );
    }

    #[test]
    fn clamp_enforces_minimum_dimension() {
        let clamped = clamp_layer_bounds(
            LayerBounds {
                x: 0,
                y: 0,
                width: 5,
                height: 5,
            },
            1920,
            1080,
        );
        assert_eq!(clamped.width, MIN_LAYER_DIM);
        assert_eq!(clamped.height, MIN_LAYER_DIM);
    }

    #[test]
    fn clamp_caps_oversized_layers_at_canvas() {
        let clamped = clamp_layer_bounds(
            LayerBounds {
                x: 0,
                y: 0,
                width: 4000,
                height: 4000,
            },
            1920,
            1080,
        );
        assert_eq!((clamped.width, clamped.height), (1920, 1080));
        assert_eq!((clamped.x, clamped.y), (0, 0));
    }

    #[test]
    fn canvas_bounds_validated() {
        let mut layout = Layout {
            id: Uuid::new_v4(),
            name: "main".into(),
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
        assert!(layout.validate().is_ok());

        layout.canvas_width = 19;
        assert!(layout.validate().is_err());
        layout.canvas_width = 10_001;
        assert!(layout.validate().is_err());
        layout.canvas_width = 1920;
        layout.background_opacity = 1.5;
        assert!(layout.validate().is_err());
    }
}
