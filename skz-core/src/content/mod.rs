// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Content metadata.
//!
//! Media storage itself lives outside the control plane; playlists only
//! reference content by id, and composition resolves the download URL and
//! default duration from these rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Metadata for one piece of playable media.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub filename: String,
    pub mime_type: String,
    /// Intrinsic duration in seconds, when known (video). Images fall back
    /// to the composer default.
    pub duration: Option<u32>,
    pub download_url: String,
    pub created_at: DateTime<Utc>,
}

/// A playlist item's content reference, tagged by origin.
///
/// `Local` content was uploaded into this tenant's library; `Catalog`
/// content arrived through catalog sync from a connected network.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum ContentRef {
    Local(Uuid),
    Catalog(Uuid),
}

impl ContentRef {
    pub fn content_id(&self) -> Uuid {
        match self {
            ContentRef::Local(id) | ContentRef::Catalog(id) => *id,
        }
    }

    pub fn kind_str(&self) -> &'static str {
        match self {
            ContentRef::Local(_) => "local",
            ContentRef::Catalog(_) => "catalog",
        }
    }

    pub fn from_parts(kind: &str, id: Uuid) -> Option<Self> {
        match kind {
            "local" => Some(ContentRef::Local(id)),
            "catalog" => Some(ContentRef::Catalog(id)),
            _ => None,
        }
    }
}
