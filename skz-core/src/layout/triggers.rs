// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Trigger-conditional playlists per `(device, layer)`.

use serde::Serialize;
use uuid::Uuid;

use crate::playlist::AssignmentTrigger;

/// Binds a playlist to a layer on one device, selected at runtime when the
/// edge detects the trigger signal. Unique per
/// `(device_id, layer_id, playlist_id)`.
#[derive(Debug, Clone, Serialize)]
pub struct LayerPlaylistTrigger {
    pub id: Uuid,
    pub device_id: Uuid,
    pub layer_id: Uuid,
    pub playlist_id: Uuid,
    pub trigger_type: AssignmentTrigger,
    pub priority: i32,
}
