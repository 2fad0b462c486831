// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device identity types and external-id minting.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a device reaches the central hub.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceMode {
    /// Connects directly to the central service.
    Direct,
    /// Connects through a local hub.
    Hub,
}

impl DeviceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceMode::Direct => "direct",
            DeviceMode::Hub => "hub",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "direct" => Some(DeviceMode::Direct),
            "hub" => Some(DeviceMode::Hub),
            _ => None,
        }
    }
}

/// Device lifecycle status.
///
/// `pending → active` after pairing; `offline` on heartbeat gap; back to
/// `active` on contact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Pending,
    Active,
    Offline,
    Error,
}

impl DeviceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceStatus::Pending => "pending",
            DeviceStatus::Active => "active",
            DeviceStatus::Offline => "offline",
            DeviceStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(DeviceStatus::Pending),
            "active" => Some(DeviceStatus::Active),
            "offline" => Some(DeviceStatus::Offline),
            "error" => Some(DeviceStatus::Error),
            _ => None,
        }
    }
}

/// A screen in the fleet.
#[derive(Debug, Clone, Serialize)]
pub struct Device {
    pub id: Uuid,
    /// Human-readable identifier: `SKZ-D-NNNN` (direct) or
    /// `SKZ-H-<hub code>-NNNN` (hub mode).
    pub external_id: String,
    /// Device-supplied, globally unique; the idempotency key for
    /// registration.
    pub hardware_id: String,
    pub tenant_id: Option<Uuid>,
    pub hub_id: Option<Uuid>,
    pub mode: DeviceMode,
    pub status: DeviceStatus,
    pub name: Option<String>,
    pub store_name: Option<String>,
    pub store_address: Option<String>,
    pub ip: Option<String>,
    pub last_seen: Option<DateTime<Utc>>,
    pub layout_id: Option<Uuid>,
    /// Monotonic counter bumped whenever anything relevant to this device
    /// changes; the edge polls until it has observed the current value.
    pub pending_sync_version: i64,
    pub created_at: DateTime<Utc>,
}

/// Formats a direct-mode external id from a pool counter value.
pub fn direct_external_id(n: u32) -> String {
    format!("SKZ-D-{n:04}")
}

/// Formats a hub-mode external id from the hub code and pool counter value.
pub fn hub_external_id(hub_code: &str, n: u32) -> String {
    format!("SKZ-H-{hub_code}-{n:04}")
}
