// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hub identity and lifecycle types.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Hub lifecycle status.
///
/// `pending → active` by operator approval; `inactive` is a soft disable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HubStatus {
    Pending,
    Active,
    Inactive,
}

impl HubStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HubStatus::Pending => "pending",
            HubStatus::Active => "active",
            HubStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(HubStatus::Pending),
            "active" => Some(HubStatus::Active),
            "inactive" => Some(HubStatus::Inactive),
            _ => None,
        }
    }
}

/// A local aggregator co-located with a set of devices.
#[derive(Debug, Clone, Serialize)]
pub struct Hub {
    pub id: Uuid,
    /// 2-4 uppercase letters, globally unique. Embedded in hub-mode
    /// device external ids.
    pub code: String,
    pub name: String,
    pub tenant_id: Uuid,
    pub status: HubStatus,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub last_heartbeat: Option<DateTime<Utc>>,
    /// Opaque bearer token minted at registration. Never logged.
    #[serde(skip_serializing)]
    pub api_token: String,
    pub created_at: DateTime<Utc>,
}

/// Checks a hub code: 2-4 ASCII uppercase letters.
pub fn is_valid_hub_code(code: &str) -> bool {
    (2..=4).contains(&code.len()) && code.bytes().all(|b| b.is_ascii_uppercase())
}

/// Mints an opaque bearer token: 32 random bytes, URL-safe base64.
pub fn mint_api_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}
