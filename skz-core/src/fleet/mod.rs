// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fleet Module
//!
//! Device and hub identities and their lifecycles: registration, pairing,
//! heartbeats, and the remote-command proxy.

mod agent;
mod device;
mod heartbeat;
mod hub;
mod pairing;
mod registration;

pub use agent::{AgentError, DeviceAgentClient, RemoteCommand};
pub use device::{direct_external_id, hub_external_id, Device, DeviceMode, DeviceStatus};
pub use heartbeat::{process_heartbeats, HeartbeatItem, HeartbeatSummary};
pub use hub::{is_valid_hub_code, mint_api_token, Hub, HubStatus};
pub use pairing::{
    IssuedPairingCode, PairingService, PairingStatus, PairingStore, SqlitePairingStore,
};
pub use registration::{FleetRegistry, NewHub, RegistrationRequest};

use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum FleetError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("hub not found: {0}")]
    HubNotFound(Uuid),

    #[error("hub not found: {0}")]
    HubNotFoundByRef(String),

    #[error("device not found: {0}")]
    DeviceNotFound(String),

    #[error("tenant not found: {0}")]
    TenantNotFound(Uuid),
}
