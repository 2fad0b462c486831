// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Batched heartbeat ingestion from hubs.
//!
//! A batch applies atomically: every valid item's update plus the hub's
//! own `last_heartbeat` stamp commit together. Item-level validation
//! failures are reported without aborting the batch.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::device::DeviceStatus;
use super::FleetError;
use crate::storage::Storage;

/// One device ping inside a hub batch.
#[derive(Debug, Clone, Deserialize)]
pub struct HeartbeatItem {
    pub device_external_id: String,
    /// Optional status override; only `active`, `offline`, and `error`
    /// are accepted.
    pub status: Option<String>,
    /// RFC 3339; defaults to the receive time.
    pub timestamp: Option<String>,
}

/// Batch outcome.
#[derive(Debug, Clone, Serialize)]
pub struct HeartbeatSummary {
    pub processed: usize,
    pub errors: Vec<String>,
    pub hub_last_heartbeat: DateTime<Utc>,
}

/// Applies a heartbeat batch for a hub (referenced by id or code).
pub fn process_heartbeats(
    storage: &Storage,
    hub_ref: &str,
    items: &[HeartbeatItem],
) -> Result<HeartbeatSummary, FleetError> {
    let hub = match uuid::Uuid::parse_str(hub_ref) {
        Ok(id) => storage.get_hub(id)?,
        Err(_) => None,
    };
    let hub = match hub {
        Some(hub) => hub,
        None => storage
            .get_hub_by_code(hub_ref)?
            .ok_or_else(|| FleetError::HubNotFoundByRef(hub_ref.to_string()))?,
    };

    let now = Utc::now();
    let mut errors = Vec::new();

    // Validate and resolve first; apply in one transaction.
    struct Update {
        device_id: uuid::Uuid,
        status: Option<DeviceStatus>,
        seen_at: DateTime<Utc>,
    }
    let mut updates = Vec::new();

    for (i, item) in items.iter().enumerate() {
        if item.device_external_id.is_empty() {
            errors.push(format!("heartbeat at index {i} is missing device_external_id"));
            continue;
        }
        let device = match storage.get_device_by_external_id(&item.device_external_id)? {
            Some(device) => device,
            None => {
                errors.push(format!("device {} not found", item.device_external_id));
                continue;
            }
        };

        let seen_at = match &item.timestamp {
            None => now,
            Some(raw) => match DateTime::parse_from_rfc3339(raw) {
                Ok(parsed) => parsed.with_timezone(&Utc),
                Err(_) => {
                    errors.push(format!(
                        "invalid timestamp for device {}",
                        item.device_external_id
                    ));
                    continue;
                }
            },
        };

        let status = match &item.status {
            None => None,
            Some(raw) => match DeviceStatus::parse(raw) {
                Some(s @ (DeviceStatus::Active | DeviceStatus::Offline | DeviceStatus::Error)) => {
                    Some(s)
                }
                _ => {
                    errors.push(format!(
                        "invalid status '{}' for device {}",
                        raw, item.device_external_id
                    ));
                    continue;
                }
            },
        };

        updates.push(Update {
            device_id: device.id,
            status,
            seen_at,
        });
    }

    let processed = updates.len();
    storage.in_transaction(|s| {
        for update in &updates {
            if let Some(status) = update.status {
                s.set_device_status(update.device_id, status)?;
            }
            s.set_device_last_seen(update.device_id, update.seen_at)?;
        }
        s.touch_hub_heartbeat(hub.id, now)
    })?;

    debug!(hub = %hub.code, processed, errors = errors.len(), "heartbeat batch applied");
    Ok(HeartbeatSummary {
        processed,
        errors,
        hub_last_heartbeat: now,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fleet::{FleetRegistry, NewHub, RegistrationRequest};
    use crate::fleet::{Device, DeviceMode};
    use crate::tenant::Tenant;
    use uuid::Uuid;

    fn fixture() -> (Storage, String, Device) {
        let storage = Storage::in_memory().unwrap();
        let tenant_id = Uuid::new_v4();
        storage
            .create_tenant(&Tenant {
                id: tenant_id,
                slug: "hb".into(),
                name: "HB".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        let registry = FleetRegistry::new(&storage);
        let hub = registry
            .register_hub(NewHub {
                code: "HB".into(),
                name: "Hub".into(),
                tenant_id,
                ip: None,
                mac: None,
                hostname: None,
            })
            .unwrap();
        let (device, _) = registry
            .register_device(RegistrationRequest {
                hardware_id: "hw-hb-1".into(),
                mode: DeviceMode::Hub,
                hub_id: Some(hub.id),
                ip: None,
                name: None,
            })
            .unwrap();
        (storage, hub.code, device)
    }

    #[test]
    fn valid_items_apply_and_hub_is_stamped() {
        let (storage, hub_code, device) = fixture();
        let summary = process_heartbeats(
            &storage,
            &hub_code,
            &[HeartbeatItem {
                device_external_id: device.external_id.clone(),
                status: Some("active".into()),
                timestamp: Some("2024-06-15T14:30:00Z".into()),
            }],
        )
        .unwrap();

        assert_eq!(summary.processed, 1);
        assert!(summary.errors.is_empty());

        let fetched = storage.get_device(device.id).unwrap().unwrap();
        assert_eq!(fetched.status, DeviceStatus::Active);
        assert_eq!(
            fetched.last_seen.unwrap().to_rfc3339(),
            "2024-06-15T14:30:00+00:00"
        );

        let hub = storage.get_hub_by_code(&hub_code).unwrap().unwrap();
        assert!(hub.last_heartbeat.is_some());
    }

    #[test]
    fn item_errors_do_not_abort_the_batch() {
        let (storage, hub_code, device) = fixture();
        let summary = process_heartbeats(
            &storage,
            &hub_code,
            &[
                HeartbeatItem {
                    device_external_id: "SKZ-D-9999".into(),
                    status: None,
                    timestamp: None,
                },
                HeartbeatItem {
                    device_external_id: device.external_id.clone(),
                    status: Some("sideways".into()),
                    timestamp: None,
                },
                HeartbeatItem {
                    device_external_id: device.external_id.clone(),
                    status: None,
                    timestamp: Some("not-a-time".into()),
                },
                HeartbeatItem {
                    device_external_id: device.external_id.clone(),
                    status: Some("offline".into()),
                    timestamp: None,
                },
            ],
        )
        .unwrap();

        assert_eq!(summary.processed, 1);
        assert_eq!(summary.errors.len(), 3);
        let fetched = storage.get_device(device.id).unwrap().unwrap();
        assert_eq!(fetched.status, DeviceStatus::Offline);
    }

    #[test]
    fn pending_is_not_an_acceptable_heartbeat_status() {
        let (storage, hub_code, device) = fixture();
        let summary = process_heartbeats(
            &storage,
            &hub_code,
            &[HeartbeatItem {
                device_external_id: device.external_id,
                status: Some("pending".into()),
                timestamp: None,
            }],
        )
        .unwrap();
        assert_eq!(summary.processed, 0);
        assert_eq!(summary.errors.len(), 1);
    }

    #[test]
    fn unknown_hub_is_an_error() {
        let (storage, _, _) = fixture();
        assert!(matches!(
            process_heartbeats(&storage, "ZZ", &[]),
            Err(FleetError::HubNotFoundByRef(_))
        ));
    }
}
