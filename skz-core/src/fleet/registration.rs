// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hub and device registration.
//!
//! Device registration is idempotent on `hardware_id`; external ids are
//! minted from transactional counter pools so concurrent registrations
//! never collide.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use super::device::{direct_external_id, hub_external_id, Device, DeviceMode, DeviceStatus};
use super::hub::{is_valid_hub_code, mint_api_token, Hub, HubStatus};
use super::FleetError;
use crate::storage::Storage;

/// Device registration request.
#[derive(Debug, Clone)]
pub struct RegistrationRequest {
    pub hardware_id: String,
    pub mode: DeviceMode,
    pub hub_id: Option<Uuid>,
    pub ip: Option<String>,
    pub name: Option<String>,
}

/// Hub registration request.
#[derive(Debug, Clone)]
pub struct NewHub {
    pub code: String,
    pub name: String,
    pub tenant_id: Uuid,
    pub ip: Option<String>,
    pub mac: Option<String>,
    pub hostname: Option<String>,
}

/// Fleet identity operations.
pub struct FleetRegistry<'a> {
    storage: &'a Storage,
}

impl<'a> FleetRegistry<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        FleetRegistry { storage }
    }

    /// Registers a device, or returns the existing one for its
    /// `hardware_id` with `ip`/`last_seen` refreshed. The boolean is true
    /// when a new device row was created.
    pub fn register_device(
        &self,
        request: RegistrationRequest,
    ) -> Result<(Device, bool), FleetError> {
        if request.hardware_id.trim().is_empty() {
            return Err(FleetError::InvalidInput("hardware_id is required".into()));
        }
        if request.hardware_id.len() > 100 {
            return Err(FleetError::InvalidInput(
                "hardware_id must be at most 100 characters".into(),
            ));
        }

        if let Some(existing) = self.storage.get_device_by_hardware_id(&request.hardware_id)? {
            self.storage.touch_device_registration(
                existing.id,
                request.ip.as_deref(),
                Utc::now(),
            )?;
            let refreshed = self
                .storage
                .get_device(existing.id)?
                .ok_or(FleetError::DeviceNotFound(request.hardware_id.clone()))?;
            return Ok((refreshed, false));
        }

        let (hub, pool) = match request.mode {
            DeviceMode::Direct => (None, "direct".to_string()),
            DeviceMode::Hub => {
                let hub_id = request.hub_id.ok_or_else(|| {
                    FleetError::InvalidInput("hub_id is required for hub mode".into())
                })?;
                let hub = self
                    .storage
                    .get_hub(hub_id)?
                    .ok_or(FleetError::HubNotFound(hub_id))?;
                (Some(hub), format!("hub:{hub_id}"))
            }
        };

        let device = self.storage.in_transaction(|s| {
            let n = s.reserve_external_id_number(&pool)?;
            let external_id = match &hub {
                Some(hub) => hub_external_id(&hub.code, n),
                None => direct_external_id(n),
            };
            let device = Device {
                id: Uuid::new_v4(),
                external_id,
                hardware_id: request.hardware_id.clone(),
                tenant_id: hub.as_ref().map(|h| h.tenant_id),
                hub_id: hub.as_ref().map(|h| h.id),
                mode: request.mode,
                status: DeviceStatus::Pending,
                name: request.name.clone(),
                store_name: None,
                store_address: None,
                ip: request.ip.clone(),
                last_seen: Some(Utc::now()),
                layout_id: None,
                pending_sync_version: 0,
                created_at: Utc::now(),
            };
            s.create_device(&device)?;
            Ok(device)
        })?;

        info!(
            external_id = %device.external_id,
            mode = device.mode.as_str(),
            "device registered"
        );
        Ok((device, true))
    }

    /// Registers a hub, minting its bearer token. The token is returned
    /// once on the created record.
    pub fn register_hub(&self, request: NewHub) -> Result<Hub, FleetError> {
        if !is_valid_hub_code(&request.code) {
            return Err(FleetError::InvalidInput(format!(
                "hub code '{}' must be 2-4 uppercase letters",
                request.code
            )));
        }
        if request.name.trim().is_empty() {
            return Err(FleetError::InvalidInput("name is required".into()));
        }
        if self.storage.get_tenant(request.tenant_id)?.is_none() {
            return Err(FleetError::TenantNotFound(request.tenant_id));
        }

        let hub = Hub {
            id: Uuid::new_v4(),
            code: request.code,
            name: request.name,
            tenant_id: request.tenant_id,
            status: HubStatus::Pending,
            ip: request.ip,
            mac: request.mac,
            hostname: request.hostname,
            last_heartbeat: None,
            api_token: mint_api_token(),
            created_at: Utc::now(),
        };
        self.storage.create_hub(&hub)?;
        info!(code = %hub.code, "hub registered");
        Ok(hub)
    }

    /// Operator approval: `pending → active`.
    pub fn approve_hub(&self, hub_id: Uuid) -> Result<Hub, FleetError> {
        let hub = self
            .storage
            .get_hub(hub_id)?
            .ok_or(FleetError::HubNotFound(hub_id))?;
        if hub.status == HubStatus::Inactive {
            return Err(FleetError::InvalidInput(
                "an inactive hub cannot be approved".into(),
            ));
        }
        self.storage.set_hub_status(hub_id, HubStatus::Active)?;
        self.storage
            .get_hub(hub_id)?
            .ok_or(FleetError::HubNotFound(hub_id))
    }

    /// Soft disable.
    pub fn disable_hub(&self, hub_id: Uuid) -> Result<(), FleetError> {
        if self.storage.get_hub(hub_id)?.is_none() {
            return Err(FleetError::HubNotFound(hub_id));
        }
        self.storage.set_hub_status(hub_id, HubStatus::Inactive)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tenant::Tenant;

    fn seeded() -> (Storage, Uuid) {
        let storage = Storage::in_memory().unwrap();
        let tenant_id = Uuid::new_v4();
        storage
            .create_tenant(&Tenant {
                id: tenant_id,
                slug: "fleet".into(),
                name: "Fleet".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        (storage, tenant_id)
    }

    fn direct_request(hardware_id: &str) -> RegistrationRequest {
        RegistrationRequest {
            hardware_id: hardware_id.into(),
            mode: DeviceMode::Direct,
            hub_id: None,
            ip: Some("10.1.1.1".into()),
            name: None,
        }
    }

    #[test]
    fn registration_is_idempotent_on_hardware_id() {
        let (storage, _) = seeded();
        let registry = FleetRegistry::new(&storage);

        let (first, created) = registry.register_device(direct_request("hw-1")).unwrap();
        assert!(created);
        assert_eq!(first.external_id, "SKZ-D-0001");
        assert_eq!(first.status, DeviceStatus::Pending);

        let mut again = direct_request("hw-1");
        again.ip = Some("10.1.1.99".into());
        let (second, created) = registry.register_device(again).unwrap();
        assert!(!created);
        assert_eq!(second.id, first.id);
        assert_eq!(second.external_id, "SKZ-D-0001");
        assert_eq!(second.ip.as_deref(), Some("10.1.1.99"));

        // The counter did not advance for the repeat registration.
        let (third, _) = registry.register_device(direct_request("hw-2")).unwrap();
        assert_eq!(third.external_id, "SKZ-D-0002");
    }

    #[test]
    fn hub_mode_devices_use_the_hub_pool_and_tenant() {
        let (storage, tenant_id) = seeded();
        let registry = FleetRegistry::new(&storage);
        let hub = registry
            .register_hub(NewHub {
                code: "WM".into(),
                name: "Westfield".into(),
                tenant_id,
                ip: None,
                mac: None,
                hostname: None,
            })
            .unwrap();

        let request = |hw: &str| RegistrationRequest {
            hardware_id: hw.into(),
            mode: DeviceMode::Hub,
            hub_id: Some(hub.id),
            ip: None,
            name: None,
        };
        let (a, _) = registry.register_device(request("hw-h1")).unwrap();
        let (b, _) = registry.register_device(request("hw-h2")).unwrap();
        assert_eq!(a.external_id, "SKZ-H-WM-0001");
        assert_eq!(b.external_id, "SKZ-H-WM-0002");
        assert_eq!(a.tenant_id, Some(tenant_id));
        assert_eq!(a.hub_id, Some(hub.id));

        // The direct pool is untouched.
        let (c, _) = registry.register_device(direct_request("hw-d")).unwrap();
        assert_eq!(c.external_id, "SKZ-D-0001");
    }

    #[test]
    fn hub_mode_requires_a_known_hub() {
        let (storage, _) = seeded();
        let registry = FleetRegistry::new(&storage);

        let err = registry
            .register_device(RegistrationRequest {
                hardware_id: "hw-x".into(),
                mode: DeviceMode::Hub,
                hub_id: None,
                ip: None,
                name: None,
            })
            .unwrap_err();
        assert!(matches!(err, FleetError::InvalidInput(_)));

        let err = registry
            .register_device(RegistrationRequest {
                hardware_id: "hw-x".into(),
                mode: DeviceMode::Hub,
                hub_id: Some(Uuid::new_v4()),
                ip: None,
                name: None,
            })
            .unwrap_err();
        assert!(matches!(err, FleetError::HubNotFound(_)));
    }

    #[test]
    fn hub_approval_lifecycle() {
        let (storage, tenant_id) = seeded();
        let registry = FleetRegistry::new(&storage);
        let hub = registry
            .register_hub(NewHub {
                code: "AB".into(),
                name: "Arcade".into(),
                tenant_id,
                ip: None,
                mac: None,
                hostname: None,
            })
            .unwrap();
        assert_eq!(hub.status, HubStatus::Pending);
        assert!(!hub.api_token.is_empty());

        let approved = registry.approve_hub(hub.id).unwrap();
        assert_eq!(approved.status, HubStatus::Active);

        registry.disable_hub(hub.id).unwrap();
        let err = registry.approve_hub(hub.id).unwrap_err();
        assert!(matches!(err, FleetError::InvalidInput(_)));
    }

    #[test]
    fn bad_hub_codes_rejected() {
        let (storage, tenant_id) = seeded();
        let registry = FleetRegistry::new(&storage);
        for code in ["a", "TOOLONG", "w1", ""] {
            let err = registry
                .register_hub(NewHub {
                    code: code.into(),
                    name: "X".into(),
                    tenant_id,
                    ip: None,
                    mac: None,
                    hostname: None,
                })
                .unwrap_err();
            assert!(matches!(err, FleetError::InvalidInput(_)), "code {code}");
        }
    }
}
