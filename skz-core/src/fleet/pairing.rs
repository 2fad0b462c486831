// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Two-phase device pairing.
//!
//! The device requests a 6-digit code; an operator enters it together
//! with the tenant and required store metadata; the device polls until it
//! observes the bind. Codes are single-use and expire after the
//! configured TTL.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use tracing::info;
use uuid::Uuid;

use super::device::{Device, DeviceMode, DeviceStatus};
use super::registration::{FleetRegistry, RegistrationRequest};
use super::FleetError;
use crate::storage::{PairingCodeRow, Storage, StorageError};
use crate::tenant::Tenant;

/// Abstract pairing-code store: short-lived `code → hardware_id`
/// bindings with TTL semantics.
pub trait PairingStore {
    fn put(
        &self,
        code: &str,
        hardware_id: &str,
        ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError>;

    /// Returns the bound hardware id when the code exists and is live.
    fn get(&self, code: &str, now: DateTime<Utc>) -> Result<Option<String>, StorageError>;

    fn delete(&self, code: &str) -> Result<(), StorageError>;
}

/// The default store: the `pairing_codes` table, shared across replicas.
pub struct SqlitePairingStore<'a> {
    storage: &'a Storage,
}

impl<'a> SqlitePairingStore<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        SqlitePairingStore { storage }
    }
}

impl PairingStore for SqlitePairingStore<'_> {
    fn put(
        &self,
        code: &str,
        hardware_id: &str,
        ttl: std::time::Duration,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.storage.put_pairing_code(&PairingCodeRow {
            code: code.to_string(),
            hardware_id: hardware_id.to_string(),
            created_at: now,
            expires_at: now + Duration::seconds(ttl.as_secs() as i64),
        })
    }

    fn get(&self, code: &str, now: DateTime<Utc>) -> Result<Option<String>, StorageError> {
        Ok(self
            .storage
            .get_pairing_code(code, now)?
            .map(|row| row.hardware_id))
    }

    fn delete(&self, code: &str) -> Result<(), StorageError> {
        self.storage.delete_pairing_code(code)
    }
}

/// An issued pairing code.
#[derive(Debug, Clone, serde::Serialize)]
pub struct IssuedPairingCode {
    pub pairing_code: String,
    pub hardware_id: String,
    pub expires_in: u64,
}

/// Device-visible pairing state.
#[derive(Debug, Clone, serde::Serialize)]
pub struct PairingStatus {
    pub paired: bool,
    pub external_id: String,
    pub tenant_id: Option<Uuid>,
    pub status: DeviceStatus,
}

/// Pairing workflow over a [`PairingStore`].
pub struct PairingService<'a> {
    storage: &'a Storage,
    codes: &'a dyn PairingStore,
    ttl: std::time::Duration,
}

impl<'a> PairingService<'a> {
    pub fn new(storage: &'a Storage, codes: &'a dyn PairingStore, ttl: std::time::Duration) -> Self {
        PairingService { storage, codes, ttl }
    }

    /// Issues a pairing code for a device, implicitly registering an
    /// unknown `hardware_id` as a pending direct-mode device.
    pub fn request_code(
        &self,
        hardware_id: &str,
        ip: Option<&str>,
    ) -> Result<IssuedPairingCode, FleetError> {
        let registry = FleetRegistry::new(self.storage);
        registry.register_device(RegistrationRequest {
            hardware_id: hardware_id.to_string(),
            mode: DeviceMode::Direct,
            hub_id: None,
            ip: ip.map(str::to_string),
            name: None,
        })?;

        let now = Utc::now();
        let mut rng = rand::thread_rng();
        // Re-roll on the off chance the code is already live for another
        // device.
        let code = loop {
            let candidate = format!("{:06}", rng.gen_range(100_000..=999_999));
            match self.codes.get(&candidate, now)? {
                Some(_) => continue,
                None => break candidate,
            }
        };
        self.codes.put(&code, hardware_id, self.ttl, now)?;

        Ok(IssuedPairingCode {
            pairing_code: code,
            hardware_id: hardware_id.to_string(),
            expires_in: self.ttl.as_secs(),
        })
    }

    /// Device poll: has an operator bound us yet?
    pub fn status(&self, hardware_id: &str) -> Result<PairingStatus, FleetError> {
        let device = self
            .storage
            .get_device_by_hardware_id(hardware_id)?
            .ok_or_else(|| FleetError::DeviceNotFound(hardware_id.to_string()))?;
        Ok(PairingStatus {
            paired: device.tenant_id.is_some(),
            external_id: device.external_id,
            tenant_id: device.tenant_id,
            status: device.status,
        })
    }

    /// Operator verification: consume the code and bind the device to the
    /// tenant. `store_name` and `store_address` are required metadata.
    pub fn verify(
        &self,
        code: &str,
        tenant_id: Uuid,
        store_name: &str,
        store_address: &str,
    ) -> Result<(Device, Tenant), FleetError> {
        if store_name.trim().is_empty() {
            return Err(FleetError::InvalidInput("store_name is required".into()));
        }
        if store_address.trim().is_empty() {
            return Err(FleetError::InvalidInput("store_address is required".into()));
        }

        let now = Utc::now();
        let hardware_id = self
            .codes
            .get(code, now)?
            .ok_or_else(|| FleetError::InvalidInput("invalid or expired pairing code".into()))?;

        let device = self
            .storage
            .get_device_by_hardware_id(&hardware_id)?
            .ok_or(FleetError::DeviceNotFound(hardware_id))?;
        let tenant = self
            .storage
            .get_tenant(tenant_id)?
            .ok_or(FleetError::TenantNotFound(tenant_id))?;

        self.storage.in_transaction(|s| {
            s.bind_device_to_tenant(device.id, tenant_id, store_name, store_address)
        })?;
        self.codes.delete(code)?;

        let device = self
            .storage
            .get_device(device.id)?
            .ok_or_else(|| FleetError::DeviceNotFound(device.id.to_string()))?;
        info!(external_id = %device.external_id, tenant = %tenant.slug, "device paired");
        Ok((device, tenant))
    }
}
