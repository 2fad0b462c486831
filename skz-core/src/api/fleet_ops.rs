// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Fleet operations on the facade: registration, pairing, heartbeats,
//! assignments, remote commands.

use chrono::Utc;
use uuid::Uuid;

use super::central::CentralHub;
use super::error::{CoreError, CoreResult};
use crate::fleet::{
    process_heartbeats, Device, HeartbeatItem, HeartbeatSummary, Hub, IssuedPairingCode,
    NewHub, PairingService, PairingStatus, RegistrationRequest, RemoteCommand,
    SqlitePairingStore,
};
use crate::playlist::{AssignmentTrigger, DevicePlaylistAssignment};
use crate::tenant::Tenant;

impl CentralHub {
    // === Tenants ===

    pub fn create_tenant(&self, slug: &str, name: &str) -> CoreResult<Tenant> {
        if !crate::tenant::is_valid_slug(slug) {
            return Err(CoreError::InvalidInput(format!(
                "tenant slug '{slug}' must be lowercase [a-z0-9-]+"
            )));
        }
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("name is required".into()));
        }
        let tenant = Tenant {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.storage().create_tenant(&tenant)?;
        Ok(tenant)
    }

    pub fn get_tenant(&self, tenant_id: Uuid) -> CoreResult<Tenant> {
        self.storage()
            .get_tenant(tenant_id)?
            .ok_or_else(|| CoreError::NotFound(format!("tenant {tenant_id}")))
    }

    // === Registration ===

    /// Idempotent device registration. The boolean is true when a new
    /// device was created.
    pub fn register_device(&self, request: RegistrationRequest) -> CoreResult<(Device, bool)> {
        Ok(self.fleet().register_device(request)?)
    }

    pub fn register_hub(&self, request: NewHub) -> CoreResult<Hub> {
        Ok(self.fleet().register_hub(request)?)
    }

    pub fn approve_hub(&self, hub_id: Uuid) -> CoreResult<Hub> {
        Ok(self.fleet().approve_hub(hub_id)?)
    }

    pub fn disable_hub(&self, hub_id: Uuid) -> CoreResult<()> {
        Ok(self.fleet().disable_hub(hub_id)?)
    }

    pub fn list_hubs(&self, tenant_id: Option<Uuid>) -> CoreResult<Vec<Hub>> {
        Ok(self.storage().list_hubs(tenant_id)?)
    }

    /// Operator edit of hub details (name, network identifiers).
    pub fn update_hub(
        &self,
        hub_id: Uuid,
        name: &str,
        ip: Option<&str>,
        mac: Option<&str>,
        hostname: Option<&str>,
    ) -> CoreResult<Hub> {
        if name.trim().is_empty() {
            return Err(CoreError::InvalidInput("name is required".into()));
        }
        self.storage()
            .update_hub_details(hub_id, name, ip, mac, hostname)?;
        self.storage()
            .get_hub(hub_id)?
            .ok_or_else(|| CoreError::NotFound(format!("hub {hub_id}")))
    }

    /// Operator edit of a device's display name.
    pub fn rename_device(&self, device_id: Uuid, name: Option<&str>) -> CoreResult<Device> {
        self.storage().set_device_name(device_id, name)?;
        self.get_device(device_id)
    }

    pub fn list_devices(&self, tenant_id: Option<Uuid>) -> CoreResult<Vec<Device>> {
        Ok(self.storage().list_devices(tenant_id)?)
    }

    pub fn get_device(&self, device_id: Uuid) -> CoreResult<Device> {
        self.storage()
            .get_device(device_id)?
            .ok_or_else(|| CoreError::NotFound(format!("device {device_id}")))
    }

    /// Authenticates a hub bearer token, returning the hub.
    pub fn authenticate_hub(&self, api_token: &str) -> CoreResult<Hub> {
        self.storage()
            .get_hub_by_token(api_token)?
            .ok_or_else(|| CoreError::NotFound("unknown hub token".into()))
    }

    // === Pairing ===

    pub fn request_pairing_code(
        &self,
        hardware_id: &str,
        ip: Option<&str>,
    ) -> CoreResult<IssuedPairingCode> {
        let codes = SqlitePairingStore::new(self.storage());
        let service = PairingService::new(
            self.storage(),
            &codes,
            self.config().pairing_code_ttl,
        );
        Ok(service.request_code(hardware_id, ip)?)
    }

    pub fn pairing_status(&self, hardware_id: &str) -> CoreResult<PairingStatus> {
        let codes = SqlitePairingStore::new(self.storage());
        let service = PairingService::new(
            self.storage(),
            &codes,
            self.config().pairing_code_ttl,
        );
        Ok(service.status(hardware_id)?)
    }

    pub fn verify_pairing(
        &self,
        code: &str,
        tenant_id: Uuid,
        store_name: &str,
        store_address: &str,
    ) -> CoreResult<(Device, Tenant)> {
        let codes = SqlitePairingStore::new(self.storage());
        let service = PairingService::new(
            self.storage(),
            &codes,
            self.config().pairing_code_ttl,
        );
        Ok(service.verify(code, tenant_id, store_name, store_address)?)
    }

    // === Heartbeats ===

    pub fn ingest_heartbeats(
        &self,
        hub_ref: &str,
        items: &[HeartbeatItem],
    ) -> CoreResult<HeartbeatSummary> {
        Ok(process_heartbeats(self.storage(), hub_ref, items)?)
    }

    // === Playlist assignments ===

    /// Creates an assignment. Default-trigger assignments start enabled;
    /// everything else starts disabled.
    pub fn assign_playlist(
        &self,
        device_id: Uuid,
        playlist_id: Uuid,
        trigger_type: AssignmentTrigger,
        priority: i32,
    ) -> CoreResult<DevicePlaylistAssignment> {
        if self.storage().get_device(device_id)?.is_none() {
            return Err(CoreError::NotFound(format!("device {device_id}")));
        }
        if self.storage().get_playlist(playlist_id)?.is_none() {
            return Err(CoreError::NotFound(format!("playlist {playlist_id}")));
        }

        let assignment = DevicePlaylistAssignment {
            id: Uuid::new_v4(),
            device_id,
            playlist_id,
            trigger_type,
            priority,
            is_enabled: trigger_type == AssignmentTrigger::Default,
            start_at: None,
            end_at: None,
            created_at: Utc::now(),
        };
        self.storage().create_assignment(&assignment)?;
        self.sync().mark_device_dirty(device_id)?;
        Ok(assignment)
    }

    /// Flips an assignment's enabled flag; returns the new value.
    pub fn toggle_assignment(&self, assignment_id: Uuid) -> CoreResult<bool> {
        let assignment = self
            .storage()
            .get_assignment(assignment_id)?
            .ok_or_else(|| CoreError::NotFound(format!("assignment {assignment_id}")))?;
        let enabled = self.storage().toggle_assignment(assignment_id)?;
        self.sync().mark_device_dirty(assignment.device_id)?;
        Ok(enabled)
    }

    /// Unassign is a hard delete.
    pub fn unassign_playlist(&self, assignment_id: Uuid) -> CoreResult<()> {
        let assignment = self
            .storage()
            .get_assignment(assignment_id)?
            .ok_or_else(|| CoreError::NotFound(format!("assignment {assignment_id}")))?;
        self.storage().delete_assignment(assignment_id)?;
        self.sync().mark_device_dirty(assignment.device_id)?;
        Ok(())
    }

    pub fn device_assignments(
        &self,
        device_id: Uuid,
    ) -> CoreResult<Vec<DevicePlaylistAssignment>> {
        Ok(self.storage().assignments_for_device(device_id)?)
    }

    // === Remote commands ===

    /// Proxies a command to the device's local agent.
    pub async fn send_remote_command(
        &self,
        device_id: Uuid,
        command: RemoteCommand,
    ) -> CoreResult<serde_json::Value> {
        let device = self.get_device(device_id)?;
        Ok(self.agent().send_command(&device, command).await?)
    }
}
