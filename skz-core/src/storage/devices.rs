// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Device storage operations, including the external-id counter pools.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::fleet::{Device, DeviceMode, DeviceStatus};

const DEVICE_COLUMNS: &str = "id, external_id, hardware_id, tenant_id, hub_id, mode, status, \
                              name, store_name, store_address, ip, last_seen, layout_id, \
                              pending_sync_version, created_at";

impl Storage {
    pub fn create_device(&self, device: &Device) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO devices (id, external_id, hardware_id, tenant_id, hub_id, mode, \
             status, name, store_name, store_address, ip, last_seen, layout_id, \
             pending_sync_version, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                device.id.to_string(),
                device.external_id,
                device.hardware_id,
                device.tenant_id.map(|t| t.to_string()),
                device.hub_id.map(|h| h.to_string()),
                device.mode.as_str(),
                device.status.as_str(),
                device.name,
                device.store_name,
                device.store_address,
                device.ip,
                to_db_ts_opt(device.last_seen),
                device.layout_id.map(|l| l.to_string()),
                device.pending_sync_version,
                to_db_ts(device.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "device hardware id '{}'",
                        device.hardware_id
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    pub fn get_device(&self, id: Uuid) -> Result<Option<Device>, StorageError> {
        self.device_query(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE id = ?1"),
            params![id.to_string()],
        )
    }

    pub fn get_device_by_hardware_id(
        &self,
        hardware_id: &str,
    ) -> Result<Option<Device>, StorageError> {
        self.device_query(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE hardware_id = ?1"),
            params![hardware_id],
        )
    }

    pub fn get_device_by_external_id(
        &self,
        external_id: &str,
    ) -> Result<Option<Device>, StorageError> {
        self.device_query(
            &format!("SELECT {DEVICE_COLUMNS} FROM devices WHERE external_id = ?1"),
            params![external_id],
        )
    }

    pub fn list_devices(&self, tenant_id: Option<Uuid>) -> Result<Vec<Device>, StorageError> {
        match tenant_id {
            Some(tenant) => {
                let mut stmt = self.conn().prepare(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices WHERE tenant_id = ?1 \
                     ORDER BY external_id"
                ))?;
                let rows = stmt.query_map(params![tenant.to_string()], row_to_device)?;
                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(StorageError::Database)
            }
            None => {
                let mut stmt = self.conn().prepare(&format!(
                    "SELECT {DEVICE_COLUMNS} FROM devices ORDER BY external_id"
                ))?;
                let rows = stmt.query_map([], row_to_device)?;
                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(StorageError::Database)
            }
        }
    }

    /// Reserves the next external-id number for a pool (`direct` or
    /// `hub:<hub_id>`). Callers run this inside the registration
    /// transaction so concurrent registrations cannot mint the same id.
    pub fn reserve_external_id_number(&self, pool: &str) -> Result<u32, StorageError> {
        self.conn().execute(
            "INSERT INTO device_id_counters (pool, next_value) VALUES (?1, 1)
             ON CONFLICT(pool) DO UPDATE SET next_value = next_value + 1",
            params![pool],
        )?;
        let value: i64 = self.conn().query_row(
            "SELECT next_value FROM device_id_counters WHERE pool = ?1",
            params![pool],
            |row| row.get(0),
        )?;
        Ok(value as u32)
    }

    /// Registration touch: refresh `ip` (when provided) and `last_seen`.
    pub fn touch_device_registration(
        &self,
        id: Uuid,
        ip: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET ip = COALESCE(?1, ip), last_seen = ?2 WHERE id = ?3",
            params![ip, to_db_ts(at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    pub fn set_device_status(&self, id: Uuid, status: DeviceStatus) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    pub fn set_device_last_seen(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET last_seen = ?1 WHERE id = ?2",
            params![to_db_ts(at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    /// Pairing bind: attach the device to a tenant, record the operator-
    /// collected store metadata, and activate it.
    pub fn bind_device_to_tenant(
        &self,
        id: Uuid,
        tenant_id: Uuid,
        store_name: &str,
        store_address: &str,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET tenant_id = ?1, store_name = ?2, store_address = ?3, \
             status = 'active' WHERE id = ?4",
            params![tenant_id.to_string(), store_name, store_address, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    pub fn set_device_layout(&self, id: Uuid, layout_id: Option<Uuid>) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET layout_id = ?1 WHERE id = ?2",
            params![layout_id.map(|l| l.to_string()), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    pub fn set_device_name(&self, id: Uuid, name: Option<&str>) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET name = ?1 WHERE id = ?2",
            params![name, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        Ok(())
    }

    /// Bumps the device's monotonic change counter and returns the new
    /// value.
    pub fn bump_pending_sync_version(&self, id: Uuid) -> Result<i64, StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET pending_sync_version = pending_sync_version + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("device {id}")));
        }
        let value: i64 = self.conn().query_row(
            "SELECT pending_sync_version FROM devices WHERE id = ?1",
            params![id.to_string()],
            |row| row.get(0),
        )?;
        Ok(value)
    }

    /// Marks active devices unseen since `cutoff` as offline. Returns how
    /// many rows changed.
    pub fn mark_stale_devices_offline(
        &self,
        cutoff: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let updated = self.conn().execute(
            "UPDATE devices SET status = 'offline' \
             WHERE status = 'active' AND last_seen IS NOT NULL AND last_seen < ?1",
            params![to_db_ts(cutoff)],
        )?;
        Ok(updated)
    }

    fn device_query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Device>, StorageError> {
        let result = self.conn().query_row(sql, params, row_to_device);
        match result {
            Ok(device) => Ok(Some(device)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }
}

fn row_to_device(row: &rusqlite::Row<'_>) -> rusqlite::Result<Device> {
    let mode_str: String = row.get(5)?;
    let status_str: String = row.get(6)?;
    Ok(Device {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        external_id: row.get(1)?,
        hardware_id: row.get(2)?,
        tenant_id: row
            .get::<_, Option<String>>(3)?
            .map(parse_uuid)
            .transpose()?,
        hub_id: row
            .get::<_, Option<String>>(4)?
            .map(parse_uuid)
            .transpose()?,
        mode: DeviceMode::parse(&mode_str).unwrap_or(DeviceMode::Direct),
        status: DeviceStatus::parse(&status_str).unwrap_or(DeviceStatus::Error),
        name: row.get(7)?,
        store_name: row.get(8)?,
        store_address: row.get(9)?,
        ip: row.get(10)?,
        last_seen: from_db_ts_opt(row.get(11)?),
        layout_id: row
            .get::<_, Option<String>>(12)?
            .map(parse_uuid)
            .transpose()?,
        pending_sync_version: row.get(13)?,
        created_at: from_db_ts(row.get(14)?),
    })
}
