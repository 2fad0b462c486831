// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Hub storage operations.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::fleet::{Hub, HubStatus};

const HUB_COLUMNS: &str = "id, code, name, tenant_id, status, ip, mac, hostname, \
                           last_heartbeat, api_token, created_at";

impl Storage {
    /// Inserts a hub. Fails with `AlreadyExists` on a code collision.
    pub fn create_hub(&self, hub: &Hub) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO hubs (id, code, name, tenant_id, status, ip, mac, hostname, \
             last_heartbeat, api_token, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                hub.id.to_string(),
                hub.code,
                hub.name,
                hub.tenant_id.to_string(),
                hub.status.as_str(),
                hub.ip,
                hub.mac,
                hub.hostname,
                to_db_ts_opt(hub.last_heartbeat),
                hub.api_token,
                to_db_ts(hub.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!("hub code '{}'", hub.code)))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    pub fn get_hub(&self, id: Uuid) -> Result<Option<Hub>, StorageError> {
        self.hub_query(
            &format!("SELECT {HUB_COLUMNS} FROM hubs WHERE id = ?1"),
            params![id.to_string()],
        )
    }

    pub fn get_hub_by_code(&self, code: &str) -> Result<Option<Hub>, StorageError> {
        self.hub_query(
            &format!("SELECT {HUB_COLUMNS} FROM hubs WHERE code = ?1"),
            params![code],
        )
    }

    pub fn get_hub_by_token(&self, api_token: &str) -> Result<Option<Hub>, StorageError> {
        self.hub_query(
            &format!("SELECT {HUB_COLUMNS} FROM hubs WHERE api_token = ?1"),
            params![api_token],
        )
    }

    pub fn list_hubs(&self, tenant_id: Option<Uuid>) -> Result<Vec<Hub>, StorageError> {
        match tenant_id {
            Some(tenant) => {
                let mut stmt = self.conn().prepare(&format!(
                    "SELECT {HUB_COLUMNS} FROM hubs WHERE tenant_id = ?1 ORDER BY code"
                ))?;
                let rows = stmt.query_map(params![tenant.to_string()], row_to_hub)?;
                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(StorageError::Database)
            }
            None => {
                let mut stmt = self
                    .conn()
                    .prepare(&format!("SELECT {HUB_COLUMNS} FROM hubs ORDER BY code"))?;
                let rows = stmt.query_map([], row_to_hub)?;
                rows.collect::<Result<Vec<_>, _>>()
                    .map_err(StorageError::Database)
            }
        }
    }

    pub fn set_hub_status(&self, id: Uuid, status: HubStatus) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE hubs SET status = ?1 WHERE id = ?2",
            params![status.as_str(), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("hub {id}")));
        }
        Ok(())
    }

    /// Updates mutable hub attributes (name, network details).
    pub fn update_hub_details(
        &self,
        id: Uuid,
        name: &str,
        ip: Option<&str>,
        mac: Option<&str>,
        hostname: Option<&str>,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE hubs SET name = ?1, ip = ?2, mac = ?3, hostname = ?4 WHERE id = ?5",
            params![name, ip, mac, hostname, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("hub {id}")));
        }
        Ok(())
    }

    pub fn touch_hub_heartbeat(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE hubs SET last_heartbeat = ?1 WHERE id = ?2",
            params![to_db_ts(at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("hub {id}")));
        }
        Ok(())
    }

    fn hub_query(
        &self,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> Result<Option<Hub>, StorageError> {
        let result = self.conn().query_row(sql, params, row_to_hub);
        match result {
            Ok(hub) => Ok(Some(hub)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }
}

fn row_to_hub(row: &rusqlite::Row<'_>) -> rusqlite::Result<Hub> {
    let status_str: String = row.get(4)?;
    Ok(Hub {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        code: row.get(1)?,
        name: row.get(2)?,
        tenant_id: parse_uuid(row.get::<_, String>(3)?)?,
        status: HubStatus::parse(&status_str).unwrap_or(HubStatus::Inactive),
        ip: row.get(5)?,
        mac: row.get(6)?,
        hostname: row.get(7)?,
        last_heartbeat: from_db_ts_opt(row.get(8)?),
        api_token: row.get(9)?,
        created_at: from_db_ts(row.get(10)?),
    })
}
