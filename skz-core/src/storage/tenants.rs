// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tenant storage operations.

use rusqlite::params;
use uuid::Uuid;

use super::{from_db_ts, to_db_ts, Storage, StorageError};
use crate::tenant::Tenant;

impl Storage {
    /// Inserts a tenant. Fails with `AlreadyExists` on a slug collision.
    pub fn create_tenant(&self, tenant: &Tenant) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO tenants (id, slug, name, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                tenant.id.to_string(),
                tenant.slug,
                tenant.name,
                to_db_ts(tenant.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "tenant slug '{}'",
                        tenant.slug
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    pub fn get_tenant(&self, id: Uuid) -> Result<Option<Tenant>, StorageError> {
        let result = self.conn().query_row(
            "SELECT id, slug, name, created_at FROM tenants WHERE id = ?1",
            params![id.to_string()],
            row_to_tenant,
        );
        match result {
            Ok(tenant) => Ok(Some(tenant)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn get_tenant_by_slug(&self, slug: &str) -> Result<Option<Tenant>, StorageError> {
        let result = self.conn().query_row(
            "SELECT id, slug, name, created_at FROM tenants WHERE slug = ?1",
            params![slug],
            row_to_tenant,
        );
        match result {
            Ok(tenant) => Ok(Some(tenant)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn list_tenants(&self) -> Result<Vec<Tenant>, StorageError> {
        let mut stmt = self
            .conn()
            .prepare("SELECT id, slug, name, created_at FROM tenants ORDER BY slug")?;
        let rows = stmt.query_map([], row_to_tenant)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }
}

fn row_to_tenant(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tenant> {
    Ok(Tenant {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        slug: row.get(1)?,
        name: row.get(2)?,
        created_at: from_db_ts(row.get(3)?),
    })
}

/// Maps a stored uuid string back to a `Uuid`, surfacing corruption as a
/// conversion error rather than panicking.
pub(crate) fn parse_uuid(s: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&s).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn tenant(slug: &str) -> Tenant {
        Tenant {
            id: Uuid::new_v4(),
            slug: slug.into(),
            name: slug.to_uppercase(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn create_and_fetch_tenant() {
        let storage = Storage::in_memory().unwrap();
        let t = tenant("mall-one");
        storage.create_tenant(&t).unwrap();

        let by_id = storage.get_tenant(t.id).unwrap().unwrap();
        assert_eq!(by_id.slug, "mall-one");

        let by_slug = storage.get_tenant_by_slug("mall-one").unwrap().unwrap();
        assert_eq!(by_slug.id, t.id);

        assert!(storage.get_tenant(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn slug_collision_is_conflict() {
        let storage = Storage::in_memory().unwrap();
        storage.create_tenant(&tenant("dup")).unwrap();
        let err = storage.create_tenant(&tenant("dup")).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }
}
