// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Encoding-record storage: missing persons and loyalty members.
//!
//! Vectors are stored as `dim * 4`-byte blobs. Single-record reads reject
//! any other width; the compiler enumeration instead skips bad rows and
//! reports them, so one corrupt record cannot block a compile.

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::catalog::{CaseStatus, FeatureVector, LoyaltyMember, MissingPerson};

const MP_COLUMNS: &str = "id, case_id, name, age_at_disappearance, disappearance_date, \
                          last_known_location, status, feature_vector, pending_photo, \
                          photo_path, created_at, updated_at";

const LM_COLUMNS: &str = "id, tenant_id, member_code, name, email, phone, \
                          assigned_playlist_id, last_seen_at, last_seen_store, \
                          feature_vector, pending_photo, photo_path, created_at, updated_at";

impl Storage {
    // === Missing persons ===

    pub fn create_missing_person(&self, record: &MissingPerson) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO missing_persons (id, case_id, name, age_at_disappearance, \
             disappearance_date, last_known_location, status, feature_vector, \
             pending_photo, photo_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
            params![
                record.id.to_string(),
                record.case_id,
                record.name,
                record.age_at_disappearance,
                record.disappearance_date.map(format_date),
                record.last_known_location,
                record.status.as_str(),
                record.vector.to_bytes(),
                record.pending_photo,
                record.photo_path,
                to_db_ts(record.created_at),
                to_db_ts(record.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "case id '{}'",
                        record.case_id
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    /// Updates the mutable fields of an existing record in place.
    pub fn update_missing_person(&self, record: &MissingPerson) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE missing_persons SET name = ?1, age_at_disappearance = ?2, \
             disappearance_date = ?3, last_known_location = ?4, status = ?5, \
             feature_vector = ?6, pending_photo = ?7, photo_path = ?8, updated_at = ?9
             WHERE id = ?10",
            params![
                record.name,
                record.age_at_disappearance,
                record.disappearance_date.map(format_date),
                record.last_known_location,
                record.status.as_str(),
                record.vector.to_bytes(),
                record.pending_photo,
                record.photo_path,
                to_db_ts(record.updated_at),
                record.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!(
                "missing person {}",
                record.id
            )));
        }
        Ok(())
    }

    pub fn get_missing_person(
        &self,
        id: Uuid,
        dim: usize,
    ) -> Result<Option<MissingPerson>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {MP_COLUMNS} FROM missing_persons WHERE id = ?1"),
            params![id.to_string()],
            |row| row_to_missing_person_raw(row),
        );
        match result {
            Ok(raw) => Ok(Some(raw.into_record(dim)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn get_missing_person_by_case_id(
        &self,
        case_id: &str,
        dim: usize,
    ) -> Result<Option<MissingPerson>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {MP_COLUMNS} FROM missing_persons WHERE case_id = ?1"),
            params![case_id],
            |row| row_to_missing_person_raw(row),
        );
        match result {
            Ok(raw) => Ok(Some(raw.into_record(dim)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn delete_missing_person(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM missing_persons WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("missing person {id}")));
        }
        Ok(())
    }

    /// Compiler enumeration: active records with a real vector, ordered by
    /// `case_id`. Rows whose stored vector has the wrong width are skipped
    /// and their case ids returned alongside.
    pub fn eligible_missing_persons(
        &self,
        dim: usize,
    ) -> Result<(Vec<MissingPerson>, Vec<String>), StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {MP_COLUMNS} FROM missing_persons \
             WHERE status = 'active' AND pending_photo = 0 ORDER BY case_id"
        ))?;
        let rows = stmt.query_map([], row_to_missing_person_raw)?;

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for raw in rows {
            let raw = raw?;
            let case_id = raw.case_id.clone();
            match raw.into_record(dim) {
                Ok(record) => records.push(record),
                Err(_) => skipped.push(case_id),
            }
        }
        Ok((records, skipped))
    }

    // === Loyalty members ===

    pub fn create_loyalty_member(&self, record: &LoyaltyMember) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO loyalty_members (id, tenant_id, member_code, name, email, phone, \
             assigned_playlist_id, last_seen_at, last_seen_store, feature_vector, \
             pending_photo, photo_path, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                record.id.to_string(),
                record.tenant_id.to_string(),
                record.member_code,
                record.name,
                record.email,
                record.phone,
                record.assigned_playlist_id.map(|p| p.to_string()),
                to_db_ts_opt(record.last_seen_at),
                record.last_seen_store,
                record.vector.to_bytes(),
                record.pending_photo,
                record.photo_path,
                to_db_ts(record.created_at),
                to_db_ts(record.updated_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "member code '{}' in tenant {}",
                        record.member_code, record.tenant_id
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    pub fn update_loyalty_member(&self, record: &LoyaltyMember) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE loyalty_members SET name = ?1, email = ?2, phone = ?3, \
             assigned_playlist_id = ?4, last_seen_at = ?5, last_seen_store = ?6, \
             feature_vector = ?7, pending_photo = ?8, photo_path = ?9, updated_at = ?10
             WHERE id = ?11",
            params![
                record.name,
                record.email,
                record.phone,
                record.assigned_playlist_id.map(|p| p.to_string()),
                to_db_ts_opt(record.last_seen_at),
                record.last_seen_store,
                record.vector.to_bytes(),
                record.pending_photo,
                record.photo_path,
                to_db_ts(record.updated_at),
                record.id.to_string(),
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!(
                "loyalty member {}",
                record.id
            )));
        }
        Ok(())
    }

    pub fn get_loyalty_member(
        &self,
        id: Uuid,
        dim: usize,
    ) -> Result<Option<LoyaltyMember>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {LM_COLUMNS} FROM loyalty_members WHERE id = ?1"),
            params![id.to_string()],
            |row| row_to_loyalty_member_raw(row),
        );
        match result {
            Ok(raw) => Ok(Some(raw.into_record(dim)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn get_loyalty_member_by_code(
        &self,
        tenant_id: Uuid,
        member_code: &str,
        dim: usize,
    ) -> Result<Option<LoyaltyMember>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {LM_COLUMNS} FROM loyalty_members \
                 WHERE tenant_id = ?1 AND member_code = ?2"
            ),
            params![tenant_id.to_string(), member_code],
            |row| row_to_loyalty_member_raw(row),
        );
        match result {
            Ok(raw) => Ok(Some(raw.into_record(dim)?)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn delete_loyalty_member(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM loyalty_members WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("loyalty member {id}")));
        }
        Ok(())
    }

    /// Compiler enumeration for one tenant, ordered by `member_code`.
    pub fn eligible_loyalty_members(
        &self,
        tenant_id: Uuid,
        dim: usize,
    ) -> Result<(Vec<LoyaltyMember>, Vec<String>), StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LM_COLUMNS} FROM loyalty_members \
             WHERE tenant_id = ?1 AND pending_photo = 0 ORDER BY member_code"
        ))?;
        let rows = stmt.query_map(params![tenant_id.to_string()], row_to_loyalty_member_raw)?;

        let mut records = Vec::new();
        let mut skipped = Vec::new();
        for raw in rows {
            let raw = raw?;
            let member_code = raw.member_code.clone();
            match raw.into_record(dim) {
                Ok(record) => records.push(record),
                Err(_) => skipped.push(member_code),
            }
        }
        Ok((records, skipped))
    }

    /// Stamps a member's last sighting (loyalty match ingestion).
    pub fn touch_loyalty_member_seen(
        &self,
        tenant_id: Uuid,
        member_code: &str,
        at: DateTime<Utc>,
        store: Option<&str>,
    ) -> Result<bool, StorageError> {
        let updated = self.conn().execute(
            "UPDATE loyalty_members SET last_seen_at = ?1, \
             last_seen_store = COALESCE(?2, last_seen_store), updated_at = ?1 \
             WHERE tenant_id = ?3 AND member_code = ?4",
            params![to_db_ts(at), store, tenant_id.to_string(), member_code],
        )?;
        Ok(updated > 0)
    }
}

fn format_date(d: NaiveDate) -> String {
    d.format("%Y-%m-%d").to_string()
}

fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()
}

struct RawMissingPerson {
    id: Uuid,
    case_id: String,
    name: String,
    age_at_disappearance: Option<u32>,
    disappearance_date: Option<String>,
    last_known_location: Option<String>,
    status: String,
    vector_bytes: Vec<u8>,
    pending_photo: bool,
    photo_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RawMissingPerson {
    fn into_record(self, dim: usize) -> Result<MissingPerson, StorageError> {
        let vector = FeatureVector::from_bytes(&self.vector_bytes, dim)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(MissingPerson {
            id: self.id,
            case_id: self.case_id,
            name: self.name,
            age_at_disappearance: self.age_at_disappearance,
            disappearance_date: self.disappearance_date.as_deref().and_then(parse_date),
            last_known_location: self.last_known_location,
            status: CaseStatus::parse(&self.status).unwrap_or(CaseStatus::Resolved),
            vector,
            pending_photo: self.pending_photo,
            photo_path: self.photo_path,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn row_to_missing_person_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawMissingPerson> {
    Ok(RawMissingPerson {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        case_id: row.get(1)?,
        name: row.get(2)?,
        age_at_disappearance: row.get(3)?,
        disappearance_date: row.get(4)?,
        last_known_location: row.get(5)?,
        status: row.get(6)?,
        vector_bytes: row.get(7)?,
        pending_photo: row.get(8)?,
        photo_path: row.get(9)?,
        created_at: from_db_ts(row.get(10)?),
        updated_at: from_db_ts(row.get(11)?),
    })
}

struct RawLoyaltyMember {
    id: Uuid,
    tenant_id: Uuid,
    member_code: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    assigned_playlist_id: Option<Uuid>,
    last_seen_at: Option<DateTime<Utc>>,
    last_seen_store: Option<String>,
    vector_bytes: Vec<u8>,
    pending_photo: bool,
    photo_path: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RawLoyaltyMember {
    fn into_record(self, dim: usize) -> Result<LoyaltyMember, StorageError> {
        let vector = FeatureVector::from_bytes(&self.vector_bytes, dim)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        Ok(LoyaltyMember {
            id: self.id,
            tenant_id: self.tenant_id,
            member_code: self.member_code,
            name: self.name,
            email: self.email,
            phone: self.phone,
            assigned_playlist_id: self.assigned_playlist_id,
            last_seen_at: self.last_seen_at,
            last_seen_store: self.last_seen_store,
            vector,
            pending_photo: self.pending_photo,
            photo_path: self.photo_path,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn row_to_loyalty_member_raw(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawLoyaltyMember> {
    Ok(RawLoyaltyMember {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(row.get::<_, String>(1)?)?,
        member_code: row.get(2)?,
        name: row.get(3)?,
        email: row.get(4)?,
        phone: row.get(5)?,
        assigned_playlist_id: row
            .get::<_, Option<String>>(6)?
            .map(parse_uuid)
            .transpose()?,
        last_seen_at: from_db_ts_opt(row.get(7)?),
        last_seen_store: row.get(8)?,
        vector_bytes: row.get(9)?,
        pending_photo: row.get(10)?,
        photo_path: row.get(11)?,
        created_at: from_db_ts(row.get(12)?),
        updated_at: from_db_ts(row.get(13)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 8;

    fn mp(case_id: &str, status: CaseStatus, vector: FeatureVector) -> MissingPerson {
        MissingPerson {
            id: Uuid::new_v4(),
            case_id: case_id.into(),
            name: "Jane Doe".into(),
            age_at_disappearance: Some(9),
            disappearance_date: NaiveDate::from_ymd_opt(2023, 11, 2),
            last_known_location: Some("Springfield".into()),
            status,
            vector,
            pending_photo: false,
            photo_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn missing_person_round_trip() {
        let storage = Storage::in_memory().unwrap();
        let vector = FeatureVector::new(vec![0.5; DIM], DIM).unwrap();
        let record = mp("C-100", CaseStatus::Active, vector.clone());
        storage.create_missing_person(&record).unwrap();

        let fetched = storage
            .get_missing_person_by_case_id("C-100", DIM)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.vector, vector);
        assert_eq!(fetched.disappearance_date, record.disappearance_date);

        // Wrong-dim read is rejected.
        assert!(storage.get_missing_person(record.id, DIM * 2).is_err());
    }

    #[test]
    fn eligibility_skips_resolved_and_pending_photo() {
        let storage = Storage::in_memory().unwrap();
        let vec_ok = FeatureVector::new(vec![0.1; DIM], DIM).unwrap();

        storage
            .create_missing_person(&mp("C-1", CaseStatus::Active, vec_ok.clone()))
            .unwrap();
        storage
            .create_missing_person(&mp("C-2", CaseStatus::Resolved, vec_ok.clone()))
            .unwrap();
        let mut pending = mp("C-3", CaseStatus::Active, FeatureVector::zero(DIM));
        pending.pending_photo = true;
        storage.create_missing_person(&pending).unwrap();

        let (records, skipped) = storage.eligible_missing_persons(DIM).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].case_id, "C-1");
        assert!(skipped.is_empty());
    }

    #[test]
    fn eligibility_reports_wrong_width_rows() {
        let storage = Storage::in_memory().unwrap();
        let vec_ok = FeatureVector::new(vec![0.1; DIM], DIM).unwrap();
        storage
            .create_missing_person(&mp("C-1", CaseStatus::Active, vec_ok))
            .unwrap();
        // A record written under a different dimension configuration.
        let odd = FeatureVector::new(vec![0.2; DIM * 2], DIM * 2).unwrap();
        storage
            .create_missing_person(&mp("C-2", CaseStatus::Active, odd))
            .unwrap();

        let (records, skipped) = storage.eligible_missing_persons(DIM).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(skipped, vec!["C-2".to_string()]);
    }

    #[test]
    fn loyalty_member_code_unique_per_tenant() {
        let storage = Storage::in_memory().unwrap();
        let tenant_a = Uuid::new_v4();
        let tenant_b = Uuid::new_v4();
        for tenant in [tenant_a, tenant_b] {
            storage
                .create_tenant(&crate::tenant::Tenant {
                    id: tenant,
                    slug: format!("t-{}", tenant.simple()),
                    name: "T".into(),
                    created_at: Utc::now(),
                })
                .unwrap();
        }

        let member = |tenant_id| LoyaltyMember {
            id: Uuid::new_v4(),
            tenant_id,
            member_code: "M-1".into(),
            name: "Alex".into(),
            email: None,
            phone: None,
            assigned_playlist_id: None,
            last_seen_at: None,
            last_seen_store: None,
            vector: FeatureVector::new(vec![0.3; DIM], DIM).unwrap(),
            pending_photo: false,
            photo_path: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        storage.create_loyalty_member(&member(tenant_a)).unwrap();
        // Same code in another tenant is fine.
        storage.create_loyalty_member(&member(tenant_b)).unwrap();
        // Same code in the same tenant conflicts.
        let err = storage.create_loyalty_member(&member(tenant_a)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }

    #[test]
    fn touch_seen_updates_sighting_fields() {
        let storage = Storage::in_memory().unwrap();
        let tenant_id = Uuid::new_v4();
        storage
            .create_tenant(&crate::tenant::Tenant {
                id: tenant_id,
                slug: "seen".into(),
                name: "Seen".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        storage
            .create_loyalty_member(&LoyaltyMember {
                id: Uuid::new_v4(),
                tenant_id,
                member_code: "M-9".into(),
                name: "Sam".into(),
                email: None,
                phone: None,
                assigned_playlist_id: None,
                last_seen_at: None,
                last_seen_store: None,
                vector: FeatureVector::new(vec![0.3; DIM], DIM).unwrap(),
                pending_photo: false,
                photo_path: None,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            })
            .unwrap();

        let at = Utc::now();
        assert!(storage
            .touch_loyalty_member_seen(tenant_id, "M-9", at, Some("Store 4"))
            .unwrap());
        let fetched = storage
            .get_loyalty_member_by_code(tenant_id, "M-9", DIM)
            .unwrap()
            .unwrap();
        assert_eq!(fetched.last_seen_at.unwrap().timestamp(), at.timestamp());
        assert_eq!(fetched.last_seen_store.as_deref(), Some("Store 4"));

        assert!(!storage
            .touch_loyalty_member_seen(tenant_id, "M-404", at, None)
            .unwrap());
    }
}
