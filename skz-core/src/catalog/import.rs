// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Bulk catalog import from CSV or JSON.
//!
//! Rows missing required fields are skipped and reported (at most
//! [`MAX_ERROR_PREVIEW`] messages plus the total count). Existing records
//! are updated in place; imported rows carry the zero placeholder vector
//! until a photo arrives.

use chrono::Utc;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::record::FeatureVector;
use super::store::CatalogError;
use crate::storage::Storage;

/// Cap on per-row error messages kept in the report.
pub const MAX_ERROR_PREVIEW: usize = 10;

/// One loyalty-member import row (CSV header or JSON object keys).
#[derive(Debug, Clone, Deserialize)]
pub struct LoyaltyImportRow {
    #[serde(default)]
    pub member_code: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Import outcome summary.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ImportReport {
    pub created: usize,
    pub updated: usize,
    pub skipped: usize,
    /// First few row errors, capped at [`MAX_ERROR_PREVIEW`].
    pub error_preview: Vec<String>,
    pub total_errors: usize,
}

impl ImportReport {
    fn record_error(&mut self, row: usize, message: String) {
        self.skipped += 1;
        self.total_errors += 1;
        if self.error_preview.len() < MAX_ERROR_PREVIEW {
            self.error_preview.push(format!("row {row}: {message}"));
        }
    }
}

/// Imports loyalty members for a tenant from CSV bytes (header row
/// expected).
pub fn import_loyalty_members_csv(
    storage: &Storage,
    tenant_id: Uuid,
    dim: usize,
    bytes: &[u8],
) -> Result<ImportReport, CatalogError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(bytes);
    let mut report = ImportReport::default();
    let mut rows = Vec::new();
    for (i, row) in reader.deserialize::<LoyaltyImportRow>().enumerate() {
        let row_no = i + 2; // 1-based, after the header row
        match row {
            Ok(parsed) => rows.push((row_no, parsed)),
            Err(e) => report.record_error(row_no, format!("unparseable row: {e}")),
        }
    }
    Ok(apply_loyalty_rows(storage, tenant_id, dim, rows, report))
}

/// Imports loyalty members from a JSON array of row objects.
pub fn import_loyalty_members_json(
    storage: &Storage,
    tenant_id: Uuid,
    dim: usize,
    bytes: &[u8],
) -> Result<ImportReport, CatalogError> {
    let rows: Vec<LoyaltyImportRow> = serde_json::from_slice(bytes)
        .map_err(|e| CatalogError::InvalidInput(format!("invalid JSON import: {e}")))?;
    let rows = rows
        .into_iter()
        .enumerate()
        .map(|(i, row)| (i + 1, row))
        .collect();
    Ok(apply_loyalty_rows(
        storage,
        tenant_id,
        dim,
        rows,
        ImportReport::default(),
    ))
}

fn apply_loyalty_rows(
    storage: &Storage,
    tenant_id: Uuid,
    dim: usize,
    rows: Vec<(usize, LoyaltyImportRow)>,
    mut report: ImportReport,
) -> ImportReport {
    for (row_no, row) in rows {
        if row.member_code.trim().is_empty() {
            report.record_error(row_no, "missing member_code".into());
            continue;
        }
        if row.name.trim().is_empty() {
            report.record_error(row_no, "missing name".into());
            continue;
        }

        let existing = match storage.get_loyalty_member_by_code(tenant_id, &row.member_code, dim) {
            Ok(existing) => existing,
            Err(e) => {
                report.record_error(row_no, e.to_string());
                continue;
            }
        };

        let result = match existing {
            Some(mut member) => {
                member.name = row.name.clone();
                member.email = row.email.clone().or(member.email);
                member.phone = row.phone.clone().or(member.phone);
                member.updated_at = Utc::now();
                storage.update_loyalty_member(&member).map(|_| false)
            }
            None => {
                let now = Utc::now();
                storage
                    .create_loyalty_member(&crate::catalog::LoyaltyMember {
                        id: Uuid::new_v4(),
                        tenant_id,
                        member_code: row.member_code.clone(),
                        name: row.name.clone(),
                        email: row.email.clone(),
                        phone: row.phone.clone(),
                        assigned_playlist_id: None,
                        last_seen_at: None,
                        last_seen_store: None,
                        vector: FeatureVector::zero(dim),
                        pending_photo: true,
                        photo_path: None,
                        created_at: now,
                        updated_at: now,
                    })
                    .map(|_| true)
            }
        };

        match result {
            Ok(true) => report.created += 1,
            Ok(false) => report.updated += 1,
            Err(e) => report.record_error(row_no, e.to_string()),
        }
    }

    info!(
        tenant = %tenant_id,
        created = report.created,
        updated = report.updated,
        skipped = report.skipped,
        "loyalty import finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const DIM: usize = 16;

    fn seeded_storage() -> (Storage, Uuid) {
        let storage = Storage::in_memory().unwrap();
        let tenant_id = Uuid::new_v4();
        storage
            .create_tenant(&crate::tenant::Tenant {
                id: tenant_id,
                slug: "import".into(),
                name: "Import".into(),
                created_at: Utc::now(),
            })
            .unwrap();
        (storage, tenant_id)
    }

    #[test]
    fn csv_import_creates_and_skips() {
        let (storage, tenant_id) = seeded_storage();
        let csv = b"member_code,name,email,phone\n\
                    M-1,Ana,ana@x.example,\n\
                    ,NoCode,,\n\
                    M-2,Ben,,5551234567\n";
        let report = import_loyalty_members_csv(&storage, tenant_id, DIM, csv).unwrap();
        assert_eq!(report.created, 2);
        assert_eq!(report.updated, 0);
        assert_eq!(report.skipped, 1);
        assert_eq!(report.total_errors, 1);
        assert!(report.error_preview[0].contains("missing member_code"));

        let ana = storage
            .get_loyalty_member_by_code(tenant_id, "M-1", DIM)
            .unwrap()
            .unwrap();
        assert!(ana.pending_photo);
        assert!(ana.vector.is_zero());
    }

    #[test]
    fn duplicate_codes_update_in_place() {
        let (storage, tenant_id) = seeded_storage();
        let first = b"member_code,name,email,phone\nM-1,Ana,ana@x.example,\n";
        import_loyalty_members_csv(&storage, tenant_id, DIM, first).unwrap();

        let second = b"member_code,name,email,phone\nM-1,Ana Maria,,\n";
        let report = import_loyalty_members_csv(&storage, tenant_id, DIM, second).unwrap();
        assert_eq!(report.created, 0);
        assert_eq!(report.updated, 1);

        let ana = storage
            .get_loyalty_member_by_code(tenant_id, "M-1", DIM)
            .unwrap()
            .unwrap();
        assert_eq!(ana.name, "Ana Maria");
        // Email survives an empty update column.
        assert_eq!(ana.email.as_deref(), Some("ana@x.example"));
    }

    #[test]
    fn error_preview_is_capped() {
        let (storage, tenant_id) = seeded_storage();
        let mut csv = String::from("member_code,name,email,phone\n");
        for _ in 0..15 {
            csv.push_str(",missing-code,,\n");
        }
        let report =
            import_loyalty_members_csv(&storage, tenant_id, DIM, csv.as_bytes()).unwrap();
        assert_eq!(report.total_errors, 15);
        assert_eq!(report.error_preview.len(), MAX_ERROR_PREVIEW);
    }

    #[test]
    fn json_import_round_trip() {
        let (storage, tenant_id) = seeded_storage();
        let json = br#"[
            {"member_code": "M-10", "name": "Cara"},
            {"member_code": "", "name": "Nope"}
        ]"#;
        let report = import_loyalty_members_json(&storage, tenant_id, DIM, json).unwrap();
        assert_eq!(report.created, 1);
        assert_eq!(report.skipped, 1);

        assert!(import_loyalty_members_json(&storage, tenant_id, DIM, b"not json").is_err());
    }
}
