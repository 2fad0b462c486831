// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Alert storage operations.

use chrono::{DateTime, Utc};
use rusqlite::params;
use rusqlite::types::Value;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, from_db_ts_opt, to_db_ts, to_db_ts_opt, Storage, StorageError};
use crate::alert::{Alert, AlertStatus, AlertSubject, AlertType};

const ALERT_COLUMNS: &str = "id, tenant_id, hub_id, device_id, alert_type, case_ref, \
                             member_ref, confidence, captured_image_path, detected_at, \
                             received_at, status, reviewer, reviewed_at, notes";

/// Filters and pagination for alert listing.
#[derive(Debug, Clone, Default)]
pub struct AlertQuery {
    pub status: Option<AlertStatus>,
    pub alert_type: Option<AlertType>,
    pub tenant_id: Option<Uuid>,
    pub since: Option<DateTime<Utc>>,
    /// 1-based page number; 0 is treated as 1.
    pub page: u32,
    /// Page size; defaults to 50, capped at 200.
    pub per_page: u32,
}

impl AlertQuery {
    fn limit_offset(&self) -> (u32, u32) {
        let per_page = match self.per_page {
            0 => 50,
            n => n.min(200),
        };
        let page = self.page.max(1);
        (per_page, (page - 1) * per_page)
    }
}

impl Storage {
    pub fn insert_alert(&self, alert: &Alert) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO alerts (id, tenant_id, hub_id, device_id, alert_type, case_ref, \
             member_ref, confidence, captured_image_path, detected_at, received_at, \
             status, reviewer, reviewed_at, notes)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                alert.id.to_string(),
                alert.tenant_id.map(|t| t.to_string()),
                alert.hub_id.map(|h| h.to_string()),
                alert.device_id.map(|d| d.to_string()),
                alert.alert_type().as_str(),
                alert.subject.case_ref(),
                alert.subject.member_ref(),
                alert.confidence,
                alert.captured_image_path,
                to_db_ts(alert.detected_at),
                to_db_ts(alert.received_at),
                alert.status.as_str(),
                alert.reviewer,
                to_db_ts_opt(alert.reviewed_at),
                alert.notes,
            ],
        )?;
        Ok(())
    }

    pub fn get_alert(&self, id: Uuid) -> Result<Option<Alert>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {ALERT_COLUMNS} FROM alerts WHERE id = ?1"),
            params![id.to_string()],
            row_to_alert,
        );
        match result {
            Ok(alert) => Ok(Some(alert)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Filtered, paginated listing, newest received first. Returns the
    /// page plus the total row count for the filter.
    pub fn list_alerts(&self, query: &AlertQuery) -> Result<(Vec<Alert>, u64), StorageError> {
        let mut clauses: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();

        if let Some(status) = query.status {
            clauses.push("status = ?");
            values.push(Value::Text(status.as_str().to_string()));
        }
        if let Some(alert_type) = query.alert_type {
            clauses.push("alert_type = ?");
            values.push(Value::Text(alert_type.as_str().to_string()));
        }
        if let Some(tenant_id) = query.tenant_id {
            clauses.push("tenant_id = ?");
            values.push(Value::Text(tenant_id.to_string()));
        }
        if let Some(since) = query.since {
            clauses.push("received_at >= ?");
            values.push(Value::Integer(to_db_ts(since)));
        }

        let where_clause = if clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", clauses.join(" AND "))
        };

        let total: i64 = self.conn().query_row(
            &format!("SELECT COUNT(*) FROM alerts{where_clause}"),
            rusqlite::params_from_iter(values.iter()),
            |row| row.get(0),
        )?;

        let (limit, offset) = query.limit_offset();
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ALERT_COLUMNS} FROM alerts{where_clause} \
             ORDER BY received_at DESC LIMIT {limit} OFFSET {offset}"
        ))?;
        let rows = stmt.query_map(rusqlite::params_from_iter(values.iter()), row_to_alert)?;
        let alerts = rows
            .collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)?;
        Ok((alerts, total as u64))
    }

    /// Review update: status, reviewer, notes, and review timestamp.
    pub fn update_alert_review(
        &self,
        id: Uuid,
        status: AlertStatus,
        reviewer: &str,
        notes: Option<&str>,
        at: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE alerts SET status = ?1, reviewer = ?2, \
             notes = COALESCE(?3, notes), reviewed_at = ?4 WHERE id = ?5",
            params![status.as_str(), reviewer, notes, to_db_ts(at), id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }

    pub fn set_alert_capture_path(&self, id: Uuid, path: &str) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE alerts SET captured_image_path = ?1 WHERE id = ?2",
            params![path, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }

    /// Deletes an alert; the notification log cascades.
    pub fn delete_alert(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self
            .conn()
            .execute("DELETE FROM alerts WHERE id = ?1", params![id.to_string()])?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("alert {id}")));
        }
        Ok(())
    }
}

fn row_to_alert(row: &rusqlite::Row<'_>) -> rusqlite::Result<Alert> {
    let type_str: String = row.get(4)?;
    let case_ref: Option<String> = row.get(5)?;
    let member_ref: Option<String> = row.get(6)?;
    let status_str: String = row.get(11)?;

    let subject = match AlertType::parse(&type_str) {
        Some(AlertType::MissingPersonMatch) => AlertSubject::MissingPerson {
            case_ref: case_ref.unwrap_or_default(),
        },
        Some(AlertType::LoyaltyMatch) => AlertSubject::LoyaltyMember {
            member_ref: member_ref.unwrap_or_default(),
        },
        None => {
            return Err(rusqlite::Error::FromSqlConversionFailure(
                4,
                rusqlite::types::Type::Text,
                format!("bad alert type '{type_str}'").into(),
            ))
        }
    };

    Ok(Alert {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        tenant_id: row
            .get::<_, Option<String>>(1)?
            .map(parse_uuid)
            .transpose()?,
        hub_id: row
            .get::<_, Option<String>>(2)?
            .map(parse_uuid)
            .transpose()?,
        device_id: row
            .get::<_, Option<String>>(3)?
            .map(parse_uuid)
            .transpose()?,
        subject,
        confidence: row.get(7)?,
        captured_image_path: row.get(8)?,
        detected_at: from_db_ts(row.get(9)?),
        received_at: from_db_ts(row.get(10)?),
        status: AlertStatus::parse(&status_str).unwrap_or(AlertStatus::New),
        reviewer: row.get(12)?,
        reviewed_at: from_db_ts_opt(row.get(13)?),
        notes: row.get(14)?,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn seed_alert(storage: &Storage, subject: AlertSubject) -> Alert {
        let alert = Alert {
            id: Uuid::new_v4(),
            tenant_id: None,
            hub_id: None,
            device_id: None,
            subject,
            confidence: 0.9,
            captured_image_path: None,
            detected_at: Utc::now(),
            received_at: Utc::now(),
            status: AlertStatus::New,
            reviewer: None,
            reviewed_at: None,
            notes: None,
        };
        storage.insert_alert(&alert).unwrap();
        alert
    }

    #[test]
    fn alert_round_trip_preserves_subject() {
        let storage = Storage::in_memory().unwrap();
        let mp = seed_alert(
            &storage,
            AlertSubject::MissingPerson {
                case_ref: "C-9".into(),
            },
        );
        let loyal = seed_alert(
            &storage,
            AlertSubject::LoyaltyMember {
                member_ref: "M-7".into(),
            },
        );

        let fetched = storage.get_alert(mp.id).unwrap().unwrap();
        assert_eq!(fetched.subject.case_ref(), Some("C-9"));
        assert_eq!(fetched.alert_type(), AlertType::MissingPersonMatch);

        let fetched = storage.get_alert(loyal.id).unwrap().unwrap();
        assert_eq!(fetched.subject.member_ref(), Some("M-7"));
    }

    #[test]
    fn listing_filters_and_paginates() {
        let storage = Storage::in_memory().unwrap();
        for i in 0..5 {
            seed_alert(
                &storage,
                AlertSubject::MissingPerson {
                    case_ref: format!("C-{i}"),
                },
            );
        }
        seed_alert(
            &storage,
            AlertSubject::LoyaltyMember {
                member_ref: "M-1".into(),
            },
        );

        let (all, total) = storage.list_alerts(&AlertQuery::default()).unwrap();
        assert_eq!(total, 6);
        assert_eq!(all.len(), 6);

        let (mp_only, mp_total) = storage
            .list_alerts(&AlertQuery {
                alert_type: Some(AlertType::MissingPersonMatch),
                ..AlertQuery::default()
            })
            .unwrap();
        assert_eq!(mp_total, 5);
        assert!(mp_only
            .iter()
            .all(|a| a.alert_type() == AlertType::MissingPersonMatch));

        let (page, total) = storage
            .list_alerts(&AlertQuery {
                per_page: 2,
                page: 3,
                ..AlertQuery::default()
            })
            .unwrap();
        assert_eq!(total, 6);
        assert_eq!(page.len(), 2);
    }

    #[test]
    fn review_update_stamps_fields() {
        let storage = Storage::in_memory().unwrap();
        let alert = seed_alert(
            &storage,
            AlertSubject::MissingPerson {
                case_ref: "C-1".into(),
            },
        );
        let at = Utc::now();
        storage
            .update_alert_review(alert.id, AlertStatus::Reviewed, "officer.ray", Some("ok"), at)
            .unwrap();
        let fetched = storage.get_alert(alert.id).unwrap().unwrap();
        assert_eq!(fetched.status, AlertStatus::Reviewed);
        assert_eq!(fetched.reviewer.as_deref(), Some("officer.ray"));
        assert_eq!(fetched.notes.as_deref(), Some("ok"));
        assert!(fetched.reviewed_at.is_some());
    }
}
