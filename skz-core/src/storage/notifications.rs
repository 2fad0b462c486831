// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification rule and delivery-log storage operations.
//!
//! The log is append-only. A partial unique index on
//! `(alert_id, channel, recipient) WHERE status = 'sent'` backs the
//! at-most-once delivery guarantee even under concurrent retries.

use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, to_db_ts, Storage, StorageError};
use crate::alert::{NotificationChannel, NotificationRule, RuleRecipients};
use crate::notify::{DeliveryStatus, NotificationLog};

const RULE_COLUMNS: &str =
    "id, name, channel, recipients, delay_minutes, enabled, description, created_at";

const LOG_COLUMNS: &str = "id, alert_id, channel, recipient, sent_at, status, error, message_id";

impl Storage {
    // === Rules ===

    pub fn create_notification_rule(&self, rule: &NotificationRule) -> Result<(), StorageError> {
        let recipients = serde_json::to_string(&rule.recipients)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.conn().execute(
            "INSERT INTO notification_rules (id, name, channel, recipients, delay_minutes, \
             enabled, description, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                rule.id.to_string(),
                rule.name,
                rule.channel.as_str(),
                recipients,
                rule.delay_minutes,
                rule.enabled,
                rule.description,
                to_db_ts(rule.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_notification_rule(
        &self,
        id: Uuid,
    ) -> Result<Option<NotificationRule>, StorageError> {
        let result = self.conn().query_row(
            &format!("SELECT {RULE_COLUMNS} FROM notification_rules WHERE id = ?1"),
            params![id.to_string()],
            row_to_rule,
        );
        match result {
            Ok(rule) => Ok(Some(rule)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn list_notification_rules(&self) -> Result<Vec<NotificationRule>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM notification_rules ORDER BY name"
        ))?;
        let rows = stmt.query_map([], row_to_rule)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Enabled rules whose name is in `names`.
    pub fn enabled_rules_named(
        &self,
        names: &[&str],
    ) -> Result<Vec<NotificationRule>, StorageError> {
        let mut rules = Vec::new();
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {RULE_COLUMNS} FROM notification_rules WHERE enabled = 1 AND name = ?1"
        ))?;
        for name in names {
            let rows = stmt.query_map(params![name], row_to_rule)?;
            for rule in rows {
                rules.push(rule?);
            }
        }
        Ok(rules)
    }

    pub fn set_notification_rule_enabled(
        &self,
        id: Uuid,
        enabled: bool,
    ) -> Result<(), StorageError> {
        let updated = self.conn().execute(
            "UPDATE notification_rules SET enabled = ?1 WHERE id = ?2",
            params![enabled, id.to_string()],
        )?;
        if updated == 0 {
            return Err(StorageError::NotFound(format!("notification rule {id}")));
        }
        Ok(())
    }

    pub fn delete_notification_rule(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM notification_rules WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("notification rule {id}")));
        }
        Ok(())
    }

    // === Delivery log ===

    /// Appends a log row. A duplicate `sent` row for the same
    /// `(alert, channel, recipient)` violates the partial unique index and
    /// surfaces as `AlreadyExists`.
    pub fn append_notification_log(&self, log: &NotificationLog) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO notification_log (id, alert_id, channel, recipient, sent_at, \
             status, error, message_id) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                log.id.to_string(),
                log.alert_id.to_string(),
                log.channel.as_str(),
                log.recipient,
                to_db_ts(log.sent_at),
                log.status.as_str(),
                log.error,
                log.message_id,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "sent log for alert {} {} {}",
                        log.alert_id, log.channel, log.recipient
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    /// True when a `sent` row already exists for the triple.
    pub fn notification_sent_exists(
        &self,
        alert_id: Uuid,
        channel: NotificationChannel,
        recipient: &str,
    ) -> Result<bool, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM notification_log \
             WHERE alert_id = ?1 AND channel = ?2 AND recipient = ?3 AND status = 'sent'",
            params![alert_id.to_string(), channel.as_str(), recipient],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// All log rows for an alert, newest first.
    pub fn notification_log_for_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<Vec<NotificationLog>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM notification_log WHERE alert_id = ?1 \
             ORDER BY sent_at DESC, id"
        ))?;
        let rows = stmt.query_map(params![alert_id.to_string()], row_to_log)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    /// Failed log rows for an alert (retry enumeration), oldest first.
    pub fn failed_notifications_for_alert(
        &self,
        alert_id: Uuid,
    ) -> Result<Vec<NotificationLog>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {LOG_COLUMNS} FROM notification_log \
             WHERE alert_id = ?1 AND status = 'failed' ORDER BY sent_at, id"
        ))?;
        let rows = stmt.query_map(params![alert_id.to_string()], row_to_log)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }
}

fn row_to_rule(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationRule> {
    let channel_str: String = row.get(2)?;
    let recipients_str: String = row.get(3)?;
    let channel = NotificationChannel::parse(&channel_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            2,
            rusqlite::types::Type::Text,
            format!("bad channel '{channel_str}'").into(),
        )
    })?;
    let recipients: RuleRecipients = serde_json::from_str(&recipients_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(NotificationRule {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        channel,
        recipients,
        delay_minutes: row.get::<_, i64>(4)? as u32,
        enabled: row.get(5)?,
        description: row.get(6)?,
        created_at: from_db_ts(row.get(7)?),
    })
}

fn row_to_log(row: &rusqlite::Row<'_>) -> rusqlite::Result<NotificationLog> {
    let channel_str: String = row.get(2)?;
    let status_str: String = row.get(5)?;
    Ok(NotificationLog {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        alert_id: parse_uuid(row.get::<_, String>(1)?)?,
        channel: NotificationChannel::parse(&channel_str).unwrap_or(NotificationChannel::Email),
        recipient: row.get(3)?,
        sent_at: from_db_ts(row.get(4)?),
        status: DeliveryStatus::parse(&status_str).unwrap_or(DeliveryStatus::Failed),
        error: row.get(6)?,
        message_id: row.get(7)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::AlertSubject;
    use chrono::Utc;

    fn rule(name: &str, enabled: bool, delay: u32) -> NotificationRule {
        NotificationRule {
            id: Uuid::new_v4(),
            name: name.into(),
            channel: NotificationChannel::Email,
            recipients: RuleRecipients::Emails {
                emails: vec!["ops@x.example".into()],
            },
            delay_minutes: delay,
            enabled,
            description: None,
            created_at: Utc::now(),
        }
    }

    fn log(alert_id: Uuid, recipient: &str, status: DeliveryStatus) -> NotificationLog {
        NotificationLog {
            id: Uuid::new_v4(),
            alert_id,
            channel: NotificationChannel::Email,
            recipient: recipient.into(),
            sent_at: Utc::now(),
            status,
            error: None,
            message_id: None,
        }
    }

    #[test]
    fn enabled_rules_selected_by_name() {
        let storage = Storage::in_memory().unwrap();
        storage
            .create_notification_rule(&rule("ncmec_alert", true, 0))
            .unwrap();
        storage
            .create_notification_rule(&rule("ncmec_match", false, 0))
            .unwrap();
        storage
            .create_notification_rule(&rule("loyalty_alert", true, 30))
            .unwrap();

        let selected = storage
            .enabled_rules_named(&["ncmec_alert", "ncmec_match", "critical_alert"])
            .unwrap();
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].name, "ncmec_alert");
    }

    #[test]
    fn duplicate_sent_row_is_rejected_by_the_index() {
        let storage = Storage::in_memory().unwrap();
        let alert = crate::storage::alerts::tests::seed_alert(
            &storage,
            AlertSubject::MissingPerson {
                case_ref: "C-1".into(),
            },
        );

        storage
            .append_notification_log(&log(alert.id, "a@x.example", DeliveryStatus::Sent))
            .unwrap();
        // Failures may repeat freely.
        storage
            .append_notification_log(&log(alert.id, "a@x.example", DeliveryStatus::Failed))
            .unwrap();
        storage
            .append_notification_log(&log(alert.id, "a@x.example", DeliveryStatus::Failed))
            .unwrap();
        // A second sent row for the same triple is a conflict.
        let err = storage
            .append_notification_log(&log(alert.id, "a@x.example", DeliveryStatus::Sent))
            .unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        assert!(storage
            .notification_sent_exists(alert.id, NotificationChannel::Email, "a@x.example")
            .unwrap());
        assert!(!storage
            .notification_sent_exists(alert.id, NotificationChannel::Sms, "a@x.example")
            .unwrap());

        assert_eq!(
            storage.failed_notifications_for_alert(alert.id).unwrap().len(),
            2
        );
        assert_eq!(
            storage.notification_log_for_alert(alert.id).unwrap().len(),
            3
        );
    }

    #[test]
    fn deleting_alert_cascades_log() {
        let storage = Storage::in_memory().unwrap();
        let alert = crate::storage::alerts::tests::seed_alert(
            &storage,
            AlertSubject::LoyaltyMember {
                member_ref: "M-1".into(),
            },
        );
        storage
            .append_notification_log(&log(alert.id, "a@x.example", DeliveryStatus::Sent))
            .unwrap();

        storage.delete_alert(alert.id).unwrap();
        let count: i64 = storage
            .conn()
            .query_row("SELECT COUNT(*) FROM notification_log", [], |r| r.get(0))
            .unwrap();
        assert_eq!(count, 0);
    }
}
