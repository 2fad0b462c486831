// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Alert ingestion, notification dispatch, retry, and review.
//!
//! Missing-person matches always dispatch immediately; other alert types
//! follow each rule's `delay_minutes` (zero = immediate, otherwise the
//! rule is handed to the worker queue with that delay). Every attempt is
//! appended to the notification log, and a recipient with an existing
//! `sent` row is never sent again for the same alert.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::rules::rule_names_for;
use super::{Alert, AlertError, AlertStatus, AlertSubject, AlertType, NotificationRule};
use crate::notify::{DeliveryStatus, NotificationLog, Notifier};
use crate::storage::Storage;
use crate::worker::{TaskKind, TaskQueue};

/// Raw ingestion payload, as the edge posts it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewAlert {
    pub alert_type: Option<String>,
    pub confidence: Option<f64>,
    pub detected_at: Option<String>,
    pub case_ref: Option<String>,
    pub member_ref: Option<String>,
    pub tenant_id: Option<Uuid>,
    pub hub_id: Option<Uuid>,
    pub device_id: Option<Uuid>,
    pub captured_image_path: Option<String>,
}

/// Dispatch counts returned with the created alert.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DispatchSummary {
    pub sent: usize,
    pub failed: usize,
    pub scheduled: usize,
}

/// Retry counts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RetrySummary {
    pub sent: usize,
    pub failed: usize,
}

/// Alert pipeline service.
pub struct AlertProcessor<'a> {
    storage: &'a Storage,
    notifier: &'a Notifier,
    task_max_attempts: u32,
}

impl<'a> AlertProcessor<'a> {
    pub fn new(storage: &'a Storage, notifier: &'a Notifier, task_max_attempts: u32) -> Self {
        AlertProcessor {
            storage,
            notifier,
            task_max_attempts,
        }
    }

    /// Validates the payload into an [`Alert`] without persisting it.
    pub fn validate(&self, input: &NewAlert, received_at: DateTime<Utc>) -> Result<Alert, AlertError> {
        let alert_type = match &input.alert_type {
            None => {
                return Err(AlertError::InvalidAlert(
                    "missing required field: alert_type".into(),
                ))
            }
            Some(raw) => AlertType::parse(raw).ok_or_else(|| {
                AlertError::InvalidAlert(format!("invalid alert_type: {raw}"))
            })?,
        };

        let confidence = input.confidence.ok_or_else(|| {
            AlertError::InvalidAlert("missing required field: confidence".into())
        })?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(AlertError::InvalidAlert(
                "confidence must be between 0.0 and 1.0".into(),
            ));
        }

        let detected_at = match &input.detected_at {
            None => {
                return Err(AlertError::InvalidAlert(
                    "missing required field: detected_at".into(),
                ))
            }
            Some(raw) => DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| AlertError::InvalidAlert(format!("invalid detected_at: {e}")))?,
        };

        let subject = match alert_type {
            AlertType::MissingPersonMatch => {
                let case_ref = input
                    .case_ref
                    .clone()
                    .filter(|c| !c.is_empty())
                    .ok_or_else(|| {
                        AlertError::InvalidAlert(
                            "missing_person_match alerts require case_ref".into(),
                        )
                    })?;
                AlertSubject::MissingPerson { case_ref }
            }
            AlertType::LoyaltyMatch => {
                let member_ref = input
                    .member_ref
                    .clone()
                    .filter(|m| !m.is_empty())
                    .ok_or_else(|| {
                        AlertError::InvalidAlert("loyalty_match alerts require member_ref".into())
                    })?;
                AlertSubject::LoyaltyMember { member_ref }
            }
        };

        Ok(Alert {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            hub_id: input.hub_id,
            device_id: input.device_id,
            subject,
            confidence,
            captured_image_path: input.captured_image_path.clone(),
            detected_at,
            received_at,
            status: AlertStatus::New,
            reviewer: None,
            reviewed_at: None,
            notes: None,
        })
    }

    /// Full ingestion: validate, persist, dispatch.
    pub async fn ingest(&self, input: NewAlert) -> Result<(Alert, DispatchSummary), AlertError> {
        let alert = self.validate(&input, Utc::now())?;
        self.storage.insert_alert(&alert)?;
        info!(
            alert = %alert.id,
            alert_type = alert.alert_type().as_str(),
            confidence = alert.confidence,
            "alert created"
        );

        // A loyalty sighting also stamps the member record.
        if let (Some(tenant_id), Some(member_ref)) = (alert.tenant_id, alert.subject.member_ref())
        {
            let _ = self.storage.touch_loyalty_member_seen(
                tenant_id,
                member_ref,
                alert.detected_at,
                None,
            )?;
        }

        let summary = self.dispatch(&alert).await?;
        Ok((alert, summary))
    }

    /// Selects rules for the alert type and dispatches or schedules each.
    async fn dispatch(&self, alert: &Alert) -> Result<DispatchSummary, AlertError> {
        let mut summary = DispatchSummary::default();
        let rules = self
            .storage
            .enabled_rules_named(rule_names_for(alert.alert_type()))?;
        if rules.is_empty() {
            info!(alert = %alert.id, "no notification rules for alert type");
            return Ok(summary);
        }

        let always_immediate = alert.alert_type() == AlertType::MissingPersonMatch;
        let queue = TaskQueue::new(self.storage);

        for rule in rules {
            if always_immediate || rule.delay_minutes == 0 {
                let (sent, failed) = self.dispatch_rule(alert, &rule).await?;
                summary.sent += sent;
                summary.failed += failed;
            } else {
                let run_at = Utc::now() + chrono::Duration::minutes(rule.delay_minutes as i64);
                queue
                    .enqueue(
                        TaskKind::SendNotification {
                            alert_id: alert.id,
                            rule_id: rule.id,
                        },
                        run_at,
                        self.task_max_attempts,
                    )
                    .map_err(|e| AlertError::Schedule(e.to_string()))?;
                summary.scheduled += 1;
                info!(
                    alert = %alert.id,
                    rule = %rule.name,
                    delay_minutes = rule.delay_minutes,
                    "notification scheduled"
                );
            }
        }
        Ok(summary)
    }

    /// Dispatches one rule now: every recipient, with per-recipient
    /// idempotence and an audit row per attempt. Returns (sent, failed);
    /// skipped recipients count in neither.
    pub async fn dispatch_rule(
        &self,
        alert: &Alert,
        rule: &NotificationRule,
    ) -> Result<(usize, usize), AlertError> {
        if !rule.recipients.matches_channel(rule.channel) {
            warn!(rule = %rule.name, "recipient shape does not match rule channel, skipping");
            return Ok((0, 0));
        }
        let recipients = rule.recipients.list();
        if recipients.is_empty() {
            warn!(rule = %rule.name, "rule has no recipients, skipping");
            return Ok((0, 0));
        }

        let subject = format_alert_subject(alert);
        let body = format_alert_message(alert);
        let mut sent = 0;
        let mut failed = 0;

        for recipient in recipients {
            if self
                .storage
                .notification_sent_exists(alert.id, rule.channel, recipient)?
            {
                info!(alert = %alert.id, recipient, "already delivered, skipping");
                continue;
            }

            match self
                .notifier
                .deliver(rule.channel, recipient, &subject, &body)
                .await
            {
                Ok(receipt) => {
                    let appended = self.storage.append_notification_log(&NotificationLog {
                        id: Uuid::new_v4(),
                        alert_id: alert.id,
                        channel: rule.channel,
                        recipient: recipient.clone(),
                        sent_at: Utc::now(),
                        status: DeliveryStatus::Sent,
                        error: None,
                        message_id: Some(receipt.message_id),
                    });
                    match appended {
                        Ok(()) => sent += 1,
                        // A concurrent dispatch won the sent slot; treat
                        // as skipped.
                        Err(e) if e.is_unique_violation() => {
                            info!(alert = %alert.id, recipient, "lost sent race, skipping");
                        }
                        Err(e) => return Err(e.into()),
                    }
                }
                Err(e) => {
                    self.storage.append_notification_log(&NotificationLog {
                        id: Uuid::new_v4(),
                        alert_id: alert.id,
                        channel: rule.channel,
                        recipient: recipient.clone(),
                        sent_at: Utc::now(),
                        status: DeliveryStatus::Failed,
                        error: Some(e.to_string()),
                        message_id: None,
                    })?;
                    warn!(alert = %alert.id, recipient, error = %e, "notification failed");
                    failed += 1;
                }
            }
        }
        Ok((sent, failed))
    }

    /// Dispatch entry used by the worker for a scheduled rule.
    pub async fn dispatch_rule_by_id(
        &self,
        alert_id: Uuid,
        rule_id: Uuid,
    ) -> Result<(usize, usize), AlertError> {
        let alert = self
            .storage
            .get_alert(alert_id)?
            .ok_or(AlertError::NotFound(alert_id))?;
        let rule = self
            .storage
            .get_notification_rule(rule_id)?
            .ok_or_else(|| AlertError::InvalidAlert(format!("rule {rule_id} no longer exists")))?;
        if !rule.enabled {
            info!(alert = %alert_id, rule = %rule.name, "rule disabled before dispatch, skipping");
            return Ok((0, 0));
        }
        self.dispatch_rule(&alert, &rule).await
    }

    /// Re-issues every failed delivery for an alert exactly once,
    /// appending new log rows. Recipients that have since succeeded are
    /// skipped.
    pub async fn retry_failed(&self, alert_id: Uuid) -> Result<RetrySummary, AlertError> {
        let alert = self
            .storage
            .get_alert(alert_id)?
            .ok_or(AlertError::NotFound(alert_id))?;
        let failed_rows = self.storage.failed_notifications_for_alert(alert_id)?;
        if failed_rows.is_empty() {
            return Ok(RetrySummary::default());
        }

        let subject = format_alert_subject(&alert);
        let body = format_alert_message(&alert);
        let mut summary = RetrySummary::default();
        let mut retried: Vec<(crate::alert::NotificationChannel, String)> = Vec::new();

        for row in failed_rows {
            let key = (row.channel, row.recipient.clone());
            if retried.contains(&key) {
                continue;
            }
            retried.push(key);

            if self
                .storage
                .notification_sent_exists(alert_id, row.channel, &row.recipient)?
            {
                continue;
            }

            match self
                .notifier
                .deliver(row.channel, &row.recipient, &subject, &body)
                .await
            {
                Ok(receipt) => {
                    self.storage.append_notification_log(&NotificationLog {
                        id: Uuid::new_v4(),
                        alert_id,
                        channel: row.channel,
                        recipient: row.recipient.clone(),
                        sent_at: Utc::now(),
                        status: DeliveryStatus::Sent,
                        error: None,
                        message_id: Some(receipt.message_id),
                    })?;
                    summary.sent += 1;
                }
                Err(e) => {
                    self.storage.append_notification_log(&NotificationLog {
                        id: Uuid::new_v4(),
                        alert_id,
                        channel: row.channel,
                        recipient: row.recipient.clone(),
                        sent_at: Utc::now(),
                        status: DeliveryStatus::Failed,
                        error: Some(e.to_string()),
                        message_id: None,
                    })?;
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Human review: enforce the status machine, stamp the reviewer.
    pub fn review(
        &self,
        alert_id: Uuid,
        new_status: AlertStatus,
        reviewer: &str,
        notes: Option<&str>,
    ) -> Result<Alert, AlertError> {
        let alert = self
            .storage
            .get_alert(alert_id)?
            .ok_or(AlertError::NotFound(alert_id))?;

        if !alert.status.can_transition_to(new_status) {
            return Err(AlertError::InvalidTransition {
                from: alert.status,
                to: new_status,
            });
        }

        self.storage
            .update_alert_review(alert_id, new_status, reviewer, notes, Utc::now())?;
        self.storage
            .get_alert(alert_id)?
            .ok_or(AlertError::NotFound(alert_id))
    }
}

/// Email subject line for an alert.
pub fn format_alert_subject(alert: &Alert) -> String {
    match &alert.subject {
        AlertSubject::MissingPerson { case_ref } => {
            format!("[URGENT] Missing Person Alert (Case: {case_ref})")
        }
        AlertSubject::LoyaltyMember { .. } => "Loyalty Member Match Detected".to_string(),
    }
}

/// Notification body for an alert.
pub fn format_alert_message(alert: &Alert) -> String {
    let mut lines = Vec::new();
    match &alert.subject {
        AlertSubject::MissingPerson { case_ref } => {
            lines.push("*** MISSING PERSON - POTENTIAL MATCH ***".to_string());
            lines.push(String::new());
            lines.push(format!("Case: {case_ref}"));
        }
        AlertSubject::LoyaltyMember { member_ref } => {
            lines.push("Loyalty member match detected".to_string());
            lines.push(String::new());
            lines.push(format!("Member: {member_ref}"));
        }
    }
    lines.push(format!("Match confidence: {:.1}%", alert.confidence * 100.0));
    lines.push(String::new());
    lines.push(format!("Detected at: {}", alert.detected_at.to_rfc3339()));
    lines.push(format!("Received at: {}", alert.received_at.to_rfc3339()));
    if let Some(device_id) = alert.device_id {
        lines.push(format!("Device: {device_id}"));
    }
    lines.push(String::new());
    lines.push(format!("Alert ID: {}", alert.id));
    lines.push("Please review this alert in the management dashboard.".to_string());
    lines.join("\n")
}
