// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Alert operations on the facade.

use chrono::Utc;
use uuid::Uuid;

use super::central::CentralHub;
use super::error::{CoreError, CoreResult};
use crate::alert::{
    Alert, AlertStatus, DispatchSummary, NewAlert, NotificationChannel, NotificationRule,
    RetrySummary,
};
use crate::notify::NotificationLog;
use crate::storage::AlertQuery;
use crate::worker::{BulkOutcome, TaskKind};

impl CentralHub {
    /// Ingests a match event from the edge: validate, persist, dispatch.
    pub async fn ingest_alert(&self, input: NewAlert) -> CoreResult<(Alert, DispatchSummary)> {
        Ok(self.alert_processor().ingest(input).await?)
    }

    pub fn get_alert(&self, alert_id: Uuid) -> CoreResult<Alert> {
        self.storage()
            .get_alert(alert_id)?
            .ok_or_else(|| CoreError::NotFound(format!("alert {alert_id}")))
    }

    /// Filtered, paginated listing. Returns the page and the total count.
    pub fn list_alerts(&self, query: &AlertQuery) -> CoreResult<(Vec<Alert>, u64)> {
        Ok(self.storage().list_alerts(query)?)
    }

    /// Human review with the status state machine.
    pub fn review_alert(
        &self,
        alert_id: Uuid,
        new_status: AlertStatus,
        reviewer: &str,
        notes: Option<&str>,
    ) -> CoreResult<Alert> {
        Ok(self
            .alert_processor()
            .review(alert_id, new_status, reviewer, notes)?)
    }

    /// Re-issues every failed delivery for an alert once.
    pub async fn retry_alert_notifications(&self, alert_id: Uuid) -> CoreResult<RetrySummary> {
        Ok(self.alert_processor().retry_failed(alert_id).await?)
    }

    /// The alert's delivery audit trail, newest first.
    pub fn alert_notification_history(&self, alert_id: Uuid) -> CoreResult<Vec<NotificationLog>> {
        self.get_alert(alert_id)?;
        Ok(self.storage().notification_log_for_alert(alert_id)?)
    }

    // === Notification rules ===

    pub fn create_notification_rule(&self, rule: &NotificationRule) -> CoreResult<()> {
        if !rule.recipients.matches_channel(rule.channel) {
            return Err(CoreError::InvalidInput(format!(
                "recipient shape does not match channel {}",
                rule.channel
            )));
        }
        Ok(self.storage().create_notification_rule(rule)?)
    }

    pub fn list_notification_rules(&self) -> CoreResult<Vec<NotificationRule>> {
        Ok(self.storage().list_notification_rules()?)
    }

    pub fn set_notification_rule_enabled(&self, rule_id: Uuid, enabled: bool) -> CoreResult<()> {
        Ok(self.storage().set_notification_rule_enabled(rule_id, enabled)?)
    }

    // === Captured images ===

    /// Stores the captured frame for an alert under `captures/` and
    /// records its path.
    pub fn save_alert_capture(&self, alert_id: Uuid, image: &[u8]) -> CoreResult<String> {
        self.get_alert(alert_id)?;
        let format = crate::catalog::sniff_image_format(image)
            .map_err(|e| CoreError::InvalidInput(e.to_string()))?;
        let dir = self.config().captures_dir();
        std::fs::create_dir_all(&dir)
            .map_err(|e| CoreError::InvalidInput(format!("cannot create {}: {e}", dir.display())))?;
        let path = dir.join(format!("{alert_id}.{}", format.extension()));
        std::fs::write(&path, image)
            .map_err(|e| CoreError::InvalidInput(format!("cannot write capture: {e}")))?;
        let path = path.to_string_lossy().into_owned();
        self.storage().set_alert_capture_path(alert_id, &path)?;
        Ok(path)
    }

    /// Reads the captured frame back for the review UI.
    pub fn read_alert_capture(&self, alert_id: Uuid) -> CoreResult<Vec<u8>> {
        let alert = self.get_alert(alert_id)?;
        let path = alert
            .captured_image_path
            .ok_or_else(|| CoreError::NotFound(format!("alert {alert_id} has no capture")))?;
        std::fs::read(&path).map_err(|e| CoreError::NotFound(format!("capture missing: {e}")))
    }

    // === Bulk notification ===

    /// Queues an operator broadcast on the worker pool.
    pub fn request_bulk_notification(
        &self,
        channel: NotificationChannel,
        recipients: Vec<String>,
        subject: String,
        body: String,
    ) -> CoreResult<Uuid> {
        if recipients.is_empty() {
            return Err(CoreError::InvalidInput("recipients are required".into()));
        }
        let task_id = self.task_queue().enqueue(
            TaskKind::SendBulkNotification {
                channel,
                recipients,
                subject,
                body,
            },
            Utc::now(),
            self.config().notification_max_retries,
        )?;
        Ok(task_id)
    }

    /// Worker entry: deliver a broadcast to every recipient now. Returns
    /// the tri-valued aggregate plus per-bucket counts.
    pub(crate) async fn run_bulk_notification(
        &self,
        channel: NotificationChannel,
        recipients: &[String],
        subject: &str,
        body: &str,
    ) -> CoreResult<(BulkOutcome, usize, usize)> {
        let mut sent = 0;
        let mut failed = 0;
        for recipient in recipients {
            match self.notifier().deliver(channel, recipient, subject, body).await {
                Ok(_) => sent += 1,
                Err(e) => {
                    tracing::warn!(recipient, error = %e, "bulk delivery failed");
                    failed += 1;
                }
            }
        }
        Ok((BulkOutcome::from_counts(sent, failed), sent, failed))
    }
}
