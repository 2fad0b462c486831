// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Notification delivery: channels, recipient validation, audit log.

pub mod channels;
mod recipient;

pub use channels::{ChannelReceipt, Notifier};
pub use recipient::{validate_email, validate_phone};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::alert::NotificationChannel;

/// SMS bodies are truncated to this length before submission.
pub const SMS_MAX_LEN: usize = 1600;

#[derive(Error, Debug)]
pub enum NotifyError {
    /// Bad recipient address. Never retried.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// Transient provider failure. Retried with backoff.
    #[error("provider error: {0}")]
    Provider(String),
}

impl NotifyError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, NotifyError::Provider(_))
    }
}

/// Delivery attempt outcome recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

impl DeliveryStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Sent => "sent",
            DeliveryStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "sent" => Some(DeliveryStatus::Sent),
            "failed" => Some(DeliveryStatus::Failed),
            _ => None,
        }
    }
}

/// One append-only audit row per delivery attempt.
///
/// The basis for per-recipient idempotence: at most one `sent` row may
/// exist per `(alert_id, channel, recipient)` (enforced by a partial
/// unique index).
#[derive(Debug, Clone, Serialize)]
pub struct NotificationLog {
    pub id: Uuid,
    pub alert_id: Uuid,
    pub channel: NotificationChannel,
    pub recipient: String,
    pub sent_at: DateTime<Utc>,
    pub status: DeliveryStatus,
    pub error: Option<String>,
    /// Provider message id on success (synthetic in stub mode).
    pub message_id: Option<String>,
}
