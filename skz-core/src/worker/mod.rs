// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Durable background tasks.
//!
//! Long work (compilation, notification dispatch, bulk imports) runs off
//! the request path. The queue is a database table; a claimed task holds a
//! lease and is acknowledged only by completion, so a crashed worker's
//! tasks are redelivered when the lease expires.

pub mod executor;
pub mod queue;

pub use executor::{TaskExecutor, TaskOutcome};
pub use queue::TaskQueue;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::alert::NotificationChannel;

#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    #[error("task payload is corrupt: {0}")]
    CorruptPayload(String),

    #[error("task timed out after {0} seconds")]
    Timeout(u64),
}

/// Queue status of a task row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Queued => "queued",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "queued" => Some(TaskStatus::Queued),
            "running" => Some(TaskStatus::Running),
            "done" => Some(TaskStatus::Done),
            "failed" => Some(TaskStatus::Failed),
            _ => None,
        }
    }
}

/// Everything the worker pool knows how to run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskKind {
    /// Dispatch one notification rule for one alert (delayed rules land
    /// here with `run_at` in the future).
    SendNotification { alert_id: Uuid, rule_id: Uuid },

    /// Operator broadcast to an explicit recipient list.
    SendBulkNotification {
        channel: NotificationChannel,
        recipients: Vec<String>,
        subject: String,
        body: String,
    },

    /// Deliver one playlist version to one device.
    SyncPlaylistToDevice {
        playlist_id: Uuid,
        device_id: Uuid,
        version: u32,
    },

    /// Rebuild the global missing-persons index.
    CompileMissingPersons,

    /// Rebuild one tenant's loyalty index.
    CompileLoyalty { tenant_id: Uuid },

    /// Bulk import of loyalty members from an uploaded file.
    ImportLoyaltyMembers {
        tenant_id: Uuid,
        path: String,
        format: ImportFormat,
    },
}

impl TaskKind {
    /// Short label used for logging and the `kind` column.
    pub fn label(&self) -> &'static str {
        match self {
            TaskKind::SendNotification { .. } => "send_notification",
            TaskKind::SendBulkNotification { .. } => "send_bulk_notification",
            TaskKind::SyncPlaylistToDevice { .. } => "sync_playlist_to_device",
            TaskKind::CompileMissingPersons => "compile_missing_persons",
            TaskKind::CompileLoyalty { .. } => "compile_loyalty",
            TaskKind::ImportLoyaltyMembers { .. } => "import_loyalty_members",
        }
    }
}

/// Bulk import file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportFormat {
    Csv,
    Json,
}

/// Aggregate outcome of a bulk send: every item delivered, some delivered,
/// or none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkOutcome {
    Ok,
    Partial,
    Error,
}

impl BulkOutcome {
    pub fn from_counts(sent: usize, failed: usize) -> Self {
        match (sent, failed) {
            (_, 0) => BulkOutcome::Ok,
            (0, _) => BulkOutcome::Error,
            _ => BulkOutcome::Partial,
        }
    }
}
