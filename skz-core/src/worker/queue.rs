// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Typed facade over the durable task table.

use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use super::{TaskError, TaskKind};
use crate::storage::{ClaimedTask, Storage, StorageError};

/// Backoff ceiling: one hour.
const MAX_BACKOFF_SECS: u64 = 3600;

/// Exponential backoff for a task that has made `attempts` attempts:
/// `base * 2^(attempts-1)`, capped at one hour.
pub fn backoff_delay(base: std::time::Duration, attempts: u32) -> std::time::Duration {
    let factor = 1u64 << attempts.saturating_sub(1).min(20);
    std::time::Duration::from_secs((base.as_secs().saturating_mul(factor)).min(MAX_BACKOFF_SECS))
}

/// Typed queue operations.
pub struct TaskQueue<'a> {
    storage: &'a Storage,
}

impl<'a> TaskQueue<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        TaskQueue { storage }
    }

    /// Enqueues a task to run at `run_at`.
    pub fn enqueue(
        &self,
        kind: TaskKind,
        run_at: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Uuid, TaskError> {
        Ok(self.enqueue_in_tx(self.storage, kind, run_at, max_attempts)?)
    }

    /// Enqueue variant usable inside a storage transaction closure.
    pub fn enqueue_in_tx(
        &self,
        storage: &Storage,
        kind: TaskKind,
        run_at: DateTime<Utc>,
        max_attempts: u32,
    ) -> Result<Uuid, StorageError> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_string(&kind)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        storage.enqueue_task(id, kind.label(), &payload, run_at, max_attempts, Utc::now())?;
        Ok(id)
    }

    /// Claims due tasks and parses their payloads. A task whose payload
    /// no longer parses is failed terminally instead of being returned.
    pub fn claim_due(
        &self,
        now: DateTime<Utc>,
        lease: std::time::Duration,
        limit: usize,
    ) -> Result<Vec<(ClaimedTask, TaskKind)>, TaskError> {
        let lease = Duration::seconds(lease.as_secs() as i64);
        let claimed = self.storage.claim_due_tasks(now, lease, limit)?;
        let mut tasks = Vec::with_capacity(claimed.len());
        for task in claimed {
            match serde_json::from_str::<TaskKind>(&task.payload) {
                Ok(kind) => tasks.push((task, kind)),
                Err(e) => {
                    self.storage.fail_task(
                        task.id,
                        &format!("corrupt payload: {e}"),
                        false,
                        now,
                        now,
                    )?;
                }
            }
        }
        Ok(tasks)
    }
}
