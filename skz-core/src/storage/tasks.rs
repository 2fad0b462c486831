// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Durable task-queue storage operations.
//!
//! Claiming a due task moves it to `running` and grants a lease; the task
//! is acknowledged only by `complete`/`fail`. Expired leases are swept
//! back to `queued` so a crashed worker's tasks are redelivered.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{to_db_ts, Storage, StorageError};
use crate::worker::TaskStatus;

/// A claimed queue row handed to the executor.
#[derive(Debug, Clone)]
pub struct ClaimedTask {
    pub id: Uuid,
    pub kind: String,
    pub payload: String,
    pub attempts: u32,
    pub max_attempts: u32,
}

impl Storage {
    /// Enqueues a task to run at `run_at`.
    pub fn enqueue_task(
        &self,
        id: Uuid,
        kind: &str,
        payload: &str,
        run_at: DateTime<Utc>,
        max_attempts: u32,
        now: DateTime<Utc>,
    ) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO tasks (id, kind, payload, run_at, attempts, max_attempts, \
             lease_expires_at, status, last_error, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 0, ?5, NULL, 'queued', NULL, ?6, ?6)",
            params![
                id.to_string(),
                kind,
                payload,
                to_db_ts(run_at),
                max_attempts,
                to_db_ts(now),
            ],
        )?;
        Ok(())
    }

    /// Claims up to `limit` due tasks: each moves to `running` with a
    /// lease and its attempt counter bumped.
    pub fn claim_due_tasks(
        &self,
        now: DateTime<Utc>,
        lease: chrono::Duration,
        limit: usize,
    ) -> Result<Vec<ClaimedTask>, StorageError> {
        self.in_transaction(|s| {
            let mut stmt = s.conn().prepare(
                "SELECT id FROM tasks WHERE status = 'queued' AND run_at <= ?1 \
                 ORDER BY run_at LIMIT ?2",
            )?;
            let ids: Vec<String> = stmt
                .query_map(params![to_db_ts(now), limit as i64], |row| row.get(0))?
                .collect::<Result<Vec<_>, _>>()?;
            drop(stmt);

            let mut claimed = Vec::with_capacity(ids.len());
            for id in ids {
                s.conn().execute(
                    "UPDATE tasks SET status = 'running', attempts = attempts + 1, \
                     lease_expires_at = ?1, updated_at = ?2 WHERE id = ?3",
                    params![to_db_ts(now + lease), to_db_ts(now), id],
                )?;
                let task = s.conn().query_row(
                    "SELECT id, kind, payload, attempts, max_attempts FROM tasks WHERE id = ?1",
                    params![id],
                    |row| {
                        Ok(ClaimedTask {
                            id: parse_uuid(row.get::<_, String>(0)?)?,
                            kind: row.get(1)?,
                            payload: row.get(2)?,
                            attempts: row.get::<_, i64>(3)? as u32,
                            max_attempts: row.get::<_, i64>(4)? as u32,
                        })
                    },
                )?;
                claimed.push(task);
            }
            Ok(claimed)
        })
    }

    /// Acknowledges a task as done.
    pub fn complete_task(&self, id: Uuid, now: DateTime<Utc>) -> Result<(), StorageError> {
        self.conn().execute(
            "UPDATE tasks SET status = 'done', lease_expires_at = NULL, updated_at = ?1 \
             WHERE id = ?2",
            params![to_db_ts(now), id.to_string()],
        )?;
        Ok(())
    }

    /// Records a failed attempt: requeued at `retry_at` while the budget
    /// lasts, terminal `failed` afterwards (or immediately when
    /// `retryable` is false).
    pub fn fail_task(
        &self,
        id: Uuid,
        error: &str,
        retryable: bool,
        retry_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Result<TaskStatus, StorageError> {
        let (attempts, max_attempts): (i64, i64) = self.conn().query_row(
            "SELECT attempts, max_attempts FROM tasks WHERE id = ?1",
            params![id.to_string()],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let status = if retryable && attempts < max_attempts {
            TaskStatus::Queued
        } else {
            TaskStatus::Failed
        };
        self.conn().execute(
            "UPDATE tasks SET status = ?1, run_at = ?2, last_error = ?3, \
             lease_expires_at = NULL, updated_at = ?4 WHERE id = ?5",
            params![
                status.as_str(),
                to_db_ts(retry_at),
                error,
                to_db_ts(now),
                id.to_string(),
            ],
        )?;
        Ok(status)
    }

    /// Returns `running` tasks with expired leases to the queue
    /// (late-acknowledgement redelivery). Returns how many were reclaimed.
    pub fn reclaim_expired_tasks(&self, now: DateTime<Utc>) -> Result<usize, StorageError> {
        let reclaimed = self.conn().execute(
            "UPDATE tasks SET status = 'queued', lease_expires_at = NULL, updated_at = ?1 \
             WHERE status = 'running' AND lease_expires_at IS NOT NULL \
             AND lease_expires_at < ?1",
            params![to_db_ts(now)],
        )?;
        Ok(reclaimed)
    }

    pub fn task_status(&self, id: Uuid) -> Result<Option<(TaskStatus, Option<String>)>, StorageError> {
        let result = self.conn().query_row(
            "SELECT status, last_error FROM tasks WHERE id = ?1",
            params![id.to_string()],
            |row| {
                let status_str: String = row.get(0)?;
                Ok((status_str, row.get::<_, Option<String>>(1)?))
            },
        );
        match result {
            Ok((status_str, error)) => Ok(Some((
                TaskStatus::parse(&status_str).unwrap_or(TaskStatus::Failed),
                error,
            ))),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// Due-task probe used by tests and the daemon's readiness probe.
    pub fn queued_task_count(&self) -> Result<u64, StorageError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM tasks WHERE status = 'queued'",
            [],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn enqueue(storage: &Storage, run_at: DateTime<Utc>) -> Uuid {
        let id = Uuid::new_v4();
        storage
            .enqueue_task(id, "send_notification", "{}", run_at, 3, Utc::now())
            .unwrap();
        id
    }

    #[test]
    fn claim_respects_run_at_and_limit() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        let due_a = enqueue(&storage, now - Duration::seconds(10));
        let due_b = enqueue(&storage, now - Duration::seconds(5));
        let _future = enqueue(&storage, now + Duration::seconds(600));

        let claimed = storage
            .claim_due_tasks(now, Duration::seconds(60), 10)
            .unwrap();
        let ids: Vec<Uuid> = claimed.iter().map(|t| t.id).collect();
        assert_eq!(ids, vec![due_a, due_b]);
        assert_eq!(claimed[0].attempts, 1);

        // Claimed tasks are no longer due.
        assert!(storage
            .claim_due_tasks(now, Duration::seconds(60), 10)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn retry_budget_ends_in_terminal_failure() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        let id = enqueue(&storage, now);

        for attempt in 1..=3 {
            let claimed = storage
                .claim_due_tasks(now, Duration::seconds(60), 1)
                .unwrap();
            assert_eq!(claimed.len(), 1, "attempt {attempt} should be claimable");
            let status = storage
                .fail_task(id, "provider 502", true, now, now)
                .unwrap();
            if attempt < 3 {
                assert_eq!(status, TaskStatus::Queued);
            } else {
                assert_eq!(status, TaskStatus::Failed);
            }
        }

        let (status, error) = storage.task_status(id).unwrap().unwrap();
        assert_eq!(status, TaskStatus::Failed);
        assert_eq!(error.as_deref(), Some("provider 502"));
    }

    #[test]
    fn non_retryable_failure_is_immediately_terminal() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        let id = enqueue(&storage, now);
        storage
            .claim_due_tasks(now, Duration::seconds(60), 1)
            .unwrap();
        let status = storage
            .fail_task(id, "invalid recipient", false, now, now)
            .unwrap();
        assert_eq!(status, TaskStatus::Failed);
    }

    #[test]
    fn expired_leases_are_reclaimed() {
        let storage = Storage::in_memory().unwrap();
        let now = Utc::now();
        let id = enqueue(&storage, now);
        storage
            .claim_due_tasks(now, Duration::seconds(30), 1)
            .unwrap();

        // Lease still valid: nothing reclaimed.
        assert_eq!(storage.reclaim_expired_tasks(now).unwrap(), 0);

        let later = now + Duration::seconds(31);
        assert_eq!(storage.reclaim_expired_tasks(later).unwrap(), 1);
        let claimed = storage
            .claim_due_tasks(later, Duration::seconds(30), 1)
            .unwrap();
        assert_eq!(claimed[0].id, id);
        assert_eq!(claimed[0].attempts, 2);
    }
}
