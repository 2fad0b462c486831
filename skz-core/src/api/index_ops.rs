// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Index operations on the facade: compile requests and artifact
//! serving.

use chrono::Utc;
use std::fs::File;
use uuid::Uuid;

use super::central::CentralHub;
use super::error::CoreResult;
use crate::index::{CompileOutcome, IndexArtifact, IndexScope, Sidecar};
use crate::worker::TaskKind;

impl CentralHub {
    /// Runs a compile synchronously (worker entry; also convenient in
    /// tests).
    pub fn compile_index(&self, scope: IndexScope) -> CoreResult<CompileOutcome> {
        Ok(self.compiler().compile(scope)?)
    }

    /// Queues a compile on the worker pool; returns the task id the
    /// caller can poll.
    pub fn request_compile(&self, scope: IndexScope) -> CoreResult<Uuid> {
        let kind = match scope {
            IndexScope::MissingPersons => TaskKind::CompileMissingPersons,
            IndexScope::Loyalty(tenant_id) => TaskKind::CompileLoyalty { tenant_id },
        };
        let task_id = self.task_queue().enqueue(
            kind,
            Utc::now(),
            self.config().notification_max_retries,
        )?;
        Ok(task_id)
    }

    /// `latest(scope)`.
    pub fn latest_index(&self, scope: IndexScope) -> CoreResult<IndexArtifact> {
        Ok(self.artifacts().latest(scope)?)
    }

    /// `by_version(scope, version)`.
    pub fn index_by_version(&self, scope: IndexScope, version: u32) -> CoreResult<IndexArtifact> {
        Ok(self.artifacts().by_version(scope, version)?)
    }

    /// `list(scope)`, newest first.
    pub fn list_indexes(&self, scope: IndexScope) -> CoreResult<Vec<IndexArtifact>> {
        Ok(self.artifacts().list(scope)?)
    }

    /// Opens the artifact file for a streaming download response.
    pub fn open_index_download(&self, artifact: &IndexArtifact) -> CoreResult<File> {
        Ok(self.artifacts().open_index(artifact)?)
    }

    /// Reads the sidecar served under `…/download/metadata`.
    pub fn index_sidecar(&self, artifact: &IndexArtifact) -> CoreResult<Sidecar> {
        Ok(self.artifacts().read_sidecar(artifact)?)
    }

    /// Integrity check used by operational tooling.
    pub fn verify_index(&self, artifact: &IndexArtifact) -> CoreResult<bool> {
        Ok(self.artifacts().verify(artifact)?)
    }
}
