// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Versioned index compilation.
//!
//! Builds an immutable, hash-sealed index artifact plus JSON sidecar from
//! the eligible catalog records of a scope, then prunes versions beyond
//! retention. The index build happens entirely outside any database
//! transaction; only the final registry row is a write.

use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use super::artifact::{IndexArtifact, IndexScope, Sidecar, SidecarRecord};
use super::flat::{FlatIndex, FlatIndexError};
use super::integrity;
use crate::catalog::Compilable;
use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum CompileError {
    /// No eligible records; nothing was written.
    #[error("no eligible records to compile for scope {0}")]
    EmptyScope(IndexScope),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Index(#[from] FlatIndexError),

    #[error("sidecar serialization failed: {0}")]
    Serialization(String),
}

/// Result of one compile run.
#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub artifact: IndexArtifact,
    /// Record keys skipped for an invalid stored vector.
    pub skipped: Vec<String>,
}

/// Compiles catalog scopes into versioned artifacts.
pub struct IndexCompiler<'a> {
    storage: &'a Storage,
    databases_root: PathBuf,
    dim: usize,
    versions_to_keep: usize,
}

impl<'a> IndexCompiler<'a> {
    pub fn new(
        storage: &'a Storage,
        databases_root: PathBuf,
        dim: usize,
        versions_to_keep: usize,
    ) -> Self {
        IndexCompiler {
            storage,
            databases_root,
            dim,
            versions_to_keep,
        }
    }

    /// Compiles one scope into the next version.
    pub fn compile(&self, scope: IndexScope) -> Result<CompileOutcome, CompileError> {
        let (records, skipped): (Vec<Box<dyn Compilable>>, Vec<String>) = match scope {
            IndexScope::MissingPersons => {
                let (records, skipped) = self.storage.eligible_missing_persons(self.dim)?;
                (
                    records
                        .into_iter()
                        .map(|r| Box::new(r) as Box<dyn Compilable>)
                        .collect(),
                    skipped,
                )
            }
            IndexScope::Loyalty(tenant_id) => {
                let (records, skipped) =
                    self.storage.eligible_loyalty_members(tenant_id, self.dim)?;
                (
                    records
                        .into_iter()
                        .map(|r| Box::new(r) as Box<dyn Compilable>)
                        .collect(),
                    skipped,
                )
            }
        };

        for key in &skipped {
            warn!(%scope, record = %key, "skipping record with invalid stored vector");
        }
        if records.is_empty() {
            return Err(CompileError::EmptyScope(scope));
        }

        let version = self.storage.max_artifact_version(scope)? + 1;
        let dir = scope.directory(&self.databases_root);
        fs::create_dir_all(&dir)?;
        let index_path = dir.join(scope.file_name(version));
        let sidecar_path = index_path.with_extension("json");

        let result = self.build_and_seal(scope, version, &records, &index_path, &sidecar_path);
        let artifact = match result {
            Ok(artifact) => artifact,
            Err(e) => {
                // No registry row exists yet; remove whatever partial
                // files the failed run left behind.
                remove_quietly(&index_path);
                remove_quietly(&sidecar_path);
                return Err(e);
            }
        };

        self.prune(scope)?;

        info!(
            %scope,
            version = artifact.version,
            records = artifact.record_count,
            "index compiled"
        );
        Ok(CompileOutcome { artifact, skipped })
    }

    fn build_and_seal(
        &self,
        scope: IndexScope,
        version: u32,
        records: &[Box<dyn Compilable>],
        index_path: &Path,
        sidecar_path: &Path,
    ) -> Result<IndexArtifact, CompileError> {
        // Stack vectors in enumeration order; row i belongs to records[i].
        let mut index = FlatIndex::new(self.dim as u32);
        for record in records {
            index.add(record.vector().as_slice())?;
        }

        // Write-temp, fsync, rename.
        let tmp_path = index_path.with_extension("idx.tmp");
        let bytes = index.to_bytes()?;
        {
            let file = fs::File::create(&tmp_path)?;
            use std::io::Write;
            let mut writer = std::io::BufWriter::new(file);
            writer.write_all(&bytes)?;
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp_path, index_path) {
            remove_quietly(&tmp_path);
            return Err(e.into());
        }

        let hash = integrity::hash_file(index_path)?;
        let compiled_at = Utc::now();

        let sidecar = Sidecar {
            version,
            scope: scope.key(),
            record_count: records.len() as u32,
            hash: hash.clone(),
            compiled_at,
            records: records
                .iter()
                .enumerate()
                .map(|(idx, record)| SidecarRecord {
                    idx: idx as u32,
                    id: record.record_id(),
                    display: record.display_metadata(),
                })
                .collect(),
        };
        let sidecar_json = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| CompileError::Serialization(e.to_string()))?;
        fs::write(sidecar_path, sidecar_json)?;

        let artifact = IndexArtifact {
            id: Uuid::new_v4(),
            scope,
            version,
            record_count: records.len() as u32,
            hash,
            path: index_path.to_path_buf(),
            created_at: compiled_at,
        };
        self.storage.insert_artifact(&artifact)?;
        Ok(artifact)
    }

    /// Deletes artifacts beyond retention, oldest first. The registry row
    /// goes first so no new reader can pick the version up, then the
    /// files; open download handles keep working until closed.
    fn prune(&self, scope: IndexScope) -> Result<(), CompileError> {
        let artifacts = self.storage.list_artifacts(scope)?;
        if artifacts.len() <= self.versions_to_keep {
            return Ok(());
        }
        for stale in &artifacts[self.versions_to_keep..] {
            if let Err(e) = self.storage.delete_artifact(stale.id) {
                warn!(%scope, version = stale.version, error = %e, "failed to prune artifact row");
                continue;
            }
            remove_quietly(&stale.path);
            remove_quietly(&stale.sidecar_path());
            info!(%scope, version = stale.version, "pruned old index version");
        }
        Ok(())
    }
}

fn remove_quietly(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}
