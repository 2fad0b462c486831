// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The artifact registry: version lookup and artifact serving.

use std::fs::File;
use std::io;
use thiserror::Error;

use super::artifact::{IndexArtifact, IndexScope, Sidecar};
use super::integrity;
use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("no artifact for scope {0}")]
    NoArtifact(IndexScope),

    #[error("version {version} not found for scope {scope}")]
    VersionNotFound { scope: IndexScope, version: u32 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("sidecar is corrupt: {0}")]
    CorruptSidecar(String),
}

/// Read-side access to compiled artifacts.
pub struct ArtifactRegistry<'a> {
    storage: &'a Storage,
}

impl<'a> ArtifactRegistry<'a> {
    pub fn new(storage: &'a Storage) -> Self {
        ArtifactRegistry { storage }
    }

    pub fn latest(&self, scope: IndexScope) -> Result<IndexArtifact, RegistryError> {
        self.storage
            .latest_artifact(scope)?
            .ok_or(RegistryError::NoArtifact(scope))
    }

    pub fn by_version(
        &self,
        scope: IndexScope,
        version: u32,
    ) -> Result<IndexArtifact, RegistryError> {
        self.storage
            .artifact_by_version(scope, version)?
            .ok_or(RegistryError::VersionNotFound { scope, version })
    }

    pub fn list(&self, scope: IndexScope) -> Result<Vec<IndexArtifact>, RegistryError> {
        Ok(self.storage.list_artifacts(scope)?)
    }

    /// Opens the index file for streaming to a device.
    pub fn open_index(&self, artifact: &IndexArtifact) -> Result<File, RegistryError> {
        Ok(File::open(&artifact.path)?)
    }

    /// Reads and parses the metadata sidecar.
    pub fn read_sidecar(&self, artifact: &IndexArtifact) -> Result<Sidecar, RegistryError> {
        let bytes = std::fs::read(artifact.sidecar_path())?;
        serde_json::from_slice(&bytes).map_err(|e| RegistryError::CorruptSidecar(e.to_string()))
    }

    /// Recomputes the file hash and compares it with the registry row.
    pub fn verify(&self, artifact: &IndexArtifact) -> Result<bool, RegistryError> {
        Ok(integrity::verify_file(&artifact.path, &artifact.hash)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{CaseStatus, FeatureVector, MissingPerson};
    use crate::index::IndexCompiler;
    use chrono::Utc;
    use uuid::Uuid;

    const DIM: usize = 8;

    #[test]
    fn lookup_verify_and_read_back() {
        let storage = Storage::in_memory().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let now = Utc::now();
        storage
            .create_missing_person(&MissingPerson {
                id: Uuid::new_v4(),
                case_id: "C-1".into(),
                name: "Jo".into(),
                age_at_disappearance: None,
                disappearance_date: None,
                last_known_location: None,
                status: CaseStatus::Active,
                vector: FeatureVector::new(vec![0.7; DIM], DIM).unwrap(),
                pending_photo: false,
                photo_path: None,
                created_at: now,
                updated_at: now,
            })
            .unwrap();

        let compiler = IndexCompiler::new(&storage, dir.path().to_path_buf(), DIM, 5);
        compiler.compile(IndexScope::MissingPersons).unwrap();

        let registry = ArtifactRegistry::new(&storage);
        let latest = registry.latest(IndexScope::MissingPersons).unwrap();
        assert_eq!(latest.version, 1);
        assert!(registry.verify(&latest).unwrap());

        let sidecar = registry.read_sidecar(&latest).unwrap();
        assert_eq!(sidecar.records.len(), 1);
        assert_eq!(sidecar.records[0].display["case_id"], "C-1");

        assert!(registry.open_index(&latest).is_ok());
        assert!(matches!(
            registry.by_version(IndexScope::MissingPersons, 4),
            Err(RegistryError::VersionNotFound { version: 4, .. })
        ));
        assert!(matches!(
            registry.latest(IndexScope::Loyalty(Uuid::new_v4())),
            Err(RegistryError::NoArtifact(_))
        ));
    }
}
