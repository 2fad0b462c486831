// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The encoding store: catalog CRUD plus the photo-ingestion compound
//! operation.
//!
//! Photo ingestion decodes and encodes outside any transaction, writes the
//! image file, and persists the record last; every failure path removes
//! whatever partial file exists so the database stays authoritative.

use chrono::{NaiveDate, Utc};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use super::encoder::{sniff_image_format, EncodeError, FaceEncoder};
use super::record::{CaseStatus, FeatureVector, LoyaltyMember, MissingPerson};
use crate::storage::{Storage, StorageError};

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("encoder produced {got} dimensions, expected {expected}")]
    VectorDimensionMismatch { got: usize, expected: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("record not found: {0}")]
    NotFound(Uuid),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Input for a new missing-person record.
#[derive(Debug, Clone)]
pub struct NewMissingPerson {
    pub case_id: String,
    pub name: String,
    pub age_at_disappearance: Option<u32>,
    pub disappearance_date: Option<NaiveDate>,
    pub last_known_location: Option<String>,
}

/// Input for a new loyalty-member record.
#[derive(Debug, Clone)]
pub struct NewLoyaltyMember {
    pub tenant_id: Uuid,
    pub member_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

/// Outcome of a photo ingestion.
#[derive(Debug, Clone)]
pub struct PhotoIngest {
    pub photo_path: String,
    /// The image contained more than one face; the first was used.
    pub multiple_faces: bool,
}

/// Catalog service over the encoding records.
pub struct CatalogStore<'a> {
    storage: &'a Storage,
    encoder: &'a dyn FaceEncoder,
    uploads_dir: PathBuf,
    dim: usize,
}

impl<'a> CatalogStore<'a> {
    pub fn new(
        storage: &'a Storage,
        encoder: &'a dyn FaceEncoder,
        uploads_dir: PathBuf,
        dim: usize,
    ) -> Self {
        CatalogStore {
            storage,
            encoder,
            uploads_dir,
            dim,
        }
    }

    // === Missing persons ===

    /// Creates a record with the zero placeholder vector; the photo
    /// arrives separately.
    pub fn create_missing_person(
        &self,
        input: NewMissingPerson,
    ) -> Result<MissingPerson, CatalogError> {
        if input.case_id.trim().is_empty() {
            return Err(CatalogError::InvalidInput("case_id is required".into()));
        }
        if input.name.trim().is_empty() {
            return Err(CatalogError::InvalidInput("name is required".into()));
        }
        let now = Utc::now();
        let record = MissingPerson {
            id: Uuid::new_v4(),
            case_id: input.case_id,
            name: input.name,
            age_at_disappearance: input.age_at_disappearance,
            disappearance_date: input.disappearance_date,
            last_known_location: input.last_known_location,
            status: CaseStatus::Active,
            vector: FeatureVector::zero(self.dim),
            pending_photo: true,
            photo_path: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_missing_person(&record)?;
        Ok(record)
    }

    /// Ingests a photo for a missing person: encode, store the image file,
    /// persist the vector.
    pub fn attach_missing_person_photo(
        &self,
        id: Uuid,
        image: &[u8],
    ) -> Result<(MissingPerson, PhotoIngest), CatalogError> {
        let mut record = self
            .storage
            .get_missing_person(id, self.dim)?
            .ok_or(CatalogError::NotFound(id))?;

        let (vector, ingest) = self.encode_photo("missing_persons", id, image)?;
        record.vector = vector;
        record.pending_photo = false;
        record.photo_path = Some(ingest.photo_path.clone());
        record.updated_at = Utc::now();

        if let Err(e) = self.storage.update_missing_person(&record) {
            remove_file_quietly(Path::new(&ingest.photo_path));
            return Err(e.into());
        }
        Ok((record, ingest))
    }

    pub fn set_case_status(&self, id: Uuid, status: CaseStatus) -> Result<(), CatalogError> {
        let mut record = self
            .storage
            .get_missing_person(id, self.dim)?
            .ok_or(CatalogError::NotFound(id))?;
        record.status = status;
        record.updated_at = Utc::now();
        self.storage.update_missing_person(&record)?;
        Ok(())
    }

    // === Loyalty members ===

    pub fn create_loyalty_member(
        &self,
        input: NewLoyaltyMember,
    ) -> Result<LoyaltyMember, CatalogError> {
        if input.member_code.trim().is_empty() {
            return Err(CatalogError::InvalidInput("member_code is required".into()));
        }
        if input.name.trim().is_empty() {
            return Err(CatalogError::InvalidInput("name is required".into()));
        }
        let now = Utc::now();
        let record = LoyaltyMember {
            id: Uuid::new_v4(),
            tenant_id: input.tenant_id,
            member_code: input.member_code,
            name: input.name,
            email: input.email,
            phone: input.phone,
            assigned_playlist_id: None,
            last_seen_at: None,
            last_seen_store: None,
            vector: FeatureVector::zero(self.dim),
            pending_photo: true,
            photo_path: None,
            created_at: now,
            updated_at: now,
        };
        self.storage.create_loyalty_member(&record)?;
        Ok(record)
    }

    pub fn attach_loyalty_member_photo(
        &self,
        id: Uuid,
        image: &[u8],
    ) -> Result<(LoyaltyMember, PhotoIngest), CatalogError> {
        let mut record = self
            .storage
            .get_loyalty_member(id, self.dim)?
            .ok_or(CatalogError::NotFound(id))?;

        let (vector, ingest) = self.encode_photo("loyalty_members", id, image)?;
        record.vector = vector;
        record.pending_photo = false;
        record.photo_path = Some(ingest.photo_path.clone());
        record.updated_at = Utc::now();

        if let Err(e) = self.storage.update_loyalty_member(&record) {
            remove_file_quietly(Path::new(&ingest.photo_path));
            return Err(e.into());
        }
        Ok((record, ingest))
    }

    /// Shared photo pipeline: sniff, encode, check width, write the file.
    fn encode_photo(
        &self,
        kind: &str,
        id: Uuid,
        image: &[u8],
    ) -> Result<(FeatureVector, PhotoIngest), CatalogError> {
        let format = sniff_image_format(image)?;
        let encoded = self.encoder.encode(image)?;

        if encoded.vector.len() != self.dim {
            return Err(CatalogError::VectorDimensionMismatch {
                got: encoded.vector.len(),
                expected: self.dim,
            });
        }
        if encoded.multiple_faces {
            warn!(%id, "photo contains multiple faces, using the first");
        }
        let vector = FeatureVector::new(encoded.vector, self.dim)
            .map_err(|e| CatalogError::InvalidInput(e.to_string()))?;

        let dir = self.uploads_dir.join(kind);
        fs::create_dir_all(&dir)?;
        let path = dir.join(format!("{id}.{}", format.extension()));
        if let Err(e) = fs::write(&path, image) {
            remove_file_quietly(&path);
            return Err(e.into());
        }

        Ok((
            vector,
            PhotoIngest {
                photo_path: path.to_string_lossy().into_owned(),
                multiple_faces: encoded.multiple_faces,
            },
        ))
    }
}

fn remove_file_quietly(path: &Path) {
    if path.exists() {
        let _ = fs::remove_file(path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::encoder::MockFaceEncoder;

    const DIM: usize = 32;

    fn jpeg(body: &[u8]) -> Vec<u8> {
        let mut bytes = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46];
        bytes.extend_from_slice(body);
        bytes
    }

    struct Fixture {
        storage: Storage,
        encoder: MockFaceEncoder,
        dir: tempfile::TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            Fixture {
                storage: Storage::in_memory().unwrap(),
                encoder: MockFaceEncoder::new(DIM),
                dir: tempfile::tempdir().unwrap(),
            }
        }

        fn store(&self) -> CatalogStore<'_> {
            CatalogStore::new(
                &self.storage,
                &self.encoder,
                self.dir.path().to_path_buf(),
                DIM,
            )
        }
    }

    #[test]
    fn new_record_awaits_photo() {
        let fx = Fixture::new();
        let record = fx
            .store()
            .create_missing_person(NewMissingPerson {
                case_id: "C-55".into(),
                name: "Kim".into(),
                age_at_disappearance: Some(8),
                disappearance_date: None,
                last_known_location: None,
            })
            .unwrap();
        assert!(record.pending_photo);
        assert!(record.vector.is_zero());

        // Pending records are not eligible for compilation.
        let (eligible, _) = fx.storage.eligible_missing_persons(DIM).unwrap();
        assert!(eligible.is_empty());
    }

    #[test]
    fn photo_ingestion_fills_vector_and_writes_file() {
        let fx = Fixture::new();
        let store = fx.store();
        let record = store
            .create_missing_person(NewMissingPerson {
                case_id: "C-56".into(),
                name: "Kim".into(),
                age_at_disappearance: None,
                disappearance_date: None,
                last_known_location: None,
            })
            .unwrap();

        let (updated, ingest) = store
            .attach_missing_person_photo(record.id, &jpeg(b"kim-photo"))
            .unwrap();
        assert!(!updated.pending_photo);
        assert!(!updated.vector.is_zero());
        assert!(!ingest.multiple_faces);
        assert!(Path::new(&ingest.photo_path).exists());
        assert!(ingest.photo_path.ends_with(&format!("{}.jpg", record.id)));

        let (eligible, _) = fx.storage.eligible_missing_persons(DIM).unwrap();
        assert_eq!(eligible.len(), 1);
    }

    #[test]
    fn multiple_faces_warns_but_succeeds() {
        let fx = Fixture::new();
        let store = fx.store();
        let record = store
            .create_missing_person(NewMissingPerson {
                case_id: "C-57".into(),
                name: "Kim".into(),
                age_at_disappearance: None,
                disappearance_date: None,
                last_known_location: None,
            })
            .unwrap();
        let (_, ingest) = store
            .attach_missing_person_photo(record.id, &jpeg(b"TWOFACES x"))
            .unwrap();
        assert!(ingest.multiple_faces);
    }

    #[test]
    fn failed_encode_leaves_no_file_and_no_change() {
        let fx = Fixture::new();
        let store = fx.store();
        let record = store
            .create_missing_person(NewMissingPerson {
                case_id: "C-58".into(),
                name: "Kim".into(),
                age_at_disappearance: None,
                disappearance_date: None,
                last_known_location: None,
            })
            .unwrap();

        // No face in the photo.
        let err = store
            .attach_missing_person_photo(record.id, &jpeg(b"NOFACE x"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::Encode(EncodeError::NoFaceDetected)));

        // Not an image at all.
        let err = store
            .attach_missing_person_photo(record.id, b"plain text")
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::Encode(EncodeError::UnsupportedImage)
        ));

        // Record untouched, upload directory empty.
        let fetched = fx
            .storage
            .get_missing_person(record.id, DIM)
            .unwrap()
            .unwrap();
        assert!(fetched.pending_photo);
        let uploaded: Vec<_> = walk_files(fx.dir.path());
        assert!(uploaded.is_empty(), "unexpected files: {uploaded:?}");
    }

    #[test]
    fn wrong_encoder_dimension_is_hard_error() {
        let fx = Fixture::new();
        let wide_encoder = MockFaceEncoder::new(DIM * 2);
        let store = CatalogStore::new(
            &fx.storage,
            &wide_encoder,
            fx.dir.path().to_path_buf(),
            DIM,
        );
        let record = store
            .create_missing_person(NewMissingPerson {
                case_id: "C-59".into(),
                name: "Kim".into(),
                age_at_disappearance: None,
                disappearance_date: None,
                last_known_location: None,
            })
            .unwrap();
        let err = store
            .attach_missing_person_photo(record.id, &jpeg(b"photo"))
            .unwrap_err();
        assert!(matches!(
            err,
            CatalogError::VectorDimensionMismatch { got, expected }
                if got == DIM * 2 && expected == DIM
        ));
    }

    fn walk_files(root: &Path) -> Vec<PathBuf> {
        let mut files = Vec::new();
        let mut stack = vec![root.to_path_buf()];
        while let Some(dir) = stack.pop() {
            if let Ok(entries) = fs::read_dir(&dir) {
                for entry in entries.flatten() {
                    let path = entry.path();
                    if path.is_dir() {
                        stack.push(path);
                    } else {
                        files.push(path);
                    }
                }
            }
        }
        files
    }
}
