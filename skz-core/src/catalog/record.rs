// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Encoding records: missing persons and loyalty members.
//!
//! Both record kinds carry a fixed-width feature vector and share nothing
//! else of interest. They meet in the narrow [`Compilable`] capability the
//! index compiler consumes.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum VectorError {
    #[error("feature vector has {got} bytes, expected {expected} ({dim} x 4)")]
    DimensionMismatch { got: usize, expected: usize, dim: usize },
}

/// A fixed-width face feature vector.
///
/// Stored as `dim * 4` bytes of little-endian IEEE-754 single-precision
/// values. Any other width is rejected on both read and write.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureVector {
    values: Vec<f32>,
}

impl FeatureVector {
    /// Wraps a float vector, checking its width.
    pub fn new(values: Vec<f32>, dim: usize) -> Result<Self, VectorError> {
        if values.len() != dim {
            return Err(VectorError::DimensionMismatch {
                got: values.len() * 4,
                expected: dim * 4,
                dim,
            });
        }
        Ok(FeatureVector { values })
    }

    /// The all-zero placeholder used for records awaiting a photo.
    pub fn zero(dim: usize) -> Self {
        FeatureVector {
            values: vec![0.0; dim],
        }
    }

    /// Parses the stored byte form, rejecting any width other than
    /// `dim * 4`.
    pub fn from_bytes(bytes: &[u8], dim: usize) -> Result<Self, VectorError> {
        if bytes.len() != dim * 4 {
            return Err(VectorError::DimensionMismatch {
                got: bytes.len(),
                expected: dim * 4,
                dim,
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        Ok(FeatureVector { values })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.values.len() * 4);
        for v in &self.values {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes
    }

    pub fn dim(&self) -> usize {
        self.values.len()
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.values
    }

    /// True for the zero placeholder.
    pub fn is_zero(&self) -> bool {
        self.values.iter().all(|v| *v == 0.0)
    }
}

/// Missing-person case status; only `active` records compile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Active,
    Resolved,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CaseStatus::Active => "active",
            CaseStatus::Resolved => "resolved",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(CaseStatus::Active),
            "resolved" => Some(CaseStatus::Resolved),
            _ => None,
        }
    }
}

/// A missing-person record. Global (no tenant owner).
#[derive(Debug, Clone)]
pub struct MissingPerson {
    pub id: Uuid,
    /// Globally unique case identifier.
    pub case_id: String,
    pub name: String,
    pub age_at_disappearance: Option<u32>,
    pub disappearance_date: Option<NaiveDate>,
    pub last_known_location: Option<String>,
    pub status: CaseStatus,
    pub vector: FeatureVector,
    /// Set when the record was imported without a usable photo and still
    /// carries the zero placeholder vector.
    pub pending_photo: bool,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A loyalty-member record, owned by a tenant.
#[derive(Debug, Clone)]
pub struct LoyaltyMember {
    pub id: Uuid,
    pub tenant_id: Uuid,
    /// Unique within the tenant.
    pub member_code: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub assigned_playlist_id: Option<Uuid>,
    pub last_seen_at: Option<DateTime<Utc>>,
    pub last_seen_store: Option<String>,
    pub vector: FeatureVector,
    pub pending_photo: bool,
    pub photo_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The narrow capability the index compiler consumes: an id, a parsed
/// vector, and the display fields the edge shows when a search row matches.
pub trait Compilable {
    fn record_id(&self) -> Uuid;
    fn vector(&self) -> &FeatureVector;
    fn display_metadata(&self) -> serde_json::Value;
}

impl Compilable for MissingPerson {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn vector(&self) -> &FeatureVector {
        &self.vector
    }

    fn display_metadata(&self) -> serde_json::Value {
        json!({
            "case_id": self.case_id,
            "name": self.name,
            "age_at_disappearance": self.age_at_disappearance,
            "disappearance_date": self.disappearance_date,
            "last_known_location": self.last_known_location,
        })
    }
}

impl Compilable for LoyaltyMember {
    fn record_id(&self) -> Uuid {
        self.id
    }

    fn vector(&self) -> &FeatureVector {
        &self.vector
    }

    fn display_metadata(&self) -> serde_json::Value {
        json!({
            "member_code": self.member_code,
            "name": self.name,
            "assigned_playlist_id": self.assigned_playlist_id,
        })
    }
}
