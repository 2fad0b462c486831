// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Index artifact identity: scopes and registry rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// What an index covers: the global missing-persons catalog or one
/// tenant's loyalty members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexScope {
    MissingPersons,
    Loyalty(Uuid),
}

impl IndexScope {
    /// The stored key for this scope.
    pub fn key(&self) -> String {
        match self {
            IndexScope::MissingPersons => "missing_persons".to_string(),
            IndexScope::Loyalty(tenant_id) => format!("loyalty:{tenant_id}"),
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s == "missing_persons" {
            return Some(IndexScope::MissingPersons);
        }
        let tenant = s.strip_prefix("loyalty:")?;
        Uuid::parse_str(tenant).ok().map(IndexScope::Loyalty)
    }

    /// Directory for this scope's artifacts under the databases root.
    pub fn directory(&self, databases_root: &Path) -> PathBuf {
        match self {
            IndexScope::MissingPersons => databases_root.join("missing_persons"),
            IndexScope::Loyalty(tenant_id) => {
                databases_root.join("loyalty").join(tenant_id.to_string())
            }
        }
    }

    /// Index file name for a version of this scope.
    pub fn file_name(&self, version: u32) -> String {
        match self {
            IndexScope::MissingPersons => format!("missing_persons_v{version}.idx"),
            IndexScope::Loyalty(tenant_id) => format!("loyalty_{tenant_id}_v{version}.idx"),
        }
    }
}

impl fmt::Display for IndexScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

/// A registry row describing one immutable compiled index version.
#[derive(Debug, Clone, Serialize)]
pub struct IndexArtifact {
    pub id: Uuid,
    #[serde(serialize_with = "serialize_scope")]
    pub scope: IndexScope,
    pub version: u32,
    pub record_count: u32,
    /// Lowercase hex SHA-256 of the index file bytes.
    pub hash: String,
    pub path: PathBuf,
    pub created_at: DateTime<Utc>,
}

fn serialize_scope<S: serde::Serializer>(scope: &IndexScope, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_str(&scope.key())
}

impl IndexArtifact {
    /// The sidecar JSON path: the index path with a `.json` suffix.
    pub fn sidecar_path(&self) -> PathBuf {
        self.path.with_extension("json")
    }
}

/// One row of the sidecar's record table. `idx` is the 0-based row number
/// within the index, so the edge can map a search result back to a display
/// record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarRecord {
    pub idx: u32,
    pub id: Uuid,
    #[serde(flatten)]
    pub display: serde_json::Value,
}

/// The metadata sidecar written next to every index file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sidecar {
    pub version: u32,
    pub scope: String,
    pub record_count: u32,
    pub hash: String,
    pub compiled_at: DateTime<Utc>,
    pub records: Vec<SidecarRecord>,
}
