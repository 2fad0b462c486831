// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Index-artifact registry rows.

use rusqlite::params;
use std::path::PathBuf;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, to_db_ts, Storage, StorageError};
use crate::index::{IndexArtifact, IndexScope};

const ARTIFACT_COLUMNS: &str = "id, scope, version, record_count, hash, path, created_at";

impl Storage {
    pub fn insert_artifact(&self, artifact: &IndexArtifact) -> Result<(), StorageError> {
        let result = self.conn().execute(
            "INSERT INTO index_artifacts (id, scope, version, record_count, hash, path, \
             created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                artifact.id.to_string(),
                artifact.scope.key(),
                artifact.version,
                artifact.record_count,
                artifact.hash,
                artifact.path.to_string_lossy().into_owned(),
                to_db_ts(artifact.created_at),
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(e) => {
                let wrapped = StorageError::Database(e);
                if wrapped.is_unique_violation() {
                    Err(StorageError::AlreadyExists(format!(
                        "artifact {} v{}",
                        artifact.scope, artifact.version
                    )))
                } else {
                    Err(wrapped)
                }
            }
        }
    }

    /// Highest committed version for a scope (0 when none).
    pub fn max_artifact_version(&self, scope: IndexScope) -> Result<u32, StorageError> {
        let version: Option<i64> = self.conn().query_row(
            "SELECT MAX(version) FROM index_artifacts WHERE scope = ?1",
            params![scope.key()],
            |row| row.get(0),
        )?;
        Ok(version.unwrap_or(0) as u32)
    }

    pub fn latest_artifact(&self, scope: IndexScope) -> Result<Option<IndexArtifact>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {ARTIFACT_COLUMNS} FROM index_artifacts \
                 WHERE scope = ?1 ORDER BY version DESC LIMIT 1"
            ),
            params![scope.key()],
            row_to_artifact,
        );
        match result {
            Ok(artifact) => Ok(Some(artifact)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    pub fn artifact_by_version(
        &self,
        scope: IndexScope,
        version: u32,
    ) -> Result<Option<IndexArtifact>, StorageError> {
        let result = self.conn().query_row(
            &format!(
                "SELECT {ARTIFACT_COLUMNS} FROM index_artifacts \
                 WHERE scope = ?1 AND version = ?2"
            ),
            params![scope.key(), version],
            row_to_artifact,
        );
        match result {
            Ok(artifact) => Ok(Some(artifact)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }

    /// All artifacts for a scope, newest first.
    pub fn list_artifacts(&self, scope: IndexScope) -> Result<Vec<IndexArtifact>, StorageError> {
        let mut stmt = self.conn().prepare(&format!(
            "SELECT {ARTIFACT_COLUMNS} FROM index_artifacts \
             WHERE scope = ?1 ORDER BY version DESC"
        ))?;
        let rows = stmt.query_map(params![scope.key()], row_to_artifact)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(StorageError::Database)
    }

    pub fn delete_artifact(&self, id: Uuid) -> Result<(), StorageError> {
        let deleted = self.conn().execute(
            "DELETE FROM index_artifacts WHERE id = ?1",
            params![id.to_string()],
        )?;
        if deleted == 0 {
            return Err(StorageError::NotFound(format!("artifact {id}")));
        }
        Ok(())
    }
}

fn row_to_artifact(row: &rusqlite::Row<'_>) -> rusqlite::Result<IndexArtifact> {
    let scope_str: String = row.get(1)?;
    let scope = IndexScope::parse(&scope_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            rusqlite::types::Type::Text,
            format!("bad scope '{scope_str}'").into(),
        )
    })?;
    Ok(IndexArtifact {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        scope,
        version: row.get::<_, i64>(2)? as u32,
        record_count: row.get::<_, i64>(3)? as u32,
        hash: row.get(4)?,
        path: PathBuf::from(row.get::<_, String>(5)?),
        created_at: from_db_ts(row.get(6)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn artifact(scope: IndexScope, version: u32) -> IndexArtifact {
        IndexArtifact {
            id: Uuid::new_v4(),
            scope,
            version,
            record_count: 3,
            hash: "ab".repeat(32),
            path: PathBuf::from(format!("/tmp/{}", scope.file_name(version))),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn versions_are_per_scope() {
        let storage = Storage::in_memory().unwrap();
        let tenant = Uuid::new_v4();
        let mp = IndexScope::MissingPersons;
        let loyal = IndexScope::Loyalty(tenant);

        storage.insert_artifact(&artifact(mp, 1)).unwrap();
        storage.insert_artifact(&artifact(mp, 2)).unwrap();
        storage.insert_artifact(&artifact(loyal, 1)).unwrap();

        assert_eq!(storage.max_artifact_version(mp).unwrap(), 2);
        assert_eq!(storage.max_artifact_version(loyal).unwrap(), 1);
        assert_eq!(
            storage.latest_artifact(mp).unwrap().unwrap().version,
            2
        );
        assert_eq!(storage.list_artifacts(mp).unwrap().len(), 2);
        assert!(storage
            .artifact_by_version(mp, 9)
            .unwrap()
            .is_none());
    }

    #[test]
    fn duplicate_scope_version_conflicts() {
        let storage = Storage::in_memory().unwrap();
        let mp = IndexScope::MissingPersons;
        storage.insert_artifact(&artifact(mp, 1)).unwrap();
        let err = storage.insert_artifact(&artifact(mp, 1)).unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));
    }
}
