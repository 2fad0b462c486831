// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Content-metadata storage operations.

use rusqlite::params;
use uuid::Uuid;

use super::tenants::parse_uuid;
use super::{from_db_ts, to_db_ts, Storage, StorageError};
use crate::content::Content;

impl Storage {
    pub fn create_content(&self, content: &Content) -> Result<(), StorageError> {
        self.conn().execute(
            "INSERT INTO content (id, tenant_id, filename, mime_type, duration, \
             download_url, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                content.id.to_string(),
                content.tenant_id.to_string(),
                content.filename,
                content.mime_type,
                content.duration,
                content.download_url,
                to_db_ts(content.created_at),
            ],
        )?;
        Ok(())
    }

    pub fn get_content(&self, id: Uuid) -> Result<Option<Content>, StorageError> {
        let result = self.conn().query_row(
            "SELECT id, tenant_id, filename, mime_type, duration, download_url, created_at \
             FROM content WHERE id = ?1",
            params![id.to_string()],
            row_to_content,
        );
        match result {
            Ok(content) => Ok(Some(content)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(StorageError::Database(e)),
        }
    }
}

fn row_to_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<Content> {
    Ok(Content {
        id: parse_uuid(row.get::<_, String>(0)?)?,
        tenant_id: parse_uuid(row.get::<_, String>(1)?)?,
        filename: row.get(2)?,
        mime_type: row.get(3)?,
        duration: row.get(4)?,
        download_url: row.get(5)?,
        created_at: from_db_ts(row.get(6)?),
    })
}
