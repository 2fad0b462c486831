// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Catalog operations on the facade.

use chrono::Utc;
use uuid::Uuid;

use super::central::CentralHub;
use super::error::{CoreError, CoreResult};
use crate::catalog::{
    import_loyalty_members_csv, import_loyalty_members_json, CaseStatus, ImportReport,
    LoyaltyMember, MissingPerson, NewLoyaltyMember, NewMissingPerson, PhotoIngest,
};
use crate::worker::{ImportFormat, TaskKind};

impl CentralHub {
    // === Missing persons ===

    pub fn create_missing_person(&self, input: NewMissingPerson) -> CoreResult<MissingPerson> {
        Ok(self.catalog().create_missing_person(input)?)
    }

    pub fn attach_missing_person_photo(
        &self,
        id: Uuid,
        image: &[u8],
    ) -> CoreResult<(MissingPerson, PhotoIngest)> {
        Ok(self.catalog().attach_missing_person_photo(id, image)?)
    }

    pub fn set_case_status(&self, id: Uuid, status: CaseStatus) -> CoreResult<()> {
        Ok(self.catalog().set_case_status(id, status)?)
    }

    pub fn get_missing_person(&self, id: Uuid) -> CoreResult<MissingPerson> {
        self.storage()
            .get_missing_person(id, self.config().feature_dim)?
            .ok_or_else(|| CoreError::NotFound(format!("missing person {id}")))
    }

    pub fn delete_missing_person(&self, id: Uuid) -> CoreResult<()> {
        Ok(self.storage().delete_missing_person(id)?)
    }

    // === Loyalty members ===

    pub fn create_loyalty_member(&self, input: NewLoyaltyMember) -> CoreResult<LoyaltyMember> {
        Ok(self.catalog().create_loyalty_member(input)?)
    }

    pub fn attach_loyalty_member_photo(
        &self,
        id: Uuid,
        image: &[u8],
    ) -> CoreResult<(LoyaltyMember, PhotoIngest)> {
        Ok(self.catalog().attach_loyalty_member_photo(id, image)?)
    }

    pub fn get_loyalty_member(&self, id: Uuid) -> CoreResult<LoyaltyMember> {
        self.storage()
            .get_loyalty_member(id, self.config().feature_dim)?
            .ok_or_else(|| CoreError::NotFound(format!("loyalty member {id}")))
    }

    pub fn delete_loyalty_member(&self, id: Uuid) -> CoreResult<()> {
        Ok(self.storage().delete_loyalty_member(id)?)
    }

    // === Bulk import ===

    /// Synchronous import of an in-memory document.
    pub fn import_loyalty_members(
        &self,
        tenant_id: Uuid,
        format: ImportFormat,
        bytes: &[u8],
    ) -> CoreResult<ImportReport> {
        let dim = self.config().feature_dim;
        let report = match format {
            ImportFormat::Csv => {
                import_loyalty_members_csv(self.storage(), tenant_id, dim, bytes)?
            }
            ImportFormat::Json => {
                import_loyalty_members_json(self.storage(), tenant_id, dim, bytes)?
            }
        };
        Ok(report)
    }

    /// Queues an import of an already-uploaded file for the worker pool.
    pub fn request_loyalty_import(
        &self,
        tenant_id: Uuid,
        path: &str,
        format: ImportFormat,
    ) -> CoreResult<Uuid> {
        let task_id = self.task_queue().enqueue(
            TaskKind::ImportLoyaltyMembers {
                tenant_id,
                path: path.to_string(),
                format,
            },
            Utc::now(),
            self.config().notification_max_retries,
        )?;
        Ok(task_id)
    }

    /// Worker entry for a queued import.
    pub(crate) fn run_loyalty_import(
        &self,
        tenant_id: Uuid,
        path: &str,
        format: ImportFormat,
    ) -> CoreResult<ImportReport> {
        let bytes = std::fs::read(path)
            .map_err(|e| CoreError::InvalidInput(format!("cannot read import file: {e}")))?;
        self.import_loyalty_members(tenant_id, format, &bytes)
    }
}
