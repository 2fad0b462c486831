// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Encoding Catalog Module
//!
//! The mutable catalog behind the compiled recognition indexes: missing
//! persons (global) and loyalty members (per tenant). Handles record CRUD,
//! photo ingestion through the external face-encoding capability, and bulk
//! import.

pub mod encoder;
pub mod import;
mod record;
mod store;

pub use encoder::{sniff_image_format, EncodeError, EncodedFace, FaceEncoder, MockFaceEncoder};
pub use import::{
    import_loyalty_members_csv, import_loyalty_members_json, ImportReport, LoyaltyImportRow,
};
pub use record::{
    CaseStatus, Compilable, FeatureVector, LoyaltyMember, MissingPerson, VectorError,
};
pub use store::{
    CatalogError, CatalogStore, NewLoyaltyMember, NewMissingPerson, PhotoIngest,
};
