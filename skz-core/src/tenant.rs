// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Tenants ("networks"): the logical owners of hubs, devices, playlists,
//! and layouts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// A tenant.
#[derive(Debug, Clone, Serialize)]
pub struct Tenant {
    pub id: Uuid,
    /// Lowercase `[a-z0-9-]+`, globally unique.
    pub slug: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Checks a tenant slug: non-empty, lowercase letters, digits, and dashes.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-')
}
