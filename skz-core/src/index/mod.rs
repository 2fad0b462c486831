// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Index Module
//!
//! Compilation and distribution of versioned recognition indexes. Each
//! scope (the global missing-persons catalog, or one tenant's loyalty
//! members) compiles to an immutable artifact: an exact nearest-neighbour
//! structure sealed with its SHA-256, plus a JSON sidecar mapping row
//! numbers back to display records.

mod artifact;
mod compiler;
mod flat;
mod integrity;
mod registry;

pub use artifact::{IndexArtifact, IndexScope, Sidecar, SidecarRecord};
pub use compiler::{CompileError, CompileOutcome, IndexCompiler};
pub use flat::{FlatIndex, FlatIndexError};
pub use integrity::{hash_bytes, hash_file, verify_file};
pub use registry::{ArtifactRegistry, RegistryError};
