// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! API Facade
//!
//! The narrow interface the transport shell and the worker daemon
//! consume. [`CentralHub`] owns storage and the outbound capabilities;
//! operations are grouped by concern:
//!
//! - [`central`] - construction and service accessors
//! - `fleet_ops` - registration, pairing, heartbeats, assignments,
//!   remote commands
//! - `catalog_ops` - encoding records, photos, bulk import
//! - `index_ops` - compilation and artifact serving
//! - `screen_ops` - playlists, layouts, composition, sync
//! - `alert_ops` - alert ingestion, review, retry, captures
//! - [`error`] - the unified error and its HTTP-status mapping

mod alert_ops;
mod catalog_ops;
pub mod central;
pub mod error;
mod fleet_ops;
mod index_ops;
mod screen_ops;

pub use central::CentralHub;
pub use error::{CoreError, CoreResult, ErrorKind};
pub use screen_ops::{NewLayer, NewLayout};
