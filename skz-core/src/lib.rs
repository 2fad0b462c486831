// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SKZ Core Library
//!
//! Control plane for the SKZ digital-signage and public-safety platform:
//! versioned recognition-index compilation and distribution, device/hub
//! fleet synchronization, alert ingestion with multi-channel notification
//! dispatch, and layered layout composition. The transport shell, user
//! auth, and media storage live outside this crate and consume the
//! [`api`] facade.

pub mod alert;
pub mod api;
pub mod catalog;
pub mod config;
pub mod content;
pub mod fleet;
pub mod index;
pub mod layout;
pub mod notify;
pub mod playlist;
pub mod storage;
pub mod sync;
pub mod tenant;
pub mod worker;

pub use alert::{Alert, AlertStatus, AlertSubject, AlertType, NewAlert, NotificationRule};
pub use api::{CentralHub, CoreError, CoreResult, ErrorKind};
pub use catalog::{FaceEncoder, FeatureVector, LoyaltyMember, MissingPerson, MockFaceEncoder};
pub use config::HubConfig;
pub use fleet::{Device, DeviceMode, DeviceStatus, Hub, HubStatus, RemoteCommand};
pub use index::{FlatIndex, IndexArtifact, IndexScope, Sidecar};
pub use layout::{Layer, Layout};
pub use playlist::{AssignmentTrigger, Playlist, PlaylistItem};
pub use storage::{Storage, StorageError};
pub use sync::{DevicePlaylistSync, SyncState};
pub use tenant::Tenant;
pub use worker::{TaskExecutor, TaskKind, TaskQueue};
