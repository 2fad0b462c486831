// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! Unified error type for the API facade.
//!
//! The transport shell maps [`CoreError::kind`] straight onto HTTP
//! statuses; the core never constructs HTTP responses itself.

use thiserror::Error;

use crate::alert::AlertError;
use crate::catalog::{CatalogError, EncodeError};
use crate::fleet::{AgentError, FleetError};
use crate::index::{CompileError, RegistryError};
use crate::layout::composer::ComposeError;
use crate::layout::LayoutError;
use crate::notify::NotifyError;
use crate::playlist::PlaylistError;
use crate::storage::StorageError;
use crate::sync::SyncError;
use crate::worker::TaskError;

/// Unified error type for control-plane operations.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error(transparent)]
    Fleet(#[from] FleetError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Layout(#[from] LayoutError),

    #[error(transparent)]
    Compose(#[from] ComposeError),

    #[error(transparent)]
    Playlist(#[from] PlaylistError),

    #[error(transparent)]
    Sync(#[from] SyncError),

    #[error(transparent)]
    Alert(#[from] AlertError),

    #[error(transparent)]
    Notify(#[from] NotifyError),

    #[error(transparent)]
    Task(#[from] TaskError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Boundary validation that belongs to no single module.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("not found: {0}")]
    NotFound(String),
}

/// The coarse error classes the transport shell distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidInput,
    NotFound,
    Conflict,
    UpstreamUnreachable,
    Unavailable,
    Internal,
}

impl ErrorKind {
    /// The HTTP status the shell answers with.
    pub fn http_status(&self) -> u16 {
        match self {
            ErrorKind::InvalidInput => 400,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::UpstreamUnreachable => 502,
            ErrorKind::Unavailable => 503,
            ErrorKind::Internal => 500,
        }
    }
}

impl CoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            CoreError::Fleet(e) => match e {
                FleetError::InvalidInput(_) => ErrorKind::InvalidInput,
                FleetError::HubNotFound(_)
                | FleetError::HubNotFoundByRef(_)
                | FleetError::DeviceNotFound(_)
                | FleetError::TenantNotFound(_) => ErrorKind::NotFound,
                FleetError::Storage(e) => storage_kind(e),
            },
            CoreError::Catalog(e) => match e {
                CatalogError::InvalidInput(_) | CatalogError::VectorDimensionMismatch { .. } => {
                    ErrorKind::InvalidInput
                }
                CatalogError::Encode(encode) => match encode {
                    EncodeError::UnsupportedImage | EncodeError::NoFaceDetected => {
                        ErrorKind::InvalidInput
                    }
                    EncodeError::EncoderFailure(_) => ErrorKind::Unavailable,
                },
                CatalogError::NotFound(_) => ErrorKind::NotFound,
                CatalogError::Storage(e) => storage_kind(e),
                CatalogError::Io(_) => ErrorKind::Internal,
            },
            CoreError::Compile(e) => match e {
                CompileError::EmptyScope(_) => ErrorKind::InvalidInput,
                CompileError::Storage(e) => storage_kind(e),
                _ => ErrorKind::Internal,
            },
            CoreError::Registry(e) => match e {
                RegistryError::NoArtifact(_) | RegistryError::VersionNotFound { .. } => {
                    ErrorKind::NotFound
                }
                RegistryError::Storage(e) => storage_kind(e),
                _ => ErrorKind::Internal,
            },
            CoreError::Layout(LayoutError::Invalid(_)) => ErrorKind::InvalidInput,
            CoreError::Compose(e) => match e {
                ComposeError::DeviceNotFound(_) => ErrorKind::NotFound,
                ComposeError::Storage(e) => storage_kind(e),
            },
            CoreError::Playlist(e) => match e {
                PlaylistError::InvalidInput(_) => ErrorKind::InvalidInput,
                PlaylistError::NotFound(_) => ErrorKind::NotFound,
                PlaylistError::Storage(e) => storage_kind(e),
            },
            CoreError::Sync(e) => match e {
                SyncError::PlaylistNotFound(_) => ErrorKind::NotFound,
                SyncError::NoAssignedDevices(_) => ErrorKind::InvalidInput,
                SyncError::Storage(e) => storage_kind(e),
            },
            CoreError::Alert(e) => match e {
                AlertError::InvalidAlert(_) | AlertError::InvalidTransition { .. } => {
                    ErrorKind::InvalidInput
                }
                AlertError::NotFound(_) => ErrorKind::NotFound,
                AlertError::Schedule(_) => ErrorKind::Internal,
                AlertError::Storage(e) => storage_kind(e),
            },
            CoreError::Notify(e) => match e {
                NotifyError::InvalidRecipient(_) => ErrorKind::InvalidInput,
                NotifyError::Provider(_) => ErrorKind::Unavailable,
            },
            CoreError::Agent(_) => ErrorKind::UpstreamUnreachable,
            CoreError::Task(_) => ErrorKind::Internal,
            CoreError::Storage(e) => storage_kind(e),
            CoreError::InvalidInput(_) => ErrorKind::InvalidInput,
            CoreError::NotFound(_) => ErrorKind::NotFound,
        }
    }

    pub fn http_status(&self) -> u16 {
        self.kind().http_status()
    }
}

fn storage_kind(e: &StorageError) -> ErrorKind {
    match e {
        StorageError::NotFound(_) => ErrorKind::NotFound,
        StorageError::AlreadyExists(_) => ErrorKind::Conflict,
        _ => ErrorKind::Internal,
    }
}

/// Convenience alias for facade results.
pub type CoreResult<T> = Result<T, CoreError>;
