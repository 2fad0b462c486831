// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! The central-hub orchestrator.
//!
//! Owns storage, configuration, and the outbound capabilities (face
//! encoder, notification channels, device-agent client), and hands out
//! the per-concern services. This is the narrow interface the transport
//! shell and the worker daemon consume.

use std::fs;

use crate::alert::AlertProcessor;
use crate::catalog::{CatalogStore, FaceEncoder, MockFaceEncoder};
use crate::config::HubConfig;
use crate::fleet::{DeviceAgentClient, FleetRegistry};
use crate::index::{ArtifactRegistry, IndexCompiler};
use crate::layout::composer::LayoutComposer;
use crate::notify::Notifier;
use crate::playlist::PlaylistService;
use crate::storage::Storage;
use crate::sync::SyncDispatcher;
use crate::worker::TaskQueue;

use super::error::{CoreError, CoreResult};

/// Database file name under the data directory.
const DB_FILE: &str = "skz.db";

/// Main control-plane orchestrator.
pub struct CentralHub {
    config: HubConfig,
    storage: Storage,
    notifier: Notifier,
    encoder: Box<dyn FaceEncoder>,
    agent: DeviceAgentClient,
}

impl CentralHub {
    /// Opens (or creates) the hub at the configured data directory.
    pub fn new(config: HubConfig, encoder: Box<dyn FaceEncoder>) -> CoreResult<Self> {
        for dir in [
            config.data_dir.clone(),
            config.databases_dir(),
            config.uploads_dir(),
            config.captures_dir(),
        ] {
            fs::create_dir_all(&dir).map_err(|e| {
                CoreError::InvalidInput(format!("cannot create {}: {e}", dir.display()))
            })?;
        }
        let storage = Storage::open(config.data_dir.join(DB_FILE))?;
        Ok(Self::with_storage(config, storage, encoder))
    }

    /// In-memory hub with the mock encoder (tests, demos). Artifacts and
    /// uploads still go to the configured data directory.
    pub fn in_memory(config: HubConfig) -> CoreResult<Self> {
        let encoder = Box::new(MockFaceEncoder::new(config.feature_dim));
        let storage = Storage::in_memory()?;
        Ok(Self::with_storage(config, storage, encoder))
    }

    fn with_storage(config: HubConfig, storage: Storage, encoder: Box<dyn FaceEncoder>) -> Self {
        let notifier = Notifier::new(&config);
        let agent = DeviceAgentClient::new(config.device_agent_timeout);
        CentralHub {
            config,
            storage,
            notifier,
            encoder,
            agent,
        }
    }

    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn agent(&self) -> &DeviceAgentClient {
        &self.agent
    }

    // Per-concern service constructors. Services borrow the hub's
    // storage; they are cheap to create per operation.

    pub fn catalog(&self) -> CatalogStore<'_> {
        CatalogStore::new(
            &self.storage,
            self.encoder.as_ref(),
            self.config.uploads_dir(),
            self.config.feature_dim,
        )
    }

    pub fn compiler(&self) -> IndexCompiler<'_> {
        IndexCompiler::new(
            &self.storage,
            self.config.databases_dir(),
            self.config.feature_dim,
            self.config.artifact_versions_to_keep,
        )
    }

    pub fn artifacts(&self) -> ArtifactRegistry<'_> {
        ArtifactRegistry::new(&self.storage)
    }

    pub fn fleet(&self) -> FleetRegistry<'_> {
        FleetRegistry::new(&self.storage)
    }

    pub fn playlists(&self) -> PlaylistService<'_> {
        PlaylistService::new(&self.storage)
    }

    pub fn composer(&self) -> LayoutComposer<'_> {
        LayoutComposer::new(&self.storage)
    }

    pub fn sync(&self) -> SyncDispatcher<'_> {
        SyncDispatcher::new(&self.storage)
    }

    pub fn alert_processor(&self) -> AlertProcessor<'_> {
        AlertProcessor::new(
            &self.storage,
            &self.notifier,
            self.config.notification_max_retries,
        )
    }

    pub fn task_queue(&self) -> TaskQueue<'_> {
        TaskQueue::new(&self.storage)
    }
}
