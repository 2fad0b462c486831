// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! SKZ Hub Daemon
//!
//! The central hub's background process:
//! - the durable task worker (compilation, notification dispatch, sync
//!   delivery, bulk imports)
//! - periodic sweepers (heartbeat-gap offline marking, pairing-code
//!   expiry, task-lease reclaim)
//! - HTTP endpoints for health checks and Prometheus metrics
//!
//! The platform API shell is a separate deployment that links `skz-core`.

mod http;
mod metrics;
mod sweeper;

use std::sync::Arc;
use std::time::Instant;

use skz_core::catalog::MockFaceEncoder;
use skz_core::{CentralHub, HubConfig, TaskExecutor};
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tracing::{info, warn};

use http::{create_router, HttpState};
use metrics::HubMetrics;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("skz_hub=info".parse().expect("static directive"))
                .add_directive("skz_core=info".parse().expect("static directive")),
        )
        .init();

    let config = HubConfig::from_env();
    info!("Starting SKZ Hub v{}", env!("CARGO_PKG_VERSION"));
    info!("Data directory: {}", config.data_dir.display());
    if config.email.is_none() {
        info!("Email provider not configured, running in stub mode");
    }
    if config.sms.is_none() {
        info!("SMS provider not configured, running in stub mode");
    }

    // The face encoder is deployment-provided; the daemon itself never
    // ingests photos, so the deterministic stand-in is wired here.
    let encoder = Box::new(MockFaceEncoder::new(config.feature_dim));
    let hub = match CentralHub::new(config, encoder) {
        Ok(hub) => Arc::new(Mutex::new(hub)),
        Err(e) => {
            eprintln!("failed to open central hub: {e}");
            std::process::exit(1);
        }
    };

    let hub_metrics = HubMetrics::new();
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    // Background worker.
    let executor = TaskExecutor::new(hub.clone());
    let worker_shutdown = shutdown_rx.clone();
    let worker = tokio::spawn(async move { executor.run(worker_shutdown).await });

    // Sweepers.
    let sweep = tokio::spawn(sweeper::run(
        hub.clone(),
        hub_metrics.clone(),
        shutdown_rx.clone(),
    ));

    // Health/metrics HTTP server.
    let listen_addr =
        std::env::var("SKZ_HUB_HTTP_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
    let state = HttpState {
        hub: hub.clone(),
        metrics: hub_metrics,
        start_time: Instant::now(),
    };
    let router = create_router(state);
    let listener = match TcpListener::bind(&listen_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("cannot bind {listen_addr}: {e}");
            std::process::exit(1);
        }
    };
    info!("HTTP (health/metrics): {listen_addr}");

    let mut http_shutdown = shutdown_rx.clone();
    let server = tokio::spawn(async move {
        let shutdown = async move {
            let _ = http_shutdown.changed().await;
        };
        if let Err(e) = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
        {
            warn!(error = %e, "http server exited");
        }
    });

    // Run until interrupted.
    if tokio::signal::ctrl_c().await.is_err() {
        warn!("failed to listen for shutdown signal");
    }
    info!("shutting down");
    let _ = shutdown_tx.send(true);
    let _ = tokio::join!(worker, sweep, server);
}
