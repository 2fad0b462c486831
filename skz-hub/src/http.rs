// SPDX-FileCopyrightText: 2026 SKZ Platform Contributors
//
// SPDX-License-Identifier: GPL-3.0-or-later

//! HTTP Server for Health and Metrics Endpoints
//!
//! Monitoring surface only; the platform API shell is a separate
//! deployment that links `skz-core` directly.

use std::sync::Arc;
use std::time::Instant;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use skz_core::CentralHub;
use tokio::sync::Mutex;

use crate::metrics::HubMetrics;

/// Shared state for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub hub: Arc<Mutex<CentralHub>>,
    pub metrics: HubMetrics,
    pub start_time: Instant,
}

/// Health check response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
}

/// Readiness check response.
#[derive(Serialize)]
pub struct ReadyResponse {
    pub ready: bool,
    pub storage_ok: bool,
    pub queued_tasks: u64,
}

/// Creates the HTTP router with health and metrics endpoints.
pub fn create_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/ready", get(ready_handler))
        .route("/metrics", get(metrics_handler))
        .with_state(state)
}

async fn root_handler() -> impl IntoResponse {
    Json(serde_json::json!({
        "service": "skz-hub",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": ["/health", "/ready", "/metrics"]
    }))
}

/// Always 200 while the process runs.
async fn health_handler(State(state): State<HttpState>) -> impl IntoResponse {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: state.start_time.elapsed().as_secs(),
    })
}

/// 200 once storage answers queries.
async fn ready_handler(State(state): State<HttpState>) -> Response {
    let queued = {
        let hub = state.hub.lock().await;
        hub.storage().queued_task_count()
    };
    match queued {
        Ok(queued_tasks) => {
            state.metrics.queued_tasks.set(queued_tasks as i64);
            (
                StatusCode::OK,
                Json(ReadyResponse {
                    ready: true,
                    storage_ok: true,
                    queued_tasks,
                }),
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                storage_ok: false,
                queued_tasks: 0,
            }),
        )
            .into_response(),
    }
}

async fn metrics_handler(State(state): State<HttpState>) -> impl IntoResponse {
    {
        let hub = state.hub.lock().await;
        if let Ok(queued) = hub.storage().queued_task_count() {
            state.metrics.queued_tasks.set(queued as i64);
        }
    }
    (
        [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}
