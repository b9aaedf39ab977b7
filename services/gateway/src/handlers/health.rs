//! Health check handler

use axum::{extract::State, http::StatusCode, response::Json};
use std::{sync::Arc, time::Instant};
use tracing::warn;

use crate::models::HealthResponse;
use crate::storage::VolumeStorage;

/// Health check handlers
#[derive(Clone)]
pub struct HealthHandlers {
    storage: Arc<dyn VolumeStorage>,
    start_time: Instant,
}

impl HealthHandlers {
    pub fn new(storage: Arc<dyn VolumeStorage>, start_time: Instant) -> Self {
        Self {
            storage,
            start_time,
        }
    }

    /// Health check endpoint
    pub async fn health_check(State(handlers): State<Self>) -> (StatusCode, Json<HealthResponse>) {
        let database = match handlers.storage.ping().await {
            Ok(()) => true,
            Err(e) => {
                warn!("Storage health probe failed: {}", e);
                false
            }
        };

        let status = if database { "healthy" } else { "degraded" };

        (
            StatusCode::OK,
            Json(HealthResponse {
                status: status.to_string(),
                database,
                version: env!("CARGO_PKG_VERSION").to_string(),
                uptime_seconds: handlers.start_time.elapsed().as_secs(),
            }),
        )
    }
}
