//! Volume bar ingestion handler
//!
//! `POST /api/volume` accepts one bar object or an array of bars, runs the
//! validator and performs a single atomic insert. Any validation failure
//! rejects the whole request with every collected message; storage
//! failures surface the underlying message with a server-error status.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::models::{ErrorResponse, IngestResponse};
use crate::storage::VolumeStorage;
use voldash_common::{validate_bar, validate_batch, NormalizedBar};

/// Ingestion handlers
#[derive(Clone)]
pub struct VolumeHandlers {
    storage: Arc<dyn VolumeStorage>,
}

impl VolumeHandlers {
    pub fn new(storage: Arc<dyn VolumeStorage>) -> Self {
        Self { storage }
    }

    /// Ingest a single bar or a batch
    pub async fn ingest(State(handlers): State<Self>, body: Bytes) -> Response {
        let payload: Value = match serde_json::from_slice(&body) {
            Ok(value) => value,
            Err(e) => {
                warn!("Rejected unparseable volume payload: {}", e);
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::with_details(
                        "Validation failed",
                        vec!["Request body must be valid JSON".to_string()],
                    )),
                )
                    .into_response();
            }
        };

        let now = Utc::now();
        let validation = if payload.is_array() {
            validate_batch(&payload, now)
        } else {
            validate_bar(&payload, now).map(|bar| vec![bar])
        };

        let bars: Vec<NormalizedBar> = match validation {
            Ok(bars) => bars,
            Err(errors) => {
                warn!(
                    "Validation rejected volume payload with {} error(s)",
                    errors.len()
                );
                let messages = errors.iter().map(ToString::to_string).collect();
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::with_details("Validation failed", messages)),
                )
                    .into_response();
            }
        };

        match handlers.storage.insert_bars(&bars).await {
            Ok(rows) => {
                info!(
                    "Inserted {} volume bar(s) for {}",
                    rows.len(),
                    rows.first().map_or("-", |row| row.symbol.as_str())
                );
                (StatusCode::OK, Json(IngestResponse::inserted(rows))).into_response()
            }
            Err(e) => {
                error!("Volume insert failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::with_details(
                        "Database insertion failed",
                        vec![e.to_string()],
                    )),
                )
                    .into_response()
            }
        }
    }

    /// Reject any non-POST method on the ingestion route
    pub async fn method_not_allowed() -> Response {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            Json(ErrorResponse::bare("Method not allowed. Use POST.")),
        )
            .into_response()
    }
}
