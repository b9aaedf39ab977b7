//! Stats read-path handler
//!
//! `GET /api/volume/stats` serves the computed volume-delta statistics.
//! A request without query parameters is the default dashboard view and
//! is answered from the poller's cached snapshot; explicit parameters run
//! a fresh query.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use std::sync::Arc;
use tracing::error;

use crate::models::{ErrorResponse, StatsQuery, StatsResponse};
use crate::poller::{StatsPoller, StatsSnapshot};
use crate::storage::VolumeStorage;
use voldash_common::{compute_stats, sparkline_path, TimeRange, Timeframe, VolumeStats};

/// Stats handlers
#[derive(Clone)]
pub struct StatsHandlers {
    storage: Arc<dyn VolumeStorage>,
    poller: Arc<StatsPoller>,
    default_symbol: String,
    default_timeframe: Timeframe,
    default_range: TimeRange,
}

impl StatsHandlers {
    pub fn new(
        storage: Arc<dyn VolumeStorage>,
        poller: Arc<StatsPoller>,
        default_symbol: String,
        default_timeframe: Timeframe,
        default_range: TimeRange,
    ) -> Self {
        Self {
            storage,
            poller,
            default_symbol,
            default_timeframe,
            default_range,
        }
    }

    /// Serve statistics for a symbol/timeframe/range view
    pub async fn stats(State(handlers): State<Self>, Query(query): Query<StatsQuery>) -> Response {
        if query.is_default_view() {
            match handlers.poller.latest() {
                StatsSnapshot::Ready(stats) => {
                    return handlers.respond(
                        handlers.default_symbol.clone(),
                        handlers.default_timeframe,
                        handlers.default_range,
                        stats,
                    );
                }
                StatsSnapshot::Failed(message) => {
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(ErrorResponse::with_details(
                            "Stats refresh failed",
                            vec![message],
                        )),
                    )
                        .into_response();
                }
                // First tick still pending; fall through to a direct query.
                StatsSnapshot::Loading => {}
            }
        }

        let symbol = query
            .symbol
            .unwrap_or_else(|| handlers.default_symbol.clone())
            .to_uppercase();

        let timeframe = match query.timeframe {
            None => handlers.default_timeframe,
            Some(raw) => match Timeframe::parse(&raw) {
                Some(tf) => tf,
                None => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse::with_details(
                            "Invalid query",
                            vec!["timeframe must be one of: 1m, 5m, 15m, 30m, 1h, 4h, 1d"
                                .to_string()],
                        )),
                    )
                        .into_response();
                }
            },
        };

        let range = match query.range {
            None => handlers.default_range,
            Some(raw) => match TimeRange::parse(&raw) {
                Some(range) => range,
                None => {
                    return (
                        StatusCode::BAD_REQUEST,
                        Json(ErrorResponse::with_details(
                            "Invalid query",
                            vec!["range must be one of: 1h, 24h, all".to_string()],
                        )),
                    )
                        .into_response();
                }
            },
        };

        let now = Utc::now();
        match handlers
            .storage
            .fetch_bars(&symbol, timeframe, range.cutoff(now))
            .await
        {
            Ok(bars) => {
                let stats = compute_stats(&bars, now);
                handlers.respond(symbol, timeframe, range, stats)
            }
            Err(e) => {
                error!("Volume fetch failed: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse::with_details(
                        "Failed to fetch volume data",
                        vec![e.to_string()],
                    )),
                )
                    .into_response()
            }
        }
    }

    fn respond(
        &self,
        symbol: String,
        timeframe: Timeframe,
        range: TimeRange,
        stats: VolumeStats,
    ) -> Response {
        let sparkline_path = sparkline_path(&stats.sparkline);
        (
            StatusCode::OK,
            Json(StatsResponse {
                symbol,
                timeframe: timeframe.to_string(),
                range: range.to_string(),
                stats,
                sparkline_path,
            }),
        )
            .into_response()
    }
}
