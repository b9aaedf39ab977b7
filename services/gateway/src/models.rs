//! REST request/response types

use serde::{Deserialize, Serialize};
use voldash_common::{StoredBar, VolumeStats};

/// Successful ingestion response
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    /// Always true
    pub success: bool,
    /// Human-readable summary
    pub message: String,
    /// Number of rows actually inserted, as reported by storage
    pub inserted: usize,
    /// The stored rows, including storage-assigned id and created_at
    pub data: Vec<StoredBar>,
}

impl IngestResponse {
    /// Build the success envelope for a set of stored rows
    #[must_use]
    pub fn inserted(rows: Vec<StoredBar>) -> Self {
        Self {
            success: true,
            message: format!("Successfully inserted {} volume bar(s)", rows.len()),
            inserted: rows.len(),
            data: rows,
        }
    }
}

/// Error envelope shared by validation, storage and method failures
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always false
    pub success: bool,
    /// Short error description
    pub error: String,
    /// Detailed error messages, when available
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
}

impl ErrorResponse {
    /// Error with detail messages
    #[must_use]
    pub fn with_details(error: impl Into<String>, errors: Vec<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: Some(errors),
        }
    }

    /// Error without detail messages
    #[must_use]
    pub fn bare(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
            errors: None,
        }
    }
}

/// Query parameters for the stats read path; unset fields fall back to
/// the configured dashboard defaults
#[derive(Debug, Default, Deserialize)]
pub struct StatsQuery {
    pub symbol: Option<String>,
    pub timeframe: Option<String>,
    pub range: Option<String>,
}

impl StatsQuery {
    /// True when no parameter was supplied and the default view applies
    #[must_use]
    pub fn is_default_view(&self) -> bool {
        self.symbol.is_none() && self.timeframe.is_none() && self.range.is_none()
    }
}

/// Stats read-path response
#[derive(Debug, Serialize, Deserialize)]
pub struct StatsResponse {
    /// Instrument the stats were computed for
    pub symbol: String,
    /// Bar granularity queried
    pub timeframe: String,
    /// Display window queried
    pub range: String,
    /// The computed statistics
    #[serde(flatten)]
    pub stats: VolumeStats,
    /// SVG path for the sparkline series
    pub sparkline_path: String,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Overall health status
    pub status: String,
    /// Whether the storage probe succeeded
    pub database: bool,
    /// Service version
    pub version: String,
    /// Service uptime in seconds
    pub uptime_seconds: u64,
}
