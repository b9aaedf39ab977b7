//! `voldash` shared domain logic
//!
//! Pure building blocks used by the gateway:
//! - Volume bar types, allow-lists and query windows
//! - Field-level validation of incoming bars (single and batch)
//! - Volume-delta statistics and live/playback classification

pub mod stats;
pub mod types;
pub mod validate;

pub use stats::{compute_stats, sparkline_path, sparkline_points, VolumeStats};
pub use types::{BarSample, NormalizedBar, StoredBar, TimeRange, Timeframe};
pub use validate::{validate_bar, validate_batch, FieldError};
