//! API handlers for the gateway endpoints

pub mod health;
pub mod stats;
pub mod volume;

pub use health::HealthHandlers;
pub use stats::StatsHandlers;
pub use volume::VolumeHandlers;
