//! `voldash` gateway
//!
//! HTTP service for the volume-delta dashboard:
//! - Validated ingestion of volume bars from external charting platforms
//! - Volume-delta statistics with live/playback classification
//! - Embedded dashboard page and periodic stats refresh

use anyhow::Result;

pub mod config;
pub mod dashboard;
pub mod handlers;
pub mod models;
pub mod poller;
pub mod server;
pub mod storage;

pub use config::{CorsConfig, DashboardConfig, DatabaseConfig, GatewayConfig, ServerConfig};
pub use server::VolumeGatewayServer;

/// Start the gateway server
pub async fn start_server(config: GatewayConfig) -> Result<()> {
    let server = VolumeGatewayServer::new(config).await?;
    server.start().await
}
