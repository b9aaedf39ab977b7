//! Configuration for the voldash gateway

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Gateway configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// HTTP server configuration
    pub server: ServerConfig,
    /// Storage configuration
    pub database: DatabaseConfig,
    /// Dashboard defaults and refresh behavior
    pub dashboard: DashboardConfig,
    /// CORS configuration
    pub cors: CorsConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server host
    pub host: String,
    /// Server port
    pub port: u16,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    /// Maximum request body size in bytes
    pub max_body_size: usize,
    /// Enable compression
    pub compression: bool,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Postgres connection URL; an empty string selects the in-memory
    /// store, useful for local development without a database
    pub url: String,
    /// Connection pool size
    pub max_connections: u32,
}

/// Defaults for the dashboard widget and its polling loop
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Instrument shown when none is requested
    pub default_symbol: String,
    /// Bar granularity shown when none is requested
    pub default_timeframe: String,
    /// Display window shown when none is requested
    pub default_range: String,
    /// Stats refresh interval in seconds
    pub refresh_interval_seconds: u64,
}

/// CORS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Enable CORS headers
    pub enabled: bool,
    /// Allowed origins; `*` allows any
    pub allowed_origins: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                timeout_seconds: 30,
                max_body_size: 1024 * 1024, // 1MB
                compression: true,
            },
            database: DatabaseConfig {
                url: String::new(),
                max_connections: 5,
            },
            dashboard: DashboardConfig {
                default_symbol: "MNQ".to_string(),
                default_timeframe: "1m".to_string(),
                default_range: "1h".to_string(),
                refresh_interval_seconds: 30,
            },
            cors: CorsConfig {
                enabled: true,
                allowed_origins: vec!["*".to_string()],
            },
        }
    }
}

impl GatewayConfig {
    /// Load configuration from file, overlaid by `VOLDASH_`-prefixed
    /// environment variables
    pub fn from_file(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("VOLDASH").separator("__"))
            .build()?;

        Ok(settings.try_deserialize()?)
    }

    /// Get server address
    #[must_use]
    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_usable() {
        let config = GatewayConfig::default();
        assert_eq!(config.server_address(), "127.0.0.1:8080");
        assert_eq!(config.dashboard.default_symbol, "MNQ");
        assert!(config.database.url.is_empty());
    }
}
