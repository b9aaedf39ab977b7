//! Gateway server implementation

use anyhow::{anyhow, Result};
use axum::{
    extract::{DefaultBodyLimit, Query, State},
    http::{header, HeaderValue, Method, StatusCode},
    response::{Html, Json, Response},
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc, time::Duration, time::Instant};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    config::GatewayConfig,
    dashboard::{render_dashboard, DashboardContext},
    handlers::{HealthHandlers, StatsHandlers, VolumeHandlers},
    models::{HealthResponse, StatsQuery},
    poller::{PollerParams, StatsPoller},
    storage::{MemoryVolumeStore, PgVolumeStore, VolumeStorage},
};
use voldash_common::{TimeRange, Timeframe};

/// Unified application state containing all handlers
#[derive(Clone)]
pub struct AppState {
    pub volume_handlers: VolumeHandlers,
    pub stats_handlers: StatsHandlers,
    pub health_handlers: HealthHandlers,
    pub dashboard: DashboardContext,
}

/// Gateway server
pub struct VolumeGatewayServer {
    config: GatewayConfig,
    storage: Arc<dyn VolumeStorage>,
    start_time: Instant,
}

impl VolumeGatewayServer {
    /// Create a new gateway server and connect its storage
    pub async fn new(config: GatewayConfig) -> Result<Self> {
        info!("Initializing voldash gateway");

        let storage: Arc<dyn VolumeStorage> = if config.database.url.is_empty() {
            warn!("No database URL configured; falling back to the in-memory volume store");
            Arc::new(MemoryVolumeStore::new())
        } else {
            let store =
                PgVolumeStore::connect(&config.database.url, config.database.max_connections)
                    .await?;
            Arc::new(store)
        };

        Ok(Self {
            config,
            storage,
            start_time: Instant::now(),
        })
    }

    /// Start the server
    pub async fn start(self) -> Result<()> {
        let addr: SocketAddr = self
            .config
            .server_address()
            .parse()
            .map_err(|e| anyhow!("Invalid server address '{}': {e}", self.config.server_address()))?;

        let app = build_router(Arc::clone(&self.storage), &self.config, self.start_time)?;

        info!("Starting voldash gateway on {}", addr);

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| anyhow!("Failed to bind to address {addr}: {e}"))?;

        if let Err(e) = axum::serve(listener, app).await {
            error!("Server encountered a fatal error: {}", e);
            return Err(anyhow!("Server error: {e}"));
        }

        Ok(())
    }
}

/// Build the Axum application with all routes and middleware.
///
/// Also spawns the stats poller for the configured default dashboard
/// view; the poller lives as long as the router's state does.
pub fn build_router(
    storage: Arc<dyn VolumeStorage>,
    config: &GatewayConfig,
    start_time: Instant,
) -> Result<Router> {
    let symbol = config.dashboard.default_symbol.to_uppercase();
    let timeframe = Timeframe::parse(&config.dashboard.default_timeframe).ok_or_else(|| {
        anyhow!(
            "Invalid dashboard.default_timeframe '{}'",
            config.dashboard.default_timeframe
        )
    })?;
    let range = TimeRange::parse(&config.dashboard.default_range).ok_or_else(|| {
        anyhow!(
            "Invalid dashboard.default_range '{}'",
            config.dashboard.default_range
        )
    })?;
    let refresh = Duration::from_secs(config.dashboard.refresh_interval_seconds);

    let poller = Arc::new(StatsPoller::spawn(
        Arc::clone(&storage),
        PollerParams {
            symbol: symbol.clone(),
            timeframe,
            range,
            interval: refresh,
        },
    ));

    let app_state = AppState {
        volume_handlers: VolumeHandlers::new(Arc::clone(&storage)),
        stats_handlers: StatsHandlers::new(
            Arc::clone(&storage),
            poller,
            symbol.clone(),
            timeframe,
            range,
        ),
        health_handlers: HealthHandlers::new(storage, start_time),
        dashboard: DashboardContext {
            symbol,
            timeframe: timeframe.to_string(),
            range: range.to_string(),
            refresh_ms: config.dashboard.refresh_interval_seconds * 1000,
        },
    };

    let app = Router::new()
        .route("/", get(dashboard))
        .route("/health", get(health_check))
        .route(
            "/api/volume",
            post(ingest_volume).fallback(volume_method_not_allowed),
        )
        .route("/api/volume/stats", get(volume_stats))
        .with_state(app_state)
        .layer(DefaultBodyLimit::max(config.server.max_body_size))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(config.server.timeout_seconds),
        ))
        .layer(TraceLayer::new_for_http())
        .layer(create_cors_layer(config));

    let app = if config.server.compression {
        app.layer(CompressionLayer::new())
    } else {
        app
    };

    info!("Gateway routes configured");
    Ok(app)
}

/// Build the CORS layer from configuration
fn create_cors_layer(config: &GatewayConfig) -> CorsLayer {
    if !config.cors.enabled {
        return CorsLayer::new();
    }

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    if config.cors.allowed_origins.iter().any(|origin| origin == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = config
            .cors
            .allowed_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        layer.allow_origin(origins)
    }
}

// Handler wrapper functions to work with unified state

async fn dashboard(State(state): State<AppState>) -> Html<String> {
    Html(render_dashboard(&state.dashboard))
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    HealthHandlers::health_check(State(state.health_handlers)).await
}

async fn ingest_volume(State(state): State<AppState>, body: axum::body::Bytes) -> Response {
    VolumeHandlers::ingest(State(state.volume_handlers), body).await
}

async fn volume_method_not_allowed() -> Response {
    VolumeHandlers::method_not_allowed().await
}

async fn volume_stats(State(state): State<AppState>, Query(query): Query<StatsQuery>) -> Response {
    StatsHandlers::stats(State(state.stats_handlers), Query(query)).await
}

/// API route documentation
pub fn print_routes() {
    println!("voldash gateway routes:");
    println!("=======================");
    println!();
    println!("Dashboard:");
    println!("  GET  /                  - Volume terminal page");
    println!();
    println!("Monitoring:");
    println!("  GET  /health            - Health check");
    println!();
    println!("Volume data:");
    println!("  POST /api/volume        - Ingest one bar or a batch (1-100)");
    println!("  GET  /api/volume/stats  - Volume-delta statistics");
    println!("       ?symbol=&timeframe=&range=   (defaults from config)");
}
