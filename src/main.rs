//! ParkSense Server
//!
//! Main entry point for the sensor fusion / broadcast server.

use parksense_server::{
    detector_client::DetectorClient,
    frame_processor::FrameProcessor,
    reading_store::ReadingStore,
    state::{AppConfig, AppState},
    web_api,
};
use sqlx::mysql::MySqlPoolOptions;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Connect the store; the server keeps running without persistence on failure
async fn connect_store(database_url: Option<&str>) -> ReadingStore {
    let Some(url) = database_url else {
        tracing::info!("ReadingStore disabled (DATABASE_URL not set)");
        return ReadingStore::disabled();
    };

    let pool = MySqlPoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(url)
        .await;

    match pool {
        Ok(pool) => {
            let store = ReadingStore::with_pool(pool);
            if let Err(e) = store.init_schema().await {
                tracing::warn!(error = %e, "Failed to prepare schema, inserts may fail");
            }
            tracing::info!("Database connected");
            store
        }
        Err(e) => {
            tracing::error!(error = %e, "Database unavailable, persistence disabled");
            ReadingStore::disabled()
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "parksense_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting ParkSense server v{}", env!("CARGO_PKG_VERSION"));

    // Load configuration
    let config = AppConfig::from_env()?;
    let fusion = config.fusion_config()?;
    tracing::info!(
        host = %config.host,
        port = config.port,
        detector_url = ?config.detector_url,
        stream_idle_secs = config.stream_idle_timeout.as_secs(),
        left_end = fusion.breakpoints.left_end,
        center_end = fusion.breakpoints.center_end,
        classes = fusion.filter.classes.len(),
        "Configuration loaded"
    );

    let store = connect_store(config.database_url.as_deref()).await;

    let detector = match &config.detector_url {
        Some(url) => {
            let client = DetectorClient::new(url.clone(), config.detector_timeout)?;
            tracing::info!(detector_url = %client.base_url(), "DetectorClient initialized");
            Some(client)
        }
        None => {
            tracing::info!("DetectorClient disabled (DETECTOR_URL not set)");
            None
        }
    };

    let state = AppState::new(config, FrameProcessor::new(fusion), detector, store);

    let app = web_api::create_router(state.clone())
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http());

    // Start server
    let addr = format!("{}:{}", state.config.host, state.config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
