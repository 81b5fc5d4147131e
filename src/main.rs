// Unified Markets - Main Entry Point
// Serves the prediction market engine over HTTP

use std::sync::Arc;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use unified_markets::{router, Engine, EngineConfig, SystemClock};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("═══════════════════════════════════════════════");
    info!("     🎲 Unified Markets - Prediction Engine");
    info!("═══════════════════════════════════════════════");

    let config = EngineConfig::from_env();
    let clock = Arc::new(SystemClock);

    let engine = if config.state_path.exists() {
        match Engine::load_from_path(&config.state_path, config.clone(), clock.clone()) {
            Ok(engine) => engine,
            Err(e) => {
                error!("❌ Failed to load {}: {}", config.state_path.display(), e);
                std::process::exit(1);
            }
        }
    } else {
        info!("📂 No saved state at {}, starting fresh", config.state_path.display());
        match Engine::new(config.clone(), clock) {
            Ok(engine) => engine,
            Err(e) => {
                error!("❌ Failed to initialize engine: {}", e);
                std::process::exit(1);
            }
        }
    };
    let engine = Arc::new(engine);
    let shutdown_engine = engine.clone();

    let app = router(engine);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("❌ Failed to bind {}: {}", config.bind_addr, e);
            std::process::exit(1);
        }
    };
    info!("🚀 Server running on http://{}", config.bind_addr);

    // Save state on Ctrl-C
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install CTRL+C handler: {}", e);
            return;
        }
        info!("🛑 Shutdown signal received, saving state...");
        if let Err(e) = shutdown_engine.save_to_path(&shutdown_engine.config().state_path) {
            error!("❌ Failed to save state: {}", e);
        }
        info!("👋 Goodbye!");
        std::process::exit(0);
    });

    if let Err(e) = axum::serve(listener, app).await {
        error!("❌ Server error: {}", e);
    }
}
