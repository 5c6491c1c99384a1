mod auth;
mod casino;
mod config;
mod error;
mod game;
mod models;
mod routes;
mod websocket;

use std::sync::Arc;

use anyhow::Result;
use axum::{routing::get, Router};
use casino::{Casino, JackpotScheduler, Ledger};
use chrono::Utc;
use config::Config;
use tower_http::{
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use websocket::ChatRoom;

/// Application state shared across all handlers
pub struct AppState {
    pub config: Config,
    pub casino: Casino,
    pub scheduler: JackpotScheduler,
    pub chat: ChatRoom,
}

impl AppState {
    /// Seed the house records and wire the services together. The scheduler
    /// is not started here.
    pub fn new(config: Config) -> Self {
        let ledger = Arc::new(Ledger::seeded(Utc::now()));
        let casino = Casino::new(ledger.clone(), config.casino.starting_balance);
        let scheduler = JackpotScheduler::new(
            ledger,
            config.scheduler.clone(),
            config.casino.owner_wallet.clone(),
        );
        let chat = ChatRoom::new(config.casino.chat_history_limit);

        Self {
            config,
            casino,
            scheduler,
            chat,
        }
    }
}

fn build_router(state: Arc<AppState>) -> Router {
    // Configure CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Serve the built client
    let frontend_service = ServeDir::new(&state.config.server.frontend_dir);

    Router::new()
        // WebSocket endpoint
        .route("/ws", get(websocket::handle_websocket))
        // API routes
        .merge(routes::create_routes())
        .fallback_service(frontend_service)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "neon_casino_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Neon Casino backend server...");

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    let state = Arc::new(AppState::new(config.clone()));
    tracing::info!(
        "House ledger seeded, admin wallet {}",
        config.casino.admin_wallet
    );

    state.scheduler.start();

    let app = build_router(state.clone());

    // Start server
    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Server listening on {}", addr);
    tracing::info!("WebSocket endpoint: ws://{}/ws", addr);
    tracing::info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.scheduler.stop();
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        return;
    }
    tracing::info!("Shutdown signal received");
}
