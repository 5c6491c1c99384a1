pub mod admin;
pub mod auth;
pub mod health;
pub mod player;

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::AppState;

pub fn create_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api", api_routes())
}

fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/auth/session", post(auth::create_session))
        .route("/games", get(player::list_games))
        .route("/ranking", get(player::weekly_ranking))
        .route("/jackpot", get(player::jackpot))
        .route("/jackpot/claim", post(player::claim_jackpot))
        .route("/player/stats", get(player::stats))
        .route("/player/history", get(player::history))
        .nest("/admin", admin_routes())
}

fn admin_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/dashboard", get(admin::get_dashboard_data))
        .route(
            "/limits",
            get(admin::get_game_limits).put(admin::set_game_limits),
        )
        .route("/pools", get(admin::get_game_pools))
        .route("/pools/add", post(admin::add_liquidity))
        .route("/pools/withdraw", post(admin::withdraw_liquidity))
}
