use axum::{extract::State, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::{
    auth::AuthenticatedUser,
    error::ApiError,
    models::{GameTableInfo, JackpotOverview, PlayerStats, RankingEntry, RoundRecord},
    AppState,
};

#[derive(Debug, Serialize)]
pub struct ClaimResponse {
    pub success: bool,
    pub amount: f64,
    pub stats: PlayerStats,
}

/// Limits, liquidity and house edge of every table
pub async fn list_games(State(state): State<Arc<AppState>>) -> Json<Vec<GameTableInfo>> {
    Json(state.casino.ledger().table_info().await)
}

pub async fn weekly_ranking(State(state): State<Arc<AppState>>) -> Json<Vec<RankingEntry>> {
    Json(state.casino.ledger().ranking().await)
}

pub async fn jackpot(State(state): State<Arc<AppState>>) -> Json<JackpotOverview> {
    Json(state.casino.ledger().jackpot_overview().await)
}

pub async fn claim_jackpot(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClaimResponse>, ApiError> {
    let (amount, stats) = state.casino.claim_jackpot(&user.address).await?;
    Ok(Json(ClaimResponse {
        success: true,
        amount,
        stats,
    }))
}

pub async fn stats(user: AuthenticatedUser, State(state): State<Arc<AppState>>) -> Json<PlayerStats> {
    Json(state.casino.stats(&user.address))
}

pub async fn history(
    user: AuthenticatedUser,
    State(state): State<Arc<AppState>>,
) -> Json<Vec<RoundRecord>> {
    Json(state.casino.history(&user.address))
}
