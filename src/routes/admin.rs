//! Admin procedures, callable only by the configured admin wallet.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::{
    auth::AdminUser,
    error::ApiError,
    models::{AdminDashboardData, BetLimits, GameKind, GameLimits, GamePools},
    AppState,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetLimitsRequest {
    pub game: GameKind,
    pub min_bet: f64,
    pub max_bet: f64,
}

#[derive(Debug, Serialize)]
pub struct SetLimitsResponse {
    pub success: bool,
    pub limits: BetLimits,
}

#[derive(Debug, Deserialize)]
pub struct LiquidityRequest {
    pub game: GameKind,
    pub amount: f64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiquidityResponse {
    pub success: bool,
    pub new_liquidity: f64,
}

pub async fn get_dashboard_data(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<AdminDashboardData> {
    Json(state.casino.ledger().dashboard().await)
}

pub async fn get_game_limits(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<GameLimits> {
    Json(state.casino.ledger().limits().await)
}

pub async fn set_game_limits(
    admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SetLimitsRequest>,
) -> Result<Json<SetLimitsResponse>, ApiError> {
    let limits = state
        .casino
        .ledger()
        .set_limits(payload.game, payload.min_bet, payload.max_bet)
        .await?;
    tracing::info!("{} updated {} limits", admin.address, payload.game);

    Ok(Json(SetLimitsResponse {
        success: true,
        limits,
    }))
}

pub async fn get_game_pools(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
) -> Json<GamePools> {
    Json(state.casino.ledger().pools().await)
}

pub async fn add_liquidity(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LiquidityRequest>,
) -> Result<Json<LiquidityResponse>, ApiError> {
    let new_liquidity = state
        .casino
        .ledger()
        .add_liquidity(payload.game, payload.amount)
        .await?;

    Ok(Json(LiquidityResponse {
        success: true,
        new_liquidity,
    }))
}

pub async fn withdraw_liquidity(
    _admin: AdminUser,
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LiquidityRequest>,
) -> Result<Json<LiquidityResponse>, ApiError> {
    let new_liquidity = state
        .casino
        .ledger()
        .withdraw_liquidity(payload.game, payload.amount)
        .await?;

    Ok(Json(LiquidityResponse {
        success: true,
        new_liquidity,
    }))
}
