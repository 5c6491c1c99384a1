use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::GameKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerStats {
    pub total_bet: f64,
    pub total_winnings: f64,
    pub balance: f64,
}

/// A settled round in a player's history
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundRecord {
    pub game: GameKind,
    pub bet: f64,
    pub payout: f64,
    pub won: bool,
    /// Short human readable outcome, e.g. "BLACKJACK" or "crashed at 1.87x"
    pub summary: String,
    pub settled_at: DateTime<Utc>,
}
