use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fmt};

/// Games offered by the casino
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum GameKind {
    Slots,
    Blackjack,
    Crash,
    Mines,
    Roulette,
}

impl GameKind {
    pub const ALL: [GameKind; 5] = [
        GameKind::Slots,
        GameKind::Blackjack,
        GameKind::Crash,
        GameKind::Mines,
        GameKind::Roulette,
    ];

    /// Share of each wager notionally kept by the house as rake
    pub fn house_edge(self) -> f64 {
        match self {
            GameKind::Slots | GameKind::Crash | GameKind::Mines => 0.05,
            GameKind::Blackjack => 0.02,
            GameKind::Roulette => 0.027,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GameKind::Slots => "slots",
            GameKind::Blackjack => "blackjack",
            GameKind::Crash => "crash",
            GameKind::Mines => "mines",
            GameKind::Roulette => "roulette",
        }
    }
}

impl fmt::Display for GameKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BetLimits {
    pub min_bet: f64,
    pub max_bet: f64,
}

impl BetLimits {
    pub fn allows(&self, amount: f64) -> bool {
        amount >= self.min_bet && amount <= self.max_bet
    }
}

/// Per-game liquidity pool
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(rename_all = "camelCase")]
pub struct PoolInfo {
    pub liquidity: f64,
    /// Rake accumulated since the last daily split
    pub rake: f64,
    pub jackpot_contribution: f64,
}

pub type GameLimits = BTreeMap<GameKind, BetLimits>;
pub type GamePools = BTreeMap<GameKind, PoolInfo>;

/// Public view of a game's table settings
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameTableInfo {
    pub game: GameKind,
    pub min_bet: f64,
    pub max_bet: f64,
    pub pool_liquidity: f64,
    pub house_edge: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_game_kind_serializes_lowercase() {
        let json = serde_json::to_string(&GameKind::Blackjack).unwrap();
        assert_eq!(json, "\"blackjack\"");
        let parsed: GameKind = serde_json::from_str("\"roulette\"").unwrap();
        assert_eq!(parsed, GameKind::Roulette);
    }

    #[test]
    fn test_pools_serialize_as_object_keyed_by_game() {
        let mut pools = GamePools::new();
        pools.insert(
            GameKind::Mines,
            PoolInfo {
                liquidity: 15000.0,
                rake: 750.0,
                jackpot_contribution: 150.0,
            },
        );
        let json = serde_json::to_value(&pools).unwrap();
        assert_eq!(json["mines"]["jackpotContribution"], 150.0);
    }

    #[test]
    fn test_bet_limits_are_inclusive() {
        let limits = BetLimits {
            min_bet: 0.5,
            max_bet: 200.0,
        };
        assert!(limits.allows(0.5));
        assert!(limits.allows(200.0));
        assert!(!limits.allows(0.49));
        assert!(!limits.allows(200.01));
    }
}
