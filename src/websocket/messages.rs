use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::casino::SettledRound;
use crate::game::{
    blackjack::BlackjackView, mines::MinesView, roulette::RouletteSpin, slots::SlotSpin,
    RouletteSelection,
};
use crate::models::{GameKind, PlayerStats};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ClientMessage {
    SpinSlots {
        bet: f64,
    },
    SpinRoulette {
        bet: f64,
        selection: RouletteSelection,
    },
    BlackjackDeal {
        bet: f64,
    },
    BlackjackHit,
    BlackjackStand,
    MinesStart {
        bet: f64,
    },
    MinesReveal {
        tile: usize,
    },
    MinesCashOut,
    CrashLaunch {
        bet: f64,
        #[serde(default)]
        auto_cash_out: Option<f64>,
    },
    CrashCashOut,
    Chat {
        message: String,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum ServerMessage {
    Welcome {
        address: String,
        username: String,
        stats: PlayerStats,
    },
    SlotsResult(SlotSpin),
    RouletteResult(RouletteSpin),
    BlackjackState(BlackjackView),
    MinesState(MinesView),
    CrashLaunched {
        bet: f64,
        auto_cash_out: Option<f64>,
    },
    CrashTick {
        multiplier: f64,
    },
    CrashCashedOut {
        multiplier: f64,
        payout: f64,
    },
    CrashCrashed {
        crash_point: f64,
    },
    RoundSettled {
        game: GameKind,
        bet: f64,
        payout: f64,
        won: bool,
        summary: String,
        stats: PlayerStats,
    },
    ChatMessage(ChatEntry),
    ChatHistory {
        messages: Vec<ChatEntry>,
    },
    PlayerList {
        players: Vec<OnlinePlayer>,
    },
    Error {
        message: String,
    },
}

impl From<SettledRound> for ServerMessage {
    fn from(settled: SettledRound) -> Self {
        ServerMessage::RoundSettled {
            game: settled.game,
            bet: settled.bet,
            payout: settled.settlement.payout,
            won: settled.settlement.won,
            summary: settled.settlement.summary,
            stats: settled.stats,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatEntry {
    pub id: Uuid,
    pub address: String,
    pub username: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub struct OnlinePlayer {
    pub address: String,
    pub username: String,
}
