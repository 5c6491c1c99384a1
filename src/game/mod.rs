// Round logic for every table game. Engines are pure: callers pass the RNG in
// and apply the resulting settlement to wallets and pools.

pub mod blackjack;
pub mod cards;
pub mod crash;
pub mod mines;
pub mod roulette;
pub mod slots;

pub use blackjack::BlackjackRound;
pub use crash::{CrashRound, CrashTick};
pub use mines::MinesRound;
pub use roulette::{RouletteSelection, RouletteWheel};
pub use slots::SlotMachine;

use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum GameError {
    #[error("round is already over")]
    RoundOver,
    #[error("tile {0} is outside the board")]
    InvalidTile(usize),
    #[error("tile {0} was already revealed")]
    TileAlreadyRevealed(usize),
    #[error("invalid selection: {0}")]
    InvalidSelection(String),
    #[error("auto cash-out target must be above 1.0x (got {0})")]
    InvalidAutoCashOut(f64),
}

/// Final result of a round, applied once to the player's wallet
#[derive(Debug, Clone, PartialEq)]
pub struct Settlement {
    /// Total returned to the player, stake included
    pub payout: f64,
    pub won: bool,
    pub summary: String,
}

impl Settlement {
    pub fn new(payout: f64, won: bool, summary: impl Into<String>) -> Self {
        Self {
            payout,
            won,
            summary: summary.into(),
        }
    }

    pub fn lost(summary: impl Into<String>) -> Self {
        Self::new(0.0, false, summary)
    }
}
