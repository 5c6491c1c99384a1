use chrono::{DateTime, Utc};
use std::collections::VecDeque;

use super::CasinoError;
use crate::game::Settlement;
use crate::models::{GameKind, PlayerStats, RoundRecord};

/// Rounds kept per player
pub const HISTORY_LIMIT: usize = 10;

/// Mock balance and round history of one address.
///
/// The stake leaves the balance when the bet is placed; totals are booked
/// when the round settles.
#[derive(Debug, Clone)]
pub struct PlayerWallet {
    stats: PlayerStats,
    history: VecDeque<RoundRecord>,
}

impl PlayerWallet {
    pub fn new(starting_balance: f64) -> Self {
        Self {
            stats: PlayerStats {
                total_bet: 0.0,
                total_winnings: 0.0,
                balance: starting_balance,
            },
            history: VecDeque::with_capacity(HISTORY_LIMIT),
        }
    }

    pub fn debit(&mut self, amount: f64) -> Result<(), CasinoError> {
        if amount > self.stats.balance {
            return Err(CasinoError::InsufficientBalance {
                balance: self.stats.balance,
                requested: amount,
            });
        }
        self.stats.balance -= amount;
        Ok(())
    }

    /// Return an unplayed stake
    pub fn refund(&mut self, amount: f64) {
        self.stats.balance += amount;
    }

    pub fn credit(&mut self, amount: f64) {
        self.stats.balance += amount;
        self.stats.total_winnings += amount;
    }

    /// Book a finished round whose stake was already debited
    pub fn settle(
        &mut self,
        game: GameKind,
        bet: f64,
        settlement: &Settlement,
        settled_at: DateTime<Utc>,
    ) -> PlayerStats {
        self.stats.total_bet += bet;
        self.credit(settlement.payout);

        self.history.push_front(RoundRecord {
            game,
            bet,
            payout: settlement.payout,
            won: settlement.won,
            summary: settlement.summary.clone(),
            settled_at,
        });
        self.history.truncate(HISTORY_LIMIT);

        self.stats
    }

    pub fn stats(&self) -> PlayerStats {
        self.stats
    }

    /// Newest first
    pub fn history(&self) -> Vec<RoundRecord> {
        self.history.iter().cloned().collect()
    }
}
