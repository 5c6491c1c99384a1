//! House-side records: bet limits, liquidity pools, rake splits, the jackpot
//! and the weekly wager ranking.
//!
//! Everything sits behind a single lock so a scheduler run and an admin
//! mutation never interleave halfway.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rand::Rng;
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::CasinoError;
use crate::models::{
    AdminDashboardData, BetLimits, GameKind, GameLimits, GamePools, GameTableInfo,
    JackpotOverview, JackpotStatus, JackpotWinner, PoolInfo, RakeSplitRecord, RankingEntry,
};

/// Smallest amount accepted for limits, liquidity moves and bets
pub const MIN_AMOUNT: f64 = 0.01;
/// Winners shown on the public jackpot page
const RECENT_WINNERS_SHOWN: usize = 10;

const SEED_RANKING: [(&str, f64); 3] = [
    ("0xAD1e0c6495aC38D3b88f2aD32F963E491926EC33", 150_000.0),
    ("0x22B7E3C4D8A6F9B8C7E2F4D5B9A1C8D7F6E5D4C3", 120_000.0),
    ("0x99A8B7C6D5E4F3A2B1C0D9E8F7A6B5C4D3E2F1A0", 90_000.0),
];

const SEED_RAKE_SPLITS: [(&str, f64); 3] = [
    ("2025-12-08", 150.0),
    ("2025-12-09", 180.0),
    ("2025-12-10", 210.0),
];

const SEED_JACKPOT: f64 = 5_000.0;

/// Starting (limits, pool) of each game
fn seed_table(game: GameKind) -> (BetLimits, PoolInfo) {
    let (min_bet, max_bet, liquidity, rake, jackpot_contribution) = match game {
        GameKind::Slots => (1.0, 100.0, 10_000.0, 500.0, 100.0),
        GameKind::Blackjack => (5.0, 500.0, 25_000.0, 1_200.0, 250.0),
        GameKind::Crash => (0.5, 200.0, 5_000.0, 250.0, 50.0),
        GameKind::Mines => (2.0, 150.0, 15_000.0, 750.0, 150.0),
        GameKind::Roulette => (1.0, 100.0, 10_000.0, 0.0, 0.0),
    };
    (
        BetLimits { min_bet, max_bet },
        PoolInfo {
            liquidity,
            rake,
            jackpot_contribution,
        },
    )
}

/// Start of the next Sunday (UTC) strictly after `now`
pub fn next_sunday_midnight(now: DateTime<Utc>) -> DateTime<Utc> {
    let days_ahead = 7 - i64::from(now.weekday().num_days_from_sunday());
    let date = now.date_naive() + Duration::days(days_ahead);
    date.and_hms_opt(0, 0, 0)
        .map(|midnight| midnight.and_utc())
        .unwrap_or(now + Duration::days(days_ahead))
}

/// ISO week label, `YYYY-WW`
pub fn week_label(now: DateTime<Utc>) -> String {
    let week = now.iso_week();
    format!("{}-{:02}", week.year(), week.week())
}

fn validate_amount(amount: f64) -> Result<(), CasinoError> {
    if amount.is_finite() && amount >= MIN_AMOUNT {
        Ok(())
    } else {
        Err(CasinoError::InvalidAmount(amount))
    }
}

/// Outcome of a weekly draw attempt
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    NotDue,
    /// Due, but there was no jackpot or nobody ranked
    Skipped,
    Drawn(JackpotWinner),
}

#[derive(Debug)]
struct LedgerState {
    limits: GameLimits,
    pools: GamePools,
    rake_splits: Vec<RakeSplitRecord>,
    jackpot: JackpotStatus,
    winners: Vec<JackpotWinner>,
    /// Weekly wager volume keyed by lowercase address
    ranking: HashMap<String, f64>,
}

impl LedgerState {
    fn pool_mut(&mut self, game: GameKind) -> &mut PoolInfo {
        self.pools.entry(game).or_default()
    }

    fn sorted_ranking(&self) -> Vec<RankingEntry> {
        let mut entries: Vec<RankingEntry> = self
            .ranking
            .iter()
            .map(|(address, volume)| RankingEntry {
                address: address.clone(),
                volume: *volume,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.volume
                .total_cmp(&a.volume)
                .then_with(|| a.address.cmp(&b.address))
        });
        entries
    }
}

#[derive(Debug)]
pub struct Ledger {
    state: RwLock<LedgerState>,
}

impl Ledger {
    /// Ledger preloaded with the demo records
    pub fn seeded(now: DateTime<Utc>) -> Self {
        let mut limits = GameLimits::new();
        let mut pools = GamePools::new();
        for game in GameKind::ALL {
            let (game_limits, pool) = seed_table(game);
            limits.insert(game, game_limits);
            pools.insert(game, pool);
        }

        let rake_splits = SEED_RAKE_SPLITS
            .iter()
            .map(|(date, amount)| RakeSplitRecord {
                date: date.to_string(),
                amount: *amount,
            })
            .collect();

        let ranking = SEED_RANKING
            .iter()
            .map(|(address, volume)| (address.to_lowercase(), *volume))
            .collect();

        Self {
            state: RwLock::new(LedgerState {
                limits,
                pools,
                rake_splits,
                jackpot: JackpotStatus {
                    accumulated_amount: SEED_JACKPOT,
                    next_draw: next_sunday_midnight(now + Duration::days(7)).timestamp_millis(),
                },
                winners: Vec::new(),
                ranking,
            }),
        }
    }

    pub async fn limits(&self) -> GameLimits {
        self.state.read().await.limits.clone()
    }

    pub async fn set_limits(
        &self,
        game: GameKind,
        min_bet: f64,
        max_bet: f64,
    ) -> Result<BetLimits, CasinoError> {
        validate_amount(min_bet)?;
        validate_amount(max_bet)?;
        if min_bet > max_bet {
            return Err(CasinoError::InvalidLimits { min_bet, max_bet });
        }

        let limits = BetLimits { min_bet, max_bet };
        self.state.write().await.limits.insert(game, limits);
        tracing::info!("Bet limits for {} set to {} - {}", game, min_bet, max_bet);
        Ok(limits)
    }

    pub async fn pools(&self) -> GamePools {
        self.state.read().await.pools.clone()
    }

    pub async fn add_liquidity(&self, game: GameKind, amount: f64) -> Result<f64, CasinoError> {
        validate_amount(amount)?;
        let mut state = self.state.write().await;
        let pool = state.pool_mut(game);
        pool.liquidity += amount;
        tracing::info!(
            "Added {:.2} liquidity to {} pool (now {:.2})",
            amount,
            game,
            pool.liquidity
        );
        Ok(pool.liquidity)
    }

    pub async fn withdraw_liquidity(
        &self,
        game: GameKind,
        amount: f64,
    ) -> Result<f64, CasinoError> {
        validate_amount(amount)?;
        let mut state = self.state.write().await;
        let pool = state.pool_mut(game);
        if pool.liquidity < amount {
            return Err(CasinoError::InsufficientLiquidity {
                game,
                liquidity: pool.liquidity,
                requested: amount,
            });
        }
        pool.liquidity -= amount;
        tracing::info!(
            "Withdrew {:.2} liquidity from {} pool (now {:.2})",
            amount,
            game,
            pool.liquidity
        );
        Ok(pool.liquidity)
    }

    pub async fn dashboard(&self) -> AdminDashboardData {
        let state = self.state.read().await;
        AdminDashboardData {
            rake_splits: state.rake_splits.clone(),
            jackpot_status: state.jackpot.clone(),
            weekly_ranking: state.sorted_ranking(),
        }
    }

    pub async fn ranking(&self) -> Vec<RankingEntry> {
        self.state.read().await.sorted_ranking()
    }

    pub async fn jackpot_overview(&self) -> JackpotOverview {
        let state = self.state.read().await;
        JackpotOverview {
            status: state.jackpot.clone(),
            recent_winners: state
                .winners
                .iter()
                .rev()
                .take(RECENT_WINNERS_SHOWN)
                .cloned()
                .collect(),
        }
    }

    pub async fn table_info(&self) -> Vec<GameTableInfo> {
        let state = self.state.read().await;
        GameKind::ALL
            .iter()
            .map(|&game| {
                let limits = state
                    .limits
                    .get(&game)
                    .copied()
                    .unwrap_or_else(|| seed_table(game).0);
                GameTableInfo {
                    game,
                    min_bet: limits.min_bet,
                    max_bet: limits.max_bet,
                    pool_liquidity: state.pools.get(&game).map(|p| p.liquidity).unwrap_or(0.0),
                    house_edge: game.house_edge(),
                }
            })
            .collect()
    }

    pub async fn check_bet(&self, game: GameKind, amount: f64) -> Result<(), CasinoError> {
        validate_amount(amount)?;
        let state = self.state.read().await;
        let limits = state
            .limits
            .get(&game)
            .copied()
            .unwrap_or_else(|| seed_table(game).0);
        if limits.allows(amount) {
            Ok(())
        } else {
            Err(CasinoError::BetOutOfLimits {
                game,
                min_bet: limits.min_bet,
                max_bet: limits.max_bet,
            })
        }
    }

    /// Book a settled round against the game's pool and the weekly ranking
    pub async fn record_wager(&self, game: GameKind, address: &str, bet: f64, payout: f64) {
        let mut state = self.state.write().await;
        let pool = state.pool_mut(game);
        pool.liquidity += bet - payout;
        pool.rake += bet * game.house_edge();
        *state.ranking.entry(address.to_lowercase()).or_insert(0.0) += bet;
    }

    /// Mark every unclaimed prize of `address` as claimed and return the total
    pub async fn claim_jackpot(&self, address: &str) -> Result<f64, CasinoError> {
        let mut state = self.state.write().await;
        let mut total = 0.0;
        for winner in state
            .winners
            .iter_mut()
            .filter(|w| !w.claimed && w.address.eq_ignore_ascii_case(address))
        {
            winner.claimed = true;
            total += winner.amount;
        }

        if total > 0.0 {
            Ok(total)
        } else {
            Err(CasinoError::NothingToClaim)
        }
    }

    /// Send `percent` of all accumulated rake to the owner and zero the pools' rake
    pub async fn split_rake(
        &self,
        owner_wallet: &str,
        percent: f64,
        today: NaiveDate,
    ) -> Option<RakeSplitRecord> {
        let mut state = self.state.write().await;
        let total_rake: f64 = state.pools.values().map(|p| p.rake).sum();
        let amount = total_rake * percent / 100.0;
        if amount <= 0.0 {
            return None;
        }

        tracing::info!(
            "Daily rake split: {:.2} sent to {} ({:.2} rake accumulated)",
            amount,
            owner_wallet,
            total_rake
        );

        for pool in state.pools.values_mut() {
            pool.rake = 0.0;
        }

        let record = RakeSplitRecord {
            date: today.format("%Y-%m-%d").to_string(),
            amount,
        };
        state.rake_splits.push(record.clone());
        Some(record)
    }

    /// Move `percent` of every pool's liquidity into the jackpot; returns the total moved
    pub async fn contribute_to_jackpot(&self, percent: f64) -> f64 {
        let mut state = self.state.write().await;
        let mut total = 0.0;
        for pool in state.pools.values_mut() {
            let contribution = (pool.liquidity * percent / 100.0).max(0.0);
            pool.liquidity -= contribution;
            pool.jackpot_contribution += contribution;
            total += contribution;
        }
        state.jackpot.accumulated_amount += total;

        tracing::info!(
            "Daily jackpot contribution: {:.2}. Accumulated: {:.2}",
            total,
            state.jackpot.accumulated_amount
        );
        total
    }

    /// Draw the jackpot among the top `eligible_top` addresses once the draw is due
    pub async fn draw_jackpot(
        &self,
        now: DateTime<Utc>,
        eligible_top: usize,
        rng: &mut impl Rng,
    ) -> DrawOutcome {
        let mut state = self.state.write().await;
        if now.timestamp_millis() < state.jackpot.next_draw {
            return DrawOutcome::NotDue;
        }

        state.jackpot.next_draw = next_sunday_midnight(now).timestamp_millis();

        let amount = state.jackpot.accumulated_amount;
        let ranking = state.sorted_ranking();
        let eligible = &ranking[..ranking.len().min(eligible_top)];
        if amount <= 0.0 || eligible.is_empty() {
            tracing::warn!("Jackpot draw skipped: nothing to draw or nobody ranked this week");
            return DrawOutcome::Skipped;
        }

        let picked = &eligible[rng.random_range(0..eligible.len())];
        let winner = JackpotWinner {
            week: week_label(now),
            address: picked.address.clone(),
            amount,
            claimed: false,
        };

        tracing::info!(
            "Jackpot drawn! Winner: {} with {:.2}",
            winner.address,
            winner.amount
        );

        state.winners.push(winner.clone());
        state.jackpot.accumulated_amount = 0.0;
        state.ranking.clear();

        DrawOutcome::Drawn(winner)
    }
}
