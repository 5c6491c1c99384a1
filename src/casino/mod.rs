//! The house: wallets, live rounds and the ledger they settle into.

pub mod ledger;
pub mod scheduler;
pub mod wallet;

pub use ledger::Ledger;
pub use scheduler::JackpotScheduler;
pub use wallet::PlayerWallet;

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::game::{
    blackjack::BlackjackView,
    crash::CrashTick,
    mines::MinesView,
    roulette::RouletteSpin,
    slots::SlotSpin,
    BlackjackRound, CrashRound, GameError, MinesRound, RouletteSelection, RouletteWheel,
    Settlement, SlotMachine,
};
use crate::models::{GameKind, PlayerStats, RoundRecord};

#[derive(Debug, Error, PartialEq)]
pub enum CasinoError {
    #[error("amount must be a number of at least 0.01 (got {0})")]
    InvalidAmount(f64),
    #[error("{game} bets must be between {min_bet} and {max_bet}")]
    BetOutOfLimits {
        game: GameKind,
        min_bet: f64,
        max_bet: f64,
    },
    #[error("insufficient balance: {balance:.2} available, {requested:.2} requested")]
    InsufficientBalance { balance: f64, requested: f64 },
    #[error("{game} pool holds {liquidity:.2}, cannot withdraw {requested:.2}")]
    InsufficientLiquidity {
        game: GameKind,
        liquidity: f64,
        requested: f64,
    },
    #[error("minBet ({min_bet}) must not exceed maxBet ({max_bet})")]
    InvalidLimits { min_bet: f64, max_bet: f64 },
    #[error("a {0} round is already in progress")]
    RoundInProgress(GameKind),
    #[error("no {0} round in progress")]
    NoActiveRound(GameKind),
    #[error("no unclaimed jackpot prize")]
    NothingToClaim,
    #[error(transparent)]
    Game(#[from] GameError),
}

/// A round that has been paid out and booked
#[derive(Debug, Clone, PartialEq)]
pub struct SettledRound {
    pub game: GameKind,
    pub bet: f64,
    pub settlement: Settlement,
    pub stats: PlayerStats,
}

/// Player-facing state after an action, plus the settlement if the action ended the round
#[derive(Debug, Clone)]
pub struct RoundUpdate<V> {
    pub view: V,
    pub settled: Option<SettledRound>,
}

impl<V> RoundUpdate<V> {
    fn open(view: V) -> Self {
        Self {
            view,
            settled: None,
        }
    }
}

/// Rounds that stay open across several player actions
trait OpenRound {
    fn bet(&self) -> f64;
    fn settlement(&self) -> Option<Settlement>;
}

impl OpenRound for BlackjackRound {
    fn bet(&self) -> f64 {
        BlackjackRound::bet(self)
    }

    fn settlement(&self) -> Option<Settlement> {
        BlackjackRound::settlement(self)
    }
}

impl OpenRound for MinesRound {
    fn bet(&self) -> f64 {
        MinesRound::bet(self)
    }

    fn settlement(&self) -> Option<Settlement> {
        MinesRound::settlement(self)
    }
}

/// A rocket in flight and the connection that launched it
struct CrashSeat {
    launched_by: Uuid,
    round: CrashRound,
}

impl OpenRound for CrashSeat {
    fn bet(&self) -> f64 {
        self.round.bet()
    }

    fn settlement(&self) -> Option<Settlement> {
        self.round.settlement()
    }
}

/// Wallets and open rounds keyed by lowercase player address
pub struct Casino {
    ledger: Arc<Ledger>,
    starting_balance: f64,
    wallets: DashMap<String, PlayerWallet>,
    blackjack: DashMap<String, BlackjackRound>,
    mines: DashMap<String, MinesRound>,
    crash: DashMap<String, CrashSeat>,
}

impl Casino {
    pub fn new(ledger: Arc<Ledger>, starting_balance: f64) -> Self {
        Self {
            ledger,
            starting_balance,
            wallets: DashMap::new(),
            blackjack: DashMap::new(),
            mines: DashMap::new(),
            crash: DashMap::new(),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    pub fn stats(&self, address: &str) -> PlayerStats {
        self.wallets
            .get(address)
            .map(|wallet| wallet.stats())
            .unwrap_or_else(|| PlayerWallet::new(self.starting_balance).stats())
    }

    pub fn history(&self, address: &str) -> Vec<RoundRecord> {
        self.wallets
            .get(address)
            .map(|wallet| wallet.history())
            .unwrap_or_default()
    }

    fn with_wallet<T>(&self, address: &str, f: impl FnOnce(&mut PlayerWallet) -> T) -> T {
        let mut wallet = self
            .wallets
            .entry(address.to_string())
            .or_insert_with(|| PlayerWallet::new(self.starting_balance));
        f(&mut wallet)
    }

    async fn place_bet(&self, address: &str, game: GameKind, bet: f64) -> Result<(), CasinoError> {
        self.ledger.check_bet(game, bet).await?;
        self.with_wallet(address, |wallet| wallet.debit(bet))
    }

    async fn settle(
        &self,
        address: &str,
        game: GameKind,
        bet: f64,
        settlement: Settlement,
    ) -> SettledRound {
        let stats = self.with_wallet(address, |wallet| {
            wallet.settle(game, bet, &settlement, Utc::now())
        });
        self.ledger
            .record_wager(game, address, bet, settlement.payout)
            .await;

        tracing::info!(
            "{} settled {} round: bet {:.2}, payout {:.2} ({})",
            address,
            game,
            bet,
            settlement.payout,
            settlement.summary
        );

        SettledRound {
            game,
            bet,
            settlement,
            stats,
        }
    }

    /// Store a freshly started round; a concurrent start for the same game loses and is refunded
    fn seat<R>(
        &self,
        rounds: &DashMap<String, R>,
        address: &str,
        game: GameKind,
        round: R,
    ) -> Result<(), CasinoError>
    where
        R: OpenRound,
    {
        let bet = round.bet();
        match rounds.entry(address.to_string()) {
            Entry::Occupied(_) => {
                self.with_wallet(address, |wallet| wallet.refund(bet));
                Err(CasinoError::RoundInProgress(game))
            }
            Entry::Vacant(slot) => {
                slot.insert(round);
                Ok(())
            }
        }
    }

    /// Take a finished round out of play and settle it. Only the caller that
    /// removes the round gets to settle it.
    async fn close<R>(
        &self,
        rounds: &DashMap<String, R>,
        address: &str,
        game: GameKind,
    ) -> Result<SettledRound, CasinoError>
    where
        R: OpenRound,
    {
        let (_, round) = rounds
            .remove_if(address, |_, round| round.settlement().is_some())
            .ok_or(CasinoError::NoActiveRound(game))?;
        let settlement = round.settlement().ok_or(GameError::RoundOver)?;
        Ok(self.settle(address, game, round.bet(), settlement).await)
    }

    pub async fn spin_slots(
        &self,
        address: &str,
        bet: f64,
    ) -> Result<(SlotSpin, SettledRound), CasinoError> {
        self.place_bet(address, GameKind::Slots, bet).await?;
        let spin = SlotMachine::spin(bet, &mut rand::rng());
        let settled = self
            .settle(address, GameKind::Slots, bet, spin.settlement())
            .await;
        Ok((spin, settled))
    }

    pub async fn spin_roulette(
        &self,
        address: &str,
        bet: f64,
        selection: RouletteSelection,
    ) -> Result<(RouletteSpin, SettledRound), CasinoError> {
        selection.validate()?;
        self.place_bet(address, GameKind::Roulette, bet).await?;
        let spin = RouletteWheel::spin(bet, selection, &mut rand::rng())?;
        let settled = self
            .settle(address, GameKind::Roulette, bet, spin.settlement())
            .await;
        Ok((spin, settled))
    }

    pub async fn blackjack_deal(
        &self,
        address: &str,
        bet: f64,
    ) -> Result<RoundUpdate<BlackjackView>, CasinoError> {
        if self.blackjack.contains_key(address) {
            return Err(CasinoError::RoundInProgress(GameKind::Blackjack));
        }
        self.place_bet(address, GameKind::Blackjack, bet).await?;

        let round = BlackjackRound::deal(bet, &mut rand::rng());
        let view = round.view();

        // A natural settles on the deal
        if let Some(settlement) = round.settlement() {
            let settled = self
                .settle(address, GameKind::Blackjack, bet, settlement)
                .await;
            return Ok(RoundUpdate {
                view,
                settled: Some(settled),
            });
        }

        self.seat(&self.blackjack, address, GameKind::Blackjack, round)?;
        Ok(RoundUpdate::open(view))
    }

    pub async fn blackjack_hit(
        &self,
        address: &str,
    ) -> Result<RoundUpdate<BlackjackView>, CasinoError> {
        let (view, over) = {
            let mut round = self
                .blackjack
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Blackjack))?;
            round.hit(&mut rand::rng())?;
            (round.view(), round.is_over())
        };
        self.blackjack_update(address, view, over).await
    }

    pub async fn blackjack_stand(
        &self,
        address: &str,
    ) -> Result<RoundUpdate<BlackjackView>, CasinoError> {
        let view = {
            let mut round = self
                .blackjack
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Blackjack))?;
            round.stand(&mut rand::rng())?;
            round.view()
        };
        self.blackjack_update(address, view, true).await
    }

    async fn blackjack_update(
        &self,
        address: &str,
        view: BlackjackView,
        over: bool,
    ) -> Result<RoundUpdate<BlackjackView>, CasinoError> {
        if !over {
            return Ok(RoundUpdate::open(view));
        }
        let settled = self
            .close(&self.blackjack, address, GameKind::Blackjack)
            .await?;
        Ok(RoundUpdate {
            view,
            settled: Some(settled),
        })
    }

    pub async fn mines_start(
        &self,
        address: &str,
        bet: f64,
    ) -> Result<RoundUpdate<MinesView>, CasinoError> {
        if self.mines.contains_key(address) {
            return Err(CasinoError::RoundInProgress(GameKind::Mines));
        }
        self.place_bet(address, GameKind::Mines, bet).await?;

        let round = MinesRound::start(bet, &mut rand::rng());
        let view = round.view();
        self.seat(&self.mines, address, GameKind::Mines, round)?;
        Ok(RoundUpdate::open(view))
    }

    pub async fn mines_reveal(
        &self,
        address: &str,
        tile: usize,
    ) -> Result<RoundUpdate<MinesView>, CasinoError> {
        let (view, over) = {
            let mut round = self
                .mines
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Mines))?;
            round.reveal(tile)?;
            (round.view(), round.is_over())
        };
        self.mines_update(address, view, over).await
    }

    pub async fn mines_cash_out(
        &self,
        address: &str,
    ) -> Result<RoundUpdate<MinesView>, CasinoError> {
        let view = {
            let mut round = self
                .mines
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Mines))?;
            round.cash_out()?;
            round.view()
        };
        self.mines_update(address, view, true).await
    }

    async fn mines_update(
        &self,
        address: &str,
        view: MinesView,
        over: bool,
    ) -> Result<RoundUpdate<MinesView>, CasinoError> {
        if !over {
            return Ok(RoundUpdate::open(view));
        }
        let settled = self.close(&self.mines, address, GameKind::Mines).await?;
        Ok(RoundUpdate {
            view,
            settled: Some(settled),
        })
    }

    /// Launch a rocket owned by the `launched_by` connection
    pub async fn crash_launch(
        &self,
        address: &str,
        launched_by: Uuid,
        bet: f64,
        auto_cash_out: Option<f64>,
    ) -> Result<(), CasinoError> {
        if self.crash.contains_key(address) {
            return Err(CasinoError::RoundInProgress(GameKind::Crash));
        }
        let round = CrashRound::launch(bet, auto_cash_out, &mut rand::rng())?;
        self.place_bet(address, GameKind::Crash, bet).await?;
        self.seat(
            &self.crash,
            address,
            GameKind::Crash,
            CrashSeat { launched_by, round },
        )
    }

    pub fn has_crash_round(&self, address: &str) -> bool {
        self.crash.contains_key(address)
    }

    /// Swap in a round with a known crash point, keeping its launcher
    #[cfg(test)]
    pub fn replace_crash_round(&self, address: &str, round: CrashRound) {
        if let Some(mut seat) = self.crash.get_mut(address) {
            seat.round = round;
        }
    }

    /// Advance the player's rocket one step
    pub async fn crash_tick(
        &self,
        address: &str,
    ) -> Result<(CrashTick, Option<SettledRound>), CasinoError> {
        let tick = {
            let mut round = self
                .crash
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Crash))?;
            round.round.tick()?
        };

        match tick {
            CrashTick::Flying { .. } => Ok((tick, None)),
            _ => {
                let settled = self.close(&self.crash, address, GameKind::Crash).await?;
                Ok((tick, Some(settled)))
            }
        }
    }

    pub async fn crash_cash_out(&self, address: &str) -> Result<SettledRound, CasinoError> {
        {
            let mut round = self
                .crash
                .get_mut(address)
                .ok_or(CasinoError::NoActiveRound(GameKind::Crash))?;
            round.round.cash_out()?;
        }
        self.close(&self.crash, address, GameKind::Crash).await
    }

    /// Finish a rocket whose connection went away: the auto target pays if it
    /// comes before the crash point, otherwise the stake is lost. Rounds
    /// launched from another connection are left flying.
    pub async fn crash_abandon(&self, address: &str, launched_by: Uuid) -> Option<SettledRound> {
        {
            let mut seat = self.crash.get_mut(address)?;
            if seat.launched_by != launched_by {
                return None;
            }
            seat.round.resolve_unattended();
        }
        match self.close(&self.crash, address, GameKind::Crash).await {
            Ok(settled) => Some(settled),
            Err(e) => {
                tracing::warn!("Could not settle abandoned crash round of {}: {}", address, e);
                None
            }
        }
    }

    /// Pay out every unclaimed jackpot prize of the player
    pub async fn claim_jackpot(&self, address: &str) -> Result<(f64, PlayerStats), CasinoError> {
        let amount = self.ledger.claim_jackpot(address).await?;
        let stats = self.with_wallet(address, |wallet| {
            wallet.credit(amount);
            wallet.stats()
        });
        tracing::info!("{} claimed a jackpot prize of {:.2}", address, amount);
        Ok((amount, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::mines::{MinesStatus, MINE_COUNT};
    use tokio_test::{assert_err, assert_ok};

    const PLAYER: &str = "0x1111111111111111111111111111111111111111";

    fn casino() -> Casino {
        Casino::new(Arc::new(Ledger::seeded(Utc::now())), 1_000.0)
    }

    #[tokio::test]
    async fn test_slots_spin_books_stats_once() {
        let casino = casino();
        let (spin, settled) = casino.spin_slots(PLAYER, 10.0).await.unwrap();

        assert_eq!(settled.settlement.payout, spin.payout);
        assert_eq!(settled.stats.total_bet, 10.0);
        assert_eq!(settled.stats.total_winnings, spin.payout);
        assert_eq!(settled.stats.balance, 1_000.0 - 10.0 + spin.payout);
        assert_eq!(casino.stats(PLAYER), settled.stats);
        assert_eq!(casino.history(PLAYER).len(), 1);

        let ranking = casino.ledger().ranking().await;
        assert!(ranking.iter().any(|e| e.address == PLAYER && e.volume == 10.0));
    }

    #[tokio::test]
    async fn test_bet_outside_limits_leaves_balance() {
        let casino = casino();
        let err = casino.spin_slots(PLAYER, 500.0).await.unwrap_err();
        assert!(matches!(err, CasinoError::BetOutOfLimits { .. }));
        assert_eq!(casino.stats(PLAYER).balance, 1_000.0);
        assert!(casino.history(PLAYER).is_empty());
    }

    #[tokio::test]
    async fn test_insufficient_balance() {
        let casino = Casino::new(Arc::new(Ledger::seeded(Utc::now())), 3.0);
        assert!(matches!(
            casino.spin_slots(PLAYER, 5.0).await,
            Err(CasinoError::InsufficientBalance { .. })
        ));
    }

    #[tokio::test]
    async fn test_invalid_roulette_selection_takes_no_stake() {
        let casino = casino();
        assert_err!(
            casino
                .spin_roulette(PLAYER, 5.0, RouletteSelection::Number(40))
                .await
        );
        assert_eq!(casino.stats(PLAYER).balance, 1_000.0);

        let (spin, settled) = casino
            .spin_roulette(PLAYER, 5.0, RouletteSelection::Even)
            .await
            .unwrap();
        assert_eq!(settled.stats.balance, 995.0 + spin.payout);
    }

    #[tokio::test]
    async fn test_blackjack_round_lifecycle() {
        let casino = casino();
        let update = casino.blackjack_deal(PLAYER, 10.0).await.unwrap();

        if update.settled.is_none() {
            assert!(matches!(
                casino.blackjack_deal(PLAYER, 10.0).await,
                Err(CasinoError::RoundInProgress(GameKind::Blackjack))
            ));
            let update = casino.blackjack_stand(PLAYER).await.unwrap();
            let settled = update.settled.expect("stand always settles");
            assert_eq!(settled.stats.total_bet, 10.0);
        }

        assert!(matches!(
            casino.blackjack_hit(PLAYER).await,
            Err(CasinoError::NoActiveRound(GameKind::Blackjack))
        ));
        assert_eq!(casino.history(PLAYER).len(), 1);
    }

    #[tokio::test]
    async fn test_mines_cash_out_pays_multiplier() {
        let casino = casino();
        assert_ok!(casino.mines_start(PLAYER, 10.0).await);
        let mines: Vec<usize> = (0..MINE_COUNT).collect();
        casino
            .mines
            .insert(PLAYER.to_string(), MinesRound::with_mines(10.0, &mines));

        let update = casino.mines_reveal(PLAYER, 20).await.unwrap();
        assert!(update.settled.is_none());
        assert_eq!(update.view.multiplier, 1.25);

        let update = casino.mines_cash_out(PLAYER).await.unwrap();
        assert_eq!(update.view.status, MinesStatus::CashedOut);
        let settled = update.settled.unwrap();
        assert_eq!(settled.settlement.payout, 12.5);
        assert_eq!(settled.stats.balance, 1_002.5);

        // Settled exactly once
        assert!(matches!(
            casino.mines_cash_out(PLAYER).await,
            Err(CasinoError::NoActiveRound(GameKind::Mines))
        ));
    }

    #[tokio::test]
    async fn test_mines_bust_feeds_pool() {
        let casino = casino();
        casino.mines_start(PLAYER, 10.0).await.unwrap();
        casino
            .mines
            .insert(PLAYER.to_string(), MinesRound::with_mines(10.0, &[4]));

        let update = casino.mines_reveal(PLAYER, 4).await.unwrap();
        assert_eq!(update.settled.unwrap().stats.balance, 990.0);
        let pool = casino.ledger().pools().await[&GameKind::Mines];
        assert_eq!(pool.liquidity, 15_010.0);
    }

    #[tokio::test]
    async fn test_crash_ticks_until_crash() {
        let casino = casino();
        casino.crash_launch(PLAYER, Uuid::new_v4(), 2.0, None).await.unwrap();
        assert!(casino.has_crash_round(PLAYER));
        casino.replace_crash_round(PLAYER, CrashRound::with_crash_point(2.0, None, 1.05).unwrap());

        let settled = loop {
            match casino.crash_tick(PLAYER).await.unwrap() {
                (CrashTick::Flying { .. }, None) => continue,
                (CrashTick::Crashed { .. }, Some(settled)) => break settled,
                other => panic!("unexpected tick {:?}", other),
            }
        };
        assert_eq!(settled.settlement.payout, 0.0);
        assert_eq!(settled.stats.balance, 998.0);
        assert!(!casino.has_crash_round(PLAYER));
    }

    #[tokio::test]
    async fn test_crash_cash_out_and_invalid_target() {
        let casino = casino();
        assert!(matches!(
            casino.crash_launch(PLAYER, Uuid::new_v4(), 2.0, Some(0.5)).await,
            Err(CasinoError::Game(GameError::InvalidAutoCashOut(_)))
        ));
        assert_eq!(casino.stats(PLAYER).balance, 1_000.0);

        casino.crash_launch(PLAYER, Uuid::new_v4(), 2.0, None).await.unwrap();
        casino.replace_crash_round(PLAYER, CrashRound::with_crash_point(2.0, None, 50.0).unwrap());
        for _ in 0..20 {
            casino.crash_tick(PLAYER).await.unwrap();
        }
        let settled = casino.crash_cash_out(PLAYER).await.unwrap();
        assert!((settled.settlement.payout - 2.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_abandoned_crash_round_settles() {
        let casino = casino();
        let launcher = Uuid::new_v4();
        casino.crash_launch(PLAYER, launcher, 2.0, Some(1.5)).await.unwrap();
        casino.replace_crash_round(
            PLAYER,
            CrashRound::with_crash_point(2.0, Some(1.5), 10.0).unwrap(),
        );

        let settled = casino.crash_abandon(PLAYER, launcher).await.unwrap();
        assert!(settled.settlement.won);
        assert!(casino.crash_abandon(PLAYER, launcher).await.is_none());
    }

    #[tokio::test]
    async fn test_abandon_leaves_other_connections_rocket() {
        let casino = casino();
        let (first_tab, second_tab) = (Uuid::new_v4(), Uuid::new_v4());
        casino.crash_launch(PLAYER, second_tab, 10.0, None).await.unwrap();
        casino.replace_crash_round(PLAYER, CrashRound::with_crash_point(10.0, None, 90.0).unwrap());

        assert!(casino.crash_abandon(PLAYER, first_tab).await.is_none());
        assert!(casino.has_crash_round(PLAYER));
        assert_eq!(casino.stats(PLAYER).balance, 990.0);

        let settled = casino.crash_abandon(PLAYER, second_tab).await.unwrap();
        assert_eq!(settled.settlement.payout, 0.0);
        assert!(!casino.has_crash_round(PLAYER));
    }

    #[tokio::test]
    async fn test_claim_without_prize() {
        let casino = casino();
        assert_eq!(
            casino.claim_jackpot(PLAYER).await.unwrap_err(),
            CasinoError::NothingToClaim
        );
    }
}
