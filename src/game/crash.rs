//! Crash ("Neon Rocket"): a multiplier climbs until a hidden crash point.
//!
//! The crash point is drawn up front from a heavy-tailed distribution so low
//! multipliers are far more likely than high ones. The multiplier grows
//! linearly per tick and the player must cash out before it reaches the
//! crash point.

use rand::Rng;
use serde::Serialize;
use std::time::Duration;

use super::{GameError, Settlement};

pub const TICK_INTERVAL: Duration = Duration::from_millis(50);
pub const GROWTH_PER_TICK: f64 = 0.005;
pub const MIN_CRASH_POINT: f64 = 1.01;
pub const MAX_CRASH_POINT: f64 = 100.0;
const CRASH_CURVE_EXPONENT: f64 = -1.1;

/// `u^-1.1 * 1.01` for `u` uniform in (0, 1], capped at 100x
pub fn generate_crash_point(rng: &mut impl Rng) -> f64 {
    let u: f64 = 1.0 - rng.random::<f64>();
    (u.powf(CRASH_CURVE_EXPONENT) * MIN_CRASH_POINT).min(MAX_CRASH_POINT)
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum CrashState {
    Flying,
    CashedOut { multiplier: f64 },
    Crashed { crash_point: f64 },
}

/// Result of advancing a round by one tick
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CrashTick {
    Flying { multiplier: f64 },
    AutoCashedOut { multiplier: f64, payout: f64 },
    Crashed { crash_point: f64 },
}

#[derive(Debug, Clone)]
pub struct CrashRound {
    bet: f64,
    crash_point: f64,
    auto_cash_out: Option<f64>,
    ticks: u32,
    state: CrashState,
}

impl CrashRound {
    pub fn launch(
        bet: f64,
        auto_cash_out: Option<f64>,
        rng: &mut impl Rng,
    ) -> Result<Self, GameError> {
        Self::with_crash_point(bet, auto_cash_out, generate_crash_point(rng))
    }

    pub fn with_crash_point(
        bet: f64,
        auto_cash_out: Option<f64>,
        crash_point: f64,
    ) -> Result<Self, GameError> {
        if let Some(target) = auto_cash_out {
            if !target.is_finite() || target <= 1.0 {
                return Err(GameError::InvalidAutoCashOut(target));
            }
        }

        Ok(Self {
            bet,
            crash_point,
            auto_cash_out,
            ticks: 0,
            state: CrashState::Flying,
        })
    }

    pub fn multiplier(&self) -> f64 {
        1.0 + self.ticks as f64 * GROWTH_PER_TICK
    }

    pub fn is_over(&self) -> bool {
        self.state != CrashState::Flying
    }

    /// Advance one tick. The auto cash-out target wins over a crash on the same tick.
    pub fn tick(&mut self) -> Result<CrashTick, GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }

        self.ticks += 1;
        let multiplier = self.multiplier();

        if let Some(target) = self.auto_cash_out {
            if multiplier >= target {
                self.state = CrashState::CashedOut { multiplier };
                return Ok(CrashTick::AutoCashedOut {
                    multiplier,
                    payout: self.bet * multiplier,
                });
            }
        }

        if multiplier >= self.crash_point {
            self.state = CrashState::Crashed {
                crash_point: self.crash_point,
            };
            return Ok(CrashTick::Crashed {
                crash_point: self.crash_point,
            });
        }

        Ok(CrashTick::Flying { multiplier })
    }

    /// Take the stake times the current multiplier
    pub fn cash_out(&mut self) -> Result<f64, GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }

        let multiplier = self.multiplier();
        self.state = CrashState::CashedOut { multiplier };
        Ok(self.bet * multiplier)
    }

    /// Fly the round to its end without a player at the controls
    pub fn resolve_unattended(&mut self) {
        while !self.is_over() {
            if self.tick().is_err() {
                break;
            }
        }
    }

    pub fn settlement(&self) -> Option<Settlement> {
        match self.state {
            CrashState::Flying => None,
            CrashState::CashedOut { multiplier } => Some(Settlement::new(
                self.bet * multiplier,
                true,
                format!("cashed out at {:.2}x", multiplier),
            )),
            CrashState::Crashed { crash_point } => {
                Some(Settlement::lost(format!("crashed at {:.2}x", crash_point)))
            }
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> CrashState {
        self.state
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_crash_point_bounds() {
        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..10_000 {
            let point = generate_crash_point(&mut rng);
            assert!(point >= MIN_CRASH_POINT, "crash point {} below minimum", point);
            assert!(point <= MAX_CRASH_POINT, "crash point {} above cap", point);
        }
    }

    #[test]
    fn test_crash_points_skew_low() {
        let mut rng = StdRng::seed_from_u64(5);
        let below_two = (0..10_000)
            .filter(|_| generate_crash_point(&mut rng) < 2.0)
            .count();
        // P(point < 2) = 1 - (2 / 1.01)^(-1/1.1), roughly 46%
        assert!(below_two > 4000 && below_two < 5200, "got {}", below_two);
    }

    #[test]
    fn test_multiplier_grows_linearly() {
        let mut round = CrashRound::with_crash_point(10.0, None, 50.0).unwrap();
        assert_eq!(round.multiplier(), 1.0);
        for _ in 0..100 {
            round.tick().unwrap();
        }
        assert!((round.multiplier() - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_crashes_at_crash_point() {
        let mut round = CrashRound::with_crash_point(10.0, None, 1.018).unwrap();
        for _ in 0..3 {
            match round.tick().unwrap() {
                CrashTick::Flying { multiplier } => assert!(multiplier < 1.018),
                other => panic!("expected the rocket to keep flying, got {:?}", other),
            }
        }
        assert_eq!(round.tick().unwrap(), CrashTick::Crashed { crash_point: 1.018 });

        let settlement = round.settlement().unwrap();
        assert_eq!(settlement.payout, 0.0);
        assert_eq!(settlement.summary, "crashed at 1.02x");
        assert_eq!(round.cash_out(), Err(GameError::RoundOver));
    }

    #[test]
    fn test_manual_cash_out() {
        let mut round = CrashRound::with_crash_point(10.0, None, 3.0).unwrap();
        for _ in 0..40 {
            round.tick().unwrap();
        }
        let payout = round.cash_out().unwrap();
        assert!((payout - 12.0).abs() < 1e-9);
        assert!(round.settlement().unwrap().won);
        assert_eq!(round.tick(), Err(GameError::RoundOver));
    }

    #[test]
    fn test_auto_cash_out_beats_crash_on_same_tick() {
        let mut round = CrashRound::with_crash_point(10.0, Some(1.009), 1.009).unwrap();
        round.tick().unwrap();
        let tick = round.tick().unwrap();
        assert!(matches!(tick, CrashTick::AutoCashedOut { .. }));
        assert!(round.settlement().unwrap().won);
    }

    #[test]
    fn test_invalid_auto_target_rejected() {
        assert_eq!(
            CrashRound::with_crash_point(1.0, Some(1.0), 2.0).unwrap_err(),
            GameError::InvalidAutoCashOut(1.0)
        );
    }

    #[test]
    fn test_unattended_round_resolves() {
        let mut round = CrashRound::with_crash_point(2.0, Some(1.5), 4.0).unwrap();
        round.resolve_unattended();
        let settlement = round.settlement().unwrap();
        assert!(settlement.won);
        assert!(settlement.payout > 2.99 && settlement.payout < 3.02);

        let mut round = CrashRound::with_crash_point(2.0, None, 1.3).unwrap();
        round.resolve_unattended();
        assert!(matches!(round.state(), CrashState::Crashed { .. }));
    }
}
