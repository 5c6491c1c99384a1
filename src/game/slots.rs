use rand::Rng;
use serde::{Deserialize, Serialize};

use super::Settlement;

/// Total returned on three of a kind, stake included
pub const TRIPLE_PAYOUT_MULTIPLIER: f64 = 3.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Symbol {
    #[serde(rename = "🍒")]
    Cherry,
    #[serde(rename = "🍊")]
    Orange,
    #[serde(rename = "🍋")]
    Lemon,
    #[serde(rename = "🎰")]
    Seven,
    #[serde(rename = "💎")]
    Diamond,
    #[serde(rename = "👑")]
    Crown,
}

impl Symbol {
    pub const ALL: [Symbol; 6] = [
        Symbol::Cherry,
        Symbol::Orange,
        Symbol::Lemon,
        Symbol::Seven,
        Symbol::Diamond,
        Symbol::Crown,
    ];
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotSpin {
    pub reels: [Symbol; 3],
    pub won: bool,
    pub payout: f64,
}

impl SlotSpin {
    pub fn settlement(&self) -> Settlement {
        let summary = format!(
            "{:?} {:?} {:?}",
            self.reels[0], self.reels[1], self.reels[2]
        );
        Settlement::new(self.payout, self.won, summary)
    }
}

pub struct SlotMachine;

impl SlotMachine {
    /// Spin three independent reels
    pub fn spin(bet: f64, rng: &mut impl Rng) -> SlotSpin {
        let reels = [
            Self::random_symbol(rng),
            Self::random_symbol(rng),
            Self::random_symbol(rng),
        ];
        Self::evaluate(bet, reels)
    }

    /// Only three of a kind pays
    pub fn evaluate(bet: f64, reels: [Symbol; 3]) -> SlotSpin {
        let won = reels[0] == reels[1] && reels[1] == reels[2];
        let payout = if won {
            bet * TRIPLE_PAYOUT_MULTIPLIER
        } else {
            0.0
        };
        SlotSpin { reels, won, payout }
    }

    fn random_symbol(rng: &mut impl Rng) -> Symbol {
        Symbol::ALL[rng.random_range(0..Symbol::ALL.len())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_three_of_a_kind_pays_triple() {
        let spin = SlotMachine::evaluate(10.0, [Symbol::Crown; 3]);
        assert!(spin.won);
        assert_eq!(spin.payout, 30.0);
    }

    #[test]
    fn test_two_of_a_kind_loses() {
        let spin = SlotMachine::evaluate(10.0, [Symbol::Cherry, Symbol::Cherry, Symbol::Lemon]);
        assert!(!spin.won);
        assert_eq!(spin.payout, 0.0);
        assert_eq!(spin.settlement().summary, "Cherry Cherry Lemon");
    }

    #[test]
    fn test_spin_payout_matches_reels() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut wins = 0;
        for _ in 0..2000 {
            let spin = SlotMachine::spin(1.0, &mut rng);
            let triple = spin.reels.iter().all(|s| *s == spin.reels[0]);
            assert_eq!(spin.won, triple);
            if spin.won {
                wins += 1;
            }
        }
        // 6 of 216 outcomes are triples, about 55 in 2000 spins
        assert!(wins > 20 && wins < 110, "unexpected win count {}", wins);
    }

    #[test]
    fn test_symbols_serialize_as_emoji() {
        let json = serde_json::to_string(&Symbol::Diamond).unwrap();
        assert_eq!(json, "\"💎\"");
    }
}
