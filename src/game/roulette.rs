use once_cell::sync::Lazy;
use rand::Rng;
use serde::{Deserialize, Serialize};

use super::{GameError, Settlement};

pub const POCKET_COUNT: u8 = 37;
/// Total returned on a single number, stake included
pub const NUMBER_PAYOUT_MULTIPLIER: f64 = 36.0;
/// Total returned on colour and even/odd bets, stake included
pub const EVEN_MONEY_PAYOUT_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PocketColor {
    Green,
    Red,
    Black,
}

/// Zero is green, the remaining even pockets red and odd pockets black
pub static WHEEL_COLORS: Lazy<[PocketColor; POCKET_COUNT as usize]> = Lazy::new(|| {
    let mut colors = [PocketColor::Green; POCKET_COUNT as usize];
    for (number, color) in colors.iter_mut().enumerate().skip(1) {
        *color = if number % 2 == 0 {
            PocketColor::Red
        } else {
            PocketColor::Black
        };
    }
    colors
});

pub fn pocket_color(number: u8) -> PocketColor {
    WHEEL_COLORS[number as usize]
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum RouletteSelection {
    Number(u8),
    Color(PocketColor),
    Even,
    Odd,
}

impl RouletteSelection {
    pub fn validate(&self) -> Result<(), GameError> {
        match self {
            RouletteSelection::Number(n) if *n >= POCKET_COUNT => Err(
                GameError::InvalidSelection(format!("number {} is not on the wheel", n)),
            ),
            RouletteSelection::Color(PocketColor::Green) => Err(GameError::InvalidSelection(
                "green cannot be bet as a colour, bet on number 0".to_string(),
            )),
            _ => Ok(()),
        }
    }

    /// Zero is neither even nor odd
    pub fn wins(&self, number: u8) -> bool {
        match self {
            RouletteSelection::Number(n) => *n == number,
            RouletteSelection::Color(color) => pocket_color(number) == *color,
            RouletteSelection::Even => number != 0 && number % 2 == 0,
            RouletteSelection::Odd => number % 2 == 1,
        }
    }

    pub fn payout_multiplier(&self) -> f64 {
        match self {
            RouletteSelection::Number(_) => NUMBER_PAYOUT_MULTIPLIER,
            _ => EVEN_MONEY_PAYOUT_MULTIPLIER,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RouletteSpin {
    pub number: u8,
    pub color: PocketColor,
    pub selection: RouletteSelection,
    pub won: bool,
    pub payout: f64,
}

impl RouletteSpin {
    pub fn settlement(&self) -> Settlement {
        let summary = format!("{} {:?}", self.number, self.color).to_lowercase();
        Settlement::new(self.payout, self.won, summary)
    }
}

pub struct RouletteWheel;

impl RouletteWheel {
    pub fn spin(
        bet: f64,
        selection: RouletteSelection,
        rng: &mut impl Rng,
    ) -> Result<RouletteSpin, GameError> {
        selection.validate()?;
        let number = rng.random_range(0..POCKET_COUNT);
        Ok(Self::evaluate(bet, selection, number))
    }

    pub fn evaluate(bet: f64, selection: RouletteSelection, number: u8) -> RouletteSpin {
        let won = selection.wins(number);
        let payout = if won {
            bet * selection.payout_multiplier()
        } else {
            0.0
        };
        RouletteSpin {
            number,
            color: pocket_color(number),
            selection,
            won,
            payout,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn test_wheel_colors() {
        assert_eq!(pocket_color(0), PocketColor::Green);
        assert_eq!(pocket_color(2), PocketColor::Red);
        assert_eq!(pocket_color(17), PocketColor::Black);
        assert_eq!(pocket_color(36), PocketColor::Red);
    }

    #[test]
    fn test_straight_number_pays_36x() {
        let spin = RouletteWheel::evaluate(5.0, RouletteSelection::Number(17), 17);
        assert!(spin.won);
        assert_eq!(spin.payout, 180.0);

        let spin = RouletteWheel::evaluate(5.0, RouletteSelection::Number(17), 18);
        assert!(!spin.won);
        assert_eq!(spin.payout, 0.0);
    }

    #[test]
    fn test_zero_loses_even_and_odd() {
        assert!(!RouletteSelection::Even.wins(0));
        assert!(!RouletteSelection::Odd.wins(0));
        assert!(RouletteSelection::Number(0).wins(0));
    }

    #[test]
    fn test_color_bet_pays_double() {
        let spin = RouletteWheel::evaluate(10.0, RouletteSelection::Color(PocketColor::Red), 4);
        assert!(spin.won);
        assert_eq!(spin.payout, 20.0);
    }

    #[test]
    fn test_invalid_selections_rejected() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(matches!(
            RouletteWheel::spin(1.0, RouletteSelection::Number(37), &mut rng),
            Err(GameError::InvalidSelection(_))
        ));
        assert!(matches!(
            RouletteWheel::spin(1.0, RouletteSelection::Color(PocketColor::Green), &mut rng),
            Err(GameError::InvalidSelection(_))
        ));
    }

    #[test]
    fn test_spin_lands_on_wheel() {
        let mut rng = StdRng::seed_from_u64(99);
        for _ in 0..500 {
            let spin = RouletteWheel::spin(1.0, RouletteSelection::Odd, &mut rng).unwrap();
            assert!(spin.number < POCKET_COUNT);
            assert_eq!(spin.won, spin.number % 2 == 1);
        }
    }

    #[test]
    fn test_selection_wire_format() {
        let selection: RouletteSelection =
            serde_json::from_str(r#"{"type":"color","value":"black"}"#).unwrap();
        assert_eq!(selection, RouletteSelection::Color(PocketColor::Black));
        let selection: RouletteSelection = serde_json::from_str(r#"{"type":"even"}"#).unwrap();
        assert_eq!(selection, RouletteSelection::Even);
    }
}
