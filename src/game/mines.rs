use rand::{seq::SliceRandom, Rng};
use serde::Serialize;

use super::{GameError, Settlement};

pub const BOARD_WIDTH: usize = 5;
pub const BOARD_SIZE: usize = BOARD_WIDTH * BOARD_WIDTH;
pub const MINE_COUNT: usize = 8;
/// Added to the multiplier for every safe tile revealed
pub const MULTIPLIER_STEP: f64 = 0.25;
pub const SAFE_TILES: usize = BOARD_SIZE - MINE_COUNT;

/// Shuffle every tile index and keep the first `MINE_COUNT`
pub fn generate_mine_positions(rng: &mut impl Rng) -> Vec<usize> {
    let mut positions: Vec<usize> = (0..BOARD_SIZE).collect();
    positions.shuffle(rng);
    positions.truncate(MINE_COUNT);
    positions
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MinesStatus {
    Playing,
    CashedOut,
    Busted,
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TileView {
    Hidden,
    Diamond,
    Mine,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RevealOutcome {
    Safe { multiplier: f64, payout: f64 },
    Mine,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MinesView {
    pub bet: f64,
    pub tiles: Vec<TileView>,
    pub squares_revealed: usize,
    pub multiplier: f64,
    pub payout: f64,
    pub status: MinesStatus,
}

#[derive(Debug, Clone)]
pub struct MinesRound {
    bet: f64,
    mines: [bool; BOARD_SIZE],
    revealed: [bool; BOARD_SIZE],
    safe_revealed: usize,
    status: MinesStatus,
}

impl MinesRound {
    pub fn start(bet: f64, rng: &mut impl Rng) -> Self {
        Self::with_mines(bet, &generate_mine_positions(rng))
    }

    pub fn with_mines(bet: f64, mine_positions: &[usize]) -> Self {
        let mut mines = [false; BOARD_SIZE];
        for &pos in mine_positions.iter().filter(|&&p| p < BOARD_SIZE) {
            mines[pos] = true;
        }

        Self {
            bet,
            mines,
            revealed: [false; BOARD_SIZE],
            safe_revealed: 0,
            status: MinesStatus::Playing,
        }
    }

    pub fn multiplier(&self) -> f64 {
        1.0 + self.safe_revealed as f64 * MULTIPLIER_STEP
    }

    /// What cashing out now would pay
    pub fn pending_payout(&self) -> f64 {
        self.bet * self.multiplier()
    }

    pub fn is_over(&self) -> bool {
        self.status != MinesStatus::Playing
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    /// Reveal a tile. Clearing every safe tile cashes out automatically.
    pub fn reveal(&mut self, tile: usize) -> Result<RevealOutcome, GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }
        if tile >= BOARD_SIZE {
            return Err(GameError::InvalidTile(tile));
        }
        if self.revealed[tile] {
            return Err(GameError::TileAlreadyRevealed(tile));
        }

        self.revealed[tile] = true;

        if self.mines[tile] {
            self.status = MinesStatus::Busted;
            // Show every mine once the player hits one
            for (revealed, mine) in self.revealed.iter_mut().zip(self.mines.iter()) {
                *revealed |= *mine;
            }
            return Ok(RevealOutcome::Mine);
        }

        self.safe_revealed += 1;
        if self.safe_revealed == SAFE_TILES {
            self.status = MinesStatus::CashedOut;
        }

        Ok(RevealOutcome::Safe {
            multiplier: self.multiplier(),
            payout: self.pending_payout(),
        })
    }

    pub fn cash_out(&mut self) -> Result<f64, GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }
        self.status = MinesStatus::CashedOut;
        Ok(self.pending_payout())
    }

    pub fn settlement(&self) -> Option<Settlement> {
        match self.status {
            MinesStatus::Playing => None,
            MinesStatus::CashedOut => Some(Settlement::new(
                self.pending_payout(),
                true,
                format!("{} diamonds at {:.2}x", self.safe_revealed, self.multiplier()),
            )),
            MinesStatus::Busted => Some(Settlement::lost(format!(
                "mine after {} diamonds",
                self.safe_revealed
            ))),
        }
    }

    pub fn view(&self) -> MinesView {
        let tiles = (0..BOARD_SIZE)
            .map(|i| match (self.revealed[i], self.mines[i]) {
                (false, _) => TileView::Hidden,
                (true, true) => TileView::Mine,
                (true, false) => TileView::Diamond,
            })
            .collect();

        MinesView {
            bet: self.bet,
            tiles,
            squares_revealed: self.safe_revealed,
            multiplier: self.multiplier(),
            payout: match self.status {
                MinesStatus::Busted => 0.0,
                _ => self.pending_payout(),
            },
            status: self.status,
        }
    }
}
