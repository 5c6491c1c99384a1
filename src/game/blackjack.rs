//! Single-hand blackjack against a dealer standing on 17.
//!
//! Payouts are totals returned to the player, stake included:
//! - natural blackjack: 2.5x
//! - win (including dealer bust): 2x
//! - push: stake returned
//! - loss or bust: nothing

use rand::Rng;
use serde::Serialize;

use super::{
    cards::{hand_value, is_natural, Card, Deck},
    GameError, Settlement,
};

pub const NATURAL_PAYOUT_MULTIPLIER: f64 = 2.5;
pub const WIN_PAYOUT_MULTIPLIER: f64 = 2.0;
pub const DEALER_STANDS_ON: u8 = 17;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BlackjackOutcome {
    Blackjack,
    Win,
    Push,
    Lose,
    Bust,
}

impl BlackjackOutcome {
    pub fn payout(self, bet: f64) -> f64 {
        match self {
            BlackjackOutcome::Blackjack => bet * NATURAL_PAYOUT_MULTIPLIER,
            BlackjackOutcome::Win => bet * WIN_PAYOUT_MULTIPLIER,
            BlackjackOutcome::Push => bet,
            BlackjackOutcome::Lose | BlackjackOutcome::Bust => 0.0,
        }
    }

    fn label(self) -> &'static str {
        match self {
            BlackjackOutcome::Blackjack => "BLACKJACK",
            BlackjackOutcome::Win => "WIN",
            BlackjackOutcome::Push => "PUSH",
            BlackjackOutcome::Lose => "LOSE",
            BlackjackOutcome::Bust => "BUST",
        }
    }
}

#[derive(Debug, Clone)]
pub struct BlackjackRound {
    bet: f64,
    deck: Deck,
    player: Vec<Card>,
    dealer: Vec<Card>,
    outcome: Option<BlackjackOutcome>,
}

/// What the player is allowed to see of a round
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlackjackView {
    pub bet: f64,
    pub player_hand: Vec<Card>,
    pub player_total: u8,
    /// Only the up card while the round is in progress
    pub dealer_hand: Vec<Card>,
    pub dealer_total: u8,
    pub dealer_hidden: bool,
    pub outcome: Option<BlackjackOutcome>,
    pub payout: f64,
}

impl BlackjackRound {
    /// Shuffle a fresh deck and deal the opening hands
    pub fn deal(bet: f64, rng: &mut impl Rng) -> Self {
        let deck = Deck::shuffled(rng);
        Self::deal_from(deck, bet, rng)
    }

    /// Deal player, player, dealer, dealer, then settle immediately on a natural
    pub fn deal_from(mut deck: Deck, bet: f64, rng: &mut impl Rng) -> Self {
        let player = vec![deck.draw(rng), deck.draw(rng)];
        let dealer = vec![deck.draw(rng), deck.draw(rng)];

        let mut round = Self {
            bet,
            deck,
            player,
            dealer,
            outcome: None,
        };

        if is_natural(&round.player) {
            round.outcome = Some(if is_natural(&round.dealer) {
                BlackjackOutcome::Push
            } else {
                BlackjackOutcome::Blackjack
            });
        }

        round
    }

    pub fn is_over(&self) -> bool {
        self.outcome.is_some()
    }

    pub fn bet(&self) -> f64 {
        self.bet
    }

    pub fn hit(&mut self, rng: &mut impl Rng) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }

        let card = self.deck.draw(rng);
        self.player.push(card);

        if hand_value(&self.player).is_bust() {
            self.outcome = Some(BlackjackOutcome::Bust);
        }

        Ok(())
    }

    /// Dealer draws below 17, then hands are compared
    pub fn stand(&mut self, rng: &mut impl Rng) -> Result<(), GameError> {
        if self.is_over() {
            return Err(GameError::RoundOver);
        }

        while hand_value(&self.dealer).total < DEALER_STANDS_ON {
            let card = self.deck.draw(rng);
            self.dealer.push(card);
        }

        let player = hand_value(&self.player).total;
        let dealer = hand_value(&self.dealer);

        let outcome = if dealer.is_bust() || player > dealer.total {
            BlackjackOutcome::Win
        } else if player < dealer.total {
            BlackjackOutcome::Lose
        } else {
            BlackjackOutcome::Push
        };
        self.outcome = Some(outcome);

        Ok(())
    }

    pub fn settlement(&self) -> Option<Settlement> {
        self.outcome.map(|outcome| {
            let won = matches!(outcome, BlackjackOutcome::Blackjack | BlackjackOutcome::Win);
            Settlement::new(outcome.payout(self.bet), won, outcome.label())
        })
    }

    pub fn view(&self) -> BlackjackView {
        let dealer_hidden = !self.is_over();
        let dealer_hand: Vec<Card> = if dealer_hidden {
            self.dealer.iter().take(1).copied().collect()
        } else {
            self.dealer.clone()
        };

        BlackjackView {
            bet: self.bet,
            player_hand: self.player.clone(),
            player_total: hand_value(&self.player).total,
            dealer_total: hand_value(&dealer_hand).total,
            dealer_hand,
            dealer_hidden,
            outcome: self.outcome,
            payout: self.outcome.map(|o| o.payout(self.bet)).unwrap_or(0.0),
        }
    }
}
