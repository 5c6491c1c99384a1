//! Playing cards shared by the card games.

use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Suit {
    #[serde(rename = "♠")]
    Spades,
    #[serde(rename = "♥")]
    Hearts,
    #[serde(rename = "♦")]
    Diamonds,
    #[serde(rename = "♣")]
    Clubs,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Spades, Suit::Hearts, Suit::Diamonds, Suit::Clubs];
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Rank {
    #[serde(rename = "A")]
    Ace,
    #[serde(rename = "2")]
    Two,
    #[serde(rename = "3")]
    Three,
    #[serde(rename = "4")]
    Four,
    #[serde(rename = "5")]
    Five,
    #[serde(rename = "6")]
    Six,
    #[serde(rename = "7")]
    Seven,
    #[serde(rename = "8")]
    Eight,
    #[serde(rename = "9")]
    Nine,
    #[serde(rename = "10")]
    Ten,
    #[serde(rename = "J")]
    Jack,
    #[serde(rename = "Q")]
    Queen,
    #[serde(rename = "K")]
    King,
}

impl Rank {
    pub const ALL: [Rank; 13] = [
        Rank::Ace,
        Rank::Two,
        Rank::Three,
        Rank::Four,
        Rank::Five,
        Rank::Six,
        Rank::Seven,
        Rank::Eight,
        Rank::Nine,
        Rank::Ten,
        Rank::Jack,
        Rank::Queen,
        Rank::King,
    ];

    /// Blackjack value with aces counted high
    pub fn value(self) -> u8 {
        match self {
            Rank::Ace => 11,
            Rank::Two => 2,
            Rank::Three => 3,
            Rank::Four => 4,
            Rank::Five => 5,
            Rank::Six => 6,
            Rank::Seven => 7,
            Rank::Eight => 8,
            Rank::Nine => 9,
            Rank::Ten | Rank::Jack | Rank::Queen | Rank::King => 10,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Card {
    pub suit: Suit,
    pub rank: Rank,
}

impl Card {
    pub fn new(rank: Rank, suit: Suit) -> Self {
        Self { suit, rank }
    }
}

/// Total of a hand after soft aces have been demoted as needed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HandValue {
    pub total: u8,
    /// Aces still counted as 11
    pub soft_aces: u8,
}

impl HandValue {
    pub fn is_bust(&self) -> bool {
        self.total > 21
    }
}

/// Count aces as 11, then demote them to 1 one at a time while the hand is over 21
pub fn hand_value(cards: &[Card]) -> HandValue {
    let mut total: u16 = 0;
    let mut soft_aces = 0u8;

    for card in cards {
        if card.rank == Rank::Ace {
            soft_aces += 1;
        }
        total += card.rank.value() as u16;
    }

    while total > 21 && soft_aces > 0 {
        total -= 10;
        soft_aces -= 1;
    }

    HandValue {
        total: total.min(u8::MAX as u16) as u8,
        soft_aces,
    }
}

pub fn is_natural(cards: &[Card]) -> bool {
    cards.len() == 2 && hand_value(cards).total == 21
}

/// A single 52-card deck, drawn from the top
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
}

impl Deck {
    pub fn shuffled(rng: &mut impl Rng) -> Self {
        let mut cards = Vec::with_capacity(52);
        for suit in Suit::ALL {
            for rank in Rank::ALL {
                cards.push(Card::new(rank, suit));
            }
        }
        cards.shuffle(rng);
        Self { cards }
    }

    /// Build a deck whose draws follow `order` (first element drawn first)
    #[cfg(test)]
    pub fn stacked(order: &[Card]) -> Self {
        Self {
            cards: order.iter().rev().copied().collect(),
        }
    }

    /// Draw the top card, starting a fresh shuffled deck when this one runs out
    pub fn draw(&mut self, rng: &mut impl Rng) -> Card {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            *self = Deck::shuffled(rng);
        }
    }

    #[cfg(test)]
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}
