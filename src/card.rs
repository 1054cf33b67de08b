//! Card model.
//!
//! The number of ranks depends on the board width: a board with `columns`
//! columns deals ranks `0..columns` of each suit, and there is one suit per
//! row. A card's canonical number is `suit * columns + rank`.

use std::fmt;

/// Card suits, one per board row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum Suit {
    Club = 0,
    Diamond = 1,
    Heart = 2,
    Spade = 3,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Diamond, Suit::Heart, Suit::Spade];

    /// Panics when `index > 3`.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index]
    }

    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn symbol(self) -> char {
        match self {
            Suit::Club => '♣',
            Suit::Diamond => '♦',
            Suit::Heart => '♥',
            Suit::Spade => '♠',
        }
    }
}

/// The lowest rank; only these cards may open a row.
pub const LOWEST_RANK: u8 = 0;

/// A playing card.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Card {
    pub suit: Suit,
    pub rank: u8,
}

impl Card {
    pub const fn new(suit: Suit, rank: u8) -> Self {
        Self { suit, rank }
    }

    /// Decodes a canonical card number for a `columns x rows` board.
    ///
    /// Panics when `number` is not below `columns * rows`.
    pub fn from_number(number: usize, columns: usize, rows: usize) -> Self {
        assert!(
            number < columns * rows,
            "card number {number} outside a {columns}x{rows} deck"
        );
        Self {
            suit: Suit::from_index(number / columns),
            rank: (number % columns) as u8,
        }
    }

    /// Canonical number on a board `columns` wide.
    #[inline]
    pub fn number(self, columns: usize) -> usize {
        self.suit.index() * columns + self.rank as usize
    }

    /// Same suit, one rank up, or `None` for the top rank of a `ranks`-rank deck.
    #[inline]
    pub fn higher(self, ranks: usize) -> Option<Card> {
        let rank = self.rank + 1;
        ((rank as usize) < ranks).then_some(Card::new(self.suit, rank))
    }

    /// Same suit, one rank down, or `None` for the lowest rank.
    #[inline]
    pub fn lower(self) -> Option<Card> {
        self.rank
            .checked_sub(1)
            .map(|rank| Card::new(self.suit, rank))
    }

    pub fn rank_name(self) -> String {
        match self.rank {
            0 => "A".to_string(),
            10 => "J".to_string(),
            11 => "Q".to_string(),
            12 => "K".to_string(),
            rank => (rank + 1).to_string(),
        }
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.rank_name(), self.suit.symbol())
    }
}
