//! Seed strings: the canonical text form of a board.
//!
//! Format (decimal digits only, no separators):
//! - 2 digits: row count
//! - 2 digits: column count
//! - repeat per cell, row-major:
//!   - 2 digits: zero-padded card number (`suit * columns + rank`), or
//!   - `XX` for a gap
//!
//! Example: a 3x2 board with the top rank removed is `02030001XX0304XX`.

use std::str::FromStr;

use thiserror::Error;

use crate::board::{BoardState, Cell, MAX_COLUMNS, MAX_ROWS};
use crate::card::Card;

/// Marker for an empty cell.
const GAP_FIELD: &str = "XX";
/// Length of the row/column header.
const HEADER_LEN: usize = 4;

/// Why a seed string could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SeedError {
    #[error("seed is {0} characters long, the header alone needs 4")]
    TooShort(usize),

    #[error("seed contains non-ASCII characters")]
    NotAscii,

    #[error("seed header {0:?} is not a row and column count")]
    InvalidHeader(String),

    #[error("seed describes a {columns}x{rows} board, supported sizes are 1..=13 by 1..=4")]
    InvalidDimensions { columns: usize, rows: usize },

    #[error("seed has {actual} characters, a {columns}x{rows} board needs {expected}")]
    Truncated {
        columns: usize,
        rows: usize,
        expected: usize,
        actual: usize,
    },

    #[error("cell {index} holds {field:?}, expected two digits or \"XX\"")]
    InvalidField { index: usize, field: String },

    #[error("cell {index} holds card {number}, the deck has {capacity} cards")]
    CardOutOfRange {
        index: usize,
        number: usize,
        capacity: usize,
    },

    #[error("cell {index} repeats card {number}")]
    DuplicateCard { index: usize, number: usize },
}

fn parse_two_digits(field: &str) -> Option<usize> {
    if field.len() == 2 && field.bytes().all(|b| b.is_ascii_digit()) {
        field.parse().ok()
    } else {
        None
    }
}

/// Decodes a seed into `(columns, rows, cells)` without touching any board.
fn decode(seed: &str) -> Result<(usize, usize, Vec<Cell>), SeedError> {
    if !seed.is_ascii() {
        return Err(SeedError::NotAscii);
    }
    if seed.len() < HEADER_LEN {
        return Err(SeedError::TooShort(seed.len()));
    }

    let header = &seed[..HEADER_LEN];
    let (Some(rows), Some(columns)) = (parse_two_digits(&seed[0..2]), parse_two_digits(&seed[2..4]))
    else {
        return Err(SeedError::InvalidHeader(header.to_string()));
    };

    if !(1..=MAX_COLUMNS).contains(&columns) || !(1..=MAX_ROWS).contains(&rows) {
        return Err(SeedError::InvalidDimensions { columns, rows });
    }

    let capacity = columns * rows;
    let expected = capacity * 2 + HEADER_LEN;
    if seed.len() < expected {
        return Err(SeedError::Truncated {
            columns,
            rows,
            expected,
            actual: seed.len(),
        });
    }

    let mut cells = Vec::with_capacity(capacity);
    let mut seen = vec![false; capacity];
    for index in 0..capacity {
        let start = HEADER_LEN + index * 2;
        let field = &seed[start..start + 2];

        if field == GAP_FIELD {
            cells.push(None);
            continue;
        }

        let number = parse_two_digits(field).ok_or_else(|| SeedError::InvalidField {
            index,
            field: field.to_string(),
        })?;
        if number >= capacity {
            return Err(SeedError::CardOutOfRange {
                index,
                number,
                capacity,
            });
        }
        if std::mem::replace(&mut seen[number], true) {
            return Err(SeedError::DuplicateCard { index, number });
        }
        cells.push(Some(Card::from_number(number, columns, rows)));
    }

    Ok((columns, rows, cells))
}

impl BoardState {
    /// Canonical seed string for this board.
    pub fn seed(&self) -> String {
        let columns = self.columns();
        let mut seed = format!("{:02}{:02}", self.rows(), columns);
        for (_, cell) in self.grid().iter() {
            match cell {
                Some(card) => seed.push_str(&format!("{:02}", card.number(columns))),
                None => seed.push_str(GAP_FIELD),
            }
        }
        seed
    }

    /// Builds a board from a seed string.
    pub fn from_seed(seed: &str) -> Result<Self, SeedError> {
        let (columns, rows, cells) = decode(seed)?;
        Ok(Self::from_cells(columns, rows, cells))
    }

    /// Replaces this board with the one described by `seed`.
    ///
    /// On error the board is left untouched.
    pub fn decode_seed(&mut self, seed: &str) -> Result<(), SeedError> {
        *self = Self::from_seed(seed)?;
        Ok(())
    }
}

impl FromStr for BoardState {
    type Err = SeedError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_seed(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::Suit;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_seed_of_small_board() {
        let mut state = BoardState::new(3, 2);
        state.remove_top_rank();
        assert_eq!(state.seed(), "02030001XX0304XX");
    }

    #[test]
    fn test_seed_roundtrip_shuffled_boards() {
        let mut rng = ChaCha8Rng::seed_from_u64(17);
        for (columns, rows) in [(13, 4), (10, 4), (5, 3), (1, 1)] {
            let mut state = BoardState::new(columns, rows);
            state.remove_top_rank();
            state.shuffle(&mut rng);

            let decoded: BoardState = state.seed().parse().expect("own seed must decode");
            assert_eq!(decoded, state, "roundtrip failed for {}", state.seed());
            assert_eq!(decoded.score(), state.score());
        }
    }

    #[test]
    fn test_decoded_board_knows_removed_cards() {
        let state = BoardState::from_seed("02030001XX0304XX").unwrap();
        assert_eq!(
            state.removed_cards(),
            &[Card::new(Suit::Club, 2), Card::new(Suit::Diamond, 2)]
        );
        assert!(state.is_solved());
    }

    #[test]
    fn test_decode_forty_card_seed() {
        let seed = "04100015333811323605072804XX24031620XX3437XX1731271801263530XX1014120802232106132522";
        let state = BoardState::from_seed(seed).unwrap();
        assert_eq!((state.columns(), state.rows()), (10, 4));
        assert_eq!(state.gaps().len(), 4);
        assert_eq!(state.get((0, 0)), Some(Card::new(Suit::Club, 0)));
        assert_eq!(state.get((1, 0)), Some(Card::new(Suit::Diamond, 5)));
        assert_eq!(state.seed(), seed);
    }

    #[test]
    fn test_decode_errors() {
        assert_eq!(BoardState::from_seed("04"), Err(SeedError::TooShort(2)));
        assert_eq!(BoardState::from_seed("04♣13"), Err(SeedError::NotAscii));
        assert_eq!(
            BoardState::from_seed("ab13"),
            Err(SeedError::InvalidHeader("ab13".to_string()))
        );
        assert_eq!(
            BoardState::from_seed("0514"),
            Err(SeedError::InvalidDimensions {
                columns: 14,
                rows: 5
            })
        );
        assert_eq!(
            BoardState::from_seed("0203000102"),
            Err(SeedError::Truncated {
                columns: 3,
                rows: 2,
                expected: 16,
                actual: 10
            })
        );
        assert_eq!(
            BoardState::from_seed("020300010a0304XX"),
            Err(SeedError::InvalidField {
                index: 2,
                field: "0a".to_string()
            })
        );
        assert_eq!(
            BoardState::from_seed("02030001XX0306XX"),
            Err(SeedError::CardOutOfRange {
                index: 4,
                number: 6,
                capacity: 6
            })
        );
        assert_eq!(
            BoardState::from_seed("02030001010304XX"),
            Err(SeedError::DuplicateCard {
                index: 2,
                number: 1
            })
        );
    }

    #[test]
    fn test_failed_decode_leaves_board_unchanged() {
        let mut state = BoardState::new(13, 4);
        state.shuffle(&mut ChaCha8Rng::seed_from_u64(4));
        let before = state.clone();

        assert!(state.decode_seed("0413XX").is_err());
        assert_eq!(state, before);

        state.decode_seed("02030001XX0304XX").unwrap();
        assert_eq!((state.columns(), state.rows()), (3, 2));
    }
}
