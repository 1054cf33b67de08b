//! Board state and move generation for Gaps patience.
//!
//! A board is a grid of optional cards: one suit per row, one rank per column.
//! The goal is to lay each row out in rank order starting from the lowest rank
//! in column 0, with the last column left empty (the top rank is the one taken
//! out of play to create the gaps).
//!
//! Rules for filling a gap:
//! - a gap in column 0 accepts any lowest-rank card;
//! - any other gap accepts only the same-suit successor of the card on its
//!   left, and nothing at all when the left cell is itself a gap.

use std::fmt;
use std::hash::{Hash, Hasher};

use rand::Rng;

use crate::card::{Card, LOWEST_RANK};
use crate::grid::{Grid, Position};

/// Widest supported board (one column per rank of a standard suit).
pub const MAX_COLUMNS: usize = 13;
/// Tallest supported board (one row per suit).
pub const MAX_ROWS: usize = 4;

/// Layout byte used for an empty cell in [`LayoutKey`].
const GAP_KEY: u8 = u8::MAX;

/// A board cell: a card or a gap.
pub type Cell = Option<Card>;

/// Compact layout encoding (one byte per cell) used for deduplication.
pub type LayoutKey = Box<[u8]>;

/// A single relocation of one card into one gap.
///
/// Carries the board that results from applying it, so search can expand a
/// state without mutating it.
#[derive(Clone, Debug)]
pub struct Move {
    from: Position,
    to: Position,
    card: Card,
    state: BoardState,
}

impl Move {
    #[inline]
    pub fn from(&self) -> Position {
        self.from
    }

    #[inline]
    pub fn to(&self) -> Position {
        self.to
    }

    #[inline]
    pub fn card(&self) -> Card {
        self.card
    }

    /// The board after this move.
    pub fn state(&self) -> &BoardState {
        &self.state
    }

    pub fn into_state(self) -> BoardState {
        self.state
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "move {} from (row {}, column {}) to (row {}, column {})",
            self.card,
            self.from.1 + 1,
            self.from.0 + 1,
            self.to.1 + 1,
            self.to.0 + 1
        )
    }
}

/// A Gaps board: card layout plus the cards taken out of play.
///
/// Equality and hashing only look at the layout (dimensions and every cell).
#[derive(Clone, Debug)]
pub struct BoardState {
    grid: Grid<Cell>,
    removed: Vec<Card>,
}

fn check_dimensions(columns: usize, rows: usize) {
    assert!(
        (1..=MAX_COLUMNS).contains(&columns) && (1..=MAX_ROWS).contains(&rows),
        "board must be 1..={MAX_COLUMNS} columns by 1..={MAX_ROWS} rows, got {columns}x{rows}"
    );
}

/// Every card in order: suit `row`, rank `column`.
fn ordered_deck(columns: usize, rows: usize) -> Grid<Cell> {
    Grid::from_fn(columns, rows, |_, _, index| {
        Some(Card::from_number(index, columns, rows))
    })
}

impl BoardState {
    /// A freshly ordered deck with no gaps.
    pub fn new(columns: usize, rows: usize) -> Self {
        check_dimensions(columns, rows);
        Self {
            grid: ordered_deck(columns, rows),
            removed: Vec::new(),
        }
    }

    /// Builds a board from row-major cells.
    ///
    /// Cards of the deck that do not appear in `cells` are recorded as removed,
    /// in ascending card-number order.
    pub fn from_cells(columns: usize, rows: usize, cells: Vec<Cell>) -> Self {
        check_dimensions(columns, rows);
        assert_eq!(cells.len(), columns * rows, "cell count must equal capacity");

        let mut present = vec![false; columns * rows];
        for card in cells.iter().flatten() {
            present[card.number(columns)] = true;
        }
        let removed = (0..columns * rows)
            .filter(|&number| !present[number])
            .map(|number| Card::from_number(number, columns, rows))
            .collect();

        let mut cells = cells.into_iter();
        let grid = Grid::from_fn(columns, rows, |_, _, _| cells.next().flatten());

        Self { grid, removed }
    }

    #[inline]
    pub fn columns(&self) -> usize {
        self.grid.columns()
    }

    #[inline]
    pub fn rows(&self) -> usize {
        self.grid.rows()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.grid.capacity()
    }

    pub fn grid(&self) -> &Grid<Cell> {
        &self.grid
    }

    #[inline]
    pub fn get(&self, position: Position) -> Cell {
        *self.grid.get(position)
    }

    #[inline]
    pub fn is_gap(&self, position: Position) -> bool {
        self.get(position).is_none()
    }

    /// Cards taken out of play, in removal order.
    pub fn removed_cards(&self) -> &[Card] {
        &self.removed
    }

    /// Restores the ordered deck and forgets removed cards.
    pub fn reset(&mut self) {
        self.resize(self.columns(), self.rows());
    }

    /// Rebuilds the board as a fresh ordered deck of the new size.
    pub fn resize(&mut self, columns: usize, rows: usize) {
        check_dimensions(columns, rows);
        self.grid.rebuild(columns, rows, |_, _, index| {
            Some(Card::from_number(index, columns, rows))
        });
        self.removed.clear();
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.grid.shuffle(rng);
    }

    /// Takes every card of `rank` out of play. Returns how many were removed.
    pub fn remove_rank(&mut self, rank: u8) -> usize {
        let positions = self
            .grid
            .find_all(|_, cell| matches!(cell, Some(card) if card.rank == rank));

        for &position in &positions {
            if let Some(card) = self.grid.get_mut(position).take() {
                self.removed.push(card);
            }
        }

        positions.len()
    }

    /// Removes the highest rank, the standard setup for a game.
    pub fn remove_top_rank(&mut self) -> usize {
        self.remove_rank((self.columns() - 1) as u8)
    }

    /// Removes up to `count` randomly chosen cards and returns where they were.
    pub fn remove_random<R: Rng + ?Sized>(&mut self, count: usize, rng: &mut R) -> Vec<Position> {
        let mut emptied = Vec::with_capacity(count);

        for _ in 0..count {
            let occupied = self.grid.find_all(|_, cell| cell.is_some());
            if occupied.is_empty() {
                break;
            }
            let position = occupied[rng.random_range(0..occupied.len())];
            if let Some(card) = self.grid.get_mut(position).take() {
                self.removed.push(card);
            }
            emptied.push(position);
        }

        emptied
    }

    pub fn find(&self, card: Card) -> Option<Position> {
        self.grid.find_first(|_, cell| *cell == Some(card))
    }

    /// Gap positions, row-major.
    pub fn gaps(&self) -> Vec<Position> {
        self.grid.find_all(|_, cell| cell.is_none())
    }

    /// The cell left of `position`, or `None` in column 0.
    pub fn left_of(&self, (column, row): Position) -> Option<Cell> {
        column.checked_sub(1).map(|left| self.get((left, row)))
    }

    /// Legal `(from, to, card)` triples without building the resulting boards.
    fn legal_moves(&self) -> Vec<(Position, Position, Card)> {
        let mut legal = Vec::new();

        for gap in self.gaps() {
            match self.left_of(gap) {
                // row start: every lowest-rank card may open the row
                None => {
                    for (from, cell) in self.grid.iter() {
                        if let Some(card) = *cell {
                            if card.rank == LOWEST_RANK {
                                legal.push((from, gap, card));
                            }
                        }
                    }
                }
                // cannot leap over another gap
                Some(None) => {}
                Some(Some(left)) => {
                    let Some(next) = left.higher(self.columns()) else {
                        continue;
                    };
                    // the successor may have been taken out of play
                    if let Some(from) = self.find(next) {
                        legal.push((from, gap, next));
                    }
                }
            }
        }

        legal
    }

    /// Every legal move from this board. Pure and idempotent.
    pub fn moves(&self) -> Vec<Move> {
        self.legal_moves()
            .into_iter()
            .map(|(from, to, card)| {
                let mut state = self.clone();
                state.grid.swap(from, to);
                Move {
                    from,
                    to,
                    card,
                    state,
                }
            })
            .collect()
    }

    /// True when no move is possible.
    pub fn is_leaf(&self) -> bool {
        self.legal_moves().is_empty()
    }

    /// Re-checks a move against this board, independently of where it came from.
    pub fn verify_move(&self, mv: &Move) -> bool {
        if self.get(mv.from) != Some(mv.card) || !self.is_gap(mv.to) {
            return false;
        }

        match self.left_of(mv.to) {
            None => mv.card.rank == LOWEST_RANK,
            Some(None) => false,
            Some(Some(left)) => left.higher(self.columns()) == Some(mv.card),
        }
    }

    /// Applies `mv` in place. With `verify`, an illegal move is ignored.
    pub fn perform_move(&mut self, mv: &Move, verify: bool) -> &mut Self {
        if verify && !self.verify_move(mv) {
            return self;
        }
        self.grid.swap(mv.from, mv.to);
        self
    }

    /// Legal moves of one card.
    pub fn moves_for(&self, card: Card) -> Vec<Move> {
        self.moves()
            .into_iter()
            .filter(|mv| mv.card == card)
            .collect()
    }

    pub fn is_movable(&self, card: Card) -> bool {
        self.legal_moves().iter().any(|&(_, _, c)| c == card)
    }

    /// Whether `card` may legally be moved into `gap` right now.
    pub fn can_fill(&self, card: Card, gap: Position) -> bool {
        self.legal_moves()
            .iter()
            .any(|&(_, to, c)| c == card && to == gap)
    }

    /// Number of misplaced cells; 0 means solved.
    ///
    /// Each row is scored as a run from column 0: the row must open with a
    /// lowest-rank card, which fixes its suit, and every following column must
    /// hold that suit's card whose rank equals the column index. A gap in the
    /// last column also counts, so a trailing gap is not penalized. The run
    /// stops at the first incorrect cell.
    ///
    /// While no card has been taken out of play each row is charged one more
    /// cell, since a full board has not started yet.
    pub fn score(&self) -> usize {
        let correct: usize = (0..self.rows()).map(|row| self.correct_in_row(row)).sum();
        let not_started = if self.removed.is_empty() { self.rows() } else { 0 };
        self.capacity() - correct + not_started
    }

    fn correct_in_row(&self, row: usize) -> usize {
        let cells = self.grid.row(row);
        let last = cells.len() - 1;

        let suit = match cells[0] {
            Some(card) if card.rank == LOWEST_RANK => card.suit,
            // a one-column row is complete when its only cell is empty
            None if last == 0 => return 1,
            _ => return 0,
        };

        let mut correct = 1;
        for (column, cell) in cells.iter().enumerate().skip(1) {
            let in_place = match cell {
                None => column == last,
                Some(card) => card.suit == suit && card.rank as usize == column,
            };
            if !in_place {
                break;
            }
            correct += 1;
        }

        correct
    }

    #[inline]
    pub fn is_solved(&self) -> bool {
        self.score() == 0
    }

    /// One byte per cell, used to key closed and open sets.
    pub fn layout_key(&self) -> LayoutKey {
        let columns = self.columns();
        self.grid
            .cells()
            .iter()
            .map(|cell| cell.map_or(GAP_KEY, |card| card.number(columns) as u8))
            .collect()
    }
}

impl PartialEq for BoardState {
    fn eq(&self, other: &Self) -> bool {
        self.grid == other.grid
    }
}

impl Eq for BoardState {}

impl Hash for BoardState {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.grid.hash(state);
    }
}

/// One line per row, gaps shown as `--`.
impl fmt::Display for BoardState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.rows() {
            if row > 0 {
                writeln!(f)?;
            }
            let line = self
                .grid
                .row(row)
                .iter()
                .map(|cell| {
                    let text = cell.map_or_else(|| "--".to_string(), |card| card.to_string());
                    format!("{text:<3}")
                })
                .collect::<Vec<_>>()
                .join(" ");
            write!(f, "{}", line.trim_end())?;
        }
        Ok(())
    }
}
