//! Heuristics estimating how far a board is from solved.
//!
//! A heuristic is any pure function from a board to a non-negative integer.
//! The built-in estimators are small and cheap; [`Composite`] combines them as
//! a weighted sum, optionally evaluating the terms in parallel.

use std::fmt;
use std::sync::Arc;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::board::BoardState;

/// Estimates the distance from a board to a solved board.
pub trait Heuristic: Send + Sync {
    fn estimate(&self, state: &BoardState) -> u32;
}

impl<F> Heuristic for F
where
    F: Fn(&BoardState) -> u32 + Send + Sync,
{
    fn estimate(&self, state: &BoardState) -> u32 {
        self(state)
    }
}

/// Weighted sum of floats rounded to the nearest non-negative integer.
fn round_weighted(total: f64) -> u32 {
    total.round().max(0.0) as u32
}

/// The misplaced-card count, i.e. the board score.
pub fn count_misplaced(state: &BoardState) -> u32 {
    state.score() as u32
}

/// Gaps that no card can ever fill in the current layout.
///
/// A gap (outside column 0) is stuck when the cell on its left is also a gap,
/// or when it holds the rank just below the removed top rank and the gap is
/// not in the last column. Each kind is weighted independently and the
/// weighted total is truncated toward zero.
pub fn stuck_gaps(max_rank_weight: f64, gap_weight: f64) -> impl Fn(&BoardState) -> u32 + Clone {
    move |state: &BoardState| {
        let columns = state.columns();
        let blocking_rank = columns.checked_sub(2);
        let mut stuck_by_max_rank = 0u32;
        let mut stuck_by_gap = 0u32;

        for gap in state.gaps() {
            match state.left_of(gap) {
                None => {}
                Some(None) => stuck_by_gap += 1,
                Some(Some(left)) => {
                    if Some(left.rank as usize) == blocking_rank && gap.0 < columns - 1 {
                        stuck_by_max_rank += 1;
                    }
                }
            }
        }

        let total =
            max_rank_weight * f64::from(stuck_by_max_rank) + gap_weight * f64::from(stuck_by_gap);
        total.max(0.0) as u32
    }
}

/// Cells not holding the rank of their column; gaps only count outside the
/// last column.
pub fn wrong_column_placement(state: &BoardState) -> u32 {
    let last = state.columns() - 1;
    state
        .grid()
        .iter()
        .filter(|&((column, _), cell)| match cell {
            None => column != last,
            Some(card) => card.rank as usize != column,
        })
        .count() as u32
}

/// Selects one of the built-in heuristics by name (configuration and CLI).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum HeuristicKind {
    CountMisplaced,
    StuckGaps,
    WrongColumnPlacement,
}

impl HeuristicKind {
    pub const ALL: [HeuristicKind; 3] = [
        HeuristicKind::CountMisplaced,
        HeuristicKind::StuckGaps,
        HeuristicKind::WrongColumnPlacement,
    ];

    /// The estimator behind this name; `stuck_gaps` uses unit weights.
    pub fn build(self) -> Arc<dyn Heuristic> {
        match self {
            HeuristicKind::CountMisplaced => Arc::new(count_misplaced),
            HeuristicKind::StuckGaps => Arc::new(stuck_gaps(1.0, 1.0)),
            HeuristicKind::WrongColumnPlacement => Arc::new(wrong_column_placement),
        }
    }
}

impl fmt::Display for HeuristicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            HeuristicKind::CountMisplaced => "count_misplaced",
            HeuristicKind::StuckGaps => "stuck_gaps",
            HeuristicKind::WrongColumnPlacement => "wrong_column_placement",
        };
        f.write_str(name)
    }
}

/// Weighted sum of heuristics: `round(sum(weight * estimate))`.
///
/// Terms are independent, so their order does not matter and they may be
/// evaluated in parallel.
#[derive(Clone, Default)]
pub struct Composite {
    terms: Vec<(f64, Arc<dyn Heuristic>)>,
    parallel: bool,
}

impl Composite {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pairs `heuristics` with `weights` position by position.
    ///
    /// Panics when the lists differ in length.
    pub fn from_weights(heuristics: &[Arc<dyn Heuristic>], weights: &[f64]) -> Self {
        assert_eq!(
            heuristics.len(),
            weights.len(),
            "one weight per heuristic"
        );
        Self {
            terms: weights.iter().copied().zip(heuristics.iter().cloned()).collect(),
            parallel: false,
        }
    }

    pub fn with(mut self, weight: f64, heuristic: impl Heuristic + 'static) -> Self {
        self.terms.push((weight, Arc::new(heuristic)));
        self
    }

    pub fn with_shared(mut self, weight: f64, heuristic: Arc<dyn Heuristic>) -> Self {
        self.terms.push((weight, heuristic));
        self
    }

    /// Evaluate terms on the rayon pool instead of sequentially.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl Heuristic for Composite {
    fn estimate(&self, state: &BoardState) -> u32 {
        let term = |(weight, heuristic): &(f64, Arc<dyn Heuristic>)| {
            weight * f64::from(heuristic.estimate(state))
        };

        let total: f64 = if self.parallel {
            self.terms.par_iter().map(term).sum()
        } else {
            self.terms.iter().map(term).sum()
        };

        round_weighted(total)
    }
}

impl fmt::Debug for Composite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Composite")
            .field("weights", &self.terms.iter().map(|(w, _)| *w).collect::<Vec<_>>())
            .field("parallel", &self.parallel)
            .finish()
    }
}

/// Shorthand for a sequential [`Composite`] over `(weight, heuristic)` pairs.
pub fn compose(terms: impl IntoIterator<Item = (f64, Arc<dyn Heuristic>)>) -> Composite {
    terms
        .into_iter()
        .fold(Composite::new(), |composite, (weight, heuristic)| {
            composite.with_shared(weight, heuristic)
        })
}
