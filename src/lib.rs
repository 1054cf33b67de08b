//! Gaps Patience Solver Library
//!
//! Board model, move generation and scoring for the Gaps (Montana) patience
//! game, plus uninformed and heuristic search over board states.
//!
//! ```
//! use gaps::{heuristic, BoardState, Searcher};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let mut board = BoardState::new(13, 4);
//! board.remove_top_rank();
//! board.shuffle(&mut ChaCha8Rng::seed_from_u64(7));
//!
//! let outcome = Searcher::new()
//!     .max_closed(500)
//!     .a_star(&board, &heuristic::count_misplaced);
//! assert!(outcome.best_effort().score() <= board.score());
//! ```

pub mod board;
pub mod card;
pub mod config;
pub mod grid;
pub mod heuristic;
pub mod seed;
pub mod solver;
pub mod stats;

pub use board::{BoardState, Move};
pub use card::{Card, Suit};
pub use config::{ConfigError, SearchConfig};
pub use heuristic::{Composite, Heuristic, HeuristicKind};
pub use seed::SeedError;
pub use solver::{Algorithm, CancelToken, SearchOutcome, Searcher, Termination};
