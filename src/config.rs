//! Search configuration loaded from TOML.
//!
//! ```
//! use gaps::config::SearchConfig;
//! use gaps::solver::Algorithm;
//!
//! let config = SearchConfig::from_toml_str(r#"
//!     algorithm = "a_star"
//!     max_closed = 20000
//!
//!     [[heuristics]]
//!     kind = "count_misplaced"
//!     weight = 5.0
//!
//!     [[heuristics]]
//!     kind = "wrong_column_placement"
//!     weight = 4.0
//! "#).unwrap();
//!
//! assert_eq!(config.algorithm, Algorithm::AStar);
//! assert_eq!(config.heuristic().len(), 2);
//! ```

use std::path::Path;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::board::BoardState;
use crate::heuristic::{Composite, HeuristicKind};
use crate::solver::{Algorithm, CancelToken, SearchOutcome, Searcher};

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// One weighted term of the A* heuristic.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct WeightedHeuristic {
    pub kind: HeuristicKind,
    #[serde(default = "default_weight")]
    pub weight: f64,
}

fn default_weight() -> f64 {
    1.0
}

fn default_max_closed() -> Option<usize> {
    Some(100_000)
}

fn default_heuristics() -> Vec<WeightedHeuristic> {
    vec![
        WeightedHeuristic {
            kind: HeuristicKind::CountMisplaced,
            weight: 5.0,
        },
        WeightedHeuristic {
            kind: HeuristicKind::StuckGaps,
            weight: 1.0,
        },
        WeightedHeuristic {
            kind: HeuristicKind::WrongColumnPlacement,
            weight: 4.0,
        },
    ]
}

fn default_algorithm() -> Algorithm {
    Algorithm::AStar
}

/// How to run one search.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SearchConfig {
    #[serde(default = "default_algorithm")]
    pub algorithm: Algorithm,

    /// Closed-set budget; `None` searches until solved or exhausted.
    #[serde(default = "default_max_closed")]
    pub max_closed: Option<usize>,

    /// Wall-clock limit; the search is cancelled when it runs out.
    #[serde(default)]
    pub time_limit_ms: Option<u64>,

    /// Evaluate heuristic terms on the rayon pool.
    #[serde(default)]
    pub parallel_heuristics: bool,

    /// Terms of the A* heuristic; ignored by the uninformed algorithms.
    #[serde(default = "default_heuristics")]
    pub heuristics: Vec<WeightedHeuristic>,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            max_closed: default_max_closed(),
            time_limit_ms: None,
            parallel_heuristics: false,
            heuristics: default_heuristics(),
        }
    }
}

impl SearchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if the file is missing, is not valid TOML, or describes
    /// an unusable search.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses and validates configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string(self).map_err(|e| ConfigError::Invalid(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_closed == Some(0) {
            return Err(ConfigError::Invalid("max_closed must be positive".into()));
        }
        if self.algorithm == Algorithm::AStar && self.heuristics.is_empty() {
            return Err(ConfigError::Invalid(
                "a_star needs at least one heuristic".into(),
            ));
        }
        if let Some(term) = self.heuristics.iter().find(|term| !term.weight.is_finite()) {
            return Err(ConfigError::Invalid(format!(
                "weight of {} is not finite",
                term.kind
            )));
        }
        Ok(())
    }

    pub fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    pub fn with_max_closed(mut self, max_closed: Option<usize>) -> Self {
        self.max_closed = max_closed;
        self
    }

    pub fn with_time_limit(mut self, limit: Duration) -> Self {
        self.time_limit_ms = Some(limit.as_millis() as u64);
        self
    }

    /// Replaces the heuristic terms, pairing `kinds` with `weights`.
    pub fn with_weights(mut self, kinds: &[HeuristicKind], weights: &[f64]) -> Self {
        assert_eq!(kinds.len(), weights.len(), "one weight per heuristic");
        self.heuristics = kinds
            .iter()
            .zip(weights)
            .map(|(&kind, &weight)| WeightedHeuristic { kind, weight })
            .collect();
        self
    }

    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_ms.map(Duration::from_millis)
    }

    /// The composite A* heuristic described by `heuristics`.
    pub fn heuristic(&self) -> Composite {
        self.heuristics
            .iter()
            .fold(Composite::new(), |composite, term| {
                composite.with_shared(term.weight, term.kind.build())
            })
            .parallel(self.parallel_heuristics)
    }

    /// Runs the configured search from `start`.
    pub fn run(&self, start: &BoardState) -> SearchOutcome {
        self.run_with(start, CancelToken::new())
    }

    /// Runs the configured search; `token` may also be cancelled by the caller.
    pub fn run_with(&self, start: &BoardState, token: CancelToken) -> SearchOutcome {
        let heuristic = self.heuristic();
        let _watchdog = self.time_limit().map(|limit| Watchdog::start(limit, token.clone()));

        Searcher::new()
            .max_closed_opt(self.max_closed)
            .cancel_token(token)
            .run(self.algorithm, start, &heuristic)
    }
}

/// Cancels a token once a time limit passes, unless dropped first.
struct Watchdog {
    stop: Option<mpsc::Sender<()>>,
    handle: Option<thread::JoinHandle<()>>,
}

impl Watchdog {
    fn start(limit: Duration, token: CancelToken) -> Self {
        let (stop, stopped) = mpsc::channel::<()>();
        let handle = thread::spawn(move || {
            if let Err(mpsc::RecvTimeoutError::Timeout) = stopped.recv_timeout(limit) {
                debug!(limit_ms = limit.as_millis() as u64, "time limit reached");
                token.cancel();
            }
        });
        Self {
            stop: Some(stop),
            handle: Some(handle),
        }
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        // disconnecting the channel wakes the thread early
        self.stop.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Termination;

    #[test]
    fn test_defaults_when_fields_missing() {
        let config = SearchConfig::from_toml_str("").unwrap();
        assert_eq!(config, SearchConfig::default());
        assert_eq!(config.algorithm, Algorithm::AStar);
        assert_eq!(config.heuristic().len(), 3);
    }

    #[test]
    fn test_toml_parsing() {
        let config = SearchConfig::from_toml_str(
            r#"
            algorithm = "breadth_first"
            max_closed = 500
            time_limit_ms = 250
            parallel_heuristics = true

            [[heuristics]]
            kind = "stuck_gaps"
        "#,
        )
        .unwrap();

        assert_eq!(config.algorithm, Algorithm::BreadthFirst);
        assert_eq!(config.max_closed, Some(500));
        assert_eq!(config.time_limit(), Some(Duration::from_millis(250)));
        assert!(config.parallel_heuristics);
        assert_eq!(
            config.heuristics,
            vec![WeightedHeuristic {
                kind: HeuristicKind::StuckGaps,
                weight: 1.0
            }]
        );
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = SearchConfig::new()
            .with_algorithm(Algorithm::DepthFirst)
            .with_max_closed(Some(42))
            .with_weights(&[HeuristicKind::WrongColumnPlacement], &[2.5]);
        let text = config.to_toml_string().unwrap();
        assert_eq!(SearchConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_invalid_configs() {
        let cases = [
            "max_closed = 0",
            "algorithm = \"a_star\"\nheuristics = []",
            "algorithm = \"sideways\"",
            "[[heuristics]]\nkind = \"unknown\"",
        ];
        for case in cases {
            assert!(
                SearchConfig::from_toml_str(case).is_err(),
                "accepted invalid config:\n{case}"
            );
        }

        let err = SearchConfig::from_toml_str("max_closed = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = SearchConfig::load("/nonexistent/gaps.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn test_run_solves_near_solved_board() {
        let mut solved = BoardState::new(13, 4);
        solved.remove_top_rank();
        let mut cells = solved.grid().cells().to_vec();
        cells.swap(4, 25);
        let start = BoardState::from_cells(13, 4, cells);

        for algorithm in Algorithm::ALL {
            let outcome = SearchConfig::new().with_algorithm(algorithm).run(&start);
            assert!(outcome.is_solved(), "{algorithm} failed");
        }
    }

    #[test]
    fn test_pre_cancelled_run_returns_start() {
        let start = BoardState::new(13, 4);
        let token = CancelToken::new();
        token.cancel();

        let outcome = SearchConfig::new()
            .with_time_limit(Duration::from_secs(60))
            .run_with(&start, token);
        assert_eq!(outcome.termination, Termination::Cancelled);
        assert_eq!(outcome.state(), Some(&start));
    }
}
