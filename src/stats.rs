//! Benchmark harness: random games, algorithm comparison and weight tuning.
//!
//! Every game is searched independently, so runs fan out over the rayon pool
//! and are reduced afterwards. A run that returns no state (A* exhausting its
//! open set) contributes no datum to the means.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use rand::Rng;
use rayon::prelude::*;
use tracing::info;

use crate::board::BoardState;
use crate::config::SearchConfig;
use crate::heuristic::HeuristicKind;
use crate::solver::Algorithm;

/// `n` shuffled games of the given size with the top rank removed.
pub fn generate_games<R: Rng + ?Sized>(
    n: usize,
    columns: usize,
    rows: usize,
    rng: &mut R,
) -> Vec<BoardState> {
    (0..n)
        .map(|_| {
            let mut state = BoardState::new(columns, rows);
            state.remove_top_rank();
            state.shuffle(rng);
            state
        })
        .collect()
}

/// Ordered selections of `n` distinct values from `pool`.
///
/// `arrangements(2, &[0, 1, 2])` yields the six ordered pairs of distinct
/// values; `n = 0` yields a single empty arrangement.
pub fn arrangements<T: Clone + PartialEq>(n: usize, pool: &[T]) -> Vec<Vec<T>> {
    if n == 0 {
        return vec![Vec::new()];
    }

    let mut result = Vec::new();
    for value in pool {
        for rest in arrangements(n - 1, pool) {
            if rest.contains(value) {
                continue;
            }
            let mut arrangement = Vec::with_capacity(n);
            arrangement.push(value.clone());
            arrangement.extend(rest);
            result.push(arrangement);
        }
    }
    result
}

/// Integer weights drawn from `range`, as floats.
pub fn weight_pool(range: RangeInclusive<u32>) -> Vec<f64> {
    range.map(f64::from).collect()
}

/// One timed search.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measure {
    /// Score of the returned state; `None` when no state was returned.
    pub score: Option<usize>,
    pub solved: bool,
    pub closed: usize,
    pub elapsed: Duration,
}

impl Measure {
    /// Runs `config` on `game` and times it.
    pub fn run(config: &SearchConfig, game: &BoardState) -> Self {
        let started = Instant::now();
        let outcome = config.run(game);
        Self {
            score: outcome.score(),
            solved: outcome.is_solved(),
            closed: outcome.closed_count,
            elapsed: started.elapsed(),
        }
    }
}

/// Means over the runs that returned a state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub samples: usize,
    pub solved: usize,
    pub mean_score: f64,
    pub mean_seconds: f64,
}

impl Summary {
    /// `None` when no run returned a state.
    pub fn from_measures(measures: &[Measure]) -> Option<Self> {
        let (samples, solved, total_score, total_seconds) = measures
            .iter()
            .filter_map(|m| m.score.map(|score| (m, score)))
            .fold((0usize, 0usize, 0usize, 0f64), |acc, (m, score)| {
                (
                    acc.0 + 1,
                    acc.1 + usize::from(m.solved),
                    acc.2 + score,
                    acc.3 + m.elapsed.as_secs_f64(),
                )
            });

        (samples > 0).then(|| Self {
            samples,
            solved,
            mean_score: total_score as f64 / samples as f64,
            mean_seconds: total_seconds / samples as f64,
        })
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "average of {:.2} misplaced cards in {:.4}s ({}/{} solved)",
            self.mean_score, self.mean_seconds, self.solved, self.samples
        )
    }
}

/// Runs `config` over every game in parallel.
pub fn measure_all(config: &SearchConfig, games: &[BoardState]) -> Vec<Measure> {
    games
        .par_iter()
        .map(|game| Measure::run(config, game))
        .collect()
}

/// Performance of one named configuration over a set of games.
#[derive(Debug, Clone)]
pub struct Comparison {
    pub name: String,
    pub summary: Option<Summary>,
}

/// Runs each named configuration over all games.
pub fn compare_algorithms(
    games: &[BoardState],
    configs: &[(String, SearchConfig)],
) -> Vec<Comparison> {
    configs
        .iter()
        .map(|(name, config)| {
            let summary = Summary::from_measures(&measure_all(config, games));
            match &summary {
                Some(summary) => info!(
                    event = "comparison",
                    name = name.as_str(),
                    samples = summary.samples,
                    mean_score = summary.mean_score,
                    mean_seconds = summary.mean_seconds
                ),
                None => info!(event = "comparison", name = name.as_str(), samples = 0),
            }
            Comparison {
                name: name.clone(),
                summary,
            }
        })
        .collect()
}

/// Runs each named configuration once on a single game.
pub fn compare_on_game(
    game: &BoardState,
    configs: &[(String, SearchConfig)],
) -> Vec<(String, Measure)> {
    configs
        .par_iter()
        .map(|(name, config)| (name.clone(), Measure::run(config, game)))
        .collect()
}

/// A candidate weight vector and how A* performed with it.
#[derive(Debug, Clone)]
pub struct WeightTrial {
    pub weights: Vec<f64>,
    pub summary: Summary,
}

/// Tries every arrangement of distinct weights from `range` over `kinds`.
///
/// Each arrangement drives an A* search on every game; trials are sorted by
/// mean score, ties broken by mean time. Arrangements for which no game
/// returned a state are dropped.
pub fn find_best_weights(
    games: &[BoardState],
    range: RangeInclusive<u32>,
    kinds: &[HeuristicKind],
    max_closed: Option<usize>,
) -> Vec<WeightTrial> {
    let candidates = arrangements(kinds.len(), &weight_pool(range));
    info!(
        event = "tune_start",
        arrangements = candidates.len(),
        runs = candidates.len() * games.len()
    );

    let mut trials: Vec<WeightTrial> = candidates
        .into_iter()
        .filter_map(|weights| {
            let config = SearchConfig::new()
                .with_algorithm(Algorithm::AStar)
                .with_max_closed(max_closed)
                .with_weights(kinds, &weights);
            let summary = Summary::from_measures(&measure_all(&config, games))?;
            info!(
                event = "weight_trial",
                weights = ?weights,
                mean_score = summary.mean_score,
                mean_seconds = summary.mean_seconds
            );
            Some(WeightTrial { weights, summary })
        })
        .collect();

    trials.sort_by(|a, b| {
        a.summary
            .mean_score
            .total_cmp(&b.summary.mean_score)
            .then(a.summary.mean_seconds.total_cmp(&b.summary.mean_seconds))
    });
    trials
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn near_solved(count: usize) -> Vec<BoardState> {
        let mut solved = BoardState::new(13, 4);
        solved.remove_top_rank();
        // each game parks one card of the first row in the gap of the second
        (0..count)
            .map(|i| {
                let mut cells = solved.grid().cells().to_vec();
                cells.swap(1 + i, 25);
                BoardState::from_cells(13, 4, cells)
            })
            .collect()
    }

    #[test]
    fn test_generate_games_is_reproducible() {
        let a = generate_games(4, 13, 4, &mut ChaCha8Rng::seed_from_u64(9));
        let b = generate_games(4, 13, 4, &mut ChaCha8Rng::seed_from_u64(9));
        assert_eq!(a, b);
        assert_eq!(a.len(), 4);
        for game in &a {
            assert_eq!(game.gaps().len(), 4);
            assert!(game.removed_cards().iter().all(|card| card.rank == 12));
        }
        assert_ne!(a[0], a[1]);
    }

    #[test]
    fn test_arrangements() {
        let pairs = arrangements(2, &[0, 1, 2]);
        assert_eq!(
            pairs,
            vec![
                vec![0, 1],
                vec![0, 2],
                vec![1, 0],
                vec![1, 2],
                vec![2, 0],
                vec![2, 1]
            ]
        );
        assert_eq!(arrangements(3, &weight_pool(0..=5)).len(), 6 * 5 * 4);
        assert!(arrangements(4, &[1, 2, 3]).is_empty());
        assert_eq!(arrangements::<u8>(0, &[]), vec![Vec::<u8>::new()]);
    }

    #[test]
    fn test_summary_skips_missing_results() {
        let measure = |score, secs| Measure {
            score,
            solved: score == Some(0),
            closed: 1,
            elapsed: Duration::from_secs(secs),
        };
        let summary =
            Summary::from_measures(&[measure(Some(0), 1), measure(None, 100), measure(Some(4), 3)])
                .unwrap();
        assert_eq!(summary.samples, 2);
        assert_eq!(summary.solved, 1);
        assert_eq!(summary.mean_score, 2.0);
        assert_eq!(summary.mean_seconds, 2.0);

        assert_eq!(Summary::from_measures(&[measure(None, 1)]), None);
        assert_eq!(Summary::from_measures(&[]), None);
    }

    #[test]
    fn test_compare_algorithms_on_near_solved_games() {
        let games = near_solved(3);
        let configs: Vec<_> = Algorithm::ALL
            .iter()
            .map(|&algorithm| {
                (
                    algorithm.to_string(),
                    SearchConfig::new().with_algorithm(algorithm),
                )
            })
            .collect();

        let results = compare_algorithms(&games, &configs);
        assert_eq!(results.len(), configs.len());
        for result in results {
            let summary = result.summary.expect("every run returns a state");
            assert_eq!(summary.samples, 3, "{}", result.name);
            assert_eq!(summary.solved, 3, "{}", result.name);
            assert_eq!(summary.mean_score, 0.0);
        }
    }

    #[test]
    fn test_compare_on_game_keeps_names() {
        let game = &near_solved(1)[0];
        let configs = vec![
            ("bfs".to_string(), SearchConfig::new().with_algorithm(Algorithm::BreadthFirst)),
            ("a*".to_string(), SearchConfig::new()),
        ];
        let mut names: Vec<_> = compare_on_game(game, &configs)
            .into_iter()
            .map(|(name, measure)| {
                assert!(measure.solved);
                name
            })
            .collect();
        names.sort();
        assert_eq!(names, vec!["a*", "bfs"]);
    }

    #[test]
    fn test_find_best_weights_sorted() {
        let mut games = generate_games(2, 5, 2, &mut ChaCha8Rng::seed_from_u64(12));
        games.extend(near_solved(1));
        let kinds = [HeuristicKind::CountMisplaced, HeuristicKind::WrongColumnPlacement];

        let trials = find_best_weights(&games, 0..=2, &kinds, Some(200));
        assert_eq!(trials.len(), 6);
        for trial in &trials {
            assert_eq!(trial.weights.len(), 2);
            assert_ne!(trial.weights[0], trial.weights[1]);
        }
        assert!(trials.windows(2).all(|w| {
            let (a, b) = (&w[0].summary, &w[1].summary);
            a.mean_score < b.mean_score
                || (a.mean_score == b.mean_score && a.mean_seconds <= b.mean_seconds)
        }));
    }
}
