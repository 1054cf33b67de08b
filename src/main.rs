//! Gaps Solver
//!
//! Solves boards of the Gaps patience game with depth-first, breadth-first or
//! A* search, compares the algorithms on random games and tunes the A*
//! heuristic weights.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use gaps::{stats, Algorithm, BoardState, HeuristicKind, SearchConfig, SearchOutcome};

/// Solves Gaps patience boards and benchmarks the search algorithms.
#[derive(Parser)]
#[command(name = "gaps")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Search configuration file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Solve one board, given as a seed or dealt at random.
    Solve(SolveArgs),
    /// Compare every algorithm on random games.
    Compare {
        #[command(flatten)]
        games: GameArgs,
    },
    /// Search for the best A* heuristic weights.
    Tune {
        #[command(flatten)]
        games: GameArgs,
        /// Smallest candidate weight.
        #[arg(long, default_value_t = 0)]
        min_weight: u32,
        /// Largest candidate weight.
        #[arg(long, default_value_t = 5)]
        max_weight: u32,
        /// Heuristics to weigh (defaults to all).
        #[arg(long, value_enum, value_delimiter = ',')]
        heuristics: Vec<HeuristicKind>,
        /// How many of the best weightings to print.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

#[derive(clap::Args, Default)]
struct SolveArgs {
    /// Board seed; a random board is dealt when omitted.
    #[arg(long)]
    seed: Option<String>,
    #[arg(long, default_value_t = 13)]
    columns: usize,
    #[arg(long, default_value_t = 4)]
    rows: usize,
    /// RNG seed for the dealt board.
    #[arg(long)]
    shuffle_seed: Option<u64>,
    #[arg(long, value_enum)]
    algorithm: Option<Algorithm>,
    #[arg(long)]
    max_closed: Option<usize>,
    /// Cancel the search after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Print every board from the start to the result.
    #[arg(long)]
    path: bool,
}

#[derive(clap::Args)]
struct GameArgs {
    /// Number of random games.
    #[arg(long, default_value_t = 10)]
    games: usize,
    #[arg(long, default_value_t = 13)]
    columns: usize,
    #[arg(long, default_value_t = 4)]
    rows: usize,
    /// RNG seed for dealing the games.
    #[arg(long, default_value_t = 0)]
    shuffle_seed: u64,
    #[arg(long)]
    max_closed: Option<usize>,
}

impl GameArgs {
    fn deal(&self) -> Result<Vec<BoardState>> {
        check_size(self.columns, self.rows)?;
        let mut rng = ChaCha8Rng::seed_from_u64(self.shuffle_seed);
        Ok(stats::generate_games(
            self.games,
            self.columns,
            self.rows,
            &mut rng,
        ))
    }
}

fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => SearchConfig::load(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => SearchConfig::default(),
    };

    match cli.command {
        Some(Command::Solve(args)) => run_solve(config, &args),
        Some(Command::Compare { games }) => run_compare(config, &games),
        Some(Command::Tune {
            games,
            min_weight,
            max_weight,
            heuristics,
            top,
        }) => run_tune(&games, min_weight..=max_weight, &heuristics, top),
        // default: solve a random standard board
        None => run_solve(config, &SolveArgs {
            columns: 13,
            rows: 4,
            ..SolveArgs::default()
        }),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gaps=info"));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn check_size(columns: usize, rows: usize) -> Result<()> {
    anyhow::ensure!(
        (1..=gaps::board::MAX_COLUMNS).contains(&columns)
            && (1..=gaps::board::MAX_ROWS).contains(&rows),
        "board must be 1..={} columns by 1..={} rows, got {columns}x{rows}",
        gaps::board::MAX_COLUMNS,
        gaps::board::MAX_ROWS
    );
    Ok(())
}

/// Parses the seed or deals a fresh board with the top rank removed.
fn starting_board(args: &SolveArgs) -> Result<BoardState> {
    if let Some(seed) = &args.seed {
        return seed
            .parse::<BoardState>()
            .with_context(|| format!("invalid seed {seed:?}"));
    }

    check_size(args.columns, args.rows)?;
    let shuffle_seed = args.shuffle_seed.unwrap_or_else(rand::random);
    info!(shuffle_seed, "dealing board");

    let mut board = BoardState::new(args.columns, args.rows);
    board.remove_top_rank();
    board.shuffle(&mut ChaCha8Rng::seed_from_u64(shuffle_seed));
    Ok(board)
}

fn run_solve(mut config: SearchConfig, args: &SolveArgs) -> Result<()> {
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if args.max_closed.is_some() {
        config.max_closed = args.max_closed;
    }
    if args.timeout_ms.is_some() {
        config.time_limit_ms = args.timeout_ms;
    }
    config.validate()?;

    let board = starting_board(args)?;
    println!("seed {}\n{board}\n", board.seed());

    let outcome = config.run(&board);
    print!("{}", format_report(&outcome, args.path));
    if let Some(state) = outcome.state() {
        println!("result seed {}", state.seed());
    }
    Ok(())
}

/// Summary line, then the boards along the path when `show_path` is set.
fn format_report(outcome: &SearchOutcome, show_path: bool) -> String {
    let mut report = match (outcome.score(), outcome.depth()) {
        (Some(score), Some(depth)) => format!(
            "{}: score {score} after {} closed states in {depth} moves\n",
            outcome.termination, outcome.closed_count
        ),
        _ => format!(
            "{}: no solution after {} closed states, best score {}\n",
            outcome.termination,
            outcome.closed_count,
            outcome.best_effort().score()
        ),
    };

    if show_path {
        for (step, state) in outcome.rewind().into_iter().enumerate() {
            report.push_str(&format!("step {step}, score {}\n{state}\n", state.score()));
        }
    }
    report
}

fn run_compare(config: SearchConfig, games: &GameArgs) -> Result<()> {
    let boards = games.deal()?;
    let configs: Vec<(String, SearchConfig)> = Algorithm::ALL
        .iter()
        .map(|&algorithm| {
            let config = config
                .clone()
                .with_algorithm(algorithm)
                .with_max_closed(games.max_closed.or(config.max_closed));
            (algorithm.to_string(), config)
        })
        .collect();

    for comparison in stats::compare_algorithms(&boards, &configs) {
        match comparison.summary {
            Some(summary) => println!("{}:\t{summary}", comparison.name),
            None => println!("{}:\tno result", comparison.name),
        }
    }
    Ok(())
}

fn run_tune(
    games: &GameArgs,
    range: std::ops::RangeInclusive<u32>,
    heuristics: &[HeuristicKind],
    top: usize,
) -> Result<()> {
    anyhow::ensure!(!range.is_empty(), "empty weight range {range:?}");
    let kinds = if heuristics.is_empty() {
        HeuristicKind::ALL.to_vec()
    } else {
        heuristics.to_vec()
    };

    let boards = games.deal()?;
    let trials = stats::find_best_weights(&boards, range, &kinds, games.max_closed);
    anyhow::ensure!(!trials.is_empty(), "no weighting produced a result");

    for trial in trials.iter().take(top) {
        println!("{:?}\t{}", trial.weights, trial.summary);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gaps::solver::breadth_first_search;

    #[test]
    fn test_solve_report_snapshot() {
        let board: BoardState = "02030001XX0304XX".parse().unwrap();
        assert!(board.is_solved());

        // A♣ -- 2♣ / A♦ 2♦ -- : one move from solved
        let board: BoardState = "020300XX010304XX".parse().unwrap();
        let outcome = breadth_first_search(&board, Some(10));

        insta::assert_snapshot!(format_report(&outcome, true), @r"
        solved: score 0 after 1 closed states in 1 moves
        step 0, score 2
        A♣  --  2♣
        A♦  2♦  --
        step 1, score 0
        A♣  2♣  --
        A♦  2♦  --
        ");
    }

    #[test]
    fn test_report_without_solution() {
        // 2♣ 3♣ -- : dead end
        let board: BoardState = "01030102XX".parse().unwrap();
        let outcome = gaps::solver::a_star(&board, &gaps::heuristic::count_misplaced, None);
        assert_eq!(
            format_report(&outcome, true),
            "exhausted: no solution after 1 closed states, best score 3\n"
        );
    }

    #[test]
    fn test_cli_parses_solve_flags() {
        let cli = Cli::try_parse_from([
            "gaps",
            "solve",
            "--seed",
            "02030001XX0304XX",
            "--algorithm",
            "a-star",
            "--timeout-ms",
            "50",
        ])
        .unwrap();

        let Some(Command::Solve(args)) = cli.command else {
            panic!("expected solve");
        };
        assert_eq!(args.algorithm, Some(Algorithm::AStar));
        assert_eq!(args.timeout_ms, Some(50));
        assert!(starting_board(&args).unwrap().is_solved());
    }

    #[test]
    fn test_dealt_board_is_reproducible() {
        let args = SolveArgs {
            columns: 6,
            rows: 3,
            shuffle_seed: Some(4),
            ..SolveArgs::default()
        };
        let a = starting_board(&args).unwrap();
        let b = starting_board(&args).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.gaps().len(), 3);

        let args = SolveArgs {
            columns: 14,
            ..args
        };
        assert!(starting_board(&args).is_err());
    }
}
