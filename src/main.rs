use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::{error, info};
use serde::Serialize;
use std::error::Error as StdError;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

use expedition_planner::challenge::{SearchConfig, SearchError};
use expedition_planner::grid::{GridError, Pos};
use expedition_planner::map_format::{load_map, MapError};
use expedition_planner::party::PartyEffects;
use expedition_planner::scoring::{score_breakdown, ScoreBreakdown};
use expedition_planner::solvers::{BranchAndBoundSolver, ExhaustiveSolver, ParallelSolver, Solver};

#[derive(ValueEnum, Clone)]
enum SolverName {
    /// Scores every possible path. Slow, for small maps only.
    Exhaustive,
    /// Exhaustive search that skips paths that can't beat the best one.
    BranchAndBound,
    /// Branch-and-bound, split across threads on the first move.
    Parallel,
}

#[derive(Args)]
struct MapArgs {
    /// Map file, JSON if it ends in .json, text format otherwise.
    map: PathBuf,

    /// Comma-separated roles in the party (Scout, Healer, Gatherer). Unknown
    /// roles are ignored.
    #[arg(short, long, value_delimiter = ',')]
    party: Vec<String>,

    /// Print the parsed map before doing anything.
    #[arg(long)]
    print_map: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Search for the best path on a map.
    Solve {
        #[command(flatten)]
        map: MapArgs,

        /// Solver implementation to use to find a solution.
        #[arg(short, long, value_enum, default_value_t = SolverName::BranchAndBound)]
        solver: SolverName,

        /// Search config JSON file. Flags below override its values.
        #[arg(long)]
        search_config_file: Option<PathBuf>,

        /// Number of threads for the parallel solver.
        #[arg(long)]
        threads: Option<usize>,

        /// Stop after evaluating this many states.
        #[arg(long)]
        max_nodes: Option<u64>,

        /// Stop after this many milliseconds.
        #[arg(long)]
        time_limit_ms: Option<u64>,
    },
    /// Score a given path, e.g. '[[0,0],[0,1],[1,1]]'.
    Score {
        #[command(flatten)]
        map: MapArgs,

        /// Path as a JSON list of [row, col] pairs.
        path: String,
    },
}

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Error, Debug)]
enum AppError {
    #[error("Failed loading the map")]
    Map(#[from] MapError),
    #[error("Failed searching for a path")]
    Search(#[from] SearchError),
    #[error("Failed scoring the path")]
    Score(#[from] GridError),
    #[error("Failed reading the search config")]
    ConfigRead(#[from] std::io::Error),
    #[error("Invalid JSON")]
    Json(#[from] serde_json::Error),
}

#[derive(Serialize)]
struct ScoreReport {
    party: PartyEffects,
    path: Vec<Pos>,
    #[serde(flatten)]
    breakdown: ScoreBreakdown,
}

fn load_search_config(
    file: Option<PathBuf>, threads: Option<usize>, max_nodes: Option<u64>,
    time_limit_ms: Option<u64>
    ) -> Result<SearchConfig, AppError> {
    let mut config = match file {
        Some(file) => {
            info!("Loading search config from {}", file.display());
            let data = std::fs::read_to_string(file)?;
            serde_json::from_str(&data)?
        },
        None => SearchConfig::default(),
    };
    if let Some(threads) = threads {
        config.threads = threads;
    }
    if max_nodes.is_some() {
        config.max_nodes = max_nodes;
    }
    if time_limit_ms.is_some() {
        config.time_limit_ms = time_limit_ms;
    }
    Ok(config)
}

fn new_solver(name: SolverName, config: SearchConfig) -> Box<dyn Solver> {
    match name {
        SolverName::Exhaustive => Box::new(ExhaustiveSolver { config }),
        SolverName::BranchAndBound => Box::new(BranchAndBoundSolver { config }),
        SolverName::Parallel => Box::new(ParallelSolver { config }),
    }
}

fn run(cli: Cli) -> Result<(), AppError> {
    let map_args = match &cli.command {
        Command::Solve { map, .. } | Command::Score { map, .. } => map,
    };
    let grid = Arc::new(load_map(&map_args.map)?);
    info!("Loaded {}x{} map from {}", grid.rows(), grid.cols(), map_args.map.display());
    if map_args.print_map {
        print!("{grid}");
    }
    let effects = PartyEffects::from_tags(map_args.party.as_slice());
    info!("Party effects: {effects:?}");

    match cli.command {
        Command::Solve { solver, search_config_file, threads, max_nodes, time_limit_ms, .. } => {
            let config = load_search_config(search_config_file, threads, max_nodes,
                                            time_limit_ms)?;
            let mut solver = new_solver(solver, config);
            let solution = solver.solve(&grid, &effects)?;
            println!("{}", serde_json::to_string_pretty(&solution)?);
        },
        Command::Score { path, .. } => {
            let path: Vec<Pos> = serde_json::from_str(&path)?;
            let breakdown = score_breakdown(&path, &grid, &effects)?;
            let report = ScoreReport { party: effects, path, breakdown };
            println!("{}", serde_json::to_string_pretty(&report)?);
        },
    }
    Ok(())
}

fn main() {
    // Load .env file
    dotenvy::dotenv().ok();
    // Init logger with default value of info
    // This can be overriden with RUST_LOG env var
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    if let Err(err) = run(cli) {
        error!("Error while running the planner with underlying error:");
        error!("  {}", err);
        let mut source = err.source();
        while let Some(cause) = source {
            error!("  caused by: {}", cause);
            source = StdError::source(cause);
        }
        std::process::exit(1);
    }
}
