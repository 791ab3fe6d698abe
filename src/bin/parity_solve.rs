use biodivine_algo_parity_swarm::arena::pgsolver::{parse_pgsolver, write_solution};
use biodivine_algo_parity_swarm::game::naive::solve_naive;
use biodivine_algo_parity_swarm::game::{ZielonkaConfig, solve_with};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::time::Instant;

#[derive(Parser)]
#[command(name = "parity_solve")]
#[command(about = "Solve a parity game given in the PGSolver format")]
struct Args {
    /// Path to a PGSolver game file
    #[arg(value_name = "FILE")]
    file: String,

    /// Print the winning regions and strategies in the PGSolver solution format
    #[arg(long)]
    solution: bool,

    /// Compare the winning regions with a naive recursive solver
    #[arg(long)]
    check: bool,

    /// Maximal number of solver iterations (0 = unlimited)
    #[arg(long, default_value_t = 0, require_equals = true)]
    max_iterations: usize,

    /// Logging verbosity (use -v for info, or -v=LEVEL for a specific level)
    #[arg(long, short = 'v', value_name = "LEVEL", num_args = 0..=1, default_missing_value = "info", require_equals = true)]
    verbose: Option<Option<LogLevel>>,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
}

impl From<LogLevel> for LevelFilter {
    fn from(value: LogLevel) -> Self {
        match value {
            LogLevel::Trace => LevelFilter::Trace,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Info => LevelFilter::Info,
        }
    }
}

fn main() {
    let args = Args::parse();

    let log_level = match args.verbose {
        None => LevelFilter::Off,
        Some(None) => LevelFilter::Info,
        Some(Some(level)) => level.into(),
    };
    Builder::from_default_env().filter_level(log_level).init();

    let input = std::fs::read_to_string(&args.file).unwrap_or_else(|e| {
        eprintln!("Failed to read game file {}: {}", args.file, e);
        std::process::exit(1);
    });
    let mut arena = parse_pgsolver(&input).unwrap_or_else(|e| {
        eprintln!("Failed to parse game file {}: {}", args.file, e);
        std::process::exit(1);
    });
    println!(
        "Loaded game with {} vertices and {} edges.",
        arena.num_vertices(),
        arena.num_edges()
    );

    let mut config = ZielonkaConfig::new();
    if args.max_iterations > 0 {
        config.max_iterations = args.max_iterations;
    }

    let start = Instant::now();
    let player_wins = solve_with(&mut arena, config).unwrap_or_else(|e| {
        eprintln!("Failed to solve the game: {}", e);
        std::process::exit(1);
    });
    let elapsed = start.elapsed();

    let winners: Vec<bool> = (0..arena.num_vertices() as u32)
        .map(|v| arena.winner(v) == Some(true))
        .collect();
    let player_region = winners.iter().filter(|w| **w).count();
    println!(
        "Player wins {} of {} vertices (solved in {}ms).",
        player_region,
        arena.num_vertices(),
        elapsed.as_millis()
    );
    println!(
        "Initial vertex {} is won by the {}.",
        arena.init(),
        if player_wins { "player" } else { "environment" }
    );

    if args.check {
        match solve_naive(&arena) {
            Ok(expected) if expected == winners => println!("Naive solver agrees."),
            Ok(expected) => {
                let differences = expected
                    .iter()
                    .zip(&winners)
                    .filter(|(a, b)| a != b)
                    .count();
                eprintln!("Naive solver disagrees on {} vertices.", differences);
                std::process::exit(1);
            }
            Err(e) => {
                eprintln!("Naive solver failed: {}", e);
                std::process::exit(1);
            }
        }
    }

    if args.solution
        && let Some(solution) = write_solution(&arena)
    {
        print!("{}", solution);
    }
}
