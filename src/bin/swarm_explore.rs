use biodivine_algo_parity_swarm::model::{CounterModel, ExplicitModel, Model};
use biodivine_algo_parity_swarm::state::Compression;
use biodivine_algo_parity_swarm::swarm::{
    Fitness, GeneticInterpolation, Interpolate, SwarmConfig, SwarmMode, explore,
};
use clap::Parser;
use env_logger::Builder;
use log::LevelFilter;
use std::time::Duration;

#[derive(Parser)]
#[command(name = "swarm_explore")]
#[command(about = "Run a swarmed parallel exploration of a built-in model")]
#[command(after_help = "Exit codes: 0 = no deadlock, 1 = deadlock found, 2 = error.")]
struct Args {
    /// Model to explore
    #[arg(long, default_value = "counter", require_equals = true)]
    model: ModelKind,

    /// Number of counters (counter models) or states (chain and ring models)
    #[arg(long, default_value_t = 4, require_equals = true)]
    size: usize,

    /// Upper bound of every counter (counter models)
    #[arg(long, default_value_t = 9, require_equals = true)]
    bound: i32,

    /// Exploration algorithm
    #[arg(long, default_value = "dfs", require_equals = true)]
    mode: Mode,

    /// Number of threads (0 = available parallelism)
    #[arg(long, default_value_t = 0, require_equals = true)]
    threads: usize,

    /// State compression
    #[arg(long, default_value = "none", require_equals = true)]
    compression: CompressionLevel,

    /// Do not add self-loops to states without successors (implied by deadlock modes)
    #[arg(long)]
    no_selfloopize: bool,

    /// Stop the exploration after this many seconds
    #[arg(long, default_value_t = 600, require_equals = true)]
    time_limit: u64,

    /// Fail once the number of distinct states exceeds this limit (0 = unlimited)
    #[arg(long, default_value_t = 0, require_equals = true)]
    max_states: usize,

    /// Seed of the genetic interpolation (generational modes)
    #[arg(long, default_value_t = 0, require_equals = true)]
    seed: u64,

    /// Logging verbosity (use -v for info, or -v=LEVEL for a specific level)
    #[arg(long, short = 'v', value_name = "LEVEL", num_args = 0..=1, default_missing_value = "info", require_equals = true)]
    verbose: Option<Option<LogLevel>>,
}

#[derive(Clone, clap::ValueEnum)]
enum ModelKind {
    Counter,
    #[value(name = "counter-wrap")]
    CounterWrap,
    Chain,
    Ring,
}

#[derive(Clone, clap::ValueEnum)]
enum Mode {
    Dfs,
    Deadlock,
    Gp,
    #[value(name = "gp-deadlock")]
    GpDeadlock,
}

#[derive(Clone, clap::ValueEnum)]
enum CompressionLevel {
    None,
    #[value(name = "run-length")]
    RunLength,
    #[value(name = "byte-packed")]
    BytePacked,
}

#[derive(Clone, clap::ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
}

impl From<Mode> for SwarmMode {
    fn from(value: Mode) -> Self {
        match value {
            Mode::Dfs => SwarmMode::Dfs,
            Mode::Deadlock => SwarmMode::Deadlock,
            Mode::Gp => SwarmMode::Generational,
            Mode::GpDeadlock => SwarmMode::GenerationalDeadlock,
        }
    }
}

impl From<CompressionLevel> for Compression {
    fn from(value: CompressionLevel) -> Self {
        match value {
            CompressionLevel::None => Compression::None,
            CompressionLevel::RunLength => Compression::RunLength,
            CompressionLevel::BytePacked => Compression::BytePacked,
        }
    }
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

    let model: Box<dyn Model> = match args.model {
        ModelKind::Counter => Box::new(CounterModel::new(args.size, args.bound)),
        ModelKind::CounterWrap => Box::new(CounterModel::wrapping(args.size, args.bound)),
        ModelKind::Chain if args.size > 0 => Box::new(ExplicitModel::chain(args.size)),
        ModelKind::Ring if args.size > 0 => Box::new(ExplicitModel::ring(args.size)),
        ModelKind::Chain | ModelKind::Ring => {
            eprintln!("Chain and ring models need at least one state.");
            std::process::exit(2);
        }
    };

    let mut config = SwarmConfig::new();
    config.mode = args.mode.into();
    if args.threads > 0 {
        config.threads = args.threads;
    }
    config.cube.compression = args.compression.into();
    config.cube.selfloopize = !args.no_selfloopize && !config.mode.detects_deadlocks();
    config.time_limit = Duration::from_secs(args.time_limit);
    if args.max_states > 0 {
        config.max_states = args.max_states;
    }

    let genetic = GeneticInterpolation::new(model.as_ref())
        .with_fitness(Fitness::LessThan)
        .with_seed(args.seed);
    let interpolation: Option<&dyn Interpolate> = if config.mode.is_generational() {
        Some(&genetic)
    } else {
        None
    };

    println!(
        "Exploring a model with {} variables using {} threads.",
        model.state_size(),
        config.threads
    );

    let report = explore(model.as_ref(), &config, interpolation).unwrap_or_else(|e| {
        eprintln!("Exploration failed: {}", e);
        std::process::exit(2);
    });

    for (tid, stats) in report.threads.iter().enumerate() {
        println!(
            "Thread {}: {} states, {} transitions, max depth {}, {} generations.",
            tid, stats.states, stats.transitions, stats.max_dfs, stats.generations
        );
    }
    println!(
        "Distinct states: {}; transitions: {}; walltime: {}ms.",
        report.distinct_states,
        report.transitions(),
        report.walltime.as_millis()
    );
    if report.timed_out {
        println!("Time limit reached; the exploration is incomplete.");
    }

    if report.has_deadlock {
        println!("Deadlock found.");
        std::process::exit(1);
    }
    println!("No deadlock found.");
}
