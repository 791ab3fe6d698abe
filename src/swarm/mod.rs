//! Swarmed parallel exploration of a [`Model`].
//!
//! Every thread runs its own DFS over a private [`crate::model::KripkeCube`]; the threads
//! only meet in the [`SharedStateMap`], where each discovered state carries one color slot
//! per thread. A thread prunes a state once any thread closed it, so the swarm divides the
//! state space without any explicit work distribution.
//!
//! The generational modes additionally split the threads into a reference half, which
//! explores exhaustively from the initial state, and a generational half, which repeatedly
//! samples the state space, asks an [`Interpolate`] implementation for new seed states and
//! runs bounded searches from them.

use crate::error::ExplorationError;
use crate::model::{CubeConfig, Model};
use log::{debug, info};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};

mod engine;
mod interpolate;
mod map;


pub use engine::{Role, SwarmEngine, SwarmMode, SwarmShared, SwarmStats};
pub use interpolate::{Fitness, GeneticInterpolation, Interpolate};
pub use map::{Color, ColorArray, Insertion, SharedStateMap};

/// Granularity of the driver's checks of worker threads.
const TICK: Duration = Duration::from_millis(5);

/// Configuration of [`explore`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwarmConfig {
    /// Number of exploration threads (default: available parallelism).
    pub threads: usize,
    pub mode: SwarmMode,
    pub cube: CubeConfig,
    /// Size of the bounded sampling runs of generational threads.
    pub sample_size: usize,
    /// Size of the bounded runs from generated seeds.
    pub seed_bound: usize,
    /// How often the driver reports progress.
    pub poll_interval: Duration,
    /// After this time, all threads are stopped.
    pub time_limit: Duration,
    /// Maximal number of distinct states.
    pub max_states: usize,
}

impl Default for SwarmConfig {
    fn default() -> Self {
        SwarmConfig::new()
    }
}

impl SwarmConfig {
    pub fn new() -> SwarmConfig {
        SwarmConfig {
            threads: thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            mode: SwarmMode::default(),
            cube: CubeConfig::default(),
            sample_size: 1000,
            seed_bound: 10_000,
            poll_interval: Duration::from_secs(1),
            time_limit: Duration::from_secs(600),
            max_states: usize::MAX,
        }
    }

    /// A configuration for deadlock detection (which requires `selfloopize` to be disabled).
    pub fn deadlock(threads: usize) -> SwarmConfig {
        let mut config = SwarmConfig::new();
        config.threads = threads;
        config.mode = SwarmMode::Deadlock;
        config.cube.selfloopize = false;
        config
    }

    fn validate(&self, interpolation: bool) -> Result<(), ExplorationError> {
        if self.threads == 0 {
            return Err(ExplorationError::InvalidConfig(
                "at least one thread is required".to_string(),
            ));
        }
        if self.mode.detects_deadlocks() && self.cube.selfloopize {
            return Err(ExplorationError::InvalidConfig(
                "deadlock detection requires selfloopize to be disabled".to_string(),
            ));
        }
        if self.mode.is_generational() {
            if self.sample_size == 0 || self.seed_bound == 0 {
                return Err(ExplorationError::InvalidConfig(
                    "sample size and seed bound must be positive".to_string(),
                ));
            }
            if !interpolation {
                return Err(ExplorationError::MissingInterpolation);
            }
        }
        Ok(())
    }
}

/// The result of [`explore`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SwarmReport {
    /// Statistics of every thread, indexed by thread id.
    pub threads: Vec<SwarmStats>,
    /// Number of distinct states in the shared map.
    pub distinct_states: usize,
    pub has_deadlock: bool,
    /// The exploration was stopped by [`SwarmConfig::time_limit`].
    pub timed_out: bool,
    pub walltime: Duration,
}

impl SwarmReport {
    pub fn transitions(&self) -> usize {
        self.threads.iter().map(|t| t.transitions).sum()
    }
}

/// Run a swarmed exploration of `model`.
///
/// Generational modes require an `interpolation`; other modes ignore it.
pub fn explore<M: Model + ?Sized>(
    model: &M,
    config: &SwarmConfig,
    interpolation: Option<&dyn Interpolate>,
) -> Result<SwarmReport, ExplorationError> {
    config.validate(interpolation.is_some())?;
    let start = Instant::now();
    info!(
        "Starting {:?} exploration with {} threads ({} state variables).",
        config.mode,
        config.threads,
        model.state_size()
    );

    let shared = SwarmShared::new(config.threads);
    let shared = &shared;
    let (results, timed_out) = thread::scope(|scope| {
        let handles: Vec<_> = (0..config.threads)
            .map(|tid| {
                scope.spawn(move || {
                    let run = panic::catch_unwind(AssertUnwindSafe(|| {
                        SwarmEngine::new(tid, model, config, shared, interpolation).run()
                    }));
                    run.unwrap_or_else(|payload| {
                        info!("Thread {tid} panicked, stopping all threads.");
                        shared.request_stop();
                        panic::resume_unwind(payload)
                    })
                })
            })
            .collect();

        let mut timed_out = false;
        let mut last_report = Instant::now();
        while !handles.iter().all(|h| h.is_finished()) {
            if !shared.is_stopped() && start.elapsed() >= config.time_limit {
                info!("Time limit reached, stopping all threads.");
                timed_out = true;
                shared.request_stop();
            }
            if last_report.elapsed() >= config.poll_interval {
                debug!(
                    "Discovered {} states in {}ms.",
                    shared.map.len(),
                    start.elapsed().as_millis()
                );
                last_report = Instant::now();
            }
            thread::sleep(TICK.min(config.poll_interval));
        }

        let results: Vec<_> = handles.into_iter().map(|h| h.join()).collect();
        (results, timed_out)
    });

    let mut threads = Vec::with_capacity(results.len());
    for (tid, result) in results.into_iter().enumerate() {
        match result {
            Ok(stats) => threads.push(stats),
            Err(_) => return Err(ExplorationError::WorkerPanicked(tid)),
        }
    }

    let distinct_states = shared.map.len();
    if shared.exhausted.load(Ordering::SeqCst) {
        return Err(ExplorationError::ResourceExhausted {
            states: distinct_states,
        });
    }

    let has_deadlock = shared.deadlock_found.load(Ordering::SeqCst)
        || threads.iter().any(|t| t.has_deadlock);
    let report = SwarmReport {
        threads,
        distinct_states,
        has_deadlock,
        timed_out,
        walltime: start.elapsed(),
    };
    info!(
        "Exploration finished: {} distinct states, {} transitions, deadlock: {}, {}ms.",
        report.distinct_states,
        report.transitions(),
        report.has_deadlock,
        report.walltime.as_millis()
    );
    Ok(report)
}
