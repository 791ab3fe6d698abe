//! Solving parity games on [`Arena`]s.
//!
//! The main entry point is [`solve`], which runs the [`Zielonka`] solver and attaches the
//! resulting [`crate::arena::Solution`] to the arena. The solver is a
//! [`computation_process::Computation`], so it can also be configured and advanced
//! step by step:
//!
//! ```no_run
//! use biodivine_algo_parity_swarm::arena::pgsolver::parse_pgsolver;
//! use biodivine_algo_parity_swarm::game::{Zielonka, ZielonkaConfig};
//! use computation_process::Algorithm;
//!
//! let arena = parse_pgsolver("0 1 1 1;\n1 0 0 0;\n").unwrap();
//! let solved = Zielonka::run(ZielonkaConfig::default(), &arena).unwrap();
//! assert_eq!(solved.winner(solved.init()), Some(true));
//! ```
//!
//! # Algorithm
//!
//! The arena is decomposed into strongly connected components, which are solved in reverse
//! topological order. Edges leaving a component are temporarily turned into self-loops with
//! a synthetic color encoding who wins at their destination. Inside a component, the
//! recursion of Zielonka's algorithm is flattened into an explicit work stack of
//! *descend* and *verify* items operating on layered subgames (see
//! [`attractor::AttractorEngine`]).

use crate::arena::Arena;
use crate::error::SolveError;
use computation_process::{Algorithm, Computation};

pub mod attractor;
pub mod naive;
pub mod scc;
mod zielonka;

#[cfg(test)]
mod tests;

pub use zielonka::{SolverStats, ZielonkaConfig, ZielonkaState, ZielonkaStep};

/// Zielonka's algorithm with per-component decomposition and an explicit work stack.
pub type Zielonka = Computation<ZielonkaConfig, ZielonkaState, Arena, ZielonkaStep>;

/// Solve `arena` in place and report whether the player wins the initial vertex.
pub fn solve(arena: &mut Arena) -> Result<bool, SolveError> {
    solve_with(arena, ZielonkaConfig::default())
}

/// Same as [`solve`], but with an explicit solver configuration.
pub fn solve_with(arena: &mut Arena, config: ZielonkaConfig) -> Result<bool, SolveError> {
    arena.validate()?;
    let solved = Zielonka::run(config, &*arena)?;
    *arena = solved;
    Ok(arena.winner(arena.init()) == Some(true))
}
