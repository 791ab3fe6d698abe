//! Error types shared by the game solving and exploration parts of the crate.

use cancel_this::Cancelled;
use thiserror::Error;

/// A structural problem with an [`crate::arena::Arena`] or with the automaton it is
/// built from.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ArenaError {
    #[error("invalid arena: acceptance condition is a tautology (no unsatisfiable color)")]
    TautologicalAcceptance,
    #[error("invalid arena: edge {src} -> {dst} does not alternate owners")]
    NonAlternating { src: u32, dst: u32 },
    #[error("invalid arena: vertex {0} has no successor")]
    NoSuccessor(u32),
    #[error("invalid arena: edge {edge} has no valid color")]
    NotColorized { edge: usize },
    #[error("invalid arena: edge {edge} has color {color}, which is too large")]
    ColorOutOfRange { edge: usize, color: u32 },
    #[error("invalid arena: initial vertex {0} does not exist")]
    InvalidInitial(u32),
    #[error("invalid arena: edge {edge} points to missing vertex {vertex}")]
    DanglingEdge { edge: usize, vertex: u32 },
    #[error("synthesis outputs differ from the outputs already attached to the automaton")]
    InconsistentOutputs,
}

/// Failure of [`crate::strategy::apply_strategy`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StrategyError {
    #[error("strategy not applicable: {0}")]
    NotApplicable(&'static str),
    #[error(transparent)]
    Arena(#[from] ArenaError),
}

/// Failure of [`crate::game::solve`].
#[derive(Debug, Error)]
pub enum SolveError {
    #[error(transparent)]
    Arena(#[from] ArenaError),
    #[error("solver cancelled: {0}")]
    Cancelled(Cancelled),
}

impl From<Cancelled> for SolveError {
    fn from(value: Cancelled) -> Self {
        SolveError::Cancelled(value)
    }
}

/// Failure to read a game in the PGSolver text format.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Syntax { line: usize, message: String },
    #[error("vertex {0} is declared more than once")]
    DuplicateVertex(u32),
    #[error("vertex {0} is used as a successor but never declared")]
    UndeclaredVertex(u32),
    #[error("the game has no vertices")]
    Empty,
}

/// Failure of a swarmed exploration run.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExplorationError {
    #[error("invalid exploration config: {0}")]
    InvalidConfig(String),
    #[error("generational exploration requires an interpolation function")]
    MissingInterpolation,
    #[error("state limit exceeded after {states} states (try compression)")]
    ResourceExhausted { states: usize },
    #[error("exploration thread {0} panicked")]
    WorkerPanicked(usize),
}
