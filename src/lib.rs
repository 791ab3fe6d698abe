//! Parity game solving for reactive synthesis and swarmed parallel state-space exploration.
//!
//! The crate has two independent halves:
//!
//!  - [`arena`], [`game`] and [`strategy`] turn an edge-colored [`automaton::Automaton`] into
//!    a two-player parity game, solve it with Zielonka's algorithm and extract a winning
//!    strategy for the player.
//!  - [`state`], [`model`] and [`swarm`] explore the state space of a [`model::Model`] with
//!    several threads that share a concurrent state map, optionally searching for deadlocks.

#[cfg(test)]
mod test_utils;

pub mod arena;
pub mod automaton;
pub mod error;
pub mod game;
pub mod model;
pub mod state;
pub mod strategy;
pub mod swarm;
