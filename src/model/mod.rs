//! Explicit-state models explored by the [`crate::swarm`] engines.
//!
//! A [`Model`] is a black-box successor generator over fixed-size integer valuations, in
//! the style of the LTSmin PINS interface. Exploration threads never talk to the model
//! directly: each one wraps it in a [`KripkeCube`], which encodes the produced valuations
//! into the thread's state pool and recycles successor iterators.

mod builtin;
mod cube;

#[cfg(test)]
mod tests;

pub use builtin::{CounterModel, ExplicitModel};
pub use cube::{CubeConfig, KripkeCube, SuccIter};

/// A successor generator shared by all exploration threads.
pub trait Model: Sync {
    /// Number of integers in every valuation.
    fn state_size(&self) -> usize;

    /// Write the initial valuation into `out` (of length [`Model::state_size`]).
    fn initial_state(&self, out: &mut [i32]);

    /// Call `callback` with every successor valuation of `state` and return the number of
    /// reported transitions.
    fn successors(&self, state: &[i32], callback: &mut dyn FnMut(&[i32])) -> usize;

    /// Human readable names of the valuation entries.
    fn variable_names(&self) -> Vec<String> {
        (0..self.state_size()).map(|i| format!("v{i}")).collect()
    }

    /// Number of transitions enabled in `state`.
    fn count_successors(&self, state: &[i32]) -> usize {
        self.successors(state, &mut |_| {})
    }
}
