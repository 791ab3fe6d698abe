use crate::model::Model;
use crate::state::{Compression, PoolRef, State, StateManager};

/// Configuration of a [`KripkeCube`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CubeConfig {
    /// Encoding of stored states (default: [`Compression::None`]).
    pub compression: Compression,
    /// Give every state without successors a self-loop (default: `true`). Deadlock
    /// detection needs this disabled.
    pub selfloopize: bool,
}

impl Default for CubeConfig {
    fn default() -> Self {
        CubeConfig::new()
    }
}

impl CubeConfig {
    pub fn new() -> CubeConfig {
        CubeConfig {
            compression: Compression::None,
            selfloopize: true,
        }
    }
}

/// The successors of one state, computed eagerly.
///
/// Yielded handles are owned by the caller. Handles that were never yielded are released
/// when the iterator is given back through [`KripkeCube::recycle`].
#[derive(Debug, Default)]
pub struct SuccIter {
    successors: Vec<PoolRef>,
    position: usize,
    transitions: usize,
}

impl SuccIter {
    /// Number of transitions reported by the model (`0` for a selfloopized deadlock).
    pub fn transitions(&self) -> usize {
        self.transitions
    }

    pub fn is_done(&self) -> bool {
        self.position >= self.successors.len()
    }

    pub fn len(&self) -> usize {
        self.successors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.successors.is_empty()
    }
}

impl Iterator for SuccIter {
    type Item = PoolRef;

    fn next(&mut self) -> Option<PoolRef> {
        let handle = self.successors.get(self.position).copied()?;
        self.position += 1;
        Some(handle)
    }
}

/// A per-thread view of a [`Model`].
pub struct KripkeCube<'m, M: Model + ?Sized> {
    model: &'m M,
    config: CubeConfig,
    manager: StateManager,
    valuation: Vec<i32>,
    recycled: Vec<SuccIter>,
}

impl<'m, M: Model + ?Sized> KripkeCube<'m, M> {
    pub fn new(model: &'m M, config: CubeConfig) -> KripkeCube<'m, M> {
        let state_size = model.state_size();
        KripkeCube {
            model,
            config,
            manager: StateManager::new(state_size, config.compression),
            valuation: vec![0; state_size],
            recycled: Vec::new(),
        }
    }

    pub fn model(&self) -> &'m M {
        self.model
    }

    pub fn config(&self) -> &CubeConfig {
        &self.config
    }

    pub fn manager(&self) -> &StateManager {
        &self.manager
    }

    pub fn manager_mut(&mut self) -> &mut StateManager {
        &mut self.manager
    }

    /// Allocate the initial state of the model.
    pub fn initial(&mut self) -> PoolRef {
        self.model.initial_state(&mut self.valuation);
        self.manager.alloc(&self.valuation)
    }

    /// Allocate an arbitrary valuation (e.g. a generated seed).
    pub fn alloc(&mut self, valuation: &[i32]) -> PoolRef {
        self.manager.alloc(valuation)
    }

    pub fn share(&self, handle: PoolRef) -> Option<State> {
        self.manager.share(handle)
    }

    pub fn release(&mut self, handle: PoolRef) -> bool {
        self.manager.release(handle)
    }

    /// Decode a state into a fresh valuation.
    pub fn valuation(&self, state: &State) -> Vec<i32> {
        let mut out = vec![0; self.manager.state_size()];
        self.manager.decode(state, &mut out);
        out
    }

    /// Compute all successors of `state`.
    pub fn succ(&mut self, state: &State) -> SuccIter {
        self.manager.decode(state, &mut self.valuation);
        let mut iter = self.recycled.pop().unwrap_or_default();
        let manager = &mut self.manager;
        let successors = &mut iter.successors;
        iter.transitions = self.model.successors(&self.valuation, &mut |succ| {
            successors.push(manager.alloc(succ));
        });
        if iter.successors.is_empty() && self.config.selfloopize {
            iter.successors.push(self.manager.alloc(&self.valuation));
        }
        iter
    }

    /// Give back an iterator, releasing the successors it did not yield.
    pub fn recycle(&mut self, mut iter: SuccIter) {
        for handle in &iter.successors[iter.position.min(iter.successors.len())..] {
            self.manager.release(*handle);
        }
        iter.successors.clear();
        iter.position = 0;
        iter.transitions = 0;
        self.recycled.push(iter);
    }
}
