use crate::model::Model;

/// A vector of bounded counters; every transition increments one counter.
///
/// Without wrapping, the only state without successors is the one where every counter
/// reached `bound`. With wrapping, a counter at `bound` resets to zero and the model has no
/// deadlock at all.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CounterModel {
    pub counters: usize,
    pub bound: i32,
    pub wrap: bool,
}

impl CounterModel {
    pub fn new(counters: usize, bound: i32) -> CounterModel {
        CounterModel {
            counters,
            bound,
            wrap: false,
        }
    }

    pub fn wrapping(counters: usize, bound: i32) -> CounterModel {
        CounterModel {
            counters,
            bound,
            wrap: true,
        }
    }

    /// Number of reachable states.
    pub fn num_states(&self) -> usize {
        let per_counter = usize::try_from(self.bound.max(0)).unwrap_or(0) + 1;
        (0..self.counters).fold(1usize, |acc, _| acc.saturating_mul(per_counter))
    }
}

impl Model for CounterModel {
    fn state_size(&self) -> usize {
        self.counters
    }

    fn initial_state(&self, out: &mut [i32]) {
        out.fill(0);
    }

    fn successors(&self, state: &[i32], callback: &mut dyn FnMut(&[i32])) -> usize {
        let mut successor = state.to_vec();
        let mut count = 0;
        for i in 0..state.len() {
            let next = if state[i] < self.bound {
                state[i] + 1
            } else if self.wrap {
                0
            } else {
                continue;
            };
            successor[i] = next;
            callback(&successor);
            successor[i] = state[i];
            count += 1;
        }
        count
    }

    fn variable_names(&self) -> Vec<String> {
        (0..self.counters).map(|i| format!("c{i}")).collect()
    }
}

/// An explicit graph over states `0..n` with a single-variable valuation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ExplicitModel {
    initial: i32,
    successors: Vec<Vec<i32>>,
}

impl ExplicitModel {
    /// Create a model from adjacency lists.
    ///
    /// # Panics
    ///
    /// Panics if the initial state or some successor is not a state of the graph.
    pub fn new(initial: i32, successors: Vec<Vec<i32>>) -> ExplicitModel {
        let in_range = |s: i32| usize::try_from(s).is_ok_and(|s| s < successors.len());
        assert!(in_range(initial), "Initial state {initial} out of range.");
        assert!(
            successors.iter().flatten().all(|s| in_range(*s)),
            "Successor out of range."
        );
        ExplicitModel {
            initial,
            successors,
        }
    }

    /// A chain `0 -> 1 -> ... -> length - 1` whose last state is a deadlock.
    pub fn chain(length: usize) -> ExplicitModel {
        let successors = (0..length)
            .map(|i| {
                if i + 1 < length {
                    vec![i32::try_from(i + 1).unwrap_or(i32::MAX)]
                } else {
                    Vec::new()
                }
            })
            .collect();
        ExplicitModel::new(0, successors)
    }

    /// A cycle `0 -> 1 -> ... -> length - 1 -> 0` without deadlocks.
    pub fn ring(length: usize) -> ExplicitModel {
        let successors = (0..length)
            .map(|i| vec![i32::try_from((i + 1) % length).unwrap_or(0)])
            .collect();
        ExplicitModel::new(0, successors)
    }

    pub fn num_states(&self) -> usize {
        self.successors.len()
    }
}

impl Model for ExplicitModel {
    fn state_size(&self) -> usize {
        1
    }

    fn initial_state(&self, out: &mut [i32]) {
        out[0] = self.initial;
    }

    fn successors(&self, state: &[i32], callback: &mut dyn FnMut(&[i32])) -> usize {
        let Some(successors) = usize::try_from(state[0])
            .ok()
            .and_then(|s| self.successors.get(s))
        else {
            return 0;
        };
        for succ in successors {
            callback(&[*succ]);
        }
        successors.len()
    }
}
