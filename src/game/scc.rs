use crate::arena::Arena;
use cancel_this::is_cancelled;
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, Generator, GeneratorStep};
use log::trace;

/// Iterative Tarjan decomposition of an arena into strongly connected components.
///
/// Components are produced in reverse topological order: when a component is produced,
/// every component reachable from it has been produced before. Unreachable vertices are
/// decomposed as well, starting new searches in increasing vertex order.
pub type SccDecomposition = Generator<SuccessorGraph, TarjanState, Vec<u32>, TarjanStep>;

const UNVISITED: u32 = u32::MAX;

/// Plain successor lists of an arena.
#[derive(Clone, Debug)]
pub struct SuccessorGraph {
    successors: Vec<Vec<u32>>,
}

impl From<&Arena> for SuccessorGraph {
    fn from(value: &Arena) -> Self {
        let successors = (0..value.num_vertices() as u32)
            .map(|v| value.out(v).map(|(_, e)| e.dst).collect())
            .collect();
        SuccessorGraph { successors }
    }
}

impl SuccessorGraph {
    pub fn num_vertices(&self) -> usize {
        self.successors.len()
    }
}

pub struct TarjanState {
    index: Vec<u32>,
    low_link: Vec<u32>,
    on_stack: Vec<bool>,
    stack: Vec<u32>,
    /// Explicit call stack: a vertex and the position of its next unexplored successor.
    calls: Vec<(u32, usize)>,
    next_index: u32,
    next_root: u32,
}

impl From<usize> for TarjanState {
    fn from(num_vertices: usize) -> Self {
        TarjanState {
            index: vec![UNVISITED; num_vertices],
            low_link: vec![UNVISITED; num_vertices],
            on_stack: vec![false; num_vertices],
            stack: Vec::new(),
            calls: Vec::new(),
            next_index: 0,
            next_root: 0,
        }
    }
}

impl From<&Arena> for TarjanState {
    fn from(value: &Arena) -> Self {
        TarjanState::from(value.num_vertices())
    }
}

impl TarjanState {
    fn visit(&mut self, vertex: u32) {
        let v = vertex as usize;
        self.index[v] = self.next_index;
        self.low_link[v] = self.next_index;
        self.next_index += 1;
        self.stack.push(vertex);
        self.on_stack[v] = true;
        self.calls.push((vertex, 0));
    }
}

pub struct TarjanStep;

impl GeneratorStep<SuccessorGraph, TarjanState, Vec<u32>> for TarjanStep {
    fn step(context: &SuccessorGraph, state: &mut TarjanState) -> Completable<Option<Vec<u32>>> {
        if state.calls.is_empty() {
            // Start a new search from the next unvisited vertex.
            let n = context.num_vertices() as u32;
            while state.next_root < n && state.index[state.next_root as usize] != UNVISITED {
                state.next_root += 1;
            }
            if state.next_root == n {
                return Ok(None);
            }
            state.visit(state.next_root);
            return Err(Suspended);
        }

        while let Some(&(v, position)) = state.calls.last() {
            let successors = &context.successors[v as usize];
            if position < successors.len() {
                if let Some(top) = state.calls.last_mut() {
                    top.1 += 1;
                }
                let w = successors[position] as usize;
                if state.index[w] == UNVISITED {
                    state.visit(successors[position]);
                } else if state.on_stack[w] {
                    let low = state.low_link[v as usize].min(state.index[w]);
                    state.low_link[v as usize] = low;
                }
                continue;
            }

            // All successors explored: return to the caller.
            state.calls.pop();
            if let Some((parent, _)) = state.calls.last() {
                let p = *parent as usize;
                state.low_link[p] = state.low_link[p].min(state.low_link[v as usize]);
            }

            if state.low_link[v as usize] == state.index[v as usize] {
                let mut component = Vec::new();
                while let Some(w) = state.stack.pop() {
                    state.on_stack[w as usize] = false;
                    component.push(w);
                    if w == v {
                        break;
                    }
                }
                component.sort_unstable();
                trace!("Found component of {} vertices rooted in {v}.", component.len());
                is_cancelled!()?;
                return Ok(Some(component));
            }
        }

        Err(Suspended)
    }
}
