//! Two-player parity game arenas.
//!
//! An [`Arena`] is a directed multigraph whose vertices are owned either by the
//! *environment* (`false`) or by the *player* (`true`). Every edge carries a BDD guard
//! and a color `>= 1`. Colors follow the max-odd convention: the player wins an infinite
//! play if the largest color seen infinitely often is odd.
//!
//! Arenas are usually obtained from an [`crate::automaton::Automaton`] through
//! [`builder::build_arena`], or read from the PGSolver format using [`pgsolver`].
//! Once solved by [`crate::game::solve`], the arena carries a [`Solution`].

use crate::error::ArenaError;
use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet};
use std::fmt::{Display, Formatter};

pub mod builder;
pub mod pgsolver;

#[cfg(test)]
mod tests;

/// Vertex owner: the environment.
pub const ENV: bool = false;
/// Vertex owner: the player (controller).
pub const PLAYER: bool = true;

/// The largest supported edge color. The solver needs two spare colors above every color
/// of a component, and both must stay below [`crate::game::attractor::UNSEEN`].
pub const MAX_COLOR: u32 = u32::MAX - 3;

/// Index of an edge in an [`Arena`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EdgeId(u32);

impl EdgeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<usize> for EdgeId {
    fn from(value: usize) -> Self {
        EdgeId(u32::try_from(value).unwrap_or(u32::MAX))
    }
}

impl Display for EdgeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "e{}", self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Edge {
    pub src: u32,
    pub dst: u32,
    pub cond: Bdd,
    pub color: u32,
}

/// The winning regions and winning strategies of a solved arena.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Solution {
    /// `winner[v]` is `true` if the player wins from `v`.
    pub winner: Vec<bool>,
    /// For every vertex owned by its winner, the edge the winner should take.
    pub strategy: Vec<Option<EdgeId>>,
}

#[derive(Clone)]
pub struct Arena {
    vars: BddVariableSet,
    owner: Vec<bool>,
    out: Vec<Vec<EdgeId>>,
    edges: Vec<Edge>,
    init: u32,
    outputs: Vec<BddVariable>,
    solution: Option<Solution>,
}

impl Default for Arena {
    fn default() -> Self {
        Arena::new(BddVariableSet::new_anonymous(0))
    }
}

impl Arena {
    pub fn new(vars: BddVariableSet) -> Arena {
        Arena {
            vars,
            owner: Vec::new(),
            out: Vec::new(),
            edges: Vec::new(),
            init: 0,
            outputs: Vec::new(),
            solution: None,
        }
    }

    pub fn vars(&self) -> &BddVariableSet {
        &self.vars
    }

    pub fn add_vertex(&mut self, owner: bool) -> u32 {
        self.owner.push(owner);
        self.out.push(Vec::new());
        self.solution = None;
        u32::try_from(self.owner.len() - 1).unwrap_or(u32::MAX)
    }

    /// Append an edge and return its id.
    ///
    /// # Panics
    ///
    /// Panics if `src` is not a vertex of this arena.
    pub fn add_edge(&mut self, src: u32, dst: u32, cond: Bdd, color: u32) -> EdgeId {
        let id = EdgeId::from(self.edges.len());
        self.out[src as usize].push(id);
        self.edges.push(Edge {
            src,
            dst,
            cond,
            color,
        });
        self.solution = None;
        id
    }

    /// Add an edge with a `true` guard.
    pub fn add_plain_edge(&mut self, src: u32, dst: u32, color: u32) -> EdgeId {
        let cond = self.vars.mk_true();
        self.add_edge(src, dst, cond, color)
    }

    pub fn set_init(&mut self, init: u32) {
        self.init = init;
    }

    pub fn init(&self) -> u32 {
        self.init
    }

    pub fn num_vertices(&self) -> usize {
        self.owner.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn owner(&self, vertex: u32) -> bool {
        self.owner[vertex as usize]
    }

    pub fn owners(&self) -> &[bool] {
        &self.owner
    }

    pub fn edge(&self, id: EdgeId) -> &Edge {
        &self.edges[id.index()]
    }

    pub(crate) fn edge_mut(&mut self, id: EdgeId) -> &mut Edge {
        &mut self.edges[id.index()]
    }

    pub fn edges(&self) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.edges
            .iter()
            .enumerate()
            .map(|(i, e)| (EdgeId::from(i), e))
    }

    pub fn out_ids(&self, vertex: u32) -> &[EdgeId] {
        &self.out[vertex as usize]
    }

    /// Iterate over the outgoing edges of `vertex`.
    pub fn out(&self, vertex: u32) -> impl Iterator<Item = (EdgeId, &Edge)> {
        self.out[vertex as usize]
            .iter()
            .map(move |id| (*id, &self.edges[id.index()]))
    }

    /// The variables controlled by the player (empty unless set by the builder).
    pub fn outputs(&self) -> &[BddVariable] {
        &self.outputs
    }

    pub fn set_outputs(&mut self, outputs: Vec<BddVariable>) {
        self.outputs = outputs;
    }

    /// The largest edge color, or `0` for an arena without edges.
    pub fn max_color(&self) -> u32 {
        self.edges.iter().map(|e| e.color).max().unwrap_or(0)
    }

    /// Check that every edge connects vertices of different owners.
    pub fn is_alternating(&self) -> bool {
        self.edges
            .iter()
            .all(|e| self.owner[e.src as usize] != self.owner[e.dst as usize])
    }

    /// Check the structural invariants required by the solver: a valid initial vertex,
    /// edges between existing vertices, colors in `1..=MAX_COLOR` and a successor for every vertex.
    ///
    /// Alternation is not checked (PGSolver games need not alternate), see
    /// [`Arena::is_alternating`].
    pub fn validate(&self) -> Result<(), ArenaError> {
        if self.init as usize >= self.num_vertices() {
            return Err(ArenaError::InvalidInitial(self.init));
        }
        for (i, edge) in self.edges.iter().enumerate() {
            for vertex in [edge.src, edge.dst] {
                if vertex as usize >= self.num_vertices() {
                    return Err(ArenaError::DanglingEdge { edge: i, vertex });
                }
            }
            if edge.color == 0 {
                return Err(ArenaError::NotColorized { edge: i });
            }
            if edge.color > MAX_COLOR {
                return Err(ArenaError::ColorOutOfRange {
                    edge: i,
                    color: edge.color,
                });
            }
        }
        if let Some(v) = self.out.iter().position(|out| out.is_empty()) {
            return Err(ArenaError::NoSuccessor(u32::try_from(v).unwrap_or(u32::MAX)));
        }
        Ok(())
    }

    pub fn solution(&self) -> Option<&Solution> {
        self.solution.as_ref()
    }

    pub(crate) fn set_solution(&mut self, solution: Solution) {
        self.solution = Some(solution);
    }

    pub(crate) fn clear_solution(&mut self) {
        self.solution = None;
    }

    /// `Some(true)` if the player wins from `vertex`, `None` if the arena is not solved.
    pub fn winner(&self, vertex: u32) -> Option<bool> {
        self.solution.as_ref().map(|s| s.winner[vertex as usize])
    }

    /// The winning strategy edge of `vertex`, if the arena is solved and `vertex`
    /// is owned by its winner.
    pub fn strategy(&self, vertex: u32) -> Option<EdgeId> {
        self.solution.as_ref().and_then(|s| s.strategy[vertex as usize])
    }
}
