//! A small explicit ω-automaton with BDD-labelled, colored edges.
//!
//! Acceptance is always a max-odd parity condition over colors `1..=num_colors`: a run is
//! accepting if the largest color seen infinitely often is odd. An automaton without a
//! color range (`num_colors == None`) accepts every run, i.e. its acceptance is a tautology.
//!
//! Automata serve both as the input of the [`crate::arena::builder`] and as the output of
//! [`crate::strategy::apply_strategy`].

use biodivine_lib_bdd::{Bdd, BddVariable, BddVariableSet};

/// One edge of an [`Automaton`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AutomatonEdge {
    pub src: u32,
    pub dst: u32,
    pub cond: Bdd,
    /// `None` when the acceptance was dropped or the edge carries no color.
    pub color: Option<u32>,
}

/// Two-player annotation kept on an automaton produced from a solved arena.
///
/// All vectors are indexed by automaton state; strategy entries refer to automaton edges.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GameAnnotation {
    pub owner: Vec<bool>,
    pub winner: Vec<bool>,
    pub strategy: Vec<Option<usize>>,
}

#[derive(Clone)]
pub struct Automaton {
    vars: BddVariableSet,
    init: u32,
    out: Vec<Vec<usize>>,
    edges: Vec<AutomatonEdge>,
    num_colors: Option<u32>,
    synthesis_outputs: Option<Vec<BddVariable>>,
    game: Option<GameAnnotation>,
}

impl Automaton {
    /// Create an empty automaton over the given variables.
    pub fn new(vars: BddVariableSet, num_colors: Option<u32>) -> Automaton {
        Automaton {
            vars,
            init: 0,
            out: Vec::new(),
            edges: Vec::new(),
            num_colors,
            synthesis_outputs: None,
            game: None,
        }
    }

    pub fn vars(&self) -> &BddVariableSet {
        &self.vars
    }

    pub fn add_state(&mut self) -> u32 {
        self.out.push(Vec::new());
        u32::try_from(self.out.len() - 1).unwrap_or(u32::MAX)
    }

    /// Add `count` states and return the id of the first one.
    pub fn add_states(&mut self, count: usize) -> u32 {
        let first = self.out.len();
        self.out.resize_with(first + count, Vec::new);
        u32::try_from(first).unwrap_or(u32::MAX)
    }

    /// Append an edge and return its index.
    ///
    /// # Panics
    ///
    /// Panics if `src` is not a state of this automaton.
    pub fn add_edge(&mut self, src: u32, dst: u32, cond: Bdd, color: Option<u32>) -> usize {
        let id = self.edges.len();
        self.out[src as usize].push(id);
        self.edges.push(AutomatonEdge {
            src,
            dst,
            cond,
            color,
        });
        id
    }

    pub fn set_init(&mut self, init: u32) {
        self.init = init;
    }

    pub fn init(&self) -> u32 {
        self.init
    }

    pub fn num_states(&self) -> usize {
        self.out.len()
    }

    pub fn num_edges(&self) -> usize {
        self.edges.len()
    }

    pub fn edge(&self, id: usize) -> &AutomatonEdge {
        &self.edges[id]
    }

    pub fn edges(&self) -> &[AutomatonEdge] {
        &self.edges
    }

    /// Iterate over the outgoing edges of `state` together with their indices.
    pub fn out(&self, state: u32) -> impl Iterator<Item = (usize, &AutomatonEdge)> {
        self.out[state as usize]
            .iter()
            .map(move |id| (*id, &self.edges[*id]))
    }

    pub fn num_colors(&self) -> Option<u32> {
        self.num_colors
    }

    /// Drop the acceptance condition: every run becomes accepting.
    pub fn drop_acceptance(&mut self) {
        self.num_colors = None;
        for edge in &mut self.edges {
            edge.color = None;
        }
    }

    /// The largest even color of the acceptance, i.e. a color which makes every
    /// run that eventually sees only this color rejecting.
    ///
    /// Returns `None` if the acceptance is a tautology.
    pub fn unsat_color(&self) -> Option<u32> {
        let n = self.num_colors?;
        let even = n - (n % 2);
        (even >= 2).then_some(even)
    }

    pub fn synthesis_outputs(&self) -> Option<&[BddVariable]> {
        self.synthesis_outputs.as_deref()
    }

    pub fn set_synthesis_outputs(&mut self, outputs: Vec<BddVariable>) {
        self.synthesis_outputs = Some(outputs);
    }

    pub fn game(&self) -> Option<&GameAnnotation> {
        self.game.as_ref()
    }

    pub(crate) fn set_game(&mut self, game: GameAnnotation) {
        self.game = Some(game);
    }

    /// A single output letter (a conjunction of literals over `outputs`) taken from
    /// one satisfying assignment of `cond`. Returns `false` if `cond` is unsatisfiable.
    pub(crate) fn output_cube(vars: &BddVariableSet, outputs: &[BddVariable], cond: &Bdd) -> Bdd {
        let Some(witness) = cond.sat_witness() else {
            return vars.mk_false();
        };
        outputs.iter().fold(vars.mk_true(), |acc, var| {
            acc.and(&vars.mk_literal(*var, witness.value(*var)))
        })
    }
}
