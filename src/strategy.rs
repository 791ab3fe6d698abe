//! Extraction of a strategy automaton from a solved [`Arena`].

use crate::arena::{Arena, ENV, EdgeId, PLAYER};
use crate::automaton::{Automaton, GameAnnotation};
use crate::error::{ArenaError, StrategyError};
use biodivine_lib_bdd::Bdd;
use log::debug;
use std::collections::VecDeque;

/// Options of [`apply_strategy`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StrategyOptions {
    /// Merge every environment edge with the answer of the player into a single edge
    /// (default: `true`). Otherwise, the intermediate player states are kept and the result
    /// carries a [`GameAnnotation`].
    pub unsplit: bool,
    /// Keep edge colors and the parity acceptance (default: `false`).
    pub keep_acceptance: bool,
    /// Keep the full guard of the player's strategy edge (default: `false`). Otherwise,
    /// the player commits to one output letter per edge.
    pub leave_choice: bool,
}

impl Default for StrategyOptions {
    fn default() -> Self {
        StrategyOptions::new()
    }
}

impl StrategyOptions {
    pub fn new() -> StrategyOptions {
        StrategyOptions {
            unsplit: true,
            keep_acceptance: false,
            leave_choice: false,
        }
    }
}

/// Build the automaton of the player's winning strategy in a solved, alternating `arena`.
///
/// The result contains every environment choice reachable from the initial vertex, but only
/// the strategy edge of every player vertex. Fails if the arena is not solved or if the
/// player does not win the initial vertex.
pub fn apply_strategy(
    arena: &Arena,
    options: &StrategyOptions,
) -> Result<Automaton, StrategyError> {
    let Some(solution) = arena.solution() else {
        return Err(StrategyError::NotApplicable("arena is not solved"));
    };
    if !solution.winner[arena.init() as usize] {
        return Err(StrategyError::NotApplicable(
            "player does not win the initial state",
        ));
    }
    if arena.owner(arena.init()) != ENV {
        return Err(StrategyError::NotApplicable(
            "initial state is not owned by the environment",
        ));
    }
    if let Some((_, edge)) = arena
        .edges()
        .find(|(_, e)| arena.owner(e.src) == arena.owner(e.dst))
    {
        return Err(ArenaError::NonAlternating {
            src: edge.src,
            dst: edge.dst,
        }
        .into());
    }

    let num_colors = options.keep_acceptance.then(|| arena.max_color());
    let mut extractor = Extractor {
        arena,
        options,
        result: Automaton::new(arena.vars().clone(), num_colors),
        state_of: vec![None; arena.num_vertices()],
        queue: VecDeque::new(),
        owner: Vec::new(),
        strategy: Vec::new(),
    };
    let init = extractor.state(arena.init());
    extractor.result.set_init(init);

    while let Some(vertex) = extractor.queue.pop_front() {
        if options.unsplit {
            extractor.expand_unsplit(vertex)?;
        } else {
            extractor.expand_split(vertex)?;
        }
    }

    let Extractor {
        mut result,
        owner,
        strategy,
        ..
    } = extractor;
    result.set_synthesis_outputs(arena.outputs().to_vec());
    if !options.unsplit {
        let winner = vec![true; owner.len()];
        result.set_game(GameAnnotation {
            owner,
            winner,
            strategy,
        });
    }
    debug!(
        "Extracted strategy with {} states and {} edges (unsplit: {}).",
        result.num_states(),
        result.num_edges(),
        options.unsplit
    );
    Ok(result)
}

struct Extractor<'a> {
    arena: &'a Arena,
    options: &'a StrategyOptions,
    result: Automaton,
    /// Arena vertex -> automaton state.
    state_of: Vec<Option<u32>>,
    queue: VecDeque<u32>,
    owner: Vec<bool>,
    strategy: Vec<Option<usize>>,
}

impl Extractor<'_> {
    /// The automaton state of `vertex`, created and scheduled on first use.
    fn state(&mut self, vertex: u32) -> u32 {
        if let Some(state) = self.state_of[vertex as usize] {
            return state;
        }
        let state = self.result.add_state();
        self.state_of[vertex as usize] = Some(state);
        self.owner.push(self.arena.owner(vertex));
        self.strategy.push(None);
        self.queue.push_back(vertex);
        state
    }

    fn color(&self, color: u32) -> Option<u32> {
        self.options.keep_acceptance.then_some(color)
    }

    /// The guard the player commits to when answering on a `cond`-labelled strategy edge.
    fn answer(&self, cond: &Bdd) -> Bdd {
        if self.options.leave_choice {
            cond.clone()
        } else {
            let vars = self.arena.vars();
            cond.and(&Automaton::output_cube(vars, self.arena.outputs(), cond))
        }
    }

    fn strategy_edge(&self, vertex: u32) -> Result<EdgeId, StrategyError> {
        if self.arena.winner(vertex) != Some(PLAYER) {
            return Err(StrategyError::NotApplicable(
                "strategy reaches a state not won by the player",
            ));
        }
        self.arena.strategy(vertex).ok_or(StrategyError::NotApplicable(
            "player state has no strategy edge",
        ))
    }

    fn expand_unsplit(&mut self, vertex: u32) -> Result<(), StrategyError> {
        let arena = self.arena;
        let src = self.state(vertex);
        for (_, env_edge) in arena.out(vertex) {
            let answer = arena.edge(self.strategy_edge(env_edge.dst)?);
            let cond = self.answer(&env_edge.cond.and(&answer.cond));
            if cond.is_false() {
                continue;
            }
            let dst = self.state(answer.dst);
            let color = self.color(env_edge.color.max(answer.color));
            self.result.add_edge(src, dst, cond, color);
        }
        Ok(())
    }

    fn expand_split(&mut self, vertex: u32) -> Result<(), StrategyError> {
        let arena = self.arena;
        let src = self.state(vertex);
        if arena.owner(vertex) == ENV {
            for (_, edge) in arena.out(vertex) {
                let dst = self.state(edge.dst);
                let color = self.color(edge.color);
                self.result.add_edge(src, dst, edge.cond.clone(), color);
            }
        } else {
            let edge = arena.edge(self.strategy_edge(vertex)?);
            let cond = self.answer(&edge.cond);
            let dst = self.state(edge.dst);
            let color = self.color(edge.color);
            let id = self.result.add_edge(src, dst, cond, color);
            self.strategy[src as usize] = Some(id);
        }
        Ok(())
    }
}
