//! Construction of a game arena from an automaton whose edges alternate between
//! environment and player choices.

use crate::arena::{Arena, ENV, PLAYER};
use crate::automaton::Automaton;
use crate::error::ArenaError;
use biodivine_lib_bdd::{Bdd, BddVariable};
use log::{debug, trace};

/// Build an [`Arena`] from the reachable part of `automaton`.
///
/// The initial state is owned by the environment and ownership alternates along every edge.
/// Self-loops are split by an intermediate vertex of the opposite owner (both halves keep the
/// loop color, the second half has a `true` guard). Environment vertices whose guards,
/// projected onto the inputs, do not cover `true` get an extra edge to an environment sink;
/// player vertices without successors get an edge to a player sink. The two sinks are created
/// at most once, point to each other and use the largest even color of the acceptance, so
/// every play reaching them is lost by the player.
///
/// The `outputs` are recorded on both the automaton (as its synthesis outputs) and the
/// resulting arena. Calling this again with a different output set is an error.
pub fn build_arena(
    automaton: &mut Automaton,
    outputs: &[BddVariable],
) -> Result<Arena, ArenaError> {
    let Some(unsat_color) = automaton.unsat_color() else {
        return Err(ArenaError::TautologicalAcceptance);
    };

    let mut outputs = outputs.to_vec();
    outputs.sort();
    outputs.dedup();
    if let Some(existing) = automaton.synthesis_outputs() {
        let mut existing = existing.to_vec();
        existing.sort();
        existing.dedup();
        if existing != outputs {
            return Err(ArenaError::InconsistentOutputs);
        }
    }
    automaton.set_synthesis_outputs(outputs.clone());

    for (i, edge) in automaton.edges().iter().enumerate() {
        let valid = edge
            .color
            .is_some_and(|c| c >= 1 && Some(c) <= automaton.num_colors());
        if !valid {
            return Err(ArenaError::NotColorized { edge: i });
        }
    }

    let vars = automaton.vars().clone();
    let mut arena = Arena::new(vars.clone());
    let mut sinks = Sinks::default();

    // Automaton state -> arena vertex.
    let mut vertex_of: Vec<Option<u32>> = vec![None; automaton.num_states()];
    let init = arena.add_vertex(ENV);
    arena.set_init(init);
    vertex_of[automaton.init() as usize] = Some(init);

    let mut stack = vec![(automaton.init(), init)];
    while let Some((state, src)) = stack.pop() {
        let owner = arena.owner(src);
        let mut missing = vars.mk_true();
        let mut successors = 0usize;

        for (_, edge) in automaton.out(state) {
            // Colors were validated above.
            let color = edge.color.unwrap_or(unsat_color);
            if owner == ENV {
                missing = missing.and_not(&edge.cond.exists(&outputs));
            }
            successors += 1;

            if edge.dst == state {
                let middle = arena.add_vertex(!owner);
                trace!("Splitting self-loop on state {state} through vertex {middle}.");
                arena.add_edge(src, middle, edge.cond.clone(), color);
                arena.add_plain_edge(middle, src, color);
                continue;
            }

            let dst = match vertex_of[edge.dst as usize] {
                Some(dst) => {
                    if arena.owner(dst) == owner {
                        return Err(ArenaError::NonAlternating {
                            src: state,
                            dst: edge.dst,
                        });
                    }
                    dst
                }
                None => {
                    let dst = arena.add_vertex(!owner);
                    vertex_of[edge.dst as usize] = Some(dst);
                    stack.push((edge.dst, dst));
                    dst
                }
            };
            arena.add_edge(src, dst, edge.cond.clone(), color);
        }

        if owner == ENV && !missing.is_false() {
            let sink = sinks.env_sink(&mut arena, unsat_color);
            trace!("Completing environment vertex {src} with an edge to sink {sink}.");
            arena.add_edge(src, sink, missing, unsat_color);
        } else if owner == PLAYER && successors == 0 {
            let sink = sinks.player_sink(&mut arena, unsat_color);
            trace!("Completing player vertex {src} with an edge to sink {sink}.");
            arena.add_plain_edge(src, sink, unsat_color);
        }
    }

    debug!(
        "Built arena with {} vertices and {} edges from {} automaton states (sinks: {}).",
        arena.num_vertices(),
        arena.num_edges(),
        automaton.num_states(),
        sinks.pair.is_some()
    );

    arena.set_outputs(outputs);
    Ok(arena)
}

/// Check that every environment vertex of `arena` covers all inputs, i.e. the disjunction
/// of its guards with outputs quantified away is `true`.
pub fn is_input_complete(arena: &Arena) -> bool {
    (0..arena.num_vertices() as u32)
        .filter(|v| arena.owner(*v) == ENV)
        .all(|v| {
            let covered = arena
                .out(v)
                .fold(arena.vars().mk_false(), |acc: Bdd, (_, e)| acc.or(&e.cond));
            covered.exists(arena.outputs()).is_true()
        })
}

/// The lazily created pair of sink vertices.
#[derive(Default)]
struct Sinks {
    /// `(environment sink, player sink)`; the environment sink is the target of incomplete
    /// environment vertices and is therefore owned by the player, and vice versa.
    pair: Option<(u32, u32)>,
}

impl Sinks {
    fn ensure(&mut self, arena: &mut Arena, color: u32) -> (u32, u32) {
        if let Some(pair) = self.pair {
            return pair;
        }
        let env_sink = arena.add_vertex(PLAYER);
        let player_sink = arena.add_vertex(ENV);
        arena.add_plain_edge(env_sink, player_sink, color);
        arena.add_plain_edge(player_sink, env_sink, color);
        self.pair = Some((env_sink, player_sink));
        (env_sink, player_sink)
    }

    fn env_sink(&mut self, arena: &mut Arena, color: u32) -> u32 {
        self.ensure(arena, color).0
    }

    fn player_sink(&mut self, arena: &mut Arena, color: u32) -> u32 {
        self.ensure(arena, color).1
    }
}
