use crate::arena::{Arena, ENV, EdgeId, Solution};
use crate::game::attractor::{AttractorEngine, AttractorMode, SubgameInfo, UNSEEN};
use crate::game::scc::SccDecomposition;
use cancel_this::{Cancellable, Cancelled, is_cancelled};
use computation_process::Incomplete::Suspended;
use computation_process::{Completable, ComputationStep, Stateful};
use log::{debug, info, trace};

/// Configuration of the [`crate::game::Zielonka`] solver.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ZielonkaConfig {
    /// Cancel the solver after this many steps (default: `usize::MAX`). A step processes
    /// one work item or starts one strongly connected component.
    pub max_iterations: usize,
}

impl Default for ZielonkaConfig {
    fn default() -> Self {
        ZielonkaConfig::new()
    }
}

impl ZielonkaConfig {
    pub fn new() -> ZielonkaConfig {
        ZielonkaConfig {
            max_iterations: usize::MAX,
        }
    }
}

/// Counters reported once the solver finishes.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SolverStats {
    pub components: usize,
    pub trivial_components: usize,
    pub single_color_subgames: usize,
    pub layers: usize,
    pub backtracks: usize,
}

/// One pending item of the flattened Zielonka recursion.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Work {
    /// Solve the unseen part of the current component restricted to colors `<= max_color`.
    Descend { max_color: u32 },
    /// Check that the layer opened at `layer` survives the opponent's attractor.
    Verify {
        layer: u32,
        min_win_color: u32,
        max_color: u32,
    },
}

/// An edge leaving the current component, temporarily replaced by a colored self-loop.
struct StashedEdge {
    edge: EdgeId,
    dst: u32,
    color: u32,
}

/// Internal state of the [`crate::game::Zielonka`] solver.
pub struct ZielonkaState {
    arena: Arena,
    engine: AttractorEngine,
    components: Option<Vec<Vec<u32>>>,
    /// Whether a component can reach an odd-colored cycle candidate.
    useful: Vec<bool>,
    next_component: usize,
    scope: Vec<u32>,
    work: Vec<Work>,
    stash: Vec<StashedEdge>,
    iteration: usize,
    finished: bool,
    stats: SolverStats,
}

impl From<Arena> for ZielonkaState {
    fn from(mut arena: Arena) -> Self {
        arena.clear_solution();
        ZielonkaState {
            engine: AttractorEngine::new(arena.num_vertices()),
            arena,
            components: None,
            useful: Vec::new(),
            next_component: 0,
            scope: Vec::new(),
            work: Vec::new(),
            stash: Vec::new(),
            iteration: 0,
            finished: false,
            stats: SolverStats::default(),
        }
    }
}

impl From<&Arena> for ZielonkaState {
    fn from(arena: &Arena) -> Self {
        ZielonkaState::from(arena.clone())
    }
}

impl ZielonkaState {
    pub fn stats(&self) -> &SolverStats {
        &self.stats
    }

    /// Decompose the arena and decide which components can matter for the player.
    ///
    /// A component is useful if it contains an internal odd-colored edge or has an edge
    /// into a useful component. Every play that stays in useless components is won by the
    /// environment.
    fn decompose(&mut self) -> Cancellable<()> {
        let components = SccDecomposition::configure(&self.arena, &self.arena)
            .collect::<Cancellable<Vec<Vec<u32>>>>()?;

        let mut component_of = vec![0usize; self.arena.num_vertices()];
        for (i, component) in components.iter().enumerate() {
            for v in component {
                component_of[*v as usize] = i;
            }
        }

        // Components come in reverse topological order, so successors are decided first.
        let mut useful = vec![false; components.len()];
        for (i, component) in components.iter().enumerate() {
            let is_useful = component.iter().any(|v| {
                self.arena.out(*v).any(|(_, e)| {
                    let target = component_of[e.dst as usize];
                    if target == i {
                        e.color % 2 == 1
                    } else {
                        useful[target]
                    }
                })
            });
            useful[i] = is_useful;
        }

        debug!(
            "Arena decomposed into {} components ({} useful).",
            components.len(),
            useful.iter().filter(|x| **x).count()
        );
        self.stats.components = components.len();
        self.useful = useful;
        self.components = Some(components);
        Ok(())
    }

    /// Start solving the next component.
    fn start_component(&mut self, index: usize, component: Vec<u32>) {
        self.scope = component;

        if !self.useful[index] {
            // The environment wins and may take any edge.
            self.stats.trivial_components += 1;
            let layer = self.engine.next_layer();
            for &v in &self.scope {
                let strategy = if self.arena.owner(v) == ENV {
                    self.arena.out_ids(v).first().copied()
                } else {
                    None
                };
                self.engine.assign(v, layer, false, strategy);
            }
            trace!("Component {index} is useless and won by the environment.");
            return;
        }

        let (info, max_color) = self.fix_component();
        if info.is_empty() {
            trace!("Component {index} solved by its exits.");
        } else if let Some(color) = info.single_color() {
            self.stats.single_color_subgames += 1;
            self.engine
                .solve_single_color(&self.arena, &self.scope, color, max_color);
        } else if let Some(max_color) = info.max_color() {
            self.work.push(Work::Descend { max_color });
        }
    }

    /// Turn every edge leaving the current component into a self-loop whose synthetic
    /// color says who wins at its former destination, then attract towards these loops.
    ///
    /// The synthetic colors are the two smallest colors above every internal color. The
    /// attractor of the larger one is computed first: the smaller one is ignored while the
    /// larger one is processed, but not the other way around.
    fn fix_component(&mut self) -> (SubgameInfo, u32) {
        let inner_max = self
            .scope
            .iter()
            .flat_map(|v| self.arena.out(*v))
            .filter(|(_, e)| self.scope.binary_search(&e.dst).is_ok())
            .map(|(_, e)| e.color)
            .max()
            .unwrap_or(0);
        let base = inner_max.saturating_add(1).max(1);
        // Indexed by player: [environment (even), player (odd)].
        let colors = if base % 2 == 1 {
            [base.saturating_add(1), base]
        } else {
            [base, base.saturating_add(1)]
        };
        let mut added = [false, false];

        for &v in &self.scope {
            debug_assert_eq!(self.engine.subgame(v), UNSEEN);
            let exits: Vec<EdgeId> = self
                .arena
                .out(v)
                .filter(|(_, e)| self.scope.binary_search(&e.dst).is_err())
                .map(|(id, _)| id)
                .collect();
            for id in exits {
                let edge = self.arena.edge(id);
                let winner = self.engine.winner(edge.dst) == Some(true);
                self.stash.push(StashedEdge {
                    edge: id,
                    dst: edge.dst,
                    color: edge.color,
                });
                let edge = self.arena.edge_mut(id);
                edge.dst = edge.src;
                edge.color = colors[usize::from(winner)];
                added[usize::from(winner)] = true;
            }
        }

        let larger = colors[1] > colors[0];
        for player in [larger, !larger] {
            if added[usize::from(player)] {
                let color = colors[usize::from(player)];
                self.engine.attract(
                    &self.arena,
                    &self.scope,
                    player,
                    color,
                    AttractorMode::Accepting {
                        min_win_color: color,
                    },
                );
            }
        }
        if added[0] || added[1] {
            self.engine.clear_flags(&self.scope);
        }

        let max_color = colors[0].max(colors[1]);
        (
            self.engine.inspect(&self.arena, &self.scope, UNSEEN),
            max_color,
        )
    }

    fn process(&mut self, work: Work) {
        match work {
            Work::Descend { max_color } => {
                let info = self.engine.inspect(&self.arena, &self.scope, max_color);
                if info.is_empty() {
                    return;
                }
                if let Some(color) = info.single_color() {
                    self.stats.single_color_subgames += 1;
                    self.engine
                        .solve_single_color(&self.arena, &self.scope, color, max_color);
                    return;
                }
                let (Some(max_color), Some(min_win_color)) =
                    (info.max_color(), info.min_win_color())
                else {
                    return;
                };

                let player = min_win_color % 2 == 1;
                let attraction = self.engine.attract(
                    &self.arena,
                    &self.scope,
                    player,
                    max_color,
                    AttractorMode::Accepting { min_win_color },
                );
                self.stats.layers += 1;
                trace!(
                    "Layer {} for player {} with colors {min_win_color}..={max_color}.",
                    attraction.layer,
                    u8::from(player)
                );
                self.work.push(Work::Verify {
                    layer: attraction.layer,
                    min_win_color,
                    max_color,
                });
                self.work.push(Work::Descend {
                    max_color: min_win_color - 1,
                });
            }
            Work::Verify {
                layer,
                min_win_color,
                max_color,
            } => {
                let player = min_win_color % 2 == 1;
                let opponent = self.engine.attract(
                    &self.arena,
                    &self.scope,
                    !player,
                    max_color,
                    AttractorMode::Within { layer },
                );
                let broken = opponent.grown
                    || self.engine.fix_strategy(
                        &self.arena,
                        &self.scope,
                        layer,
                        player,
                        min_win_color,
                        max_color,
                    );
                if broken {
                    let undone = self.engine.rollback(&self.scope, layer, player);
                    self.stats.backtracks += 1;
                    trace!("Layer {layer} rejected, {undone} vertices rolled back.");
                    self.work.push(Work::Descend { max_color });
                }
            }
        }
    }

    /// Restore the exits, check the solution and attach it to the arena.
    fn finish(&mut self) {
        while let Some(stashed) = self.stash.pop() {
            let edge = self.arena.edge_mut(stashed.edge);
            edge.dst = stashed.dst;
            edge.color = stashed.color;
        }

        let mut winner = Vec::with_capacity(self.arena.num_vertices());
        let mut strategy = Vec::with_capacity(self.arena.num_vertices());
        for v in 0..self.arena.num_vertices() as u32 {
            let Some(won) = self.engine.winner(v) else {
                panic!("Vertex {v} has no winner after solving.");
            };
            winner.push(won);
            if self.arena.owner(v) == won {
                let entry = self.engine.strategy(v);
                assert!(
                    entry.is_some_and(|it| !it.needs_revalidation),
                    "Vertex {v} is won by its owner but has no valid strategy."
                );
                strategy.push(entry.map(|it| it.edge));
            } else {
                strategy.push(None);
            }
        }

        info!(
            "Solved arena with {} vertices: {} won by the player ({:?}).",
            winner.len(),
            winner.iter().filter(|x| **x).count(),
            self.stats
        );
        self.arena.set_solution(Solution { winner, strategy });
        self.finished = true;
    }
}

/// Step implementation of the [`crate::game::Zielonka`] solver.
///
/// Every step either decomposes the arena, processes one item of the work stack, or opens
/// the next strongly connected component. Components are solved in reverse topological
/// order, so the exits of a component always lead to solved vertices.
pub struct ZielonkaStep;

impl ComputationStep<ZielonkaConfig, ZielonkaState, Arena> for ZielonkaStep {
    fn step(context: &ZielonkaConfig, state: &mut ZielonkaState) -> Completable<Arena> {
        if state.iteration >= context.max_iterations {
            debug!(
                "[iteration:{}] Zielonka canceled (exceeded iteration count).",
                state.iteration
            );
            return Err(Cancelled::new("ZielonkaConfig::max_iterations").into());
        }
        state.iteration += 1;
        is_cancelled!()?;

        if state.components.is_none() {
            state.decompose()?;
            return Err(Suspended);
        }

        if let Some(work) = state.work.pop() {
            state.process(work);
            return Err(Suspended);
        }

        let next = state
            .components
            .as_mut()
            .and_then(|it| it.get_mut(state.next_component))
            .map(std::mem::take);
        if let Some(component) = next {
            let index = state.next_component;
            state.next_component += 1;
            state.start_component(index, component);
            return Err(Suspended);
        }

        if !state.finished {
            state.finish();
        }
        Ok(state.arena.clone())
    }
}
