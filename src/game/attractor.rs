use crate::arena::{Arena, EdgeId};
use log::trace;
use std::collections::BTreeSet;

/// Subgame tag of a vertex that does not belong to any layer yet.
pub const UNSEEN: u32 = u32::MAX;

/// A strategy edge recorded by the [`AttractorEngine`].
///
/// Edges chosen because their color alone certifies the win are recorded with
/// `needs_revalidation` set: they are only valid as long as their destination stays
/// in the winning region, which [`AttractorEngine::fix_strategy`] checks later.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StrategyEntry {
    pub edge: EdgeId,
    pub needs_revalidation: bool,
}

/// How [`AttractorEngine::attract`] treats the target and the attracted vertices.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttractorMode {
    /// Attract towards vertices already won by the player, within the vertices whose
    /// subgame tag is at least `layer`. No tags are changed.
    Within { layer: u32 },
    /// Open a new layer. Edges colored in `[min_win_color, max_color]` are winning on their
    /// own, and every attracted vertex is tagged with the new layer.
    Accepting { min_win_color: u32 },
}

/// The result of one attractor computation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Attraction {
    /// The layer the computation worked in (fresh for [`AttractorMode::Accepting`]).
    pub layer: u32,
    /// `true` if at least one vertex was attracted.
    pub grown: bool,
}

/// The set of colors present in the unseen part of a subgame.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SubgameInfo {
    colors: BTreeSet<u32>,
}

impl SubgameInfo {
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// The only color of the subgame, if there is exactly one.
    pub fn single_color(&self) -> Option<u32> {
        if self.colors.len() == 1 {
            self.colors.first().copied()
        } else {
            None
        }
    }

    pub fn max_color(&self) -> Option<u32> {
        self.colors.last().copied()
    }

    /// The smallest color `>= 2` with the parity of the maximal color such that all
    /// colors between it and the maximum share that parity (priority compression).
    pub fn min_win_color(&self) -> Option<u32> {
        let mut min_win = self.max_color()?;
        while min_win > 2 && !self.colors.contains(&(min_win - 1)) {
            min_win -= 2;
        }
        Some(min_win)
    }
}

/// Attractor computation over a layered partition of arena vertices.
///
/// Every vertex carries a subgame tag (a *layer*, [`UNSEEN`] initially), an optional winner
/// and an optional strategy entry. Layers are numbered increasingly as they are created, so
/// vertices with a smaller tag belong to "older" subgames. All operations are restricted to
/// a `scope` of vertices (the strongly connected component being solved).
pub struct AttractorEngine {
    subgame: Vec<u32>,
    winner: Vec<Option<bool>>,
    strategy: Vec<Option<StrategyEntry>>,
    last_layer: u32,
    to_add: Vec<u32>,
}

impl AttractorEngine {
    pub fn new(num_vertices: usize) -> AttractorEngine {
        AttractorEngine {
            subgame: vec![UNSEEN; num_vertices],
            winner: vec![None; num_vertices],
            strategy: vec![None; num_vertices],
            last_layer: 0,
            to_add: Vec::new(),
        }
    }

    pub fn subgame(&self, vertex: u32) -> u32 {
        self.subgame[vertex as usize]
    }

    pub fn winner(&self, vertex: u32) -> Option<bool> {
        self.winner[vertex as usize]
    }

    pub fn strategy(&self, vertex: u32) -> Option<StrategyEntry> {
        self.strategy[vertex as usize]
    }

    pub fn winners(&self) -> &[Option<bool>] {
        &self.winner
    }

    fn won_by(&self, vertex: u32, player: bool) -> bool {
        self.winner[vertex as usize] == Some(player)
    }

    /// Allocate a fresh layer id.
    pub fn next_layer(&mut self) -> u32 {
        self.last_layer += 1;
        self.last_layer
    }

    /// Tag `vertex` as solved in `layer`.
    pub fn assign(&mut self, vertex: u32, layer: u32, winner: bool, strategy: Option<EdgeId>) {
        let v = vertex as usize;
        self.subgame[v] = layer;
        self.winner[v] = Some(winner);
        self.strategy[v] = strategy.map(|edge| StrategyEntry {
            edge,
            needs_revalidation: false,
        });
    }

    /// Compute the attractor of `player` inside `scope`, only following edges colored
    /// at most `max_color`, and mark every attracted vertex as won by `player`.
    ///
    /// Newly winning vertices are collected during a full scan and only committed after it,
    /// which makes the fixpoint proceed like a backward breadth-first search and keeps
    /// strategies short. When picking a strategy edge towards already won vertices, the
    /// player prefers the destination in the oldest layer; the environment takes the first
    /// admissible edge.
    pub fn attract(
        &mut self,
        arena: &Arena,
        scope: &[u32],
        player: bool,
        max_color: u32,
        mode: AttractorMode,
    ) -> Attraction {
        let (layer, accepting) = match mode {
            AttractorMode::Within { layer } => (layer, None),
            AttractorMode::Accepting { min_win_color } => {
                debug_assert!(min_win_color > 0 && min_win_color <= max_color);
                debug_assert_eq!(max_color & 1 == 1, player);
                (self.next_layer(), Some(min_win_color))
            }
        };

        let mut grown = false;
        let mut to_add = std::mem::take(&mut self.to_add);
        debug_assert!(to_add.is_empty());
        loop {
            for &v in scope {
                if self.subgame(v) < layer || self.won_by(v, player) {
                    continue;
                }

                let is_owned = arena.owner(v) == player;
                let mut wins = !is_owned;
                let mut oldest: Option<u32> = None;
                for (id, edge) in arena.out(v) {
                    if self.subgame(edge.dst) < layer || edge.color > max_color {
                        continue;
                    }
                    let certified = accepting.is_some_and(|min| min <= edge.color);
                    if self.won_by(edge.dst, player) || certified {
                        if !is_owned {
                            continue;
                        }
                        wins = true;
                        if accepting.is_some() {
                            self.strategy[v as usize] = Some(StrategyEntry {
                                edge: id,
                                needs_revalidation: certified,
                            });
                            break;
                        }
                        let dst_layer = self.subgame(edge.dst);
                        if oldest.is_none_or(|o| dst_layer < o) {
                            self.strategy[v as usize] = Some(StrategyEntry {
                                edge: id,
                                needs_revalidation: false,
                            });
                            oldest = Some(dst_layer);
                            if !player {
                                break;
                            }
                        }
                    } else if !is_owned {
                        wins = false;
                        break;
                    }
                }
                if wins {
                    to_add.push(v);
                }
            }

            if to_add.is_empty() {
                break;
            }
            grown = true;
            for &v in &to_add {
                self.winner[v as usize] = Some(player);
                if accepting.is_some() {
                    debug_assert_eq!(self.subgame(v), UNSEEN);
                    self.subgame[v as usize] = layer;
                }
            }
            trace!(
                "Attracted {} vertices for player {} in layer {}.",
                to_add.len(),
                u8::from(player),
                layer
            );
            to_add.clear();
        }

        self.to_add = to_add;
        Attraction { layer, grown }
    }

    /// Re-validate the strategy of `player`-owned vertices of `layer` whose edge was only
    /// certified by its color.
    ///
    /// An edge whose destination is still won by the environment (as `player`) is kept.
    /// Otherwise, a replacement edge colored in `[min_win_color, max_color]` leading to a
    /// `player`-won vertex is searched, preferring the oldest layer. Returns `true` if some
    /// vertex has no such edge, in which case the layer cannot be accepted.
    pub fn fix_strategy(
        &mut self,
        arena: &Arena,
        scope: &[u32],
        layer: u32,
        player: bool,
        min_win_color: u32,
        max_color: u32,
    ) -> bool {
        for &v in scope {
            if self.subgame(v) != layer
                || !self.won_by(v, player)
                || arena.owner(v) != player
            {
                continue;
            }
            let Some(entry) = self.strategy[v as usize] else {
                continue;
            };
            if !entry.needs_revalidation {
                continue;
            }

            let current = arena.edge(entry.edge);
            if !player && self.won_by(current.dst, player) {
                self.strategy[v as usize] = Some(StrategyEntry {
                    edge: entry.edge,
                    needs_revalidation: false,
                });
                continue;
            }

            let mut replacement = None;
            let mut oldest = UNSEEN;
            for (id, edge) in arena.out(v) {
                let dst_layer = self.subgame(edge.dst);
                if dst_layer < layer {
                    continue;
                }
                let admissible = min_win_color <= edge.color
                    && edge.color <= max_color
                    && self.won_by(edge.dst, player);
                if admissible && (replacement.is_none() || dst_layer < oldest) {
                    replacement = Some(id);
                    oldest = dst_layer;
                }
            }

            let Some(edge) = replacement else {
                trace!("Vertex {v} has no admissible strategy edge in layer {layer}.");
                self.strategy[v as usize] = None;
                return true;
            };
            self.strategy[v as usize] = Some(StrategyEntry {
                edge,
                needs_revalidation: false,
            });
        }
        false
    }

    /// Undo every vertex of `scope` in `layer` or newer that is not won by `!player`.
    pub fn rollback(&mut self, scope: &[u32], layer: u32, player: bool) -> usize {
        let mut count = 0;
        for &v in scope {
            if !self.won_by(v, !player) && self.subgame(v) >= layer {
                let v = v as usize;
                self.winner[v] = None;
                self.subgame[v] = UNSEEN;
                self.strategy[v] = None;
                count += 1;
            }
        }
        count
    }

    /// Drop the revalidation flags of all solved vertices in `scope`.
    pub fn clear_flags(&mut self, scope: &[u32]) {
        for &v in scope {
            if self.subgame(v) == UNSEEN {
                continue;
            }
            if let Some(entry) = self.strategy[v as usize].as_mut() {
                entry.needs_revalidation = false;
            }
        }
    }

    /// Collect the colors of edges between unseen vertices of `scope` that are at most
    /// `max_color`.
    pub fn inspect(&self, arena: &Arena, scope: &[u32], max_color: u32) -> SubgameInfo {
        let mut info = SubgameInfo::default();
        for &v in scope {
            if self.subgame(v) != UNSEEN {
                continue;
            }
            for (_, edge) in arena.out(v) {
                if self.subgame(edge.dst) == UNSEEN && edge.color <= max_color {
                    info.colors.insert(edge.color);
                }
            }
        }
        info
    }

    /// Solve an unseen subgame with a single color: its owner wins every unseen vertex
    /// and any edge of the subgame is a valid strategy.
    pub fn solve_single_color(&mut self, arena: &Arena, scope: &[u32], color: u32, max_color: u32) {
        let winner = color & 1 == 1;
        let layer = self.next_layer();
        for &v in scope {
            if self.subgame(v) != UNSEEN {
                continue;
            }
            self.subgame[v as usize] = layer;
            self.winner[v as usize] = Some(winner);
            let edge = arena
                .out(v)
                .find(|(_, e)| self.subgame(e.dst) >= layer && e.color <= max_color)
                .map(|(id, _)| id);
            debug_assert!(edge.is_none_or(|id| arena.edge(id).color == color));
            self.strategy[v as usize] = edge.map(|edge| StrategyEntry {
                edge,
                needs_revalidation: false,
            });
        }
    }
}
