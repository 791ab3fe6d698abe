//! A direct recursive implementation of Zielonka's algorithm.
//!
//! This solver is exponential, allocates freely and ignores strategies. It only exists as a
//! reference for validating [`crate::game::solve`] on small games.
//!
//! Edge colors are moved to vertices by splitting every edge `u -c-> v` into `u -> m -> v`
//! where the new vertex `m` has priority `c` and the original vertices have priority `0`.

use crate::arena::Arena;
use cancel_this::{Cancellable, is_cancelled};

struct SplitGame {
    owner: Vec<bool>,
    priority: Vec<u32>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl From<&Arena> for SplitGame {
    fn from(arena: &Arena) -> Self {
        let n = arena.num_vertices();
        let mut game = SplitGame {
            owner: arena.owners().to_vec(),
            priority: vec![0; n],
            successors: vec![Vec::new(); n],
            predecessors: vec![Vec::new(); n],
        };
        for (_, edge) in arena.edges() {
            let middle = game.owner.len();
            game.owner.push(arena.owner(edge.src));
            game.priority.push(edge.color);
            game.successors.push(vec![edge.dst as usize]);
            game.predecessors.push(vec![edge.src as usize]);
            game.successors[edge.src as usize].push(middle);
            game.predecessors[edge.dst as usize].push(middle);
        }
        game
    }
}

impl SplitGame {
    /// Vertices of `region` from which `player` can force a visit to `target`.
    fn attractor(&self, region: &[bool], target: &[bool], player: bool) -> Vec<bool> {
        let mut result = target.to_vec();
        // Number of successors inside the region not yet attracted.
        let mut escapes: Vec<usize> = (0..self.owner.len())
            .map(|v| self.successors[v].iter().filter(|w| region[**w]).count())
            .collect();
        let mut queue: Vec<usize> = (0..self.owner.len()).filter(|v| result[*v]).collect();
        while let Some(w) = queue.pop() {
            for &v in &self.predecessors[w] {
                if !region[v] || result[v] {
                    continue;
                }
                escapes[v] -= 1;
                if self.owner[v] == player || escapes[v] == 0 {
                    result[v] = true;
                    queue.push(v);
                }
            }
        }
        result
    }

    /// Returns the vertices of `region` won by the player (odd priorities).
    fn solve(&self, region: &[bool]) -> Cancellable<Vec<bool>> {
        is_cancelled!()?;
        let n = self.owner.len();
        let Some(max) = (0..n).filter(|v| region[*v]).map(|v| self.priority[v]).max() else {
            return Ok(vec![false; n]);
        };
        let player = max % 2 == 1;

        let top: Vec<bool> = (0..n).map(|v| region[v] && self.priority[v] == max).collect();
        let attracted = self.attractor(region, &top, player);
        let rest: Vec<bool> = (0..n).map(|v| region[v] && !attracted[v]).collect();
        let inner = self.solve(&rest)?;
        let opponent_won: Vec<bool> = (0..n).map(|v| rest[v] && inner[v] != player).collect();
        if !opponent_won.iter().any(|x| *x) {
            // `player` wins the whole region.
            return Ok((0..n).map(|v| region[v] && player).collect());
        }

        let lost = self.attractor(region, &opponent_won, !player);
        let remaining: Vec<bool> = (0..n).map(|v| region[v] && !lost[v]).collect();
        let outer = self.solve(&remaining)?;
        Ok((0..n)
            .map(|v| {
                if lost[v] {
                    region[v] && !player
                } else {
                    outer[v]
                }
            })
            .collect())
    }
}

/// Compute the player's winning region of `arena` (`true` = the player wins).
pub fn solve_naive(arena: &Arena) -> Cancellable<Vec<bool>> {
    let game = SplitGame::from(arena);
    let region = vec![true; game.owner.len()];
    let mut winner = game.solve(&region)?;
    winner.truncate(arena.num_vertices());
    Ok(winner)
}
