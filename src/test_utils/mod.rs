use crate::arena::{Arena, ENV, PLAYER};
use crate::automaton::Automaton;
use biodivine_lib_bdd::{BddVariable, BddVariableSet};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Initialize env_logger for tests. Safe to call multiple times.
pub fn init_logger() {
    let _ = env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Trace)
        .is_test(true)
        .try_init();
}

/// A split automaton for `G(o <-> i)` with input `i` and output `o`.
///
/// States `0`, `3` are environment states, `1`, `2` and `4` are player states. The player
/// wins by copying the input: a wrong answer leads into the even cycle `3 <-> 4`.
///
/// Returns the automaton together with its output variables.
pub fn copy_automaton() -> (Automaton, Vec<BddVariable>) {
    let vars = BddVariableSet::new(&["i", "o"]);
    let i = vars.var_by_name("i").unwrap();
    let o = vars.var_by_name("o").unwrap();

    let mut aut = Automaton::new(vars.clone(), Some(2));
    aut.add_states(5);
    aut.set_init(0);
    aut.add_edge(0, 1, vars.mk_var(i), Some(1));
    aut.add_edge(0, 2, vars.mk_not_var(i), Some(1));
    aut.add_edge(1, 0, vars.mk_var(o), Some(1));
    aut.add_edge(1, 3, vars.mk_not_var(o), Some(2));
    aut.add_edge(2, 0, vars.mk_not_var(o), Some(1));
    aut.add_edge(2, 3, vars.mk_var(o), Some(2));
    aut.add_edge(3, 4, vars.mk_true(), Some(2));
    aut.add_edge(4, 3, vars.mk_true(), Some(2));
    (aut, vec![o])
}

/// A pseudo-random arena with `num_vertices` vertices, colors in `1..=max_color` and
/// one to three successors per vertex. Alternation is not enforced.
pub fn random_arena(seed: u64, num_vertices: usize, max_color: u32) -> Arena {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    for _ in 0..num_vertices {
        let owner = if rng.gen_bool(0.5) { PLAYER } else { ENV };
        arena.add_vertex(owner);
    }
    for src in 0..num_vertices as u32 {
        let degree = rng.gen_range(1..=3);
        for _ in 0..degree {
            let dst = rng.gen_range(0..num_vertices as u32);
            let color = rng.gen_range(1..=max_color);
            arena.add_plain_edge(src, dst, color);
        }
    }
    arena.set_init(rng.gen_range(0..num_vertices as u32));
    arena
}

/// Check that the winning regions of a solved arena are closed under the attached strategy:
/// a vertex owned by its winner moves into the winner's region, and every edge of a vertex
/// owned by the loser stays in the winner's region.
pub fn is_consistent_solution(arena: &Arena) -> bool {
    let Some(solution) = arena.solution() else {
        return false;
    };
    (0..arena.num_vertices() as u32).all(|v| {
        let won = solution.winner[v as usize];
        if arena.owner(v) == won {
            solution.strategy[v as usize].is_some_and(|edge| {
                let edge = arena.edge(edge);
                edge.src == v && solution.winner[edge.dst as usize] == won
            })
        } else {
            solution.strategy[v as usize].is_none()
                && arena
                    .out(v)
                    .all(|(_, e)| solution.winner[e.dst as usize] == won)
        }
    })
}
