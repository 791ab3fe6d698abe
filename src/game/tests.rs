use crate::arena::builder::build_arena;
use crate::arena::pgsolver::parse_pgsolver;
use crate::arena::{Arena, ENV, MAX_COLOR, PLAYER};
use crate::error::{ArenaError, SolveError};
use crate::game::attractor::{AttractorEngine, AttractorMode};
use crate::game::naive::solve_naive;
use crate::game::{ZielonkaConfig, solve, solve_with};
use crate::test_utils::{copy_automaton, init_logger, is_consistent_solution, random_arena};
use biodivine_lib_bdd::BddVariableSet;
use cancel_this::Cancellable;
use std::time::Duration;
use test_generator::test_resources;

/// A player vertex with an odd self-loop wins and keeps looping.
#[test]
fn player_wins_odd_self_loop() {
    init_logger();
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(PLAYER);
    let v1 = arena.add_vertex(ENV);
    let self_loop = arena.add_plain_edge(v0, v0, 1);
    arena.add_plain_edge(v1, v0, 1);
    arena.set_init(v0);

    assert!(solve(&mut arena).unwrap());
    assert_eq!(arena.strategy(v0), Some(self_loop));
    assert_eq!(arena.winner(v1), Some(true));
    assert!(is_consistent_solution(&arena));
}

/// An even cycle without alternatives is won by the environment.
#[test]
fn environment_wins_even_cycle() {
    init_logger();
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(ENV);
    let v1 = arena.add_vertex(PLAYER);
    let edge = arena.add_plain_edge(v0, v1, 2);
    arena.add_plain_edge(v1, v0, 2);
    arena.set_init(v0);

    assert!(!solve(&mut arena).unwrap());
    assert_eq!(arena.winner(v1), Some(false));
    assert_eq!(arena.strategy(v0), Some(edge));
    assert_eq!(arena.strategy(v1), None);
}

/// The environment escapes the odd cycle through a higher even one, and the only other
/// choice of the player leads into an even sink.
#[test]
fn nested_colors_and_exits() {
    init_logger();
    // 0 (player) -1-> 1 (env) -3-> 0, 1 -4-> 2 (player) -2-> 1, 0 -2-> 3 (sink, even loop).
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    for owner in [PLAYER, ENV, PLAYER, ENV] {
        arena.add_vertex(owner);
    }
    arena.add_plain_edge(0, 1, 1);
    arena.add_plain_edge(1, 0, 3);
    arena.add_plain_edge(1, 2, 4);
    arena.add_plain_edge(2, 1, 2);
    arena.add_plain_edge(0, 3, 2);
    arena.add_plain_edge(3, 3, 2);

    assert!(!solve(&mut arena).unwrap());
    assert_eq!(arena.winner(3), Some(false));
    assert!(is_consistent_solution(&arena));
    let expected = solve_naive(&arena).unwrap();
    assert_eq!(arena.solution().unwrap().winner, expected);
}

#[test]
fn synthesis_game_is_won_by_copying() {
    init_logger();
    let (mut aut, outputs) = copy_automaton();
    let mut arena = build_arena(&mut aut, &outputs).unwrap();
    assert!(solve(&mut arena).unwrap());
    assert!(is_consistent_solution(&arena));

    // Every player vertex reachable from the initial vertex answers with `o == i`.
    let vars = arena.vars().clone();
    let i = vars.var_by_name("i").unwrap();
    let o = vars.var_by_name("o").unwrap();
    let agree = vars.mk_var(i).iff(&vars.mk_var(o));
    for (_, env_edge) in arena.out(arena.init()) {
        let answer = arena.strategy(env_edge.dst).unwrap();
        let combined = env_edge.cond.and(&arena.edge(answer).cond);
        assert!(!combined.is_false());
        assert!(combined.and_not(&agree).is_false());
    }
}

/// An environment vertex with an uncovered input escapes to the environment sink.
#[test]
fn incomplete_environment_loses_for_player() {
    init_logger();
    let (mut aut, outputs) = copy_automaton();
    let vars = aut.vars().clone();
    let i = vars.var_by_name("i").unwrap();
    let mut restricted = crate::automaton::Automaton::new(vars.clone(), aut.num_colors());
    restricted.add_states(aut.num_states());
    for edge in aut.edges() {
        // Drop the `!i` branch of the initial state.
        let cond = if edge.src == aut.init() {
            edge.cond.and(&vars.mk_var(i))
        } else {
            edge.cond.clone()
        };
        if !cond.is_false() {
            restricted.add_edge(edge.src, edge.dst, cond, edge.color);
        }
    }
    aut = restricted;

    let mut arena = build_arena(&mut aut, &outputs).unwrap();
    assert!(!solve(&mut arena).unwrap());
    assert!(is_consistent_solution(&arena));
}

#[test]
fn attractor_reaches_fixpoint() {
    init_logger();
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(PLAYER);
    let v1 = arena.add_vertex(ENV);
    let v2 = arena.add_vertex(PLAYER);
    arena.add_plain_edge(v0, v1, 1);
    arena.add_plain_edge(v1, v0, 1);
    arena.add_plain_edge(v1, v2, 2);
    arena.add_plain_edge(v2, v2, 2);
    let scope = vec![v0, v1, v2];

    let mut engine = AttractorEngine::new(arena.num_vertices());
    let first = engine.attract(
        &arena,
        &scope,
        PLAYER,
        1,
        AttractorMode::Accepting { min_win_color: 1 },
    );
    assert!(first.grown);
    assert_eq!(engine.winner(v0), Some(true));
    assert_eq!(engine.winner(v1), Some(true));
    assert_eq!(engine.winner(v2), None);
    assert!(engine.strategy(v0).unwrap().needs_revalidation);

    for max_color in [1, 2] {
        let again = engine.attract(
            &arena,
            &scope,
            PLAYER,
            max_color,
            AttractorMode::Within { layer: first.layer },
        );
        assert!(!again.grown);
        assert_eq!(again.layer, first.layer);
    }

    assert!(!engine.fix_strategy(&arena, &scope, first.layer, PLAYER, 1, 1));
    assert!(!engine.strategy(v0).unwrap().needs_revalidation);

    // Once color 2 is allowed, v2 is stuck in an even self-loop.
    let escape = engine.attract(
        &arena,
        &scope,
        ENV,
        2,
        AttractorMode::Accepting { min_win_color: 2 },
    );
    assert!(escape.grown);
    assert_eq!(engine.winner(v2), Some(false));
    assert_eq!(engine.rollback(&scope, first.layer, PLAYER), 2);
    assert_eq!(engine.winner(v0), None);
}

#[test]
fn solver_respects_iteration_limit() {
    let (mut aut, outputs) = copy_automaton();
    let mut arena = build_arena(&mut aut, &outputs).unwrap();
    let config = ZielonkaConfig { max_iterations: 1 };
    assert!(matches!(
        solve_with(&mut arena, config),
        Err(SolveError::Cancelled(_))
    ));
    assert!(arena.solution().is_none());
}

#[test]
fn solver_rejects_invalid_arena() {
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    arena.add_vertex(ENV);
    assert!(matches!(solve(&mut arena), Err(SolveError::Arena(_))));
}

#[test]
fn solver_rejects_oversized_colors() {
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(ENV);
    arena.add_plain_edge(v0, v0, MAX_COLOR + 1);
    assert!(matches!(
        solve(&mut arena),
        Err(SolveError::Arena(ArenaError::ColorOutOfRange { edge: 0, .. }))
    ));

    // The largest color is even, so the environment wins the loop.
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(PLAYER);
    arena.add_plain_edge(v0, v0, MAX_COLOR);
    assert_eq!(solve(&mut arena).ok(), Some(false));

    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(PLAYER);
    arena.add_plain_edge(v0, v0, MAX_COLOR - 1);
    assert_eq!(solve(&mut arena).ok(), Some(true));
}

/// Solving an already solved arena gives the same solution and keeps the edges intact.
#[test]
fn solving_twice_keeps_edges() {
    init_logger();
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    let v0 = arena.add_vertex(ENV);
    let v1 = arena.add_vertex(PLAYER);
    arena.add_plain_edge(v0, v1, 2);
    arena.add_plain_edge(v1, v1, 1);
    arena.set_init(v0);

    let edges = |arena: &Arena| -> Vec<(u32, u32, u32)> {
        arena.edges().map(|(_, e)| (e.src, e.dst, e.color)).collect()
    };
    let before = edges(&arena);
    assert!(solve(&mut arena).unwrap());
    assert_eq!(edges(&arena), before);
    let solution = arena.solution().cloned();

    assert!(solve(&mut arena).unwrap());
    assert_eq!(edges(&arena), before);
    assert_eq!(arena.solution().cloned(), solution);
    assert!(is_consistent_solution(&arena));
}

/// A strategy edge certified only by its color is replaced by the admissible edge that
/// leads to the oldest layer, for the environment as well.
#[test]
fn environment_strategy_prefers_oldest_layer() {
    init_logger();
    let mut arena = Arena::new(BddVariableSet::new_anonymous(0));
    for owner in [ENV, PLAYER, ENV, PLAYER] {
        arena.add_vertex(owner);
    }
    arena.add_plain_edge(0, 3, 2);
    let to_newer = arena.add_plain_edge(0, 1, 2);
    let to_older = arena.add_plain_edge(0, 2, 2);
    arena.add_plain_edge(1, 1, 1);
    arena.add_plain_edge(2, 2, 2);
    arena.add_plain_edge(3, 3, 1);
    let scope = [0, 1, 2, 3];

    let mut engine = AttractorEngine::new(arena.num_vertices());
    let attraction = engine.attract(
        &arena,
        &scope,
        ENV,
        2,
        AttractorMode::Accepting { min_win_color: 2 },
    );
    assert!(attraction.grown);
    assert_eq!(engine.subgame(0), attraction.layer);
    assert_eq!(engine.subgame(2), attraction.layer);
    assert_eq!(engine.winner(1), None);
    assert_eq!(engine.winner(3), None);
    assert!(engine.strategy(0).is_some_and(|it| it.needs_revalidation));

    let newer = engine.next_layer();
    engine.assign(1, newer, ENV, None);
    assert!(!engine.fix_strategy(&arena, &scope, attraction.layer, ENV, 2, 2));
    let entry = engine.strategy(0).unwrap();
    assert_eq!(entry.edge, to_older);
    assert_ne!(entry.edge, to_newer);
    assert!(!entry.needs_revalidation);
}

/// Compare the solver with the naive recursive algorithm on pseudo-random arenas.
#[test]
fn random_arenas_match_naive_solver() {
    init_logger();
    for seed in 0..200u64 {
        let vertices = 2 + (seed % 9) as usize;
        let colors = 1 + (seed % 6) as u32;
        let mut arena = random_arena(seed, vertices, colors);
        let expected = solve_naive(&arena).unwrap();
        let player_wins = solve(&mut arena).unwrap();
        let solution = arena.solution().unwrap();
        assert_eq!(solution.winner, expected, "seed {seed}");
        assert_eq!(player_wins, expected[arena.init() as usize]);
        assert!(is_consistent_solution(&arena), "seed {seed}");
    }
}

fn check_game_file(path: &str) -> Cancellable<()> {
    let input = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("Failed to read game {}: {:?}", path, e));
    let mut arena =
        parse_pgsolver(&input).unwrap_or_else(|e| panic!("Invalid game {}: {}", path, e));
    let expected = solve_naive(&arena)?;
    match solve(&mut arena) {
        Ok(_) => {}
        Err(SolveError::Cancelled(c)) => return Err(c),
        Err(e) => panic!("Failed to solve {}: {}", path, e),
    }
    assert_eq!(arena.solution().unwrap().winner, expected, "{path}");
    assert!(is_consistent_solution(&arena), "{path}");
    Ok(())
}

#[test_resources("./games/*.pg")]
fn bundled_games_match_naive_solver(path: &str) {
    init_logger();
    let two_seconds = Duration::from_secs(2);
    match cancel_this::on_timeout(two_seconds, || check_game_file(path)) {
        Ok(()) => {}
        Err(_) => {
            // Large games may exceed the time limit of the naive solver.
        }
    }
}
