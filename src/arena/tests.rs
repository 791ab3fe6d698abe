use crate::arena::builder::{build_arena, is_input_complete};
use crate::arena::pgsolver::{parse_pgsolver, write_pgsolver, write_solution};
use crate::arena::{ENV, MAX_COLOR, PLAYER};
use crate::automaton::Automaton;
use crate::error::{ArenaError, ParseError};
use crate::game::solve;
use crate::test_utils::{copy_automaton, init_logger};
use biodivine_lib_bdd::BddVariableSet;

#[test]
fn builder_keeps_complete_alternating_automaton() {
    init_logger();
    let (mut aut, outputs) = copy_automaton();
    let arena = build_arena(&mut aut, &outputs).unwrap();

    assert_eq!(arena.num_vertices(), aut.num_states());
    assert_eq!(arena.num_edges(), aut.num_edges());
    assert!(arena.is_alternating());
    assert!(is_input_complete(&arena));
    assert_eq!(arena.owner(arena.init()), ENV);
    assert_eq!(aut.synthesis_outputs(), Some(outputs.as_slice()));
    assert!(arena.validate().is_ok());
}

/// An environment vertex which only handles `i` gets an edge to the environment sink
/// for `!i`, and a player vertex without successors gets an edge to the player sink.
#[test]
fn builder_synthesizes_sinks_once() {
    init_logger();
    let vars = BddVariableSet::new(&["i", "o"]);
    let i = vars.var_by_name("i").unwrap();
    let o = vars.var_by_name("o").unwrap();
    let mut aut = Automaton::new(vars.clone(), Some(2));
    aut.add_states(3);
    aut.add_edge(0, 1, vars.mk_var(i), Some(1));
    aut.add_edge(1, 2, vars.mk_var(o), Some(1));
    aut.add_edge(2, 1, vars.mk_true(), Some(1));
    // State 1 is complete, but player state 3 would be a dead end.
    aut.add_states(1);
    aut.add_edge(2, 3, vars.mk_not_var(i), Some(1));

    let arena = build_arena(&mut aut, &[o]).unwrap();
    assert!(arena.is_alternating());
    assert!(is_input_complete(&arena));
    assert!(arena.validate().is_ok());
    // 4 reachable states plus exactly two sinks.
    assert_eq!(arena.num_vertices(), 6);

    // The completing edge is the last edge of the initial vertex.
    let (_, completion) = arena.out(arena.init()).last().unwrap();
    assert!(completion.cond.and(&arena.vars().mk_var(i)).is_false());
    assert_eq!(completion.color, 2);
    let env_sink = completion.dst;
    assert_eq!(arena.owner(env_sink), PLAYER);
    let (_, back) = arena.out(env_sink).next().unwrap();
    assert_eq!(arena.owner(back.dst), ENV);
    assert_eq!(arena.out(back.dst).next().unwrap().1.dst, env_sink);
}

#[test]
fn builder_splits_self_loops() {
    let vars = BddVariableSet::new(&["i", "o"]);
    let o = vars.var_by_name("o").unwrap();
    let mut aut = Automaton::new(vars.clone(), Some(2));
    aut.add_states(2);
    aut.add_edge(0, 1, vars.mk_true(), Some(2));
    aut.add_edge(1, 1, vars.mk_var(o), Some(1));
    aut.add_edge(1, 0, vars.mk_not_var(o), Some(2));

    let arena = build_arena(&mut aut, &[o]).unwrap();
    assert!(arena.is_alternating());
    assert_eq!(arena.num_vertices(), 3);
    let middle = 2;
    assert_eq!(arena.owner(middle), ENV);
    let (_, back) = arena.out(middle).next().unwrap();
    assert!(back.cond.is_true());
    assert_eq!(back.color, 1);
}

#[test]
fn builder_rejects_bad_inputs() {
    let vars = BddVariableSet::new(&["i", "o"]);
    let o = vars.var_by_name("o").unwrap();

    let mut tautology = Automaton::new(vars.clone(), Some(1));
    tautology.add_states(1);
    assert_eq!(
        build_arena(&mut tautology, &[o]).err(),
        Some(ArenaError::TautologicalAcceptance)
    );

    let mut triangle = Automaton::new(vars.clone(), Some(2));
    triangle.add_states(3);
    triangle.add_edge(0, 1, vars.mk_true(), Some(1));
    triangle.add_edge(1, 2, vars.mk_true(), Some(1));
    triangle.add_edge(2, 0, vars.mk_true(), Some(1));
    assert!(matches!(
        build_arena(&mut triangle, &[o]),
        Err(ArenaError::NonAlternating { .. })
    ));

    let (mut aut, outputs) = copy_automaton();
    build_arena(&mut aut, &outputs).unwrap();
    let i = aut.vars().var_by_name("i").unwrap();
    assert_eq!(
        build_arena(&mut aut, &[i]).err(),
        Some(ArenaError::InconsistentOutputs)
    );
    // The same outputs can be used again.
    assert!(build_arena(&mut aut, &outputs).is_ok());
}

#[test]
fn pgsolver_parse_and_write() {
    let game = "parity 4;\nstart 2;\n0 0 0 2 \"a\";\n2 3 1 0,4;\n4 2 0 4;\n";
    let arena = parse_pgsolver(game).unwrap();
    assert_eq!(arena.num_vertices(), 3);
    assert_eq!(arena.init(), 1);
    assert_eq!(arena.owner(1), PLAYER);
    let colors: Vec<u32> = arena.out(1).map(|(_, e)| e.color).collect();
    assert_eq!(colors, vec![5, 5]);
    assert!(arena.validate().is_ok());

    let written = write_pgsolver(&arena);
    let reread = parse_pgsolver(&written).unwrap();
    assert_eq!(reread.num_edges(), arena.num_edges());
    assert_eq!(reread.init(), arena.init());
    // Writing keeps edge colors as priorities, reading shifts them by two.
    let reread_colors: Vec<u32> = reread.out(1).map(|(_, e)| e.color).collect();
    assert_eq!(reread_colors, vec![7, 7]);
}

#[test]
fn pgsolver_errors() {
    assert_eq!(parse_pgsolver("parity 1;\n").err(), Some(ParseError::Empty));
    assert_eq!(
        parse_pgsolver("0 1 0 1;\n").err(),
        Some(ParseError::UndeclaredVertex(1))
    );
    assert_eq!(
        parse_pgsolver("0 1 0 0;\n0 2 1 0;\n").err(),
        Some(ParseError::DuplicateVertex(0))
    );
    assert!(matches!(
        parse_pgsolver("0 1 2 0;\n"),
        Err(ParseError::Syntax { line: 1, .. })
    ));
}

#[test]
fn pgsolver_rejects_oversized_priorities() {
    for priority in [u32::MAX, u32::MAX - 1, MAX_COLOR - 1] {
        let game = format!("0 {priority} 0 0;\n");
        assert!(matches!(
            parse_pgsolver(&game),
            Err(ParseError::Syntax { line: 1, .. })
        ));
    }
    let game = format!("0 {} 0 0;\n", MAX_COLOR - 2);
    let arena = parse_pgsolver(&game).unwrap();
    assert_eq!(arena.max_color(), MAX_COLOR);
    assert!(arena.validate().is_ok());
}

/// Vertices `0` and `1` form an odd cycle won by the player, vertex `2` is an even
/// self-loop won by the environment.
#[test]
fn pgsolver_solution_lists_winners_and_strategies() {
    init_logger();
    let game = "parity 2;\n0 1 1 1 \"choice\";\n1 0 0 0;\n2 2 0 2;\n";
    let mut arena = parse_pgsolver(game).unwrap();
    assert_eq!(write_solution(&arena), None);

    assert!(solve(&mut arena).unwrap());
    let solution = write_solution(&arena).unwrap();
    assert_eq!(solution, "paritysol 2;\n0 1 1;\n1 1;\n2 0 2;\n");
}
