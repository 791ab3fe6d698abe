use crate::model::{CounterModel, CubeConfig, ExplicitModel, KripkeCube, Model};
use crate::state::Compression;

#[test]
fn counter_successors_increment_one_counter() {
    let model = CounterModel::new(3, 2);
    let mut seen = Vec::new();
    let count = model.successors(&[0, 2, 1], &mut |s| seen.push(s.to_vec()));
    assert_eq!(count, 2);
    assert_eq!(seen, vec![vec![1, 2, 1], vec![0, 2, 2]]);
    assert_eq!(model.count_successors(&[2, 2, 2]), 0);
    assert_eq!(CounterModel::wrapping(3, 2).count_successors(&[2, 2, 2]), 3);
    assert_eq!(model.num_states(), 27);
    assert_eq!(model.variable_names(), vec!["c0", "c1", "c2"]);
}

#[test]
fn cube_selfloopizes_deadlocks() {
    let model = ExplicitModel::chain(2);
    for selfloopize in [true, false] {
        let config = CubeConfig {
            compression: Compression::RunLength,
            selfloopize,
        };
        let mut cube = KripkeCube::new(&model, config);
        let init = cube.initial();
        let init = cube.share(init).unwrap();

        let mut it = cube.succ(&init);
        assert_eq!(it.transitions(), 1);
        let next = it.next().unwrap();
        assert!(it.is_done());
        cube.recycle(it);
        let next_state = cube.share(next).unwrap();
        assert_eq!(cube.valuation(&next_state), vec![1]);

        let mut it = cube.succ(&next_state);
        assert_eq!(it.transitions(), 0);
        assert_eq!(it.len(), usize::from(selfloopize));
        if let Some(handle) = it.next() {
            assert_eq!(cube.share(handle).unwrap(), next_state);
            cube.release(handle);
        }
        cube.recycle(it);
    }
}

#[test]
fn recycling_releases_unvisited_successors() {
    let model = CounterModel::new(4, 1);
    let mut cube = KripkeCube::new(&model, CubeConfig::default());
    let init = cube.initial();
    let state = cube.share(init).unwrap();
    cube.release(init);
    assert_eq!(cube.manager().live(), 0);

    let mut it = cube.succ(&state);
    assert_eq!(it.len(), 4);
    assert_eq!(cube.manager().live(), 4);
    let first = it.next().unwrap();
    cube.recycle(it);
    // Only the yielded successor is still alive.
    assert_eq!(cube.manager().live(), 1);
    assert!(cube.release(first));
    assert_eq!(cube.manager().live(), 0);

    // The recycled iterator is reused and starts fresh.
    let it = cube.succ(&state);
    assert_eq!(it.len(), 4);
    assert!(!it.is_done());
}
