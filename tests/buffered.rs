use stratum_ecs::Registry;

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pos {
    x: i32,
}
#[derive(Debug, Clone, Copy, PartialEq)]
struct Vel {
    dx: i32,
}

#[test]
fn buffered_writes_do_not_touch_live_cells_until_applied() {
    let mut registry = Registry::default();
    registry.spawn((Pos { x: 0 },)).unwrap();

    for view in registry.query_buffered::<(Pos,)>().unwrap() {
        view.write(Pos { x: 5 }).unwrap();
        // The live cell is unchanged while the update sits in the queue.
        assert_eq!(view.read::<Pos>(), Some(&Pos { x: 0 }));
    }

    assert!(registry.has_pending_updates());
    let live = registry.query::<(Pos,)>().unwrap().next().unwrap();
    assert_eq!(live.get::<Pos>(), Some(&Pos { x: 0 }));

    registry.apply_buffered_updates();
    assert!(!registry.has_pending_updates());

    let live = registry.query::<(Pos,)>().unwrap().next().unwrap();
    assert_eq!(live.get::<Pos>(), Some(&Pos { x: 5 }));
}

#[test]
fn last_writer_wins_per_cell() {
    let mut registry = Registry::default();
    let entity = registry.spawn((Pos { x: 0 },)).unwrap();

    for view in registry.query_buffered::<(Pos,)>().unwrap() {
        view.write(Pos { x: 5 }).unwrap();
        view.write(Pos { x: 7 }).unwrap();
    }
    assert_eq!(registry.pending_update_count(), 2);

    registry.apply_buffered_updates();

    let view = registry.query::<(Pos,)>().unwrap().next().unwrap();
    assert_eq!(view.entity(), entity);
    assert_eq!(view.get::<Pos>(), Some(&Pos { x: 7 }));
}

#[test]
fn updates_apply_in_fifo_order_across_components() {
    let mut registry = Registry::default();
    registry.spawn((Pos { x: 1 }, Vel { dx: 2 })).unwrap();

    for view in registry.query_buffered::<(Pos, Vel)>().unwrap() {
        view.write(Pos { x: 10 }).unwrap();
        view.write(Vel { dx: 20 }).unwrap();
        view.write(Pos { x: 30 }).unwrap();
    }

    registry.apply_buffered_updates();

    let view = registry.query::<(Pos, Vel)>().unwrap().next().unwrap();
    assert_eq!(view.get::<Pos>(), Some(&Pos { x: 30 }));
    assert_eq!(view.get::<Vel>(), Some(&Vel { dx: 20 }));
}

#[test]
fn applying_an_empty_buffer_is_a_no_op() {
    let mut registry = Registry::default();
    registry.spawn((Pos { x: 3 },)).unwrap();

    assert!(!registry.has_pending_updates());
    registry.apply_buffered_updates();

    let view = registry.query::<(Pos,)>().unwrap().next().unwrap();
    assert_eq!(view.get::<Pos>(), Some(&Pos { x: 3 }));
}

#[test]
fn discard_clears_the_queue_without_applying() {
    let mut registry = Registry::default();
    registry.spawn((Pos { x: 0 },)).unwrap();

    for view in registry.query_buffered::<(Pos,)>().unwrap() {
        view.write(Pos { x: 99 }).unwrap();
    }
    assert!(registry.has_pending_updates());

    registry.discard_buffered_updates();
    assert!(!registry.has_pending_updates());

    let view = registry.query::<(Pos,)>().unwrap().next().unwrap();
    assert_eq!(view.get::<Pos>(), Some(&Pos { x: 0 }));
}

#[test]
fn writes_outside_the_queried_set_are_rejected() {
    let mut registry = Registry::default();
    registry.spawn((Pos { x: 0 }, Vel { dx: 0 })).unwrap();

    let view = registry.query_buffered::<(Pos,)>().unwrap().next().unwrap();
    assert!(view.write(Vel { dx: 1 }).is_err());
    drop(view);

    assert!(!registry.has_pending_updates());
}

#[test]
fn buffered_updates_target_each_matched_entity_independently() {
    let mut registry = Registry::default();
    let e1 = registry.spawn((Pos { x: 1 },)).unwrap();
    let e2 = registry.spawn((Pos { x: 2 },)).unwrap();

    for view in registry.query_buffered::<(Pos,)>().unwrap() {
        let current = view.read::<Pos>().unwrap().x;
        view.write(Pos { x: current * 10 }).unwrap();
    }
    registry.apply_buffered_updates();

    for view in registry.query::<(Pos,)>().unwrap() {
        let expected = if view.entity() == e1 { 10 } else { 20 };
        assert_eq!(view.get::<Pos>(), Some(&Pos { x: expected }));
        assert!(view.entity() == e1 || view.entity() == e2);
    }
}
