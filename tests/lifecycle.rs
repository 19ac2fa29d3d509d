use std::cell::Cell;
use std::rc::Rc;

use stratum_ecs::{component_hash, EcsError, Registry, RegistryConfig, VOID_ARCHETYPE};

#[derive(Debug, Clone, PartialEq)]
struct Name(String);
#[derive(Debug, Clone, Copy, PartialEq)]
struct Health(i32);
#[derive(Debug, Clone, Copy, PartialEq)]
struct Marker;

#[test]
fn created_entity_lands_in_void_archetype() {
    let mut registry = Registry::new(RegistryConfig::default());

    let entity = registry.create_entity().unwrap();

    let pointer = registry.entity_pointer(entity).unwrap();
    assert_eq!(pointer.archetype, VOID_ARCHETYPE);
    assert_eq!(pointer.row, 0);
    assert_eq!(registry.entity_count(), 1);
    assert!(registry.contains_entity(entity));
}

#[test]
fn entity_ids_are_monotonic_and_never_recycled() {
    let mut registry = Registry::default();

    let first = registry.create_entity().unwrap();
    let second = registry.create_entity().unwrap();
    registry.destroy_entity(first).unwrap();
    let third = registry.create_entity().unwrap();

    assert_eq!(second, first + 1);
    assert_eq!(third, second + 1);
    assert!(!registry.contains_entity(first));
}

#[test]
fn create_add_destroy_add() {
    let mut registry = Registry::default();

    let e = registry.create_entity().unwrap();
    registry.add_component(e, Name("Jane".to_string())).unwrap();
    registry.add_component(e, Health(10)).unwrap();
    registry.destroy_entity(e).unwrap();

    let f = registry.create_entity().unwrap();
    registry.add_component(f, Name("Kai".to_string())).unwrap();

    assert!(matches!(
        registry.has_component::<Name>(e),
        Err(EcsError::NoSuchEntity { entity }) if entity == e
    ));

    let matched: Vec<_> = registry
        .query::<(Name,)>()
        .unwrap()
        .map(|view| view.entity())
        .collect();
    assert_eq!(matched, vec![f]);
}

#[test]
fn destroying_a_dead_entity_reports_no_such_entity() {
    let mut registry = Registry::default();
    let entity = registry.create_entity().unwrap();
    registry.destroy_entity(entity).unwrap();

    assert!(matches!(
        registry.destroy_entity(entity),
        Err(EcsError::NoSuchEntity { .. })
    ));
}

#[test]
fn swap_remove_patches_the_relocated_entity() {
    let mut registry = Registry::default();

    let e1 = registry.spawn((Marker,)).unwrap();
    let e2 = registry.spawn((Marker,)).unwrap();
    let e3 = registry.spawn((Marker,)).unwrap();

    registry.destroy_entity(e2).unwrap();

    let marker_hash = component_hash::<Marker>();
    for survivor in [e1, e3] {
        let pointer = registry.entity_pointer(survivor).unwrap();
        assert_eq!(pointer.archetype, marker_hash);
        assert!(pointer.row < 2);
    }

    let archetype = registry.archetype(marker_hash).unwrap();
    assert_eq!(archetype.entity_ids(), &[e1, e3]);
}

#[test]
fn spawn_equals_create_then_add() {
    let mut registry = Registry::default();

    let spawned = registry.spawn((Name("a".to_string()), Health(1))).unwrap();

    let built = registry.create_entity().unwrap();
    registry.add_component(built, Name("b".to_string())).unwrap();
    registry.add_component(built, Health(2)).unwrap();

    let spawned_pointer = registry.entity_pointer(spawned).unwrap();
    let built_pointer = registry.entity_pointer(built).unwrap();
    assert_eq!(spawned_pointer.archetype, built_pointer.archetype);

    let matched: Vec<_> = registry
        .query::<(Name, Health)>()
        .unwrap()
        .map(|view| view.entity())
        .collect();
    assert_eq!(matched.len(), 2);
    assert!(matched.contains(&spawned));
    assert!(matched.contains(&built));
}

#[test]
fn entity_pointers_stay_consistent_with_archetype_rows() {
    let mut registry = Registry::default();

    for _ in 0..8 {
        registry.spawn((Health(7),)).unwrap();
    }
    let victim = registry.spawn((Health(9),)).unwrap();
    registry.spawn((Health(11),)).unwrap();
    registry.destroy_entity(victim).unwrap();

    for archetype in registry.archetypes() {
        for (row, &entity) in archetype.entity_ids().iter().enumerate() {
            let pointer = registry.entity_pointer(entity).unwrap();
            assert_eq!(pointer.archetype, archetype.hash());
            assert_eq!(pointer.row, row);
        }
    }
}

#[derive(Clone)]
struct Tracked(Rc<Cell<u32>>);

impl Drop for Tracked {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn destroy_entity_drops_component_values() {
    let drops = Rc::new(Cell::new(0));
    let mut registry = Registry::default();

    let entity = registry.spawn((Tracked(Rc::clone(&drops)),)).unwrap();
    assert_eq!(drops.get(), 0);

    registry.destroy_entity(entity).unwrap();
    assert_eq!(drops.get(), 1);
}

#[test]
fn registry_drop_releases_stored_components() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut registry = Registry::default();
        registry.spawn((Tracked(Rc::clone(&drops)),)).unwrap();
        registry.spawn((Tracked(Rc::clone(&drops)),)).unwrap();
    }
    assert_eq!(drops.get(), 2);
}

#[test]
fn spawn_failure_destroys_the_half_built_entity() {
    let mut registry = Registry::default();

    // A duplicated member makes the second add fail with DuplicateComponent;
    // the spawned entity must not survive.
    let result = registry.spawn((Health(1), Health(2)));
    assert!(matches!(result, Err(EcsError::DuplicateComponent { .. })));
    assert_eq!(registry.entity_count(), 0);

    let matched = registry.query::<(Health,)>().unwrap().count();
    assert_eq!(matched, 0);
}
