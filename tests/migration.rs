use stratum_ecs::{component_hash, EcsError, Registry, RegistryConfig, VOID_ARCHETYPE};

#[derive(Debug, Clone, Copy, Default)]
struct A;
#[derive(Debug, Clone, Copy, Default)]
struct B;
#[derive(Debug, Clone, Copy, Default)]
struct C;
#[derive(Debug, Clone, Copy, PartialEq)]
struct Weight(f32);

fn destroying_registry() -> Registry {
    Registry::new(RegistryConfig { destroy_empty_archetypes: true })
}

#[test]
fn insertion_order_does_not_change_the_archetype_hash() {
    let mut registry = destroying_registry();

    let e1 = registry.spawn((A, B, C)).unwrap();
    let e2 = registry.spawn((C, A, B)).unwrap();

    let p1 = registry.entity_pointer(e1).unwrap();
    let p2 = registry.entity_pointer(e2).unwrap();
    assert_eq!(p1.archetype, p2.archetype);

    let expected = component_hash::<A>() ^ component_hash::<B>() ^ component_hash::<C>();
    assert_eq!(p1.archetype, expected);

    let matched: Vec<_> = registry
        .query::<(A, B, C)>()
        .unwrap()
        .map(|view| view.entity())
        .collect();
    assert_eq!(matched.len(), 2);
    assert!(matched.contains(&e1));
    assert!(matched.contains(&e2));

    // Intermediate archetypes were destroyed as they emptied: only the void
    // archetype and the ABC archetype remain.
    assert_eq!(registry.archetype_count(), 2);
}

#[test]
fn empty_archetypes_survive_without_the_destroy_flag() {
    let mut registry = Registry::default();

    registry.spawn((A, B)).unwrap();

    // void, {A}, {A,B}
    assert_eq!(registry.archetype_count(), 3);
    let a_only = registry.archetype(component_hash::<A>()).unwrap();
    assert!(a_only.is_empty());
}

#[test]
fn void_archetype_is_never_destroyed() {
    let mut registry = destroying_registry();

    let entity = registry.create_entity().unwrap();
    registry.add_component(entity, A).unwrap();

    assert!(registry.archetype(VOID_ARCHETYPE).is_some());
    assert!(registry.archetype(VOID_ARCHETYPE).unwrap().is_empty());
}

#[test]
fn duplicate_component_add_is_rejected() {
    let mut registry = Registry::default();

    let entity = registry.spawn((Weight(1.0),)).unwrap();
    let result = registry.add_component(entity, Weight(2.0));

    assert!(matches!(result, Err(EcsError::DuplicateComponent { .. })));

    // The entity keeps its original value and location.
    let pointer = registry.entity_pointer(entity).unwrap();
    assert_eq!(pointer.archetype, component_hash::<Weight>());
    let mut query = registry.query::<(Weight,)>().unwrap();
    let view = query.next().unwrap();
    assert_eq!(view.get::<Weight>(), Some(&Weight(1.0)));
}

#[test]
fn migration_carries_existing_component_values() {
    let mut registry = Registry::default();

    let entity = registry.spawn((Weight(42.5),)).unwrap();
    registry.add_component(entity, A).unwrap();
    registry.add_component(entity, B).unwrap();

    let view = registry.query::<(Weight, A, B)>().unwrap().next().unwrap();
    assert_eq!(view.entity(), entity);
    assert_eq!(view.get::<Weight>(), Some(&Weight(42.5)));
}

#[test]
fn migration_patches_the_swapped_entity_in_the_source() {
    let mut registry = Registry::default();

    let e1 = registry.spawn((Weight(1.0),)).unwrap();
    let e2 = registry.spawn((Weight(2.0),)).unwrap();
    let e3 = registry.spawn((Weight(3.0),)).unwrap();

    // Migrating e1 out of {Weight} swaps e3 into row 0.
    registry.add_component(e1, A).unwrap();

    let weight_hash = component_hash::<Weight>();
    assert_eq!(registry.entity_pointer(e3).unwrap().row, 0);
    assert_eq!(registry.entity_pointer(e2).unwrap().row, 1);
    assert_eq!(
        registry.archetype(weight_hash).unwrap().entity_ids(),
        &[e3, e2]
    );
    assert_eq!(
        registry.entity_pointer(e1).unwrap().archetype,
        weight_hash ^ component_hash::<A>()
    );
}

#[test]
fn columns_stay_aligned_with_entity_ids() {
    let mut registry = destroying_registry();

    let e1 = registry.spawn((A, Weight(0.5))).unwrap();
    registry.spawn((A, Weight(1.5))).unwrap();
    registry.add_component(e1, B).unwrap();
    registry.destroy_entity(e1).unwrap();

    for archetype in registry.archetypes() {
        for (_, column) in archetype.columns() {
            assert_eq!(column.len(), archetype.len());
        }
    }
}

#[test]
fn has_component_tracks_the_current_archetype() {
    let mut registry = Registry::default();

    let entity = registry.create_entity().unwrap();
    assert!(!registry.has_component::<A>(entity).unwrap());

    registry.add_component(entity, A).unwrap();
    assert!(registry.has_component::<A>(entity).unwrap());
    assert!(!registry.has_component::<B>(entity).unwrap());
}

#[test]
fn query_matches_supersets_only() {
    let mut registry = Registry::default();

    let ab = registry.spawn((A, B)).unwrap();
    let abc = registry.spawn((A, B, C)).unwrap();
    registry.spawn((A,)).unwrap();

    let matched: Vec<_> = registry
        .query::<(A, B)>()
        .unwrap()
        .map(|view| view.entity())
        .collect();
    assert_eq!(matched.len(), 2);
    assert!(matched.contains(&ab));
    assert!(matched.contains(&abc));

    let exact: Vec<_> = registry
        .query::<(C,)>()
        .unwrap()
        .map(|view| view.entity())
        .collect();
    assert_eq!(exact, vec![abc]);
}

#[test]
fn duplicate_query_members_are_rejected() {
    let mut registry = Registry::default();
    registry.spawn((A,)).unwrap();

    assert!(matches!(
        registry.query::<(A, A)>(),
        Err(EcsError::InvalidQuery { .. })
    ));
}

#[test]
fn in_place_mutation_through_views_sticks() {
    let mut registry = Registry::default();

    let entity = registry.spawn((Weight(1.0),)).unwrap();

    for mut view in registry.query::<(Weight,)>().unwrap() {
        view.get_mut::<Weight>().unwrap().0 += 10.0;
    }

    let view = registry.query::<(Weight,)>().unwrap().next().unwrap();
    assert_eq!(view.entity(), entity);
    assert_eq!(view.get::<Weight>(), Some(&Weight(11.0)));
}

#[test]
fn views_reject_types_outside_the_query() {
    let mut registry = Registry::default();
    registry.spawn((A, Weight(3.0))).unwrap();

    let view = registry.query::<(A,)>().unwrap().next().unwrap();
    assert!(view.get::<Weight>().is_none());
}
