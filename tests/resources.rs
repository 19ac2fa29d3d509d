use std::cell::Cell;
use std::rc::Rc;

use stratum_ecs::{Registry, ResourceError, ResourceKind, ResourceQuery};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Gravity(f32);
#[derive(Debug, Clone, PartialEq)]
struct Event(String);

#[test]
fn resources_must_be_registered_before_use() {
    let mut registry = Registry::default();

    assert!(!registry.resource_registered::<Gravity>());
    assert!(matches!(
        registry.push_resource(Gravity(9.81)),
        Err(ResourceError::NotRegistered { .. })
    ));
    assert!(matches!(
        registry.query_resource::<Gravity>(),
        Err(ResourceError::NotRegistered { .. })
    ));
}

#[test]
fn repeat_registration_is_rejected() {
    let mut registry = Registry::default();

    registry.register_resource::<Gravity>(ResourceKind::Singleton).unwrap();
    assert!(matches!(
        registry.register_resource::<Gravity>(ResourceKind::Collection),
        Err(ResourceError::AlreadyRegistered { .. })
    ));
    assert_eq!(registry.resource_kind::<Gravity>(), Some(ResourceKind::Singleton));
}

#[test]
fn singleton_push_replaces_the_cell() {
    let mut registry = Registry::default();
    registry.register_resource::<Gravity>(ResourceKind::Singleton).unwrap();

    match registry.query_resource::<Gravity>().unwrap() {
        ResourceQuery::Singleton(cell) => assert!(cell.is_none()),
        ResourceQuery::Collection(_) => panic!("singleton resource answered as collection"),
    }

    registry.push_resource(Gravity(9.81)).unwrap();
    registry.push_resource(Gravity(1.62)).unwrap();

    match registry.query_resource::<Gravity>().unwrap() {
        ResourceQuery::Singleton(cell) => assert_eq!(cell.copied(), Some(Gravity(1.62))),
        ResourceQuery::Collection(_) => panic!("singleton resource answered as collection"),
    }
}

#[test]
fn singleton_query_allows_in_place_mutation() {
    let mut registry = Registry::default();
    registry.register_resource::<Gravity>(ResourceKind::Singleton).unwrap();
    registry.push_resource(Gravity(1.0)).unwrap();

    if let ResourceQuery::Singleton(Some(gravity)) = registry.query_resource::<Gravity>().unwrap() {
        gravity.0 = 2.0;
    } else {
        panic!("singleton cell should be occupied");
    }

    match registry.query_resource::<Gravity>().unwrap() {
        ResourceQuery::Singleton(cell) => assert_eq!(cell.copied(), Some(Gravity(2.0))),
        ResourceQuery::Collection(_) => unreachable!(),
    }
}

#[test]
fn collections_preserve_push_order() {
    let mut registry = Registry::default();
    registry.register_resource::<Event>(ResourceKind::Collection).unwrap();

    for label in ["first", "second", "third"] {
        registry.push_resource(Event(label.to_string())).unwrap();
    }

    let labels: Vec<String> = match registry.query_resource::<Event>().unwrap() {
        ResourceQuery::Collection(values) => values.map(|event| event.0.clone()).collect(),
        ResourceQuery::Singleton(_) => panic!("collection resource answered as singleton"),
    };
    assert_eq!(labels, ["first", "second", "third"]);
}

#[test]
fn collection_removal_is_ordered() {
    let mut registry = Registry::default();
    registry.register_resource::<Event>(ResourceKind::Collection).unwrap();

    for label in ["a", "b", "c"] {
        registry.push_resource(Event(label.to_string())).unwrap();
    }

    registry.remove_resource::<Event>(1).unwrap();

    let labels: Vec<String> = match registry.query_resource::<Event>().unwrap() {
        ResourceQuery::Collection(values) => values.map(|event| event.0.clone()).collect(),
        ResourceQuery::Singleton(_) => unreachable!(),
    };
    assert_eq!(labels, ["a", "c"]);

    assert!(matches!(
        registry.remove_resource::<Event>(5),
        Err(ResourceError::IndexOutOfBounds { index: 5, length: 2 })
    ));
}

#[derive(Clone)]
struct Session(Rc<Cell<u32>>);

impl Drop for Session {
    fn drop(&mut self) {
        self.0.set(self.0.get() + 1);
    }
}

#[test]
fn replaced_singleton_values_are_torn_down() {
    let drops = Rc::new(Cell::new(0));
    let mut registry = Registry::default();
    registry.register_resource::<Session>(ResourceKind::Singleton).unwrap();

    registry.push_resource(Session(Rc::clone(&drops))).unwrap();
    registry.push_resource(Session(Rc::clone(&drops))).unwrap();
    assert_eq!(drops.get(), 1);

    registry.remove_resource::<Session>(0).unwrap();
    assert_eq!(drops.get(), 2);
}

#[test]
fn clearing_a_collection_tears_down_every_value() {
    let drops = Rc::new(Cell::new(0));
    let mut registry = Registry::default();
    registry.register_resource::<Session>(ResourceKind::Collection).unwrap();

    for _ in 0..3 {
        registry.push_resource(Session(Rc::clone(&drops))).unwrap();
    }
    registry.clear_resource::<Session>().unwrap();
    assert_eq!(drops.get(), 3);
}

#[test]
fn registry_drop_tears_down_remaining_resources() {
    let drops = Rc::new(Cell::new(0));
    {
        let mut registry = Registry::default();
        registry.register_resource::<Session>(ResourceKind::Collection).unwrap();
        registry.push_resource(Session(Rc::clone(&drops))).unwrap();
        registry.push_resource(Session(Rc::clone(&drops))).unwrap();
    }
    assert_eq!(drops.get(), 2);
}
