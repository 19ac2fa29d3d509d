#![allow(dead_code)]

use stratum_ecs::{Registry, RegistryConfig};

pub const ENTITIES_SMALL: usize = 10_000;
pub const ENTITIES_MED: usize = 100_000;

#[derive(Clone, Copy)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy)]
pub struct Velocity {
    pub dx: f32,
    pub dy: f32,
}

#[derive(Clone, Copy)]
pub struct Mass(pub f32);

pub fn make_registry() -> Registry {
    Registry::new(RegistryConfig { destroy_empty_archetypes: true })
}

pub fn populate(registry: &mut Registry, n: usize) {
    for i in 0..n {
        let f = i as f32;
        registry
            .spawn((
                Position { x: f, y: -f },
                Velocity { dx: 1.0, dy: 0.5 },
                Mass(1.0 + f),
            ))
            .unwrap();
    }
}
