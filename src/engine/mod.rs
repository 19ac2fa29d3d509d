//! # Engine Module
//!
//! Internal ECS engine implementation.
//!
//! This module contains all core building blocks:
//! - Archetype tables and type-erased column storage
//! - Entity identity and location tracking
//! - Query execution and buffered updates
//! - Resources and plugins
//! - The staged execution pipeline and systems
//!
//! Public API exposure is controlled by `lib.rs`.

pub mod archetype;
pub mod component;
pub mod entity;
pub mod error;
pub mod pipeline;
pub mod plugin;
pub mod query;
pub mod registry;
pub mod resource;
pub mod storage;
pub mod systems;
pub mod types;
pub mod update;
