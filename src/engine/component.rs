//! Component identity, naming, and bundle abstractions.
//!
//! This module decouples component type information (canonical name, name
//! hash, `TypeId`) from runtime storage, enabling archetypes to key
//! heterogeneous columns behind a stable, order-independent identity.
//!
//! ## Naming and hashing
//! Every component type is identified by its canonical name, the string
//! produced by [`std::any::type_name`]. The name is folded into a 64-bit
//! hash with `FxHasher`; an archetype's identity is the XOR of the hashes of
//! its component names. Because XOR is commutative, the identity of a
//! component *set* is independent of insertion order, and adding a component
//! hash to an archetype hash yields the hash of the grown set.
//!
//! ## Bundles and sets
//! [`ComponentBundle`] groups heterogeneous component *values* for spawning;
//! [`ComponentSet`] groups component *types* for query matching. Both are
//! implemented for tuples of one through eight members.

use std::any::TypeId;
use std::hash::Hasher;

use rustc_hash::FxHasher;
use smallvec::SmallVec;

use crate::engine::error::EcsResult;
use crate::engine::registry::Registry;
use crate::engine::types::EntityId;

/// Canonical name of a component type, as produced by [`std::any::type_name`].
///
/// The name doubles as the column key inside an archetype; `&'static str`
/// keys are already interned by the compiler.
pub type ComponentName = &'static str;

/// Returns the canonical name for component type `C`.
#[inline]
pub fn component_name<C: 'static>() -> ComponentName {
    std::any::type_name::<C>()
}

/// Hashes a canonical component name into its 64-bit archetype contribution.
#[inline]
pub fn name_hash(name: &str) -> u64 {
    let mut hasher = FxHasher::default();
    hasher.write(name.as_bytes());
    hasher.finish()
}

/// Returns the archetype hash contribution of component type `C`.
#[inline]
pub fn component_hash<C: 'static>() -> u64 {
    name_hash(component_name::<C>())
}

/// Describes a component type participating in a query or migration.
///
/// ## Notes
/// `ComponentInfo` is `Copy` and safe to clone freely for matching and
/// diagnostics.

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ComponentInfo {
    /// Runtime `TypeId` of the component.
    pub type_id: TypeId,

    /// Canonical component name used as the column key.
    pub name: ComponentName,

    /// Contribution of this component to an archetype hash.
    pub hash: u64,
}

impl ComponentInfo {
    /// Builds the descriptor for component type `C`.
    #[inline]
    pub fn of<C: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<C>(),
            name: component_name::<C>(),
            hash: component_hash::<C>(),
        }
    }
}

/// A compile-time set of component types used to match archetypes.
///
/// Implemented for tuples of one through eight distinct component types.
/// Distinctness is validated at query construction; a duplicated member
/// yields an `InvalidQuery` error rather than matching nothing.
pub trait ComponentSet {
    /// Descriptors for every member type, in tuple order.
    fn descriptors() -> SmallVec<[ComponentInfo; 8]>;
}

/// A group of component values attached to an entity in one spawn call.
///
/// Members are added in declared order, so `spawn((a, b, c))` reaches a state
/// indistinguishable from `create_entity` followed by three `add_component`
/// calls.
pub trait ComponentBundle {
    /// Adds every member of the bundle to `entity`, in declared order.
    fn add_to(self, registry: &mut Registry, entity: EntityId) -> EcsResult<()>;
}

macro_rules! impl_component_tuples {
    ($($member:ident),+) => {
        impl<$($member: 'static),+> ComponentSet for ($($member,)+) {
            fn descriptors() -> SmallVec<[ComponentInfo; 8]> {
                let mut out = SmallVec::new();
                $(out.push(ComponentInfo::of::<$member>());)+
                out
            }
        }

        impl<$($member: 'static),+> ComponentBundle for ($($member,)+) {
            #[allow(non_snake_case)]
            fn add_to(self, registry: &mut Registry, entity: EntityId) -> EcsResult<()> {
                let ($($member,)+) = self;
                $(registry.add_component(entity, $member)?;)+
                Ok(())
            }
        }
    };
}

impl_component_tuples!(A);
impl_component_tuples!(A, B);
impl_component_tuples!(A, B, C);
impl_component_tuples!(A, B, C, D);
impl_component_tuples!(A, B, C, D, E);
impl_component_tuples!(A, B, C, D, E, F);
impl_component_tuples!(A, B, C, D, E, F, G);
impl_component_tuples!(A, B, C, D, E, F, G, H);
