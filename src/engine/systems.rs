//! System abstractions for the execution pipeline.
//!
//! A **system** is a unit of logic that reads and mutates entity and resource
//! state through the registry. Systems are registered into named pipeline
//! stages and executed sequentially in registration order.
//!
//! The [`System`] trait defines the minimal interface:
//!
//! - [`System::process`] executes the system logic (mandatory),
//! - [`System::name`] provides a diagnostic label,
//! - [`System::teardown`] runs when the owning stage is removed or the
//!   pipeline is torn down.
//!
//! Stages store systems behind `Box<dyn System>`: a fat handle pairing the
//! instance pointer with a vtable of `drop`/`process`/`teardown`. For
//! lightweight logic, [`FnSystem`] adapts a closure into a system without
//! requiring a dedicated type.

use crate::engine::error::SystemError;
use crate::engine::registry::Registry;

/// A unit of executable logic operating on the registry.
pub trait System: 'static {
    /// Diagnostic name of this system, used in logs and introspection.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Executes the system logic against the registry.
    ///
    /// Returning an error stops the current stage unless the stage was
    /// configured with `continue_on_error`.
    fn process(&mut self, registry: &mut Registry) -> Result<(), SystemError>;

    /// Releases resources held by the system. Invoked exactly once, when the
    /// owning stage is removed or the pipeline is torn down.
    fn teardown(&mut self) {}
}

/// A [`System`] backed by a function or closure.
///
/// Stores a diagnostic name and the executable function. This is the
/// preferred mechanism for small simulation logic, as it avoids a type
/// definition while remaining fully schedulable.
///
/// ```ignore
/// pipeline.add_boxed("update", Box::new(FnSystem::new("gravity", |registry| {
///     for mut view in registry.query::<(Velocity,)>()? {
///         view.get_mut::<Velocity>().unwrap().y -= 9.81;
///     }
///     Ok(())
/// })))?;
/// ```
pub struct FnSystem<F>
where
    F: FnMut(&mut Registry) -> Result<(), SystemError> + 'static,
{
    name: &'static str,
    f: F,
}

impl<F> FnSystem<F>
where
    F: FnMut(&mut Registry) -> Result<(), SystemError> + 'static,
{
    /// Creates a new function-backed system.
    pub fn new(name: &'static str, f: F) -> Self {
        Self { name, f }
    }
}

impl<F> System for FnSystem<F>
where
    F: FnMut(&mut Registry) -> Result<(), SystemError> + 'static,
{
    fn name(&self) -> &str {
        self.name
    }

    fn process(&mut self, registry: &mut Registry) -> Result<(), SystemError> {
        (self.f)(registry)
    }
}
