//! Plugin bundling.
//!
//! A [`Plugin`] pairs a name with an initialization callback and an optional
//! teardown callback. The registry invokes `init` when the plugin is added
//! and `teardown` (in registration order) when the registry is dropped,
//! before the pipeline and resource teardowns.

use crate::engine::registry::Registry;

/// Callback operating on the registry during plugin lifecycle events.
pub type PluginFn = Box<dyn FnMut(&mut Registry)>;

/// A named pair of initialization and teardown callbacks.
pub struct Plugin {
    name: String,
    init: Option<PluginFn>,
    teardown: Option<PluginFn>,
}

impl Plugin {
    /// Creates a plugin with an initialization callback and no teardown.
    pub fn new(name: impl Into<String>, init: impl FnMut(&mut Registry) + 'static) -> Self {
        Self {
            name: name.into(),
            init: Some(Box::new(init)),
            teardown: None,
        }
    }

    /// Attaches a teardown callback.
    pub fn with_teardown(mut self, teardown: impl FnMut(&mut Registry) + 'static) -> Self {
        self.teardown = Some(Box::new(teardown));
        self
    }

    /// Name of this plugin.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn take_init(&mut self) -> Option<PluginFn> {
        self.init.take()
    }

    pub(crate) fn take_teardown(&mut self) -> Option<PluginFn> {
        self.teardown.take()
    }
}
