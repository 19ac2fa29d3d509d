//! Staged execution pipeline.
//!
//! A [`Pipeline`] is an ordered sequence of named [`Stage`]s; each stage owns
//! an ordered sequence of type-erased systems, a gating configuration, and
//! optionally a nested pipeline of substages. Executing a pipeline executes
//! its stages in order; executing a stage runs its substages first (applying
//! the same rules recursively), then its own systems in registration order.
//!
//! ## Gating and error policy
//! A stage is skipped when it is disabled or when its run condition returns
//! `false`. A failing system is logged; the stage stops at the failure unless
//! it was configured with `continue_on_error`. Sibling stages are never
//! aborted by a failure.
//!
//! ## Structural consistency
//! Stage names are unique within one nesting level. The name→index map is
//! rebuilt from scratch after every structural change so it always agrees
//! with the stage sequence.
//!
//! ## Parallelism
//! The `parallel` stage flag is reserved. It is currently ignored: stages and
//! systems always execute sequentially on the caller's thread.

use rustc_hash::FxHashMap;

use crate::engine::error::PipelineError;
use crate::engine::registry::Registry;
use crate::engine::systems::System;

/// Predicate deciding whether a stage runs in a given registry state.
pub type RunCondition = Box<dyn Fn(&Registry) -> bool>;

/// Combination mode for multi-stage predicates.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Match {
    /// Every named stage must satisfy the predicate.
    All,

    /// At least one named stage must satisfy the predicate.
    Any,
}

/// Per-stage execution configuration.
pub struct StageConfig {
    /// Disabled stages are skipped entirely.
    pub enabled: bool,

    /// Whether remaining systems in the stage still run after one fails.
    pub continue_on_error: bool,

    /// Optional gate evaluated against the registry before the stage runs.
    pub run_condition: Option<RunCondition>,

    /// Reserved. Execution is sequential regardless of this flag.
    pub parallel: bool,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            continue_on_error: false,
            run_condition: None,
            parallel: false,
        }
    }
}

impl StageConfig {
    /// Default configuration: enabled, stop on error, no condition.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Sets the error policy.
    pub fn continue_on_error(mut self, continue_on_error: bool) -> Self {
        self.continue_on_error = continue_on_error;
        self
    }

    /// Sets the run condition.
    pub fn run_condition(mut self, condition: impl Fn(&Registry) -> bool + 'static) -> Self {
        self.run_condition = Some(Box::new(condition));
        self
    }
}

/// A named, ordered bucket of systems with gating and error policy.
pub struct Stage {
    name: String,
    config: StageConfig,
    systems: Vec<Box<dyn System>>,
    substages: Option<Pipeline>,
}

impl Stage {
    fn new(name: String, config: StageConfig) -> Self {
        Self {
            name,
            config,
            systems: Vec::new(),
            substages: None,
        }
    }

    /// Name of this stage.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns `true` if the stage participates in execution.
    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Enables or disables the stage.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.config.enabled = enabled;
    }

    /// Returns `true` if no systems are registered in this stage.
    ///
    /// Substages are not considered; only the stage's own system list.
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    /// Names of the registered systems, in registration order.
    pub fn system_names(&self) -> Vec<&str> {
        self.systems.iter().map(|system| system.name()).collect()
    }

    /// The nested substage pipeline, if one exists.
    pub fn substages(&self) -> Option<&Pipeline> {
        self.substages.as_ref()
    }

    /// Mutable access to the nested substage pipeline, if one exists.
    pub fn substages_mut(&mut self) -> Option<&mut Pipeline> {
        self.substages.as_mut()
    }

    fn substages_or_default(&mut self) -> &mut Pipeline {
        self.substages.get_or_insert_with(Pipeline::new)
    }

    /// Appends a substage. Substages run before the stage's own systems.
    pub fn add_substage(
        &mut self,
        name: impl Into<String>,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        self.substages_or_default().add_stage(name, config)
    }

    /// Inserts a substage immediately after the substage named `after`.
    pub fn add_substage_after(
        &mut self,
        name: impl Into<String>,
        after: &str,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        self.substages_or_default().add_stage_after(name, after, config)
    }

    /// Inserts a substage immediately before the substage named `before`.
    pub fn add_substage_before(
        &mut self,
        name: impl Into<String>,
        before: &str,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        self.substages_or_default().add_stage_before(name, before, config)
    }

    /// Removes a substage, tearing down its systems.
    pub fn remove_substage(&mut self, name: &str) -> Result<(), PipelineError> {
        match &mut self.substages {
            Some(substages) => substages.remove_stage(name),
            None => Err(PipelineError::StageNotFound { name: name.to_string() }),
        }
    }

    fn add_boxed(&mut self, system: Box<dyn System>) {
        self.systems.push(system);
    }

    /// Runs this stage against the registry.
    ///
    /// 1. Skips if disabled.
    /// 2. Skips if the run condition returns `false`.
    /// 3. Executes the substage pipeline, recursively applying these rules.
    /// 4. Executes own systems in registration order; a failing system is
    ///    logged and stops the stage unless `continue_on_error` is set.
    pub(crate) fn execute(&mut self, registry: &mut Registry) {
        if !self.config.enabled {
            tracing::trace!(stage = %self.name, "stage disabled; skipping");
            return;
        }

        if let Some(condition) = &self.config.run_condition {
            if !condition(registry) {
                tracing::trace!(stage = %self.name, "run condition not met; skipping");
                return;
            }
        }

        if let Some(substages) = &mut self.substages {
            substages.execute(registry);
        }

        for system in &mut self.systems {
            if let Err(error) = system.process(registry) {
                tracing::error!(
                    stage = %self.name,
                    system = system.name(),
                    %error,
                    "system failed"
                );
                if !self.config.continue_on_error {
                    break;
                }
            }
        }
    }

    pub(crate) fn teardown(&mut self) {
        if let Some(substages) = &mut self.substages {
            substages.teardown();
        }
        for system in &mut self.systems {
            system.teardown();
        }
        self.systems.clear();
    }
}

/// An ordered sequence of stages with a name→index map kept consistent with
/// the sequence.
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Stage>,
    index: FxHashMap<String, usize>,
}

impl Pipeline {
    /// Creates an empty pipeline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stages.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns `true` if no stages exist.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Removes every stage, tearing down their systems and substages.
    pub fn clear(&mut self) {
        self.teardown();
        self.stages.clear();
        self.index.clear();
    }

    fn rebuild_index(&mut self) {
        self.index.clear();
        for (position, stage) in self.stages.iter().enumerate() {
            self.index.insert(stage.name.clone(), position);
        }
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    fn ensure_unique(&self, name: &str) -> Result<(), PipelineError> {
        if self.index.contains_key(name) {
            Err(PipelineError::DuplicateStage { name: name.to_string() })
        } else {
            Ok(())
        }
    }

    /// Appends a stage.
    ///
    /// ## Errors
    /// `DuplicateStage` if a stage with this name already exists at this
    /// nesting level.
    pub fn add_stage(
        &mut self,
        name: impl Into<String>,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        self.ensure_unique(&name)?;
        self.index.insert(name.clone(), self.stages.len());
        self.stages.push(Stage::new(name, config));
        Ok(())
    }

    /// Inserts a stage immediately after the stage named `after`.
    ///
    /// ## Errors
    /// `DuplicateStage` if the name is taken; `StageNotFound` if `after` does
    /// not exist.
    pub fn add_stage_after(
        &mut self,
        name: impl Into<String>,
        after: &str,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let anchor = self
            .position(after)
            .ok_or_else(|| PipelineError::StageNotFound { name: after.to_string() })?;
        self.stages.insert(anchor + 1, Stage::new(name, config));
        self.rebuild_index();
        Ok(())
    }

    /// Inserts a stage immediately before the stage named `before`.
    ///
    /// ## Errors
    /// `DuplicateStage` if the name is taken; `StageNotFound` if `before`
    /// does not exist.
    pub fn add_stage_before(
        &mut self,
        name: impl Into<String>,
        before: &str,
        config: StageConfig,
    ) -> Result<(), PipelineError> {
        let name = name.into();
        self.ensure_unique(&name)?;
        let anchor = self
            .position(before)
            .ok_or_else(|| PipelineError::StageNotFound { name: before.to_string() })?;
        self.stages.insert(anchor, Stage::new(name, config));
        self.rebuild_index();
        Ok(())
    }

    /// Removes a stage with ordered semantics, tearing down its systems and
    /// any substage pipeline.
    pub fn remove_stage(&mut self, name: &str) -> Result<(), PipelineError> {
        let position = self
            .position(name)
            .ok_or_else(|| PipelineError::StageNotFound { name: name.to_string() })?;
        let mut stage = self.stages.remove(position);
        stage.teardown();
        self.rebuild_index();
        Ok(())
    }

    /// Registers a default-constructed system of type `S` into a stage.
    pub fn add_system<S: System + Default>(&mut self, stage: &str) -> Result<(), PipelineError> {
        self.add_boxed(stage, Box::new(S::default()))
    }

    /// Registers an already-constructed, type-erased system into a stage.
    pub fn add_boxed(
        &mut self,
        stage: &str,
        system: Box<dyn System>,
    ) -> Result<(), PipelineError> {
        let position = self
            .position(stage)
            .ok_or_else(|| PipelineError::StageNotFound { name: stage.to_string() })?;
        self.stages[position].add_boxed(system);
        Ok(())
    }

    /// Registers several systems into a stage, in order.
    pub fn add_systems(
        &mut self,
        stage: &str,
        systems: Vec<Box<dyn System>>,
    ) -> Result<(), PipelineError> {
        let position = self
            .position(stage)
            .ok_or_else(|| PipelineError::StageNotFound { name: stage.to_string() })?;
        for system in systems {
            self.stages[position].add_boxed(system);
        }
        Ok(())
    }

    /// Borrows a stage by name.
    pub fn get_stage(&self, name: &str) -> Option<&Stage> {
        self.position(name).map(|position| &self.stages[position])
    }

    /// Mutably borrows a stage by name.
    pub fn get_stage_mut(&mut self, name: &str) -> Option<&mut Stage> {
        self.position(name).map(|position| &mut self.stages[position])
    }

    /// Returns `true` if a stage with this name exists.
    pub fn has_stage(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Checks several stage names at once.
    pub fn has_stages(&self, names: &[&str], combine: Match) -> bool {
        match combine {
            Match::All => names.iter().all(|name| self.has_stage(name)),
            Match::Any => names.iter().any(|name| self.has_stage(name)),
        }
    }

    /// Names of every stage, in pipeline order.
    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Names of the systems registered in a stage, in registration order.
    pub fn system_names(&self, stage: &str) -> Result<Vec<&str>, PipelineError> {
        self.get_stage(stage)
            .map(|stage| stage.system_names())
            .ok_or_else(|| PipelineError::StageNotFound { name: stage.to_string() })
    }

    /// Returns `true` if the named stage has no systems.
    pub fn stage_empty(&self, name: &str) -> Result<bool, PipelineError> {
        self.get_stage(name)
            .map(Stage::is_empty)
            .ok_or_else(|| PipelineError::StageNotFound { name: name.to_string() })
    }

    /// Checks the emptiness of several stages at once.
    pub fn stages_empty(&self, names: &[&str], combine: Match) -> Result<bool, PipelineError> {
        let mut empties = Vec::with_capacity(names.len());
        for name in names {
            empties.push(self.stage_empty(name)?);
        }
        Ok(match combine {
            Match::All => empties.iter().all(|empty| *empty),
            Match::Any => empties.iter().any(|empty| *empty),
        })
    }

    /// Executes every stage in pipeline order.
    ///
    /// System failures are logged and contained by their stage; they never
    /// propagate out of this call.
    pub fn execute(&mut self, registry: &mut Registry) {
        for stage in &mut self.stages {
            stage.execute(registry);
        }
    }

    /// Executes the named stages in pipeline order.
    ///
    /// Unknown names are logged and skipped. Indices are sorted ascending
    /// before execution so pipeline order is preserved regardless of the
    /// order of `names`; a name listed twice executes twice.
    pub fn execute_stages(&mut self, registry: &mut Registry, names: &[&str]) {
        let mut positions = Vec::with_capacity(names.len());
        for name in names {
            match self.position(name) {
                Some(position) => positions.push(position),
                None => {
                    tracing::warn!(stage = %name, "unknown stage in execute_stages; skipping");
                }
            }
        }
        positions.sort_unstable();

        for position in positions {
            self.stages[position].execute(registry);
        }
    }

    /// Executes every stage whose name satisfies `predicate`, in pipeline
    /// order.
    pub fn execute_stages_if(
        &mut self,
        registry: &mut Registry,
        predicate: impl Fn(&str) -> bool,
    ) {
        for stage in &mut self.stages {
            if predicate(stage.name()) {
                stage.execute(registry);
            }
        }
    }

    /// Tears down every system in every stage and substage.
    pub(crate) fn teardown(&mut self) {
        for stage in &mut self.stages {
            stage.teardown();
        }
    }
}
