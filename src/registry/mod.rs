// src/registry/mod.rs

//! Immutable task registry.
//!
//! Tasks and watch rules are collected through [`RegistryBuilder`] and then
//! frozen into a [`TaskRegistry`], which is shared (behind an `Arc`) by the
//! runner, the watcher and the engine. Once built, the dependency graph is
//! known to be acyclic and every referenced task exists.

use std::collections::{HashMap, HashSet};

use crate::config::model::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::runner::inputs::InputSpec;
use crate::watch::patterns::{WatchRule, rules_from_config};

pub mod builder;
pub mod task;

pub use builder::RegistryBuilder;
pub use task::Task;

/// Canonical task name type.
pub type TaskName = String;

#[derive(Debug)]
pub struct TaskRegistry {
    tasks: Vec<Task>,
    index: HashMap<TaskName, usize>,
    inputs: HashMap<TaskName, InputSpec>,
    watch_rules: Vec<WatchRule>,
}

impl TaskRegistry {
    pub(crate) fn new(
        tasks: Vec<Task>,
        index: HashMap<TaskName, usize>,
        inputs: HashMap<TaskName, InputSpec>,
        watch_rules: Vec<WatchRule>,
    ) -> Self {
        Self {
            tasks,
            index,
            inputs,
            watch_rules,
        }
    }

    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Register every task and watch rule of a validated config.
    pub fn from_config(cfg: &ConfigFile) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        for (name, task) in cfg.tasks() {
            builder.register(Task::from_config(name.clone(), task))?;
        }
        for rule in rules_from_config(cfg)? {
            builder.register_watch(rule)?;
        }
        builder.build()
    }

    pub fn get(&self, name: &str) -> Option<&Task> {
        self.index.get(name).map(|&i| &self.tasks[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Tasks in registration order.
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn inputs_of(&self, name: &str) -> Option<&InputSpec> {
        self.inputs.get(name)
    }

    pub fn watch_rules(&self) -> &[WatchRule] {
        &self.watch_rules
    }

    /// Tasks to run for an invocation of `name`: dependencies first,
    /// depth-first in declaration order, each task once, `name` last.
    pub fn execution_order(&self, name: &str) -> Result<Vec<TaskName>> {
        if !self.contains(name) {
            return Err(AssetdagError::UnknownTask {
                task: name.to_string(),
                referrer: "invocation".to_string(),
            });
        }
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        self.visit(name, &mut seen, &mut order);
        Ok(order)
    }

    fn visit(&self, name: &str, seen: &mut HashSet<TaskName>, order: &mut Vec<TaskName>) {
        if !seen.insert(name.to_string()) {
            return;
        }
        if let Some(task) = self.get(name) {
            for dep in task.deps() {
                self.visit(dep, seen, order);
            }
        }
        order.push(name.to_string());
    }

    /// Whether running `name` (or one of its dependencies) enters watch mode.
    pub fn enters_watch_mode(&self, name: &str) -> bool {
        self.execution_order(name)
            .map(|order| order.iter().any(|t| self.get(t).is_some_and(Task::watches)))
            .unwrap_or(false)
    }
}
