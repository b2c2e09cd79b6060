// src/registry/builder.rs

use std::collections::HashMap;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::debug;

use crate::errors::{AssetdagError, Result};
use crate::registry::{Task, TaskRegistry};
use crate::runner::inputs::InputSpec;
use crate::watch::patterns::WatchRule;

/// Collects tasks and watch rules, then freezes them into a
/// [`TaskRegistry`].
///
/// Registration is append-only: a second task with the same name is an
/// error rather than a replacement.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    tasks: Vec<Task>,
    index: HashMap<String, usize>,
    watch_rules: Vec<WatchRule>,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, task: Task) -> Result<&mut Self> {
        if self.index.contains_key(task.name()) {
            return Err(AssetdagError::DuplicateTask(task.name().to_string()));
        }
        debug!(task = %task.name(), steps = ?task.step_names(), after = ?task.deps(), "registering task");
        self.index.insert(task.name().to_string(), self.tasks.len());
        self.tasks.push(task);
        Ok(self)
    }

    /// Bind a watch rule. Every task it names must already be registered.
    pub fn register_watch(&mut self, rule: WatchRule) -> Result<&mut Self> {
        if let Some(missing) = rule.tasks().iter().find(|t| !self.index.contains_key(*t)) {
            return Err(AssetdagError::UnknownTask {
                task: missing.clone(),
                referrer: format!("watch rule {:?}", rule.globs()),
            });
        }
        self.watch_rules.push(rule);
        Ok(self)
    }

    /// Check dependencies and compile input globs.
    pub fn build(self) -> Result<TaskRegistry> {
        for task in &self.tasks {
            for dep in task.deps() {
                if !self.index.contains_key(dep) {
                    return Err(AssetdagError::UnknownTask {
                        task: dep.clone(),
                        referrer: format!("task '{}'", task.name()),
                    });
                }
            }
        }

        validate_acyclic(&self.tasks)?;

        let mut inputs = HashMap::with_capacity(self.tasks.len());
        for task in &self.tasks {
            inputs.insert(task.name().to_string(), InputSpec::compile(task.src_globs())?);
        }

        Ok(TaskRegistry::new(self.tasks, self.index, inputs, self.watch_rules))
    }
}

fn validate_acyclic(tasks: &[Task]) -> Result<()> {
    // Edge direction: dep -> task.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for task in tasks {
        graph.add_node(task.name());
    }

    for task in tasks {
        for dep in task.deps() {
            if dep == task.name() {
                return Err(AssetdagError::CyclicDependency(format!(
                    "task '{}' depends on itself",
                    task.name()
                )));
            }
            graph.add_edge(dep.as_str(), task.name(), ());
        }
    }

    match toposort(&graph, None) {
        Ok(_order) => Ok(()),
        Err(cycle) => Err(AssetdagError::CyclicDependency(format!(
            "cycle detected in task graph involving task '{}'",
            cycle.node_id()
        ))),
    }
}
