// src/runner/mod.rs

//! Task execution.
//!
//! [`Runner::run`] executes a task after its dependencies: dependencies
//! first (depth-first, declaration order, each once per invocation), then
//! the task itself. For each task with steps:
//!
//! 1. expand the `src` globs against the source root,
//! 2. read the matched files concurrently,
//! 3. apply the transform steps in order,
//! 4. write the resulting assets under `dest_root/dest`.
//!
//! A failing task does not stop unrelated tasks of the same invocation;
//! tasks depending on it are reported as [`AssetdagError::DependencyFailed`].

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::anyhow;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::errors::{AssetdagError, Result};
use crate::fs::FileSystem;
use crate::registry::{Task, TaskName, TaskRegistry};
use crate::transform::{Asset, StepContext, apply_chain};

pub mod inputs;
pub mod output;

pub use inputs::{InputFile, InputSpec};
pub use output::{WriteSummary, write_outputs};

/// Result of one task within an invocation.
#[derive(Debug, Clone)]
pub struct TaskRun {
    pub task: TaskName,
    pub error: Option<Arc<AssetdagError>>,
    /// Outputs relative to the destination root.
    pub written: Vec<String>,
    pub changed: Vec<String>,
}

impl TaskRun {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}

/// Result of `run(task)`: one entry per executed task, in execution order.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub root: TaskName,
    pub outcomes: Vec<TaskRun>,
}

impl RunReport {
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(TaskRun::succeeded)
    }

    pub fn get(&self, task: &str) -> Option<&TaskRun> {
        self.outcomes.iter().find(|o| o.task == task)
    }

    /// Names of the executed tasks, in order.
    pub fn executed(&self) -> Vec<&str> {
        self.outcomes.iter().map(|o| o.task.as_str()).collect()
    }

    /// Changed outputs across all tasks, without duplicates.
    pub fn changed_paths(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.outcomes
            .iter()
            .flat_map(|o| o.changed.iter())
            .filter(|p| seen.insert(p.as_str()))
            .cloned()
            .collect()
    }

    pub fn first_error(&self) -> Option<(&str, &AssetdagError)> {
        self.outcomes
            .iter()
            .find_map(|o| o.error.as_deref().map(|e| (o.task.as_str(), e)))
    }
}

#[derive(Debug, Clone)]
pub struct Runner {
    registry: Arc<TaskRegistry>,
    fs: Arc<dyn FileSystem>,
    source_root: PathBuf,
    dest_root: PathBuf,
}

impl Runner {
    pub fn new(
        registry: Arc<TaskRegistry>,
        fs: Arc<dyn FileSystem>,
        source_root: impl Into<PathBuf>,
        dest_root: impl Into<PathBuf>,
    ) -> Self {
        Self {
            registry,
            fs,
            source_root: source_root.into(),
            dest_root: dest_root.into(),
        }
    }

    /// Run `name` after its dependencies.
    ///
    /// Only an unknown task name is an `Err`; task failures are recorded in
    /// the report.
    pub async fn run(&self, name: &str) -> Result<RunReport> {
        let order = self.registry.execution_order(name)?;
        debug!(task = %name, ?order, "execution order");

        let mut failed: HashSet<TaskName> = HashSet::new();
        let mut outcomes = Vec::with_capacity(order.len());

        for task_name in order {
            let Some(task) = self.registry.get(&task_name) else {
                continue;
            };

            if let Some(dep) = task.deps().iter().find(|d| failed.contains(*d)) {
                warn!(task = %task_name, dependency = %dep, "skipping task: dependency failed");
                failed.insert(task_name.clone());
                outcomes.push(TaskRun {
                    error: Some(Arc::new(AssetdagError::DependencyFailed {
                        task: task_name.clone(),
                        dependency: dep.clone(),
                    })),
                    task: task_name,
                    written: Vec::new(),
                    changed: Vec::new(),
                });
                continue;
            }

            let started = Instant::now();
            match self.run_single(task).await {
                Ok(summary) => {
                    info!(
                        task = %task_name,
                        outputs = summary.written.len(),
                        changed = summary.changed.len(),
                        elapsed_ms = started.elapsed().as_millis() as u64,
                        "task finished"
                    );
                    outcomes.push(TaskRun {
                        task: task_name,
                        error: None,
                        written: summary.written,
                        changed: summary.changed,
                    });
                }
                Err(e) => {
                    error!(task = %task_name, error = %e, "task failed");
                    failed.insert(task_name.clone());
                    outcomes.push(TaskRun {
                        task: task_name,
                        error: Some(Arc::new(e)),
                        written: Vec::new(),
                        changed: Vec::new(),
                    });
                }
            }
        }

        Ok(RunReport {
            root: name.to_string(),
            outcomes,
        })
    }

    async fn run_single(&self, task: &Task) -> Result<WriteSummary> {
        if task.is_aggregate() {
            debug!(task = %task.name(), "task only groups dependencies");
            return Ok(WriteSummary::default());
        }

        let spec = self
            .registry
            .inputs_of(task.name())
            .cloned()
            .ok_or_else(|| AssetdagError::Other(anyhow!("no inputs compiled for task '{}'", task.name())))?;

        let files = {
            let fs = Arc::clone(&self.fs);
            let root = self.source_root.clone();
            let name = task.name().to_string();
            tokio::task::spawn_blocking(move || spec.resolve(fs.as_ref(), &root, &name))
                .await
                .map_err(|e| AssetdagError::Other(e.into()))??
        };
        debug!(task = %task.name(), inputs = files.len(), "resolved inputs");

        let assets = self.read_inputs(files).await?;

        let fs = Arc::clone(&self.fs);
        let root = self.source_root.clone();
        let name = task.name().to_string();
        let steps = task.steps().to_vec();
        let assets = tokio::task::spawn_blocking(move || {
            let ctx = StepContext {
                fs: fs.as_ref(),
                source_root: &root,
                task: &name,
            };
            apply_chain(&steps, assets, &ctx)
        })
        .await
        .map_err(|e| AssetdagError::Other(e.into()))?
        .map_err(|(step, e)| AssetdagError::TransformStep {
            task: task.name().to_string(),
            step,
            message: e.message,
        })?;

        let fs = Arc::clone(&self.fs);
        let dest_root = self.dest_root.clone();
        let dest = task.dest_dir().to_path_buf();
        tokio::task::spawn_blocking(move || write_outputs(fs.as_ref(), &dest_root, &dest, &assets))
            .await
            .map_err(|e| AssetdagError::Other(e.into()))?
            .map_err(AssetdagError::Other)
    }

    /// Read every input on the blocking pool; the result keeps input order.
    async fn read_inputs(&self, files: Vec<InputFile>) -> Result<Vec<Asset>> {
        let mut set = JoinSet::new();
        for (idx, file) in files.into_iter().enumerate() {
            let fs = Arc::clone(&self.fs);
            let path = self.source_root.join(&file.source_path);
            set.spawn_blocking(move || {
                let contents = fs.read_to_string(&path)?;
                Ok::<_, anyhow::Error>((idx, Asset::from_source(file.relative, file.source_path, contents)))
            });
        }

        let mut slots: Vec<Option<Asset>> = Vec::new();
        while let Some(joined) = set.join_next().await {
            let (idx, asset) = joined.map_err(|e| AssetdagError::Other(e.into()))??;
            if slots.len() <= idx {
                slots.resize_with(idx + 1, || None);
            }
            slots[idx] = Some(asset);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::registry::RegistryBuilder;
    use crate::transform::{Append, Concat};

    fn runner(fs: &MockFileSystem, tasks: Vec<Task>) -> Runner {
        let mut b = RegistryBuilder::new();
        for t in tasks {
            b.register(t).unwrap();
        }
        Runner::new(Arc::new(b.build().unwrap()), Arc::new(fs.clone()), "src", "out")
    }

    #[tokio::test]
    async fn dependency_failure_skips_dependents_but_not_siblings() {
        let fs = MockFileSystem::new();
        fs.add_file("src/a.js", "a");

        let r = runner(
            &fs,
            vec![
                Task::new("broken").src(["missing/*.js"]).step(Append::new("x")),
                Task::new("ok").src(["a.js"]).step(Append::new("!")),
                Task::new("needs_broken").after(["broken"]),
                Task::new("default").after(["broken", "ok", "needs_broken"]),
            ],
        );

        let report = r.run("default").await.unwrap();
        assert_eq!(report.executed(), vec!["broken", "ok", "needs_broken", "default"]);
        assert!(!report.is_success());
        assert!(matches!(
            report.get("broken").unwrap().error.as_deref(),
            Some(AssetdagError::MissingInput { .. })
        ));
        assert!(report.get("ok").unwrap().succeeded());
        assert!(matches!(
            report.get("needs_broken").unwrap().error.as_deref(),
            Some(AssetdagError::DependencyFailed { dependency, .. }) if dependency == "broken"
        ));
        assert_eq!(fs.contents("out/a.js").as_deref(), Some("a!"));
    }

    #[tokio::test]
    async fn step_errors_name_task_and_step() {
        let fs = MockFileSystem::new();
        fs.add_file("src/site.less", ".a { color: @nope; }\n");

        let r = runner(
            &fs,
            vec![Task::new("less").src(["*.less"]).step(crate::transform::CompileStyle)],
        );
        let report = r.run("less").await.unwrap();
        let err = report.get("less").unwrap().error.clone().unwrap();
        assert!(matches!(
            err.as_ref(),
            AssetdagError::TransformStep { task, step, message }
                if task == "less" && step == "less" && message.starts_with("site.less:1:")
        ));
    }

    #[tokio::test]
    async fn concat_respects_input_order_and_dest() {
        let fs = MockFileSystem::new();
        fs.add_file("src/app/z.js", "z;\n");
        fs.add_file("src/app/app.module.js", "module;\n");
        fs.add_file("src/app/m.js", "m;\n");

        let r = runner(
            &fs,
            vec![Task::new("js")
                .src(["app/app.module.js", "app/**/*.js"])
                .dest("static")
                .step(Concat::new("app.js"))],
        );
        let report = r.run("js").await.unwrap();

        assert!(report.is_success());
        assert_eq!(report.changed_paths(), vec!["static/app.js"]);
        assert_eq!(fs.contents("out/static/app.js").as_deref(), Some("module;\nm;\nz;\n"));
    }
}
