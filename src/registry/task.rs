// src/registry/task.rs

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use crate::config::model::TaskConfig;
use crate::registry::TaskName;
use crate::transform::{Transform, build_step};

/// A named unit of build work: input globs, an ordered chain of transform
/// steps, a destination directory and the tasks that must run first.
///
/// A task without steps (and usually without `src`) only groups its
/// dependencies, like `default` or `build_only`.
#[derive(Clone)]
pub struct Task {
    name: TaskName,
    src: Vec<String>,
    dest: PathBuf,
    steps: Vec<Arc<dyn Transform>>,
    after: Vec<TaskName>,
    watch: bool,
    description: Option<String>,
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("src", &self.src)
            .field("dest", &self.dest)
            .field("steps", &self.step_names())
            .field("after", &self.after)
            .field("watch", &self.watch)
            .finish()
    }
}

impl Task {
    pub fn new(name: impl Into<TaskName>) -> Self {
        Self {
            name: name.into(),
            src: Vec::new(),
            dest: PathBuf::new(),
            steps: Vec::new(),
            after: Vec::new(),
            watch: false,
            description: None,
        }
    }

    pub fn from_config(name: impl Into<TaskName>, cfg: &TaskConfig) -> Self {
        Self {
            name: name.into(),
            src: cfg.src.clone(),
            dest: cfg.dest.clone().unwrap_or_default(),
            steps: cfg.steps.iter().map(build_step).collect(),
            after: cfg.after.clone(),
            watch: cfg.watch,
            description: cfg.description.clone(),
        }
    }

    /// Append input globs (`!pattern` excludes).
    pub fn src<I, S>(mut self, globs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.src.extend(globs.into_iter().map(Into::into));
        self
    }

    pub fn dest(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dest = dir.into();
        self
    }

    pub fn step(mut self, step: impl Transform + 'static) -> Self {
        self.steps.push(Arc::new(step));
        self
    }

    pub fn after<I, S>(mut self, deps: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<TaskName>,
    {
        self.after.extend(deps.into_iter().map(Into::into));
        self
    }

    pub fn watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    pub fn description(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn src_globs(&self) -> &[String] {
        &self.src
    }

    pub fn dest_dir(&self) -> &std::path::Path {
        &self.dest
    }

    pub fn steps(&self) -> &[Arc<dyn Transform>] {
        &self.steps
    }

    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.name()).collect()
    }

    /// Direct dependencies, in declaration order.
    pub fn deps(&self) -> &[TaskName] {
        &self.after
    }

    /// Whether invoking this task leaves the process in watch mode.
    pub fn watches(&self) -> bool {
        self.watch
    }

    pub fn help_text(&self) -> Option<&str> {
        self.description.as_deref()
    }

    /// True for tasks that only group dependencies.
    pub fn is_aggregate(&self) -> bool {
        self.steps.is_empty() && self.src.is_empty()
    }
}
