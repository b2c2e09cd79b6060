// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::Deserialize;

use crate::types::TriggerWhileRunningBehaviour;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// source_root = "."
/// dest_root = "."
/// reload_addr = "127.0.0.1:35729"
///
/// [task.js]
/// src = ["static/app/app.module.js", "static/app/**/*.js"]
/// dest = "static"
/// steps = [{ kind = "concat", file = "app.js" }, { kind = "sourcemap" }]
///
/// [task.build_only]
/// after = ["js"]
///
/// [[watch]]
/// glob = ["static/app/**/*.js"]
/// tasks = ["js"]
/// ```
///
/// All sections are optional and have reasonable defaults; validation
/// happens in `TryFrom<RawConfigFile> for ConfigFile`.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// All tasks from `[task.<name>]`, keyed by task name.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,

    /// Watch rules from `[[watch]]`, in declaration order.
    #[serde(default)]
    pub watch: Vec<WatchRuleConfig>,
}

/// Validated configuration.
///
/// Constructed through `ConfigFile::try_from(raw)` (see `validate.rs`) or
/// [`crate::config::load_and_validate`].
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    task: BTreeMap<String, TaskConfig>,
    watch: Vec<WatchRuleConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        config: ConfigSection,
        task: BTreeMap<String, TaskConfig>,
        watch: Vec<WatchRuleConfig>,
    ) -> Self {
        Self {
            config,
            task,
            watch,
        }
    }

    pub fn config_section(&self) -> &ConfigSection {
        &self.config
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn watch_rules(&self) -> &[WatchRuleConfig] {
        &self.watch
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ConfigSection {
    /// Directory task inputs and watch globs are resolved against,
    /// relative to the config file.
    #[serde(default = "default_root")]
    pub source_root: PathBuf,

    /// Directory task `dest` paths are resolved against, relative to the
    /// config file.
    #[serde(default = "default_root")]
    pub dest_root: PathBuf,

    /// Address of the reload notification listener. An empty string
    /// disables it.
    #[serde(default = "default_reload_addr")]
    pub reload_addr: String,

    /// `"queue"` (default) or `"parallel"`.
    #[serde(default)]
    pub triggered_while_running_behaviour: TriggerWhileRunningBehaviour,
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            source_root: default_root(),
            dest_root: default_root(),
            reload_addr: default_reload_addr(),
            triggered_while_running_behaviour: TriggerWhileRunningBehaviour::default(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_reload_addr() -> String {
    "127.0.0.1:35729".to_string()
}

/// A single `[task.<name>]` section.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskConfig {
    /// Input globs, evaluated in order. `!pattern` removes matches.
    #[serde(default)]
    pub src: Vec<String>,

    /// Output directory relative to `[config].dest_root`.
    #[serde(default)]
    pub dest: Option<PathBuf>,

    /// Transform chain applied to the inputs, in order.
    #[serde(default)]
    pub steps: Vec<StepConfig>,

    /// Tasks that must run before this one (`after = ["less", "js"]`).
    #[serde(default)]
    pub after: Vec<String>,

    /// Enter watch mode once this task and its dependencies have run.
    #[serde(default)]
    pub watch: bool,

    /// Free-form text shown by `--dry-run`.
    #[serde(default)]
    pub description: Option<String>,
}

/// One entry of a task's `steps = [...]` list.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StepConfig {
    /// Compile the stylesheet language to CSS.
    Less,
    /// Concatenate every input into `file`.
    Concat {
        file: String,
        #[serde(default)]
        separator: String,
    },
    /// Strip comments and blank lines from scripts.
    Minify,
    /// Emit a source map next to each output (or into `dir`).
    Sourcemap {
        #[serde(default)]
        dir: String,
    },
    /// Append literal text to every asset.
    Append { text: String },
}

/// A single `[[watch]]` rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WatchRuleConfig {
    /// Globs (relative to the source root) this rule reacts to.
    #[serde(default)]
    pub glob: Vec<String>,

    /// Paths matching any of these are ignored by the rule.
    #[serde(default)]
    pub exclude: Vec<String>,

    /// Tasks to run when a matching path changes.
    #[serde(default)]
    pub tasks: Vec<String>,

    /// Broadcast a reload for the changed path itself.
    #[serde(default)]
    pub reload: bool,
}
