use std::collections::BTreeMap;

use assetdag::config::{
    ConfigFile, ConfigSection, RawConfigFile, StepConfig, TaskConfig, WatchRuleConfig,
};
use assetdag::types::TriggerWhileRunningBehaviour;

/// Builder for a validated `ConfigFile`.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
                watch: Vec::new(),
            },
        }
    }

    pub fn with_task(mut self, name: &str, task: TaskConfig) -> Self {
        self.config.task.insert(name.to_string(), task);
        self
    }

    /// Add a `[[watch]]` rule that runs `tasks` when `glob` changes.
    pub fn with_watch(mut self, glob: &str, tasks: &[&str]) -> Self {
        self.config.watch.push(WatchRuleConfig {
            glob: vec![glob.to_string()],
            exclude: Vec::new(),
            tasks: tasks.iter().map(|t| t.to_string()).collect(),
            reload: false,
        });
        self
    }

    /// Add a `[[watch]]` rule that only requests a reload.
    pub fn with_reload_watch(mut self, glob: &str) -> Self {
        self.config.watch.push(WatchRuleConfig {
            glob: vec![glob.to_string()],
            exclude: Vec::new(),
            tasks: Vec::new(),
            reload: true,
        });
        self
    }

    pub fn with_behaviour(mut self, behaviour: TriggerWhileRunningBehaviour) -> Self {
        self.config.config.triggered_while_running_behaviour = behaviour;
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new() -> Self {
        Self {
            task: TaskConfig::default(),
        }
    }

    pub fn src(mut self, pattern: &str) -> Self {
        self.task.src.push(pattern.to_string());
        self
    }

    pub fn dest(mut self, dir: &str) -> Self {
        self.task.dest = Some(dir.into());
        self
    }

    pub fn step(mut self, step: StepConfig) -> Self {
        self.task.steps.push(step);
        self
    }

    pub fn concat(self, file: &str) -> Self {
        self.step(StepConfig::Concat {
            file: file.to_string(),
            separator: String::new(),
        })
    }

    pub fn append(self, text: &str) -> Self {
        self.step(StepConfig::Append {
            text: text.to_string(),
        })
    }

    pub fn after(mut self, dep: &str) -> Self {
        self.task.after.push(dep.to_string());
        self
    }

    pub fn watch(mut self, val: bool) -> Self {
        self.task.watch = val;
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}

impl Default for TaskConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
