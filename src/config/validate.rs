// src/config/validate.rs

use crate::config::model::{ConfigFile, RawConfigFile, StepConfig};
use crate::errors::{AssetdagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = AssetdagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task, raw.watch))
    }
}

/// Run every section-level check on a raw config.
pub fn validate_config(cfg: &RawConfigFile) -> Result<()> {
    validate_raw_config(cfg)
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_tasks(cfg)?;
    validate_watch_rules(cfg)?;
    Ok(())
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(AssetdagError::ConfigError(
            "config must contain at least one [task.<name>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_tasks(cfg: &RawConfigFile) -> Result<()> {
    for (name, task) in cfg.task.iter() {
        if name.trim().is_empty() {
            return Err(AssetdagError::ConfigError(
                "task names must not be empty".to_string(),
            ));
        }

        if !task.steps.is_empty() && task.src.is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "task '{name}' declares steps but no `src` globs"
            )));
        }

        if task.src.iter().any(|p| p.trim().is_empty() || p.trim() == "!") {
            return Err(AssetdagError::ConfigError(format!(
                "task '{name}' has an empty `src` pattern"
            )));
        }

        if !task.src.is_empty() && task.src.iter().all(|p| p.starts_with('!')) {
            return Err(AssetdagError::ConfigError(format!(
                "task '{name}' has only negated `src` patterns"
            )));
        }

        for step in &task.steps {
            if let StepConfig::Concat { file, .. } = step {
                if file.trim().is_empty() {
                    return Err(AssetdagError::ConfigError(format!(
                        "task '{name}': concat step needs a non-empty `file`"
                    )));
                }
            }
        }
    }
    Ok(())
}

fn validate_watch_rules(cfg: &RawConfigFile) -> Result<()> {
    for (idx, rule) in cfg.watch.iter().enumerate() {
        if rule.glob.is_empty() {
            return Err(AssetdagError::ConfigError(format!(
                "[[watch]] rule #{} has no `glob` patterns",
                idx + 1
            )));
        }
        if rule.tasks.is_empty() && !rule.reload {
            return Err(AssetdagError::ConfigError(format!(
                "[[watch]] rule #{} neither names `tasks` nor sets `reload = true`",
                idx + 1
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::load_from_str;

    #[test]
    fn steps_without_src_are_rejected() {
        let raw = load_from_str(
            r#"
[task.css]
steps = [{ kind = "less" }]
"#,
        )
        .unwrap();

        match ConfigFile::try_from(raw) {
            Err(AssetdagError::ConfigError(msg)) => assert!(msg.contains("no `src`")),
            other => panic!("expected ConfigError, got {other:?}"),
        }
    }

    #[test]
    fn watch_rule_without_action_is_rejected() {
        let raw = load_from_str(
            r#"
[task.a]

[[watch]]
glob = ["**/*.html"]
"#,
        )
        .unwrap();

        assert!(matches!(
            ConfigFile::try_from(raw),
            Err(AssetdagError::ConfigError(_))
        ));
    }

    #[test]
    fn step_kinds_deserialize_with_defaults() {
        let raw = load_from_str(
            r#"
[task.js]
src = ["app/**/*.js"]
steps = [
  { kind = "concat", file = "app.js" },
  { kind = "minify" },
  { kind = "sourcemap", dir = "maps" },
]
"#,
        )
        .unwrap();

        let cfg = ConfigFile::try_from(raw).unwrap();
        let steps = &cfg.tasks()["js"].steps;
        assert_eq!(
            steps,
            &vec![
                StepConfig::Concat {
                    file: "app.js".to_string(),
                    separator: String::new(),
                },
                StepConfig::Minify,
                StepConfig::Sourcemap {
                    dir: "maps".to_string(),
                },
            ]
        );
    }
}
