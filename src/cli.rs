// src/cli.rs

//! CLI argument parsing using `clap`.

use clap::{Parser, ValueEnum};

/// Command-line arguments for `assetdag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "assetdag",
    version,
    about = "Compile, concatenate and watch web assets as a graph of named tasks.",
    long_about = None
)]
pub struct CliArgs {
    /// Tasks to run, in order (e.g. `less js`, `build_only`, `watch`).
    ///
    /// Default: the `default` task.
    #[arg(value_name = "TASK")]
    pub tasks: Vec<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Assetdag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Assetdag.toml")]
    pub config: String,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `ASSETDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate, print the task registry, but don't run anything.
    #[arg(long)]
    pub dry_run: bool,
}

impl CliArgs {
    /// Task names to invoke, falling back to `default`.
    pub fn selected_tasks(&self) -> Vec<String> {
        if self.tasks.is_empty() {
            vec![DEFAULT_TASK.to_string()]
        } else {
            self.tasks.clone()
        }
    }
}

/// Task run when no task is named on the command line.
pub const DEFAULT_TASK: &str = "default";

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_positional_tasks_selects_default() {
        let args = CliArgs::parse_from(["assetdag"]);
        assert_eq!(args.selected_tasks(), vec!["default".to_string()]);
        assert_eq!(args.config, "Assetdag.toml");
    }

    #[test]
    fn positional_tasks_keep_their_order() {
        let args = CliArgs::parse_from(["assetdag", "js", "less", "--config", "a/b.toml"]);
        assert_eq!(args.selected_tasks(), vec!["js".to_string(), "less".to_string()]);
        assert_eq!(args.config, "a/b.toml");
    }
}
