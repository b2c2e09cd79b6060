// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AssetdagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    #[error("Task '{0}' is already registered")]
    DuplicateTask(String),

    #[error("Unknown task '{task}' referenced by {referrer}")]
    UnknownTask { task: String, referrer: String },

    #[error("Cycle detected in task dependencies: {0}")]
    CyclicDependency(String),

    #[error("Task '{task}': no input matched '{pattern}'")]
    MissingInput { task: String, pattern: String },

    #[error("Task '{task}': step '{step}' failed: {message}")]
    TransformStep {
        task: String,
        step: String,
        message: String,
    },

    #[error("Task '{task}' skipped because dependency '{dependency}' failed")]
    DependencyFailed { task: String, dependency: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, AssetdagError>;
