// src/transform/mod.rs

//! Transform steps.
//!
//! A step is a pure function from a set of assets to a set of assets. Steps
//! of a task run strictly in declaration order, each consuming the previous
//! step's output:
//!
//! - [`style`] compiles the stylesheet language to CSS.
//! - [`concat`] merges every asset into one file, in input order.
//! - [`minify`] strips comments and blank lines from scripts.
//! - [`sourcemap`] emits a v3 source map next to each asset.
//! - [`append`] appends literal text (banners, tests).
//!
//! Every asset carries a per-line origin table (see [`asset`]) so a source
//! map emitted at the end of the chain still points at the original inputs.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use thiserror::Error;

use crate::config::model::StepConfig;
use crate::fs::FileSystem;

pub mod append;
pub mod asset;
pub mod concat;
pub mod minify;
pub mod sourcemap;
pub mod style;

pub use append::Append;
pub use asset::{Asset, LineOrigin, MappedText, SourceFile};
pub use concat::Concat;
pub use minify::Minify;
pub use sourcemap::EmitSourceMap;
pub use style::CompileStyle;

/// Failure of a single step on its input.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct StepError {
    pub message: String,
}

impl StepError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Error pointing at a location in a source file (`line` is zero-based).
    pub fn at(file: &str, line: u32, message: impl fmt::Display) -> Self {
        Self::new(format!("{file}:{}: {message}", line + 1))
    }
}

/// Read-only environment a step may consult, e.g. to resolve imports.
#[derive(Clone, Copy)]
pub struct StepContext<'a> {
    pub fs: &'a dyn FileSystem,
    pub source_root: &'a Path,
    pub task: &'a str,
}

impl fmt::Debug for StepContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepContext")
            .field("source_root", &self.source_root)
            .field("task", &self.task)
            .finish_non_exhaustive()
    }
}

/// A single transform step.
pub trait Transform: Send + Sync + fmt::Debug {
    /// Short name used in logs and errors (`"less"`, `"concat"`, ...).
    fn name(&self) -> &str;

    fn apply(&self, assets: Vec<Asset>, ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError>;
}

/// Build the step described by a `steps = [...]` entry.
pub fn build_step(cfg: &StepConfig) -> Arc<dyn Transform> {
    match cfg {
        StepConfig::Less => Arc::new(CompileStyle),
        StepConfig::Concat { file, separator } => {
            Arc::new(Concat::new(file.clone()).with_separator(separator.clone()))
        }
        StepConfig::Minify => Arc::new(Minify),
        StepConfig::Sourcemap { dir } => Arc::new(EmitSourceMap::new(dir.clone())),
        StepConfig::Append { text } => Arc::new(Append::new(text.clone())),
    }
}

/// Run `steps` in order over `assets`.
///
/// Stops at the first failing step and returns its name with the error.
pub fn apply_chain(
    steps: &[Arc<dyn Transform>],
    mut assets: Vec<Asset>,
    ctx: &StepContext<'_>,
) -> Result<Vec<Asset>, (String, StepError)> {
    for step in steps {
        tracing::debug!(
            task = %ctx.task,
            step = step.name(),
            inputs = assets.len(),
            "applying transform step"
        );
        assets = step
            .apply(assets, ctx)
            .map_err(|e| (step.name().to_string(), e))?;
    }
    Ok(assets)
}
