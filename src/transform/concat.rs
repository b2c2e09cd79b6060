// src/transform/concat.rs

use std::path::PathBuf;

use super::{Asset, MappedText, StepContext, StepError, Transform};

/// Concatenate every input asset, in input order, into a single file.
#[derive(Debug, Clone)]
pub struct Concat {
    file: PathBuf,
    separator: String,
}

impl Concat {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        Self {
            file: file.into(),
            separator: String::new(),
        }
    }

    /// Text inserted between two consecutive inputs (default: nothing).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }
}

impl Transform for Concat {
    fn name(&self) -> &str {
        "concat"
    }

    fn apply(&self, assets: Vec<Asset>, _ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError> {
        if assets.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = MappedText::new();
        for (idx, asset) in assets.iter().enumerate() {
            if idx > 0 && !self.separator.is_empty() {
                out.push_str(&self.separator, None);
            }
            out.push_asset(asset);
        }

        Ok(vec![out.finish(self.file.clone(), None)])
    }
}
