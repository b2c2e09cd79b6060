// src/transform/append.rs

use super::{Asset, MappedText, StepContext, StepError, Transform};

/// Append literal text to the end of every asset.
#[derive(Debug, Clone)]
pub struct Append {
    text: String,
}

impl Append {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl Transform for Append {
    fn name(&self) -> &str {
        "append"
    }

    fn apply(&self, assets: Vec<Asset>, _ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError> {
        Ok(assets
            .into_iter()
            .map(|asset| {
                let mut out = MappedText::new();
                out.push_asset(&asset);
                out.push_str(&self.text, None);
                out.finish(asset.path, asset.source_path)
            })
            .collect())
    }
}
