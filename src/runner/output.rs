// src/runner/output.rs

use std::path::Path;

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::transform::Asset;
use crate::watch::hash::hash_bytes;

/// Paths (relative to the destination root) a task produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    /// Every output of the run, in output order.
    pub written: Vec<String>,
    /// Outputs whose bytes differ from what was on disk before.
    pub changed: Vec<String>,
}

/// Write `assets` under `dest_root/dest`.
///
/// A file whose current contents already hash to the new contents is left
/// untouched, so an unchanged rebuild neither rewrites files nor produces
/// watch events or reloads.
pub fn write_outputs(
    fs: &dyn FileSystem,
    dest_root: &Path,
    dest: &Path,
    assets: &[Asset],
) -> Result<WriteSummary> {
    let mut summary = WriteSummary::default();

    for asset in assets {
        let rel = dest.join(&asset.path);
        let rel_str = rel
            .to_string_lossy()
            .replace('\\', "/")
            .trim_start_matches("./")
            .to_string();
        let target = dest_root.join(&rel);
        let bytes = asset.contents.as_bytes();

        let unchanged = fs.is_file(&target)
            && fs
                .read(&target)
                .map(|old| hash_bytes(&old) == hash_bytes(bytes))
                .unwrap_or(false);

        if unchanged {
            debug!(path = %rel_str, "output unchanged; not rewriting");
        } else {
            fs.write(&target, bytes)?;
            debug!(path = %rel_str, bytes = bytes.len(), "wrote output");
            summary.changed.push(rel_str.clone());
        }
        summary.written.push(rel_str);
    }

    Ok(summary)
}
