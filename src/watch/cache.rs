// src/watch/cache.rs

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::Result;
use tracing::debug;

use crate::fs::FileSystem;
use crate::watch::hash::compute_file_hash;

/// Last seen content hash per watched file.
///
/// Editors and the OS often report one save as several events, and a rebuild
/// that rewrites a file with identical bytes still produces events. Only a
/// change of content counts.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<PathBuf, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self {
            hashes: HashMap::new(),
        }
    }

    /// Record the current hash of `path` without reporting a change.
    pub fn seed(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<()> {
        let hash = compute_file_hash(fs, path)?;
        self.hashes.insert(path.to_path_buf(), hash);
        Ok(())
    }

    /// Re-hash `path` and return whether its content differs from the last
    /// observation. A file seen for the first time counts as changed.
    pub fn observe(&mut self, fs: &dyn FileSystem, path: &Path) -> Result<bool> {
        let hash = compute_file_hash(fs, path)?;
        match self.hashes.insert(path.to_path_buf(), hash.clone()) {
            Some(prev) if prev == hash => {
                debug!("content unchanged for {:?}", path);
                Ok(false)
            }
            _ => Ok(true),
        }
    }

    /// Drop the entry for a removed file. Returns whether it was known.
    pub fn forget(&mut self, path: &Path) -> bool {
        let known = self.hashes.remove(path).is_some();
        if known {
            debug!("forgot cached hash for {:?}", path);
        }
        known
    }

    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn repeated_events_with_same_content_are_not_changes() {
        let fs = MockFileSystem::new();
        fs.add_file("a.less", "@a: 1;");
        let mut cache = FileCache::new();
        let p = Path::new("a.less");

        assert!(cache.observe(&fs, p).unwrap());
        assert!(!cache.observe(&fs, p).unwrap());

        fs.add_file("a.less", "@a: 2;");
        assert!(cache.observe(&fs, p).unwrap());
    }

    #[test]
    fn seeded_files_need_a_real_edit() {
        let fs = MockFileSystem::new();
        fs.add_file("b.js", "x");
        let mut cache = FileCache::new();
        cache.seed(&fs, Path::new("b.js")).unwrap();

        assert!(!cache.observe(&fs, Path::new("b.js")).unwrap());
        assert!(cache.forget(Path::new("b.js")));
        assert!(cache.is_empty());
    }
}
