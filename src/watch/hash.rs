// src/watch/hash.rs

//! Content hashing (blake3), shared by the watcher's duplicate-event filter
//! and the runner's "write only when changed" check.

use std::path::Path;

use anyhow::{Context, Result};
use blake3::Hasher;

use crate::fs::FileSystem;

/// Hex-encoded blake3 digest of `bytes`.
pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Hash the current contents of a file.
pub fn compute_file_hash(fs: &dyn FileSystem, path: &Path) -> Result<String> {
    let bytes = fs
        .read(path)
        .with_context(|| format!("reading file for hashing: {:?}", path))?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn file_hash_matches_byte_hash() {
        let fs = MockFileSystem::new();
        fs.add_file("a.css", "body{}");
        assert_eq!(
            compute_file_hash(&fs, Path::new("a.css")).unwrap(),
            hash_bytes(b"body{}")
        );
        assert_ne!(hash_bytes(b"a"), hash_bytes(b"b"));
    }
}
