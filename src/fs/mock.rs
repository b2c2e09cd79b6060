// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::{BTreeSet, HashMap};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Debug, Clone)]
pub enum MockEntry {
    File(Vec<u8>),
    Dir(BTreeSet<String>),
}

/// In-memory filesystem for tests.
///
/// Paths are normalised by dropping `.` components, so `./app/a.js` and
/// `app/a.js` name the same entry and `.` is the root. Writes count how many
/// times each file was written, which lets tests check that unchanged
/// outputs are not rewritten.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    writes: Arc<Mutex<HashMap<PathBuf, usize>>>,
    symlinks: Arc<Mutex<BTreeSet<PathBuf>>>,
}

fn key(path: &Path) -> PathBuf {
    let normalised: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if normalised.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        normalised
    }
}

fn parent_key(path: &Path) -> Option<PathBuf> {
    if path == Path::new(".") {
        return None;
    }
    Some(key(path.parent().unwrap_or(Path::new("."))))
}

impl MockFileSystem {
    pub fn new() -> Self {
        let fs = Self::default();
        fs.lock()
            .insert(PathBuf::from("."), MockEntry::Dir(BTreeSet::new()));
        fs
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, MockEntry>> {
        self.files.lock().unwrap_or_else(|p| p.into_inner())
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let path = key(path.as_ref());
        let mut files = self.lock();
        Self::link_into_parent(&mut files, &path);
        files.insert(path, MockEntry::File(content.into()));
    }

    pub fn remove_file(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        let mut files = self.lock();
        files.remove(&path);
        if let (Some(parent), Some(name)) = (parent_key(&path), path.file_name()) {
            if let Some(MockEntry::Dir(children)) = files.get_mut(&parent) {
                children.remove(&name.to_string_lossy().to_string());
            }
        }
    }

    /// Add an empty directory entry that reports itself as a symlink.
    pub fn add_dir_symlink(&self, path: impl AsRef<Path>) {
        let path = key(path.as_ref());
        {
            let mut files = self.lock();
            Self::link_into_parent(&mut files, &path);
            files.insert(path.clone(), MockEntry::Dir(BTreeSet::new()));
        }
        self.symlinks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(path);
    }

    /// Number of `write` calls that targeted `path`.
    pub fn write_count(&self, path: impl AsRef<Path>) -> usize {
        let writes = self.writes.lock().unwrap_or_else(|p| p.into_inner());
        writes.get(&key(path.as_ref())).copied().unwrap_or(0)
    }

    /// Current contents of a file as UTF-8 (lossy), if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        match self.lock().get(&key(path.as_ref())) {
            Some(MockEntry::File(bytes)) => Some(String::from_utf8_lossy(bytes).into_owned()),
            _ => None,
        }
    }

    fn link_into_parent(files: &mut HashMap<PathBuf, MockEntry>, path: &Path) {
        let Some(parent) = parent_key(path) else {
            return;
        };
        if !files.contains_key(&parent) {
            Self::link_into_parent(files, &parent);
            files.insert(parent.clone(), MockEntry::Dir(BTreeSet::new()));
        }
        if let (Some(MockEntry::Dir(children)), Some(name)) =
            (files.get_mut(&parent), path.file_name())
        {
            children.insert(name.to_string_lossy().to_string());
        }
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::File(content)) => Ok(content.clone()),
            Some(MockEntry::Dir(_)) => Err(anyhow!("Is a directory: {:?}", path)),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn read_to_string(&self, path: &Path) -> Result<String> {
        let bytes = self.read(path)?;
        String::from_utf8(bytes).map_err(|e| anyhow!("Invalid UTF-8 in {:?}: {}", path, e))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        self.add_file(path, contents);
        let mut writes = self.writes.lock().unwrap_or_else(|p| p.into_inner());
        *writes.entry(key(path)).or_insert(0) += 1;
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.lock().contains_key(&key(path))
    }

    fn is_file(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::File(_)))
    }

    fn is_dir(&self, path: &Path) -> bool {
        matches!(self.lock().get(&key(path)), Some(MockEntry::Dir(_)))
    }

    fn is_symlink(&self, path: &Path) -> bool {
        self.symlinks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(&key(path))
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        match self.lock().get(&key(path)) {
            Some(MockEntry::Dir(children)) => {
                Ok(children.iter().map(|name| path.join(name)).collect())
            }
            _ => Err(anyhow!("Not a directory or not found: {:?}", path)),
        }
    }
}
