// src/watch/path_utils.rs

use std::path::{Component, Path};

/// Render `path` relative to `root` using `/` separators, the form every
/// glob in the config is matched against.
///
/// Watcher events may carry a differently spelled absolute prefix than the
/// root (symlinked temp dirs on macOS, for one), so a failed prefix strip is
/// retried on canonical paths. A removed file cannot be canonicalised; its
/// parent is used instead.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root = root.canonicalize().ok()?;
    let path = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };
    path.strip_prefix(&root).ok().map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.components()
        .filter_map(|c| match c {
            Component::Normal(s) => Some(s.to_string_lossy()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
