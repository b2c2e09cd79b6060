// src/watch/patterns.rs

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Result as AnyResult;
use globset::{GlobBuilder, GlobMatcher, GlobSet, GlobSetBuilder};

use crate::config::model::ConfigFile;
use crate::errors::{AssetdagError, Result};
use crate::fs::{walk_files, FileSystem};
use crate::registry::TaskName;
use crate::watch::path_utils::relative_str;

/// Compile one glob with shell semantics: `*` stays inside a path segment,
/// `**` crosses directories.
pub fn compile_glob(pattern: &str) -> Result<GlobMatcher> {
    let glob = GlobBuilder::new(pattern)
        .literal_separator(true)
        .build()
        .map_err(|e| AssetdagError::InvalidGlob {
            pattern: pattern.to_string(),
            message: e.kind().to_string(),
        })?;
    Ok(glob.compile_matcher())
}

/// Build a GlobSet from string patterns (same semantics as [`compile_glob`]).
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(pat)
            .literal_separator(true)
            .build()
            .map_err(|e| AssetdagError::InvalidGlob {
                pattern: pat.clone(),
                message: e.kind().to_string(),
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| AssetdagError::InvalidGlob {
        pattern: patterns.join(", "),
        message: e.to_string(),
    })
}

/// A compiled `[[watch]]` rule: which paths it reacts to and what it does.
///
/// ```toml
/// [[watch]]
/// glob = ["static/app/**/*.js"]
/// exclude = ["static/app/**/*.spec.js"]
/// tasks = ["js"]
///
/// [[watch]]
/// glob = ["templates/**/*.html"]
/// reload = true
/// ```
///
/// Paths passed to [`WatchRule::matches`] are relative to the source root and
/// use `/` separators.
#[derive(Clone)]
pub struct WatchRule {
    globs: Vec<String>,
    glob_set: GlobSet,
    exclude_set: Option<GlobSet>,
    tasks: Vec<TaskName>,
    reload: bool,
}

impl fmt::Debug for WatchRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchRule")
            .field("globs", &self.globs)
            .field("tasks", &self.tasks)
            .field("reload", &self.reload)
            .finish_non_exhaustive()
    }
}

impl WatchRule {
    pub fn new<G, T>(globs: G, excludes: &[String], tasks: T, reload: bool) -> Result<Self>
    where
        G: IntoIterator,
        G::Item: Into<String>,
        T: IntoIterator,
        T::Item: Into<TaskName>,
    {
        let globs: Vec<String> = globs.into_iter().map(Into::into).collect();
        let glob_set = build_globset(&globs)?;
        let exclude_set = if excludes.is_empty() {
            None
        } else {
            Some(build_globset(excludes)?)
        };

        Ok(Self {
            globs,
            glob_set,
            exclude_set,
            tasks: tasks.into_iter().map(Into::into).collect(),
            reload,
        })
    }

    pub fn globs(&self) -> &[String] {
        &self.globs
    }

    /// Tasks to run when a matching path changes.
    pub fn tasks(&self) -> &[TaskName] {
        &self.tasks
    }

    /// Whether a matching change is broadcast directly as a reload.
    pub fn reload(&self) -> bool {
        self.reload
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        if !self.glob_set.is_match(rel_path) {
            return false;
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Compile every `[[watch]]` rule of a validated config, in order.
pub fn rules_from_config(cfg: &ConfigFile) -> Result<Vec<WatchRule>> {
    cfg.watch_rules()
        .iter()
        .map(|r| WatchRule::new(r.glob.iter().cloned(), &r.exclude, r.tasks.iter().cloned(), r.reload))
        .collect()
}

/// Collect all files under `root` matched by at least one rule.
///
/// Used to seed the watcher's content cache at startup.
pub fn collect_matching_files(
    fs: &dyn FileSystem,
    root: &Path,
    rules: &[WatchRule],
) -> AnyResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    walk_files(fs, root, &mut |path| {
        if relative_str(root, &path).is_some_and(|rel| rules.iter().any(|r| r.matches(&rel))) {
            files.push(path);
        }
    })?;

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn single_star_stays_in_segment() {
        let rule = WatchRule::new(["static/*.js"], &[], ["js"], false).unwrap();
        assert!(rule.matches("static/app.js"));
        assert!(!rule.matches("static/app/main.js"));
    }

    #[test]
    fn excludes_win_over_globs() {
        let rule = WatchRule::new(
            ["static/app/**/*.js"],
            &["static/app/**/*.spec.js".to_string()],
            ["js"],
            false,
        )
        .unwrap();
        assert!(rule.matches("static/app/a/b.js"));
        assert!(!rule.matches("static/app/a/b.spec.js"));
    }

    #[test]
    fn invalid_glob_is_reported() {
        let err = WatchRule::new(["static/[.js"], &[], ["js"], false).unwrap_err();
        assert!(matches!(err, AssetdagError::InvalidGlob { ref pattern, .. } if pattern == "static/[.js"));
    }

    #[test]
    fn collects_files_matched_by_any_rule() {
        let fs = MockFileSystem::new();
        fs.add_file("root/a.less", "");
        fs.add_file("root/sub/b.html", "");
        fs.add_file("root/sub/c.txt", "");
        fs.add_dir_symlink("root/sub/up");
        fs.add_file("root/sub/up/d.html", "");

        let rules = vec![
            WatchRule::new(["*.less"], &[], ["less"], false).unwrap(),
            WatchRule::new(["**/*.html"], &[], Vec::<String>::new(), true).unwrap(),
        ];
        let files = collect_matching_files(&fs, Path::new("root"), &rules).unwrap();
        assert_eq!(
            files,
            vec![PathBuf::from("root/a.less"), PathBuf::from("root/sub/b.html")]
        );
    }
}
