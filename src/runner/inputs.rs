// src/runner/inputs.rs

//! Input glob expansion.
//!
//! Globs are evaluated in declaration order. Each positive glob contributes
//! its matches sorted by path; a file matched by an earlier glob keeps its
//! earlier position. `!pattern` globs remove matches from every positive
//! glob.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use globset::{GlobMatcher, GlobSet};

use crate::errors::{AssetdagError, Result};
use crate::fs::{walk_files, FileSystem};
use crate::watch::path_utils::relative_str;
use crate::watch::patterns::{build_globset, compile_glob};

#[derive(Debug, Clone)]
struct PositiveGlob {
    pattern: String,
    /// Literal leading directories; outputs are named relative to it.
    base: String,
    matcher: GlobMatcher,
}

/// Compiled `src` list of a task.
#[derive(Debug, Clone)]
pub struct InputSpec {
    positives: Vec<PositiveGlob>,
    negatives: Option<GlobSet>,
}

/// One resolved input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    /// Relative to the source root, `/`-separated.
    pub source_path: String,
    /// Output name relative to the task's `dest` (path below the glob base).
    pub relative: PathBuf,
}

impl InputSpec {
    pub fn compile(patterns: &[String]) -> Result<Self> {
        let mut positives = Vec::new();
        let mut negatives = Vec::new();

        for pattern in patterns {
            let pattern = pattern.trim();
            if let Some(neg) = pattern.strip_prefix('!') {
                negatives.push(strip_dot(neg).to_string());
                continue;
            }
            let pattern = strip_dot(pattern);
            positives.push(PositiveGlob {
                pattern: pattern.to_string(),
                base: glob_base(pattern),
                matcher: compile_glob(pattern)?,
            });
        }

        let negatives = if negatives.is_empty() {
            None
        } else {
            Some(build_globset(&negatives)?)
        };

        Ok(Self { positives, negatives })
    }

    pub fn is_empty(&self) -> bool {
        self.positives.is_empty()
    }

    /// Expand against `source_root`. Every positive glob must match at least
    /// one file.
    pub fn resolve(&self, fs: &dyn FileSystem, source_root: &Path, task: &str) -> Result<Vec<InputFile>> {
        let mut seen = HashSet::new();
        let mut files = Vec::new();

        for glob in &self.positives {
            let mut matched = Vec::new();
            let base_dir = source_root.join(&glob.base);

            if fs.is_file(&base_dir) {
                // Literal file path: its base is the parent directory.
                if self.accepts(glob, &glob.pattern) {
                    matched.push(glob.pattern.clone());
                }
            } else if fs.is_dir(&base_dir) {
                walk_files(fs, &base_dir, &mut |path| {
                    let Some(rel) = relative_str(source_root, &path) else {
                        return;
                    };
                    let rel = rel.trim_start_matches("./");
                    if self.accepts(glob, rel) {
                        matched.push(rel.to_string());
                    }
                })
                .map_err(AssetdagError::Other)?;
            }

            if matched.is_empty() {
                return Err(AssetdagError::MissingInput {
                    task: task.to_string(),
                    pattern: glob.pattern.clone(),
                });
            }

            matched.sort();
            for rel in matched {
                if !seen.insert(rel.clone()) {
                    continue;
                }
                let relative = relative_to_base(&rel, &glob.base, fs.is_file(&base_dir));
                files.push(InputFile {
                    source_path: rel,
                    relative,
                });
            }
        }

        Ok(files)
    }

    fn accepts(&self, glob: &PositiveGlob, rel: &str) -> bool {
        glob.matcher.is_match(rel) && !self.negatives.as_ref().is_some_and(|n| n.is_match(rel))
    }
}

fn strip_dot(pattern: &str) -> &str {
    pattern.strip_prefix("./").unwrap_or(pattern)
}

/// Leading path segments without glob metacharacters.
///
/// For a pattern without any metacharacter this is the whole pattern.
fn glob_base(pattern: &str) -> String {
    let segments: Vec<&str> = pattern.split('/').collect();
    let literal: Vec<&str> = segments
        .iter()
        .take_while(|s| !s.contains(['*', '?', '[', '{']))
        .copied()
        .collect();
    literal.join("/")
}

fn relative_to_base(rel: &str, base: &str, base_is_file: bool) -> PathBuf {
    if base_is_file {
        return PathBuf::from(Path::new(rel).file_name().unwrap_or_default());
    }
    let stripped = if base.is_empty() {
        rel
    } else {
        rel.strip_prefix(base).map(|r| r.trim_start_matches('/')).unwrap_or(rel)
    };
    PathBuf::from(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    fn spec(patterns: &[&str]) -> InputSpec {
        InputSpec::compile(&patterns.iter().map(|s| s.to_string()).collect::<Vec<_>>()).unwrap()
    }

    fn fixture() -> MockFileSystem {
        let fs = MockFileSystem::new();
        fs.add_file("static/app/app.module.js", "m");
        fs.add_file("static/app/b/ctrl.js", "b");
        fs.add_file("static/app/a.js", "a");
        fs.add_file("static/app/a.spec.js", "t");
        fs
    }

    #[test]
    fn earlier_globs_keep_their_position() {
        let fs = fixture();
        let files = spec(&["static/app/app.module.js", "static/app/**/*.js", "!static/app/**/*.spec.js"])
            .resolve(&fs, Path::new("."), "js")
            .unwrap();

        let order: Vec<_> = files.iter().map(|f| f.source_path.as_str()).collect();
        assert_eq!(order, vec!["static/app/app.module.js", "static/app/a.js", "static/app/b/ctrl.js"]);
        assert_eq!(files[0].relative, PathBuf::from("app.module.js"));
        assert_eq!(files[2].relative, PathBuf::from("b/ctrl.js"));
    }

    #[test]
    fn star_does_not_descend() {
        let fs = fixture();
        let files = spec(&["static/app/*.js"]).resolve(&fs, Path::new("."), "js").unwrap();
        assert_eq!(files.len(), 3);
        assert!(files.iter().all(|f| !f.source_path.contains("/b/")));
    }

    #[test]
    fn positive_glob_without_matches_is_missing_input() {
        let fs = fixture();
        let err = spec(&["static/app/*.js", "static/vendor/**/*.js"])
            .resolve(&fs, Path::new("."), "libs")
            .unwrap_err();
        assert!(matches!(
            err,
            AssetdagError::MissingInput { ref task, ref pattern } if task == "libs" && pattern == "static/vendor/**/*.js"
        ));
    }

    #[test]
    fn symlinked_directories_are_not_expanded() {
        let fs = MockFileSystem::new();
        fs.add_file("src/less/site.less", "a{}");
        fs.add_dir_symlink("src/less/loop");
        fs.add_file("src/less/loop/less/site.less", "a{}");

        let files = spec(&["**/*.less"]).resolve(&fs, Path::new("src"), "less").unwrap();
        let paths: Vec<_> = files.iter().map(|f| f.source_path.as_str()).collect();
        assert_eq!(paths, vec!["less/site.less"]);
    }

    #[test]
    fn base_is_the_literal_prefix() {
        assert_eq!(glob_base("static/app/**/*.js"), "static/app");
        assert_eq!(glob_base("**/*.less"), "");
        assert_eq!(glob_base("static/less/main.less"), "static/less/main.less");
    }
}
