// src/transform/asset.rs

//! In-flight file representation shared by every transform step.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// An original input file referenced by a source map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the source root, with `/` separators.
    pub path: String,
    pub contents: Arc<str>,
}

/// Where a generated line came from: an index into the owning asset's
/// `sources` and a zero-based line number in that source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineOrigin {
    pub source: usize,
    pub line: u32,
}

/// A file flowing through a task's transform chain.
///
/// `origins` holds one entry per line of `contents` (as produced by
/// `split_inclusive('\n')`); `MappedText` maintains that invariant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Output path relative to the task's destination directory.
    pub path: PathBuf,
    pub contents: String,
    /// File this asset was read from, relative to the source root. `None`
    /// once several inputs have been merged.
    pub source_path: Option<String>,
    pub sources: Vec<SourceFile>,
    pub origins: Vec<Option<LineOrigin>>,
}

impl Asset {
    /// An asset read straight from disk: every line maps to itself.
    pub fn from_source(
        path: impl Into<PathBuf>,
        source_path: impl Into<String>,
        contents: impl Into<String>,
    ) -> Self {
        let contents = contents.into();
        let source_path = source_path.into();
        let origins = (0..line_count(&contents))
            .map(|line| {
                Some(LineOrigin {
                    source: 0,
                    line: line as u32,
                })
            })
            .collect();

        Self {
            path: path.into(),
            sources: vec![SourceFile {
                path: source_path.clone(),
                contents: Arc::from(contents.as_str()),
            }],
            contents,
            source_path: Some(source_path),
            origins,
        }
    }

    /// An asset with no traceable origin (e.g. a generated map file).
    pub fn generated(path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        let contents = contents.into();
        Self {
            path: path.into(),
            origins: vec![None; line_count(&contents)],
            contents,
            source_path: None,
            sources: Vec::new(),
        }
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    /// Directory part of `path` (empty for top-level outputs).
    pub fn dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new(""))
    }
}

/// Number of lines in the `split_inclusive('\n')` sense.
pub fn line_count(text: &str) -> usize {
    text.split_inclusive('\n').count()
}

/// Text buffer that tracks a [`LineOrigin`] per line while it is built.
///
/// Appending text that does not start a new line (the buffer does not end in
/// `\n`) merges into the current line, which keeps its existing origin.
#[derive(Debug, Default)]
pub struct MappedText {
    text: String,
    sources: Vec<SourceFile>,
    origins: Vec<Option<LineOrigin>>,
}

impl MappedText {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source, returning its index. Sources are deduplicated by
    /// path.
    pub fn add_source(&mut self, source: SourceFile) -> usize {
        if let Some(idx) = self.sources.iter().position(|s| s.path == source.path) {
            return idx;
        }
        self.sources.push(source);
        self.sources.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn ends_with_newline(&self) -> bool {
        self.text.ends_with('\n')
    }

    /// Append text whose lines all share one origin.
    pub fn push_str(&mut self, s: &str, origin: Option<LineOrigin>) {
        self.push_segment(s, |_| origin);
    }

    /// Append a full line (a trailing `\n` is added).
    pub fn push_line(&mut self, line: &str, origin: Option<LineOrigin>) {
        if !self.text.is_empty() && !self.text.ends_with('\n') {
            self.text.push('\n');
        }
        self.push_segment(line, |_| origin);
        self.text.push('\n');
    }

    /// Append another asset, carrying its sources and line origins over.
    pub fn push_asset(&mut self, asset: &Asset) {
        let remap: Vec<usize> = asset
            .sources
            .iter()
            .map(|s| self.add_source(s.clone()))
            .collect();

        self.push_segment(&asset.contents, |i| {
            asset.origins.get(i).copied().flatten().map(|o| LineOrigin {
                source: remap.get(o.source).copied().unwrap_or(o.source),
                line: o.line,
            })
        });
    }

    fn push_segment(&mut self, s: &str, mut origin_of: impl FnMut(usize) -> Option<LineOrigin>) {
        for (i, piece) in s.split_inclusive('\n').enumerate() {
            let at_line_start = self.text.is_empty() || self.text.ends_with('\n');
            if at_line_start {
                self.origins.push(origin_of(i));
            } else if let Some(last) = self.origins.last_mut() {
                if last.is_none() {
                    *last = origin_of(i);
                }
            }
            self.text.push_str(piece);
        }
    }

    pub fn finish(self, path: impl Into<PathBuf>, source_path: Option<String>) -> Asset {
        Asset {
            path: path.into(),
            contents: self.text,
            source_path,
            sources: self.sources,
            origins: self.origins,
        }
    }
}
