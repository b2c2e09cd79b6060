// src/transform/sourcemap.rs

//! Source Map v3 emission.
//!
//! Mappings are line-granular: each generated line that has a
//! [`LineOrigin`](super::LineOrigin) gets one segment at column 0 pointing
//! at column 0 of the original line.

use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::{Asset, StepContext, StepError, Transform};

/// Root under which `sources` are presented to the browser's devtools.
const SOURCE_ROOT: &str = "/source/";

const BASE64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Emit `<file>.map` for every asset and append a `sourceMappingURL`
/// comment to it.
#[derive(Debug, Clone, Default)]
pub struct EmitSourceMap {
    /// Directory for map files, relative to the asset's own directory.
    /// Empty means "next to the asset".
    dir: String,
}

impl EmitSourceMap {
    pub fn new(dir: impl Into<String>) -> Self {
        Self { dir: dir.into() }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SourceMapV3 {
    version: u8,
    file: String,
    source_root: &'static str,
    sources: Vec<String>,
    sources_content: Vec<String>,
    names: Vec<String>,
    mappings: String,
}

impl Transform for EmitSourceMap {
    fn name(&self) -> &str {
        "sourcemap"
    }

    fn apply(&self, assets: Vec<Asset>, _ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError> {
        let mut out = Vec::with_capacity(assets.len() * 2);

        for mut asset in assets {
            let file = asset.file_name();
            let map_rel = normalize(&Path::new(&self.dir).join(format!("{file}.map")));
            let map_path = normalize(&asset.dir().join(&map_rel));

            let map = SourceMapV3 {
                version: 3,
                file: file.clone(),
                source_root: SOURCE_ROOT,
                sources: asset.sources.iter().map(|s| s.path.clone()).collect(),
                sources_content: asset.sources.iter().map(|s| s.contents.to_string()).collect(),
                names: Vec::new(),
                mappings: encode_mappings(&asset),
            };
            let json = serde_json::to_string(&map)
                .map_err(|e| StepError::new(format!("serializing source map for {file}: {e}")))?;

            let url = map_rel.to_string_lossy().replace('\\', "/");
            let comment = if asset.extension() == Some("css") {
                format!("/*# sourceMappingURL={url} */\n")
            } else {
                format!("//# sourceMappingURL={url}\n")
            };
            if !asset.contents.is_empty() && !asset.contents.ends_with('\n') {
                asset.contents.push('\n');
            }
            asset.contents.push_str(&comment);
            asset.origins.push(None);

            out.push(asset);
            out.push(Asset::generated(map_path, json));
        }

        Ok(out)
    }
}

/// Encode the `mappings` field for an asset's line origins.
pub fn encode_mappings(asset: &Asset) -> String {
    let mut out = String::new();
    let mut prev_source: i64 = 0;
    let mut prev_line: i64 = 0;

    for (idx, origin) in asset.origins.iter().enumerate() {
        if idx > 0 {
            out.push(';');
        }
        if let Some(o) = origin {
            let source = o.source as i64;
            let line = o.line as i64;
            encode_vlq(0, &mut out);
            encode_vlq(source - prev_source, &mut out);
            encode_vlq(line - prev_line, &mut out);
            encode_vlq(0, &mut out);
            prev_source = source;
            prev_line = line;
        }
    }

    out
}

/// Append the Base64 VLQ encoding of `value`.
pub fn encode_vlq(value: i64, out: &mut String) {
    let mut vlq = if value < 0 {
        ((-value) << 1) | 1
    } else {
        value << 1
    };

    loop {
        let mut digit = (vlq & 0b11111) as usize;
        vlq >>= 5;
        if vlq > 0 {
            digit |= 0b100000;
        }
        out.push(BASE64[digit] as char);
        if vlq == 0 {
            break;
        }
    }
}

fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;
    use crate::transform::{Concat, Transform};

    fn vlq(v: i64) -> String {
        let mut s = String::new();
        encode_vlq(v, &mut s);
        s
    }

    #[test]
    fn vlq_matches_reference_values() {
        assert_eq!(vlq(0), "A");
        assert_eq!(vlq(1), "C");
        assert_eq!(vlq(-1), "D");
        assert_eq!(vlq(15), "e");
        assert_eq!(vlq(16), "gB");
        assert_eq!(vlq(-17), "jB");
    }

    #[test]
    fn concat_then_map_points_back_at_each_input() {
        let fs = MockFileSystem::new();
        let ctx = StepContext {
            fs: &fs,
            source_root: Path::new("."),
            task: "js",
        };
        let inputs = vec![
            Asset::from_source("a.js", "app/a.js", "a1\na2\n"),
            Asset::from_source("b.js", "app/b.js", "b1\n"),
        ];
        let merged = Concat::new("all.js").apply(inputs, &ctx).unwrap();
        let out = EmitSourceMap::new("maps").apply(merged, &ctx).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].contents, "a1\na2\nb1\n//# sourceMappingURL=maps/all.js.map\n");
        assert_eq!(out[1].path, PathBuf::from("maps/all.js.map"));

        let map: serde_json::Value = serde_json::from_str(&out[1].contents).unwrap();
        assert_eq!(map["version"], 3);
        assert_eq!(map["file"], "all.js");
        assert_eq!(map["sources"], serde_json::json!(["app/a.js", "app/b.js"]));
        // a.js:0, a.js:1, b.js:0 (source +1, line -1), comment line unmapped.
        assert_eq!(map["mappings"], "AAAA;AACA;ACDA;");
    }
}
