// src/transform/style/mod.rs

//! Stylesheet compilation (a practical LESS subset) to plain CSS.
//!
//! Supported: comments, block-scoped variables (resolved lazily, last
//! definition wins), `@{var}` interpolation, nested rules with `&`, selector
//! lists, `@import` of other stylesheets, parameterless mixins,
//! `@media`/`@supports` bubbling and `~"..."` escapes. Anything else that
//! starts with `@` is passed through.

use std::sync::Arc;

use super::{Asset, LineOrigin, MappedText, SourceFile, StepContext, StepError, Transform};

mod compiler;
pub mod parser;

use compiler::{Compiler, CssItem, Sheet};

const INDENT: &str = "  ";

/// The `less` step: compiles each asset to a `.css` asset of the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct CompileStyle;

impl Transform for CompileStyle {
    fn name(&self) -> &str {
        "less"
    }

    fn apply(&self, assets: Vec<Asset>, ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError> {
        assets.into_iter().map(|asset| compile_asset(asset, ctx)).collect()
    }
}

fn compile_asset(asset: Asset, ctx: &StepContext<'_>) -> Result<Asset, StepError> {
    let file = asset
        .source_path
        .clone()
        .unwrap_or_else(|| asset.path.to_string_lossy().replace('\\', "/"));

    let mut compiler = Compiler::new(
        ctx,
        Sheet {
            path: file,
            contents: Arc::from(asset.contents.as_str()),
        },
    );
    let items = compiler.compile()?;

    let mut out = MappedText::new();
    // Lines of the asset itself map through its existing origins; imported
    // sheets become new sources.
    let remap: Vec<usize> = asset
        .sources
        .iter()
        .map(|s| out.add_source(s.clone()))
        .collect();
    let imported: Vec<usize> = compiler
        .sheets
        .iter()
        .skip(1)
        .map(|sheet| {
            out.add_source(SourceFile {
                path: sheet.path.clone(),
                contents: sheet.contents.clone(),
            })
        })
        .collect();

    let origin = |pos: parser::Pos| -> Option<LineOrigin> {
        if pos.source == 0 {
            asset
                .origins
                .get(pos.line as usize)
                .copied()
                .flatten()
                .map(|o| LineOrigin {
                    source: remap.get(o.source).copied().unwrap_or(o.source),
                    line: o.line,
                })
        } else {
            imported.get(pos.source - 1).map(|&source| LineOrigin {
                source,
                line: pos.line,
            })
        }
    };

    write_items(&items, 0, &mut out, &origin);

    let mut path = asset.path.clone();
    path.set_extension("css");
    Ok(out.finish(path, asset.source_path.clone()))
}

fn write_items(
    items: &[CssItem],
    depth: usize,
    out: &mut MappedText,
    origin: &dyn Fn(parser::Pos) -> Option<LineOrigin>,
) {
    let pad = INDENT.repeat(depth);
    for item in items {
        match item {
            CssItem::Rule { selector, decls, pos } => {
                out.push_line(&format!("{pad}{selector} {{"), origin(*pos));
                for d in decls {
                    out.push_line(
                        &format!("{pad}{INDENT}{}: {};", d.property, d.value),
                        origin(d.pos),
                    );
                }
                out.push_line(&format!("{pad}}}"), origin(*pos));
            }
            CssItem::Statement { text, pos } => {
                out.push_line(&format!("{pad}{text};"), origin(*pos));
            }
            CssItem::Decl(d) => {
                out.push_line(&format!("{pad}{}: {};", d.property, d.value), origin(d.pos));
            }
            CssItem::Block { header, items, pos } => {
                out.push_line(&format!("{pad}{header} {{"), origin(*pos));
                write_items(items, depth + 1, out, origin);
                out.push_line(&format!("{pad}}}"), origin(*pos));
            }
        }
    }
}
