// src/transform/style/compiler.rs

use std::collections::{HashMap, HashSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, LazyLock};

use regex::Regex;

use super::parser::{self, Node, Pos, find_top_level};
use crate::transform::{StepContext, StepError};

static ESCAPED_STRING: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"~"([^"]*)"|~'([^']*)'"#).expect("escape regex is valid"));

const MAX_VARIABLE_DEPTH: usize = 16;

/// Compiled CSS, ready to be written out with line origins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CssItem {
    Rule {
        selector: String,
        decls: Vec<Decl>,
        pos: Pos,
    },
    Statement {
        text: String,
        pos: Pos,
    },
    Decl(Decl),
    Block {
        header: String,
        items: Vec<CssItem>,
        pos: Pos,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decl {
    pub property: String,
    pub value: String,
    pub pos: Pos,
}

/// A loaded stylesheet: index 0 is the file being compiled, the rest were
/// pulled in through `@import`.
#[derive(Debug, Clone)]
pub struct Sheet {
    pub path: String,
    pub contents: Arc<str>,
}

#[derive(Debug, Clone)]
struct VarDef {
    value: String,
    pos: Pos,
}

type Frame = HashMap<String, VarDef>;

#[derive(Debug, Clone)]
struct MixinDef {
    children: Vec<Node>,
    parametric: bool,
}

pub struct Compiler<'a> {
    ctx: &'a StepContext<'a>,
    pub sheets: Vec<Sheet>,
    mixins: HashMap<String, Vec<MixinDef>>,
    mixin_stack: Vec<String>,
}

impl<'a> Compiler<'a> {
    pub fn new(ctx: &'a StepContext<'a>, root: Sheet) -> Self {
        Self {
            ctx,
            sheets: vec![root],
            mixins: HashMap::new(),
            mixin_stack: Vec::new(),
        }
    }

    fn err(&self, pos: Pos, msg: impl std::fmt::Display) -> StepError {
        let file = self
            .sheets
            .get(pos.source)
            .map(|s| s.path.as_str())
            .unwrap_or("<unknown>");
        StepError::at(file, pos.line, msg)
    }

    /// Parse, expand imports and compile the root sheet.
    pub fn compile(&mut self) -> Result<Vec<CssItem>, StepError> {
        let root = self.sheets[0].clone();
        let nodes = parser::parse(&root.contents, 0, &root.path)?;

        let mut imported = HashSet::from([root.path.clone()]);
        let mut stack = vec![root.path.clone()];
        let nodes = self.expand_imports(nodes, &mut imported, &mut stack)?;

        self.collect_mixins(&nodes, None);

        let mut scopes = Vec::new();
        let mut decls = Vec::new();
        let mut out = Vec::new();
        self.compile_body(&nodes, None, false, false, &mut scopes, &mut decls, &mut out)?;
        Ok(out)
    }

    fn expand_imports(
        &mut self,
        nodes: Vec<Node>,
        imported: &mut HashSet<String>,
        stack: &mut Vec<String>,
    ) -> Result<Vec<Node>, StepError> {
        let mut out = Vec::with_capacity(nodes.len());

        for node in nodes {
            match node {
                Node::Import { target, pos } => match import_path(&target) {
                    None => out.push(Node::AtStatement {
                        text: format!("@import {target}"),
                        pos,
                    }),
                    Some(rel) => {
                        let importer = self.sheets[pos.source].path.clone();
                        let path = resolve_relative(&importer, &rel);

                        if stack.contains(&path) {
                            return Err(self.err(pos, format!("import cycle through {path}")));
                        }
                        if !imported.insert(path.clone()) {
                            continue;
                        }

                        let contents = self
                            .ctx
                            .fs
                            .read_to_string(&self.ctx.source_root.join(&path))
                            .map_err(|e| self.err(pos, format!("cannot import {path}: {e:#}")))?;
                        let source = self.sheets.len();
                        self.sheets.push(Sheet {
                            path: path.clone(),
                            contents: Arc::from(contents.as_str()),
                        });

                        let parsed = parser::parse(&contents, source, &path)?;
                        stack.push(path);
                        let expanded = self.expand_imports(parsed, imported, stack)?;
                        stack.pop();
                        out.extend(expanded);
                    }
                },
                Node::Rule {
                    selector,
                    children,
                    pos,
                } => out.push(Node::Rule {
                    selector,
                    children: self.expand_imports(children, imported, stack)?,
                    pos,
                }),
                Node::AtBlock {
                    name,
                    prelude,
                    children,
                    pos,
                } => out.push(Node::AtBlock {
                    name,
                    prelude,
                    children: self.expand_imports(children, imported, stack)?,
                    pos,
                }),
                other => out.push(other),
            }
        }

        Ok(out)
    }

    fn collect_mixins(&mut self, nodes: &[Node], parents: Option<&[String]>) {
        for node in nodes {
            let Node::Rule {
                selector, children, ..
            } = node
            else {
                continue;
            };

            let (base, params) = split_mixin_params(selector);
            let parts: Vec<String> = split_selector_list(base);
            let joined = join_selectors(parents, &parts);

            for key in &joined {
                self.mixins.entry(mixin_key(key)).or_default().push(MixinDef {
                    children: children.clone(),
                    parametric: params.is_some_and(|p| !p.trim().is_empty()),
                });
            }

            self.collect_mixins(children, Some(&joined));
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_body(
        &mut self,
        nodes: &[Node],
        selectors: Option<&[String]>,
        bare_decls: bool,
        important: bool,
        scopes: &mut Vec<Frame>,
        decls: &mut Vec<Decl>,
        nested: &mut Vec<CssItem>,
    ) -> Result<(), StepError> {
        let frame = nodes
            .iter()
            .filter_map(|n| match n {
                Node::Variable { name, value, pos } => Some((
                    name.clone(),
                    VarDef {
                        value: value.clone(),
                        pos: *pos,
                    },
                )),
                _ => None,
            })
            .collect();
        scopes.push(frame);
        let result = self.compile_children(nodes, selectors, bare_decls, important, scopes, decls, nested);
        scopes.pop();
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn compile_children(
        &mut self,
        nodes: &[Node],
        selectors: Option<&[String]>,
        bare_decls: bool,
        important: bool,
        scopes: &mut Vec<Frame>,
        decls: &mut Vec<Decl>,
        nested: &mut Vec<CssItem>,
    ) -> Result<(), StepError> {
        for node in nodes {
            match node {
                Node::Variable { .. } => {}
                Node::Import { pos, .. } => {
                    return Err(self.err(*pos, "unresolved @import"));
                }
                Node::Declaration {
                    property,
                    value,
                    pos,
                } => {
                    if selectors.is_none() && !bare_decls {
                        return Err(self.err(*pos, format!("declaration `{property}` outside of a ruleset")));
                    }
                    let property = self.interpolate(property, scopes, *pos)?;
                    let mut value = self.evaluate(value, scopes, *pos)?;
                    if important && !value.ends_with("!important") {
                        value.push_str(" !important");
                    }
                    decls.push(Decl {
                        property,
                        value,
                        pos: *pos,
                    });
                }
                Node::MixinCall {
                    selector,
                    important: call_important,
                    pos,
                    ..
                } => {
                    if selectors.is_none() && !bare_decls {
                        return Err(self.err(*pos, format!("mixin call `{selector}` outside of a ruleset")));
                    }
                    self.apply_mixin(
                        selector,
                        *pos,
                        selectors,
                        bare_decls,
                        important || *call_important,
                        scopes,
                        decls,
                        nested,
                    )?;
                }
                Node::AtStatement { text, pos } => {
                    let keyword_len = text.find(char::is_whitespace).unwrap_or(text.len());
                    let (keyword, rest) = text.split_at(keyword_len);
                    nested.push(CssItem::Statement {
                        text: format!("{keyword}{}", self.evaluate(rest, scopes, *pos)?),
                        pos: *pos,
                    });
                }
                Node::Rule {
                    selector,
                    children,
                    pos,
                } => {
                    let (base, params) = split_mixin_params(selector);
                    if params.is_some() {
                        // `.name()` and parametric definitions produce no output.
                        continue;
                    }
                    let base = self.interpolate(base, scopes, *pos)?;
                    let joined = join_selectors(selectors, &split_selector_list(&base));
                    self.compile_rule(joined, children, *pos, important, scopes, nested)?;
                }
                Node::AtBlock {
                    name,
                    prelude,
                    children,
                    pos,
                } => {
                    let prelude = self.evaluate(prelude, scopes, *pos)?;
                    let header = if prelude.is_empty() {
                        format!("@{name}")
                    } else {
                        format!("@{name} {prelude}")
                    };

                    let mut items = Vec::new();
                    if matches!(name.as_str(), "media" | "supports") {
                        match selectors {
                            Some(parents) => {
                                self.compile_rule(parents.to_vec(), children, *pos, important, scopes, &mut items)?;
                            }
                            None => {
                                let mut block_decls = Vec::new();
                                self.compile_body(
                                    children,
                                    None,
                                    bare_decls,
                                    important,
                                    scopes,
                                    &mut block_decls,
                                    &mut items,
                                )?;
                                let mut all: Vec<CssItem> = block_decls.into_iter().map(CssItem::Decl).collect();
                                all.append(&mut items);
                                items = all;
                            }
                        }
                    } else {
                        let mut block_decls = Vec::new();
                        let mut inner = Vec::new();
                        self.compile_body(children, None, true, false, scopes, &mut block_decls, &mut inner)?;
                        items.extend(block_decls.into_iter().map(CssItem::Decl));
                        items.append(&mut inner);
                    }

                    if !items.is_empty() {
                        nested.push(CssItem::Block {
                            header,
                            items,
                            pos: *pos,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn compile_rule(
        &mut self,
        selectors: Vec<String>,
        children: &[Node],
        pos: Pos,
        important: bool,
        scopes: &mut Vec<Frame>,
        out: &mut Vec<CssItem>,
    ) -> Result<(), StepError> {
        let mut decls = Vec::new();
        let mut nested = Vec::new();
        self.compile_body(children, Some(&selectors), false, important, scopes, &mut decls, &mut nested)?;

        if !decls.is_empty() {
            out.push(CssItem::Rule {
                selector: selectors.join(", "),
                decls,
                pos,
            });
        }
        out.append(&mut nested);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn apply_mixin(
        &mut self,
        selector: &str,
        pos: Pos,
        selectors: Option<&[String]>,
        bare_decls: bool,
        important: bool,
        scopes: &mut Vec<Frame>,
        decls: &mut Vec<Decl>,
        nested: &mut Vec<CssItem>,
    ) -> Result<(), StepError> {
        let key = mixin_key(selector);
        let Some(defs) = self.mixins.get(&key).cloned() else {
            return Err(self.err(pos, format!("undefined mixin `{selector}`")));
        };
        if self.mixin_stack.contains(&key) {
            return Err(self.err(pos, format!("recursive mixin call `{selector}`")));
        }

        self.mixin_stack.push(key);
        let mut result = Ok(());
        for def in &defs {
            if def.parametric {
                result = Err(self.err(pos, format!("mixin `{selector}` takes parameters, which are not supported")));
                break;
            }
            result = self.compile_body(&def.children, selectors, bare_decls, important, scopes, decls, nested);
            if result.is_err() {
                break;
            }
        }
        self.mixin_stack.pop();
        result
    }

    /// Substitute variables in a value and unquote `~"..."` escapes.
    fn evaluate(&self, text: &str, scopes: &[Frame], pos: Pos) -> Result<String, StepError> {
        Ok(unescape(&self.substitute(text, scopes, pos, true, 0)?))
    }

    /// Substitute `@{name}` only (selectors and property names).
    fn interpolate(&self, text: &str, scopes: &[Frame], pos: Pos) -> Result<String, StepError> {
        Ok(unescape(&self.substitute(text, scopes, pos, false, 0)?))
    }

    fn substitute(
        &self,
        text: &str,
        scopes: &[Frame],
        pos: Pos,
        bare_refs: bool,
        depth: usize,
    ) -> Result<String, StepError> {
        let mut out = String::with_capacity(text.len());
        let mut quote: Option<char> = None;
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            if let Some(q) = quote {
                if c == q {
                    quote = None;
                }
            } else if c == '"' || c == '\'' {
                quote = Some(c);
            }

            if c == '@' {
                if let Some(inner) = rest.strip_prefix("@{") {
                    if let Some(end) = inner.find('}') {
                        let name = &inner[..end];
                        let value = self.lookup(name, scopes, pos, depth)?;
                        out.push_str(unquote(&value));
                        rest = &inner[end + 1..];
                        continue;
                    }
                }
                if bare_refs && quote.is_none() {
                    let name_len = rest[1..]
                        .find(|c: char| !(c.is_alphanumeric() || c == '-' || c == '_'))
                        .unwrap_or(rest.len() - 1);
                    if name_len > 0 {
                        let name = &rest[1..1 + name_len];
                        out.push_str(&self.lookup(name, scopes, pos, depth)?);
                        rest = &rest[1 + name_len..];
                        continue;
                    }
                }
            }

            out.push(c);
            rest = &rest[c.len_utf8()..];
        }

        Ok(out)
    }

    fn lookup(&self, name: &str, scopes: &[Frame], pos: Pos, depth: usize) -> Result<String, StepError> {
        if depth >= MAX_VARIABLE_DEPTH {
            return Err(self.err(pos, format!("variable @{name} is defined recursively")));
        }
        for k in (0..scopes.len()).rev() {
            if let Some(def) = scopes[k].get(name) {
                return self.substitute(&def.value, &scopes[..=k], def.pos, true, depth + 1);
            }
        }
        Err(self.err(pos, format!("undefined variable @{name}")))
    }
}

/// For `@import` targets that name a stylesheet to inline, the path to load.
/// `None` for imports that stay in the CSS output.
fn import_path(target: &str) -> Option<String> {
    let mut target = target.trim();
    if target.starts_with('(') {
        let close = target.find(')')?;
        target = target[close + 1..].trim_start();
    }
    if target.starts_with("url(") {
        return None;
    }

    let quote = target.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let end = target[1..].find(quote)? + 1;
    let path = &target[1..end];
    let media = target[end + 1..].trim();

    if path.ends_with(".css") || path.contains("://") || !media.is_empty() {
        return None;
    }
    if Path::new(path).extension().is_some() {
        Some(path.to_string())
    } else {
        Some(format!("{path}.less"))
    }
}

/// Resolve `rel` against the directory of `importer`; both relative to the
/// source root, `/`-separated.
fn resolve_relative(importer: &str, rel: &str) -> String {
    let base = Path::new(importer).parent().unwrap_or(Path::new(""));
    let mut parts: Vec<String> = Vec::new();
    for comp in base.join(rel).components() {
        match comp {
            Component::CurDir => {}
            Component::ParentDir => {
                parts.pop();
            }
            other => parts.push(other.as_os_str().to_string_lossy().into_owned()),
        }
    }
    parts.iter().collect::<PathBuf>().to_string_lossy().replace('\\', "/")
}

fn unescape(text: &str) -> String {
    ESCAPED_STRING
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .or_else(|| caps.get(2))
                .map(|m| m.as_str().to_string())
                .unwrap_or_default()
        })
        .into_owned()
}

fn unquote(value: &str) -> &str {
    let v = value.trim();
    let v = v.strip_prefix('~').unwrap_or(v);
    for q in ['"', '\''] {
        if let Some(inner) = v.strip_prefix(q).and_then(|s| s.strip_suffix(q)) {
            return inner;
        }
    }
    v
}

/// Split `".m(@a)"` into `(".m", Some("@a"))`.
fn split_mixin_params(selector: &str) -> (&str, Option<&str>) {
    let trimmed = selector.trim();
    if !(trimmed.starts_with('.') || trimmed.starts_with('#')) || !trimmed.ends_with(')') {
        return (trimmed, None);
    }
    match trimmed.find('(') {
        // `:not(...)` and similar pseudo-classes are not mixin parameters.
        Some(open) if !trimmed[..open].contains(':') => {
            (trimmed[..open].trim_end(), Some(&trimmed[open + 1..trimmed.len() - 1]))
        }
        _ => (trimmed, None),
    }
}

fn split_selector_list(selector: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut rest = selector;
    while let Some(idx) = find_top_level(rest, ',') {
        parts.push(rest[..idx].trim().to_string());
        rest = &rest[idx + 1..];
    }
    parts.push(rest.trim().to_string());
    parts.retain(|p| !p.is_empty());
    parts
}

fn join_selectors(parents: Option<&[String]>, children: &[String]) -> Vec<String> {
    match parents {
        None => children.iter().map(|c| c.replace('&', "").trim().to_string()).collect(),
        Some(parents) => parents
            .iter()
            .flat_map(|p| {
                children.iter().map(move |c| {
                    if c.contains('&') {
                        c.replace('&', p)
                    } else {
                        format!("{p} {c}")
                    }
                })
            })
            .collect(),
    }
}

fn mixin_key(selector: &str) -> String {
    let (base, _) = split_mixin_params(selector);
    base.replace('>', " ").split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_targets() {
        assert_eq!(import_path("\"mixins\""), Some("mixins.less".into()));
        assert_eq!(import_path("'theme.less'"), Some("theme.less".into()));
        assert_eq!(import_path("(reference) \"vars\""), Some("vars.less".into()));
        assert_eq!(import_path("\"base.css\""), None);
        assert_eq!(import_path("url(fonts.css)"), None);
        assert_eq!(import_path("\"print\" print"), None);
    }

    #[test]
    fn relative_import_resolution() {
        assert_eq!(resolve_relative("styles/main.less", "parts/nav.less"), "styles/parts/nav.less");
        assert_eq!(resolve_relative("styles/main.less", "../lib/a.less"), "lib/a.less");
        assert_eq!(resolve_relative("main.less", "./a.less"), "a.less");
    }

    #[test]
    fn selector_joining() {
        let parents = vec![".a".to_string(), ".b".to_string()];
        let children = split_selector_list("&:hover, span");
        assert_eq!(
            join_selectors(Some(&parents), &children),
            vec![".a:hover", ".a span", ".b:hover", ".b span"]
        );
    }

    #[test]
    fn mixin_params_are_split_from_selector() {
        assert_eq!(split_mixin_params(".m()"), (".m", Some("")));
        assert_eq!(split_mixin_params(".m(@a; @b)"), (".m", Some("@a; @b")));
        assert_eq!(split_mixin_params(".a:not(.b)"), (".a:not(.b)", None));
        assert_eq!(mixin_key("#ns > .m()"), "#ns .m");
    }
}
