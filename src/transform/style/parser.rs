// src/transform/style/parser.rs

//! Stylesheet parser: turns source text into a tree of [`Node`]s.
//!
//! The parser only understands structure (statements, blocks, strings,
//! comments). Variables, selectors and values are kept as text and resolved
//! by the compiler.

use std::sync::LazyLock;

use regex::Regex;

use crate::transform::StepError;

static VARIABLE_STATEMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)^@([A-Za-z0-9_-]+)\s*:(.*)$").expect("variable regex is valid")
});

/// Location of a node: source index plus zero-based line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub source: usize,
    pub line: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// `@name: value;`
    Variable { name: String, value: String, pos: Pos },
    /// `property: value;`
    Declaration {
        property: String,
        value: String,
        pos: Pos,
    },
    /// `@import <target>;` (target kept verbatim, quotes included).
    Import { target: String, pos: Pos },
    /// `.name;`, `.name();`, `#ns > .name() !important;`
    MixinCall {
        selector: String,
        args: String,
        important: bool,
        pos: Pos,
    },
    /// Any other `@rule ...;` statement, e.g. `@charset "utf-8";`.
    AtStatement { text: String, pos: Pos },
    /// `selector { ... }`
    Rule {
        selector: String,
        children: Vec<Node>,
        pos: Pos,
    },
    /// `@name prelude { ... }`
    AtBlock {
        name: String,
        prelude: String,
        children: Vec<Node>,
        pos: Pos,
    },
}

/// Parse `src` (registered as source `source`, reported as `file`).
pub fn parse(src: &str, source: usize, file: &str) -> Result<Vec<Node>, StepError> {
    let mut parser = Parser {
        chars: src.chars().collect(),
        i: 0,
        line: 0,
        source,
        file,
    };
    parser.parse_block(None)
}

struct Parser<'a> {
    chars: Vec<char>,
    i: usize,
    line: u32,
    source: usize,
    file: &'a str,
}

/// Text of the statement or block header being accumulated.
#[derive(Default)]
struct Pending {
    text: String,
    line: Option<u32>,
}

impl Pending {
    fn push(&mut self, c: char, line: u32) {
        if self.line.is_none() && !c.is_whitespace() {
            self.line = Some(line);
        }
        self.text.push(c);
    }

    fn take(&mut self) -> (String, Option<u32>) {
        let text = std::mem::take(&mut self.text);
        (text.trim().to_string(), self.line.take())
    }
}

impl Parser<'_> {
    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.i + offset).copied()
    }

    fn err(&self, line: u32, msg: impl std::fmt::Display) -> StepError {
        StepError::at(self.file, line, msg)
    }

    fn pos(&self, line: u32) -> Pos {
        Pos {
            source: self.source,
            line,
        }
    }

    fn parse_block(&mut self, opened_at: Option<u32>) -> Result<Vec<Node>, StepError> {
        let mut nodes = Vec::new();
        let mut pending = Pending::default();
        let mut parens = 0usize;

        loop {
            let Some(c) = self.peek_at(0) else {
                if let Some(line) = opened_at {
                    return Err(self.err(line, "unclosed block: missing '}'"));
                }
                self.flush_statement(&mut pending, &mut nodes)?;
                return Ok(nodes);
            };
            let next = self.peek_at(1);

            match c {
                '\n' => {
                    pending.push(' ', self.line);
                    self.line += 1;
                    self.i += 1;
                }
                '"' | '\'' => self.read_string(&mut pending)?,
                '/' if next == Some('*') => self.skip_block_comment()?,
                '/' if next == Some('/') && parens == 0 => {
                    while self.peek_at(0).is_some_and(|c| c != '\n') {
                        self.i += 1;
                    }
                }
                '@' if next == Some('{') => {
                    while let Some(c) = self.peek_at(0) {
                        pending.push(c, self.line);
                        self.i += 1;
                        if c == '}' {
                            break;
                        }
                        if c == '\n' {
                            return Err(self.err(self.line, "unterminated '@{' interpolation"));
                        }
                    }
                }
                '(' => {
                    parens += 1;
                    pending.push(c, self.line);
                    self.i += 1;
                }
                ')' => {
                    parens = parens.saturating_sub(1);
                    pending.push(c, self.line);
                    self.i += 1;
                }
                ';' if parens == 0 => {
                    self.i += 1;
                    self.flush_statement(&mut pending, &mut nodes)?;
                }
                '{' if parens == 0 => {
                    self.i += 1;
                    let (header, line) = pending.take();
                    let line = line.unwrap_or(self.line);
                    let children = self.parse_block(Some(line))?;
                    nodes.push(self.classify_block(header, children, line)?);
                }
                '}' if parens == 0 => {
                    if opened_at.is_none() {
                        return Err(self.err(self.line, "unexpected '}'"));
                    }
                    self.i += 1;
                    self.flush_statement(&mut pending, &mut nodes)?;
                    return Ok(nodes);
                }
                _ => {
                    pending.push(c, self.line);
                    self.i += 1;
                }
            }
        }
    }

    fn read_string(&mut self, pending: &mut Pending) -> Result<(), StepError> {
        let quote = self.chars[self.i];
        let start = self.line;
        pending.push(quote, self.line);
        self.i += 1;

        while let Some(c) = self.peek_at(0) {
            match c {
                '\n' => break,
                '\\' => {
                    pending.push(c, self.line);
                    if let Some(n) = self.peek_at(1) {
                        if n == '\n' {
                            self.line += 1;
                        }
                        pending.push(n, self.line);
                    }
                    self.i += 2;
                }
                _ => {
                    pending.push(c, self.line);
                    self.i += 1;
                    if c == quote {
                        return Ok(());
                    }
                }
            }
        }

        Err(self.err(start, "unterminated string"))
    }

    fn skip_block_comment(&mut self) -> Result<(), StepError> {
        let start = self.line;
        self.i += 2;
        while let Some(c) = self.peek_at(0) {
            if c == '*' && self.peek_at(1) == Some('/') {
                self.i += 2;
                return Ok(());
            }
            if c == '\n' {
                self.line += 1;
            }
            self.i += 1;
        }
        Err(self.err(start, "unterminated comment"))
    }

    fn flush_statement(&self, pending: &mut Pending, nodes: &mut Vec<Node>) -> Result<(), StepError> {
        let (text, line) = pending.take();
        if text.is_empty() {
            return Ok(());
        }
        let line = line.unwrap_or(self.line);
        nodes.push(self.classify_statement(text, line)?);
        Ok(())
    }

    fn classify_statement(&self, text: String, line: u32) -> Result<Node, StepError> {
        let pos = self.pos(line);

        if let Some(rest) = text.strip_prefix("@import") {
            return Ok(Node::Import {
                target: rest.trim().to_string(),
                pos,
            });
        }

        if let Some(caps) = VARIABLE_STATEMENT.captures(&text) {
            return Ok(Node::Variable {
                name: caps[1].to_string(),
                value: caps[2].trim().to_string(),
                pos,
            });
        }

        if text.starts_with('@') {
            return Ok(Node::AtStatement { text, pos });
        }

        if (text.starts_with('.') || text.starts_with('#')) && find_top_level(&text, ':').is_none() {
            return Ok(parse_mixin_call(&text, pos));
        }

        match find_top_level(&text, ':') {
            Some(idx) if !text[..idx].trim().is_empty() => Ok(Node::Declaration {
                property: text[..idx].trim().to_string(),
                value: text[idx + 1..].trim().to_string(),
                pos,
            }),
            _ => Err(self.err(line, format!("expected a declaration, found `{text}`"))),
        }
    }

    fn classify_block(&self, header: String, children: Vec<Node>, line: u32) -> Result<Node, StepError> {
        let pos = self.pos(line);
        if header.is_empty() {
            return Err(self.err(line, "missing selector before '{'"));
        }

        if let Some(rest) = header.strip_prefix('@') {
            let name_len = rest
                .find(|c: char| c.is_whitespace() || c == '(')
                .unwrap_or(rest.len());
            return Ok(Node::AtBlock {
                name: rest[..name_len].to_string(),
                prelude: rest[name_len..].trim().to_string(),
                children,
                pos,
            });
        }

        Ok(Node::Rule {
            selector: header.split_whitespace().collect::<Vec<_>>().join(" "),
            children,
            pos,
        })
    }
}

fn parse_mixin_call(text: &str, pos: Pos) -> Node {
    let (body, important) = match text.strip_suffix("!important") {
        Some(rest) => (rest.trim_end(), true),
        None => (text, false),
    };
    let (selector, args) = match (body.find('('), body.rfind(')')) {
        (Some(open), Some(close)) if close > open => (&body[..open], &body[open + 1..close]),
        _ => (body, ""),
    };
    Node::MixinCall {
        selector: selector.split_whitespace().collect::<Vec<_>>().join(" "),
        args: args.trim().to_string(),
        important,
        pos,
    }
}

/// Byte index of the first `needle` outside parentheses and quotes.
pub(crate) fn find_top_level(text: &str, needle: char) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    for (idx, c) in text.char_indices() {
        match (quote, c) {
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') => depth = depth.saturating_sub(1),
            (None, c) if c == needle && depth == 0 => return Some(idx),
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(line: u32) -> Pos {
        Pos { source: 0, line }
    }

    #[test]
    fn parses_variables_rules_and_comments() {
        let src = "// header\n@brand: #337ab7;\n.nav {\n  /* inner */\n  color: @brand;\n  a { text-decoration: none }\n}\n";
        let nodes = parse(src, 0, "main.less").unwrap();

        assert_eq!(
            nodes,
            vec![
                Node::Variable {
                    name: "brand".into(),
                    value: "#337ab7".into(),
                    pos: p(1),
                },
                Node::Rule {
                    selector: ".nav".into(),
                    pos: p(2),
                    children: vec![
                        Node::Declaration {
                            property: "color".into(),
                            value: "@brand".into(),
                            pos: p(4),
                        },
                        Node::Rule {
                            selector: "a".into(),
                            pos: p(5),
                            children: vec![Node::Declaration {
                                property: "text-decoration".into(),
                                value: "none".into(),
                                pos: p(5),
                            }],
                        },
                    ],
                },
            ]
        );
    }

    #[test]
    fn url_with_double_slash_is_not_a_comment() {
        let nodes = parse(".a { background: url(http://x.org/i.png); }", 0, "a.less").unwrap();
        let Node::Rule { children, .. } = &nodes[0] else {
            panic!("expected rule");
        };
        assert_eq!(
            children[0],
            Node::Declaration {
                property: "background".into(),
                value: "url(http://x.org/i.png)".into(),
                pos: p(0),
            }
        );
    }

    #[test]
    fn mixin_calls_and_at_blocks_are_classified() {
        let nodes = parse("@media (min-width: 768px) { .a { .rounded() !important; } }", 0, "a.less").unwrap();
        let Node::AtBlock { name, prelude, children, .. } = &nodes[0] else {
            panic!("expected at-block");
        };
        assert_eq!(name, "media");
        assert_eq!(prelude, "(min-width: 768px)");
        let Node::Rule { children, .. } = &children[0] else {
            panic!("expected rule");
        };
        assert!(matches!(
            &children[0],
            Node::MixinCall { selector, args, important: true, .. } if selector == ".rounded" && args.is_empty()
        ));
    }

    #[test]
    fn structural_errors_report_file_and_line() {
        let err = parse(".a {\n  color: red;\n", 0, "broken.less").unwrap_err();
        assert_eq!(err.message, "broken.less:1: unclosed block: missing '}'");

        let err = parse("a { }\n}\n", 0, "extra.less").unwrap_err();
        assert_eq!(err.message, "extra.less:2: unexpected '}'");

        let err = parse("a { content: \"open; }\n", 0, "str.less").unwrap_err();
        assert_eq!(err.message, "str.less:1: unterminated string");
    }
}
