// src/transform/minify.rs

//! Conservative script minifier.
//!
//! Removes `//` and `/* */` comments, trims indentation and drops blank
//! lines. Line breaks between statements are kept, so automatic semicolon
//! insertion behaves exactly as in the input. Comments starting with `/*!`
//! (licence headers) are preserved verbatim, as is the content of string,
//! template and regular-expression literals.

use super::{Asset, MappedText, StepContext, StepError, Transform};

#[derive(Debug, Clone, Copy, Default)]
pub struct Minify;

impl Transform for Minify {
    fn name(&self) -> &str {
        "minify"
    }

    fn apply(&self, assets: Vec<Asset>, _ctx: &StepContext<'_>) -> Result<Vec<Asset>, StepError> {
        assets
            .into_iter()
            .map(|asset| {
                let file = asset
                    .source_path
                    .clone()
                    .unwrap_or_else(|| asset.path.to_string_lossy().into_owned());
                let lines = strip(&asset.contents).map_err(|(line, msg)| StepError::at(&file, line, msg))?;

                let mut out = MappedText::new();
                for src in &asset.sources {
                    out.add_source(src.clone());
                }
                for (idx, text) in lines {
                    out.push_line(&text, asset.origins.get(idx).copied().flatten());
                }
                Ok(out.finish(asset.path, asset.source_path))
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Code,
    Str(char),
    Template,
    Regex { in_class: bool },
    BlockComment { keep: bool },
}

/// Line being assembled, with whether it starts inside a multi-line
/// literal (and so must not be trimmed).
struct Pending {
    text: String,
    starts_in_literal: bool,
}

/// Strip comments and whitespace; return the kept lines with the index of
/// the input line each one came from.
fn strip(src: &str) -> Result<Vec<(usize, String)>, (u32, &'static str)> {
    let mut kept = Vec::new();
    let mut state = State::Code;
    // Last significant character emitted in code, used to tell a regex
    // literal from a division.
    let mut prev_sig: Option<char> = None;
    let mut prev_word = String::new();
    let mut in_word = false;
    // A string literal continued onto the next line with a trailing `\`.
    let mut continued = false;

    for (idx, raw_line) in src.split_inclusive('\n').enumerate() {
        let line = raw_line.strip_suffix('\n').unwrap_or(raw_line);
        let line = line.strip_suffix('\r').unwrap_or(line);
        let mut cur = Pending {
            text: String::new(),
            starts_in_literal: state == State::Template || continued,
        };
        continued = false;
        in_word = false;
        let chars: Vec<char> = line.chars().collect();
        let mut i = 0;

        while i < chars.len() {
            let c = chars[i];
            let next = chars.get(i + 1).copied();
            match state {
                State::Code => match (c, next) {
                    ('/', Some('/')) => break,
                    ('/', Some('*')) => {
                        let keep = chars.get(i + 2) == Some(&'!');
                        if keep {
                            cur.text.push_str("/*");
                        } else if !cur.text.is_empty() && !cur.text.ends_with(' ') {
                            cur.text.push(' ');
                        }
                        state = State::BlockComment { keep };
                        i += 2;
                        continue;
                    }
                    ('/', _) if regex_allowed(prev_sig, &prev_word) => {
                        cur.text.push(c);
                        state = State::Regex { in_class: false };
                    }
                    ('"' | '\'', _) => {
                        cur.text.push(c);
                        state = State::Str(c);
                    }
                    ('`', _) => {
                        cur.text.push(c);
                        state = State::Template;
                    }
                    _ => {
                        cur.text.push(c);
                        if is_word_char(c) {
                            if !in_word {
                                prev_word.clear();
                            }
                            prev_word.push(c);
                            in_word = true;
                        } else {
                            in_word = false;
                            if !c.is_whitespace() {
                                prev_word.clear();
                            }
                        }
                        if !c.is_whitespace() {
                            prev_sig = Some(c);
                        }
                    }
                },
                State::Str(q) => {
                    cur.text.push(c);
                    if c == '\\' {
                        match next {
                            Some(n) => {
                                cur.text.push(n);
                                i += 1;
                            }
                            None => continued = true,
                        }
                    } else if c == q {
                        state = State::Code;
                        prev_sig = Some(c);
                        prev_word.clear();
                    }
                }
                State::Template => {
                    cur.text.push(c);
                    if c == '\\' {
                        if let Some(n) = next {
                            cur.text.push(n);
                            i += 1;
                        }
                    } else if c == '`' {
                        state = State::Code;
                        prev_sig = Some(c);
                        prev_word.clear();
                    }
                }
                State::Regex { in_class } => {
                    cur.text.push(c);
                    match c {
                        '\\' => {
                            if let Some(n) = next {
                                cur.text.push(n);
                                i += 1;
                            }
                        }
                        '[' => state = State::Regex { in_class: true },
                        ']' if in_class => state = State::Regex { in_class: false },
                        '/' if !in_class => {
                            state = State::Code;
                            prev_sig = Some('/');
                            prev_word.clear();
                        }
                        _ => {}
                    }
                }
                State::BlockComment { keep } => {
                    if c == '*' && next == Some('/') {
                        if keep {
                            cur.text.push_str("*/");
                        }
                        state = State::Code;
                        i += 2;
                        continue;
                    }
                    if keep {
                        cur.text.push(c);
                    }
                }
            }
            i += 1;
        }

        match state {
            State::Str(_) if !continued => {
                return Err((idx as u32, "unterminated string literal"));
            }
            // A line break ends what looked like a regex: it was a division.
            State::Regex { .. } => state = State::Code,
            _ => {}
        }

        let ends_in_literal = state == State::Template || continued;
        let keep_comment_line = matches!(state, State::BlockComment { keep: true });
        let mut text = cur.text;
        if !ends_in_literal && !keep_comment_line {
            text.truncate(text.trim_end().len());
        }
        if !cur.starts_in_literal {
            text = text.trim_start().to_string();
        }
        if !text.is_empty() || cur.starts_in_literal || ends_in_literal {
            kept.push((idx, text));
        }
    }

    if matches!(state, State::BlockComment { .. }) {
        let last = src.split_inclusive('\n').count().saturating_sub(1);
        return Err((last as u32, "unterminated block comment"));
    }

    Ok(kept)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn regex_allowed(prev_sig: Option<char>, prev_word: &str) -> bool {
    match prev_sig {
        None => true,
        Some(c) if "(,=:[!&|?{};+-*%<>~^".contains(c) => true,
        Some(c) if is_word_char(c) => matches!(
            prev_word,
            "return" | "typeof" | "case" | "do" | "else" | "in" | "of" | "new" | "delete" | "void" | "throw"
        ),
        _ => false,
    }
}
