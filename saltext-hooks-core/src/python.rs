//! Python source scanning: just enough lexing to find module-level functions,
//! their docstrings and the loader dunders (`__virtualname__`, `__func_alias__`).
//!
//! This is not a Python parser. It understands comments, string literals
//! (single, double and triple quoted, with escapes and prefixes) and bracket
//! nesting, which is what it takes to find a `def` at column 0 and the string
//! literal that opens its body.

use regex::Regex;
use std::collections::BTreeMap;
use std::ops::Range;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, error};

#[derive(thiserror::Error, Debug)]
pub enum SourceError {
    #[error("failed to read {}: {}", .path.display(), .source)]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A source file read once into memory.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
    line_starts: Vec<usize>,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        let text = text.into();
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self {
            path: path.into(),
            text,
            line_starts,
        }
    }

    pub fn read(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => {
                debug!(path = %path.display(), bytes = text.len(), "Read source file");
                Ok(Self::new(path, text))
            }
            Err(e) => {
                error!(path = %path.display(), error = ?e, "Failed to read source file");
                Err(SourceError::Read {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
    }

    /// 1-based line number containing the byte `offset`.
    pub fn line_of(&self, offset: usize) -> usize {
        self.line_starts.partition_point(|&start| start <= offset)
    }

    /// File name without the `.py` suffix.
    pub fn stem(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// Raw docstring contents (quotes stripped, no dedent) and the line its content starts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Docstring {
    pub text: String,
    pub line: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    pub name: String,
    /// Line of the `def` keyword.
    pub line: usize,
    pub docstring: Option<Docstring>,
}

impl FunctionDef {
    pub fn is_public(&self) -> bool {
        !self.name.starts_with('_')
    }
}

/// All functions defined at module top level (column 0), in file order.
pub fn functions(source: &SourceFile) -> Vec<FunctionDef> {
    let bytes = source.text.as_bytes();
    let mut defs = Vec::new();
    let mut i = 0;
    let mut line_start = true;

    while i < bytes.len() {
        if line_start {
            if let Some((def, next)) = function_at(source, i) {
                defs.push(def);
                i = next;
                line_start = false;
                continue;
            }
        }
        match bytes[i] {
            b'#' => {
                i = skip_comment(bytes, i);
                line_start = false;
            }
            b'"' | b'\'' => {
                i = string_literal(bytes, i).end;
                line_start = false;
            }
            b'\n' => {
                i += 1;
                line_start = true;
            }
            _ => {
                i += 1;
                line_start = false;
            }
        }
    }

    debug!(path = %source.path.display(), count = defs.len(), "Scanned module functions");
    defs
}

/// The module docstring, if the first statement is a string literal.
pub fn module_docstring(source: &SourceFile) -> Option<Docstring> {
    leading_string(source, 0)
}

/// Value of a top-level `__virtualname__ = "..."` assignment.
pub fn virtualname(source: &SourceFile) -> Option<String> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r#"(?m)^__virtualname__\s*=\s*(?:"([^"\n]*)"|'([^'\n]*)')"#)
            .expect("virtualname pattern")
    });
    let caps = re.captures(&source.text)?;
    caps.get(1)
        .or_else(|| caps.get(2))
        .map(|m| m.as_str().to_string())
}

/// Entries of a top-level `__func_alias__` dict literal, Python name to exposed name.
pub fn func_aliases(source: &SourceFile) -> BTreeMap<String, String> {
    static BLOCK: OnceLock<Regex> = OnceLock::new();
    static ENTRY: OnceLock<Regex> = OnceLock::new();
    let block = BLOCK.get_or_init(|| {
        Regex::new(r"(?ms)^__func_alias__\s*=\s*\{(.*?)\}").expect("func_alias pattern")
    });
    let entry = ENTRY.get_or_init(|| {
        Regex::new(r#"["'](\w+)["']\s*:\s*["'](\w+)["']"#).expect("func_alias entry pattern")
    });

    let Some(body) = block.captures(&source.text).and_then(|c| c.get(1)) else {
        return BTreeMap::new();
    };
    entry
        .captures_iter(body.as_str())
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

struct StrLit {
    content: Range<usize>,
    end: usize,
}

/// Lexes the string literal whose opening quote is at `start`.
/// Unterminated single-quoted strings stop at the newline; triple-quoted ones at EOF.
fn string_literal(bytes: &[u8], start: usize) -> StrLit {
    let quote = bytes[start];
    let triple = start + 2 < bytes.len() && bytes[start + 1] == quote && bytes[start + 2] == quote;
    let content_start = start + if triple { 3 } else { 1 };
    let mut i = content_start;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'\n' if !triple => {
                return StrLit {
                    content: content_start..i,
                    end: i,
                }
            }
            c if c == quote => {
                if !triple {
                    return StrLit {
                        content: content_start..i,
                        end: i + 1,
                    };
                }
                if i + 2 < bytes.len() && bytes[i + 1] == quote && bytes[i + 2] == quote {
                    return StrLit {
                        content: content_start..i,
                        end: i + 3,
                    };
                }
                i += 1;
            }
            _ => i += 1,
        }
    }

    StrLit {
        content: content_start..bytes.len(),
        end: bytes.len(),
    }
}

fn skip_comment(bytes: &[u8], start: usize) -> usize {
    bytes[start..]
        .iter()
        .position(|b| *b == b'\n')
        .map_or(bytes.len(), |p| start + p)
}

fn skip_blanks(bytes: &[u8], mut i: usize) -> usize {
    while let Some(b' ' | b'\t') = bytes.get(i) {
        i += 1;
    }
    i
}

fn function_at(source: &SourceFile, start: usize) -> Option<(FunctionDef, usize)> {
    let rest = &source.text[start..];
    let after_keyword = if rest.starts_with("def ") {
        start + 4
    } else if rest.starts_with("async def ") {
        start + 10
    } else {
        return None;
    };

    let bytes = source.text.as_bytes();
    let name_start = skip_blanks(bytes, after_keyword);
    let mut i = name_start;
    while i < bytes.len() && (bytes[i].is_ascii_alphanumeric() || bytes[i] == b'_') {
        i += 1;
    }
    if i == name_start {
        return None;
    }
    let name = source.text[name_start..i].to_string();

    let open = skip_blanks(bytes, i);
    if bytes.get(open) != Some(&b'(') {
        return None;
    }
    let colon = signature_end(bytes, open)?;
    let body = colon + 1;

    Some((
        FunctionDef {
            name,
            line: source.line_of(start),
            docstring: leading_string(source, body),
        },
        body,
    ))
}

/// Offset of the colon that ends a signature starting at the `(` at `open`.
fn signature_end(bytes: &[u8], open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = depth.saturating_sub(1),
            b'"' | b'\'' => {
                i = string_literal(bytes, i).end;
                continue;
            }
            b'#' => {
                i = skip_comment(bytes, i);
                continue;
            }
            b'\\' => {
                i += 2;
                continue;
            }
            b':' if depth == 0 => return Some(i),
            b'\n' if depth == 0 => return None,
            _ => {}
        }
        i += 1;
    }
    None
}

/// A string literal that is the first statement after `offset`, skipping whitespace and comments.
fn leading_string(source: &SourceFile, offset: usize) -> Option<Docstring> {
    let bytes = source.text.as_bytes();
    let mut i = offset;
    loop {
        match bytes.get(i) {
            Some(b' ' | b'\t' | b'\r' | b'\n') => i += 1,
            Some(b'#') => i = skip_comment(bytes, i),
            _ => break,
        }
    }

    let mut quote = i;
    while quote - i < 2 && matches!(bytes.get(quote), Some(b'r' | b'R' | b'u' | b'U')) {
        quote += 1;
    }
    if !matches!(bytes.get(quote), Some(b'"' | b'\'')) {
        return None;
    }

    let lit = string_literal(bytes, quote);
    Some(Docstring {
        line: source.line_of(lit.content.start),
        text: source.text[lit.content].to_string(),
    })
}
