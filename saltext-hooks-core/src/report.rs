//! Violation and report model shared by both checkers.
//!
//! A [`Report`] holds one [`FileReport`] per checked file, sorted by path, so
//! two runs over the same tree render byte-identical output.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    Unreadable,
    MissingDocstring,
    MisspelledMarker,
    MissingExample,
    MissingCodeBlock,
    EmptyExample,
    UnparsableCommand,
    UnknownCommand,
    WrongFunction,
    MissingDoc,
    MissingIndex,
    OutdatedDoc,
    OutdatedIndex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: PathBuf,
    pub line: Option<usize>,
    pub function: Option<String>,
    pub kind: ViolationKind,
    pub message: String,
}

impl Violation {
    pub fn new(path: impl Into<PathBuf>, kind: ViolationKind, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            line: None,
            function: None,
            kind,
            message: message.into(),
        }
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn in_function(mut self, function: impl Into<String>) -> Self {
        self.function = Some(function.into());
        self
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.path.display())?;
        if let Some(line) = self.line {
            write!(f, ":{line}")?;
        }
        write!(f, ":")?;
        if let Some(function) = &self.function {
            write!(f, " [{function}]")?;
        }
        write!(f, " {}", self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: PathBuf,
    pub violations: Vec<Violation>,
}

impl FileReport {
    pub fn passed(&self) -> bool {
        self.violations.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub files_checked: usize,
    pub files_failed: usize,
    pub violations: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub checker: String,
    pub files: Vec<FileReport>,
}

impl Report {
    pub fn new(checker: impl Into<String>) -> Self {
        Self {
            checker: checker.into(),
            files: Vec::new(),
        }
    }

    /// Records `path` as checked, appending `violations` to any earlier entry for it.
    pub fn record(&mut self, path: &Path, violations: Vec<Violation>) {
        match self.files.binary_search_by(|f| f.path.as_path().cmp(path)) {
            Ok(idx) => self.files[idx].violations.extend(violations),
            Err(idx) => self.files.insert(
                idx,
                FileReport {
                    path: path.to_path_buf(),
                    violations,
                },
            ),
        }
    }

    pub fn passed(&self) -> bool {
        self.files.iter().all(FileReport::passed)
    }

    pub fn file(&self, path: &Path) -> Option<&FileReport> {
        self.files.iter().find(|f| f.path == path)
    }

    pub fn violations(&self) -> impl Iterator<Item = &Violation> {
        self.files.iter().flat_map(|f| f.violations.iter())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            files_checked: self.files.len(),
            files_failed: self.files.iter().filter(|f| !f.passed()).count(),
            violations: self.violations().count(),
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for violation in self.violations() {
            out.push_str(&violation.to_string());
            out.push('\n');
        }
        let summary = self.summary();
        if summary.violations == 0 {
            out.push_str(&format!(
                "{}: {} file(s) checked, no violations\n",
                self.checker, summary.files_checked
            ));
        } else {
            out.push_str(&format!(
                "{}: {} violation(s) in {} of {} file(s)\n",
                self.checker, summary.violations, summary.files_failed, summary.files_checked
            ));
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        #[derive(Serialize)]
        struct JsonReport<'a> {
            checker: &'a str,
            passed: bool,
            summary: Summary,
            files: &'a [FileReport],
        }

        serde_json::to_string_pretty(&JsonReport {
            checker: &self.checker,
            passed: self.passed(),
            summary: self.summary(),
            files: &self.files,
        })
    }
}
