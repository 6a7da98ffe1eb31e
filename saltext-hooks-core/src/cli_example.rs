//! CLI example validation for execution modules.
//!
//! Every public function of an execution module documents how to call it from
//! the command line:
//!
//! ```text
//! CLI Example:
//!
//! .. code-block:: bash
//!
//!     salt '*' kubernetes.nodes
//! ```
//!
//! [`extract`] pulls that block out of a docstring into a [`CliExample`];
//! [`validate_source`] checks every block in a file and returns at most one
//! [`Violation`] per docstring. [`CliExampleChecker`] runs it over a file list.

use crate::config::{CliExampleConfig, ConfigError, HookConfig};
use crate::contract::Checker;
use crate::python::{self, Docstring, SourceFile};
use crate::report::{Report, Violation, ViolationKind};
use crate::shell;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info, warn};

pub const CHECKER_NAME: &str = "cli-examples";

/// Salt commands whose first positional argument is a minion target.
const TARGETED_COMMANDS: &[&str] = &["salt", "salt-ssh"];

/// Options that consume the following word when not written as `--opt=value`.
const VALUE_OPTIONS: &[&str] = &[
    "-t",
    "--timeout",
    "--out",
    "--output",
    "--out-file",
    "--return",
    "-l",
    "--log-level",
    "-b",
    "--batch-size",
];

/// One logical command of an example. Backslash continuations and newlines inside quotes are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExampleCommand {
    pub line: usize,
    pub text: String,
}

/// A CLI example block lifted out of a docstring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliExample {
    pub path: PathBuf,
    /// `None` for the module docstring.
    pub function: Option<String>,
    pub start_line: usize,
    pub end_line: usize,
    /// Dedented block text.
    pub text: String,
    pub commands: Vec<ExampleCommand>,
}

/// What [`extract`] found in a docstring.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    NoMarker,
    Misspelled { found: String, line: usize },
    NoCodeBlock { line: usize },
    Empty { line: usize },
    Example(CliExample),
}

fn marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"CLI Examples?:").expect("marker pattern"))
}

fn lax_marker_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\bcli[ \t]*examples?[ \t]*:").expect("lax marker pattern"))
}

fn directive_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*\.\.\s+code-block::\s*([\w+-]*)\s*$").expect("directive pattern")
    })
}

fn indent_of(line: &str) -> usize {
    line.len() - line.trim_start().len()
}

/// Finds the CLI example block in `doc`.
pub fn extract(
    doc: &Docstring,
    path: &Path,
    function: Option<&str>,
    languages: &[String],
) -> Extraction {
    let marker = match marker_re().find(&doc.text) {
        Some(m) => m,
        None => {
            return match lax_marker_re().find(&doc.text) {
                Some(m) => Extraction::Misspelled {
                    found: m.as_str().to_string(),
                    line: doc.line + doc.text[..m.start()].matches('\n').count(),
                },
                None => Extraction::NoMarker,
            }
        }
    };

    let lines: Vec<&str> = doc.text.split('\n').collect();
    let marker_idx = doc.text[..marker.start()].matches('\n').count();
    let marker_line = doc.line + marker_idx;

    // The marker may share its line with text after it; the directive still has to start a new line.
    let Some(directive_idx) = (marker_idx + 1..lines.len()).find(|&i| !lines[i].trim().is_empty())
    else {
        return Extraction::NoCodeBlock { line: marker_line };
    };
    let directive = lines[directive_idx];
    let accepted = directive_re()
        .captures(directive)
        .is_some_and(|c| languages.iter().any(|l| l == &c[1]));
    if !accepted {
        return Extraction::NoCodeBlock { line: marker_line };
    }
    let directive_line = doc.line + directive_idx;
    let directive_indent = indent_of(directive);

    let mut idx = directive_idx + 1;
    // Directive options (`:linenos:` and friends) come before the blank line.
    while idx < lines.len() && lines[idx].trim_start().starts_with(':') {
        idx += 1;
    }

    let mut block: Vec<(usize, &str)> = Vec::new();
    while idx < lines.len() {
        let line = lines[idx];
        if !line.trim().is_empty() && indent_of(line) <= directive_indent {
            break;
        }
        block.push((idx, line));
        idx += 1;
    }
    while block.last().is_some_and(|(_, l)| l.trim().is_empty()) {
        block.pop();
    }
    while block.first().is_some_and(|(_, l)| l.trim().is_empty()) {
        block.remove(0);
    }
    if block.is_empty() {
        return Extraction::Empty {
            line: directive_line,
        };
    }

    let dedent = block
        .iter()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(_, l)| indent_of(l))
        .min()
        .unwrap_or(0);
    let dedented: Vec<(usize, &str)> = block
        .iter()
        .map(|&(i, l)| (i, l.get(dedent..).unwrap_or_else(|| l.trim_start())))
        .collect();

    let mut commands = Vec::new();
    let mut pending: Option<ExampleCommand> = None;
    for &(i, line) in &dedented {
        let line = line.trim_end_matches('\r');
        match pending.as_mut() {
            Some(cmd) => {
                cmd.text.push('\n');
                cmd.text.push_str(line);
            }
            None => {
                let trimmed = line.trim();
                if trimmed.is_empty() || trimmed.starts_with('#') {
                    continue;
                }
                pending = Some(ExampleCommand {
                    line: doc.line + i,
                    text: line.to_string(),
                });
            }
        }
        // A newline ends the command only when it is neither quoted nor escaped.
        if pending
            .as_ref()
            .is_some_and(|cmd| shell::split(&cmd.text).is_ok())
        {
            commands.extend(pending.take());
        }
    }
    commands.extend(pending);

    Extraction::Example(CliExample {
        path: path.to_path_buf(),
        function: function.map(str::to_string),
        start_line: doc.line + block[0].0,
        end_line: doc.line + block[block.len() - 1].0,
        text: dedented
            .iter()
            .map(|(_, l)| *l)
            .collect::<Vec<_>>()
            .join("\n"),
        commands,
    })
}

/// What an example is allowed to call.
enum Callee<'a> {
    Function(String),
    /// Module docstring: any public function of the module.
    Module {
        virtualname: &'a str,
        functions: &'a BTreeSet<String>,
    },
}

impl Callee<'_> {
    fn accepts(&self, called: &str) -> bool {
        match self {
            Callee::Function(expected) => called == expected,
            Callee::Module {
                virtualname,
                functions,
            } => called
                .strip_prefix(virtualname)
                .and_then(|rest| rest.strip_prefix('.'))
                .is_some_and(|f| functions.contains(f)),
        }
    }

    fn describe(&self) -> String {
        match self {
            Callee::Function(expected) => format!("`{expected}`"),
            Callee::Module { virtualname, .. } => format!("a public `{virtualname}.*` function"),
        }
    }
}

/// Positional words after the command, skipping options and their values.
fn positionals(words: &[String]) -> Vec<&str> {
    let mut out = Vec::new();
    let mut iter = words.iter().skip(1);
    while let Some(word) = iter.next() {
        if word.starts_with('-') && word.len() > 1 {
            if VALUE_OPTIONS.contains(&word.as_str()) {
                iter.next();
            }
            continue;
        }
        out.push(word.as_str());
    }
    out
}

fn check_command(
    command: &ExampleCommand,
    config: &CliExampleConfig,
    callee: &Callee<'_>,
) -> Result<(), (ViolationKind, String)> {
    let shown = command.text.replace('\n', " ");
    let words = shell::split(&command.text).map_err(|e| {
        (
            ViolationKind::UnparsableCommand,
            format!("CLI example `{shown}` is not a valid shell command: {e}"),
        )
    })?;
    let Some(program) = words.first() else {
        return Ok(());
    };

    if !config.commands.iter().any(|c| c == program) {
        return Err((
            ViolationKind::UnknownCommand,
            format!(
                "CLI example `{shown}` does not invoke a recognized command ({})",
                config.commands.join(", ")
            ),
        ));
    }

    let args = positionals(&words);
    let function_pos = usize::from(TARGETED_COMMANDS.contains(&program.as_str()));
    match args.get(function_pos) {
        Some(called) if callee.accepts(called) => Ok(()),
        Some(called) => Err((
            ViolationKind::WrongFunction,
            format!(
                "CLI example `{shown}` calls `{called}` instead of {}",
                callee.describe()
            ),
        )),
        None => Err((
            ViolationKind::WrongFunction,
            format!(
                "CLI example `{shown}` does not call a function, expected {}",
                callee.describe()
            ),
        )),
    }
}

/// Checks one docstring; `None` means it passed.
fn check_docstring(
    source: &SourceFile,
    doc: &Docstring,
    function: Option<&str>,
    callee: &Callee<'_>,
    config: &CliExampleConfig,
) -> Option<Violation> {
    let owner = match function {
        Some(name) => format!("The function '{name}'"),
        None => "The module docstring".to_string(),
    };
    let violation = |kind, line, message: String| {
        let v = Violation::new(&source.path, kind, message).at_line(line);
        Some(match function {
            Some(name) => v.in_function(name),
            None => v,
        })
    };

    match extract(doc, &source.path, function, &config.languages) {
        Extraction::NoMarker => None,
        Extraction::Misspelled { found, line } => violation(
            ViolationKind::MisspelledMarker,
            line,
            format!("{owner} has a malformed 'CLI Example:' marker: found '{found}'"),
        ),
        Extraction::NoCodeBlock { line } => violation(
            ViolationKind::MissingCodeBlock,
            line,
            format!(
                "{owner} has a 'CLI Example:' that is not followed by a '.. code-block:: {}' directive",
                config.languages.first().map_or("bash", String::as_str)
            ),
        ),
        Extraction::Empty { line } => violation(
            ViolationKind::EmptyExample,
            line,
            format!("{owner} has an empty 'CLI Example:' code block"),
        ),
        Extraction::Example(example) => {
            debug!(
                path = %example.path.display(),
                function = example.function.as_deref().unwrap_or("<module>"),
                start = example.start_line,
                end = example.end_line,
                commands = example.commands.len(),
                "Extracted CLI example"
            );
            example.commands.iter().find_map(|cmd| {
                check_command(cmd, config, callee)
                    .err()
                    .and_then(|(kind, message)| violation(kind, cmd.line, message))
            })
        }
    }
}

/// Validates every CLI example in an execution module.
pub fn validate_source(source: &SourceFile, config: &CliExampleConfig) -> Vec<Violation> {
    let virtualname = python::virtualname(source).unwrap_or_else(|| source.stem());
    let aliases: BTreeMap<String, String> = python::func_aliases(source);
    let public: Vec<_> = python::functions(source)
        .into_iter()
        .filter(|f| f.is_public())
        .collect();
    let exposed: BTreeSet<String> = public
        .iter()
        .map(|f| aliases.get(&f.name).unwrap_or(&f.name).clone())
        .collect();

    let mut violations = Vec::new();

    if let Some(doc) = python::module_docstring(source) {
        let callee = Callee::Module {
            virtualname: &virtualname,
            functions: &exposed,
        };
        violations.extend(check_docstring(source, &doc, None, &callee, config));
    }

    for function in &public {
        let exposed_name = aliases.get(&function.name).unwrap_or(&function.name);
        let callee = Callee::Function(format!("{virtualname}.{exposed_name}"));
        let found = match &function.docstring {
            None if config.require_examples => Some(
                Violation::new(
                    &source.path,
                    ViolationKind::MissingDocstring,
                    format!("The function '{}' does not have a docstring", function.name),
                )
                .at_line(function.line)
                .in_function(&function.name),
            ),
            None => None,
            Some(doc) => {
                let result =
                    check_docstring(source, doc, Some(&function.name), &callee, config);
                if result.is_none()
                    && config.require_examples
                    && !marker_re().is_match(&doc.text)
                {
                    Some(
                        Violation::new(
                            &source.path,
                            ViolationKind::MissingExample,
                            format!(
                                "The function '{}' does not have a 'CLI Example:' in its docstring",
                                function.name
                            ),
                        )
                        .at_line(function.line)
                        .in_function(&function.name),
                    )
                } else {
                    result
                }
            }
        };
        violations.extend(found);
    }

    debug!(
        path = %source.path.display(),
        functions = public.len(),
        violations = violations.len(),
        "Validated CLI examples"
    );
    violations
}

/// Runs [`validate_source`] over a list of files.
pub struct CliExampleChecker {
    config: HookConfig,
    files: Vec<PathBuf>,
}

impl CliExampleChecker {
    /// Checks exactly `files` (as passed by pre-commit); non-qualifying paths are skipped.
    pub fn new(config: HookConfig, files: Vec<PathBuf>) -> Self {
        Self { config, files }
    }

    /// Checks every qualifying file under the extension root.
    pub fn discover(config: HookConfig) -> Result<Self, ConfigError> {
        let (_, ext_root) = config.extension_root()?;
        let mut files: Vec<PathBuf> = walkdir::WalkDir::new(&ext_root)
            .min_depth(2)
            .max_depth(2)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .map(|e| e.into_path())
            .filter(|p| p.file_name().is_some_and(|n| n != "__init__.py"))
            .filter(|p| qualifies(p, &config.cli_examples))
            .collect();
        files.sort();
        info!(root = %ext_root.display(), files = files.len(), "Discovered execution modules");
        Ok(Self { config, files })
    }
}

fn qualifies(path: &Path, config: &CliExampleConfig) -> bool {
    let is_python = path.extension().is_some_and(|e| e == "py");
    let kind = path
        .parent()
        .and_then(Path::file_name)
        .map(|n| n.to_string_lossy());
    is_python && kind.is_some_and(|k| config.kinds.iter().any(|c| *c == k))
}

impl Checker for CliExampleChecker {
    fn name(&self) -> &'static str {
        CHECKER_NAME
    }

    fn check(&self) -> Report {
        let mut report = Report::new(CHECKER_NAME);
        for file in &self.files {
            if !qualifies(file, &self.config.cli_examples) {
                debug!(path = %file.display(), "Skipping file outside execution module dirs");
                continue;
            }
            let full = if file.is_absolute() {
                file.clone()
            } else {
                self.config.root.join(file)
            };
            let shown = self.config.display_path(file).to_path_buf();

            let violations = match SourceFile::read(&full) {
                Ok(mut source) => {
                    source.path = shown.clone();
                    validate_source(&source, &self.config.cli_examples)
                }
                Err(e) => {
                    warn!(path = %shown.display(), error = %e, "Reporting unreadable file");
                    vec![Violation::new(&shown, ViolationKind::Unreadable, e.to_string())]
                }
            };
            report.record(&shown, violations);
        }
        report
    }
}
