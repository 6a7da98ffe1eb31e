//! Autodoc presence: one Sphinx page per loader module, one index per loader kind.
//!
//! For `src/saltext/kubernetes/modules/kubernetesmod.py` the expected page is
//! `docs/ref/modules/saltext.kubernetes.modules.kubernetesmod.rst`, listed by
//! `docs/ref/modules/index.rst`. [`discover`] computes those pairs,
//! [`AutodocChecker`] reports missing (and optionally outdated) pages, and
//! [`write_pages`] regenerates them.

use crate::config::{ConfigError, HookConfig};
use crate::contract::Checker;
use crate::python::{self, SourceFile};
use crate::report::{Report, Violation, ViolationKind};
use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info, warn};

pub const CHECKER_NAME: &str = "autodocs";

#[derive(thiserror::Error, Debug)]
pub enum AutodocError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("cannot render {}: {}", .path.display(), .reason)]
    Render { path: PathBuf, reason: String },
    #[error("failed to write {}: {}", .path.display(), .source)]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A module source and the documentation page it should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocPair {
    pub source: PathBuf,
    /// Loader kind, i.e. the directory the module lives in.
    pub kind: String,
    pub import_path: String,
    pub doc_path: PathBuf,
    pub exists: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRole {
    Module,
    Index,
}

/// A page the docs tree should contain, with the content it should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub role: PageRole,
    pub kind: String,
    pub path: PathBuf,
    /// Module the page documents; `None` for index pages.
    pub source: Option<PathBuf>,
    /// `Err` when the module source could not be read to render the title.
    pub content: Result<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStatus {
    Current,
    Missing,
    Outdated,
    Unreadable(String),
}

#[derive(Debug, Clone)]
pub struct Layout {
    pub extension: String,
    pub pairs: Vec<DocPair>,
    pub pages: Vec<Page>,
}

impl Layout {
    /// Documentation paths of module pages that do not exist.
    pub fn missing(&self) -> BTreeSet<PathBuf> {
        self.pairs
            .iter()
            .filter(|p| !p.exists)
            .map(|p| p.doc_path.clone())
            .collect()
    }
}

/// Dotted import path of `source` relative to `src_root`.
pub fn import_path(source: &Path, src_root: &Path) -> String {
    let relative = source.strip_prefix(src_root).unwrap_or(source);
    relative
        .with_extension("")
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(".")
}

pub fn render_module_page(title: &str, import_path: &str) -> String {
    let heading = format!("``{title}``");
    let mut width = heading.chars().count();
    // Seven `=` alone on a line reads as a merge conflict marker.
    if width == 7 {
        width += 1;
    }
    format!(
        "{heading}\n{}\n\n.. automodule:: {import_path}\n    :members:\n",
        "=".repeat(width)
    )
}

fn title_case(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Index page for one loader kind; `import_paths` need not be sorted.
pub fn render_index_page(extension: &str, kind: &str, import_paths: &[String]) -> String {
    let header_text = if kind.eq_ignore_ascii_case("modules") {
        "execution modules".to_string()
    } else {
        format!("{} modules", kind.trim_end_matches('s'))
    };
    let rule = "_".repeat(header_text.chars().count());
    let common = import_paths
        .first()
        .and_then(|p| p.rsplit_once('.'))
        .map_or("", |(parent, _)| parent);

    let mut entries: Vec<String> = import_paths
        .iter()
        .map(|p| {
            let short = p
                .strip_prefix(common)
                .and_then(|rest| rest.strip_prefix('.'))
                .unwrap_or(p.as_str());
            format!("    {short}")
        })
        .collect();
    entries.sort();

    format!(
        ".. all-saltext.{extension}.{kind}:\n\n{rule}\n{title}\n{rule}\n\n.. currentmodule:: {common}\n\n.. autosummary::\n    :toctree:\n\n{entries}\n",
        title = title_case(&header_text),
        entries = entries.join("\n"),
    )
}

/// Walks the extension's loader directories and computes every expected page.
pub fn discover(config: &HookConfig) -> Result<Layout, ConfigError> {
    let (extension, ext_root) = config.extension_root()?;
    let src_root = config.src_root();
    let docs_root = config.docs_root();

    let mut by_kind: BTreeMap<String, Vec<PathBuf>> = BTreeMap::new();
    for entry in walkdir::WalkDir::new(&ext_root)
        .min_depth(2)
        .max_depth(2)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
    {
        let path = entry.path();
        if path.extension().map_or(true, |e| e != "py") || entry.file_name() == "__init__.py" {
            continue;
        }
        let Some(kind) = path
            .parent()
            .and_then(Path::file_name)
            .map(|n| n.to_string_lossy().into_owned())
        else {
            continue;
        };
        if kind.starts_with('_') || config.autodocs.excluded_kinds.contains(&kind) {
            debug!(path = %path.display(), kind = %kind, "Skipping excluded loader kind");
            continue;
        }
        by_kind.entry(kind).or_default().push(path.to_path_buf());
    }

    let mut pairs = Vec::new();
    let mut pages = Vec::new();
    for (kind, mut sources) in by_kind {
        sources.sort();
        let kind_dir = docs_root.join(&kind);
        let mut import_paths = Vec::new();

        for source in sources {
            let import = import_path(&source, &src_root);
            let doc_path = kind_dir.join(format!("{import}.rst"));
            let content = match SourceFile::read(&source) {
                Ok(file) => {
                    let title = python::virtualname(&file).unwrap_or_else(|| file.stem());
                    Ok(render_module_page(&title, &import))
                }
                Err(e) => Err(e.to_string()),
            };
            pairs.push(DocPair {
                exists: doc_path.is_file(),
                source: source.clone(),
                kind: kind.clone(),
                import_path: import.clone(),
                doc_path: doc_path.clone(),
            });
            pages.push(Page {
                role: PageRole::Module,
                kind: kind.clone(),
                path: doc_path,
                source: Some(source),
                content,
            });
            import_paths.push(import);
        }

        pages.push(Page {
            role: PageRole::Index,
            kind: kind.clone(),
            path: kind_dir.join("index.rst"),
            source: None,
            content: Ok(render_index_page(&extension, &kind, &import_paths)),
        });
    }

    info!(
        extension = %extension,
        modules = pairs.len(),
        pages = pages.len(),
        "Discovered autodoc layout"
    );
    Ok(Layout {
        extension,
        pairs,
        pages,
    })
}

pub fn page_status(page: &Page, check_content: bool) -> PageStatus {
    if !page.path.is_file() {
        return PageStatus::Missing;
    }
    if !check_content {
        return PageStatus::Current;
    }
    let expected = match &page.content {
        Ok(content) => content,
        Err(reason) => return PageStatus::Unreadable(reason.clone()),
    };
    match fs::read_to_string(&page.path) {
        Ok(actual) if actual == *expected => PageStatus::Current,
        Ok(_) => PageStatus::Outdated,
        Err(e) => PageStatus::Unreadable(e.to_string()),
    }
}

pub struct AutodocChecker {
    config: HookConfig,
}

impl AutodocChecker {
    /// Fails early when the extension root cannot be resolved.
    pub fn new(config: HookConfig) -> Result<Self, ConfigError> {
        config.extension_root()?;
        Ok(Self { config })
    }

    fn violation_for(&self, page: &Page, status: PageStatus) -> Option<Violation> {
        let display = self.config.display_path(&page.path);
        let subject = match &page.source {
            Some(source) => format!(
                "documentation page for {}",
                self.config.display_path(source).display()
            ),
            None => format!("{} index page", page.kind),
        };
        let (kind, message) = match (status, page.role) {
            (PageStatus::Current, _) => return None,
            (PageStatus::Missing, PageRole::Module) => {
                (ViolationKind::MissingDoc, format!("missing {subject}"))
            }
            (PageStatus::Missing, PageRole::Index) => {
                (ViolationKind::MissingIndex, format!("missing {subject}"))
            }
            (PageStatus::Outdated, PageRole::Module) => (
                ViolationKind::OutdatedDoc,
                format!("{subject} differs from the generated page"),
            ),
            (PageStatus::Outdated, PageRole::Index) => (
                ViolationKind::OutdatedIndex,
                format!("{subject} differs from the generated page"),
            ),
            (PageStatus::Unreadable(reason), _) => (
                ViolationKind::Unreadable,
                format!("cannot check {subject}: {reason}"),
            ),
        };
        Some(Violation::new(display, kind, message))
    }
}

impl Checker for AutodocChecker {
    fn name(&self) -> &'static str {
        CHECKER_NAME
    }

    fn check(&self) -> Report {
        let mut report = Report::new(CHECKER_NAME);
        let layout = match discover(&self.config) {
            Ok(layout) => layout,
            Err(e) => {
                error!(error = %e, "Autodoc discovery failed");
                let src = self.config.src_dir.clone();
                report.record(
                    &src,
                    vec![Violation::new(&src, ViolationKind::Unreadable, e.to_string())],
                );
                return report;
            }
        };

        for page in &layout.pages {
            let status = page_status(page, self.config.autodocs.check_content);
            debug!(path = %page.path.display(), ?status, "Checked documentation page");
            let display = self.config.display_path(&page.path).to_path_buf();
            report.record(
                &display,
                self.violation_for(page, status).into_iter().collect(),
            );
        }
        report
    }
}

fn write_atomic(path: &Path, content: &str) -> Result<(), AutodocError> {
    let io = |source| AutodocError::Write {
        path: path.to_path_buf(),
        source,
    };
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(io)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io)?;
    tmp.write_all(content.as_bytes()).map_err(io)?;
    tmp.persist(path).map_err(|e| io(e.error))?;
    Ok(())
}

/// Writes every missing or outdated page; returns the paths written, sorted.
pub fn write_pages(config: &HookConfig) -> Result<Vec<PathBuf>, AutodocError> {
    let layout = discover(config)?;
    let mut written = Vec::new();

    for page in &layout.pages {
        let expected = page.content.as_ref().map_err(|reason| AutodocError::Render {
            path: page.path.clone(),
            reason: reason.clone(),
        })?;
        if fs::read_to_string(&page.path).ok().as_deref() == Some(expected.as_str()) {
            continue;
        }
        if let Err(e) = write_atomic(&page.path, expected) {
            error!(path = %page.path.display(), error = %e, "Failed to write documentation page");
            return Err(e);
        }
        info!(path = %page.path.display(), "Wrote documentation page");
        written.push(page.path.clone());
    }

    if written.is_empty() {
        info!(extension = %layout.extension, "Documentation pages already up to date");
    } else {
        warn!(count = written.len(), "Documentation pages were regenerated");
    }
    written.sort();
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_path_is_dotted_and_relative_to_src() {
        assert_eq!(
            import_path(
                Path::new("/repo/src/saltext/kubernetes/modules/kubernetesmod.py"),
                Path::new("/repo/src")
            ),
            "saltext.kubernetes.modules.kubernetesmod"
        );
    }

    #[test]
    fn module_page_underlines_the_virtualname() {
        assert_eq!(
            render_module_page("kubernetes", "saltext.kubernetes.modules.kubernetesmod"),
            "``kubernetes``\n==============\n\n.. automodule:: saltext.kubernetes.modules.kubernetesmod\n    :members:\n"
        );
    }

    #[test]
    fn short_title_underline_is_not_a_conflict_marker() {
        let page = render_module_page("k8s", "saltext.kubernetes.modules.k8s");
        assert!(page.starts_with("``k8s``\n========\n\n"));
        assert!(!page.lines().any(|l| l == "======="));
    }

    #[test]
    fn index_page_for_execution_modules() {
        let page = render_index_page(
            "kubernetes",
            "modules",
            &[
                "saltext.kubernetes.modules.kubernetesmod".to_string(),
                "saltext.kubernetes.modules.helm".to_string(),
            ],
        );
        assert_eq!(
            page,
            ".. all-saltext.kubernetes.modules:\n\n_________________\nExecution Modules\n_________________\n\n.. currentmodule:: saltext.kubernetes.modules\n\n.. autosummary::\n    :toctree:\n\n    helm\n    kubernetesmod\n"
        );
    }

    #[test]
    fn index_page_title_drops_plural() {
        let page = render_index_page(
            "kubernetes",
            "states",
            &["saltext.kubernetes.states.kubernetes".to_string()],
        );
        assert!(page.contains("\n_____________\nState Modules\n_____________\n"));
        assert!(page.ends_with(":toctree:\n\n    kubernetes\n"));
    }

    #[test]
    fn title_case_matches_word_capitalisation() {
        assert_eq!(title_case("execution modules"), "Execution Modules");
        assert_eq!(title_case("grain modules"), "Grain Modules");
    }
}
