use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("no Salt extension package found under {}", .0.display())]
    NoExtension(PathBuf),
    #[error("several Salt extension packages found ({}); set `extension` in the config", .0.join(", "))]
    AmbiguousExtension(Vec<String>),
    #[error("extension root {} does not exist", .0.display())]
    MissingExtensionRoot(PathBuf),
}

/// Settings shared by both hooks. Every field has a default so an empty
/// (or absent) config file is valid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HookConfig {
    /// Repository root every other path is relative to.
    pub root: PathBuf,
    /// Package name under `src/saltext/`; detected when there is exactly one.
    pub extension: Option<String>,
    pub src_dir: PathBuf,
    pub docs_dir: PathBuf,
    pub cli_examples: CliExampleConfig,
    pub autodocs: AutodocConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CliExampleConfig {
    /// Loader directories whose files must carry CLI examples.
    pub kinds: Vec<String>,
    /// Executables an example may invoke.
    pub commands: Vec<String>,
    /// Accepted `.. code-block::` languages.
    pub languages: Vec<String>,
    /// Report public functions without a docstring or CLI example.
    pub require_examples: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AutodocConfig {
    pub excluded_kinds: Vec<String>,
    /// Also flag pages whose content differs from the generated page.
    pub check_content: bool,
}

impl Default for HookConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            extension: None,
            src_dir: PathBuf::from("src"),
            docs_dir: PathBuf::from("docs/ref"),
            cli_examples: CliExampleConfig::default(),
            autodocs: AutodocConfig::default(),
        }
    }
}

impl Default for CliExampleConfig {
    fn default() -> Self {
        Self {
            kinds: vec!["modules".into()],
            commands: vec!["salt".into(), "salt-call".into()],
            languages: vec!["bash".into()],
            require_examples: false,
        }
    }
}

impl Default for AutodocConfig {
    fn default() -> Self {
        Self {
            excluded_kinds: vec!["utils".into()],
            check_content: true,
        }
    }
}

impl HookConfig {
    pub fn src_root(&self) -> PathBuf {
        self.root.join(&self.src_dir)
    }

    pub fn docs_root(&self) -> PathBuf {
        self.root.join(&self.docs_dir)
    }

    /// Extension package name and its directory, `<root>/<src_dir>/saltext/<extension>`.
    pub fn extension_root(&self) -> Result<(String, PathBuf), ConfigError> {
        let namespace = self.src_root().join("saltext");
        let name = match &self.extension {
            Some(name) => name.clone(),
            None => {
                let mut candidates: Vec<String> = std::fs::read_dir(&namespace)
                    .map_err(|_| ConfigError::NoExtension(namespace.clone()))?
                    .filter_map(Result::ok)
                    .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
                    .map(|e| e.file_name().to_string_lossy().into_owned())
                    .filter(|n| !n.starts_with('_') && !n.starts_with('.'))
                    .collect();
                candidates.sort();
                match candidates.len() {
                    0 => return Err(ConfigError::NoExtension(namespace)),
                    1 => candidates.remove(0),
                    _ => return Err(ConfigError::AmbiguousExtension(candidates)),
                }
            }
        };

        let root = namespace.join(&name);
        if !root.is_dir() {
            return Err(ConfigError::MissingExtensionRoot(root));
        }
        debug!(extension = %name, root = %root.display(), "Resolved extension root");
        Ok((name, root))
    }

    /// `path` relative to the repository root, for display.
    pub fn display_path<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }

    pub fn trace_loaded(&self) {
        info!(
            root = %self.root.display(),
            extension = self.extension.as_deref().unwrap_or("<detect>"),
            src_dir = %self.src_dir.display(),
            docs_dir = %self.docs_dir.display(),
            "Loaded HookConfig"
        );
        debug!(config = ?self, "HookConfig loaded (full debug)");
    }
}
