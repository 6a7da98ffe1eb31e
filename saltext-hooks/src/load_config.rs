/// `load_config` module: finds, reads and parses the YAML hook configuration.
///
/// This is the only place where user-supplied YAML is parsed into the core
/// crate's [`HookConfig`].
///
/// # Lookup
/// 1. `--config` / `SALTEXT_HOOKS_CONFIG`, when given (must exist).
/// 2. `<root>/.saltext-hooks.yaml`, when present.
/// 3. Built-in defaults.
///
/// A relative `root` inside a config file is resolved against the file's
/// directory; `--root` on the command line wins over both.
///
/// # Errors
/// All errors use `anyhow::Error` and are surfaced at the CLI boundary.
use anyhow::Result;
use saltext_hooks_core::config::HookConfig;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

pub const DEFAULT_CONFIG_FILE: &str = ".saltext-hooks.yaml";

fn read_config(path: &Path) -> Result<HookConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let config_content = match fs::read_to_string(path) {
        Ok(content) => {
            info!(config_path = ?path, "Config file read successfully");
            content
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow::anyhow!(
                "Failed to read config file {:?}: {}",
                path,
                e
            ));
        }
    };

    if config_content.trim().is_empty() {
        info!(config_path = ?path, "Config file is empty, using defaults");
        return Ok(HookConfig::default());
    }

    match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(conf)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow::anyhow!("Failed to parse config YAML {:?}: {e}", path))
        }
    }
}

/// Loads the hook configuration, applying the lookup order above.
pub fn load_config(path: Option<&Path>, root: Option<&Path>) -> Result<HookConfig> {
    let config_path: Option<PathBuf> = match path {
        Some(p) => Some(p.to_path_buf()),
        None => {
            let candidate = root.unwrap_or(Path::new(".")).join(DEFAULT_CONFIG_FILE);
            candidate.is_file().then_some(candidate)
        }
    };

    let mut config = match &config_path {
        Some(p) => read_config(p)?,
        None => {
            info!("No config file found, using defaults");
            HookConfig::default()
        }
    };

    match (root, &config_path) {
        (Some(root), _) => config.root = root.to_path_buf(),
        (None, Some(file)) if config.root.is_relative() => {
            let base = file.parent().unwrap_or(Path::new("."));
            config.root = base.join(&config.root);
        }
        _ => {}
    }

    config.trace_loaded();
    Ok(config)
}
