use clap::Parser;
use saltext_hooks::load_config::{load_config, DEFAULT_CONFIG_FILE};
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

/// An explicit config file is read and its relative root resolved against the file's directory.
#[test]
fn test_load_config_explicit_file() {
    let config_yaml = r#"
root: repo
extension: kubernetes
cli_examples:
  commands: [salt-call]
  require_examples: true
autodocs:
  check_content: false
"#;
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), config_yaml).unwrap();

    let config = load_config(Some(config_file.path()), None).expect("Config should load");

    let parent = config_file.path().parent().unwrap();
    assert_eq!(config.root, parent.join("repo"));
    assert_eq!(config.extension.as_deref(), Some("kubernetes"));
    assert_eq!(config.cli_examples.commands, vec!["salt-call".to_string()]);
    assert!(config.cli_examples.require_examples);
    // Untouched sections keep their defaults.
    assert_eq!(config.cli_examples.languages, vec!["bash".to_string()]);
    assert!(!config.autodocs.check_content);
    assert_eq!(config.autodocs.excluded_kinds, vec!["utils".to_string()]);
}

#[test]
fn test_load_config_defaults_without_file() {
    let dir = tempfile::tempdir().unwrap();
    let config = load_config(None, Some(dir.path())).expect("Defaults should load");

    assert_eq!(config.root, dir.path());
    assert_eq!(config.src_dir, PathBuf::from("src"));
    assert_eq!(config.docs_dir, PathBuf::from("docs/ref"));
    assert!(!config.cli_examples.require_examples);
}

/// `.saltext-hooks.yaml` in the root is picked up, but `--root` still wins over its `root`.
#[test]
fn test_load_config_discovers_file_in_root() {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path().join(DEFAULT_CONFIG_FILE),
        "root: elsewhere\nextension: vault\n",
    )
    .unwrap();

    let config = load_config(None, Some(dir.path())).expect("Config should load");

    assert_eq!(config.root, dir.path());
    assert_eq!(config.extension.as_deref(), Some("vault"));
}

#[test]
fn test_load_config_empty_file_is_default() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "\n").unwrap();

    let config = load_config(Some(config_file.path()), None).expect("Config should load");
    assert_eq!(config.extension, None);
    assert_eq!(config.cli_examples.kinds, vec!["modules".to_string()]);
}

#[test]
fn test_load_config_invalid_yaml() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "not-yaml: [:::").unwrap();

    let err = load_config(Some(config_file.path()), None).unwrap_err();
    assert!(
        format!("{err}").contains("parse"),
        "Expected YAML parse failure, got: {err}"
    );
}

#[test]
fn test_load_config_unknown_field_rejected() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "cli_examples:\n  comands: [salt]\n").unwrap();

    let err = load_config(Some(config_file.path()), None).unwrap_err();
    assert!(format!("{err}").contains("Failed to parse config YAML"));
}

#[test]
fn test_load_config_missing_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.yaml");

    let err = load_config(Some(&missing), None).unwrap_err();
    assert!(
        format!("{err}").contains("Failed to read config file"),
        "Unexpected error: {err}"
    );
}

/// The config path can come from the environment, as pre-commit sets it.
#[test]
#[serial]
fn test_config_path_from_env() {
    let config_file = NamedTempFile::new().expect("temp file");
    write(config_file.path(), "extension: kubernetes\n").unwrap();

    env::set_var("SALTEXT_HOOKS_CONFIG", config_file.path());
    let cli = saltext_hooks::Cli::try_parse_from(["saltext-hooks", "autodocs"]);
    env::remove_var("SALTEXT_HOOKS_CONFIG");

    let cli = cli.expect("Arguments should parse");
    assert_eq!(cli.config.as_deref(), Some(config_file.path()));

    let config = load_config(cli.config.as_deref(), cli.root.as_deref()).unwrap();
    assert_eq!(config.extension.as_deref(), Some("kubernetes"));
}

#[test]
#[serial]
fn test_config_flag_overrides_env() {
    env::set_var("SALTEXT_HOOKS_CONFIG", "/nonexistent/from-env.yaml");
    let cli = saltext_hooks::Cli::try_parse_from([
        "saltext-hooks",
        "--config",
        "from-flag.yaml",
        "cli-examples",
    ]);
    env::remove_var("SALTEXT_HOOKS_CONFIG");

    let cli = cli.expect("Arguments should parse");
    assert_eq!(cli.config, Some(PathBuf::from("from-flag.yaml")));
}
