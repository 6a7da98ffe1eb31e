use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const MODULE: &str = r#"__virtualname__ = "kubernetes"


def nodes(**kwargs):
    """
    Return the names of the nodes composing the kubernetes cluster

    CLI Example:

    .. code-block:: bash

        salt '*' kubernetes.nodes
    """
"#;

const BROKEN_MODULE: &str = r#"__virtualname__ = "kubernetes"


def show_pod(name, namespace="default", **kwargs):
    """
    CLI Example:

    .. code-block:: bash

        kubectl get pod guestbook
    """
"#;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).expect("Writing fixture failed");
}

/// Creates a minimal Salt extension with one execution module and no docs.
fn extension() -> TempDir {
    let tmp = tempfile::tempdir().expect("Creating temp dir failed");
    write(
        tmp.path(),
        "src/saltext/kubernetes/modules/kubernetesmod.py",
        MODULE,
    );
    tmp
}

fn hooks(dir: &Path) -> Command {
    let mut cmd = Command::cargo_bin("saltext-hooks").expect("Binary exists");
    cmd.current_dir(dir)
        .env_remove("SALTEXT_HOOKS_CONFIG")
        .env_remove("SALTEXT_HOOKS_LOG");
    cmd
}

#[test]
fn cli_examples_passes_on_documented_module() {
    let tmp = extension();
    hooks(tmp.path())
        .args([
            "cli-examples",
            "src/saltext/kubernetes/modules/kubernetesmod.py",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "cli-examples: 1 file(s) checked, no violations",
        ));
}

#[test]
fn cli_examples_reports_location_and_fails() {
    let tmp = extension();
    write(tmp.path(), "src/saltext/kubernetes/modules/pods.py", BROKEN_MODULE);

    hooks(tmp.path())
        .args([
            "cli-examples",
            "src/saltext/kubernetes/modules/kubernetesmod.py",
            "src/saltext/kubernetes/modules/pods.py",
        ])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("src/saltext/kubernetes/modules/pods.py:10: [show_pod]")
                .and(predicate::str::contains("does not invoke a recognized command"))
                .and(predicate::str::contains("1 violation(s) in 1 of 2 file(s)")),
        );
}

#[test]
fn cli_examples_without_files_scans_the_extension() {
    let tmp = extension();
    write(tmp.path(), "src/saltext/kubernetes/modules/pods.py", BROKEN_MODULE);

    hooks(tmp.path())
        .args(["--format", "json", "cli-examples"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("\"unknown_command\"")
                .and(predicate::str::contains("\"files_checked\": 2")),
        );
}

#[test]
fn require_examples_flag_turns_on_strict_mode() {
    let tmp = extension();
    write(
        tmp.path(),
        "src/saltext/kubernetes/modules/pods.py",
        "def pods():\n    pass\n",
    );

    hooks(tmp.path())
        .args(["cli-examples", "src/saltext/kubernetes/modules/pods.py"])
        .assert()
        .success();
    hooks(tmp.path())
        .args([
            "cli-examples",
            "--require-examples",
            "src/saltext/kubernetes/modules/pods.py",
        ])
        .assert()
        .code(1)
        .stdout(predicate::str::contains("does not have a docstring"));
}

#[test]
fn autodocs_write_then_check_round_trip() {
    let tmp = extension();

    hooks(tmp.path())
        .arg("autodocs")
        .assert()
        .code(1)
        .stdout(predicate::str::contains(
            "missing documentation page for src/saltext/kubernetes/modules/kubernetesmod.py",
        ));

    hooks(tmp.path())
        .args(["autodocs", "--write"])
        .assert()
        .code(1)
        .stdout(
            predicate::str::contains("docs/ref/modules/index.rst").and(predicate::str::contains(
                "docs/ref/modules/saltext.kubernetes.modules.kubernetesmod.rst",
            )),
        );

    hooks(tmp.path())
        .arg("autodocs")
        .assert()
        .success()
        .stdout(predicate::str::contains("no violations"));

    hooks(tmp.path()).args(["autodocs", "--write"]).assert().success();
}

#[test]
fn root_flag_selects_the_repository() {
    let tmp = extension();
    let elsewhere = tempfile::tempdir().unwrap();

    hooks(elsewhere.path())
        .arg("--root")
        .arg(tmp.path())
        .arg("cli-examples")
        .assert()
        .success();
}

#[test]
fn configuration_errors_exit_with_two() {
    let tmp = extension();
    write(tmp.path(), ".saltext-hooks.yaml", "cli_examples: [:::");

    hooks(tmp.path())
        .arg("autodocs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Failed to parse config YAML"));
}

#[test]
fn missing_extension_exits_with_two() {
    let tmp = tempfile::tempdir().unwrap();
    hooks(tmp.path())
        .arg("autodocs")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Cannot locate extension sources"));
}

use std::sync::{Arc, Mutex};
use tracing::field::{Field, Visit};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{layer::Context, Layer, Registry};

/// Custom Layer to collect emitted event messages.
struct EventCollector {
    events: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor(String);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = format!("{value:?}");
        }
    }
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber,
{
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(String::new());
        event.record(&mut visitor);
        self.events.lock().unwrap().push(visitor.0);
    }
}

#[test]
fn run_emits_invocation_and_failure_events() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let collector = EventCollector {
        events: events.clone(),
    };
    let subscriber = Registry::default().with(collector);
    let _guard = tracing::subscriber::set_default(subscriber);

    use saltext_hooks::cli::{run, Cli, Commands, OutputFormat, Outcome};

    let tmp = extension();
    let cli = Cli {
        root: Some(tmp.path().to_path_buf()),
        config: None,
        format: OutputFormat::Text,
        command: Commands::Autodocs { write: false },
    };

    let outcome = run(cli).expect("run succeeds");
    assert_eq!(outcome, Outcome::Failed);

    let event_msgs = events.lock().unwrap();
    for expected in ["saltext-hooks invoked", "Check failed"] {
        assert!(
            event_msgs.iter().any(|msg| msg.contains(expected)),
            "Expected a '{expected}' trace event, got: {:?}",
            event_msgs
        );
    }
}
