//! # contract: the seam between hook implementations and the CLI
//!
//! Each hook implements [`Checker`]. The CLI only ever sees the trait, so
//! integration tests can drive it with a `MockChecker` (generated by `mockall`
//! behind the `test-export-mocks` feature).
//!
//! Checkers never fail: anything that goes wrong while scanning a file is
//! reported as a violation against that file. Errors that prevent a checker
//! from being built at all (no extension root, say) surface from its
//! constructor instead.

use crate::report::Report;
use mockall::automock;
use tracing::{error, info};

#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
pub trait Checker {
    /// Short name used in logs and the report summary.
    fn name(&self) -> &'static str;

    /// Scan once and collect every violation.
    fn check(&self) -> Report;
}

/// Runs `checker` with start/finish events around it.
pub fn run_checker(checker: &dyn Checker) -> Report {
    let name = checker.name();
    info!(checker = name, "Starting check");
    let report = checker.check();
    let summary = report.summary();
    if report.passed() {
        info!(checker = name, files = summary.files_checked, "Check passed");
    } else {
        error!(
            checker = name,
            files = summary.files_checked,
            failed = summary.files_failed,
            violations = summary.violations,
            "Check failed"
        );
    }
    report
}
