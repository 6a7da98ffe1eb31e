#![doc = "saltext-hooks-core: core checks for Salt extension pre-commit hooks."]

//! This crate contains the scanners and checks behind the `saltext-hooks` binary.
//! Nothing here parses command lines or configures logging; that is the CLI crate's job.
//!
//! # Usage
//! - [`cli_example`] validates `CLI Example:` blocks in execution module docstrings.
//! - [`autodoc`] verifies one documentation page per loader module.
//! - Both produce a [`report::Report`] and implement [`contract::Checker`].

pub mod autodoc;
pub mod cli_example;
pub mod config;
pub mod contract;
pub mod python;
pub mod report;
pub mod shell;
