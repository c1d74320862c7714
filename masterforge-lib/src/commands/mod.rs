//! Command-line interface and orchestration for masterforge
//!
//! This module implements the CLI commands and wires the pipeline stages
//! together: schema reading, code generation, binary builds, the relational
//! store and the verification checks.
//!
//! # Execution Flow
//!
//! The `run` function parses command-line arguments using clap and routes
//! to the appropriate command handler. Each handler follows the same pattern:
//!
//! 1. Load `masterforge.toml` (or the built-in defaults) into a project
//! 2. Read the schema through protoc, or a precompiled descriptor set
//! 3. Run its stage and report per table through the [`Host`]
//! 4. Call `Host::exit(1)` if anything was inconsistent
//!
//! All output goes through the [`Host`] trait so commands can run in-process
//! under test.

mod build;
mod codegen;
mod common;
mod config;
mod db;
mod diff;
mod export;
mod host;
mod init;
mod run;

pub(crate) const LOG_TARGET: &str = "   command";

#[cfg(debug_assertions)]
pub use config::Config;

pub use build::{BuildArgs, build_binaries, validate_data};
pub use codegen::{CodegenArgs, ScaffoldArgs, generate_code, scaffold_schema};
pub use common::CommonArgs;
pub use db::{DbArgs, process_database};
pub use diff::{DiffBinaryArgs, DiffTabularArgs, VerifyArgs, diff_binary, diff_tabular, verify_sources};
pub use export::{ExportArgs, export_binary};
pub use host::Host;
pub use init::{InitArgs, init_project};
pub use run::run;

#[cfg(test)]
pub(crate) use host::TestHost;
