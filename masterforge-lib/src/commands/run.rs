//! Command dispatch logic for masterforge

use super::common::{CommonArgs, init_logging};
use super::{
    BuildArgs, CodegenArgs, DbArgs, DiffBinaryArgs, DiffTabularArgs, ExportArgs, InitArgs, ScaffoldArgs, VerifyArgs, build_binaries, diff_binary,
    diff_tabular, export_binary, generate_code, init_project, process_database, scaffold_schema, validate_data, verify_sources,
};
use crate::{Host, Result};
use clap::builder::Styles;
use clap::builder::styling::{AnsiColor, Effects};
use clap::{Parser, Subcommand};
use std::io::Write;

const CLAP_STYLES: Styles = Styles::styled()
    .header(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .usage(AnsiColor::Green.on_default().effects(Effects::BOLD))
    .literal(AnsiColor::Cyan.on_default().effects(Effects::BOLD))
    .placeholder(AnsiColor::Cyan.on_default());

#[derive(Parser, Debug)]
#[command(name = "masterforge", author, version, long_about = None, display_name = "masterforge")]
#[command(about = "Build, generate and verify schema-driven master data")]
#[command(styles = CLAP_STYLES)]
struct Cli {
    #[command(flatten)]
    common: CommonArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Generate a default configuration file and the extension options schema
    Init(InitArgs),
    /// Generate Rust table types for each target
    Codegen(CodegenArgs),
    /// Generate schema files from the tables embedded in a binary snapshot
    Scaffold(ScaffoldArgs),
    /// Build one binary snapshot per target from the tabular files
    Build(BuildArgs),
    /// Check the tabular files against the schema without building
    Validate,
    /// Export a binary snapshot as JSON or tabular files
    Export(ExportArgs),
    /// Compare two binary snapshots
    DiffBinary(DiffBinaryArgs),
    /// Compare two tabular directories
    DiffTabular(DiffTabularArgs),
    /// Check that maintained sources match what codegen would produce
    Verify(VerifyArgs),
    /// Initialize, seed, dump or diff the relational store
    Db(DbArgs),
}

impl Command {
    const fn name(&self) -> &'static str {
        match self {
            Self::Init(_) => "init",
            Self::Codegen(_) => "codegen",
            Self::Scaffold(_) => "scaffold",
            Self::Build(_) => "build",
            Self::Validate => "validate",
            Self::Export(_) => "export",
            Self::DiffBinary(_) => "diff-binary",
            Self::DiffTabular(_) => "diff-tabular",
            Self::Verify(_) => "verify",
            Self::Db(_) => "db",
        }
    }
}

/// Dispatch command-line arguments to the appropriate handler
///
/// This function parses the command-line arguments and executes the corresponding
/// subcommand. It's designed to be called from main.rs with the program arguments.
///
/// Commands that find inconsistencies report them in full and call `host.exit(1)`
/// rather than returning an error. Errors that stop a command are written to the
/// host's error stream before being returned.
///
/// # Errors
///
/// Returns an error if the executed command fails
pub fn run<I, T, H>(host: &mut H, args: I) -> Result<()>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
    H: Host,
{
    let cli = Cli::parse_from(args);
    init_logging(cli.common.log_level);

    let common = &cli.common;
    let result = match &cli.command {
        Command::Init(args) => init_project(host, common, args),
        Command::Codegen(args) => generate_code(host, common, args),
        Command::Scaffold(args) => scaffold_schema(host, common, args),
        Command::Build(args) => build_binaries(host, common, args),
        Command::Validate => validate_data(host, common),
        Command::Export(args) => export_binary(host, common, args),
        Command::DiffBinary(args) => diff_binary(host, common, args),
        Command::DiffTabular(args) => diff_tabular(host, common, args),
        Command::Verify(args) => verify_sources(host, common, args),
        Command::Db(args) => process_database(host, common, args),
    };

    if let Err(e) = &result {
        let _ = writeln!(host.error(), "❌ {} failed: {e}", cli.command.name());
        host.exit(1);
    }

    result
}
