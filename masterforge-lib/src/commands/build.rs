use super::Host;
use super::common::{CommonArgs, Project, Tone};
use crate::Result;
use crate::binary::{BINARY_EXTENSION, TableOutcome, TableReport, build_target};
use crate::schema::EVERY_TARGET;
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct BuildArgs {
    /// Only build these targets (default is every configured target)
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,
}

/// Writes one line per table and returns whether any table failed.
fn print_reports<H: Host>(host: &mut H, project: &Project, reports: &[TableReport]) -> bool {
    let mut failed = false;
    for report in reports {
        match &report.outcome {
            TableOutcome::Included { rows } => {
                let _ = writeln!(host.output(), "  {:<32} {rows} row(s)", report.table);
            }
            TableOutcome::Skipped { reason } => {
                let _ = writeln!(host.error(), "  {:<32} {} {reason}", report.table, project.paint("skipped:", Tone::Warn));
            }
            TableOutcome::Failed { error } => {
                failed = true;
                let _ = writeln!(host.error(), "  {:<32} {} {error}", report.table, project.paint("failed:", Tone::Bad));
            }
        }
    }
    failed
}

/// Builds one binary snapshot per selected target.
///
/// Missing tabular files only skip their table. A table whose data is broken is left
/// out of the snapshot, the remaining targets are still built, and the run exits with 1.
pub fn build_binaries<H: Host>(host: &mut H, common: &CommonArgs, args: &BuildArgs) -> Result<()> {
    let project = Project::load(common)?;
    let targets = project.config.select_targets(&args.targets)?;
    let defs = project.read_schema()?;
    let tabular_dir = project.tabular_dir();
    let output_dir = project.output_dir();

    fs::create_dir_all(&output_dir).into_app_err_with(|| format!("could not create directory '{output_dir}'"))?;

    let mut failed = false;
    for target in targets {
        let build = build_target(&defs, &project.config.namespace, &tabular_dir, &target.name, target.bit)?;
        let path = output_dir.join(format!("{}.{BINARY_EXTENSION}", target.name));
        fs::write(&path, &build.bytes).into_app_err_with(|| format!("writing '{path}'"))?;

        let _ = writeln!(
            host.output(),
            "{} '{}' -> {path} ({} bytes, sha256 {})",
            project.paint("Built", Tone::Good),
            target.name,
            build.bytes.len(),
            build.hash
        );
        failed |= print_reports(host, &project, &build.reports);
    }

    if failed {
        let _ = writeln!(host.error(), "{}", project.paint("❌ Build finished with failed tables", Tone::Bad));
        host.exit(1);
    }

    Ok(())
}

/// Checks every tabular file against the full schema without writing anything.
pub fn validate_data<H: Host>(host: &mut H, common: &CommonArgs) -> Result<()> {
    let project = Project::load(common)?;
    let defs = project.read_schema()?;

    let check = build_target(&defs, &project.config.namespace, &project.tabular_dir(), "all", EVERY_TARGET)?;
    let failed = print_reports(host, &project, &check.reports);

    if failed {
        let _ = writeln!(host.error(), "{}", project.paint("❌ Tabular data validation failed", Tone::Bad));
        host.exit(1);
    } else {
        let _ = writeln!(host.output(), "{}", project.paint("Tabular data is valid", Tone::Good));
    }

    Ok(())
}
