use super::Host;
use super::common::{CommonArgs, Project, Tone};
use crate::Result;
use crate::verify::{MAX_DISPLAYED_DIFFERENCES, RoundTripOutcome, TabularDiff, diff_binaries, diff_dirs, verify_roundtrip};
use camino::Utf8PathBuf;
use clap::Parser;
use ohno::IntoAppError;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct DiffBinaryArgs {
    /// Previous binary snapshot
    #[arg(value_name = "OLD")]
    pub old: Utf8PathBuf,

    /// New binary snapshot
    #[arg(value_name = "NEW")]
    pub new: Utf8PathBuf,
}

#[derive(Parser, Debug)]
pub struct DiffTabularArgs {
    /// Source tabular directory
    #[arg(value_name = "SOURCE")]
    pub source: Utf8PathBuf,

    /// Target tabular directory
    #[arg(value_name = "TARGET")]
    pub target: Utf8PathBuf,
}

#[derive(Parser, Debug)]
pub struct VerifyArgs {
    /// Only verify these targets (default is every configured target)
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,

    /// Directory of maintained sources (default is the configured generated directory)
    #[arg(long, value_name = "PATH")]
    pub generated_dir: Option<Utf8PathBuf>,
}

/// Compares two binaries by hash and size, listing tables whose row count moved.
pub fn diff_binary<H: Host>(host: &mut H, common: &CommonArgs, args: &DiffBinaryArgs) -> Result<()> {
    let project = Project::load(common)?;
    let old = fs::read(&args.old).into_app_err_with(|| format!("reading binary '{}'", args.old))?;
    let new = fs::read(&args.new).into_app_err_with(|| format!("reading binary '{}'", args.new))?;
    let diff = diff_binaries(&old, &new);

    if diff.identical() {
        let _ = writeln!(host.output(), "{} sha256 {} ({} bytes)", project.paint("Identical:", Tone::Good), diff.new_hash, diff.new_size);
        return Ok(());
    }

    let _ = writeln!(host.output(), "{}", project.paint("Binaries differ", Tone::Bad));
    let _ = writeln!(host.output(), "  old: sha256 {} ({} bytes)", diff.old_hash, diff.old_size);
    let _ = writeln!(host.output(), "  new: sha256 {} ({} bytes)", diff.new_hash, diff.new_size);
    let _ = writeln!(host.output(), "  delta: {:+} bytes", diff.delta());

    for table in &diff.tables {
        let count = |rows: Option<usize>| rows.map_or_else(|| "-".to_string(), |n| n.to_string());
        let _ = writeln!(
            host.output(),
            "  {:<32} {} -> {} row(s)",
            table.table,
            count(table.old_rows),
            count(table.new_rows)
        );
    }

    host.exit(1);
    Ok(())
}

/// Writes a full tabular diff report. Cell listings are capped, totals never are.
pub fn print_tabular_diff<H: Host>(host: &mut H, project: &Project, diff: &TabularDiff) {
    for name in &diff.source_only_files {
        let _ = writeln!(host.output(), "{} {name}", project.paint("only in source:", Tone::Warn));
    }
    for name in &diff.target_only_files {
        let _ = writeln!(host.output(), "{} {name}", project.paint("only in target:", Tone::Warn));
    }

    for file in &diff.files {
        if file.is_clean() {
            continue;
        }

        let _ = writeln!(host.output(), "{}", project.paint(&file.name, Tone::Strong));
        if !file.source_only_columns.is_empty() {
            let _ = writeln!(host.output(), "  source-only columns: {}", file.source_only_columns.join(", "));
        }
        if !file.target_only_columns.is_empty() {
            let _ = writeln!(host.output(), "  target-only columns: {}", file.target_only_columns.join(", "));
        }
        if file.source_rows != file.target_rows {
            let _ = writeln!(host.output(), "  row count: {} vs {}", file.source_rows, file.target_rows);
        }
        for cell in &file.cells {
            let _ = writeln!(host.output(), "  row {} column {}: {:?} vs {:?}", cell.row, cell.column, cell.source, cell.target);
        }
        if file.cell_differences > file.cells.len() {
            let _ = writeln!(
                host.output(),
                "  ... {} more (showing {MAX_DISPLAYED_DIFFERENCES} of {} cell differences)",
                file.cell_differences - file.cells.len(),
                file.cell_differences
            );
        }
    }
}

/// Compares two tabular directories file by file and cell by cell.
pub fn diff_tabular<H: Host>(host: &mut H, common: &CommonArgs, args: &DiffTabularArgs) -> Result<()> {
    let project = Project::load(common)?;
    let diff = diff_dirs(&args.source, &args.target)?;

    if diff.has_differences() {
        print_tabular_diff(host, &project, &diff);
        host.exit(1);
    } else {
        let _ = writeln!(host.output(), "{} {} file(s) compared", project.paint("No differences:", Tone::Good), diff.files.len());
    }

    Ok(())
}

/// Regenerates table sources and compares them with the maintained copies.
pub fn verify_sources<H: Host>(host: &mut H, common: &CommonArgs, args: &VerifyArgs) -> Result<()> {
    let project = Project::load(common)?;
    let targets = project.config.select_targets(&args.targets)?;
    let defs = project.read_schema()?;
    let generated_dir = args.generated_dir.clone().unwrap_or_else(|| project.generated_dir());

    let mut failed = false;
    for target in targets {
        let entries = verify_roundtrip(&defs, &project.config.namespace, &generated_dir, &target.name, target.bit)?;
        for entry in entries {
            match entry.outcome {
                RoundTripOutcome::Match => {
                    let _ = writeln!(host.output(), "{} {}/{}", project.paint("ok", Tone::Good), target.name, entry.table);
                }
                RoundTripOutcome::Missing => {
                    failed = true;
                    let _ = writeln!(host.output(), "{} {}/{} ('{}')", project.paint("missing", Tone::Bad), target.name, entry.table, entry.path);
                }
                RoundTripOutcome::Mismatch(lines) => {
                    failed = true;
                    let _ = writeln!(host.output(), "{} {}/{} ('{}')", project.paint("mismatch", Tone::Bad), target.name, entry.table, entry.path);
                    for line in lines.iter().take(MAX_DISPLAYED_DIFFERENCES) {
                        let _ = writeln!(host.output(), "  line {}:", line.line);
                        let _ = writeln!(host.output(), "    - {}", line.expected.as_deref().unwrap_or("<end of file>"));
                        let _ = writeln!(host.output(), "    + {}", line.actual.as_deref().unwrap_or("<end of file>"));
                    }
                    if lines.len() > MAX_DISPLAYED_DIFFERENCES {
                        let _ = writeln!(host.output(), "  ... {} more differing line(s)", lines.len() - MAX_DISPLAYED_DIFFERENCES);
                    }
                }
            }
        }
    }

    if failed {
        let _ = writeln!(host.error(), "{}", project.paint("❌ Generated sources are out of date", Tone::Bad));
        host.exit(1);
    }

    Ok(())
}
