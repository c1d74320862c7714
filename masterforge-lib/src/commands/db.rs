use super::common::{CommonArgs, Project, Tone};
use super::diff::print_tabular_diff;
use super::{Host, LOG_TARGET};
use crate::Result;
use crate::relational::{SeedOutcome, dump, init_schema, quote_ident, seed, write_dump};
use crate::verify::{diff_typed, load_dir};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use ohno::{IntoAppError, bail};
use rusqlite::Connection;
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct DbArgs {
    /// Database file (default is the configured database path)
    #[arg(long, value_name = "PATH", global = true)]
    pub database: Option<Utf8PathBuf>,

    #[command(subcommand)]
    pub command: DbCommand,
}

#[derive(Subcommand, Debug)]
pub enum DbCommand {
    /// Create the master tables and their indexes
    Init,
    /// Replace the database contents with the tabular files
    Seed,
    /// Write every table of the configured schemas as tabular files
    Dump(DumpArgs),
    /// Compare the database contents with a tabular directory
    Diff(DbDiffArgs),
}

#[derive(Parser, Debug)]
pub struct DumpArgs {
    /// Directory receiving the tabular files
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Utf8PathBuf,
}

#[derive(Parser, Debug)]
pub struct DbDiffArgs {
    /// Tabular directory to compare against (default is the configured tabular directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<Utf8PathBuf>,
}

/// Opens the database, attaching every extra schema from `<schema>.db` next to it.
fn open_database(project: &Project, path: &Utf8Path, create: bool) -> Result<Connection> {
    if create {
        if let Some(parent) = path.parent()
            && !parent.as_str().is_empty()
        {
            fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
        }
    } else if !path.is_file() {
        bail!("database '{path}' does not exist, run `masterforge db init` first");
    }

    let conn = Connection::open(path).into_app_err_with(|| format!("opening database '{path}'"))?;
    for schema in &project.config.database.schemas {
        if schema == "main" || schema == "temp" {
            continue;
        }
        let attached = path.with_file_name(format!("{schema}.db"));
        log::debug!(target: LOG_TARGET, "Attaching '{attached}' as '{schema}'");
        conn.execute_batch(&format!("ATTACH DATABASE '{}' AS {}", attached.as_str().replace('\'', "''"), quote_ident(schema)))
            .into_app_err_with(|| format!("attaching schema '{schema}'"))?;
    }

    Ok(conn)
}

pub fn process_database<H: Host>(host: &mut H, common: &CommonArgs, args: &DbArgs) -> Result<()> {
    let project = Project::load(common)?;
    let path = args.database.clone().unwrap_or_else(|| project.database_path());
    let catalog = project.catalog(&project.read_schema()?)?;

    match &args.command {
        DbCommand::Init => {
            let mut conn = open_database(&project, &path, true)?;
            init_schema(&mut conn, &catalog)?;
            let _ = writeln!(host.output(), "{} {} master table(s) in '{path}'", project.paint("Created", Tone::Good), catalog.len());
        }

        DbCommand::Seed => {
            let mut conn = open_database(&project, &path, false)?;
            let reports = seed(
                &mut conn,
                &project.tabular_dir(),
                &project.config.database.schemas,
                &catalog,
                &project.config.database.user_tables,
            )?;
            for report in reports {
                match report.outcome {
                    SeedOutcome::Seeded { rows, backfilled } => {
                        let _ = writeln!(host.output(), "  {:<32} {rows} row(s)", report.table);
                        if !backfilled.is_empty() {
                            let _ = writeln!(
                                host.error(),
                                "  {:<32} {} {}",
                                report.table,
                                project.paint("backfilled with defaults:", Tone::Warn),
                                backfilled.join(", ")
                            );
                        }
                    }
                    SeedOutcome::Skipped { reason } => {
                        let _ = writeln!(host.error(), "  {:<32} {} {reason}", report.table, project.paint("skipped:", Tone::Warn));
                    }
                }
            }
        }

        DbCommand::Dump(dump_args) => {
            let conn = open_database(&project, &path, false)?;
            let contents = dump(&conn, &project.config.database.schemas, &catalog)?;
            write_dump(&contents, &dump_args.output)?;
            for (table, reason) in &contents.skipped {
                let _ = writeln!(host.error(), "  {table:<32} {} {reason}", project.paint("skipped:", Tone::Warn));
            }
            let _ = writeln!(
                host.output(),
                "{} {} table(s) to '{}'",
                project.paint("Dumped", Tone::Good),
                contents.tables.len(),
                dump_args.output
            );
        }

        DbCommand::Diff(diff_args) => {
            let conn = open_database(&project, &path, false)?;
            let dir = diff_args.dir.clone().unwrap_or_else(|| project.tabular_dir());
            let contents = dump(&conn, &project.config.database.schemas, &catalog)?;
            let diff = diff_typed(&load_dir(&dir)?, &contents.tables, &catalog);

            if diff.has_differences() {
                print_tabular_diff(host, &project, &diff);
                host.exit(1);
            } else {
                let _ = writeln!(host.output(), "{} '{dir}' matches '{path}'", project.paint("No differences:", Tone::Good));
            }
        }
    }

    Ok(())
}
