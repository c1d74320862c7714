use super::common::{CommonArgs, Project, Tone};
use super::{Host, LOG_TARGET};
use crate::Result;
use crate::binary::Snapshot;
use crate::codegen::proto::{generate_schema, schema_file_name};
use crate::codegen::rust::{generate_table, render_registry};
use crate::verify::generated_path;
use camino::{Utf8Path, Utf8PathBuf};
use clap::Parser;
use ohno::{EnrichableExt, IntoAppError, bail};
use std::fs;
use std::io::Write;

#[derive(Parser, Debug)]
pub struct CodegenArgs {
    /// Only generate for these targets (default is every configured target)
    #[arg(long = "target", value_name = "NAME")]
    pub targets: Vec<String>,
}

#[derive(Parser, Debug)]
pub struct ScaffoldArgs {
    /// Binary snapshot whose embedded table metadata is turned back into schema files
    #[arg(value_name = "BINARY")]
    pub binary: Utf8PathBuf,

    /// Only scaffold these tables (default is every table in the snapshot)
    #[arg(long = "table", value_name = "NAME")]
    pub tables: Vec<String>,

    /// Directory receiving the schema files (default is the configured schema directory)
    #[arg(long, value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,

    /// Overwrite schema files that already exist
    #[arg(long)]
    pub force: bool,
}

fn write_file(path: &Utf8Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
    }
    fs::write(path, contents).into_app_err_with(|| format!("writing '{path}'"))
}

/// Generates Rust table types plus a registering `mod.rs` for each selected target.
pub fn generate_code<H: Host>(host: &mut H, common: &CommonArgs, args: &CodegenArgs) -> Result<()> {
    let project = Project::load(common)?;
    let targets = project.config.select_targets(&args.targets)?;
    let defs = project.read_schema()?;
    let generated_dir = project.generated_dir();

    for target in targets {
        let mut names = Vec::new();
        for def in &defs {
            let Some(source) = generate_table(def, &project.config.namespace, &target.name, target.bit)? else {
                log::debug!(target: LOG_TARGET, "Table '{}' is not deployed to '{}'", def.table_name, target.name);
                continue;
            };

            write_file(&generated_path(&generated_dir, &target.name, &def.table_name), &source)?;
            names.push(def.table_name.clone());
        }

        let registry = generated_dir.join(&target.name).join("mod.rs");
        write_file(&registry, &render_registry(&target.name, &names))?;

        let _ = writeln!(
            host.output(),
            "{} {} table(s) for '{}' in '{}'",
            project.paint("Generated", Tone::Good),
            names.len(),
            target.name,
            generated_dir.join(&target.name)
        );
    }

    Ok(())
}

fn existing_subdirs(dir: &Utf8Path) -> Result<Vec<String>> {
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut subdirs = Vec::new();
    for entry in dir.read_dir_utf8().into_app_err_with(|| format!("reading directory '{dir}'"))? {
        let entry = entry?;
        if entry.file_type()?.is_dir() {
            subdirs.push(entry.file_name().to_string());
        }
    }
    subdirs.sort();
    Ok(subdirs)
}

/// Reverse-generates schema files from the table metadata embedded in a snapshot.
pub fn scaffold_schema<H: Host>(host: &mut H, common: &CommonArgs, args: &ScaffoldArgs) -> Result<()> {
    let project = Project::load(common)?;
    let bytes = fs::read(&args.binary).into_app_err_with(|| format!("reading binary '{}'", args.binary))?;
    let snapshot = Snapshot::from_bytes(&bytes).map_err(|e| e.enrich_with(|| format!("decoding '{}'", args.binary)))?;
    let output = args.output.clone().unwrap_or_else(|| project.schema_dir());

    for name in &args.tables {
        if snapshot.table(name).is_none() {
            bail!("table '{name}' is not in '{}'", args.binary);
        }
    }

    for table in &snapshot.tables {
        if !args.tables.is_empty() && !args.tables.contains(&table.meta.name) {
            continue;
        }

        let subdirs = existing_subdirs(&output)?;
        let path = output.join(schema_file_name(&table.meta.name, &subdirs));
        if path.exists() && !args.force {
            let _ = writeln!(host.error(), "{} '{path}' already exists, skipping '{}'", project.paint("warning:", Tone::Warn), table.meta.name);
            continue;
        }

        write_file(&path, &generate_schema(&table.meta, &project.config.options_import))?;
        let _ = writeln!(host.output(), "{} '{}' as '{path}'", project.paint("Scaffolded", Tone::Good), table.meta.name);
    }

    Ok(())
}
