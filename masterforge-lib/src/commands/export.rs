use super::Host;
use super::common::{CommonArgs, Project, Tone};
use crate::Result;
use crate::binary::{Snapshot, SnapshotTable};
use crate::meta::{ColumnMeta, Value};
use crate::schema::LogicalType;
use crate::tabular::{tabular_path, write_rows};
use camino::Utf8PathBuf;
use clap::{Parser, ValueEnum};
use ohno::{EnrichableExt, IntoAppError, bail};
use serde::Serialize;
use serde_json::{Map, Number, Value as JsonValue};
use std::fs;
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    /// One JSON document holding every table
    Json,

    /// One tab-separated file per table
    Tsv,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    /// Binary snapshot to export
    #[arg(value_name = "BINARY")]
    pub binary: Utf8PathBuf,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "json")]
    pub format: ExportFormat,

    /// Output file for JSON (default is standard output) or directory for TSV (required)
    #[arg(long, short = 'o', value_name = "PATH")]
    pub output: Option<Utf8PathBuf>,
}

#[derive(Debug, Serialize)]
struct ExportDocument<'a> {
    tables: Vec<ExportTable<'a>>,
}

#[derive(Debug, Serialize)]
struct ExportTable<'a> {
    name: &'a str,
    namespace: &'a str,
    rows: Vec<Map<String, JsonValue>>,
}

/// JSON form of a cell: enums by name, bytes as hex, non-finite floats as null.
fn json_value(value: &Value, column: &ColumnMeta) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Int32(n) => match &column.logical_type {
            LogicalType::Enum(e) => e.name_of(*n).map_or_else(|| JsonValue::from(*n), |name| JsonValue::String(name.to_string())),
            _ => JsonValue::from(*n),
        },
        Value::Int64(n) => JsonValue::from(*n),
        Value::UInt32(n) => JsonValue::from(*n),
        Value::UInt64(n) => JsonValue::from(*n),
        // the shortest f32 spelling, not the widened f64 one
        Value::Float32(f) => f.to_string().parse::<f64>().ok().and_then(Number::from_f64).map_or(JsonValue::Null, JsonValue::Number),
        Value::Float64(f) => Number::from_f64(*f).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Bytes(b) => JsonValue::String(hex::encode(b)),
    }
}

fn export_table(table: &SnapshotTable) -> ExportTable<'_> {
    let columns: Vec<&ColumnMeta> = table.meta.tabular_columns().collect();
    ExportTable {
        name: &table.meta.name,
        namespace: &table.meta.namespace,
        rows: table
            .rows
            .iter()
            .map(|row| row.iter().zip(&columns).map(|(v, c)| (c.name.clone(), json_value(v, c))).collect())
            .collect(),
    }
}

/// Renders a snapshot as a pretty-printed JSON document.
pub fn snapshot_to_json(snapshot: &Snapshot) -> Result<String> {
    let document = ExportDocument {
        tables: snapshot.tables.iter().map(export_table).collect(),
    };
    serde_json::to_string_pretty(&document).into_app_err("serializing snapshot to JSON")
}

/// Writes the contents of a binary snapshot as JSON or as tabular files.
pub fn export_binary<H: Host>(host: &mut H, common: &CommonArgs, args: &ExportArgs) -> Result<()> {
    let project = Project::load(common)?;
    let bytes = fs::read(&args.binary).into_app_err_with(|| format!("reading binary '{}'", args.binary))?;
    let snapshot = Snapshot::from_bytes(&bytes).map_err(|e| e.enrich_with(|| format!("decoding '{}'", args.binary)))?;

    match args.format {
        ExportFormat::Json => {
            let json = snapshot_to_json(&snapshot)?;
            if let Some(path) = &args.output {
                fs::write(path, format!("{json}\n")).into_app_err_with(|| format!("writing '{path}'"))?;
                let _ = writeln!(host.output(), "{} {} table(s) to '{path}'", project.paint("Exported", Tone::Good), snapshot.tables.len());
            } else {
                let _ = writeln!(host.output(), "{json}");
            }
        }
        ExportFormat::Tsv => {
            let Some(dir) = &args.output else {
                bail!("--output is required when exporting to tsv");
            };
            for table in &snapshot.tables {
                write_rows(&tabular_path(dir, &table.meta.name), &table.meta, &table.rows)?;
            }
            let _ = writeln!(host.output(), "{} {} table(s) to '{dir}'", project.paint("Exported", Tone::Good), snapshot.tables.len());
        }
    }

    Ok(())
}
