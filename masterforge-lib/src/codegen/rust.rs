//! Forward generator: table definitions to Rust table types.

use super::naming::{pascal_name, rust_field_ident, snake_name};
use crate::Result;
use crate::meta::{ColumnMeta, TableMeta};
use crate::schema::{LogicalType, TableDefinition};
use core::fmt::Write;

const HEADER: &str = "// <auto-generated>\n// This file was generated by masterforge. Do not edit it by hand.\n// </auto-generated>\n";

/// Generates the table type for one target.
///
/// Returns `None` when the table's own deploy mask excludes the target, in which
/// case no file should be written. Output depends only on the arguments.
pub fn generate_table(def: &TableDefinition, namespace: &str, target_label: &str, target_bit: u32) -> Result<Option<String>> {
    let Some(meta) = TableMeta::from_definition(def, namespace, target_bit)? else {
        return Ok(None);
    };

    Ok(Some(render_table(&meta, &def.schema_file, target_label)))
}

/// Renders a table type from its runtime metadata.
#[must_use]
pub fn render_table(meta: &TableMeta, schema_file: &str, target_label: &str) -> String {
    let type_name = pascal_name(&meta.name);
    let columns: Vec<&ColumnMeta> = meta.tabular_columns().collect();
    let has_enum = columns.iter().any(|c| c.logical_type.is_enum());

    let mut out = String::new();
    out.push_str(HEADER);
    let _ = writeln!(out, "// Source: {schema_file}");
    let _ = writeln!(out, "// Target: {target_label}");
    out.push('\n');

    out.push_str("use masterforge_lib::Result;\n");
    if has_enum {
        out.push_str("use masterforge_lib::meta::{ColumnMeta, EnumType, LogicalType, MasterTable, TableMeta, Value, take};\n");
    } else {
        out.push_str("use masterforge_lib::meta::{ColumnMeta, LogicalType, MasterTable, TableMeta, Value, take};\n");
    }
    out.push('\n');

    let _ = writeln!(out, "/// Row of the `{}` master table.", meta.name);
    out.push_str("#[derive(Debug, Clone, PartialEq)]\n");
    let _ = writeln!(out, "pub struct {type_name} {{");
    for c in &columns {
        let _ = writeln!(out, "    pub {}: {},", rust_field_ident(&c.field), rust_type(c));
    }
    out.push_str("}\n\n");

    let _ = writeln!(out, "impl MasterTable for {type_name} {{");
    let _ = writeln!(out, "    const TABLE_NAME: &'static str = \"{}\";", meta.name);
    out.push('\n');

    out.push_str("    fn meta() -> TableMeta {\n");
    let _ = write!(out, "        TableMeta::new(\"{}\", \"{}\")", meta.name, meta.namespace);
    if meta.deploy_mask != 0 {
        let _ = write!(out, "\n            .deploy({})", meta.deploy_mask);
    }
    for c in &columns {
        let _ = write!(out, "\n            .column({})", column_expr(c));
    }
    out.push_str("\n    }\n\n");

    out.push_str("    fn from_values(values: Vec<Value>) -> Result<Self> {\n");
    out.push_str("        let mut values = values.into_iter();\n");
    out.push_str("        Ok(Self {\n");
    for c in &columns {
        let _ = writeln!(out, "            {}: take(&mut values, \"{}\")?,", rust_field_ident(&c.field), c.name);
    }
    out.push_str("        })\n");
    out.push_str("    }\n\n");

    out.push_str("    fn into_values(self) -> Vec<Value> {\n");
    out.push_str("        vec![\n");
    for c in &columns {
        let _ = writeln!(out, "            Value::from(self.{}),", rust_field_ident(&c.field));
    }
    out.push_str("        ]\n");
    out.push_str("    }\n");
    out.push_str("}\n");

    out
}

/// Renders the per-target `mod.rs` that registers every generated table.
#[must_use]
pub fn render_registry(target_label: &str, table_names: &[String]) -> String {
    let mut out = String::new();
    out.push_str(HEADER);
    let _ = writeln!(out, "// Target: {target_label}");
    out.push('\n');

    for name in table_names {
        let _ = writeln!(out, "mod {};", snake_name(name));
    }
    out.push('\n');

    for name in table_names {
        let _ = writeln!(out, "pub use {}::{};", snake_name(name), pascal_name(name));
    }
    out.push('\n');

    out.push_str("use masterforge_lib::meta::{MasterTable, TableMeta};\n\n");
    out.push_str("/// Metadata of every table in this target, in schema order.\n");
    out.push_str("#[must_use]\n");
    out.push_str("pub fn tables() -> Vec<TableMeta> {\n");
    out.push_str("    vec![\n");
    for name in table_names {
        let _ = writeln!(out, "        {}::meta(),", pascal_name(name));
    }
    out.push_str("    ]\n");
    out.push_str("}\n");

    out
}

fn rust_type(column: &ColumnMeta) -> String {
    let ty = column.logical_type.rust_type();
    if column.nullable {
        format!("Option<{ty}>")
    } else {
        ty.to_string()
    }
}

fn column_expr(column: &ColumnMeta) -> String {
    let mut expr = format!(
        "ColumnMeta::new(\"{}\", \"{}\", {})",
        column.name,
        column.field,
        logical_type_expr(&column.logical_type)
    );

    if column.nullable {
        expr.push_str(".nullable()");
    }
    if column.deploy_mask != 0 {
        let _ = write!(expr, ".deploy({})", column.deploy_mask);
    }
    if let Some(order) = column.primary_key {
        let _ = write!(expr, ".primary_key({order})");
    }
    for key in &column.secondary_keys {
        let _ = write!(expr, ".secondary_key({}, {}, {})", key.index, key.order, key.non_unique);
    }

    expr
}

fn logical_type_expr(logical_type: &LogicalType) -> String {
    match logical_type {
        LogicalType::Enum(e) => {
            let values = e
                .values
                .iter()
                .map(|v| format!("(\"{}\", {})", v.name, v.number))
                .collect::<Vec<_>>()
                .join(", ");
            format!("LogicalType::Enum(EnumType::new(\"{}\", [{values}]))", e.name)
        }
        LogicalType::Int32 => "LogicalType::Int32".to_string(),
        LogicalType::Int64 => "LogicalType::Int64".to_string(),
        LogicalType::UInt32 => "LogicalType::UInt32".to_string(),
        LogicalType::UInt64 => "LogicalType::UInt64".to_string(),
        LogicalType::Float32 => "LogicalType::Float32".to_string(),
        LogicalType::Float64 => "LogicalType::Float64".to_string(),
        LogicalType::Bool => "LogicalType::Bool".to_string(),
        LogicalType::String => "LogicalType::String".to_string(),
        LogicalType::Bytes => "LogicalType::Bytes".to_string(),
    }
}
