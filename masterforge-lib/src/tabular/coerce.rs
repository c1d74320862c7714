//! Cell coercion between tabular text and typed values.
//!
//! Numbers always use `.` as the decimal separator, independent of the host locale.

use super::RawTable;
use crate::Result;
use crate::meta::{ColumnMeta, TableMeta, Value};
use crate::schema::LogicalType;
use core::str::FromStr;
use ohno::{IntoAppError, bail};

/// Parses one cell for `column`.
///
/// An empty cell becomes null for nullable columns and the type default otherwise.
pub fn parse_cell(cell: &str, column: &ColumnMeta) -> Result<Value> {
    if cell.is_empty() {
        return Ok(column.empty_value());
    }

    Ok(match &column.logical_type {
        LogicalType::Int32 => Value::Int32(parse_number(cell, "int32")?),
        LogicalType::Int64 => Value::Int64(parse_number(cell, "int64")?),
        LogicalType::UInt32 => Value::UInt32(parse_number(cell, "uint32")?),
        LogicalType::UInt64 => Value::UInt64(parse_number(cell, "uint64")?),
        LogicalType::Float32 => Value::Float32(parse_number(cell, "float32")?),
        LogicalType::Float64 => Value::Float64(parse_number(cell, "float64")?),
        LogicalType::Bool => Value::Bool(parse_bool(cell)?),
        LogicalType::String => Value::String(cell.to_string()),
        LogicalType::Bytes => Value::Bytes(hex::decode(cell.trim()).into_app_err_with(|| format!("invalid hex bytes '{cell}'"))?),
        LogicalType::Enum(e) => {
            let text = cell.trim();
            match e.number_of(text) {
                Some(n) => Value::Int32(n),
                None => match text.parse::<i32>() {
                    Ok(n) => Value::Int32(n),
                    Err(_) => bail!("'{cell}' is not a value of enum {}", e.name),
                },
            }
        }
    })
}

/// Formats a value in the canonical tabular spelling, the inverse of [`parse_cell`].
#[must_use]
pub fn format_cell(value: &Value, column: &ColumnMeta) -> String {
    match (value, &column.logical_type) {
        (Value::Int32(n), LogicalType::Enum(e)) => e.name_of(*n).map_or_else(|| n.to_string(), str::to_string),
        _ => format_value(value),
    }
}

/// Canonical spelling without column context: enums stay numeric.
#[must_use]
pub fn format_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Bool(b) => b.to_string(),
        Value::Int32(n) => n.to_string(),
        Value::Int64(n) => n.to_string(),
        Value::UInt32(n) => n.to_string(),
        Value::UInt64(n) => n.to_string(),
        Value::Float32(f) => f.to_string(),
        Value::Float64(f) => f.to_string(),
        Value::String(s) => s.clone(),
        Value::Bytes(b) => hex::encode(b),
    }
}

/// Rewrites the cells of `meta`'s columns in their canonical spelling.
///
/// Two cells holding the same typed value come out identical, so `"1"` and
/// `"true"` agree in a bool column. Cells that do not parse, and columns `meta`
/// does not know, are kept as written.
#[must_use]
pub fn canonicalize(table: &RawTable, meta: &TableMeta) -> RawTable {
    let columns: Vec<Option<&ColumnMeta>> = table.headers.iter().map(|h| meta.find_column(h).map(|(_, c)| c)).collect();

    let rows = table
        .rows
        .iter()
        .map(|row| {
            row.iter()
                .zip(columns.iter().chain(core::iter::repeat(&None)))
                .map(|(cell, column)| match column {
                    Some(c) => parse_cell(cell, c).map_or_else(|_| cell.clone(), |v| format_cell(&v, c)),
                    None => cell.clone(),
                })
                .collect()
        })
        .collect();

    RawTable {
        headers: table.headers.clone(),
        rows,
    }
}

fn parse_number<T: FromStr>(cell: &str, type_name: &str) -> Result<T>
where
    T::Err: core::fmt::Display,
{
    cell.trim().parse::<T>().map_err(|e| ohno::app_err!("invalid {type_name} value '{cell}': {e}"))
}

/// Accepts `1`, `0` and `true`/`false` in any case.
pub fn parse_bool(cell: &str) -> Result<bool> {
    let text = cell.trim();
    if text == "1" || text.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if text == "0" || text.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        bail!("invalid bool value '{cell}': expected 1, 0, true or false")
    }
}
