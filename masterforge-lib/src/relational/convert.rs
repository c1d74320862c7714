//! Value conversion between typed cells, tabular text and SQLite storage.

use crate::Result;
use crate::meta::{ColumnMeta, Value};
use crate::schema::LogicalType;
use crate::tabular::{parse_bool, parse_cell};
use ohno::{IntoAppError, app_err, bail};
use rusqlite::types::{Value as SqlValue, ValueRef};

/// How a column's declared SQL type is treated when no table metadata is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclaredType {
    Boolean,
    Integer,
    Real,
    Text,
    Blob,
}

impl DeclaredType {
    /// SQLite affinity rules, with `BOOLEAN` kept apart from integers.
    #[must_use]
    pub fn parse(declared: &str) -> Self {
        let d = declared.to_ascii_uppercase();
        if d.contains("BOOL") {
            Self::Boolean
        } else if d.contains("INT") {
            Self::Integer
        } else if d.contains("CHAR") || d.contains("CLOB") || d.contains("TEXT") {
            Self::Text
        } else if d.is_empty() || d.contains("BLOB") {
            Self::Blob
        } else if d.contains("REAL") || d.contains("FLOA") || d.contains("DOUB") {
            Self::Real
        } else {
            Self::Text
        }
    }

    /// Value written for a non-nullable column missing from the source.
    #[must_use]
    pub const fn default_value(self) -> SqlValue {
        match self {
            Self::Boolean | Self::Integer => SqlValue::Integer(0),
            Self::Real => SqlValue::Real(0.0),
            Self::Text => SqlValue::Text(String::new()),
            Self::Blob => SqlValue::Blob(Vec::new()),
        }
    }
}

/// Storage form of a typed value.
///
/// `float32` goes through its shortest decimal spelling so the stored double
/// reads back as the same text. `uint64` keeps its bit pattern in the signed
/// integer, so values above `i64::MAX` are stored negative.
pub fn value_to_sql(value: &Value) -> Result<SqlValue> {
    Ok(match value {
        Value::Null => SqlValue::Null,
        Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
        Value::Int32(n) => SqlValue::Integer(i64::from(*n)),
        Value::Int64(n) => SqlValue::Integer(*n),
        Value::UInt32(n) => SqlValue::Integer(i64::from(*n)),
        Value::UInt64(n) => SqlValue::Integer(n.cast_signed()),
        Value::Float32(f) => SqlValue::Real(f.to_string().parse::<f64>().into_app_err("converting float32 to double")?),
        Value::Float64(f) => SqlValue::Real(*f),
        Value::String(s) => SqlValue::Text(s.clone()),
        Value::Bytes(b) => SqlValue::Blob(b.clone()),
    })
}

/// Reads a stored cell back as a typed value of `column`.
pub fn sql_to_value(cell: ValueRef<'_>, column: &ColumnMeta) -> Result<Value> {
    let lt = &column.logical_type;
    Ok(match cell {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => match lt {
            LogicalType::Int32 | LogicalType::Enum(_) => Value::Int32(i32::try_from(i).map_err(|e| app_err!("{i} out of int32 range: {e}"))?),
            LogicalType::Int64 => Value::Int64(i),
            LogicalType::UInt32 => Value::UInt32(u32::try_from(i).map_err(|e| app_err!("{i} out of uint32 range: {e}"))?),
            LogicalType::UInt64 => Value::UInt64(i.cast_unsigned()),
            LogicalType::Bool => Value::Bool(i != 0),
            LogicalType::Float32 | LogicalType::Float64 | LogicalType::String => parse_cell(&i.to_string(), column)?,
            LogicalType::Bytes => bail!("integer {i} stored in bytes column '{}'", column.name),
        },
        ValueRef::Real(f) => match lt {
            #[expect(clippy::cast_possible_truncation, reason = "float32 columns are stored as widened doubles")]
            LogicalType::Float32 => Value::Float32(f as f32),
            LogicalType::Float64 => Value::Float64(f),
            _ => bail!("real {f} stored in {lt} column '{}'", column.name),
        },
        ValueRef::Text(bytes) => {
            let text = core::str::from_utf8(bytes).map_err(|e| app_err!("invalid UTF-8 in column '{}': {e}", column.name))?;
            parse_cell(text, column)?
        }
        ValueRef::Blob(bytes) => match lt {
            LogicalType::Bytes => Value::Bytes(bytes.to_vec()),
            _ => bail!("blob stored in {lt} column '{}'", column.name),
        },
    })
}

/// Parses a tabular cell for a column known only by its declared type.
pub fn cell_to_sql(cell: &str, declared: DeclaredType, nullable: bool) -> Result<SqlValue> {
    if cell.is_empty() {
        return Ok(if nullable { SqlValue::Null } else { declared.default_value() });
    }

    Ok(match declared {
        DeclaredType::Boolean => SqlValue::Integer(i64::from(parse_bool(cell)?)),
        DeclaredType::Integer => SqlValue::Integer(cell.trim().parse().map_err(|e| app_err!("invalid integer value '{cell}': {e}"))?),
        DeclaredType::Real => SqlValue::Real(cell.trim().parse().map_err(|e| app_err!("invalid real value '{cell}': {e}"))?),
        DeclaredType::Text => SqlValue::Text(cell.to_string()),
        DeclaredType::Blob => SqlValue::Blob(hex::decode(cell.trim()).into_app_err_with(|| format!("invalid hex bytes '{cell}'"))?),
    })
}

/// Formats a stored cell for a column known only by its declared type.
pub fn sql_to_cell(cell: ValueRef<'_>, declared: DeclaredType) -> Result<String> {
    Ok(match cell {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) if declared == DeclaredType::Boolean => (i != 0).to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) => core::str::from_utf8(bytes).into_app_err("invalid UTF-8 in text cell")?.to_string(),
        ValueRef::Blob(bytes) => hex::encode(bytes),
    })
}
