//! Runtime metadata carried by generated table types.
//!
//! Generated code depends on this module only, so it is public in every build.

mod table_meta;
mod value;

pub(crate) const LOG_TARGET: &str = "      meta";

pub use table_meta::{ColumnKind, ColumnMeta, IndexMeta, MasterTable, TableMeta};
pub use value::{FromValue, Value, take};

pub use crate::schema::{EnumType, LogicalType};
