//! Tab-separated tabular files: one header row, then one row per record.
//!
//! Quoting is disabled in both directions so every cell is taken byte for byte.

mod coerce;
mod reader;
mod writer;

use camino::{Utf8Path, Utf8PathBuf};

pub(crate) const LOG_TARGET: &str = "   tabular";

pub const TABULAR_EXTENSION: &str = "tsv";

pub use coerce::{canonicalize, format_cell, format_value, parse_bool, parse_cell};
pub use reader::{RawTable, read_raw, read_rows};
pub use writer::{write_raw, write_rows};

/// Location of a table's file inside a tabular directory.
#[must_use]
pub fn tabular_path(dir: &Utf8Path, table_name: &str) -> Utf8PathBuf {
    dir.join(format!("{table_name}.{TABULAR_EXTENSION}"))
}
