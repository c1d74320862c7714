//! SQLite mirror of the tabular master data.
//!
//! Master tables are created from the schema. User tables belong to the
//! application and may reference master tables through foreign keys; they are
//! only ever introspected. Tables of attached schemas map to `schema.table`
//! tabular files in both directions.

mod convert;
mod ddl;
mod dump;
mod introspect;
mod seed;

use crate::meta::TableMeta;

pub(crate) const LOG_TARGET: &str = "        db";

pub use convert::{DeclaredType, cell_to_sql, sql_to_cell, sql_to_value, value_to_sql};
pub use ddl::init_schema;
pub use dump::{Dump, dump, write_dump};
pub use introspect::{ColumnInfo, TableInfo, insertion_order, list_tables};
pub use seed::{SeedOutcome, seed};

/// Quotes an SQL identifier.
#[must_use]
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Schema-qualified, quoted name of a table.
fn qualified_name(table: &TableInfo) -> String {
    format!("{}.{}", quote_ident(&table.schema), quote_ident(&table.name))
}

/// Tabular file stem of a table: its name in `main`, `schema.table` anywhere else.
fn tabular_key(table: &TableInfo) -> String {
    if table.schema == "main" {
        table.name.clone()
    } else {
        format!("{}.{}", table.schema, table.name)
    }
}

/// Schema metadata of a master table. Master tables only live in `main`.
fn master_meta<'a>(catalog: &'a [TableMeta], table: &TableInfo) -> Option<&'a TableMeta> {
    if table.schema == "main" {
        catalog.iter().find(|m| m.name == table.name)
    } else {
        None
    }
}
