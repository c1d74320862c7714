use super::{ColumnInfo, LOG_TARGET, TableInfo, cell_to_sql, insertion_order, list_tables, master_meta, qualified_name, quote_ident, tabular_key, value_to_sql};
use crate::Result;
use crate::meta::{ColumnMeta, TableMeta};
use crate::tabular::{RawTable, parse_cell, read_raw, tabular_path};
use camino::Utf8Path;
use ohno::app_err;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, params_from_iter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SeedOutcome {
    Seeded {
        rows: usize,

        /// Non-nullable columns absent from the tabular file, filled with their type default.
        backfilled: Vec<String>,
    },
    Skipped {
        reason: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub table: String,
    pub outcome: SeedOutcome,
}

enum Source<'a> {
    /// Cell index in the tabular file, parsed with the table's column metadata when known.
    Cell(usize, Option<&'a ColumnMeta>),
    Backfill(SqlValue),
}

/// Replaces the contents of every table in `schemas` with the tabular files in `tabular_dir`.
///
/// Tables outside `main` read `<schema>.<table>.tsv`, the same file names a dump
/// writes. Everything happens in one transaction: all tables are emptied children
/// first, then filled parents first with master tables ahead of `user_tables`. A
/// table without a file, or with a file holding no rows, is left empty and reported
/// as skipped. Any insert failure rolls the whole run back.
pub fn seed(conn: &mut Connection, tabular_dir: &Utf8Path, schemas: &[String], catalog: &[TableMeta], user_tables: &[String]) -> Result<Vec<SeedReport>> {
    conn.execute_batch("PRAGMA foreign_keys = ON")?;

    // foreign keys never cross schemas, so each schema is ordered on its own
    let mut listed = Vec::with_capacity(schemas.len());
    for schema in schemas {
        listed.push(list_tables(conn, schema).map_err(|e| app_err!("could not list tables of schema '{schema}': {e}"))?);
    }
    let mut order = Vec::new();
    for tables in &listed {
        order.extend(insertion_order(tables, user_tables)?);
    }

    let tx = conn.transaction()?;
    for table in order.iter().rev() {
        let _ = tx.execute(&format!("DELETE FROM {}", qualified_name(table)), [])?;
    }

    let mut reports = Vec::with_capacity(order.len());
    for table in order {
        let key = tabular_key(table);
        let outcome = seed_table(&tx, tabular_dir, table, master_meta(catalog, table))?;
        if let SeedOutcome::Skipped { reason } = &outcome {
            log::warn!(target: LOG_TARGET, "Skipping table '{key}': {reason}");
        }
        reports.push(SeedReport { table: key, outcome });
    }

    tx.commit()?;
    Ok(reports)
}

fn seed_table(conn: &Connection, tabular_dir: &Utf8Path, table: &TableInfo, meta: Option<&TableMeta>) -> Result<SeedOutcome> {
    let path = tabular_path(tabular_dir, &tabular_key(table));
    if !path.is_file() {
        return Ok(SeedOutcome::Skipped {
            reason: format!("'{path}' not found"),
        });
    }

    let raw = read_raw(&path)?;
    if raw.rows.is_empty() {
        return Ok(SeedOutcome::Skipped {
            reason: format!("'{path}' has no rows"),
        });
    }

    for header in &raw.headers {
        if !table.columns.iter().any(|c| c.name == *header) {
            log::debug!(target: LOG_TARGET, "Table '{}' has no column '{header}', ignoring it", table.name);
        }
    }

    let mut columns: Vec<&ColumnInfo> = Vec::new();
    let mut sources = Vec::new();
    let mut backfilled = Vec::new();
    for column in &table.columns {
        if let Some(i) = raw.column_index(&column.name) {
            let column_meta = meta.and_then(|m| m.find_column(&column.name)).map(|(_, c)| c);
            columns.push(column);
            sources.push(Source::Cell(i, column_meta));
        } else if !column.nullable && !column.has_default && !column.identity {
            columns.push(column);
            sources.push(Source::Backfill(column.declared().default_value()));
            backfilled.push(column.name.clone());
        }
    }

    if !backfilled.is_empty() {
        log::warn!(target: LOG_TARGET, "Table '{}': backfilling {} with defaults", table.name, backfilled.join(", "));
    }

    let names: Vec<_> = columns.iter().map(|c| quote_ident(&c.name)).collect();
    let placeholders: Vec<_> = (1..=columns.len()).map(|i| format!("?{i}")).collect();
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({})",
        qualified_name(table),
        names.join(", "),
        placeholders.join(", ")
    );
    let mut stmt = conn.prepare(&sql)?;

    for row in 0..raw.rows.len() {
        let values = row_values(&raw, row, &columns, &sources).map_err(|e| app_err!("table '{}', line {}: {e}", table.name, row + 2))?;
        let _ = stmt
            .execute(params_from_iter(values.iter()))
            .map_err(|e| app_err!("table '{}', line {}: {e}", table.name, row + 2))?;
    }

    log::info!(target: LOG_TARGET, "Seeded {} rows into '{}'", raw.rows.len(), table.name);
    Ok(SeedOutcome::Seeded {
        rows: raw.rows.len(),
        backfilled,
    })
}

fn row_values(raw: &RawTable, row: usize, columns: &[&ColumnInfo], sources: &[Source<'_>]) -> Result<Vec<SqlValue>> {
    columns
        .iter()
        .zip(sources)
        .map(|(column, source)| match source {
            Source::Cell(i, Some(column_meta)) => value_to_sql(&parse_cell(raw.cell(row, *i), column_meta)?),
            Source::Cell(i, None) => cell_to_sql(raw.cell(row, *i), column.declared(), column.nullable),
            Source::Backfill(value) => Ok(value.clone()),
        })
        .collect()
}
