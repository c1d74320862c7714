use super::{LOG_TARGET, Snapshot, SnapshotTable};
use crate::Result;
use crate::meta::{TableMeta, Value};
use core::cmp::Ordering;
use ohno::bail;

/// Collects typed rows table by table and serializes them as one snapshot.
///
/// Tables keep the order they were appended in. Rows of each table are sorted
/// by primary key so the output does not depend on the order of the source file.
#[derive(Debug, Default)]
pub struct SnapshotBuilder {
    tables: Vec<SnapshotTable>,
}

fn compare_keys(a: &[Value], b: &[Value], key: &[usize]) -> Ordering {
    key.iter()
        .map(|&pos| a[pos].total_cmp(&b[pos]))
        .find(|o| o.is_ne())
        .unwrap_or(Ordering::Equal)
}

fn render_key(row: &[Value], key: &[usize]) -> String {
    key.iter()
        .map(|&pos| crate::tabular::format_value(&row[pos]))
        .collect::<Vec<_>>()
        .join(", ")
}

impl SnapshotBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one table. Fails without modifying the builder when a cell does not fit its
    /// column, two rows share a primary key or the table was already added.
    pub fn append_rows(&mut self, meta: &TableMeta, mut rows: Vec<Vec<Value>>) -> Result<usize> {
        if self.tables.iter().any(|t| t.meta.name == meta.name) {
            bail!("table '{}' was already added to this snapshot", meta.name);
        }

        let columns: Vec<_> = meta.tabular_columns().collect();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                bail!("table '{}', row {}: expected {} cells, found {}", meta.name, i + 1, columns.len(), row.len());
            }
            for (value, column) in row.iter().zip(&columns) {
                if !value.matches(&column.logical_type, column.nullable) {
                    bail!("table '{}', row {}, column '{}': {value:?} is not a {} value", meta.name, i + 1, column.name, column.logical_type);
                }
            }
        }

        let key = meta.primary_key();
        if !key.is_empty() {
            rows.sort_by(|a, b| compare_keys(a, b, &key));
            if let Some(pair) = rows.windows(2).find(|w| compare_keys(&w[0], &w[1], &key).is_eq()) {
                bail!("table '{}': duplicate primary key ({})", meta.name, render_key(&pair[0], &key));
            }
        }

        let count = rows.len();
        log::debug!(target: LOG_TARGET, "Appending {count} rows to table '{}'", meta.name);
        self.tables.push(SnapshotTable { meta: meta.clone(), rows });
        Ok(count)
    }

    #[must_use]
    pub fn into_snapshot(self) -> Snapshot {
        Snapshot { tables: self.tables }
    }

    pub fn finish(self) -> Result<Vec<u8>> {
        self.into_snapshot().to_bytes()
    }
}
