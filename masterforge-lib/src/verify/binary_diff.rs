use super::LOG_TARGET;
use crate::binary::{Snapshot, content_hash};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRowDiff {
    pub table: String,
    pub old_rows: Option<usize>,
    pub new_rows: Option<usize>,
}

/// Comparison of two binary artifacts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryDiff {
    pub old_hash: String,
    pub new_hash: String,
    pub old_size: usize,
    pub new_size: usize,

    /// Tables whose row count changed. Empty when either blob is not a readable snapshot.
    pub tables: Vec<TableRowDiff>,
}

impl BinaryDiff {
    #[must_use]
    pub fn identical(&self) -> bool {
        self.old_hash == self.new_hash
    }

    /// Signed size change from old to new.
    #[must_use]
    pub fn delta(&self) -> i128 {
        i128::try_from(self.new_size).unwrap_or(i128::MAX) - i128::try_from(self.old_size).unwrap_or(i128::MAX)
    }
}

fn row_counts(bytes: &[u8]) -> Option<BTreeMap<String, usize>> {
    match Snapshot::from_bytes(bytes) {
        Ok(snapshot) => Some(snapshot.tables.into_iter().map(|t| (t.meta.name, t.rows.len())).collect()),
        Err(e) => {
            log::debug!(target: LOG_TARGET, "Blob is not a readable snapshot: {e}");
            None
        }
    }
}

#[must_use]
pub fn diff_binaries(old: &[u8], new: &[u8]) -> BinaryDiff {
    let mut diff = BinaryDiff {
        old_hash: content_hash(old),
        new_hash: content_hash(new),
        old_size: old.len(),
        new_size: new.len(),
        tables: Vec::new(),
    };

    if diff.identical() {
        return diff;
    }

    if let (Some(old_counts), Some(new_counts)) = (row_counts(old), row_counts(new)) {
        let mut names: Vec<&String> = old_counts.keys().chain(new_counts.keys()).collect();
        names.sort();
        names.dedup();

        diff.tables = names
            .into_iter()
            .map(|name| TableRowDiff {
                table: name.clone(),
                old_rows: old_counts.get(name).copied(),
                new_rows: new_counts.get(name).copied(),
            })
            .filter(|t| t.old_rows != t.new_rows)
            .collect();
    }

    diff
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::SnapshotBuilder;
    use crate::meta::{ColumnMeta, TableMeta, Value};
    use crate::schema::LogicalType;

    fn blob(tables: &[(&str, usize)]) -> Vec<u8> {
        let mut b = SnapshotBuilder::new();
        for (name, rows) in tables {
            let meta = TableMeta::new(*name, "ns").column(ColumnMeta::new("Id", "id", LogicalType::Int64).primary_key(0));
            let rows = (0..*rows).map(|i| vec![Value::Int64(i64::try_from(i).unwrap())]).collect();
            let _ = b.append_rows(&meta, rows).unwrap();
        }
        b.finish().unwrap()
    }

    #[test]
    fn test_identical() {
        let a = blob(&[("A", 2)]);
        let diff = diff_binaries(&a, &a.clone());
        assert!(diff.identical());
        assert_eq!(diff.delta(), 0);
        assert!(diff.tables.is_empty());
    }

    #[test]
    fn test_row_count_changes() {
        let old = blob(&[("A", 2), ("B", 1)]);
        let new = blob(&[("A", 3), ("C", 1), ("B", 1)]);
        let diff = diff_binaries(&old, &new);

        assert!(!diff.identical());
        assert!(diff.delta() > 0);
        assert_eq!(
            diff.tables,
            [
                TableRowDiff { table: "A".into(), old_rows: Some(2), new_rows: Some(3) },
                TableRowDiff { table: "C".into(), old_rows: None, new_rows: Some(1) },
            ]
        );
    }

    #[test]
    fn test_opaque_blobs() {
        let diff = diff_binaries(b"one", b"three");
        assert!(!diff.identical());
        assert_eq!(diff.delta(), 2);
        assert!(diff.tables.is_empty());
    }
}
