use super::{LOG_TARGET, SnapshotBuilder};
use crate::Result;
use crate::meta::{TableMeta, Value};
use crate::schema::TableDefinition;
use crate::tabular::{read_rows, tabular_path};
use camino::Utf8Path;
use sha2::{Digest, Sha256};

/// What happened to one table during a build or validation pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableOutcome {
    Included { rows: usize },

    /// Not fatal: the table is left out and the rest of the build proceeds.
    Skipped { reason: String },

    /// The table's data is broken. The build continues but the run fails.
    Failed { error: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableReport {
    pub table: String,
    pub outcome: TableOutcome,
}

#[derive(Debug, Clone)]
pub struct TargetBuild {
    pub bytes: Vec<u8>,
    pub hash: String,
    pub reports: Vec<TableReport>,
}

/// Lowercase hex SHA-256 of a blob.
#[must_use]
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Reads and coerces one table's tabular file.
///
/// `Ok(None)` means the file does not exist.
pub fn load_table(meta: &TableMeta, tabular_dir: &Utf8Path) -> Result<Option<Vec<Vec<Value>>>> {
    let path = tabular_path(tabular_dir, &meta.name);
    if !path.is_file() {
        return Ok(None);
    }
    read_rows(&path, meta).map(Some)
}

/// Builds the snapshot for one target.
///
/// Tables are processed in `defs` order, which is the schema order. A missing
/// tabular file skips its table with a warning; a malformed one marks the table
/// as failed. Both leave the other tables untouched.
pub fn build_target(defs: &[TableDefinition], namespace: &str, tabular_dir: &Utf8Path, target_label: &str, target_bit: u32) -> Result<TargetBuild> {
    let mut builder = SnapshotBuilder::new();
    let mut reports = Vec::new();

    for def in defs {
        let Some(meta) = TableMeta::from_definition(def, namespace, target_bit)? else {
            log::debug!(target: LOG_TARGET, "Table '{}' is not deployed to '{target_label}'", def.table_name);
            continue;
        };

        let outcome = match load_table(&meta, tabular_dir) {
            Ok(None) => {
                log::warn!(target: LOG_TARGET, "No tabular file for table '{}', skipping it", meta.name);
                TableOutcome::Skipped {
                    reason: format!("'{}' not found", tabular_path(tabular_dir, &meta.name)),
                }
            }
            Ok(Some(rows)) => match builder.append_rows(&meta, rows) {
                Ok(rows) => TableOutcome::Included { rows },
                Err(e) => TableOutcome::Failed { error: e.to_string() },
            },
            Err(e) => TableOutcome::Failed { error: e.to_string() },
        };

        if let TableOutcome::Failed { error } = &outcome {
            log::error!(target: LOG_TARGET, "Table '{}' failed: {error}", meta.name);
        }

        reports.push(TableReport {
            table: meta.name.clone(),
            outcome,
        });
    }

    let bytes = builder.finish()?;
    let hash = content_hash(&bytes);
    log::info!(target: LOG_TARGET, "Built '{target_label}': {} bytes, sha256 {hash}", bytes.len());

    Ok(TargetBuild {
        bytes,
        hash,
        reports,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::Snapshot;
    use crate::schema::test_tables::{item_table, quest_reward_table};
    use camino::Utf8PathBuf;
    use std::fs;

    fn scratch() -> (tempfile::TempDir, Utf8PathBuf) {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        (tmp, dir)
    }

    const ITEMS: &str = "Id\tName\tCategory\tRarity\tWeight\tDropWeight\n2\tShield\t2\tCOMMON\t\t0.5\n1\tSword\t1\tLEGENDARY\t3.5\t0.25\n";

    #[test]
    fn test_missing_file_is_skipped() {
        let (_tmp, dir) = scratch();
        fs::write(dir.join("Item.tsv"), ITEMS).unwrap();

        let build = build_target(&[item_table(), quest_reward_table()], "ns", &dir, "server", 2).unwrap();
        assert_eq!(build.reports[0].outcome, TableOutcome::Included { rows: 2 });
        assert!(matches!(build.reports[1].outcome, TableOutcome::Skipped { .. }));
        assert!(!build.reports.iter().any(|r| matches!(r.outcome, TableOutcome::Failed { .. })));

        let snapshot = Snapshot::from_bytes(&build.bytes).unwrap();
        assert_eq!(snapshot.tables.len(), 1);
        assert_eq!(snapshot.tables[0].rows[0][1], Value::String("Sword".into()));
    }

    #[test]
    fn test_excluded_table_is_not_reported() {
        let (_tmp, dir) = scratch();
        fs::write(dir.join("Item.tsv"), ITEMS).unwrap();

        let build = build_target(&[item_table(), quest_reward_table()], "ns", &dir, "client", 1).unwrap();
        assert_eq!(build.reports.len(), 1);

        let snapshot = Snapshot::from_bytes(&build.bytes).unwrap();
        assert!(snapshot.tables[0].meta.find_column("DropWeight").is_none());
    }

    #[test]
    fn test_malformed_table_fails_alone() {
        let (_tmp, dir) = scratch();
        fs::write(dir.join("Item.tsv"), ITEMS).unwrap();
        fs::write(dir.join("QuestReward.tsv"), "QuestId\tSlot\n1\tminus one\n").unwrap();

        let build = build_target(&[item_table(), quest_reward_table()], "ns", &dir, "server", 2).unwrap();
        assert_eq!(build.reports[0].outcome, TableOutcome::Included { rows: 2 });
        assert!(matches!(&build.reports[1].outcome, TableOutcome::Failed { error } if error.contains("minus one")));
        assert_eq!(Snapshot::from_bytes(&build.bytes).unwrap().tables.len(), 1);
    }

    #[test]
    fn test_hash_is_reproducible() {
        let (_tmp, dir) = scratch();
        fs::write(dir.join("Item.tsv"), ITEMS).unwrap();

        let a = build_target(&[item_table()], "ns", &dir, "server", 2).unwrap();
        let b = build_target(&[item_table()], "ns", &dir, "server", 2).unwrap();
        assert_eq!(a.hash, b.hash);
        assert_eq!(a.hash.len(), 64);
        assert_eq!(a.hash, content_hash(&a.bytes));
    }
}
