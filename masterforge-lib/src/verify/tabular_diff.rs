use super::LOG_TARGET;
use crate::Result;
use crate::meta::TableMeta;
use crate::tabular::{RawTable, TABULAR_EXTENSION, canonicalize, read_raw};
use camino::{Utf8Path, Utf8PathBuf};
use ohno::{IntoAppError, bail};
use std::collections::BTreeMap;

/// Cell differences listed per file; the total is always counted in full.
pub const MAX_DISPLAYED_DIFFERENCES: usize = 10;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellDiff {
    /// 1-based data row, not counting the header.
    pub row: usize,
    pub column: String,
    pub source: String,
    pub target: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileDiff {
    pub name: String,
    pub source_only_columns: Vec<String>,
    pub target_only_columns: Vec<String>,
    pub source_rows: usize,
    pub target_rows: usize,
    pub cell_differences: usize,
    pub cells: Vec<CellDiff>,
}

impl FileDiff {
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.source_only_columns.is_empty() && self.target_only_columns.is_empty() && self.source_rows == self.target_rows && self.cell_differences == 0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TabularDiff {
    pub source_only_files: Vec<String>,
    pub target_only_files: Vec<String>,

    /// Files present on both sides, including clean ones.
    pub files: Vec<FileDiff>,
}

impl TabularDiff {
    #[must_use]
    pub fn has_differences(&self) -> bool {
        !self.source_only_files.is_empty() || !self.target_only_files.is_empty() || self.files.iter().any(|f| !f.is_clean())
    }
}

/// Compares two sets of tables keyed by name.
#[must_use]
pub fn diff_tables(source: &BTreeMap<String, RawTable>, target: &BTreeMap<String, RawTable>) -> TabularDiff {
    let mut diff = TabularDiff {
        source_only_files: source.keys().filter(|k| !target.contains_key(*k)).cloned().collect(),
        target_only_files: target.keys().filter(|k| !source.contains_key(*k)).cloned().collect(),
        files: Vec::new(),
    };

    for (name, s) in source {
        if let Some(t) = target.get(name) {
            diff.files.push(diff_table(name, s, t));
        }
    }

    diff
}

/// Compares by typed value for every table `catalog` describes, so `1` and `true`
/// or `42` and an enum's name count as equal. Other tables compare as text.
#[must_use]
pub fn diff_typed(source: &BTreeMap<String, RawTable>, target: &BTreeMap<String, RawTable>, catalog: &[TableMeta]) -> TabularDiff {
    let typed = |tables: &BTreeMap<String, RawTable>| -> BTreeMap<String, RawTable> {
        tables
            .iter()
            .map(|(name, table)| {
                let table = catalog.iter().find(|m| m.name == *name).map_or_else(|| table.clone(), |m| canonicalize(table, m));
                (name.clone(), table)
            })
            .collect()
    };

    diff_tables(&typed(source), &typed(target))
}

/// Compares one table's cells over the common columns and the overlapping rows.
#[must_use]
pub fn diff_table(name: &str, source: &RawTable, target: &RawTable) -> FileDiff {
    let mut diff = FileDiff {
        name: name.to_string(),
        source_only_columns: source.headers.iter().filter(|h| target.column_index(h).is_none()).cloned().collect(),
        target_only_columns: target.headers.iter().filter(|h| source.column_index(h).is_none()).cloned().collect(),
        source_rows: source.rows.len(),
        target_rows: target.rows.len(),
        ..FileDiff::default()
    };

    let common: Vec<(&String, usize, usize)> = source
        .headers
        .iter()
        .enumerate()
        .filter_map(|(si, h)| target.column_index(h).map(|ti| (h, si, ti)))
        .collect();

    for row in 0..diff.source_rows.min(diff.target_rows) {
        for &(column, si, ti) in &common {
            let s = source.cell(row, si);
            let t = target.cell(row, ti);
            if s != t {
                diff.cell_differences += 1;
                if diff.cells.len() < MAX_DISPLAYED_DIFFERENCES {
                    diff.cells.push(CellDiff {
                        row: row + 1,
                        column: column.clone(),
                        source: s.to_string(),
                        target: t.to_string(),
                    });
                }
            }
        }
    }

    diff
}

/// Loads every tabular file directly inside `dir`, keyed by file stem.
pub fn load_dir(dir: &Utf8Path) -> Result<BTreeMap<String, RawTable>> {
    if !dir.is_dir() {
        bail!("tabular directory '{dir}' does not exist");
    }

    let mut tables = BTreeMap::new();
    for entry in dir.read_dir_utf8().into_app_err_with(|| format!("reading directory '{dir}'"))? {
        let entry = entry?;
        let path: Utf8PathBuf = entry.path().to_path_buf();
        if path.extension() != Some(TABULAR_EXTENSION) || !path.is_file() {
            continue;
        }
        if let Some(stem) = path.file_stem() {
            log::debug!(target: LOG_TARGET, "Loading '{path}'");
            let _ = tables.insert(stem.to_string(), read_raw(&path)?);
        }
    }

    Ok(tables)
}

pub fn diff_dirs(source: &Utf8Path, target: &Utf8Path) -> Result<TabularDiff> {
    Ok(diff_tables(&load_dir(source)?, &load_dir(target)?))
}
