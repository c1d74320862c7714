use super::{LOG_TARGET, normalize_source};
use crate::Result;
use crate::codegen::rust::generate_table;
use crate::codegen::snake_name;
use crate::schema::TableDefinition;
use camino::{Utf8Path, Utf8PathBuf};
use ohno::IntoAppError;
use std::fs;

/// One normalized line that differs between generated and maintained source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineDiff {
    /// 1-based position among normalized lines.
    pub line: usize,
    pub expected: Option<String>,
    pub actual: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoundTripOutcome {
    Match,
    Missing,
    Mismatch(Vec<LineDiff>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoundTripEntry {
    pub table: String,
    pub path: Utf8PathBuf,
    pub outcome: RoundTripOutcome,
}

/// Where the maintained source of a table lives for a target.
#[must_use]
pub fn generated_path(generated_dir: &Utf8Path, target_label: &str, table_name: &str) -> Utf8PathBuf {
    generated_dir.join(target_label).join(format!("{}.rs", snake_name(table_name)))
}

/// Compares two sources line by line after normalization.
#[must_use]
pub fn diff_lines(expected: &str, actual: &str) -> Vec<LineDiff> {
    let expected = normalize_source(expected);
    let actual = normalize_source(actual);

    (0..expected.len().max(actual.len()))
        .filter_map(|i| {
            let e = expected.get(i);
            let a = actual.get(i);
            (e != a).then(|| LineDiff {
                line: i + 1,
                expected: e.cloned(),
                actual: a.cloned(),
            })
        })
        .collect()
}

/// Regenerates every table deployed to the target and compares it with the source on disk.
pub fn verify_roundtrip(
    defs: &[TableDefinition],
    namespace: &str,
    generated_dir: &Utf8Path,
    target_label: &str,
    target_bit: u32,
) -> Result<Vec<RoundTripEntry>> {
    let mut entries = Vec::new();

    for def in defs {
        let Some(generated) = generate_table(def, namespace, target_label, target_bit)? else {
            continue;
        };

        let path = generated_path(generated_dir, target_label, &def.table_name);
        let outcome = if path.is_file() {
            let maintained = fs::read_to_string(&path).into_app_err_with(|| format!("reading '{path}'"))?;
            let diffs = diff_lines(&generated, &maintained);
            if diffs.is_empty() {
                RoundTripOutcome::Match
            } else {
                RoundTripOutcome::Mismatch(diffs)
            }
        } else {
            RoundTripOutcome::Missing
        };

        log::debug!(target: LOG_TARGET, "Round trip of '{}' for '{target_label}': {outcome:?}", def.table_name);
        entries.push(RoundTripEntry {
            table: def.table_name.clone(),
            path,
            outcome,
        });
    }

    Ok(entries)
}
