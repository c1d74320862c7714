use super::{LOG_TARGET, parse_cell};
use crate::Result;
use crate::meta::{TableMeta, Value};
use camino::Utf8Path;
use csv::{Reader, ReaderBuilder, StringRecord};
use ohno::{IntoAppError, bail};
use std::fs::File;
use std::io::Read;

/// Uncoerced cell matrix of one tabular file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawTable {
    #[must_use]
    pub fn column_index(&self, header: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == header)
    }

    /// Cell at `(row, column)`; cells past the end of a short row read as empty.
    #[must_use]
    pub fn cell(&self, row: usize, column: usize) -> &str {
        self.rows.get(row).and_then(|r| r.get(column)).map_or("", String::as_str)
    }
}

fn tsv_reader<R: Read>(input: R) -> Reader<R> {
    ReaderBuilder::new().delimiter(b'\t').quoting(false).flexible(true).has_headers(true).from_reader(input)
}

fn open(path: &Utf8Path) -> Result<File> {
    File::open(path).into_app_err_with(|| format!("opening tabular file '{path}'"))
}

/// Reads a file without any coercion.
pub fn read_raw(path: &Utf8Path) -> Result<RawTable> {
    read_raw_from(open(path)?).map_err(|e| ohno::app_err!("reading '{path}': {e}"))
}

pub fn read_raw_from(input: impl Read) -> Result<RawTable> {
    let mut reader = tsv_reader(input);
    let headers = reader.headers()?.iter().map(str::to_string).collect();

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Reads a file into rows of typed values in `meta`'s tabular column order.
///
/// Headers match column names exactly. A column without a header takes its empty
/// value in every row; headers without a column are ignored. The first malformed
/// cell fails the whole table.
pub fn read_rows(path: &Utf8Path, meta: &TableMeta) -> Result<Vec<Vec<Value>>> {
    read_rows_from(open(path)?, meta)
}

pub fn read_rows_from(input: impl Read, meta: &TableMeta) -> Result<Vec<Vec<Value>>> {
    let mut reader = tsv_reader(input);
    let headers = reader.headers()?.clone();

    let mapping: Vec<Option<usize>> = meta
        .tabular_columns()
        .map(|c| {
            let pos = headers.iter().position(|h| h == c.name);
            if pos.is_none() {
                log::debug!(target: LOG_TARGET, "Table '{}' has no '{}' column, using defaults", meta.name, c.name);
            }
            pos
        })
        .collect();

    for h in &headers {
        if meta.find_column(h).is_none() {
            log::debug!(target: LOG_TARGET, "Table '{}' ignores unknown column '{h}'", meta.name);
        }
    }

    let mut rows = Vec::new();
    let mut record = StringRecord::new();
    while reader.read_record(&mut record)? {
        // header is line 1
        let line = rows.len() + 2;

        let mut row = Vec::with_capacity(mapping.len());
        for (column, source) in meta.tabular_columns().zip(&mapping) {
            let value = match source {
                Some(i) => {
                    let cell = record.get(*i).unwrap_or("");
                    match parse_cell(cell, column) {
                        Ok(v) => v,
                        Err(e) => bail!("table '{}', column '{}', line {line}: {e}", meta.name, column.name),
                    }
                }
                None => column.empty_value(),
            };
            row.push(value);
        }
        rows.push(row);
    }

    Ok(rows)
}
