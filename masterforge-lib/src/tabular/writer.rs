use super::{RawTable, format_cell};
use crate::Result;
use crate::meta::{TableMeta, Value};
use camino::Utf8Path;
use csv::{QuoteStyle, Terminator, Writer, WriterBuilder};
use ohno::{IntoAppError, bail};
use std::fs;
use std::io::Write;

fn tsv_writer<W: Write>(output: W) -> Writer<W> {
    WriterBuilder::new()
        .delimiter(b'\t')
        .quote_style(QuoteStyle::Never)
        .terminator(Terminator::Any(b'\n'))
        .flexible(true)
        .from_writer(output)
}

fn check_cell(cell: &str) -> Result<()> {
    if cell.contains(['\t', '\n', '\r']) {
        bail!("cell {cell:?} contains a tab or line break and cannot be written as a tabular cell");
    }
    Ok(())
}

pub fn write_raw_to(output: impl Write, table: &RawTable) -> Result<()> {
    let mut writer = tsv_writer(output);

    for h in &table.headers {
        check_cell(h)?;
    }
    writer.write_record(&table.headers)?;

    for row in &table.rows {
        for cell in row {
            check_cell(cell)?;
        }
        writer.write_record(row)?;
    }

    writer.flush()?;
    Ok(())
}

/// Writes a raw matrix, creating parent directories as needed.
pub fn write_raw(path: &Utf8Path, table: &RawTable) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_str().is_empty()
    {
        fs::create_dir_all(parent).into_app_err_with(|| format!("could not create directory '{parent}'"))?;
    }

    let file = fs::File::create(path).into_app_err_with(|| format!("creating tabular file '{path}'"))?;
    write_raw_to(std::io::BufWriter::new(file), table).map_err(|e| ohno::app_err!("writing '{path}': {e}"))
}

/// Formats typed rows with the canonical cell spelling.
#[must_use]
pub fn rows_to_raw(meta: &TableMeta, rows: &[Vec<Value>]) -> RawTable {
    let columns: Vec<_> = meta.tabular_columns().collect();
    RawTable {
        headers: columns.iter().map(|c| c.name.clone()).collect(),
        rows: rows
            .iter()
            .map(|row| row.iter().zip(&columns).map(|(v, c)| format_cell(v, c)).collect())
            .collect(),
    }
}

pub fn write_rows(path: &Utf8Path, meta: &TableMeta, rows: &[Vec<Value>]) -> Result<()> {
    write_raw(path, &rows_to_raw(meta, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::ColumnMeta;
    use crate::schema::LogicalType;
    use crate::tabular::reader::read_raw_from;

    #[test]
    fn test_written_text() {
        let meta = TableMeta::new("T", "ns")
            .column(ColumnMeta::new("Id", "id", LogicalType::UInt32))
            .column(ColumnMeta::new("On", "on", LogicalType::Bool))
            .column(ColumnMeta::new("Ratio", "ratio", LogicalType::Float64).nullable());

        let rows = vec![
            vec![Value::UInt32(1), Value::Bool(true), Value::Float64(0.25)],
            vec![Value::UInt32(2), Value::Bool(false), Value::Null],
        ];

        let mut out = Vec::new();
        write_raw_to(&mut out, &rows_to_raw(&meta, &rows)).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Id\tOn\tRatio\n1\ttrue\t0.25\n2\tfalse\t\n");
    }

    #[test]
    fn test_quotes_are_not_added() {
        let table = RawTable {
            headers: vec!["A".into()],
            rows: vec![vec!["say \"hi\"".into()]],
        };

        let mut out = Vec::new();
        write_raw_to(&mut out, &table).unwrap();
        let back = read_raw_from(out.as_slice()).unwrap();
        assert_eq!(back, table);
    }

    #[test]
    fn test_tab_in_cell_is_rejected() {
        let table = RawTable {
            headers: vec!["A".into()],
            rows: vec![vec!["a\tb".into()]],
        };
        assert!(write_raw_to(Vec::new(), &table).is_err());
    }
}
