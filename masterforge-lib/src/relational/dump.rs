use super::{LOG_TARGET, TableInfo, list_tables, master_meta, qualified_name, quote_ident, sql_to_cell, sql_to_value, tabular_key};
use crate::Result;
use crate::meta::TableMeta;
use crate::tabular::{RawTable, format_cell, tabular_path, write_raw};
use camino::Utf8Path;
use ohno::app_err;
use rusqlite::Connection;
use std::collections::BTreeMap;

/// Contents of a relational store as tabular matrices.
#[derive(Debug, Clone, Default)]
pub struct Dump {
    /// Keyed by table name; tables outside `main` are keyed `schema.table`.
    pub tables: BTreeMap<String, RawTable>,

    /// Tables left out, with the reason.
    pub skipped: Vec<(String, String)>,
}

/// Reads every table of every listed schema.
///
/// Columns come out in ordinal order. Cells of columns known to `catalog` use the
/// canonical tabular spelling (enum names included); everything else is formatted
/// from its declared type. Only `main` tables are matched against `catalog`. A table that fails to read or has no rows is skipped.
pub fn dump(conn: &Connection, schemas: &[String], catalog: &[TableMeta]) -> Result<Dump> {
    let mut result = Dump::default();

    for schema in schemas {
        let tables = list_tables(conn, schema).map_err(|e| app_err!("could not list tables of schema '{schema}': {e}"))?;
        for table in &tables {
            let key = tabular_key(table);
            match dump_table(conn, table, master_meta(catalog, table)) {
                Ok(raw) if raw.rows.is_empty() => {
                    log::warn!(target: LOG_TARGET, "Table '{key}' has no rows, skipping it");
                    result.skipped.push((key, "no rows".to_string()));
                }
                Ok(raw) => {
                    log::debug!(target: LOG_TARGET, "Dumped {} rows from '{key}'", raw.rows.len());
                    let _ = result.tables.insert(key, raw);
                }
                Err(e) => {
                    log::warn!(target: LOG_TARGET, "Could not read table '{key}', skipping it: {e}");
                    result.skipped.push((key, e.to_string()));
                }
            }
        }
    }

    Ok(result)
}

fn dump_table(conn: &Connection, table: &TableInfo, meta: Option<&TableMeta>) -> Result<RawTable> {
    let names: Vec<_> = table.columns.iter().map(|c| quote_ident(&c.name)).collect();
    let sql = format!("SELECT {} FROM {}", names.join(", "), qualified_name(table));

    let mut formatters = Vec::with_capacity(table.columns.len());
    for column in &table.columns {
        formatters.push((column.declared(), meta.and_then(|m| m.find_column(&column.name)).map(|(_, c)| c)));
    }

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(formatters.len());
        for (i, (declared, column_meta)) in formatters.iter().enumerate() {
            let cell = row.get_ref(i)?;
            let text = match column_meta {
                Some(c) => format_cell(&sql_to_value(cell, c)?, c),
                None => sql_to_cell(cell, *declared)?,
            };
            cells.push(text);
        }
        out.push(cells);
    }

    Ok(RawTable {
        headers: table.columns.iter().map(|c| c.name.clone()).collect(),
        rows: out,
    })
}

/// Writes one tabular file per dumped table.
pub fn write_dump(dump: &Dump, dir: &Utf8Path) -> Result<()> {
    for (name, table) in &dump.tables {
        write_raw(&tabular_path(dir, name), table)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relational::{init_schema, seed};
    use crate::schema::test_tables::{item_table, quest_reward_table};
    use crate::tabular::{canonicalize, read_raw};
    use crate::verify::{diff_typed, load_dir};
    use camino::Utf8PathBuf;
    use std::fs;

    #[test]
    fn test_dump_formats_cells() {
        let catalog = vec![TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap()];
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn, &catalog).unwrap();
        conn.execute_batch(
            "CREATE TABLE Flags (Id INTEGER PRIMARY KEY, On_ BOOLEAN, Ratio REAL, Raw BLOB);
             INSERT INTO Flags VALUES (1, 1, 0.5, x'00ff');
             INSERT INTO Flags VALUES (2, 0, NULL, NULL);
             INSERT INTO Item VALUES (1, 'Sword', 1, 42, NULL, 0.25);",
        )
        .unwrap();

        let dump = dump(&conn, &["main".to_string()], &catalog).unwrap();
        let flags = &dump.tables["Flags"];
        assert_eq!(flags.headers, ["Id", "On_", "Ratio", "Raw"]);
        assert_eq!(flags.rows, [["1", "true", "0.5", "00ff"], ["2", "false", "", ""]]);

        let item = &dump.tables["Item"];
        assert_eq!(item.rows[0], ["1", "Sword", "1", "LEGENDARY", "", "0.25"]);
    }

    #[test]
    fn test_empty_and_missing_tables_are_skipped() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE Empty (Id INTEGER);").unwrap();

        let dump = dump(&conn, &["main".to_string()], &[]).unwrap();
        assert!(dump.tables.is_empty());
        assert_eq!(dump.skipped[0].0, "Empty");
    }

    #[test]
    fn test_seed_then_dump_reproduces_cells() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        fs::write(
            dir.join("Item.tsv"),
            "Id\tName\tCategory\tRarity\tWeight\tDropWeight\n1\tSword\t1\tLEGENDARY\t0.1\t0.3\n002\tShield\t2\t42\t\t1e-7\n",
        )
        .unwrap();
        fs::write(
            dir.join("QuestReward.tsv"),
            "QuestId\tSlot\tItemId\tAmount\tHidden\n1\t0\t1\t\t1\n1\t1\t2\t5\tFALSE\n",
        )
        .unwrap();

        let catalog = vec![
            TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap(),
            TableMeta::from_definition(&quest_reward_table(), "ns", 2).unwrap().unwrap(),
        ];
        let mut conn = Connection::open_in_memory().unwrap();
        init_schema(&mut conn, &catalog).unwrap();
        let _ = seed(&mut conn, &dir, &["main".to_string()], &catalog, &[]).unwrap();

        let dumped = dump(&conn, &["main".to_string()], &catalog).unwrap();
        let source = load_dir(&dir).unwrap();
        assert!(!diff_typed(&source, &dumped.tables, &catalog).has_differences());

        for meta in &catalog {
            let written = &source[&meta.name];
            let read = &dumped.tables[&meta.name];
            assert_eq!(read.headers, written.headers);
            assert_eq!(read.rows, canonicalize(written, meta).rows);
        }
        assert_eq!(dumped.tables["Item"].rows[1], ["2", "Shield", "2", "LEGENDARY", "", "0.0000001"]);
        assert_eq!(dumped.tables["QuestReward"].rows[1], ["1", "1", "2", "5", "false"]);

        let out = dir.join("out");
        write_dump(&dumped, &out).unwrap();
        assert_eq!(read_raw(&out.join("Item.tsv")).unwrap(), dumped.tables["Item"]);
    }
}
