use super::{LOG_TARGET, quote_ident};
use crate::Result;
use crate::meta::TableMeta;
use core::fmt::Write;
use rusqlite::Connection;

/// `CREATE TABLE` statement for a master table.
#[must_use]
pub fn create_table_sql(meta: &TableMeta) -> String {
    let mut sql = format!("CREATE TABLE IF NOT EXISTS {} (", quote_ident(&meta.name));

    let columns: Vec<_> = meta.tabular_columns().collect();
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            sql.push_str(", ");
        }
        let _ = write!(sql, "{} {}", quote_ident(&column.name), column.logical_type.sql_type());
        if !column.nullable {
            sql.push_str(" NOT NULL");
        }
    }

    let key = meta.primary_key();
    if !key.is_empty() {
        let names: Vec<_> = key.iter().map(|&pos| quote_ident(&columns[pos].name)).collect();
        let _ = write!(sql, ", PRIMARY KEY ({})", names.join(", "));
    }

    sql.push(')');
    sql
}

/// `CREATE INDEX` statements for a master table's secondary indexes.
#[must_use]
pub fn create_index_sql(meta: &TableMeta) -> Vec<String> {
    let columns: Vec<_> = meta.tabular_columns().collect();
    meta.secondary_indexes()
        .into_iter()
        .map(|index| {
            let names: Vec<_> = index.columns.iter().map(|&pos| quote_ident(&columns[pos].name)).collect();
            format!(
                "CREATE {}INDEX IF NOT EXISTS {} ON {} ({})",
                if index.non_unique { "" } else { "UNIQUE " },
                quote_ident(&format!("{}_ix{}", meta.name, index.index)),
                quote_ident(&meta.name),
                names.join(", ")
            )
        })
        .collect()
}

/// Creates every master table and its indexes in one transaction.
pub fn init_schema(conn: &mut Connection, tables: &[TableMeta]) -> Result<()> {
    let tx = conn.transaction()?;
    for meta in tables {
        log::debug!(target: LOG_TARGET, "Creating table '{}'", meta.name);
        let _ = tx.execute(&create_table_sql(meta), [])?;
        for sql in create_index_sql(meta) {
            let _ = tx.execute(&sql, [])?;
        }
    }
    tx.commit()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_tables::{item_table, quest_reward_table};

    #[test]
    fn test_table_sql() {
        let meta = TableMeta::from_definition(&quest_reward_table(), "ns", 2).unwrap().unwrap();
        insta::assert_snapshot!(
            create_table_sql(&meta),
            @r#"CREATE TABLE IF NOT EXISTS "QuestReward" ("QuestId" INTEGER NOT NULL, "Slot" INTEGER NOT NULL, "ItemId" INTEGER NOT NULL, "Amount" INTEGER, "Hidden" BOOLEAN NOT NULL, PRIMARY KEY ("QuestId", "Slot"))"#
        );
    }

    #[test]
    fn test_index_sql() {
        let meta = TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap();
        assert_eq!(
            create_index_sql(&meta),
            [
                r#"CREATE UNIQUE INDEX IF NOT EXISTS "Item_ix0" ON "Item" ("Name")"#,
                r#"CREATE INDEX IF NOT EXISTS "Item_ix1" ON "Item" ("Category", "Rarity")"#,
            ]
        );
    }

    #[test]
    fn test_init_is_repeatable() {
        let mut conn = Connection::open_in_memory().unwrap();
        let tables = [
            TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap(),
            TableMeta::from_definition(&quest_reward_table(), "ns", 2).unwrap().unwrap(),
        ];
        init_schema(&mut conn, &tables).unwrap();
        init_schema(&mut conn, &tables).unwrap();

        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table'", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 2);
    }
}
