use super::{DeclaredType, quote_ident};
use crate::Result;
use ohno::bail;
use rusqlite::Connection;
use std::collections::BTreeSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub has_default: bool,

    /// The column aliases the rowid and is assigned by the store when omitted.
    pub identity: bool,
}

impl ColumnInfo {
    #[must_use]
    pub fn declared(&self) -> DeclaredType {
        DeclaredType::parse(&self.declared_type)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnInfo>,

    /// Tables this one references through foreign keys, itself excluded.
    pub parents: BTreeSet<String>,
}

/// Lists every user table of `schema` with its columns in ordinal order.
pub fn list_tables(conn: &Connection, schema: &str) -> Result<Vec<TableInfo>> {
    let sql = format!(
        "SELECT name FROM {}.sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        quote_ident(schema)
    );
    let mut stmt = conn.prepare(&sql)?;
    let names = stmt.query_map([], |row| row.get::<_, String>(0))?.collect::<rusqlite::Result<Vec<_>>>()?;

    names.into_iter().map(|name| table_info(conn, schema, name)).collect()
}

fn table_info(conn: &Connection, schema: &str, name: String) -> Result<TableInfo> {
    let mut stmt = conn.prepare("SELECT name, type, \"notnull\", dflt_value IS NOT NULL, pk FROM pragma_table_info(?1, ?2) ORDER BY cid")?;
    let rows = stmt
        .query_map([name.as_str(), schema], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, bool>(2)?,
                row.get::<_, bool>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let key_columns = rows.iter().filter(|r| r.4 > 0).count();
    let columns = rows
        .into_iter()
        .map(|(column, declared_type, not_null, has_default, pk)| ColumnInfo {
            identity: pk > 0 && key_columns == 1 && declared_type.eq_ignore_ascii_case("INTEGER"),
            nullable: !not_null && pk == 0,
            name: column,
            declared_type,
            has_default,
        })
        .collect();

    let mut stmt = conn.prepare("SELECT \"table\" FROM pragma_foreign_key_list(?1, ?2)")?;
    let parents = stmt
        .query_map([name.as_str(), schema], |row| row.get::<_, String>(0))?
        .collect::<rusqlite::Result<BTreeSet<_>>>()?
        .into_iter()
        .filter(|parent| *parent != name)
        .collect();

    Ok(TableInfo {
        schema: schema.to_string(),
        name,
        columns,
        parents,
    })
}

/// Orders tables so that every table comes after the tables it references.
///
/// Among tables that are free to go, master tables go before user tables and
/// then by name. A foreign-key cycle is an error.
pub fn insertion_order<'a>(tables: &'a [TableInfo], user_tables: &[String]) -> Result<Vec<&'a TableInfo>> {
    let is_user = |t: &TableInfo| user_tables.iter().any(|u| *u == t.name);
    let known: BTreeSet<&str> = tables.iter().map(|t| t.name.as_str()).collect();

    let mut placed: BTreeSet<&str> = BTreeSet::new();
    let mut order = Vec::with_capacity(tables.len());

    while order.len() < tables.len() {
        let next = tables
            .iter()
            .filter(|t| !placed.contains(t.name.as_str()))
            .filter(|t| t.parents.iter().all(|p| placed.contains(p.as_str()) || !known.contains(p.as_str())))
            .min_by_key(|t| (is_user(t), t.name.as_str()));

        let Some(next) = next else {
            let stuck: Vec<_> = tables.iter().filter(|t| !placed.contains(t.name.as_str())).map(|t| t.name.as_str()).collect();
            bail!("foreign keys form a cycle between tables {}", stuck.join(", "));
        };

        let _ = placed.insert(next.name.as_str());
        order.push(next);
    }

    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE Item (Id INTEGER NOT NULL, Name TEXT NOT NULL, PRIMARY KEY (Id));
             CREATE TABLE Player (Id INTEGER PRIMARY KEY, Nick TEXT, Level INTEGER NOT NULL DEFAULT 1);
             CREATE TABLE Inventory (PlayerId INTEGER NOT NULL REFERENCES Player(Id), ItemId INTEGER NOT NULL REFERENCES Item(Id), Count INTEGER NOT NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn test_columns() {
        let tables = list_tables(&conn(), "main").unwrap();
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Inventory", "Item", "Player"]);

        let player = &tables[2];
        assert!(player.columns[0].identity);
        assert!(player.columns[1].nullable);
        assert!(player.columns[2].has_default);
        assert!(!player.columns[2].nullable);

        let inventory = &tables[0];
        assert!(inventory.columns.iter().all(|c| !c.identity));
        assert_eq!(inventory.parents.iter().collect::<Vec<_>>(), ["Item", "Player"]);
    }

    #[test]
    fn test_parents_come_first() {
        let tables = list_tables(&conn(), "main").unwrap();
        let order: Vec<_> = insertion_order(&tables, &["Player".to_string(), "Inventory".to_string()])
            .unwrap()
            .into_iter()
            .map(|t| t.name.as_str())
            .collect();
        assert_eq!(order, ["Item", "Player", "Inventory"]);
    }

    #[test]
    fn test_cycle_is_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE A (Id INTEGER PRIMARY KEY, B INTEGER REFERENCES B(Id));
             CREATE TABLE B (Id INTEGER PRIMARY KEY, A INTEGER REFERENCES A(Id));",
        )
        .unwrap();

        let tables = list_tables(&conn, "main").unwrap();
        assert!(insertion_order(&tables, &[]).is_err());
    }
}
