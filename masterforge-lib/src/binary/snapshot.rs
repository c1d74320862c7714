use super::{RowReader, RowWriter};
use crate::Result;
use crate::meta::{ColumnMeta, TableMeta, Value};
use crate::schema::{EnumType, LogicalType, SecondaryKeyInfo};
use ohno::{app_err, bail};

/// Identifies the snapshot layout; bump the low word whenever the layout changes.
const FORMAT_MAGIC: u64 = 0x4D46_534E_0000_0001;

/// Trailing zero bytes so vlen decoding never reads past the end of the blob.
const PADDING: usize = 16;

/// One table of a snapshot with its rows in primary-key order.
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotTable {
    pub meta: TableMeta,
    pub rows: Vec<Vec<Value>>,
}

/// Every table built for one deployment target.
///
/// ```text
/// FORMAT_MAGIC        u64 little endian
/// table count         vlen
/// per table:
///   name, namespace   string
///   deploy mask       vlen
///   columns           vlen count, then name, field, type tag, nullable,
///                     deploy mask (+ enum name and values for enum columns)
///   primary key       vlen count, then column ordinals
///   indexes           vlen count, then id, non_unique, ordinals
///   rows              vlen count, then cells in column order
/// padding             16 zero bytes
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Snapshot {
    pub tables: Vec<SnapshotTable>,
}

impl Snapshot {
    #[must_use]
    pub fn table(&self, name: &str) -> Option<&SnapshotTable> {
        self.tables.iter().find(|t| t.meta.name == name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut w = RowWriter::new();
        w.write_raw(&FORMAT_MAGIC.to_le_bytes());
        w.write_len(self.tables.len())?;

        for table in &self.tables {
            write_table(&mut w, table)?;
        }

        w.write_raw(&[0; PADDING]);
        Ok(w.into_inner())
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < 8 + PADDING {
            bail!("invalid snapshot: {} bytes is too short", data.len());
        }

        let mut r = RowReader::new(data);
        let mut magic = [0u8; 8];
        magic.copy_from_slice(r.read_raw(8)?);
        let magic = u64::from_le_bytes(magic);
        if magic != FORMAT_MAGIC {
            bail!("invalid snapshot format: expected magic 0x{FORMAT_MAGIC:016X}, found 0x{magic:016X}");
        }

        let count = r.read_len()?;
        let mut tables = Vec::with_capacity(count.min(1024));
        for _ in 0..count {
            tables.push(read_table(&mut r)?);
        }

        let trailing = &data[r.position()..];
        if trailing.len() != PADDING || trailing.iter().any(|&b| b != 0) {
            bail!("invalid snapshot: unexpected data after the last table at offset {}", r.position());
        }

        Ok(Self { tables })
    }
}

fn write_table(w: &mut RowWriter, table: &SnapshotTable) -> Result<()> {
    let meta = &table.meta;
    let columns: Vec<&ColumnMeta> = meta.tabular_columns().collect();

    w.write_str(&meta.name)?;
    w.write_str(&meta.namespace)?;
    w.write_u64(u64::from(meta.deploy_mask))?;

    w.write_len(columns.len())?;
    for column in &columns {
        w.write_str(&column.name)?;
        w.write_str(&column.field)?;
        w.write_byte(column.logical_type.tag());
        w.write_bool(column.nullable);
        w.write_u64(u64::from(column.deploy_mask))?;
        if let LogicalType::Enum(e) = &column.logical_type {
            w.write_str(&e.name)?;
            w.write_len(e.values.len())?;
            for v in &e.values {
                w.write_str(&v.name)?;
                w.write_i64(i64::from(v.number))?;
            }
        }
    }

    let primary_key = meta.primary_key();
    w.write_len(primary_key.len())?;
    for pos in primary_key {
        w.write_len(pos)?;
    }

    let indexes = meta.secondary_indexes();
    w.write_len(indexes.len())?;
    for index in indexes {
        w.write_u64(u64::from(index.index))?;
        w.write_bool(index.non_unique);
        w.write_len(index.columns.len())?;
        for pos in index.columns {
            w.write_len(pos)?;
        }
    }

    w.write_len(table.rows.len())?;
    for row in &table.rows {
        if row.len() != columns.len() {
            bail!("table '{}': row has {} cells but the table has {} columns", meta.name, row.len(), columns.len());
        }
        for (value, column) in row.iter().zip(&columns) {
            w.write_value(value, &column.logical_type, column.nullable)
                .map_err(|e| app_err!("table '{}', column '{}': {e}", meta.name, column.name))?;
        }
    }

    Ok(())
}

fn read_u32(r: &mut RowReader<'_>, what: &str) -> Result<u32> {
    let v = r.read_u64()?;
    u32::try_from(v).map_err(|e| app_err!("{what} {v} out of range: {e}"))
}

fn read_ordinal(r: &mut RowReader<'_>, column_count: usize) -> Result<usize> {
    let pos = r.read_len()?;
    if pos >= column_count {
        bail!("column ordinal {pos} out of range for {column_count} columns");
    }
    Ok(pos)
}

fn read_table(r: &mut RowReader<'_>) -> Result<SnapshotTable> {
    let name = r.read_str()?.to_string();
    let namespace = r.read_str()?.to_string();
    let deploy_mask = read_u32(r, "deploy mask")?;

    let column_count = r.read_len()?;
    let mut columns = Vec::with_capacity(column_count.min(1024));
    for _ in 0..column_count {
        let column_name = r.read_str()?;
        let field = r.read_str()?;
        let tag = r.read_byte()?;
        let mut logical_type = LogicalType::from_tag(tag).ok_or_else(|| app_err!("table '{name}': unknown type tag {tag}"))?;
        let nullable = r.read_bool()?;
        let column_mask = read_u32(r, "deploy mask")?;

        if logical_type.is_enum() {
            let enum_name = r.read_str()?.to_string();
            let value_count = r.read_len()?;
            let mut values = Vec::with_capacity(value_count.min(1024));
            for _ in 0..value_count {
                let value_name = r.read_str()?.to_string();
                let number = r.read_i64()?;
                let number = i32::try_from(number).map_err(|e| app_err!("enum value {number} out of range: {e}"))?;
                values.push((value_name, number));
            }
            logical_type = LogicalType::Enum(EnumType::new(enum_name, values));
        }

        let mut column = ColumnMeta::new(column_name, field, logical_type).deploy(column_mask);
        if nullable {
            column = column.nullable();
        }
        columns.push(column);
    }

    let key_count = r.read_len()?;
    for order in 0..key_count {
        let pos = read_ordinal(r, columns.len())?;
        let order = u32::try_from(order).map_err(|e| app_err!("key order {order} out of range: {e}"))?;
        columns[pos].primary_key = Some(order);
    }

    let index_count = r.read_len()?;
    for _ in 0..index_count {
        let index = read_u32(r, "index id")?;
        let non_unique = r.read_bool()?;
        let participant_count = r.read_len()?;
        for order in 0..participant_count {
            let pos = read_ordinal(r, columns.len())?;
            let order = u32::try_from(order).map_err(|e| app_err!("index order {order} out of range: {e}"))?;
            columns[pos].secondary_keys.push(SecondaryKeyInfo { index, order, non_unique });
        }
    }

    let row_count = r.read_len()?;
    let mut rows = Vec::with_capacity(row_count.min(65536));
    for _ in 0..row_count {
        let mut row = Vec::with_capacity(columns.len());
        for column in &columns {
            row.push(
                r.read_value(&column.logical_type, column.nullable)
                    .map_err(|e| app_err!("table '{name}', column '{}': {e}", column.name))?,
            );
        }
        rows.push(row);
    }

    let meta = TableMeta {
        name,
        namespace,
        deploy_mask,
        columns,
    };
    Ok(SnapshotTable { meta, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::test_tables::item_table;

    fn sample() -> Snapshot {
        let meta = TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap();
        let rows = vec![
            vec![
                Value::Int32(1),
                Value::String("Sword".into()),
                Value::UInt32(1),
                Value::Int32(42),
                Value::Float32(2.5),
                Value::Float64(0.75),
            ],
            vec![
                Value::Int32(2),
                Value::String("Shield".into()),
                Value::UInt32(2),
                Value::Int32(0),
                Value::Null,
                Value::Float64(1.0),
            ],
        ];
        Snapshot {
            tables: vec![SnapshotTable { meta, rows }],
        }
    }

    #[test]
    fn test_decodes_what_it_encodes() {
        let snapshot = sample();
        let bytes = snapshot.to_bytes().unwrap();
        let back = Snapshot::from_bytes(&bytes).unwrap();

        let table = back.table("Item").unwrap();
        assert_eq!(table.rows, snapshot.tables[0].rows);
        assert_eq!(table.meta.primary_key(), [0]);
        assert_eq!(table.meta.secondary_indexes(), snapshot.tables[0].meta.secondary_indexes());
        assert_eq!(table.meta.columns[3].logical_type, snapshot.tables[0].meta.columns[3].logical_type);
        assert_eq!(table.meta.to_definition().key_layout(), item_table().key_layout());
    }

    #[test]
    fn test_encoding_is_stable() {
        assert_eq!(sample().to_bytes().unwrap(), sample().to_bytes().unwrap());
    }

    #[test]
    fn test_bad_magic() {
        let mut bytes = sample().to_bytes().unwrap();
        bytes[0] ^= 0xFF;
        let msg = Snapshot::from_bytes(&bytes).unwrap_err().to_string();
        assert!(msg.contains("invalid snapshot format"), "{msg}");
    }

    #[test]
    fn test_truncated_blob() {
        let bytes = sample().to_bytes().unwrap();
        assert!(Snapshot::from_bytes(&bytes[..bytes.len() - 20]).is_err());
        assert!(Snapshot::from_bytes(&bytes[..4]).is_err());
    }

    #[test]
    fn test_row_width_mismatch() {
        let mut snapshot = sample();
        snapshot.tables[0].rows[0].pop();
        assert!(snapshot.to_bytes().is_err());
    }

    #[test]
    fn test_empty_snapshot() {
        let bytes = Snapshot::default().to_bytes().unwrap();
        assert!(bytes.ends_with(&[0; PADDING]));
        assert!(Snapshot::from_bytes(&bytes).unwrap().tables.is_empty());
    }
}
