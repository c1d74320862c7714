use super::Value;
use crate::Result;
use crate::schema::{FieldDefinition, LogicalType, SecondaryKeyDefinition, SecondaryKeyInfo, TableDefinition, should_include};
use ohno::bail;
use std::collections::BTreeMap;

/// How a member of a generated type relates to the tabular representation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnKind {
    Scalar,
    Text,
    Binary,

    /// Navigation member pointing at another table. Never stored.
    Reference(String),
}

impl ColumnKind {
    /// The one rule deciding which members are columns, shared by tabular I/O,
    /// binary building and relational seeding.
    #[must_use]
    pub const fn is_tabular(&self) -> bool {
        !matches!(self, Self::Reference(_))
    }

    const fn of(logical_type: &LogicalType) -> Self {
        match logical_type {
            LogicalType::String => Self::Text,
            LogicalType::Bytes => Self::Binary,
            _ => Self::Scalar,
        }
    }
}

/// Runtime description of one member of a generated table type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnMeta {
    /// Column name used in tabular headers, binary snapshots and SQL.
    pub name: String,

    /// Field name in schema source.
    pub field: String,
    pub logical_type: LogicalType,
    pub nullable: bool,
    pub deploy_mask: u32,
    pub kind: ColumnKind,
    pub primary_key: Option<u32>,
    pub secondary_keys: Vec<SecondaryKeyInfo>,
}

impl ColumnMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, field: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            kind: ColumnKind::of(&logical_type),
            logical_type,
            nullable: false,
            deploy_mask: 0,
            primary_key: None,
            secondary_keys: Vec::new(),
        }
    }

    /// A navigation member; `logical_type` is meaningless for it.
    #[must_use]
    pub fn reference(name: impl Into<String>, field: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            kind: ColumnKind::Reference(target.into()),
            ..Self::new(name, field, LogicalType::Int32)
        }
    }

    #[must_use]
    pub const fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    #[must_use]
    pub const fn deploy(mut self, mask: u32) -> Self {
        self.deploy_mask = mask;
        self
    }

    #[must_use]
    pub const fn primary_key(mut self, order: u32) -> Self {
        self.primary_key = Some(order);
        self
    }

    #[must_use]
    pub fn secondary_key(mut self, index: u32, order: u32, non_unique: bool) -> Self {
        self.secondary_keys.push(SecondaryKeyInfo { index, order, non_unique });
        self
    }

    /// The value an absent or empty cell takes.
    #[must_use]
    pub const fn empty_value(&self) -> Value {
        if self.nullable {
            Value::Null
        } else {
            Value::default_for(&self.logical_type)
        }
    }
}

/// Runtime key/column contract of a generated table type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableMeta {
    pub name: String,
    pub namespace: String,
    pub deploy_mask: u32,
    pub columns: Vec<ColumnMeta>,
}

/// A secondary index resolved to positions among the tabular columns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexMeta {
    pub index: u32,
    pub non_unique: bool,
    pub columns: Vec<usize>,
}

impl TableMeta {
    #[must_use]
    pub fn new(name: impl Into<String>, namespace: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            namespace: namespace.into(),
            deploy_mask: 0,
            columns: Vec::new(),
        }
    }

    #[must_use]
    pub const fn deploy(mut self, mask: u32) -> Self {
        self.deploy_mask = mask;
        self
    }

    #[must_use]
    pub fn column(mut self, column: ColumnMeta) -> Self {
        self.columns.push(column);
        self
    }

    /// Columns that take part in tabular, binary and relational representations.
    pub fn tabular_columns(&self) -> impl Iterator<Item = &ColumnMeta> {
        self.columns.iter().filter(|c| c.kind.is_tabular())
    }

    #[must_use]
    pub fn find_column(&self, name: &str) -> Option<(usize, &ColumnMeta)> {
        self.tabular_columns().enumerate().find(|(_, c)| c.name == name)
    }

    /// Positions (among tabular columns) of the primary key, in key order.
    #[must_use]
    pub fn primary_key(&self) -> Vec<usize> {
        let mut keys: Vec<(u32, usize)> = self
            .tabular_columns()
            .enumerate()
            .filter_map(|(pos, c)| c.primary_key.map(|order| (order, pos)))
            .collect();
        keys.sort_unstable();
        keys.into_iter().map(|(_, pos)| pos).collect()
    }

    #[must_use]
    pub fn secondary_indexes(&self) -> Vec<IndexMeta> {
        let mut indexes: BTreeMap<u32, (bool, Vec<(u32, usize)>)> = BTreeMap::new();
        for (pos, column) in self.tabular_columns().enumerate() {
            for key in &column.secondary_keys {
                let entry = indexes.entry(key.index).or_default();
                entry.0 |= key.non_unique;
                entry.1.push((key.order, pos));
            }
        }

        indexes
            .into_iter()
            .map(|(index, (non_unique, mut columns))| {
                columns.sort_unstable();
                IndexMeta {
                    index,
                    non_unique,
                    columns: columns.into_iter().map(|(_, pos)| pos).collect(),
                }
            })
            .collect()
    }

    /// Derives the metadata a generated type carries for one target.
    ///
    /// Returns `None` when the table is not deployed to the target. Fields filtered out
    /// by their own deploy mask disappear, and so does any secondary index that loses a
    /// participant. Losing a primary-key column is an error.
    pub fn from_definition(def: &TableDefinition, namespace: &str, target_bit: u32) -> Result<Option<Self>> {
        if !should_include(def.deploy_mask, target_bit) {
            return Ok(None);
        }

        for field in &def.fields {
            if field.is_primary_key && !should_include(field.deploy_mask, target_bit) {
                bail!(
                    "primary key field '{}' of table '{}' is excluded from target bit {target_bit}",
                    field.schema_name,
                    def.table_name
                );
            }
        }

        let mut columns: Vec<Option<ColumnMeta>> = def
            .fields
            .iter()
            .map(|f| should_include(f.deploy_mask, target_bit).then(|| column_of(f)))
            .collect();

        for index in def.secondary_indexes().into_values() {
            if index.participants.iter().any(|&(pos, _)| columns[pos].is_none()) {
                log::debug!(
                    target: super::LOG_TARGET,
                    "Dropping secondary index {} of '{}' for target bit {target_bit}",
                    index.index,
                    def.table_name
                );
                continue;
            }

            for &(pos, order) in &index.participants {
                if let Some(column) = columns[pos].as_mut() {
                    column.secondary_keys.push(SecondaryKeyInfo {
                        index: index.index,
                        order,
                        non_unique: index.non_unique,
                    });
                }
            }
        }

        let namespace = if def.package.is_empty() { namespace } else { def.package.as_str() };
        Ok(Some(Self {
            name: def.table_name.clone(),
            namespace: namespace.to_string(),
            deploy_mask: def.deploy_mask,
            columns: columns.into_iter().flatten().collect(),
        }))
    }

    /// Rebuilds a table definition from runtime metadata.
    ///
    /// Field numbers are assigned sequentially from 1. Each secondary index's first
    /// participant is declared inline on its field when that field has no inline
    /// index yet; every other participant becomes a message-level entry.
    #[must_use]
    pub fn to_definition(&self) -> TableDefinition {
        let columns: Vec<&ColumnMeta> = self.tabular_columns().collect();

        let mut fields: Vec<FieldDefinition> = (1u32..)
            .zip(&columns)
            .map(|(number, c)| FieldDefinition {
                schema_name: c.field.clone(),
                generated_name: c.name.clone(),
                logical_type: c.logical_type.clone(),
                is_optional: c.nullable,
                deploy_mask: c.deploy_mask,
                field_number: number,
                is_primary_key: c.primary_key.is_some(),
                primary_key_order: c.primary_key.unwrap_or(0),
                secondary_keys: Vec::new(),
            })
            .collect();

        let mut secondary_keys = Vec::new();
        for index in self.secondary_indexes() {
            let non_unique = index.non_unique;
            for (order, &pos) in (0u32..).zip(&index.columns) {
                let key = SecondaryKeyInfo {
                    index: index.index,
                    order,
                    non_unique,
                };

                if order == 0 && fields[pos].secondary_keys.is_empty() {
                    fields[pos].secondary_keys.push(key);
                } else {
                    secondary_keys.push(SecondaryKeyDefinition {
                        field: fields[pos].schema_name.clone(),
                        index: key.index,
                        order: key.order,
                        non_unique: key.non_unique,
                    });
                }
            }
        }

        TableDefinition {
            table_name: self.name.clone(),
            message_name: self.name.clone(),
            schema_file: String::new(),
            package: self.namespace.clone(),
            deploy_mask: self.deploy_mask,
            fields,
            secondary_keys,
        }
    }
}

fn column_of(field: &FieldDefinition) -> ColumnMeta {
    let mut column = ColumnMeta::new(&field.generated_name, &field.schema_name, field.logical_type.clone()).deploy(field.deploy_mask);
    if field.is_optional {
        column = column.nullable();
    }
    if field.is_primary_key {
        column = column.primary_key(field.primary_key_order);
    }
    column
}

/// A generated table type.
pub trait MasterTable: Sized {
    const TABLE_NAME: &'static str;

    fn meta() -> TableMeta;

    /// Builds a row from values in tabular column order.
    fn from_values(values: Vec<Value>) -> Result<Self>;

    /// Values in tabular column order.
    fn into_values(self) -> Vec<Value>;
}
