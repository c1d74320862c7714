use super::LogicalType;
use std::collections::BTreeMap;

/// In-memory model of one table, the pivot between schema source and generated code.
///
/// Field order is the declaration order in the schema and fixes the column order of
/// every derived artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableDefinition {
    pub table_name: String,
    pub message_name: String,
    pub schema_file: String,
    pub package: String,
    pub deploy_mask: u32,
    pub fields: Vec<FieldDefinition>,
    pub secondary_keys: Vec<SecondaryKeyDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDefinition {
    pub schema_name: String,
    pub generated_name: String,
    pub logical_type: LogicalType,
    pub is_optional: bool,
    pub deploy_mask: u32,
    pub field_number: u32,
    pub is_primary_key: bool,
    pub primary_key_order: u32,
    pub secondary_keys: Vec<SecondaryKeyInfo>,
}

/// Field-level participation in a secondary index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecondaryKeyInfo {
    pub index: u32,
    pub order: u32,
    pub non_unique: bool,
}

/// Message-level participation in a secondary index, naming its field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SecondaryKeyDefinition {
    pub field: String,
    pub index: u32,
    pub order: u32,
    pub non_unique: bool,
}

/// One secondary index with every participant from both declaration sites.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecondaryIndex {
    pub index: u32,
    pub non_unique: bool,

    /// `(field position, order)` pairs sorted by order.
    pub participants: Vec<(usize, u32)>,
}

/// Declaration-site independent view of a table's keys, by field name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyLayout {
    pub primary: Vec<String>,
    pub secondary: BTreeMap<u32, (bool, Vec<String>)>,
}

impl TableDefinition {
    #[must_use]
    pub fn field(&self, schema_name: &str) -> Option<&FieldDefinition> {
        self.fields.iter().find(|f| f.schema_name == schema_name)
    }

    #[must_use]
    pub fn field_position(&self, schema_name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.schema_name == schema_name)
    }

    /// Primary-key fields ordered by key position.
    #[must_use]
    pub fn primary_key(&self) -> Vec<&FieldDefinition> {
        let mut keys: Vec<_> = self.fields.iter().filter(|f| f.is_primary_key).collect();
        keys.sort_by_key(|f| f.primary_key_order);
        keys
    }

    /// Every `(field position, key info)` pair, inline entries first, then message-level ones.
    ///
    /// Message-level entries naming an unknown field are left out; validation reports them.
    #[must_use]
    pub fn secondary_key_entries(&self) -> Vec<(usize, SecondaryKeyInfo)> {
        let inline = self
            .fields
            .iter()
            .enumerate()
            .flat_map(|(pos, f)| f.secondary_keys.iter().map(move |k| (pos, *k)));

        let declared = self.secondary_keys.iter().filter_map(|k| {
            self.field_position(&k.field).map(|pos| {
                (
                    pos,
                    SecondaryKeyInfo {
                        index: k.index,
                        order: k.order,
                        non_unique: k.non_unique,
                    },
                )
            })
        });

        inline.chain(declared).collect()
    }

    /// Secondary indexes keyed by index id, with participants merged from both declaration sites.
    #[must_use]
    pub fn secondary_indexes(&self) -> BTreeMap<u32, SecondaryIndex> {
        let mut indexes: BTreeMap<u32, SecondaryIndex> = BTreeMap::new();

        for (pos, key) in self.secondary_key_entries() {
            let entry = indexes.entry(key.index).or_insert_with(|| SecondaryIndex {
                index: key.index,
                non_unique: false,
                participants: Vec::new(),
            });
            entry.non_unique |= key.non_unique;
            entry.participants.push((pos, key.order));
        }

        for index in indexes.values_mut() {
            index.participants.sort_by_key(|&(pos, order)| (order, pos));
        }

        indexes
    }

    #[must_use]
    pub fn key_layout(&self) -> KeyLayout {
        KeyLayout {
            primary: self.primary_key().iter().map(|f| f.schema_name.clone()).collect(),
            secondary: self
                .secondary_indexes()
                .into_values()
                .map(|ix| {
                    let names = ix
                        .participants
                        .iter()
                        .map(|&(pos, _)| self.fields[pos].schema_name.clone())
                        .collect();
                    (ix.index, (ix.non_unique, names))
                })
                .collect(),
        }
    }
}
