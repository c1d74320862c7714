//! Structural checks applied to every table before it leaves the schema reader.

use super::TableDefinition;
use crate::Result;
use ohno::bail;
use std::collections::{BTreeMap, HashSet};

/// Rejects tables whose key declarations cannot be represented faithfully.
pub fn validate_table(table: &TableDefinition) -> Result<()> {
    let name = &table.table_name;

    let mut pk_orders: Vec<u32> = table.fields.iter().filter(|f| f.is_primary_key).map(|f| f.primary_key_order).collect();
    if pk_orders.is_empty() {
        bail!("table '{name}' declares no primary key");
    }
    pk_orders.sort_unstable();
    check_contiguous(&pk_orders).map_err(|detail| ohno::app_err!("table '{name}' has a malformed primary key: {detail}"))?;

    for key in &table.secondary_keys {
        if table.field(&key.field).is_none() {
            bail!(
                "table '{name}' declares secondary index {} on unknown field '{}'",
                key.index,
                key.field
            );
        }
    }

    let mut participants: BTreeMap<u32, Vec<(usize, u32, bool)>> = BTreeMap::new();
    for (pos, key) in table.secondary_key_entries() {
        participants.entry(key.index).or_default().push((pos, key.order, key.non_unique));
    }

    for (index, entries) in &participants {
        let mut seen = HashSet::new();
        for &(pos, _, _) in entries {
            if !seen.insert(pos) {
                bail!(
                    "table '{name}' lists field '{}' twice in secondary index {index}",
                    table.fields[pos].schema_name
                );
            }
        }

        let mut orders: Vec<u32> = entries.iter().map(|&(_, order, _)| order).collect();
        orders.sort_unstable();
        check_contiguous(&orders)
            .map_err(|detail| ohno::app_err!("table '{name}' has a malformed secondary index {index}: {detail}"))?;

        let non_unique = entries[0].2;
        if entries.iter().any(|&(_, _, nu)| nu != non_unique) {
            bail!("table '{name}' secondary index {index} mixes unique and non-unique participants");
        }
    }

    Ok(())
}

/// Rejects duplicate table names across one build.
pub fn validate_unique_names(tables: &[TableDefinition]) -> Result<()> {
    let mut seen: BTreeMap<&str, &str> = BTreeMap::new();
    for table in tables {
        if let Some(previous) = seen.insert(&table.table_name, &table.schema_file) {
            bail!(
                "table name '{}' is declared in both '{previous}' and '{}'",
                table.table_name,
                table.schema_file
            );
        }
    }
    Ok(())
}

/// Checks that sorted key positions are exactly `0..n`.
fn check_contiguous(sorted: &[u32]) -> core::result::Result<(), String> {
    for (expected, &actual) in (0u32..).zip(sorted) {
        if actual != expected {
            let found = sorted.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ");
            return Err(format!("positions must be 0..{} without gaps or duplicates, found [{found}]", sorted.len()));
        }
    }
    Ok(())
}
