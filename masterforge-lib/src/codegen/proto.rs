//! Reverse generator: runtime metadata back to schema source.

use super::naming::{infer_subdir, snake_name};
use crate::meta::TableMeta;
use crate::schema::{EnumType, FieldDefinition, LogicalType, TableDefinition};
use convert_case::{Case, Casing};
use core::fmt::Write;
use std::collections::{BTreeMap, BTreeSet};

/// Emits schema source that the schema reader decodes back into `meta.to_definition()`.
///
/// Enums are nested in the table message so that two tables of one package never
/// declare the same symbol. An enum sharing a value name with another enum of the
/// same table also gets its own `<Enum>Values` wrapper message.
#[must_use]
pub fn generate_schema(meta: &TableMeta, options_import: &str) -> String {
    let def = meta.to_definition();
    let mut out = String::new();

    out.push_str("syntax = \"proto3\";\n\n");
    if !def.package.is_empty() {
        let _ = writeln!(out, "package {};\n", def.package);
    }
    let _ = writeln!(out, "import \"{options_import}\";\n");

    write_message(&mut out, &def);
    out
}

/// Relative path of the schema file for `type_name`, e.g. `quest/quest_reward.proto`.
#[must_use]
pub fn schema_file_name(type_name: &str, existing_subdirs: &[String]) -> String {
    let snake = snake_name(type_name);
    let subdir = infer_subdir(&snake, existing_subdirs);
    format!("{subdir}/{snake}.proto")
}

fn table_enums(def: &TableDefinition) -> BTreeMap<&str, &EnumType> {
    let mut enums = BTreeMap::new();
    for field in &def.fields {
        if let LogicalType::Enum(e) = &field.logical_type
            && !e.values.is_empty()
        {
            let _ = enums.entry(e.name.as_str()).or_insert(e);
        }
    }
    enums
}

fn placeholder_name(e: &EnumType) -> Option<String> {
    (!e.values.iter().any(|v| v.number == 0)).then(|| format!("{}_UNSPECIFIED", e.name.to_case(Case::UpperSnake)))
}

fn value_names(e: &EnumType) -> BTreeSet<String> {
    e.values.iter().map(|v| v.name.clone()).chain(placeholder_name(e)).collect()
}

/// Enums whose value names collide with another enum of the same table.
fn clashing_enums<'a>(enums: &BTreeMap<&'a str, &EnumType>) -> BTreeSet<&'a str> {
    let names: Vec<(&str, BTreeSet<String>)> = enums.iter().map(|(&name, e)| (name, value_names(e))).collect();

    names
        .iter()
        .filter(|(name, values)| names.iter().any(|(other, others)| other != name && !values.is_disjoint(others)))
        .map(|&(name, _)| name)
        .collect()
}

fn write_enum(out: &mut String, e: &EnumType, indent: &str) {
    let _ = writeln!(out, "{indent}enum {} {{", e.name);

    // proto3 requires the first value to be zero
    if let Some(placeholder) = placeholder_name(e) {
        let _ = writeln!(out, "{indent}  {placeholder} = 0;");
    }

    let mut values: Vec<_> = e.values.iter().collect();
    values.sort_by_key(|v| v.number != 0);
    for v in values {
        let _ = writeln!(out, "{indent}  {} = {};", v.name, v.number);
    }
    let _ = writeln!(out, "{indent}}}");
}

fn write_message(out: &mut String, def: &TableDefinition) {
    let composite_pk = def.fields.iter().filter(|f| f.is_primary_key).count() > 1;

    let _ = writeln!(out, "message {} {{", def.message_name);
    out.push_str("  option (masterforge.table) = true;\n");
    if def.table_name != def.message_name {
        let _ = writeln!(out, "  option (masterforge.table_name) = \"{}\";", def.table_name);
    }
    if def.deploy_mask != 0 {
        let _ = writeln!(out, "  option (masterforge.table_deploy) = {};", def.deploy_mask);
    }
    for key in &def.secondary_keys {
        let _ = writeln!(
            out,
            "  option (masterforge.secondary_key) = {{ field: \"{}\" index: {} order: {} non_unique: {} }};",
            key.field, key.index, key.order, key.non_unique
        );
    }
    out.push('\n');

    let enums = table_enums(def);
    let wrapped = clashing_enums(&enums);
    for (name, e) in &enums {
        if wrapped.contains(name) {
            let _ = writeln!(out, "  message {name}Values {{");
            write_enum(out, e, "    ");
            out.push_str("  }\n\n");
        } else {
            write_enum(out, e, "  ");
            out.push('\n');
        }
    }

    for field in &def.fields {
        let label = if field.is_optional { "optional " } else { "" };
        let _ = write!(out, "  {label}{} {} = {}", field_type(field, &wrapped), field.schema_name, field.field_number);

        let options = field_options(field, composite_pk);
        if !options.is_empty() {
            let _ = write!(out, " [{}]", options.join(", "));
        }
        out.push_str(";\n");
    }

    out.push_str("}\n");
}

fn field_type(field: &FieldDefinition, wrapped: &BTreeSet<&str>) -> String {
    match &field.logical_type {
        LogicalType::Enum(e) if e.values.is_empty() => "int32".to_string(),
        LogicalType::Enum(e) if wrapped.contains(e.name.as_str()) => format!("{0}Values.{0}", e.name),
        other => other.proto_type().to_string(),
    }
}

fn field_options(field: &FieldDefinition, composite_pk: bool) -> Vec<String> {
    let mut options = Vec::new();

    if field.is_primary_key {
        options.push("(masterforge.primary_key) = true".to_string());
        if composite_pk {
            options.push(format!("(masterforge.key_order) = {}", field.primary_key_order));
        }
    }

    if field.deploy_mask != 0 {
        options.push(format!("(masterforge.deploy) = {}", field.deploy_mask));
    }

    for key in &field.secondary_keys {
        options.push(format!("(masterforge.secondary_index) = {}", key.index));
        if key.order != 0 {
            options.push(format!("(masterforge.secondary_order) = {}", key.order));
        }
        if key.non_unique {
            options.push("(masterforge.non_unique) = true".to_string());
        }
    }

    options
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ColumnMeta, TableMeta};
    use crate::schema::test_tables::{item_table, quest_reward_table};

    #[test]
    fn test_minimal_table() {
        let meta = TableMeta::new("Shop", "masterdata")
            .column(ColumnMeta::new("Id", "id", LogicalType::Int32).primary_key(0))
            .column(ColumnMeta::new("Label", "label", LogicalType::String).nullable());

        insta::assert_snapshot!(generate_schema(&meta, "masterforge/options.proto"), @r#"
        syntax = "proto3";

        package masterdata;

        import "masterforge/options.proto";

        message Shop {
          option (masterforge.table) = true;

          int32 id = 1 [(masterforge.primary_key) = true];
          optional string label = 2;
        }
        "#);
    }

    #[test]
    fn test_composite_secondary_split() {
        let meta = TableMeta::from_definition(&item_table(), "ns", 2).unwrap().unwrap();
        let src = generate_schema(&meta, "masterforge/options.proto");

        assert!(src.contains("\n  enum Rarity {\n    COMMON = 0;\n    RARE = 1;\n    LEGENDARY = 42;\n  }\n"));
        assert!(src.contains("  option (masterforge.secondary_key) = { field: \"rarity\" index: 1 order: 1 non_unique: true };\n"));
        assert!(src.contains("  string name = 2 [(masterforge.secondary_index) = 0];\n"));
        assert!(src.contains("  uint32 category = 3 [(masterforge.secondary_index) = 1, (masterforge.non_unique) = true];\n"));
        assert!(src.contains("  Rarity rarity = 4;\n"));
        assert!(src.contains("  optional float weight = 5;\n"));
        assert!(src.contains("  double drop_weight = 6 [(masterforge.deploy) = 2];\n"));
    }

    #[test]
    fn test_composite_primary_key() {
        let meta = TableMeta::from_definition(&quest_reward_table(), "ns", 2).unwrap().unwrap();
        let src = generate_schema(&meta, "masterforge/options.proto");

        assert!(src.contains("  option (masterforge.table_deploy) = 6;\n"));
        assert!(src.contains("  int32 quest_id = 1 [(masterforge.primary_key) = true, (masterforge.key_order) = 0];\n"));
        assert!(src.contains("  uint32 slot = 2 [(masterforge.primary_key) = true, (masterforge.key_order) = 1];\n"));
        assert!(src.contains("  optional int64 amount = 4;\n"));
    }

    #[test]
    fn test_enum_without_zero_gets_placeholder() {
        let e = EnumType::new("ItemKind", [("WEAPON", 1), ("ARMOR", 2)]);
        let mut out = String::new();
        write_enum(&mut out, &e, "");
        assert!(out.starts_with("enum ItemKind {\n  ITEM_KIND_UNSPECIFIED = 0;\n  WEAPON = 1;\n"));
    }

    #[test]
    fn test_enums_sharing_value_names_are_wrapped() {
        let kind = EnumType::new("Kind", [("NONE", 0), ("SWORD", 1)]);
        let mood = EnumType::new("Mood", [("NONE", 0), ("HAPPY", 1)]);
        let size = EnumType::new("Size", [("SMALL", 0), ("LARGE", 1)]);
        let meta = TableMeta::new("Pet", "masterdata")
            .column(ColumnMeta::new("Id", "id", LogicalType::Int32).primary_key(0))
            .column(ColumnMeta::new("Kind", "kind", LogicalType::Enum(kind)))
            .column(ColumnMeta::new("Mood", "mood", LogicalType::Enum(mood)))
            .column(ColumnMeta::new("Size", "size", LogicalType::Enum(size)));

        insta::assert_snapshot!(generate_schema(&meta, "masterforge/options.proto"), @r#"
        syntax = "proto3";

        package masterdata;

        import "masterforge/options.proto";

        message Pet {
          option (masterforge.table) = true;

          message KindValues {
            enum Kind {
              NONE = 0;
              SWORD = 1;
            }
          }

          message MoodValues {
            enum Mood {
              NONE = 0;
              HAPPY = 1;
            }
          }

          enum Size {
            SMALL = 0;
            LARGE = 1;
          }

          int32 id = 1 [(masterforge.primary_key) = true];
          KindValues.Kind kind = 2;
          MoodValues.Mood mood = 3;
          Size size = 4;
        }
        "#);
    }

    #[test]
    fn test_schema_file_name() {
        assert_eq!(schema_file_name("QuestReward", &["quest".to_string()]), "quest/quest_reward.proto");
        assert_eq!(schema_file_name("Item", &[]), "item/item.proto");
    }
}
