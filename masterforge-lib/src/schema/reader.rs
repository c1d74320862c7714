use super::descriptor::{DescriptorSet, FieldDescriptor, FileDescriptor, LABEL_OPTIONAL, LABEL_REPEATED, MessageDescriptor};
use super::options::{FieldOptions, MessageOptions};
use super::validation::{validate_table, validate_unique_names};
use super::{EnumType, FieldDefinition, LOG_TARGET, LogicalType, SchemaCompiler, TableDefinition};
use crate::Result;
use camino::Utf8Path;
use convert_case::{Case, Casing};
use ohno::{EnrichableExt, IntoAppError, bail};
use std::collections::BTreeMap;
use std::fs;
use walkdir::WalkDir;

const TYPE_DOUBLE: u32 = 1;
const TYPE_FLOAT: u32 = 2;
const TYPE_INT64: u32 = 3;
const TYPE_UINT64: u32 = 4;
const TYPE_INT32: u32 = 5;
const TYPE_FIXED64: u32 = 6;
const TYPE_FIXED32: u32 = 7;
const TYPE_BOOL: u32 = 8;
const TYPE_STRING: u32 = 9;
const TYPE_GROUP: u32 = 10;
const TYPE_MESSAGE: u32 = 11;
const TYPE_BYTES: u32 = 12;
const TYPE_UINT32: u32 = 13;
const TYPE_ENUM: u32 = 14;
const TYPE_SFIXED32: u32 = 15;
const TYPE_SFIXED64: u32 = 16;
const TYPE_SINT32: u32 = 17;
const TYPE_SINT64: u32 = 18;

#[derive(Debug, Clone, Default)]
pub struct ReaderOptions {
    /// Input files (relative to the schema directory) that never declare tables.
    pub library_files: Vec<String>,

    /// Reject unsupported field types instead of falling back to int32.
    pub strict_types: bool,
}

/// Produces table definitions from a directory of schema files.
#[derive(Debug)]
pub struct SchemaReader<'a, C: SchemaCompiler> {
    compiler: &'a C,
    options: ReaderOptions,
}

impl<'a, C: SchemaCompiler> SchemaReader<'a, C> {
    pub const fn new(compiler: &'a C, options: ReaderOptions) -> Self {
        Self { compiler, options }
    }

    /// Compiles every schema file under `schema_dir` and decodes its tables.
    pub fn read(&self, schema_dir: &Utf8Path, descriptor_out: &Utf8Path) -> Result<Vec<TableDefinition>> {
        let files = discover_schema_files(schema_dir)?;
        if files.is_empty() {
            bail!("no .proto files found under '{schema_dir}'");
        }

        log::info!(target: LOG_TARGET, "Compiling {} schema file(s) from '{schema_dir}'", files.len());
        self.compiler.compile(schema_dir, &files, descriptor_out)?;

        let bytes = fs::read(descriptor_out).into_app_err_with(|| format!("reading descriptor set '{descriptor_out}'"))?;
        self.read_descriptor(&bytes, &files)
    }

    /// Decodes the tables of `input_files` out of an already compiled descriptor set.
    pub fn read_descriptor(&self, bytes: &[u8], input_files: &[String]) -> Result<Vec<TableDefinition>> {
        let set = DescriptorSet::decode(bytes)?;
        let enums = set.enum_types();

        let mut tables = Vec::new();
        for name in input_files {
            if self.options.library_files.iter().any(|l| l == name) {
                log::debug!(target: LOG_TARGET, "Skipping library file '{name}'");
                continue;
            }

            let file = set
                .file(name)
                .ok_or_else(|| ohno::app_err!("descriptor set does not contain '{name}'"))?;

            for message in &file.messages {
                if let Some(table) = self
                    .read_message(file, message, &enums)
                    .map_err(|e| e.enrich_with(|| format!("reading message '{}' in '{name}'", message.name)))?
                {
                    tables.push(table);
                }
            }
        }

        validate_unique_names(&tables)?;
        log::info!(target: LOG_TARGET, "Read {} table definition(s)", tables.len());
        Ok(tables)
    }

    fn read_message(
        &self,
        file: &FileDescriptor,
        message: &MessageDescriptor,
        enums: &BTreeMap<String, EnumType>,
    ) -> Result<Option<TableDefinition>> {
        let options = MessageOptions::decode(message.options.as_deref())?;

        if !options.is_table {
            let field_has_options = message
                .fields
                .iter()
                .map(|f| FieldOptions::decode(f.options.as_deref()))
                .collect::<Result<Vec<_>>>()?
                .iter()
                .any(|o| *o != FieldOptions::default());

            if options.has_any || field_has_options {
                bail!("message carries masterforge options but is not marked with (masterforge.table) = true");
            }

            log::debug!(target: LOG_TARGET, "Skipping helper message '{}'", message.name);
            return Ok(None);
        }

        let mut fields = Vec::with_capacity(message.fields.len());
        for field in &message.fields {
            fields.push(
                self.read_field(file, field, enums)
                    .map_err(|e| e.enrich_with(|| format!("reading field '{}'", field.name)))?,
            );
        }

        let table = TableDefinition {
            table_name: options.table_name.unwrap_or_else(|| message.name.clone()),
            message_name: message.name.clone(),
            schema_file: file.name.clone(),
            package: file.package.clone(),
            deploy_mask: options.deploy_mask,
            fields,
            secondary_keys: options.secondary_keys,
        };

        validate_table(&table)?;
        Ok(Some(table))
    }

    fn read_field(&self, file: &FileDescriptor, field: &FieldDescriptor, enums: &BTreeMap<String, EnumType>) -> Result<FieldDefinition> {
        let options = FieldOptions::decode(field.options.as_deref())?;

        if options.key_order.is_some() && !options.is_primary_key {
            bail!("key_order is only valid together with primary_key");
        }

        if (options.secondary_order.is_some() || options.non_unique.is_some()) && options.secondary_index.is_none() {
            bail!("secondary_order and non_unique are only valid together with secondary_index");
        }

        let (logical_type, wrapped) = self.map_type(field, enums)?;
        let explicit_optional = field.proto3_optional || (file.is_proto2() && field.label == LABEL_OPTIONAL);

        Ok(FieldDefinition {
            generated_name: field.name.to_case(Case::Pascal),
            schema_name: field.name.clone(),
            logical_type,
            is_optional: explicit_optional || wrapped,
            deploy_mask: options.deploy_mask,
            field_number: field.number,
            is_primary_key: options.is_primary_key,
            primary_key_order: options.key_order.unwrap_or(0),
            secondary_keys: options.secondary_key().into_iter().collect(),
        })
    }

    /// Maps a schema type to a logical type; the flag reports a wrapper message, which is nullable.
    fn map_type(&self, field: &FieldDescriptor, enums: &BTreeMap<String, EnumType>) -> Result<(LogicalType, bool)> {
        if field.label == LABEL_REPEATED {
            return self.fallback(field, "repeated fields are not supported");
        }

        let logical = match field.type_code {
            TYPE_DOUBLE => LogicalType::Float64,
            TYPE_FLOAT => LogicalType::Float32,
            TYPE_INT64 | TYPE_SFIXED64 | TYPE_SINT64 => LogicalType::Int64,
            TYPE_UINT64 | TYPE_FIXED64 => LogicalType::UInt64,
            TYPE_INT32 | TYPE_SFIXED32 | TYPE_SINT32 => LogicalType::Int32,
            TYPE_UINT32 | TYPE_FIXED32 => LogicalType::UInt32,
            TYPE_BOOL => LogicalType::Bool,
            TYPE_STRING => LogicalType::String,
            TYPE_BYTES => LogicalType::Bytes,
            TYPE_ENUM => {
                let type_name = field.type_name.as_deref().unwrap_or_default();
                match enums.get(type_name) {
                    Some(e) => LogicalType::Enum(e.clone()),
                    None => return self.fallback(field, &format!("enum '{type_name}' is not in the descriptor set")),
                }
            }
            TYPE_MESSAGE => {
                let type_name = field.type_name.as_deref().unwrap_or_default();
                return match wrapper_type(type_name) {
                    Some(t) => Ok((t, true)),
                    None => self.fallback(field, &format!("message type '{type_name}' is not a scalar wrapper")),
                };
            }
            TYPE_GROUP => return self.fallback(field, "groups are not supported"),
            other => return self.fallback(field, &format!("unknown field type {other}")),
        };

        Ok((logical, false))
    }

    fn fallback(&self, field: &FieldDescriptor, reason: &str) -> Result<(LogicalType, bool)> {
        if self.options.strict_types {
            bail!("unsupported type for field '{}': {reason}", field.name);
        }

        log::warn!(target: LOG_TARGET, "Field '{}' falls back to int32: {reason}", field.name);
        Ok((LogicalType::Int32, false))
    }
}

fn wrapper_type(type_name: &str) -> Option<LogicalType> {
    Some(match type_name.strip_prefix(".google.protobuf.")? {
        "DoubleValue" => LogicalType::Float64,
        "FloatValue" => LogicalType::Float32,
        "Int64Value" => LogicalType::Int64,
        "UInt64Value" => LogicalType::UInt64,
        "Int32Value" => LogicalType::Int32,
        "UInt32Value" => LogicalType::UInt32,
        "BoolValue" => LogicalType::Bool,
        "StringValue" => LogicalType::String,
        "BytesValue" => LogicalType::Bytes,
        _ => return None,
    })
}

/// Lists `.proto` files under `schema_dir` as sorted, `/`-separated relative paths.
pub fn discover_schema_files(schema_dir: &Utf8Path) -> Result<Vec<String>> {
    if !schema_dir.is_dir() {
        bail!("schema directory '{schema_dir}' does not exist");
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(schema_dir) {
        let entry = entry.into_app_err_with(|| format!("walking schema directory '{schema_dir}'"))?;
        if !entry.file_type().is_file() || entry.path().extension().is_none_or(|ext| ext != "proto") {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(schema_dir)
            .into_app_err("schema file outside of schema directory")?;
        let parts: Vec<_> = relative.components().map(|c| c.as_os_str().to_string_lossy().into_owned()).collect();
        files.push(parts.join("/"));
    }

    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::descriptor::test_descriptors::*;
    use crate::schema::options;
    use crate::schema::wire::WireEncoder;
    use camino::Utf8PathBuf;
    use std::cell::RefCell;

    /// Writes a prepared descriptor set instead of running protoc.
    struct FakeCompiler {
        bytes: Vec<u8>,
        seen: RefCell<Vec<String>>,
    }

    impl SchemaCompiler for FakeCompiler {
        fn compile(&self, _schema_dir: &Utf8Path, files: &[String], descriptor_out: &Utf8Path) -> Result<()> {
            self.seen.borrow_mut().extend(files.iter().cloned());
            fs::write(descriptor_out, &self.bytes)?;
            Ok(())
        }
    }

    fn table_options() -> WireEncoder {
        WireEncoder::new().varint(options::TABLE, 1)
    }

    fn pk() -> WireEncoder {
        WireEncoder::new().varint(options::PRIMARY_KEY, 1)
    }

    fn item_file() -> WireEncoder {
        let id = with_field_options(field("id", 1, TYPE_INT32), pk());
        let display_name = field("display_name", 2, TYPE_STRING);
        let rarity = with_type_name(field("rarity", 3, TYPE_ENUM), ".masterdata.Rarity");
        let weight = proto3_optional(field("weight", 4, TYPE_FLOAT));
        let bonus = with_type_name(field("bonus", 5, TYPE_MESSAGE), ".google.protobuf.Int64Value");
        let server_only = with_field_options(field("drop_rate", 6, TYPE_DOUBLE), WireEncoder::new().varint(options::DEPLOY, 2));

        let item_opts = table_options().string(options::TABLE_NAME, "Items").varint(options::TABLE_DEPLOY, 3);

        file(
            "item/item.proto",
            "masterdata",
            vec![
                message("Item", vec![id, display_name, rarity, weight, bonus, server_only], Some(item_opts)),
                message("Helper", vec![field("x", 1, TYPE_INT32)], None),
            ],
            vec![enumeration("Rarity", &[("COMMON", 0), ("RARE", 1)])],
        )
    }

    fn reader(strict: bool) -> ReaderOptions {
        ReaderOptions {
            library_files: vec!["masterforge/options.proto".to_string()],
            strict_types: strict,
        }
    }

    fn read(files: Vec<WireEncoder>, inputs: &[&str], strict: bool) -> Result<Vec<TableDefinition>> {
        let compiler = FakeCompiler {
            bytes: Vec::new(),
            seen: RefCell::default(),
        };
        let inputs: Vec<String> = inputs.iter().map(ToString::to_string).collect();
        SchemaReader::new(&compiler, reader(strict)).read_descriptor(&set(files), &inputs)
    }

    #[test]
    fn test_reads_table_and_skips_helper() {
        let tables = read(vec![item_file()], &["item/item.proto"], false).unwrap();
        assert_eq!(tables.len(), 1);

        let item = &tables[0];
        assert_eq!(item.table_name, "Items");
        assert_eq!(item.message_name, "Item");
        assert_eq!(item.package, "masterdata");
        assert_eq!(item.deploy_mask, 3);

        let names: Vec<_> = item.fields.iter().map(|f| f.generated_name.as_str()).collect();
        assert_eq!(names, ["Id", "DisplayName", "Rarity", "Weight", "Bonus", "DropRate"]);

        assert!(item.fields[0].is_primary_key);
        assert_eq!(item.fields[1].logical_type, LogicalType::String);
        assert!(!item.fields[1].is_optional);

        let LogicalType::Enum(rarity) = &item.fields[2].logical_type else {
            panic!("rarity should be an enum");
        };
        assert_eq!(rarity.number_of("RARE"), Some(1));

        assert!(item.fields[3].is_optional);
        assert_eq!(item.fields[3].logical_type, LogicalType::Float32);

        assert!(item.fields[4].is_optional);
        assert_eq!(item.fields[4].logical_type, LogicalType::Int64);

        assert_eq!(item.fields[5].deploy_mask, 2);
        assert_eq!(item.fields[5].field_number, 6);
    }

    #[test]
    fn test_library_files_are_not_scanned() {
        let lib = file("masterforge/options.proto", "masterforge", vec![message("SecondaryKey", vec![], None)], vec![]);
        let tables = read(vec![lib, item_file()], &["item/item.proto", "masterforge/options.proto"], false).unwrap();
        assert_eq!(tables.len(), 1);
    }

    #[test]
    fn test_unmarked_message_with_options_fails() {
        let id = with_field_options(field("id", 1, TYPE_INT32), pk());
        let f = file("a.proto", "p", vec![message("Forgotten", vec![id], None)], vec![]);

        let msg = format!("{:#}", read(vec![f], &["a.proto"], false).unwrap_err());
        assert!(msg.contains("not marked"), "{msg}");
    }

    #[test]
    fn test_unsupported_type_falls_back_to_int32() {
        let id = with_field_options(field("id", 1, TYPE_INT32), pk());
        let tags = repeated(field("tags", 2, TYPE_STRING));
        let f = file("a.proto", "p", vec![message("Tagged", vec![id, tags], Some(table_options()))], vec![]);

        let tables = read(vec![f.clone()], &["a.proto"], false).unwrap();
        assert_eq!(tables[0].fields[1].logical_type, LogicalType::Int32);

        assert!(read(vec![f], &["a.proto"], true).is_err());
    }

    #[test]
    fn test_key_order_without_primary_key_fails() {
        let id = with_field_options(field("id", 1, TYPE_INT32), pk());
        let bad = with_field_options(field("slot", 2, TYPE_INT32), WireEncoder::new().varint(options::KEY_ORDER, 1));
        let f = file("a.proto", "p", vec![message("Bad", vec![id, bad], Some(table_options()))], vec![]);

        assert!(read(vec![f], &["a.proto"], false).is_err());
    }

    #[test]
    fn test_duplicate_table_names_fail() {
        let mk = |file_name: &str| {
            let id = with_field_options(field("id", 1, TYPE_INT32), pk());
            file(file_name, "p", vec![message("Same", vec![id], Some(table_options()))], vec![])
        };

        assert!(read(vec![mk("a.proto"), mk("b.proto")], &["a.proto", "b.proto"], false).is_err());
    }

    #[test]
    fn test_read_runs_compiler_on_discovered_files() {
        let tmp = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::try_from(tmp.path().to_path_buf()).unwrap();
        let schema = root.join("schema");
        fs::create_dir_all(schema.join("item")).unwrap();
        fs::write(schema.join("item/item.proto"), "").unwrap();
        fs::write(schema.join("notes.txt"), "").unwrap();

        let compiler = FakeCompiler {
            bytes: set(vec![item_file()]),
            seen: RefCell::default(),
        };

        let tables = SchemaReader::new(&compiler, reader(false)).read(&schema, &root.join("schema.desc")).unwrap();
        assert_eq!(tables.len(), 1);
        assert_eq!(*compiler.seen.borrow(), ["item/item.proto"]);
    }

    #[test]
    fn test_missing_schema_dir_is_fatal() {
        let msg = discover_schema_files(Utf8Path::new("/definitely/not/here")).unwrap_err().to_string();
        assert!(msg.contains("does not exist"));
    }
}
