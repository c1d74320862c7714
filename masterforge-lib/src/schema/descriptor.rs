//! Decoding of a serialized `FileDescriptorSet`.
//!
//! Option sub-messages are kept as raw bytes so our extensions survive for
//! [`super::options`] to decode.

use super::EnumType;
use super::wire::WireMessage;
use crate::Result;
use ohno::EnrichableExt;
use std::collections::BTreeMap;

const SET_FILE: u32 = 1;

const FILE_NAME: u32 = 1;
const FILE_PACKAGE: u32 = 2;
const FILE_MESSAGE_TYPE: u32 = 4;
const FILE_ENUM_TYPE: u32 = 5;
const FILE_SYNTAX: u32 = 12;

const MESSAGE_NAME: u32 = 1;
const MESSAGE_FIELD: u32 = 2;
const MESSAGE_NESTED_TYPE: u32 = 3;
const MESSAGE_ENUM_TYPE: u32 = 4;
const MESSAGE_OPTIONS: u32 = 7;

const FIELD_NAME: u32 = 1;
const FIELD_NUMBER: u32 = 3;
const FIELD_LABEL: u32 = 4;
const FIELD_TYPE: u32 = 5;
const FIELD_TYPE_NAME: u32 = 6;
const FIELD_OPTIONS: u32 = 8;
#[cfg(test)]
const FIELD_ONEOF_INDEX: u32 = 9;
const FIELD_PROTO3_OPTIONAL: u32 = 17;

const ENUM_NAME: u32 = 1;
const ENUM_VALUE: u32 = 2;
const ENUM_VALUE_NAME: u32 = 1;
const ENUM_VALUE_NUMBER: u32 = 2;

pub const LABEL_OPTIONAL: u32 = 1;
pub const LABEL_REPEATED: u32 = 3;

#[derive(Debug, Clone, Default)]
pub struct DescriptorSet {
    pub files: Vec<FileDescriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct FileDescriptor {
    pub name: String,
    pub package: String,
    pub syntax: String,
    pub messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
}

#[derive(Debug, Clone, Default)]
pub struct MessageDescriptor {
    pub name: String,
    pub fields: Vec<FieldDescriptor>,
    pub nested_messages: Vec<MessageDescriptor>,
    pub enums: Vec<EnumDescriptor>,
    pub options: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Default)]
pub struct FieldDescriptor {
    pub name: String,
    pub number: u32,
    pub label: u32,
    pub type_code: u32,
    pub type_name: Option<String>,
    pub options: Option<Vec<u8>>,
    pub proto3_optional: bool,
}

#[derive(Debug, Clone, Default)]
pub struct EnumDescriptor {
    pub name: String,
    pub values: Vec<(String, i32)>,
}

impl DescriptorSet {
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let set = WireMessage::parse(bytes).map_err(|e| e.enrich("decoding descriptor set"))?;
        let mut files = Vec::new();
        for file in set.get_repeated_bytes(SET_FILE) {
            files.push(FileDescriptor::decode(file)?);
        }
        Ok(Self { files })
    }

    #[must_use]
    pub fn file(&self, name: &str) -> Option<&FileDescriptor> {
        self.files.iter().find(|f| f.name == name)
    }

    /// Every enum in the set keyed by its fully qualified name with a leading dot,
    /// matching how field `type_name`s reference them.
    #[must_use]
    pub fn enum_types(&self) -> BTreeMap<String, EnumType> {
        let mut result = BTreeMap::new();
        for file in &self.files {
            let prefix = if file.package.is_empty() {
                String::new()
            } else {
                format!(".{}", file.package)
            };

            for e in &file.enums {
                let _ = result.insert(format!("{prefix}.{}", e.name), e.to_enum_type());
            }

            for m in &file.messages {
                collect_nested_enums(m, &prefix, &mut result);
            }
        }
        result
    }
}

fn collect_nested_enums(message: &MessageDescriptor, prefix: &str, out: &mut BTreeMap<String, EnumType>) {
    let scope = format!("{prefix}.{}", message.name);
    for e in &message.enums {
        let _ = out.insert(format!("{scope}.{}", e.name), e.to_enum_type());
    }
    for nested in &message.nested_messages {
        collect_nested_enums(nested, &scope, out);
    }
}

impl FileDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let msg = WireMessage::parse(bytes)?;
        let name = msg.get_string(FILE_NAME)?.unwrap_or_default().to_string();

        let mut messages = Vec::new();
        for m in msg.get_repeated_bytes(FILE_MESSAGE_TYPE) {
            messages.push(MessageDescriptor::decode(m).map_err(|e| e.enrich_with(|| format!("decoding messages of '{name}'")))?);
        }

        let mut enums = Vec::new();
        for e in msg.get_repeated_bytes(FILE_ENUM_TYPE) {
            enums.push(EnumDescriptor::decode(e)?);
        }

        Ok(Self {
            package: msg.get_string(FILE_PACKAGE)?.unwrap_or_default().to_string(),
            syntax: msg.get_string(FILE_SYNTAX)?.unwrap_or("proto2").to_string(),
            name,
            messages,
            enums,
        })
    }

    #[must_use]
    pub fn is_proto2(&self) -> bool {
        self.syntax == "proto2"
    }
}

impl MessageDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let msg = WireMessage::parse(bytes)?;

        let mut fields = Vec::new();
        for f in msg.get_repeated_bytes(MESSAGE_FIELD) {
            fields.push(FieldDescriptor::decode(f)?);
        }

        let mut nested_messages = Vec::new();
        for m in msg.get_repeated_bytes(MESSAGE_NESTED_TYPE) {
            nested_messages.push(Self::decode(m)?);
        }

        let mut enums = Vec::new();
        for e in msg.get_repeated_bytes(MESSAGE_ENUM_TYPE) {
            enums.push(EnumDescriptor::decode(e)?);
        }

        Ok(Self {
            name: msg.get_string(MESSAGE_NAME)?.unwrap_or_default().to_string(),
            fields,
            nested_messages,
            enums,
            options: msg.get_bytes(MESSAGE_OPTIONS).map(<[u8]>::to_vec),
        })
    }
}

impl FieldDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let msg = WireMessage::parse(bytes)?;
        Ok(Self {
            name: msg.get_string(FIELD_NAME)?.unwrap_or_default().to_string(),
            number: msg.get_u32(FIELD_NUMBER).unwrap_or(0),
            label: msg.get_u32(FIELD_LABEL).unwrap_or(LABEL_OPTIONAL),
            type_code: msg.get_u32(FIELD_TYPE).unwrap_or(0),
            type_name: msg.get_string(FIELD_TYPE_NAME)?.map(str::to_string),
            options: msg.get_bytes(FIELD_OPTIONS).map(<[u8]>::to_vec),
            proto3_optional: msg.get_bool(FIELD_PROTO3_OPTIONAL).unwrap_or(false),
        })
    }
}

impl EnumDescriptor {
    fn decode(bytes: &[u8]) -> Result<Self> {
        let msg = WireMessage::parse(bytes)?;

        let mut values = Vec::new();
        for v in msg.get_repeated_bytes(ENUM_VALUE) {
            let value = WireMessage::parse(v)?;
            let name = value.get_string(ENUM_VALUE_NAME)?.unwrap_or_default().to_string();

            // negative numbers are sign-extended to 64 bits on the wire
            #[expect(clippy::cast_possible_truncation, reason = "enum numbers are int32")]
            let number = value.get_varint(ENUM_VALUE_NUMBER).unwrap_or(0) as i32;
            values.push((name, number));
        }

        Ok(Self {
            name: msg.get_string(ENUM_NAME)?.unwrap_or_default().to_string(),
            values,
        })
    }

    fn to_enum_type(&self) -> EnumType {
        EnumType::new(self.name.clone(), self.values.iter().cloned())
    }
}

#[cfg(test)]
pub(crate) mod test_descriptors {
    //! Builders for hand-assembled descriptor sets.

    use super::*;
    use crate::schema::wire::WireEncoder;

    pub fn field(name: &str, number: u32, type_code: u32) -> WireEncoder {
        WireEncoder::new()
            .string(FIELD_NAME, name)
            .varint(FIELD_NUMBER, u64::from(number))
            .varint(FIELD_LABEL, u64::from(LABEL_OPTIONAL))
            .varint(FIELD_TYPE, u64::from(type_code))
    }

    pub fn with_type_name(field: WireEncoder, type_name: &str) -> WireEncoder {
        field.string(FIELD_TYPE_NAME, type_name)
    }

    pub fn with_field_options(field: WireEncoder, options: WireEncoder) -> WireEncoder {
        field.message(FIELD_OPTIONS, options)
    }

    pub fn proto3_optional(field: WireEncoder) -> WireEncoder {
        field.varint(FIELD_ONEOF_INDEX, 0).varint(FIELD_PROTO3_OPTIONAL, 1)
    }

    pub fn repeated(field: WireEncoder) -> WireEncoder {
        field.varint(FIELD_LABEL, u64::from(LABEL_REPEATED))
    }

    pub fn message(name: &str, fields: Vec<WireEncoder>, options: Option<WireEncoder>) -> WireEncoder {
        let mut m = WireEncoder::new().string(MESSAGE_NAME, name);
        for f in fields {
            m = m.message(MESSAGE_FIELD, f);
        }
        if let Some(o) = options {
            m = m.message(MESSAGE_OPTIONS, o);
        }
        m
    }

    pub fn enumeration(name: &str, values: &[(&str, i32)]) -> WireEncoder {
        let mut e = WireEncoder::new().string(ENUM_NAME, name);
        for &(value_name, number) in values {
            let v = WireEncoder::new()
                .string(ENUM_VALUE_NAME, value_name)
                .varint(ENUM_VALUE_NUMBER, i64::from(number).cast_unsigned());
            e = e.message(ENUM_VALUE, v);
        }
        e
    }

    pub fn file(name: &str, package: &str, messages: Vec<WireEncoder>, enums: Vec<WireEncoder>) -> WireEncoder {
        let mut f = WireEncoder::new().string(FILE_NAME, name).string(FILE_PACKAGE, package);
        for m in messages {
            f = f.message(FILE_MESSAGE_TYPE, m);
        }
        for e in enums {
            f = f.message(FILE_ENUM_TYPE, e);
        }
        f.string(FILE_SYNTAX, "proto3")
    }

    pub fn set(files: Vec<WireEncoder>) -> Vec<u8> {
        let mut s = WireEncoder::new();
        for f in files {
            s = s.message(SET_FILE, f);
        }
        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::test_descriptors::*;
    use super::*;
    use crate::schema::wire::WireEncoder;

    #[test]
    fn test_decode_file_structure() {
        let options = WireEncoder::new().varint(50_000, 1);
        let bytes = set(vec![file(
            "item/item.proto",
            "masterdata",
            vec![message("Item", vec![field("id", 1, 5), field("name", 2, 9)], Some(options))],
            vec![enumeration("Rarity", &[("COMMON", 0), ("RARE", 1)])],
        )]);

        let set = DescriptorSet::decode(&bytes).unwrap();
        let file = set.file("item/item.proto").unwrap();
        assert_eq!(file.package, "masterdata");
        assert!(!file.is_proto2());

        let item = &file.messages[0];
        assert_eq!(item.name, "Item");
        assert_eq!(item.fields.len(), 2);
        assert_eq!(item.fields[1].name, "name");
        assert_eq!(item.fields[1].number, 2);
        assert_eq!(item.fields[1].type_code, 9);
        assert!(item.options.is_some());
    }

    #[test]
    fn test_enum_types_are_fully_qualified() {
        let bytes = set(vec![file("a.proto", "pkg", vec![], vec![enumeration("Kind", &[("NONE", 0), ("NEG", -5)])])]);
        let enums = DescriptorSet::decode(&bytes).unwrap().enum_types();

        let kind = &enums[".pkg.Kind"];
        assert_eq!(kind.name, "Kind");
        assert_eq!(kind.number_of("NEG"), Some(-5));
    }

    #[test]
    fn test_garbage_is_error() {
        assert!(DescriptorSet::decode(&[0x0A, 0x05, 0x01]).is_err());
    }
}
