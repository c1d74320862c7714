use strum::Display;

/// The closed set of column types every representation agrees on.
///
/// Enum columns are stored as `int32` everywhere; the enum's symbolic values
/// travel along so tabular cells can be written by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "lowercase")]
pub enum LogicalType {
    Int32,
    Int64,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Bool,
    String,
    Bytes,
    Enum(EnumType),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumType {
    pub name: String,
    pub values: Vec<EnumValue>,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub name: String,
    pub number: i32,
}

impl EnumType {
    #[must_use]
    pub fn new(name: impl Into<String>, values: impl IntoIterator<Item = (impl Into<String>, i32)>) -> Self {
        Self {
            name: name.into(),
            values: values
                .into_iter()
                .map(|(name, number)| EnumValue { name: name.into(), number })
                .collect(),
        }
    }

    #[must_use]
    pub fn number_of(&self, name: &str) -> Option<i32> {
        self.values.iter().find(|v| v.name == name).map(|v| v.number)
    }

    #[must_use]
    pub fn name_of(&self, number: i32) -> Option<&str> {
        self.values.iter().find(|v| v.number == number).map(|v| v.name.as_str())
    }
}

impl LogicalType {
    /// Stable one-byte tag used by the binary snapshot format.
    #[must_use]
    pub const fn tag(&self) -> u8 {
        match self {
            Self::Int32 => 1,
            Self::Int64 => 2,
            Self::UInt32 => 3,
            Self::UInt64 => 4,
            Self::Float32 => 5,
            Self::Float64 => 6,
            Self::Bool => 7,
            Self::String => 8,
            Self::Bytes => 9,
            Self::Enum(_) => 10,
        }
    }

    /// Inverse of [`Self::tag`]. Enum tags decode without their value table.
    #[must_use]
    pub fn from_tag(tag: u8) -> Option<Self> {
        Some(match tag {
            1 => Self::Int32,
            2 => Self::Int64,
            3 => Self::UInt32,
            4 => Self::UInt64,
            5 => Self::Float32,
            6 => Self::Float64,
            7 => Self::Bool,
            8 => Self::String,
            9 => Self::Bytes,
            10 => Self::Enum(EnumType { name: String::new(), values: Vec::new() }),
            _ => return None,
        })
    }

    /// Rust type of the generated struct field (without the `Option` wrapper).
    #[must_use]
    pub const fn rust_type(&self) -> &'static str {
        match self {
            Self::Int32 | Self::Enum(_) => "i32",
            Self::Int64 => "i64",
            Self::UInt32 => "u32",
            Self::UInt64 => "u64",
            Self::Float32 => "f32",
            Self::Float64 => "f64",
            Self::Bool => "bool",
            Self::String => "String",
            Self::Bytes => "Vec<u8>",
        }
    }

    /// Scalar keyword in schema source. Enums are referenced by name instead.
    #[must_use]
    pub fn proto_type(&self) -> &str {
        match self {
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::UInt32 => "uint32",
            Self::UInt64 => "uint64",
            Self::Float32 => "float",
            Self::Float64 => "double",
            Self::Bool => "bool",
            Self::String => "string",
            Self::Bytes => "bytes",
            Self::Enum(e) => &e.name,
        }
    }

    /// Declared column type in the relational store.
    #[must_use]
    pub const fn sql_type(&self) -> &'static str {
        match self {
            Self::Int32 | Self::Int64 | Self::UInt32 | Self::UInt64 | Self::Enum(_) => "INTEGER",
            Self::Float32 => "FLOAT",
            Self::Float64 => "DOUBLE",
            Self::Bool => "BOOLEAN",
            Self::String => "TEXT",
            Self::Bytes => "BLOB",
        }
    }

    #[must_use]
    pub const fn is_enum(&self) -> bool {
        matches!(self, Self::Enum(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip() {
        for t in [
            LogicalType::Int32,
            LogicalType::Int64,
            LogicalType::UInt32,
            LogicalType::UInt64,
            LogicalType::Float32,
            LogicalType::Float64,
            LogicalType::Bool,
            LogicalType::String,
            LogicalType::Bytes,
        ] {
            assert_eq!(LogicalType::from_tag(t.tag()), Some(t));
        }
        assert!(LogicalType::from_tag(0).is_none());
        assert!(LogicalType::from_tag(11).is_none());
    }

    #[test]
    fn test_display_names() {
        assert_eq!(LogicalType::UInt32.to_string(), "uint32");
        assert_eq!(LogicalType::Float64.to_string(), "float64");
        assert_eq!(LogicalType::Enum(EnumType::new("Rarity", [("COMMON", 0)])).to_string(), "enum");
    }

    #[test]
    fn test_enum_lookup() {
        let rarity = EnumType::new("Rarity", [("COMMON", 0), ("RARE", 1), ("LEGENDARY", 42)]);
        assert_eq!(rarity.number_of("LEGENDARY"), Some(42));
        assert_eq!(rarity.number_of("legendary"), None);
        assert_eq!(rarity.name_of(1), Some("RARE"));
        assert_eq!(rarity.name_of(7), None);
    }
}
