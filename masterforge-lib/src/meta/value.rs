use crate::Result;
use crate::schema::LogicalType;
use core::cmp::Ordering;
use ohno::bail;

/// One cell of a table row in its typed form.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// The value a non-nullable column takes when its cell is empty or its column is absent.
    #[must_use]
    pub const fn default_for(logical_type: &LogicalType) -> Self {
        match logical_type {
            LogicalType::Int32 | LogicalType::Enum(_) => Self::Int32(0),
            LogicalType::Int64 => Self::Int64(0),
            LogicalType::UInt32 => Self::UInt32(0),
            LogicalType::UInt64 => Self::UInt64(0),
            LogicalType::Float32 => Self::Float32(0.0),
            LogicalType::Float64 => Self::Float64(0.0),
            LogicalType::Bool => Self::Bool(false),
            LogicalType::String => Self::String(String::new()),
            LogicalType::Bytes => Self::Bytes(Vec::new()),
        }
    }

    /// Whether this value can be stored in a column of `logical_type`.
    #[must_use]
    pub const fn matches(&self, logical_type: &LogicalType, nullable: bool) -> bool {
        match (self, logical_type) {
            (Self::Null, _) => nullable,
            (Self::Int32(_), LogicalType::Int32 | LogicalType::Enum(_))
            | (Self::Int64(_), LogicalType::Int64)
            | (Self::UInt32(_), LogicalType::UInt32)
            | (Self::UInt64(_), LogicalType::UInt64)
            | (Self::Float32(_), LogicalType::Float32)
            | (Self::Float64(_), LogicalType::Float64)
            | (Self::Bool(_), LogicalType::Bool)
            | (Self::String(_), LogicalType::String)
            | (Self::Bytes(_), LogicalType::Bytes) => true,
            _ => false,
        }
    }

    /// Total order used to sort rows by key. Nulls sort first, floats use IEEE total order.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Null, Self::Null) => Ordering::Equal,
            (Self::Null, _) => Ordering::Less,
            (_, Self::Null) => Ordering::Greater,
            (Self::Bool(a), Self::Bool(b)) => a.cmp(b),
            (Self::Int32(a), Self::Int32(b)) => a.cmp(b),
            (Self::Int64(a), Self::Int64(b)) => a.cmp(b),
            (Self::UInt32(a), Self::UInt32(b)) => a.cmp(b),
            (Self::UInt64(a), Self::UInt64(b)) => a.cmp(b),
            (Self::Float32(a), Self::Float32(b)) => a.total_cmp(b),
            (Self::Float64(a), Self::Float64(b)) => a.total_cmp(b),
            (Self::String(a), Self::String(b)) => a.cmp(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.cmp(b),
            _ => self.rank().cmp(&other.rank()),
        }
    }

    const fn rank(&self) -> u8 {
        match self {
            Self::Null => 0,
            Self::Bool(_) => 1,
            Self::Int32(_) => 2,
            Self::Int64(_) => 3,
            Self::UInt32(_) => 4,
            Self::UInt64(_) => 5,
            Self::Float32(_) => 6,
            Self::Float64(_) => 7,
            Self::String(_) => 8,
            Self::Bytes(_) => 9,
        }
    }
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Self::$variant(v)
                }
            }

            impl FromValue for $ty {
                fn from_value(value: Value) -> Result<Self> {
                    match value {
                        Value::$variant(v) => Ok(v),
                        other => bail!("expected {}, found {other:?}", stringify!($variant)),
                    }
                }
            }
        )*
    };
}

/// Conversion out of a [`Value`], used by generated `MasterTable::from_values`.
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Result<Self>;
}

value_conversions! {
    bool => Bool,
    i32 => Int32,
    i64 => Int64,
    u32 => UInt32,
    u64 => UInt64,
    f32 => Float32,
    f64 => Float64,
    String => String,
    Vec<u8> => Bytes,
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
}

/// Takes the next value of a row and converts it, naming the column on failure.
pub fn take<T: FromValue>(values: &mut impl Iterator<Item = Value>, column: &str) -> Result<T> {
    let Some(value) = values.next() else {
        bail!("row ended before column '{column}'");
    };
    T::from_value(value).map_err(|e| ohno::app_err!("column '{column}': {e}"))
}
