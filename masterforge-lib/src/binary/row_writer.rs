use crate::Result;
use crate::meta::Value;
use crate::schema::LogicalType;
use ohno::{app_err, bail};

/// Appends snapshot primitives to an in-memory buffer.
///
/// Unsigned integers are vlen encoded, signed integers are zigzag mapped first,
/// floats are fixed-width little endian.
#[derive(Debug, Default)]
pub struct RowWriter {
    buffer: Vec<u8>,
}

impl RowWriter {
    #[must_use]
    pub const fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    #[inline]
    pub fn write_byte(&mut self, byte: u8) {
        self.buffer.push(byte);
    }

    #[inline]
    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    #[inline]
    pub fn write_u64(&mut self, value: u64) -> Result<()> {
        let mut buf = [0u8; 17];
        let bytes_written = vlen::encode(&mut buf[..], value).map_err(|e| app_err!("unable to encode vlen u64: {e}"))?;
        self.buffer.extend_from_slice(&buf[..bytes_written]);
        Ok(())
    }

    #[inline]
    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        self.write_u64(((value << 1) ^ (value >> 63)).cast_unsigned())
    }

    pub fn write_len(&mut self, len: usize) -> Result<()> {
        self.write_u64(len as u64)
    }

    pub fn write_str(&mut self, s: &str) -> Result<()> {
        self.write_bytes(s.as_bytes())
    }

    pub fn write_bytes(&mut self, b: &[u8]) -> Result<()> {
        self.write_len(b.len())?;
        self.buffer.extend_from_slice(b);
        Ok(())
    }

    #[inline]
    pub fn write_bool(&mut self, value: bool) {
        self.buffer.push(u8::from(value));
    }

    pub fn write_f32(&mut self, value: f32) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    pub fn write_f64(&mut self, value: f64) {
        self.buffer.extend_from_slice(&value.to_le_bytes());
    }

    /// Writes one cell. Nullable cells carry a presence byte first.
    pub fn write_value(&mut self, value: &Value, logical_type: &LogicalType, nullable: bool) -> Result<()> {
        if nullable {
            if value.is_null() {
                self.write_byte(0);
                return Ok(());
            }
            self.write_byte(1);
        }

        match (value, logical_type) {
            (Value::Int32(v), LogicalType::Int32 | LogicalType::Enum(_)) => self.write_i64(i64::from(*v)),
            (Value::Int64(v), LogicalType::Int64) => self.write_i64(*v),
            (Value::UInt32(v), LogicalType::UInt32) => self.write_u64(u64::from(*v)),
            (Value::UInt64(v), LogicalType::UInt64) => self.write_u64(*v),
            (Value::Float32(v), LogicalType::Float32) => {
                self.write_f32(*v);
                Ok(())
            }
            (Value::Float64(v), LogicalType::Float64) => {
                self.write_f64(*v);
                Ok(())
            }
            (Value::Bool(v), LogicalType::Bool) => {
                self.write_bool(*v);
                Ok(())
            }
            (Value::String(v), LogicalType::String) => self.write_str(v),
            (Value::Bytes(v), LogicalType::Bytes) => self.write_bytes(v),
            (other, _) => bail!("value {other:?} does not fit a {logical_type} column"),
        }
    }
}
