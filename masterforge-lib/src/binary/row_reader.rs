use crate::Result;
use crate::meta::Value;
use crate::schema::LogicalType;
use ohno::{app_err, bail};

/// Reads snapshot primitives written by [`super::RowWriter`].
///
/// Every read is bounds checked since snapshots come from disk.
#[derive(Debug)]
pub struct RowReader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> RowReader<'a> {
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, position: 0 }
    }

    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    pub fn read_raw(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self.position.checked_add(len).ok_or_else(|| app_err!("length overflow at offset {}", self.position))?;
        let Some(bytes) = self.data.get(self.position..end) else {
            bail!("snapshot truncated: need {len} bytes at offset {}", self.position);
        };
        self.position = end;
        Ok(bytes)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.read_raw(1)?[0])
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let (value, bytes) =
            vlen::decode::<u64>(&self.data[self.position.min(self.data.len())..]).map_err(|e| app_err!("invalid vlen u64 at offset {}: {e}", self.position))?;
        self.position += bytes;
        Ok(value)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let v = self.read_u64()?;
        Ok((v >> 1).cast_signed() ^ -((v & 1).cast_signed()))
    }

    pub fn read_len(&mut self) -> Result<usize> {
        let len = self.read_u64()?;
        usize::try_from(len).map_err(|e| app_err!("length {len} out of range: {e}"))
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    pub fn read_bytes(&mut self) -> Result<&'a [u8]> {
        let len = self.read_len()?;
        self.read_raw(len)
    }

    pub fn read_str(&mut self) -> Result<&'a str> {
        let bytes = self.read_bytes()?;
        core::str::from_utf8(bytes).map_err(|e| app_err!("invalid UTF-8 in snapshot string: {e}"))
    }

    pub fn read_f32(&mut self) -> Result<f32> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.read_raw(4)?);
        Ok(f32::from_le_bytes(buf))
    }

    pub fn read_f64(&mut self) -> Result<f64> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.read_raw(8)?);
        Ok(f64::from_le_bytes(buf))
    }

    pub fn read_value(&mut self, logical_type: &LogicalType, nullable: bool) -> Result<Value> {
        if nullable && self.read_byte()? == 0 {
            return Ok(Value::Null);
        }

        Ok(match logical_type {
            LogicalType::Int32 | LogicalType::Enum(_) => {
                let v = self.read_i64()?;
                Value::Int32(i32::try_from(v).map_err(|e| app_err!("int32 value {v} out of range: {e}"))?)
            }
            LogicalType::Int64 => Value::Int64(self.read_i64()?),
            LogicalType::UInt32 => {
                let v = self.read_u64()?;
                Value::UInt32(u32::try_from(v).map_err(|e| app_err!("uint32 value {v} out of range: {e}"))?)
            }
            LogicalType::UInt64 => Value::UInt64(self.read_u64()?),
            LogicalType::Float32 => Value::Float32(self.read_f32()?),
            LogicalType::Float64 => Value::Float64(self.read_f64()?),
            LogicalType::Bool => Value::Bool(self.read_bool()?),
            LogicalType::String => Value::String(self.read_str()?.to_string()),
            LogicalType::Bytes => Value::Bytes(self.read_bytes()?.to_vec()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binary::RowWriter;

    #[test]
    fn test_signed_values() {
        let mut w = RowWriter::new();
        for v in [0, -1, 1, i64::MIN, i64::MAX, -300] {
            w.write_i64(v).unwrap();
        }
        w.write_raw(&[0; 16]);

        let data = w.into_inner();
        let mut r = RowReader::new(&data);
        for v in [0, -1, 1, i64::MIN, i64::MAX, -300] {
            assert_eq!(r.read_i64().unwrap(), v);
        }
    }

    #[test]
    fn test_values_of_every_type() {
        let cells = [
            (Value::Int32(-7), LogicalType::Int32, false),
            (Value::UInt32(7), LogicalType::UInt32, false),
            (Value::Float32(1.5), LogicalType::Float32, false),
            (Value::Float64(-0.125), LogicalType::Float64, true),
            (Value::Null, LogicalType::String, true),
            (Value::String("héllo".into()), LogicalType::String, false),
            (Value::Bytes(vec![1, 2, 3]), LogicalType::Bytes, false),
            (Value::Bool(true), LogicalType::Bool, false),
        ];

        let mut w = RowWriter::new();
        for (v, t, n) in &cells {
            w.write_value(v, t, *n).unwrap();
        }
        w.write_raw(&[0; 16]);

        let data = w.into_inner();
        let mut r = RowReader::new(&data);
        for (v, t, n) in &cells {
            assert_eq!(&r.read_value(t, *n).unwrap(), v);
        }
    }

    #[test]
    fn test_truncated_string_is_error() {
        let mut w = RowWriter::new();
        w.write_str("truncated").unwrap();
        let mut data = w.into_inner();
        data.truncate(4);

        let mut r = RowReader::new(&data);
        assert!(r.read_str().is_err());
    }
}
