//! Minimal protobuf wire-format scanner.
//!
//! Descriptor options carry our metadata as custom extensions. Generic descriptor
//! decoders drop unregistered extensions, so option blobs are treated as opaque
//! bytes and walked record by record here. Only the three accessors the schema
//! reader needs are exposed: [`WireMessage::get_varint`], [`WireMessage::get_string`]
//! and [`WireMessage::get_repeated_bytes`], plus a couple of conveniences built on them.

use crate::Result;
use ohno::bail;

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_START_GROUP: u8 = 3;
const WIRE_END_GROUP: u8 = 4;
const WIRE_FIXED32: u8 = 5;

const MAX_VARINT_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireValue<'a> {
    Varint(u64),
    Fixed64(u64),
    Bytes(&'a [u8]),
    Fixed32(u32),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireRecord<'a> {
    pub field: u32,
    pub value: WireValue<'a>,
}

/// A decoded sequence of top-level records of one message.
///
/// Values are borrowed from the input; nested messages stay as raw bytes until
/// the caller parses them in turn.
#[derive(Debug, Clone, Default)]
pub struct WireMessage<'a> {
    records: Vec<WireRecord<'a>>,
}

impl<'a> WireMessage<'a> {
    /// Walks every record in `data`, skipping nothing and validating lengths.
    pub fn parse(data: &'a [u8]) -> Result<Self> {
        let mut records = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let key = read_varint(data, &mut pos)?;
            let field = u32::try_from(key >> 3).map_err(|e| ohno::app_err!("field number {} out of range: {e}", key >> 3))?;
            #[expect(clippy::cast_possible_truncation, reason = "masked to three bits")]
            let wire_type = (key & 0x7) as u8;

            if field == 0 {
                bail!("invalid field number 0 at offset {pos}");
            }

            let value = match wire_type {
                WIRE_VARINT => WireValue::Varint(read_varint(data, &mut pos)?),
                WIRE_FIXED64 => {
                    let bytes = take(data, &mut pos, 8)?;
                    let mut buf = [0u8; 8];
                    buf.copy_from_slice(bytes);
                    WireValue::Fixed64(u64::from_le_bytes(buf))
                }
                WIRE_LEN => {
                    let len = read_varint(data, &mut pos)?;
                    let len = usize::try_from(len).map_err(|e| ohno::app_err!("length {len} out of range: {e}"))?;
                    WireValue::Bytes(take(data, &mut pos, len)?)
                }
                WIRE_FIXED32 => {
                    let bytes = take(data, &mut pos, 4)?;
                    let mut buf = [0u8; 4];
                    buf.copy_from_slice(bytes);
                    WireValue::Fixed32(u32::from_le_bytes(buf))
                }
                WIRE_START_GROUP | WIRE_END_GROUP => bail!("group wire type in field {field} is not supported"),
                other => bail!("unknown wire type {other} in field {field}"),
            };

            records.push(WireRecord { field, value });
        }

        Ok(Self { records })
    }

    /// Returns the last varint value recorded for `field`, protobuf's "last one wins" rule.
    #[must_use]
    pub fn get_varint(&self, field: u32) -> Option<u64> {
        self.records.iter().rev().find_map(|r| match r.value {
            WireValue::Varint(v) if r.field == field => Some(v),
            _ => None,
        })
    }

    #[must_use]
    pub fn get_bool(&self, field: u32) -> Option<bool> {
        self.get_varint(field).map(|v| v != 0)
    }

    /// Varint truncated to `u32`, the way protobuf reads `uint32`/`int32` fields.
    #[must_use]
    pub fn get_u32(&self, field: u32) -> Option<u32> {
        #[expect(clippy::cast_possible_truncation, reason = "protobuf truncates 32-bit varints")]
        self.get_varint(field).map(|v| v as u32)
    }

    #[must_use]
    pub fn get_bytes(&self, field: u32) -> Option<&'a [u8]> {
        self.records.iter().rev().find_map(|r| match r.value {
            WireValue::Bytes(b) if r.field == field => Some(b),
            _ => None,
        })
    }

    pub fn get_string(&self, field: u32) -> Result<Option<&'a str>> {
        match self.get_bytes(field) {
            Some(bytes) => Ok(Some(
                core::str::from_utf8(bytes).map_err(|e| ohno::app_err!("field {field} is not valid UTF-8: {e}"))?,
            )),
            None => Ok(None),
        }
    }

    /// Every length-delimited value recorded for `field`, in wire order.
    #[must_use]
    pub fn get_repeated_bytes(&self, field: u32) -> Vec<&'a [u8]> {
        self.records
            .iter()
            .filter_map(|r| match r.value {
                WireValue::Bytes(b) if r.field == field => Some(b),
                _ => None,
            })
            .collect()
    }

    #[must_use]
    pub fn has(&self, field: u32) -> bool {
        self.records.iter().any(|r| r.field == field)
    }
}

fn read_varint(data: &[u8], pos: &mut usize) -> Result<u64> {
    let mut value = 0u64;

    for i in 0..MAX_VARINT_LEN {
        let Some(&byte) = data.get(*pos) else {
            bail!("truncated varint at offset {}", *pos);
        };
        *pos += 1;

        value |= u64::from(byte & 0x7F) << (7 * i);
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }

    bail!("varint longer than {MAX_VARINT_LEN} bytes ending at offset {}", *pos)
}

fn take<'a>(data: &'a [u8], pos: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = pos.checked_add(len).ok_or_else(|| ohno::app_err!("length overflow at offset {}", *pos))?;
    let Some(bytes) = data.get(*pos..end) else {
        bail!("record of {len} bytes at offset {} runs past end of buffer ({} bytes)", *pos, data.len());
    };
    *pos = end;
    Ok(bytes)
}

/// Builds wire-format messages in tests.
#[cfg(test)]
#[derive(Debug, Default, Clone)]
pub struct WireEncoder {
    buf: Vec<u8>,
}

#[cfg(test)]
impl WireEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    fn raw_varint(&mut self, mut v: u64) {
        while v >= 0x80 {
            self.buf.push((v as u8) | 0x80);
            v >>= 7;
        }
        self.buf.push(v as u8);
    }

    fn key(&mut self, field: u32, wire: u8) {
        self.raw_varint((u64::from(field) << 3) | u64::from(wire));
    }

    pub fn varint(mut self, field: u32, v: u64) -> Self {
        self.key(field, WIRE_VARINT);
        self.raw_varint(v);
        self
    }

    pub fn bytes(mut self, field: u32, b: &[u8]) -> Self {
        self.key(field, WIRE_LEN);
        self.raw_varint(b.len() as u64);
        self.buf.extend_from_slice(b);
        self
    }

    pub fn string(self, field: u32, s: &str) -> Self {
        self.bytes(field, s.as_bytes())
    }

    pub fn message(self, field: u32, m: Self) -> Self {
        self.bytes(field, &m.finish())
    }

    pub fn fixed32(mut self, field: u32, v: u32) -> Self {
        self.key(field, WIRE_FIXED32);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn fixed64(mut self, field: u32, v: u64) -> Self {
        self.key(field, WIRE_FIXED64);
        self.buf.extend_from_slice(&v.to_le_bytes());
        self
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_accessors() {
        let data = WireEncoder::new().varint(1, 150).string(2, "hello").varint(3, 1).finish();
        let msg = WireMessage::parse(&data).unwrap();

        assert_eq!(msg.get_varint(1), Some(150));
        assert_eq!(msg.get_string(2).unwrap(), Some("hello"));
        assert_eq!(msg.get_bool(3), Some(true));
        assert_eq!(msg.get_varint(4), None);
        assert!(msg.has(2));
        assert!(!msg.has(9));
    }

    #[test]
    fn test_last_value_wins() {
        let data = WireEncoder::new().varint(5, 1).varint(5, 2).finish();
        let msg = WireMessage::parse(&data).unwrap();
        assert_eq!(msg.get_varint(5), Some(2));
    }

    #[test]
    fn test_skips_fixed_width_fields() {
        let data = WireEncoder::new()
            .fixed64(1, 0xDEAD_BEEF)
            .fixed32(2, 7)
            .varint(50_000, 1)
            .string(50_001, "Renamed")
            .finish();
        let msg = WireMessage::parse(&data).unwrap();

        assert_eq!(msg.get_bool(50_000), Some(true));
        assert_eq!(msg.get_string(50_001).unwrap(), Some("Renamed"));
        assert_eq!(msg.get_varint(1), None, "fixed64 is not a varint");
        assert_eq!(msg.records.len(), 4);
    }

    #[test]
    fn test_repeated_nested_messages() {
        let entry = |name: &str, order: u64| WireEncoder::new().string(1, name).varint(3, order);
        let data = WireEncoder::new()
            .message(50_003, entry("a", 0))
            .varint(7, 1)
            .message(50_003, entry("b", 1))
            .finish();
        let msg = WireMessage::parse(&data).unwrap();

        let entries = msg.get_repeated_bytes(50_003);
        assert_eq!(entries.len(), 2);

        let second = WireMessage::parse(entries[1]).unwrap();
        assert_eq!(second.get_string(1).unwrap(), Some("b"));
        assert_eq!(second.get_varint(3), Some(1));
    }

    #[test]
    fn test_multi_byte_varint_field_number() {
        let data = WireEncoder::new().varint(50_105, 300).finish();
        let msg = WireMessage::parse(&data).unwrap();
        assert_eq!(msg.get_u32(50_105), Some(300));
    }

    #[test]
    fn test_truncated_length_is_error() {
        let mut data = WireEncoder::new().string(1, "abcdef").finish();
        data.truncate(4);
        assert!(WireMessage::parse(&data).is_err());
    }

    #[test]
    fn test_truncated_varint_is_error() {
        assert!(WireMessage::parse(&[0x08, 0x80]).is_err());
    }

    #[test]
    fn test_group_is_rejected() {
        // field 1, wire type 3 (start group)
        assert!(WireMessage::parse(&[0x0B]).is_err());
    }

    #[test]
    fn test_field_zero_is_rejected() {
        assert!(WireMessage::parse(&[0x00, 0x01]).is_err());
    }

    #[test]
    fn test_empty_input() {
        let msg = WireMessage::parse(&[]).unwrap();
        assert!(msg.records.is_empty());
    }
}
