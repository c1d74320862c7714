//! Extension numbers reserved in `masterforge/options.proto` and their decoding.

use super::wire::WireMessage;
use super::{SecondaryKeyDefinition, SecondaryKeyInfo};
use crate::Result;
use ohno::EnrichableExt;

pub const TABLE: u32 = 50_000;
pub const TABLE_NAME: u32 = 50_001;
pub const TABLE_DEPLOY: u32 = 50_002;
pub const SECONDARY_KEY: u32 = 50_003;

pub const DEPLOY: u32 = 50_100;
pub const PRIMARY_KEY: u32 = 50_101;
pub const KEY_ORDER: u32 = 50_102;
pub const SECONDARY_INDEX: u32 = 50_103;
pub const SECONDARY_ORDER: u32 = 50_104;
pub const NON_UNIQUE: u32 = 50_105;

const SK_FIELD: u32 = 1;
const SK_INDEX: u32 = 2;
const SK_ORDER: u32 = 3;
const SK_NON_UNIQUE: u32 = 4;

/// The options schema shipped with the tool and written out by `init`.
pub const OPTIONS_PROTO: &str = include_str!("../../proto/masterforge/options.proto");

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageOptions {
    pub is_table: bool,
    pub table_name: Option<String>,
    pub deploy_mask: u32,
    pub secondary_keys: Vec<SecondaryKeyDefinition>,

    /// Set when any of our extensions is present, even with a default value.
    pub has_any: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldOptions {
    pub deploy_mask: u32,
    pub is_primary_key: bool,
    pub key_order: Option<u32>,
    pub secondary_index: Option<u32>,
    pub secondary_order: Option<u32>,
    pub non_unique: Option<bool>,
}

impl MessageOptions {
    pub fn decode(options: Option<&[u8]>) -> Result<Self> {
        let Some(bytes) = options else {
            return Ok(Self::default());
        };

        let msg = WireMessage::parse(bytes)?;
        let mut secondary_keys = Vec::new();
        for entry in msg.get_repeated_bytes(SECONDARY_KEY) {
            secondary_keys.push(decode_secondary_key(entry).map_err(|e| e.enrich("decoding message-level secondary_key"))?);
        }

        Ok(Self {
            is_table: msg.get_bool(TABLE).unwrap_or(false),
            table_name: msg.get_string(TABLE_NAME)?.map(str::to_string),
            deploy_mask: msg.get_u32(TABLE_DEPLOY).unwrap_or(0),
            secondary_keys,
            has_any: [TABLE, TABLE_NAME, TABLE_DEPLOY, SECONDARY_KEY].into_iter().any(|f| msg.has(f)),
        })
    }
}

impl FieldOptions {
    pub fn decode(options: Option<&[u8]>) -> Result<Self> {
        let Some(bytes) = options else {
            return Ok(Self::default());
        };

        let msg = WireMessage::parse(bytes)?;
        Ok(Self {
            deploy_mask: msg.get_u32(DEPLOY).unwrap_or(0),
            is_primary_key: msg.get_bool(PRIMARY_KEY).unwrap_or(false),
            key_order: msg.get_u32(KEY_ORDER),
            secondary_index: msg.get_u32(SECONDARY_INDEX),
            secondary_order: msg.get_u32(SECONDARY_ORDER),
            non_unique: msg.get_bool(NON_UNIQUE),
        })
    }

    /// The inline secondary-key entry, if the field declares one.
    #[must_use]
    pub fn secondary_key(&self) -> Option<SecondaryKeyInfo> {
        self.secondary_index.map(|index| SecondaryKeyInfo {
            index,
            order: self.secondary_order.unwrap_or(0),
            non_unique: self.non_unique.unwrap_or(false),
        })
    }
}

fn decode_secondary_key(bytes: &[u8]) -> Result<SecondaryKeyDefinition> {
    let msg = WireMessage::parse(bytes)?;
    let field = msg
        .get_string(SK_FIELD)?
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ohno::app_err!("secondary_key entry without a field name"))?;

    Ok(SecondaryKeyDefinition {
        field: field.to_string(),
        index: msg.get_u32(SK_INDEX).unwrap_or(0),
        order: msg.get_u32(SK_ORDER).unwrap_or(0),
        non_unique: msg.get_bool(SK_NON_UNIQUE).unwrap_or(false),
    })
}
