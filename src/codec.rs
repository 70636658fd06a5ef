//! Row codec
//!
//! Encodes rows against a [`StorageLayout`]:
//!
//! ```text
//! key:   key fields concatenated in key order (fixed widths, no delimiters)
//! value: fixed block | lengths header (32 bytes) | dynamic payloads
//! ```
//!
//! The lengths header is a big-endian word. Its low 7 bytes hold the total
//! dynamic length; dynamic field `i` owns the 5 bytes above that, starting
//! `7 + 5 * i` bytes from the low end. The header and payloads are omitted
//! when the table has no dynamic fields.

use alloy_primitives::{Address, I256, U256};
use tracing::trace;

use crate::config::{CodecConfig, MAX_DYNAMIC_FIELDS, MAX_DYNAMIC_LENGTH};
use crate::error::{Result, SchemaError};
use crate::layout::{FieldPosition, StorageLayout};
use crate::schema::SchemaField;
use crate::types::{FieldKind, ADDRESS_WIDTH};
use crate::value::{Row, Value};

/// Size of the dynamic lengths header
pub const LENGTHS_HEADER_SIZE: usize = 32;

const TOTAL_LENGTH_BYTES: usize = 7;
const FIELD_LENGTH_BYTES: usize = 5;

/// Encoded key and value bytes of one row
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedRecord {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Per-field dynamic lengths plus their total
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EncodedLengths {
    lengths: Vec<u64>,
}

impl EncodedLengths {
    pub fn new(lengths: Vec<u64>) -> Self {
        Self { lengths }
    }

    pub fn lengths(&self) -> &[u64] {
        &self.lengths
    }

    pub fn total(&self) -> u64 {
        self.lengths.iter().sum()
    }

    /// Pack into the 32-byte header word
    ///
    /// Fails with `LayoutLimit` when there are more lengths than header slots
    /// or a length does not fit its five-byte slot.
    pub fn to_word(&self, table: &str) -> Result<[u8; LENGTHS_HEADER_SIZE]> {
        let limit = |reason: String| SchemaError::LayoutLimit {
            table: table.to_string(),
            reason,
        };
        if self.lengths.len() > MAX_DYNAMIC_FIELDS {
            return Err(limit(format!(
                "{} dynamic lengths exceeds header capacity of {}",
                self.lengths.len(),
                MAX_DYNAMIC_FIELDS
            )));
        }
        if let Some(len) = self.lengths.iter().find(|len| **len > MAX_DYNAMIC_LENGTH) {
            return Err(limit(format!(
                "dynamic length {} exceeds {}",
                len, MAX_DYNAMIC_LENGTH
            )));
        }

        let mut word = [0u8; LENGTHS_HEADER_SIZE];
        put_be(&mut word, LENGTHS_HEADER_SIZE, TOTAL_LENGTH_BYTES, self.total());
        for (i, len) in self.lengths.iter().enumerate() {
            put_be(&mut word, slot_end(i), FIELD_LENGTH_BYTES, *len);
        }
        Ok(word)
    }

    /// Unpack `count` field lengths, checking the recorded total and unused slots
    pub fn from_word(word: &[u8], count: usize, table: &str) -> Result<Self> {
        if word.len() != LENGTHS_HEADER_SIZE {
            return Err(SchemaError::malformed(
                table,
                format!("lengths header is {} bytes, expected {}", word.len(), LENGTHS_HEADER_SIZE),
            ));
        }
        if count > MAX_DYNAMIC_FIELDS {
            return Err(SchemaError::malformed(
                table,
                format!("{} dynamic fields exceeds header capacity of {}", count, MAX_DYNAMIC_FIELDS),
            ));
        }
        let total = get_be(word, LENGTHS_HEADER_SIZE, TOTAL_LENGTH_BYTES);
        let mut lengths = Vec::with_capacity(count);
        for i in 0..MAX_DYNAMIC_FIELDS {
            let len = get_be(word, slot_end(i), FIELD_LENGTH_BYTES);
            if i < count {
                lengths.push(len);
            } else if len != 0 {
                return Err(SchemaError::malformed(
                    table,
                    format!("lengths header declares {} bytes for unused slot {}", len, i),
                ));
            }
        }
        let decoded = Self { lengths };
        if decoded.total() != total {
            return Err(SchemaError::malformed(
                table,
                format!(
                    "lengths header total {} does not match field lengths sum {}",
                    total,
                    decoded.total()
                ),
            ));
        }
        Ok(decoded)
    }
}

/// End offset of the length slot of dynamic field `i`
fn slot_end(i: usize) -> usize {
    LENGTHS_HEADER_SIZE - TOTAL_LENGTH_BYTES - FIELD_LENGTH_BYTES * i
}

fn put_be(word: &mut [u8], end: usize, width: usize, value: u64) {
    word[end - width..end].copy_from_slice(&value.to_be_bytes()[8 - width..]);
}

fn get_be(word: &[u8], end: usize, width: usize) -> u64 {
    let mut bytes = [0u8; 8];
    bytes[8 - width..].copy_from_slice(&word[end - width..end]);
    u64::from_be_bytes(bytes)
}

/// Encoder/decoder bound to a set of codec limits
#[derive(Debug, Clone, Copy, Default)]
pub struct Codec {
    config: CodecConfig,
}

/// Encode with default limits
pub fn encode(layout: &StorageLayout, row: &Row) -> Result<EncodedRecord> {
    Codec::default().encode(layout, row)
}

/// Decode with default limits
pub fn decode(layout: &StorageLayout, record: &EncodedRecord) -> Result<Row> {
    Codec::default().decode(layout, record)
}

/// Split key bytes into one slice per key field
pub fn key_tuple<'a>(layout: &StorageLayout, key: &'a [u8]) -> Result<Vec<&'a [u8]>> {
    check_key_length(layout, key)?;
    Ok(layout
        .key_fields()
        .iter()
        .map(|slot| &key[slot.offset..slot.offset + slot.width])
        .collect())
}

impl Codec {
    pub fn new(config: CodecConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CodecConfig {
        &self.config
    }

    /// Encode a row into key and value bytes
    ///
    /// Key fields are required. Value fields missing from the row take their
    /// type's default encoding.
    pub fn encode(&self, layout: &StorageLayout, row: &Row) -> Result<EncodedRecord> {
        let table = layout.table();
        if let Some(unknown) = row.fields().find(|name| layout.position(name).is_none()) {
            return Err(SchemaError::UnknownField {
                table: table.to_string(),
                field: unknown.to_string(),
            });
        }

        let key = self.encode_key(layout, row)?;

        let mut value = Vec::with_capacity(layout.static_length());
        for slot in layout.fixed_fields() {
            debug_assert_eq!(value.len(), slot.offset);
            match row.get(&slot.field.name) {
                Some(v) => encode_static(table, &slot.field, &slot.field.descriptor.kind, v, &mut value)?,
                None => value.extend_from_slice(&slot.field.descriptor.default_value),
            }
        }

        if layout.has_dynamic_fields() {
            let max_dynamic_length = self.config.max_dynamic_length.min(MAX_DYNAMIC_LENGTH);
            let mut payloads = Vec::new();
            let mut lengths = Vec::with_capacity(layout.dynamic_fields().len());
            for slot in layout.dynamic_fields() {
                let start = payloads.len();
                match row.get(&slot.field.name) {
                    Some(v) => encode_dynamic(table, &slot.field, v, &mut payloads)?,
                    None => payloads.extend_from_slice(&slot.field.descriptor.default_value),
                }
                let len = (payloads.len() - start) as u64;
                if len > max_dynamic_length {
                    return Err(SchemaError::InvalidValue {
                        table: table.to_string(),
                        field: slot.field.name.clone(),
                        reason: format!(
                            "{} bytes exceeds dynamic length limit of {}",
                            len, max_dynamic_length
                        ),
                    });
                }
                lengths.push(len);
            }
            value.extend_from_slice(&EncodedLengths::new(lengths).to_word(table)?);
            value.extend_from_slice(&payloads);
        }

        trace!(table, key_len = key.len(), value_len = value.len(), "encoded record");
        Ok(EncodedRecord { key, value })
    }

    /// Encode only the key bytes of a row
    pub fn encode_key(&self, layout: &StorageLayout, row: &Row) -> Result<Vec<u8>> {
        let table = layout.table();
        let mut key = Vec::with_capacity(layout.key_length());
        for slot in layout.key_fields() {
            let value = row.get(&slot.field.name).ok_or_else(|| SchemaError::MissingKeyField {
                table: table.to_string(),
                field: slot.field.name.clone(),
            })?;
            encode_static(table, &slot.field, &slot.field.descriptor.kind, value, &mut key)?;
        }
        Ok(key)
    }

    /// Decode key and value bytes back into a full row
    pub fn decode(&self, layout: &StorageLayout, record: &EncodedRecord) -> Result<Row> {
        let table = layout.table();
        check_key_length(layout, &record.key)?;

        let mut row = Row::new();
        for slot in layout.key_fields() {
            let bytes = &record.key[slot.offset..slot.offset + slot.width];
            row.insert(slot.field.name.clone(), self.decode_static(table, &slot.field, bytes)?);
        }

        let value = &record.value;
        let static_length = layout.static_length();
        if value.len() < static_length {
            return Err(SchemaError::malformed(
                table,
                format!("value is {} bytes, fixed block needs {}", value.len(), static_length),
            ));
        }
        for slot in layout.fixed_fields() {
            let bytes = &value[slot.offset..slot.offset + slot.width];
            row.insert(slot.field.name.clone(), self.decode_static(table, &slot.field, bytes)?);
        }

        if !layout.has_dynamic_fields() {
            if value.len() != static_length {
                return Err(SchemaError::malformed(
                    table,
                    format!("value is {} bytes, expected exactly {}", value.len(), static_length),
                ));
            }
            return Ok(row);
        }

        let lengths = read_lengths(layout, value)?;
        let expected = static_length as u64 + LENGTHS_HEADER_SIZE as u64 + lengths.total();
        if value.len() as u64 != expected {
            return Err(SchemaError::malformed(
                table,
                format!("value is {} bytes, header implies {}", value.len(), expected),
            ));
        }

        let mut cursor = static_length + LENGTHS_HEADER_SIZE;
        for (slot, len) in layout.dynamic_fields().iter().zip(lengths.lengths()) {
            let end = cursor + *len as usize;
            let bytes = &value[cursor..end];
            row.insert(slot.field.name.clone(), self.decode_dynamic(table, &slot.field, bytes)?);
            cursor = end;
        }

        trace!(table, fields = row.len(), "decoded record");
        Ok(row)
    }

    /// Decode a single field without decoding the rest of the record
    pub fn decode_field(&self, layout: &StorageLayout, record: &EncodedRecord, field: &str) -> Result<Value> {
        let table = layout.table();
        let position = layout.position(field).ok_or_else(|| SchemaError::UnknownField {
            table: table.to_string(),
            field: field.to_string(),
        })?;

        match position {
            FieldPosition::Key(slot) => {
                check_key_length(layout, &record.key)?;
                self.decode_static(table, &slot.field, &record.key[slot.offset..slot.offset + slot.width])
            }
            FieldPosition::Fixed(slot) => {
                let end = slot.offset + slot.width;
                let bytes = record.value.get(slot.offset..end).ok_or_else(|| {
                    SchemaError::malformed(table, format!("value is {} bytes, field {} ends at {}", record.value.len(), field, end))
                })?;
                self.decode_static(table, &slot.field, bytes)
            }
            FieldPosition::Dynamic(slot) => {
                let lengths = read_lengths(layout, &record.value)?;
                let start = layout.static_length()
                    + LENGTHS_HEADER_SIZE
                    + lengths.lengths()[..slot.ordinal].iter().sum::<u64>() as usize;
                let end = start + lengths.lengths()[slot.ordinal] as usize;
                let bytes = record.value.get(start..end).ok_or_else(|| {
                    SchemaError::malformed(
                        table,
                        format!("length prefix of {} reads past end of {}-byte value", field, record.value.len()),
                    )
                })?;
                self.decode_dynamic(table, &slot.field, bytes)
            }
        }
    }

    fn decode_static(&self, table: &str, field: &SchemaField, bytes: &[u8]) -> Result<Value> {
        decode_static_kind(&field.descriptor.kind, bytes, self.config.strict_bool)
            .map_err(|reason| SchemaError::malformed(table, format!("field {}: {}", field.name, reason)))
    }

    fn decode_dynamic(&self, table: &str, field: &SchemaField, bytes: &[u8]) -> Result<Value> {
        let kind = &field.descriptor.kind;
        let decoded = match kind {
            FieldKind::Bytes => Ok(Value::Bytes(bytes.to_vec())),
            FieldKind::String => String::from_utf8(bytes.to_vec())
                .map(Value::String)
                .map_err(|_| "string is not valid UTF-8".to_string()),
            FieldKind::Array { element, len } => self.decode_array(element, *len, bytes),
            other => Err(format!("{:?} is not a dynamic kind", other)),
        };
        decoded.map_err(|reason| SchemaError::malformed(table, format!("field {}: {}", field.name, reason)))
    }

    fn decode_array(&self, element: &FieldKind, len: Option<usize>, bytes: &[u8]) -> std::result::Result<Value, String> {
        let width = element
            .width()
            .fixed()
            .ok_or_else(|| "array element is not fixed-width".to_string())?;
        if bytes.len() % width != 0 {
            return Err(format!("array payload of {} bytes is not a multiple of {}", bytes.len(), width));
        }
        let count = bytes.len() / width;
        if let Some(expected) = len {
            if count != expected {
                return Err(format!("array has {} elements, expected {}", count, expected));
            }
        }
        bytes
            .chunks(width)
            .map(|chunk| decode_static_kind(element, chunk, self.config.strict_bool))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map(Value::Array)
    }
}

fn check_key_length(layout: &StorageLayout, key: &[u8]) -> Result<()> {
    if key.len() != layout.key_length() {
        return Err(SchemaError::malformed(
            layout.table(),
            format!("key is {} bytes, expected {}", key.len(), layout.key_length()),
        ));
    }
    Ok(())
}

fn read_lengths(layout: &StorageLayout, value: &[u8]) -> Result<EncodedLengths> {
    let start = layout.static_length();
    let header = value.get(start..start + LENGTHS_HEADER_SIZE).ok_or_else(|| {
        SchemaError::malformed(
            layout.table(),
            format!("value is {} bytes, too short for the lengths header", value.len()),
        )
    })?;
    EncodedLengths::from_word(header, layout.dynamic_fields().len(), layout.table())
}

fn encode_static(table: &str, field: &SchemaField, kind: &FieldKind, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let invalid = |reason: String| SchemaError::InvalidValue {
        table: table.to_string(),
        field: field.name.clone(),
        reason,
    };

    match (kind, value) {
        (FieldKind::Bool, Value::Bool(b)) => out.push(*b as u8),
        (FieldKind::Uint { bits }, Value::Uint(u)) => {
            let n = *bits as usize / 8;
            let word = u.to_be_bytes::<32>();
            if word[..32 - n].iter().any(|b| *b != 0) {
                return Err(invalid(format!("{} does not fit in uint{}", u, bits)));
            }
            out.extend_from_slice(&word[32 - n..]);
        }
        (FieldKind::Int { bits }, Value::Int(i)) => {
            let n = *bits as usize / 8;
            let word = i.into_raw().to_be_bytes::<32>();
            let sign = if word[32 - n] & 0x80 != 0 { 0xff } else { 0x00 };
            if word[..32 - n].iter().any(|b| *b != sign) {
                return Err(invalid(format!("{} does not fit in int{}", i, bits)));
            }
            out.extend_from_slice(&word[32 - n..]);
        }
        (FieldKind::Enum { name, variants }, Value::Uint(u)) => {
            if *u >= U256::from(*variants) {
                return Err(invalid(format!("{} is not a variant of {} ({} variants)", u, name, variants)));
            }
            out.push(u.to_be_bytes::<32>()[31]);
        }
        (FieldKind::FixedBytes { len }, Value::FixedBytes(bytes)) => {
            if bytes.len() != *len {
                return Err(invalid(format!("expected {} bytes, got {}", len, bytes.len())));
            }
            out.extend_from_slice(bytes);
        }
        (FieldKind::Address, Value::Address(address)) => out.extend_from_slice(address.as_slice()),
        (_, value) => {
            return Err(SchemaError::TypeMismatch {
                table: table.to_string(),
                field: field.name.clone(),
                expected: expected_label(field),
                found: value.kind_name(),
            })
        }
    }
    Ok(())
}

fn encode_dynamic(table: &str, field: &SchemaField, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    match (&field.descriptor.kind, value) {
        (FieldKind::Bytes, Value::Bytes(bytes)) => out.extend_from_slice(bytes),
        (FieldKind::String, Value::String(s)) => out.extend_from_slice(s.as_bytes()),
        (FieldKind::Array { element, len }, Value::Array(items)) => {
            if let Some(expected) = len {
                if items.len() != *expected {
                    return Err(SchemaError::InvalidValue {
                        table: table.to_string(),
                        field: field.name.clone(),
                        reason: format!("expected {} elements, got {}", expected, items.len()),
                    });
                }
            }
            for item in items {
                encode_static(table, field, element, item, out)?;
            }
        }
        (_, value) => {
            return Err(SchemaError::TypeMismatch {
                table: table.to_string(),
                field: field.name.clone(),
                expected: field.descriptor.name.clone(),
                found: value.kind_name(),
            })
        }
    }
    Ok(())
}

/// Type name for mismatch errors; array elements are reported as such
fn expected_label(field: &SchemaField) -> String {
    if matches!(field.descriptor.kind, FieldKind::Array { .. }) {
        format!("{} element", field.descriptor.name)
    } else {
        field.descriptor.name.clone()
    }
}

fn decode_static_kind(kind: &FieldKind, bytes: &[u8], strict_bool: bool) -> std::result::Result<Value, String> {
    match kind {
        FieldKind::Bool => match bytes[0] {
            0 => Ok(Value::Bool(false)),
            1 => Ok(Value::Bool(true)),
            other if strict_bool => Err(format!("invalid bool byte 0x{:02x}", other)),
            _ => Ok(Value::Bool(true)),
        },
        FieldKind::Uint { .. } => Ok(Value::Uint(U256::from_be_slice(bytes))),
        FieldKind::Int { .. } => {
            let mut word = if bytes[0] & 0x80 != 0 { [0xffu8; 32] } else { [0u8; 32] };
            word[32 - bytes.len()..].copy_from_slice(bytes);
            Ok(Value::Int(I256::from_raw(U256::from_be_bytes(word))))
        }
        FieldKind::Enum { name, variants } => {
            if bytes[0] as usize >= *variants {
                return Err(format!("{} is not a variant of {}", bytes[0], name));
            }
            Ok(Value::Uint(U256::from(bytes[0])))
        }
        FieldKind::FixedBytes { .. } => Ok(Value::FixedBytes(bytes.to_vec())),
        FieldKind::Address => {
            if bytes.len() != ADDRESS_WIDTH {
                return Err(format!("address is {} bytes", bytes.len()));
            }
            Ok(Value::Address(Address::from_slice(bytes)))
        }
        other => Err(format!("{:?} is not a fixed-width kind", other)),
    }
}
