//! Low-level protobuf wire format parsing.
//!
//! Each protobuf field is encoded as:
//! - A varint "tag" containing the field number and wire type
//! - The field data (format depends on wire type)
//!
//! Wire types:
//! - 0: VARINT (int32, int64, uint32, uint64, sint32, sint64, bool, enum)
//! - 1: I64 (fixed64, sfixed64, double)
//! - 2: LEN (string, bytes, embedded messages, packed repeated fields)
//! - 3/4: SGROUP/EGROUP (deprecated groups)
//! - 5: I32 (fixed32, sfixed32, float)

use crate::error::{Error, Result};

/// Protobuf wire types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum WireType {
    /// Variable-length integer
    Varint = 0,
    /// 64-bit fixed-width
    I64 = 1,
    /// Length-delimited (strings, bytes, embedded messages)
    Len = 2,
    /// Start group (deprecated)
    StartGroup = 3,
    /// End group (deprecated)
    EndGroup = 4,
    /// 32-bit fixed-width
    I32 = 5,
}

impl WireType {
    /// Name printed after the field number
    pub fn name(self) -> &'static str {
        match self {
            WireType::Varint => "VARINT",
            WireType::I64 => "I64",
            WireType::Len => "LEN",
            WireType::StartGroup => "SGROUP",
            WireType::EndGroup => "EGROUP",
            WireType::I32 => "I32",
        }
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::StartGroup),
            4 => Ok(WireType::EndGroup),
            5 => Ok(WireType::I32),
            _ => Err(Error::invalid_wire_format(
                0,
                format!("unknown wire type: {}", value),
            )),
        }
    }
}

/// Maximum valid protobuf field number (2^29 - 1)
pub const MAX_VALID_NUMBER: u32 = 536_870_911;

/// Decoded payload of a single field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue<'a> {
    /// Raw varint value
    Varint(u64),
    /// Raw little-endian 64-bit value
    I64(u64),
    /// Length-delimited payload
    Len(&'a [u8]),
    /// Group start marker
    StartGroup,
    /// Group end marker
    EndGroup,
    /// Raw little-endian 32-bit value
    I32(u32),
}

impl FieldValue<'_> {
    /// Wire type this value was encoded with
    pub fn wire_type(&self) -> WireType {
        match self {
            FieldValue::Varint(_) => WireType::Varint,
            FieldValue::I64(_) => WireType::I64,
            FieldValue::Len(_) => WireType::Len,
            FieldValue::StartGroup => WireType::StartGroup,
            FieldValue::EndGroup => WireType::EndGroup,
            FieldValue::I32(_) => WireType::I32,
        }
    }
}

/// A single parsed field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Field<'a> {
    /// Field number from the tag
    pub number: u32,
    /// Field payload
    pub value: FieldValue<'a>,
}

/// Decode a varint from the given bytes.
///
/// Returns the decoded value and the number of bytes consumed.
pub fn decode_varint(data: &[u8]) -> Result<(u64, usize)> {
    let mut result: u64 = 0;
    let mut shift = 0;

    for (i, &byte) in data.iter().enumerate() {
        if i >= 10 {
            // Varints are at most 10 bytes for a 64-bit value
            return Err(Error::varint_decode(i));
        }

        result |= ((byte & 0x7F) as u64) << shift;
        shift += 7;

        if byte & 0x80 == 0 {
            return Ok((result, i + 1));
        }
    }

    Err(Error::varint_decode(data.len()))
}

/// Parse a single protobuf field from the start of `data`.
///
/// `offset` is the position of `data` within the enclosing buffer and is only
/// used for error reporting. Returns the field and the total bytes consumed
/// (tag and value).
pub fn read_field(data: &[u8], offset: usize) -> Result<(Field<'_>, usize)> {
    if data.is_empty() {
        return Err(Error::invalid_wire_format(offset, "empty data"));
    }

    let (tag, tag_len) = decode_varint(data)
        .map_err(|_| Error::invalid_wire_format(offset, "failed to decode field tag"))?;

    let wire_type = WireType::try_from((tag & 0x07) as u8)
        .map_err(|_| Error::invalid_wire_format(offset, format!("unknown wire type: {}", tag & 0x07)))?;
    let number = tag >> 3;

    if number == 0 || number > MAX_VALID_NUMBER as u64 {
        return Err(Error::invalid_wire_format(
            offset,
            format!("invalid field number {}", number),
        ));
    }
    let number = number as u32;

    let rest = &data[tag_len..];
    let (value, value_len) = match wire_type {
        WireType::Varint => {
            let (value, len) = decode_varint(rest).map_err(|_| {
                Error::invalid_wire_format(offset + tag_len, "failed to decode varint value")
            })?;
            (FieldValue::Varint(value), len)
        }
        WireType::I64 => {
            let bytes: [u8; 8] = rest
                .get(..8)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| Error::invalid_wire_format(offset + tag_len, "not enough bytes for I64"))?;
            (FieldValue::I64(u64::from_le_bytes(bytes)), 8)
        }
        WireType::Len => {
            let (length, length_varint_len) = decode_varint(rest).map_err(|_| {
                Error::invalid_wire_format(offset + tag_len, "failed to decode length prefix")
            })?;
            let available = rest.len() - length_varint_len;
            let length = usize::try_from(length).ok().filter(|&l| l <= available).ok_or_else(|| {
                Error::invalid_wire_format(
                    offset + tag_len,
                    format!(
                        "not enough bytes for LEN field (need {}, have {})",
                        length, available
                    ),
                )
            })?;
            let payload = &rest[length_varint_len..length_varint_len + length];
            (FieldValue::Len(payload), length_varint_len + length)
        }
        WireType::StartGroup => (FieldValue::StartGroup, 0),
        WireType::EndGroup => (FieldValue::EndGroup, 0),
        WireType::I32 => {
            let bytes: [u8; 4] = rest
                .get(..4)
                .and_then(|b| b.try_into().ok())
                .ok_or_else(|| Error::invalid_wire_format(offset + tag_len, "not enough bytes for I32"))?;
            (FieldValue::I32(u32::from_le_bytes(bytes)), 4)
        }
    };

    Ok((Field { number, value }, tag_len + value_len))
}

/// Returns true if `data` is a non-empty, complete sequence of fields whose
/// groups are balanced.
pub fn is_message(data: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }

    let mut open_groups: Vec<u32> = Vec::new();
    let mut position = 0;

    while position < data.len() {
        match read_field(&data[position..], position) {
            Ok((field, len)) => {
                match field.value {
                    FieldValue::StartGroup => open_groups.push(field.number),
                    FieldValue::EndGroup => {
                        if open_groups.pop() != Some(field.number) {
                            return false;
                        }
                    }
                    _ => {}
                }
                position += len;
            }
            Err(_) => return false,
        }
    }

    open_groups.is_empty()
}

/// Decode a zig-zag encoded varint (sint32/sint64)
pub fn zigzag_decode(value: u64) -> i64 {
    ((value >> 1) as i64) ^ -((value & 1) as i64)
}
