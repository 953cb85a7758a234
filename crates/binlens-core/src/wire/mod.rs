//! Protobuf wire format rendering.
//!
//! [`WireRenderer`] turns an encoded protobuf message into an indented text
//! listing. Every field line carries its wire type, and every length-delimited
//! field carries its byte length, so the listing is unambiguous even without a
//! schema:
//!
//! ```text
//! 1:LEN 5 {"Alice"}
//! 2:VARINT 42
//! 4:LEN 7 {
//!   1:LEN 5 {"Paris"}
//! }
//! ```
//!
//! When a message descriptor is supplied, declared fields additionally get a
//! `# name` comment, enum values are named and numeric values are printed in
//! their declared interpretation. Undeclared fields are still rendered by
//! number.
//!
//! Rendering itself never fails; bytes that cannot be parsed as a field are
//! printed as a trailing hex literal.

mod field;
mod schema;

use crate::error::Result;
use crate::text::{hex_literal, is_printable_utf8, quote_bytes};
use prost_reflect::{FieldDescriptor, Kind, MessageDescriptor};
use std::fmt::Write as FmtWrite;
use tracing::{debug, trace};

pub use field::{
    decode_varint, is_message, read_field, zigzag_decode, Field, FieldValue, WireType,
    MAX_VALID_NUMBER,
};
pub use schema::resolve_message;

#[cfg(test)]
pub(crate) use schema::tests::person_schema;

/// Configuration for wire format rendering
#[derive(Debug, Clone)]
pub struct WireConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Maximum nesting depth for embedded messages; deeper payloads are
    /// printed as hex
    pub max_depth: usize,
}

impl Default for WireConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            max_depth: 64,
        }
    }
}

impl WireConfig {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the indentation string
    pub fn indent_str(mut self, s: impl Into<String>) -> Self {
        self.indent_str = s.into();
        self
    }

    /// Sets the maximum nesting depth
    pub fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }
}

/// Renders protobuf wire data as text
#[derive(Debug, Clone, Default)]
pub struct WireRenderer {
    config: WireConfig,
}

impl WireRenderer {
    /// Creates a renderer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom config
    pub fn with_config(mut self, config: WireConfig) -> Self {
        self.config = config;
        self
    }

    /// Render `data`, optionally interpreting it as `message`
    pub fn render(&self, data: &[u8], message: Option<&MessageDescriptor>) -> String {
        debug!(
            "Rendering {} bytes of wire data (schema: {})",
            data.len(),
            message.map_or("none", |m| m.full_name())
        );
        let mut output = String::new();
        let mut writer = WireWriter::new(&mut output, &self.config);
        // Writing into a String cannot fail
        let _ = writer.write_fields(data, message.cloned());
        output
    }

    /// Render `data`, resolving `message_name` in a serialized descriptor set
    /// first when `schema` is present.
    ///
    /// A missing schema is not an error and falls back to numeric rendering;
    /// the message name is ignored in that case.
    pub fn render_with_schema(
        &self,
        data: &[u8],
        schema: Option<&[u8]>,
        message_name: Option<&str>,
    ) -> Result<String> {
        let Some(schema) = schema else {
            return Ok(self.render(data, None));
        };
        let message = resolve_message(schema, message_name.unwrap_or_default())?;
        Ok(self.render(data, Some(&message)))
    }
}

/// Render `data` with the default configuration; see
/// [`WireRenderer::render_with_schema`]
pub fn decode(data: &[u8], schema: Option<&[u8]>, message_name: Option<&str>) -> Result<String> {
    WireRenderer::new().render_with_schema(data, schema, message_name)
}

struct WireWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a WireConfig,
    indent_level: usize,
}

impl<'a, W: FmtWrite> WireWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a WireConfig) -> Self {
        Self {
            writer,
            config,
            indent_level: 0,
        }
    }

    fn indent(&mut self) {
        self.indent_level += 1;
    }

    fn dedent(&mut self) {
        self.indent_level = self.indent_level.saturating_sub(1);
    }

    fn write_indent(&mut self) -> std::fmt::Result {
        for _ in 0..self.indent_level {
            write!(self.writer, "{}", self.config.indent_str)?;
        }
        Ok(())
    }

    fn writeln(&mut self, s: &str) -> std::fmt::Result {
        self.write_indent()?;
        writeln!(self.writer, "{}", s)
    }

    fn can_nest(&self) -> bool {
        self.indent_level < self.config.max_depth
    }

    /// Writes every field of `data`. Groups open a nested scope until their
    /// matching end marker.
    fn write_fields(&mut self, data: &[u8], message: Option<MessageDescriptor>) -> std::fmt::Result {
        let base_level = self.indent_level;
        let mut scopes: Vec<(u32, Option<MessageDescriptor>)> = Vec::new();
        let mut position = 0;

        while position < data.len() {
            let (field, len) = match read_field(&data[position..], position) {
                Ok(parsed) => parsed,
                Err(e) => {
                    trace!("Stopping field parse: {}", e);
                    self.writeln(&hex_literal(&data[position..]))?;
                    break;
                }
            };
            position += len;

            let current = scopes.last().map_or(message.as_ref(), |(_, m)| m.as_ref());
            let descriptor = current.and_then(|m| m.get_field(field.number));

            match field.value {
                FieldValue::StartGroup => {
                    let comment = field_comment(descriptor.as_ref(), None);
                    self.writeln(&format!("{}:SGROUP{}", field.number, comment))?;
                    let group_message = descriptor.as_ref().and_then(|f| match f.kind() {
                        Kind::Message(m) => Some(m),
                        _ => None,
                    });
                    scopes.push((field.number, group_message));
                    self.indent();
                }
                FieldValue::EndGroup => {
                    if scopes.last().map(|(number, _)| *number) == Some(field.number) {
                        scopes.pop();
                        self.dedent();
                    }
                    self.writeln(&format!("{}:EGROUP", field.number))?;
                }
                _ => self.write_field(field, descriptor.as_ref())?,
            }
        }

        self.indent_level = base_level;
        Ok(())
    }

    fn write_field(&mut self, field: Field<'_>, descriptor: Option<&FieldDescriptor>) -> std::fmt::Result {
        let head = format!("{}:{}", field.number, field.value.wire_type().name());
        let kind = descriptor.map(|f| f.kind());

        match field.value {
            FieldValue::Varint(value) => {
                let enum_name = match &kind {
                    Some(Kind::Enum(e)) => e.get_value(value as i32).map(|v| v.name().to_string()),
                    _ => None,
                };
                let comment = field_comment(descriptor, enum_name.as_deref());
                self.writeln(&format!("{} {}{}", head, format_varint(value, kind.as_ref()), comment))
            }
            FieldValue::I64(value) => {
                let comment = field_comment(descriptor, None);
                self.writeln(&format!("{} {}{}", head, format_i64(value, kind.as_ref()), comment))
            }
            FieldValue::I32(value) => {
                let comment = field_comment(descriptor, None);
                self.writeln(&format!("{} {}{}", head, format_i32(value, kind.as_ref()), comment))
            }
            FieldValue::Len(payload) => self.write_len(&head, payload, descriptor),
            FieldValue::StartGroup | FieldValue::EndGroup => Ok(()),
        }
    }

    fn write_len(
        &mut self,
        head: &str,
        payload: &[u8],
        descriptor: Option<&FieldDescriptor>,
    ) -> std::fmt::Result {
        let prefix = format!("{} {}", head, payload.len());
        let comment = field_comment(descriptor, None);

        if payload.is_empty() {
            return self.writeln(&format!("{} {{}}{}", prefix, comment));
        }

        if let Some(field) = descriptor {
            let kind = field.kind();
            match &kind {
                Kind::Message(m) if self.can_nest() && is_message(payload) => {
                    return self.write_nested(&prefix, &comment, payload, Some(m.clone()));
                }
                Kind::String | Kind::Bytes if is_printable_utf8(payload) => {
                    return self.writeln(&format!("{} {{{}}}{}", prefix, quote_bytes(payload), comment));
                }
                Kind::String => {
                    return self.writeln(&format!("{} {{{}}}{}", prefix, quote_bytes(payload), comment));
                }
                _ if field.is_list() => {
                    if let Some(values) = format_packed(payload, &kind) {
                        return self.writeln(&format!("{} {{{}}}{}", prefix, values, comment));
                    }
                }
                _ => {}
            }
        }

        if is_printable_utf8(payload) {
            self.writeln(&format!("{} {{{}}}{}", prefix, quote_bytes(payload), comment))
        } else if self.can_nest() && is_message(payload) {
            self.write_nested(&prefix, &comment, payload, None)
        } else {
            self.writeln(&format!("{} {{{}}}{}", prefix, hex_literal(payload), comment))
        }
    }

    fn write_nested(
        &mut self,
        prefix: &str,
        comment: &str,
        payload: &[u8],
        message: Option<MessageDescriptor>,
    ) -> std::fmt::Result {
        self.writeln(&format!("{} {{{}", prefix, comment))?;
        self.indent();
        self.write_fields(payload, message)?;
        self.dedent();
        self.writeln("}")
    }
}

fn field_comment(field: Option<&FieldDescriptor>, enum_value: Option<&str>) -> String {
    match (field, enum_value) {
        (Some(f), Some(value)) => format!("  # {} = {}", f.name(), value),
        (Some(f), None) => format!("  # {}", f.name()),
        (None, _) => String::new(),
    }
}

fn format_varint(value: u64, kind: Option<&Kind>) -> String {
    match kind {
        Some(Kind::Int32) | Some(Kind::Enum(_)) => (value as i32).to_string(),
        Some(Kind::Int64) => (value as i64).to_string(),
        Some(Kind::Uint32) => (value as u32).to_string(),
        Some(Kind::Sint32) | Some(Kind::Sint64) => format!("{}z", zigzag_decode(value)),
        Some(Kind::Bool) if value <= 1 => (value == 1).to_string(),
        _ => value.to_string(),
    }
}

fn format_i64(value: u64, kind: Option<&Kind>) -> String {
    match kind {
        Some(Kind::Double) => format!("{:?}", f64::from_bits(value)),
        Some(Kind::Sfixed64) => format!("{}i64", value as i64),
        _ => format!("{}i64", value),
    }
}

fn format_i32(value: u32, kind: Option<&Kind>) -> String {
    match kind {
        Some(Kind::Float) => format!("{:?}", f32::from_bits(value)),
        Some(Kind::Sfixed32) => format!("{}i32", value as i32),
        _ => format!("{}i32", value),
    }
}

/// Formats a packed repeated scalar payload, or `None` if `kind` is not
/// packable or the payload does not divide into whole values
fn format_packed(payload: &[u8], kind: &Kind) -> Option<String> {
    let mut values = Vec::new();

    match kind {
        Kind::Int32
        | Kind::Int64
        | Kind::Uint32
        | Kind::Uint64
        | Kind::Sint32
        | Kind::Sint64
        | Kind::Bool
        | Kind::Enum(_) => {
            let mut position = 0;
            while position < payload.len() {
                let (value, len) = decode_varint(&payload[position..]).ok()?;
                values.push(format_varint(value, Some(kind)));
                position += len;
            }
        }
        Kind::Fixed32 | Kind::Sfixed32 | Kind::Float => {
            if payload.len() % 4 != 0 {
                return None;
            }
            for chunk in payload.chunks_exact(4) {
                let bytes: [u8; 4] = chunk.try_into().ok()?;
                values.push(format_i32(u32::from_le_bytes(bytes), Some(kind)));
            }
        }
        Kind::Fixed64 | Kind::Sfixed64 | Kind::Double => {
            if payload.len() % 8 != 0 {
                return None;
            }
            for chunk in payload.chunks_exact(8) {
                let bytes: [u8; 8] = chunk.try_into().ok()?;
                values.push(format_i64(u64::from_le_bytes(bytes), Some(kind)));
            }
        }
        _ => return None,
    }

    Some(values.join(" "))
}
