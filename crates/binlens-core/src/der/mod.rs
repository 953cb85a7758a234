//! DER/BER to text rendering.
//!
//! [`DerRenderer`] prints a tree of tag-length-value elements, one element per
//! line, with constructed elements opening an indented block:
//!
//! ```text
//! SEQUENCE {
//!   INTEGER { 1 }
//!   OBJECT_IDENTIFIER { 1.2.840.113549.1.1.11 }  # sha256WithRSAEncryption
//!   OCTET_STRING {
//!     SEQUENCE {}
//!   }
//! }
//! ```
//!
//! Primitive bodies are printed as the most specific form available: numbers,
//! booleans, dotted OIDs and quoted strings for known universal types. OCTET
//! STRING, BIT STRING and primitive tagged bodies that themselves parse as
//! elements are expanded in place. Anything else is printed as a quoted string
//! if it is printable ASCII and as a backtick hex literal otherwise.
//!
//! Rendering never fails: input that stops parsing is printed as a trailing
//! hex literal.

mod element;
mod hex;
mod input;
mod oid;
mod pem;

pub use element::{is_made_of_elements, parse_element, parse_elements, Element, Tag, TagClass};
pub use hex::{decode_hex, decode_loose_hex};
pub use input::{prepare, DerRequest, DerSource, PemMode};
pub use oid::{decode_oid, oid_name};
pub use pem::{decode_all as decode_pem_blocks, decode_first as decode_pem_block, PemBlock};

use crate::error::Result;
use crate::text::{hex_literal, is_printable_ascii, quote, quote_bytes};
use element::{
    BIT_STRING, BMP_STRING, BOOLEAN, ENUMERATED, INTEGER, NULL, OBJECT_IDENTIFIER, OCTET_STRING,
    RELATIVE_OID, UNIVERSAL_STRING,
};
use std::fmt::Write as FmtWrite;
use tracing::debug;

/// Configuration for DER rendering
#[derive(Debug, Clone)]
pub struct DerConfig {
    /// Indentation string (default: 2 spaces)
    pub indent_str: String,
    /// Maximum nesting depth; deeper bodies are printed as hex
    pub max_depth: usize,
    /// Append well-known OID names as comments
    pub oid_names: bool,
}

impl Default for DerConfig {
    fn default() -> Self {
        Self {
            indent_str: "  ".to_string(),
            max_depth: 64,
            oid_names: true,
        }
    }
}

impl DerConfig {
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

    /// Enables or disables OID name comments
    pub fn oid_names(mut self, enabled: bool) -> Self {
        self.oid_names = enabled;
        self
    }
}

/// Renders DER data as text
#[derive(Debug, Clone, Default)]
pub struct DerRenderer {
    config: DerConfig,
}

impl DerRenderer {
    /// Creates a renderer with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a renderer with custom config
    pub fn with_config(mut self, config: DerConfig) -> Self {
        self.config = config;
        self
    }

    /// Render `data` as a sequence of elements
    pub fn render(&self, data: &[u8]) -> String {
        debug!("Rendering {} bytes of DER", data.len());
        let mut output = String::new();
        let mut writer = DerWriter::new(&mut output, &self.config);
        // Writing into a String cannot fail
        let _ = writer.write_elements(data);
        output
    }

    /// Render one prepared source. A source with a comment gets a `# comment`
    /// line, preceded by a blank separator line unless it is the first.
    pub fn render_source(&self, index: usize, source: &DerSource) -> Result<String> {
        let bytes = source.bytes()?;
        let mut output = String::new();
        if let Some(comment) = source.comment() {
            if index > 0 {
                output.push('\n');
            }
            output.push_str("# ");
            output.push_str(comment);
            output.push('\n');
        }
        output.push_str(&self.render(&bytes));
        Ok(output)
    }

    /// Prepare `input` per `request` and render every resulting source
    pub fn render_request(&self, input: &[u8], request: &DerRequest) -> Result<String> {
        let sources = prepare(input, request)?;
        let mut output = String::new();
        for (index, source) in sources.iter().enumerate() {
            output.push_str(&self.render_source(index, source)?);
        }
        Ok(output)
    }
}

/// Render `input` with the default configuration; see
/// [`DerRenderer::render_request`]
pub fn decode(input: &[u8], request: &DerRequest) -> Result<String> {
    DerRenderer::new().render_request(input, request)
}

/// How a primitive body is printed
enum Body<'a> {
    /// `NAME {}`
    Empty,
    /// `NAME { text }`, with an optional trailing comment
    Inline(String, Option<&'static str>),
    /// `NAME {` followed by an optional leading line and nested elements
    Nested(Option<String>, &'a [u8]),
}

struct DerWriter<'a, W: FmtWrite> {
    writer: &'a mut W,
    config: &'a DerConfig,
    indent_level: usize,
}

impl<'a, W: FmtWrite> DerWriter<'a, W> {
    fn new(writer: &'a mut W, config: &'a DerConfig) -> Self {
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

    fn write_elements(&mut self, data: &[u8]) -> std::fmt::Result {
        let mut position = 0;
        while position < data.len() {
            match parse_element(&data[position..]) {
                Some(element) => {
                    self.write_element(&element)?;
                    position += element.encoded_len;
                }
                None => {
                    self.writeln(&hex_literal(&data[position..]))?;
                    break;
                }
            }
        }
        Ok(())
    }

    fn write_element(&mut self, element: &Element<'_>) -> std::fmt::Result {
        let mut head = element.tag.display_name();
        if element.indefinite {
            head.push_str(" indefinite");
        }

        let body = if element.tag.constructed {
            if element.body.is_empty() {
                Body::Empty
            } else if self.can_nest() {
                Body::Nested(None, element.body)
            } else {
                Body::Inline(hex_literal(element.body), None)
            }
        } else {
            self.primitive_body(&element.tag, element.body)
        };

        match body {
            Body::Empty => self.writeln(&format!("{} {{}}", head)),
            Body::Inline(text, comment) => match comment {
                Some(comment) => self.writeln(&format!("{} {{ {} }}  # {}", head, text, comment)),
                None => self.writeln(&format!("{} {{ {} }}", head, text)),
            },
            Body::Nested(lead, inner) => {
                self.writeln(&format!("{} {{", head))?;
                self.indent();
                if let Some(lead) = lead {
                    self.writeln(&lead)?;
                }
                self.write_elements(inner)?;
                self.dedent();
                self.writeln("}")
            }
        }
    }

    fn primitive_body<'b>(&self, tag: &Tag, body: &'b [u8]) -> Body<'b> {
        if body.is_empty() {
            return Body::Empty;
        }
        let nestable = self.can_nest() && is_made_of_elements(body);

        if tag.class != TagClass::Universal {
            if nestable {
                return Body::Nested(None, body);
            }
            return Body::Inline(bytes_literal(body), None);
        }

        match tag.number {
            BOOLEAN if body.len() == 1 && (body[0] == 0x00 || body[0] == 0xFF) => {
                let value = if body[0] == 0 { "FALSE" } else { "TRUE" };
                Body::Inline(value.to_string(), None)
            }
            INTEGER | ENUMERATED if body.len() <= 8 => {
                Body::Inline(decode_signed(body).to_string(), None)
            }
            BIT_STRING => {
                let (padding, bits) = (body[0], &body[1..]);
                if padding == 0 && self.can_nest() && is_made_of_elements(bits) {
                    Body::Nested(Some(hex_literal(&[padding])), bits)
                } else if bits.is_empty() {
                    Body::Inline(hex_literal(&[padding]), None)
                } else {
                    Body::Inline(format!("{} {}", hex_literal(&[padding]), hex_literal(bits)), None)
                }
            }
            OCTET_STRING if nestable => Body::Nested(None, body),
            OBJECT_IDENTIFIER | RELATIVE_OID => {
                match decode_oid(body, tag.number == RELATIVE_OID) {
                    Some(dotted) => {
                        let name = if self.config.oid_names && tag.number == OBJECT_IDENTIFIER {
                            oid_name(&dotted)
                        } else {
                            None
                        };
                        Body::Inline(dotted, name)
                    }
                    None => Body::Inline(hex_literal(body), None),
                }
            }
            NULL => Body::Inline(hex_literal(body), None),
            7 | 12 | 18..=27 => Body::Inline(quote_bytes(body), None),
            UNIVERSAL_STRING => match decode_utf32(body) {
                Some(text) => Body::Inline(format!("U{}", quote(&text)), None),
                None => Body::Inline(hex_literal(body), None),
            },
            BMP_STRING => match decode_utf16(body) {
                Some(text) => Body::Inline(format!("u{}", quote(&text)), None),
                None => Body::Inline(hex_literal(body), None),
            },
            _ => Body::Inline(bytes_literal(body), None),
        }
    }
}

/// Printable ASCII as a quoted string, anything else as hex
fn bytes_literal(bytes: &[u8]) -> String {
    if is_printable_ascii(bytes) {
        quote_bytes(bytes)
    } else {
        hex_literal(bytes)
    }
}

/// Big-endian two's complement, at most 8 bytes
fn decode_signed(bytes: &[u8]) -> i64 {
    let fill = if bytes[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    let mut buf = [fill; 8];
    buf[8 - bytes.len()..].copy_from_slice(bytes);
    i64::from_be_bytes(buf)
}

fn decode_utf16(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 2 != 0 {
        return None;
    }
    let units: Vec<u16> = bytes
        .chunks_exact(2)
        .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
        .collect();
    String::from_utf16(&units).ok()
}

fn decode_utf32(bytes: &[u8]) -> Option<String> {
    if bytes.len() % 4 != 0 {
        return None;
    }
    bytes
        .chunks_exact(4)
        .map(|quad| char::from_u32(u32::from_be_bytes([quad[0], quad[1], quad[2], quad[3]])))
        .collect()
}
