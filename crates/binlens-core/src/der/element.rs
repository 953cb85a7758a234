//! BER/DER element headers.
//!
//! An element is an identifier (class, constructed bit, tag number), a length
//! (definite, or indefinite terminated by an end-of-contents marker) and a
//! body. Parsing is lenient: non-minimal encodings are accepted, only
//! structurally impossible input is rejected.

/// Tag class from the two high bits of the identifier octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// Universal (built-in ASN.1 types)
    Universal,
    /// Application-specific
    Application,
    /// Context-specific (`[N]`)
    ContextSpecific,
    /// Private
    Private,
}

/// Decoded identifier octets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tag {
    /// Tag class
    pub class: TagClass,
    /// Whether the body holds nested elements
    pub constructed: bool,
    /// Tag number
    pub number: u32,
}

pub(crate) const BOOLEAN: u32 = 1;
pub(crate) const INTEGER: u32 = 2;
pub(crate) const BIT_STRING: u32 = 3;
pub(crate) const OCTET_STRING: u32 = 4;
pub(crate) const NULL: u32 = 5;
pub(crate) const OBJECT_IDENTIFIER: u32 = 6;
pub(crate) const ENUMERATED: u32 = 10;
pub(crate) const RELATIVE_OID: u32 = 13;
pub(crate) const UNIVERSAL_STRING: u32 = 28;
pub(crate) const BMP_STRING: u32 = 30;

impl Tag {
    /// Returns true for a universal tag with the given number
    pub fn is_universal(&self, number: u32) -> bool {
        self.class == TagClass::Universal && self.number == number
    }

    /// Name of a universal tag number, if it has one
    pub fn universal_name(number: u32) -> Option<&'static str> {
        let name = match number {
            1 => "BOOLEAN",
            2 => "INTEGER",
            3 => "BIT_STRING",
            4 => "OCTET_STRING",
            5 => "NULL",
            6 => "OBJECT_IDENTIFIER",
            7 => "OBJECT_DESCRIPTOR",
            8 => "EXTERNAL",
            9 => "REAL",
            10 => "ENUMERATED",
            11 => "EMBEDDED_PDV",
            12 => "UTF8String",
            13 => "RELATIVE_OID",
            16 => "SEQUENCE",
            17 => "SET",
            18 => "NumericString",
            19 => "PrintableString",
            20 => "T61String",
            21 => "VideotexString",
            22 => "IA5String",
            23 => "UTCTime",
            24 => "GeneralizedTime",
            25 => "GraphicString",
            26 => "VisibleString",
            27 => "GeneralString",
            28 => "UniversalString",
            30 => "BMPString",
            _ => return None,
        };
        Some(name)
    }

    /// Whether this tag is normally constructed. Universal types are primitive
    /// except the structured ones; tagged types default to constructed.
    fn default_constructed(&self) -> bool {
        match self.class {
            TagClass::Universal => matches!(self.number, 8 | 11 | 16 | 17),
            _ => true,
        }
    }

    /// Text form of the tag, e.g. `SEQUENCE`, `[0]`, `[APPLICATION 2 PRIMITIVE]`
    pub fn display_name(&self) -> String {
        let unusual_form = self.constructed != self.default_constructed();

        if self.class == TagClass::Universal && !unusual_form {
            if let Some(name) = Self::universal_name(self.number) {
                return name.to_string();
            }
        }

        let mut name = match self.class {
            TagClass::Universal => format!("[UNIVERSAL {}", self.number),
            TagClass::Application => format!("[APPLICATION {}", self.number),
            TagClass::ContextSpecific => format!("[{}", self.number),
            TagClass::Private => format!("[PRIVATE {}", self.number),
        };
        if unusual_form {
            name.push_str(if self.constructed { " CONSTRUCTED" } else { " PRIMITIVE" });
        }
        name.push(']');
        name
    }
}

/// A parsed element borrowing its body from the input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Element<'a> {
    /// Identifier
    pub tag: Tag,
    /// True if the length was indefinite
    pub indefinite: bool,
    /// Body bytes (excluding any end-of-contents marker)
    pub body: &'a [u8],
    /// Bytes consumed from the input, header and terminator included
    pub encoded_len: usize,
}

/// Nesting limit for indefinite-length elements
const MAX_INDEFINITE_DEPTH: usize = 64;

const END_OF_CONTENTS: [u8; 2] = [0x00, 0x00];

fn parse_tag(data: &[u8]) -> Option<(Tag, usize)> {
    let first = *data.first()?;
    let class = match first >> 6 {
        0 => TagClass::Universal,
        1 => TagClass::Application,
        2 => TagClass::ContextSpecific,
        _ => TagClass::Private,
    };
    let constructed = first & 0x20 != 0;

    if first & 0x1F != 0x1F {
        let tag = Tag {
            class,
            constructed,
            number: (first & 0x1F) as u32,
        };
        return Some((tag, 1));
    }

    // High tag number form: base-128, most significant group first
    let mut number: u32 = 0;
    for (i, &byte) in data.iter().enumerate().skip(1) {
        if number > (u32::MAX >> 7) {
            return None;
        }
        number = (number << 7) | (byte & 0x7F) as u32;
        if byte & 0x80 == 0 {
            return Some((
                Tag {
                    class,
                    constructed,
                    number,
                },
                i + 1,
            ));
        }
    }
    None
}

/// Parses one element from the start of `data`
pub fn parse_element(data: &[u8]) -> Option<Element<'_>> {
    parse_element_at_depth(data, 0)
}

fn parse_element_at_depth(data: &[u8], depth: usize) -> Option<Element<'_>> {
    let (tag, tag_len) = parse_tag(data)?;
    let first_len = *data.get(tag_len)?;
    let mut header_len = tag_len + 1;

    let length = match first_len {
        0x80 => {
            if !tag.constructed || depth >= MAX_INDEFINITE_DEPTH {
                return None;
            }
            let body_start = header_len;
            let mut position = body_start;
            loop {
                let rest = data.get(position..)?;
                if rest.starts_with(&END_OF_CONTENTS) {
                    return Some(Element {
                        tag,
                        indefinite: true,
                        body: &data[body_start..position],
                        encoded_len: position + END_OF_CONTENTS.len(),
                    });
                }
                let child = parse_element_at_depth(rest, depth + 1)?;
                position += child.encoded_len;
            }
        }
        0xFF => return None,
        b if b & 0x80 != 0 => {
            let count = (b & 0x7F) as usize;
            if count > std::mem::size_of::<usize>() {
                return None;
            }
            let bytes = data.get(header_len..header_len + count)?;
            header_len += count;
            bytes.iter().fold(0usize, |acc, &b| (acc << 8) | b as usize)
        }
        b => b as usize,
    };

    let end = header_len.checked_add(length)?;
    let body = data.get(header_len..end)?;
    Some(Element {
        tag,
        indefinite: false,
        body,
        encoded_len: end,
    })
}

/// Parses `data` as a complete sequence of elements, or returns `None` if any
/// part of it does not parse
pub fn parse_elements(data: &[u8]) -> Option<Vec<Element<'_>>> {
    let mut elements = Vec::new();
    let mut position = 0;
    while position < data.len() {
        let element = parse_element(&data[position..])?;
        position += element.encoded_len;
        elements.push(element);
    }
    Some(elements)
}

/// Returns true if `data` looks like embedded DER: at least one element,
/// fully consumed, and no end-of-contents lookalikes.
pub fn is_made_of_elements(data: &[u8]) -> bool {
    match parse_elements(data) {
        Some(elements) => {
            !elements.is_empty() && elements.iter().all(|e| !e.tag.is_universal(0))
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_form() {
        let data = [0x30, 0x03, 0x02, 0x01, 0x05];
        let element = parse_element(&data).unwrap();
        assert_eq!(element.tag.display_name(), "SEQUENCE");
        assert!(element.tag.constructed);
        assert_eq!(element.body, &[0x02, 0x01, 0x05]);
        assert_eq!(element.encoded_len, 5);
    }

    #[test]
    fn test_long_form_length() {
        let mut data = vec![0x04, 0x81, 0x80];
        data.extend(std::iter::repeat(0xAA).take(0x80));
        let element = parse_element(&data).unwrap();
        assert_eq!(element.body.len(), 0x80);
        assert_eq!(element.encoded_len, 0x83);
    }

    #[test]
    fn test_truncated() {
        assert!(parse_element(&[0x30]).is_none());
        assert!(parse_element(&[0x30, 0x05, 0x00]).is_none());
        assert!(parse_element(&[0x04, 0x82, 0x01]).is_none());
        assert!(parse_element(&[0x1F, 0x81]).is_none());
    }

    #[test]
    fn test_indefinite_length() {
        let data = [0x30, 0x80, 0x02, 0x01, 0x01, 0x00, 0x00, 0xFF];
        let element = parse_element(&data).unwrap();
        assert!(element.indefinite);
        assert_eq!(element.body, &[0x02, 0x01, 0x01]);
        assert_eq!(element.encoded_len, 7);

        // Primitive elements cannot be indefinite
        assert!(parse_element(&[0x04, 0x80, 0x00, 0x00]).is_none());
    }

    #[test]
    fn test_high_tag_number() {
        let data = [0xBF, 0x81, 0x00, 0x00];
        let element = parse_element(&data).unwrap();
        assert_eq!(element.tag.class, TagClass::ContextSpecific);
        assert_eq!(element.tag.number, 128);
        assert_eq!(element.tag.display_name(), "[128]");
    }

    #[test]
    fn test_display_names() {
        let tag = |class, constructed, number| Tag {
            class,
            constructed,
            number,
        };
        assert_eq!(tag(TagClass::Universal, false, 2).display_name(), "INTEGER");
        assert_eq!(tag(TagClass::Universal, true, 17).display_name(), "SET");
        assert_eq!(
            tag(TagClass::Universal, false, 16).display_name(),
            "[UNIVERSAL 16 PRIMITIVE]"
        );
        assert_eq!(
            tag(TagClass::Universal, true, 4).display_name(),
            "[UNIVERSAL 4 CONSTRUCTED]"
        );
        assert_eq!(tag(TagClass::Universal, false, 31).display_name(), "[UNIVERSAL 31]");
        assert_eq!(tag(TagClass::ContextSpecific, false, 0).display_name(), "[0 PRIMITIVE]");
        assert_eq!(tag(TagClass::Application, true, 3).display_name(), "[APPLICATION 3]");
        assert_eq!(tag(TagClass::Private, true, 1).display_name(), "[PRIVATE 1]");
    }

    #[test]
    fn test_is_made_of_elements() {
        assert!(is_made_of_elements(&[0x02, 0x01, 0x01, 0x05, 0x00]));
        assert!(!is_made_of_elements(&[0x02, 0x01]));
        assert!(!is_made_of_elements(&[0x00, 0x00]));
        assert!(!is_made_of_elements(&[]));
    }
}
