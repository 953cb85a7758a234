//! Small text helpers shared by the renderers.

use std::fmt::Write;

/// Lowercase hex digits of `bytes` without separators
pub fn hex_string(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        // Writing into a String cannot fail
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

/// `bytes` as a backtick-quoted hex literal
pub fn hex_literal(bytes: &[u8]) -> String {
    format!("`{}`", hex_string(bytes))
}

/// Returns true if `bytes` is non-empty printable ASCII text (tabs and line
/// breaks allowed)
pub fn is_printable_ascii(bytes: &[u8]) -> bool {
    !bytes.is_empty()
        && bytes
            .iter()
            .all(|&b| (0x20..0x7F).contains(&b) || matches!(b, b'\t' | b'\n' | b'\r'))
}

/// Returns true if `bytes` is non-empty UTF-8 without control characters
/// (tabs and line breaks allowed)
pub fn is_printable_utf8(bytes: &[u8]) -> bool {
    match std::str::from_utf8(bytes) {
        Ok(s) => !s.is_empty() && s.chars().all(|c| !c.is_control() || matches!(c, '\t' | '\n' | '\r')),
        Err(_) => false,
    }
}

/// Double-quoted string literal with C-style escapes
pub fn quote(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('"');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c.is_control() => {
                let mut buf = [0u8; 4];
                for byte in c.encode_utf8(&mut buf).bytes() {
                    let _ = write!(out, "\\x{:02x}", byte);
                }
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// Double-quoted literal for arbitrary bytes; invalid UTF-8 is escaped per byte
pub fn quote_bytes(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) => quote(s),
        Err(_) => {
            let mut out = String::with_capacity(bytes.len() + 2);
            out.push('"');
            for &b in bytes {
                match b {
                    b'\\' => out.push_str("\\\\"),
                    b'"' => out.push_str("\\\""),
                    b'\n' => out.push_str("\\n"),
                    0x20..=0x7E => out.push(b as char),
                    _ => {
                        let _ = write!(out, "\\x{:02x}", b);
                    }
                }
            }
            out.push('"');
            out
        }
    }
}
