//! Little-endian cursor, ULEB128 and MUTF-8 decoding.

use crate::error::{Error, Result};

/// Bounds-checked little-endian reader over a container
#[derive(Debug, Clone)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    position: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8], position: usize) -> Self {
        Self { data, position }
    }

    pub(crate) fn position(&self) -> usize {
        self.position
    }

    fn take(&mut self, len: usize, what: &str) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| Error::malformed_dex(self.position, format!("truncated {}", what)))?;
        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub(crate) fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1, "byte")?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16> {
        let bytes = self.take(2, "u16")?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn u32(&mut self) -> Result<u32> {
        let bytes = self.take(4, "u32")?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    /// Reads an unsigned LEB128 value of at most five bytes
    pub(crate) fn uleb128(&mut self) -> Result<u32> {
        let start = self.position;
        let mut result: u32 = 0;
        for i in 0..5 {
            let byte = self.u8()?;
            result |= ((byte & 0x7F) as u32) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
        Err(Error::malformed_dex(start, "uleb128 value longer than five bytes"))
    }

    /// Reads `count` 16-bit code units
    pub(crate) fn code_units(&mut self, count: usize) -> Result<Vec<u16>> {
        let len = count
            .checked_mul(2)
            .ok_or_else(|| Error::malformed_dex(self.position, "code size overflows"))?;
        let bytes = self.take(len, "code units")?;
        Ok(bytes
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .collect())
    }

    /// Reads a NUL-terminated MUTF-8 string
    pub(crate) fn mutf8(&mut self) -> Result<String> {
        let rest = &self.data[self.position.min(self.data.len())..];
        let len = rest
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| Error::malformed_dex(self.position, "unterminated string data"))?;
        let text = decode_mutf8(&rest[..len]);
        self.position += len + 1;
        Ok(text)
    }
}

/// Decodes modified UTF-8: every one-to-three byte sequence is one UTF-16 code
/// unit, surrogate pairs are encoded separately, and NUL is `C0 80`. Invalid
/// sequences decode to U+FFFD.
pub fn decode_mutf8(bytes: &[u8]) -> String {
    let mut units: Vec<u16> = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        let start = i;
        let continuation = |offset: usize| {
            bytes
                .get(start + offset)
                .filter(|&&c| c & 0xC0 == 0x80)
                .map(|&c| (c & 0x3F) as u16)
        };

        if b < 0x80 {
            units.push(b as u16);
            i += 1;
        } else if b & 0xE0 == 0xC0 {
            match continuation(1) {
                Some(c1) => {
                    units.push((((b & 0x1F) as u16) << 6) | c1);
                    i += 2;
                }
                None => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else if b & 0xF0 == 0xE0 {
            match (continuation(1), continuation(2)) {
                (Some(c1), Some(c2)) => {
                    units.push((((b & 0x0F) as u16) << 12) | (c1 << 6) | c2);
                    i += 3;
                }
                _ => {
                    units.push(0xFFFD);
                    i += 1;
                }
            }
        } else {
            units.push(0xFFFD);
            i += 1;
        }
    }
    String::from_utf16_lossy(&units)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_width() {
        let data = [0x01, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12];
        let mut reader = Reader::new(&data, 0);
        assert_eq!(reader.u8().unwrap(), 0x01);
        assert_eq!(reader.u16().unwrap(), 0x1234);
        assert_eq!(reader.u32().unwrap(), 0x1234_5678);
        assert!(reader.u8().is_err());
    }

    #[test]
    fn test_uleb128() {
        let data = [0x00, 0x7F, 0x80, 0x7F, 0xE5, 0x8E, 0x26];
        let mut reader = Reader::new(&data, 0);
        assert_eq!(reader.uleb128().unwrap(), 0);
        assert_eq!(reader.uleb128().unwrap(), 127);
        assert_eq!(reader.uleb128().unwrap(), 16256);
        assert_eq!(reader.uleb128().unwrap(), 624_485);
        assert_eq!(reader.position(), 7);

        let data = [0x80, 0x80, 0x80, 0x80, 0x80, 0x01];
        assert!(Reader::new(&data, 0).uleb128().is_err());
    }

    #[test]
    fn test_mutf8() {
        assert_eq!(decode_mutf8(b"hello"), "hello");
        assert_eq!(decode_mutf8(&[0x61, 0xC0, 0x80, 0x62]), "a\0b");
        assert_eq!(decode_mutf8("é€".as_bytes()), "é€");
        // U+1F600 as two encoded surrogates
        assert_eq!(
            decode_mutf8(&[0xED, 0xA0, 0xBD, 0xED, 0xB8, 0x80]),
            "\u{1F600}"
        );
        assert_eq!(decode_mutf8(&[0xFF]), "\u{FFFD}");
    }

    #[test]
    fn test_string_data() {
        let data = [0x05, b'h', b'e', b'l', b'l', b'o', 0x00];
        let mut reader = Reader::new(&data, 1);
        assert_eq!(reader.mutf8().unwrap(), "hello");
        assert_eq!(reader.position(), 7);

        assert!(Reader::new(b"abc", 0).mutf8().is_err());
    }
}
