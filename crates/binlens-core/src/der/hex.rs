//! Hex input pre-processing.

use crate::error::{Error, Result};
use unicode_general_category::{get_general_category, GeneralCategory};

/// Decodes hex text after dropping whitespace and punctuation, so dumps like
/// `30:03:02:01:01` or `30 03 02 01 01` are accepted. Punctuation means the
/// Unicode `P*` categories; symbols such as `+` or `=` are kept and rejected.
pub fn decode_loose_hex(input: &[u8]) -> Result<Vec<u8>> {
    let text = String::from_utf8_lossy(input);
    let digits: String = text
        .chars()
        .filter(|&c| !(c.is_whitespace() || is_punctuation(c)))
        .collect();
    decode_hex(&digits)
}

fn is_punctuation(c: char) -> bool {
    matches!(
        get_general_category(c),
        GeneralCategory::ConnectorPunctuation
            | GeneralCategory::DashPunctuation
            | GeneralCategory::OpenPunctuation
            | GeneralCategory::ClosePunctuation
            | GeneralCategory::InitialPunctuation
            | GeneralCategory::FinalPunctuation
            | GeneralCategory::OtherPunctuation
    )
}

/// Strict hex decoding. Invalid characters are reported before odd length.
pub fn decode_hex(digits: &str) -> Result<Vec<u8>> {
    if let Some((index, c)) = digits.char_indices().find(|(_, c)| !c.is_ascii_hexdigit()) {
        return Err(Error::invalid_hex(format!(
            "invalid character {:?} at position {}",
            c, index
        )));
    }
    if digits.len() % 2 != 0 {
        return Err(Error::invalid_hex("odd length hex string"));
    }

    Ok(digits
        .as_bytes()
        .chunks_exact(2)
        .map(|pair| (hex_value(pair[0]) << 4) | hex_value(pair[1]))
        .collect())
}

fn hex_value(digit: u8) -> u8 {
    match digit {
        b'0'..=b'9' => digit - b'0',
        b'a'..=b'f' => digit - b'a' + 10,
        b'A'..=b'F' => digit - b'A' + 10,
        _ => 0,
    }
}
