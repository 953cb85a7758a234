//! Turning raw input into the DER payloads to render.
//!
//! Input is taken verbatim by default. It can instead be read as hex text, as
//! the first PEM block or as every PEM block; PEM takes precedence over hex.
//! Encrypted PEM blocks are decrypted lazily, one at a time, so a renderer
//! can emit earlier blocks before a later one fails.

use super::hex::decode_loose_hex;
use super::pem::{decode_all, decode_first, PemBlock};
use crate::error::{Error, Result};
use std::borrow::Cow;
use tracing::debug;

/// How PEM framing in the input is treated
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PemMode {
    /// Input is not PEM
    #[default]
    Off,
    /// Decode the first PEM block only
    First,
    /// Decode every PEM block, labelling each with a comment
    All,
}

/// Options describing how to interpret DER input
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerRequest {
    /// PEM handling
    pub pem: PemMode,
    /// Password for legacy encrypted PEM blocks
    pub password: Option<String>,
    /// Treat input as hex text
    pub hex: bool,
}

impl DerRequest {
    /// Creates a request that reads raw DER
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode the first PEM block. Does not downgrade an all-blocks request.
    pub fn pem(mut self, enabled: bool) -> Self {
        if enabled && self.pem == PemMode::Off {
            self.pem = PemMode::First;
        }
        self
    }

    /// Decode every PEM block
    pub fn pem_all(mut self, enabled: bool) -> Self {
        if enabled {
            self.pem = PemMode::All;
        }
        self
    }

    /// Sets the PEM password; an empty password counts as none
    pub fn password(mut self, password: impl Into<String>) -> Self {
        let password = password.into();
        self.password = (!password.is_empty()).then_some(password);
        self
    }

    /// Read input as hex text
    pub fn hex(mut self, enabled: bool) -> Self {
        self.hex = enabled;
        self
    }
}

#[derive(Debug, Clone)]
enum Payload {
    Raw(Vec<u8>),
    Pem {
        block: PemBlock,
        password: Option<String>,
    },
}

/// One DER payload to render, with an optional comment line
#[derive(Debug, Clone)]
pub struct DerSource {
    comment: Option<String>,
    payload: Payload,
}

impl DerSource {
    /// Comment printed above this payload (the PEM label in all-blocks mode)
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Returns the DER bytes. With a password the PEM block is always
    /// decrypted, so a block without a `DEK-Info` header fails.
    pub fn bytes(&self) -> Result<Cow<'_, [u8]>> {
        match &self.payload {
            Payload::Raw(bytes) => Ok(Cow::Borrowed(bytes)),
            Payload::Pem {
                block,
                password: Some(password),
            } => Ok(Cow::Owned(block.decrypt(password.as_bytes())?)),
            Payload::Pem { block, password: None } => Ok(Cow::Borrowed(&block.contents)),
        }
    }
}

/// Splits `input` into the payloads described by `request`.
///
/// Fails on a password without a PEM mode, on a PEM mode that finds no block
/// (with a different error for each mode), and on undecodable hex.
pub fn prepare(input: &[u8], request: &DerRequest) -> Result<Vec<DerSource>> {
    if request.password.is_some() && request.pem == PemMode::Off {
        return Err(Error::PasswordWithoutPem);
    }

    match request.pem {
        PemMode::All => {
            let blocks = decode_all(input);
            debug!("Found {} PEM blocks", blocks.len());
            if blocks.is_empty() {
                return Err(Error::NoPemBlocks);
            }
            Ok(blocks
                .into_iter()
                .map(|block| DerSource {
                    comment: Some(block.label.clone()),
                    payload: Payload::Pem {
                        block,
                        password: request.password.clone(),
                    },
                })
                .collect())
        }
        PemMode::First => {
            let (block, _) = decode_first(input).ok_or(Error::NoPemBlock)?;
            debug!("Using PEM block '{}'", block.label);
            Ok(vec![DerSource {
                comment: None,
                payload: Payload::Pem {
                    block,
                    password: request.password.clone(),
                },
            }])
        }
        PemMode::Off if request.hex => Ok(vec![DerSource {
            comment: None,
            payload: Payload::Raw(decode_loose_hex(input)?),
        }]),
        PemMode::Off => Ok(vec![DerSource {
            comment: None,
            payload: Payload::Raw(input.to_vec()),
        }]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::der::pem::tests::ENCRYPTED_AES;
    use pretty_assertions::assert_eq;

    const TWO_BLOCKS: &str = "-----BEGIN FIRST-----\nMAMCAQE=\n-----END FIRST-----\n\
                              -----BEGIN SECOND-----\nBQA=\n-----END SECOND-----\n";

    #[test]
    fn test_raw_input() {
        let sources = prepare(&[0x05, 0x00], &DerRequest::new()).unwrap();
        assert_eq!(sources.len(), 1);
        assert_eq!(sources[0].comment(), None);
        assert_eq!(&*sources[0].bytes().unwrap(), &[0x05, 0x00]);
    }

    #[test]
    fn test_hex_input() {
        let sources = prepare(b"05 00\n", &DerRequest::new().hex(true)).unwrap();
        assert_eq!(&*sources[0].bytes().unwrap(), &[0x05, 0x00]);

        let err = prepare(b"050", &DerRequest::new().hex(true)).unwrap_err();
        assert!(matches!(err, Error::InvalidHex { .. }));
    }

    #[test]
    fn test_pem_modes() {
        let first = prepare(TWO_BLOCKS.as_bytes(), &DerRequest::new().pem(true)).unwrap();
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].comment(), None);

        let all = prepare(TWO_BLOCKS.as_bytes(), &DerRequest::new().pem_all(true)).unwrap();
        let labels: Vec<_> = all.iter().map(|s| s.comment().unwrap()).collect();
        assert_eq!(labels, vec!["FIRST", "SECOND"]);
    }

    #[test]
    fn test_pem_wins_over_hex() {
        let request = DerRequest::new().pem(true).hex(true);
        let sources = prepare(TWO_BLOCKS.as_bytes(), &request).unwrap();
        assert_eq!(&*sources[0].bytes().unwrap(), &[0x30, 0x03, 0x02, 0x01, 0x01]);
    }

    #[test]
    fn test_missing_pem_errors_differ() {
        let first = prepare(b"nothing", &DerRequest::new().pem(true)).unwrap_err();
        let all = prepare(b"nothing", &DerRequest::new().pem_all(true)).unwrap_err();
        assert!(matches!(first, Error::NoPemBlock));
        assert!(matches!(all, Error::NoPemBlocks));
    }

    #[test]
    fn test_password_requires_pem() {
        let err = prepare(b"", &DerRequest::new().password("secret")).unwrap_err();
        assert!(matches!(err, Error::PasswordWithoutPem));

        // An empty password is no password
        assert!(prepare(&[0x05, 0x00], &DerRequest::new().password("")).is_ok());
    }

    #[test]
    fn test_lazy_decryption() {
        let request = DerRequest::new().pem(true).password("secret");
        let sources = prepare(ENCRYPTED_AES.as_bytes(), &request).unwrap();
        assert_eq!(&*sources[0].bytes().unwrap(), &[0x30, 0x03, 0x02, 0x01, 0x01]);

        let request = DerRequest::new().pem(true).password("wrong");
        let sources = prepare(ENCRYPTED_AES.as_bytes(), &request).unwrap();
        assert!(sources[0].bytes().is_err());

        // Without a password the ciphertext is passed through
        let sources = prepare(ENCRYPTED_AES.as_bytes(), &DerRequest::new().pem(true)).unwrap();
        assert_eq!(sources[0].bytes().unwrap().len(), 16);
    }

    #[test]
    fn test_password_on_plain_block_fails() {
        let plain = b"-----BEGIN X-----\nMAMCAQE=\n-----END X-----\n";
        let request = DerRequest::new().pem(true).password("secret");
        let sources = prepare(plain, &request).unwrap();
        let err = sources[0].bytes().unwrap_err();
        assert!(matches!(err, Error::PemDecrypt { .. }));
        assert!(err.to_string().contains("no DEK-Info header"));

        let request = DerRequest::new().pem_all(true).password("secret");
        let sources = prepare(TWO_BLOCKS.as_bytes(), &request).unwrap();
        assert!(sources.iter().all(|source| source.bytes().is_err()));
    }
}
