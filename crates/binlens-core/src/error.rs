//! Error types for the binlens-core library.
//!
//! Every failure in the crate is a variant of [`Error`]. Variants are grouped
//! into four broad categories ([`ErrorKind`]) that the host boundary uses to
//! tag its replies: bad arguments, missing entities, undecodable input and
//! I/O.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for binlens operations
pub type Result<T> = std::result::Result<T, Error>;

/// Coarse classification of an [`Error`], stable across releases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Wrong arity or argument shape at the host boundary
    Argument,
    /// Unknown handle, class or method
    NotFound,
    /// Malformed container, schema, hex or PEM input
    Decode,
    /// File open/read/write failure, raised by the CLI only
    Io,
}

impl ErrorKind {
    /// Returns the name used for this kind on the host boundary
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Argument => "ArgumentError",
            ErrorKind::NotFound => "NotFound",
            ErrorKind::Decode => "DecodeError",
            ErrorKind::Io => "IOError",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comprehensive error type for all binlens operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to open or read an input file
    #[error("failed to read file '{path}': {source}")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or write an output file
    #[error("failed to write file '{path}': {source}")]
    FileWrite {
        /// Path to the file that failed to write
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// An exported operation was called with the wrong arguments
    #[error("{operation}: {details}")]
    InvalidArgument {
        /// Name of the exported operation
        operation: String,
        /// What was wrong with the arguments
        details: String,
    },

    /// No blob was ever registered under this handle
    #[error("no blob registered under handle {handle}")]
    HandleNotFound {
        /// The unknown handle
        handle: u64,
    },

    /// No class with this exact name exists in the container
    #[error("class '{name}' not found")]
    ClassNotFound {
        /// The requested class name
        name: String,
    },

    /// The class exists but declares no method with this exact name
    #[error("method '{method}' not found in class '{class}'")]
    MethodNotFound {
        /// The class that was searched
        class: String,
        /// The requested method name
        method: String,
    },

    /// Malformed DEX container
    #[error("malformed dex container at offset {offset:#x}: {details}")]
    MalformedDex {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Invalid protobuf wire format
    #[error("invalid protobuf wire format at offset {offset}: {details}")]
    InvalidWireFormat {
        /// Byte offset where the error occurred
        offset: usize,
        /// Detailed description of the issue
        details: String,
    },

    /// Failed to decode varint
    #[error("failed to decode varint at offset {offset}: buffer too small or invalid encoding")]
    VarintDecode {
        /// Byte offset where the error occurred
        offset: usize,
    },

    /// Schema bytes were supplied but empty
    #[error("message descriptor bytes are empty")]
    EmptySchema,

    /// A schema was supplied without a message name
    #[error("message name is empty")]
    EmptyMessageName,

    /// Schema bytes are not a valid `FileDescriptorSet`
    #[error("failed to parse message descriptor set: {0}")]
    SchemaParse(#[from] prost_reflect::DescriptorError),

    /// The schema has no element with this name
    #[error("message '{name}' not found in schema")]
    MessageNotFound {
        /// Fully-qualified name that was looked up
        name: String,
    },

    /// The name resolves, but not to a message type
    #[error("descriptor for '{name}' is a {found}, not a message descriptor")]
    NotAMessage {
        /// Fully-qualified name that was looked up
        name: String,
        /// What the name resolved to instead
        found: &'static str,
    },

    /// Hex input could not be decoded
    #[error("invalid hex input: {details}")]
    InvalidHex {
        /// Detailed description of the issue
        details: String,
    },

    /// Single-block PEM mode found no block
    #[error("input could not be parsed as PEM")]
    NoPemBlock,

    /// All-blocks PEM mode found no block
    #[error("input contains no parsable PEM blocks")]
    NoPemBlocks,

    /// A PEM block could not be decrypted
    #[error("failed to decrypt PEM block: {details}")]
    PemDecrypt {
        /// Detailed description of the issue
        details: String,
    },

    /// A password was given without a PEM mode to apply it to
    #[error("a PEM password was provided, but neither single-block nor all-blocks PEM mode is enabled")]
    PasswordWithoutPem,

}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new file write error
    pub fn file_write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileWrite {
            path: path.into(),
            source,
        }
    }

    /// Creates a new argument error for the given operation
    pub fn invalid_argument(operation: impl Into<String>, details: impl Into<String>) -> Self {
        Self::InvalidArgument {
            operation: operation.into(),
            details: details.into(),
        }
    }

    /// Creates a new class lookup error
    pub fn class_not_found(name: impl Into<String>) -> Self {
        Self::ClassNotFound { name: name.into() }
    }

    /// Creates a new method lookup error
    pub fn method_not_found(class: impl Into<String>, method: impl Into<String>) -> Self {
        Self::MethodNotFound {
            class: class.into(),
            method: method.into(),
        }
    }

    /// Creates a new malformed container error
    pub fn malformed_dex(offset: usize, details: impl Into<String>) -> Self {
        Self::MalformedDex {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new wire format error
    pub fn invalid_wire_format(offset: usize, details: impl Into<String>) -> Self {
        Self::InvalidWireFormat {
            offset,
            details: details.into(),
        }
    }

    /// Creates a new varint decode error
    pub fn varint_decode(offset: usize) -> Self {
        Self::VarintDecode { offset }
    }

    /// Creates a new hex decode error
    pub fn invalid_hex(details: impl Into<String>) -> Self {
        Self::InvalidHex {
            details: details.into(),
        }
    }

    /// Creates a new PEM decryption error
    pub fn pem_decrypt(details: impl Into<String>) -> Self {
        Self::PemDecrypt {
            details: details.into(),
        }
    }

    /// Returns the boundary category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileRead { .. } | Self::FileWrite { .. } => ErrorKind::Io,
            Self::InvalidArgument { .. } | Self::PasswordWithoutPem => ErrorKind::Argument,
            Self::HandleNotFound { .. } | Self::ClassNotFound { .. } | Self::MethodNotFound { .. } => {
                ErrorKind::NotFound
            }
            Self::MalformedDex { .. }
            | Self::InvalidWireFormat { .. }
            | Self::VarintDecode { .. }
            | Self::EmptySchema
            | Self::EmptyMessageName
            | Self::SchemaParse(_)
            | Self::MessageNotFound { .. }
            | Self::NotAMessage { .. }
            | Self::InvalidHex { .. }
            | Self::NoPemBlock
            | Self::NoPemBlocks
            | Self::PemDecrypt { .. } => ErrorKind::Decode,
        }
    }
}
