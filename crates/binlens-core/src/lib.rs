//! # binlens-core
//!
//! A library for inspecting binary containers and rendering their structure as
//! readable text.
//!
//! This crate provides:
//! - A handle-addressed registry for uploaded blobs
//! - Dalvik executable (DEX) class, method and bytecode listings
//! - DER/BER rendering as an indented ASCII tree, with PEM and hex input
//! - Protobuf wire format rendering, optionally guided by a schema
//!
//! ## Architecture
//!
//! - [`registry`]: Append-only blob storage
//! - [`dex`]: Class-file decoding, signature formatting and instruction rendering
//! - [`der`]: TLV decoding and input pre-processing
//! - [`wire`]: Protobuf wire format decoding
//! - [`bridge`]: Dispatcher for hosts that exchange loosely-typed values
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use binlens_core::der::{decode, DerRequest};
//!
//! let text = decode(b"30 03 02 01 2a", &DerRequest::new().hex(true))?;
//! assert_eq!(text, "SEQUENCE {\n  INTEGER { 42 }\n}\n");
//! # Ok::<(), binlens_core::Error>(())
//! ```
//!
//! Hosts that cannot handle Rust errors go through [`Bridge::call`], which
//! returns every failure as a tagged [`bridge::Fault`] value.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod bridge;
pub mod der;
pub mod dex;
pub mod error;
pub mod registry;
pub mod text;
pub mod wire;

// Re-export primary types for convenience
pub use bridge::{Bridge, Fault, FaultKind, HostValue, Output, Reply};
pub use der::{DerConfig, DerRenderer, DerRequest, PemMode};
pub use dex::{ClassDescriptor, Instruction, MethodDescriptor};
pub use error::{Error, ErrorKind, Result};
pub use registry::{BlobHandle, BlobRegistry};
pub use wire::{WireConfig, WireRenderer};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
