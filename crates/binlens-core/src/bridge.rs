//! Host-facing dispatcher.
//!
//! A host that cannot catch structured errors calls [`Bridge::call`] with an
//! operation name and a slice of loosely-typed [`HostValue`]s. Arity and
//! argument shapes are validated before any decoder runs, and every outcome,
//! failures included, comes back as a [`Reply`] value:
//!
//! ```
//! use binlens_core::bridge::{Bridge, HostValue, Output};
//! use binlens_core::BlobRegistry;
//!
//! let registry = BlobRegistry::new();
//! let bridge = Bridge::new(&registry);
//!
//! let reply = bridge.call("decodeDer", &[HostValue::from(vec![0x05, 0x00])]);
//! assert_eq!(reply.unwrap(), Output::Text("NULL {}\n".to_string()));
//!
//! let fault = bridge.call("listClasses", &[HostValue::Int(7)]).unwrap_err();
//! assert_eq!(fault.kind.as_str(), "NotFound");
//! ```
//!
//! The typed methods on [`Bridge`] are the same operations for Rust callers.

use crate::der::{self, DerRequest};
use crate::dex::{self, Instruction, MethodDescriptor};
use crate::error::{Error, ErrorKind, Result};
use crate::registry::{BlobHandle, BlobRegistry};
use crate::wire;
use bytes::Bytes;
use std::fmt;
use std::ops::RangeInclusive;
use tracing::debug;

/// A value crossing the host boundary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostValue {
    /// `null` or `undefined`; counts as omitted in optional positions
    Null,
    /// Boolean flag
    Bool(bool),
    /// Integer, used for handles
    Int(i64),
    /// Text, used for class, method and message names and passwords
    Str(String),
    /// Raw bytes
    Bytes(Bytes),
}

impl HostValue {
    /// Name of the value's shape, as used in argument errors
    pub fn type_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Int(_) => "integer",
            HostValue::Str(_) => "string",
            HostValue::Bytes(_) => "bytes",
        }
    }

    /// Returns true for [`HostValue::Null`]
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }
}

impl From<bool> for HostValue {
    fn from(value: bool) -> Self {
        HostValue::Bool(value)
    }
}

impl From<i64> for HostValue {
    fn from(value: i64) -> Self {
        HostValue::Int(value)
    }
}

impl From<&str> for HostValue {
    fn from(value: &str) -> Self {
        HostValue::Str(value.to_string())
    }
}

impl From<String> for HostValue {
    fn from(value: String) -> Self {
        HostValue::Str(value)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(value: Vec<u8>) -> Self {
        HostValue::Bytes(value.into())
    }
}

impl From<&[u8]> for HostValue {
    fn from(value: &[u8]) -> Self {
        HostValue::Bytes(Bytes::copy_from_slice(value))
    }
}

impl From<Bytes> for HostValue {
    fn from(value: Bytes) -> Self {
        HostValue::Bytes(value)
    }
}

impl From<BlobHandle> for HostValue {
    fn from(handle: BlobHandle) -> Self {
        // Handles are issued sequentially and never approach i64::MAX
        HostValue::Int(i64::try_from(handle.get()).unwrap_or(i64::MAX))
    }
}

/// Successful result of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// A freshly issued blob handle
    Handle(BlobHandle),
    /// A sequence of lines (class names, signatures, instructions)
    Lines(Vec<String>),
    /// A rendered text document
    Text(String),
}

/// Category of a [`Fault`], named the way hosts see it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultKind {
    /// Wrong arity or argument shape
    ArgumentError,
    /// Unknown handle, class or method
    NotFound,
    /// Input that could not be decoded
    DecodeError,
    /// File access failure
    IoError,
}

impl FaultKind {
    /// Host-visible name of this kind
    pub fn as_str(&self) -> &'static str {
        ErrorKind::from(*self).as_str()
    }
}

impl From<ErrorKind> for FaultKind {
    fn from(kind: ErrorKind) -> Self {
        match kind {
            ErrorKind::Argument => FaultKind::ArgumentError,
            ErrorKind::NotFound => FaultKind::NotFound,
            ErrorKind::Decode => FaultKind::DecodeError,
            ErrorKind::Io => FaultKind::IoError,
        }
    }
}

impl From<FaultKind> for ErrorKind {
    fn from(kind: FaultKind) -> Self {
        match kind {
            FaultKind::ArgumentError => ErrorKind::Argument,
            FaultKind::NotFound => ErrorKind::NotFound,
            FaultKind::DecodeError => ErrorKind::Decode,
            FaultKind::IoError => ErrorKind::Io,
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed operation, tagged for the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fault {
    /// Machine-readable category
    pub kind: FaultKind,
    /// The error message, verbatim
    pub message: String,
}

impl From<Error> for Fault {
    fn from(err: Error) -> Self {
        Self {
            kind: err.kind().into(),
            message: err.to_string(),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

/// Outcome of [`Bridge::call`]
pub type Reply = std::result::Result<Output, Fault>;

/// The exported operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `createBlob(bytes) -> handle`
    CreateBlob,
    /// `listClasses(handle) -> lines`
    ListClasses,
    /// `listMethods(handle, className) -> lines`
    ListMethods,
    /// `listInstructions(handle, className, methodName) -> lines`
    ListInstructions,
    /// `decodeDer(bytes, pem?, pemAll?, pemPassword?, hex?) -> text`
    DecodeDer,
    /// `decodeProto(bytes[, schemaBytes, messageName]) -> text`
    DecodeProto,
}

impl Operation {
    /// Every operation, in documentation order
    pub const ALL: [Operation; 6] = [
        Operation::CreateBlob,
        Operation::ListClasses,
        Operation::ListMethods,
        Operation::ListInstructions,
        Operation::DecodeDer,
        Operation::DecodeProto,
    ];

    /// The exported name
    pub fn name(self) -> &'static str {
        match self {
            Operation::CreateBlob => "createBlob",
            Operation::ListClasses => "listClasses",
            Operation::ListMethods => "listMethods",
            Operation::ListInstructions => "listInstructions",
            Operation::DecodeDer => "decodeDer",
            Operation::DecodeProto => "decodeProto",
        }
    }

    /// Looks an operation up by its exported name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.name() == name)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dispatches exported operations against a blob registry
#[derive(Debug, Clone, Copy)]
pub struct Bridge<'r> {
    registry: &'r BlobRegistry,
}

impl Bridge<'static> {
    /// A bridge over the process-wide registry
    pub fn global() -> Self {
        Self::new(BlobRegistry::global())
    }
}

impl<'r> Bridge<'r> {
    /// Creates a bridge over `registry`
    pub fn new(registry: &'r BlobRegistry) -> Self {
        Self { registry }
    }

    /// The registry this bridge reads from and writes to
    pub fn registry(&self) -> &'r BlobRegistry {
        self.registry
    }

    /// Runs the operation named `operation`. Never panics on bad input.
    pub fn call(&self, operation: &str, args: &[HostValue]) -> Reply {
        let Some(op) = Operation::from_name(operation) else {
            debug!("Rejected unknown operation '{}'", operation);
            return Err(Error::invalid_argument(operation, "unknown operation").into());
        };

        debug!("Dispatching {} with {} arguments", op, args.len());
        self.dispatch(op, args).map_err(|err| {
            debug!("{} failed: {}", op, err);
            Fault::from(err)
        })
    }

    fn dispatch(&self, op: Operation, values: &[HostValue]) -> Result<Output> {
        let args = Args { op, values };
        match op {
            Operation::CreateBlob => {
                args.arity(1..=1)?;
                let bytes = args.bytes(0, "blob bytes")?;
                Ok(Output::Handle(self.create_blob(bytes.clone())))
            }
            Operation::ListClasses => {
                args.arity(1..=1)?;
                let handle = args.handle(0)?;
                self.list_classes(handle).map(Output::Lines)
            }
            Operation::ListMethods => {
                args.arity(2..=2)?;
                let handle = args.handle(0)?;
                let class_name = args.string(1, "class name")?;
                self.list_methods(handle, class_name).map(Output::Lines)
            }
            Operation::ListInstructions => {
                args.arity(3..=3)?;
                let handle = args.handle(0)?;
                let class_name = args.string(1, "class name")?;
                let method_name = args.string(2, "method name")?;
                self.list_instructions(handle, class_name, method_name)
                    .map(Output::Lines)
            }
            Operation::DecodeDer => {
                args.arity(1..=5)?;
                let input = args.bytes(0, "input bytes")?;
                let mut request = DerRequest::new()
                    .pem(args.flag(1, "PEM mode")?)
                    .pem_all(args.flag(2, "all-blocks PEM mode")?)
                    .hex(args.flag(4, "hex mode")?);
                if let Some(password) = args.optional_string(3, "PEM password")? {
                    request = request.password(password);
                }
                self.decode_der(input, &request).map(Output::Text)
            }
            Operation::DecodeProto => {
                if values.len() == 2 {
                    return Err(Error::invalid_argument(
                        op.name(),
                        "invalid number of arguments: expected 1 (protobuf bytes) or 3 \
                         (protobuf bytes, message descriptor bytes, message name string), got 2",
                    ));
                }
                if values.len() != 1 && values.len() != 3 {
                    return Err(Error::invalid_argument(
                        op.name(),
                        format!("invalid number of arguments: expected 1 or 3, got {}", values.len()),
                    ));
                }
                let data = args.bytes(0, "protobuf bytes")?;

                // A null schema means plain rendering; the name is then ignored
                let schema = match args.optional_bytes(1, "message descriptor bytes")? {
                    Some(schema) => Some((&schema[..], args.string(2, "message name")?)),
                    None => None,
                };
                self.decode_proto(data, schema).map(Output::Text)
            }
        }
    }

    /// Stores `bytes` and returns their handle
    pub fn create_blob(&self, bytes: impl Into<Bytes>) -> BlobHandle {
        self.registry.put(bytes)
    }

    /// Class names of the container under `handle`
    pub fn list_classes(&self, handle: BlobHandle) -> Result<Vec<String>> {
        let blob = self.registry.get(handle)?;
        dex::list_classes(&blob)
    }

    /// Formatted signatures of `class_name`'s methods, direct then virtual
    pub fn list_methods(&self, handle: BlobHandle, class_name: &str) -> Result<Vec<String>> {
        let blob = self.registry.get(handle)?;
        let methods = dex::list_methods(&blob, class_name)?;
        Ok(methods.iter().map(MethodDescriptor::signature).collect())
    }

    /// Rendered instruction lines of a method; empty if it has no code
    pub fn list_instructions(
        &self,
        handle: BlobHandle,
        class_name: &str,
        method_name: &str,
    ) -> Result<Vec<String>> {
        let blob = self.registry.get(handle)?;
        let instructions = dex::list_instructions(&blob, class_name, method_name)?;
        Ok(instructions.iter().map(Instruction::text).collect())
    }

    /// Renders DER input after the pre-processing `request` describes
    pub fn decode_der(&self, input: &[u8], request: &DerRequest) -> Result<String> {
        der::decode(input, request)
    }

    /// Renders a protobuf message, optionally against a schema and the name of
    /// the message type inside it
    pub fn decode_proto(&self, data: &[u8], schema: Option<(&[u8], &str)>) -> Result<String> {
        match schema {
            Some((schema, message_name)) => wire::decode(data, Some(schema), Some(message_name)),
            None => wire::decode(data, None, None),
        }
    }
}

/// Positional argument accessors for one call
struct Args<'a> {
    op: Operation,
    values: &'a [HostValue],
}

impl<'a> Args<'a> {
    fn arity(&self, expected: RangeInclusive<usize>) -> Result<()> {
        if expected.contains(&self.values.len()) {
            return Ok(());
        }
        let details = if expected.start() == expected.end() {
            format!(
                "invalid number of arguments: expected {}, got {}",
                expected.start(),
                self.values.len()
            )
        } else {
            format!(
                "invalid number of arguments: expected {} to {}, got {}",
                expected.start(),
                expected.end(),
                self.values.len()
            )
        };
        Err(Error::invalid_argument(self.op.name(), details))
    }

    fn shape_error(&self, index: usize, what: &str, expected: &str) -> Error {
        let found = self.values.get(index).map_or("nothing", HostValue::type_name);
        Error::invalid_argument(
            self.op.name(),
            format!(
                "argument {} ({}) must be {}, got {}",
                index + 1,
                what,
                expected,
                found
            ),
        )
    }

    fn bytes(&self, index: usize, what: &str) -> Result<&'a Bytes> {
        match self.values.get(index) {
            Some(HostValue::Bytes(bytes)) => Ok(bytes),
            _ => Err(self.shape_error(index, what, "bytes")),
        }
    }

    fn optional_bytes(&self, index: usize, what: &str) -> Result<Option<&'a Bytes>> {
        match self.values.get(index) {
            None | Some(HostValue::Null) => Ok(None),
            Some(HostValue::Bytes(bytes)) => Ok(Some(bytes)),
            Some(_) => Err(self.shape_error(index, what, "bytes")),
        }
    }

    fn string(&self, index: usize, what: &str) -> Result<&'a str> {
        match self.values.get(index) {
            Some(HostValue::Str(s)) => Ok(s),
            _ => Err(self.shape_error(index, what, "a string")),
        }
    }

    fn optional_string(&self, index: usize, what: &str) -> Result<Option<&'a str>> {
        match self.values.get(index) {
            None | Some(HostValue::Null) => Ok(None),
            Some(HostValue::Str(s)) => Ok(Some(s)),
            Some(_) => Err(self.shape_error(index, what, "a string")),
        }
    }

    /// An omitted flag is false
    fn flag(&self, index: usize, what: &str) -> Result<bool> {
        match self.values.get(index) {
            None | Some(HostValue::Null) => Ok(false),
            Some(HostValue::Bool(b)) => Ok(*b),
            Some(_) => Err(self.shape_error(index, what, "a boolean")),
        }
    }

    fn handle(&self, index: usize) -> Result<BlobHandle> {
        match self.values.get(index) {
            Some(HostValue::Int(value)) => u64::try_from(*value)
                .map(BlobHandle::from_raw)
                .map_err(|_| self.shape_error(index, "blob handle", "a non-negative integer")),
            _ => Err(self.shape_error(index, "blob handle", "an integer")),
        }
    }
}
