//! Handle-addressed storage for uploaded blobs.
//!
//! The registry is an append-only arena: [`BlobRegistry::put`] pushes the bytes
//! and returns the index as a [`BlobHandle`]. Nothing is ever evicted, so a
//! handle stays valid for the lifetime of the registry and is never reused.
//! Memory grows with every upload; hosts that upload many large blobs should
//! use a scoped [`BlobRegistry`] rather than the process-wide one.
//!
//! Only raw bytes are stored. Decoders re-parse on every query.

use crate::error::{Error, Result};
use bytes::Bytes;
use parking_lot::Mutex;
use std::fmt;
use std::sync::OnceLock;
use tracing::{debug, trace};

/// Opaque identifier for a registered blob. Handles are only minted by
/// [`BlobRegistry::put`] or parsed from host integers inside the crate.
///
/// ```compile_fail
/// let forged = binlens_core::BlobHandle(0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlobHandle(u64);

impl BlobHandle {
    pub(crate) fn from_raw(value: u64) -> Self {
        Self(value)
    }

    /// Returns the raw integer handed to hosts
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Append-only store of immutable byte blobs
#[derive(Debug, Default)]
pub struct BlobRegistry {
    blobs: Mutex<Vec<Bytes>>,
}

impl BlobRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the process-wide registry
    pub fn global() -> &'static BlobRegistry {
        static GLOBAL: OnceLock<BlobRegistry> = OnceLock::new();
        GLOBAL.get_or_init(BlobRegistry::new)
    }

    /// Stores `bytes` and returns a fresh handle for them
    pub fn put(&self, bytes: impl Into<Bytes>) -> BlobHandle {
        let bytes = bytes.into();
        let mut blobs = self.blobs.lock();
        let handle = BlobHandle(blobs.len() as u64);
        debug!("Registered blob {} ({} bytes)", handle, bytes.len());
        blobs.push(bytes);
        handle
    }

    /// Returns the bytes stored under `handle`
    pub fn get(&self, handle: BlobHandle) -> Result<Bytes> {
        let blobs = self.blobs.lock();
        let blob = usize::try_from(handle.0)
            .ok()
            .and_then(|index| blobs.get(index))
            .cloned();

        match blob {
            Some(bytes) => {
                trace!("Resolved blob {} ({} bytes)", handle, bytes.len());
                Ok(bytes)
            }
            None => Err(Error::HandleNotFound { handle: handle.0 }),
        }
    }

    /// Number of blobs registered so far
    pub fn len(&self) -> usize {
        self.blobs.lock().len()
    }

    /// Returns true if nothing has been registered yet
    pub fn is_empty(&self) -> bool {
        self.blobs.lock().is_empty()
    }

    /// Total size of all registered blobs
    pub fn total_bytes(&self) -> usize {
        self.blobs.lock().iter().map(Bytes::len).sum()
    }
}
