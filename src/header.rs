// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{config::CompressionMethod, Msn, Nid, Result};
use parking_lot::Mutex;

/// The tree's persisted header: root identity, height and the two global
/// counters.
///
/// Exact byte layout is delegated to the (external) serialization
/// collaborator; this crate only requires that a `Header` round-trips
/// through a [`HeaderStore`] and that `root_nid` is stable across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    /// The NID of the current root node. Constant from `open` to `free`.
    pub root_nid: Nid,

    /// The tree's height: 0 for a tree whose root is a leaf.
    pub height: u32,

    /// The most recently allocated NID.
    pub last_nid: Nid,

    /// The most recently allocated MSN.
    pub last_msn: Msn,

    /// Compression method recorded at `open` time.
    pub compression_method: CompressionMethod,
}

/// The header (de)serialization collaborator's interface.
///
/// Real persistence is out of scope for this crate; [`InMemoryHeaderStore`]
/// is the one concrete implementation, used by the default, in-memory
/// [`crate::MemNodeCache`]-backed tree.
pub trait HeaderStore: Send + Sync {
    /// Fetches the previously persisted header.
    ///
    /// # Errors
    ///
    /// Returns an error if no header has ever been persisted, or if the
    /// backing store can't be read.
    fn fetch(&self) -> Result<Header>;

    /// Persists `header`, replacing whatever was previously stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store can't be written.
    fn persist(&self, header: &Header) -> Result<()>;
}

/// An in-memory [`HeaderStore`] that never actually touches disk.
#[derive(Debug, Default)]
pub struct InMemoryHeaderStore {
    slot: Mutex<Option<Header>>,
}

impl HeaderStore for InMemoryHeaderStore {
    fn fetch(&self) -> Result<Header> {
        (*self.slot.lock())
            .ok_or_else(|| crate::Error::Cache("no header has been persisted yet".into()))
    }

    fn persist(&self, header: &Header) -> Result<()> {
        *self.slot.lock() = Some(*header);
        Ok(())
    }
}
