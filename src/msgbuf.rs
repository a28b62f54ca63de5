// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{message::XidPair, Cmd, MessageType, Msn, Slice};
use std::collections::BTreeMap;

/// Fixed per-entry overhead charged against [`MsgBuf::memsize`], covering the
/// MSN, message type tag and `XidPair` that aren't part of `key`/`value`.
const ENTRY_OVERHEAD: usize = std::mem::size_of::<Msn>()
    + std::mem::size_of::<MessageType>()
    + std::mem::size_of::<XidPair>();

#[derive(Debug, Clone)]
struct Entry {
    kind: MessageType,
    value: Slice,
    xidpair: XidPair,
}

/// An ordered, binary-safe multimap of pending messages.
///
/// Entries are ordered by `(key, msn)`: iterating a `MsgBuf` visits all
/// messages for a key in MSN order before moving to the next key. This is
/// the interface the rest of the tree needs (append, in-order iteration,
/// cardinality, a byte-size estimate); how it's internally represented is
/// explicitly out of scope for this crate, so a `BTreeMap` keyed by
/// `(key, msn)` is used rather than a purpose-built structure.
#[derive(Debug, Clone, Default)]
pub struct MsgBuf {
    entries: BTreeMap<(Slice, Msn), Entry>,
    memsize: usize,
}

impl MsgBuf {
    /// Creates a new, empty message buffer.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a message to the buffer.
    ///
    /// Message-merging (e.g. collapsing an `Insert` followed by a `Delete`
    /// of the same key) is not performed here; it's the buffer consumer's
    /// responsibility at read time, per the spec's division of concerns.
    pub fn put(&mut self, msn: Msn, kind: MessageType, key: Slice, value: Slice, xidpair: XidPair) {
        self.memsize += key.len() + value.len() + ENTRY_OVERHEAD;
        self.entries.insert(
            (key, msn),
            Entry {
                kind,
                value,
                xidpair,
            },
        );
    }

    /// Appends a command to the buffer.
    pub fn put_cmd(&mut self, cmd: &Cmd) {
        self.put(
            cmd.msn,
            cmd.kind,
            cmd.key.clone(),
            cmd.value.clone(),
            cmd.xidpair,
        );
    }

    /// The number of messages currently buffered.
    #[must_use]
    pub fn count(&self) -> usize {
        self.entries.len()
    }

    /// `true` if the buffer holds no messages.
    ///
    /// An empty buffer is distinct from "no buffer at all" (every partition
    /// always has a `MsgBuf`, possibly empty).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// An estimate, in bytes, of the buffer's in-memory footprint.
    #[must_use]
    pub fn memsize(&self) -> usize {
        self.memsize
    }

    /// Iterates all messages in order: by key, ties broken by ascending MSN.
    pub fn iter(&self) -> impl Iterator<Item = (Msn, MessageType, &Slice, &Slice, XidPair)> + '_ {
        self.entries
            .iter()
            .map(|((key, msn), entry)| (*msn, entry.kind, key, &entry.value, entry.xidpair))
    }

    /// The first key that would be visited by [`MsgBuf::iter`], if any.
    #[must_use]
    pub fn first_key(&self) -> Option<&Slice> {
        self.entries.keys().next().map(|(key, _)| key)
    }
}

#[cfg(test)]
mod tests {
    use super::MsgBuf;
    use crate::{message::XidPair, MessageType, Slice};

    #[test]
    fn empty_buffer_has_zero_count_and_size() {
        let buf = MsgBuf::new();
        assert_eq!(buf.count(), 0);
        assert_eq!(buf.memsize(), 0);
        assert!(buf.is_empty());
    }

    #[test]
    fn iterates_by_key_then_msn() {
        let mut buf = MsgBuf::new();
        buf.put(
            3,
            MessageType::Insert,
            Slice::new(b"b"),
            Slice::new(b"1"),
            XidPair::NONE,
        );
        buf.put(
            1,
            MessageType::Insert,
            Slice::new(b"a"),
            Slice::new(b"1"),
            XidPair::NONE,
        );
        buf.put(
            2,
            MessageType::Update,
            Slice::new(b"a"),
            Slice::new(b"2"),
            XidPair::NONE,
        );

        let order: Vec<_> = buf
            .iter()
            .map(|(msn, _, key, _, _)| (key.to_vec(), msn))
            .collect();

        assert_eq!(
            order,
            vec![(b"a".to_vec(), 1), (b"a".to_vec(), 2), (b"b".to_vec(), 3)]
        );
    }

    #[test]
    fn memsize_grows_with_entries() {
        let mut buf = MsgBuf::new();
        buf.put(
            1,
            MessageType::Insert,
            Slice::new(b"key"),
            Slice::new(b"value"),
            XidPair::NONE,
        );
        assert!(buf.memsize() > 0);
    }
}
