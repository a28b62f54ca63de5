// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{Msn, Slice};

/// A transaction identifier.
pub type TxnId = u64;

/// Sentinel for "no transaction".
pub const TXNID_NONE: TxnId = 0;

/// The kind of change a message represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// Insert or overwrite `key` with `value`.
    Insert,

    /// Remove `key`.
    Delete,

    /// Apply a partial update to `key` (merge semantics are left to the
    /// caller/message-buffer consumer; the tree only routes the message).
    Update,

    /// Mark a transaction as committed.
    Commit,

    /// Mark a transaction as aborted.
    Abort,
}

/// The pair of transaction ids a command is tagged with: the transaction
/// that issued it, and (for nested transactions) the outermost parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct XidPair {
    /// The immediate (child) transaction id, or [`TXNID_NONE`].
    pub child_xid: TxnId,

    /// The outermost (root) transaction id, or [`TXNID_NONE`].
    pub parent_xid: TxnId,
}

impl XidPair {
    /// The pair used for writes that are not part of a transaction.
    pub const NONE: Self = Self {
        child_xid: TXNID_NONE,
        parent_xid: TXNID_NONE,
    };
}

/// A single versioned write, on its way from the root toward a leaf.
///
/// Commands are never mutated once created; `msn` is what gives them a
/// total order regardless of which path through the tree delivers them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cmd {
    /// The message sequence number this command was assigned at the root.
    pub msn: Msn,

    /// What kind of change this command represents.
    pub kind: MessageType,

    /// The key this command targets.
    pub key: Slice,

    /// The value to associate with `key` (ignored for `Delete`).
    pub value: Slice,

    /// The transaction this command belongs to, if any.
    pub xidpair: XidPair,
}

impl Cmd {
    /// Constructs a command not attached to any transaction.
    #[must_use]
    pub fn new(msn: Msn, kind: MessageType, key: Slice, value: Slice) -> Self {
        Self {
            msn,
            kind,
            key,
            value,
            xidpair: XidPair::NONE,
        }
    }
}
