// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{message::TxnId, Error, Result, Slice};

/// A handle to an in-flight transaction, as seen by the write path.
///
/// Rollback logging, commit/abort bookkeeping and the actual transaction
/// table are all owned by the (external) transaction manager; the tree only
/// ever reads `txnid`/`root_parent_txnid` off this handle.
#[derive(Debug, Clone, Copy)]
pub struct Txn {
    /// This transaction's own id.
    pub txnid: TxnId,

    /// The id of the outermost transaction in the nesting chain.
    pub root_parent_txnid: TxnId,
}

/// The transaction manager's interface, as consumed by `Tree::put`.
///
/// Implementations must persist the rollback record durably before
/// returning `Ok`: `put` orders `save_insert`/`save_delete`/`save_update`
/// strictly before allocating the write's MSN, so a rollback-log failure
/// never lets the tree's sequence counter advance for a write that can't be
/// undone.
pub trait TransactionManager: Send + Sync {
    /// Records that `key` is about to be inserted, so the transaction can be
    /// rolled back to the key's previous state.
    fn save_insert(&self, txn: &Txn, key: &Slice) -> Result<()>;

    /// Records that `key` is about to be deleted.
    fn save_delete(&self, txn: &Txn, key: &Slice) -> Result<()>;

    /// Records that `key` is about to be updated.
    fn save_update(&self, txn: &Txn, key: &Slice) -> Result<()>;
}

/// A transaction manager that accepts every write without persisting
/// anything.
///
/// Useful for exercising the tree's write path and concurrency protocol in
/// isolation from a real rollback-log implementation, and for callers that
/// never pass a `Txn` to `put`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTransactionManager;

impl TransactionManager for NoopTransactionManager {
    fn save_insert(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Ok(())
    }

    fn save_delete(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Ok(())
    }

    fn save_update(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Ok(())
    }
}

/// A transaction manager that always fails, used to test that `put` does
/// not advance the MSN counter when rollback logging fails.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTransactionManager;

impl TransactionManager for FailingTransactionManager {
    fn save_insert(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Err(Error::Rollback("rollback log unavailable".into()))
    }

    fn save_delete(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Err(Error::Rollback("rollback log unavailable".into()))
    }

    fn save_update(&self, _txn: &Txn, _key: &Slice) -> Result<()> {
        Err(Error::Rollback("rollback log unavailable".into()))
    }
}
