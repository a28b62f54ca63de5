// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::atomic::{AtomicU64, Ordering::Relaxed};

/// Lifetime counters for tree reorganization activity.
///
/// Plays the same observability role as the teacher's `Metrics`: none of
/// these numbers affect tree behavior, they're read-only counters a caller
/// can sample to understand write amplification and structural churn.
#[derive(Debug, Default)]
pub struct Status {
    leaf_splits: AtomicU64,
    nonleaf_splits: AtomicU64,
    pivots_added: AtomicU64,
    flushes: AtomicU64,
    leaf_puts: AtomicU64,
    nonleaf_puts: AtomicU64,
    root_splits: AtomicU64,
}

impl Status {
    pub(crate) fn incr_leaf_splits(&self) {
        self.leaf_splits.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_nonleaf_splits(&self) {
        self.nonleaf_splits.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_pivots_added(&self) {
        self.pivots_added.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_flushes(&self) {
        self.flushes.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_leaf_puts(&self) {
        self.leaf_puts.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_nonleaf_puts(&self) {
        self.nonleaf_puts.fetch_add(1, Relaxed);
    }

    pub(crate) fn incr_root_splits(&self) {
        self.root_splits.fetch_add(1, Relaxed);
    }

    /// Number of leaf splits performed so far.
    #[must_use]
    pub fn leaf_splits(&self) -> u64 {
        self.leaf_splits.load(Relaxed)
    }

    /// Number of interior node splits performed so far (including the
    /// interior half of root splits).
    #[must_use]
    pub fn nonleaf_splits(&self) -> u64 {
        self.nonleaf_splits.load(Relaxed)
    }

    /// Number of pivots installed into parents so far.
    #[must_use]
    pub fn pivots_added(&self) -> u64 {
        self.pivots_added.load(Relaxed)
    }

    /// Number of `flush_some_child` invocations so far.
    #[must_use]
    pub fn flushes(&self) -> u64 {
        self.flushes.load(Relaxed)
    }

    /// Number of commands applied directly to a leaf so far.
    #[must_use]
    pub fn leaf_puts(&self) -> u64 {
        self.leaf_puts.load(Relaxed)
    }

    /// Number of commands appended to an interior partition buffer so far.
    #[must_use]
    pub fn nonleaf_puts(&self) -> u64 {
        self.nonleaf_puts.load(Relaxed)
    }

    /// Number of root splits performed so far.
    #[must_use]
    pub fn root_splits(&self) -> u64 {
        self.root_splits.load(Relaxed)
    }
}
