// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use std::sync::{
    atomic::{AtomicU64, Ordering::Acquire, Ordering::Release},
    Arc,
};

/// A node identifier.
///
/// Stable across a node's lifetime, except during a root split, where the
/// old and new root swap NIDs to keep `Header::root_nid` constant (see
/// `crate::split::root_split`).
pub type Nid = u64;

/// The first NID ever allocated. Lower values are reserved.
pub const NID_START: Nid = 1;

/// Thread-safe generator for node identifiers.
///
/// Mirrors [`crate::MsnCounter`]; kept as a distinct type because NIDs and
/// MSNs are different identifier spaces even though both are monotonic
/// `u64` counters seeded from the tree header.
#[derive(Clone, Debug)]
pub struct NidCounter(Arc<AtomicU64>);

impl Default for NidCounter {
    fn default() -> Self {
        Self::new(NID_START - 1)
    }
}

impl NidCounter {
    /// Creates a counter that will hand out `prev + 1` on the next call to
    /// [`NidCounter::next`].
    #[must_use]
    pub fn new(prev: Nid) -> Self {
        Self(Arc::new(AtomicU64::new(prev)))
    }

    /// Returns the most recently allocated NID without allocating a new one.
    #[must_use]
    pub fn get(&self) -> Nid {
        self.0.load(Acquire)
    }

    /// Allocates and returns the next NID.
    #[must_use]
    pub fn next(&self) -> Nid {
        self.0.fetch_add(1, Release) + 1
    }
}

#[cfg(test)]
mod tests {
    use super::{NidCounter, NID_START};

    #[test]
    fn starts_at_nid_start() {
        let counter = NidCounter::default();
        assert_eq!(counter.next(), NID_START);
        assert_eq!(counter.next(), NID_START + 1);
    }

    #[test]
    fn resumes_from_previous_value() {
        let counter = NidCounter::new(41);
        assert_eq!(counter.next(), 42);
    }
}
