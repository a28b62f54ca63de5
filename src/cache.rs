// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{node::Node, Nid, NidCounter, Result};
use parking_lot::{ArcRwLockReadGuard, ArcRwLockWriteGuard, RawRwLock, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering::Relaxed};
use std::sync::Arc;

/// The mode a node is pinned in: shared read access, or exclusive write
/// access allowing structural changes (splits, pivot insertion, flush).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockType {
    /// Shared access. Multiple readers may hold this concurrently.
    Read,

    /// Exclusive access. Held alone; required for any operation that
    /// changes the node's shape rather than just a partition's buffer.
    Write,
}

/// A guard granting access to a pinned node, in whichever mode it was
/// fetched.
///
/// The guard is what the driver (`root_put_cmd`, `flush_some_child`, the
/// split routines) actually carries across its own call stack: acquiring it
/// is the "pin" (and, implicitly, "latch"); dropping it — or passing it to
/// [`NodeCache::unpin`] — is the matching unpin. It derefs to [`Node`],
/// mutably when held in [`LockType::Write`] mode.
pub enum PinnedNode {
    Read(ArcRwLockReadGuard<RawRwLock, Node>),
    Write(ArcRwLockWriteGuard<RawRwLock, Node>),
}

impl PinnedNode {
    /// The mode this node was pinned in.
    #[must_use]
    pub fn lock_type(&self) -> LockType {
        match self {
            Self::Read(_) => LockType::Read,
            Self::Write(_) => LockType::Write,
        }
    }

    /// Downgrades a write pin's guard can't happen in place; callers that
    /// need a weaker mode re-pin through the cache instead. This method
    /// only reports whether `self` is already writable, sparing call sites
    /// an explicit `matches!`.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self, Self::Write(_))
    }
}

impl std::ops::Deref for PinnedNode {
    type Target = Node;

    fn deref(&self) -> &Node {
        match self {
            Self::Read(guard) => guard,
            Self::Write(guard) => guard,
        }
    }
}

impl std::ops::DerefMut for PinnedNode {
    /// # Panics
    ///
    /// Panics if this node is only pinned [`LockType::Read`]; callers that
    /// mutate a node must have fetched it [`LockType::Write`].
    fn deref_mut(&mut self) -> &mut Node {
        match self {
            Self::Write(guard) => guard,
            Self::Read(_) => panic!("node is only pinned for reading"),
        }
    }
}

/// The node cache's interface: create, fetch-and-pin, unpin, and the
/// identity swap a root split performs on its old and new root nodes.
///
/// Real implementations additionally own eviction, dirty write-back and
/// on-disk fetch, none of which this crate concerns itself with; the one
/// concrete implementation here, [`MemNodeCache`], never evicts.
pub trait NodeCache: Send + Sync {
    /// Allocates a fresh NID and creates a new, empty leaf, pinned for
    /// writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache can't allocate a slot for the node.
    fn create_leaf(&self) -> Result<PinnedNode>;

    /// Allocates a fresh NID and creates a new interior node shell with
    /// `n_children` partitions, pinned for writing.
    ///
    /// # Errors
    ///
    /// Returns an error if the cache can't allocate a slot for the node.
    fn create_interior(&self, height: u32, n_children: usize) -> Result<PinnedNode>;

    /// Fetches the node identified by `nid`, pinning it in `lock_type` mode.
    ///
    /// # Errors
    ///
    /// Returns an error if `nid` is unknown to the cache.
    fn fetch(&self, nid: Nid, lock_type: LockType) -> Result<PinnedNode>;

    /// Releases a pin acquired through [`create_leaf`](Self::create_leaf),
    /// [`create_interior`](Self::create_interior) or [`fetch`](Self::fetch).
    fn unpin(&self, node: PinnedNode);

    /// Allocates and returns a fresh NID without creating a node for it.
    ///
    /// Exposed so [`crate::Tree::next_nid`] can hand out NIDs for external
    /// bookkeeping that has nothing to do with a node's in-memory shape;
    /// [`create_leaf`](Self::create_leaf) and
    /// [`create_interior`](Self::create_interior) draw from the same
    /// counter, so NIDs handed out this way are never reused by the cache.
    fn next_nid(&self) -> Nid;

    /// The most recently allocated NID, without allocating a new one.
    ///
    /// Used when persisting a header checkpoint: the header wants to record
    /// the current high-water mark, not burn a fresh NID on every checkpoint.
    #[must_use]
    fn last_nid(&self) -> Nid;

    /// Swaps the NIDs and contents of two already write-pinned nodes,
    /// without changing which cache slot either pin refers to.
    ///
    /// Used exactly once per root split, to let a freshly allocated node
    /// take over the old root's NID while the old root moves to a new one —
    /// the root's NID is invariant across the tree's lifetime, so the split
    /// swaps identities rather than rewriting every external reference to
    /// `root_nid`.
    fn swap_identities(&self, a: &mut PinnedNode, b: &mut PinnedNode);

    /// The number of pins outstanding right now, i.e. not yet matched by an
    /// [`unpin`](Self::unpin) call. Used by tests to assert the write path
    /// never leaks a pin on any control path.
    #[must_use]
    fn outstanding_pins(&self) -> usize;
}

struct Slot {
    node: Arc<RwLock<Node>>,
}

/// The default, in-memory [`NodeCache`]: a plain table keyed by [`Nid`],
/// with no eviction and no backing store. Every node created through it
/// lives exactly as long as the cache itself.
pub struct MemNodeCache {
    table: std::sync::Mutex<HashMap<Nid, Slot>>,
    nids: NidCounter,
    pins: AtomicUsize,
}

impl MemNodeCache {
    /// Creates an empty cache whose NID counter starts fresh at
    /// [`crate::NID_START`].
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: std::sync::Mutex::new(HashMap::new()),
            nids: NidCounter::default(),
            pins: AtomicUsize::new(0),
        }
    }

    /// Creates an empty cache whose NID counter resumes after
    /// `last_allocated_nid`, as recorded in a recovered [`crate::Header`].
    #[must_use]
    pub fn resuming_from(last_allocated_nid: Nid) -> Self {
        Self {
            table: std::sync::Mutex::new(HashMap::new()),
            nids: NidCounter::new(last_allocated_nid),
            pins: AtomicUsize::new(0),
        }
    }

    fn insert(&self, node: Node) -> PinnedNode {
        let nid = node.nid();
        let slot = Slot {
            node: Arc::new(RwLock::new(node)),
        };
        let guard = slot.node.write_arc();

        let mut table = self.table.lock().expect("lock is poisoned");
        table.insert(nid, slot);

        self.pins.fetch_add(1, Relaxed);
        PinnedNode::Write(guard)
    }
}

impl Default for MemNodeCache {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeCache for MemNodeCache {
    fn create_leaf(&self) -> Result<PinnedNode> {
        let nid = self.nids.next();
        Ok(self.insert(Node::new_leaf(nid)))
    }

    fn create_interior(&self, height: u32, n_children: usize) -> Result<PinnedNode> {
        let nid = self.nids.next();
        Ok(self.insert(Node::new_interior(nid, height, n_children)))
    }

    fn fetch(&self, nid: Nid, lock_type: LockType) -> Result<PinnedNode> {
        let node = {
            let table = self.table.lock().expect("lock is poisoned");
            table
                .get(&nid)
                .map(|slot| Arc::clone(&slot.node))
                .ok_or_else(|| crate::Error::Cache(format!("no node with nid {nid}")))?
        };

        self.pins.fetch_add(1, Relaxed);
        Ok(match lock_type {
            LockType::Read => PinnedNode::Read(node.read_arc()),
            LockType::Write => PinnedNode::Write(node.write_arc()),
        })
    }

    fn unpin(&self, node: PinnedNode) {
        drop(node);
        self.pins.fetch_sub(1, Relaxed);
    }

    fn next_nid(&self) -> Nid {
        self.nids.next()
    }

    fn last_nid(&self) -> Nid {
        self.nids.get()
    }

    fn swap_identities(&self, a: &mut PinnedNode, b: &mut PinnedNode) {
        let a_nid = a.nid();
        let b_nid = b.nid();

        a.deref_mut().set_nid(b_nid);
        b.deref_mut().set_nid(a_nid);

        let mut table = self.table.lock().expect("lock is poisoned");
        if let (Some(a_slot), Some(b_slot)) = (table.remove(&a_nid), table.remove(&b_nid)) {
            table.insert(b_nid, a_slot);
            table.insert(a_nid, b_slot);
        }
    }

    fn outstanding_pins(&self) -> usize {
        self.pins.load(Relaxed)
    }
}
