// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{msgbuf::MsgBuf, Msn, Nid, Slice};
use parking_lot::RwLock;

/// One `(child, incoming buffer)` slot of an interior node.
///
/// The buffer has its own reader/writer lock, distinct from the node's own
/// latch: appending a command to a partition only needs the node's *read*
/// latch plus this lock in write mode, which is what lets independent
/// writers append to different partitions of the same node concurrently.
#[derive(Debug)]
pub struct Partition {
    /// The NID of the child this partition routes to.
    pub child_nid: Nid,

    /// Messages addressed to `child_nid` that haven't been flushed yet.
    pub buffer: RwLock<MsgBuf>,
}

impl Partition {
    fn new(child_nid: Nid) -> Self {
        Self {
            child_nid,
            buffer: RwLock::new(MsgBuf::new()),
        }
    }

    /// A snapshot of this partition's buffer byte size, for the reactivity
    /// classifier and heaviest-child selection.
    fn memsize(&self) -> usize {
        self.buffer.read().memsize()
    }

    fn is_empty(&self) -> bool {
        self.buffer.read().is_empty()
    }

    fn count(&self) -> usize {
        self.buffer.read().count()
    }
}

/// Fields shared by leaf and interior nodes.
#[derive(Debug, Clone, Copy)]
pub struct NodeHeader {
    /// This node's identifier. Stable except across a root swap.
    pub nid: Nid,

    /// `true` for exactly one node in the tree at any time.
    pub isroot: bool,

    /// `true` if this node's in-memory state differs from its last
    /// persisted image.
    pub dirty: bool,

    /// The highest MSN ever routed through or applied to this node.
    /// Monotonically non-decreasing.
    pub msn_high: Msn,

    /// 0 for a leaf, the distance to the deepest leaf otherwise.
    pub height: u32,
}

impl NodeHeader {
    fn new(nid: Nid, height: u32) -> Self {
        Self {
            nid,
            isroot: false,
            dirty: true,
            msn_high: 0,
            height,
        }
    }
}

/// A leaf node: a single message buffer holding the tree's most recently
/// written entries for its keyspace.
#[derive(Debug)]
pub struct LeafNode {
    pub header: NodeHeader,
    pub buffer: MsgBuf,
}

/// An interior node: `n_children` partitions separated by `n_children - 1`
/// strictly increasing pivot keys.
#[derive(Debug)]
pub struct InteriorNode {
    pub header: NodeHeader,

    /// `pivots[i]` separates `parts[i]` (keys `< pivots[i]`) from
    /// `parts[i + 1]` (keys `>= pivots[i]`).
    pub pivots: Vec<Slice>,

    pub parts: Vec<Partition>,
}

impl InteriorNode {
    /// The number of children (and thus partitions) this node has.
    #[must_use]
    pub fn n_children(&self) -> usize {
        self.parts.len()
    }

    /// Finds the partition index whose keyspace contains `key`, via binary
    /// search over `pivots`.
    #[must_use]
    pub fn partition_index(&self, key: &Slice) -> usize {
        self.pivots.partition_point(|pivot| pivot <= key)
    }

    /// `true` if any partition's buffer is currently empty.
    #[must_use]
    pub(crate) fn has_empty_partition(&self) -> bool {
        self.parts.iter().any(Partition::is_empty)
    }

    /// The index of the partition with the largest buffer, by byte size.
    ///
    /// Ties are broken by the lowest index (the first partition observed
    /// with the maximal size), which keeps the choice deterministic.
    #[must_use]
    pub(crate) fn heaviest_partition_index(&self) -> usize {
        self.parts
            .iter()
            .enumerate()
            .max_by_key(|(_, part)| part.memsize())
            .map(|(idx, _)| idx)
            .unwrap_or(0)
    }

    /// Total size, in bytes, summed across every partition buffer.
    #[must_use]
    pub(crate) fn total_memsize(&self) -> usize {
        self.parts.iter().map(Partition::memsize).sum()
    }

    /// Total number of buffered messages, summed across every partition.
    #[must_use]
    pub(crate) fn total_count(&self) -> usize {
        self.parts.iter().map(Partition::count).sum()
    }
}

/// A node is either a leaf or an interior node; dispatch between the two
/// shapes is always by `height == 0`, never by a separate tag.
#[derive(Debug)]
pub enum Node {
    Leaf(LeafNode),
    Interior(InteriorNode),
}

impl Node {
    /// Creates a freshly allocated, empty leaf.
    #[must_use]
    pub fn new_leaf(nid: Nid) -> Self {
        Self::Leaf(LeafNode {
            header: NodeHeader::new(nid, 0),
            buffer: MsgBuf::new(),
        })
    }

    /// Creates a freshly allocated interior node shell with `n_children`
    /// partitions, each pointing at `Nid` 0 with an empty buffer, and
    /// `n_children - 1` empty pivots.
    ///
    /// Callers (split routines, root split) immediately overwrite the
    /// pivots and partition child ids before the node becomes reachable.
    #[must_use]
    pub fn new_interior(nid: Nid, height: u32, n_children: usize) -> Self {
        debug_assert!(height > 0, "interior nodes have height > 0");
        debug_assert!(n_children >= 2, "interior nodes need at least 2 children");

        Self::Interior(InteriorNode {
            header: NodeHeader::new(nid, height),
            pivots: std::iter::repeat(Slice::new(b"")).take(n_children - 1).collect(),
            parts: (0..n_children).map(|_| Partition::new(0)).collect(),
        })
    }

    /// This node's shared header.
    #[must_use]
    pub fn header(&self) -> &NodeHeader {
        match self {
            Self::Leaf(leaf) => &leaf.header,
            Self::Interior(interior) => &interior.header,
        }
    }

    fn header_mut(&mut self) -> &mut NodeHeader {
        match self {
            Self::Leaf(leaf) => &mut leaf.header,
            Self::Interior(interior) => &mut interior.header,
        }
    }

    /// This node's identifier.
    #[must_use]
    pub fn nid(&self) -> Nid {
        self.header().nid
    }

    /// `true` if this node currently is the tree's root.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.header().isroot
    }

    pub(crate) fn set_is_root(&mut self, isroot: bool) {
        self.header_mut().isroot = isroot;
    }

    pub(crate) fn set_nid(&mut self, nid: Nid) {
        self.header_mut().nid = nid;
    }

    /// 0 for a leaf, the distance to the deepest leaf otherwise.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.header().height
    }

    /// `true` if this node is a leaf (`height == 0`).
    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.height() == 0
    }

    /// The highest MSN ever routed through or applied to this node.
    #[must_use]
    pub fn msn_high(&self) -> Msn {
        self.header().msn_high
    }

    /// Advances `msn_high` to `msn` if `msn` is larger.
    pub(crate) fn bump_msn_high(&mut self, msn: Msn) {
        let header = self.header_mut();
        header.msn_high = header.msn_high.max(msn);
    }

    /// `true` if this node's in-memory state differs from its last
    /// persisted image.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.header().dirty
    }

    pub(crate) fn set_dirty(&mut self) {
        self.header_mut().dirty = true;
    }

    /// Borrows this node as a leaf, panicking if it's interior.
    ///
    /// # Panics
    ///
    /// Panics if `self` is `Node::Interior`; callers are expected to have
    /// already branched on `height()`/`is_leaf()`.
    pub fn as_leaf(&self) -> &LeafNode {
        match self {
            Self::Leaf(leaf) => leaf,
            Self::Interior(_) => panic!("expected a leaf node"),
        }
    }

    pub(crate) fn as_leaf_mut(&mut self) -> &mut LeafNode {
        match self {
            Self::Leaf(leaf) => leaf,
            Self::Interior(_) => panic!("expected a leaf node"),
        }
    }

    /// Borrows this node as an interior node, panicking if it's a leaf.
    ///
    /// # Panics
    ///
    /// Panics if `self` is `Node::Leaf`; callers are expected to have
    /// already branched on `height()`/`is_leaf()`.
    pub fn as_interior(&self) -> &InteriorNode {
        match self {
            Self::Interior(interior) => interior,
            Self::Leaf(_) => panic!("expected an interior node"),
        }
    }

    pub(crate) fn as_interior_mut(&mut self) -> &mut InteriorNode {
        match self {
            Self::Interior(interior) => interior,
            Self::Leaf(_) => panic!("expected an interior node"),
        }
    }
}
