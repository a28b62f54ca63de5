// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::{node::Node, Options};

/// A node's classification for the write path's check-then-act loop:
/// whether it can absorb another command as-is, needs to split, or needs
/// to flush a partition down before it grows any larger.
///
/// Fission always takes priority over flushing: a node that is both
/// oversized and a fission candidate is reported [`Reactivity::Fissible`],
/// since splitting it also halves its buffered work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reactivity {
    /// Neither threshold is crossed; safe to apply a command directly.
    Stable,

    /// Oversized by entry count or byte size (leaves), or by child count
    /// (interior nodes); must be split before anything else happens to it.
    Fissible,

    /// Oversized by buffered byte size or entry count, but not fissible.
    /// Must flush its heaviest partition before anything else happens to
    /// it.
    ///
    /// Never reported for leaves: leaves have no partitions to flush, so an
    /// oversized leaf is always `Fissible` instead.
    Flushable,
}

/// Classifies `node` against `opts`'s thresholds.
///
/// A leaf is `Fissible` once it holds more than one entry and crosses
/// either the byte-size or entry-count threshold (a single-entry leaf can
/// never usefully split, since a split needs a median to pivot on).
///
/// An interior node is `Fissible` once its child count reaches
/// `inner_node_fanout`, taking priority over `Flushable` regardless of
/// buffer size. Otherwise it's `Flushable` once its total buffered entry
/// count reaches the interior count threshold, or its total buffered byte
/// size crosses the interior byte threshold provided every partition has
/// something to flush — an interior node with an empty partition is only
/// excused from the *byte-size* branch, since flushing the heaviest
/// partition wouldn't relieve a lopsided write pattern and would only waste
/// a recursive flush on a child that isn't the cause; the count threshold
/// still forces a flush regardless, so a single hot partition can't stall
/// the tree forever.
#[must_use]
pub fn classify(node: &Node, opts: &Options) -> Reactivity {
    match node {
        Node::Leaf(leaf) => {
            let oversized = leaf.buffer.memsize() > opts.leaf_node_page_size
                || leaf.buffer.count() >= opts.leaf_node_page_count;

            if oversized && leaf.buffer.count() > 1 {
                Reactivity::Fissible
            } else {
                Reactivity::Stable
            }
        }
        Node::Interior(interior) => {
            if interior.n_children() >= opts.inner_node_fanout {
                return Reactivity::Fissible;
            }

            let oversized_bytes =
                interior.total_memsize() > opts.inner_node_page_size && !interior.has_empty_partition();
            let oversized_count = interior.total_count() >= opts.inner_node_page_count;

            if oversized_bytes || oversized_count {
                Reactivity::Flushable
            } else {
                Reactivity::Stable
            }
        }
    }
}
