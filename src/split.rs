// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::cache::{NodeCache, PinnedNode};
use crate::msgbuf::MsgBuf;
use crate::node::{InteriorNode, LeafNode, Node, Partition};
use crate::{Nid, Result, Slice, Status};

/// Splits an oversized leaf's entries at their median key, in place.
///
/// `leaf` keeps every entry ordered before the median; the returned
/// [`MsgBuf`] holds everything from the median on, and the returned
/// [`Slice`] is that median key — the pivot the caller installs into the
/// parent to route future writes between the two.
///
/// Only the buffer moves: the sibling's own header (NID, `isroot`) is
/// whatever the cache already allocated for it, never the header of the
/// node being split.
///
/// A single pass over the (already key-ordered) entries is enough: no
/// reordering happens, entries are just partitioned into "before" and
/// "from" the median index.
fn split_leaf_entries(leaf: &mut LeafNode) -> (Slice, MsgBuf) {
    debug_assert!(leaf.buffer.count() > 1, "a single-entry leaf can't split");

    let median_index = leaf.buffer.count() / 2;
    let median_key = leaf
        .buffer
        .iter()
        .nth(median_index)
        .map(|(_, _, key, _, _)| key.clone())
        .expect("median index is within bounds");

    let mut right = MsgBuf::new();
    let mut left = MsgBuf::new();
    for (msn, kind, key, value, xidpair) in leaf.buffer.iter() {
        if key >= &median_key {
            right.put(msn, kind, key.clone(), value.clone(), xidpair);
        } else {
            left.put(msn, kind, key.clone(), value.clone(), xidpair);
        }
    }

    leaf.buffer = left;
    (median_key, right)
}

/// Splits an oversized interior node's partitions in half, in place.
///
/// The left half (including its pivots) stays in `interior`; the right
/// half's pivots and partitions are returned for the caller to move onto
/// the sibling. The pivot that used to sit between the two halves is
/// dropped from both and returned instead — it becomes the parent-level
/// pivot separating the two siblings.
///
/// Requires `pivots_old > 2`, i.e. at least four children: splitting a
/// three-or-fewer-child interior would hand one half fewer than the two
/// children every interior node must carry.
fn split_interior_partitions(interior: &mut InteriorNode) -> (Slice, Vec<Slice>, Vec<Partition>) {
    let n = interior.n_children();
    debug_assert!(
        interior.pivots.len() > 2,
        "an interior node needs more than two pivots (at least four children) to split"
    );

    let mid = n / 2;
    let mid_pivot = interior.pivots[mid - 1].clone();

    let right_parts: Vec<Partition> = interior.parts.split_off(mid);
    let right_pivots: Vec<Slice> = interior.pivots.split_off(mid);
    interior.pivots.truncate(mid - 1);

    (mid_pivot, right_pivots, right_parts)
}

/// Inserts `pivot`/`new_child_nid` into `parent` immediately after the
/// partition at `child_index`, shifting everything from `child_index + 1`
/// on one slot to the right.
///
/// `child_index` is the index of the partition whose child just split;
/// `new_child_nid` is the NID of the freshly created right-hand sibling.
pub fn add_pivot_to_parent(
    parent: &mut InteriorNode,
    child_index: usize,
    pivot: Slice,
    new_child_nid: Nid,
    status: &Status,
) {
    parent.pivots.insert(child_index, pivot);
    parent
        .parts
        .insert(child_index + 1, Partition::new(new_child_nid));
    status.incr_pivots_added();
}

/// Splits the child pinned write at `parent.parts[child_index].child_nid`,
/// installing the new sibling's pivot into `parent`.
///
/// `parent` and `child` must both already be pinned [`LockType::Write`];
/// neither pin is released by this function, matching the top-down lock
/// order the write path relies on (the caller keeps `parent` pinned until
/// after this returns, since the parent's shape just changed too).
///
/// # Errors
///
/// Returns an error if the cache can't allocate the new sibling node.
pub fn split_child(
    parent: &mut InteriorNode,
    child_index: usize,
    child: &mut PinnedNode,
    cache: &dyn NodeCache,
    status: &Status,
) -> Result<()> {
    debug_assert_eq!(parent.parts[child_index].child_nid, child.nid());

    let (pivot, new_sibling_nid) = if child.is_leaf() {
        let leaf = child.as_leaf_mut();
        let (pivot, right_buffer) = split_leaf_entries(leaf);
        let mut sibling = cache.create_leaf()?;
        sibling.as_leaf_mut().buffer = right_buffer;
        let nid = sibling.nid();
        cache.unpin(sibling);
        status.incr_leaf_splits();
        (pivot, nid)
    } else {
        let interior = child.as_interior_mut();
        let height = interior.header.height;
        let (pivot, right_pivots, right_parts) = split_interior_partitions(interior);
        let mut sibling = cache.create_interior(height, right_parts.len().max(2))?;
        {
            let sibling_interior = sibling.as_interior_mut();
            sibling_interior.pivots = right_pivots;
            sibling_interior.parts = right_parts;
        }
        let nid = sibling.nid();
        cache.unpin(sibling);
        status.incr_nonleaf_splits();
        (pivot, nid)
    };

    add_pivot_to_parent(parent, child_index, pivot, new_sibling_nid, status);
    Ok(())
}

/// Splits the current root, installing a fresh interior node with two
/// children (the old root's two halves) as the new root.
///
/// The old root's *contents* move to a freshly allocated node; the old
/// root's *NID* is then swapped onto the new interior root via
/// [`NodeCache::swap_identities`], so [`crate::Header::root_nid`] never has
/// to change even though the root is now a different node. This mirrors
/// how the write path always has a stable root NID to read from the
/// header without racing a concurrent root split.
///
/// Returns the new root's height.
///
/// # Errors
///
/// Returns an error if the cache can't allocate the nodes the split needs.
pub fn root_split(
    old_root: &mut PinnedNode,
    cache: &dyn NodeCache,
    status: &Status,
) -> Result<u32> {
    debug_assert!(old_root.is_root());

    let old_height = old_root.height();

    let (pivot, right_nid) = if old_root.is_leaf() {
        let leaf = old_root.as_leaf_mut();
        let (pivot, right_buffer) = split_leaf_entries(leaf);
        let mut sibling = cache.create_leaf()?;
        sibling.as_leaf_mut().buffer = right_buffer;
        let nid = sibling.nid();
        cache.unpin(sibling);
        status.incr_leaf_splits();
        (pivot, nid)
    } else {
        let interior = old_root.as_interior_mut();
        let height = interior.header.height;
        let (pivot, right_pivots, right_parts) = split_interior_partitions(interior);
        let mut sibling = cache.create_interior(height, right_parts.len().max(2))?;
        {
            let sibling_interior = sibling.as_interior_mut();
            sibling_interior.pivots = right_pivots;
            sibling_interior.parts = right_parts;
        }
        let nid = sibling.nid();
        cache.unpin(sibling);
        status.incr_nonleaf_splits();
        (pivot, nid)
    };

    let left_nid = old_root.nid();
    let new_height = old_height + 1;

    let mut new_root = cache.create_interior(new_height, 2)?;

    // `new_root`'s own NID, before the identity swap below moves the old
    // root's contents into this slot. `left_nid` must keep meaning "the
    // root", so it's the freshly built interior node that inherits it; the
    // old root's data (now just its left half) ends up living under the
    // NID `new_root` was allocated with.
    let old_root_new_home = new_root.nid();

    {
        let interior = new_root.as_interior_mut();
        interior.pivots = vec![pivot];
        interior.parts[0].child_nid = old_root_new_home;
        interior.parts[1].child_nid = right_nid;
    }

    old_root.set_is_root(false);
    new_root.set_is_root(true);

    cache.swap_identities(old_root, &mut new_root);
    debug_assert_eq!(old_root.nid(), old_root_new_home);
    debug_assert_eq!(new_root.nid(), left_nid);

    cache.unpin(new_root);
    status.incr_root_splits();

    Ok(new_height)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemNodeCache;
    use crate::{message::XidPair, MessageType};

    fn put_leaf(leaf: &mut LeafNode, key: &str, msn: u64) {
        leaf.buffer.put(
            msn,
            MessageType::Insert,
            Slice::new(key.as_bytes()),
            Slice::new(b"v"),
            XidPair::NONE,
        );
    }

    #[test]
    fn leaf_split_partitions_by_median_key() {
        let mut node = Node::new_leaf(1);
        let leaf = node.as_leaf_mut();
        for (i, key) in ["a", "b", "c", "d", "e"].iter().enumerate() {
            put_leaf(leaf, key, i as u64 + 1);
        }

        let (pivot, right) = split_leaf_entries(leaf);

        assert!(leaf.buffer.count() > 0);
        assert!(right.count() > 0);
        assert_eq!(leaf.buffer.count() + right.count(), 5);
        for (_, _, key, _, _) in leaf.buffer.iter() {
            assert!(key < &pivot);
        }
        for (_, _, key, _, _) in right.iter() {
            assert!(key >= &pivot);
        }
    }

    #[test]
    fn split_leaf_entries_keeps_sibling_identity_separate() {
        // The sibling's header is never touched by this helper; it only
        // ever returns the right-hand buffer, so the caller can't
        // accidentally inherit the split node's NID or `isroot` flag.
        let mut node = Node::new_leaf(7);
        let leaf = node.as_leaf_mut();
        for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
            put_leaf(leaf, key, i as u64 + 1);
        }

        let original_nid = leaf.header.nid;
        let (_, right) = split_leaf_entries(leaf);
        assert_eq!(leaf.header.nid, original_nid);
        assert!(right.count() > 0);
    }

    #[test]
    fn split_child_gives_sibling_its_own_allocated_nid() {
        let cache = MemNodeCache::new();
        let mut parent_pinned = cache.create_interior(1, 2).expect("create parent");
        let mut child_pinned = cache.create_leaf().expect("create child");
        let status = Status::default();

        let original_child_nid = child_pinned.nid();
        {
            let leaf = child_pinned.as_leaf_mut();
            for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
                put_leaf(leaf, key, i as u64 + 1);
            }
        }

        {
            let parent = parent_pinned.as_interior_mut();
            parent.parts[0].child_nid = original_child_nid;
        }

        {
            let parent = parent_pinned.as_interior_mut();
            split_child(parent, 0, &mut child_pinned, &cache, &status).expect("split");
        }

        let parent = parent_pinned.as_interior();
        let sibling_nid = parent.parts[1].child_nid;
        assert_ne!(
            sibling_nid, original_child_nid,
            "sibling must keep the NID the cache allocated for it"
        );

        let sibling = cache
            .fetch(sibling_nid, crate::cache::LockType::Read)
            .expect("fetch sibling");
        assert!(sibling.is_leaf());
        assert!(!sibling.is_root());
        cache.unpin(sibling);

        cache.unpin(parent_pinned);
        cache.unpin(child_pinned);
    }

    #[test]
    fn split_child_installs_pivot_and_grows_fanout() {
        let cache = MemNodeCache::new();
        let mut parent_pinned = cache.create_interior(1, 2).expect("create parent");
        let mut child_pinned = cache.create_leaf().expect("create child");
        let status = Status::default();

        {
            let leaf = child_pinned.as_leaf_mut();
            for (i, key) in ["a", "b", "c", "d"].iter().enumerate() {
                put_leaf(leaf, key, i as u64 + 1);
            }
        }

        let child_nid = child_pinned.nid();
        {
            let parent = parent_pinned.as_interior_mut();
            parent.parts[0].child_nid = child_nid;
        }

        {
            let parent = parent_pinned.as_interior_mut();
            split_child(parent, 0, &mut child_pinned, &cache, &status).expect("split");
        }

        let parent = parent_pinned.as_interior();
        assert_eq!(parent.n_children(), 3);
        assert_eq!(status.leaf_splits(), 1);
        assert_eq!(status.pivots_added(), 1);

        cache.unpin(parent_pinned);
        cache.unpin(child_pinned);
    }
}
