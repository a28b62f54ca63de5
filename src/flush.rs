// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::cache::{LockType, NodeCache, PinnedNode};
use crate::message::Cmd;
use crate::node::Node;
use crate::reactivity::{classify, Reactivity};
use crate::split::split_child;
use crate::{Options, Result, Status};

/// Applies `cmd` to `node`: directly into a leaf's buffer, or into the
/// interior partition whose keyspace contains `cmd.key`.
///
/// This is the only place a command ever actually lands in a node; both
/// the write path (applying to a `Stable` root) and the flush engine
/// (draining a partition into its child) go through it.
pub fn node_put_cmd(node: &mut Node, cmd: &Cmd, status: &Status) {
    match node {
        Node::Leaf(leaf) => {
            leaf.buffer.put_cmd(cmd);
            status.incr_leaf_puts();
        }
        Node::Interior(interior) => {
            let idx = interior.partition_index(&cmd.key);
            interior.parts[idx].buffer.get_mut().put_cmd(cmd);
            status.incr_nonleaf_puts();
        }
    }
    node.bump_msn_high(cmd.msn);
}

/// Drains `parent`'s heaviest partition into its child, then reclassifies
/// and reacts to the child's new state: splits it, recursively flushes it
/// again, or leaves it as-is.
///
/// Takes ownership of `parent`'s pin (it must already be
/// [`LockType::Write`]) and always resolves it — by unpinning it directly,
/// or by handing it to [`crate::split::split_child`], which consumes it as
/// the parent being split into. Every entry in the chosen partition is
/// cleared regardless of whether it's actually applied: an entry whose MSN
/// doesn't exceed the child's `msn_high` has necessarily already been
/// applied there by an earlier flush, so it's dropped rather than
/// reapplied, which keeps a re-flush of the same partition idempotent.
///
/// At most two node latches are ever held at once by this call chain: the
/// current `parent` and the `child` it just fetched. Before recursing into
/// the child's own flush, `parent`'s pin is released first — the recursive
/// call only needs the child (now acting as the parent for the next level
/// down) and whichever grandchild it flushes into.
///
/// # Errors
///
/// Returns an error if the cache can't fetch or create a node.
pub fn flush_some_child(
    mut parent: PinnedNode,
    cache: &dyn NodeCache,
    opts: &Options,
    status: &Status,
) -> Result<()> {
    status.incr_flushes();

    let (child_index, child_nid) = {
        let interior = parent.as_interior_mut();
        let child_index = interior.heaviest_partition_index();
        (child_index, interior.parts[child_index].child_nid)
    };

    let mut child = cache.fetch(child_nid, LockType::Write)?;
    let child_msn_high = child.msn_high();

    let drained: Vec<Cmd> = {
        let interior = parent.as_interior_mut();
        let mut buffer = interior.parts[child_index].buffer.write();
        let cmds: Vec<Cmd> = buffer
            .iter()
            .map(|(msn, kind, key, value, xidpair)| Cmd {
                msn,
                kind,
                key: key.clone(),
                value: value.clone(),
                xidpair,
            })
            .collect();
        *buffer = crate::msgbuf::MsgBuf::new();
        cmds
    };

    for cmd in &drained {
        if cmd.msn > child_msn_high {
            node_put_cmd(&mut child, cmd, status);
        }
    }

    match classify(&child, opts) {
        Reactivity::Fissible => {
            let result = {
                let parent_interior = parent.as_interior_mut();
                split_child(parent_interior, child_index, &mut child, cache, status)
            };
            cache.unpin(parent);
            cache.unpin(child);
            result
        }
        Reactivity::Flushable => {
            cache.unpin(parent);
            flush_some_child(child, cache, opts, status)
        }
        Reactivity::Stable => {
            cache.unpin(parent);
            cache.unpin(child);
            Ok(())
        }
    }
}
