// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

use crate::cache::{LockType, MemNodeCache, NodeCache};
use crate::flush::{flush_some_child, node_put_cmd};
use crate::header::{Header, HeaderStore, InMemoryHeaderStore};
use crate::message::{Cmd, MessageType, XidPair};
use crate::msn::MsnCounter;
use crate::reactivity::{classify, Reactivity};
use crate::split::root_split;
use crate::txn::{NoopTransactionManager, TransactionManager, Txn};
use crate::{Msn, Nid, Options, Result, Slice, Status};
use std::sync::atomic::{AtomicU32, Ordering::Acquire, Ordering::Release};
use std::sync::Arc;

/// Shared tree state. Cheap to clone a [`Tree`] handle: it's just an `Arc`
/// around this, matching how the teacher's own `Tree` wraps a `TreeInner`
/// so every clone observes the same header, cache and counters.
struct TreeInner {
    /// Constant for the tree's lifetime (invariant 3 in `spec.md` §3):
    /// `root_split` preserves it by swapping NIDs rather than changing it.
    root_nid: Nid,

    /// The current root's height. Updated (under the root's own write
    /// latch, by construction of `root_put_cmd`) whenever a root split
    /// occurs.
    height: AtomicU32,

    cache: Arc<dyn NodeCache>,
    header_store: Arc<dyn HeaderStore>,
    txn_manager: Arc<dyn TransactionManager>,
    msn: MsnCounter,
    opts: Options,
    status: Status,
}

/// A write-optimized, ordered key-value tree.
///
/// `Tree` owns the header (root identity, height, the NID/MSN high-water
/// marks) and drives every write through [`Tree::put`]; the page cache, the
/// header's persistence and the transaction manager are all external
/// collaborators, injected at [`Tree::open`] time as trait objects so the
/// write path and its concurrency protocol can be exercised against
/// [`MemNodeCache`] without any real I/O.
///
/// # Examples
///
/// ```
/// use buffered_tree::{MessageType, Tree};
///
/// let tree = Tree::open_in_memory(Default::default())?;
/// tree.put("a", "1", MessageType::Insert, None)?;
/// assert_eq!(tree.height(), 0);
/// # Ok::<(), buffered_tree::Error>(())
/// ```
#[derive(Clone)]
pub struct Tree(Arc<TreeInner>);

impl Tree {
    /// Opens a tree against the given cache, header store and transaction
    /// manager.
    ///
    /// If `header_store` has no previously persisted header, a fresh tree
    /// is initialized: a new, empty leaf is created through `cache` and
    /// installed as the root, and a header pointing at it is persisted.
    /// Otherwise the previously persisted header is recovered and its root
    /// NID is trusted as-is (it is the caller's responsibility to hand this
    /// a `cache` whose NID/MSN counters were seeded from that same header,
    /// e.g. via [`MemNodeCache::resuming_from`]).
    ///
    /// This mirrors the "try the configured mode, create on not-found"
    /// open sequence described in `spec.md` §4.2/§9: the first attempt is
    /// `header_store.fetch()`, and only a fetch failure triggers the
    /// create-new path — never a fallback in the other direction.
    ///
    /// # Errors
    ///
    /// Returns an error if a fresh root leaf can't be created, or if the
    /// header can't be persisted (new tree) or re-fetched (existing tree).
    pub fn open(
        opts: Options,
        cache: Arc<dyn NodeCache>,
        header_store: Arc<dyn HeaderStore>,
        txn_manager: Arc<dyn TransactionManager>,
    ) -> Result<Self> {
        log::debug!("opening buffered tree");

        let header = match header_store.fetch() {
            Ok(header) => {
                log::debug!(
                    "recovered header: root_nid={} height={} last_msn={}",
                    header.root_nid,
                    header.height,
                    header.last_msn
                );
                header
            }
            Err(_) => {
                log::debug!("no existing header found, initializing a fresh tree");
                let mut root = cache.create_leaf()?;
                root.set_is_root(true);
                let root_nid = root.nid();
                cache.unpin(root);

                let header = Header {
                    root_nid,
                    height: 0,
                    last_nid: root_nid,
                    last_msn: 0,
                    compression_method: opts.compress_method,
                };
                header_store.persist(&header)?;
                header
            }
        };

        Ok(Self(Arc::new(TreeInner {
            root_nid: header.root_nid,
            height: AtomicU32::new(header.height),
            cache,
            header_store,
            txn_manager,
            msn: MsnCounter::new(header.last_msn),
            opts,
            status: Status::default(),
        })))
    }

    /// Opens a fresh, purely in-memory tree: a [`MemNodeCache`], an
    /// [`InMemoryHeaderStore`] and a [`NoopTransactionManager`].
    ///
    /// Convenient for tests, benchmarks and anything exercising the write
    /// path without a real block device behind it.
    ///
    /// # Errors
    ///
    /// Returns an error if the initial root leaf can't be created.
    pub fn open_in_memory(opts: Options) -> Result<Self> {
        Self::open(
            opts,
            Arc::new(MemNodeCache::new()),
            Arc::new(InMemoryHeaderStore::default()),
            Arc::new(NoopTransactionManager),
        )
    }

    /// Writes `key`/`value` as a new, versioned message.
    ///
    /// If `txn` is supplied, the corresponding rollback record
    /// (`save_insert`/`save_delete`/`save_update`) is persisted by the
    /// transaction manager *before* an MSN is allocated: a rollback-log
    /// failure must never let the tree's sequence counter advance for a
    /// write that can't be undone (`spec.md` §7).
    ///
    /// Returns the MSN assigned to this write.
    ///
    /// # Errors
    ///
    /// Returns an error if the rollback record can't be persisted, or if
    /// the write path fails to pin or create a node.
    pub fn put(
        &self,
        key: impl Into<Slice>,
        value: impl Into<Slice>,
        kind: MessageType,
        txn: Option<Txn>,
    ) -> Result<Msn> {
        let key = key.into();
        let value = value.into();

        if let Some(txn) = &txn {
            match kind {
                MessageType::Insert => self.0.txn_manager.save_insert(txn, &key)?,
                MessageType::Delete => self.0.txn_manager.save_delete(txn, &key)?,
                MessageType::Update => self.0.txn_manager.save_update(txn, &key)?,
                MessageType::Commit | MessageType::Abort => {}
            }
        }

        let xidpair = txn
            .map(|txn| XidPair {
                child_xid: txn.txnid,
                parent_xid: txn.root_parent_txnid,
            })
            .unwrap_or(XidPair::NONE);

        let msn = self.0.msn.next();
        let cmd = Cmd {
            msn,
            kind,
            key,
            value,
            xidpair,
        };

        self.root_put_cmd(cmd)?;
        Ok(msn)
    }

    /// The write-path driver: pins the root, reacts to its classification
    /// (splitting or flushing as needed, escalating the latch when a
    /// structural change is required), and finally applies `cmd` once the
    /// root is observed stable under a latch strong enough to apply to it.
    ///
    /// This is a direct transcription of the lock-escalating retry loop in
    /// `spec.md` §4.4, including Open Question 3's resolution: a leaf root
    /// is never applied to under a mere read latch, even if it classifies
    /// `Stable` on the very first (read) pin — a fresh leaf root with room
    /// to spare is exactly this case, so the loop treats "stable leaf,
    /// still holding Read" the same as a reactivity mismatch and escalates.
    fn root_put_cmd(&self, cmd: Cmd) -> Result<()> {
        let mut lock_type = LockType::Read;

        loop {
            let mut root = self.0.cache.fetch(self.0.root_nid, lock_type)?;
            if !root.is_root() {
                panic!("root nid {} drifted to a non-root node", self.0.root_nid);
            }

            match classify(&root, &self.0.opts) {
                Reactivity::Stable => {
                    if root.is_leaf() && lock_type == LockType::Read {
                        self.0.cache.unpin(root);
                        lock_type = LockType::Write;
                        continue;
                    }

                    node_put_cmd(&mut root, &cmd, &self.0.status);
                    self.0.cache.unpin(root);
                    return Ok(());
                }

                Reactivity::Fissible => {
                    if lock_type == LockType::Read {
                        self.0.cache.unpin(root);
                        lock_type = LockType::Write;
                        continue;
                    }

                    let new_height = root_split(&mut root, self.0.cache.as_ref(), &self.0.status)?;
                    self.0.height.store(new_height, Release);
                    self.0.cache.unpin(root);
                    lock_type = LockType::Read;
                }

                Reactivity::Flushable => {
                    if lock_type == LockType::Read {
                        self.0.cache.unpin(root);
                        lock_type = LockType::Write;
                        continue;
                    }

                    flush_some_child(root, self.0.cache.as_ref(), &self.0.opts, &self.0.status)?;
                    lock_type = LockType::Read;
                }
            }
        }
    }

    /// The NID identifying this tree's root node. Constant from `open` to
    /// the tree being dropped (`spec.md` §3, invariant 3).
    #[must_use]
    pub fn root_nid(&self) -> Nid {
        self.0.root_nid
    }

    /// The tree's current height: 0 while the root is a leaf.
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height.load(Acquire)
    }

    /// The bound [`NodeCache`], for callers that need to pin and inspect
    /// individual nodes directly (tests verifying pivot ordering, buffer
    /// freshness after a split, and similar structural properties that
    /// `Tree`'s own API has no reason to expose to ordinary callers).
    #[must_use]
    pub fn cache(&self) -> &dyn NodeCache {
        self.0.cache.as_ref()
    }

    /// Allocates a fresh NID without creating a node for it.
    ///
    /// Exposed for callers that need NIDs for bookkeeping outside the
    /// tree's own nodes (`spec.md` §6's `next_nid`); ordinary writes never
    /// need to call this themselves.
    #[must_use]
    pub fn next_nid(&self) -> Nid {
        self.0.cache.next_nid()
    }

    /// Allocates and returns the next MSN without attaching it to a write.
    #[must_use]
    pub fn next_msn(&self) -> Msn {
        self.0.msn.next()
    }

    /// Lifetime counters for splits, flushes and applies performed by this
    /// tree so far.
    #[must_use]
    pub fn status(&self) -> &Status {
        &self.0.status
    }

    /// The options this tree was opened with.
    #[must_use]
    pub fn options(&self) -> &Options {
        &self.0.opts
    }

    /// Persists the current header (root NID, height, and the NID/MSN
    /// high-water marks) through the bound [`HeaderStore`].
    ///
    /// The header is not written after every `put` (`spec.md` §4.5: "header
    /// remains non-persisted between operations except as the cache
    /// chooses to flush it"); callers that need a durable checkpoint before
    /// closing the tree should call this explicitly.
    ///
    /// # Errors
    ///
    /// Returns an error if the header store can't be written.
    pub fn checkpoint_header(&self) -> Result<()> {
        let header = Header {
            root_nid: self.0.root_nid,
            height: self.height(),
            last_nid: self.0.cache.last_nid(),
            last_msn: self.0.msn.get(),
            compression_method: self.0.opts.compress_method,
        };
        self.0.header_store.persist(&header)
    }
}

impl std::fmt::Debug for Tree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("root_nid", &self.0.root_nid)
            .field("height", &self.height())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::Tree;
    use crate::{MessageType, Options};

    fn small_leaf_options() -> Options {
        Options::new()
            .leaf_node_page_size(1 << 20)
            .leaf_node_page_count(3)
            .inner_node_page_size(1 << 20)
            .inner_node_page_count(1 << 20)
            .inner_node_fanout(64)
    }

    #[test]
    fn fresh_tree_three_inserts_stay_in_a_leaf_root() {
        let tree = Tree::open_in_memory(Options::default()).expect("open");

        let msn_a = tree.put("a", "1", MessageType::Insert, None).expect("put a");
        let msn_b = tree.put("b", "2", MessageType::Insert, None).expect("put b");
        let msn_c = tree.put("c", "3", MessageType::Insert, None).expect("put c");

        assert_eq!((msn_a, msn_b, msn_c), (1, 2, 3));
        assert_eq!(tree.height(), 0);
        assert_eq!(tree.status().leaf_puts(), 3);
    }

    #[test]
    fn leaf_root_splits_once_fissible() {
        let tree = Tree::open_in_memory(small_leaf_options()).expect("open");

        for key in ["a", "b", "c", "d"] {
            tree.put(key, "v", MessageType::Insert, None).expect("put");
        }

        assert_eq!(tree.height(), 1);
        assert_eq!(tree.status().leaf_splits(), 1);
        assert_eq!(tree.status().root_splits(), 1);
    }

    #[test]
    fn root_nid_is_stable_across_a_root_split() {
        let tree = Tree::open_in_memory(small_leaf_options()).expect("open");
        let root_nid_before = tree.root_nid();

        for key in ["a", "b", "c", "d", "e"] {
            tree.put(key, "v", MessageType::Insert, None).expect("put");
        }

        assert_eq!(tree.height(), 1);
        assert_eq!(tree.root_nid(), root_nid_before);
    }

    #[test]
    fn msns_are_strictly_increasing_across_many_puts() {
        let tree = Tree::open_in_memory(small_leaf_options()).expect("open");

        let mut last = 0;
        for i in 0..50u32 {
            let msn = tree
                .put(format!("k{i}"), "v", MessageType::Insert, None)
                .expect("put");
            assert!(msn > last);
            last = msn;
        }
    }
}
