// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

//! The write path of a write-optimized, on-disk, ordered key-value storage
//! engine built on a **buffered tree**: a B-tree variant whose interior
//! nodes carry a per-child message buffer, so writes are batched and
//! carried toward leaves lazily rather than applied in place on every call.
//!
//! ##### NOTE
//!
//! > This crate is the tree's *core* only: the write path, split mechanics,
//! > the flush engine and the concurrency protocol around them. The page
//! > cache, the on-disk block allocator, node serialization, the message
//! > buffer's own internal representation, the transaction manager, file
//! > I/O and compression are external collaborators, expressed here as
//! > small traits ([`NodeCache`], [`HeaderStore`], [`TransactionManager`])
//! > with one in-memory, non-persisting implementation apiece so the write
//! > path can be exercised without any of them backed by real I/O. Reads,
//! > point lookups and range scans are out of scope entirely.
//!
//! ##### About
//!
//! A [`Tree`] is opened against a [`NodeCache`] and starts out as a single
//! leaf. [`Tree::put`] assigns the write a fresh, globally monotonic
//! [`Msn`] and enters it at the root; the root is reorganized (split or
//! flushed) until it's stable enough to receive the write directly. Once
//! the root is an interior node, most writes only touch one partition
//! buffer under a read latch on the node plus a write lock on that
//! partition — the expensive, exclusive structural work (splitting,
//! draining a buffer toward a child) only happens when a node crosses a
//! configured threshold.
//!
//! # Example usage
//!
//! ```
//! use buffered_tree::{MessageType, Options, Tree};
//!
//! let tree = Tree::open_in_memory(Options::default())?;
//!
//! tree.put("a", "1", MessageType::Insert, None)?;
//! tree.put("b", "2", MessageType::Insert, None)?;
//! tree.put("a", "3", MessageType::Update, None)?;
//!
//! assert_eq!(tree.height(), 0);
//! assert_eq!(tree.status().leaf_puts(), 3);
//! #
//! # Ok::<(), buffered_tree::Error>(())
//! ```
//!
//! Lowering the leaf thresholds forces the root to split once it accumulates
//! enough entries:
//!
//! ```
//! use buffered_tree::{MessageType, Options, Tree};
//!
//! let opts = Options::new().leaf_node_page_count(3);
//! let tree = Tree::open_in_memory(opts)?;
//!
//! for key in ["a", "b", "c", "d"] {
//!     tree.put(key, "v", MessageType::Insert, None)?;
//! }
//!
//! assert_eq!(tree.height(), 1);
//! assert_eq!(tree.status().root_splits(), 1);
//! #
//! # Ok::<(), buffered_tree::Error>(())
//! ```

#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![deny(clippy::unwrap_used)]
#![warn(clippy::pedantic, clippy::nursery)]
#![warn(clippy::expect_used)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::module_name_repetitions)]

mod cache;
mod config;
mod error;
mod flush;
mod header;
mod message;
mod msgbuf;
mod msn;
mod nid;
mod node;
mod reactivity;
mod slice;
mod split;
mod status;
mod tree;
mod txn;

pub use cache::{LockType, MemNodeCache, NodeCache, PinnedNode};
pub use config::{CompressionMethod, Options};
pub use error::{Error, Result};
pub use header::{Header, HeaderStore, InMemoryHeaderStore};
pub use message::{Cmd, MessageType, TxnId, XidPair, TXNID_NONE};
pub use msgbuf::MsgBuf;
pub use msn::{Msn, MsnCounter};
pub use nid::{Nid, NidCounter, NID_START};
pub use node::{InteriorNode, LeafNode, Node, NodeHeader, Partition};
pub use reactivity::{classify, Reactivity};
pub use slice::Slice;
pub use status::Status;
pub use tree::Tree;
pub use txn::{FailingTransactionManager, NoopTransactionManager, TransactionManager, Txn};
