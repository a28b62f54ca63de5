// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Represents errors that can occur while operating the tree.
///
/// Logic faults (an unreachable reactivity classification, a missing
/// partition buffer, a root NID that drifted) are not represented here —
/// those are invariant violations and the implementation panics instead of
/// returning an `Error`. This type only carries failures from external
/// collaborators (the node cache, the transaction manager) that a caller can
/// reasonably recover from.
#[derive(Debug)]
pub enum Error {
    /// The node cache failed to fetch, pin or create a node.
    ///
    /// Raised by `get_and_pin`/`create_node` failures during the write path
    /// or a flush; no tree state is mutated when this occurs, since a
    /// partition buffer is only drained after its child has been pinned
    /// successfully.
    Cache(String),

    /// The transaction manager failed to persist a rollback log record.
    ///
    /// `put` must surface this before allocating an MSN for the command
    /// (rollback logging happens-before MSN allocation), so the tree never
    /// advances its sequence counter for a write that isn't durably
    /// rollback-able.
    Rollback(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cache(msg) => write!(f, "node cache error: {msg}"),
            Self::Rollback(msg) => write!(f, "rollback log error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Tree result.
pub type Result<T> = std::result::Result<T, Error>;
