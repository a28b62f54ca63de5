// Copyright (c) 2024-present, fjall-rs
// This source code is licensed under both the Apache 2.0 and MIT License
// (found in the LICENSE-* files in the repository)

/// Compression method persisted in the tree header.
///
/// No codec is implemented by this crate (compression is explicitly out of
/// scope); the value is only round-tripped through [`crate::Header`] for the
/// benefit of the (external) serialization collaborator.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// No compression.
    #[default]
    None,

    /// LZ4 (not implemented here, opaque to this crate).
    Lz4,

    /// Zstd (not implemented here, opaque to this crate).
    Zstd,
}

/// Fission/flush thresholds and other knobs that drive the reactivity
/// classifier and the on-open file policy.
///
/// # Examples
///
/// ```
/// use buffered_tree::Options;
///
/// let opts = Options::new()
///     .leaf_node_page_size(4 * 1024 * 1024)
///     .leaf_node_page_count(128)
///     .inner_node_fanout(16);
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct Options {
    /// Leaf buffer byte threshold above which (with more than one entry) a
    /// leaf becomes fissible.
    pub leaf_node_page_size: usize,

    /// Leaf entry-count threshold above which a leaf becomes fissible
    /// regardless of byte size.
    pub leaf_node_page_count: usize,

    /// Interior node byte threshold (summed across all partition buffers)
    /// above which an interior node becomes flushable, provided no
    /// partition buffer is empty.
    pub inner_node_page_size: usize,

    /// Interior node entry-count threshold above which an interior node
    /// becomes flushable regardless of byte size.
    pub inner_node_page_count: usize,

    /// Child-count threshold at or above which an interior node becomes
    /// fissible (split takes priority over flush at this point).
    pub inner_node_fanout: usize,

    /// Compression method recorded in the header.
    pub compress_method: CompressionMethod,

    /// Whether to prefer direct (unbuffered) I/O when opening the backing
    /// store. This crate does not perform real file I/O, but the flag is
    /// threaded through [`crate::Tree::open`] so a real [`crate::NodeCache`]
    /// implementation can honor it.
    pub use_directio: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            leaf_node_page_size: 4 * 1024 * 1024,
            leaf_node_page_count: 1 << 20,
            inner_node_page_size: 4 * 1024 * 1024,
            inner_node_page_count: 1 << 20,
            inner_node_fanout: 16,
            compress_method: CompressionMethod::default(),
            use_directio: false,
        }
    }
}

impl Options {
    /// Creates a new options set with the default thresholds.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the leaf byte-size fission threshold.
    #[must_use]
    pub fn leaf_node_page_size(mut self, bytes: usize) -> Self {
        self.leaf_node_page_size = bytes;
        self
    }

    /// Sets the leaf entry-count fission threshold.
    #[must_use]
    pub fn leaf_node_page_count(mut self, count: usize) -> Self {
        self.leaf_node_page_count = count;
        self
    }

    /// Sets the interior byte-size flush threshold.
    #[must_use]
    pub fn inner_node_page_size(mut self, bytes: usize) -> Self {
        self.inner_node_page_size = bytes;
        self
    }

    /// Sets the interior entry-count flush threshold.
    #[must_use]
    pub fn inner_node_page_count(mut self, count: usize) -> Self {
        self.inner_node_page_count = count;
        self
    }

    /// Sets the interior child-count fission threshold.
    #[must_use]
    pub fn inner_node_fanout(mut self, fanout: usize) -> Self {
        self.inner_node_fanout = fanout;
        self
    }

    /// Sets the compression method recorded in the header.
    #[must_use]
    pub fn compress_method(mut self, method: CompressionMethod) -> Self {
        self.compress_method = method;
        self
    }

    /// Sets whether to prefer direct I/O when opening the backing store.
    #[must_use]
    pub fn use_directio(mut self, enabled: bool) -> Self {
        self.use_directio = enabled;
        self
    }
}
