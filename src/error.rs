//! Error types for heap configuration and allocation

use thiserror::Error;

/// Heap error types
#[derive(Error, Debug)]
pub enum HeapError {
  /// Alignment must be a non-zero power of two
  #[error("alignment {alignment} is not a power of two")]
  InvalidAlignment {
    /// The rejected alignment
    alignment: usize,
  },

  /// Heap size is not a multiple of the alignment
  #[error("heap size {heap_size} is not a multiple of alignment {alignment}")]
  UnalignedHeapSize {
    /// The configured heap size
    heap_size: usize,
    /// The configured alignment
    alignment: usize,
  },

  /// Heap cannot hold a single header plus one aligned payload unit
  #[error("heap size {heap_size} cannot hold a {header_size}-byte header and a payload")]
  HeapTooSmall {
    /// The configured heap size
    heap_size: usize,
    /// Header length for the requested layout
    header_size: usize,
  },

  /// Heap size does not fit the header's offset width
  #[error("heap size {heap_size} exceeds the addressable maximum of {max} bytes")]
  HeapTooLarge {
    /// The configured heap size
    heap_size: usize,
    /// Largest heap the header encoding can address
    max: usize,
  },

  /// Configuration could not be parsed
  #[error("invalid heap configuration: {0}")]
  Config(#[from] toml::de::Error),

  /// Zero-sized allocation request
  #[error("zero-sized allocation request")]
  ZeroSize,

  /// No free block is large enough
  #[error("cannot allocate {requested} bytes: largest free block holds {largest_free}")]
  Exhausted {
    /// The requested size before alignment
    requested: usize,
    /// Size of the largest free block at the time of the request
    largest_free: usize,
  },

  /// The block chain violates a structural invariant
  #[error("block chain corrupted at offset {offset}: {reason}")]
  Corrupted {
    /// Offset of the offending header
    offset: usize,
    /// Which invariant failed
    reason: &'static str,
  },
}

/// Result alias for heap operations
pub type Result<T> = std::result::Result<T, HeapError>;
