//! # rheap - A Simulated Heap Allocator
//!
//! This crate provides a `malloc`/`free`-style allocator that hands out
//! blocks from a fixed-size byte arena owned by the allocator instance.
//!
//! ## Overview
//!
//! Every block starts with an in-band header. Headers are chained by
//! offset in address order, and the chain covers the whole arena: free and
//! allocated blocks alike.
//!
//! ```text
//!   Arena after a few allocations:
//!
//!   ┌────────┬──────────┬────────┬──────────┬────────┬──────────────────┐
//!   │ header │ payload  │ header │ payload  │ header │   free payload   │
//!   │ used   │ (A)      │ free   │          │ used   │                  │
//!   └────────┴──────────┴────────┴──────────┴────────┴──────────────────┘
//!   0   │                  ▲ │                 ▲ │                     HEAP_SIZE
//!       └── next ──────────┘ └── next ─────────┘ └── next = null
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   rheap
//!   ├── align      - Alignment macro (align_to!)
//!   ├── block      - Header layout and byte encoding (internal)
//!   ├── config     - HeapConfig, FreePolicy, TOML loading
//!   ├── error      - HeapError
//!   ├── heap       - Heap, Handle
//!   ├── inspect    - BlockInfo, HeapStats, printable views
//!   └── rc         - RcHeap (reference-counted blocks)
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use rheap::{Heap, HeapConfig};
//!
//! let mut heap = Heap::new(HeapConfig::new(128)).unwrap();
//!
//! let a = heap.allocate(20).unwrap();
//! heap.payload_mut(a)[..5].copy_from_slice(b"hello");
//! assert_eq!(&heap.payload(a)[..5], b"hello");
//!
//! heap.deallocate(a);
//! heap.coalesce_all();
//! assert_eq!(heap.stats().largest_free, heap.capacity());
//! ```
//!
//! ## How It Works
//!
//! Allocation is first-fit: the chain is scanned from offset 0 and the
//! first free block whose payload can hold the aligned request is taken.
//! When the leftover space can hold another header, it is split off as a
//! new free block:
//!
//! ```text
//!   Before:  ┌────────┬───────────────────────────────────────┐
//!            │ free   │                 size = S              │
//!            └────────┴───────────────────────────────────────┘
//!
//!   After:   ┌────────┬────────────┬────────┬─────────────────┐
//!            │ used   │  size = N  │ free   │ S - N - header  │
//!            └────────┴────────────┴────────┴─────────────────┘
//!                     ▲
//!                     └── Handle returned to the caller
//! ```
//!
//! Freeing derives the header from the handle in constant time. Depending
//! on [`FreePolicy`], the freed block either absorbs a free successor right
//! away or waits for [`Heap::coalesce_all`], which merges every run of
//! adjacent free blocks in one pass.
//!
//! ## Features
//!
//! - **Safe offsets**: handles are arena offsets, never raw pointers
//! - **Configurable alignment**: payloads start on aligned offsets
//! - **Reference counting**: [`RcHeap`] frees a block when its last
//!   reference is released
//! - **Inspection**: block descriptors, statistics, and raw dumps
//!
//! ## Limitations
//!
//! - **Single-threaded only**: wrap the heap in a lock to share it
//! - **Fixed capacity**: the arena never grows
//! - **Caller contracts**: double frees and foreign handles are not
//!   detected in release builds

pub mod align;
mod block;
mod config;
mod error;
mod heap;
mod inspect;
mod rc;

pub use config::{DEFAULT_HEAP_SIZE, FreePolicy, HeapConfig};
pub use error::{HeapError, Result};
pub use heap::{Handle, Heap};
pub use inspect::{BlockInfo, Blocks, HeapDump, HeapStats};
pub use rc::RcHeap;
