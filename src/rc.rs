use std::{fmt, ops::Deref};

use tracing::{trace, warn};

use crate::{
  config::HeapConfig,
  error::Result,
  heap::{Handle, Heap},
};

/// Heap whose blocks carry a reference count.
///
/// A fresh allocation starts with one reference. [`RcHeap::retain`] adds
/// one, [`RcHeap::release`] drops one and frees the block when none are
/// left. There is no direct `deallocate`.
///
/// Read-only inspection (`describe_blocks`, `stats`, `payload`, `verify`,
/// ...) is available through `Deref<Target = Heap>`.
pub struct RcHeap {
  heap: Heap,
}

impl RcHeap {
  pub fn new(config: HeapConfig) -> Result<Self> {
    Ok(Self {
      heap: Heap::with_layout(config, true)?,
    })
  }

  pub fn init_heap(&mut self) {
    self.heap.init_heap();
  }

  /// Allocates a block holding a single reference.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<Handle> {
    self.heap.allocate(size)
  }

  pub fn try_allocate(
    &mut self,
    size: usize,
  ) -> Result<Handle> {
    self.heap.try_allocate(size)
  }

  /// Adds a reference to a live block. `None` is a no-op.
  pub fn retain(
    &mut self,
    handle: impl Into<Option<Handle>>,
  ) {
    let Some(handle) = handle.into() else {
      return;
    };

    debug_assert!(
      self.heap.is_live(handle),
      "retain of {handle:?}, which is not a live allocation"
    );

    let offset = self.heap.block_offset(handle);
    let mut block = self.heap.header(offset);
    block.ref_count += 1;
    self.heap.write_header(offset, &block);

    trace!(
      handle = handle.offset(),
      ref_count = block.ref_count,
      "Retained block"
    );
  }

  /// Drops a reference; the block is freed when the count reaches zero.
  /// `None` is a no-op.
  ///
  /// Releasing more references than were taken is a caller bug. The extra
  /// release is ignored and logged rather than detected reliably: once a
  /// block has been merged into a neighbour its handle no longer names a
  /// header.
  pub fn release(
    &mut self,
    handle: impl Into<Option<Handle>>,
  ) {
    let Some(handle) = handle.into() else {
      return;
    };

    let offset = self.heap.block_offset(handle);
    let mut block = self.heap.header(offset);

    let Some(ref_count) = block.ref_count.checked_sub(1) else {
      warn!(handle = handle.offset(), "Release of a block with no references");
      return;
    };

    trace!(handle = handle.offset(), ref_count, "Released block");

    if ref_count == 0 {
      self.heap.free_block(offset);
    } else {
      block.ref_count = ref_count;
      self.heap.write_header(offset, &block);
    }
  }

  /// Current reference count of a live block.
  pub fn ref_count(
    &self,
    handle: Handle,
  ) -> u32 {
    self.heap.header(self.heap.block_offset(handle)).ref_count
  }

  pub fn coalesce_all(&mut self) {
    self.heap.coalesce_all();
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> &mut [u8] {
    self.heap.payload_mut(handle)
  }
}

impl Deref for RcHeap {
  type Target = Heap;

  fn deref(&self) -> &Heap {
    &self.heap
  }
}

impl fmt::Display for RcHeap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    fmt::Display::fmt(&self.heap, f)
  }
}
