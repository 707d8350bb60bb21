use tracing::{debug, trace};

use crate::{
  align_to,
  block::{BlockHeader, HeaderLayout},
  config::{FreePolicy, HeapConfig},
  error::{HeapError, Result},
  inspect::{Blocks, HeapDump, HeapStats},
};

/// Arena-relative offset of a live payload, as returned by
/// [`Heap::allocate`].
///
/// A handle is only meaningful for the heap that issued it, and only until
/// its block is freed. Using it afterwards is a caller bug; the heap does
/// not detect it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
  /// Offset of the first payload byte inside the arena.
  pub fn offset(self) -> usize {
    self.0
  }
}

/// First-fit heap over a fixed, owned byte arena.
///
/// Block headers live inside the arena and form a single chain in address
/// order that covers every block, free or allocated.
pub struct Heap {
  arena: Box<[u8]>,
  layout: HeaderLayout,
  alignment: usize,
  free_policy: FreePolicy,
}

impl Heap {
  pub fn new(config: HeapConfig) -> Result<Self> {
    Self::with_layout(config, false)
  }

  pub(crate) fn with_layout(
    config: HeapConfig,
    ref_counted: bool,
  ) -> Result<Self> {
    let layout = config.validate(ref_counted)?;

    let mut heap = Self {
      arena: vec![0; config.heap_size].into_boxed_slice(),
      layout,
      alignment: config.alignment,
      free_policy: config.free_policy,
    };
    heap.init_heap();

    Ok(heap)
  }

  /// Resets the chain to a single free block spanning the arena.
  ///
  /// Every outstanding handle becomes invalid.
  pub fn init_heap(&mut self) {
    let header = BlockHeader::free(self.capacity(), None);
    self.write_header(0, &header);

    debug!(
      heap_size = self.heap_size(),
      header_size = self.header_size(),
      capacity = header.size,
      ref_counted = self.layout.ref_counted(),
      "Heap initialized"
    );
  }

  /// Allocates at least `size` bytes.
  ///
  /// Returns `None` for a zero-sized request or when no free block is large
  /// enough.
  pub fn allocate(
    &mut self,
    size: usize,
  ) -> Option<Handle> {
    self.try_allocate(size).ok()
  }

  /// Like [`Heap::allocate`], but reports why the request failed.
  pub fn try_allocate(
    &mut self,
    requested: usize,
  ) -> Result<Handle> {
    if requested == 0 {
      return Err(HeapError::ZeroSize);
    }

    let found = if requested <= self.capacity() {
      let size = align_to!(requested, self.alignment);
      self.find_free_block(size).map(|offset| (offset, size))
    } else {
      None
    };

    let Some((offset, size)) = found else {
      let largest_free = self.stats().largest_free;
      debug!(requested, largest_free, "Heap exhausted");
      return Err(HeapError::Exhausted {
        requested,
        largest_free,
      });
    };

    let header_size = self.header_size();
    let mut block = self.header(offset);

    // Leftover too small for a header stays inside the block as slack.
    let remaining = block.size - size;
    if remaining > header_size {
      let split_at = offset + header_size + size;
      let rest = BlockHeader::free(remaining - header_size, block.next);
      self.write_header(split_at, &rest);

      trace!(offset, split_at, rest_size = rest.size, "Split block");

      block.next = Some(split_at);
      block.size = size;
    }

    block.is_free = false;
    block.ref_count = 1;
    self.write_header(offset, &block);
    self.debug_verify();

    let handle = self.handle_at(offset);
    trace!(
      requested,
      size = block.size,
      handle = handle.offset(),
      "Allocated block"
    );

    Ok(handle)
  }

  fn find_free_block(
    &self,
    size: usize,
  ) -> Option<usize> {
    self
      .describe_blocks()
      .find(|block| block.is_free && block.size >= size)
      .map(|block| block.offset)
  }

  /// Frees the block behind `handle`. `None` is a no-op.
  ///
  /// With [`FreePolicy::CoalesceForward`] the block also absorbs its
  /// successor when that one is free. Blocks are never merged backwards;
  /// use [`Heap::coalesce_all`] for that.
  ///
  /// Freeing a handle twice, or one this heap did not issue, is a caller
  /// bug with unspecified results. Debug builds assert against it.
  pub fn deallocate(
    &mut self,
    handle: impl Into<Option<Handle>>,
  ) {
    let Some(handle) = handle.into() else {
      return;
    };

    debug_assert!(
      self.is_live(handle),
      "deallocate of {handle:?}, which is not a live allocation"
    );

    self.free_block(self.block_offset(handle));
  }

  pub(crate) fn free_block(
    &mut self,
    offset: usize,
  ) {
    let mut block = self.header(offset);
    block.is_free = true;
    block.ref_count = 0;

    if self.free_policy == FreePolicy::CoalesceForward {
      if let Some(next) = block.next {
        let successor = self.header(next);
        if successor.is_free {
          self.absorb(&mut block, &successor);
          trace!(offset, absorbed = next, size = block.size, "Merged with next block");
        }
      }
    }

    self.write_header(offset, &block);
    self.debug_verify();

    trace!(offset, size = block.size, "Freed block");
  }

  /// Merges every run of adjacent free blocks into a single block.
  pub fn coalesce_all(&mut self) {
    let mut merged = 0usize;
    let mut offset = 0;
    let mut block = self.header(offset);

    while let Some(next) = block.next {
      let successor = self.header(next);

      if block.is_free && successor.is_free {
        // Stay on this block: the merged span may touch another free one.
        self.absorb(&mut block, &successor);
        self.write_header(offset, &block);
        merged += 1;
      } else {
        offset = next;
        block = successor;
      }
    }

    self.debug_verify();
    debug!(merged, "Coalesced free blocks");
  }

  fn absorb(
    &self,
    block: &mut BlockHeader,
    successor: &BlockHeader,
  ) {
    block.size += self.header_size() + successor.size;
    block.next = successor.next;
  }

  /// Payload bytes of a live block. The slice may be longer than the
  /// requested size because of alignment and unsplit slack.
  pub fn payload(
    &self,
    handle: Handle,
  ) -> &[u8] {
    let size = self.header(self.block_offset(handle)).size;
    &self.arena[handle.0..handle.0 + size]
  }

  pub fn payload_mut(
    &mut self,
    handle: Handle,
  ) -> &mut [u8] {
    let size = self.header(self.block_offset(handle)).size;
    &mut self.arena[handle.0..handle.0 + size]
  }

  /// Walks the chain lazily in address order.
  pub fn describe_blocks(&self) -> Blocks<'_> {
    Blocks::new(self)
  }

  /// The whole arena, headers included.
  pub fn dump_raw(&self) -> &[u8] {
    &self.arena
  }

  /// Hex view of the arena, eight bytes per line.
  pub fn dump(&self) -> HeapDump<'_> {
    HeapDump::new(&self.arena)
  }

  pub fn stats(&self) -> HeapStats {
    self.describe_blocks().collect()
  }

  /// Checks that the chain tiles the arena exactly and, for the
  /// reference-counted layout, that counts agree with the free flags.
  pub fn verify(&self) -> Result<()> {
    let heap_size = self.heap_size();
    let header_size = self.header_size();
    let mut offset = 0;

    loop {
      if offset + header_size > heap_size {
        return Err(HeapError::Corrupted {
          offset,
          reason: "header extends past the end of the arena",
        });
      }

      let block = self.header(offset);
      let end = offset + header_size + block.size;

      if end > heap_size {
        return Err(HeapError::Corrupted {
          offset,
          reason: "payload extends past the end of the arena",
        });
      }

      if self.layout.ref_counted() && block.is_free != (block.ref_count == 0) {
        return Err(HeapError::Corrupted {
          offset,
          reason: "reference count disagrees with the free flag",
        });
      }

      match block.next {
        None if end == heap_size => return Ok(()),
        None => {
          return Err(HeapError::Corrupted {
            offset,
            reason: "chain ends before the arena does",
          });
        },
        Some(next) if next != end => {
          return Err(HeapError::Corrupted {
            offset,
            reason: "next header does not start where the block ends",
          });
        },
        Some(next) => offset = next,
      }
    }
  }

  fn debug_verify(&self) {
    if cfg!(debug_assertions) {
      if let Err(err) = self.verify() {
        panic!("heap invariant violated: {err}");
      }
    }
  }

  pub fn heap_size(&self) -> usize {
    self.arena.len()
  }

  pub fn header_size(&self) -> usize {
    self.layout.size()
  }

  /// Largest payload a fresh heap can hand out.
  pub fn capacity(&self) -> usize {
    self.heap_size() - self.header_size()
  }

  pub fn alignment(&self) -> usize {
    self.alignment
  }

  pub fn free_policy(&self) -> FreePolicy {
    self.free_policy
  }

  pub(crate) fn ref_counted(&self) -> bool {
    self.layout.ref_counted()
  }

  pub(crate) fn is_live(
    &self,
    handle: Handle,
  ) -> bool {
    self
      .describe_blocks()
      .any(|block| block.handle == Some(handle))
  }

  pub(crate) fn handle_at(
    &self,
    offset: usize,
  ) -> Handle {
    Handle(offset + self.header_size())
  }

  pub(crate) fn block_offset(
    &self,
    handle: Handle,
  ) -> usize {
    handle.0 - self.header_size()
  }

  pub(crate) fn header(
    &self,
    offset: usize,
  ) -> BlockHeader {
    self.layout.read(&self.arena, offset)
  }

  pub(crate) fn write_header(
    &mut self,
    offset: usize,
    header: &BlockHeader,
  ) {
    self.layout.write(&mut self.arena, offset, header);
  }
}
