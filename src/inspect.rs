//! Read-only views over a heap: block descriptors, summary statistics and
//! printable layouts.

use std::fmt;

use crate::heap::{Handle, Heap};

/// One entry of the block chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
  /// Offset of the block header.
  pub offset: usize,
  /// Payload length, header excluded.
  pub size: usize,
  pub is_free: bool,
  /// `None` unless the heap keeps reference counts.
  pub ref_count: Option<u32>,
  /// Offset of the next header, `None` for the last block.
  pub next: Option<usize>,
  /// Handle of the payload while the block is allocated.
  pub handle: Option<Handle>,
}

/// Lazy iterator over the block chain, returned by
/// [`Heap::describe_blocks`].
pub struct Blocks<'a> {
  heap: &'a Heap,
  cursor: Option<usize>,
}

impl<'a> Blocks<'a> {
  pub(crate) fn new(heap: &'a Heap) -> Self {
    Self {
      heap,
      cursor: Some(0),
    }
  }
}

impl Iterator for Blocks<'_> {
  type Item = BlockInfo;

  fn next(&mut self) -> Option<BlockInfo> {
    let offset = self.cursor?;
    let header = self.heap.header(offset);

    // The chain only moves forward; anything else would loop forever.
    self.cursor = header.next.filter(|&next| next > offset);

    let handle = (!header.is_free).then(|| self.heap.handle_at(offset));

    Some(BlockInfo {
      offset,
      size: header.size,
      is_free: header.is_free,
      ref_count: self.heap.ref_counted().then_some(header.ref_count),
      next: header.next,
      handle,
    })
  }
}

/// Occupancy summary of a heap.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeapStats {
  pub blocks: usize,
  pub free_blocks: usize,
  /// Payload bytes in free blocks.
  pub free_bytes: usize,
  /// Payload bytes in allocated blocks, slack included.
  pub used_bytes: usize,
  /// Largest single free payload; the biggest request that can succeed
  /// before alignment.
  pub largest_free: usize,
}

impl FromIterator<BlockInfo> for HeapStats {
  fn from_iter<I: IntoIterator<Item = BlockInfo>>(blocks: I) -> Self {
    blocks.into_iter().fold(Self::default(), |mut stats, block| {
      stats.blocks += 1;

      if block.is_free {
        stats.free_blocks += 1;
        stats.free_bytes += block.size;
        stats.largest_free = stats.largest_free.max(block.size);
      } else {
        stats.used_bytes += block.size;
      }

      stats
    })
  }
}

impl fmt::Display for Heap {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    writeln!(f, "Heap layout:")?;

    for block in self.describe_blocks() {
      write!(
        f,
        "  offset={:<6} size={:<6} free={:<5}",
        block.offset, block.size, block.is_free
      )?;

      if let Some(ref_count) = block.ref_count {
        write!(f, " ref_count={ref_count:<3}")?;
      }

      match block.next {
        Some(next) => writeln!(f, " next={next}")?,
        None => writeln!(f, " next=-")?,
      }
    }

    Ok(())
  }
}

/// Raw arena bytes printed eight per line, returned by [`Heap::dump`].
pub struct HeapDump<'a> {
  bytes: &'a [u8],
}

impl<'a> HeapDump<'a> {
  pub(crate) fn new(bytes: &'a [u8]) -> Self {
    Self { bytes }
  }
}

impl fmt::Display for HeapDump<'_> {
  fn fmt(
    &self,
    f: &mut fmt::Formatter<'_>,
  ) -> fmt::Result {
    for (line, chunk) in self.bytes.chunks(8).enumerate() {
      write!(f, "{:06x}:", line * 8)?;

      for byte in chunk {
        write!(f, " {byte:02x}")?;
      }

      writeln!(f)?;
    }

    Ok(())
  }
}
