//! In-band block metadata.
//!
//! Every block in the arena starts with a header. The header is stored as
//! raw little-endian bytes so the arena can be dumped and inspected exactly
//! as it would look in a C-style heap:
//!
//! ```text
//!   offset  0      4      8    9           13
//!           ┌──────┬──────┬────┬────────────┬─────────┐
//!           │ size │ next │free│ ref_count* │ padding │
//!           └──────┴──────┴────┴────────────┴─────────┘
//!
//!   * reference-counted layout only
//! ```
//!
//! `next == 0` encodes the end of the chain. Offset 0 always holds the
//! first header, so no other header can legitimately point back to it.

const SIZE_FIELD: usize = 0;
const NEXT_FIELD: usize = 4;
const FREE_FIELD: usize = 8;
const REF_COUNT_FIELD: usize = 9;

const PLAIN_LEN: usize = 9;
const REF_COUNTED_LEN: usize = 13;

/// Decoded form of one block header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BlockHeader {
  pub size: usize,
  pub is_free: bool,
  pub next: Option<usize>,
  pub ref_count: u32,
}

impl BlockHeader {
  pub fn free(
    size: usize,
    next: Option<usize>,
  ) -> Self {
    Self {
      size,
      is_free: true,
      next,
      ref_count: 0,
    }
  }
}

/// Byte layout of a header inside the arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct HeaderLayout {
  ref_counted: bool,
  size: usize,
}

impl HeaderLayout {
  pub fn new(
    ref_counted: bool,
    alignment: usize,
  ) -> Self {
    let raw = if ref_counted { REF_COUNTED_LEN } else { PLAIN_LEN };

    Self {
      ref_counted,
      size: crate::align_to!(raw, alignment),
    }
  }

  /// Header length in bytes, padded to the heap alignment.
  pub fn size(&self) -> usize {
    self.size
  }

  pub fn ref_counted(&self) -> bool {
    self.ref_counted
  }

  pub fn read(
    &self,
    arena: &[u8],
    offset: usize,
  ) -> BlockHeader {
    let next = read_u32(arena, offset + NEXT_FIELD) as usize;
    let ref_count = if self.ref_counted {
      read_u32(arena, offset + REF_COUNT_FIELD)
    } else {
      0
    };

    BlockHeader {
      size: read_u32(arena, offset + SIZE_FIELD) as usize,
      is_free: arena[offset + FREE_FIELD] != 0,
      next: (next != 0).then_some(next),
      ref_count,
    }
  }

  /// Encodes `header` at `offset`.
  ///
  /// Sizes and offsets fit in `u32`: heap sizes above `u32::MAX` are
  /// rejected when the heap is configured.
  pub fn write(
    &self,
    arena: &mut [u8],
    offset: usize,
    header: &BlockHeader,
  ) {
    write_u32(arena, offset + SIZE_FIELD, header.size as u32);
    write_u32(arena, offset + NEXT_FIELD, header.next.unwrap_or(0) as u32);
    arena[offset + FREE_FIELD] = u8::from(header.is_free);

    if self.ref_counted {
      write_u32(arena, offset + REF_COUNT_FIELD, header.ref_count);
    }
  }
}

fn read_u32(
  arena: &[u8],
  at: usize,
) -> u32 {
  let mut bytes = [0u8; 4];
  bytes.copy_from_slice(&arena[at..at + 4]);
  u32::from_le_bytes(bytes)
}

fn write_u32(
  arena: &mut [u8],
  at: usize,
  value: u32,
) {
  arena[at..at + 4].copy_from_slice(&value.to_le_bytes());
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_layout_sizes() {
    assert_eq!(HeaderLayout::new(false, 1).size(), 9);
    assert_eq!(HeaderLayout::new(true, 1).size(), 13);
    assert_eq!(HeaderLayout::new(false, 8).size(), 16);
    assert_eq!(HeaderLayout::new(true, 8).size(), 16);
    assert_eq!(HeaderLayout::new(true, 4).size(), 16);
  }

  #[test]
  fn test_write_then_read() {
    let layout = HeaderLayout::new(true, 8);
    let mut arena = [0u8; 64];
    let header = BlockHeader {
      size: 24,
      is_free: false,
      next: Some(40),
      ref_count: 3,
    };

    layout.write(&mut arena, 0, &header);

    assert_eq!(layout.read(&arena, 0), header);
    assert_eq!(&arena[0..4], &24u32.to_le_bytes());
    assert_eq!(&arena[4..8], &40u32.to_le_bytes());
    assert_eq!(arena[8], 0);
  }

  #[test]
  fn test_plain_layout_has_no_ref_count() {
    let layout = HeaderLayout::new(false, 1);
    let mut arena = [0xFFu8; 32];
    let mut header = BlockHeader::free(7, None);
    header.ref_count = 5;

    layout.write(&mut arena, 0, &header);

    assert_eq!(arena[9], 0xFF);
    assert_eq!(layout.read(&arena, 0), BlockHeader::free(7, None));
  }
}
