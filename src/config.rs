use serde::{Deserialize, Serialize};

use crate::{
  align::DEFAULT_ALIGNMENT,
  block::HeaderLayout,
  error::{HeapError, Result},
};

/// Default arena size in bytes.
pub const DEFAULT_HEAP_SIZE: usize = 1024;

/// What a free does with the block that follows it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FreePolicy {
  /// Merge the freed block with its successor when that one is free too.
  #[default]
  CoalesceForward,
  /// Only mark the block free; merging waits for `coalesce_all`.
  Deferred,
}

/// Heap configuration.
///
/// ```rust
/// use rheap::{FreePolicy, HeapConfig};
///
/// let config = HeapConfig::from_toml_str(
///   r#"
///     heap_size = 256
///     alignment = 4
///     free_policy = "deferred"
///   "#,
/// )
/// .unwrap();
///
/// assert_eq!(config, HeapConfig::new(256).with_alignment(4).with_free_policy(FreePolicy::Deferred));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct HeapConfig {
  /// Total arena length, headers included.
  pub heap_size: usize,
  /// Payload alignment; a power of two.
  pub alignment: usize,
  pub free_policy: FreePolicy,
}

impl Default for HeapConfig {
  fn default() -> Self {
    Self::new(DEFAULT_HEAP_SIZE)
  }
}

impl HeapConfig {
  pub const fn new(heap_size: usize) -> Self {
    Self {
      heap_size,
      alignment: DEFAULT_ALIGNMENT,
      free_policy: FreePolicy::CoalesceForward,
    }
  }

  pub const fn with_alignment(
    mut self,
    alignment: usize,
  ) -> Self {
    self.alignment = alignment;
    self
  }

  pub const fn with_free_policy(
    mut self,
    free_policy: FreePolicy,
  ) -> Self {
    self.free_policy = free_policy;
    self
  }

  /// Parses a TOML document. Missing keys take their defaults.
  pub fn from_toml_str(source: &str) -> Result<Self> {
    Ok(toml::from_str(source)?)
  }

  /// Checks the configuration and returns the header layout it implies.
  pub(crate) fn validate(
    &self,
    ref_counted: bool,
  ) -> Result<HeaderLayout> {
    let Self {
      heap_size,
      alignment,
      ..
    } = *self;

    if !alignment.is_power_of_two() {
      return Err(HeapError::InvalidAlignment { alignment });
    }

    let layout = HeaderLayout::new(ref_counted, alignment);
    let header_size = layout.size();

    if heap_size % alignment != 0 {
      return Err(HeapError::UnalignedHeapSize {
        heap_size,
        alignment,
      });
    }

    if heap_size < header_size + alignment {
      return Err(HeapError::HeapTooSmall {
        heap_size,
        header_size,
      });
    }

    let max = u32::MAX as usize;
    if heap_size > max {
      return Err(HeapError::HeapTooLarge { heap_size, max });
    }

    Ok(layout)
  }
}
