use rheap::{FreePolicy, Heap, HeapConfig, HeapError, RcHeap};
use rstest::rstest;

fn shape(heap: &Heap) -> Vec<(usize, usize, bool)> {
  heap
    .describe_blocks()
    .map(|block| (block.offset, block.size, block.is_free))
    .collect()
}

/// allocate(20), allocate(30), free(a), allocate(10), free(b), sweep.
#[rstest]
#[case::unaligned(1, FreePolicy::CoalesceForward, 10)]
#[case::unaligned_deferred(1, FreePolicy::Deferred, 10)]
#[case::aligned(8, FreePolicy::CoalesceForward, 24)]
#[case::aligned_deferred(8, FreePolicy::Deferred, 24)]
fn reuse_then_sweep_leaves_one_free_block(
  #[case] alignment: usize,
  #[case] free_policy: FreePolicy,
  #[case] c_size: usize,
) {
  let config = HeapConfig::new(128)
    .with_alignment(alignment)
    .with_free_policy(free_policy);
  let mut heap = Heap::new(config).unwrap();
  let header = heap.header_size();

  let a = heap.allocate(20);
  let b = heap.allocate(30);
  heap.deallocate(a);
  let c = heap.allocate(10);
  assert_eq!(c, a);

  heap.deallocate(b);
  heap.coalesce_all();

  assert_eq!(
    shape(&heap),
    vec![
      (0, c_size, false),
      (header + c_size, 128 - c_size - 2 * header, true)
    ]
  );
  assert!(heap.verify().is_ok());
}

#[rstest]
#[case(64, 8)]
#[case(128, 8)]
#[case(1024, 16)]
#[case(100, 1)]
fn capacity_is_allocatable_exactly_once(
  #[case] heap_size: usize,
  #[case] alignment: usize,
) {
  let config = HeapConfig::new(heap_size).with_alignment(alignment);
  let mut heap = Heap::new(config).unwrap();
  let capacity = heap.capacity();

  assert!(matches!(
    heap.try_allocate(capacity + 1),
    Err(HeapError::Exhausted { .. })
  ));

  let whole = heap.allocate(capacity).unwrap();
  assert_eq!(heap.payload(whole).len(), capacity);
  assert_eq!(heap.allocate(capacity), None);
  assert_eq!(heap.allocate(1), None);

  heap.deallocate(whole);
  assert!(heap.allocate(capacity).is_some());
}

#[rstest]
#[case::leftover_below_header(8, false)]
#[case::leftover_equal_to_header(9, false)]
#[case::leftover_above_header(10, true)]
fn split_only_when_leftover_exceeds_header(
  #[case] leftover: usize,
  #[case] splits: bool,
) {
  let config = HeapConfig::new(64).with_alignment(1);
  let mut heap = Heap::new(config).unwrap();
  assert_eq!(heap.header_size(), 9);

  let request = heap.capacity() - leftover;
  let handle = heap.allocate(request).unwrap();

  let blocks = heap.describe_blocks().count();
  assert_eq!(blocks == 2, splits);

  let expected = if splits { request } else { heap.capacity() };
  assert_eq!(heap.payload(handle).len(), expected);
}

#[test]
fn first_fit_prefers_earlier_smaller_block() {
  let config = HeapConfig::new(128).with_alignment(1);
  let mut heap = Heap::new(config).unwrap();
  let small = heap.allocate(10);
  let _fence = heap.allocate(1);
  let large = heap.allocate(30);
  let _tail = heap.allocate(1);
  heap.deallocate(small);
  heap.deallocate(large);

  let free: Vec<_> = heap
    .describe_blocks()
    .filter(|block| block.is_free)
    .map(|block| block.size)
    .collect();
  assert_eq!(&free[..2], &[10, 30]);

  assert_eq!(heap.allocate(8), small);
}

#[test]
fn ref_counted_script() {
  let mut heap = RcHeap::new(HeapConfig::new(64).with_alignment(1)).unwrap();
  assert_eq!(heap.header_size(), 13);

  let a = heap.allocate(20);
  let b = a;
  heap.retain(b);
  let c = heap.allocate(10);

  heap.release(c);
  heap.release(b);
  let a_block = heap
    .describe_blocks()
    .find(|block| block.handle == a)
    .unwrap();
  assert_eq!(a_block.ref_count, Some(1));

  heap.release(a);
  assert!(heap.describe_blocks().all(|block| block.is_free));

  heap.coalesce_all();
  assert_eq!(heap.describe_blocks().count(), 1);
  assert!(heap.verify().is_ok());
}

#[test]
fn heaps_are_independent() {
  let mut first = Heap::new(HeapConfig::new(128)).unwrap();
  let mut second = Heap::new(HeapConfig::new(128)).unwrap();

  let a = first.allocate(64).unwrap();
  first.payload_mut(a).fill(1);

  assert_eq!(second.stats().free_blocks, 1);
  let b = second.allocate(64).unwrap();
  assert!(second.payload(b).iter().all(|&byte| byte == 0));
}

#[test]
fn config_from_toml_builds_heap() {
  let config = HeapConfig::from_toml_str(
    r#"
      heap_size = 96
      alignment = 16
      free_policy = "deferred"
    "#,
  )
  .unwrap();
  let heap = Heap::new(config).unwrap();

  assert_eq!(heap.heap_size(), 96);
  assert_eq!(heap.alignment(), 16);
  assert_eq!(heap.free_policy(), FreePolicy::Deferred);
  assert_eq!(heap.capacity(), 80);
}

#[rstest]
#[case(HeapConfig::new(128).with_alignment(6))]
#[case(HeapConfig::new(130))]
#[case(HeapConfig::new(8))]
fn invalid_configs_are_rejected(#[case] config: HeapConfig) {
  assert!(Heap::new(config).is_err());
  assert!(RcHeap::new(config).is_err());
}
