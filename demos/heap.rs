use rheap::{FreePolicy, Heap, HeapConfig, RcHeap};
use tracing_subscriber::EnvFilter;

/// Prints the block table followed by the raw arena bytes.
fn show(
  label: &str,
  heap: &Heap,
) {
  println!("\n[{label}]");
  print!("{heap}");
  print!("{}", heap.dump());
}

fn free_list_script() -> rheap::Result<()> {
  // Headers are 9 bytes with byte alignment, so the dump lines up with the
  // block table offsets one to one.
  let config = HeapConfig::new(128)
    .with_alignment(1)
    .with_free_policy(FreePolicy::Deferred);
  let mut heap = Heap::new(config)?;
  show("init", &heap);

  // --------------------------------------------------------------------
  // 1) Two allocations carve the single free block from the front.
  // --------------------------------------------------------------------
  let a = heap.allocate(20);
  let b = heap.allocate(30);
  show("allocate 20, allocate 30", &heap);

  // --------------------------------------------------------------------
  // 2) Freeing `a` only flips its flag: nothing merges yet.
  // --------------------------------------------------------------------
  heap.deallocate(a);
  show("free a", &heap);

  // --------------------------------------------------------------------
  // 3) First fit reuses a's block and splits off the remainder.
  // --------------------------------------------------------------------
  let c = heap.allocate(10);
  println!(
    "\n[3] c == a? {}",
    if c == a {
      "Yes, it reused the freed block"
    } else {
      "No, it allocated somewhere else"
    }
  );
  show("allocate 10", &heap);

  // --------------------------------------------------------------------
  // 4) Free `b`, then sweep: the three free neighbours become one.
  // --------------------------------------------------------------------
  heap.deallocate(b);
  show("free b", &heap);

  heap.coalesce_all();
  show("coalesce", &heap);

  println!("\n{:?}", heap.stats());
  Ok(())
}

fn ref_count_script() -> rheap::Result<()> {
  let mut heap = RcHeap::new(HeapConfig::new(64).with_alignment(1))?;

  let a = heap.allocate(20);
  let b = a;
  heap.retain(b);
  let c = heap.allocate(10);
  show("allocate 20 (a), retain as b, allocate 10 (c)", &heap);

  heap.release(c);
  heap.release(b);
  show("release c, release b", &heap);

  // Last reference: the block is freed and merges with c's old block.
  heap.release(a);
  show("release a", &heap);

  Ok(())
}

fn main() -> rheap::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .init();

  free_list_script()?;
  ref_count_script()
}
