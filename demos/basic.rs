//! Interactive demo for `tcalloc`. Allocates and releases a handful of
//! blocks across both size regimes, pausing between steps so the memory
//! usage of the process can be inspected externally (e.g. `ps`, `/proc`).

use std::io::{self, Write};
use tcalloc::stats;

fn pause(step: &str) {
  print!("[{step}] press Enter to continue... ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().read_line(&mut line).ok();
}

fn print_stats() {
  let s = stats::snapshot();
  println!(
    "  stats: pages_mapped={} chunks_allocated={} chunks_freed={} free_list_len={}",
    s.pages_mapped, s.chunks_allocated, s.chunks_freed, s.free_list_len
  );
}

fn main() {
  env_logger::init();

  println!("tcalloc demo");
  print_stats();
  pause("start");

  let small = tcalloc::allocate(100);
  println!("allocated 100 bytes at {small:p}");
  print_stats();
  pause("small allocation");

  let large = tcalloc::allocate(3 * 1024 * 1024);
  println!("allocated 3 MiB at {large:p}");
  print_stats();
  pause("large allocation");

  let grown = unsafe { tcalloc::reallocate(small, 10_000) };
  println!("grew the small allocation to 10000 bytes, now at {grown:p}");
  print_stats();
  pause("grow");

  unsafe {
    tcalloc::release(grown);
    tcalloc::release(large);
  }
  println!("released both blocks");
  print_stats();
  pause("done");
}
