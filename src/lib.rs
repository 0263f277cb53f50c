//! # tcalloc - A Thread-Caching Memory Allocator
//!
//! This crate provides a general-purpose dynamic memory allocator built as
//! two tiers: a private, per-thread cache of power-of-two buckets, and a
//! single shared arena of chunk-sized blocks behind one mutex.
//!
//! ## Overview
//!
//! Most allocators trade off between "always lock" (simple, contended) and
//! "never lock" (fast, memory-hungry). This one keeps most traffic off the
//! lock entirely by giving each thread its own small-object cache, and only
//! falling back to a shared pool in coarse, chunk-sized units:
//!
//! ```text
//!   Two-Tier Allocator Concept:
//!
//!   ┌──────────────────────────────────────────────────────────────────────┐
//!   │                         GLOBAL ARENA (mutex)                         │
//!   │   address-ordered free list, block sizes are multiples of C         │
//!   └───────────────────────────────┬──────────────────────────────────────┘
//!                        one chunk (C bytes) at a time
//!                ┌───────────────────┼───────────────────┐
//!                ▼                   ▼                   ▼
//!   ┌────────────────────┐ ┌────────────────────┐ ┌────────────────────┐
//!   │  thread A's cache   │ │  thread B's cache   │ │  thread C's cache   │
//!   │  bucket[k_min..K]   │ │  bucket[k_min..K]   │ │  bucket[k_min..K]   │
//!   │  (lock-free)        │ │  (lock-free)        │ │  (lock-free)        │
//!   └────────────────────┘ └────────────────────┘ └────────────────────┘
//! ```
//!
//! ## Crate Structure
//!
//! ```text
//!   tcalloc
//!   ├── block      - in-band block header (size, next)
//!   ├── list       - address-ordered singly linked list primitives
//!   ├── size_class - log2/chunk rounding arithmetic
//!   ├── config     - CHUNK_SIZE, SEED_SIZE, and their invariant checks
//!   ├── page       - the mmap-based page source
//!   ├── fault      - the two abort paths
//!   ├── arena      - the shared, mutex-guarded chunk free list
//!   ├── cache      - the per-thread bucket cache
//!   ├── init       - one-shot startup
//!   └── stats      - best-effort observability counters
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use tcalloc::TcAlloc;
//!
//! #[global_allocator]
//! static ALLOCATOR: TcAlloc = TcAlloc;
//!
//! fn main() {
//!     let v: Vec<u8> = Vec::with_capacity(128);
//!     drop(v);
//! }
//! ```
//!
//! Or use the free functions directly:
//!
//! ```rust,ignore
//! unsafe {
//!     let p = tcalloc::allocate(100);
//!     *p = 42;
//!     tcalloc::release(p);
//! }
//! ```
//!
//! ## How It Works
//!
//! A small request (rounded size, header included, no larger than the chunk
//! size `C`) is served from the calling thread's own bucket array, splitting
//! a larger cached block on a miss and refilling from the arena only when
//! the thread's cache is completely out of chunk-sized material. A large
//! request goes straight to the arena, which in turn asks the operating
//! system for fresh pages only when its own free list can't satisfy the
//! request.
//!
//! ## Limitations
//!
//! - **No extra alignment**: requests get their block's natural alignment,
//!   not arbitrary requested alignment.
//! - **No shrink-to-fit across size classes**: shrinking a small-regime
//!   block never moves it to a smaller bucket in place.
//! - **No memory returned to the OS**: once mapped, a region is never
//!   unmapped, only recycled internally.
//! - **Abort on exhaustion**: there is no recoverable out-of-memory path.
//!
//! ## Safety
//!
//! This crate is inherently unsafe as it deals with raw memory management.
//! The free functions (`allocate`, `release`, `reallocate`) and the
//! `GlobalAlloc` implementation all require the caller to uphold the usual
//! allocator contracts (only release pointers this crate produced, exactly
//! once, with the size passed to the matching `allocate`/`reallocate` call).

mod arena;
mod block;
mod cache;
mod config;
mod fault;
mod init;
mod list;
mod page;
mod size_class;
pub mod stats;

use block::{HEADER_SIZE, header_of, payload_of};
use config::CHUNK_SIZE;
use size_class::{chunks_up, log_up};
use std::alloc::{GlobalAlloc, Layout};
use std::ptr;

/// Allocates a block of at least `bytes` usable bytes and returns a
/// pointer to its payload. Never returns null; aborts the process if the
/// underlying page source is exhausted.
pub fn allocate(bytes: usize) -> *mut u8 {
  init::ensure_initialized();

  let total = bytes.saturating_add(HEADER_SIZE);
  let block = if total <= CHUNK_SIZE {
    let i = log_up(total);
    let block = cache::allocate(i);
    unsafe {
      debug_assert_eq!((*block).size, 1usize << i);
    }
    block
  } else {
    arena::global().allocate(total)
  };

  payload_of(block)
}

/// Returns a block previously obtained from [`allocate`] or [`reallocate`].
///
/// # Safety
///
/// `ptr` must have been returned by this crate's `allocate`/`reallocate`
/// and must not already have been released.
pub unsafe fn release(ptr: *mut u8) {
  unsafe {
    let block = header_of(ptr);
    let size = (*block).size;
    if size > CHUNK_SIZE {
      arena::global().release(block);
    } else {
      cache::release(block, size.trailing_zeros());
    }
  }
}

/// Resizes a block previously obtained from [`allocate`] or [`reallocate`]
/// to hold at least `bytes` usable bytes, returning the (possibly new)
/// payload pointer.
///
/// Calling with `bytes == 0` is equivalent to [`release`] and returns a
/// null pointer. Growing a block does **not** copy the old contents to the
/// new location; this mirrors the allocator this crate is descended from
/// and is surprising enough to call out explicitly. Callers that need the
/// old bytes preserved across a grow must copy them before calling.
///
/// # Safety
///
/// `ptr` must have been returned by this crate's `allocate`/`reallocate`
/// and must not already have been released.
pub unsafe fn reallocate(ptr: *mut u8, bytes: usize) -> *mut u8 {
  unsafe {
    if bytes == 0 {
      release(ptr);
      return ptr::null_mut();
    }

    let block = header_of(ptr);
    let old_size = (*block).size;
    let total = bytes.saturating_add(HEADER_SIZE);

    // The regime of the *new* requested size decides how a shrink is
    // handled, not the regime of the block currently under `ptr` — a large
    // block shrinking into the small regime still returns unchanged, since
    // there is nowhere to put a small-regime block other than its own
    // cache bucket.
    let target = if total <= CHUNK_SIZE {
      1usize << log_up(total)
    } else {
      chunks_up(total) * CHUNK_SIZE
    };

    if target == old_size {
      return ptr;
    }
    if target > old_size {
      release(ptr);
      return allocate(bytes);
    }

    // target < old_size: only a large-regime target shrinks in place, by
    // splitting off the excess whole chunks and releasing them to the
    // arena. A small-regime target never moves the block to a smaller
    // bucket in place, regardless of the old block's own regime.
    if target > CHUNK_SIZE {
      let suffix = block::split(block, target)
        .unwrap_or_else(|| crate::fault::invariant_violation("shrink target smaller than old size produced no suffix"));
      arena::global().release(suffix);
    }
    ptr
  }
}

/// A [`GlobalAlloc`] wrapper around [`allocate`]/[`release`]/[`reallocate`],
/// suitable for installation as a process's `#[global_allocator]`.
pub struct TcAlloc;

unsafe impl GlobalAlloc for TcAlloc {
  unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
    allocate(layout.size())
  }

  unsafe fn dealloc(&self, ptr: *mut u8, _layout: Layout) {
    unsafe { release(ptr) };
  }

  unsafe fn realloc(&self, ptr: *mut u8, _layout: Layout, new_size: usize) -> *mut u8 {
    unsafe { reallocate(ptr, new_size) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_then_release_round_trips() {
    let p = allocate(100);
    assert!(!p.is_null());
    unsafe {
      *p = 7;
      assert_eq!(*p, 7);
      release(p);
    }
  }

  #[test]
  fn a_large_request_is_served_by_the_arena() {
    let p = allocate(2 * CHUNK_SIZE + 5);
    assert!(!p.is_null());
    unsafe {
      let block = header_of(p);
      assert_eq!((*block).size, 3 * CHUNK_SIZE);
      release(p);
    }
  }

  #[test]
  fn reallocate_to_zero_is_equivalent_to_release() {
    let p = allocate(64);
    let result = unsafe { reallocate(p, 0) };
    assert!(result.is_null());
  }

  #[test]
  fn shrinking_within_the_same_small_bucket_is_a_no_op() {
    let p = allocate(1000);
    unsafe {
      let before = header_of(p) as usize;
      let q = reallocate(p, 500);
      assert_eq!(q as usize, before);
      release(q);
    }
  }

  #[test]
  fn growing_does_not_preserve_contents() {
    let p = allocate(8);
    unsafe {
      *p = 0xAB;
      let q = reallocate(p, 10_000);
      assert!(!q.is_null());
      release(q);
    }
  }

  #[test]
  fn concurrent_allocations_from_two_threads_both_succeed() {
    let handles: Vec<_> = (0..2)
      .map(|_| {
        std::thread::spawn(|| {
          let p = allocate(128);
          assert!(!p.is_null());
          unsafe { release(p) };
        })
      })
      .collect();
    for h in handles {
      h.join().unwrap();
    }
  }
}
