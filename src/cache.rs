//! The thread-local cache: per-thread arrays of power-of-two
//! bucket lists. Every operation here touches only the calling thread's own
//! state, so none of it locks anything.

use crate::arena;
use crate::block::{self, Header};
use crate::config::CHUNK_SIZE;
use crate::list;
use crate::size_class::{K, K_MIN, NUM_BUCKETS, bucket_index};
use std::cell::RefCell;
use std::ptr;

/// One thread's private set of size-class free lists.
pub(crate) struct ThreadCache {
  buckets: [*mut Header; NUM_BUCKETS],
}

impl ThreadCache {
  fn new() -> Self {
    Self { buckets: [ptr::null_mut(); NUM_BUCKETS] }
  }

  /// Satisfies a small-regime request for a block of exactly `2^i` bytes
  /// `i` must be in `[K_MIN, K]`.
  fn allocate(&mut self, i: u32) -> *mut Header {
    debug_assert!((K_MIN..=K).contains(&i));
    let idx = bucket_index(i);

    if let Some(block) = unsafe { list::detach_head(&mut self.buckets[idx]) } {
      return block;
    }

    // Find the lowest non-empty bucket above i, refilling from the arena
    // if none exists.
    let mut j = i + 1;
    while j <= K && self.buckets[bucket_index(j)].is_null() {
      j += 1;
    }
    if j > K {
      log::debug!("tcalloc: thread cache miss at bucket {}, refilling from arena", i);
      let chunk = arena::global().allocate(CHUNK_SIZE);
      unsafe {
        (*chunk).next = ptr::null_mut();
      }
      self.buckets[bucket_index(K)] = chunk;
      j = K;
    }

    // Split down from bucket j to bucket i+1, handing each half pair to
    // the bucket one level below.
    for t in (i + 1..=j).rev() {
      let parent = unsafe { list::detach_head(&mut self.buckets[bucket_index(t)]) }
        .unwrap_or_else(|| crate::fault::invariant_violation("bucket located by the scan above was unexpectedly empty"));
      let half = (1usize << (t - 1)) as usize;
      let suffix = unsafe { block::split(parent, half) }
        .unwrap_or_else(|| crate::fault::invariant_violation("splitting a 2^t block at 2^(t-1) produced no suffix"));
      unsafe {
        (*parent).next = suffix;
        (*suffix).next = ptr::null_mut();
      }
      self.buckets[bucket_index(t - 1)] = parent;
    }

    unsafe { list::detach_head(&mut self.buckets[idx]) }
      .unwrap_or_else(|| crate::fault::invariant_violation("split-down loop failed to populate the target bucket"))
  }

  /// Returns a block of size `2^i` to the cache, coalescing with its buddy
  /// where possible and promoting a chunk-sized block to the arena when
  /// the top bucket would otherwise hold more than one.
  fn release(&mut self, mut block: *mut Header, mut i: u32) {
    loop {
      if i == K {
        let top = bucket_index(K);
        if self.buckets[top].is_null() {
          unsafe {
            (*block).next = ptr::null_mut();
          }
          self.buckets[top] = block;
        } else {
          log::trace!("tcalloc: top bucket occupied, promoting a chunk to the arena");
          arena::global().release(block);
        }
        return;
      }

      let coalesce_after = (block as usize) % (1usize << (i + 1)) == 0;
      let idx = bucket_index(i);
      unsafe {
        list::insert_sorted(&mut self.buckets[idx], block);
      }

      let merged = if coalesce_after {
        unsafe { list::try_merge_with_successor(&mut self.buckets[idx], block) }.then_some(block)
      } else {
        unsafe { list::try_merge_with_predecessor(&mut self.buckets[idx], block) }
      };

      match merged {
        Some(bigger) => {
          block = bigger;
          i += 1;
        }
        None => return,
      }
    }
  }
}

thread_local! {
  static CACHE: RefCell<ThreadCache> = RefCell::new(ThreadCache::new());
}

/// Satisfies a small-regime request for a block of exactly `2^i` bytes on
/// the calling thread's cache.
pub(crate) fn allocate(i: u32) -> *mut Header {
  CACHE.with(|cache| cache.borrow_mut().allocate(i))
}

/// Returns a block of size `2^i` to the calling thread's cache.
pub(crate) fn release(block: *mut Header, i: u32) {
  CACHE.with(|cache| cache.borrow_mut().release(block, i));
}
