//! The global arena: a single, process-wide,
//! address-ordered free list of chunk-multiple blocks, guarded by one
//! mutex. Serves large requests directly and refills thread caches one
//! chunk at a time.

use crate::block::{self, Header};
use crate::config::CHUNK_SIZE;
use crate::list;
use crate::page;
use crate::size_class::chunks_up;
use crate::stats;
use std::ptr;
use std::sync::Mutex;

/// The shared, address-ordered free list. `head` is the list's head pointer;
/// the mutex is held for the entire duration of any walk, split, insert, or
/// coalesce.
pub(crate) struct Arena {
  head: Mutex<*mut Header>,
}

// The arena's raw pointers only ever point into memory this process owns
// exclusively for arena bookkeeping, and all access goes through the mutex.
unsafe impl Send for Arena {}
unsafe impl Sync for Arena {}

/// The single, process-wide arena instance.
static ARENA: Arena = Arena::new();

/// Returns the process-wide arena.
pub(crate) fn global() -> &'static Arena {
  &ARENA
}

impl Arena {
  pub const fn new() -> Self {
    Self { head: Mutex::new(ptr::null_mut()) }
  }

  /// Seeds the (assumed empty) arena with a single free block. Used once,
  /// by initialization.
  pub fn seed(&self, block: *mut Header) {
    let mut head = self.head.lock().unwrap();
    debug_assert!(head.is_null(), "arena seeded more than once");
    unsafe {
      (*block).next = ptr::null_mut();
    }
    *head = block;
  }

  /// Satisfies a request for `bytes` usable bytes (including the header),
  /// rounding up to a whole number of chunks.
  ///
  /// Returns a detached block carrying exactly the rounded size; it is not
  /// a member of any list.
  pub fn allocate(&self, bytes: usize) -> *mut Header {
    let chunks = chunks_up(bytes);
    let r = chunks * CHUNK_SIZE;

    let found = {
      let mut head = self.head.lock().unwrap();
      unsafe { self.take_first_fit(&mut head, r) }
    };

    match found {
      Some(block) => block,
      None => {
        let raw = page::obtain(r);
        let block = raw as *mut Header;
        unsafe {
          (*block).size = r;
          (*block).next = ptr::null_mut();
        }
        stats::record_pages_mapped(r);
        stats::record_chunks_allocated(chunks);
        block
      }
    }
  }

  /// First-fit walk, detach, and in-place split. Must be called with the
  /// lock held.
  unsafe fn take_first_fit(&self, head: &mut *mut Header, r: usize) -> Option<*mut Header> {
    unsafe {
      if head.is_null() {
        return None;
      }
      if (**head).size >= r {
        let out = *head;
        let next = (*out).next;
        match block::split(out, r) {
          Some(suffix) => {
            (*suffix).next = next;
            *head = suffix;
          }
          None => *head = next,
        }
        stats::record_chunks_allocated(r / CHUNK_SIZE);
        return Some(out);
      }
      let mut cur = *head;
      while !(*cur).next.is_null() {
        let candidate = (*cur).next;
        if (*candidate).size >= r {
          let next = (*candidate).next;
          match block::split(candidate, r) {
            Some(suffix) => {
              (*suffix).next = next;
              (*cur).next = suffix;
            }
            None => (*cur).next = next,
          }
          stats::record_chunks_allocated(r / CHUNK_SIZE);
          return Some(candidate);
        }
        cur = (*cur).next;
      }
      None
    }
  }

  /// Returns `block` to the arena's free list in address order, then
  /// attempts to coalesce it with its new successor and predecessor.
  pub fn release(&self, block: *mut Header) {
    debug_assert!(unsafe { (*block).size } % CHUNK_SIZE == 0);
    debug_assert!((block as usize) % CHUNK_SIZE == 0);
    stats::record_chunks_freed(unsafe { (*block).size } / CHUNK_SIZE);

    let mut head = self.head.lock().unwrap();
    unsafe {
      list::insert_sorted(&mut head, block);
      block::coalesce_next(block);
      // The arena has only one list, so a predecessor merge must leave the
      // predecessor linked in place rather than detach it for the caller to
      // reinsert elsewhere (there is nowhere else to reinsert it to).
      list::coalesce_with_predecessor(*head, block);
    }
  }

  /// Best-effort, unsynchronized length of the free list, for statistics
  /// only (statistics are explicitly exempt from the thread-safety goal).
  pub fn free_list_len(&self) -> usize {
    let head = self.head.lock().unwrap();
    unsafe { list::len(*head) }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn allocate_then_release_restores_a_single_free_block() {
    let arena = Arena::new();
    let seed = page::obtain(4 * CHUNK_SIZE);
    let seed_block = seed as *mut Header;
    unsafe {
      (*seed_block).size = 4 * CHUNK_SIZE;
    }
    arena.seed(seed_block);
    assert_eq!(arena.free_list_len(), 1);

    let block = arena.allocate(CHUNK_SIZE);
    assert_eq!(unsafe { (*block).size }, CHUNK_SIZE);
    assert_eq!(arena.free_list_len(), 1); // the 3-chunk remainder

    arena.release(block);
    assert_eq!(arena.free_list_len(), 1); // coalesced back into one block
  }

  #[test]
  fn allocate_rounds_up_to_whole_chunks() {
    let arena = Arena::new();
    let seed = page::obtain(8 * CHUNK_SIZE);
    let seed_block = seed as *mut Header;
    unsafe {
      (*seed_block).size = 8 * CHUNK_SIZE;
    }
    arena.seed(seed_block);

    let block = arena.allocate(2 * CHUNK_SIZE + 5);
    assert_eq!(unsafe { (*block).size }, 3 * CHUNK_SIZE);
  }

  #[test]
  fn releasing_a_middle_block_merges_into_its_neighbors_without_losing_them() {
    let arena = Arena::new();
    let seed = page::obtain(3 * CHUNK_SIZE);
    let seed_block = seed as *mut Header;
    unsafe {
      (*seed_block).size = 3 * CHUNK_SIZE;
    }
    arena.seed(seed_block);

    let first = arena.allocate(CHUNK_SIZE);
    let second = arena.allocate(CHUNK_SIZE);
    assert_eq!(arena.free_list_len(), 1); // the remaining 1-chunk block

    arena.release(first);
    assert_eq!(arena.free_list_len(), 2); // not adjacent to the remainder yet

    arena.release(second);
    // `second` bridges `first` and the remainder: all three chunks must
    // coalesce back into a single free block, not disappear.
    assert_eq!(arena.free_list_len(), 1);
    assert_eq!(unsafe { (*seed_block).size }, 3 * CHUNK_SIZE);
  }

  #[test]
  fn allocate_falls_back_to_the_page_source_on_a_miss() {
    let arena = Arena::new();
    let seed = page::obtain(CHUNK_SIZE);
    let seed_block = seed as *mut Header;
    unsafe {
      (*seed_block).size = CHUNK_SIZE;
    }
    arena.seed(seed_block);

    let small = arena.allocate(CHUNK_SIZE / 2);
    assert_eq!(unsafe { (*small).size }, CHUNK_SIZE);
    assert_eq!(arena.free_list_len(), 0);

    // Next request must go to the page source since the arena is empty.
    let big = arena.allocate(CHUNK_SIZE);
    assert_eq!(unsafe { (*big).size }, CHUNK_SIZE);
    assert_ne!(small, big);
  }
}
