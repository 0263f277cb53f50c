//! The optional observability surface: pages mapped/unmapped,
//! chunks allocated/freed, and free-list length.
//!
//! These are tracked with relaxed atomics rather than reported as zeros.
//! Statistics are exempt from the thread-safety goal, so the counters are
//! an eventually-consistent snapshot, never a source of truth for
//! correctness — nothing in the allocator's actual behavior depends on
//! them.

use std::sync::atomic::{AtomicU64, Ordering};

static PAGES_MAPPED: AtomicU64 = AtomicU64::new(0);
static PAGES_UNMAPPED: AtomicU64 = AtomicU64::new(0);
static CHUNKS_ALLOCATED: AtomicU64 = AtomicU64::new(0);
static CHUNKS_FREED: AtomicU64 = AtomicU64::new(0);

/// A point-in-time snapshot of the allocator's counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Stats {
  /// Total bytes ever requested from the page source.
  pub pages_mapped: u64,
  /// Total bytes ever returned to the page source. Always zero: this
  /// allocator never unmaps a region once obtained (see Non-goals).
  pub pages_unmapped: u64,
  /// Total chunks (units of `CHUNK_SIZE`) ever handed out of the arena.
  pub chunks_allocated: u64,
  /// Total chunks ever returned to the arena.
  pub chunks_freed: u64,
  /// Best-effort length of the arena's free list at the time of the call.
  pub free_list_len: u64,
}

pub(crate) fn record_pages_mapped(bytes: usize) {
  PAGES_MAPPED.fetch_add(bytes as u64, Ordering::Relaxed);
}

pub(crate) fn record_chunks_allocated(chunks: usize) {
  CHUNKS_ALLOCATED.fetch_add(chunks as u64, Ordering::Relaxed);
}

pub(crate) fn record_chunks_freed(chunks: usize) {
  CHUNKS_FREED.fetch_add(chunks as u64, Ordering::Relaxed);
}

/// Returns a snapshot of the allocator's counters.
pub fn snapshot() -> Stats {
  Stats {
    pages_mapped: PAGES_MAPPED.load(Ordering::Relaxed),
    pages_unmapped: PAGES_UNMAPPED.load(Ordering::Relaxed),
    chunks_allocated: CHUNKS_ALLOCATED.load(Ordering::Relaxed),
    chunks_freed: CHUNKS_FREED.load(Ordering::Relaxed),
    free_list_len: crate::arena::global().free_list_len() as u64,
  }
}
