//! Tunable constants and the startup checks that keep them sane.
//!
//! `CHUNK_SIZE` is the unit in which memory moves between the arena and a
//! thread cache; `SEED_SIZE` is the size of the single region mapped in to
//! seed the arena on first use. Both are fixed at compile time rather than
//! read from the environment: changing them changes the shape of the
//! thread-cache bucket array (see [`crate::size_class`]), so they are a
//! build-time decision, not a runtime one.

use crate::block::HEADER_SIZE;

/// The chunk size C: the unit of transfer between the arena and a thread
/// cache, and the largest size a thread-cache bucket holds.
pub(crate) const CHUNK_SIZE: usize = 1 << 20;

/// The size of the region requested from the page source to seed the arena
/// on first use. Relies on the host platform overcommitting anonymous
/// mappings (true of Linux by default); a platform that doesn't overcommit
/// should instead grow the arena incrementally by chunk-sized requests.
pub(crate) const SEED_SIZE: usize = 1 << 30;

/// Verifies the invariants placed on `CHUNK_SIZE` and
/// `SEED_SIZE`: C must be a power of two, at least the page size, at least
/// the header size, and the seed must be a whole number of chunks.
///
/// Called once during initialization. A failure here is an internal
/// invariant violation (a misconfigured build), not a runtime condition, so
/// it aborts rather than returning an error.
pub(crate) fn validate(page_size: usize) {
  if !CHUNK_SIZE.is_power_of_two() {
    crate::fault::invariant_violation("CHUNK_SIZE must be a power of two");
  }
  if CHUNK_SIZE < page_size {
    crate::fault::invariant_violation("CHUNK_SIZE must be at least the system page size");
  }
  if CHUNK_SIZE < HEADER_SIZE {
    crate::fault::invariant_violation("CHUNK_SIZE must be at least the header size");
  }
  if SEED_SIZE % CHUNK_SIZE != 0 {
    crate::fault::invariant_violation("SEED_SIZE must be a whole number of chunks");
  }
  log::debug!(
    "tcalloc configured: chunk_size={} seed_size={} header_size={}",
    CHUNK_SIZE,
    SEED_SIZE,
    HEADER_SIZE
  );
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn chunk_size_is_power_of_two_and_covers_header() {
    assert!(CHUNK_SIZE.is_power_of_two());
    assert!(CHUNK_SIZE >= HEADER_SIZE);
  }

  #[test]
  fn seed_size_is_a_whole_number_of_chunks() {
    assert_eq!(SEED_SIZE % CHUNK_SIZE, 0);
  }
}
