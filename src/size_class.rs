//! Size-class arithmetic: rounding a request up to the bucket or
//! chunk count that will hold it.
//!
//! Two flavors of "round up": a power of two for the small regime, a
//! chunk multiple for the large regime.

use crate::block::HEADER_SIZE;
use crate::config::CHUNK_SIZE;

/// Smallest bucket index: `log_up(HEADER_SIZE)`. No block can be smaller
/// than its own header.
pub(crate) const K_MIN: u32 = {
  let mut i = 0;
  while (1usize << i) < HEADER_SIZE {
    i += 1;
  }
  i
};

/// Largest bucket index: `log2(CHUNK_SIZE)`. `CHUNK_SIZE` is required to be
/// a power of two (checked by [`crate::config::validate`]).
pub(crate) const K: u32 = {
  let mut i = 0;
  while (1usize << i) < CHUNK_SIZE {
    i += 1;
  }
  i
};

/// Number of thread-cache buckets, one per log-size in `[K_MIN, K]`.
pub(crate) const NUM_BUCKETS: usize = (K - K_MIN + 1) as usize;

/// Maps a bucket index `i` in `[K_MIN, K]` to its position in a
/// `[_; NUM_BUCKETS]` array.
pub(crate) fn bucket_index(i: u32) -> usize {
  debug_assert!((K_MIN..=K).contains(&i));
  (i - K_MIN) as usize
}

/// The smallest `i` such that `2^i >= max(n, HEADER_SIZE)`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(log_up(1), K_MIN);       // rounds up to the header size
/// assert_eq!(log_up(100), 7);         // 128 bytes
/// assert_eq!(log_up(128), 7);         // already a power of two
/// ```
pub(crate) fn log_up(n: usize) -> u32 {
  let n = n.max(HEADER_SIZE);
  let mut i = 0;
  while (1usize << i) < n {
    i += 1;
  }
  i
}

/// The smallest positive `m` such that `m * CHUNK_SIZE >= n`.
pub(crate) fn chunks_up(n: usize) -> usize {
  debug_assert!(n > 0);
  n.div_ceil(CHUNK_SIZE).max(1)
}
