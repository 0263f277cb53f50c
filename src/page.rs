//! The page source: the external collaborator that supplies raw,
//! page-aligned, zeroed, writable memory. On this platform it is
//! implemented directly over `mmap(2)` via `libc`, since there is no
//! separate OS process to hand the request to — `obtain` is a thin,
//! abort-on-failure wrapper rather than an RPC boundary.

use std::ptr;

/// Returns the system page size, queried once via `sysconf`.
pub(crate) fn page_size() -> usize {
  let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
  if size <= 0 {
    crate::fault::invariant_violation("sysconf(_SC_PAGESIZE) returned a non-positive value");
  }
  size as usize
}

/// Obtains a contiguous, zero-initialized, page-aligned region of exactly
/// `n` bytes from the operating system. Never returns on failure; instead
/// aborts the process on page source exhaustion.
///
/// The allocator never gives regions obtained this way back to the
/// operating system.
pub(crate) fn obtain(n: usize) -> *mut u8 {
  debug_assert!(n > 0);
  let addr = unsafe {
    libc::mmap(
      ptr::null_mut(),
      n,
      libc::PROT_READ | libc::PROT_WRITE,
      libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
      -1,
      0,
    )
  };
  if addr == libc::MAP_FAILED {
    crate::fault::page_source_exhausted(n);
  }
  log::debug!("tcalloc: mapped {} bytes at {:p}", n, addr);
  addr as *mut u8
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn page_size_is_a_sane_power_of_two() {
    let size = page_size();
    assert!(size >= 4096);
    assert!(size.is_power_of_two());
  }

  #[test]
  fn obtain_returns_zeroed_writable_memory() {
    let n = page_size();
    let ptr = obtain(n);
    assert!(!ptr.is_null());
    unsafe {
      for i in 0..n {
        assert_eq!(*ptr.add(i), 0);
      }
      ptr::write_bytes(ptr, 0xAB, n);
      assert_eq!(*ptr.add(0), 0xAB);
      assert_eq!(*ptr.add(n - 1), 0xAB);
    }
  }
}
