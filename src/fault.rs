//! The allocator's only two failure paths: page-source exhaustion and
//! internal invariant violations. Neither is recoverable, so both log
//! a diagnostic and then abort the process. Routing both through this
//! module keeps every abort path textually identical and easy to grep for.

/// The page source could not supply the requested region.
pub(crate) fn page_source_exhausted(requested_bytes: usize) -> ! {
  log::error!(
    "tcalloc: page source exhausted requesting {} bytes, aborting",
    requested_bytes
  );
  std::process::abort();
}

/// A debug-mode assertion observed state the allocator's invariants rule
/// out (a corrupted free list, a bucket holding the wrong size class, …).
pub(crate) fn invariant_violation(what: &str) -> ! {
  log::error!("tcalloc: internal invariant violation: {}, aborting", what);
  std::process::abort();
}
