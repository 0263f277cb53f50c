//! First-use initialization: validating the build-time constants and
//! seeding the arena with its first slab, exactly once per process.

use crate::arena;
use crate::block::Header;
use crate::config::{self, SEED_SIZE};
use crate::page;
use std::sync::Once;

static INIT: Once = Once::new();

/// Runs the one-time startup sequence if it hasn't run yet. Idempotent and
/// safe to call from every public entry point.
pub(crate) fn ensure_initialized() {
  INIT.call_once(|| {
    let page_size = page::page_size();
    config::validate(page_size);

    let raw = page::obtain(SEED_SIZE);
    let block = raw as *mut Header;
    unsafe {
      (*block).size = SEED_SIZE;
    }
    arena::global().seed(block);
    log::debug!("tcalloc: initialized, seeded arena with {} bytes", SEED_SIZE);
  });
}
