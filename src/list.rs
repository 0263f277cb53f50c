//! Address-ordered singly linked list operations shared by the arena and the
//! thread cache.
//!
//! Every free list the allocator maintains — the arena's chunk list and each
//! cache bucket — is a singly linked list of [`Header`]s sorted by ascending
//! starting address, linked through `Header::next`. These helpers implement
//! that ordering once so the arena and the cache don't reimplement it with
//! slightly different bugs.

use crate::block::{Header, is_adjacent};
use std::ptr;

/// Inserts `node` into the list rooted at `*head`, keeping addresses
/// strictly ascending.
///
/// # Safety
///
/// `node` must not already be linked into any list. Every node reachable
/// from `*head` must be a valid, distinct block.
pub(crate) unsafe fn insert_sorted(head: &mut *mut Header, node: *mut Header) {
  unsafe {
    if head.is_null() || (node as usize) < (*head as usize) {
      (*node).next = *head;
      *head = node;
      return;
    }
    let mut cur = *head;
    while !(*cur).next.is_null() && ((*cur).next as usize) < (node as usize) {
      cur = (*cur).next;
    }
    (*node).next = (*cur).next;
    (*cur).next = node;
  }
}

/// Unlinks `node` from the list rooted at `*head`. `node` must currently be
/// a member of the list.
///
/// # Safety
///
/// `node` must be reachable from `*head`.
pub(crate) unsafe fn remove(head: &mut *mut Header, node: *mut Header) {
  unsafe {
    if *head == node {
      *head = (*node).next;
      return;
    }
    let mut cur = *head;
    while !cur.is_null() {
      if (*cur).next == node {
        (*cur).next = (*node).next;
        return;
      }
      cur = (*cur).next;
    }
    debug_assert!(false, "attempted to remove a node not present in the list");
  }
}

/// Returns the list-predecessor of `node`, or null if `node` is the head or
/// not found.
///
/// # Safety
///
/// Every node reachable from `head` must be a valid block.
pub(crate) unsafe fn predecessor_of(head: *mut Header, node: *mut Header) -> *mut Header {
  unsafe {
    if head.is_null() || head == node {
      return ptr::null_mut();
    }
    let mut cur = head;
    while !cur.is_null() && (*cur).next != node {
      cur = (*cur).next;
    }
    cur
  }
}

/// Detaches and returns the head of the list rooted at `*head`, or `None`
/// if the list is empty.
pub(crate) unsafe fn detach_head(head: &mut *mut Header) -> Option<*mut Header> {
  unsafe {
    if head.is_null() {
      return None;
    }
    let node = *head;
    *head = (*node).next;
    Some(node)
  }
}

/// Number of entries in the list rooted at `head` (diagnostic use only —
/// linear in list length).
pub(crate) unsafe fn len(head: *mut Header) -> usize {
  unsafe {
    let mut n = 0;
    let mut cur = head;
    while !cur.is_null() {
      n += 1;
      cur = (*cur).next;
    }
    n
  }
}

/// If `node`'s list-successor is adjacent in memory, merges them in place
/// and removes `node` from the list (the merged block is `node`, now
/// belonging to a bigger size class and owned by neither list).
///
/// Returns `true` iff a merge occurred.
///
/// # Safety
///
/// `node` must be a member of the list rooted at `*head`.
pub(crate) unsafe fn try_merge_with_successor(head: &mut *mut Header, node: *mut Header) -> bool {
  unsafe {
    if !crate::block::coalesce_next(node) {
      return false;
    }
    remove(head, node);
    true
  }
}

/// If `node`'s list-predecessor is adjacent in memory, merges predecessor
/// and `node` in place and removes the predecessor from the list (the
/// merged block is the former predecessor).
///
/// Returns `Some(predecessor)` iff a merge occurred.
///
/// This leaves the merged block belonging to no list; callers that need it
/// to stay a member of the list it was merged out of (rather than move to a
/// different list, as a cache bucket promotion does) should use
/// [`coalesce_with_predecessor`] instead.
///
/// # Safety
///
/// `node` must be a member of the list rooted at `*head`.
pub(crate) unsafe fn try_merge_with_predecessor(
  head: &mut *mut Header,
  node: *mut Header,
) -> Option<*mut Header> {
  unsafe {
    let prev = predecessor_of(*head, node);
    if prev.is_null() || !is_adjacent(prev, node) {
      return None;
    }
    (*prev).size += (*node).size;
    (*prev).next = (*node).next;
    remove(head, prev);
    Some(prev)
  }
}

/// If `node`'s list-predecessor is adjacent in memory, merges predecessor
/// and `node` in place without removing the predecessor from the list — the
/// predecessor simply grows to absorb `node`, and its position in the list
/// is unchanged. Unlike [`try_merge_with_predecessor`], the caller has
/// nothing left to reinsert afterward.
///
/// Returns `true` iff a merge occurred.
///
/// # Safety
///
/// `node` must be a member of the list rooted at `head`.
pub(crate) unsafe fn coalesce_with_predecessor(head: *mut Header, node: *mut Header) -> bool {
  unsafe {
    let prev = predecessor_of(head, node);
    if prev.is_null() {
      return false;
    }
    crate::block::coalesce_next(prev)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::alloc::{Layout, alloc, dealloc};

  unsafe fn make_block(size: usize) -> (*mut u8, *mut Header) {
    unsafe {
      let layout = Layout::from_size_align(size, 16).unwrap();
      let raw = alloc(layout);
      let block = raw as *mut Header;
      (*block).size = size;
      (*block).next = ptr::null_mut();
      (raw, block)
    }
  }

  #[test]
  fn insert_sorted_keeps_ascending_order() {
    unsafe {
      let (raw_a, a) = make_block(32);
      let (raw_b, b) = make_block(32);
      let (raw_c, c) = make_block(32);
      let mut blocks = [a as usize, b as usize, c as usize];
      blocks.sort_unstable();
      let (lo, mid, hi) = (blocks[0] as *mut Header, blocks[1] as *mut Header, blocks[2] as *mut Header);

      let mut head: *mut Header = ptr::null_mut();
      insert_sorted(&mut head, hi);
      insert_sorted(&mut head, lo);
      insert_sorted(&mut head, mid);

      assert_eq!(head, lo);
      assert_eq!((*lo).next, mid);
      assert_eq!((*mid).next, hi);
      assert!((*hi).next.is_null());

      for raw in [raw_a, raw_b, raw_c] {
        dealloc(raw, Layout::from_size_align(32, 16).unwrap());
      }
    }
  }

  #[test]
  fn remove_unlinks_head_and_interior_nodes() {
    unsafe {
      let (raw_a, a) = make_block(16);
      let (raw_b, b) = make_block(16);
      let mut blocks = [a as usize, b as usize];
      blocks.sort_unstable();
      let (lo, hi) = (blocks[0] as *mut Header, blocks[1] as *mut Header);

      let mut head: *mut Header = ptr::null_mut();
      insert_sorted(&mut head, lo);
      insert_sorted(&mut head, hi);

      remove(&mut head, lo);
      assert_eq!(head, hi);

      remove(&mut head, hi);
      assert!(head.is_null());

      dealloc(raw_a, Layout::from_size_align(16, 16).unwrap());
      dealloc(raw_b, Layout::from_size_align(16, 16).unwrap());
    }
  }

  #[test]
  fn try_merge_with_successor_merges_adjacent_pair() {
    unsafe {
      let (raw, block) = make_block(256);
      let suffix = crate::block::split(block, 128).unwrap();

      let mut head: *mut Header = ptr::null_mut();
      insert_sorted(&mut head, block);
      insert_sorted(&mut head, suffix);

      assert!(try_merge_with_successor(&mut head, block));
      assert_eq!((*block).size, 256);
      assert!(head.is_null());

      dealloc(raw, Layout::from_size_align(256, 16).unwrap());
    }
  }

  #[test]
  fn coalesce_with_predecessor_merges_without_removing_predecessor_from_the_list() {
    unsafe {
      let (raw, block) = make_block(256);
      let suffix = crate::block::split(block, 128).unwrap();

      let mut head: *mut Header = ptr::null_mut();
      insert_sorted(&mut head, block);
      insert_sorted(&mut head, suffix);

      assert!(coalesce_with_predecessor(head, suffix));
      assert_eq!((*block).size, 256);
      // The predecessor (`block`) is still the list head, now carrying the
      // full merged size, rather than having been detached for reinsertion.
      assert_eq!(head, block);
      assert!((*block).next.is_null());

      dealloc(raw, Layout::from_size_align(256, 16).unwrap());
    }
  }
}
