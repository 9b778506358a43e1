//! Free lists threaded through the frame bytes themselves.
//!
//! A free block's link pointers are *not* stored in its `PageDescriptor` —
//! they live in the first bytes of the block's own virtual memory, the way
//! the original design saves per-descriptor space. This means every push
//! and pop is an unsafe raw-pointer operation against memory the pool
//! currently owns exclusively.

use core::mem::size_of;
use core::ptr::NonNull;

use crate::addr::VirtAddr;

#[repr(C)]
struct FreeLink {
    next: Option<NonNull<FreeLink>>,
    prev: Option<NonNull<FreeLink>>,
}

/// One order's free list: a doubly linked list of block heads, FIFO on push/pop.
pub(crate) struct FreeArea {
    head: Option<NonNull<FreeLink>>,
    tail: Option<NonNull<FreeLink>>,
}

impl FreeArea {
    #[must_use]
    pub(crate) const fn new() -> Self {
        Self {
            head: None,
            tail: None,
        }
    }

    #[must_use]
    pub(crate) fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    /// Writes a fresh link node into `virt`'s first bytes and appends it as
    /// the new tail.
    ///
    /// # Safety
    /// `virt` must point to at least `size_of::<FreeLink>()` writable bytes
    /// that the pool exclusively owns (the head of a block it is freeing),
    /// and must not already be linked into this or any other free list.
    pub(crate) unsafe fn push_tail(&mut self, virt: VirtAddr) {
        let ptr = virt.as_usize() as *mut FreeLink;
        // SAFETY: caller guarantees exclusive ownership of these bytes.
        unsafe {
            ptr.write(FreeLink {
                next: None,
                prev: self.tail,
            });
        }
        // SAFETY: `ptr` was just written through and is non-null (derived
        // from a non-zero virtual address).
        let node = unsafe { NonNull::new_unchecked(ptr) };
        match self.tail {
            Some(tail) => unsafe { (*tail.as_ptr()).next = Some(node) },
            None => self.head = Some(node),
        }
        self.tail = Some(node);
    }

    /// Pops the head block, zeroing its link-node bytes, and returns its
    /// virtual address. `None` iff the list is empty.
    pub(crate) unsafe fn pop_head(&mut self) -> Option<VirtAddr> {
        let node = self.head?;
        // SAFETY: `node` is a live link in this list.
        unsafe { self.unlink(node) };
        let va = VirtAddr::new(node.as_ptr() as usize);
        // SAFETY: `node` is no longer reachable from the list; zeroing its
        // bytes restores the "allocated frames start zeroed" contract for
        // the handful of bytes a link node occupies.
        unsafe { node.as_ptr().write_bytes(0u8, size_of::<FreeLink>()) };
        Some(va)
    }

    /// Removes the block at `virt` from wherever it currently sits in the
    /// list (used when a coalescing buddy is found mid-list), zeroing its
    /// link-node bytes.
    ///
    /// # Safety
    /// `virt` must currently be linked into this exact list.
    pub(crate) unsafe fn remove(&mut self, virt: VirtAddr) {
        // SAFETY: caller guarantees `virt` is a valid, non-null link address.
        let node = unsafe { NonNull::new_unchecked(virt.as_usize() as *mut FreeLink) };
        // SAFETY: caller guarantees `node` is linked into this list.
        unsafe { self.unlink(node) };
        // SAFETY: see `pop_head`.
        unsafe { node.as_ptr().write_bytes(0u8, size_of::<FreeLink>()) };
    }

    /// # Safety
    /// `node` must currently be linked into this list.
    unsafe fn unlink(&mut self, node: NonNull<FreeLink>) {
        // SAFETY: caller guarantees `node` is a live link in this list.
        let n = unsafe { &*node.as_ptr() };
        match n.prev {
            Some(p) => unsafe { (*p.as_ptr()).next = n.next },
            None => self.head = n.next,
        }
        match n.next {
            Some(next) => unsafe { (*next.as_ptr()).prev = n.prev },
            None => self.tail = n.prev,
        }
    }
}
