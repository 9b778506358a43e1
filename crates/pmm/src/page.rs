//! Per-frame metadata: the `PageDescriptor`.
//!
//! One of these exists per physical frame in a pool's range, held in a
//! host-provided frame map (the "vmemmap") and reached through
//! [`crate::Platform::descriptor_of_phys`] / [`crate::Platform::descriptor_of_virt`].

use core::cell::Cell;
use core::sync::atomic::{AtomicU32, Ordering};

/// Sentinel `order` meaning "this frame is not the head of a free block".
///
/// Set on every non-head frame: interior frames of a free high-order block,
/// and allocated frames other than an allocation's head.
pub const NO_ORDER: u8 = u8::MAX;

/// Metadata for a single physical frame.
///
/// `order` is guarded by the owning pool's free-area lock (or, for
/// `split_block`, by the caller's exclusive ownership of an already
/// allocated block); `refcount` is independently atomic.
#[repr(C)]
pub struct PageDescriptor {
    order: Cell<u8>,
    refcount: AtomicU32,
}

// SAFETY: `order` (a `Cell`, not `Sync` on its own) is only ever written
// while the owning `Pool`'s free-area lock is held, or on a frame the caller
// already exclusively owns via a live allocation (`split_block`). Concurrent
// readers only ever observe `order` through the same discipline, and
// `refcount` — which signals the free/allocated transition — is atomic.
unsafe impl Sync for PageDescriptor {}

impl PageDescriptor {
    /// A fresh, non-head, unreferenced descriptor.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            order: Cell::new(NO_ORDER),
            refcount: AtomicU32::new(0),
        }
    }

    #[inline]
    #[must_use]
    pub fn order(&self) -> u8 {
        self.order.get()
    }

    #[inline]
    #[must_use]
    pub fn is_head(&self) -> bool {
        self.order.get() != NO_ORDER
    }

    #[inline]
    pub(crate) fn set_order(&self, order: u8) {
        self.order.set(order);
    }

    #[inline]
    #[must_use]
    pub fn refcount(&self) -> u32 {
        self.refcount.load(Ordering::Relaxed)
    }

    /// Sets the refcount to 1 (a fresh reference on a just-allocated frame).
    #[inline]
    pub(crate) fn set_refcounted(&self) {
        self.refcount.store(1, Ordering::Release);
    }

    #[inline]
    pub(crate) fn refcount_inc(&self) {
        self.refcount.fetch_add(1, Ordering::AcqRel);
    }

    /// Decrements the refcount, returning `true` iff it reached zero.
    ///
    /// The zero transition is the only point at which a frame may be handed
    /// back to the free-area machinery; a caller must not touch the frame
    /// again after observing `true` unless it re-allocates it first.
    #[inline]
    pub(crate) fn refcount_dec_and_test(&self) -> bool {
        self.refcount.fetch_sub(1, Ordering::AcqRel) == 1
    }
}

impl Default for PageDescriptor {
    fn default() -> Self {
        Self::new()
    }
}
