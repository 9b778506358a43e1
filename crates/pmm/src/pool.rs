//! The buddy pool itself: free-area bookkeeping, buddy arithmetic, and the
//! public allocate/release/retain/split surface.

use core::ptr::NonNull;
use core::sync::atomic::{AtomicU64, Ordering};

use spin::Mutex;

use crate::addr::{PhysAddr, VirtAddr};
use crate::error::PoolInitError;
use crate::free_list::FreeArea;
use crate::page::{PageDescriptor, NO_ORDER};

/// Crate-wide maximum supported block order (2^21 frames == 8GiB of 4KiB
/// frames), matching the corpus's own buddy allocator cap.
pub const MAX_ORDER: usize = 21;

/// Host-provided translation layer between physical addresses, virtual
/// addresses, and `PageDescriptor`s.
///
/// A pool is generic over `Platform` so the translation is monomorphized in
/// rather than paid for through indirect dispatch on every buddy lookup.
/// All methods are expected to be total and O(1) over the addressable
/// range; the pool itself is responsible for bounds-checking against its
/// own `[range_start, range_end)` before calling in.
pub trait Platform {
    /// Size of one frame, in bytes. Arch-specific, so left to the implementor.
    const PAGE_SIZE: usize;

    /// The physical address backing a descriptor.
    fn phys_of(&self, desc: NonNull<PageDescriptor>) -> PhysAddr;

    /// The descriptor for a physical address. Total over the addressable range.
    fn descriptor_of_phys(&self, pa: PhysAddr) -> NonNull<PageDescriptor>;

    /// The virtual address a descriptor's frame is mapped at.
    fn virt_of(&self, desc: NonNull<PageDescriptor>) -> VirtAddr;

    /// The descriptor for a virtual address. Inverse of `virt_of`.
    fn descriptor_of_virt(&self, va: VirtAddr) -> NonNull<PageDescriptor>;

    /// The physical address of a page frame number.
    fn phys_of_pfn(&self, pfn: usize) -> PhysAddr;
}

fn ceil_log2(n: usize) -> usize {
    if n <= 1 {
        return 0;
    }
    (usize::BITS - (n - 1).leading_zeros()) as usize
}

/// A binary-buddy allocator over a bounded, physically contiguous range of
/// page frames.
///
/// See the crate root docs for the locking and refcount discipline that
/// keeps `free_pages` consistent with the free lists without serializing
/// every reader behind the pool's lock.
pub struct Pool<P: Platform> {
    platform: P,
    /// Set once at construction, never mutated after — safe to read without
    /// the free-area lock.
    range_start: PhysAddr,
    range_end: PhysAddr,
    max_order: u8,
    free_area: Mutex<[FreeArea; MAX_ORDER + 1]>,
    free_pages: AtomicU64,
}

impl<P: Platform> Pool<P> {
    /// Builds a pool over `nr_pages` frames starting at `pfn`, leaving the
    /// first `reserved_pages` allocated for the caller (e.g. the pool's own
    /// bookkeeping, if it is self-hosted) and releasing the rest into the
    /// buddy tree.
    ///
    /// # Errors
    /// Returns [`PoolInitError`] if `nr_pages == 0` or
    /// `reserved_pages > nr_pages`.
    pub fn init(
        platform: P,
        pfn: usize,
        nr_pages: usize,
        reserved_pages: usize,
    ) -> Result<Self, PoolInitError> {
        if nr_pages == 0 {
            return Err(PoolInitError::ZeroPages);
        }
        if reserved_pages > nr_pages {
            return Err(PoolInitError::ReservedExceedsTotal);
        }

        let range_start = platform.phys_of_pfn(pfn);
        let range_end = PhysAddr::new(range_start.as_usize() + nr_pages * P::PAGE_SIZE);
        let max_order = core::cmp::min(MAX_ORDER, ceil_log2(nr_pages)) as u8;

        log::debug!(
            "los_pmm: init pfn={pfn} nr_pages={nr_pages} reserved_pages={reserved_pages} max_order={max_order}"
        );

        let pool = Self {
            platform,
            range_start,
            range_end,
            max_order,
            free_area: Mutex::new([const { FreeArea::new() }; MAX_ORDER + 1]),
            free_pages: AtomicU64::new(0),
        };

        for i in 0..nr_pages {
            let desc = pool.descriptor_at(range_start, i);
            // SAFETY: every frame in range is materialized exactly once here.
            unsafe {
                desc.as_ref().set_order(0);
                desc.as_ref().set_refcounted();
            }
        }

        for i in reserved_pages..nr_pages {
            let desc = pool.descriptor_at(range_start, i);
            // SAFETY: descriptor was just materialized above with refcount 1.
            if unsafe { desc.as_ref().refcount_dec_and_test() } {
                pool.zero_block(desc, 0);
                let mut area = pool.free_area.lock();
                pool.attach(&mut area, desc, 0);
            }
        }

        Ok(pool)
    }

    /// Builds a pool with no owned range: every address test is "out of
    /// range", so frames can only enter via [`Pool::release`] on externally
    /// sourced descriptors, and never coalesce.
    ///
    /// # Errors
    /// Returns [`PoolInitError::ZeroPages`] if `nr_pages == 0` — an empty
    /// pool still needs a nonzero capacity to size its free-area array
    /// meaningfully via `max_order`.
    pub fn init_empty(platform: P, nr_pages: usize) -> Result<Self, PoolInitError> {
        if nr_pages == 0 {
            return Err(PoolInitError::ZeroPages);
        }
        let max_order = core::cmp::min(MAX_ORDER, ceil_log2(nr_pages)) as u8;
        log::debug!("los_pmm: init_empty nr_pages={nr_pages} max_order={max_order}");
        Ok(Self {
            platform,
            range_start: PhysAddr::new(usize::MAX),
            range_end: PhysAddr::new(0),
            max_order,
            free_area: Mutex::new([const { FreeArea::new() }; MAX_ORDER + 1]),
            free_pages: AtomicU64::new(0),
        })
    }

    #[inline]
    fn descriptor_at(&self, base: PhysAddr, index: usize) -> NonNull<PageDescriptor> {
        self.platform
            .descriptor_of_phys(PhysAddr::new(base.as_usize() + index * P::PAGE_SIZE))
    }

    #[inline]
    fn in_range(&self, pa: PhysAddr) -> bool {
        pa.as_usize() >= self.range_start.as_usize() && pa.as_usize() < self.range_end.as_usize()
    }

    #[inline]
    fn buddy_phys(&self, pa: PhysAddr, order: u8) -> PhysAddr {
        PhysAddr::new(pa.as_usize() ^ (P::PAGE_SIZE << order))
    }

    /// Returns the buddy unconditionally, trusting the caller's invariants
    /// (used only when splitting a block whose buddy is a known interior
    /// frame). Debug builds assert the computed address is actually in
    /// range; per the design notes this case "cannot occur" under the
    /// stated invariants, so a release build trusts it rather than
    /// returning the block unsplit.
    #[inline]
    fn buddy_nocheck(&self, desc: NonNull<PageDescriptor>, order: u8) -> NonNull<PageDescriptor> {
        let bp = self.buddy_phys(self.platform.phys_of(desc), order);
        debug_assert!(
            self.in_range(bp),
            "buddy_nocheck: buddy fell outside the pool's range — corrupted allocator state"
        );
        self.platform.descriptor_of_phys(bp)
    }

    /// Returns the buddy only if it is currently free at exactly `order`.
    #[inline]
    fn buddy_available(
        &self,
        desc: NonNull<PageDescriptor>,
        order: u8,
    ) -> Option<NonNull<PageDescriptor>> {
        let bp = self.buddy_phys(self.platform.phys_of(desc), order);
        if !self.in_range(bp) {
            return None;
        }
        let buddy = self.platform.descriptor_of_phys(bp);
        // SAFETY: `buddy` is in range, hence a live descriptor in this pool.
        let free_at_order = unsafe { buddy.as_ref().order() == order && buddy.as_ref().refcount() == 0 };
        free_at_order.then_some(buddy)
    }

    /// Zeros all `PAGE_SIZE * 2^order` bytes of a block about to be
    /// released, ahead of taking the free-area lock — the bulk memset
    /// touches no shared state, so it must not serialize every other pool
    /// operation behind it (see the call sites in [`Pool::release`] and
    /// [`Pool::init`]).
    fn zero_block(&self, head: NonNull<PageDescriptor>, order: u8) {
        let head_va = self.platform.virt_of(head);
        // SAFETY: the caller is releasing this block, so the pool has
        // exclusive access to its bytes; zeroing `2^order` frames is in
        // bounds for a block of that order.
        unsafe {
            core::ptr::write_bytes(head_va.as_usize() as *mut u8, 0, P::PAGE_SIZE << order);
        }
    }

    /// Coalesces an already-zeroed block as far as possible and pushes the
    /// resulting head onto its free list. `order` is the size of the block
    /// as the caller knows it (pre-coalesce). Caller must already have
    /// zeroed the block (see [`Pool::zero_block`]) and hold `free_area`'s
    /// lock.
    fn attach(&self, area: &mut [FreeArea; MAX_ORDER + 1], head: NonNull<PageDescriptor>, order: u8) {
        let phys = self.platform.phys_of(head);
        let mut p = head;
        let mut k = order;

        if self.in_range(phys) {
            // SAFETY: `head` is a live descriptor owned by this pool.
            unsafe { head.as_ref().set_order(NO_ORDER) };

            while k < self.max_order {
                let Some(buddy) = self.buddy_available(p, k) else {
                    break;
                };
                // SAFETY: `buddy` is free at order `k`, i.e. linked into
                // `area[k]`.
                unsafe {
                    area[k as usize].remove(self.platform.virt_of(buddy));
                    buddy.as_ref().set_order(NO_ORDER);
                }
                if self.platform.phys_of(buddy).as_usize() < self.platform.phys_of(p).as_usize() {
                    p = buddy;
                }
                k += 1;
            }
        }
        // else: external frame, not in this pool's coalescable range — skip
        // straight to insertion at the caller's order.

        // SAFETY: `p` is the final head (possibly merged), exclusively
        // owned by this call.
        unsafe {
            p.as_ref().set_order(k);
            area[k as usize].push_tail(self.platform.virt_of(p));
        }
        self.free_pages.fetch_add(1u64 << order, Ordering::Relaxed);
    }

    /// Splits a free block down from its current order to `target_order`,
    /// pushing each spare buddy onto its own free list. `desc` must already
    /// be unlinked from whatever list it came from.
    fn extract(
        &self,
        area: &mut [FreeArea; MAX_ORDER + 1],
        desc: NonNull<PageDescriptor>,
        target_order: u8,
    ) -> NonNull<PageDescriptor> {
        // SAFETY: `desc` is a live descriptor owned by this pool.
        while unsafe { desc.as_ref().order() } > target_order {
            let cur = unsafe { desc.as_ref().order() };
            let new_order = cur - 1;
            let buddy = self.buddy_nocheck(desc, new_order);
            // SAFETY: `desc` and `buddy` are live descriptors; `buddy` is a
            // non-head interior frame of the block being split.
            unsafe {
                desc.as_ref().set_order(new_order);
                buddy.as_ref().set_order(new_order);
                area[new_order as usize].push_tail(self.platform.virt_of(buddy));
            }
        }
        desc
    }

    /// Allocates a block of `2^order` contiguous, zeroed frames.
    ///
    /// Returns `None` — no fault, no wait — when no free list at or above
    /// `order` has a block.
    pub fn alloc(&self, order: u8) -> Option<VirtAddr> {
        if order as usize > self.max_order as usize {
            return None;
        }
        let mut area = self.free_area.lock();
        for i in order..=self.max_order {
            if area[i as usize].is_empty() {
                continue;
            }
            // SAFETY: the list was just observed non-empty under the lock
            // we still hold.
            let va = unsafe { area[i as usize].pop_head() }
                .expect("free area reported non-empty but yielded no head");
            let desc = self.platform.descriptor_of_virt(va);
            let head = self.extract(&mut area, desc, order);
            // SAFETY: `head` is now unlinked from every free list and owned
            // exclusively by this call.
            unsafe { head.as_ref().set_refcounted() };
            self.free_pages.fetch_sub(1u64 << order, Ordering::Relaxed);
            let result = self.platform.virt_of(head);
            log::trace!("los_pmm: alloc(order={order}) -> {result:?}");
            return Some(result);
        }
        log::trace!("los_pmm: alloc(order={order}) -> out of memory");
        None
    }

    /// Drops a reference to a previously allocated block; when the last
    /// reference goes away, the block is zeroed and returned to the buddy
    /// tree.
    ///
    /// # Safety
    /// `virt` must be a virtual address previously returned by this pool's
    /// `alloc`, still referenced by the caller (i.e. not already fully
    /// released).
    pub unsafe fn release(&self, virt: VirtAddr) {
        let desc = self.platform.descriptor_of_virt(virt);
        // SAFETY: caller guarantees `virt` names a live allocation of this pool.
        let order = unsafe { desc.as_ref().order() };
        assert!(
            (order as usize) <= self.max_order as usize,
            "release: order {order} exceeds pool max_order {} — corrupted allocator state",
            self.max_order
        );
        // SAFETY: see above.
        if unsafe { desc.as_ref().refcount_dec_and_test() } {
            log::trace!("los_pmm: release({virt:?}) order={order} -> attach");
            // Zeroed before the lock is taken: the memset touches no shared
            // state, so it must not serialize every other pool operation
            // behind a bulk zero of up to a whole `max_order` block.
            self.zero_block(desc, order);
            let mut area = self.free_area.lock();
            self.attach(&mut area, desc, order);
        }
    }

    /// Adds a reference to a live block, keeping it allocated until a
    /// matching `release`.
    ///
    /// # Safety
    /// `virt` must name a currently live allocation of this pool.
    pub unsafe fn retain(&self, virt: VirtAddr) {
        let desc = self.platform.descriptor_of_virt(virt);
        // SAFETY: caller guarantees `virt` names a live allocation.
        unsafe { desc.as_ref().refcount_inc() };
    }

    /// Splits an allocated order-`k` block into `2^k` independently
    /// refcounted order-0 allocations.
    ///
    /// Does not touch the free lists or `free_pages`, and — unlike every
    /// other mutator of descriptor state — does not take the free-area
    /// lock: the block is, by precondition, already exclusively owned and
    /// cannot be a concurrent coalescing target.
    ///
    /// # Safety
    /// `virt` must name a currently allocated (refcount ≥ 1) block.
    ///
    /// # Panics
    /// Panics if the block's refcount is zero (splitting a free block is a
    /// programmer error, not a recoverable condition).
    pub unsafe fn split_block(&self, virt: VirtAddr) {
        let head = self.platform.descriptor_of_virt(virt);
        // SAFETY: caller guarantees `virt` names a live allocation.
        let (order, refcount) = unsafe { (head.as_ref().order(), head.as_ref().refcount()) };
        assert!(
            refcount >= 1,
            "split_block: block is free (refcount 0) — splitting a free block is a programmer error"
        );

        // SAFETY: `head` is exclusively owned by the caller. Its refcount is
        // already >= 1 from the original allocation and is left untouched
        // here, so it never reads as a free head (`refcount() == 0`)
        // regardless of the order written — no lock-free window to guard
        // against, unlike the interior frames below.
        unsafe { head.as_ref().set_order(0) };
        let phys = self.platform.phys_of(head);
        for i in 1u64..(1u64 << order) {
            let pa = PhysAddr::new(phys.as_usize() + i as usize * P::PAGE_SIZE);
            let desc = self.platform.descriptor_of_phys(pa);
            // SAFETY: every other frame of the order-`order` block is
            // interior (refcount 0, order NO_ORDER) until this call.
            // `set_refcounted` runs first: `buddy_available` (pool.rs:199)
            // treats `order() == k && refcount() == 0` as a free head with
            // no lock, so until refcount leaves 0 this frame must never
            // read back as order 0 — writing the order first would open
            // exactly that window for a concurrent `release`/`attach` on
            // a neighboring block to misread this live frame as free and
            // unlink it as a `FreeLink`.
            unsafe {
                desc.as_ref().set_refcounted();
                desc.as_ref().set_order(0);
            }
        }
    }

    /// An approximate, lock-free snapshot of the number of free frames.
    ///
    /// Readers may observe a value that is stale by the time they act on
    /// it; this is documented as approximate, not a committed count.
    #[must_use]
    pub fn free_pages_snapshot(&self) -> u64 {
        self.free_pages.load(Ordering::Relaxed)
    }

    /// The inclusive maximum block order this pool can satisfy.
    #[must_use]
    pub fn max_order(&self) -> u8 {
        self.max_order
    }
}

#[cfg(all(test, feature = "std"))]
mod tests {
    use super::*;
    use crate::error::PoolInitError;
    extern crate std;
    use std::boxed::Box;
    use std::vec;

    const PAGE_SIZE: usize = 4096;

    /// A host-backed [`Platform`] over a leaked heap arena: one `Vec` of
    /// `PageDescriptor`s standing in for the vmemmap, one `Vec<u8>` standing
    /// in for the pool's identity-mapped frame bytes. Frame `i`'s physical
    /// address and virtual address are both `i * PAGE_SIZE`-offsets into
    /// their respective arenas — simple enough to let tests compute expected
    /// addresses without reaching into the pool's private state.
    #[derive(Clone, Copy)]
    struct TestPlatform {
        descriptors: *mut PageDescriptor,
        bytes: *mut u8,
        nr_pages: usize,
    }

    // SAFETY: the arenas are leaked for the process lifetime and tests run
    // single-threaded; no concurrent access races these raw pointers.
    unsafe impl Send for TestPlatform {}
    unsafe impl Sync for TestPlatform {}

    impl TestPlatform {
        fn new(nr_pages: usize) -> Self {
            let descriptors: Box<[PageDescriptor]> =
                (0..nr_pages).map(|_| PageDescriptor::new()).collect();
            let bytes = vec![0u8; nr_pages * PAGE_SIZE].into_boxed_slice();
            Self {
                descriptors: Box::leak(descriptors).as_mut_ptr(),
                bytes: Box::leak(bytes).as_mut_ptr(),
                nr_pages,
            }
        }

        fn descriptor_of_index(&self, index: usize) -> NonNull<PageDescriptor> {
            assert!(index < self.nr_pages);
            // SAFETY: `index` is bounds-checked above, `descriptors` is a
            // live leaked allocation for the process lifetime.
            unsafe { NonNull::new_unchecked(self.descriptors.add(index)) }
        }

        fn virt_of_index(&self, index: usize) -> VirtAddr {
            assert!(index < self.nr_pages);
            VirtAddr::new(self.bytes as usize + index * PAGE_SIZE)
        }
    }

    impl Platform for TestPlatform {
        const PAGE_SIZE: usize = PAGE_SIZE;

        fn phys_of(&self, desc: NonNull<PageDescriptor>) -> PhysAddr {
            // SAFETY: `desc` always comes from `descriptor_of_phys`/`_virt`
            // on this same arena.
            let index = unsafe { desc.as_ptr().offset_from(self.descriptors) } as usize;
            PhysAddr::new(index * PAGE_SIZE)
        }

        fn descriptor_of_phys(&self, pa: PhysAddr) -> NonNull<PageDescriptor> {
            self.descriptor_of_index(pa.as_usize() / PAGE_SIZE)
        }

        fn virt_of(&self, desc: NonNull<PageDescriptor>) -> VirtAddr {
            // SAFETY: see `phys_of`.
            let index = unsafe { desc.as_ptr().offset_from(self.descriptors) } as usize;
            self.virt_of_index(index)
        }

        fn descriptor_of_virt(&self, va: VirtAddr) -> NonNull<PageDescriptor> {
            let index = (va.as_usize() - self.bytes as usize) / PAGE_SIZE;
            self.descriptor_of_index(index)
        }

        fn phys_of_pfn(&self, pfn: usize) -> PhysAddr {
            PhysAddr::new(pfn * PAGE_SIZE)
        }
    }

    fn new_pool(nr_pages: usize, reserved_pages: usize) -> (Pool<TestPlatform>, TestPlatform) {
        let platform = TestPlatform::new(nr_pages);
        let pool = Pool::init(platform, 0, nr_pages, reserved_pages)
            .expect("valid nr_pages/reserved_pages");
        (pool, platform)
    }

    /// Walks the worked end-to-end scenario from the spec almost verbatim:
    /// four frames, `max_order = 2`, `reserved_pages = 0`.
    #[test]
    fn worked_four_frame_scenario() {
        let (pool, observer) = new_pool(4, 0);
        assert_eq!(pool.max_order(), 2);
        assert_eq!(pool.free_pages_snapshot(), 4);

        let a = pool.alloc(0).expect("order-0 alloc from a fresh order-2 block");
        assert_eq!(a, observer.virt_of_index(0));
        assert_eq!(pool.free_pages_snapshot(), 3);

        let b = pool.alloc(0).expect("second order-0 alloc");
        assert_eq!(b, observer.virt_of_index(1));
        assert_eq!(pool.free_pages_snapshot(), 2);

        // Releasing b alone must not coalesce: its buddy (frame 0) is still
        // allocated.
        unsafe { pool.release(b) };
        assert_eq!(pool.free_pages_snapshot(), 3);
        assert_eq!(
            unsafe { observer.descriptor_of_index(1).as_ref().order() },
            0
        );

        // Releasing a now coalesces all the way back to one order-2 block.
        unsafe { pool.release(a) };
        assert_eq!(pool.free_pages_snapshot(), 4);
        assert_eq!(
            unsafe { observer.descriptor_of_index(0).as_ref().order() },
            2
        );

        // retain/release pairs that net to zero must be idempotent on
        // free_pages.
        let c = pool.alloc(2).expect("whole pool as one order-2 block");
        assert_eq!(pool.free_pages_snapshot(), 0);
        unsafe {
            pool.retain(c);
            pool.release(c);
        }
        assert_eq!(pool.free_pages_snapshot(), 0);
        unsafe { pool.release(c) };
        assert_eq!(pool.free_pages_snapshot(), 4);
    }

    /// B1: `alloc(0)` on a pool with nothing released (fully reserved)
    /// returns the no-memory sentinel.
    #[test]
    fn alloc_on_exhausted_pool_returns_none() {
        let (pool, _observer) = new_pool(1, 1);
        assert_eq!(pool.free_pages_snapshot(), 0);
        assert!(pool.alloc(0).is_none());
    }

    /// B2 (alloc half): a request above `max_order` is refused rather than
    /// panicking — the table in §4.5 documents `alloc` as never faulting.
    #[test]
    fn alloc_above_max_order_returns_none() {
        let (pool, _observer) = new_pool(4, 0);
        assert!(pool.alloc(pool.max_order() + 1).is_none());
    }

    /// B2 (release half): releasing a descriptor whose order exceeds
    /// `max_order` is a fatal invariant violation, not a recoverable error.
    #[test]
    #[should_panic(expected = "exceeds pool max_order")]
    fn release_with_order_above_max_order_panics() {
        let (pool, observer) = new_pool(1, 0);
        let desc = observer.descriptor_of_index(0);
        // SAFETY: test-only corruption of allocator state to exercise the
        // fatal assertion path.
        unsafe { desc.as_ref().set_order(pool.max_order() + 1) };
        unsafe { pool.release(observer.virt_of_index(0)) };
    }

    /// R2: two order-`k` allocations out of a pool sized at exactly
    /// `2^(k+1)` frames land at distinct, adjacent addresses; releasing both
    /// coalesces back into a single order-`(k+1)` block.
    #[test]
    fn two_order1_allocs_coalesce_back_to_order2() {
        let (pool, observer) = new_pool(4, 0);

        let first = pool.alloc(1).expect("first order-1 alloc");
        let second = pool.alloc(1).expect("second order-1 alloc");
        assert_ne!(first, second);
        assert!(pool.alloc(1).is_none());

        unsafe {
            pool.release(first);
            pool.release(second);
        }
        assert_eq!(pool.free_pages_snapshot(), 4);
        assert_eq!(
            unsafe { observer.descriptor_of_index(0).as_ref().order() },
            2
        );
    }

    /// B3: an empty-init pool never coalesces across externally attached
    /// frames, even when they are address-adjacent buddies.
    #[test]
    fn empty_pool_does_not_coalesce_external_donations() {
        let platform = TestPlatform::new(4);
        let pool = Pool::init_empty(platform, 4).expect("nonzero capacity");
        assert_eq!(pool.free_pages_snapshot(), 0);

        for i in 0..2 {
            let desc = platform.descriptor_of_index(i);
            // SAFETY: simulating a descriptor materialized by an external
            // donor, exactly as `Pool::init` does for owned frames.
            unsafe {
                desc.as_ref().set_order(0);
                desc.as_ref().set_refcounted();
            }
            unsafe { pool.release(platform.virt_of_index(i)) };
        }

        assert_eq!(pool.free_pages_snapshot(), 2);
        for i in 0..2 {
            assert_eq!(
                unsafe { platform.descriptor_of_index(i).as_ref().order() },
                0
            );
        }
    }

    /// B4: splitting an order-`k` allocation yields `2^k` independently
    /// refcounted order-0 allocations whose individual releases recombine
    /// the block via ordinary coalescing.
    #[test]
    fn split_block_then_individual_releases_recombine() {
        let (pool, observer) = new_pool(4, 0);
        let base = pool.alloc(2).expect("whole pool as one block");
        assert_eq!(pool.free_pages_snapshot(), 0);

        unsafe { pool.split_block(base) };
        for i in 0..4 {
            let desc = observer.descriptor_of_index(i);
            assert_eq!(unsafe { desc.as_ref().order() }, 0);
            assert_eq!(unsafe { desc.as_ref().refcount() }, 1);
        }
        // split_block never touches free_pages.
        assert_eq!(pool.free_pages_snapshot(), 0);

        for i in 0..4 {
            unsafe { pool.release(observer.virt_of_index(i)) };
        }
        assert_eq!(pool.free_pages_snapshot(), 4);
        assert_eq!(
            unsafe { observer.descriptor_of_index(0).as_ref().order() },
            2
        );
    }

    #[test]
    #[should_panic(expected = "block is free")]
    fn split_block_on_free_block_panics() {
        let (pool, observer) = new_pool(1, 0);
        // Frame 0 is free (refcount 0) after init; splitting it is a
        // programmer error.
        unsafe { pool.split_block(observer.virt_of_index(0)) };
    }

    #[test]
    fn init_rejects_zero_pages() {
        let platform = TestPlatform::new(1);
        assert_eq!(
            Pool::init(platform, 0, 0, 0).unwrap_err(),
            PoolInitError::ZeroPages
        );
    }

    #[test]
    fn init_rejects_reserved_exceeding_total() {
        let platform = TestPlatform::new(2);
        assert_eq!(
            Pool::init(platform, 0, 2, 3).unwrap_err(),
            PoolInitError::ReservedExceedsTotal
        );
    }

    #[test]
    fn init_empty_rejects_zero_pages() {
        let platform = TestPlatform::new(1);
        assert_eq!(
            Pool::init_empty(platform, 0).unwrap_err(),
            PoolInitError::ZeroPages
        );
    }
}
