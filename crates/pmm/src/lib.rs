//! `los_pmm` — a binary-buddy physical page allocator.
//!
//! This crate implements the allocator proper for a hypervisor's isolated
//! address space: a bounded pool of physically contiguous, page-sized
//! frames handed out in power-of-two-sized blocks and reclaimed through
//! reference counting plus buddy coalescing. Everything outside that —
//! how frames are donated to the pool at boot, the concrete virtual
//! mapping backing the frame map, and the spinlock's own implementation —
//! is left to the host through the [`Platform`] trait.
//!
//! # Locking and refcount discipline
//!
//! The free-area array and every descriptor's `order` are mutated only
//! while the pool's free-area lock is held. `refcount` is mutated with
//! plain atomic ops outside that lock; the transition to zero is what arms
//! the release path, which then takes the lock to coalesce the block back
//! in. `free_pages` is published with a relaxed store under the lock and
//! read with a relaxed load without it — [`Pool::free_pages_snapshot`] is
//! documented as approximate for exactly this reason.
//!
//! # Zeroing
//!
//! Allocated blocks are always zero-initialized, but the zeroing happens on
//! release, not on allocate — see [`Pool::alloc`]. This keeps the
//! latency-critical allocate path free of a bulk memset.
#![cfg_attr(not(feature = "std"), no_std)]

mod addr;
mod error;
mod free_list;
mod page;
mod pool;

pub use addr::{PhysAddr, VirtAddr};
pub use error::PoolInitError;
pub use page::{NO_ORDER, PageDescriptor};
pub use pool::{MAX_ORDER, Platform, Pool};
