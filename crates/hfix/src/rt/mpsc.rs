// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-producer single-consumer queue (claim/publish pattern).
//!
//! Producers reserve a ticket with `fetch_add` on the claim counter, write
//! their slot, then advance the publish counter in ticket order so the
//! consumer only ever observes a dense published prefix.
//!
//! Protocol:
//! 1. Producer claims ticket: `claim.fetch_add(1)`
//! 2. Producer waits for its slot to be free (consumer caught up)
//! 3. Producer writes the value
//! 4. Producer waits until `published == ticket` (sequence ordering)
//! 5. Producer stores `published = ticket + 1` (Release)
//! 6. Consumer pops while `tail < published`

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use super::wait::WaitStrategy;

/// Bounded multi-producer single-consumer queue.
pub struct MpscQueue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity_mask: usize,
    wait: WaitStrategy,

    /// Next ticket to hand to a producer.
    claim: CachePadded<AtomicUsize>,

    /// All tickets below this value are fully written and visible.
    published: CachePadded<AtomicUsize>,

    /// Consumer position.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: slot ownership is transferred by ticket: a producer exclusively
// owns slot `ticket & mask` between claim and publish, the consumer
// exclusively owns it between publish and tail advance.
unsafe impl<T: Send> Send for MpscQueue<T> {}
unsafe impl<T: Send> Sync for MpscQueue<T> {}

impl<T> MpscQueue<T> {
    /// Create a queue with capacity rounded up to the next power of two.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize, wait: WaitStrategy) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let capacity = capacity.next_power_of_two();

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            capacity_mask: capacity - 1,
            wait,
            claim: CachePadded::new(AtomicUsize::new(0)),
            published: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Usable capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity_mask + 1
    }

    /// Push a value, waiting (per strategy) for space and publish order.
    ///
    /// Lock-free: a producer only ever waits on consumer progress or on a
    /// producer with an earlier ticket.
    pub fn push(&self, value: T) {
        let ticket = self.claim.fetch_add(1, Ordering::Relaxed);

        // Wait until the consumer has freed our slot.
        let mut spins = 0u32;
        while ticket.wrapping_sub(self.tail.load(Ordering::Acquire)) > self.capacity_mask {
            self.wait.idle(spins);
            spins = spins.saturating_add(1);
        }

        // SAFETY: ticket ownership makes this slot exclusively ours until
        // we advance `published` past it.
        unsafe {
            (*self.slots[ticket & self.capacity_mask].get()).write(value);
        }

        // Publish strictly in ticket order. Acquire chains the release
        // sequence so the consumer sees every earlier producer's write.
        let mut spins = 0u32;
        while self.published.load(Ordering::Acquire) != ticket {
            self.wait.idle(spins);
            spins = spins.saturating_add(1);
        }
        self.published
            .store(ticket.wrapping_add(1), Ordering::Release);
    }

    /// Attempt a push without waiting.
    ///
    /// Conservative: fails when the queue is full or another producer is
    /// mid-publish (claiming would then have to wait for ordering).
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let claim = self.claim.load(Ordering::Relaxed);
        if self.published.load(Ordering::Acquire) != claim {
            return Err(value); // In-flight producer
        }
        if claim.wrapping_sub(self.tail.load(Ordering::Acquire)) > self.capacity_mask {
            return Err(value); // Full
        }
        if self
            .claim
            .compare_exchange(claim, claim.wrapping_add(1), Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return Err(value); // Lost the race
        }

        // SAFETY: the successful CAS makes the slot exclusively ours.
        unsafe {
            (*self.slots[claim & self.capacity_mask].get()).write(value);
        }

        // No earlier unpublished ticket can exist: we verified
        // published == claim before winning the CAS.
        self.published
            .store(claim.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Pop the next published value.
    ///
    /// SAFETY contract: only the single consumer thread may call this.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.published.load(Ordering::Acquire) {
            return None; // Nothing published
        }

        // SAFETY: `published` (Acquire) covers this slot; the consumer is
        // the only reader and frees the slot by advancing tail.
        let value = unsafe {
            (*self.slots[tail & self.capacity_mask].get()).assume_init_read()
        };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Approximate number of published, unconsumed items.
    #[must_use]
    pub fn len(&self) -> usize {
        let published = self.published.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        published.wrapping_sub(tail)
    }

    /// Approximate emptiness.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for MpscQueue<T> {
    fn drop(&mut self) {
        while self.pop().is_some() {}
    }
}
