// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Single-producer single-consumer ring buffer.
//!
//! Lock-free bounded queue with head and tail counters on separate cache
//! lines. The producer publishes a slot with a release store on the head;
//! the consumer frees a slot with a release store on the tail. Both sides
//! are wait-free within capacity.
//!
//! Protocol:
//! - Producer: push() writes the value, then advances head (Release)
//! - Consumer: pop() acquires head, reads the value, advances tail (Release)
//! - Full: `head - tail == capacity`
//! - Empty: `head == tail`
//!
//! SAFETY:
//! - SPSC constraint: only ONE thread calls push(), ONE calls pop()
//! - Acquire/Release ordering on the index that publishes the value;
//!   Relaxed on the same side's own index
//! - Capacity is a power of two (mask-based wrapping, no modulo)

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

/// Bounded single-producer single-consumer queue.
pub struct SpscQueue<T> {
    slots: Box<[UnsafeCell<MaybeUninit<T>>]>,
    capacity_mask: usize,

    /// Producer-advanced counter (monotonic, masked on access).
    head: CachePadded<AtomicUsize>,

    /// Consumer-advanced counter (monotonic, masked on access).
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: the SPSC protocol guarantees a slot is accessed by exactly one
// side at a time; head/tail atomics publish slot contents across threads.
unsafe impl<T: Send> Send for SpscQueue<T> {}
unsafe impl<T: Send> Sync for SpscQueue<T> {}

impl<T> SpscQueue<T> {
    /// Create a queue with capacity rounded up to the next power of two.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let capacity = capacity.next_power_of_two();

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(MaybeUninit::uninit()))
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            capacity_mask: capacity - 1,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Usable capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity_mask + 1
    }

    /// Push a value. Returns `Err(value)` without blocking when full.
    ///
    /// SAFETY contract: only the producer thread may call this.
    pub fn push(&self, value: T) -> Result<(), T> {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Acquire);
        if head.wrapping_sub(tail) > self.capacity_mask {
            return Err(value); // Full, non-blocking
        }

        // SAFETY: the slot at head is free (consumer is past it) and only
        // the single producer writes here before publishing via head.
        unsafe {
            (*self.slots[head & self.capacity_mask].get()).write(value);
        }

        self.head.store(head.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Pop a value. Returns `None` without blocking when empty.
    ///
    /// SAFETY contract: only the consumer thread may call this.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        let head = self.head.load(Ordering::Acquire);
        if tail == head {
            return None; // Empty
        }

        // SAFETY: head (Acquire) published this slot; only the single
        // consumer reads it before freeing via tail.
        let value = unsafe {
            (*self.slots[tail & self.capacity_mask].get())
                .assume_init_read()
        };

        self.tail.store(tail.wrapping_add(1), Ordering::Release);
        Some(value)
    }

    /// Approximate number of queued items (racy across threads).
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.wrapping_sub(tail)
    }

    /// Approximate emptiness (racy across threads).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for SpscQueue<T> {
    fn drop(&mut self) {
        // Drain in-place: &mut self means no concurrent access remains.
        while self.pop().is_some() {}
    }
}
