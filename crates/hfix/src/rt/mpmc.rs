// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Multi-producer multi-consumer queue with turn-based slot synchronization.
//!
//! Each slot carries an atomic turn counter that alternates between "ready
//! for write" and "ready for read" generations:
//!
//! - writable when `turn == 2 * (ticket / capacity)`
//! - readable when `turn == 2 * (ticket / capacity) + 1`
//!
//! Producers take a ticket from `head.fetch_add(1)`, consumers from
//! `tail.fetch_add(1)`; a ticket owner spins (per wait strategy) until its
//! slot reaches the matching turn. Per-slot cache-line padding eliminates
//! false sharing between neighbouring slots; head, tail, and the slot array
//! live on separate lines.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::utils::CachePadded;

use super::wait::WaitStrategy;

struct Slot<T> {
    turn: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Bounded multi-producer multi-consumer queue.
pub struct MpmcQueue<T> {
    slots: Box<[CachePadded<Slot<T>>]>,
    capacity: usize,
    capacity_mask: usize,
    wait: WaitStrategy,

    /// Producer ticket counter.
    head: CachePadded<AtomicUsize>,

    /// Consumer ticket counter.
    tail: CachePadded<AtomicUsize>,
}

// SAFETY: a slot's value is only touched by the thread whose ticket matches
// the slot's current turn; the turn atomic publishes the value between
// producer and consumer.
unsafe impl<T: Send> Send for MpmcQueue<T> {}
unsafe impl<T: Send> Sync for MpmcQueue<T> {}

impl<T> MpmcQueue<T> {
    /// Create a queue with capacity rounded up to the next power of two.
    ///
    /// # Panics
    /// Panics if `capacity` is 0.
    #[must_use]
    pub fn with_capacity(capacity: usize, wait: WaitStrategy) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        let capacity = capacity.next_power_of_two();

        let slots = (0..capacity)
            .map(|_| {
                CachePadded::new(Slot {
                    turn: AtomicUsize::new(0),
                    value: UnsafeCell::new(MaybeUninit::uninit()),
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();

        Self {
            slots,
            capacity,
            capacity_mask: capacity - 1,
            wait,
            head: CachePadded::new(AtomicUsize::new(0)),
            tail: CachePadded::new(AtomicUsize::new(0)),
        }
    }

    /// Usable capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    #[inline]
    fn write_turn(&self, ticket: usize) -> usize {
        2 * (ticket / self.capacity)
    }

    /// Push a value, waiting (per strategy) for the slot's write turn.
    pub fn push(&self, value: T) {
        let ticket = self.head.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[ticket & self.capacity_mask];
        let turn = self.write_turn(ticket);

        let mut spins = 0u32;
        while slot.turn.load(Ordering::Acquire) != turn {
            self.wait.idle(spins);
            spins = spins.saturating_add(1);
        }

        // SAFETY: matching turn gives this thread exclusive slot access.
        unsafe {
            (*slot.value.get()).write(value);
        }
        slot.turn.store(turn + 1, Ordering::Release);
    }

    /// Pop a value, waiting (per strategy) for the slot's read turn.
    pub fn pop(&self) -> T {
        let ticket = self.tail.fetch_add(1, Ordering::Relaxed);
        let slot = &self.slots[ticket & self.capacity_mask];
        let turn = self.write_turn(ticket) + 1;

        let mut spins = 0u32;
        while slot.turn.load(Ordering::Acquire) != turn {
            self.wait.idle(spins);
            spins = spins.saturating_add(1);
        }

        // SAFETY: matching turn gives this thread exclusive slot access.
        let value = unsafe { (*slot.value.get()).assume_init_read() };
        slot.turn.store(turn + 1, Ordering::Release);
        value
    }

    /// Attempt a push without waiting. Fails when the queue is full.
    pub fn try_push(&self, value: T) -> Result<(), T> {
        let mut ticket = self.head.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[ticket & self.capacity_mask];
            if slot.turn.load(Ordering::Acquire) != self.write_turn(ticket) {
                // Slot not writable: either full, or we raced; re-check head.
                let current = self.head.load(Ordering::Relaxed);
                if current == ticket {
                    return Err(value);
                }
                ticket = current;
                continue;
            }
            match self.head.compare_exchange_weak(
                ticket,
                ticket.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // SAFETY: won the ticket; turn check above makes the
                    // slot exclusively ours.
                    unsafe {
                        (*slot.value.get()).write(value);
                    }
                    slot.turn
                        .store(self.write_turn(ticket) + 1, Ordering::Release);
                    return Ok(());
                }
                Err(current) => ticket = current,
            }
        }
    }

    /// Attempt a pop without waiting. Returns `None` when empty.
    pub fn try_pop(&self) -> Option<T> {
        let mut ticket = self.tail.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[ticket & self.capacity_mask];
            if slot.turn.load(Ordering::Acquire) != self.write_turn(ticket) + 1 {
                let current = self.tail.load(Ordering::Relaxed);
                if current == ticket {
                    return None;
                }
                ticket = current;
                continue;
            }
            match self.tail.compare_exchange_weak(
                ticket,
                ticket.wrapping_add(1),
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => {
                    // SAFETY: won the ticket; turn check above makes the
                    // slot exclusively ours.
                    let value = unsafe { (*slot.value.get()).assume_init_read() };
                    slot.turn
                        .store(self.write_turn(ticket) + 2, Ordering::Release);
                    return Some(value);
                }
                Err(current) => ticket = current,
            }
        }
    }

    /// Approximate number of unconsumed items (racy across threads).
    #[must_use]
    pub fn len(&self) -> usize {
        let head = self.head.load(Ordering::Relaxed);
        let tail = self.tail.load(Ordering::Relaxed);
        head.saturating_sub(tail)
    }

    /// Approximate emptiness (racy across threads).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Drop for MpmcQueue<T> {
    fn drop(&mut self) {
        while self.try_pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    fn queue(capacity: usize) -> MpmcQueue<u64> {
        MpmcQueue::with_capacity(capacity, WaitStrategy::Yielding)
    }

    #[test]
    fn test_push_pop_basic() {
        let q = queue(8);
        q.push(1);
        q.push(2);
        assert_eq!(q.pop(), 1);
        assert_eq!(q.pop(), 2);
    }

    #[test]
    fn test_try_push_full() {
        let q = queue(4);
        for i in 0..4 {
            q.try_push(i).expect("queue should hold capacity items");
        }
        assert_eq!(q.try_push(99), Err(99), "capacity must bound the queue");
    }

    #[test]
    fn test_try_pop_empty() {
        let q = queue(4);
        assert_eq!(q.try_pop(), None);
        q.push(5);
        assert_eq!(q.try_pop(), Some(5));
        assert_eq!(q.try_pop(), None);
    }

    #[test]
    fn test_turn_generations_wrap() {
        let q = queue(2);
        // Cycle through several generations of the same slots.
        for round in 0..100 {
            q.push(round);
            q.push(round + 1000);
            assert_eq!(q.pop(), round);
            assert_eq!(q.pop(), round + 1000);
        }
    }

    #[test]
    fn test_mpmc_all_values_arrive_once() {
        const PRODUCERS: u64 = 3;
        const CONSUMERS: usize = 3;
        const PER_PRODUCER: u64 = 5_000;

        let q = Arc::new(queue(256));

        let mut producers = Vec::new();
        for p in 0..PRODUCERS {
            let q = Arc::clone(&q);
            producers.push(thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    q.push(p * PER_PRODUCER + i);
                }
            }));
        }

        let mut consumers = Vec::new();
        for _ in 0..CONSUMERS {
            let q = Arc::clone(&q);
            consumers.push(thread::spawn(move || {
                let mut got = Vec::new();
                let share = (PRODUCERS * PER_PRODUCER) as usize / CONSUMERS;
                for _ in 0..share {
                    got.push(q.pop());
                }
                got
            }));
        }

        for handle in producers {
            handle.join().expect("producer should finish");
        }

        let mut all = HashSet::new();
        for handle in consumers {
            let got = handle.join().expect("consumer should finish");
            // Per-producer order within one consumer's view must be
            // monotonic: a single producer's values pass through slots in
            // ticket order.
            let mut last_per_producer = vec![None::<u64>; PRODUCERS as usize];
            for value in &got {
                let producer = (value / PER_PRODUCER) as usize;
                let index = value % PER_PRODUCER;
                if let Some(last) = last_per_producer[producer] {
                    assert!(index > last, "per-producer order violated");
                }
                last_per_producer[producer] = Some(index);
            }
            for value in got {
                assert!(all.insert(value), "value {value} consumed twice");
            }
        }
        assert_eq!(all.len(), (PRODUCERS * PER_PRODUCER) as usize);
    }
}
