// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Thread-local object pool with an MPSC release backchannel.
//!
//! Fixed capacity of pre-constructed objects behind a free-list stack.
//! Acquire and release are index swaps on the owning thread. A guard that
//! has to migrate to another thread converts into a [`RemoteToken`]; the
//! token's drop routes the slot index back through an MPSC queue, and the
//! owning thread reclaims it on its next acquire.
//!
//! Invariant: object access happens only on the owning thread. The remote
//! token carries no reference to the object, only the slot index.

use std::cell::{RefCell, UnsafeCell};
use std::marker::PhantomData;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::mpsc::MpscQueue;
use super::wait::WaitStrategy;

/// Fixed-capacity object pool owned by a single thread.
pub struct ObjectPool<T> {
    slots: Box<[UnsafeCell<T>]>,
    free: RefCell<Vec<u32>>,
    /// Release backchannel for guards that crossed threads.
    remote: Arc<MpscQueue<u32>>,
    /// Pins the pool to the thread that created it.
    _not_send: PhantomData<*const ()>,
}

impl<T> ObjectPool<T> {
    /// Build a pool of `capacity` objects produced by `init`.
    ///
    /// # Panics
    /// Panics if `capacity` is 0 or exceeds `u32::MAX`.
    #[must_use]
    pub fn with_capacity(capacity: usize, mut init: impl FnMut() -> T) -> Self {
        assert!(capacity > 0, "capacity must be > 0");
        assert!(capacity <= u32::MAX as usize, "capacity exceeds u32 range");

        let slots = (0..capacity)
            .map(|_| UnsafeCell::new(init()))
            .collect::<Vec<_>>()
            .into_boxed_slice();
        let free = (0..capacity as u32).rev().collect();

        Self {
            slots,
            free: RefCell::new(free),
            remote: Arc::new(MpscQueue::with_capacity(capacity, WaitStrategy::Yielding)),
            _not_send: PhantomData,
        }
    }

    /// Total number of objects.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Objects currently available (after draining remote releases).
    #[must_use]
    pub fn available(&self) -> usize {
        self.reclaim();
        self.free.borrow().len()
    }

    /// Pull indices released from other threads back into the free list.
    fn reclaim(&self) {
        let mut free = self.free.borrow_mut();
        while let Some(index) = self.remote.pop() {
            free.push(index);
        }
    }

    /// Acquire an object. Returns `None` when the pool is exhausted.
    pub fn acquire(&self) -> Option<PoolGuard<'_, T>> {
        let index = {
            let mut free = self.free.borrow_mut();
            match free.pop() {
                Some(index) => Some(index),
                None => {
                    drop(free);
                    self.reclaim();
                    self.free.borrow_mut().pop()
                }
            }
        }?;
        Some(PoolGuard { pool: self, index })
    }
}

/// RAII handle to a pooled object; releases its slot on drop.
pub struct PoolGuard<'a, T> {
    pool: &'a ObjectPool<T>,
    index: u32,
}

impl<T> PoolGuard<'_, T> {
    /// Slot index (diagnostics).
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Give up object access and produce a token that may be dropped on
    /// any thread; the slot returns to the pool via the backchannel.
    #[must_use]
    pub fn into_remote(self) -> RemoteToken {
        let token = RemoteToken {
            queue: Arc::clone(&self.pool.remote),
            index: self.index,
        };
        std::mem::forget(self);
        token
    }
}

impl<T> Deref for PoolGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: the free-list discipline guarantees this slot is handed
        // to at most one guard at a time, on the owning thread.
        unsafe { &*self.pool.slots[self.index as usize].get() }
    }
}

impl<T> DerefMut for PoolGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: as above; the guard is the unique accessor.
        unsafe { &mut *self.pool.slots[self.index as usize].get() }
    }
}

impl<T> Drop for PoolGuard<'_, T> {
    fn drop(&mut self) {
        self.pool.free.borrow_mut().push(self.index);
    }
}

/// Cross-thread release token. Carries no object reference.
pub struct RemoteToken {
    queue: Arc<MpscQueue<u32>>,
    index: u32,
}

impl Drop for RemoteToken {
    fn drop(&mut self) {
        // Queue capacity equals pool capacity, so push cannot starve: at
        // most one token per slot exists.
        self.queue.push(self.index);
    }
}
