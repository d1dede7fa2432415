// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Deferred processor: move expensive work off the hot receive path.
//!
//! The hot path stamps a cycle-counter timestamp, copies the message into
//! a fixed-size record, and pushes it onto an SPSC queue — no heap
//! allocation, no syscall, no lock. A background worker pops records,
//! converts the timestamp lazily, and runs the application callback
//! (full parse, persistence, notification).
//!
//! Overflow is a configured knob: `Block` holds the hot path with a
//! bounded spin-then-yield until the worker drains, `Error` surfaces
//! back-pressure to the session immediately.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crate::error::{Error, Result};
use crate::rt::{SpscQueue, WaitStrategy};
use crate::util::CycleClock;

/// Inline payload capacity of one deferred record.
pub const DEFERRED_PAYLOAD: usize = 4096;

/// What `submit` does when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Hold the hot path (bounded spin, then yield) until space frees.
    #[default]
    Block,
    /// Fail fast with `Error::QueueFull`.
    Error,
}

/// Fixed-size record carried through the SPSC queue.
pub struct DeferredMessage {
    /// Raw cycle-counter stamp taken on the hot path.
    pub ts_ticks: u64,
    len: u32,
    data: [u8; DEFERRED_PAYLOAD],
}

impl DeferredMessage {
    fn new(ts_ticks: u64, payload: &[u8]) -> Self {
        let mut data = [0u8; DEFERRED_PAYLOAD];
        data[..payload.len()].copy_from_slice(payload);
        Self {
            ts_ticks,
            len: payload.len() as u32,
            data,
        }
    }

    /// Message bytes.
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.len as usize]
    }
}

/// SPSC handoff from a session thread to its background worker.
pub struct DeferredProcessor {
    queue: Arc<SpscQueue<DeferredMessage>>,
    running: Arc<AtomicBool>,
    worker: Option<JoinHandle<()>>,
    policy: OverflowPolicy,
    wait: WaitStrategy,
    clock: CycleClock,
}

impl DeferredProcessor {
    /// Create a processor with the given queue capacity.
    #[must_use]
    pub fn new(capacity: usize, policy: OverflowPolicy) -> Self {
        Self {
            queue: Arc::new(SpscQueue::with_capacity(capacity)),
            running: Arc::new(AtomicBool::new(false)),
            worker: None,
            policy,
            wait: WaitStrategy::Backoff,
            clock: CycleClock::calibrate(),
        }
    }

    /// Cycle clock shared with the worker (wall-clock reconstruction).
    #[must_use]
    pub fn clock(&self) -> CycleClock {
        self.clock
    }

    /// Spawn the background worker.
    ///
    /// The callback receives each record in submit order (SPSC = FIFO).
    pub fn start<F>(&mut self, mut callback: F) -> Result<()>
    where
        F: FnMut(&DeferredMessage) + Send + 'static,
    {
        if self.worker.is_some() {
            return Err(Error::InvalidState("deferred processor already started"));
        }
        self.running.store(true, Ordering::Release);

        let queue = Arc::clone(&self.queue);
        let running = Arc::clone(&self.running);
        let wait = self.wait;
        let worker = std::thread::Builder::new()
            .name("hfix-deferred".into())
            .spawn(move || {
                let mut idle = 0u32;
                loop {
                    match queue.pop() {
                        Some(record) => {
                            idle = 0;
                            callback(&record);
                        }
                        None => {
                            if !running.load(Ordering::Acquire) {
                                break;
                            }
                            wait.idle(idle);
                            idle = idle.saturating_add(1);
                        }
                    }
                }
                // Final drain after stop() flips the flag.
                while let Some(record) = queue.pop() {
                    callback(&record);
                }
            })?;
        self.worker = Some(worker);
        Ok(())
    }

    /// Hot-path handoff: stamp, copy, push.
    ///
    /// No allocation, no syscall, no lock. Payloads longer than
    /// [`DEFERRED_PAYLOAD`] are refused with `Error::Overload`.
    pub fn submit(&self, payload: &[u8]) -> Result<()> {
        if payload.len() > DEFERRED_PAYLOAD {
            return Err(Error::Overload);
        }
        let mut record = DeferredMessage::new(crate::util::cycle_count(), payload);

        match self.policy {
            OverflowPolicy::Error => self
                .queue
                .push(record)
                .map_err(|_| Error::QueueFull),
            OverflowPolicy::Block => {
                let mut spins = 0u32;
                loop {
                    match self.queue.push(record) {
                        Ok(()) => return Ok(()),
                        Err(back) => {
                            record = back;
                            self.wait.idle(spins);
                            spins = spins.saturating_add(1);
                        }
                    }
                }
            }
        }
    }

    /// Records currently queued (racy).
    #[must_use]
    pub fn backlog(&self) -> usize {
        self.queue.len()
    }

    /// Stop the worker after it drains the queue.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                log::error!("[DeferredProcessor] worker panicked");
            }
        }
    }
}

impl Drop for DeferredProcessor {
    fn drop(&mut self) {
        self.stop();
    }
}
