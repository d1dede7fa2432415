// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Pluggable wait strategies for the lock-free queues.
//!
//! Trades latency against CPU burn. Queue correctness is independent of the
//! chosen strategy; it only shapes what a blocked side does between retries.
//!
//! | Strategy   | Latency  | CPU usage | Use                       |
//! |------------|----------|-----------|---------------------------|
//! | `BusySpin` | lowest   | 100%      | hot receive path          |
//! | `Yielding` | low      | high      | active trading threads    |
//! | `Sleeping` | medium   | low       | background drains         |
//! | `Backoff`  | adaptive | variable  | general purpose (default) |

use std::hint;
use std::thread;
use std::time::Duration;

/// Spins before `Yielding` starts ceding the CPU.
const YIELD_AFTER_SPINS: u32 = 100;

/// Maximum pause count for `Backoff` before it sleeps.
const BACKOFF_MAX_PAUSES: u32 = 1024;

/// Nanoseconds slept by the sleeping strategies per idle round.
const SLEEP_NANOS: u64 = 1_000;

/// What a queue side does while waiting for its counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WaitStrategy {
    /// Pause instruction only; never yields the CPU.
    BusySpin,
    /// Pause for a bounded number of spins, then `thread::yield_now`.
    Yielding,
    /// Yield once, then nanosleep.
    Sleeping,
    /// Exponential pause growth (1 to 1024), then nanosleep.
    #[default]
    Backoff,
}

impl WaitStrategy {
    /// Idle for one round. `iteration` counts consecutive failed attempts
    /// and resets to zero when the caller makes progress.
    #[inline]
    pub fn idle(self, iteration: u32) {
        match self {
            WaitStrategy::BusySpin => hint::spin_loop(),
            WaitStrategy::Yielding => {
                if iteration < YIELD_AFTER_SPINS {
                    hint::spin_loop();
                } else {
                    thread::yield_now();
                }
            }
            WaitStrategy::Sleeping => {
                if iteration == 0 {
                    thread::yield_now();
                } else {
                    thread::sleep(Duration::from_nanos(SLEEP_NANOS));
                }
            }
            WaitStrategy::Backoff => {
                // 1, 2, 4, ... pauses, capped; past the cap, sleep.
                let pauses = 1u32 << iteration.min(10);
                if pauses <= BACKOFF_MAX_PAUSES && iteration <= 10 {
                    for _ in 0..pauses {
                        hint::spin_loop();
                    }
                } else {
                    thread::sleep(Duration::from_nanos(SLEEP_NANOS));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_strategies_terminate() {
        // Each strategy must return from idle() promptly at any iteration.
        for strategy in [
            WaitStrategy::BusySpin,
            WaitStrategy::Yielding,
            WaitStrategy::Sleeping,
            WaitStrategy::Backoff,
        ] {
            for iteration in [0, 1, 10, 100, 1_000, 100_000] {
                strategy.idle(iteration);
            }
        }
    }

    #[test]
    fn test_default_is_backoff() {
        assert_eq!(WaitStrategy::default(), WaitStrategy::Backoff);
    }
}
