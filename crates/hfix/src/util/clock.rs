// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Cycle counter and wall-clock helpers.
//!
//! The hot path records raw cycle counts (`rdtsc` on x86_64); conversion
//! to nanoseconds happens lazily on the background thread through a
//! [`CycleClock`] calibrated once at startup.

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Raw cycle counter (monotonic-enough for intra-session measurements).
#[inline]
#[must_use]
pub fn cycle_count() -> u64 {
    #[cfg(target_arch = "x86_64")]
    {
        // SAFETY: RDTSC has no preconditions on x86_64.
        unsafe { std::arch::x86_64::_rdtsc() }
    }
    #[cfg(not(target_arch = "x86_64"))]
    {
        use std::sync::OnceLock;
        static BASE: OnceLock<Instant> = OnceLock::new();
        BASE.get_or_init(Instant::now).elapsed().as_nanos() as u64
    }
}

/// Wall-clock nanoseconds since the Unix epoch.
#[must_use]
pub fn wall_clock_ns() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos() as u64
}

/// Cycle-to-nanosecond converter, calibrated against the monotonic clock.
#[derive(Debug, Clone, Copy)]
pub struct CycleClock {
    base_cycles: u64,
    base_wall_ns: u64,
    cycles_per_nano: f64,
}

impl CycleClock {
    /// Calibrate over a short spin window (~2 ms).
    #[must_use]
    pub fn calibrate() -> Self {
        let wall_start = Instant::now();
        let cycles_start = cycle_count();
        while wall_start.elapsed() < Duration::from_millis(2) {
            std::hint::spin_loop();
        }
        let elapsed_ns = wall_start.elapsed().as_nanos() as u64;
        let elapsed_cycles = cycle_count().wrapping_sub(cycles_start);

        Self {
            base_cycles: cycle_count(),
            base_wall_ns: wall_clock_ns(),
            cycles_per_nano: (elapsed_cycles as f64 / elapsed_ns as f64).max(f64::MIN_POSITIVE),
        }
    }

    /// Current raw tick value.
    #[inline]
    #[must_use]
    pub fn ticks(&self) -> u64 {
        cycle_count()
    }

    /// Convert a tick delta to nanoseconds.
    #[must_use]
    pub fn ticks_to_nanos(&self, ticks: u64) -> u64 {
        (ticks as f64 / self.cycles_per_nano) as u64
    }

    /// Reconstruct the wall-clock time (Unix nanos) of a recorded tick.
    #[must_use]
    pub fn wall_ns_at(&self, tick: u64) -> u64 {
        let delta = tick.wrapping_sub(self.base_cycles);
        self.base_wall_ns
            .saturating_add(self.ticks_to_nanos(delta))
    }
}
