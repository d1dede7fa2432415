// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Global configuration: compiled defaults plus environment overrides.
//!
//! Static constants centralize every tunable default; `RuntimeConfig`
//! reads the `HFIX_*` environment once at initialization. There is no
//! configuration file format — embedding applications own that layer.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `HFIX_CORES` | comma-separated allowed cores for session pinning | unset (no pinning) |
//! | `HFIX_HUGE_PAGES` | `1` requests huge-page-backed buffers | off |
//! | `HFIX_HEARTBEAT_SECS` | default heartbeat interval | 30 |
//! | `HFIX_DEFERRED_CAPACITY` | deferred queue capacity (power of two) | 8192 |
//! | `HFIX_OVERFLOW_POLICY` | `block` or `error` | block |

use std::time::Duration;

use crate::deferred::OverflowPolicy;

// =======================================================================
// Compiled defaults
// =======================================================================

/// Default heartbeat interval (FIX convention).
pub const DEFAULT_HEARTBEAT_SECS: u64 = 30;

/// Default deferred-queue capacity (records).
pub const DEFAULT_DEFERRED_CAPACITY: usize = 8_192;

/// Default session heap size (bytes).
pub const DEFAULT_SESSION_HEAP_BYTES: usize = 64 * 1024 * 1024;

/// TestRequest escalation point as a fraction of the heartbeat interval
/// (numerator/denominator of 1.2).
pub const TEST_REQUEST_NUM: u32 = 6;
/// See [`TEST_REQUEST_NUM`].
pub const TEST_REQUEST_DEN: u32 = 5;

/// Fatal silence threshold in heartbeat intervals.
pub const FATAL_SILENCE_INTERVALS: u32 = 2;

// =======================================================================
// Runtime configuration
// =======================================================================

/// Process-wide knobs, read from the environment once at startup.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Cores session threads may pin to; empty disables pinning.
    pub allowed_cores: Vec<usize>,
    /// Prefer huge-page backing for arenas and registered buffers.
    pub huge_pages: bool,
    /// Default heartbeat interval for new sessions.
    pub heartbeat: Duration,
    /// Deferred queue capacity.
    pub deferred_capacity: usize,
    /// Back-pressure behavior of the deferred processor.
    pub overflow_policy: OverflowPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            allowed_cores: Vec::new(),
            huge_pages: false,
            heartbeat: Duration::from_secs(DEFAULT_HEARTBEAT_SECS),
            deferred_capacity: DEFAULT_DEFERRED_CAPACITY,
            overflow_policy: OverflowPolicy::Block,
        }
    }
}

impl RuntimeConfig {
    /// Read the `HFIX_*` environment. Unset or malformed variables fall
    /// back to the compiled defaults (malformed values log a warning).
    #[must_use]
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("HFIX_CORES") {
            config.allowed_cores = parse_core_list(&raw);
        }
        if let Ok(raw) = std::env::var("HFIX_HUGE_PAGES") {
            config.huge_pages = raw == "1";
        }
        if let Ok(raw) = std::env::var("HFIX_HEARTBEAT_SECS") {
            match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => config.heartbeat = Duration::from_secs(secs),
                _ => log::warn!("[config] ignoring invalid HFIX_HEARTBEAT_SECS={raw}"),
            }
        }
        if let Ok(raw) = std::env::var("HFIX_DEFERRED_CAPACITY") {
            match raw.parse::<usize>() {
                Ok(capacity) if capacity > 0 => config.deferred_capacity = capacity,
                _ => log::warn!("[config] ignoring invalid HFIX_DEFERRED_CAPACITY={raw}"),
            }
        }
        if let Ok(raw) = std::env::var("HFIX_OVERFLOW_POLICY") {
            match raw.as_str() {
                "block" => config.overflow_policy = OverflowPolicy::Block,
                "error" => config.overflow_policy = OverflowPolicy::Error,
                _ => log::warn!("[config] ignoring invalid HFIX_OVERFLOW_POLICY={raw}"),
            }
        }

        config
    }
}

/// Parse `"0,2,4"` into a core list, dropping garbage entries.
fn parse_core_list(raw: &str) -> Vec<usize> {
    raw.split(',')
        .filter_map(|part| {
            let part = part.trim();
            if part.is_empty() {
                return None;
            }
            match part.parse::<usize>() {
                Ok(core) => Some(core),
                Err(_) => {
                    log::warn!("[config] ignoring invalid core '{part}' in HFIX_CORES");
                    None
                }
            }
        })
        .collect()
}
