// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! CPU affinity for session I/O threads.
//!
//! A session's core is chosen by hashing its comp-id pair into the
//! configured allowed-core set, so a given counterparty lands on the same
//! core across restarts. Pinning is optional; unsupported platforms
//! degrade silently.

#[cfg(not(target_os = "linux"))]
use crate::error::Error;
use crate::error::Result;

/// FNV-1a 64-bit offset basis.
const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
/// FNV-1a 64-bit prime.
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

/// FNV-1a hash of the session identity bytes.
fn fnv1a(parts: &[&[u8]]) -> u64 {
    let mut hash = FNV_OFFSET;
    for part in parts {
        for &b in *part {
            hash ^= u64::from(b);
            hash = hash.wrapping_mul(FNV_PRIME);
        }
    }
    hash
}

/// Pick the pinned core for a session out of `allowed` cores.
///
/// Returns `None` when the allowed set is empty (pinning disabled).
#[must_use]
pub fn core_for_session(sender: &[u8], target: &[u8], allowed: &[usize]) -> Option<usize> {
    if allowed.is_empty() {
        return None;
    }
    let hash = fnv1a(&[sender, b"\x00", target]);
    Some(allowed[(hash % allowed.len() as u64) as usize])
}

/// Pin the calling thread to `core`.
#[cfg(target_os = "linux")]
pub fn pin_current_thread(core: usize) -> Result<()> {
    // SAFETY: cpu_set_t is a plain bitset; CPU_ZERO/CPU_SET initialize it
    // fully before the syscall reads it.
    unsafe {
        let mut set: libc::cpu_set_t = std::mem::zeroed();
        libc::CPU_ZERO(&mut set);
        libc::CPU_SET(core, &mut set);
        let rc = libc::sched_setaffinity(0, std::mem::size_of::<libc::cpu_set_t>(), &set);
        if rc != 0 {
            return Err(std::io::Error::last_os_error().into());
        }
    }
    log::debug!("[affinity] pinned thread to core {core}");
    Ok(())
}

/// Affinity is Linux-only; other platforms degrade.
#[cfg(not(target_os = "linux"))]
pub fn pin_current_thread(_core: usize) -> Result<()> {
    Err(Error::PlatformUnsupported("cpu affinity"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_core_choice_is_stable() {
        let allowed = [2usize, 4, 6, 8];
        let first = core_for_session(b"CLIENT", b"SERVER", &allowed);
        let second = core_for_session(b"CLIENT", b"SERVER", &allowed);
        assert_eq!(first, second, "same identity must map to the same core");
        assert!(allowed.contains(&first.expect("core chosen")));
    }

    #[test]
    fn test_identity_order_matters() {
        let allowed: Vec<usize> = (0..64).collect();
        // The separator byte keeps ("AB","C") and ("A","BC") distinct.
        let ab_c = core_for_session(b"AB", b"C", &allowed);
        let a_bc = core_for_session(b"A", b"BC", &allowed);
        assert_ne!(ab_c, a_bc, "identity concatenation must be unambiguous");
    }

    #[test]
    fn test_empty_core_set_disables_pinning() {
        assert_eq!(core_for_session(b"A", b"B", &[]), None);
    }

    #[test]
    fn test_pin_current_thread_degrades_gracefully() {
        // Core 0 exists everywhere pinning is supported; elsewhere the
        // call must degrade with an error rather than panic.
        match pin_current_thread(0) {
            Ok(()) | Err(Error::PlatformUnsupported(_)) | Err(Error::Io(_)) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
}
