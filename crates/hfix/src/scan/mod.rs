// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SIMD delimiter scanner and checksum.
//!
//! Two operations on contiguous byte buffers, both correct on unaligned
//! input:
//!
//! - locate SOH (`0x01`) delimiters, either the next one (streaming framing)
//!   or every position (structural indexing);
//! - mod-256 byte sum (the FIX checksum) using SAD-style horizontal byte
//!   sums on the vector paths.
//!
//! Dispatch is buffer-size based: buffers of 128 bytes and up prefer the
//! 512-bit path when the CPU has AVX-512F+BW, 64 bytes and up prefer AVX2,
//! smaller vectors go through the SSE2 baseline, and everything else (or any
//! non-x86_64 target) uses the portable scalar path. All paths return
//! byte-identical results; the equivalence is asserted by randomized tests.

mod scalar;
#[cfg(target_arch = "x86_64")]
mod x86;

/// SOH byte, the FIX field terminator.
pub const SOH: u8 = 0x01;

#[cfg(target_arch = "x86_64")]
#[derive(Clone, Copy)]
struct CpuFeatures {
    avx2: bool,
    avx512: bool,
}

#[cfg(target_arch = "x86_64")]
fn cpu_features() -> CpuFeatures {
    use std::sync::OnceLock;
    static FEATURES: OnceLock<CpuFeatures> = OnceLock::new();
    *FEATURES.get_or_init(|| CpuFeatures {
        avx2: std::arch::is_x86_feature_detected!("avx2"),
        avx512: std::arch::is_x86_feature_detected!("avx512f")
            && std::arch::is_x86_feature_detected!("avx512bw"),
    })
}

/// Find the position of the next SOH byte.
#[must_use]
pub fn find_soh(buf: &[u8]) -> Option<usize> {
    #[cfg(target_arch = "x86_64")]
    {
        let feat = cpu_features();
        if buf.len() >= 128 && feat.avx512 {
            // SAFETY: avx512f+avx512bw presence checked above.
            return unsafe { x86::find_soh_avx512(buf) };
        }
        if buf.len() >= 64 && feat.avx2 {
            // SAFETY: avx2 presence checked above.
            return unsafe { x86::find_soh_avx2(buf) };
        }
        if buf.len() >= 16 {
            // SAFETY: sse2 is part of the x86_64 baseline.
            return unsafe { x86::find_soh_sse2(buf) };
        }
    }
    scalar::find_soh(buf)
}

/// Append the position of every SOH byte to `out`.
///
/// Positions are strictly increasing. `out` is not cleared.
pub fn scan_soh(buf: &[u8], out: &mut Vec<u32>) {
    #[cfg(target_arch = "x86_64")]
    {
        let feat = cpu_features();
        if buf.len() >= 128 && feat.avx512 {
            // SAFETY: avx512f+avx512bw presence checked above.
            unsafe { x86::scan_soh_avx512(buf, out) };
            return;
        }
        if buf.len() >= 64 && feat.avx2 {
            // SAFETY: avx2 presence checked above.
            unsafe { x86::scan_soh_avx2(buf, out) };
            return;
        }
        if buf.len() >= 16 {
            // SAFETY: sse2 is part of the x86_64 baseline.
            unsafe { x86::scan_soh_sse2(buf, out) };
            return;
        }
    }
    scalar::scan_soh(buf, out);
}

/// Sum of all bytes mod 256 (the FIX checksum).
///
/// The caller passes the message prefix ending at the SOH that precedes
/// `10=`; this function is agnostic about content.
#[must_use]
pub fn checksum(buf: &[u8]) -> u8 {
    #[cfg(target_arch = "x86_64")]
    {
        let feat = cpu_features();
        if buf.len() >= 128 && feat.avx512 {
            // SAFETY: avx512f+avx512bw presence checked above.
            return unsafe { x86::checksum_avx512(buf) };
        }
        if buf.len() >= 64 && feat.avx2 {
            // SAFETY: avx2 presence checked above.
            return unsafe { x86::checksum_avx2(buf) };
        }
        if buf.len() >= 16 {
            // SAFETY: sse2 is part of the x86_64 baseline.
            return unsafe { x86::checksum_sse2(buf) };
        }
    }
    scalar::checksum(buf)
}

/// Portable scalar scanner, exported for equivalence testing.
#[must_use]
pub fn find_soh_scalar(buf: &[u8]) -> Option<usize> {
    scalar::find_soh(buf)
}

/// Portable scalar index scan, exported for equivalence testing.
pub fn scan_soh_scalar(buf: &[u8], out: &mut Vec<u32>) {
    scalar::scan_soh(buf, out);
}

/// Portable scalar checksum, exported for equivalence testing.
#[must_use]
pub fn checksum_scalar(buf: &[u8]) -> u8 {
    scalar::checksum(buf)
}
