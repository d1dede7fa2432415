// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Huge-page allocation and memory locking.
//!
//! Both are optional capabilities: failure degrades silently to normal
//! pages / unlocked memory and the caller logs at debug level.

#[cfg(not(target_os = "linux"))]
use crate::error::Error;
use crate::error::Result;

/// Huge page size assumed on Linux (2 MB).
pub const HUGE_PAGE_SIZE: usize = 2 * 1024 * 1024;

/// Anonymous huge-page-backed memory region.
pub struct HugeRegion {
    ptr: *mut u8,
    len: usize,
}

// SAFETY: the region is plain memory with unique ownership; sending the
// owner across threads is sound.
unsafe impl Send for HugeRegion {}

impl HugeRegion {
    /// Map `len` bytes (rounded up to the huge page size) with
    /// `MAP_HUGETLB`.
    #[cfg(target_os = "linux")]
    pub fn allocate(len: usize) -> Result<Self> {
        let len = len.div_ceil(HUGE_PAGE_SIZE) * HUGE_PAGE_SIZE;
        // SAFETY: anonymous mapping, no fd; result checked against
        // MAP_FAILED before use.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS | libc::MAP_HUGETLB,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            return Err(std::io::Error::last_os_error().into());
        }
        Ok(Self {
            ptr: ptr.cast(),
            len,
        })
    }

    /// Huge pages are Linux-only; other platforms degrade.
    #[cfg(not(target_os = "linux"))]
    pub fn allocate(_len: usize) -> Result<Self> {
        Err(Error::PlatformUnsupported("huge pages"))
    }

    /// Region size in bytes (multiple of the huge page size).
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// True when the region is empty (never, in practice).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Base pointer of the region.
    #[must_use]
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }
}

#[cfg(target_os = "linux")]
impl Drop for HugeRegion {
    fn drop(&mut self) {
        // SAFETY: ptr/len came from a successful mmap of exactly len bytes.
        unsafe {
            libc::munmap(self.ptr.cast(), self.len);
        }
    }
}

/// Lock all current and future pages of the process into RAM.
///
/// Returns `PlatformUnsupported` where `mlockall` does not exist and the
/// raw OS error when the limit is exceeded; callers treat both as a
/// degraded (but functional) configuration.
#[cfg(target_os = "linux")]
pub fn lock_process_memory() -> Result<()> {
    // SAFETY: mlockall has no memory-safety preconditions.
    let rc = unsafe { libc::mlockall(libc::MCL_CURRENT | libc::MCL_FUTURE) };
    if rc != 0 {
        return Err(std::io::Error::last_os_error().into());
    }
    Ok(())
}

/// See the Linux variant; other platforms degrade.
#[cfg(not(target_os = "linux"))]
pub fn lock_process_memory() -> Result<()> {
    Err(Error::PlatformUnsupported("mlockall"))
}
