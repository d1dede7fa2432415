// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Completion-based transport over io_uring (Linux, `uring` feature).
//!
//! Submissions go into the ring's SQ, completions come back through the
//! CQ; the transport bridges that model to the [`Transport`] contract.
//! Three ring features are wired up:
//!
//! - **registered buffers**: a pool of fixed-size buffers published to the
//!   kernel once (`register_buffers`), optionally huge-page backed;
//! - **provided buffers + multishot receive**: one `RecvMulti` submission
//!   keeps producing completions as data arrives, each carrying the id of
//!   the kernel-selected buffer from the provided group;
//! - **batched submission**: [`BatchSubmitter`] queues entries and issues
//!   a single `submit` syscall for the whole batch.
//!
//! Construction degrades with `PlatformUnsupported` when the kernel lacks
//! io_uring; callers fall back to the readiness transport.

use std::net::SocketAddr;
use std::os::fd::{AsRawFd, OwnedFd};
use std::time::Duration;

use io_uring::{cqueue, opcode, squeue, types, IoUring};
use socket2::{Domain, Protocol, Socket, Type};

use crate::error::{Error, Result};
use crate::util::hugepages::HugeRegion;

use super::{RecvOutcome, Transport};

const USER_DATA_SEND: u64 = 1;
const USER_DATA_RECV: u64 = 2;
const USER_DATA_MULTISHOT: u64 = 3;
const USER_DATA_PROVIDE: u64 = 4;
const USER_DATA_CANCEL: u64 = 5;

/// Provided-buffer group id used for multishot receive.
const RECV_BUFFER_GROUP: u16 = 7;

/// io_uring transport tuning.
#[derive(Debug, Clone)]
pub struct UringConfig {
    /// SQ/CQ entry count (power of two).
    pub entries: u32,
    /// Number of provided receive buffers.
    pub recv_buffers: u16,
    /// Size of each receive buffer.
    pub recv_buffer_len: usize,
    /// Number of kernel-registered send buffers (0 disables fixed sends).
    pub send_buffers: u16,
    /// Size of each registered send buffer.
    pub send_buffer_len: usize,
    /// Back the receive pool with huge pages when available.
    pub huge_pages: bool,
    /// `IORING_SETUP_DEFER_TASKRUN`.
    pub defer_taskrun: bool,
    /// `IORING_SETUP_COOP_TASKRUN`.
    pub coop_taskrun: bool,
    /// `IORING_SETUP_SINGLE_ISSUER`.
    pub single_issuer: bool,
    /// Disable Nagle on the socket.
    pub nodelay: bool,
}

impl Default for UringConfig {
    fn default() -> Self {
        Self {
            entries: 256,
            recv_buffers: 32,
            recv_buffer_len: 8 * 1024,
            send_buffers: 8,
            send_buffer_len: 4 * 1024,
            huge_pages: false,
            defer_taskrun: false,
            coop_taskrun: false,
            single_issuer: false,
            nodelay: true,
        }
    }
}

enum PoolBacking {
    Heap(Vec<u8>),
    Huge(HugeRegion),
}

impl PoolBacking {
    fn as_mut_ptr(&mut self) -> *mut u8 {
        match self {
            PoolBacking::Heap(bytes) => bytes.as_mut_ptr(),
            PoolBacking::Huge(region) => region.as_mut_ptr(),
        }
    }
}

/// Contiguous pool of `count` fixed-size buffers provided to the kernel.
struct ProvidedPool {
    backing: PoolBacking,
    count: u16,
    buffer_len: usize,
}

impl ProvidedPool {
    fn allocate(count: u16, buffer_len: usize, huge: bool) -> Self {
        let total = usize::from(count) * buffer_len;
        let backing = if huge {
            match HugeRegion::allocate(total) {
                Ok(region) => PoolBacking::Huge(region),
                Err(err) => {
                    log::debug!("[UringTransport] huge pages unavailable ({err}), using heap");
                    PoolBacking::Heap(vec![0u8; total])
                }
            }
        } else {
            PoolBacking::Heap(vec![0u8; total])
        };
        Self {
            backing,
            count,
            buffer_len,
        }
    }

    fn buffer_ptr(&mut self, bid: u16) -> *mut u8 {
        debug_assert!(bid < self.count);
        // SAFETY: bid < count keeps the offset inside the pool.
        unsafe {
            self.backing
                .as_mut_ptr()
                .add(usize::from(bid) * self.buffer_len)
        }
    }
}

/// Buffers registered with the kernel once (`register_buffers`); sends
/// through them skip the per-operation buffer mapping.
struct RegisteredBuffers {
    bufs: Vec<Box<[u8]>>,
    /// Round-robin cursor over registered slots.
    next: usize,
}

impl RegisteredBuffers {
    fn register(ring: &IoUring, count: u16, len: usize) -> Option<Self> {
        if count == 0 {
            return None;
        }
        let mut bufs: Vec<Box<[u8]>> = (0..count)
            .map(|_| vec![0u8; len].into_boxed_slice())
            .collect();
        let iovecs: Vec<libc::iovec> = bufs
            .iter_mut()
            .map(|buf| libc::iovec {
                iov_base: buf.as_mut_ptr().cast(),
                iov_len: buf.len(),
            })
            .collect();
        // SAFETY: the boxed buffers outlive the registration; they are
        // owned by the transport and deregistered implicitly on ring drop.
        match unsafe { ring.submitter().register_buffers(&iovecs) } {
            Ok(()) => Some(Self { bufs, next: 0 }),
            Err(err) => {
                log::debug!("[UringTransport] register_buffers failed: {err}");
                None
            }
        }
    }
}

/// Completion-based TCP transport.
pub struct UringTransport {
    ring: IoUring,
    socket: OwnedFd,
    pool: ProvidedPool,
    registered: Option<RegisteredBuffers>,
    /// `(buffer id, length)` completions reaped but not yet consumed.
    ready: std::collections::VecDeque<(u16, usize)>,
    /// Partially consumed front buffer: bytes already copied out.
    front_offset: usize,
    multishot_armed: bool,
    peer_closed: bool,
    open: bool,
}

impl UringTransport {
    /// Connect to `addr` over a fresh ring.
    ///
    /// Returns `PlatformUnsupported` when the kernel has no io_uring, so
    /// callers can fall back to [`super::TcpTransport`].
    pub fn connect(addr: SocketAddr, config: &UringConfig) -> Result<Self> {
        let mut builder = IoUring::builder();
        if config.defer_taskrun {
            builder.setup_defer_taskrun();
        }
        if config.coop_taskrun {
            builder.setup_coop_taskrun();
        }
        if config.single_issuer {
            builder.setup_single_issuer();
        }
        let ring = builder.build(config.entries).map_err(|err| {
            log::debug!("[UringTransport] ring setup failed: {err}");
            Error::PlatformUnsupported("io_uring unavailable")
        })?;

        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        socket.set_nodelay(config.nodelay)?;

        let registered =
            RegisteredBuffers::register(&ring, config.send_buffers, config.send_buffer_len);
        let mut transport = Self {
            ring,
            socket: OwnedFd::from(socket),
            pool: ProvidedPool::allocate(config.recv_buffers, config.recv_buffer_len, config.huge_pages),
            registered,
            ready: std::collections::VecDeque::new(),
            front_offset: 0,
            multishot_armed: false,
            peer_closed: false,
            open: true,
        };

        transport.submit_connect(addr)?;
        transport.provide_all_buffers()?;
        transport.arm_multishot()?;
        log::debug!("[UringTransport] connected to {addr}");
        Ok(transport)
    }

    fn fd(&self) -> types::Fd {
        types::Fd(self.socket.as_raw_fd())
    }

    fn submit_connect(&mut self, addr: SocketAddr) -> Result<()> {
        let sock_addr = socket2::SockAddr::from(addr);
        let entry = opcode::Connect::new(self.fd(), sock_addr.as_ptr().cast(), sock_addr.len())
            .build()
            .user_data(USER_DATA_SEND);
        self.push_and_wait(entry)?;
        let result = self.wait_for(USER_DATA_SEND)?;
        if result < 0 {
            self.open = false;
            return Err(os_error(-result));
        }
        Ok(())
    }

    /// Publish every pool buffer into the provided-buffer group.
    fn provide_all_buffers(&mut self) -> Result<()> {
        let len = i32::try_from(self.pool.buffer_len)
            .map_err(|_| Error::PlatformUnsupported("receive buffer too large"))?;
        let count = self.pool.count;
        let base = self.pool.buffer_ptr(0);
        let entry = opcode::ProvideBuffers::new(base, len, count, RECV_BUFFER_GROUP, 0)
            .build()
            .user_data(USER_DATA_PROVIDE);
        self.push_and_wait(entry)?;
        let result = self.wait_for(USER_DATA_PROVIDE)?;
        if result < 0 {
            return Err(os_error(-result));
        }
        Ok(())
    }

    /// Return one consumed buffer to the group.
    fn reprovide_buffer(&mut self, bid: u16) -> Result<()> {
        let len = self.pool.buffer_len as i32;
        let ptr = self.pool.buffer_ptr(bid);
        let entry = opcode::ProvideBuffers::new(ptr, len, 1, RECV_BUFFER_GROUP, bid)
            .build()
            .user_data(USER_DATA_PROVIDE);
        self.push_and_wait(entry)?;
        Ok(())
    }

    /// One multishot receive keeps feeding completions as data arrives.
    fn arm_multishot(&mut self) -> Result<()> {
        if self.multishot_armed {
            return Ok(());
        }
        let entry = opcode::RecvMulti::new(self.fd(), RECV_BUFFER_GROUP)
            .build()
            .user_data(USER_DATA_MULTISHOT);
        self.push_and_wait(entry)?;
        self.multishot_armed = true;
        Ok(())
    }

    fn push_and_wait(&mut self, entry: squeue::Entry) -> Result<()> {
        loop {
            // SAFETY: every entry's buffers (socket fd, pool, caller slice)
            // outlive the submission; completions are reaped before reuse.
            let pushed = unsafe { self.ring.submission().push(&entry).is_ok() };
            if pushed {
                self.ring.submit()?;
                return Ok(());
            }
            // SQ full: flush and retry.
            self.ring.submit()?;
        }
    }

    /// Drain the CQ into local state; returns completions seen.
    fn reap(&mut self) -> usize {
        let mut reaped = 0;
        let mut rearm = false;
        for cqe in self.ring.completion() {
            reaped += 1;
            match cqe.user_data() {
                USER_DATA_MULTISHOT => {
                    let result = cqe.result();
                    if result == 0 || result == -libc::ECONNRESET {
                        self.peer_closed = true;
                        self.multishot_armed = false;
                    } else if result < 0 {
                        if result != -libc::ENOBUFS {
                            log::debug!(
                                "[UringTransport] multishot recv error: {}",
                                std::io::Error::from_raw_os_error(-result)
                            );
                        }
                        self.multishot_armed = false;
                    } else if let Some(bid) = cqueue::buffer_select(cqe.flags()) {
                        self.ready.push_back((bid, cqe.result() as usize));
                    }
                    if !cqueue::more(cqe.flags()) {
                        self.multishot_armed = false;
                        rearm = true;
                    }
                }
                USER_DATA_PROVIDE | USER_DATA_SEND | USER_DATA_RECV | USER_DATA_CANCEL => {}
                other => {
                    log::debug!("[UringTransport] stray completion user_data={other}");
                }
            }
        }
        if rearm && !self.peer_closed && self.open {
            if let Err(err) = self.arm_multishot() {
                log::debug!("[UringTransport] multishot rearm failed: {err}");
            }
        }
        reaped
    }

    /// Block until a completion with `user_data` arrives; returns its result.
    fn wait_for(&mut self, user_data: u64) -> Result<i32> {
        loop {
            self.ring.submit_and_wait(1)?;
            let mut found = None;
            let mut rearm = false;
            for cqe in self.ring.completion() {
                if cqe.user_data() == user_data {
                    found = Some(cqe.result());
                } else if cqe.user_data() == USER_DATA_MULTISHOT {
                    if let Some(bid) = cqueue::buffer_select(cqe.flags()) {
                        if cqe.result() > 0 {
                            self.ready.push_back((bid, cqe.result() as usize));
                        }
                    } else if cqe.result() == 0 {
                        self.peer_closed = true;
                    }
                    if !cqueue::more(cqe.flags()) {
                        self.multishot_armed = false;
                        rearm = true;
                    }
                }
            }
            if rearm && !self.peer_closed {
                let _ = self.arm_multishot();
            }
            if let Some(result) = found {
                return Ok(result);
            }
        }
    }
}

impl Transport for UringTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<usize> {
        if !self.open {
            return Err(Error::EndOfStream);
        }

        // Fixed path: copy into a registered buffer and submit WriteFixed
        // with its index; the kernel skips per-operation mapping.
        let fd = self.fd();
        let entry = match &mut self.registered {
            Some(registered) if bytes.len() <= registered.bufs[0].len() => {
                let index = registered.next;
                registered.next = (registered.next + 1) % registered.bufs.len();
                registered.bufs[index][..bytes.len()].copy_from_slice(bytes);
                opcode::WriteFixed::new(
                    fd,
                    registered.bufs[index].as_ptr(),
                    bytes.len() as u32,
                    index as u16,
                )
                .build()
                .user_data(USER_DATA_SEND)
            }
            _ => opcode::Send::new(fd, bytes.as_ptr(), bytes.len() as u32)
                .build()
                .user_data(USER_DATA_SEND),
        };
        self.push_and_wait(entry)?;
        let result = self.wait_for(USER_DATA_SEND)?;
        if result == -libc::EAGAIN {
            return Err(Error::WouldBlock);
        }
        if result < 0 {
            self.open = false;
            return Err(os_error(-result));
        }
        Ok(result as usize)
    }

    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvOutcome> {
        if !self.open {
            return Err(Error::EndOfStream);
        }
        self.reap();

        let Some(&(bid, len)) = self.ready.front() else {
            return Ok(if self.peer_closed {
                RecvOutcome::Closed
            } else {
                RecvOutcome::WouldBlock
            });
        };

        let remaining = len - self.front_offset;
        let take = remaining.min(buf.len());
        let src = self.pool.buffer_ptr(bid);
        // SAFETY: front_offset + take <= len <= buffer_len; src is the
        // pool buffer the kernel filled for this completion.
        unsafe {
            std::ptr::copy_nonoverlapping(src.add(self.front_offset), buf.as_mut_ptr(), take);
        }

        if take == remaining {
            self.ready.pop_front();
            self.front_offset = 0;
            self.reprovide_buffer(bid)?;
        } else {
            self.front_offset += take;
        }
        Ok(RecvOutcome::Data(take))
    }

    fn wait_readable(&mut self, timeout_ms: u64) -> Result<bool> {
        if !self.open {
            return Err(Error::EndOfStream);
        }
        if !self.ready.is_empty() || self.peer_closed {
            return Ok(true);
        }

        let timespec = types::Timespec::new()
            .sec(timeout_ms / 1_000)
            .nsec((timeout_ms % 1_000) as u32 * 1_000_000);
        let args = io_uring::types::SubmitArgs::new().timespec(&timespec);
        match self.ring.submitter().submit_with_args(1, &args) {
            Ok(_) => {}
            Err(err) if err.raw_os_error() == Some(libc::ETIME) => {}
            Err(err) => return Err(err.into()),
        }
        self.reap();
        Ok(!self.ready.is_empty() || self.peer_closed)
    }

    fn close(&mut self) -> Result<()> {
        if self.open {
            self.open = false;
            // Cancel the outstanding multishot receive; its completion
            // still drains through the CQ.
            let entry = opcode::AsyncCancel::new(USER_DATA_MULTISHOT)
                .build()
                .user_data(USER_DATA_CANCEL);
            let _ = self.push_and_wait(entry);
            let _ = self.ring.submit();
            log::debug!("[UringTransport] closed");
        }
        Ok(())
    }

    fn is_open(&self) -> bool {
        self.open
    }
}

/// Queue up to `capacity` submissions and emit one syscall for the batch.
pub struct BatchSubmitter {
    pending: Vec<squeue::Entry>,
    capacity: usize,
    auto_flush: bool,
}

impl BatchSubmitter {
    /// Explicit-flush submitter.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            auto_flush: false,
        }
    }

    /// Submitter that flushes as soon as the batch fills.
    #[must_use]
    pub fn new_auto(capacity: usize) -> Self {
        Self {
            pending: Vec::with_capacity(capacity),
            capacity,
            auto_flush: true,
        }
    }

    /// Queued entry count.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Queue one entry. With auto-flush, a full batch is submitted
    /// immediately; otherwise `Error::QueueFull` asks for an explicit
    /// flush.
    ///
    /// # Safety
    /// As with raw SQ pushes: buffers referenced by `entry` must stay
    /// valid until its completion is reaped.
    pub unsafe fn push(&mut self, ring: &mut IoUring, entry: squeue::Entry) -> Result<()> {
        if self.pending.len() == self.capacity {
            if self.auto_flush {
                self.flush(ring)?;
            } else {
                return Err(Error::QueueFull);
            }
        }
        self.pending.push(entry);
        Ok(())
    }

    /// Push every queued entry into the SQ and issue a single submit.
    pub fn flush(&mut self, ring: &mut IoUring) -> Result<usize> {
        if self.pending.is_empty() {
            return Ok(0);
        }
        for entry in self.pending.drain(..) {
            loop {
                // SAFETY: caller upheld buffer validity at push time.
                let pushed = unsafe { ring.submission().push(&entry).is_ok() };
                if pushed {
                    break;
                }
                ring.submit()?;
            }
        }
        let submitted = ring.submit()?;
        Ok(submitted)
    }
}

fn os_error(errno: i32) -> Error {
    std::io::Error::from_raw_os_error(errno).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_submitter_bounds() {
        let batch = BatchSubmitter::new(4);
        assert_eq!(batch.pending(), 0);
        assert_eq!(batch.capacity, 4);

        let auto = BatchSubmitter::new_auto(2);
        assert!(auto.auto_flush);
        assert_eq!(auto.pending(), 0);
    }

    #[test]
    fn test_config_defaults() {
        let config = UringConfig::default();
        assert_eq!(config.entries, 256);
        assert!(config.nodelay);
        assert!(!config.defer_taskrun);
    }

    // Ring-backed tests only run where io_uring exists; constructing the
    // transport on older kernels must degrade, not panic.
    #[test]
    fn test_connect_degrades_or_connects() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");

        match UringTransport::connect(addr, &UringConfig::default()) {
            Ok(transport) => assert!(transport.is_open()),
            Err(Error::PlatformUnsupported(_)) => {}
            Err(other) => panic!("unexpected failure: {other}"),
        }
    }
}
