// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Connection-oriented byte-stream transports.
//!
//! The session layer drives a [`Transport`] and never blocks inside it:
//! `send` and `recv` report `WouldBlock` instead of waiting, and the
//! readiness helpers bound every wait with a timeout so heartbeat timers
//! keep firing.
//!
//! Two implementations ship: the portable readiness-based
//! [`TcpTransport`] (non-blocking sockets polled through mio) and, behind
//! the `uring` feature on Linux, a completion-based transport over an
//! io_uring ring with registered buffers, multishot receive, and batched
//! submission.

pub mod tcp;
#[cfg(all(feature = "uring", target_os = "linux"))]
pub mod uring;

pub use tcp::{TcpConfig, TcpListener, TcpTransport};
#[cfg(all(feature = "uring", target_os = "linux"))]
pub use uring::{BatchSubmitter, UringConfig, UringTransport};

use crate::error::Result;

/// Result of one non-blocking receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecvOutcome {
    /// Bytes were read into the caller's buffer.
    Data(usize),
    /// Nothing available; retry after readiness or completion.
    WouldBlock,
    /// Peer closed the stream.
    Closed,
}

/// Connection-oriented byte stream.
///
/// Dynamic dispatch is fine here: transport calls sit at suspension
/// points, never inside the parse path.
pub trait Transport: Send {
    /// Write bytes; returns the count written (possibly short) or
    /// `Error::WouldBlock`.
    fn send(&mut self, bytes: &[u8]) -> Result<usize>;

    /// Read into `buf` without blocking.
    fn recv(&mut self, buf: &mut [u8]) -> Result<RecvOutcome>;

    /// Wait until readable or `timeout_ms` elapses. Returns readability.
    fn wait_readable(&mut self, timeout_ms: u64) -> Result<bool>;

    /// Close the connection. Further operations fail.
    fn close(&mut self) -> Result<()>;

    /// True until `close` or a fatal error.
    fn is_open(&self) -> bool;
}
