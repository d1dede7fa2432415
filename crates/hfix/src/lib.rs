// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! # hfix - low-latency FIX protocol engine
//!
//! A library that parses, builds, validates, and transports FIX text
//! messages, manages session state with at-least-once delivery, and
//! offers a Simple Binary Encoding fast path for pre-agreed message
//! shapes.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::time::Instant;
//! use hfix::session::{NullHandler, Session, SessionConfig};
//! use hfix::store::MemoryStore;
//! use hfix::transport::{TcpConfig, TcpTransport};
//! use hfix::Result;
//!
//! fn main() -> Result<()> {
//!     let transport =
//!         TcpTransport::connect("127.0.0.1:9878".parse().unwrap(), &TcpConfig::default())?;
//!     let mut session = Session::new(
//!         SessionConfig::new("CLIENT", "BROKER"),
//!         MemoryStore::new(),
//!         transport,
//!         NullHandler,
//!         Instant::now(),
//!     );
//!     session.connect(Instant::now())?;
//!     loop {
//!         let now = Instant::now();
//!         session.pump(now)?;
//!         session.on_timer(now)?;
//!     }
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! +--------------------------------------------------------------------+
//! |                         Application Layer                          |
//! |        SessionHandler callbacks | DeferredProcessor worker         |
//! +--------------------------------------------------------------------+
//! |                          Session Layer                             |
//! |  Logon/Logout | Heartbeats | Sequence accounting | Resend service  |
//! +--------------------------------------------------------------------+
//! |                           Codec Layer                              |
//! |  SIMD scanner | Structural index | Builders | SBE fast path        |
//! +--------------------------------------------------------------------+
//! |                         Transport Layer                            |
//! |  Readiness TCP (mio) | Completion ring (io_uring, optional)        |
//! +--------------------------------------------------------------------+
//! ```
//!
//! ## Key Types
//!
//! | Type | Description |
//! |------|-------------|
//! | [`session::Session`] | One FIX session over a store and transport |
//! | [`parser::ParsedMessage`] | Validated message with lazy field access |
//! | [`protocol::MessageBuilder`] | Wire message construction |
//! | [`store::MessageStore`] | Outbound persistence for resend |
//! | [`deferred::DeferredProcessor`] | Hot-path handoff to a worker thread |
//!
//! ## Modules Overview
//!
//! - [`session`] - session state machine (start here)
//! - [`parser`] - two-stage message parsing
//! - [`protocol`] - builders and timestamps
//! - [`sbe`] - binary fast path
//! - [`transport`] - TCP and io_uring transports
//! - [`store`] - in-memory and mmap message stores
//! - [`rt`] - lock-free queues, arenas, pools
//! - [`scan`] - SIMD delimiter scan and checksum

/// Global configuration (compiled defaults, `HFIX_*` environment).
pub mod config;
/// Deferred processor (hot-path handoff to a background worker).
pub mod deferred;
/// Crate-wide error type and result alias.
pub mod error;
/// Two-stage FIX parser (structural index, field views, typed views).
pub mod parser;
/// Message construction (runtime and compile-time builders, timestamps).
pub mod protocol;
/// Lock-free runtime structures (queues, wait strategies, arenas, pools).
pub mod rt;
/// Simple Binary Encoding codecs.
pub mod sbe;
/// SIMD delimiter scanner and checksum.
pub mod scan;
/// Session layer (lifecycle, heartbeats, sequence accounting, resend).
pub mod session;
/// Message stores (in-memory and memory-mapped).
pub mod store;
/// Byte-stream transports (readiness TCP, optional io_uring).
pub mod transport;
/// Wire value types (tags, versions, fixed-point decimal).
pub mod types;
/// Platform helpers (affinity, cycle counter, huge pages).
pub mod util;

pub use error::{Error, Result};
pub use parser::ParsedMessage;
pub use protocol::MessageBuilder;
pub use session::{Session, SessionConfig, SessionHandler, SessionState};
pub use store::MessageStore;
pub use transport::Transport;
pub use types::{Decimal, FixVersion, MsgType};

/// Library version string.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
