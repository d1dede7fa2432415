// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session layer: logon/logout lifecycle, heartbeats, sequence
//! accounting, gap recovery, and the resend service.
//!
//! A [`Session`] pairs a [`crate::store::MessageStore`] with a
//! [`crate::transport::Transport`] and exposes a poll-driven API: the
//! owning thread calls `pump` after transport readiness and `on_timer` on
//! its schedule. Application callbacks go through [`SessionHandler`].

pub mod engine;
pub mod registry;
pub mod state;

pub use engine::{DeliverDup, NullHandler, Session, SessionConfig, SessionHandler};
pub use registry::{SessionId, SessionRegistry};
pub use state::SessionState;
