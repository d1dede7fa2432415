// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session lifecycle states.
//!
//! ```text
//!                 connect()                recv Logon
//!  Disconnected ───────────▶ LogonSent ───────────────▶ Active
//!       ▲                        │                        │
//!       │      recv non-Logon    │                        │ disconnect()
//!       ├────────────────────────┘                        ▼
//!       │                 recv Logout                 LogoutSent
//!       └─────────────────────────────────────────────────┘
//! ```
//!
//! An acceptor passes through `LogonReceived` between the peer's Logon and
//! its own reply. Resend recovery is an orthogonal sub-state tracked by
//! the session, not a lifecycle state.

use std::fmt;

/// Lifecycle state of one FIX session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No connection, or torn down.
    Disconnected,
    /// Initiator sent Logon, awaiting the echo.
    LogonSent,
    /// Acceptor received Logon, reply in flight.
    LogonReceived,
    /// Both sides logged on; traffic flows.
    Active,
    /// Logout sent, awaiting the peer's Logout.
    LogoutSent,
}

impl SessionState {
    /// True when outbound application messages are accepted.
    #[must_use]
    pub fn can_send_app(self) -> bool {
        matches!(self, SessionState::Active)
    }

    /// True when the transport is expected to be connected.
    #[must_use]
    pub fn is_connected(self) -> bool {
        !matches!(self, SessionState::Disconnected)
    }

    /// Whether `self -> next` is a legal lifecycle transition.
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        use SessionState::{Active, Disconnected, LogonReceived, LogonSent, LogoutSent};
        matches!(
            (self, next),
            (Disconnected, LogonSent)
                | (Disconnected, LogonReceived)
                | (LogonSent, Active)
                | (LogonSent, Disconnected)
                | (LogonReceived, Active)
                | (LogonReceived, Disconnected)
                | (Active, LogoutSent)
                | (Active, Disconnected)
                | (LogoutSent, Disconnected)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SessionState::Disconnected => "Disconnected",
            SessionState::LogonSent => "LogonSent",
            SessionState::LogonReceived => "LogonReceived",
            SessionState::Active => "Active",
            SessionState::LogoutSent => "LogoutSent",
        };
        f.write_str(name)
    }
}
