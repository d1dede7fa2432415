// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Crate-wide error type and result alias.
//!
//! Every fallible operation in the library returns [`Result`]. Module-local
//! error enums ([`crate::parser::ParseError`], [`crate::parser::ValueError`])
//! convert into [`Error`] at the API boundary so callers match on a single
//! type.

use std::fmt;
use std::io;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the FIX engine.
#[derive(Debug)]
pub enum Error {
    // ========================================================================
    // Framing / Parse Errors
    // ========================================================================
    /// Buffer does not yet contain a complete message; read more bytes.
    Truncated,
    /// First field is not `8=<BeginString>` at byte 0.
    BadBeginString,
    /// `9=<n>` missing, malformed, or `n` disagrees with the framed length.
    BadBodyLength,
    /// Declared checksum does not match the computed mod-256 sum.
    BadChecksum {
        /// Value declared in tag 10.
        declared: u8,
        /// Value computed over the message prefix.
        computed: u8,
    },
    /// A field is missing its `=` separator or has an empty tag.
    MalformedField(usize),
    /// A field value failed conversion (tag, reason).
    ValueParse {
        /// Tag whose value failed to convert.
        tag: u32,
        /// Static description of the failure.
        reason: &'static str,
    },

    // ========================================================================
    // Session Errors
    // ========================================================================
    /// Peer broke the session-layer protocol (e.g. first message not Logon).
    ProtocolViolation(&'static str),
    /// Inbound sequence lower than expected without PossDupFlag=Y.
    LowerSequence {
        /// Sequence number the session expected next.
        expected: u32,
        /// Sequence number actually received.
        received: u32,
    },
    /// Counterparty silent past twice the heartbeat interval.
    HeartbeatTimeout,
    /// Operation invalid in the current session state.
    InvalidState(&'static str),
    /// Outbound sequence counter would wrap past `u32::MAX`.
    SeqNumOverflow,

    // ========================================================================
    // Store Errors
    // ========================================================================
    /// Store cannot accept further messages.
    StoreFull,
    /// Sequence number already present in the outbound store.
    StoreDuplicate(u32),
    /// Persistent store failed integrity checks.
    StoreCorrupt(&'static str),

    // ========================================================================
    // Queue / Back-Pressure Errors
    // ========================================================================
    /// Bounded queue is full and the overflow policy is `Error`.
    QueueFull,
    /// Deferred processor cannot keep up; session is overloaded.
    Overload,

    // ========================================================================
    // Transport Errors
    // ========================================================================
    /// Operation would block; retry after readiness or completion.
    WouldBlock,
    /// Peer closed the connection.
    EndOfStream,
    /// Per-operation timeout expired.
    Timeout,
    /// Underlying I/O failure.
    Io(io::Error),
    /// Requested platform capability is unavailable (caller should degrade).
    PlatformUnsupported(&'static str),
}

impl Error {
    /// True when the error leaves framing intact and warrants a Reject(3)
    /// rather than a disconnect.
    #[must_use]
    pub fn is_recoverable_frame_error(&self) -> bool {
        matches!(
            self,
            Error::BadChecksum { .. } | Error::ValueParse { .. }
        )
    }

    /// True when the caller should retry the operation later.
    #[must_use]
    pub fn is_would_block(&self) -> bool {
        matches!(self, Error::WouldBlock)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Truncated => write!(f, "incomplete message, more bytes required"),
            Error::BadBeginString => write!(f, "BeginString (8=) missing or misplaced"),
            Error::BadBodyLength => write!(f, "BodyLength (9=) missing or inconsistent"),
            Error::BadChecksum { declared, computed } => write!(
                f,
                "checksum mismatch: declared {declared:03}, computed {computed:03}"
            ),
            Error::MalformedField(offset) => {
                write!(f, "malformed field at byte offset {offset}")
            }
            Error::ValueParse { tag, reason } => {
                write!(f, "value of tag {tag} failed to parse: {reason}")
            }
            Error::ProtocolViolation(what) => write!(f, "protocol violation: {what}"),
            Error::LowerSequence { expected, received } => write!(
                f,
                "inbound MsgSeqNum {received} lower than expected {expected} without PossDupFlag"
            ),
            Error::HeartbeatTimeout => write!(f, "counterparty heartbeat timeout"),
            Error::InvalidState(op) => write!(f, "operation invalid in current state: {op}"),
            Error::SeqNumOverflow => write!(f, "outbound sequence number overflow"),
            Error::StoreFull => write!(f, "message store full"),
            Error::StoreDuplicate(seq) => write!(f, "sequence {seq} already stored"),
            Error::StoreCorrupt(what) => write!(f, "message store corrupt: {what}"),
            Error::QueueFull => write!(f, "bounded queue full"),
            Error::Overload => write!(f, "deferred processor overloaded"),
            Error::WouldBlock => write!(f, "operation would block"),
            Error::EndOfStream => write!(f, "end of stream"),
            Error::Timeout => write!(f, "operation timed out"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
            Error::PlatformUnsupported(what) => {
                write!(f, "platform capability unavailable: {what}")
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        match err.kind() {
            io::ErrorKind::WouldBlock => Error::WouldBlock,
            io::ErrorKind::TimedOut => Error::Timeout,
            io::ErrorKind::UnexpectedEof => Error::EndOfStream,
            _ => Error::Io(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_would_block_classification() {
        let err: Error = io::Error::new(io::ErrorKind::WouldBlock, "wb").into();
        assert!(err.is_would_block());
        assert!(!Error::EndOfStream.is_would_block());
    }

    #[test]
    fn test_recoverable_frame_errors() {
        assert!(Error::BadChecksum {
            declared: 1,
            computed: 2
        }
        .is_recoverable_frame_error());
        assert!(Error::ValueParse {
            tag: 38,
            reason: "not a number"
        }
        .is_recoverable_frame_error());
        assert!(!Error::BadBeginString.is_recoverable_frame_error());
        assert!(!Error::Truncated.is_recoverable_frame_error());
    }

    #[test]
    fn test_display_contains_tag() {
        let err = Error::ValueParse {
            tag: 44,
            reason: "empty value",
        };
        let text = err.to_string();
        assert!(text.contains("44"), "display should cite the tag: {text}");
    }
}
