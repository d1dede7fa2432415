// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Streaming frame detection.
//!
//! The receive loop accumulates bytes and asks [`frame_length`] whether a
//! complete message is present yet. Only the `8=...<SOH>9=<n><SOH>` prefix
//! is inspected; full validation happens in
//! [`super::ParsedMessage::parse`].

use crate::scan;

use super::ParseError;

/// Longest accepted BeginString field (`8=FIX.5.0SP2`).
const MAX_BEGIN_FIELD: usize = 16;

/// Longest accepted BodyLength field (`9=` + 7 digits).
const MAX_BODY_LEN_FIELD: usize = 9;

/// Checksum field is always exactly `10=XXX<SOH>`.
const CHECKSUM_FIELD_LEN: usize = 7;

/// Determine the length of the first complete message in `buf`.
///
/// Returns `Ok(Some(len))` when `buf[..len]` is one whole message,
/// `Ok(None)` when more bytes are needed, and an error when the prefix can
/// never frame (desynchronized stream; the session must disconnect).
pub fn frame_length(buf: &[u8]) -> Result<Option<usize>, ParseError> {
    if buf.len() < 2 {
        return Ok(None);
    }
    if &buf[..2] != b"8=" {
        return Err(ParseError::BadBeginString);
    }

    let Some(first_soh) = scan::find_soh(&buf[..buf.len().min(MAX_BEGIN_FIELD + 1)]) else {
        if buf.len() > MAX_BEGIN_FIELD {
            return Err(ParseError::BadBeginString);
        }
        return Ok(None);
    };

    let rest = &buf[first_soh + 1..];
    if rest.len() < 2 {
        return Ok(None);
    }
    if &rest[..2] != b"9=" {
        return Err(ParseError::BadBodyLength);
    }

    let Some(second_soh) = scan::find_soh(&rest[..rest.len().min(MAX_BODY_LEN_FIELD + 1)]) else {
        if rest.len() > MAX_BODY_LEN_FIELD {
            return Err(ParseError::BadBodyLength);
        }
        return Ok(None);
    };

    let digits = &rest[2..second_soh];
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ParseError::BadBodyLength);
    }
    let mut body_len = 0usize;
    for &b in digits {
        body_len = body_len * 10 + usize::from(b - b'0');
    }

    let body_start = first_soh + 1 + second_soh + 1;
    let total = body_start + body_len + CHECKSUM_FIELD_LEN;
    if buf.len() < total {
        return Ok(None);
    }
    Ok(Some(total))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageBuilder;
    use crate::types::FixVersion;

    fn heartbeat() -> Vec<u8> {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"0");
        builder.field_bytes(49, b"A");
        builder.field_bytes(56, b"B");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.finish();
        buf
    }

    #[test]
    fn test_complete_frame_detected() {
        let msg = heartbeat();
        let len = frame_length(&msg)
            .expect("valid prefix")
            .expect("complete frame");
        assert_eq!(len, msg.len());
    }

    #[test]
    fn test_incomplete_returns_none() {
        let msg = heartbeat();
        for cut in [0, 1, 5, msg.len() / 2, msg.len() - 1] {
            assert_eq!(
                frame_length(&msg[..cut]).expect("prefix still plausible"),
                None,
                "cut at {cut} must ask for more bytes"
            );
        }
    }

    #[test]
    fn test_two_frames_back_to_back() {
        let mut stream = heartbeat();
        let first_len = stream.len();
        stream.extend_from_slice(&heartbeat());
        let len = frame_length(&stream)
            .expect("valid prefix")
            .expect("complete frame");
        assert_eq!(len, first_len, "framing must stop at the first message");
    }

    #[test]
    fn test_bad_begin_string_rejected() {
        assert_eq!(
            frame_length(b"9=12\x01"),
            Err(ParseError::BadBeginString)
        );
        assert_eq!(
            frame_length(b"8xFIX.4.4\x01"),
            Err(ParseError::BadBeginString)
        );
        // Overlong BeginString field without SOH cannot recover.
        assert_eq!(
            frame_length(b"8=AAAAAAAAAAAAAAAAAAAAAAAA"),
            Err(ParseError::BadBeginString)
        );
    }

    #[test]
    fn test_bad_body_length_rejected() {
        assert_eq!(
            frame_length(b"8=FIX.4.4\x0135=0\x01"),
            Err(ParseError::BadBodyLength)
        );
        assert_eq!(
            frame_length(b"8=FIX.4.4\x019=1x2\x01"),
            Err(ParseError::BadBodyLength)
        );
        assert_eq!(
            frame_length(b"8=FIX.4.4\x019=\x01"),
            Err(ParseError::BadBodyLength)
        );
    }
}
