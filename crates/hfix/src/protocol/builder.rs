// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Runtime FIX message builder.
//!
//! Appends `tag=value<SOH>` into a caller-supplied buffer. `begin` writes
//! the BeginString and a single-digit BodyLength placeholder; `finish`
//! patches the real length in (growing the hole as needed), computes the
//! checksum over everything before `10=`, and appends the trailer.

use crate::scan::{self, SOH};
use crate::types::{Decimal, FixVersion};

use super::const_tags::{format_checksum, push_tag};

/// Incremental builder over a caller-supplied buffer.
///
/// The buffer is appended to, never truncated: callers may frame several
/// messages back to back in one buffer.
pub struct MessageBuilder<'a> {
    buf: &'a mut Vec<u8>,
    /// Start of this message within the buffer.
    message_start: usize,
    /// Position of the BodyLength placeholder digit.
    body_len_at: usize,
    /// First byte counted by BodyLength.
    body_start: usize,
}

impl<'a> MessageBuilder<'a> {
    /// Start a message: writes `8=<BeginString><SOH>9=0<SOH>`.
    pub fn begin(buf: &'a mut Vec<u8>, version: FixVersion) -> Self {
        let message_start = buf.len();
        buf.extend_from_slice(b"8=");
        buf.extend_from_slice(version.begin_string());
        buf.push(SOH);
        buf.extend_from_slice(b"9=");
        let body_len_at = buf.len();
        buf.push(b'0'); // Placeholder, patched in finish()
        buf.push(SOH);
        let body_start = buf.len();
        Self {
            buf,
            message_start,
            body_len_at,
            body_start,
        }
    }

    /// Append `tag=value<SOH>` with raw value bytes.
    pub fn field_bytes(&mut self, tag: u32, value: &[u8]) {
        push_uint(self.buf, u64::from(tag));
        self.buf.push(b'=');
        self.buf.extend_from_slice(value);
        self.buf.push(SOH);
    }

    /// Append a field whose `tag=` prefix is a compile-time literal.
    pub fn field_lit<const TAG: u32>(&mut self, value: &[u8]) {
        push_tag::<TAG>(self.buf);
        self.buf.extend_from_slice(value);
        self.buf.push(SOH);
    }

    /// Append an unsigned integer field.
    pub fn field_u32(&mut self, tag: u32, value: u32) {
        push_uint(self.buf, u64::from(tag));
        self.buf.push(b'=');
        push_uint(self.buf, u64::from(value));
        self.buf.push(SOH);
    }

    /// Append an unsigned 64-bit integer field.
    pub fn field_u64(&mut self, tag: u32, value: u64) {
        push_uint(self.buf, u64::from(tag));
        self.buf.push(b'=');
        push_uint(self.buf, value);
        self.buf.push(SOH);
    }

    /// Append a single-character field.
    pub fn field_char(&mut self, tag: u32, value: u8) {
        push_uint(self.buf, u64::from(tag));
        self.buf.push(b'=');
        self.buf.push(value);
        self.buf.push(SOH);
    }

    /// Append a `Y`/`N` flag field.
    pub fn field_bool(&mut self, tag: u32, value: bool) {
        self.field_char(tag, if value { b'Y' } else { b'N' });
    }

    /// Append a fixed-point decimal field (shortest lossless form).
    pub fn field_decimal(&mut self, tag: u32, value: Decimal) {
        push_uint(self.buf, u64::from(tag));
        self.buf.push(b'=');
        value.write_to(self.buf);
        self.buf.push(SOH);
    }

    /// Patch BodyLength, append the checksum trailer, return message length.
    pub fn finish(self) -> usize {
        let body_len = self.buf.len() - self.body_start;

        // Grow the single-digit placeholder to the real digit count.
        let mut digits = [0u8; 20];
        let digit_count = format_uint(&mut digits, body_len as u64);
        self.buf.splice(
            self.body_len_at..self.body_len_at + 1,
            digits[..digit_count].iter().copied(),
        );

        let checksum = scan::checksum(&self.buf[self.message_start..]);
        self.buf.extend_from_slice(b"10=");
        self.buf.extend_from_slice(&format_checksum(checksum));
        self.buf.push(SOH);

        self.buf.len() - self.message_start
    }
}

/// Render `value` into `out` (most significant first); returns digit count.
fn format_uint(out: &mut [u8; 20], value: u64) -> usize {
    let mut tmp = [0u8; 20];
    let mut at = tmp.len();
    let mut v = value;
    loop {
        at -= 1;
        tmp[at] = b'0' + (v % 10) as u8;
        v /= 10;
        if v == 0 {
            break;
        }
    }
    let count = tmp.len() - at;
    out[..count].copy_from_slice(&tmp[at..]);
    count
}

/// Append the shortest decimal form of `value`.
fn push_uint(buf: &mut Vec<u8>, value: u64) {
    let mut digits = [0u8; 20];
    let count = format_uint(&mut digits, value);
    buf.extend_from_slice(&digits[..count]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedMessage;
    use crate::types::tag;

    fn render(buf: &[u8]) -> String {
        buf.iter()
            .map(|&b| if b == SOH { '|' } else { b as char })
            .collect()
    }

    #[test]
    fn test_minimal_heartbeat_layout() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"0");
        builder.field_bytes(49, b"CLIENT");
        builder.field_bytes(56, b"SERVER");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_bytes(112, b"T1");
        let len = builder.finish();
        assert_eq!(len, buf.len());

        let text = render(&buf);
        assert!(text.starts_with("8=FIX.4.4|9=62|35=0|49=CLIENT|56=SERVER|34=1|"));
        assert!(text.contains("|52=20260101-00:00:00.000|112=T1|10="));
        assert!(text.ends_with('|'));

        // The declared checksum must be the mod-256 sum of the prefix.
        let msg = ParsedMessage::parse(&buf).expect("built message must parse");
        assert_eq!(msg.msg_seq_num().expect("seq"), 1);
        assert_eq!(msg.field(112).expect("112").as_bytes(), b"T1");
    }

    #[test]
    fn test_body_length_counts_exact_bytes() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"0");
        builder.field_bytes(49, b"A");
        builder.field_bytes(56, b"B");
        builder.field_u32(34, 7);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.finish();

        let msg = ParsedMessage::parse(&buf).expect("must parse");
        let declared = msg.field(tag::BODY_LENGTH).expect("9=").as_u32().expect("n");
        // 35=0| 49=A| 56=B| 34=7| 52=...|
        assert_eq!(declared, 5 + 5 + 5 + 5 + 25);
    }

    #[test]
    fn test_multi_digit_body_length_patch() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"D");
        builder.field_bytes(49, b"SENDERWITHLONGNAME");
        builder.field_bytes(56, b"TARGETWITHLONGNAME");
        builder.field_u32(34, 123_456);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_bytes(58, &[b'x'; 200]);
        builder.finish();

        let msg = ParsedMessage::parse(&buf).expect("3-digit body length must parse");
        assert!(msg.field(tag::BODY_LENGTH).expect("9=").as_u32().expect("n") > 99);
    }

    #[test]
    fn test_back_to_back_messages_in_one_buffer() {
        let mut buf = Vec::new();
        let mut b1 = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        b1.field_bytes(35, b"0");
        b1.field_bytes(49, b"A");
        b1.field_bytes(56, b"B");
        b1.field_u32(34, 1);
        b1.field_bytes(52, b"20260101-00:00:00.000");
        let first_len = b1.finish();

        let mut b2 = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        b2.field_bytes(35, b"0");
        b2.field_bytes(49, b"A");
        b2.field_bytes(56, b"B");
        b2.field_u32(34, 2);
        b2.field_bytes(52, b"20260101-00:00:00.000");
        b2.finish();

        let first = ParsedMessage::parse(&buf[..first_len]).expect("first frame");
        let second = ParsedMessage::parse(&buf[first_len..]).expect("second frame");
        assert_eq!(first.msg_seq_num().expect("seq"), 1);
        assert_eq!(second.msg_seq_num().expect("seq"), 2);
    }

    #[test]
    fn test_typed_field_helpers() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"D");
        builder.field_bytes(49, b"A");
        builder.field_bytes(56, b"B");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_char(54, b'1');
        builder.field_bool(43, true);
        builder.field_decimal(44, Decimal::parse(b"150.25").expect("price"));
        builder.field_u64(60, 1_700_000_000_000);
        builder.finish();

        let msg = ParsedMessage::parse(&buf).expect("must parse");
        assert_eq!(msg.field(54).expect("54").as_char().expect("char"), b'1');
        assert!(msg.field(43).expect("43").as_bool().expect("bool"));
        assert_eq!(msg.field(44).expect("44").as_bytes(), b"150.25");
        assert_eq!(
            msg.field(60).expect("60").as_u64().expect("u64"),
            1_700_000_000_000
        );
    }
}
