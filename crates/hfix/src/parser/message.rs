// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Parsed message: received bytes + structural index + cached header slots.
//!
//! Parsing validates the frame (`8=` at byte 0, `9=<n>` immediately after,
//! `10=<three digits><SOH>` at the end, body length arithmetic, checksum)
//! and records the entry index of each standard header field so the common
//! lookups never walk the index.

use crate::scan;
use crate::types::tag;
use crate::types::MsgType;

use super::field::{FieldView, ValueError};
use super::index::StructuralIndex;
use super::ParseError;

/// Cached entry positions for the standard header fields and the trailer.
#[derive(Debug, Default, Clone, Copy)]
struct HeaderSlots {
    begin_string: usize,
    body_length: usize,
    msg_type: usize,
    sender_comp_id: Option<usize>,
    target_comp_id: Option<usize>,
    msg_seq_num: Option<usize>,
    sending_time: Option<usize>,
    checksum: usize,
}

/// A fully framed, validated FIX message borrowed from a receive buffer.
#[derive(Debug)]
pub struct ParsedMessage<'a> {
    bytes: &'a [u8],
    index: StructuralIndex,
    slots: HeaderSlots,
    msg_type: MsgType,
}

impl<'a> ParsedMessage<'a> {
    /// Parse and fully validate one framed message.
    pub fn parse(bytes: &'a [u8]) -> Result<Self, ParseError> {
        Self::parse_inner(bytes, true)
    }

    /// Parse without comparing the checksum.
    ///
    /// Used to salvage header fields (MsgSeqNum, MsgType) from a message
    /// that failed checksum validation, so the session can populate a
    /// Reject without guessing.
    pub fn parse_lenient(bytes: &'a [u8]) -> Result<Self, ParseError> {
        Self::parse_inner(bytes, false)
    }

    fn parse_inner(bytes: &'a [u8], verify_checksum: bool) -> Result<Self, ParseError> {
        let mut index = StructuralIndex::with_capacity(16);
        index.build(bytes)?;

        let entries = index.entries();
        if entries.len() < 4 {
            return Err(ParseError::Truncated);
        }

        // First three fields are fixed by the standard: 8, 9, 35.
        if entries[0].tag != tag::BEGIN_STRING || entries[0].tag_start != 0 {
            return Err(ParseError::BadBeginString);
        }
        if entries[1].tag != tag::BODY_LENGTH {
            return Err(ParseError::BadBodyLength);
        }
        if entries[2].tag != tag::MSG_TYPE {
            return Err(ParseError::BadBodyLength);
        }

        // Trailer: checksum must be the final field, value exactly 3 digits.
        let checksum_at = entries.len() - 1;
        let checksum_entry = entries[checksum_at];
        if checksum_entry.tag != tag::CHECK_SUM {
            return Err(ParseError::Truncated);
        }
        let declared_bytes = &bytes[checksum_entry.value_range()];
        if declared_bytes.len() != 3 || !declared_bytes.iter().all(u8::is_ascii_digit) {
            return Err(ParseError::BadChecksum {
                declared: 0,
                computed: scan::checksum(&bytes[..checksum_entry.tag_start as usize]),
            });
        }

        // BodyLength counts bytes between the SOH after 9=<n> and the SOH
        // before 10= (inclusive of that SOH).
        let body_start = entries[1].value_end as usize + 1;
        let body_end = checksum_entry.tag_start as usize;
        let declared_len = FieldView::new(tag::BODY_LENGTH, &bytes[entries[1].value_range()])
            .as_u32()
            .map_err(|_| ParseError::BadBodyLength)? as usize;
        if body_end.checked_sub(body_start) != Some(declared_len) {
            return Err(ParseError::BadBodyLength);
        }

        if verify_checksum {
            let declared = (declared_bytes[0] - b'0') as u32 * 100
                + (declared_bytes[1] - b'0') as u32 * 10
                + (declared_bytes[2] - b'0') as u32;
            if declared > u32::from(u8::MAX) {
                return Err(ParseError::BadChecksum {
                    declared: (declared % 256) as u8,
                    computed: scan::checksum(&bytes[..body_end]),
                });
            }
            let computed = scan::checksum(&bytes[..body_end]);
            if declared as u8 != computed {
                return Err(ParseError::BadChecksum {
                    declared: declared as u8,
                    computed,
                });
            }
        }

        let mut slots = HeaderSlots {
            begin_string: 0,
            body_length: 1,
            msg_type: 2,
            checksum: checksum_at,
            ..HeaderSlots::default()
        };
        // Header fields sit early in well-formed messages; one pass fills
        // the cache without assuming a specific order.
        for (i, entry) in entries.iter().enumerate().skip(3) {
            match entry.tag {
                tag::SENDER_COMP_ID => slots.sender_comp_id.get_or_insert(i),
                tag::TARGET_COMP_ID => slots.target_comp_id.get_or_insert(i),
                tag::MSG_SEQ_NUM => slots.msg_seq_num.get_or_insert(i),
                tag::SENDING_TIME => slots.sending_time.get_or_insert(i),
                _ => continue,
            };
        }

        let msg_type = MsgType::from_bytes(&bytes[entries[2].value_range()]);

        Ok(Self {
            bytes,
            index,
            slots,
            msg_type,
        })
    }

    /// Raw message bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Decoded message type.
    #[must_use]
    pub fn msg_type(&self) -> MsgType {
        self.msg_type
    }

    /// MsgType value bytes (covers multi-byte application types).
    #[must_use]
    pub fn msg_type_bytes(&self) -> &'a [u8] {
        &self.bytes[self.index.entries()[self.slots.msg_type].value_range()]
    }

    /// BeginString value bytes.
    #[must_use]
    pub fn begin_string(&self) -> &'a [u8] {
        &self.bytes[self.index.entries()[self.slots.begin_string].value_range()]
    }

    /// SenderCompID value bytes, if present.
    #[must_use]
    pub fn sender_comp_id(&self) -> Option<&'a [u8]> {
        self.slots
            .sender_comp_id
            .map(|i| &self.bytes[self.index.entries()[i].value_range()])
    }

    /// TargetCompID value bytes, if present.
    #[must_use]
    pub fn target_comp_id(&self) -> Option<&'a [u8]> {
        self.slots
            .target_comp_id
            .map(|i| &self.bytes[self.index.entries()[i].value_range()])
    }

    /// MsgSeqNum, parsed.
    pub fn msg_seq_num(&self) -> Result<u32, ValueError> {
        let at = self.slots.msg_seq_num.ok_or(ValueError {
            tag: tag::MSG_SEQ_NUM,
            reason: "field absent",
        })?;
        self.view_at(at).as_seq_num()
    }

    /// SendingTime value bytes, if present.
    #[must_use]
    pub fn sending_time(&self) -> Option<&'a [u8]> {
        self.slots
            .sending_time
            .map(|i| &self.bytes[self.index.entries()[i].value_range()])
    }

    /// PossDupFlag=Y shortcut.
    #[must_use]
    pub fn poss_dup(&self) -> bool {
        self.field(tag::POSS_DUP_FLAG)
            .and_then(|f| f.as_bool().ok())
            .unwrap_or(false)
    }

    /// Look up the first occurrence of `tag`.
    ///
    /// Cached header slots short-circuit; other tags walk the index.
    #[must_use]
    pub fn field(&self, tag_number: u32) -> Option<FieldView<'a>> {
        let cached = match tag_number {
            tag::BEGIN_STRING => Some(self.slots.begin_string),
            tag::BODY_LENGTH => Some(self.slots.body_length),
            tag::MSG_TYPE => Some(self.slots.msg_type),
            tag::SENDER_COMP_ID => self.slots.sender_comp_id,
            tag::TARGET_COMP_ID => self.slots.target_comp_id,
            tag::MSG_SEQ_NUM => self.slots.msg_seq_num,
            tag::SENDING_TIME => self.slots.sending_time,
            tag::CHECK_SUM => Some(self.slots.checksum),
            _ => None,
        };
        if let Some(at) = cached {
            return Some(self.view_at(at));
        }
        let entry = self.index.find(tag_number)?;
        Some(FieldView::new(entry.tag, &self.bytes[entry.value_range()]))
    }

    /// Structural index (group walking, resend rebuilds).
    #[must_use]
    pub fn index(&self) -> &StructuralIndex {
        &self.index
    }

    /// Field view for an index entry position.
    #[must_use]
    pub fn view_at(&self, at: usize) -> FieldView<'a> {
        let entry = self.index.entries()[at];
        FieldView::new(entry.tag, &self.bytes[entry.value_range()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageBuilder;
    use crate::types::FixVersion;

    fn build_heartbeat() -> Vec<u8> {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"0");
        builder.field_bytes(49, b"CLIENT");
        builder.field_bytes(56, b"SERVER");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_bytes(112, b"T1");
        builder.finish();
        buf
    }

    #[test]
    fn test_parse_valid_message() {
        let buf = build_heartbeat();
        let msg = ParsedMessage::parse(&buf).expect("built message should parse");

        assert_eq!(msg.msg_type(), MsgType::Heartbeat);
        assert_eq!(msg.begin_string(), b"FIX.4.4");
        assert_eq!(msg.sender_comp_id(), Some(&b"CLIENT"[..]));
        assert_eq!(msg.target_comp_id(), Some(&b"SERVER"[..]));
        assert_eq!(msg.msg_seq_num().expect("seq"), 1);
        assert_eq!(
            msg.field(112).expect("TestReqID present").as_bytes(),
            b"T1"
        );
        assert!(msg.field(9999).is_none());
        assert!(!msg.poss_dup());
    }

    #[test]
    fn test_checksum_mismatch() {
        let mut buf = build_heartbeat();
        // Corrupt the declared checksum: "...10=XXX\x01"
        let at = buf.len() - 2;
        buf[at] = if buf[at] == b'9' { b'0' } else { b'9' };

        let err = ParsedMessage::parse(&buf).expect_err("corrupt checksum must fail");
        assert!(matches!(err, ParseError::BadChecksum { .. }));

        // Lenient parse still exposes the header.
        let msg = ParsedMessage::parse_lenient(&buf).expect("lenient parse");
        assert_eq!(msg.msg_seq_num().expect("seq"), 1);
    }

    #[test]
    fn test_body_length_mismatch() {
        let buf = build_heartbeat();
        // Shift the declared body length by one: "9=NN" early in the buffer.
        let mut corrupted = buf.clone();
        let nine = corrupted
            .windows(3)
            .position(|w| w == b"\x019=")
            .expect("body length field")
            + 2;
        corrupted[nine + 1] = corrupted[nine + 1].wrapping_add(1);

        let err = ParsedMessage::parse(&corrupted).expect_err("bad body length");
        assert!(
            matches!(err, ParseError::BadBodyLength | ParseError::BadChecksum { .. }),
            "length corruption surfaces as BadBodyLength (or checksum first): {err:?}"
        );
    }

    #[test]
    fn test_missing_msg_type_rejected() {
        // 8=, 9= then straight to body without 35=.
        let mut buf = Vec::new();
        buf.extend_from_slice(b"8=FIX.4.4\x01");
        let body = b"49=A\x01";
        buf.extend_from_slice(format!("9={}\x01", body.len()).as_bytes());
        buf.extend_from_slice(body);
        let sum = crate::scan::checksum(&buf);
        buf.extend_from_slice(format!("10={sum:03}\x01").as_bytes());

        let err = ParsedMessage::parse(&buf).expect_err("missing 35=");
        assert_eq!(err, ParseError::BadBodyLength);
    }

    #[test]
    fn test_truncated_buffer() {
        let buf = build_heartbeat();
        let cut = &buf[..buf.len() - 1];
        assert!(matches!(
            ParsedMessage::parse(cut),
            Err(ParseError::Truncated | ParseError::BadBodyLength)
        ));
    }
}
