// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Golden wire vectors: exact bytes for built messages, parse agreement.

use hfix::parser::{frame_length, ParsedMessage};
use hfix::protocol::MessageBuilder;
use hfix::scan;
use hfix::types::tag;
use hfix::{FixVersion, MsgType};

const SOH: u8 = 0x01;

fn soh_to_pipe(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b == SOH { '|' } else { b as char })
        .collect()
}

fn build_minimal_heartbeat() -> Vec<u8> {
    let mut buf = Vec::new();
    let mut b = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
    b.field_bytes(tag::MSG_TYPE, b"0");
    b.field_bytes(tag::SENDER_COMP_ID, b"CLIENT");
    b.field_bytes(tag::TARGET_COMP_ID, b"SERVER");
    b.field_u32(tag::MSG_SEQ_NUM, 1);
    b.field_bytes(tag::SENDING_TIME, b"20260101-00:00:00.000");
    b.field_bytes(tag::TEST_REQ_ID, b"T1");
    b.finish();
    buf
}

#[test]
fn minimal_heartbeat_exact_bytes() {
    let buf = build_minimal_heartbeat();
    assert_eq!(
        soh_to_pipe(&buf),
        "8=FIX.4.4|9=62|35=0|49=CLIENT|56=SERVER|34=1|\
         52=20260101-00:00:00.000|112=T1|10=157|"
    );
}

#[test]
fn minimal_heartbeat_checksum_is_prefix_sum() {
    let buf = build_minimal_heartbeat();
    // The declared checksum covers everything before "10=".
    let tail_start = buf.len() - 7;
    assert_eq!(&buf[tail_start..tail_start + 3], b"10=");
    let computed = scan::checksum(&buf[..tail_start]);
    let declared: String = buf[tail_start + 3..tail_start + 6]
        .iter()
        .map(|&b| b as char)
        .collect();
    assert_eq!(declared, format!("{computed:03}"));
}

#[test]
fn minimal_heartbeat_parses_back() {
    let buf = build_minimal_heartbeat();
    let msg = ParsedMessage::parse(&buf).expect("golden heartbeat parses");
    assert_eq!(msg.msg_type(), MsgType::Heartbeat);
    assert_eq!(msg.msg_seq_num().expect("34"), 1);
    assert_eq!(msg.field(112).expect("112").as_bytes(), b"T1");
    assert_eq!(msg.sender_comp_id(), Some(&b"CLIENT"[..]));
    assert_eq!(msg.target_comp_id(), Some(&b"SERVER"[..]));
}

#[test]
fn parser_round_trip_preserves_body_order() {
    // Invariant: parse(build(fields)).fields == fields, header and
    // trailer fixed, body order preserved.
    let body: Vec<(u32, &[u8])> = vec![
        (11, b"ORD-42"),
        (55, b"MSFT"),
        (54, b"2"),
        (38, b"250"),
        (40, b"2"),
        (44, b"410.05"),
        (59, b"0"),
    ];

    let mut buf = Vec::new();
    let mut b = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
    b.field_bytes(tag::MSG_TYPE, b"D");
    b.field_bytes(tag::SENDER_COMP_ID, b"BUY");
    b.field_bytes(tag::TARGET_COMP_ID, b"SELL");
    b.field_u32(tag::MSG_SEQ_NUM, 9);
    b.field_bytes(tag::SENDING_TIME, b"20260101-12:00:00.000");
    for (t, v) in &body {
        b.field_bytes(*t, v);
    }
    b.finish();

    let msg = ParsedMessage::parse(&buf).expect("order parses");
    let entries = msg.index().entries();
    // Skip header (8, 9, 35, 49, 56, 34, 52) and trailer (10).
    let parsed_body: Vec<(u32, Vec<u8>)> = entries[7..entries.len() - 1]
        .iter()
        .map(|e| (e.tag, buf[e.value_range()].to_vec()))
        .collect();
    let expected: Vec<(u32, Vec<u8>)> =
        body.iter().map(|(t, v)| (*t, v.to_vec())).collect();
    assert_eq!(parsed_body, expected, "body fields and order must survive");
}

#[test]
fn streaming_framing_agrees_with_builder() {
    let mut stream = Vec::new();
    let mut lengths = Vec::new();
    for seq in 1..=5u32 {
        let start = stream.len();
        let mut b = MessageBuilder::begin(&mut stream, FixVersion::Fix44);
        b.field_bytes(tag::MSG_TYPE, b"0");
        b.field_bytes(tag::SENDER_COMP_ID, b"A");
        b.field_bytes(tag::TARGET_COMP_ID, b"B");
        b.field_u32(tag::MSG_SEQ_NUM, seq);
        b.field_bytes(tag::SENDING_TIME, b"20260101-00:00:00.000");
        b.finish();
        lengths.push(stream.len() - start);
    }

    let mut at = 0;
    for expected_len in lengths {
        let len = frame_length(&stream[at..])
            .expect("stream frames")
            .expect("complete frame");
        assert_eq!(len, expected_len);
        ParsedMessage::parse(&stream[at..at + len]).expect("each frame parses");
        at += len;
    }
    assert_eq!(at, stream.len(), "no residual bytes");
}

#[test]
fn corrupted_checksum_detected() {
    let mut buf = build_minimal_heartbeat();
    let at = buf.len() - 3;
    buf[at] = if buf[at] == b'9' { b'0' } else { b'9' };
    let err = ParsedMessage::parse(&buf).expect_err("corruption must fail");
    assert!(matches!(
        err,
        hfix::parser::ParseError::BadChecksum { .. }
    ));
}

#[test]
fn every_version_round_trips_begin_string() {
    for version in [
        FixVersion::Fix42,
        FixVersion::Fix43,
        FixVersion::Fix44,
        FixVersion::Fix50,
        FixVersion::Fix50Sp1,
        FixVersion::Fix50Sp2,
        FixVersion::Fixt11,
    ] {
        let mut buf = Vec::new();
        let mut b = MessageBuilder::begin(&mut buf, version);
        b.field_bytes(tag::MSG_TYPE, b"0");
        b.field_bytes(tag::SENDER_COMP_ID, b"A");
        b.field_bytes(tag::TARGET_COMP_ID, b"B");
        b.field_u32(tag::MSG_SEQ_NUM, 1);
        b.field_bytes(tag::SENDING_TIME, b"20260101-00:00:00.000");
        b.finish();

        let msg = ParsedMessage::parse(&buf).expect("parses for every version");
        assert_eq!(msg.begin_string(), version.begin_string());
        assert_eq!(
            FixVersion::from_begin_string(msg.begin_string()),
            Some(version)
        );
    }
}
