// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SBE codec round trips and header discipline.

use hfix::sbe::{
    ExecutionReport, MdEntry, MdIncremental, MessageHeader, NewOrderSingle, SCHEMA_ID,
};
use hfix::Decimal;

#[test]
fn new_order_single_round_trip() {
    // Encode NewOrderSingle with ClOrdID="ORD1", Symbol="AAPL", Side=Buy,
    // OrderQty=100.0, Price=150.25; decode and compare byte-exactly.
    let order = NewOrderSingle {
        cl_ord_id: b"ORD1",
        symbol: b"AAPL",
        side: 1,
        ord_type: b'2',
        order_qty: Decimal::parse(b"100.0").expect("qty"),
        price: Decimal::parse(b"150.25").expect("price"),
        transact_time: 1_767_225_600_000_000_000,
    };

    let mut buf = vec![0u8; NewOrderSingle::ENCODED_LEN];
    let written = order.encode(&mut buf).expect("encode");

    // Buffer length equals compile-time block length plus the 8-byte
    // header.
    assert_eq!(written, NewOrderSingle::BLOCK_LENGTH as usize + 8);
    assert_eq!(written, buf.len());

    let view = NewOrderSingle::decode(&buf).expect("decode");
    assert_eq!(view.cl_ord_id(), b"ORD1");
    assert_eq!(view.symbol(), b"AAPL");
    assert_eq!(view.side(), 1);
    assert_eq!(view.order_qty(), Decimal::parse(b"100").expect("qty"));
    assert_eq!(view.price(), Decimal::parse(b"150.25").expect("price"));
    assert_eq!(view.transact_time(), 1_767_225_600_000_000_000);
}

#[test]
fn header_is_little_endian_and_self_describing() {
    let order = NewOrderSingle {
        cl_ord_id: b"X",
        symbol: b"Y",
        side: 2,
        ord_type: b'1',
        order_qty: Decimal::ZERO,
        price: Decimal::ZERO,
        transact_time: 0,
    };
    let mut buf = vec![0u8; NewOrderSingle::ENCODED_LEN];
    order.encode(&mut buf).expect("encode");

    let header = MessageHeader::decode(&buf).expect("header");
    assert_eq!(header.block_length, NewOrderSingle::BLOCK_LENGTH);
    assert_eq!(header.template_id, NewOrderSingle::TEMPLATE_ID);
    assert_eq!(header.schema_id, SCHEMA_ID);

    // Raw little-endian check of the first header field.
    assert_eq!(
        u16::from_le_bytes([buf[0], buf[1]]),
        NewOrderSingle::BLOCK_LENGTH
    );
}

#[test]
fn execution_report_round_trip() {
    let report = ExecutionReport {
        order_id: b"ORDER-001",
        exec_id: b"EXEC-001",
        exec_type: b'F',
        ord_status: b'1',
        symbol: b"AAPL",
        side: 1,
        last_qty: Decimal::parse(b"40").expect("qty"),
        last_px: Decimal::parse(b"150.30").expect("px"),
        leaves_qty: Decimal::parse(b"60").expect("qty"),
        cum_qty: Decimal::parse(b"40").expect("qty"),
    };

    let mut buf = vec![0u8; ExecutionReport::ENCODED_LEN];
    let written = report.encode(&mut buf).expect("encode");
    assert_eq!(written, ExecutionReport::BLOCK_LENGTH as usize + 8);

    let view = ExecutionReport::decode(&buf).expect("decode");
    assert_eq!(view.order_id(), b"ORDER-001");
    assert_eq!(view.exec_id(), b"EXEC-001");
    assert_eq!(view.exec_type(), b'F');
    assert_eq!(view.ord_status(), b'1');
    assert_eq!(view.last_qty(), Decimal::parse(b"40").expect("qty"));
    assert_eq!(view.last_px(), Decimal::parse(b"150.3").expect("px"));
    assert_eq!(view.leaves_qty(), Decimal::parse(b"60").expect("qty"));
    assert_eq!(view.cum_qty(), Decimal::parse(b"40").expect("qty"));
}

#[test]
fn codecs_reject_each_others_buffers() {
    let order = NewOrderSingle {
        cl_ord_id: b"A",
        symbol: b"B",
        side: 1,
        ord_type: b'1',
        order_qty: Decimal::ZERO,
        price: Decimal::ZERO,
        transact_time: 0,
    };
    let mut buf = vec![0u8; NewOrderSingle::ENCODED_LEN];
    order.encode(&mut buf).expect("encode");

    assert!(ExecutionReport::decode(&buf).is_err());
    assert!(MdIncremental::decode(&buf).is_err());
}

#[test]
fn md_incremental_group_round_trip() {
    let entries = [
        MdEntry {
            update_action: 0,
            entry_type: 0,
            px: Decimal::parse(b"150.25").expect("px"),
            size: Decimal::parse(b"500").expect("size"),
            symbol: b"AAPL",
        },
        MdEntry {
            update_action: 1,
            entry_type: 1,
            px: Decimal::parse(b"150.26").expect("px"),
            size: Decimal::parse(b"300").expect("size"),
            symbol: b"AAPL",
        },
        MdEntry {
            update_action: 2,
            entry_type: 2,
            px: Decimal::parse(b"150.24").expect("px"),
            size: Decimal::parse(b"100").expect("size"),
            symbol: b"AAPL",
        },
    ];
    let msg = MdIncremental {
        transact_time: 777,
        entries: &entries,
    };

    let mut buf = vec![0u8; MdIncremental::encoded_len(entries.len())];
    let written = msg.encode(&mut buf).expect("encode");
    // header + root block + group prefix + n * entry block
    assert_eq!(written, 8 + 8 + 4 + 3 * MdIncremental::ENTRY_LENGTH as usize);

    let view = MdIncremental::decode(&buf).expect("decode");
    assert_eq!(view.transact_time(), 777);
    assert_eq!(view.entry_count(), 3);
    let decoded: Vec<MdEntry<'_>> = view.entries().collect();
    assert_eq!(decoded, entries);
}

#[test]
fn truncated_buffers_are_rejected_not_panicked() {
    let order = NewOrderSingle {
        cl_ord_id: b"A",
        symbol: b"B",
        side: 1,
        ord_type: b'1',
        order_qty: Decimal::ZERO,
        price: Decimal::ZERO,
        transact_time: 0,
    };
    let mut buf = vec![0u8; NewOrderSingle::ENCODED_LEN];
    order.encode(&mut buf).expect("encode");

    for cut in [0, 4, 8, 20, buf.len() - 1] {
        assert!(
            NewOrderSingle::decode(&buf[..cut]).is_err(),
            "cut at {cut} must error"
        );
    }
}
