// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SBE ExecutionReport codec (template 2).
//!
//! Root block layout (83 bytes, little-endian):
//!
//! | offset | size | field      | type                 |
//! |-------:|-----:|------------|----------------------|
//! |      0 |   20 | order_id   | char[20], NUL-padded |
//! |     20 |   20 | exec_id    | char[20], NUL-padded |
//! |     40 |    1 | exec_type  | u8 (FIX 150 code)    |
//! |     41 |    1 | ord_status | u8 (FIX 39 code)     |
//! |     42 |    8 | symbol     | char[8], NUL-padded  |
//! |     50 |    1 | side       | u8                   |
//! |     51 |    8 | last_qty   | i64 mantissa (1e-7)  |
//! |     59 |    8 | last_px    | i64 mantissa (1e-7)  |
//! |     67 |    8 | leaves_qty | i64 mantissa (1e-7)  |
//! |     75 |    8 | cum_qty    | i64 mantissa (1e-7)  |

use crate::types::Decimal;

use super::{
    ensure_len, read_i64, read_padded, write_i64, write_padded, MessageHeader, SbeError,
    HEADER_LEN, SCHEMA_ID, SCHEMA_VERSION,
};

const ID_LEN: usize = 20;
const SYMBOL_LEN: usize = 8;

/// ExecutionReport encode-side fields.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReport<'a> {
    /// Exchange order identifier.
    pub order_id: &'a [u8],
    /// Execution identifier.
    pub exec_id: &'a [u8],
    /// ExecType code.
    pub exec_type: u8,
    /// OrdStatus code.
    pub ord_status: u8,
    /// Instrument symbol.
    pub symbol: &'a [u8],
    /// Side code.
    pub side: u8,
    /// Fill quantity.
    pub last_qty: Decimal,
    /// Fill price.
    pub last_px: Decimal,
    /// Open quantity.
    pub leaves_qty: Decimal,
    /// Cumulative filled quantity.
    pub cum_qty: Decimal,
}

impl ExecutionReport<'_> {
    /// Template identifier.
    pub const TEMPLATE_ID: u16 = 2;
    /// Root block size.
    pub const BLOCK_LENGTH: u16 = 83;
    /// Total encoded size (header + root block).
    pub const ENCODED_LEN: usize = HEADER_LEN + Self::BLOCK_LENGTH as usize;

    /// Encode into `buf`; returns bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, SbeError> {
        ensure_len(buf, Self::ENCODED_LEN)?;
        MessageHeader {
            block_length: Self::BLOCK_LENGTH,
            template_id: Self::TEMPLATE_ID,
            schema_id: SCHEMA_ID,
            version: SCHEMA_VERSION,
        }
        .encode(buf)?;

        let body = &mut buf[HEADER_LEN..];
        write_padded(body, 0, ID_LEN, self.order_id);
        write_padded(body, 20, ID_LEN, self.exec_id);
        body[40] = self.exec_type;
        body[41] = self.ord_status;
        write_padded(body, 42, SYMBOL_LEN, self.symbol);
        body[50] = self.side;
        write_i64(body, 51, self.last_qty.mantissa());
        write_i64(body, 59, self.last_px.mantissa());
        write_i64(body, 67, self.leaves_qty.mantissa());
        write_i64(body, 75, self.cum_qty.mantissa());
        Ok(Self::ENCODED_LEN)
    }

    /// Decode a view over `buf`.
    pub fn decode(buf: &[u8]) -> Result<ExecutionReportView<'_>, SbeError> {
        let header = MessageHeader::decode(buf)?;
        if header.schema_id != SCHEMA_ID {
            return Err(SbeError::WrongSchema(header.schema_id));
        }
        if header.template_id != Self::TEMPLATE_ID {
            return Err(SbeError::WrongTemplate {
                expected: Self::TEMPLATE_ID,
                got: header.template_id,
            });
        }
        ensure_len(buf, HEADER_LEN + header.block_length as usize)?;
        Ok(ExecutionReportView {
            body: &buf[HEADER_LEN..HEADER_LEN + header.block_length as usize],
        })
    }
}

/// Decoded ExecutionReport; borrows the buffer, reads fields on demand.
#[derive(Debug, Clone, Copy)]
pub struct ExecutionReportView<'a> {
    body: &'a [u8],
}

impl<'a> ExecutionReportView<'a> {
    /// Exchange order identifier, padding trimmed.
    #[must_use]
    pub fn order_id(&self) -> &'a [u8] {
        read_padded(self.body, 0, ID_LEN)
    }

    /// Execution identifier, padding trimmed.
    #[must_use]
    pub fn exec_id(&self) -> &'a [u8] {
        read_padded(self.body, 20, ID_LEN)
    }

    /// ExecType code.
    #[must_use]
    pub fn exec_type(&self) -> u8 {
        self.body[40]
    }

    /// OrdStatus code.
    #[must_use]
    pub fn ord_status(&self) -> u8 {
        self.body[41]
    }

    /// Instrument symbol, padding trimmed.
    #[must_use]
    pub fn symbol(&self) -> &'a [u8] {
        read_padded(self.body, 42, SYMBOL_LEN)
    }

    /// Side code.
    #[must_use]
    pub fn side(&self) -> u8 {
        self.body[50]
    }

    /// Fill quantity.
    #[must_use]
    pub fn last_qty(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 51))
    }

    /// Fill price.
    #[must_use]
    pub fn last_px(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 59))
    }

    /// Open quantity.
    #[must_use]
    pub fn leaves_qty(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 67))
    }

    /// Cumulative filled quantity.
    #[must_use]
    pub fn cum_qty(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 75))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip() {
        let report = ExecutionReport {
            order_id: b"ORDER-7",
            exec_id: b"EXEC-9",
            exec_type: b'F',
            ord_status: b'2',
            symbol: b"MSFT",
            side: 2,
            last_qty: Decimal::parse(b"50").expect("qty"),
            last_px: Decimal::parse(b"410.10").expect("px"),
            leaves_qty: Decimal::ZERO,
            cum_qty: Decimal::parse(b"50").expect("qty"),
        };

        let mut buf = [0u8; ExecutionReport::ENCODED_LEN];
        let written = report.encode(&mut buf).expect("encode");
        assert_eq!(written, 8 + 83);

        let view = ExecutionReport::decode(&buf).expect("decode");
        assert_eq!(view.order_id(), b"ORDER-7");
        assert_eq!(view.exec_id(), b"EXEC-9");
        assert_eq!(view.exec_type(), b'F');
        assert_eq!(view.ord_status(), b'2');
        assert_eq!(view.symbol(), b"MSFT");
        assert_eq!(view.side(), 2);
        assert_eq!(view.last_px(), Decimal::parse(b"410.1").expect("px"));
        assert_eq!(view.leaves_qty(), Decimal::ZERO);
    }

    #[test]
    fn test_wrong_template_for_other_codec() {
        use super::super::new_order_single::NewOrderSingle;

        let report = ExecutionReport {
            order_id: b"O",
            exec_id: b"E",
            exec_type: b'0',
            ord_status: b'0',
            symbol: b"X",
            side: 1,
            last_qty: Decimal::ZERO,
            last_px: Decimal::ZERO,
            leaves_qty: Decimal::ZERO,
            cum_qty: Decimal::ZERO,
        };
        let mut buf = [0u8; ExecutionReport::ENCODED_LEN];
        report.encode(&mut buf).expect("encode");

        assert!(matches!(
            NewOrderSingle::decode(&buf),
            Err(SbeError::WrongTemplate {
                expected: 1,
                got: 2
            })
        ));
    }
}
