// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SBE NewOrderSingle codec (template 1).
//!
//! Root block layout (54 bytes, little-endian):
//!
//! | offset | size | field         | type            |
//! |-------:|-----:|---------------|-----------------|
//! |      0 |   20 | cl_ord_id     | char[20], NUL-padded |
//! |     20 |    8 | symbol        | char[8], NUL-padded  |
//! |     28 |    1 | side          | u8 (1=buy, 2=sell)   |
//! |     29 |    1 | ord_type      | u8 (FIX 40 code)     |
//! |     30 |    8 | order_qty     | i64 mantissa (1e-7)  |
//! |     38 |    8 | price         | i64 mantissa (1e-7)  |
//! |     46 |    8 | transact_time | u64 UTC nanos        |

use crate::types::Decimal;

use super::{
    ensure_len, read_i64, read_u64, read_padded, write_i64, write_padded, write_u64,
    MessageHeader, SbeError, HEADER_LEN, SCHEMA_ID, SCHEMA_VERSION,
};

const CL_ORD_ID_LEN: usize = 20;
const SYMBOL_LEN: usize = 8;

/// NewOrderSingle encode-side fields.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderSingle<'a> {
    /// Client order identifier (up to 20 bytes).
    pub cl_ord_id: &'a [u8],
    /// Instrument symbol (up to 8 bytes).
    pub symbol: &'a [u8],
    /// Side code: 1 = buy, 2 = sell.
    pub side: u8,
    /// Order type code (FIX tag 40 values).
    pub ord_type: u8,
    /// Quantity, fixed-point mantissa.
    pub order_qty: Decimal,
    /// Limit price, fixed-point mantissa.
    pub price: Decimal,
    /// Transaction time, UTC nanoseconds.
    pub transact_time: u64,
}

impl NewOrderSingle<'_> {
    /// Template identifier.
    pub const TEMPLATE_ID: u16 = 1;
    /// Root block size.
    pub const BLOCK_LENGTH: u16 = 54;
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
        write_padded(body, 0, CL_ORD_ID_LEN, self.cl_ord_id);
        write_padded(body, 20, SYMBOL_LEN, self.symbol);
        body[28] = self.side;
        body[29] = self.ord_type;
        write_i64(body, 30, self.order_qty.mantissa());
        write_i64(body, 38, self.price.mantissa());
        write_u64(body, 46, self.transact_time);
        Ok(Self::ENCODED_LEN)
    }

    /// Decode a view over `buf`.
    pub fn decode(buf: &[u8]) -> Result<NewOrderSingleView<'_>, SbeError> {
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
        Ok(NewOrderSingleView {
            body: &buf[HEADER_LEN..HEADER_LEN + header.block_length as usize],
        })
    }
}

/// Decoded NewOrderSingle; borrows the buffer, reads fields on demand.
#[derive(Debug, Clone, Copy)]
pub struct NewOrderSingleView<'a> {
    body: &'a [u8],
}

impl<'a> NewOrderSingleView<'a> {
    /// Client order identifier, NUL padding trimmed.
    #[must_use]
    pub fn cl_ord_id(&self) -> &'a [u8] {
        read_padded(self.body, 0, CL_ORD_ID_LEN)
    }

    /// Instrument symbol, NUL padding trimmed.
    #[must_use]
    pub fn symbol(&self) -> &'a [u8] {
        read_padded(self.body, 20, SYMBOL_LEN)
    }

    /// Side code.
    #[must_use]
    pub fn side(&self) -> u8 {
        self.body[28]
    }

    /// Order type code.
    #[must_use]
    pub fn ord_type(&self) -> u8 {
        self.body[29]
    }

    /// Quantity.
    #[must_use]
    pub fn order_qty(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 30))
    }

    /// Limit price.
    #[must_use]
    pub fn price(&self) -> Decimal {
        Decimal::from_mantissa(read_i64(self.body, 38))
    }

    /// Transaction time, UTC nanoseconds.
    #[must_use]
    pub fn transact_time(&self) -> u64 {
        read_u64(self.body, 46)
    }
}
