// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! SBE MarketDataIncrementalRefresh codec (template 3).
//!
//! Root block (8 bytes): `transact_time: u64`. Followed by one repeating
//! group with the standard `{block_length: u16, num_in_group: u16}` prefix
//! and 26-byte entries:
//!
//! | offset | size | field         | type                |
//! |-------:|-----:|---------------|---------------------|
//! |      0 |    1 | update_action | u8 (FIX 279 code)   |
//! |      1 |    1 | entry_type    | u8 (FIX 269 code)   |
//! |      2 |    8 | px            | i64 mantissa (1e-7) |
//! |     10 |    8 | size          | i64 mantissa (1e-7) |
//! |     18 |    8 | symbol        | char[8], NUL-padded |

use crate::types::Decimal;

use super::{
    ensure_len, read_i64, read_padded, read_u16, read_u64, write_i64, write_padded, write_u64,
    MessageHeader, SbeError, GROUP_PREFIX_LEN, HEADER_LEN, SCHEMA_ID, SCHEMA_VERSION,
};

const SYMBOL_LEN: usize = 8;

/// One book update entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MdEntry<'a> {
    /// MDUpdateAction code (0=new, 1=change, 2=delete).
    pub update_action: u8,
    /// MDEntryType code (0=bid, 1=offer, 2=trade).
    pub entry_type: u8,
    /// Price level.
    pub px: Decimal,
    /// Quantity at the level.
    pub size: Decimal,
    /// Instrument symbol (up to 8 bytes).
    pub symbol: &'a [u8],
}

/// MarketDataIncrementalRefresh encode-side message.
#[derive(Debug, Clone, Copy)]
pub struct MdIncremental<'a> {
    /// Transaction time, UTC nanoseconds.
    pub transact_time: u64,
    /// Book update entries.
    pub entries: &'a [MdEntry<'a>],
}

impl MdIncremental<'_> {
    /// Template identifier.
    pub const TEMPLATE_ID: u16 = 3;
    /// Root block size.
    pub const BLOCK_LENGTH: u16 = 8;
    /// Encoded size of one group entry.
    pub const ENTRY_LENGTH: u16 = 26;

    /// Total encoded size for `count` entries.
    #[must_use]
    pub fn encoded_len(count: usize) -> usize {
        HEADER_LEN
            + Self::BLOCK_LENGTH as usize
            + GROUP_PREFIX_LEN
            + count * Self::ENTRY_LENGTH as usize
    }

    /// Encode into `buf`; returns bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize, SbeError> {
        let count =
            u16::try_from(self.entries.len()).map_err(|_| SbeError::CountOutOfRange(u16::MAX))?;
        let total = Self::encoded_len(self.entries.len());
        ensure_len(buf, total)?;

        MessageHeader {
            block_length: Self::BLOCK_LENGTH,
            template_id: Self::TEMPLATE_ID,
            schema_id: SCHEMA_ID,
            version: SCHEMA_VERSION,
        }
        .encode(buf)?;
        write_u64(buf, HEADER_LEN, self.transact_time);

        // Group prefix.
        let group_at = HEADER_LEN + Self::BLOCK_LENGTH as usize;
        buf[group_at..group_at + 2].copy_from_slice(&Self::ENTRY_LENGTH.to_le_bytes());
        buf[group_at + 2..group_at + 4].copy_from_slice(&count.to_le_bytes());

        let mut at = group_at + GROUP_PREFIX_LEN;
        for entry in self.entries {
            buf[at] = entry.update_action;
            buf[at + 1] = entry.entry_type;
            write_i64(buf, at + 2, entry.px.mantissa());
            write_i64(buf, at + 10, entry.size.mantissa());
            write_padded(buf, at + 18, SYMBOL_LEN, entry.symbol);
            at += Self::ENTRY_LENGTH as usize;
        }
        Ok(total)
    }

    /// Decode a view over `buf`.
    pub fn decode(buf: &[u8]) -> Result<MdIncrementalView<'_>, SbeError> {
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

        let group_at = HEADER_LEN + header.block_length as usize;
        ensure_len(buf, group_at + GROUP_PREFIX_LEN)?;
        let entry_length = read_u16(buf, group_at) as usize;
        let count = read_u16(buf, group_at + 2) as usize;
        let entries_at = group_at + GROUP_PREFIX_LEN;
        ensure_len(buf, entries_at + count * entry_length)?;

        Ok(MdIncrementalView {
            buf,
            entry_length,
            count,
            entries_at,
        })
    }
}

/// Decoded incremental refresh; entries are read on demand.
#[derive(Debug, Clone, Copy)]
pub struct MdIncrementalView<'a> {
    buf: &'a [u8],
    entry_length: usize,
    count: usize,
    entries_at: usize,
}

impl<'a> MdIncrementalView<'a> {
    /// Transaction time, UTC nanoseconds.
    #[must_use]
    pub fn transact_time(&self) -> u64 {
        read_u64(self.buf, HEADER_LEN)
    }

    /// Number of entries.
    #[must_use]
    pub fn entry_count(&self) -> usize {
        self.count
    }

    /// Decode entry `i`.
    #[must_use]
    pub fn entry(&self, i: usize) -> Option<MdEntry<'a>> {
        if i >= self.count {
            return None;
        }
        let at = self.entries_at + i * self.entry_length;
        Some(MdEntry {
            update_action: self.buf[at],
            entry_type: self.buf[at + 1],
            px: Decimal::from_mantissa(read_i64(self.buf, at + 2)),
            size: Decimal::from_mantissa(read_i64(self.buf, at + 10)),
            symbol: read_padded(self.buf, at + 18, SYMBOL_LEN),
        })
    }

    /// Iterate all entries.
    pub fn entries(&self) -> impl Iterator<Item = MdEntry<'a>> + '_ {
        (0..self.count).filter_map(move |i| self.entry(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_entries() -> Vec<MdEntry<'static>> {
        vec![
            MdEntry {
                update_action: 0,
                entry_type: 0,
                px: Decimal::parse(b"150.25").expect("px"),
                size: Decimal::parse(b"100").expect("size"),
                symbol: b"AAPL",
            },
            MdEntry {
                update_action: 1,
                entry_type: 1,
                px: Decimal::parse(b"150.50").expect("px"),
                size: Decimal::parse(b"200").expect("size"),
                symbol: b"AAPL",
            },
        ]
    }

    #[test]
    fn test_round_trip_with_group() {
        let entries = sample_entries();
        let msg = MdIncremental {
            transact_time: 42,
            entries: &entries,
        };

        let mut buf = vec![0u8; MdIncremental::encoded_len(entries.len())];
        let written = msg.encode(&mut buf).expect("encode");
        assert_eq!(written, buf.len());
        // header + root block + group prefix + 2 * entry
        assert_eq!(written, 8 + 8 + 4 + 2 * 26);

        let view = MdIncremental::decode(&buf).expect("decode");
        assert_eq!(view.transact_time(), 42);
        assert_eq!(view.entry_count(), 2);
        let decoded: Vec<_> = view.entries().collect();
        assert_eq!(decoded, entries);
        assert!(view.entry(2).is_none());
    }

    #[test]
    fn test_empty_group() {
        let msg = MdIncremental {
            transact_time: 7,
            entries: &[],
        };
        let mut buf = vec![0u8; MdIncremental::encoded_len(0)];
        msg.encode(&mut buf).expect("encode empty group");
        let view = MdIncremental::decode(&buf).expect("decode");
        assert_eq!(view.entry_count(), 0);
        assert!(view.entries().next().is_none());
    }

    #[test]
    fn test_truncated_group_rejected() {
        let entries = sample_entries();
        let msg = MdIncremental {
            transact_time: 1,
            entries: &entries,
        };
        let mut buf = vec![0u8; MdIncremental::encoded_len(entries.len())];
        msg.encode(&mut buf).expect("encode");
        buf.truncate(buf.len() - 1);
        assert!(matches!(
            MdIncremental::decode(&buf),
            Err(SbeError::BufferTooSmall { .. })
        ));
    }
}
