// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Structural index: one entry per field of a framed message.
//!
//! Offsets are strictly monotonic and lie within the message's byte range.
//! The index is built once per message (stage 1); field extraction reads
//! through it lazily (stage 2).

use crate::scan;

use super::ParseError;

/// One field's structure: `tag=value<SOH>`.
///
/// `tag_start..eq_offset` are the tag digits, `eq_offset + 1..value_end`
/// the value bytes, and `value_end` is the position of the terminating SOH.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldEntry {
    /// Parsed tag number.
    pub tag: u32,
    /// Offset of the first tag digit.
    pub tag_start: u32,
    /// Offset of the `=` separator.
    pub eq_offset: u32,
    /// Offset of the terminating SOH.
    pub value_end: u32,
}

impl FieldEntry {
    /// Byte range of the field value (exclusive of `=` and SOH).
    #[inline]
    #[must_use]
    pub fn value_range(&self) -> std::ops::Range<usize> {
        (self.eq_offset as usize + 1)..(self.value_end as usize)
    }
}

/// Ordered field structure of a single framed message.
#[derive(Debug, Default)]
pub struct StructuralIndex {
    entries: Vec<FieldEntry>,
    /// Scratch for SOH positions, reused across builds.
    soh_positions: Vec<u32>,
}

impl StructuralIndex {
    /// Empty index; call [`StructuralIndex::build`] to populate it.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-size for an expected field count.
    #[must_use]
    pub fn with_capacity(fields: usize) -> Self {
        Self {
            entries: Vec::with_capacity(fields),
            soh_positions: Vec::with_capacity(fields),
        }
    }

    /// Indexed fields in wire order.
    #[must_use]
    pub fn entries(&self) -> &[FieldEntry] {
        &self.entries
    }

    /// Number of fields.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no fields are indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// First entry with the given tag.
    #[must_use]
    pub fn find(&self, tag: u32) -> Option<&FieldEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// First entry with the given tag at or after `start` (group walking).
    #[must_use]
    pub fn find_from(&self, tag: u32, start: usize) -> Option<(usize, &FieldEntry)> {
        self.entries[start..]
            .iter()
            .enumerate()
            .find(|(_, e)| e.tag == tag)
            .map(|(i, e)| (start + i, e))
    }

    /// Build the index over a complete framed message.
    ///
    /// The buffer must contain exactly one message ending with the SOH that
    /// terminates the checksum field. Aborts with `MalformedField` when a
    /// field lacks `=` or has an empty or non-numeric tag; `Truncated` when
    /// the final byte is not SOH.
    pub fn build(&mut self, buf: &[u8]) -> Result<(), ParseError> {
        self.entries.clear();
        self.soh_positions.clear();

        if buf.is_empty() || buf[buf.len() - 1] != scan::SOH {
            return Err(ParseError::Truncated);
        }

        scan::scan_soh(buf, &mut self.soh_positions);

        let mut field_start = 0usize;
        for &soh in &self.soh_positions {
            let soh = soh as usize;
            let field = &buf[field_start..soh];

            // Short scalar scan for '=' inside one field.
            let eq = field
                .iter()
                .position(|&b| b == b'=')
                .ok_or(ParseError::MalformedField {
                    offset: field_start,
                })?;
            if eq == 0 {
                return Err(ParseError::MalformedField {
                    offset: field_start,
                });
            }

            let tag = parse_tag(&field[..eq]).ok_or(ParseError::MalformedField {
                offset: field_start,
            })?;

            self.entries.push(FieldEntry {
                tag,
                tag_start: field_start as u32,
                eq_offset: (field_start + eq) as u32,
                value_end: soh as u32,
            });
            field_start = soh + 1;
        }

        Ok(())
    }
}

/// Parse an ASCII tag number. Tags are >= 1 and fit in u32.
fn parse_tag(digits: &[u8]) -> Option<u32> {
    if digits.is_empty() || digits.len() > 9 {
        return None;
    }
    let mut tag: u32 = 0;
    for &b in digits {
        if !b.is_ascii_digit() {
            return None;
        }
        tag = tag * 10 + u32::from(b - b'0');
    }
    if tag == 0 {
        return None;
    }
    Some(tag)
}
