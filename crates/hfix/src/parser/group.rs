// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Repeating-group walking over the structural index.
//!
//! A group is declared by a count field (e.g. `NoMDEntries(268)=n`) followed
//! by `n` instances. Every instance starts with the group's delimiter tag;
//! membership of subsequent fields is decided by the group's member-tag set,
//! so trailing non-group fields are never swallowed into the last instance.

use crate::types::tag;

use super::field::FieldView;
use super::message::ParsedMessage;

/// Static description of one repeating group.
#[derive(Debug, Clone, Copy)]
pub struct GroupSpec {
    /// Tag holding the instance count.
    pub count_tag: u32,
    /// First tag of every instance.
    pub delimiter_tag: u32,
    /// Tags that belong to an instance (including the delimiter).
    pub member_tags: &'static [u32],
}

/// Market data entries group (`NoMDEntries(268)` / `MDEntryType(269)`).
pub const MD_ENTRIES_GROUP: GroupSpec = GroupSpec {
    count_tag: tag::NO_MD_ENTRIES,
    delimiter_tag: tag::MD_ENTRY_TYPE,
    member_tags: &[
        tag::MD_ENTRY_TYPE,
        tag::MD_ENTRY_PX,
        tag::MD_ENTRY_SIZE,
        tag::MD_UPDATE_ACTION,
        tag::SYMBOL,
    ],
};

/// One group instance: a contiguous entry range of the structural index.
pub struct GroupInstance<'m, 'a> {
    message: &'m ParsedMessage<'a>,
    start: usize,
    end: usize,
}

impl<'m, 'a> GroupInstance<'m, 'a> {
    /// First occurrence of `tag` inside this instance.
    #[must_use]
    pub fn field(&self, tag_number: u32) -> Option<FieldView<'a>> {
        let entries = self.message.index().entries();
        entries[self.start..self.end]
            .iter()
            .position(|e| e.tag == tag_number)
            .map(|offset| self.message.view_at(self.start + offset))
    }

    /// Number of fields in this instance.
    #[must_use]
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    /// True when the instance holds no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }
}

/// Iterator over the instances of one repeating group.
pub struct GroupIter<'m, 'a> {
    message: &'m ParsedMessage<'a>,
    spec: GroupSpec,
    cursor: usize,
    remaining: usize,
}

impl<'m, 'a> GroupIter<'m, 'a> {
    /// Walk the group declared by `spec` in `message`.
    ///
    /// Returns `None` when the count field is absent or unparseable.
    #[must_use]
    pub fn new(message: &'m ParsedMessage<'a>, spec: GroupSpec) -> Option<Self> {
        let entries = message.index().entries();
        let count_at = entries.iter().position(|e| e.tag == spec.count_tag)?;
        let count = message.view_at(count_at).as_u32().ok()? as usize;
        Some(Self {
            message,
            spec,
            cursor: count_at + 1,
            remaining: count,
        })
    }
}

impl<'m, 'a> Iterator for GroupIter<'m, 'a> {
    type Item = GroupInstance<'m, 'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        let entries = self.message.index().entries();
        if self.cursor >= entries.len() || entries[self.cursor].tag != self.spec.delimiter_tag {
            // Count promised more instances than the message carries.
            self.remaining = 0;
            return None;
        }

        let start = self.cursor;
        let mut end = start + 1;
        while end < entries.len() {
            let tag_number = entries[end].tag;
            if tag_number == self.spec.delimiter_tag
                || !self.spec.member_tags.contains(&tag_number)
            {
                break;
            }
            end += 1;
        }

        self.cursor = end;
        self.remaining -= 1;
        Some(GroupInstance {
            message: self.message,
            start,
            end,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::MessageBuilder;
    use crate::types::FixVersion;

    fn snapshot_with_entries() -> Vec<u8> {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"W");
        builder.field_bytes(49, b"MD");
        builder.field_bytes(56, b"CLIENT");
        builder.field_u32(34, 9);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_bytes(55, b"AAPL");
        builder.field_u32(268, 2);
        builder.field_bytes(269, b"0");
        builder.field_bytes(270, b"150.25");
        builder.field_bytes(271, b"100");
        builder.field_bytes(269, b"1");
        builder.field_bytes(270, b"150.50");
        builder.field_bytes(271, b"200");
        builder.field_bytes(58, b"trailing");
        builder.finish();
        buf
    }

    #[test]
    fn test_group_iteration() {
        let buf = snapshot_with_entries();
        let msg = ParsedMessage::parse(&buf).expect("snapshot parses");
        let mut iter = GroupIter::new(&msg, MD_ENTRIES_GROUP).expect("group present");

        let first = iter.next().expect("first instance");
        assert_eq!(first.field(269).expect("type").as_bytes(), b"0");
        assert_eq!(first.field(270).expect("px").as_bytes(), b"150.25");
        assert_eq!(first.field(271).expect("size").as_bytes(), b"100");

        let second = iter.next().expect("second instance");
        assert_eq!(second.field(270).expect("px").as_bytes(), b"150.50");

        assert!(iter.next().is_none(), "exactly two instances");
    }

    #[test]
    fn test_trailing_fields_not_swallowed() {
        let buf = snapshot_with_entries();
        let msg = ParsedMessage::parse(&buf).expect("snapshot parses");
        let last = GroupIter::new(&msg, MD_ENTRIES_GROUP)
            .expect("group present")
            .last()
            .expect("an instance");
        assert!(
            last.field(58).is_none(),
            "Text(58) after the group must not join the last instance"
        );
        assert_eq!(msg.field(58).expect("Text at top level").as_bytes(), b"trailing");
    }

    #[test]
    fn test_count_larger_than_instances() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"W");
        builder.field_bytes(49, b"A");
        builder.field_bytes(56, b"B");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.field_u32(268, 3);
        builder.field_bytes(269, b"0");
        builder.field_bytes(270, b"1.0");
        builder.finish();

        let msg = ParsedMessage::parse(&buf).expect("parses");
        let instances: Vec<_> = GroupIter::new(&msg, MD_ENTRIES_GROUP)
            .expect("group present")
            .collect();
        assert_eq!(instances.len(), 1, "iterator must stop at real instances");
    }

    #[test]
    fn test_absent_group() {
        let mut buf = Vec::new();
        let mut builder = MessageBuilder::begin(&mut buf, FixVersion::Fix44);
        builder.field_bytes(35, b"0");
        builder.field_bytes(49, b"A");
        builder.field_bytes(56, b"B");
        builder.field_u32(34, 1);
        builder.field_bytes(52, b"20260101-00:00:00.000");
        builder.finish();

        let msg = ParsedMessage::parse(&buf).expect("parses");
        assert!(GroupIter::new(&msg, MD_ENTRIES_GROUP).is_none());
    }
}
