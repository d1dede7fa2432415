// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message store: outbound persistence for resend, inbound sequence memory.
//!
//! The outbound side is a dense log keyed by sequence number: every sent
//! message is stored before it becomes visible to the peer, so any
//! ResendRequest range can be replayed. The inbound side retains the
//! highest sequence seen plus a bounded deduplication window.
//!
//! Writers are the session thread only; secondary readers (administrative
//! queries) take a shared lock. Nothing here runs on the hot receive path.

pub mod memory;
pub mod mmap;

pub use memory::MemoryStore;
pub use mmap::MmapStore;

use crate::error::Result;

/// One persisted outbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredMessage {
    /// Outbound sequence number.
    pub seq: u32,
    /// Send timestamp, UTC nanoseconds.
    pub ts_ns: u64,
    /// Raw wire bytes as sent.
    pub bytes: Vec<u8>,
}

/// Outbound persistence and inbound sequence accounting for one session.
///
/// Implementations enforce density: `store` accepts exactly
/// `max_outbound_sent() + 1`, rejects duplicates with `StoreDuplicate`,
/// and refuses gaps with `StoreCorrupt`.
pub trait MessageStore: Send {
    /// Persist an outbound message under its sequence number.
    fn store(&self, seq: u32, ts_ns: u64, bytes: &[u8]) -> Result<()>;

    /// Fetch one outbound message.
    fn retrieve(&self, seq: u32) -> Option<StoredMessage>;

    /// Lazily iterate outbound messages in `[lo, hi]` (inclusive).
    fn retrieve_range(&self, lo: u32, hi: u32) -> Box<dyn Iterator<Item = StoredMessage> + '_> {
        Box::new((lo..=hi).filter_map(move |seq| self.retrieve(seq)))
    }

    /// Highest outbound sequence persisted (0 when none).
    fn max_outbound_sent(&self) -> u32;

    /// Record an accepted inbound sequence number.
    fn note_inbound(&self, seq: u32);

    /// Highest inbound sequence recorded (0 when none).
    fn max_inbound_seen(&self) -> u32;

    /// True when `seq` sits in the inbound deduplication window.
    fn seen_inbound(&self, seq: u32) -> bool;

    /// Clear both directions and reset counters to the session start.
    fn reset(&self) -> Result<()>;
}

#[cfg(test)]
pub(crate) mod store_contract {
    //! Shared conformance checks run against every store implementation.

    use super::*;
    use crate::error::Error;

    pub fn check_density(store: &dyn MessageStore) {
        for seq in 1..=5u32 {
            store
                .store(seq, u64::from(seq) * 10, format!("msg-{seq}").as_bytes())
                .expect("dense append must succeed");
        }
        assert_eq!(store.max_outbound_sent(), 5);

        // Density invariant: every sequence up to the maximum is present.
        for seq in 1..=5u32 {
            let msg = store.retrieve(seq).expect("dense retrieval");
            assert_eq!(msg.seq, seq);
            assert_eq!(msg.bytes, format!("msg-{seq}").into_bytes());
            assert_eq!(msg.ts_ns, u64::from(seq) * 10);
        }

        // Duplicates and gaps are rejected.
        assert!(matches!(
            store.store(3, 0, b"dup"),
            Err(Error::StoreDuplicate(3))
        ));
        assert!(matches!(
            store.store(8, 0, b"gap"),
            Err(Error::StoreCorrupt(_))
        ));
        assert_eq!(store.max_outbound_sent(), 5);
    }

    pub fn check_range_iteration(store: &dyn MessageStore) {
        for seq in 1..=4u32 {
            store
                .store(seq, 0, &[seq as u8])
                .expect("append must succeed");
        }
        let collected: Vec<u32> = store.retrieve_range(2, 3).map(|m| m.seq).collect();
        assert_eq!(collected, vec![2, 3]);

        // Ranges past the end yield what exists.
        let clamped: Vec<u32> = store.retrieve_range(3, 10).map(|m| m.seq).collect();
        assert_eq!(clamped, vec![3, 4]);
    }

    pub fn check_inbound_tracking(store: &dyn MessageStore) {
        assert_eq!(store.max_inbound_seen(), 0);
        store.note_inbound(1);
        store.note_inbound(2);
        store.note_inbound(2);
        assert_eq!(store.max_inbound_seen(), 2);
        assert!(store.seen_inbound(1));
        assert!(store.seen_inbound(2));
        assert!(!store.seen_inbound(3));
    }

    pub fn check_reset(store: &dyn MessageStore) {
        store.store(1, 0, b"x").expect("append");
        store.note_inbound(9);
        store.reset().expect("reset");
        assert_eq!(store.max_outbound_sent(), 0);
        assert_eq!(store.max_inbound_seen(), 0);
        assert!(store.retrieve(1).is_none());
        store.store(1, 0, b"y").expect("append restarts at 1");
    }
}
