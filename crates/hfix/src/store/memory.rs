// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! In-memory message store.
//!
//! Satisfies every correctness property of the persistent variant; suitable
//! for tests, simulations, and sessions that reset sequences at logon.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{MessageStore, StoredMessage};

/// Inbound deduplication window size (recent sequences remembered).
const DEDUP_WINDOW: usize = 128;

struct OutboundEntry {
    ts_ns: u64,
    bytes: Vec<u8>,
}

/// Dense in-memory outbound log plus inbound sequence memory.
pub struct MemoryStore {
    /// Outbound log; index `i` holds sequence `i + 1`.
    outbound: RwLock<Vec<OutboundEntry>>,
    /// Cap on stored messages (`StoreFull` past it).
    max_messages: usize,
    max_inbound: AtomicU32,
    recent_inbound: RwLock<VecDeque<u32>>,
}

impl MemoryStore {
    /// Unbounded store.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(usize::MAX)
    }

    /// Store rejecting appends past `max_messages`.
    #[must_use]
    pub fn with_capacity(max_messages: usize) -> Self {
        Self {
            outbound: RwLock::new(Vec::new()),
            max_messages,
            max_inbound: AtomicU32::new(0),
            recent_inbound: RwLock::new(VecDeque::with_capacity(DEDUP_WINDOW)),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageStore for MemoryStore {
    fn store(&self, seq: u32, ts_ns: u64, bytes: &[u8]) -> Result<()> {
        let mut outbound = self.outbound.write();
        let next = outbound.len() as u32 + 1;
        if seq < next {
            return Err(Error::StoreDuplicate(seq));
        }
        if seq > next {
            return Err(Error::StoreCorrupt("outbound sequence gap"));
        }
        if outbound.len() >= self.max_messages {
            return Err(Error::StoreFull);
        }
        outbound.push(OutboundEntry {
            ts_ns,
            bytes: bytes.to_vec(),
        });
        Ok(())
    }

    fn retrieve(&self, seq: u32) -> Option<StoredMessage> {
        if seq == 0 {
            return None;
        }
        let outbound = self.outbound.read();
        let entry = outbound.get(seq as usize - 1)?;
        Some(StoredMessage {
            seq,
            ts_ns: entry.ts_ns,
            bytes: entry.bytes.clone(),
        })
    }

    fn max_outbound_sent(&self) -> u32 {
        self.outbound.read().len() as u32
    }

    fn note_inbound(&self, seq: u32) {
        self.max_inbound.fetch_max(seq, Ordering::Relaxed);
        let mut recent = self.recent_inbound.write();
        if recent.len() == DEDUP_WINDOW {
            recent.pop_front();
        }
        recent.push_back(seq);
    }

    fn max_inbound_seen(&self) -> u32 {
        self.max_inbound.load(Ordering::Relaxed)
    }

    fn seen_inbound(&self, seq: u32) -> bool {
        self.recent_inbound.read().contains(&seq)
    }

    fn reset(&self) -> Result<()> {
        self.outbound.write().clear();
        self.max_inbound.store(0, Ordering::Relaxed);
        self.recent_inbound.write().clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::store_contract;

    #[test]
    fn test_density_contract() {
        store_contract::check_density(&MemoryStore::new());
    }

    #[test]
    fn test_range_contract() {
        store_contract::check_range_iteration(&MemoryStore::new());
    }

    #[test]
    fn test_inbound_contract() {
        store_contract::check_inbound_tracking(&MemoryStore::new());
    }

    #[test]
    fn test_reset_contract() {
        store_contract::check_reset(&MemoryStore::new());
    }

    #[test]
    fn test_store_full() {
        let store = MemoryStore::with_capacity(2);
        store.store(1, 0, b"a").expect("append");
        store.store(2, 0, b"b").expect("append");
        assert!(matches!(
            store.store(3, 0, b"c"),
            Err(crate::Error::StoreFull)
        ));
    }

    #[test]
    fn test_dedup_window_bounded() {
        let store = MemoryStore::new();
        for seq in 1..=(DEDUP_WINDOW as u32 + 10) {
            store.note_inbound(seq);
        }
        // Oldest entries fall out of the window; the max survives.
        assert!(!store.seen_inbound(1));
        assert!(store.seen_inbound(DEDUP_WINDOW as u32 + 10));
        assert_eq!(store.max_inbound_seen(), DEDUP_WINDOW as u32 + 10);
    }

    #[test]
    fn test_cross_thread_reads() {
        use std::sync::Arc;
        let store = Arc::new(MemoryStore::new());
        store.store(1, 7, b"hello").expect("append");

        let reader = Arc::clone(&store);
        std::thread::spawn(move || {
            let msg = reader.retrieve(1).expect("visible cross-thread");
            assert_eq!(msg.bytes, b"hello");
        })
        .join()
        .expect("reader thread");
    }
}
