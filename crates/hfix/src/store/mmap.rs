// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Memory-mapped persistent message store.
//!
//! Append-only log of records `{seq: u32, ts: u64, len: u32, bytes[len]}`,
//! all little-endian. A trailing 4-byte magic marks clean shutdown; when
//! the magic is absent on open, the log is replayed and truncated at the
//! last complete, sequence-dense record.
//!
//! A drop-in replacement for [`super::MemoryStore`]: same density and
//! range semantics, same inbound tracking (which is not persisted — the
//! peer re-negotiates inbound state at logon). Durability of unflushed
//! appends follows the OS page cache; the clean-shutdown path flushes.

use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU32, Ordering};

use memmap2::MmapMut;
use parking_lot::RwLock;

use crate::error::{Error, Result};

use super::{MessageStore, StoredMessage};

/// Record header: `{seq: u32, ts: u64, len: u32}`.
const RECORD_HEADER: usize = 16;

/// Trailing clean-shutdown marker.
const CLEAN_MAGIC: [u8; 4] = *b"HFXC";

/// Initial file size for an empty log.
const INITIAL_CAPACITY: usize = 64 * 1024;

/// Inbound deduplication window size.
const DEDUP_WINDOW: usize = 128;

struct Inner {
    file: File,
    map: MmapMut,
    /// Append offset: bytes of valid records.
    end: usize,
    /// Per-sequence `(offset, len, ts_ns)`; index `i` holds sequence `i+1`.
    index: Vec<(usize, u32, u64)>,
}

impl Inner {
    fn ensure_capacity(&mut self, needed: usize) -> Result<()> {
        if needed <= self.map.len() {
            return Ok(());
        }
        let mut new_size = self.map.len().max(INITIAL_CAPACITY);
        while new_size < needed {
            new_size *= 2;
        }
        self.file.set_len(new_size as u64)?;
        // SAFETY: the file is created and exclusively owned by this store;
        // no other mapping of it exists in this process.
        self.map = unsafe { MmapMut::map_mut(&self.file)? };
        Ok(())
    }
}

/// Persistent outbound log backed by a memory-mapped file.
pub struct MmapStore {
    inner: RwLock<Inner>,
    max_inbound: AtomicU32,
    recent_inbound: RwLock<VecDeque<u32>>,
    path: PathBuf,
}

impl MmapStore {
    /// Open (or create) the log at `path`, recovering existing records.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)?;

        let file_len = file.metadata()?.len() as usize;
        if file_len == 0 {
            file.set_len(INITIAL_CAPACITY as u64)?;
        }
        // SAFETY: the file is exclusively owned by this store.
        let map = unsafe { MmapMut::map_mut(&file)? };

        let mut inner = Inner {
            file,
            map,
            end: 0,
            index: Vec::new(),
        };

        if file_len > 0 {
            Self::recover(&mut inner, file_len)?;
        }

        Ok(Self {
            inner: RwLock::new(inner),
            max_inbound: AtomicU32::new(0),
            recent_inbound: RwLock::new(VecDeque::with_capacity(DEDUP_WINDOW)),
            path,
        })
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Scan records from the start, stopping at the first hole.
    ///
    /// With the clean magic present, a scan that does not land exactly on
    /// the magic means the file was tampered with: `StoreCorrupt`. Without
    /// the magic (crash), the log is truncated at the last valid record.
    fn recover(inner: &mut Inner, file_len: usize) -> Result<()> {
        let clean = file_len >= CLEAN_MAGIC.len()
            && inner.map[file_len - CLEAN_MAGIC.len()..file_len] == CLEAN_MAGIC;
        let scan_limit = if clean {
            file_len - CLEAN_MAGIC.len()
        } else {
            file_len
        };

        let mut at = 0usize;
        loop {
            if at + RECORD_HEADER > scan_limit {
                break;
            }
            let seq = u32::from_le_bytes(inner.map[at..at + 4].try_into().unwrap_or_default());
            let ts = u64::from_le_bytes(inner.map[at + 4..at + 12].try_into().unwrap_or_default());
            let len =
                u32::from_le_bytes(inner.map[at + 12..at + 16].try_into().unwrap_or_default());

            let next = at + RECORD_HEADER + len as usize;
            let expected_seq = inner.index.len() as u32 + 1;
            if seq != expected_seq || len == 0 || next > scan_limit {
                break;
            }

            inner.index.push((at, len, ts));
            at = next;
        }

        if clean && at != scan_limit {
            return Err(Error::StoreCorrupt("clean log fails record scan"));
        }
        if !clean {
            log::warn!(
                "[MmapStore] unclean shutdown: replayed {} records, truncating at {}",
                inner.index.len(),
                at
            );
        }
        inner.end = at;
        Ok(())
    }
}

impl MessageStore for MmapStore {
    fn store(&self, seq: u32, ts_ns: u64, bytes: &[u8]) -> Result<()> {
        let mut inner = self.inner.write();
        let next = inner.index.len() as u32 + 1;
        if seq < next {
            return Err(Error::StoreDuplicate(seq));
        }
        if seq > next {
            return Err(Error::StoreCorrupt("outbound sequence gap"));
        }

        let at = inner.end;
        let needed = at + RECORD_HEADER + bytes.len() + CLEAN_MAGIC.len();
        inner.ensure_capacity(needed)?;

        inner.map[at..at + 4].copy_from_slice(&seq.to_le_bytes());
        inner.map[at + 4..at + 12].copy_from_slice(&ts_ns.to_le_bytes());
        inner.map[at + 12..at + 16].copy_from_slice(&(bytes.len() as u32).to_le_bytes());
        inner.map[at + 16..at + 16 + bytes.len()].copy_from_slice(bytes);

        inner.index.push((at, bytes.len() as u32, ts_ns));
        inner.end = at + RECORD_HEADER + bytes.len();
        Ok(())
    }

    fn retrieve(&self, seq: u32) -> Option<StoredMessage> {
        if seq == 0 {
            return None;
        }
        let inner = self.inner.read();
        let &(offset, len, ts_ns) = inner.index.get(seq as usize - 1)?;
        let start = offset + RECORD_HEADER;
        Some(StoredMessage {
            seq,
            ts_ns,
            bytes: inner.map[start..start + len as usize].to_vec(),
        })
    }

    fn max_outbound_sent(&self) -> u32 {
        self.inner.read().index.len() as u32
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
        let mut inner = self.inner.write();
        inner.index.clear();
        inner.end = 0;
        self.max_inbound.store(0, Ordering::Relaxed);
        self.recent_inbound.write().clear();
        Ok(())
    }
}

impl Drop for MmapStore {
    fn drop(&mut self) {
        let mut inner = self.inner.write();
        let end = inner.end;
        // Headroom for the magic is maintained by every append.
        if end + CLEAN_MAGIC.len() <= inner.map.len() {
            inner.map[end..end + CLEAN_MAGIC.len()].copy_from_slice(&CLEAN_MAGIC);
            if let Err(err) = inner.map.flush() {
                log::error!("[MmapStore] flush on close failed: {err}");
                return;
            }
            if let Err(err) = inner.file.set_len((end + CLEAN_MAGIC.len()) as u64) {
                log::error!("[MmapStore] truncate on close failed: {err}");
            }
        }
    }
}
