// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Session registry: identity bookkeeping and core placement.
//!
//! One dedicated thread runs each session's I/O loop; the registry decides
//! which core that thread pins to by hashing the session identity into the
//! allowed-core set, so placement is stable across restarts.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::types::FixVersion;
use crate::util::affinity;

/// Identity of one session: the ordered comp-id pair plus version.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId {
    /// Our comp id.
    pub sender_comp_id: String,
    /// Peer comp id.
    pub target_comp_id: String,
    /// Protocol version.
    pub version: FixVersion,
}

impl SessionId {
    /// Build an identity.
    #[must_use]
    pub fn new(
        sender_comp_id: impl Into<String>,
        target_comp_id: impl Into<String>,
        version: FixVersion,
    ) -> Self {
        Self {
            sender_comp_id: sender_comp_id.into(),
            target_comp_id: target_comp_id.into(),
            version,
        }
    }
}

/// Registry of known sessions and their core placement.
pub struct SessionRegistry {
    /// Cores session threads may pin to; empty disables pinning.
    allowed_cores: Vec<usize>,
    placements: HashMap<SessionId, Option<usize>>,
}

impl SessionRegistry {
    /// Registry with the given allowed-core set.
    #[must_use]
    pub fn new(allowed_cores: Vec<usize>) -> Self {
        Self {
            allowed_cores,
            placements: HashMap::new(),
        }
    }

    /// Register an identity; returns its pinned core (stable per identity).
    pub fn register(&mut self, id: SessionId) -> Result<Option<usize>> {
        if self.placements.contains_key(&id) {
            return Err(Error::InvalidState("session already registered"));
        }
        let core = affinity::core_for_session(
            id.sender_comp_id.as_bytes(),
            id.target_comp_id.as_bytes(),
            &self.allowed_cores,
        );
        self.placements.insert(id, core);
        Ok(core)
    }

    /// Forget an identity (session torn down).
    pub fn deregister(&mut self, id: &SessionId) -> bool {
        self.placements.remove(id).is_some()
    }

    /// Core assigned to a registered identity.
    #[must_use]
    pub fn placement(&self, id: &SessionId) -> Option<Option<usize>> {
        self.placements.get(id).copied()
    }

    /// Registered session count.
    #[must_use]
    pub fn len(&self) -> usize {
        self.placements.len()
    }

    /// True when no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.placements.is_empty()
    }

    /// Spawn the session's I/O thread, pinned to its placement.
    ///
    /// Pin failures degrade to an unpinned thread with a debug log; the
    /// closure runs either way.
    pub fn spawn_session_thread<F>(&mut self, id: SessionId, run: F) -> Result<std::thread::JoinHandle<()>>
    where
        F: FnOnce() + Send + 'static,
    {
        let core = self.register(id.clone())?;
        let name = format!("hfix-{}-{}", id.sender_comp_id, id.target_comp_id);
        let handle = std::thread::Builder::new().name(name).spawn(move || {
            if let Some(core) = core {
                if let Err(err) = affinity::pin_current_thread(core) {
                    log::debug!("[SessionRegistry] pinning to core {core} failed: {err}");
                }
            }
            run();
        })?;
        Ok(handle)
    }
}
