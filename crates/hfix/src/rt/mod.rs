// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lock-free runtime structures: queues, wait strategies, arenas, pools.
//!
//! Everything here is allocation-free after construction and safe to use
//! on the hot receive path. Queue correctness is independent of the chosen
//! [`WaitStrategy`].

pub mod arena;
pub mod mpmc;
pub mod mpsc;
pub mod pool;
pub mod spsc;
pub mod wait;

pub use arena::SessionHeap;
pub use mpmc::MpmcQueue;
pub use mpsc::MpscQueue;
pub use pool::{ObjectPool, PoolGuard, RemoteToken};
pub use spsc::SpscQueue;
pub use wait::WaitStrategy;

/// Cache line size assumed for padding (x86_64 and aarch64).
pub const CACHE_LINE: usize = 64;
