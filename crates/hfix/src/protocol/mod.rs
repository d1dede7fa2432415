// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Message construction: runtime builder, compile-time tag literals,
//! cached timestamp formatting.
//!
//! Both builders emit byte-identical wire messages; the compile-time
//! variant trades a monomorphised literal per tag for the digit formatting
//! of the runtime path.

pub mod builder;
pub mod const_tags;
pub mod timestamp;

pub use builder::MessageBuilder;
pub use const_tags::{format_checksum, format_fixed, push_tag, TagLit};
pub use timestamp::{TimestampFormatter, TIMESTAMP_LEN};
