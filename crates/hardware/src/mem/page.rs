//! Backing storage for one 4 KiB page of the simulated address space.
//!
//! Each allocated page owns three parallel arrays indexed by the same page
//! offset: the raw bytes, a provenance tag per byte, and a decoded-
//! instruction cache slot per byte.  Pages are created lazily on first
//! touch and live for the process lifetime; there is no eviction.

use std::sync::Arc;

use crate::isa::DecodedInsn;

/// Number of address bits covered by the page offset.
pub const PAGE_BITS: u32 = 12;

/// Page size in bytes (4 KiB).
pub const PAGE_SIZE: usize = 1 << PAGE_BITS;

/// Mask selecting the page offset of an address.
pub const OFFSET_MASK: u32 = (PAGE_SIZE as u32) - 1;

/// Per-byte provenance tag.
///
/// The tag is the only durable distinction between "stack used for control
/// data" and "stack used for program data": it lets the simulator detect
/// stack corruption and use-of-uninitialized-memory bugs that real
/// hardware cannot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ContentType {
    /// Never written since allocation (or since a return-address pop).
    #[default]
    Uninitialized,
    /// Ordinary program data.
    Data,
    /// Part of a return address pushed by a call or exception entry.
    /// Ordinary writes to such a byte fault; only the matching pop may
    /// consume it.
    PushedReturnAddress,
}

/// One lazily-allocated page: bytes, tags, and decode-cache slots.
pub struct Page {
    /// Raw byte storage.
    pub bytes: [u8; PAGE_SIZE],
    /// Provenance tag per byte.
    pub tags: [ContentType; PAGE_SIZE],
    /// Decoded-instruction cache, populated at instruction-fetch
    /// addresses and cleared by writes.
    pub decode: Vec<Option<Arc<DecodedInsn>>>,
}

impl Page {
    /// Allocates a zeroed, untagged page with an empty decode cache.
    pub fn new() -> Box<Self> {
        Box::new(Self {
            bytes: [0; PAGE_SIZE],
            tags: [ContentType::Uninitialized; PAGE_SIZE],
            decode: vec![None; PAGE_SIZE],
        })
    }
}
