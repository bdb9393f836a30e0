//! Sparse simulated address space with provenance tracking.
//!
//! This module implements the MX32 memory subsystem. It performs the
//! following:
//! 1. **Storage:** Lazily-allocated 4 KiB pages in a `HashMap`, each owning
//!    parallel byte/tag/decode-cache arrays.
//! 2. **Width-tagged access:** `read_u8/u16/u24/u32` and the corresponding
//!    writes assemble multi-byte values in the configured byte order,
//!    never relying on host memory layout.
//! 3. **Provenance enforcement:** Reads of never-written memory and writes
//!    to pushed-return-address slots raise policy-configurable faults.
//! 4. **Decode-cache coherence:** Every write invalidates the decode-cache
//!    slot at the byte's fetch-relevant address.

/// Page storage and provenance tags.
pub mod page;

pub use page::{ContentType, Page, OFFSET_MASK, PAGE_BITS, PAGE_SIZE};

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use crate::common::{Endianness, Fault, FaultKind};
use crate::config::{Config, FaultPolicies};
use crate::isa::DecodedInsn;

/// Mask applied to every address before access (implemented bus width).
pub const BUS_MASK: u32 = 0xFFFF_FFFF;

/// The sparse MX32 address space.
///
/// Exclusively owned by one execution engine; the decode cache it carries
/// is purely derived state, invalidated on writes, and holds nothing
/// authoritative.
pub struct AddressSpace {
    pages: HashMap<u32, Box<Page>>,
    endianness: Endianness,
    /// XOR applied to byte addresses on the instruction-fetch path.  Three
    /// in big-endian configurations (instruction words are stored
    /// pre-swapped by convention), zero otherwise.  Never applied to the
    /// data path.
    fetch_swap: u32,
    policies: FaultPolicies,
    last_fault: Option<Fault>,
    decode_misses: u64,
}

impl AddressSpace {
    /// Creates an empty address space with the given configuration.
    pub fn new(config: &Config) -> Self {
        Self {
            pages: HashMap::new(),
            endianness: config.endianness,
            fetch_swap: match config.endianness {
                Endianness::Little => 0,
                Endianness::Big => 3,
            },
            policies: config.faults,
            last_fault: None,
            decode_misses: 0,
        }
    }

    /// Discards all pages, tags, and cached decodes.
    pub fn clear(&mut self) {
        self.pages.clear();
        self.last_fault = None;
        self.decode_misses = 0;
    }

    /// The XOR the decoder must apply to byte addresses when reading the
    /// instruction stream.  See the module docs; the data path never uses
    /// this.
    #[inline]
    pub fn fetch_swap_mask(&self) -> u32 {
        self.fetch_swap
    }

    /// The configured data-path byte order.
    #[inline]
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The most recent fault observed, including faults whose configured
    /// action allowed execution to continue.
    #[inline]
    pub fn last_fault(&self) -> Option<Fault> {
        self.last_fault
    }

    /// Forgets the recorded fault (called at host-operation boundaries).
    #[inline]
    pub fn clear_last_fault(&mut self) {
        self.last_fault = None;
    }

    /// Number of decode-cache misses since reset.  Observable by tests to
    /// verify that re-decoding only happens after an intervening write.
    #[inline]
    pub fn decode_misses(&self) -> u64 {
        self.decode_misses
    }

    /// Records `kind` at `addr` and applies the configured action: `Err`
    /// aborts the access, `Ok` lets it proceed as if legal.
    fn fault(&mut self, kind: FaultKind, addr: u32) -> Result<(), Fault> {
        let fault = Fault::new(kind, addr);
        self.last_fault = Some(fault);
        let action = self.policies.action(kind);
        if action == crate::config::FaultAction::Warn {
            warn!(%fault, "memory fault (continuing)");
        }
        if action.aborts() {
            Err(fault)
        } else {
            Ok(())
        }
    }

    fn page(&self, addr: u32) -> Option<&Page> {
        self.pages.get(&(addr >> PAGE_BITS)).map(|p| &**p)
    }

    fn page_mut(&mut self, addr: u32) -> &mut Page {
        self.pages.entry(addr >> PAGE_BITS).or_insert_with(Page::new)
    }

    /// Reads one byte, enforcing the provenance rules.
    ///
    /// # Errors
    ///
    /// `ReadUnwrittenPage`/`ReadUnwrittenBytes` for never-written memory
    /// and `NullPointerDereference` at address zero, when the configured
    /// action aborts.  Non-aborting actions yield zero for missing data.
    pub fn read_u8(&mut self, addr: u32) -> Result<u8, Fault> {
        let addr = addr & BUS_MASK;
        if addr == 0 {
            self.fault(FaultKind::NullPointerDereference, addr)?;
        }
        match self.page(addr) {
            None => {
                self.fault(FaultKind::ReadUnwrittenPage, addr)?;
                Ok(0)
            }
            Some(page) => {
                let off = (addr & OFFSET_MASK) as usize;
                if page.tags[off] == ContentType::Uninitialized {
                    self.fault(FaultKind::ReadUnwrittenBytes, addr)?;
                }
                // Re-borrow: `fault` needed `&mut self`.
                let page = match self.page(addr) {
                    Some(p) => p,
                    None => return Ok(0),
                };
                Ok(page.bytes[off])
            }
        }
    }

    /// Writes one byte, tagging it as ordinary data and invalidating the
    /// decode-cache slot at its fetch-relevant address.
    ///
    /// # Errors
    ///
    /// `CorruptStack` when the byte holds a pushed return address, and
    /// `NullPointerDereference` at address zero, per the configured
    /// actions.
    pub fn write_u8(&mut self, addr: u32, val: u8) -> Result<(), Fault> {
        let addr = addr & BUS_MASK;
        if addr == 0 {
            self.fault(FaultKind::NullPointerDereference, addr)?;
        }
        let off = (addr & OFFSET_MASK) as usize;
        if let Some(page) = self.page(addr) {
            if page.tags[off] == ContentType::PushedReturnAddress {
                self.fault(FaultKind::CorruptStack, addr)?;
            }
        }
        let page = self.page_mut(addr);
        page.bytes[off] = val;
        page.tags[off] = ContentType::Data;
        // A cached decode at fetch address f covers bytes f..f+len, so the
        // write at fetch address `addr ^ swap` can only affect slots within
        // MAX_INSN_LEN below it.
        let fetch_addr = addr ^ self.fetch_swap;
        for back in 0..crate::isa::MAX_INSN_LEN {
            self.invalidate_decode_cache(fetch_addr.wrapping_sub(back));
        }
        Ok(())
    }

    /// Reads a halfword in architecture byte order.
    pub fn read_u16(&mut self, addr: u32) -> Result<u32, Fault> {
        let b0 = u32::from(self.read_u8(addr)?);
        let b1 = u32::from(self.read_u8(addr.wrapping_add(1))?);
        Ok(match self.endianness {
            Endianness::Little => b0 | (b1 << 8),
            Endianness::Big => (b0 << 8) | b1,
        })
    }

    /// Reads a 24-bit value in architecture byte order.
    pub fn read_u24(&mut self, addr: u32) -> Result<u32, Fault> {
        let b0 = u32::from(self.read_u8(addr)?);
        let b1 = u32::from(self.read_u8(addr.wrapping_add(1))?);
        let b2 = u32::from(self.read_u8(addr.wrapping_add(2))?);
        Ok(match self.endianness {
            Endianness::Little => b0 | (b1 << 8) | (b2 << 16),
            Endianness::Big => (b0 << 16) | (b1 << 8) | b2,
        })
    }

    /// Reads a word in architecture byte order.
    pub fn read_u32(&mut self, addr: u32) -> Result<u32, Fault> {
        let lo = self.read_u16(addr)?;
        let hi = self.read_u16(addr.wrapping_add(2))?;
        Ok(match self.endianness {
            Endianness::Little => lo | (hi << 16),
            Endianness::Big => (lo << 16) | hi,
        })
    }

    /// Writes a halfword in architecture byte order.
    pub fn write_u16(&mut self, addr: u32, val: u32) -> Result<(), Fault> {
        let (b0, b1) = match self.endianness {
            Endianness::Little => (val & 0xFF, (val >> 8) & 0xFF),
            Endianness::Big => ((val >> 8) & 0xFF, val & 0xFF),
        };
        self.write_u8(addr, b0 as u8)?;
        self.write_u8(addr.wrapping_add(1), b1 as u8)
    }

    /// Writes a 24-bit value in architecture byte order.
    pub fn write_u24(&mut self, addr: u32, val: u32) -> Result<(), Fault> {
        let bytes = match self.endianness {
            Endianness::Little => [val & 0xFF, (val >> 8) & 0xFF, (val >> 16) & 0xFF],
            Endianness::Big => [(val >> 16) & 0xFF, (val >> 8) & 0xFF, val & 0xFF],
        };
        for (i, b) in bytes.iter().enumerate() {
            self.write_u8(addr.wrapping_add(i as u32), *b as u8)?;
        }
        Ok(())
    }

    /// Writes a word in architecture byte order.
    pub fn write_u32(&mut self, addr: u32, val: u32) -> Result<(), Fault> {
        let (lo, hi) = match self.endianness {
            Endianness::Little => (val & 0xFFFF, val >> 16),
            Endianness::Big => (val >> 16, val & 0xFFFF),
        };
        self.write_u16(addr, lo)?;
        self.write_u16(addr.wrapping_add(2), hi)
    }

    /// Reads a value of the given width (1, 2, 3, or 4 bytes).
    pub fn read_sized(&mut self, addr: u32, bytes: u32) -> Result<u32, Fault> {
        match bytes {
            1 => self.read_u8(addr).map(u32::from),
            2 => self.read_u16(addr),
            3 => self.read_u24(addr),
            _ => self.read_u32(addr),
        }
    }

    /// Writes a value of the given width (1, 2, 3, or 4 bytes).
    pub fn write_sized(&mut self, addr: u32, val: u32, bytes: u32) -> Result<(), Fault> {
        match bytes {
            1 => self.write_u8(addr, val as u8),
            2 => self.write_u16(addr, val),
            3 => self.write_u24(addr, val),
            _ => self.write_u32(addr, val),
        }
    }

    /// Loader entry point: deposits bytes and tags them as data without
    /// consulting the fault policies (images may legitimately cover
    /// address zero).
    pub fn load(&mut self, addr: u32, bytes: &[u8]) {
        for (i, &b) in bytes.iter().enumerate() {
            let a = addr.wrapping_add(i as u32) & BUS_MASK;
            let off = (a & OFFSET_MASK) as usize;
            let page = self.page_mut(a);
            page.bytes[off] = b;
            page.tags[off] = ContentType::Data;
            let fetch_addr = a ^ self.fetch_swap;
            for back in 0..crate::isa::MAX_INSN_LEN {
                self.invalidate_decode_cache(fetch_addr.wrapping_sub(back));
            }
        }
    }

    /// Reads a byte without consulting the fault policies or tags.
    /// Debugger front ends use this for memory inspection; untouched
    /// memory reads as zero.
    pub fn peek(&self, addr: u32) -> u8 {
        let a = addr & BUS_MASK;
        self.page(a).map_or(0, |p| p.bytes[(a & OFFSET_MASK) as usize])
    }

    /// The provenance tag of the byte at `addr`.  Never-touched memory
    /// reads back as `Uninitialized`.
    pub fn content_type(&self, addr: u32) -> ContentType {
        let addr = addr & BUS_MASK;
        self.page(addr)
            .map_or(ContentType::Uninitialized, |p| {
                p.tags[(addr & OFFSET_MASK) as usize]
            })
    }

    /// Tags every byte in `lo..=hi` with `tag`, allocating pages as
    /// needed.  Does not touch byte values or the decode cache.
    pub fn set_content_range(&mut self, lo: u32, hi: u32, tag: ContentType) {
        let mut addr = lo & BUS_MASK;
        let hi = hi & BUS_MASK;
        loop {
            let page = self.page_mut(addr);
            page.tags[(addr & OFFSET_MASK) as usize] = tag;
            if addr == hi {
                break;
            }
            addr = addr.wrapping_add(1);
        }
    }

    /// Pushes a return address: writes the word, then tags its bytes as
    /// `PushedReturnAddress` so any ordinary write before the matching pop
    /// faults.
    ///
    /// # Errors
    ///
    /// As [`write_u32`](Self::write_u32); in particular, pushing over an
    /// un-popped return address raises `CorruptStack`.
    pub fn push_return_address(&mut self, addr: u32, val: u32) -> Result<(), Fault> {
        self.write_u32(addr, val)?;
        self.set_content_range(addr, addr.wrapping_add(3), ContentType::PushedReturnAddress);
        Ok(())
    }

    /// Pops a return address: validates the tag, reads the word, and
    /// returns the slot to `Uninitialized`.
    ///
    /// # Errors
    ///
    /// `CorruptStack` when the slot is not tagged as a pushed return
    /// address (the frame was clobbered or the pop is mismatched).
    pub fn pop_return_address(&mut self, addr: u32) -> Result<u32, Fault> {
        if self.content_type(addr) != ContentType::PushedReturnAddress {
            self.fault(FaultKind::CorruptStack, addr & BUS_MASK)?;
        }
        let val = self.read_u32(addr)?;
        self.set_content_range(addr, addr.wrapping_add(3), ContentType::Uninitialized);
        Ok(val)
    }

    /// The cached decode at `addr`, if the slot is populated.
    pub fn decode_cache(&self, addr: u32) -> Option<Arc<DecodedInsn>> {
        let addr = addr & BUS_MASK;
        self.page(addr)
            .and_then(|p| p.decode[(addr & OFFSET_MASK) as usize].clone())
    }

    /// Stores a freshly scanned decode at `addr` and counts the miss.
    pub fn store_decode(&mut self, addr: u32, insn: Arc<DecodedInsn>) {
        let addr = addr & BUS_MASK;
        self.decode_misses += 1;
        let page = self.page_mut(addr);
        page.decode[(addr & OFFSET_MASK) as usize] = Some(insn);
    }

    /// Empties the decode-cache slot at `addr`.
    pub fn invalidate_decode_cache(&mut self, addr: u32) {
        let addr = addr & BUS_MASK;
        if let Some(page) = self.pages.get_mut(&(addr >> PAGE_BITS)) {
            page.decode[(addr & OFFSET_MASK) as usize] = None;
        }
    }
}
