//! Program loading.
//!
//! This module places guest programs into simulated memory. It performs:
//! 1. **ELF loading:** Walks the program segments of an ELF executable,
//!    deposits them at their link addresses, and sets the PC to the
//!    entry point.
//! 2. **Raw images:** Deposits a flat byte image at a caller-supplied
//!    base address for bare-metal test payloads.
//! 3. **Byte-order fixup:** On a big-endian target the fetch path reads
//!    code through an address swizzle, so executable segments are
//!    deposited pre-swapped within each aligned word.

use object::{Object, ObjectSegment, SegmentFlags};
use thiserror::Error;
use tracing::{debug, warn};

use crate::common::Endianness;
use crate::core::Cpu;
use crate::mem::ContentType;

/// Errors produced while loading a guest program.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file is not a well-formed ELF executable.
    #[error("malformed executable: {0}")]
    Object(#[from] object::Error),
}

/// Loads an ELF executable into simulated memory and points the PC at
/// its entry.
///
/// # Arguments
///
/// * `cpu` - The core whose memory and PC are initialized.
/// * `data` - The raw bytes of the ELF file.
///
/// # Returns
///
/// The entry-point address.
///
/// # Errors
///
/// Returns [`LoadError`] when the image cannot be parsed.
pub fn load_elf(cpu: &mut Cpu, data: &[u8]) -> Result<u32, LoadError> {
    let file = object::File::parse(data)?;

    let file_little = file.is_little_endian();
    let config_little = cpu.mem.endianness() == Endianness::Little;
    if file_little != config_little {
        warn!(
            elf_little_endian = file_little,
            "executable byte order disagrees with the configured target"
        );
    }

    for segment in file.segments() {
        let addr = segment.address() as u32;
        let mem_size = segment.size() as u32;
        if mem_size == 0 {
            continue;
        }
        let bytes = segment.data()?;
        let executable = match segment.flags() {
            SegmentFlags::Elf { p_flags } => p_flags & 1 != 0,
            _ => false,
        };
        debug!(
            addr = format_args!("{addr:#010x}"),
            file_size = bytes.len(),
            mem_size,
            executable,
            "loading segment"
        );

        deposit(cpu, addr, bytes, executable);

        // Zero-initialized tail (.bss): the page bytes are already
        // zero, so only the provenance tags need establishing.
        let tail = addr.wrapping_add(bytes.len() as u32);
        let end = addr.wrapping_add(mem_size);
        if tail != end {
            cpu.mem
                .set_content_range(tail, end.wrapping_sub(1), ContentType::Data);
        }
    }

    let entry = file.entry() as u32;
    cpu.regs.pc = entry;
    Ok(entry)
}

/// Deposits a flat byte image at `base` and points the PC at `entry`.
///
/// The whole image is treated as code for byte-order purposes, since
/// raw payloads are typically instruction streams.
pub fn load_image(cpu: &mut Cpu, data: &[u8], base: u32, entry: u32) {
    deposit(cpu, base, data, true);
    cpu.regs.pc = entry;
}

/// Writes `bytes` at `addr`, applying the fetch swizzle to executable
/// content so the decoder's swapped reads see the original stream.
fn deposit(cpu: &mut Cpu, addr: u32, bytes: &[u8], executable: bool) {
    let swap = if executable {
        cpu.mem.fetch_swap_mask()
    } else {
        0
    };
    if swap == 0 {
        cpu.mem.load(addr, bytes);
        return;
    }
    for (i, &b) in bytes.iter().enumerate() {
        let a = addr.wrapping_add(i as u32) ^ swap;
        cpu.mem.load(a, std::slice::from_ref(&b));
    }
    // The swizzle can leave holes at the image edges inside the first
    // and last words; tag the straight range so data reads of the
    // literal pool do not trip the unwritten-memory policy.
    if !bytes.is_empty() {
        cpu.mem.set_content_range(
            addr,
            addr.wrapping_add(bytes.len() as u32 - 1),
            ContentType::Data,
        );
    }
}
