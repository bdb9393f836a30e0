//! MX32 instruction-set simulator library.
//!
//! This crate implements a functional simulator for the MX32 32-bit
//! embedded microcontroller with the following:
//! 1. **Core:** Fetch/decode/execute engine, register file with banked
//!    stack pointers, and synchronous exception dispatch.
//! 2. **Memory:** Sparse paged address space with per-byte provenance
//!    tags and a per-byte decode cache.
//! 3. **ISA:** Variable-length operand-specifier decoding and execution
//!    for the full integer, bit, string, accumulator, and
//!    floating-point instruction set.
//! 4. **FPU:** Software IEEE-754 single-precision arithmetic with the
//!    architectural status-word cause/enable/sticky model.
//! 5. **Simulation:** ELF loader, host service trap, run loop, and
//!    statistics collection.

/// Common types (faults, operand sizes, stop results, endianness).
pub mod common;
/// Simulator configuration (defaults, fault policies, JSON loading).
pub mod config;
/// CPU core (engine, register file, timing, exceptions).
pub mod core;
/// Software floating-point unit.
pub mod fpu;
/// Instruction set (opcode table, operand specifiers, decoder).
pub mod isa;
/// Sparse paged memory with provenance tags.
pub mod mem;
/// Host-facing simulation layer (loader, run loop, host services).
pub mod sim;

/// Root configuration type; use `Config::default()` or deserialize from JSON.
pub use crate::config::Config;
/// Memory/runtime fault record.
pub use crate::common::{Fault, StopResult};
/// Main CPU type; holds registers, memory, and statistics.
pub use crate::core::Cpu;
/// Host-facing run loop; construct with `Simulator::new`.
pub use crate::sim::Simulator;
