//! Common types shared across the MX32 simulator.
//!
//! This module provides fundamental building blocks used by every component:
//! 1. **Fault types:** Memory/runtime fault taxonomy and per-fault actions.
//! 2. **Operand sizes:** Width and extension rules for sub-word accesses.
//! 3. **Stop results:** The step/run outcomes reported to the host.
//! 4. **Endianness:** Architecture byte order for multi-byte accesses.

/// Memory/runtime fault definitions.
pub mod fault;

/// Operand size definitions (byte/halfword/24-bit/word, signed/unsigned).
pub mod size;

/// Step and run outcome definitions.
pub mod stop;

pub use fault::{Fault, FaultKind};
pub use size::OpSize;
pub use stop::{signal, StopResult};

use serde::Deserialize;

/// Architecture byte order for data-path memory accesses.
///
/// The instruction-fetch path additionally applies a word-internal byte
/// transform in big-endian configurations; that transform lives in the
/// decoder's byte reader, never here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Endianness {
    /// Least-significant byte at the lowest address (the default).
    #[default]
    Little,
    /// Most-significant byte at the lowest address.
    Big,
}
