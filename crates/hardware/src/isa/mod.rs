//! MX32 instruction-set definitions and the variable-length decoder.
//!
//! The ISA layer is self-contained: it understands the byte-level
//! encoding and nothing about execution. It provides:
//! 1. **Opcode and operand models:** [`Opcode`], [`Operand`], and
//!    [`Condition`], the fully-resolved forms the engine dispatches on.
//! 2. **The encoding table:** a per-opcode-byte template table describing
//!    how many operand-specifier bytes follow and how to read them.
//! 3. **The decoder:** a cache-aware scanner that turns raw bytes at the
//!    program counter into an immutable [`DecodedInsn`].

/// Condition-code definitions and evaluation.
pub mod cond;
/// The cache-aware instruction scanner.
pub mod decode;
/// Opcode identities and classification.
pub mod opcode;
/// Fully-resolved operand forms.
pub mod operand;
/// The opcode-byte encoding table.
pub mod table;

pub use cond::Condition;
pub use decode::{decode, DecodedInsn, MAX_INSN_LEN};
pub use opcode::{OpClass, Opcode};
pub use operand::{Operand, OperandKind};
