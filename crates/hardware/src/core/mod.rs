//! The MX32 execution core.
//!
//! This module contains everything that executes instructions:
//! 1. **Register file:** all architectural register state, including the
//!    banked stack pointers and the multiply accumulator.
//! 2. **Engine:** the fetch/decode/execute loop and every operation's
//!    semantics.
//! 3. **Traps:** synchronous exception dispatch through the fixed vector
//!    table.
//! 4. **Timing:** the approximate cycle sub-model.

/// The fetch/decode/execute engine.
pub mod engine;
/// Architectural registers.
pub mod reg;
/// Cycle-count estimation helpers.
pub(crate) mod timing;
/// Synchronous exception dispatch.
pub mod trap;

pub use engine::Cpu;
pub use reg::{creg, fpsw, psw, RegId, RegisterFile};
pub use trap::ExceptionKind;
