//! Execution-engine tests, grouped by instruction family.




/// Branches, calls, returns, and the stack block operations.
pub mod branch;

/// Floating-point instruction dispatch.
pub mod float;

/// Data movement and conditional transfers.
pub mod mov;

/// String and repeat-accumulate operations.
pub mod string;
