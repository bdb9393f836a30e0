//! Shared infrastructure for the simulator tests.



pub use asm::{Asm, Op};
pub use harness::{TestContext, CODE_BASE, DATA_BASE};
