//! Memory and runtime fault definitions.
//!
//! Faults are the checked, policy-configurable errors raised by the memory
//! subsystem (never-written reads, null dereferences, stack corruption).
//! They are distinct from hardware exceptions, which always vector through
//! the simulated exception dispatcher.  Every fallible operation in the
//! core returns `Result<_, Fault>`; the step loop translates the first
//! `Err` into a [`StopResult`](super::StopResult).

use thiserror::Error;

/// The kind of a memory/runtime fault.
///
/// Each kind is independently configurable (terminate, warn, ignore, or
/// defer to the debugger) via [`FaultAction`](crate::config::FaultAction).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum FaultKind {
    /// Read of a page that has never been written.
    #[error("read from unwritten page")]
    ReadUnwrittenPage,

    /// Read of bytes never written on an otherwise-touched page.
    #[error("read from unwritten bytes")]
    ReadUnwrittenBytes,

    /// Access at address zero.
    #[error("null pointer dereference")]
    NullPointerDereference,

    /// Write to, or mismatched pop of, a tagged return-address slot.
    #[error("corrupt stack (pushed return address clobbered)")]
    CorruptStack,
}

/// A fault together with the address that triggered it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("{kind} at address {addr:#010x}")]
pub struct Fault {
    /// What went wrong.
    pub kind: FaultKind,
    /// The (masked) address of the offending access.
    pub addr: u32,
}

impl Fault {
    /// Creates a fault record for `kind` at `addr`.
    #[inline]
    pub fn new(kind: FaultKind, addr: u32) -> Self {
        Self { kind, addr }
    }

    /// The host signal equivalent used when a fault is handed to the
    /// debugger instead of terminating the run.
    pub fn signal(&self) -> i32 {
        match self.kind {
            FaultKind::CorruptStack => super::signal::SIGBUS,
            _ => super::signal::SIGSEGV,
        }
    }
}
