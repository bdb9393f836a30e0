//! Step and run outcome definitions.
//!
//! The engine has exactly two architectural states, *running* and
//! *stopped*; [`StopResult`] is the reason attached to the stopped state
//! and is the only value the host ever sees from `step()`/`run()`.

/// Host-visible signal numbers used in [`StopResult::Stopped`].
///
/// These follow the conventional (newlib) numbering the simulated C
/// library uses, so a debugger front end can map them directly.
pub mod signal {
    /// Interrupt (host stop request).
    pub const SIGINT: i32 = 2;
    /// Illegal instruction.
    pub const SIGILL: i32 = 4;
    /// Trace/breakpoint trap.
    pub const SIGTRAP: i32 = 5;
    /// Floating-point exception.
    pub const SIGFPE: i32 = 8;
    /// Bus error (stack corruption).
    pub const SIGBUS: i32 = 10;
    /// Segmentation violation (bad memory access).
    pub const SIGSEGV: i32 = 11;
}

/// Why the engine left the *running* state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopResult {
    /// A single instruction completed normally.
    Stepped,
    /// A breakpoint instruction executed while under debugger control.
    HitBreak,
    /// The simulated process exited with the given status.
    Exited(i32),
    /// The run stopped with a signal-equivalent condition (wait/stop
    /// instructions, faults deferred to the debugger, host stop requests).
    Stopped(i32),
}

impl StopResult {
    /// True when the engine may simply be stepped again.
    #[inline]
    pub fn is_stepped(self) -> bool {
        matches!(self, StopResult::Stepped)
    }
}
