//! Configuration system for the MX32 simulator.
//!
//! This module defines all configuration structures used to parameterize a
//! simulation run. It provides:
//! 1. **Defaults:** Baseline constants (stack placement, fault policies).
//! 2. **Structures:** The root [`Config`] plus the per-fault policy block.
//! 3. **Deserialization:** Everything derives `serde::Deserialize`, so a
//!    host can supply a JSON config; the CLI uses `Config::default()`.

use serde::Deserialize;

use crate::common::Endianness;

/// Default configuration constants for the simulator.
mod defaults {
    /// Initial stack pointer after reset (top of the conventional RAM
    /// window).  Programs that set up their own stack overwrite this.
    pub const STACK_TOP: u32 = 0x0100_0000;
}

/// What to do when a memory/runtime fault is detected.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FaultAction {
    /// Print a diagnostic and terminate the run with exit status 1.
    #[default]
    Terminate,
    /// Print a diagnostic, then continue as if the access were legal.
    Warn,
    /// Continue silently.
    Ignore,
    /// Stop the run and hand control to the host debugger.
    Debugger,
}

impl FaultAction {
    /// True when the faulting access must abort the current instruction.
    #[inline]
    pub fn aborts(self) -> bool {
        matches!(self, FaultAction::Terminate | FaultAction::Debugger)
    }
}

/// Per-fault-kind policy block.
///
/// Each memory/runtime fault kind carries its own action, so a test
/// harness can e.g. terminate on stack corruption while merely warning
/// about reads of never-written memory.
#[derive(Clone, Copy, Debug, Default, Deserialize)]
#[serde(default)]
pub struct FaultPolicies {
    /// Action for reads of never-written pages or bytes.
    pub read_unwritten: FaultAction,
    /// Action for accesses at address zero.
    pub null_deref: FaultAction,
    /// Action for writes to (or mismatched pops of) tagged return-address
    /// slots.
    pub corrupt_stack: FaultAction,
}

impl FaultPolicies {
    /// The action configured for `kind`.
    pub fn action(&self, kind: crate::common::FaultKind) -> FaultAction {
        use crate::common::FaultKind;
        match kind {
            FaultKind::ReadUnwrittenPage | FaultKind::ReadUnwrittenBytes => self.read_unwritten,
            FaultKind::NullPointerDereference => self.null_deref,
            FaultKind::CorruptStack => self.corrupt_stack,
        }
    }
}

/// Root simulator configuration.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Architecture byte order for the data path.
    pub endianness: Endianness,
    /// Enables the cycle-timing sub-model.  Orthogonal to correctness;
    /// when off, the cycle counter only counts retired instructions.
    pub cycle_accurate: bool,
    /// Initial stack pointer after reset.
    pub stack_top: u32,
    /// Per-fault-kind actions.
    pub faults: FaultPolicies,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            endianness: Endianness::Little,
            cycle_accurate: true,
            stack_top: defaults::STACK_TOP,
            faults: FaultPolicies::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from JSON, as supplied by host front ends.
    ///
    /// # Errors
    ///
    /// Returns the underlying `serde_json` error for malformed input.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
