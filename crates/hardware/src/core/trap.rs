//! Synchronous exception dispatch.
//!
//! MX32 exceptions vector through fixed word slots at the top of the
//! address space.  Dispatch is precise: the handler sees the address of
//! the faulting instruction (or of the following instruction for
//! requested traps), with the pre-exception status word and return
//! address pushed on the interrupt stack.

use tracing::error;

use crate::common::{signal, StopResult};
use crate::core::reg::{fpsw, psw};
use crate::Fault;

use super::engine::Cpu;

/// Handler value meaning "vector never installed".  Startup code fills
/// the vector table with this reserved-area address, so both zero and
/// this sentinel are treated as absent handlers.
pub const UNSET_HANDLER: u32 = 0x0002_0000;

/// The synchronous exception classes, each with a fixed vector slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExceptionKind {
    /// A privileged instruction executed in user mode.
    Privileged,
    /// A memory access the platform rejected.
    AccessViolation,
    /// An instruction outside the encoding table.
    UndefinedOpcode,
    /// A pending enabled floating-point condition.
    FloatingPoint,
}

impl ExceptionKind {
    /// Address of this exception's vector slot.
    #[inline]
    pub fn vector_addr(self) -> u32 {
        match self {
            ExceptionKind::Privileged => 0xFFFF_FFD0,
            ExceptionKind::AccessViolation => 0xFFFF_FFD4,
            ExceptionKind::UndefinedOpcode => 0xFFFF_FFDC,
            ExceptionKind::FloatingPoint => 0xFFFF_FFE4,
        }
    }

    /// Signal a debugger front end reports for an unhandled instance.
    #[inline]
    pub fn signal(self) -> i32 {
        match self {
            ExceptionKind::Privileged | ExceptionKind::UndefinedOpcode => signal::SIGILL,
            ExceptionKind::AccessViolation => signal::SIGSEGV,
            ExceptionKind::FloatingPoint => signal::SIGFPE,
        }
    }

    /// Human-readable name for diagnostics.
    pub fn label(self) -> &'static str {
        match self {
            ExceptionKind::Privileged => "privileged instruction",
            ExceptionKind::AccessViolation => "access violation",
            ExceptionKind::UndefinedOpcode => "undefined opcode",
            ExceptionKind::FloatingPoint => "floating point",
        }
    }
}

impl Cpu {
    /// Dispatches a synchronous exception.
    ///
    /// With an installed handler: clears I, U, and PM (switching to the
    /// interrupt stack), pushes the old status word and `return_pc` as
    /// tagged return data, and resumes at the handler.  Without one: a
    /// debugger-attached run stops with the exception's signal and the
    /// program counter rewound to `return_pc`; a standalone run exits
    /// with status 1.
    ///
    /// # Errors
    ///
    /// Propagates memory faults from pushing the exception frame.
    pub fn raise_exception(
        &mut self,
        kind: ExceptionKind,
        return_pc: u32,
    ) -> Result<StopResult, Fault> {
        let handler = self.mem.read_u32(kind.vector_addr()).unwrap_or(0);
        // A failed vector read must not count as a program fault.
        self.mem.clear_last_fault();
        if handler == 0 || handler == UNSET_HANDLER {
            if self.debugger {
                self.regs.pc = return_pc;
                return Ok(StopResult::Stopped(kind.signal()));
            }
            error!(
                pc = format_args!("{return_pc:#010x}"),
                kind = kind.label(),
                "unhandled exception"
            );
            if kind == ExceptionKind::FloatingPoint {
                self.log_fp_pending();
            }
            return Ok(StopResult::Exited(1));
        }
        let old_psw = self.regs.psw();
        self.regs
            .set_psw(old_psw & !(psw::I | psw::U | psw::PM));
        self.regs.pc = handler;
        self.push_pc(old_psw)?;
        self.push_pc(return_pc)?;
        Ok(StopResult::Stepped)
    }

    fn log_fp_pending(&self) {
        let st = self.regs.fpsw;
        let mut pending = Vec::new();
        if st & fpsw::FV != 0 {
            pending.push("invalid");
        }
        if st & fpsw::FO != 0 {
            pending.push("overflow");
        }
        if st & fpsw::FZ != 0 {
            pending.push("division-by-zero");
        }
        if st & fpsw::FU != 0 {
            pending.push("underflow");
        }
        if st & fpsw::FX != 0 {
            pending.push("inexact");
        }
        if st & fpsw::CE != 0 {
            pending.push("unimplemented");
        }
        error!(pending = pending.join(" "), "pending float conditions");
    }
}
