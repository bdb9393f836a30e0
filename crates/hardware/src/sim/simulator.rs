//! Simulator: the host-facing run loop around the CPU core.
//!
//! This is the surface a front end (CLI, debugger stub, test harness)
//! drives. It provides:
//! 1. **Execution:** Single-step and free-run entry points that turn
//!    internal faults into stop results according to the configured
//!    fault policies.
//! 2. **State access:** Register and memory read/write by debugger
//!    identity, bypassing the fault policies.
//! 3. **Interruption:** A shared stop flag a host signal handler can
//!    set to break out of [`Simulator::run`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::error;

use crate::common::{signal, Fault, StopResult};
use crate::config::{Config, FaultAction};
use crate::core::{Cpu, RegId};
use crate::sim::loader::{self, LoadError};

/// Top-level simulator: CPU state plus the host run-loop controls.
pub struct Simulator {
    /// The core: registers, memory, statistics.
    pub cpu: Cpu,
    stop: Arc<AtomicBool>,
}

impl Simulator {
    /// Creates a simulator in the reset state.
    pub fn new(config: Config) -> Self {
        Self {
            cpu: Cpu::new(config),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns the shared stop flag.  Setting it to `true` makes the
    /// current [`Simulator::run`] call return `Stopped(SIGINT)` at the
    /// next instruction boundary.
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.stop)
    }

    /// Marks this simulator as debugger-driven: breakpoints and
    /// unhandled exceptions report stop signals instead of terminating.
    pub fn set_debugger(&mut self, on: bool) {
        self.cpu.debugger = on;
    }

    /// Resets the core to its power-on state, keeping loaded memory.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.stop.store(false, Ordering::Relaxed);
    }

    /// Executes one instruction.
    pub fn step(&mut self) -> StopResult {
        match self.cpu.step() {
            Ok(r) => r,
            Err(fault) => self.settle_fault(fault),
        }
    }

    /// Runs until the program stops, exits, faults fatally, or the stop
    /// flag is raised.
    pub fn run(&mut self) -> StopResult {
        loop {
            if self.stop.swap(false, Ordering::Relaxed) {
                return StopResult::Stopped(signal::SIGINT);
            }
            match self.step() {
                StopResult::Stepped => {}
                other => return other,
            }
        }
    }

    /// Loads an ELF executable and points the PC at its entry.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] when the image cannot be parsed.
    pub fn load_elf(&mut self, data: &[u8]) -> Result<u32, LoadError> {
        loader::load_elf(&mut self.cpu, data)
    }

    /// Loads a raw byte image at `base` and points the PC at `entry`.
    pub fn load_image(&mut self, data: &[u8], base: u32, entry: u32) {
        loader::load_image(&mut self.cpu, data, base, entry);
    }

    /// Reads a register by debugger identity.  `Acc` is the only 64-bit
    /// register; everything else fits the low 32 bits.
    pub fn read_register(&self, id: RegId) -> u64 {
        let regs = &self.cpu.regs;
        match id {
            RegId::Gpr(n) => u64::from(regs.gpr(n)),
            RegId::Isp => u64::from(regs.get(crate::core::creg::ISP)),
            RegId::Usp => u64::from(regs.get(crate::core::creg::USP)),
            RegId::Intb => u64::from(regs.intb),
            RegId::Pc => u64::from(regs.pc),
            RegId::Psw => u64::from(regs.psw()),
            RegId::Bpc => u64::from(regs.bpc),
            RegId::Bpsw => u64::from(regs.bpsw),
            RegId::Fintv => u64::from(regs.fintv),
            RegId::Fpsw => u64::from(regs.fpsw),
            RegId::Acc => regs.acc as u64,
        }
    }

    /// Writes a register by debugger identity.
    pub fn write_register(&mut self, id: RegId, val: u64) {
        let regs = &mut self.cpu.regs;
        let w = val as u32;
        match id {
            RegId::Gpr(n) => regs.set_gpr(n, w),
            RegId::Isp => regs.put(crate::core::creg::ISP, w),
            RegId::Usp => regs.put(crate::core::creg::USP, w),
            RegId::Intb => regs.intb = w,
            RegId::Pc => regs.pc = w,
            RegId::Psw => regs.set_psw(w),
            RegId::Bpc => regs.bpc = w,
            RegId::Bpsw => regs.bpsw = w,
            RegId::Fintv => regs.fintv = w,
            RegId::Fpsw => regs.fpsw = w,
            RegId::Acc => regs.acc = val as i64,
        }
    }

    /// Copies simulated memory into `buf`, ignoring fault policies and
    /// provenance tags.  Untouched memory reads as zero.
    pub fn read_memory(&self, addr: u32, buf: &mut [u8]) {
        for (i, slot) in buf.iter_mut().enumerate() {
            *slot = self.cpu.mem.peek(addr.wrapping_add(i as u32));
        }
    }

    /// Deposits `bytes` into simulated memory as data, ignoring fault
    /// policies.
    pub fn write_memory(&mut self, addr: u32, bytes: &[u8]) {
        self.cpu.mem.load(addr, bytes);
    }

    /// Logs the run summary counters.
    pub fn report(&self) {
        self.cpu.stats.report(self.cpu.mem.decode_misses());
    }

    /// Converts an aborting memory fault into the host-visible outcome
    /// its policy calls for.
    fn settle_fault(&mut self, fault: Fault) -> StopResult {
        let action = self.cpu.config.faults.action(fault.kind);
        if action == FaultAction::Debugger || self.cpu.debugger {
            return StopResult::Stopped(fault.signal());
        }
        error!(%fault, pc = format_args!("{:#010x}", self.cpu.opcode_pc), "fatal memory fault");
        StopResult::Exited(1)
    }
}
