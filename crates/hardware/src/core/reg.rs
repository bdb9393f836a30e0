//! The architectural register file.
//!
//! MX32 exposes sixteen general registers, of which `r0` is the stack
//! pointer with two banked instances (interrupt and user, selected by the
//! processor-status U bit), plus the control registers and the 64-bit
//! multiply accumulator.  This module owns all of that state and the
//! bank-swap bookkeeping; privilege checks on writes are the engine's
//! business.

/// Processor-status-word bit positions.
pub mod psw {
    /// Carry.
    pub const C: u32 = 1 << 0;
    /// Zero.
    pub const Z: u32 = 1 << 1;
    /// Sign.
    pub const S: u32 = 1 << 2;
    /// Overflow.
    pub const O: u32 = 1 << 3;
    /// Interrupt enable.
    pub const I: u32 = 1 << 16;
    /// Stack-bank select (set = user stack).
    pub const U: u32 = 1 << 17;
    /// Processor mode (set = user mode).
    pub const PM: u32 = 1 << 20;
    /// Interrupt-priority-level field shift.
    pub const IPL_SHIFT: u32 = 24;
    /// Interrupt-priority-level field mask.
    pub const IPL_MASK: u32 = 0xF << IPL_SHIFT;
}

/// Floating-point-status-word bit positions.
///
/// Each exception has three homes: a *cause* bit (set per operation), an
/// *enable* bit, and a *sticky* flag bit 24 positions above the cause.
pub mod fpsw {
    /// Rounding-mode field mask (bits 1..0).
    pub const RM_MASK: u32 = 0x3;
    /// Cause: invalid operation.
    pub const CV: u32 = 1 << 2;
    /// Cause: overflow.
    pub const CO: u32 = 1 << 3;
    /// Cause: divide by zero.
    pub const CZ: u32 = 1 << 4;
    /// Cause: underflow.
    pub const CU: u32 = 1 << 5;
    /// Cause: inexact.
    pub const CX: u32 = 1 << 6;
    /// Cause: unimplemented processing (denormal input with DN clear).
    pub const CE: u32 = 1 << 7;
    /// Denormal handling (set = flush denormals to zero).
    pub const DN: u32 = 1 << 8;
    /// Enable: invalid operation.
    pub const EV: u32 = 1 << 10;
    /// Enable: overflow.
    pub const EO: u32 = 1 << 11;
    /// Enable: divide by zero.
    pub const EZ: u32 = 1 << 12;
    /// Enable: underflow.
    pub const EU: u32 = 1 << 13;
    /// Enable: inexact.
    pub const EX: u32 = 1 << 14;
    /// Sticky: invalid operation.
    pub const FV: u32 = 1 << 26;
    /// Sticky: overflow.
    pub const FO: u32 = 1 << 27;
    /// Sticky: divide by zero.
    pub const FZ: u32 = 1 << 28;
    /// Sticky: underflow.
    pub const FU: u32 = 1 << 29;
    /// Sticky: inexact.
    pub const FX: u32 = 1 << 30;

    /// Mask of all cause bits.
    pub const CAUSE_MASK: u32 = CV | CO | CZ | CU | CX | CE;
    /// Mask of all sticky bits.
    pub const STICKY_MASK: u32 = FV | FO | FZ | FU | FX;
    /// Mask of all enable bits.
    pub const ENABLE_MASK: u32 = EV | EO | EZ | EU | EX;
}

/// Register numbers of the control registers, continuing the general-
/// register numbering used by operand specifiers.
pub mod creg {
    /// Processor status word.
    pub const PSW: u8 = 16;
    /// Program counter.
    pub const PC: u8 = 17;
    /// User stack pointer.
    pub const USP: u8 = 18;
    /// Interrupt stack pointer.
    pub const ISP: u8 = 19;
    /// Interrupt-table base.
    pub const INTB: u8 = 20;
    /// Backup program counter.
    pub const BPC: u8 = 21;
    /// Backup processor status word.
    pub const BPSW: u8 = 22;
    /// Fast-interrupt vector.
    pub const FINTV: u8 = 23;
    /// Floating-point status word.
    pub const FPSW: u8 = 24;
}

/// Debugger-visible register identities, in wire order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RegId {
    /// General register (0..=15).
    Gpr(u8),
    /// Interrupt stack pointer.
    Isp,
    /// User stack pointer.
    Usp,
    /// Interrupt-table base.
    Intb,
    /// Program counter.
    Pc,
    /// Processor status word.
    Psw,
    /// Backup program counter.
    Bpc,
    /// Backup processor status word.
    Bpsw,
    /// Fast-interrupt vector.
    Fintv,
    /// Floating-point status word.
    Fpsw,
    /// The 64-bit multiply accumulator.
    Acc,
}

impl RegId {
    /// Maps a debugger wire index to its register, if in range.
    pub fn from_index(idx: usize) -> Option<Self> {
        Some(match idx {
            0..=15 => RegId::Gpr(idx as u8),
            16 => RegId::Isp,
            17 => RegId::Usp,
            18 => RegId::Intb,
            19 => RegId::Pc,
            20 => RegId::Psw,
            21 => RegId::Bpc,
            22 => RegId::Bpsw,
            23 => RegId::Fintv,
            24 => RegId::Fpsw,
            25 => RegId::Acc,
            _ => return None,
        })
    }

    /// Transfer width in bytes.
    #[inline]
    pub fn width(self) -> usize {
        match self {
            RegId::Acc => 8,
            _ => 4,
        }
    }
}

/// All architectural register state.
#[derive(Clone, Debug, Default)]
pub struct RegisterFile {
    /// General registers; `gpr[0]` is always the *active* stack pointer.
    gpr: [u32; 16],
    /// The inactive stack-pointer bank.
    alt_sp: u32,
    /// Program counter.
    pub pc: u32,
    psw: u32,
    /// Floating-point status word.
    pub fpsw: u32,
    /// Interrupt-table base.
    pub intb: u32,
    /// Backup program counter.
    pub bpc: u32,
    /// Backup processor status word.
    pub bpsw: u32,
    /// Fast-interrupt vector.
    pub fintv: u32,
    /// Multiply accumulator.
    pub acc: i64,
}

impl RegisterFile {
    /// Resets to the architectural power-on state with the given initial
    /// stack pointer (loaded into both stack banks).
    pub fn reset(&mut self, stack_top: u32) {
        *self = Self::default();
        self.gpr[0] = stack_top;
        self.alt_sp = stack_top;
    }

    /// The processor status word.
    #[inline]
    pub fn psw(&self) -> u32 {
        self.psw
    }

    /// Replaces the processor status word, swapping stack banks when the
    /// U bit changes.  No privilege filtering; callers mask first.
    pub fn set_psw(&mut self, val: u32) {
        if (self.psw ^ val) & psw::U != 0 {
            std::mem::swap(&mut self.gpr[0], &mut self.alt_sp);
        }
        self.psw = val;
    }

    /// Tests a PSW bit.
    #[inline]
    pub fn flag(&self, bit: u32) -> bool {
        self.psw & bit != 0
    }

    /// Sets or clears a PSW bit (bank-swap aware for U).
    #[inline]
    pub fn set_flag(&mut self, bit: u32, val: bool) {
        let new = if val { self.psw | bit } else { self.psw & !bit };
        self.set_psw(new);
    }

    /// The interrupt priority level.
    #[inline]
    pub fn ipl(&self) -> u32 {
        (self.psw & psw::IPL_MASK) >> psw::IPL_SHIFT
    }

    /// Sets the interrupt priority level.
    #[inline]
    pub fn set_ipl(&mut self, ipl: u32) {
        self.psw = (self.psw & !psw::IPL_MASK) | ((ipl << psw::IPL_SHIFT) & psw::IPL_MASK);
    }

    /// Reads a general register.
    #[inline]
    pub fn gpr(&self, n: u8) -> u32 {
        self.gpr[usize::from(n & 0xF)]
    }

    /// Writes a general register.
    #[inline]
    pub fn set_gpr(&mut self, n: u8, val: u32) {
        self.gpr[usize::from(n & 0xF)] = val;
    }

    /// Reads a register by operand number (general registers 0..=15,
    /// control registers from 16).  Unknown numbers read as zero.
    pub fn get(&self, n: u8) -> u32 {
        match n {
            0..=15 => self.gpr(n),
            creg::PSW => self.psw,
            creg::PC => self.pc,
            creg::USP => {
                if self.flag(psw::U) {
                    self.gpr[0]
                } else {
                    self.alt_sp
                }
            }
            creg::ISP => {
                if self.flag(psw::U) {
                    self.alt_sp
                } else {
                    self.gpr[0]
                }
            }
            creg::INTB => self.intb,
            creg::BPC => self.bpc,
            creg::BPSW => self.bpsw,
            creg::FINTV => self.fintv,
            creg::FPSW => self.fpsw,
            _ => 0,
        }
    }

    /// Writes a register by operand number.  Unknown numbers are ignored;
    /// PSW writes swap stack banks as needed.
    pub fn put(&mut self, n: u8, val: u32) {
        match n {
            0..=15 => self.set_gpr(n, val),
            creg::PSW => self.set_psw(val),
            creg::PC => self.pc = val,
            creg::USP => {
                if self.flag(psw::U) {
                    self.gpr[0] = val;
                } else {
                    self.alt_sp = val;
                }
            }
            creg::ISP => {
                if self.flag(psw::U) {
                    self.alt_sp = val;
                } else {
                    self.gpr[0] = val;
                }
            }
            creg::INTB => self.intb = val,
            creg::BPC => self.bpc = val,
            creg::BPSW => self.bpsw = val,
            creg::FINTV => self.fintv = val,
            creg::FPSW => self.fpsw = val,
            _ => {}
        }
    }

    /// True when a software floating-point exception is pending: the
    /// unimplemented-processing cause, or any sticky flag whose enable bit
    /// is set.
    #[inline]
    pub fn fp_exception_pending(&self) -> bool {
        self.fpsw & fpsw::CE != 0 || self.fpsw & (self.fpsw << 16) & fpsw::STICKY_MASK != 0
    }
}
