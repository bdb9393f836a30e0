//! The fetch/decode/execute engine.
//!
//! [`Cpu::step`] runs exactly one instruction:
//! 1. **Fetch/decode** through the decode cache, applying the fetch
//!    byte-order transform on big-endian configurations.
//! 2. **Advance** the program counter past the encoding, so operands and
//!    branches observe the address of the *next* instruction (relative
//!    branches are the exception and use the instruction's own address).
//! 3. **Execute** the operation, updating registers, memory, flags, and
//!    the cycle estimate.
//!
//! Memory faults propagate out as `Err`; architectural exceptions are
//! dispatched inside and return `Ok` like any other step.

use tracing::trace;

use crate::common::{signal, Fault, OpSize, StopResult};
use crate::config::Config;
use crate::fpu;
use crate::isa::{self, Condition, DecodedInsn, Opcode, Operand, OperandKind};
use crate::mem::AddressSpace;
use crate::sim::stats::SimStats;
use crate::sim::syscall::{self, HostIo};

use super::reg::{creg, fpsw, psw, RegisterFile};
use super::timing;
use super::trap::ExceptionKind;

/// The stack pointer's register number.
const SP: u8 = 0;

/// Host-call number requesting service from the simulator itself rather
/// than a vectored software interrupt.
const HOST_TRAP: i32 = 255;

/// A resolved operand location.  Address-mutating modes (post-increment,
/// pre-decrement) take effect during resolution, so read-modify-write
/// destinations resolve once and reuse the location.
#[derive(Clone, Copy)]
enum Loc {
    None,
    Imm(i32),
    Reg(u8),
    Mem(u32),
    Cond(Condition),
    Flag(u32),
}

/// One MX32 core: registers, memory, and execution state.
pub struct Cpu {
    /// Architectural registers.
    pub regs: RegisterFile,
    /// The simulated address space.
    pub mem: AddressSpace,
    /// Retirement and cycle counters.
    pub stats: SimStats,
    /// True when a debugger front end drives this core; changes how
    /// breakpoints and unhandled exceptions report.
    pub debugger: bool,
    pub(crate) config: Config,
    pub(crate) host: HostIo,
    /// Address of the instruction currently executing.
    pub(crate) opcode_pc: u32,
    memory_source: bool,
    memory_dest: bool,
    /// Previous instruction stored to memory; a memory source this
    /// instruction pays a pipeline stall.
    m2m: bool,
    fast_return: bool,
    link_register: u32,
}

impl Cpu {
    /// Creates a core in the architectural reset state.
    pub fn new(config: Config) -> Self {
        let mem = AddressSpace::new(&config);
        let mut regs = RegisterFile::default();
        regs.reset(config.stack_top);
        Self {
            regs,
            mem,
            stats: SimStats::default(),
            debugger: false,
            host: HostIo::new(),
            config,
            opcode_pc: 0,
            memory_source: false,
            memory_dest: false,
            m2m: false,
            fast_return: false,
            link_register: 0,
        }
    }

    /// Returns registers and counters to the power-on state.  Memory is
    /// untouched, so a loaded program survives the reset.
    pub fn reset(&mut self) {
        self.regs.reset(self.config.stack_top);
        self.stats = SimStats::default();
        self.host = HostIo::new();
        self.opcode_pc = 0;
        self.m2m = false;
        self.fast_return = false;
        self.link_register = 0;
    }

    /// Address of the most recently executed (or currently executing)
    /// instruction.
    #[inline]
    pub fn opcode_pc(&self) -> u32 {
        self.opcode_pc
    }

    /// Executes one instruction.
    ///
    /// # Errors
    ///
    /// Returns the memory fault that aborted the instruction, per the
    /// configured fault policies.
    pub fn step(&mut self) -> Result<StopResult, Fault> {
        self.memory_source = false;
        self.memory_dest = false;
        let pc = self.regs.pc;
        self.opcode_pc = pc;
        let insn = isa::decode(&mut self.mem, pc)?;
        self.regs.pc = pc.wrapping_add(insn.len);
        trace!(
            pc = format_args!("{pc:#010x}"),
            op = insn.op.mnemonic(),
            "step"
        );
        self.stats.record(insn.op.class());
        let result = self.execute(&insn);
        self.m2m = self.memory_dest;
        result
    }

    fn execute(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        use Opcode::*;
        match insn.op {
            Nop => self.cycles(1),

            Mov | Movu => return self.op_mov(insn),
            Xchg => return self.op_xchg(insn),
            Sccnd => {
                let taken = self.get(insn.src())? != 0;
                let dloc = self.resolve(insn.dst())?;
                self.store(dloc, insn.size, i32::from(taken))?;
                self.cycles(1);
            }
            Stcc => {
                if self.get(insn.src2())? != 0 {
                    let v = self.get(insn.src())?;
                    let dloc = self.resolve(insn.dst())?;
                    self.store(dloc, insn.size, v)?;
                }
                self.cycles(1);
            }

            Add => return self.op_add(insn, 0, true),
            Adc => {
                let cin = i64::from(self.regs.flag(psw::C));
                return self.op_add(insn, cin, true);
            }
            Sub => return self.op_sub(insn, 0, true),
            Sbb => {
                let borrow = i64::from(!self.regs.flag(psw::C));
                return self.op_sub(insn, borrow, true);
            }
            Cmp => return self.op_sub(insn, 0, false),
            Abs => {
                let v = self.get(insn.src())?;
                let dloc = self.resolve(insn.dst())?;
                let wide = i64::from(v).abs();
                self.set_osz(wide);
                self.store(dloc, insn.size, wide as i32)?;
                self.cycles(1);
            }
            Max => {
                let (dloc, a, b) = self.binary_operands(insn)?;
                self.store(dloc, insn.size, a.max(b))?;
                self.cycles(1);
            }
            Min => {
                let (dloc, a, b) = self.binary_operands(insn)?;
                self.store(dloc, insn.size, a.min(b))?;
                self.cycles(1);
            }
            Mul => {
                let (dloc, a, b) = self.binary_operands(insn)?;
                let wide = (a as u32 as u64).wrapping_mul(b as u32 as u64);
                self.store(dloc, insn.size, wide as i32)?;
                self.cycles(1);
            }
            Emul => {
                let dst = insn.dst();
                let a = self.regs.get(dst.reg) as i32;
                let b = self.get(insn.src())?;
                let wide = i64::from(a) * i64::from(b);
                self.regs.put(dst.reg, wide as u32);
                self.regs.put(dst.reg.wrapping_add(1) & 0xF, (wide >> 32) as u32);
                self.cycles(2);
            }
            Emulu => {
                let dst = insn.dst();
                let a = self.regs.get(dst.reg);
                let b = self.get(insn.src())? as u32;
                let wide = u64::from(a) * u64::from(b);
                self.regs.put(dst.reg, wide as u32);
                self.regs.put(dst.reg.wrapping_add(1) & 0xF, (wide >> 32) as u32);
                self.cycles(2);
            }
            Div => {
                let den = self.get(insn.src())?;
                let dloc = self.resolve(insn.dst())?;
                let num = self.load(dloc, insn.size)?;
                if den == 0 || (den == -1 && num == i32::MIN) {
                    self.regs.set_flag(psw::O, true);
                    self.cycles(3);
                } else {
                    self.regs.set_flag(psw::O, false);
                    self.store(dloc, insn.size, num / den)?;
                    self.cycles(timing::div_cycles(num, den));
                }
            }
            Divu => {
                let den = self.get(insn.src())? as u32;
                let dloc = self.resolve(insn.dst())?;
                let num = self.load(dloc, insn.size)? as u32;
                if den == 0 {
                    self.regs.set_flag(psw::O, true);
                    self.cycles(2);
                } else {
                    self.regs.set_flag(psw::O, false);
                    self.store(dloc, insn.size, (num / den) as i32)?;
                    self.cycles(timing::divu_cycles(num, den));
                }
            }

            And => return self.op_logic(insn, |a, b| a & b),
            Or => return self.op_logic(insn, |a, b| a | b),
            Xor => return self.op_logic(insn, |a, b| a ^ b),
            Tst => {
                let (_, a, b) = self.binary_operands(insn)?;
                self.set_sz(a & b);
                self.cycles(1);
            }

            Shll => return self.op_shift(insn, Shll),
            Shar => return self.op_shift(insn, Shar),
            Shlr => return self.op_shift(insn, Shlr),
            Rotl => {
                let (dloc, a, b) = self.binary_operands(insn)?;
                let r = (a as u32).rotate_left(b as u32 & 31);
                self.set_szc(r as i32, r & 1 != 0);
                self.store(dloc, insn.size, r as i32)?;
                self.cycles(1);
            }
            Rotr => {
                let (dloc, a, b) = self.binary_operands(insn)?;
                let r = (a as u32).rotate_right(b as u32 & 31);
                self.set_szc(r as i32, r & 0x8000_0000 != 0);
                self.store(dloc, insn.size, r as i32)?;
                self.cycles(1);
            }
            Rolc => {
                let dloc = self.resolve(insn.dst())?;
                let v = self.load(dloc, insn.size)? as u32;
                let cout = v & 0x8000_0000 != 0;
                let r = (v << 1) | u32::from(self.regs.flag(psw::C));
                self.set_szc(r as i32, cout);
                self.store(dloc, insn.size, r as i32)?;
                self.cycles(1);
            }
            Rorc => {
                let dloc = self.resolve(insn.dst())?;
                let v = self.load(dloc, insn.size)? as u32;
                let cout = v & 1 != 0;
                let r = (v >> 1) | (u32::from(self.regs.flag(psw::C)) << 31);
                self.set_szc(r as i32, cout);
                self.store(dloc, insn.size, r as i32)?;
                self.cycles(1);
            }
            Revw => {
                let v = self.get(insn.src())? as u32;
                let dloc = self.resolve(insn.dst())?;
                let r = ((v & 0x00FF_00FF) << 8) | ((v & 0xFF00_FF00) >> 8);
                self.store(dloc, insn.size, r as i32)?;
                self.cycles(1);
            }
            Revl => {
                let v = self.get(insn.src())? as u32;
                let dloc = self.resolve(insn.dst())?;
                self.store(dloc, insn.size, v.swap_bytes() as i32)?;
                self.cycles(1);
            }

            Sat => {
                let dloc = self.resolve(insn.dst())?;
                if self.regs.flag(psw::O) {
                    let v = if self.regs.flag(psw::S) {
                        0x7FFF_FFFFu32
                    } else {
                        0x8000_0000u32
                    };
                    self.store(dloc, insn.size, v as i32)?;
                }
                self.cycles(1);
            }
            Satr => {
                if self.regs.flag(psw::O) {
                    if self.regs.flag(psw::S) {
                        self.regs.set_gpr(6, 0xFFFF_FFFF);
                        self.regs.set_gpr(5, 0x8000_0000);
                        self.regs.set_gpr(4, 0);
                    } else {
                        self.regs.set_gpr(6, 0);
                        self.regs.set_gpr(5, 0x7FFF_FFFF);
                        self.regs.set_gpr(4, 0xFFFF_FFFF);
                    }
                }
                self.cycles(1);
            }

            Bset | Bclr | Bnot | Bmcc => return self.op_bit(insn),
            Btst => {
                let a = self.get(insn.src())?;
                let mut bit = self.get(insn.src2())? as u32;
                bit &= if insn.src().kind == OperandKind::Register {
                    0x1F
                } else {
                    0x07
                };
                let set = a & (1 << bit) != 0;
                self.set_zc(!set, set);
                self.cycles(1);
            }

            Bra => return self.op_branch(insn, None),
            Bcnd => {
                let cond = Condition::from_nibble(insn.dst().reg);
                return self.op_branch(insn, Some(cond));
            }
            Jmp => {
                let target = self.get(insn.dst())? as u32;
                self.take_branch(target, insn.len);
            }
            Jsr => {
                let target = self.get(insn.dst())? as u32;
                let ret = self.regs.pc;
                self.push_pc(ret)?;
                self.link_register = ret;
                self.fast_return = true;
                self.take_branch(target, insn.len);
            }
            Bsr => {
                let delta = insn.src().addend;
                let target = self.opcode_pc.wrapping_add(delta as u32);
                let ret = self.regs.pc;
                self.push_pc(ret)?;
                self.link_register = ret;
                self.fast_return = true;
                self.take_branch(target, insn.len);
            }
            Rts => {
                let ret = self.pop_pc()?;
                self.regs.pc = ret;
                let cyc = if self.fast_return && self.link_register == ret {
                    self.stats.fast_returns += 1;
                    3
                } else {
                    5
                };
                self.cycles(cyc);
                self.fast_return = false;
            }
            Rtsd => return self.op_rtsd(insn),
            PushM => return self.op_pushm(insn),
            PopM => return self.op_popm(insn),

            Scmpu => return self.op_scmpu(),
            Smovu => return self.op_smov(insn, 1, true),
            Smovf => return self.op_smov(insn, 1, false),
            Smovb => return self.op_smovb(),
            Sstr => return self.op_sstr(insn),
            Suntil => return self.op_scan(insn, true),
            Swhile => return self.op_scan(insn, false),
            Rmpa => return self.op_rmpa(insn),

            Mulhi => {
                let a = (self.get(insn.src())? >> 16) as i16;
                let b = (self.get(insn.src2())? >> 16) as i16;
                self.regs.acc = (i64::from(a) * i64::from(b)) << 16;
                self.cycles(1);
            }
            Mullo => {
                let a = self.get(insn.src())? as i16;
                let b = self.get(insn.src2())? as i16;
                self.regs.acc = (i64::from(a) * i64::from(b)) << 16;
                self.cycles(1);
            }
            Machi => {
                let a = (self.get(insn.src())? >> 16) as i16;
                let b = (self.get(insn.src2())? >> 16) as i16;
                self.regs.acc = self
                    .regs
                    .acc
                    .wrapping_add((i64::from(a) * i64::from(b)) << 16);
                self.cycles(1);
            }
            Maclo => {
                let a = self.get(insn.src())? as i16;
                let b = self.get(insn.src2())? as i16;
                self.regs.acc = self
                    .regs
                    .acc
                    .wrapping_add((i64::from(a) * i64::from(b)) << 16);
                self.cycles(1);
            }
            Mvtachi => {
                let v = self.get(insn.src())?;
                self.regs.acc =
                    (i64::from(v) << 32) | (self.regs.acc & 0xFFFF_FFFF);
                self.cycles(1);
            }
            Mvtaclo => {
                let v = self.get(insn.src())?;
                self.regs.acc =
                    (self.regs.acc & !0xFFFF_FFFFi64) | i64::from(v as u32);
                self.cycles(1);
            }
            Mvfachi => {
                let v = (self.regs.acc >> 32) as i32;
                let dloc = self.resolve(insn.dst())?;
                self.store(dloc, insn.size, v)?;
                self.cycles(1);
            }
            Mvfacmi => {
                let v = (self.regs.acc >> 16) as i32;
                let dloc = self.resolve(insn.dst())?;
                self.store(dloc, insn.size, v)?;
                self.cycles(1);
            }
            Mvfaclo => {
                let v = self.regs.acc as i32;
                let dloc = self.resolve(insn.dst())?;
                self.store(dloc, insn.size, v)?;
                self.cycles(1);
            }
            Racw => {
                let shift = self.get(insn.src())? & 0x3F;
                let mut acc = (self.regs.acc as u64) << shift;
                acc = acc.wrapping_add(0x8000_0000);
                let acc = if (acc as i64) > 0x0000_7FFF_0000_0000 {
                    0x0000_7FFF_0000_0000u64
                } else if (acc as i64) < 0xFFFF_8000_0000_0000u64 as i64 {
                    0xFFFF_8000_0000_0000u64
                } else {
                    acc & 0xFFFF_FFFF_0000_0000
                };
                self.regs.acc = acc as i64;
                self.cycles(1);
            }

            SetPsw | ClrPsw => {
                let bit = flag_bit(insn.dst().reg);
                let allowed =
                    !(self.regs.flag(psw::PM) && (bit == psw::I || bit == psw::U));
                if allowed {
                    self.regs.set_flag(bit, insn.op == SetPsw);
                }
                self.cycles(1);
            }
            Mvtipl => {
                let v = self.get(insn.src())? as u32;
                self.regs.set_ipl(v & 0xF);
                self.cycles(1);
            }

            Brk => {
                if self.debugger {
                    return Ok(StopResult::HitBreak);
                }
                if self.regs.intb == 0 {
                    trace!("break with no vector table");
                    return Ok(StopResult::Exited(1));
                }
                let handler = self.mem.read_u32(self.regs.intb)?;
                self.enter_vector(handler)?;
                self.cycles(6);
            }
            Int => {
                let n = self.get(insn.src())?;
                if n == HOST_TRAP {
                    let r = syscall::dispatch(self)?;
                    if r != StopResult::Stepped {
                        return Ok(r);
                    }
                } else {
                    let slot = self.regs.intb.wrapping_add(4 * n as u32);
                    let handler = self.mem.read_u32(slot)?;
                    self.enter_vector(handler)?;
                }
                self.cycles(6);
            }
            Rte => {
                if self.regs.flag(psw::PM) {
                    return self.raise_exception(ExceptionKind::Privileged, self.opcode_pc);
                }
                self.regs.pc = self.pop_pc()?;
                let mut new_psw = self.pop_pc()?;
                // Returning to user mode always lands on the user stack.
                if new_psw & psw::PM != 0 {
                    new_psw |= psw::U;
                }
                self.regs.set_psw(new_psw);
                self.fast_return = false;
                self.cycles(6);
            }
            Rtfi => {
                if self.regs.flag(psw::PM) {
                    return self.raise_exception(ExceptionKind::Privileged, self.opcode_pc);
                }
                self.regs.pc = self.regs.bpc;
                let bpsw = self.regs.bpsw;
                self.regs.set_psw(bpsw);
                self.cycles(3);
            }
            Wait | Stop => {
                if self.regs.flag(psw::PM) {
                    return self.raise_exception(ExceptionKind::Privileged, self.opcode_pc);
                }
                self.regs.set_flag(psw::I, true);
                return Ok(StopResult::Stopped(0));
            }

            Fadd => return self.op_float(insn, fpu::add),
            Fsub => return self.op_float(insn, fpu::sub),
            Fmul => return self.op_float(insn, fpu::mul),
            Fdiv => return self.op_float(insn, fpu::div),
            Fcmp => return self.op_fcmp(insn),
            Ftoi => return self.op_to_int(insn, Some(fpu::Rounding::Zero)),
            Round => return self.op_to_int(insn, None),
            Itof => return self.op_itof(insn),

            Illegal => {
                return self.raise_exception(ExceptionKind::UndefinedOpcode, self.opcode_pc)
            }
        }
        Ok(StopResult::Stepped)
    }

    // ----- operand plumbing -------------------------------------------

    fn resolve(&mut self, op: &Operand) -> Result<Loc, Fault> {
        let bytes = op.size.bytes();
        Ok(match op.kind {
            OperandKind::None => Loc::None,
            OperandKind::Immediate => Loc::Imm(op.addend),
            OperandKind::Register => Loc::Reg(op.reg),
            OperandKind::Indirect => {
                Loc::Mem(self.regs.get(op.reg).wrapping_add(op.addend as u32))
            }
            OperandKind::Indexed => Loc::Mem(
                self.regs
                    .get(op.reg)
                    .wrapping_add(self.regs.get(op.reg2).wrapping_mul(bytes)),
            ),
            OperandKind::Postinc => {
                let addr = self.regs.get(op.reg);
                self.regs.put(op.reg, addr.wrapping_add(bytes));
                Loc::Mem(addr)
            }
            OperandKind::Predec => {
                let addr = self.regs.get(op.reg).wrapping_sub(bytes);
                self.regs.put(op.reg, addr);
                Loc::Mem(addr)
            }
            OperandKind::Condition => Loc::Cond(Condition::from_nibble(op.reg)),
            OperandKind::Flag => Loc::Flag(flag_bit(op.reg)),
        })
    }

    fn load(&mut self, loc: Loc, size: OpSize) -> Result<i32, Fault> {
        Ok(match loc {
            Loc::None => 0,
            Loc::Imm(v) => v,
            Loc::Reg(r) => size.extend(self.regs.get(r)),
            Loc::Mem(addr) => {
                self.note_memory_source();
                size.extend(self.mem.read_sized(addr, size.bytes())?)
            }
            Loc::Cond(c) => i32::from(self.cond_holds(c)),
            Loc::Flag(bit) => i32::from(self.regs.flag(bit)),
        })
    }

    fn store(&mut self, loc: Loc, size: OpSize, val: i32) -> Result<(), Fault> {
        match loc {
            Loc::Reg(r) => self.regs.put(r, size.extend(val as u32) as u32),
            Loc::Mem(addr) => {
                self.memory_dest = true;
                self.mem
                    .write_sized(addr, (val as u32) & size.mask(), size.bytes())?;
            }
            Loc::Flag(bit) => self.regs.set_flag(bit, val != 0),
            Loc::None | Loc::Imm(_) | Loc::Cond(_) => {}
        }
        Ok(())
    }

    fn get(&mut self, op: &Operand) -> Result<i32, Fault> {
        let loc = self.resolve(op)?;
        self.load(loc, op.size)
    }

    /// The two value operands of an arithmetic/logic instruction: with a
    /// second source present they are (src, src2), otherwise (dst, src).
    fn binary_operands(&mut self, insn: &DecodedInsn) -> Result<(Loc, i32, i32), Fault> {
        let dloc = self.resolve(insn.dst())?;
        if insn.src2().is_present() {
            let a = self.get(insn.src())?;
            let b = self.get(insn.src2())?;
            Ok((dloc, a, b))
        } else {
            let b = self.get(insn.src())?;
            let a = self.load(dloc, insn.dst().size)?;
            Ok((dloc, a, b))
        }
    }

    fn note_memory_source(&mut self) {
        if self.m2m {
            self.cycles(1);
            self.stats.memory_stalls += 1;
            self.m2m = false;
        }
        self.memory_source = true;
    }

    fn cond_holds(&self, c: Condition) -> bool {
        c.holds(
            self.regs.flag(psw::C),
            self.regs.flag(psw::Z),
            self.regs.flag(psw::S),
            self.regs.flag(psw::O),
        )
    }

    fn cycles(&mut self, n: u64) {
        if self.config.cycle_accurate {
            self.stats.cycles += n;
        }
    }

    // ----- flag helpers -----------------------------------------------

    fn set_sz(&mut self, v: i32) {
        self.regs.set_flag(psw::S, v < 0);
        self.regs.set_flag(psw::Z, v == 0);
    }

    fn set_zc(&mut self, z: bool, c: bool) {
        self.regs.set_flag(psw::Z, z);
        self.regs.set_flag(psw::C, c);
    }

    fn set_szc(&mut self, v: i32, c: bool) {
        self.set_sz(v);
        self.regs.set_flag(psw::C, c);
    }

    /// O/S/Z from a widened signed result, carry untouched.
    fn set_osz(&mut self, wide: i64) {
        self.regs
            .set_flag(psw::O, wide < i64::from(i32::MIN) || wide > i64::from(i32::MAX));
        self.set_sz(wide as i32);
    }

    /// Full arithmetic flag update from a widened signed result.
    fn set_oszc(&mut self, wide: i64, c: bool) {
        let v = wide as i32;
        self.regs
            .set_flag(psw::O, wide < i64::from(i32::MIN) || wide > i64::from(i32::MAX));
        self.set_szc(v, c);
    }

    // ----- stack helpers ----------------------------------------------

    fn push(&mut self, val: u32) -> Result<(), Fault> {
        let sp = self.regs.get(SP).wrapping_sub(4);
        self.regs.put(SP, sp);
        self.mem.write_u32(sp, val)
    }

    fn pop(&mut self) -> Result<u32, Fault> {
        let sp = self.regs.get(SP);
        let val = self.mem.read_u32(sp)?;
        self.regs.put(SP, sp.wrapping_add(4));
        Ok(val)
    }

    /// Pushes control data (a return address or saved status word),
    /// tagging the slot against ordinary overwrites.
    pub(crate) fn push_pc(&mut self, val: u32) -> Result<(), Fault> {
        let sp = self.regs.get(SP).wrapping_sub(4);
        self.regs.put(SP, sp);
        self.mem.push_return_address(sp, val)
    }

    /// Pops tagged control data, faulting on mismatched frames.
    pub(crate) fn pop_pc(&mut self) -> Result<u32, Fault> {
        let sp = self.regs.get(SP);
        let val = self.mem.pop_return_address(sp)?;
        self.regs.put(SP, sp.wrapping_add(4));
        Ok(val)
    }

    /// Software-interrupt entry: pushes the status word and return
    /// address, clears I/U/PM, and resumes at `handler`.
    fn enter_vector(&mut self, handler: u32) -> Result<(), Fault> {
        let old_psw = self.regs.psw();
        self.regs
            .set_psw(old_psw & !(psw::I | psw::U | psw::PM));
        let ret = self.regs.pc;
        self.push_pc(old_psw)?;
        self.push_pc(ret)?;
        self.regs.pc = handler;
        Ok(())
    }

    // ----- grouped operation bodies -----------------------------------

    fn op_mov(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let dst = insn.dst();
        let src = insn.src();
        let mut v = if src.kind == OperandKind::Register && src.reg == creg::PC {
            // Reads of the program counter observe the instruction's own
            // address, not the advanced one.
            self.opcode_pc as i32
        } else {
            self.get(src)?
        };
        if dst.kind == OperandKind::Register {
            if dst.reg == creg::PSW {
                v = self.masked_psw_value(v as u32) as i32;
            } else if self.regs.flag(psw::PM)
                && matches!(
                    dst.reg,
                    creg::ISP | creg::INTB | creg::BPC | creg::BPSW | creg::FINTV
                )
            {
                // User mode cannot touch the privileged control registers.
                self.cycles(1);
                return Ok(StopResult::Stepped);
            }
        }
        let both_memory = dst.is_memory() && src.is_memory();
        let dloc = self.resolve(dst)?;
        self.store(dloc, dst.size, v)?;
        if dst.kind == OperandKind::Predec && src.kind == OperandKind::Register {
            // Pushes overlap the store with the pointer update.
            self.memory_dest = false;
        }
        self.set_sz(v);
        self.cycles(if both_memory { 2 } else { 1 });
        Ok(StopResult::Stepped)
    }

    /// PSW writes can never flip PM, and user mode additionally keeps its
    /// I, U, and IPL fields.
    fn masked_psw_value(&self, requested: u32) -> u32 {
        let cur = self.regs.psw();
        let mut v = (requested & !psw::PM) | (cur & psw::PM);
        if cur & psw::PM != 0 {
            let keep = psw::I | psw::U | psw::IPL_MASK;
            v = (v & !keep) | (cur & keep);
        }
        v
    }

    fn op_xchg(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let sloc = self.resolve(insn.src())?;
        let v = self.load(sloc, insn.size)?;
        let dloc = self.resolve(insn.dst())?;
        let d = self.load(dloc, insn.size)?;
        self.store(sloc, insn.size, d)?;
        self.store(dloc, insn.size, v)?;
        // Both transfers complete within the exchange itself.
        self.memory_source = false;
        self.memory_dest = false;
        self.cycles(2);
        Ok(StopResult::Stepped)
    }

    fn op_add(
        &mut self,
        insn: &DecodedInsn,
        carry_in: i64,
        store: bool,
    ) -> Result<StopResult, Fault> {
        let (dloc, a, b) = self.binary_operands(insn)?;
        let wide_u = u64::from(a as u32) + u64::from(b as u32) + carry_in as u64;
        let wide_s = i64::from(a) + i64::from(b) + carry_in;
        self.set_oszc(wide_s, wide_u > 0xFFFF_FFFF);
        if store {
            self.store(dloc, insn.size, wide_s as i32)?;
        }
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    fn op_sub(
        &mut self,
        insn: &DecodedInsn,
        borrow: i64,
        store: bool,
    ) -> Result<StopResult, Fault> {
        let (dloc, a, b) = self.binary_operands(insn)?;
        let wide_s = i64::from(a) - i64::from(b) - borrow;
        // Carry set means no borrow occurred.
        let c = i64::from(a as u32) - i64::from(b as u32) - borrow >= 0;
        self.set_oszc(wide_s, c);
        if store {
            self.store(dloc, insn.size, wide_s as i32)?;
        }
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    fn op_logic(
        &mut self,
        insn: &DecodedInsn,
        f: fn(i32, i32) -> i32,
    ) -> Result<StopResult, Fault> {
        let (dloc, a, b) = self.binary_operands(insn)?;
        let v = f(a, b);
        self.set_sz(v);
        self.store(dloc, insn.size, v)?;
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    fn op_shift(&mut self, insn: &DecodedInsn, op: Opcode) -> Result<StopResult, Fault> {
        let (dloc, a, b) = self.binary_operands(insn)?;
        // Shifting bit-by-bit matches the hardware's flag capture: C holds
        // the last bit shifted out, and O records any signed overflow of
        // the widened left-shift result.
        let count = (b.max(0) as u32).min(64);
        let mut c = false;
        let wide: i64 = match op {
            Opcode::Shll => {
                let mut v = i64::from(a);
                for _ in 0..count {
                    c = v & 0x8000_0000 != 0;
                    v <<= 1;
                }
                v
            }
            Opcode::Shar => {
                let mut v = i64::from(a);
                for _ in 0..count {
                    c = v & 1 != 0;
                    v >>= 1;
                }
                v
            }
            _ => {
                let mut v = i64::from(a as u32);
                for _ in 0..count {
                    c = v & 1 != 0;
                    v >>= 1;
                }
                v
            }
        };
        self.set_oszc(wide, c);
        self.store(dloc, insn.size, wide as i32)?;
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    fn op_bit(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let dst = insn.dst();
        let mut bit = self.get(insn.src())? as u32;
        bit &= if dst.kind == OperandKind::Register {
            0x1F
        } else {
            0x07
        };
        let dloc = self.resolve(dst)?;
        let v = self.load(dloc, insn.size)?;
        let mask = 1i32 << bit;
        let new = match insn.op {
            Opcode::Bset => v | mask,
            Opcode::Bclr => v & !mask,
            Opcode::Bnot => v ^ mask,
            _ => {
                if self.get(insn.src2())? != 0 {
                    v | mask
                } else {
                    v & !mask
                }
            }
        };
        self.store(dloc, insn.size, new)?;
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    fn op_branch(
        &mut self,
        insn: &DecodedInsn,
        cond: Option<Condition>,
    ) -> Result<StopResult, Fault> {
        let taken = match cond {
            None => true,
            Some(c) => self.cond_holds(c),
        };
        if taken {
            let delta = insn.src().addend;
            self.regs.pc = self.opcode_pc.wrapping_add(delta as u32);
            self.cycles(timing::branch_taken(delta, insn.len));
        } else {
            self.cycles(1);
        }
        Ok(StopResult::Stepped)
    }

    fn take_branch(&mut self, target: u32, insn_len: u32) {
        let delta = target.wrapping_sub(self.regs.pc) as i32;
        self.regs.pc = target;
        self.cycles(timing::branch_taken(delta, insn_len));
    }

    fn op_rtsd(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let adjust = insn.src().addend;
        let range = insn.dst();
        if range.is_present() {
            let first = range.reg;
            let last = range.reg2;
            if first == 0 {
                return self.raise_exception(ExceptionKind::UndefinedOpcode, self.opcode_pc);
            }
            let count = i32::from(last) - i32::from(first) + 1;
            let sp = self
                .regs
                .get(SP)
                .wrapping_add(adjust as u32)
                .wrapping_sub((count * 4) as u32);
            self.regs.put(SP, sp);
            for r in first..=last {
                let v = self.pop()?;
                self.regs.put(r, v);
            }
            self.cycles(count.max(4) as u64 + 1);
        } else {
            let sp = self.regs.get(SP).wrapping_add(adjust as u32);
            self.regs.put(SP, sp);
            self.cycles(5);
        }
        self.regs.pc = self.pop_pc()?;
        self.fast_return = false;
        Ok(StopResult::Stepped)
    }

    fn op_pushm(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let first = insn.dst().reg;
        let last = insn.dst().reg2;
        if first == 0 || last == 0 {
            return self.raise_exception(ExceptionKind::UndefinedOpcode, self.opcode_pc);
        }
        if first >= last {
            self.regs.pc = self.opcode_pc;
            return Ok(StopResult::Stopped(signal::SIGILL));
        }
        for r in (first..=last).rev() {
            let v = self.regs.get(r);
            self.push(v)?;
        }
        self.cycles(u64::from(last - first) + 1);
        Ok(StopResult::Stepped)
    }

    fn op_popm(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let first = insn.dst().reg;
        let last = insn.dst().reg2;
        if first == 0 || last == 0 {
            return self.raise_exception(ExceptionKind::UndefinedOpcode, self.opcode_pc);
        }
        if first >= last {
            self.regs.pc = self.opcode_pc;
            return Ok(StopResult::Stopped(signal::SIGILL));
        }
        for r in first..=last {
            let v = self.pop()?;
            self.regs.put(r, v);
        }
        self.cycles(u64::from(last - first) + 1);
        Ok(StopResult::Stepped)
    }

    // ----- string operations ------------------------------------------

    fn op_scmpu(&mut self) -> Result<StopResult, Fault> {
        let mut a = 0u8;
        let mut b = 0u8;
        let span = self.regs.get(3);
        while self.regs.get(3) != 0 {
            a = self.mem.read_u8(self.regs.get(1))?;
            b = self.mem.read_u8(self.regs.get(2))?;
            self.regs.set_gpr(1, self.regs.get(1).wrapping_add(1));
            self.regs.set_gpr(2, self.regs.get(2).wrapping_add(1));
            self.regs.set_gpr(3, self.regs.get(3) - 1);
            if a != b || a == 0 {
                break;
            }
        }
        if a == b {
            self.set_zc(true, true);
        } else {
            self.set_zc(false, i32::from(a) - i32::from(b) >= 0);
        }
        self.cycles(2 + u64::from(span));
        Ok(StopResult::Stepped)
    }

    /// Forward byte copy from `[r2]` to `[r1]`, `r3` bytes, optionally
    /// stopping after a copied NUL.
    fn op_smov(
        &mut self,
        _insn: &DecodedInsn,
        step: u32,
        stop_at_nul: bool,
    ) -> Result<StopResult, Fault> {
        let span = self.regs.get(3);
        while self.regs.get(3) != 0 {
            let v = self.mem.read_u8(self.regs.get(2))?;
            self.mem.write_u8(self.regs.get(1), v)?;
            self.regs.set_gpr(1, self.regs.get(1).wrapping_add(step));
            self.regs.set_gpr(2, self.regs.get(2).wrapping_add(step));
            self.regs.set_gpr(3, self.regs.get(3) - 1);
            if stop_at_nul && v == 0 {
                break;
            }
        }
        self.cycles(2 + u64::from(span));
        Ok(StopResult::Stepped)
    }

    fn op_smovb(&mut self) -> Result<StopResult, Fault> {
        let span = self.regs.get(3);
        while self.regs.get(3) != 0 {
            let v = self.mem.read_u8(self.regs.get(2))?;
            self.mem.write_u8(self.regs.get(1), v)?;
            self.regs.set_gpr(1, self.regs.get(1).wrapping_sub(1));
            self.regs.set_gpr(2, self.regs.get(2).wrapping_sub(1));
            self.regs.set_gpr(3, self.regs.get(3) - 1);
        }
        self.cycles(2 + u64::from(span));
        Ok(StopResult::Stepped)
    }

    fn op_sstr(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let bytes = insn.size.bytes();
        let fill = self.regs.get(2) & insn.size.mask();
        let span = self.regs.get(3);
        while self.regs.get(3) != 0 {
            self.mem.write_sized(self.regs.get(1), fill, bytes)?;
            self.regs.set_gpr(1, self.regs.get(1).wrapping_add(bytes));
            self.regs.set_gpr(3, self.regs.get(3) - 1);
        }
        self.cycles(2 + u64::from(span));
        Ok(StopResult::Stepped)
    }

    /// Scan `[r1]` against `r2`: until-match or while-match, leaving Z and
    /// C describing the final comparison.
    fn op_scan(&mut self, insn: &DecodedInsn, until: bool) -> Result<StopResult, Fault> {
        let bytes = insn.size.bytes();
        let probe = self.regs.get(2) & insn.size.mask();
        let mut v = probe;
        if self.regs.get(3) == 0 {
            self.cycles(3);
            return Ok(StopResult::Stepped);
        }
        let mut scanned = 0u64;
        while self.regs.get(3) != 0 {
            self.regs.set_gpr(3, self.regs.get(3) - 1);
            v = self.mem.read_sized(self.regs.get(1), bytes)?;
            self.regs.set_gpr(1, self.regs.get(1).wrapping_add(bytes));
            scanned += 1;
            if (v == probe) == until {
                break;
            }
        }
        if v == probe {
            self.set_zc(true, true);
        } else {
            self.set_zc(false, (v as i32).wrapping_sub(probe as i32) >= 0);
        }
        self.cycles(3 + 3 * scanned);
        Ok(StopResult::Stepped)
    }

    fn op_rmpa(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        let bytes = insn.size.bytes();
        let span = self.regs.get(3);
        while self.regs.get(3) != 0 {
            let a = insn.size.sign_extend(self.mem.read_sized(self.regs.get(1), bytes)?);
            let b = insn.size.sign_extend(self.mem.read_sized(self.regs.get(2), bytes)?);
            self.regs.set_gpr(1, self.regs.get(1).wrapping_add(bytes));
            self.regs.set_gpr(2, self.regs.get(2).wrapping_add(bytes));
            let mut product = i64::from(a) * i64::from(b);
            // Signed product, unsigned three-word accumulate.
            let mut carry = u64::from(self.regs.get(4)) + (product as u64 & 0xFFFF_FFFF);
            self.regs.set_gpr(4, carry as u32);
            carry >>= 32;
            product >>= 32;
            carry += u64::from(self.regs.get(5)) + (product as u64 & 0xFFFF_FFFF);
            self.regs.set_gpr(5, carry as u32);
            carry >>= 32;
            product >>= 32;
            carry += u64::from(self.regs.get(6)) + (product as u64 & 0xFFFF_FFFF);
            self.regs.set_gpr(6, carry as u32);
            self.regs.set_gpr(3, self.regs.get(3) - 1);
        }
        // r6 holds only a sign extension of bit 15; normalize, then flag
        // overflow if anything beyond that survived.
        let r6 = self.regs.get(6);
        let r6 = if r6 & 0x8000 != 0 {
            r6 | 0xFFFF_0000
        } else {
            r6 & 0x0000_FFFF
        };
        self.regs.set_gpr(6, r6);
        self.regs.set_flag(psw::S, r6 & 0x8000_0000 != 0);
        self.regs
            .set_flag(psw::O, r6 != 0 && r6 != 0xFFFF_FFFF);
        self.cycles(6 + 4 * u64::from(span));
        Ok(StopResult::Stepped)
    }

    // ----- floating point ---------------------------------------------

    fn op_float(
        &mut self,
        insn: &DecodedInsn,
        f: fn(u32, u32, &mut u32) -> u32,
    ) -> Result<StopResult, Fault> {
        self.regs.fpsw &= !fpsw::CAUSE_MASK;
        let b = self.get(insn.src())? as u32;
        let dloc = self.resolve(insn.dst())?;
        let a = self.load(dloc, OpSize::Word)? as u32;
        let mut st = self.regs.fpsw;
        let r = f(a, b, &mut st);
        self.regs.fpsw = st;
        if self.regs.fp_exception_pending() {
            return self.raise_exception(ExceptionKind::FloatingPoint, self.opcode_pc);
        }
        self.store(dloc, OpSize::Word, r as i32)?;
        self.regs.set_flag(psw::S, r & 0x8000_0000 != 0);
        self.regs.set_flag(psw::Z, r & 0x7FFF_FFFF == 0);
        self.cycles(4);
        Ok(StopResult::Stepped)
    }

    fn op_fcmp(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        self.regs.fpsw &= !fpsw::CAUSE_MASK;
        let b = self.get(insn.src2())? as u32;
        let a = self.get(insn.src())? as u32;
        let mut st = self.regs.fpsw;
        let outcome = fpu::cmp(a, b, &mut st);
        self.regs.fpsw = st;
        if self.regs.fp_exception_pending() {
            return self.raise_exception(ExceptionKind::FloatingPoint, self.opcode_pc);
        }
        self.regs.set_flag(psw::Z, outcome == fpu::Compare::Equal);
        self.regs.set_flag(psw::S, outcome == fpu::Compare::Less);
        self.regs
            .set_flag(psw::O, outcome == fpu::Compare::Unordered);
        self.cycles(1);
        Ok(StopResult::Stepped)
    }

    /// Float-to-integer conversion: truncating for the explicit form,
    /// current rounding mode for the rounding form.
    fn op_to_int(
        &mut self,
        insn: &DecodedInsn,
        mode: Option<fpu::Rounding>,
    ) -> Result<StopResult, Fault> {
        self.regs.fpsw &= !fpsw::CAUSE_MASK;
        let a = self.get(insn.src())? as u32;
        let mut st = self.regs.fpsw;
        let rm = mode.unwrap_or_else(|| fpu::Rounding::from_fpsw(st));
        let r = fpu::to_int(a, rm, &mut st);
        self.regs.fpsw = st;
        if self.regs.fp_exception_pending() {
            return self.raise_exception(ExceptionKind::FloatingPoint, self.opcode_pc);
        }
        let dloc = self.resolve(insn.dst())?;
        self.store(dloc, OpSize::Word, r)?;
        self.set_sz(r);
        self.cycles(2);
        Ok(StopResult::Stepped)
    }

    fn op_itof(&mut self, insn: &DecodedInsn) -> Result<StopResult, Fault> {
        self.regs.fpsw &= !fpsw::CAUSE_MASK;
        let a = self.get(insn.src())?;
        let mut st = self.regs.fpsw;
        let r = fpu::from_int(a, &mut st);
        self.regs.fpsw = st;
        if self.regs.fp_exception_pending() {
            return self.raise_exception(ExceptionKind::FloatingPoint, self.opcode_pc);
        }
        let dloc = self.resolve(insn.dst())?;
        self.store(dloc, OpSize::Word, r as i32)?;
        self.set_sz(a);
        self.cycles(2);
        Ok(StopResult::Stepped)
    }
}

/// Maps a flag operand index to its status-word bit.
fn flag_bit(idx: u8) -> u32 {
    match idx {
        0 => psw::C,
        1 => psw::Z,
        2 => psw::S,
        3 => psw::O,
        4 => psw::I,
        5 => psw::U,
        _ => 0,
    }
}
