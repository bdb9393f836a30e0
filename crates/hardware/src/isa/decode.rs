//! The cache-aware instruction decoder.
//!
//! Decoding proceeds in two steps:
//! 1. **Cache consult:** the address space keeps one decode slot per
//!    fetch address; a populated slot is returned immediately.
//! 2. **Miss scan:** the encoding table entry for the opcode byte drives
//!    a left-to-right scan of the operand-specifier bytes, producing an
//!    immutable [`DecodedInsn`] that is stored back into the cache.
//!
//! The scanner is the only code that applies the fetch byte-order
//! transform: on big-endian configurations each instruction-stream byte
//! is read from its data address XOR 3.  Data accesses made by the
//! executing instruction are never transformed.

use std::sync::Arc;

use crate::common::{Fault, OpSize};
use crate::mem::AddressSpace;

use super::table::{self, Template};
use super::{Opcode, Operand, OperandKind};

/// Upper bound on the encoded length of one instruction, in bytes.
///
/// Writes invalidate every decode-cache slot within this distance, so a
/// cached instruction can never span a modified byte.
pub const MAX_INSN_LEN: u32 = 16;

/// One fully-decoded instruction.
///
/// Immutable once built; the decode cache shares it by `Arc` so repeated
/// execution of hot code never re-scans bytes.
#[derive(Clone, Debug)]
pub struct DecodedInsn {
    /// Operation identity.
    pub op: Opcode,
    /// Encoded length in bytes.
    pub len: u32,
    /// Operand width for this encoding.
    pub size: OpSize,
    /// Operand slots: destination, source, second source.
    pub ops: [Operand; 3],
}

impl DecodedInsn {
    fn illegal() -> Self {
        Self {
            op: Opcode::Illegal,
            len: 1,
            size: OpSize::Word,
            ops: [Operand::none(); 3],
        }
    }

    /// Destination operand slot.
    #[inline]
    pub fn dst(&self) -> &Operand {
        &self.ops[0]
    }

    /// First source operand slot.
    #[inline]
    pub fn src(&self) -> &Operand {
        &self.ops[1]
    }

    /// Second source operand slot.
    #[inline]
    pub fn src2(&self) -> &Operand {
        &self.ops[2]
    }
}

/// Decodes the instruction at `pc`, consulting and filling the decode
/// cache.
///
/// Unknown opcode bytes and malformed operand specifiers decode to
/// [`Opcode::Illegal`] rather than failing, so the engine can raise the
/// architectural undefined-opcode exception.
///
/// # Errors
///
/// Propagates memory faults from the fetch itself (executing never-written
/// memory under an aborting fault policy).
pub fn decode(mem: &mut AddressSpace, pc: u32) -> Result<Arc<DecodedInsn>, Fault> {
    if let Some(cached) = mem.decode_cache(pc) {
        return Ok(cached);
    }
    let mut scanner = Scanner {
        mem,
        pc,
        len: 0,
        swap: 0,
    };
    scanner.swap = scanner.mem.fetch_swap_mask();
    let insn = Arc::new(scanner.scan()?.unwrap_or_else(DecodedInsn::illegal));
    mem.store_decode(pc, Arc::clone(&insn));
    Ok(insn)
}

struct Scanner<'a> {
    mem: &'a mut AddressSpace,
    pc: u32,
    len: u32,
    swap: u32,
}

impl Scanner<'_> {
    fn fetch_u8(&mut self) -> Result<u8, Fault> {
        let addr = self.pc.wrapping_add(self.len) ^ self.swap;
        let byte = self.mem.read_u8(addr)?;
        self.len += 1;
        Ok(byte)
    }

    /// Reads an `n`-byte little-endian value from the instruction stream
    /// and sign-extends it.
    fn fetch_sext(&mut self, n: u32) -> Result<i32, Fault> {
        let mut raw: u32 = 0;
        for i in 0..n {
            raw |= u32::from(self.fetch_u8()?) << (8 * i);
        }
        let shift = 32 - 8 * n;
        Ok(((raw << shift) as i32) >> shift)
    }

    fn scan(&mut self) -> Result<Option<DecodedInsn>, Fault> {
        let byte = self.fetch_u8()?;
        let spec = match table::lookup(byte) {
            Some(spec) => spec,
            None => return Ok(None),
        };
        let mut ops = [Operand::none(); 3];
        let filled = match spec.template {
            Template::NoOps => true,
            Template::Dst => self.fill(&mut ops, spec.size, &[0])?,
            Template::Src => self.fill(&mut ops, spec.size, &[1])?,
            Template::DstSrc => self.fill(&mut ops, spec.size, &[0, 1])?,
            Template::DstSrcSrc => self.fill(&mut ops, spec.size, &[0, 1, 2])?,
            Template::SrcSrc => self.fill(&mut ops, spec.size, &[1, 2])?,
            Template::RegRange => {
                let b = self.fetch_u8()?;
                ops[0] = Operand {
                    kind: OperandKind::Register,
                    reg: b >> 4,
                    reg2: b & 0xF,
                    size: spec.size,
                    ..Operand::default()
                };
                true
            }
            Template::RtsdImm => {
                let b = self.fetch_u8()?;
                ops[1] = Operand::imm(i32::from(b) * 4);
                true
            }
            Template::RtsdRegs => {
                let b = self.fetch_u8()?;
                ops[1] = Operand::imm(i32::from(b) * 4);
                let range = self.fetch_u8()?;
                ops[0] = Operand {
                    kind: OperandKind::Register,
                    reg: range >> 4,
                    reg2: range & 0xF,
                    size: spec.size,
                    ..Operand::default()
                };
                true
            }
            Template::Imm8 => {
                let b = self.fetch_u8()?;
                ops[1] = Operand::imm(i32::from(b));
                true
            }
            Template::Rel8 => self.rel(&mut ops, 1)?,
            Template::Rel16 => self.rel(&mut ops, 2)?,
            Template::Rel24 => self.rel(&mut ops, 3)?,
            Template::CondRel8 => self.cond_rel(&mut ops, 1)?,
            Template::CondRel16 => self.cond_rel(&mut ops, 2)?,
        };
        if !filled {
            return Ok(None);
        }
        Ok(Some(DecodedInsn {
            op: spec.op,
            len: self.len,
            size: spec.size,
            ops,
        }))
    }

    fn rel(&mut self, ops: &mut [Operand; 3], bytes: u32) -> Result<bool, Fault> {
        let disp = self.fetch_sext(bytes)?;
        ops[1] = Operand::imm(disp);
        Ok(true)
    }

    fn cond_rel(&mut self, ops: &mut [Operand; 3], bytes: u32) -> Result<bool, Fault> {
        let cc = self.fetch_u8()?;
        ops[0] = Operand {
            kind: OperandKind::Condition,
            reg: cc & 0xF,
            ..Operand::default()
        };
        self.rel(ops, bytes)
    }

    fn fill(&mut self, ops: &mut [Operand; 3], size: OpSize, slots: &[usize]) -> Result<bool, Fault> {
        for &slot in slots {
            match self.operand(size)? {
                Some(op) => ops[slot] = op,
                None => return Ok(false),
            }
        }
        Ok(true)
    }

    /// Reads one operand-specifier byte (plus any trailing displacement
    /// or immediate bytes it calls for).  Returns `None` for the two
    /// reserved specifier kinds.
    fn operand(&mut self, size: OpSize) -> Result<Option<Operand>, Fault> {
        let b = self.fetch_u8()?;
        let reg = b >> 4;
        let op = match b & 0xF {
            0 => Some(Operand::reg(reg, size)),
            1 => Some(Operand::ind(reg, 0, size)),
            2 => Some(Operand::ind(reg, self.fetch_sext(1)?, size)),
            3 => Some(Operand::ind(reg, self.fetch_sext(2)?, size)),
            4 => Some(Operand {
                kind: OperandKind::Postinc,
                reg,
                size,
                ..Operand::default()
            }),
            5 => Some(Operand {
                kind: OperandKind::Predec,
                reg,
                size,
                ..Operand::default()
            }),
            6 => {
                let idx = self.fetch_u8()?;
                Some(Operand {
                    kind: OperandKind::Indexed,
                    reg,
                    reg2: idx >> 4,
                    size,
                    ..Operand::default()
                })
            }
            7 => Some(Operand::imm(self.fetch_sext(1)?)),
            8 => Some(Operand::imm(self.fetch_sext(2)?)),
            9 => Some(Operand::imm(self.fetch_sext(3)?)),
            10 => Some(Operand::imm(self.fetch_sext(4)?)),
            11 => Some(Operand {
                kind: OperandKind::Condition,
                reg,
                ..Operand::default()
            }),
            12 => Some(Operand {
                kind: OperandKind::Flag,
                reg,
                ..Operand::default()
            }),
            13 => Some(Operand::reg(16 + reg, size)),
            _ => None,
        };
        Ok(op)
    }
}
