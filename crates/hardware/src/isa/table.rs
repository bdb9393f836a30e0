//! The opcode-byte encoding table.
//!
//! Every instruction starts with one opcode byte; this table maps that
//! byte to the operation identity, the operand-reading template, and the
//! operand width.  Bytes absent from the table decode as illegal.
//!
//! Operand-specifier ("ospec") bytes follow the opcode byte where the
//! template calls for them.  An ospec byte packs a register number in
//! bits 7..4 and an addressing kind in bits 3..0; some kinds pull further
//! displacement/immediate bytes from the stream.  Multi-byte values in
//! the instruction stream are always least-significant-byte first,
//! independent of the data-path byte order.

use crate::common::OpSize;

use super::Opcode;

/// How the bytes after the opcode byte are read.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Template {
    /// No operand bytes.
    NoOps,
    /// One ospec, the destination.
    Dst,
    /// One ospec, a pure source.
    Src,
    /// Two ospecs: destination, then source.
    DstSrc,
    /// Three ospecs: destination, then two sources.
    DstSrcSrc,
    /// Two ospecs, both sources (compare/test forms that store nothing).
    SrcSrc,
    /// One raw byte holding a register range: first register in the high
    /// nibble, last in the low nibble.
    RegRange,
    /// One raw byte holding a stack-adjustment word count.
    RtsdImm,
    /// A stack-adjustment byte followed by a register-range byte.
    RtsdRegs,
    /// One raw immediate byte.
    Imm8,
    /// An 8-bit signed displacement from the instruction address.
    Rel8,
    /// A 16-bit signed displacement from the instruction address.
    Rel16,
    /// A 24-bit signed displacement from the instruction address.
    Rel24,
    /// A condition byte, then an 8-bit signed displacement.
    CondRel8,
    /// A condition byte, then a 16-bit signed displacement.
    CondRel16,
}

/// One encoding-table entry.
#[derive(Clone, Copy, Debug)]
pub struct InsnSpec {
    /// Operation identity.
    pub op: Opcode,
    /// Operand-reading template.
    pub template: Template,
    /// Default operand width for this encoding.
    pub size: OpSize,
}

const fn spec(op: Opcode, template: Template, size: OpSize) -> InsnSpec {
    InsnSpec { op, template, size }
}

/// Looks up the encoding entry for an opcode byte.
pub fn lookup(byte: u8) -> Option<InsnSpec> {
    use OpSize::*;
    use Opcode::*;
    use Template::*;
    Some(match byte {
        0x00 => spec(Nop, NoOps, Word),
        0x01 => spec(Brk, NoOps, Word),
        0x02 => spec(Rts, NoOps, Word),
        0x03 => spec(Rte, NoOps, Word),
        0x04 => spec(Rtfi, NoOps, Word),
        0x05 => spec(Wait, NoOps, Word),
        0x06 => spec(Stop, NoOps, Word),
        0x07 => spec(Satr, NoOps, Word),
        0x08 => spec(Sat, Dst, Word),
        0x09 => spec(Racw, Imm8, Word),
        0x0A => spec(Rmpa, NoOps, SByte),
        0x0B => spec(Rmpa, NoOps, SHalf),
        0x0C => spec(Rmpa, NoOps, Word),
        0x0D => spec(Scmpu, NoOps, UByte),
        0x0E => spec(Smovu, NoOps, UByte),
        0x0F => spec(Smovb, NoOps, UByte),
        0x10 => spec(Smovf, NoOps, UByte),
        0x11 => spec(Sstr, NoOps, UByte),
        0x12 => spec(Sstr, NoOps, UHalf),
        0x13 => spec(Sstr, NoOps, Word),
        0x14 => spec(Suntil, NoOps, UByte),
        0x15 => spec(Suntil, NoOps, UHalf),
        0x16 => spec(Suntil, NoOps, Word),
        0x17 => spec(Swhile, NoOps, UByte),
        0x18 => spec(Swhile, NoOps, UHalf),
        0x19 => spec(Swhile, NoOps, Word),
        0x1A => spec(Int, Imm8, Word),
        0x1B => spec(Mvtipl, Imm8, Word),
        0x1C => spec(SetPsw, Dst, Word),
        0x1D => spec(ClrPsw, Dst, Word),
        0x1E => spec(Bmcc, DstSrcSrc, Word),
        0x1F => spec(Stcc, DstSrcSrc, Word),
        0x20 => spec(Mov, DstSrc, SByte),
        0x21 => spec(Mov, DstSrc, SHalf),
        0x22 => spec(Mov, DstSrc, Word),
        0x23 => spec(Movu, DstSrc, UByte),
        0x24 => spec(Movu, DstSrc, UHalf),
        0x25 => spec(Xchg, DstSrc, Word),
        0x26 => spec(Sccnd, DstSrc, Word),
        0x28 => spec(Add, DstSrc, Word),
        0x29 => spec(Add, DstSrcSrc, Word),
        0x2A => spec(Adc, DstSrc, Word),
        0x2B => spec(Sub, DstSrc, Word),
        0x2C => spec(Sub, DstSrcSrc, Word),
        0x2D => spec(Sbb, DstSrc, Word),
        0x2E => spec(Mul, DstSrc, Word),
        0x2F => spec(Mul, DstSrcSrc, Word),
        0x30 => spec(Div, DstSrc, Word),
        0x31 => spec(Divu, DstSrc, Word),
        0x32 => spec(Emul, DstSrc, Word),
        0x33 => spec(Emulu, DstSrc, Word),
        0x34 => spec(Abs, DstSrc, Word),
        0x35 => spec(Max, DstSrc, Word),
        0x36 => spec(Min, DstSrc, Word),
        0x37 => spec(And, DstSrc, Word),
        0x38 => spec(And, DstSrcSrc, Word),
        0x39 => spec(Or, DstSrc, Word),
        0x3A => spec(Or, DstSrcSrc, Word),
        0x3B => spec(Xor, DstSrc, Word),
        0x3D => spec(Cmp, SrcSrc, Word),
        0x3E => spec(Tst, SrcSrc, Word),
        0x40 => spec(Shll, DstSrc, Word),
        0x41 => spec(Shar, DstSrc, Word),
        0x42 => spec(Shlr, DstSrc, Word),
        0x43 => spec(Rolc, Dst, Word),
        0x44 => spec(Rorc, Dst, Word),
        0x45 => spec(Rotl, DstSrc, Word),
        0x46 => spec(Rotr, DstSrc, Word),
        0x47 => spec(Revw, DstSrc, Word),
        0x48 => spec(Revl, DstSrc, Word),
        0x49 => spec(Bset, DstSrc, UByte),
        0x4A => spec(Bclr, DstSrc, UByte),
        0x4B => spec(Bnot, DstSrc, UByte),
        0x4C => spec(Btst, SrcSrc, UByte),
        0x50 => spec(PushM, RegRange, Word),
        0x51 => spec(PopM, RegRange, Word),
        0x52 => spec(Rtsd, RtsdImm, Word),
        0x53 => spec(Rtsd, RtsdRegs, Word),
        0x60 => spec(Bra, Rel8, Word),
        0x61 => spec(Bra, Rel16, Word),
        0x62 => spec(Bra, Rel24, Word),
        0x63 => spec(Bcnd, CondRel8, Word),
        0x64 => spec(Bcnd, CondRel16, Word),
        0x65 => spec(Jmp, Dst, Word),
        0x67 => spec(Jsr, Dst, Word),
        0x68 => spec(Bsr, Rel16, Word),
        0x69 => spec(Bsr, Rel24, Word),
        0x70 => spec(Mulhi, SrcSrc, SHalf),
        0x71 => spec(Mullo, SrcSrc, SHalf),
        0x72 => spec(Machi, SrcSrc, SHalf),
        0x73 => spec(Maclo, SrcSrc, SHalf),
        0x74 => spec(Mvtachi, Src, Word),
        0x75 => spec(Mvtaclo, Src, Word),
        0x76 => spec(Mvfachi, Dst, Word),
        0x77 => spec(Mvfacmi, Dst, Word),
        0x78 => spec(Mvfaclo, Dst, Word),
        0x80 => spec(Fadd, DstSrc, Word),
        0x81 => spec(Fsub, DstSrc, Word),
        0x82 => spec(Fmul, DstSrc, Word),
        0x83 => spec(Fdiv, DstSrc, Word),
        0x84 => spec(Fcmp, SrcSrc, Word),
        0x85 => spec(Ftoi, DstSrc, Word),
        0x86 => spec(Round, DstSrc, Word),
        0x87 => spec(Itof, DstSrc, Word),
        _ => return None,
    })
}
