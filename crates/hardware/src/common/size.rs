//! Operand size definitions.
//!
//! MX32 operands carry an explicit size with an extension rule: sub-word
//! values loaded into a 32-bit datapath are either sign-extended or
//! zero-extended depending on the opcode.  The 24-bit size exists for
//! absolute branch targets and long displacements.

/// Operand access width plus extension rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OpSize {
    /// 8 bits, sign-extended on read.
    SByte,
    /// 8 bits, zero-extended on read.
    UByte,
    /// 16 bits, sign-extended on read.
    SHalf,
    /// 16 bits, zero-extended on read.
    UHalf,
    /// 24 bits, zero-extended (branch targets, long displacements).
    ThreeByte,
    /// Full 32 bits.
    #[default]
    Word,
}

impl OpSize {
    /// Number of bytes moved over the bus for this size.
    #[inline]
    pub fn bytes(self) -> u32 {
        match self {
            OpSize::SByte | OpSize::UByte => 1,
            OpSize::SHalf | OpSize::UHalf => 2,
            OpSize::ThreeByte => 3,
            OpSize::Word => 4,
        }
    }

    /// Number of value bits for this size.
    #[inline]
    pub fn bits(self) -> u32 {
        self.bytes() * 8
    }

    /// Mask selecting the value bits of this size.
    #[inline]
    pub fn mask(self) -> u32 {
        match self {
            OpSize::SByte | OpSize::UByte => 0xFF,
            OpSize::SHalf | OpSize::UHalf => 0xFFFF,
            OpSize::ThreeByte => 0xFF_FFFF,
            OpSize::Word => 0xFFFF_FFFF,
        }
    }

    /// Clips or extends a raw 32-bit value according to this size's
    /// extension rule, yielding the value an instruction observes.
    #[inline]
    pub fn extend(self, raw: u32) -> i32 {
        match self {
            OpSize::SByte => raw as u8 as i8 as i32,
            OpSize::UByte => (raw & 0xFF) as i32,
            OpSize::SHalf => raw as u16 as i16 as i32,
            OpSize::UHalf => (raw & 0xFFFF) as i32,
            OpSize::ThreeByte => (raw & 0xFF_FFFF) as i32,
            OpSize::Word => raw as i32,
        }
    }

    /// Sign-extends a raw value of this width regardless of the size's own
    /// extension rule.  Used where an opcode specifies signed semantics
    /// over an unsigned-extended operand (e.g. the multiply-accumulate
    /// stream loads).
    #[inline]
    pub fn sign_extend(self, raw: u32) -> i32 {
        match self {
            OpSize::SByte | OpSize::UByte => raw as u8 as i8 as i32,
            OpSize::SHalf | OpSize::UHalf => raw as u16 as i16 as i32,
            OpSize::ThreeByte => ((raw & 0xFF_FFFF) << 8) as i32 >> 8,
            OpSize::Word => raw as i32,
        }
    }
}
