//! Fully-resolved operand forms.
//!
//! The decoder lowers every operand-specifier byte into one [`Operand`],
//! so the execution engine never re-inspects encoding bytes.  All
//! immediates arrive pre-sign-extended in [`Operand::addend`].

use crate::common::OpSize;

/// Addressing/interpretation mode of one operand slot.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum OperandKind {
    /// Slot unused by this instruction.
    #[default]
    None,
    /// Immediate value in `addend`, already sign-extended.
    Immediate,
    /// General or control register `reg` (control registers are numbered
    /// from 16, see the register file).
    Register,
    /// Memory at `reg + addend`.
    Indirect,
    /// Memory at `reg + reg2 * size`, register-indexed with the index
    /// scaled by the operand width.
    Indexed,
    /// Memory at `reg`, with `reg` incremented by the operand width after
    /// the access.
    Postinc,
    /// Memory at `reg - width`, with `reg` decremented before the access.
    Predec,
    /// A condition code in `reg` (see [`Condition`](super::Condition)).
    Condition,
    /// A processor flag index in `reg`: 0 C, 1 Z, 2 S, 3 O, 4 I, 5 U.
    Flag,
}

/// One decoded operand.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct Operand {
    /// Addressing mode.
    pub kind: OperandKind,
    /// Primary register number (base register, flag index, or condition
    /// nibble depending on `kind`).
    pub reg: u8,
    /// Secondary register number (the index of [`OperandKind::Indexed`],
    /// or the last register of a register-range operand).
    pub reg2: u8,
    /// Displacement or immediate value, sign-extended at decode time.
    pub addend: i32,
    /// Access width and extension rule.
    pub size: OpSize,
}

impl Operand {
    /// An unused slot.
    #[inline]
    pub fn none() -> Self {
        Self::default()
    }

    /// A register operand.
    #[inline]
    pub fn reg(reg: u8, size: OpSize) -> Self {
        Self {
            kind: OperandKind::Register,
            reg,
            size,
            ..Self::default()
        }
    }

    /// An immediate operand.
    #[inline]
    pub fn imm(val: i32) -> Self {
        Self {
            kind: OperandKind::Immediate,
            addend: val,
            ..Self::default()
        }
    }

    /// A register-indirect operand with displacement.
    #[inline]
    pub fn ind(reg: u8, disp: i32, size: OpSize) -> Self {
        Self {
            kind: OperandKind::Indirect,
            reg,
            addend: disp,
            size,
            ..Self::default()
        }
    }

    /// True when this operand touches memory.
    #[inline]
    pub fn is_memory(&self) -> bool {
        matches!(
            self.kind,
            OperandKind::Indirect
                | OperandKind::Indexed
                | OperandKind::Postinc
                | OperandKind::Predec
        )
    }

    /// True when the slot is populated.
    #[inline]
    pub fn is_present(&self) -> bool {
        self.kind != OperandKind::None
    }
}
