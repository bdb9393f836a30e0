//! Condition codes.
//!
//! A condition is a predicate over the four arithmetic status flags.
//! Conditions appear as operand-specifier nibbles in conditional
//! branches, conditional stores, and bit-move instructions.

/// A branch/store condition, evaluated against the C, Z, S, and O flags.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Condition {
    /// Equal (Z set).
    Eq,
    /// Not equal (Z clear).
    Ne,
    /// Unsigned greater-or-equal (C set).
    Geu,
    /// Unsigned less-than (C clear).
    Ltu,
    /// Unsigned greater-than (C set and Z clear).
    Gtu,
    /// Unsigned less-or-equal (C clear or Z set).
    Leu,
    /// Positive or zero (S clear).
    Pz,
    /// Negative (S set).
    N,
    /// Signed greater-or-equal (S equals O).
    Ge,
    /// Signed less-than (S differs from O).
    Lt,
    /// Signed greater-than.
    Gt,
    /// Signed less-or-equal.
    Le,
    /// Overflow (O set).
    O,
    /// No overflow (O clear).
    No,
    /// Always true.
    Always,
    /// Always false.
    Never,
}

impl Condition {
    /// Maps an encoding nibble to its condition.
    #[inline]
    pub fn from_nibble(n: u8) -> Self {
        match n & 0xF {
            0 => Condition::Eq,
            1 => Condition::Ne,
            2 => Condition::Geu,
            3 => Condition::Ltu,
            4 => Condition::Gtu,
            5 => Condition::Leu,
            6 => Condition::Pz,
            7 => Condition::N,
            8 => Condition::Ge,
            9 => Condition::Lt,
            10 => Condition::Gt,
            11 => Condition::Le,
            12 => Condition::O,
            13 => Condition::No,
            14 => Condition::Always,
            _ => Condition::Never,
        }
    }

    /// Evaluates the condition against the given flag values.
    #[inline]
    pub fn holds(self, c: bool, z: bool, s: bool, o: bool) -> bool {
        match self {
            Condition::Eq => z,
            Condition::Ne => !z,
            Condition::Geu => c,
            Condition::Ltu => !c,
            Condition::Gtu => c && !z,
            Condition::Leu => !c || z,
            Condition::Pz => !s,
            Condition::N => s,
            Condition::Ge => s == o,
            Condition::Lt => s != o,
            Condition::Gt => s == o && !z,
            Condition::Le => s != o || z,
            Condition::O => o,
            Condition::No => !o,
            Condition::Always => true,
            Condition::Never => false,
        }
    }
}
