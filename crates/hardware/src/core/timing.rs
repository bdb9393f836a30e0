//! Cycle-count estimation.
//!
//! The cycle sub-model follows the pipeline's published costs: most
//! operations retire in one cycle, memory sources stall behind an
//! immediately preceding memory store, taken branches cost two or three
//! cycles depending on distance, and division is data-dependent on the
//! significant widths of the operands.  The model is advisory and has no
//! effect on architectural state.

/// Number of significant bits in `v`.  For signed interpretation,
/// negative values count the significant bits of the complement.
fn significant_bits(v: u32, signed: bool) -> u32 {
    let v = if signed && (v as i32) < 0 { !v } else { v };
    32 - v.leading_zeros()
}

/// Cycles for a signed divide with the given operands.
pub(crate) fn div_cycles(num: i32, den: i32) -> u64 {
    let nb = significant_bits(num as u32, true);
    let db = significant_bits(den as u32, true);
    if nb < db {
        3
    } else {
        u64::from(5 + nb - db)
    }
}

/// Cycles for an unsigned divide with the given operands.
pub(crate) fn divu_cycles(num: u32, den: u32) -> u64 {
    let nb = significant_bits(num, false);
    let db = significant_bits(den, false);
    if nb < db {
        2
    } else {
        u64::from(3 + nb - db)
    }
}

/// Cycles for a taken branch.  Short forward branches from multi-byte
/// encodings hit the prefetch queue and save a cycle.
pub(crate) fn branch_taken(delta: i32, insn_len: u32) -> u64 {
    if (0..16).contains(&delta) && insn_len > 1 {
        2
    } else {
        3
    }
}
