//! Decomposed single-precision values and the shared rounding/packing
//! path.
//!
//! Every operation explodes its operands into sign/exponent/significand
//! plus a classification, computes in extended precision with guard,
//! round, and sticky bits, and re-packs through one rounding routine so
//! overflow, underflow, and inexact reporting behave identically
//! everywhere.

use crate::core::reg::fpsw;

use super::Rounding;

/// Exponent bias of the single-precision format.
pub(crate) const EXP_BIAS: i32 = 127;

/// Smallest normal exponent (unbiased).
pub(crate) const EXP_MIN: i32 = -126;

/// Largest finite exponent (unbiased).
pub(crate) const EXP_MAX: i32 = 127;

/// Canonical quiet NaN produced for every invalid operation.
pub(crate) const QNAN: u32 = 0x7FC0_0000;

/// Classification of a decomposed value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FpClass {
    /// Normalized finite value.
    Normal,
    /// Positive zero.
    PosZero,
    /// Negative zero.
    NegZero,
    /// Positive infinity.
    PosInfinity,
    /// Negative infinity.
    NegInfinity,
    /// Subnormal finite value.
    Denormal,
    /// NaN with the quiet bit set.
    QuietNan,
    /// NaN with the quiet bit clear.
    SignalingNan,
}

impl FpClass {
    /// True for either NaN class.
    #[inline]
    pub fn is_nan(self) -> bool {
        matches!(self, FpClass::QuietNan | FpClass::SignalingNan)
    }

    /// True for either zero class.
    #[inline]
    pub fn is_zero(self) -> bool {
        matches!(self, FpClass::PosZero | FpClass::NegZero)
    }

    /// True for either infinity class.
    #[inline]
    pub fn is_infinity(self) -> bool {
        matches!(self, FpClass::PosInfinity | FpClass::NegInfinity)
    }
}

/// A decomposed single-precision value.
///
/// For `Normal`, the value is `(-1)^sign * mant * 2^(exp - 23)` with
/// `mant` in `[2^23, 2^24)` (implicit bit made explicit).  For
/// `Denormal`, `exp` is pinned to the minimum and `mant` has no implicit
/// bit.  Other classes carry only `sign`.
#[derive(Clone, Copy, Debug)]
pub(crate) struct FpParts {
    pub sign: bool,
    pub exp: i32,
    pub mant: u32,
    pub class: FpClass,
}

impl FpParts {
    /// A signed zero.
    pub(crate) fn zero(sign: bool) -> Self {
        Self {
            sign,
            exp: 0,
            mant: 0,
            class: if sign { FpClass::NegZero } else { FpClass::PosZero },
        }
    }
}

/// Splits raw bits into sign, exponent, significand, and class.
pub(crate) fn explode(bits: u32) -> FpParts {
    let sign = bits & 0x8000_0000 != 0;
    let biased = ((bits >> 23) & 0xFF) as i32;
    let frac = bits & 0x007F_FFFF;
    let (class, exp, mant) = match biased {
        0xFF if frac == 0 => (
            if sign {
                FpClass::NegInfinity
            } else {
                FpClass::PosInfinity
            },
            0,
            0,
        ),
        0xFF if frac & 0x0040_0000 != 0 => (FpClass::QuietNan, 0, frac),
        0xFF => (FpClass::SignalingNan, 0, frac),
        0 if frac == 0 => (
            if sign { FpClass::NegZero } else { FpClass::PosZero },
            0,
            0,
        ),
        0 => (FpClass::Denormal, EXP_MIN, frac),
        _ => (FpClass::Normal, biased - EXP_BIAS, frac | 0x0080_0000),
    };
    FpParts {
        sign,
        exp,
        mant,
        class,
    }
}

/// Raw bits for a signed zero.
#[inline]
pub(crate) fn zero_bits(sign: bool) -> u32 {
    if sign {
        0x8000_0000
    } else {
        0
    }
}

/// Raw bits for a signed infinity.
#[inline]
pub(crate) fn inf_bits(sign: bool) -> u32 {
    zero_bits(sign) | 0x7F80_0000
}

/// Raw bits for the largest finite magnitude with the given sign.
#[inline]
pub(crate) fn max_bits(sign: bool) -> u32 {
    zero_bits(sign) | 0x7F7F_FFFF
}

/// Records a cause bit and its sticky counterpart in the status word.
pub(crate) fn raise(st: &mut u32, causes: u32) {
    *st |= causes;
    *st |= (causes & (fpsw::CV | fpsw::CO | fpsw::CZ | fpsw::CU | fpsw::CX)) << 24;
}

/// True when denormal operands flush to zero rather than trapping.
#[inline]
pub(crate) fn flush_denormals(st: u32) -> bool {
    st & fpsw::DN != 0
}

/// Rounds and packs an extended-precision result.
///
/// The significand `mant_grs` must be normalized to `[2^26, 2^27)`; its
/// low three bits are guard, round, and sticky, and the value represented
/// is `(-1)^sign * (mant_grs / 2^26) * 2^exp`.  Handles inexact,
/// overflow (infinity or maximum-magnitude per mode), and underflow
/// (flush to signed zero; subnormal results are not generated).
pub(crate) fn round_pack(
    sign: bool,
    mut exp: i32,
    mant_grs: u64,
    rm: Rounding,
    st: &mut u32,
) -> u32 {
    debug_assert!((1 << 26..1 << 27).contains(&mant_grs));
    let mut mant = (mant_grs >> 3) as u32;
    let rem = (mant_grs & 7) as u32;
    if rem != 0 {
        raise(st, fpsw::CX);
    }
    let inc = match rm {
        Rounding::Nearest => rem > 4 || (rem == 4 && mant & 1 != 0),
        Rounding::Zero => false,
        Rounding::Plus => !sign && rem != 0,
        Rounding::Minus => sign && rem != 0,
    };
    if inc {
        mant += 1;
        if mant == 1 << 24 {
            mant >>= 1;
            exp += 1;
        }
    }
    if exp > EXP_MAX {
        raise(st, fpsw::CO | fpsw::CX);
        return match rm {
            Rounding::Nearest => inf_bits(sign),
            Rounding::Zero => max_bits(sign),
            Rounding::Plus => {
                if sign {
                    max_bits(true)
                } else {
                    inf_bits(false)
                }
            }
            Rounding::Minus => {
                if sign {
                    inf_bits(true)
                } else {
                    max_bits(false)
                }
            }
        };
    }
    if exp < EXP_MIN {
        raise(st, fpsw::CU | fpsw::CX);
        return zero_bits(sign);
    }
    zero_bits(sign) | (((exp + EXP_BIAS) as u32) << 23) | (mant & 0x007F_FFFF)
}
