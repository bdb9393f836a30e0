//! Software single-precision floating point.
//!
//! The hardware this models has no FPU; every operation is evaluated in
//! integer arithmetic against the raw bit patterns, so results are
//! bit-exact and independent of the host's floating-point environment.
//! Each operation follows the same pipeline:
//! 1. **Explode** both operands into sign/exponent/significand + class.
//! 2. **Screen** the class pair: NaNs, infinities, zeros, and denormals
//!    resolve without arithmetic.
//! 3. **Operate** in extended precision with guard/round/sticky bits.
//! 4. **Implode** through one shared rounding routine.
//!
//! Exception reporting goes through the floating-point status word
//! passed to every operation: cause bits describe the current operation,
//! sticky flags accumulate, and the caller decides whether anything
//! pending becomes an architectural exception.

/// Value decomposition and the rounding/packing path.
pub mod parts;

pub use parts::FpClass;

use crate::core::reg::fpsw;

use parts::{
    explode, flush_denormals, inf_bits, max_bits, raise, round_pack, zero_bits, FpParts,
    EXP_BIAS, EXP_MIN, QNAN,
};

/// Active rounding mode.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rounding {
    /// To nearest, ties to even.
    Nearest,
    /// Toward zero.
    Zero,
    /// Toward positive infinity.
    Plus,
    /// Toward negative infinity.
    Minus,
}

impl Rounding {
    /// The mode selected by a floating-point status word.
    #[inline]
    pub fn from_fpsw(st: u32) -> Self {
        match st & fpsw::RM_MASK {
            0 => Rounding::Nearest,
            1 => Rounding::Zero,
            2 => Rounding::Plus,
            _ => Rounding::Minus,
        }
    }
}

/// Outcome of a floating-point comparison.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compare {
    /// Left operand is smaller.
    Less,
    /// Operands are equal (zeros compare equal regardless of sign).
    Equal,
    /// Left operand is larger.
    Greater,
    /// At least one operand is NaN.
    Unordered,
}

/// NaN screening shared by the arithmetic operations: a signaling NaN is
/// an invalid operation, and any NaN yields the canonical quiet NaN.
fn screen_nans(a: FpParts, b: FpParts, st: &mut u32) -> Option<u32> {
    if a.class == FpClass::SignalingNan || b.class == FpClass::SignalingNan {
        raise(st, fpsw::CV);
        return Some(QNAN);
    }
    if a.class.is_nan() || b.class.is_nan() {
        return Some(QNAN);
    }
    None
}

/// Denormal screening: flushed to a signed zero when DN is set, otherwise
/// the unimplemented-processing cause fires and the result is dropped.
fn screen_denormal(p: FpParts, st: &mut u32) -> Option<FpParts> {
    if p.class != FpClass::Denormal {
        return Some(p);
    }
    if flush_denormals(*st) {
        Some(FpParts::zero(p.sign))
    } else {
        raise(st, fpsw::CE);
        None
    }
}

/// Shifts right, folding the shifted-out bits into the sticky bit.
fn shift_sticky(v: u64, n: u32) -> u64 {
    if n == 0 {
        v
    } else if n >= 64 {
        u64::from(v != 0)
    } else {
        (v >> n) | u64::from(v & ((1 << n) - 1) != 0)
    }
}

/// Re-packs an already-representable decomposed value.
fn pack_parts(p: FpParts) -> u32 {
    match p.class {
        FpClass::PosZero | FpClass::NegZero => zero_bits(p.sign),
        _ => zero_bits(p.sign) | (((p.exp + EXP_BIAS) as u32) << 23) | (p.mant & 0x007F_FFFF),
    }
}

/// Single-precision addition.
pub fn add(a: u32, b: u32, st: &mut u32) -> u32 {
    add_inner(a, b, false, st)
}

/// Single-precision subtraction.
pub fn sub(a: u32, b: u32, st: &mut u32) -> u32 {
    add_inner(a, b, true, st)
}

fn add_inner(a_bits: u32, b_bits: u32, negate_b: bool, st: &mut u32) -> u32 {
    let rm = Rounding::from_fpsw(*st);
    let a = explode(a_bits);
    let b = explode(if negate_b && !explode(b_bits).class.is_nan() {
        b_bits ^ 0x8000_0000
    } else {
        b_bits
    });
    if let Some(r) = screen_nans(a, b, st) {
        return r;
    }
    let a = match screen_denormal(a, st) {
        Some(p) => p,
        None => return 0,
    };
    let b = match screen_denormal(b, st) {
        Some(p) => p,
        None => return 0,
    };
    if a.class.is_infinity() || b.class.is_infinity() {
        if a.class.is_infinity() && b.class.is_infinity() {
            if a.sign == b.sign {
                return inf_bits(a.sign);
            }
            raise(st, fpsw::CV);
            return QNAN;
        }
        let sign = if a.class.is_infinity() { a.sign } else { b.sign };
        return inf_bits(sign);
    }
    if a.class.is_zero() && b.class.is_zero() {
        if a.sign == b.sign {
            return zero_bits(a.sign);
        }
        // Exact cancellation takes the mode's preferred zero.
        return zero_bits(rm == Rounding::Minus);
    }
    if a.class.is_zero() {
        return pack_parts(b);
    }
    if b.class.is_zero() {
        return pack_parts(a);
    }

    let mut x = (a.sign, a.exp, u64::from(a.mant) << 3);
    let mut y = (b.sign, b.exp, u64::from(b.mant) << 3);
    if (x.1, x.2) < (y.1, y.2) {
        std::mem::swap(&mut x, &mut y);
    }
    let aligned = shift_sticky(y.2, (x.1 - y.1) as u32);
    if x.0 == y.0 {
        let mut m = x.2 + aligned;
        let mut e = x.1;
        if m >= 1 << 27 {
            m = shift_sticky(m, 1);
            e += 1;
        }
        round_pack(x.0, e, m, rm, st)
    } else {
        let mut m = x.2 - aligned;
        if m == 0 {
            return zero_bits(rm == Rounding::Minus);
        }
        let mut e = x.1;
        while m < 1 << 26 {
            m <<= 1;
            e -= 1;
        }
        round_pack(x.0, e, m, rm, st)
    }
}

/// Single-precision multiplication.
pub fn mul(a_bits: u32, b_bits: u32, st: &mut u32) -> u32 {
    let rm = Rounding::from_fpsw(*st);
    let a = explode(a_bits);
    let b = explode(b_bits);
    if let Some(r) = screen_nans(a, b, st) {
        return r;
    }
    let a = match screen_denormal(a, st) {
        Some(p) => p,
        None => return 0,
    };
    let b = match screen_denormal(b, st) {
        Some(p) => p,
        None => return 0,
    };
    let sign = a.sign ^ b.sign;
    if (a.class.is_infinity() && b.class.is_zero())
        || (a.class.is_zero() && b.class.is_infinity())
    {
        raise(st, fpsw::CV);
        return QNAN;
    }
    if a.class.is_infinity() || b.class.is_infinity() {
        return inf_bits(sign);
    }
    if a.class.is_zero() || b.class.is_zero() {
        return zero_bits(sign);
    }
    let prod = u64::from(a.mant) * u64::from(b.mant);
    let mut e = a.exp + b.exp;
    let m = if prod >= 1 << 47 {
        e += 1;
        shift_sticky(prod, 21)
    } else {
        shift_sticky(prod, 20)
    };
    round_pack(sign, e, m, rm, st)
}

/// Single-precision division.
pub fn div(a_bits: u32, b_bits: u32, st: &mut u32) -> u32 {
    let rm = Rounding::from_fpsw(*st);
    let a = explode(a_bits);
    let b = explode(b_bits);
    if let Some(r) = screen_nans(a, b, st) {
        return r;
    }
    let a = match screen_denormal(a, st) {
        Some(p) => p,
        None => return 0,
    };
    let b = match screen_denormal(b, st) {
        Some(p) => p,
        None => return 0,
    };
    let sign = a.sign ^ b.sign;
    if (a.class.is_infinity() && b.class.is_infinity())
        || (a.class.is_zero() && b.class.is_zero())
    {
        raise(st, fpsw::CV);
        return QNAN;
    }
    if a.class.is_infinity() {
        return inf_bits(sign);
    }
    if b.class.is_infinity() || a.class.is_zero() {
        return zero_bits(sign);
    }
    if b.class.is_zero() {
        raise(st, fpsw::CZ);
        return inf_bits(sign);
    }
    let num = u64::from(a.mant) << 32;
    let den = u64::from(b.mant);
    let q = num / den;
    let r = num % den;
    let mut e = a.exp - b.exp;
    let mut m = if q >= 1 << 32 {
        shift_sticky(q, 6)
    } else {
        e -= 1;
        shift_sticky(q, 5)
    };
    if r != 0 {
        m |= 1;
    }
    round_pack(sign, e, m, rm, st)
}

/// Single-precision comparison.  Signaling NaNs raise the invalid cause;
/// any NaN compares unordered.
pub fn cmp(a_bits: u32, b_bits: u32, st: &mut u32) -> Compare {
    let a = explode(a_bits);
    let b = explode(b_bits);
    if a.class == FpClass::SignalingNan || b.class == FpClass::SignalingNan {
        raise(st, fpsw::CV);
        return Compare::Unordered;
    }
    if a.class.is_nan() || b.class.is_nan() {
        return Compare::Unordered;
    }
    let flatten = |bits: u32, p: FpParts, st: &mut u32| -> Option<u32> {
        match screen_denormal(p, st) {
            Some(q) if q.class.is_zero() && p.class == FpClass::Denormal => {
                Some(zero_bits(q.sign))
            }
            Some(_) => Some(bits),
            None => None,
        }
    };
    let (Some(ka), Some(kb)) = (flatten(a_bits, a, st), flatten(b_bits, b, st)) else {
        return Compare::Unordered;
    };
    let key = |bits: u32| -> i64 {
        let mag = i64::from(bits & 0x7FFF_FFFF);
        if bits & 0x8000_0000 != 0 {
            -mag
        } else {
            mag
        }
    };
    match key(ka).cmp(&key(kb)) {
        std::cmp::Ordering::Less => Compare::Less,
        std::cmp::Ordering::Equal => Compare::Equal,
        std::cmp::Ordering::Greater => Compare::Greater,
    }
}

/// Float-to-integer conversion with an explicit rounding mode.
///
/// NaNs raise the invalid cause and convert to zero; infinities and
/// out-of-range values raise it and saturate.
pub fn to_int(bits: u32, rm: Rounding, st: &mut u32) -> i32 {
    let p = explode(bits);
    match p.class {
        FpClass::QuietNan | FpClass::SignalingNan => {
            raise(st, fpsw::CV);
            return 0;
        }
        FpClass::PosInfinity => {
            raise(st, fpsw::CV);
            return i32::MAX;
        }
        FpClass::NegInfinity => {
            raise(st, fpsw::CV);
            return i32::MIN;
        }
        FpClass::PosZero | FpClass::NegZero => return 0,
        FpClass::Denormal => {
            return if flush_denormals(*st) {
                0
            } else {
                raise(st, fpsw::CE);
                0
            };
        }
        FpClass::Normal => {}
    }
    // The exact value is mant * 2^(exp - 23).
    let shift = p.exp - 23;
    if shift >= 8 {
        // Magnitude is at least 2^31; only -2^31 itself survives.
        if p.sign && p.exp == 31 && p.mant == 0x0080_0000 {
            return i32::MIN;
        }
        raise(st, fpsw::CV);
        return if p.sign { i32::MIN } else { i32::MAX };
    }
    let (mut mag, rem, half) = if shift >= 0 {
        (u64::from(p.mant) << shift, 0u64, 0u64)
    } else {
        let s = (-shift).min(63) as u32;
        let mask = (1u64 << s) - 1;
        (
            u64::from(p.mant) >> s,
            u64::from(p.mant) & mask,
            1u64 << (s - 1),
        )
    };
    if rem != 0 {
        raise(st, fpsw::CX);
        let inc = match rm {
            Rounding::Nearest => rem > half || (rem == half && mag & 1 != 0),
            Rounding::Zero => false,
            Rounding::Plus => !p.sign,
            Rounding::Minus => p.sign,
        };
        if inc {
            mag += 1;
        }
    }
    if p.sign {
        if mag > 1 << 31 {
            raise(st, fpsw::CV);
            return i32::MIN;
        }
        (mag as i64).wrapping_neg() as i32
    } else {
        if mag > (i32::MAX as u64) {
            raise(st, fpsw::CV);
            return i32::MAX;
        }
        mag as i32
    }
}

/// Integer-to-float conversion under the status word's rounding mode.
pub fn from_int(v: i32, st: &mut u32) -> u32 {
    if v == 0 {
        return 0;
    }
    let rm = Rounding::from_fpsw(*st);
    let sign = v < 0;
    let mag = u64::from(v.unsigned_abs());
    let top = 63 - mag.leading_zeros() as i32;
    let m = if top <= 26 {
        mag << (26 - top)
    } else {
        shift_sticky(mag, (top - 26) as u32)
    };
    round_pack(sign, top, m, rm, st)
}
