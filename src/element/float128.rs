use bytemuck::{Pod, Zeroable};
use num_traits::ToPrimitive;
use std::{cmp::Ordering, fmt};

/// Exponent bias of the x87 extended format.
const BIAS: i32 = 16383;
/// Largest biased exponent, reserved for infinities and NaN.
const EXP_MAX: u16 = 0x7fff;
/// Explicit integer bit of the 64-bit significand.
const INTEGER_BIT: u64 = 1 << 63;
/// Bits of the 16-byte cell that hold the value; the rest is padding.
const VALUE_MASK: u128 = (1 << 80) - 1;

/// A 16-byte floating-point cell.
///
/// The cell holds an x87 80-bit extended precision value in its low ten
/// bytes (little-endian) followed by six bytes of padding. This is the
/// in-memory layout of a C `long double` on x86-64 Linux and of numpy's
/// `float128` on that platform, so reference buffers over such memory can be
/// read and written without conversion.
///
/// The layout is x86 only. On other targets numpy's `float128` is a
/// different format (IEEE binary128 on aarch64 Linux, a plain `f64` on
/// macOS and Windows), and a reference buffer over such memory misreads
/// every value. Foreign `float128` data must come from an x86 producer.
///
/// Arithmetic is not provided. Values convert to and from `f64`; the
/// conversion from `f64` is exact.
#[derive(Clone, Copy, Default, Pod, Zeroable)]
#[repr(transparent)]
pub struct Float128(u128);

impl Float128 {
    /// Positive zero.
    pub const ZERO: Self = Self(0);

    /// Creates a cell from its raw 16-byte representation.
    pub const fn from_bits(bits: u128) -> Self {
        Self(bits)
    }

    /// The raw 16-byte representation, padding included.
    pub const fn to_bits(self) -> u128 {
        self.0
    }

    fn from_parts(negative: bool, exponent: u16, significand: u64) -> Self {
        let sign_exp = (u128::from(negative) << 15) | u128::from(exponent);
        Self((sign_exp << 64) | u128::from(significand))
    }

    fn parts(self) -> (bool, u16, u64) {
        let sign_exp = (self.0 >> 64) as u16;
        (sign_exp & 0x8000 != 0, sign_exp & EXP_MAX, self.0 as u64)
    }

    /// Converts an `f64` exactly.
    pub fn from_f64(value: f64) -> Self {
        let bits = value.to_bits();
        let negative = bits >> 63 != 0;
        let exp = ((bits >> 52) & 0x7ff) as i32;
        let frac = bits & ((1 << 52) - 1);
        match exp {
            0x7ff if frac == 0 => Self::from_parts(negative, EXP_MAX, INTEGER_BIT),
            0x7ff => Self::from_parts(negative, EXP_MAX, INTEGER_BIT | (1 << 62)),
            0 if frac == 0 => Self::from_parts(negative, 0, 0),
            0 => {
                // Subnormal f64 values are normal in the extended format.
                let shift = frac.leading_zeros() as i32;
                let exponent = 1 - 1075 + 63 - shift + BIAS;
                Self::from_parts(negative, exponent as u16, frac << shift)
            }
            _ => {
                let exponent = exp - 1023 + BIAS;
                Self::from_parts(negative, exponent as u16, INTEGER_BIT | (frac << 11))
            }
        }
    }

    /// Converts to the nearest `f64`.
    pub fn to_f64(self) -> f64 {
        let (negative, exponent, significand) = self.parts();
        let sign = if negative { -1.0 } else { 1.0 };
        if exponent == EXP_MAX {
            return if significand << 1 == 0 { sign * f64::INFINITY } else { f64::NAN };
        }
        if significand == 0 {
            return sign * 0.0;
        }
        // Denormals share the exponent of the smallest normal.
        let exponent = i32::from(exponent.max(1)) - BIAS - 63;
        sign * scale(significand as f64, exponent)
    }

    /// Returns `true` for a NaN value.
    pub fn is_nan(self) -> bool {
        let (_, exponent, significand) = self.parts();
        exponent == EXP_MAX && significand << 1 != 0
    }
}

/// Computes `value * 2^exp` without intermediate overflow.
fn scale(mut value: f64, mut exp: i32) -> f64 {
    let step_up = f64::from_bits(0x7fe << 52); // 2^1023
    let step_down = f64::from_bits(1 << 52); // 2^-1022
    while exp > 1023 {
        value *= step_up;
        exp -= 1023;
    }
    while exp < -1022 {
        value *= step_down;
        exp += 1022;
    }
    value * f64::from_bits(((exp + 1023) as u64) << 52)
}

impl From<f64> for Float128 {
    fn from(value: f64) -> Self {
        Self::from_f64(value)
    }
}

impl From<f32> for Float128 {
    fn from(value: f32) -> Self {
        Self::from_f64(f64::from(value))
    }
}

impl From<Float128> for f64 {
    fn from(value: Float128) -> Self {
        value.to_f64()
    }
}

impl PartialEq for Float128 {
    /// Compares the value bits, ignoring padding. NaN is unequal to
    /// everything and zeros of either sign are equal.
    fn eq(&self, other: &Self) -> bool {
        if self.is_nan() || other.is_nan() {
            return false;
        }
        let (a, b) = (self.0 & VALUE_MASK, other.0 & VALUE_MASK);
        a == b || (a | b) & !(1 << 79) == 0
    }
}

impl PartialOrd for Float128 {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        if self == other {
            return Some(Ordering::Equal);
        }
        Float128::to_f64(*self).partial_cmp(&Float128::to_f64(*other))
    }
}

impl ToPrimitive for Float128 {
    fn to_i64(&self) -> Option<i64> {
        Float128::to_f64(*self).to_i64()
    }

    fn to_u64(&self) -> Option<u64> {
        Float128::to_f64(*self).to_u64()
    }

    fn to_f64(&self) -> Option<f64> {
        Some(Float128::to_f64(*self))
    }
}

impl fmt::Debug for Float128 {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Float128({:?})", Float128::to_f64(*self))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_has_canonical_bits() {
        // 1.0 as long double: exponent 0x3fff, significand 0x8000000000000000.
        assert_eq!(Float128::from_f64(1.0).to_bits(), 0x3fff_8000_0000_0000_0000);
        assert_eq!(Float128::from_f64(-2.0).to_bits(), 0xc000_8000_0000_0000_0000);
    }

    #[test]
    fn f64_values_survive_conversion() {
        for value in [
            0.0,
            1.5,
            -3.25,
            1e300,
            -1e-300,
            f64::MAX,
            f64::MIN_POSITIVE,
            f64::from_bits(1),
            f64::from_bits(0x000f_ffff_ffff_ffff),
            std::f64::consts::PI,
        ] {
            assert_eq!(Float128::from_f64(value).to_f64(), value, "{value}");
        }
    }

    #[test]
    fn special_values() {
        assert_eq!(Float128::from_f64(f64::INFINITY).to_f64(), f64::INFINITY);
        assert_eq!(Float128::from_f64(f64::NEG_INFINITY).to_f64(), f64::NEG_INFINITY);
        assert!(Float128::from_f64(f64::NAN).is_nan());
        assert!(Float128::from_f64(f64::NAN).to_f64().is_nan());
        assert_eq!(Float128::from_f64(-0.0), Float128::ZERO);
    }

    #[test]
    fn padding_is_ignored() {
        let padded = Float128::from_bits(Float128::from_f64(2.5).to_bits() | (0xdead << 96));
        assert_eq!(padded, Float128::from_f64(2.5));
        assert_eq!(padded.to_f64(), 2.5);
    }

    #[test]
    fn out_of_f64_range() {
        let huge = Float128::from_bits(0x7ffe_8000_0000_0000_0000);
        assert_eq!(huge.to_f64(), f64::INFINITY);
        let tiny = Float128::from_bits(0x0001_8000_0000_0000_0000);
        assert_eq!(tiny.to_f64(), 0.0);
    }

    #[test]
    fn integer_conversions() {
        let value = Float128::from_f64(-7.75);
        assert_eq!(ToPrimitive::to_i64(&value), Some(-7));
        assert_eq!(ToPrimitive::to_u64(&value), None);
        assert_eq!(ToPrimitive::to_u64(&Float128::from_f64(42.5)), Some(42));
        assert_eq!(ToPrimitive::to_f64(&value), Some(-7.75));
        assert_eq!(ToPrimitive::to_i64(&Float128::from_f64(f64::NAN)), None);
    }

    #[test]
    fn ordering_and_debug() {
        assert!(Float128::from_f64(1.0) < Float128::from_f64(2.0));
        assert_eq!(format!("{:?}", Float128::from_f64(0.5)), "Float128(0.5)");
    }
}
