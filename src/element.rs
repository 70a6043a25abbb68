//! Element kinds and the Rust types that store them.
mod float128;

pub use self::float128::Float128;
use crate::error::Error;
use bytemuck::Pod;
use num_traits::ToPrimitive;
use std::{fmt, str::FromStr};

/// The numeric representation of one buffer element.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    /// 1-byte unsigned integer.
    UInt8,
    /// 1-byte signed integer.
    Int8,
    /// 2-byte unsigned integer.
    UInt16,
    /// 2-byte signed integer.
    Int16,
    /// 4-byte unsigned integer.
    UInt32,
    /// 4-byte signed integer.
    Int32,
    /// 8-byte unsigned integer.
    UInt64,
    /// 8-byte signed integer.
    Int64,
    /// 4-byte IEEE float.
    Float32,
    /// 8-byte IEEE float.
    Float64,
    /// 16-byte extended precision float, see [`Float128`].
    Float128,
}

/// How values of an [`ElementKind`] are formatted.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Category {
    /// Unsigned decimal.
    Unsigned,
    /// Signed decimal.
    Signed,
    /// `%g`-style general decimal.
    Float,
}

impl ElementKind {
    /// Every supported kind.
    pub const ALL: [ElementKind; 11] = [
        Self::UInt8,
        Self::Int8,
        Self::UInt16,
        Self::Int16,
        Self::UInt32,
        Self::Int32,
        Self::UInt64,
        Self::Int64,
        Self::Float32,
        Self::Float64,
        Self::Float128,
    ];

    /// Canonical lowercase name, e.g. `"uint16"` or `"float64"`.
    pub const fn name(self) -> &'static str {
        match self {
            Self::UInt8 => "uint8",
            Self::Int8 => "int8",
            Self::UInt16 => "uint16",
            Self::Int16 => "int16",
            Self::UInt32 => "uint32",
            Self::Int32 => "int32",
            Self::UInt64 => "uint64",
            Self::Int64 => "int64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Float128 => "float128",
        }
    }

    /// Size of one element in bytes.
    pub const fn size(self) -> usize {
        match self {
            Self::UInt8 | Self::Int8 => 1,
            Self::UInt16 | Self::Int16 => 2,
            Self::UInt32 | Self::Int32 | Self::Float32 => 4,
            Self::UInt64 | Self::Int64 | Self::Float64 => 8,
            Self::Float128 => 16,
        }
    }

    /// Formatting category.
    pub const fn category(self) -> Category {
        match self {
            Self::UInt8 | Self::UInt16 | Self::UInt32 | Self::UInt64 => Category::Unsigned,
            Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64 => Category::Signed,
            Self::Float32 | Self::Float64 | Self::Float128 => Category::Float,
        }
    }

    /// Type character used in `.npy` descriptors.
    const fn type_char(self) -> char {
        match self.category() {
            Category::Unsigned => 'u',
            Category::Signed => 'i',
            Category::Float => 'f',
        }
    }

    /// `.npy` type descriptor in native byte order, e.g. `"|u1"` or `"<f8"`
    /// on a little-endian target.
    pub fn descriptor(self) -> String {
        let order = if self.size() == 1 { '|' } else { NATIVE_ORDER };
        format!("{order}{}{}", self.type_char(), self.size())
    }

    /// Looks up a kind from its type character and byte size.
    pub(crate) fn from_type_and_size(type_char: char, size: usize) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.type_char() == type_char && kind.size() == size)
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ElementKind {
    type Err = Error;

    /// Parses a canonical kind name. Anything else fails with
    /// [`Error::UnsupportedElementType`].
    fn from_str(s: &str) -> Result<Self, Error> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| Error::UnsupportedElementType(s.to_string()))
    }
}

/// `.npy` byte-order character of the target.
pub(crate) const NATIVE_ORDER: char = if cfg!(target_endian = "little") { '<' } else { '>' };

mod private {
    pub trait Sealed {}
}

/// A Rust type that stores elements of one [`ElementKind`].
///
/// Implemented for the fixed-size integers up to 64 bits, `f32`, `f64` and
/// [`Float128`]. The trait is sealed.
pub trait Element: Pod + Default + PartialEq + ToPrimitive + fmt::Debug + private::Sealed {
    /// The kind stored by this type.
    const KIND: ElementKind;
}

macro_rules! impl_element {
    ($($ty:ty => $kind:ident),* $(,)?) => {$(
        impl private::Sealed for $ty {}
        impl Element for $ty {
            const KIND: ElementKind = ElementKind::$kind;
        }
    )*};
}

impl_element! {
    u8 => UInt8,
    i8 => Int8,
    u16 => UInt16,
    i16 => Int16,
    u32 => UInt32,
    i32 => Int32,
    u64 => UInt64,
    i64 => Int64,
    f32 => Float32,
    f64 => Float64,
    Float128 => Float128,
}

/// Writes `value` the way its kind's category prescribes.
pub(crate) fn format_value<T: Element>(value: &T, f: &mut fmt::Formatter) -> fmt::Result {
    match T::KIND.category() {
        Category::Unsigned => match value.to_u64() {
            Some(v) => write!(f, "{v}"),
            None => Err(fmt::Error),
        },
        Category::Signed => match value.to_i64() {
            Some(v) => write!(f, "{v}"),
            None => Err(fmt::Error),
        },
        Category::Float => match value.to_f64() {
            Some(v) => f.write_str(&format_general(v)),
            None => Err(fmt::Error),
        },
    }
}

/// Significant digits of the general float format.
const GENERAL_PRECISION: i32 = 6;

/// Formats `value` like C's `%g`: six significant digits, trailing zeros
/// removed, exponent notation below `1e-4` or from `1e6` on.
pub fn format_general(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value < 0.0 { "-inf" } else { "inf" }.to_string();
    }
    if value == 0.0 {
        return if value.is_sign_negative() { "-0" } else { "0" }.to_string();
    }
    let precision = (GENERAL_PRECISION - 1) as usize;
    let scientific = format!("{value:.precision$e}");
    let (mantissa, exponent) = scientific.split_once('e').unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);
    if (-4..GENERAL_PRECISION).contains(&exponent) {
        let decimals = (GENERAL_PRECISION - 1 - exponent) as usize;
        trim_fraction(&format!("{value:.decimals$}")).to_string()
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{sign}{:02}", trim_fraction(mantissa), exponent.abs())
    }
}

/// Strips trailing zeros after a decimal point, and the point itself.
fn trim_fraction(s: &str) -> &str {
    if s.contains('.') {
        s.trim_end_matches('0').trim_end_matches('.')
    } else {
        s
    }
}
