//! Kind-tagged construction of reference arrays over foreign memory.
//!
//! A foreign array arrives as raw bytes plus an element-kind tag. The tag is
//! resolved to an [`ElementKind`] and the matching
//! `ReferenceBuffer<T>` + `Array<T>` pair is built for it, wrapped in an
//! [`AnyArray`] with one variant per kind.

use crate::{
    array::Array,
    buffer::{ReferenceBuffer, Storage},
    element::{Element, ElementKind, Float128},
    error::Error,
    shape::Shape,
};
use log::debug;
use std::fmt;

/// An array of any supported element kind.
pub enum AnyArray<'a> {
    /// `uint8` elements.
    UInt8(Array<'a, u8>),
    /// `int8` elements.
    Int8(Array<'a, i8>),
    /// `uint16` elements.
    UInt16(Array<'a, u16>),
    /// `int16` elements.
    Int16(Array<'a, i16>),
    /// `uint32` elements.
    UInt32(Array<'a, u32>),
    /// `int32` elements.
    Int32(Array<'a, i32>),
    /// `uint64` elements.
    UInt64(Array<'a, u64>),
    /// `int64` elements.
    Int64(Array<'a, i64>),
    /// `float32` elements.
    Float32(Array<'a, f32>),
    /// `float64` elements.
    Float64(Array<'a, f64>),
    /// `float128` elements.
    Float128(Array<'a, Float128>),
}

/// Expands `$body` once per variant with `$array` bound to the inner array.
macro_rules! each_variant {
    ($value:expr, $array:ident => $body:expr) => {
        match $value {
            AnyArray::UInt8($array) => $body,
            AnyArray::Int8($array) => $body,
            AnyArray::UInt16($array) => $body,
            AnyArray::Int16($array) => $body,
            AnyArray::UInt32($array) => $body,
            AnyArray::Int32($array) => $body,
            AnyArray::UInt64($array) => $body,
            AnyArray::Int64($array) => $body,
            AnyArray::Float32($array) => $body,
            AnyArray::Float64($array) => $body,
            AnyArray::Float128($array) => $body,
        }
    };
}

/// Expands `$body` with `$ty` bound to the Rust type storing `$kind`.
macro_rules! with_element_type {
    ($kind:expr, $ty:ident => $body:expr) => {
        match $kind {
            ElementKind::UInt8 => { type $ty = u8; $body }
            ElementKind::Int8 => { type $ty = i8; $body }
            ElementKind::UInt16 => { type $ty = u16; $body }
            ElementKind::Int16 => { type $ty = i16; $body }
            ElementKind::UInt32 => { type $ty = u32; $body }
            ElementKind::Int32 => { type $ty = i32; $body }
            ElementKind::UInt64 => { type $ty = u64; $body }
            ElementKind::Int64 => { type $ty = i64; $body }
            ElementKind::Float32 => { type $ty = f32; $body }
            ElementKind::Float64 => { type $ty = f64; $body }
            ElementKind::Float128 => { type $ty = Float128; $body }
        }
    };
}

pub(crate) use {each_variant, with_element_type};

/// Conversion between a typed array and the matching [`AnyArray`] variant.
pub trait IntoAnyArray<'a>: Element {
    /// Wraps `array` in its variant.
    fn into_any(array: Array<'a, Self>) -> AnyArray<'a>;

    /// Borrows the array if `any` is the variant for `Self`.
    fn from_any_ref<'b>(any: &'b AnyArray<'a>) -> Option<&'b Array<'a, Self>>;

    /// Mutably borrows the array if `any` is the variant for `Self`.
    fn from_any_mut<'b>(any: &'b mut AnyArray<'a>) -> Option<&'b mut Array<'a, Self>>;
}

macro_rules! impl_into_any {
    ($($ty:ty => $variant:ident),* $(,)?) => {$(
        impl<'a> IntoAnyArray<'a> for $ty {
            fn into_any(array: Array<'a, Self>) -> AnyArray<'a> {
                AnyArray::$variant(array)
            }

            fn from_any_ref<'b>(any: &'b AnyArray<'a>) -> Option<&'b Array<'a, Self>> {
                match any {
                    AnyArray::$variant(array) => Some(array),
                    _ => None,
                }
            }

            fn from_any_mut<'b>(any: &'b mut AnyArray<'a>) -> Option<&'b mut Array<'a, Self>> {
                match any {
                    AnyArray::$variant(array) => Some(array),
                    _ => None,
                }
            }
        }

        impl<'a> From<Array<'a, $ty>> for AnyArray<'a> {
            fn from(array: Array<'a, $ty>) -> Self {
                AnyArray::$variant(array)
            }
        }
    )*};
}

impl_into_any! {
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

impl<'a> AnyArray<'a> {
    /// The element kind of the wrapped array.
    pub fn element_kind(&self) -> ElementKind {
        each_variant!(self, array => array.element_kind())
    }

    /// The shape of the wrapped array.
    pub fn shape(&self) -> &Shape {
        each_variant!(self, array => array.shape())
    }

    /// Returns `true` if the wrapped array aliases external memory.
    pub fn is_reference(&self) -> bool {
        each_variant!(self, array => array.is_reference())
    }

    /// The name.
    pub fn name(&self) -> &str {
        each_variant!(self, array => array.name())
    }

    /// Sets the name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        each_variant!(self, array => array.set_name(name))
    }

    /// The physical unit.
    pub fn unit(&self) -> &str {
        each_variant!(self, array => array.unit())
    }

    /// Sets the physical unit.
    pub fn set_unit(&mut self, unit: impl Into<String>) {
        each_variant!(self, array => array.set_unit(unit))
    }

    /// The description.
    pub fn description(&self) -> &str {
        each_variant!(self, array => array.description())
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        each_variant!(self, array => array.set_description(description))
    }

    /// Borrows the wrapped array if its element type is `T`.
    pub fn downcast_ref<T: IntoAnyArray<'a>>(&self) -> Option<&Array<'a, T>> {
        T::from_any_ref(self)
    }

    /// Mutably borrows the wrapped array if its element type is `T`.
    pub fn downcast_mut<T: IntoAnyArray<'a>>(&mut self) -> Option<&mut Array<'a, T>> {
        T::from_any_mut(self)
    }
}

impl fmt::Display for AnyArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        each_variant!(self, array => fmt::Display::fmt(array, f))
    }
}

impl fmt::Debug for AnyArray<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        each_variant!(self, array => fmt::Debug::fmt(array, f))
    }
}

/// A foreign array: an element-kind tag, a shape and the raw bytes of its
/// row-major, native-endian data.
#[derive(Debug)]
pub struct ExternalArray<'a> {
    /// Element kind name, e.g. `"int32"` or `"float128"`.
    pub dtype: &'a str,
    /// Extent of each dimension.
    pub shape: Vec<usize>,
    /// The data block.
    pub data: &'a mut [u8],
}

/// Builds a reference array aliasing the data of `external`.
///
/// The kind tag selects the element type; an unknown tag fails with
/// [`Error::UnsupportedElementType`] before anything is built. The data
/// block must be aligned for the element type and hold exactly as many
/// elements as the shape describes. Metadata is attached to the returned
/// array, not to the aliased memory.
///
/// ```
/// use dimarray::{reference_array, AnyArray, ExternalArray, Index};
///
/// let mut memory = vec![0u32; 6];
/// let external = ExternalArray {
///     dtype: "uint32",
///     shape: vec![2, 3],
///     data: bytemuck::cast_slice_mut(&mut memory),
/// };
/// let mut any = reference_array(external, "frame", "counts", "detector frame")?;
/// if let AnyArray::UInt32(array) = &mut any {
///     array.set(&Index::from([1, 0]), 17)?;
/// }
/// drop(any);
/// assert_eq!(memory[3], 17);
/// # Ok::<_, dimarray::Error>(())
/// ```
pub fn reference_array<'a>(
    external: ExternalArray<'a>,
    name: impl Into<String>,
    unit: impl Into<String>,
    description: impl Into<String>,
) -> Result<AnyArray<'a>, Error> {
    let kind: ElementKind = external.dtype.parse()?;
    let shape = Shape::from(external.shape);
    debug!("generating {kind} reference array with {shape}");
    with_element_type!(kind, T => {
        let len = shape.checked_size().ok_or(Error::LengthOverflow)?;
        let buffer = ReferenceBuffer::<T>::from_bytes(external.data, len)?;
        let array = Array::from_parts(shape, Storage::from(buffer), name, unit, description)?;
        Ok(T::into_any(array))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::Index;

    #[test]
    fn dispatch_by_tag() {
        for kind in ElementKind::ALL {
            let mut memory = vec![0u128; 4];
            let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut memory);
            let len = 64 / kind.size();
            let external =
                ExternalArray { dtype: kind.name(), shape: vec![len], data: &mut bytes[..64] };
            let any = reference_array(external, "a", "b", "c").unwrap();
            assert_eq!(any.element_kind(), kind);
            assert_eq!(any.shape(), &Shape::from([len]));
            assert!(any.is_reference());
            assert_eq!((any.name(), any.unit(), any.description()), ("a", "b", "c"));
        }
    }

    #[test]
    fn unknown_tag_builds_nothing() {
        let mut memory = [0u8; 16];
        let external = ExternalArray { dtype: "complex128", shape: vec![1], data: &mut memory };
        assert_eq!(
            reference_array(external, "", "", "").unwrap_err(),
            Error::UnsupportedElementType("complex128".to_string())
        );
        assert_eq!(memory, [0; 16]);
    }

    #[test]
    fn size_checked() {
        let mut memory = [0u16; 5];
        let external = ExternalArray {
            dtype: "uint16",
            shape: vec![2, 3],
            data: bytemuck::cast_slice_mut(&mut memory),
        };
        assert_eq!(
            reference_array(external, "", "", "").unwrap_err(),
            Error::SizeMismatch { expected: 12, found: 10 }
        );
    }

    #[test]
    fn oversized_shape_rejected() {
        let mut memory = [0u8; 4];
        let external =
            ExternalArray { dtype: "uint16", shape: vec![usize::MAX, 3], data: &mut memory };
        assert_eq!(reference_array(external, "", "", "").unwrap_err(), Error::LengthOverflow);
        let external = ExternalArray { dtype: "int64", shape: vec![usize::MAX / 2], data: &mut memory };
        assert_eq!(reference_array(external, "", "", "").unwrap_err(), Error::LengthOverflow);
    }

    #[test]
    fn writes_reach_foreign_memory() {
        let mut memory = vec![0.0f64; 6];
        {
            let external = ExternalArray {
                dtype: "float64",
                shape: vec![3, 2],
                data: bytemuck::cast_slice_mut(&mut memory),
            };
            let mut any = reference_array(external, "x", "mm", "").unwrap();
            any.set_unit("um");
            assert_eq!(any.unit(), "um");
            let AnyArray::Float64(array) = &mut any else { panic!("wrong variant") };
            array.set(&Index::from([2, 1]), 4.5).unwrap();
            assert_eq!(any.to_string(), "x = [0 0 0 0 0 4.5] (um)");
        }
        assert_eq!(memory[5], 4.5);
    }

    #[test]
    fn downcast() {
        let mut any = AnyArray::from(Array::<i16>::with_shape(Shape::from([2])).unwrap());
        assert!(any.downcast_ref::<i16>().is_some());
        assert!(any.downcast_ref::<u16>().is_none());
    }
}
