//! Fixed-length typed element storage.
//!
//! Two buffer variants satisfy the same [`ElementBuffer`] contract:
//!
//! - [`Buffer`] owns its elements and frees them when dropped.
//! - [`ReferenceBuffer`] aliases a block of caller-owned memory and never
//!   allocates or frees.
//!
//! [`Storage`] holds either one and is what an [`Array`](crate::Array)
//! keeps. The caller always names the variant it constructs.

use crate::{
    element::{Element, ElementKind},
    error::{byte_len, check_index, Error},
};
use bytemuck::PodCastError;
use log::debug;
use std::{fmt, mem, slice};

/// Indexed access to a contiguous run of `T` elements.
pub trait ElementBuffer<T: Element> {
    /// All elements in order.
    fn as_slice(&self) -> &[T];

    /// All elements in order, mutably.
    fn as_mut_slice(&mut self) -> &mut [T];

    /// Number of elements.
    fn len(&self) -> usize {
        self.as_slice().len()
    }

    /// Returns `true` if the buffer holds no elements.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Kind of the stored elements.
    fn element_kind(&self) -> ElementKind {
        T::KIND
    }

    /// Size of one element in bytes.
    fn element_size(&self) -> usize {
        mem::size_of::<T>()
    }

    /// Size of all elements in bytes.
    fn mem_size(&self) -> usize {
        self.len() * self.element_size()
    }

    /// Reads element `i`.
    fn get(&self, i: usize) -> Result<T, Error> {
        check_index(i, self.len())?;
        Ok(self.as_slice()[i])
    }

    /// Overwrites element `i`.
    fn set(&mut self, i: usize, value: T) -> Result<(), Error> {
        check_index(i, self.len())?;
        self.as_mut_slice()[i] = value;
        Ok(())
    }

    /// Sets every element to `value`.
    fn fill(&mut self, value: T) {
        self.as_mut_slice().fill(value);
    }
}

/// An owning buffer of `T` elements.
///
/// ```
/// use dimarray::{Buffer, ElementBuffer, ElementKind};
///
/// let mut buffer = Buffer::<u16>::new(4);
/// buffer.set(2, 7)?;
/// assert_eq!(buffer.as_slice(), &[0, 0, 7, 0]);
/// assert_eq!(buffer.element_kind(), ElementKind::UInt16);
/// # Ok::<_, dimarray::Error>(())
/// ```
#[derive(Clone, Default, PartialEq)]
pub struct Buffer<T: Element> {
    data: Vec<T>,
}

impl<T: Element> Buffer<T> {
    /// Allocates `len` zero-initialized elements.
    pub fn new(len: usize) -> Self {
        debug!("allocating {len} elements of {}", T::KIND);
        Self { data: vec![T::zeroed(); len] }
    }

    /// Discards the contents and reallocates `len` zero-initialized
    /// elements.
    pub fn resize(&mut self, len: usize) {
        *self = Self::new(len);
    }

    /// Consumes the buffer and returns its elements.
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }
}

impl<T: Element> ElementBuffer<T> for Buffer<T> {
    fn as_slice(&self) -> &[T] {
        &self.data
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut self.data
    }
}

impl<T: Element> From<Vec<T>> for Buffer<T> {
    fn from(data: Vec<T>) -> Self {
        Self { data }
    }
}

/// A non-owning buffer aliasing caller-owned memory.
///
/// Reads and writes go straight to the aliased block: nothing is copied on
/// construction and nothing is freed on drop. The borrow `'a` ties the view
/// to the memory it aliases. Memory whose lifetime cannot be expressed as a
/// borrow can still be wrapped with
/// [`from_raw_parts`](ReferenceBuffer::from_raw_parts), which moves the
/// liveness obligation to the caller.
pub struct ReferenceBuffer<'a, T: Element> {
    data: &'a mut [T],
}

impl<'a, T: Element> ReferenceBuffer<'a, T> {
    /// Aliases `data`.
    pub fn new(data: &'a mut [T]) -> Self {
        Self { data }
    }

    /// Aliases a byte block holding `len` native-endian elements of `T`.
    ///
    /// Fails with [`Error::Misaligned`] if `bytes` is not aligned for `T`,
    /// with [`Error::SizeMismatch`] if it does not hold exactly `len`
    /// elements and with [`Error::LengthOverflow`] if `len` elements cannot
    /// fit in memory at all.
    pub fn from_bytes(bytes: &'a mut [u8], len: usize) -> Result<Self, Error> {
        let expected = byte_len(len, mem::size_of::<T>())?;
        if bytes.len() != expected {
            return Err(Error::SizeMismatch { expected, found: bytes.len() });
        }
        if bytes.is_empty() {
            return Ok(Self { data: &mut [] });
        }
        let data = bytemuck::try_cast_slice_mut(bytes)
            .map_err(|_: PodCastError| Error::Misaligned(T::KIND.name()))?;
        Ok(Self { data })
    }

    /// Aliases `len` elements starting at `ptr`.
    ///
    /// # Safety
    ///
    /// The block must stay valid for reads and writes of `len` elements of
    /// `T`, must not be freed or resized, and must not be accessed through
    /// any other path while the returned buffer (or any array or scalar
    /// built on it) is alive. `ptr` must be non-null and aligned for `T`.
    /// None of this is checked.
    pub unsafe fn from_raw_parts(ptr: *mut T, len: usize) -> Self {
        Self { data: slice::from_raw_parts_mut(ptr, len) }
    }
}

impl<T: Element> ElementBuffer<T> for ReferenceBuffer<'_, T> {
    fn as_slice(&self) -> &[T] {
        &*self.data
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        &mut *self.data
    }
}

impl<'a, T: Element> From<&'a mut [T]> for ReferenceBuffer<'a, T> {
    fn from(data: &'a mut [T]) -> Self {
        Self::new(data)
    }
}

/// The buffer held by an array: either owned or aliased.
pub enum Storage<'a, T: Element> {
    /// Exclusively owned elements.
    Owned(Buffer<T>),
    /// Elements living in caller-owned memory.
    Reference(ReferenceBuffer<'a, T>),
}

impl<T: Element> Storage<'_, T> {
    /// Returns `true` for the aliasing variant.
    pub fn is_reference(&self) -> bool {
        matches!(self, Self::Reference(_))
    }
}

impl<T: Element> ElementBuffer<T> for Storage<'_, T> {
    fn as_slice(&self) -> &[T] {
        match self {
            Self::Owned(buffer) => buffer.as_slice(),
            Self::Reference(buffer) => buffer.as_slice(),
        }
    }

    fn as_mut_slice(&mut self) -> &mut [T] {
        match self {
            Self::Owned(buffer) => buffer.as_mut_slice(),
            Self::Reference(buffer) => buffer.as_mut_slice(),
        }
    }
}

impl<T: Element> From<Buffer<T>> for Storage<'_, T> {
    fn from(buffer: Buffer<T>) -> Self {
        Self::Owned(buffer)
    }
}

impl<'a, T: Element> From<ReferenceBuffer<'a, T>> for Storage<'a, T> {
    fn from(buffer: ReferenceBuffer<'a, T>) -> Self {
        Self::Reference(buffer)
    }
}

macro_rules! impl_buffer_eq {
    ($([$($lt:lifetime),*] $lhs:ty, $rhs:ty);* $(;)?) => {$(
        impl<$($lt,)* T: Element> PartialEq<$rhs> for $lhs {
            fn eq(&self, other: &$rhs) -> bool {
                self.as_slice() == other.as_slice()
            }
        }
    )*};
}

impl_buffer_eq! {
    ['b] Buffer<T>, ReferenceBuffer<'b, T>;
    ['a] ReferenceBuffer<'a, T>, Buffer<T>;
    ['a, 'b] ReferenceBuffer<'a, T>, ReferenceBuffer<'b, T>;
    ['a, 'b] Storage<'a, T>, Storage<'b, T>;
}

macro_rules! impl_buffer_debug {
    ($($name:literal => $ty:ty),* $(,)?) => {$(
        impl<T: Element> fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.debug_struct($name)
                    .field("kind", &T::KIND)
                    .field("data", &self.as_slice())
                    .finish()
            }
        }
    )*};
}

impl_buffer_debug! {
    "Buffer" => Buffer<T>,
    "ReferenceBuffer" => ReferenceBuffer<'_, T>,
    "Storage" => Storage<'_, T>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::Float128;

    #[test]
    fn owned_is_zeroed() {
        let buffer = Buffer::<f64>::new(3);
        assert_eq!(buffer.as_slice(), &[0.0; 3]);
        assert_eq!(buffer.mem_size(), 24);
        assert_eq!(buffer.element_kind(), ElementKind::Float64);
    }

    #[test]
    fn owned_bounds() {
        let mut buffer = Buffer::<i8>::new(2);
        assert_eq!(buffer.set(1, -4), Ok(()));
        assert_eq!(buffer.get(1), Ok(-4));
        assert_eq!(buffer.get(2), Err(Error::IndexOutOfRange { index: 2, len: 2 }));
        assert_eq!(buffer.set(2, 1), Err(Error::IndexOutOfRange { index: 2, len: 2 }));
    }

    #[test]
    fn resize_discards() {
        let mut buffer = Buffer::from(vec![1u32, 2, 3]);
        buffer.resize(5);
        assert_eq!(buffer.as_slice(), &[0; 5]);
    }

    #[test]
    fn reference_writes_through() {
        let mut memory = vec![1i64, 2, 3, 4];
        {
            let mut view = ReferenceBuffer::new(&mut memory);
            assert_eq!(view.len(), 4);
            view.set(0, 10).unwrap();
            view.fill(9);
            assert_eq!(view.get(4), Err(Error::IndexOutOfRange { index: 4, len: 4 }));
        }
        assert_eq!(memory, vec![9; 4]);
    }

    #[test]
    fn reference_drop_keeps_memory() {
        let mut memory = vec![5u8; 8];
        let ptr = memory.as_mut_ptr();
        let view = unsafe { ReferenceBuffer::from_raw_parts(ptr, memory.len()) };
        assert_eq!(view.as_slice(), &[5; 8]);
        drop(view);
        assert_eq!(memory, vec![5; 8]);
    }

    #[test]
    fn reference_from_bytes() {
        let mut words = vec![0u64; 4];
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        {
            let mut view = ReferenceBuffer::<u32>::from_bytes(bytes, 8).unwrap();
            view.set(0, 0xdead_beef).unwrap();
        }
        assert_eq!(bytemuck::cast_slice::<u64, u32>(&words)[0], 0xdead_beef);

        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        assert_eq!(
            ReferenceBuffer::<u32>::from_bytes(bytes, 7).unwrap_err(),
            Error::SizeMismatch { expected: 28, found: 32 }
        );
        let bytes: &mut [u8] = bytemuck::cast_slice_mut(&mut words);
        assert_eq!(
            ReferenceBuffer::<u32>::from_bytes(&mut bytes[1..5], 1).unwrap_err(),
            Error::Misaligned("uint32")
        );
        assert_eq!(
            ReferenceBuffer::<u64>::from_bytes(&mut [], usize::MAX / 4).unwrap_err(),
            Error::LengthOverflow
        );
    }

    #[test]
    fn equality_across_variants() {
        let owned = Buffer::from(vec![Float128::from(1.0), Float128::from(2.0)]);
        let mut memory = vec![Float128::from(1.0), Float128::from(2.0)];
        let view = ReferenceBuffer::new(&mut memory);
        assert!(owned == view);
        assert!(view == owned);
        assert!(Storage::from(owned.clone()) == Storage::from(view));
        assert!(owned != Buffer::from(vec![Float128::from(1.0)]));
    }
}
