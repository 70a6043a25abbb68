//! A [`Shape`] bound to element storage plus descriptive metadata.

use crate::{
    buffer::{Buffer, ElementBuffer, ReferenceBuffer, Storage},
    element::{format_value, Element, ElementKind},
    error::{byte_len, Error},
    index::Index,
    shape::Shape,
    slice::{self, Slice, Values},
};
use log::debug;
use std::fmt;

/// An N-dimensional array of `T` with a name, a unit and a description.
///
/// The array keeps the invariant `buffer.len() == shape.size()` whenever a
/// buffer is installed: [`set_buffer`](Array::set_buffer) and
/// [`set_reference_buffer`](Array::set_reference_buffer) reject buffers of
/// any other length. The shape can be replaced on its own; element access
/// then fails wherever the stale buffer no longer covers the new shape.
///
/// The lifetime `'a` is that of the memory aliased by a reference buffer.
/// Arrays that only ever own their storage are `Array<'static, T>`.
///
/// ```
/// use dimarray::{Array, Buffer, Index, Shape};
///
/// let mut array = Array::<f32>::new();
/// array.set_shape(Shape::from([2, 5]));
/// assert!(array.set_buffer(Buffer::new(2)).is_err());
/// array.set_buffer(Buffer::new(10))?;
///
/// array.set(&Index::from([1, 3]), 2.5)?;
/// assert_eq!(array.get_linear(8)?, 2.5);
/// # Ok::<_, dimarray::Error>(())
/// ```
pub struct Array<'a, T: Element> {
    shape: Shape,
    storage: Option<Storage<'a, T>>,
    name: String,
    unit: String,
    description: String,
}

impl<'a, T: Element> Array<'a, T> {
    /// Creates an array with a rank-zero shape, no buffer and empty
    /// metadata.
    pub fn new() -> Self {
        Self {
            shape: Shape::new(),
            storage: None,
            name: String::new(),
            unit: String::new(),
            description: String::new(),
        }
    }

    /// Creates an array of `shape` with a freshly allocated owning buffer.
    ///
    /// Fails with [`Error::LengthOverflow`] if the shape describes more
    /// elements than fit in memory.
    pub fn with_shape(shape: Shape) -> Result<Self, Error> {
        let mut array = Self::new();
        array.shape = shape;
        array.allocate()?;
        Ok(array)
    }

    /// Assembles an array from a shape, a buffer of either variant and its
    /// metadata.
    pub fn from_parts(
        shape: Shape,
        storage: impl Into<Storage<'a, T>>,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Result<Self, Error> {
        let mut array = Self::new();
        array.shape = shape;
        array.install(storage.into())?;
        array.name = name.into();
        array.unit = unit.into();
        array.description = description.into();
        Ok(array)
    }

    /// The element kind.
    pub fn element_kind(&self) -> ElementKind {
        T::KIND
    }

    /// The shape.
    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// Replaces the shape. The buffer is left as it is.
    pub fn set_shape(&mut self, shape: Shape) {
        self.shape = shape;
    }

    /// Number of elements described by the shape.
    pub fn size(&self) -> usize {
        self.shape.size()
    }

    /// The installed buffer, if any.
    pub fn buffer(&self) -> Option<&Storage<'a, T>> {
        self.storage.as_ref()
    }

    /// Installs an owning buffer. Fails with [`Error::SizeMismatch`] unless
    /// its length equals the shape's size.
    pub fn set_buffer(&mut self, buffer: Buffer<T>) -> Result<(), Error> {
        self.install(Storage::Owned(buffer))
    }

    /// Installs a reference buffer. Fails with [`Error::SizeMismatch`]
    /// unless its length equals the shape's size.
    pub fn set_reference_buffer(&mut self, buffer: ReferenceBuffer<'a, T>) -> Result<(), Error> {
        self.install(Storage::Reference(buffer))
    }

    fn install(&mut self, storage: Storage<'a, T>) -> Result<(), Error> {
        let size = self.shape.checked_size().ok_or(Error::LengthOverflow)?;
        if storage.len() != size {
            return Err(Error::SizeMismatch { expected: size, found: storage.len() });
        }
        if let Some(old) = &self.storage {
            debug!(
                "replacing {} buffer of {} elements",
                if old.is_reference() { "reference" } else { "owned" },
                old.len()
            );
        }
        self.storage = Some(storage);
        Ok(())
    }

    /// Removes and returns the installed buffer.
    pub fn take_buffer(&mut self) -> Option<Storage<'a, T>> {
        self.storage.take()
    }

    /// Installs a fresh zeroed owning buffer sized to the current shape,
    /// dropping any previous buffer.
    ///
    /// Fails with [`Error::LengthOverflow`], keeping the previous buffer, if
    /// the shape describes more elements than fit in memory.
    pub fn allocate(&mut self) -> Result<(), Error> {
        let size = self.shape.checked_size().ok_or(Error::LengthOverflow)?;
        byte_len(size, T::KIND.size())?;
        self.storage = Some(Storage::Owned(Buffer::new(size)));
        Ok(())
    }

    /// Returns `true` if a buffer is installed.
    pub fn is_allocated(&self) -> bool {
        self.storage.is_some()
    }

    /// Returns `true` if the installed buffer aliases external memory.
    pub fn is_reference(&self) -> bool {
        self.storage.as_ref().is_some_and(Storage::is_reference)
    }

    fn storage(&self) -> Result<&Storage<'a, T>, Error> {
        self.storage.as_ref().ok_or(Error::NotAllocated)
    }

    fn storage_mut(&mut self) -> Result<&mut Storage<'a, T>, Error> {
        self.storage.as_mut().ok_or(Error::NotAllocated)
    }

    /// All elements in row-major order.
    pub fn as_slice(&self) -> Result<&[T], Error> {
        Ok(self.storage()?.as_slice())
    }

    /// Reads the element at `index`.
    pub fn get(&self, index: &Index) -> Result<T, Error> {
        let offset = self.shape.offset(index)?;
        self.get_linear(offset)
    }

    /// Overwrites the element at `index`.
    pub fn set(&mut self, index: &Index, value: T) -> Result<(), Error> {
        let offset = self.shape.offset(index)?;
        self.set_linear(offset, value)
    }

    /// Reads the element at linear offset `i`.
    pub fn get_linear(&self, i: usize) -> Result<T, Error> {
        self.storage()?.get(i)
    }

    /// Overwrites the element at linear offset `i`.
    pub fn set_linear(&mut self, i: usize, value: T) -> Result<(), Error> {
        self.storage_mut()?.set(i, value)
    }

    /// Reads the elements selected by `slice` in linear order.
    pub fn get_range(&self, slice: Slice) -> Result<Vec<T>, Error> {
        slice::read(self.storage()?.as_slice(), slice)
    }

    /// Writes the elements selected by `slice` in linear order.
    pub fn set_range(&mut self, slice: Slice, values: Values<T>) -> Result<(), Error> {
        slice::write(self.storage_mut()?.as_mut_slice(), slice, values)
    }

    /// Sets every element to `value`.
    pub fn fill(&mut self, value: T) -> Result<(), Error> {
        self.storage_mut()?.fill(value);
        Ok(())
    }

    /// The name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Sets the name.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// The physical unit.
    pub fn unit(&self) -> &str {
        &self.unit
    }

    /// Sets the physical unit.
    pub fn set_unit(&mut self, unit: impl Into<String>) {
        self.unit = unit.into();
    }

    /// The description.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Sets the description.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }
}

impl<T: Element> Default for Array<'_, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Element> fmt::Display for Array<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = [", self.name)?;
        let values = self.storage.as_ref().map(|storage| storage.as_slice()).unwrap_or_default();
        for (i, value) in values.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            format_value(value, f)?;
        }
        write!(f, "] ({})", self.unit)
    }
}

impl<T: Element> fmt::Debug for Array<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("Array")
            .field("shape", &self.shape)
            .field("storage", &self.storage)
            .field("name", &self.name)
            .field("unit", &self.unit)
            .field("description", &self.description)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_empty() {
        let array = Array::<u8>::new();
        assert_eq!(array.shape(), &Shape::new());
        assert_eq!(array.size(), 0);
        assert!(!array.is_allocated());
        assert_eq!(array.get(&Index::new()), Err(Error::NotAllocated));
    }

    #[test]
    fn buffer_size_checked() {
        let mut array = Array::<i32>::new();
        array.set_shape(Shape::from([2, 5]));
        assert_eq!(
            array.set_buffer(Buffer::new(2)),
            Err(Error::SizeMismatch { expected: 10, found: 2 })
        );
        assert!(!array.is_allocated());
        array.set_buffer(Buffer::new(10)).unwrap();
        assert!(array.is_allocated());
        assert!(!array.is_reference());
    }

    #[test]
    fn allocate_replaces_buffer() {
        let mut array = Array::with_shape(Shape::from([3])).unwrap();
        array.fill(4u64).unwrap();
        array.set_shape(Shape::from([2, 2]));
        assert_eq!(array.get_linear(3), Err(Error::IndexOutOfRange { index: 3, len: 3 }));
        array.allocate().unwrap();
        assert_eq!(array.as_slice().unwrap(), &[0; 4]);
    }

    #[test]
    fn oversized_shape_fails_cleanly() {
        assert_eq!(
            Array::<u8>::with_shape(Shape::from([usize::MAX, 2])).unwrap_err(),
            Error::LengthOverflow
        );
        assert_eq!(
            Array::<u64>::with_shape(Shape::from([usize::MAX / 4])).unwrap_err(),
            Error::LengthOverflow
        );

        let mut array = Array::with_shape(Shape::from([2])).unwrap();
        array.fill(1u8).unwrap();
        array.set_shape(Shape::from([usize::MAX, 3]));
        assert_eq!(array.allocate(), Err(Error::LengthOverflow));
        assert_eq!(array.set_buffer(Buffer::new(2)), Err(Error::LengthOverflow));
        assert_eq!(array.as_slice().unwrap(), &[1, 1]);
    }

    #[test]
    fn indexed_access() {
        let mut array = Array::<i16>::with_shape(Shape::from([6, 9])).unwrap();
        array.set(&Index::from([3, 4]), -7).unwrap();
        assert_eq!(array.get_linear(31), Ok(-7));
        assert_eq!(array.get(&Index::from([3, 4])), Ok(-7));
        assert_eq!(
            array.get(&Index::from([3])),
            Err(Error::RankMismatch { expected: 2, found: 1 })
        );
        assert_eq!(
            array.set(&Index::from([0, 9]), 1),
            Err(Error::IndexOutOfRange { index: 9, len: 9 })
        );
    }

    #[test]
    fn reference_storage_aliases() {
        let mut memory = vec![0.0f64; 6];
        {
            let mut array = Array::from_parts(
                Shape::from([2, 3]),
                ReferenceBuffer::new(&mut memory),
                "temperature",
                "K",
                "sample temperature",
            )
            .unwrap();
            assert!(array.is_reference());
            array.set(&Index::from([1, 2]), 300.5).unwrap();
            array.set_range(Slice::new(0, 3, 1), Values::Broadcast(1.0)).unwrap();
            assert_eq!(array.name(), "temperature");
        }
        assert_eq!(memory, vec![1.0, 1.0, 1.0, 0.0, 0.0, 300.5]);
    }

    #[test]
    fn metadata() {
        let mut array = Array::<u8>::new();
        array.set_name("counts");
        array.set_unit("cps");
        array.set_description("detector counts");
        assert_eq!(array.name(), "counts");
        assert_eq!(array.unit(), "cps");
        assert_eq!(array.description(), "detector counts");
    }

    #[test]
    fn display() {
        let mut array = Array::from_parts(
            Shape::from([3]),
            Buffer::from(vec![0.5f32, 2.0, 1e7]),
            "x",
            "m",
            "",
        )
        .unwrap();
        assert_eq!(array.to_string(), "x = [0.5 2 1e+07] (m)");
        array.take_buffer();
        assert_eq!(array.to_string(), "x = [] (m)");
    }
}
