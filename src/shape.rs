//! Extents of an N-dimensional grid and row-major offset arithmetic.

use crate::{
    error::{check_index, Error},
    index::{write_joined, Index},
    slice::{self, Slice, Values},
};
use std::fmt;

/// The extents of an N-dimensional grid.
///
/// A shape converts between coordinate vectors ([`Index`]) and linear
/// row-major offsets: the last dimension has stride 1 and every preceding
/// dimension's stride is the product of the extents to its right.
///
/// ```
/// use dimarray::{Index, Shape};
///
/// let shape = Shape::from(vec![6, 9]);
/// assert_eq!(shape.offset(&Index::from([3, 4]))?, 31);
///
/// let mut index = Index::new();
/// shape.index(16, &mut index)?;
/// assert_eq!(index.values(), &[1, 7]);
/// # Ok::<_, dimarray::Error>(())
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    /// Creates a shape of rank zero and size zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of dimensions.
    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Resizes to `rank` dimensions, keeping the leading extents and
    /// zero-filling new ones.
    pub fn set_rank(&mut self, rank: usize) {
        self.dims.resize(rank, 0);
    }

    /// Extent of dimension `i`.
    pub fn dim(&self, i: usize) -> Result<usize, Error> {
        check_index(i, self.rank())?;
        Ok(self.dims[i])
    }

    /// Sets the extent of dimension `i`.
    pub fn set_dim(&mut self, i: usize, value: usize) -> Result<(), Error> {
        check_index(i, self.rank())?;
        self.dims[i] = value;
        Ok(())
    }

    /// All extents in order.
    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    /// Replaces all extents at once. `dims` must have exactly `rank` values.
    pub fn set_dims(&mut self, dims: &[usize]) -> Result<(), Error> {
        if dims.len() != self.rank() {
            return Err(Error::SizeMismatch { expected: self.rank(), found: dims.len() });
        }
        self.dims.copy_from_slice(dims);
        Ok(())
    }

    /// Reads the extents selected by `slice`.
    pub fn get_range(&self, slice: Slice) -> Result<Vec<usize>, Error> {
        slice::read(&self.dims, slice)
    }

    /// Writes the extents selected by `slice`.
    pub fn set_range(&mut self, slice: Slice, values: Values<usize>) -> Result<(), Error> {
        slice::write(&mut self.dims, slice, values)
    }

    /// Number of elements described by the shape.
    ///
    /// A shape of rank zero has size zero, as does any shape with a zero
    /// extent. A product exceeding `usize::MAX` saturates; use
    /// [`checked_size`](Shape::checked_size) where that matters.
    pub fn size(&self) -> usize {
        self.checked_size().unwrap_or(usize::MAX)
    }

    /// Number of elements described by the shape, or `None` if the product
    /// of the extents overflows `usize`.
    pub fn checked_size(&self) -> Option<usize> {
        match self.dims.as_slice() {
            [] => Some(0),
            dims => dims.iter().try_fold(1usize, |n, &d| n.checked_mul(d)),
        }
    }

    /// Row-major strides, one per dimension.
    ///
    /// Strides of a shape whose size overflows saturate at `usize::MAX`.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.rank()];
        for i in (0..self.rank().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1].saturating_mul(self.dims[i + 1]);
        }
        strides
    }

    /// Linear offset of the element at `index`.
    ///
    /// Fails with [`Error::RankMismatch`] if the ranks differ, with
    /// [`Error::IndexOutOfRange`] if a coordinate exceeds its extent and with
    /// [`Error::LengthOverflow`] if the size of the shape overflows `usize`.
    pub fn offset(&self, index: &Index) -> Result<usize, Error> {
        if index.rank() != self.rank() {
            return Err(Error::RankMismatch { expected: self.rank(), found: index.rank() });
        }
        self.checked_size().ok_or(Error::LengthOverflow)?;
        let strides = self.strides();
        let mut offset = 0;
        for ((&coord, &dim), stride) in index.values().iter().zip(&self.dims).zip(strides) {
            check_index(coord, dim)?;
            offset += coord * stride;
        }
        Ok(offset)
    }

    /// Writes the coordinates of linear `offset` into `index`.
    ///
    /// `index` is resized to the rank of the shape first. Fails with
    /// [`Error::IndexOutOfRange`] if `offset >= size` and with
    /// [`Error::LengthOverflow`] if the size overflows, leaving `index`
    /// untouched.
    pub fn index(&self, offset: usize, index: &mut Index) -> Result<(), Error> {
        check_index(offset, self.checked_size().ok_or(Error::LengthOverflow)?)?;
        index.set_rank(self.rank());
        let mut rest = offset;
        for (coord, &dim) in index.values_mut().iter_mut().zip(&self.dims).rev() {
            *coord = rest % dim;
            rest /= dim;
        }
        Ok(())
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self { dims: dims.to_vec() }
    }
}

impl<const N: usize> From<[usize; N]> for Shape {
    fn from(dims: [usize; N]) -> Self {
        Self { dims: dims.to_vec() }
    }
}

impl FromIterator<usize> for Shape {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self { dims: iter.into_iter().collect() }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Shape({}) [", self.rank())?;
        write_joined(f, &self.dims)?;
        write!(f, "]")
    }
}
