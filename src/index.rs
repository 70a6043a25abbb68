//! Coordinate vectors into a [`Shape`](crate::Shape).

use crate::{
    error::{check_index, Error},
    slice::{self, Slice, Values},
};
use std::fmt;

/// An ordered tuple of non-negative coordinates.
///
/// The rank of an index can be changed at any time with
/// [`set_rank`](Index::set_rank); existing leading coordinates survive and new
/// trailing coordinates start at zero.
///
/// ```
/// use dimarray::Index;
///
/// let mut index = Index::from(vec![3, 4]);
/// index.set_rank(3);
/// assert_eq!(index.values(), &[3, 4, 0]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Index {
    values: Vec<usize>,
}

impl Index {
    /// Creates an index of rank zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an index of rank `rank` with every coordinate zero.
    pub fn zeros(rank: usize) -> Self {
        Self { values: vec![0; rank] }
    }

    /// Number of coordinates.
    pub fn rank(&self) -> usize {
        self.values.len()
    }

    /// Resizes to `rank` coordinates, keeping the leading values and
    /// zero-filling new ones.
    pub fn set_rank(&mut self, rank: usize) {
        self.values.resize(rank, 0);
    }

    /// Reads coordinate `i`.
    pub fn get(&self, i: usize) -> Result<usize, Error> {
        check_index(i, self.rank())?;
        Ok(self.values[i])
    }

    /// Overwrites coordinate `i`.
    pub fn set(&mut self, i: usize, value: usize) -> Result<(), Error> {
        check_index(i, self.rank())?;
        self.values[i] = value;
        Ok(())
    }

    /// All coordinates in order.
    pub fn values(&self) -> &[usize] {
        &self.values
    }

    /// Reads the coordinates selected by `slice`.
    pub fn get_range(&self, slice: Slice) -> Result<Vec<usize>, Error> {
        slice::read(&self.values, slice)
    }

    /// Writes the coordinates selected by `slice`.
    pub fn set_range(&mut self, slice: Slice, values: Values<usize>) -> Result<(), Error> {
        slice::write(&mut self.values, slice, values)
    }

    /// Increments coordinate `i` by one.
    pub fn inc(&mut self, i: usize) -> Result<(), Error> {
        let value = self.get(i)?;
        self.values[i] = value.checked_add(1).ok_or(Error::CoordinateOverflow(i))?;
        Ok(())
    }

    /// Decrements coordinate `i` by one.
    pub fn dec(&mut self, i: usize) -> Result<(), Error> {
        let value = self.get(i)?;
        self.values[i] = value.checked_sub(1).ok_or(Error::CoordinateUnderflow(i))?;
        Ok(())
    }

    pub(crate) fn values_mut(&mut self) -> &mut [usize] {
        &mut self.values
    }
}

impl From<Vec<usize>> for Index {
    fn from(values: Vec<usize>) -> Self {
        Self { values }
    }
}

impl From<&[usize]> for Index {
    fn from(values: &[usize]) -> Self {
        Self { values: values.to_vec() }
    }
}

impl<const N: usize> From<[usize; N]> for Index {
    fn from(values: [usize; N]) -> Self {
        Self { values: values.to_vec() }
    }
}

impl FromIterator<usize> for Index {
    fn from_iter<I: IntoIterator<Item = usize>>(iter: I) -> Self {
        Self { values: iter.into_iter().collect() }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Index ({}) [", self.rank())?;
        write_joined(f, &self.values)?;
        write!(f, "]")
    }
}

/// Writes `values` separated by single spaces.
pub(crate) fn write_joined<T: fmt::Display>(f: &mut fmt::Formatter, values: &[T]) -> fmt::Result {
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            f.write_str(" ")?;
        }
        value.fmt(f)?;
    }
    Ok(())
}
