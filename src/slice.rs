//! Ranged access over a contiguous run of positions.
//!
//! [`Slice`] selects the positions `start, start + step, ...` below `stop`.
//! It backs the ranged readers and writers of [`Shape`](crate::Shape),
//! [`Index`](crate::Index) and [`Array`](crate::Array).

use crate::error::Error;
use std::{fmt, ops::Range};

/// A `start:stop:step` selection of positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slice {
    /// First selected position.
    pub start: usize,
    /// Exclusive upper bound.
    pub stop: usize,
    /// Distance between selected positions. Must be non-zero.
    pub step: usize,
}

impl Slice {
    /// Creates a selection with an explicit step.
    pub const fn new(start: usize, stop: usize, step: usize) -> Self {
        Self { start, stop, step }
    }

    /// Number of selected positions.
    ///
    /// Returns `0` for an empty run or a zero step.
    pub fn len(&self) -> usize {
        if self.step == 0 || self.start >= self.stop {
            0
        } else {
            (self.stop - self.start - 1) / self.step + 1
        }
    }

    /// Returns `true` if no position is selected.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Iterates over the selected positions after checking them against
    /// `len`.
    pub(crate) fn positions(&self, len: usize) -> Result<impl Iterator<Item = usize>, Error> {
        if self.step == 0 {
            return Err(Error::ZeroStep);
        }
        let count = self.len();
        if count > 0 {
            let last = self.start + (count - 1) * self.step;
            crate::error::check_index(last, len)?;
        }
        Ok((self.start..self.stop).step_by(self.step))
    }
}

impl From<Range<usize>> for Slice {
    fn from(range: Range<usize>) -> Self {
        Self::new(range.start, range.end, 1)
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}

/// Values written by a ranged setter.
#[derive(Clone, Debug, PartialEq)]
pub enum Values<T> {
    /// One value written to every selected position.
    Broadcast(T),
    /// One value per selected position, in order.
    Each(Vec<T>),
}

impl<T> From<Vec<T>> for Values<T> {
    fn from(values: Vec<T>) -> Self {
        Self::Each(values)
    }
}

impl<T: Clone> From<&[T]> for Values<T> {
    fn from(values: &[T]) -> Self {
        Self::Each(values.to_vec())
    }
}

/// Collects the selected elements of `data`.
pub(crate) fn read<T: Copy>(data: &[T], slice: Slice) -> Result<Vec<T>, Error> {
    Ok(slice.positions(data.len())?.map(|i| data[i]).collect())
}

/// Writes `values` to the selected elements of `data`.
///
/// Nothing is written unless every position and the value count check out.
pub(crate) fn write<T: Copy>(data: &mut [T], slice: Slice, values: Values<T>) -> Result<(), Error> {
    let positions = slice.positions(data.len())?;
    match values {
        Values::Broadcast(value) => positions.for_each(|i| data[i] = value),
        Values::Each(values) => {
            if values.len() != slice.len() {
                return Err(Error::SizeMismatch { expected: slice.len(), found: values.len() });
            }
            positions.zip(values).for_each(|(i, value)| data[i] = value);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slice_len() {
        assert_eq!(Slice::new(1, 4, 1).len(), 3);
        assert_eq!(Slice::new(0, 10, 3).len(), 4);
        assert_eq!(Slice::new(5, 5, 1).len(), 0);
        assert_eq!(Slice::new(6, 2, 1).len(), 0);
        assert_eq!(Slice::new(0, 4, 0).len(), 0);
    }

    #[test]
    fn read_stepped() {
        let data = [0, 1, 2, 3, 4, 5, 6];
        assert_eq!(read(&data, Slice::new(1, 7, 2)).unwrap(), vec![1, 3, 5]);
        assert_eq!(read(&data, (2..2).into()).unwrap(), Vec::<i32>::new());
    }

    #[test]
    fn read_out_of_range() {
        let data = [0, 1, 2];
        assert_eq!(
            read(&data, Slice::new(1, 5, 1)),
            Err(Error::IndexOutOfRange { index: 4, len: 3 })
        );
        assert_eq!(read(&data, Slice::new(0, 2, 0)), Err(Error::ZeroStep));
    }

    #[test]
    fn write_broadcast_and_each() {
        let mut data = [0; 6];
        write(&mut data, Slice::new(0, 6, 2), Values::Broadcast(7)).unwrap();
        assert_eq!(data, [7, 0, 7, 0, 7, 0]);
        write(&mut data, Slice::new(1, 4, 1), vec![1, 2, 3].into()).unwrap();
        assert_eq!(data, [7, 1, 2, 3, 7, 0]);
    }

    #[test]
    fn write_rejects_wrong_count() {
        let mut data = [0; 4];
        assert_eq!(
            write(&mut data, Slice::new(0, 4, 1), vec![1, 2].into()),
            Err(Error::SizeMismatch { expected: 4, found: 2 })
        );
        assert_eq!(data, [0; 4]);
    }
}
