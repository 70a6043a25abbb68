use thiserror::Error;

/// An error raised by a shape, index, buffer, array or scalar operation.
///
/// Every operation returning this error leaves its receiver unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum Error {
    /// A dimension, coordinate or element position lies outside `[0, len)`.
    #[error("index {index} is out of range for length {len}")]
    IndexOutOfRange {
        /// The rejected position.
        index: usize,
        /// The exclusive upper bound that was exceeded.
        len: usize,
    },
    /// Two rank-bearing values were combined with different ranks.
    #[error("rank mismatch: expected {expected}, found {found}")]
    RankMismatch {
        /// Rank required by the receiver.
        expected: usize,
        /// Rank of the argument.
        found: usize,
    },
    /// A buffer or value sequence has a different number of elements than
    /// required.
    #[error("size mismatch: expected {expected} elements, found {found}")]
    SizeMismatch {
        /// Number of elements required.
        expected: usize,
        /// Number of elements supplied.
        found: usize,
    },
    /// The element kind is not one of the supported numeric kinds.
    #[error("unsupported element type: {0}")]
    UnsupportedElementType(String),
    /// A ranged access was requested with a step of zero.
    #[error("range step must be non-zero")]
    ZeroStep,
    /// Element access on an array that holds no buffer.
    #[error("array has no buffer allocated")]
    NotAllocated,
    /// Incrementing a coordinate would exceed `usize::MAX`.
    #[error("coordinate {0} exceeds numeric limits")]
    CoordinateOverflow(usize),
    /// Decrementing a coordinate would go below zero.
    #[error("coordinate {0} would become negative")]
    CoordinateUnderflow(usize),
    /// The element count or byte length of a shape overflows `usize`.
    #[error("overflow computing length from shape")]
    LengthOverflow,
    /// An external memory block is not aligned for its element kind.
    #[error("memory block is not aligned for element type {0}")]
    Misaligned(&'static str),
}

/// Checks `index < len`.
pub(crate) fn check_index(index: usize, len: usize) -> Result<(), Error> {
    if index < len {
        Ok(())
    } else {
        Err(Error::IndexOutOfRange { index, len })
    }
}

/// Byte length of `len` elements of `elem_size` bytes, failing with
/// [`Error::LengthOverflow`] past `isize::MAX`.
pub(crate) fn byte_len(len: usize, elem_size: usize) -> Result<usize, Error> {
    len.checked_mul(elem_size)
        .filter(|&bytes| bytes <= isize::MAX as usize)
        .ok_or(Error::LengthOverflow)
}
