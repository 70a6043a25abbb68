pub mod header;

pub use self::header::{FormatHeaderError, ParseHeaderError};
use self::header::{Header, ReadHeaderError, WriteHeaderError};
use crate::{
    array::Array,
    buffer::{Buffer, ElementBuffer, ReferenceBuffer},
    element::{Element, ElementKind, Float128, NATIVE_ORDER},
    error::Error,
    generate::{
        each_variant, reference_array, with_element_type, AnyArray, ExternalArray, IntoAnyArray,
    },
    shape::Shape,
};
use log::debug;
use py_literal::Value as PyValue;
use std::{fs, io};
use thiserror::Error;

/// Read an `.npy` file located at the specified path.
///
/// This is a convenience function for using `File::open` followed by
/// [`ReadNpyExt::read_npy`].
pub fn read_npy<P, T>(path: P) -> Result<T, ReadNpyError>
where
    P: AsRef<std::path::Path>,
    T: ReadNpyExt,
{
    T::read_npy(fs::File::open(path)?)
}

/// Writes an array to an `.npy` file at the specified path.
///
/// This function will create the file if it does not exist, or overwrite it if
/// it does.
///
/// ```no_run
/// use dimarray::{write_npy, Array, Shape};
/// # use dimarray::WriteNpyError;
///
/// let array = Array::<i32>::with_shape(Shape::from([2, 3]))?;
/// write_npy("array.npy", &array)?;
/// # Ok::<_, WriteNpyError>(())
/// ```
pub fn write_npy<P, T>(path: P, array: &T) -> Result<(), WriteNpyError>
where
    P: AsRef<std::path::Path>,
    T: WriteNpyExt,
{
    array.write_npy(io::BufWriter::new(fs::File::create(path)?))
}

/// Resolves a `.npy` type descriptor such as `'<i4'` to an element kind.
///
/// Only native byte order is accepted; byte-swapped data cannot be aliased
/// in place.
fn descriptor_kind(descriptor: &PyValue) -> Result<ElementKind, DescriptorError> {
    let unsupported = || DescriptorError::Unsupported(descriptor.to_string());
    let PyValue::String(descr) = descriptor else {
        return Err(unsupported());
    };
    let mut chars = descr.chars();
    let order = chars.next().ok_or_else(unsupported)?;
    let type_char = chars.next().ok_or_else(unsupported)?;
    let size: usize = chars.as_str().parse().map_err(|_| unsupported())?;
    let kind = ElementKind::from_type_and_size(type_char, size).ok_or_else(unsupported)?;
    match order {
        '|' | '=' => Ok(kind),
        '<' | '>' if order == NATIVE_ORDER || size == 1 => Ok(kind),
        '<' | '>' => Err(DescriptorError::NonNativeEndian),
        _ => Err(unsupported()),
    }
}

enum DescriptorError {
    Unsupported(String),
    NonNativeEndian,
}

/// Extension trait for writing an array in `.npy` format.
///
/// For the sake of convenience, this method calls [`io::Write::flush()`] on
/// the writer before returning.
pub trait WriteNpyExt {
    /// Writes the array to `writer` in [`.npy`
    /// format](https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html).
    fn write_npy<W: io::Write>(&self, writer: W) -> Result<(), WriteNpyError>;
}

/// An error writing a `.npy` file.
#[derive(Debug, Error)]
pub enum WriteNpyError {
    /// An error caused by I/O.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error formatting the header.
    #[error("error formatting header: {0}")]
    FormatHeader(#[from] FormatHeaderError),
    /// The array has no buffer or its buffer does not cover its shape.
    #[error("array cannot be written: {0}")]
    Array(#[from] Error),
    /// The array has rank zero. `.npy` stores one element for an empty
    /// shape, while a rank-zero array holds none.
    #[error("rank-zero arrays are not supported")]
    ZeroRank,
}

impl From<WriteHeaderError> for WriteNpyError {
    fn from(err: WriteHeaderError) -> Self {
        match err {
            WriteHeaderError::Io(err) => Self::Io(err),
            WriteHeaderError::Format(err) => Self::FormatHeader(err),
        }
    }
}

impl<T: Element> WriteNpyExt for Array<'_, T> {
    fn write_npy<W: io::Write>(&self, mut writer: W) -> Result<(), WriteNpyError> {
        if self.shape().rank() == 0 {
            return Err(WriteNpyError::ZeroRank);
        }
        let data = self.as_slice()?;
        if data.len() != self.size() {
            return Err(Error::SizeMismatch { expected: self.size(), found: data.len() }.into());
        }
        Header::new(T::KIND, self.shape().dims().to_vec()).write(&mut writer)?;
        writer.write_all(bytemuck::cast_slice(data))?;
        writer.flush()?;
        Ok(())
    }
}

impl WriteNpyExt for AnyArray<'_> {
    fn write_npy<W: io::Write>(&self, writer: W) -> Result<(), WriteNpyError> {
        each_variant!(self, array => array.write_npy(writer))
    }
}

/// Extension trait for reading an owning array from a `.npy` file.
///
/// ```
/// use dimarray::{AnyArray, Array, ReadNpyExt, Shape, WriteNpyExt};
/// # use dimarray::ReadNpyError;
///
/// let mut bytes = Vec::new();
/// Array::<u16>::with_shape(Shape::from([4]))?.write_npy(&mut bytes).unwrap();
///
/// let any = AnyArray::read_npy(&bytes[..])?;
/// assert_eq!(any.shape(), &Shape::from([4]));
///
/// let typed = Array::<u16>::read_npy(&bytes[..])?;
/// assert_eq!(typed.as_slice()?, &[0; 4]);
/// # Ok::<_, ReadNpyError>(())
/// ```
pub trait ReadNpyExt: Sized {
    /// Reads the array from `reader` in `.npy` format.
    fn read_npy<R: io::Read>(reader: R) -> Result<Self, ReadNpyError>;
}

/// An error reading a `.npy` file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReadNpyError {
    /// An error caused by I/O.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    /// An error parsing the file header.
    #[error("error parsing header: {0}")]
    ParseHeader(#[from] ParseHeaderError),
    /// The type descriptor names an unsupported element kind, or does not
    /// match the requested element type.
    #[error(transparent)]
    Array(#[from] Error),
    /// The data is stored in non-native byte order.
    #[error("descriptor does not match native endianness")]
    NonNativeEndian,
    /// The data is stored in Fortran (column-major) order.
    #[error("Fortran-order data is not supported")]
    FortranOrder,
    /// The header describes a rank-zero array, which holds no elements here.
    #[error("rank-zero arrays are not supported")]
    ZeroRank,
    /// Overflow while computing the length of the array from the shape
    /// described in the file header.
    #[error("overflow computing length from shape")]
    LengthOverflow,
    /// The file does not contain all the data described in the header.
    #[error("reached EOF before reading all data")]
    MissingData,
    /// Extra bytes are present between the end of the data and the end of the
    /// file.
    #[error("file had {0} extra bytes before EOF")]
    ExtraBytes(usize),
}

impl From<ReadHeaderError> for ReadNpyError {
    fn from(err: ReadHeaderError) -> Self {
        match err {
            ReadHeaderError::Io(err) => Self::Io(err),
            ReadHeaderError::Parse(err) => Self::ParseHeader(err),
        }
    }
}

impl From<DescriptorError> for ReadNpyError {
    fn from(err: DescriptorError) -> Self {
        match err {
            DescriptorError::Unsupported(descr) => Self::Array(Error::UnsupportedElementType(descr)),
            DescriptorError::NonNativeEndian => Self::NonNativeEndian,
        }
    }
}

/// Parses the header and checks the parts shared by reading and viewing.
fn checked_header<R: io::Read>(reader: R) -> Result<(Header, ElementKind, usize), ReadNpyError> {
    let header = Header::from_reader(reader)?;
    let kind = descriptor_kind(&header.descriptor)?;
    if header.fortran_order {
        return Err(ReadNpyError::FortranOrder);
    }
    if header.shape.is_empty() {
        return Err(ReadNpyError::ZeroRank);
    }
    let len = header
        .element_count()
        .filter(|len| len.checked_mul(kind.size()).is_some_and(|n| n <= isize::MAX as usize))
        .ok_or(ReadNpyError::LengthOverflow)?;
    Ok((header, kind, len))
}

fn read_elements<T: Element, R: io::Read>(
    mut reader: R,
    shape: Vec<usize>,
    len: usize,
) -> Result<Array<'static, T>, ReadNpyError> {
    let mut buffer = Buffer::<T>::new(len);
    reader.read_exact(bytemuck::cast_slice_mut(buffer.as_mut_slice())).map_err(|err| {
        match err.kind() {
            io::ErrorKind::UnexpectedEof => ReadNpyError::MissingData,
            _ => ReadNpyError::Io(err),
        }
    })?;
    let mut rest = Vec::new();
    reader.read_to_end(&mut rest)?;
    if !rest.is_empty() {
        return Err(ReadNpyError::ExtraBytes(rest.len()));
    }
    Ok(Array::from_parts(Shape::from(shape), buffer, "", "", "")?)
}

impl<T: Element> ReadNpyExt for Array<'static, T> {
    fn read_npy<R: io::Read>(mut reader: R) -> Result<Self, ReadNpyError> {
        let (header, kind, len) = checked_header(&mut reader)?;
        if kind != T::KIND {
            return Err(Error::UnsupportedElementType(kind.to_string()).into());
        }
        read_elements(reader, header.shape, len)
    }
}

impl ReadNpyExt for AnyArray<'static> {
    fn read_npy<R: io::Read>(mut reader: R) -> Result<Self, ReadNpyError> {
        let (header, kind, len) = checked_header(&mut reader)?;
        debug!("reading {len} elements of {kind}");
        with_element_type!(kind, T => Ok(T::into_any(read_elements::<T, _>(reader, header.shape, len)?)))
    }
}

/// Extension trait for creating a reference array over a mutable buffer
/// containing an `.npy` image.
///
/// The primary use-case for this is modifying a memory-mapped `.npy` file:
/// element writes through the array land in the mapped file. Changing the
/// shape of the array does *not* modify the shape stored in the file.
///
/// The data section must be properly aligned for the element type. The
/// `.npy` header is padded to a multiple of 64 bytes, so this holds for any
/// buffer starting on a 64-byte boundary, such as a memory mapping.
pub trait ViewNpyExt<'a>: Sized {
    /// Creates a reference array aliasing the data section of `buf`.
    fn view_npy(buf: &'a mut [u8]) -> Result<Self, ViewNpyError>;
}

/// An error viewing a `.npy` image.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ViewNpyError {
    /// The image could not be parsed.
    #[error(transparent)]
    Read(#[from] ReadNpyError),
    /// The image does not contain all the data described in the header.
    #[error("missing {0} bytes of data specified in header")]
    MissingBytes(usize),
    /// Extra bytes are present after the data.
    #[error("buffer had {0} extra bytes after the data")]
    ExtraBytes(usize),
}

impl From<Error> for ViewNpyError {
    fn from(err: Error) -> Self {
        Self::Read(ReadNpyError::Array(err))
    }
}

/// Splits `buf` into its header and a data section of exactly the described
/// length.
fn view_parts(buf: &mut [u8]) -> Result<(Header, ElementKind, usize, &mut [u8]), ViewNpyError> {
    let mut reader = &*buf;
    let (header, kind, len) = checked_header(&mut reader)?;
    let mid = buf.len() - reader.len();
    let data = &mut buf[mid..];
    let expected = len * kind.size();
    match data.len() {
        n if n < expected => Err(ViewNpyError::MissingBytes(expected - n)),
        n if n > expected => Err(ViewNpyError::ExtraBytes(n - expected)),
        _ => Ok((header, kind, len, data)),
    }
}

impl<'a> ViewNpyExt<'a> for AnyArray<'a> {
    fn view_npy(buf: &'a mut [u8]) -> Result<Self, ViewNpyError> {
        let (header, kind, _, data) = view_parts(buf)?;
        let external = ExternalArray { dtype: kind.name(), shape: header.shape, data };
        Ok(reference_array(external, "", "", "")?)
    }
}

impl<'a, T: Element> ViewNpyExt<'a> for Array<'a, T> {
    fn view_npy(buf: &'a mut [u8]) -> Result<Self, ViewNpyError> {
        let (header, kind, len, data) = view_parts(buf)?;
        if kind != T::KIND {
            return Err(Error::UnsupportedElementType(kind.to_string()).into());
        }
        let buffer = ReferenceBuffer::from_bytes(data, len)?;
        Ok(Array::from_parts(Shape::from(header.shape), buffer, "", "", "")?)
    }
}
