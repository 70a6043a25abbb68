//! The `.npy` header: magic string, version, and the Python dictionary
//! describing element type, memory order and shape.

use crate::element::ElementKind;
use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use num_traits::ToPrimitive;
use py_literal::{
    FormatError as PyValueFormatError, ParseError as PyValueParseError, Value as PyValue,
};
use std::io;
use thiserror::Error;

/// Magic string to indicate npy format.
const MAGIC_STRING: &[u8] = b"\x93NUMPY";

/// The total header length (including magic string, version number, header
/// length value, array format description, padding, and final newline) must be
/// evenly divisible by this value. Data following the header is therefore
/// aligned for every element kind when the image itself is 64-byte aligned.
const HEADER_DIVISOR: usize = 64;

/// An error parsing the header of a `.npy` file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParseHeaderError {
    /// The start of the file does not match the magic string.
    #[error("start does not match magic string")]
    MagicString,
    /// The version number is not recognized.
    #[error("unknown version number: {major}.{minor}")]
    Version {
        /// Major version number.
        major: u8,
        /// Minor version number.
        minor: u8,
    },
    /// Indicates that the `HEADER_LEN` doesn't fit in `usize`.
    #[error("HEADER_LEN {0} does not fit in `usize`")]
    HeaderLengthOverflow(u32),
    /// The array format string of a version 1.0 or 2.0 header contains
    /// non-ASCII characters.
    #[error("non-ascii in array format string")]
    NonAscii,
    /// Error parsing a version 3.0 array format string as UTF-8.
    #[error("error parsing array format string as UTF-8: {0}")]
    Utf8Parse(#[from] std::str::Utf8Error),
    /// An unknown key was found in the metadata dictionary.
    #[error("unknown key: {0}")]
    UnknownKey(PyValue),
    /// A required key was missing from the metadata dictionary.
    #[error("missing key: {0}")]
    MissingKey(&'static str),
    /// An illegal value was found for a key in the metadata dictionary.
    #[error("illegal value for key {key}: {value}")]
    IllegalValue {
        /// The key for which the value was illegal.
        key: &'static str,
        /// The illegal value.
        value: PyValue,
    },
    /// Error parsing the metadata dictionary.
    #[error("error parsing metadata dict: {0}")]
    DictParse(#[from] PyValueParseError),
    /// The metadata is not a dictionary.
    #[error("metadata is not a dict: {0}")]
    MetaNotDict(PyValue),
    /// The header is missing a newline at the end.
    #[error("newline missing at end of header")]
    MissingNewline,
}

#[derive(Debug, Error)]
pub(crate) enum ReadHeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error parsing header: {0}")]
    Parse(#[from] ParseHeaderError),
}

/// An error formatting a `.npy` header.
#[derive(Debug, Error)]
pub enum FormatHeaderError {
    /// The dictionary could not be written as a Python literal.
    #[error("error formatting Python value: {0}")]
    PyValue(#[from] PyValueFormatError),
    /// The total header length overflows `usize`, or `HEADER_LEN` exceeds the
    /// maximum encodable value.
    #[error("the header is too long")]
    HeaderTooLong,
}

#[derive(Debug, Error)]
pub(crate) enum WriteHeaderError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("error formatting header: {0}")]
    Format(#[from] FormatHeaderError),
}

#[derive(Clone, Copy)]
enum Version {
    V1_0,
    V2_0,
    V3_0,
}

impl Version {
    /// Number of bytes taken up by version number (1 byte for major version, 1
    /// byte for minor version).
    const VERSION_NUM_BYTES: usize = 2;

    fn from_array(bytes: [u8; Self::VERSION_NUM_BYTES]) -> Result<Self, ParseHeaderError> {
        match bytes {
            [0x01, 0x00] => Ok(Version::V1_0),
            [0x02, 0x00] => Ok(Version::V2_0),
            [0x03, 0x00] => Ok(Version::V3_0),
            [major, minor] => Err(ParseHeaderError::Version { major, minor }),
        }
    }

    const fn major_version(self) -> u8 {
        match self {
            Version::V1_0 => 1,
            Version::V2_0 => 2,
            Version::V3_0 => 3,
        }
    }

    /// Number of bytes in representation of header length.
    const fn header_len_num_bytes(self) -> usize {
        match self {
            Version::V1_0 => 2,
            Version::V2_0 | Version::V3_0 => 4,
        }
    }

    fn read_header_len<R: io::Read>(self, mut reader: R) -> Result<usize, ReadHeaderError> {
        match self {
            Version::V1_0 => Ok(usize::from(reader.read_u16::<LittleEndian>()?)),
            Version::V2_0 | Version::V3_0 => {
                let header_len: u32 = reader.read_u32::<LittleEndian>()?;
                Ok(usize::try_from(header_len)
                    .map_err(|_| ParseHeaderError::HeaderLengthOverflow(header_len))?)
            }
        }
    }

    /// Formats `header_len` as little-endian bytes, or `None` if it does not
    /// fit this version's length field.
    fn format_header_len(self, header_len: usize) -> Option<Vec<u8>> {
        let mut out = vec![0; self.header_len_num_bytes()];
        match self {
            Version::V1_0 => LittleEndian::write_u16(&mut out, u16::try_from(header_len).ok()?),
            Version::V2_0 | Version::V3_0 => {
                LittleEndian::write_u32(&mut out, u32::try_from(header_len).ok()?);
            }
        }
        Some(out)
    }

    /// Computes the padded total header length and the formatted
    /// `HEADER_LEN` for a dictionary of `dict_len` bytes.
    fn compute_lengths(self, dict_len: usize) -> Option<(usize, Vec<u8>)> {
        const NEWLINE_LEN: usize = 1;

        let prefix_len =
            MAGIC_STRING.len() + Version::VERSION_NUM_BYTES + self.header_len_num_bytes();
        let unpadded_total_len = prefix_len.checked_add(dict_len)?.checked_add(NEWLINE_LEN)?;
        let padding_len = HEADER_DIVISOR - unpadded_total_len % HEADER_DIVISOR;
        let total_len = unpadded_total_len.checked_add(padding_len)?;
        let formatted_header_len = self.format_header_len(total_len - prefix_len)?;
        Some((total_len, formatted_header_len))
    }
}

/// A parsed `.npy` header.
#[derive(Clone, Debug)]
pub(crate) struct Header {
    pub descriptor: PyValue,
    pub fortran_order: bool,
    pub shape: Vec<usize>,
}

impl Header {
    /// A C-order header for elements of `kind`.
    pub(crate) fn new(kind: ElementKind, shape: Vec<usize>) -> Self {
        Self { descriptor: PyValue::String(kind.descriptor()), fortran_order: false, shape }
    }

    /// Number of elements the data section holds, or `None` on overflow.
    pub(crate) fn element_count(&self) -> Option<usize> {
        self.shape.iter().try_fold(1usize, |n, &d| n.checked_mul(d))
    }

    fn from_py_value(value: PyValue) -> Result<Self, ParseHeaderError> {
        let PyValue::Dict(dict) = value else {
            return Err(ParseHeaderError::MetaNotDict(value));
        };
        let mut descriptor = None;
        let mut fortran_order = None;
        let mut shape = None;
        for (key, value) in dict {
            match &key {
                PyValue::String(k) if k == "descr" => descriptor = Some(value),
                PyValue::String(k) if k == "fortran_order" => match value {
                    PyValue::Boolean(b) => fortran_order = Some(b),
                    value => {
                        return Err(ParseHeaderError::IllegalValue { key: "fortran_order", value })
                    }
                },
                PyValue::String(k) if k == "shape" => {
                    let parsed: Option<Vec<usize>> = value.as_tuple().and_then(|dims| {
                        dims.iter().map(|dim| dim.as_integer()?.to_usize()).collect()
                    });
                    match parsed {
                        Some(dims) => shape = Some(dims),
                        None => return Err(ParseHeaderError::IllegalValue { key: "shape", value }),
                    }
                }
                _ => return Err(ParseHeaderError::UnknownKey(key)),
            }
        }
        Ok(Self {
            descriptor: descriptor.ok_or(ParseHeaderError::MissingKey("descr"))?,
            fortran_order: fortran_order.ok_or(ParseHeaderError::MissingKey("fortran_order"))?,
            shape: shape.ok_or(ParseHeaderError::MissingKey("shape"))?,
        })
    }

    pub(crate) fn from_reader<R: io::Read>(mut reader: R) -> Result<Self, ReadHeaderError> {
        let mut magic = [0; MAGIC_STRING.len()];
        reader.read_exact(&mut magic)?;
        if magic != MAGIC_STRING {
            return Err(ParseHeaderError::MagicString.into());
        }

        let mut version = [0; Version::VERSION_NUM_BYTES];
        reader.read_exact(&mut version)?;
        let version = Version::from_array(version)?;
        let header_len = version.read_header_len(&mut reader)?;

        let mut buf = vec![0; header_len];
        reader.read_exact(&mut buf)?;
        let Some((&b'\n', without_newline)) = buf.split_last() else {
            return Err(ParseHeaderError::MissingNewline.into());
        };
        let header_str = match version {
            Version::V1_0 | Version::V2_0 if !without_newline.is_ascii() => {
                return Err(ParseHeaderError::NonAscii.into());
            }
            _ => std::str::from_utf8(without_newline).map_err(ParseHeaderError::from)?,
        };
        let dict = header_str.parse().map_err(ParseHeaderError::from)?;
        Ok(Self::from_py_value(dict)?)
    }

    fn to_py_value(&self) -> PyValue {
        PyValue::Dict(vec![
            (PyValue::String("descr".to_string()), self.descriptor.clone()),
            (PyValue::String("fortran_order".to_string()), PyValue::Boolean(self.fortran_order)),
            (
                PyValue::String("shape".to_string()),
                PyValue::Tuple(self.shape.iter().map(|&dim| PyValue::Integer(dim.into())).collect()),
            ),
        ])
    }

    fn to_bytes(&self) -> Result<Vec<u8>, FormatHeaderError> {
        let mut dict = Vec::new();
        self.to_py_value().write_ascii(&mut dict)?;

        // The smallest version whose length field fits wins.
        let (version, (total_len, formatted_header_len)) = [Version::V1_0, Version::V2_0]
            .into_iter()
            .find_map(|version| Some((version, version.compute_lengths(dict.len())?)))
            .ok_or(FormatHeaderError::HeaderTooLong)?;

        let mut out = Vec::with_capacity(total_len);
        out.extend_from_slice(MAGIC_STRING);
        out.push(version.major_version());
        out.push(0);
        out.extend_from_slice(&formatted_header_len);
        out.extend_from_slice(&dict);
        out.resize(total_len - 1, b' ');
        out.push(b'\n');
        debug_assert_eq!(out.len() % HEADER_DIVISOR, 0);
        Ok(out)
    }

    pub(crate) fn write<W: io::Write>(&self, mut writer: W) -> Result<(), WriteHeaderError> {
        writer.write_all(&self.to_bytes()?)?;
        Ok(())
    }
}
