use crate::{
    array::Array,
    element::Element,
    generate::AnyArray,
    npy::{ReadNpyError, ReadNpyExt, WriteNpyError, WriteNpyExt},
};
use log::debug;
use std::io::{self, Read, Seek, Write};
use thiserror::Error;
use zip::{result::ZipError, write::SimpleFileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// An error writing a `.npz` file.
#[derive(Debug, Error)]
pub enum WriteNpzError {
    /// An error caused by the zip file.
    #[error("zip file error: {0}")]
    Zip(#[from] ZipError),
    /// An error caused by writing an inner `.npy` file.
    #[error("error writing npy file to npz archive: {0}")]
    Npy(#[from] WriteNpyError),
    /// Two arrays were added under the same entry name.
    #[error("duplicate array name {0:?}")]
    DuplicateName(String),
}

/// Writer for `.npz` files.
///
/// Each array is stored as `<name>.npy`, where `<name>` is the array's own
/// name. Note that the inner `.npy` files are written to the archive in
/// full before the next one starts.
///
/// ```no_run
/// use dimarray::{Array, NpzWriter, Shape};
/// use std::fs::File;
///
/// let mut counts = Array::<u32>::with_shape(Shape::from([4, 4]))?;
/// counts.set_name("counts");
/// let mut energy = Array::<f64>::with_shape(Shape::from([4]))?;
/// energy.set_name("energy");
///
/// let mut npz = NpzWriter::new(File::create("scan.npz")?);
/// npz.add_array(&counts)?;
/// npz.add_array(&energy)?;
/// npz.finish()?;
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct NpzWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    options: SimpleFileOptions,
    names: Vec<String>,
}

/// An array that can be stored under its own name in a `.npz` archive.
pub trait NamedNpy: WriteNpyExt {
    /// The entry name, without the `.npy` suffix.
    fn npz_name(&self) -> &str;
}

impl<T: Element> NamedNpy for Array<'_, T> {
    fn npz_name(&self) -> &str {
        self.name()
    }
}

impl NamedNpy for AnyArray<'_> {
    fn npz_name(&self) -> &str {
        self.name()
    }
}

impl<W: Write + Seek> NpzWriter<W> {
    /// Create a new `.npz` file without compression. See [`numpy.savez`].
    ///
    /// [`numpy.savez`]: https://numpy.org/doc/stable/reference/generated/numpy.savez.html
    pub fn new(writer: W) -> NpzWriter<W> {
        Self::with_method(writer, CompressionMethod::Stored)
    }

    /// Creates a new `.npz` file with compression. See [`numpy.savez_compressed`].
    ///
    /// [`numpy.savez_compressed`]: https://numpy.org/doc/stable/reference/generated/numpy.savez_compressed.html
    #[cfg(feature = "compressed-npz")]
    pub fn new_compressed(writer: W) -> NpzWriter<W> {
        Self::with_method(writer, CompressionMethod::Deflated)
    }

    fn with_method(writer: W, method: CompressionMethod) -> Self {
        NpzWriter {
            zip: ZipWriter::new(writer),
            options: SimpleFileOptions::default().compression_method(method),
            names: Vec::new(),
        }
    }

    /// Adds an array as a new `.npy` file named after the array.
    ///
    /// An unnamed array is stored as `arr_<n>.npy`, `<n>` being the number of
    /// arrays added before it, which is how `numpy.savez` names positional
    /// arrays.
    pub fn add_array<A>(&mut self, array: &A) -> Result<(), WriteNpzError>
    where
        A: NamedNpy + ?Sized,
    {
        let name = match array.npz_name() {
            "" => format!("arr_{}", self.names.len()),
            name => name.to_string(),
        };
        if self.names.contains(&name) {
            return Err(WriteNpzError::DuplicateName(name));
        }
        debug!("adding {name}.npy to npz archive");
        self.zip.start_file(format!("{name}.npy"), self.options)?;
        // Buffering when writing individual arrays is beneficial even though
        // the underlying writer is usually buffered already.
        array.write_npy(io::BufWriter::new(&mut self.zip))?;
        self.names.push(name);
        Ok(())
    }

    /// Calls `.finish()` on the zip file and `.flush()` on the writer, and
    /// then returns the writer.
    ///
    /// This finishes writing the remaining zip structures and flushes the
    /// writer. While dropping will automatically attempt to finish the zip
    /// file and (for writers that flush on drop, such as
    /// [`BufWriter`](std::io::BufWriter)) flush the writer, any errors that
    /// occur during drop will be silently ignored. So, it's necessary to call
    /// `.finish()` to properly handle errors.
    pub fn finish(self) -> Result<W, WriteNpzError> {
        let mut writer = self.zip.finish()?;
        writer.flush().map_err(ZipError::from)?;
        Ok(writer)
    }
}

/// An error reading a `.npz` file.
#[derive(Debug, Error)]
pub enum ReadNpzError {
    /// An error caused by the zip archive.
    #[error("zip file error: {0}")]
    Zip(#[from] ZipError),
    /// An error caused by reading an inner `.npy` file.
    #[error("error reading npy file in npz archive: {0}")]
    Npy(#[from] ReadNpyError),
}

/// Reader for `.npz` files.
///
/// ```no_run
/// use dimarray::NpzReader;
/// use std::fs::File;
///
/// let mut npz = NpzReader::new(File::open("scan.npz")?)?;
/// for name in npz.names()? {
///     let array = npz.by_name(&name)?;
///     println!("{array}");
/// }
/// # Ok::<_, Box<dyn std::error::Error>>(())
/// ```
pub struct NpzReader<R: Read + Seek> {
    zip: ZipArchive<R>,
}

impl<R: Read + Seek> NpzReader<R> {
    /// Creates a new `.npz` file reader.
    pub fn new(reader: R) -> Result<NpzReader<R>, ReadNpzError> {
        Ok(NpzReader { zip: ZipArchive::new(reader)? })
    }

    /// Returns `true` iff the `.npz` file doesn't contain any arrays.
    pub fn is_empty(&self) -> bool {
        self.zip.len() == 0
    }

    /// Returns the number of arrays in the `.npz` file.
    pub fn len(&self) -> usize {
        self.zip.len()
    }

    /// Returns the names of all of the arrays in the file.
    ///
    /// Note that a single ".npy" suffix (if present) will be stripped from each
    /// name; e.g. "abc.npy" would be listed as "abc".
    pub fn names(&mut self) -> Result<Vec<String>, ReadNpzError> {
        Ok((0..self.zip.len())
            .map(|i| {
                let file = self.zip.by_index(i)?;
                let name = file.name();
                let stripped = name.strip_suffix(".npy").unwrap_or(name);
                Ok(stripped.to_owned())
            })
            .collect::<Result<_, ZipError>>()?)
    }

    /// Reads an array by name, with its name set to `name`.
    ///
    /// Note that this first checks for `name` in the `.npz` file, and if that
    /// is not present, checks for `format!("{name}.npy")`.
    pub fn by_name(&mut self, name: &str) -> Result<AnyArray<'static>, ReadNpzError> {
        let file_name = match self.zip.index_for_name(name) {
            Some(_) => name.to_owned(),
            None => format!("{name}.npy"),
        };
        let mut array = AnyArray::read_npy(self.zip.by_name(&file_name)?)?;
        array.set_name(name.strip_suffix(".npy").unwrap_or(name));
        Ok(array)
    }

    /// Reads an array by index in the `.npz` file, with its name set to the
    /// entry name.
    pub fn by_index(&mut self, index: usize) -> Result<AnyArray<'static>, ReadNpzError> {
        let file = self.zip.by_index(index)?;
        let name = file.name().to_owned();
        let mut array = AnyArray::read_npy(file)?;
        array.set_name(name.strip_suffix(".npy").unwrap_or(&name));
        Ok(array)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{index::Index, shape::Shape};
    use std::io::Cursor;

    fn named<T: Element>(name: &str, dims: &[usize]) -> Array<'static, T> {
        let mut array = Array::with_shape(Shape::from(dims)).unwrap();
        array.set_name(name);
        array
    }

    #[test]
    fn round_trip_by_name() {
        let mut counts = named::<u32>("counts", &[2, 2]);
        counts.set(&Index::from([1, 1]), 7).unwrap();
        let energy = named::<f32>("energy", &[3]);

        let mut npz = NpzWriter::new(Cursor::new(Vec::new()));
        npz.add_array(&counts).unwrap();
        npz.add_array(&AnyArray::from(energy)).unwrap();
        let bytes = npz.finish().unwrap().into_inner();

        let mut npz = NpzReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(npz.len(), 2);
        assert_eq!(npz.names().unwrap(), ["counts", "energy"]);
        let read = npz.by_name("counts").unwrap();
        assert_eq!(read.name(), "counts");
        assert_eq!(read.downcast_ref::<u32>().unwrap().as_slice().unwrap(), &[0, 0, 0, 7]);
        let read = npz.by_name("energy.npy").unwrap();
        assert_eq!(read.name(), "energy");
        assert_eq!(read.shape(), &Shape::from([3]));
        assert!(matches!(npz.by_name("missing"), Err(ReadNpzError::Zip(ZipError::FileNotFound))));
    }

    #[test]
    fn positional_and_duplicate_names() {
        let mut npz = NpzWriter::new(Cursor::new(Vec::new()));
        npz.add_array(&named::<i8>("", &[1])).unwrap();
        npz.add_array(&named::<i8>("", &[1])).unwrap();
        assert!(matches!(
            npz.add_array(&named::<i8>("arr_0", &[1])),
            Err(WriteNpzError::DuplicateName(name)) if name == "arr_0"
        ));
        let bytes = npz.finish().unwrap().into_inner();
        let mut npz = NpzReader::new(Cursor::new(bytes)).unwrap();
        assert_eq!(npz.names().unwrap(), ["arr_0", "arr_1"]);
        assert_eq!(npz.by_index(1).unwrap().name(), "arr_1");
    }

    #[cfg(feature = "compressed-npz")]
    #[test]
    fn compressed() {
        let mut big = named::<u64>("big", &[1000]);
        big.fill(5).unwrap();
        let mut npz = NpzWriter::new_compressed(Cursor::new(Vec::new()));
        npz.add_array(&big).unwrap();
        let bytes = npz.finish().unwrap().into_inner();
        assert!(bytes.len() < 8000);
        let read = NpzReader::new(Cursor::new(bytes)).unwrap().by_name("big").unwrap();
        assert_eq!(read.downcast_ref::<u64>().unwrap().as_slice().unwrap(), &[5; 1000][..]);
    }
}
