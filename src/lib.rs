#![doc = include_str!("../README.md")]
//! ## Building blocks
//!
//! - [`Shape`] and [`Index`]: per-dimension extents and coordinates, with
//!   row-major [offset](Shape::offset) / [index](Shape::index) conversion
//! - [`Buffer`] and [`ReferenceBuffer`]: owning and aliasing element storage
//!   behind the common [`ElementBuffer`] interface
//! - [`Array`] and [`Scalar`]: typed values with a name, a unit and a
//!   description
//! - [`ElementKind`] and [`Element`]: the supported element types, including
//!   the extended precision [`Float128`]
//!
//! ## Foreign memory
//!
//! - [`reference_array`] builds an [`AnyArray`] aliasing an
//!   [`ExternalArray`], selecting the element type from its kind name
//! - [`ViewNpyExt`] does the same for an in-memory `.npy` image, primarily a
//!   memory-mapped file
//!
//! ## Operate .npy Files
//!
//! - Reading: [`ReadNpyExt`] extension trait, [`read_npy`] convenience
//!   function
//! - Writing: [`WriteNpyExt`] extension trait, [`write_npy`] convenience
//!   function
//!
//! ## Operate .npz Files
//!
//! - Reading: [`NpzReader`]
//! - Writing: [`NpzWriter`]
//!
//! ## Limitations
//!
//! - Only C-order data in native byte order is read or viewed.
//!
//! - Parsing of `.npy` files is limited to files where the `descr` field of
//!   the [header dictionary] is a Python string literal naming one of the
//!   [`ElementKind`]s.
//!
//! [header dictionary]: https://numpy.org/doc/stable/reference/generated/numpy.lib.format.html#format-version-1-0
#![cfg_attr(docsrs, feature(doc_auto_cfg))]
#![warn(missing_docs)]

mod array;
mod buffer;
mod element;
mod error;
mod generate;
mod index;
mod npy;
#[cfg(feature = "npz")]
mod npz;
mod scalar;
mod shape;
mod slice;

#[cfg(feature = "ndarray")]
mod impl_ndarray;

pub use crate::{
    array::Array,
    buffer::{Buffer, ElementBuffer, ReferenceBuffer, Storage},
    element::{format_general, Category, Element, ElementKind, Float128},
    error::Error,
    generate::{reference_array, AnyArray, ExternalArray, IntoAnyArray},
    index::Index,
    npy::{
        read_npy, write_npy, FormatHeaderError, ParseHeaderError, ReadNpyError, ReadNpyExt,
        ViewNpyError, ViewNpyExt, WriteNpyError, WriteNpyExt,
    },
    scalar::{Scalar, ScalarCell},
    shape::Shape,
    slice::{Slice, Values},
};
#[cfg(feature = "npz")]
pub use crate::npz::{NamedNpy, NpzReader, NpzWriter, ReadNpzError, WriteNpzError};
