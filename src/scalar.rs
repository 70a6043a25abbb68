//! Single typed values with descriptive metadata.

use crate::element::{format_value, Element, ElementKind};
use std::fmt;

/// The cell backing a [`Scalar`].
#[derive(Debug)]
pub enum ScalarCell<'a, T: Element> {
    /// A value stored inside the scalar.
    Owned(T),
    /// A value living in caller-owned memory.
    Reference(&'a mut T),
}

/// A single value of `T` with a name, a unit and a description.
///
/// Reads and writes of the value go to the backing [`ScalarCell`], so a
/// scalar built with [`Scalar::from_reference`] updates the referenced
/// memory directly.
///
/// ```
/// use dimarray::Scalar;
///
/// let mut reading = 0u32;
/// {
///     let mut scalar = Scalar::from_reference(&mut reading, "counts", "cps", "");
///     scalar.set_value(42);
///     assert_eq!(scalar.to_string(), "counts = 42 (cps)");
/// }
/// assert_eq!(reading, 42);
/// ```
#[derive(Debug)]
pub struct Scalar<'a, T: Element> {
    cell: ScalarCell<'a, T>,
    name: String,
    unit: String,
    description: String,
}

impl<'a, T: Element> Scalar<'a, T> {
    /// Creates a scalar owning `value`.
    pub fn new(
        value: T,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_cell(ScalarCell::Owned(value), name, unit, description)
    }

    /// Creates a scalar whose value lives in `value`.
    pub fn from_reference(
        value: &'a mut T,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self::with_cell(ScalarCell::Reference(value), name, unit, description)
    }

    fn with_cell(
        cell: ScalarCell<'a, T>,
        name: impl Into<String>,
        unit: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self { cell, name: name.into(), unit: unit.into(), description: description.into() }
    }

    /// The element kind.
    pub fn element_kind(&self) -> ElementKind {
        T::KIND
    }

    /// The current value.
    pub fn value(&self) -> T {
        match &self.cell {
            ScalarCell::Owned(value) => *value,
            ScalarCell::Reference(value) => **value,
        }
    }

    /// Overwrites the value.
    pub fn set_value(&mut self, value: T) {
        match &mut self.cell {
            ScalarCell::Owned(cell) => *cell = value,
            ScalarCell::Reference(cell) => **cell = value,
        }
    }

    /// Returns `true` if the value lives in caller-owned memory.
    pub fn is_reference(&self) -> bool {
        matches!(self.cell, ScalarCell::Reference(_))
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

impl<T: Element> Default for Scalar<'_, T> {
    fn default() -> Self {
        Self::new(T::default(), "", "", "")
    }
}

impl<T: Element> fmt::Display for Scalar<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} = ", self.name)?;
        format_value(&self.value(), f)?;
        write!(f, " ({})", self.unit)
    }
}
