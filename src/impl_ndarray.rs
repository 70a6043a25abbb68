use crate::{
    array::Array,
    buffer::Buffer,
    element::Element,
    error::Error,
    shape::Shape,
};
use ndarray::{ArrayD, IxDyn};

impl<T: Element> Array<'_, T> {
    /// Copies the elements into an [`ndarray::ArrayD`] of the same shape.
    ///
    /// A rank-zero array holds no elements and converts to an empty
    /// one-dimensional array.
    pub fn to_ndarray(&self) -> Result<ArrayD<T>, Error> {
        let data = self.as_slice()?;
        if data.len() != self.size() {
            return Err(Error::SizeMismatch { expected: self.size(), found: data.len() });
        }
        let dims = match self.shape().dims() {
            [] => vec![0],
            dims => dims.to_vec(),
        };
        ArrayD::from_shape_vec(IxDyn(&dims), data.to_vec())
            .map_err(|_| Error::SizeMismatch { expected: self.size(), found: data.len() })
    }
}

impl<T: Element> Array<'static, T> {
    /// Copies `array` into an owning array in row-major order, whatever the
    /// memory layout of `array`.
    ///
    /// A zero-dimensional `ndarray` holds one element and becomes a rank-one
    /// array of length 1.
    pub fn from_ndarray<S, D>(array: &ndarray::ArrayBase<S, D>) -> Result<Self, Error>
    where
        S: ndarray::Data<Elem = T>,
        D: ndarray::Dimension,
    {
        let shape = match array.shape() {
            [] => Shape::from([1]),
            dims => Shape::from(dims),
        };
        let data: Vec<T> = array.iter().copied().collect();
        Array::from_parts(shape, Buffer::from(data), "", "", "")
    }
}
