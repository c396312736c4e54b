use crate::{
    element::Element,
    error::ShapeError,
    shape::{broadcast_shapes, numel, strides_from_shape, with_trailing},
};

/// A dynamic-rank array of `f64` values.
///
/// The shape of an `Array` is its full shape, trailing per-element dimensions
/// included. It is the type exchanged at the public boundary of the transform
/// types, much like a numpy array.
pub type Array = Batch<f64>;

/// A row-major collection of fixed-size elements with an explicit batch shape.
///
/// The batch shape holds the leading dimensions only; each entry is a whole
/// element (a vector, a quaternion, a matrix). The empty shape `[]` describes a
/// single, unbatched element.
///
/// Batches are immutable values: every operation returns a new batch and
/// never aliases the storage of its inputs.
///
/// # Examples
///
/// ```rust
/// use posekit_batch::Batch;
///
/// let batch = Batch::from_shape_vec([2, 2], vec![1.0, 2.0, 3.0, 4.0]).unwrap();
/// assert_eq!(batch.shape(), &[2, 2]);
/// assert_eq!(batch.get(&[1, 0]), Some(&3.0));
///
/// let doubled = batch.map(|x| x * 2.0);
/// assert_eq!(doubled.as_slice(), &[2.0, 4.0, 6.0, 8.0]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Batch<T> {
    shape: Vec<usize>,
    data: Vec<T>,
}

impl<T> Batch<T> {
    /// Creates a batch from a shape and its row-major elements.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::InvalidShape`] if `data.len()` differs from the
    /// product of the shape dimensions.
    pub fn from_shape_vec(shape: impl Into<Vec<usize>>, data: Vec<T>) -> Result<Self, ShapeError> {
        let shape = shape.into();
        let expected = numel(&shape);
        if expected != data.len() {
            return Err(ShapeError::invalid_shape(expected, data.len()));
        }
        Ok(Self { shape, data })
    }

    /// Creates a batch by calling `f` with the flat index of every entry.
    pub fn from_shape_fn(shape: impl Into<Vec<usize>>, f: impl FnMut(usize) -> T) -> Self {
        let shape = shape.into();
        let data = (0..numel(&shape)).map(f).collect();
        Self { shape, data }
    }

    /// The batch shape.
    #[inline]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of batch axes.
    #[inline]
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Number of elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns true if the batch holds no element.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The elements in row-major order.
    #[inline]
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    /// Consumes the batch and returns its elements.
    #[inline]
    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    /// Iterates over the elements in row-major order.
    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.data.iter()
    }

    /// Returns the element at a multi-dimensional index.
    ///
    /// Returns `None` if the index rank differs from the batch rank or any
    /// coordinate is out of bounds.
    pub fn get(&self, index: &[usize]) -> Option<&T> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut offset = 0;
        for ((&i, &size), stride) in index
            .iter()
            .zip(&self.shape)
            .zip(strides_from_shape(&self.shape))
        {
            if i >= size {
                return None;
            }
            offset += i * stride;
        }
        self.data.get(offset)
    }

    /// Applies `f` to every element, keeping the batch shape.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Batch<U> {
        Batch {
            shape: self.shape.clone(),
            data: self.data.iter().map(f).collect(),
        }
    }

    /// Returns the same elements under a new shape with the same element count.
    pub fn reshape(self, shape: impl Into<Vec<usize>>) -> Result<Self, ShapeError> {
        Self::from_shape_vec(shape, self.data)
    }
}

impl<T: Clone> Batch<T> {
    /// Creates a batch with every entry set to `value`.
    pub fn from_elem(shape: impl Into<Vec<usize>>, value: T) -> Self {
        let shape = shape.into();
        let data = vec![value; numel(&shape)];
        Self { shape, data }
    }

    /// Creates an unbatched value, of shape `[]`.
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Expands the batch to `shape`, following broadcasting rules.
    ///
    /// Axes of size 1, and axes missing on the left, are repeated. Element
    /// values are copied unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::NotBroadcastable`] if the batch shape cannot be
    /// expanded to `shape`.
    pub fn broadcast_to(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        if self.shape == shape {
            return Ok(self.clone());
        }

        let compatible = shape.len() >= self.shape.len()
            && broadcast_shapes(&[&self.shape, shape]).is_ok_and(|out| out == shape);
        if !compatible {
            return Err(ShapeError::not_broadcastable(&self.shape, shape));
        }

        // strides of the source, aligned to the output axes, 0 on repeated axes
        let offset = shape.len() - self.shape.len();
        let mut src_strides = vec![0; shape.len()];
        for (i, (&size, stride)) in self
            .shape
            .iter()
            .zip(strides_from_shape(&self.shape))
            .enumerate()
        {
            if size != 1 {
                src_strides[offset + i] = stride;
            }
        }

        let out_strides = strides_from_shape(shape);
        let data = (0..numel(shape))
            .map(|flat| {
                let mut rem = flat;
                let mut src = 0;
                for (&out_stride, &src_stride) in out_strides.iter().zip(&src_strides) {
                    src += (rem / out_stride) * src_stride;
                    rem %= out_stride;
                }
                self.data[src].clone()
            })
            .collect();

        Ok(Self {
            shape: shape.to_vec(),
            data,
        })
    }

    /// Combines two batches elementwise after broadcasting them together.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::Incompatible`] if the two batch shapes cannot be
    /// broadcast.
    pub fn zip_map<U: Clone, V>(
        &self,
        other: &Batch<U>,
        mut f: impl FnMut(&T, &U) -> V,
    ) -> Result<Batch<V>, ShapeError> {
        let shape = broadcast_shapes(&[&self.shape, &other.shape])?;
        let lhs = self.broadcast_to(&shape)?;
        let rhs = other.broadcast_to(&shape)?;
        let data = lhs.data.iter().zip(&rhs.data).map(|(a, b)| f(a, b)).collect();
        Ok(Batch { shape, data })
    }
}

impl<E: Element> Batch<E> {
    /// Lays the elements out as a numeric array of shape `[*batch, *E::SHAPE]`.
    pub fn to_array(&self) -> Array {
        let mut data = vec![0.0; self.data.len() * E::SIZE];
        for (element, out) in self.data.iter().zip(data.chunks_exact_mut(E::SIZE)) {
            element.write(out);
        }
        Batch {
            shape: with_trailing(&self.shape, E::SHAPE),
            data,
        }
    }
}

impl Array {
    /// Creates an array filled with zeros.
    pub fn zeros(shape: impl Into<Vec<usize>>) -> Self {
        Self::from_elem(shape, 0.0)
    }

    /// Creates a one-dimensional array from a vector.
    pub fn from_vec(data: Vec<f64>) -> Self {
        Self {
            shape: vec![data.len()],
            data,
        }
    }

    /// Creates a two-dimensional array of shape `[rows.len(), N]`.
    pub fn from_rows<const N: usize>(rows: &[[f64; N]]) -> Self {
        Self {
            shape: vec![rows.len(), N],
            data: rows.iter().flatten().copied().collect(),
        }
    }

    /// Widens a single-precision batch into an array.
    pub fn from_f32(batch: &Batch<f32>) -> Self {
        batch.map(|&x| f64::from(x))
    }

    /// Rounds every entry to single precision, keeping the shape.
    pub fn to_f32(&self) -> Batch<f32> {
        self.map(|&x| x as f32)
    }

    /// Reads the array as a batch of elements.
    ///
    /// The trailing dimensions must equal `E::SHAPE`; the leading dimensions
    /// become the batch shape.
    ///
    /// # Errors
    ///
    /// Returns [`ShapeError::TrailingShape`] if the trailing dimensions do not
    /// match the element layout.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use glam::DVec3;
    /// use posekit_batch::Array;
    ///
    /// let points = Array::from_rows(&[[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]);
    /// let points = points.elements::<DVec3>().unwrap();
    /// assert_eq!(points.shape(), &[2]);
    /// assert_eq!(points.as_slice()[1], DVec3::new(4.0, 5.0, 6.0));
    /// ```
    pub fn elements<E: Element>(&self) -> Result<Batch<E>, ShapeError> {
        let trailing = E::SHAPE;
        let matches = self.shape.len() >= trailing.len()
            && self.shape[self.shape.len() - trailing.len()..] == *trailing;
        if !matches {
            return Err(ShapeError::trailing_shape(trailing, &self.shape));
        }

        let batch_shape = self.shape[..self.shape.len() - trailing.len()].to_vec();
        let data = self.data.chunks_exact(E::SIZE).map(E::read).collect();
        Ok(Batch {
            shape: batch_shape,
            data,
        })
    }
}

impl<'a, T> IntoIterator for &'a Batch<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.data.iter()
    }
}

impl<T: approx::AbsDiffEq> approx::AbsDiffEq for Batch<T>
where
    T::Epsilon: Copy,
{
    type Epsilon = T::Epsilon;

    fn default_epsilon() -> Self::Epsilon {
        T::default_epsilon()
    }

    fn abs_diff_eq(&self, other: &Self, epsilon: Self::Epsilon) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.abs_diff_eq(b, epsilon))
    }
}

impl<T: approx::RelativeEq> approx::RelativeEq for Batch<T>
where
    T::Epsilon: Copy,
{
    fn default_max_relative() -> Self::Epsilon {
        T::default_max_relative()
    }

    fn relative_eq(
        &self,
        other: &Self,
        epsilon: Self::Epsilon,
        max_relative: Self::Epsilon,
    ) -> bool {
        self.shape == other.shape
            && self
                .data
                .iter()
                .zip(&other.data)
                .all(|(a, b)| a.relative_eq(b, epsilon, max_relative))
    }
}
