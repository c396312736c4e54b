use crate::{batch::Batch, error::ShapeError, shape::broadcast_shapes};

/// A value made of independent entries laid out over a batch shape.
///
/// Implemented by [`Batch`] and by every transform type, so that group
/// elements and plain element batches can be broadcast against each other.
pub trait BatchShaped: Sized {
    /// The leading batch dimensions.
    fn batch_shape(&self) -> &[usize];

    /// Returns a copy expanded to `shape`, following broadcasting rules.
    fn broadcast_batch(&self, shape: &[usize]) -> Result<Self, ShapeError>;
}

impl<T: Clone> BatchShaped for Batch<T> {
    #[inline]
    fn batch_shape(&self) -> &[usize] {
        self.shape()
    }

    #[inline]
    fn broadcast_batch(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        self.broadcast_to(shape)
    }
}

/// Broadcasts every operand of a tuple to their common batch shape.
pub trait BroadcastLeadingAxes: Sized {
    /// Returns the operands expanded to the common batch shape.
    fn broadcast_leading_axes(self) -> Result<Self, ShapeError>;
}

macro_rules! impl_broadcast_leading_axes {
    ($($name:ident),+) => {
        impl<$($name: BatchShaped),+> BroadcastLeadingAxes for ($($name,)+) {
            #[allow(non_snake_case)]
            fn broadcast_leading_axes(self) -> Result<Self, ShapeError> {
                let ($($name,)+) = self;
                let shape = broadcast_shapes(&[$($name.batch_shape()),+])?;
                Ok(($($name.broadcast_batch(&shape)?,)+))
            }
        }
    };
}

impl_broadcast_leading_axes!(A, B);
impl_broadcast_leading_axes!(A, B, C);
impl_broadcast_leading_axes!(A, B, C, D);

/// Aligns the leading batch axes of two to four operands.
///
/// Each operand keeps its per-element layout; only the batch dimensions are
/// expanded. This is the entry point used before every binary operation.
///
/// # Errors
///
/// Returns [`ShapeError::Incompatible`] if the batch shapes cannot be
/// broadcast together.
///
/// # Examples
///
/// ```rust
/// use glam::DVec3;
/// use posekit_batch::{broadcast_leading_axes, Batch};
///
/// let points = Batch::from_elem([5], DVec3::X);
/// let offset = Batch::scalar(DVec3::Y);
/// let (points, offset) = broadcast_leading_axes((points, offset)).unwrap();
/// assert_eq!(points.shape(), &[5]);
/// assert_eq!(offset.shape(), &[5]);
/// ```
pub fn broadcast_leading_axes<T: BroadcastLeadingAxes>(operands: T) -> Result<T, ShapeError> {
    operands.broadcast_leading_axes()
}
