use posekit_batch::{Array, Batch, Element, ShapeError};
use thiserror::Error;

/// Error type for transform operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LieError {
    /// Batch or trailing dimensions that broadcasting cannot reconcile.
    ///
    /// Raised by binary operations (`multiply`, `apply`) and by factories that
    /// combine several batched inputs.
    #[error(transparent)]
    Shape(#[from] ShapeError),

    /// Malformed input to a factory.
    ///
    /// Detected from the trailing dimensions of the input only; the values
    /// themselves (orthonormality, unit norm) are never validated.
    ///
    /// # Examples
    /// - `SO3::from_matrix` called with a `[4, 4]` array
    /// - `SE2::exp` called with tangent vectors of length 2
    #[error("Domain error: {operation} expects trailing dimensions {expected:?}, got array of shape {actual:?}")]
    Domain {
        /// Name of the factory that rejected the input
        operation: &'static str,
        /// Trailing dimensions the factory accepts
        expected: Vec<usize>,
        /// Shape of the rejected array
        actual: Vec<usize>,
    },
}

impl LieError {
    /// Returns true for the malformed-factory-input family of errors.
    pub fn is_domain_error(&self) -> bool {
        matches!(self, Self::Domain { .. })
    }

    /// Returns true for shape and broadcasting errors.
    pub fn is_shape_error(&self) -> bool {
        matches!(self, Self::Shape(_))
    }
}

/// Reads the input of a factory, reporting a wrong layout as a domain error.
pub(crate) fn factory_input<E: Element>(
    operation: &'static str,
    array: &Array,
) -> Result<Batch<E>, LieError> {
    array.elements::<E>().map_err(|_| LieError::Domain {
        operation,
        expected: E::SHAPE.to_vec(),
        actual: array.shape().to_vec(),
    })
}
