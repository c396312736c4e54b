use thiserror::Error;

/// Error type for batch shape handling.
///
/// Every variant describes a precondition violation detected from shapes alone,
/// before any element is touched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// Batch shape does not match the provided data.
    ///
    /// The number of elements must equal the product of the shape dimensions.
    /// The empty shape `[]` holds exactly one element.
    ///
    /// # Example
    /// ```ignore
    /// // Error: shape [2, 3] expects 6 elements, but got 5
    /// let batch = Batch::from_shape_vec([2, 3], vec![0.0; 5])?;
    /// ```
    #[error("Shape mismatch: expected {expected} elements for shape, but got {actual} elements in data")]
    InvalidShape {
        /// Expected number of elements based on shape
        expected: usize,
        /// Actual number of elements in the data
        actual: usize,
    },

    /// Two or more batch shapes cannot be broadcast together.
    ///
    /// Shapes are aligned from the right; on every aligned axis all sizes
    /// different from 1 must agree.
    ///
    /// # Examples
    /// - `[3]` and `[4]` conflict on axis 0
    /// - `[2, 3]` and `[3, 3]` conflict on axis 1 (counted from the right)
    #[error("Cannot broadcast batch shapes {shapes:?}: sizes disagree on axis {axis} (counted from the right)")]
    Incompatible {
        /// All shapes taking part in the broadcast
        shapes: Vec<Vec<usize>>,
        /// Conflicting axis, counted from the rightmost axis (0)
        axis: usize,
    },

    /// A batch cannot be expanded to the requested shape.
    #[error("Cannot broadcast batch of shape {from:?} to shape {to:?}")]
    NotBroadcastable {
        /// Shape of the batch
        from: Vec<usize>,
        /// Requested shape
        to: Vec<usize>,
    },

    /// The trailing dimensions of an array do not match the element layout.
    ///
    /// # Examples
    /// - Reading a `[5, 2]` array as a batch of 3-vectors
    /// - Reading a `[4, 4]` array as a batch of 3x3 matrices
    #[error("Trailing shape mismatch: expected trailing dimensions {expected:?}, got array of shape {actual:?}")]
    TrailingShape {
        /// Trailing dimensions required by the element layout
        expected: Vec<usize>,
        /// Full shape of the offending array
        actual: Vec<usize>,
    },
}

impl ShapeError {
    /// Creates an InvalidShape error.
    pub fn invalid_shape(expected: usize, actual: usize) -> Self {
        Self::InvalidShape { expected, actual }
    }

    /// Creates an Incompatible error from the participating shapes.
    pub fn incompatible(shapes: &[&[usize]], axis: usize) -> Self {
        Self::Incompatible {
            shapes: shapes.iter().map(|s| s.to_vec()).collect(),
            axis,
        }
    }

    /// Creates a NotBroadcastable error.
    pub fn not_broadcastable(from: &[usize], to: &[usize]) -> Self {
        Self::NotBroadcastable {
            from: from.to_vec(),
            to: to.to_vec(),
        }
    }

    /// Creates a TrailingShape error.
    pub fn trailing_shape(expected: &[usize], actual: &[usize]) -> Self {
        Self::TrailingShape {
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        }
    }

    /// Returns true if the error comes from broadcasting rather than from a
    /// malformed single operand.
    pub fn is_broadcast_error(&self) -> bool {
        matches!(
            self,
            Self::Incompatible { .. } | Self::NotBroadcastable { .. }
        )
    }

    /// Returns a user-friendly suggestion for resolving the error.
    pub fn suggestion(&self) -> &str {
        match self {
            Self::InvalidShape { .. } => {
                "Ensure the product of shape dimensions equals the number of data elements"
            }
            Self::Incompatible { .. } | Self::NotBroadcastable { .. } => {
                "Make batch sizes equal or 1 on every axis, aligning shapes from the right"
            }
            Self::TrailingShape { .. } => {
                "Check that the last dimensions of the array match the expected element layout"
            }
        }
    }
}
