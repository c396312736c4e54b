use std::{fmt, ops::Range};

use posekit_batch::{shape::numel, Array, BatchShaped};
use rand::Rng;

use crate::error::LieError;

/// Capabilities shared by every matrix Lie group of the crate.
///
/// Elements are batched: each value holds independent group elements laid out
/// over a batch shape, and every operation works on the whole batch at once.
/// Unary operations keep the batch shape; binary operations broadcast the two
/// batch shapes first.
///
/// The numeric inputs and outputs are [`Array`]s whose trailing dimensions are
/// fixed by the group:
///
/// | Operation | Trailing shape |
/// |-----------|----------------|
/// | `parameters` | `[PARAMETERS_DIM]` |
/// | `exp` / `log` | `[TANGENT_DIM]` |
/// | `from_matrix` / `as_matrix` | `[MATRIX_DIM, MATRIX_DIM]` |
/// | `adjoint` | `[TANGENT_DIM, TANGENT_DIM]` |
/// | `apply` | `[SPACE_DIM]` |
pub trait MatrixLieGroup: BatchShaped + Clone + fmt::Debug + fmt::Display {
    /// Size of the (homogeneous) matrix representation.
    const MATRIX_DIM: usize;
    /// Number of scalars in the internal parameterization.
    const PARAMETERS_DIM: usize;
    /// Dimension of the tangent space.
    const TANGENT_DIM: usize;
    /// Dimension of the space the group acts on.
    const SPACE_DIM: usize;

    /// The neutral element, replicated over `batch_shape`.
    fn identity(batch_shape: &[usize]) -> Self;

    /// Builds elements from rotation or homogeneous matrices.
    ///
    /// The matrix values are not validated and the result is not normalized;
    /// call [`normalize`](Self::normalize) on noisy input.
    fn from_matrix(matrix: &Array) -> Result<Self, LieError>;

    /// The matrix representation, of shape `[*batch, MATRIX_DIM, MATRIX_DIM]`.
    fn as_matrix(&self) -> Array;

    /// The internal parameters, of shape `[*batch, PARAMETERS_DIM]`.
    fn parameters(&self) -> Array;

    /// Applies the transforms to points of shape `[*batch, SPACE_DIM]`.
    fn apply(&self, target: &Array) -> Result<Array, LieError>;

    /// Composes `self ∘ other`.
    fn multiply(&self, other: &Self) -> Result<Self, LieError>;

    /// Maps tangent vectors of shape `[*batch, TANGENT_DIM]` to the group.
    fn exp(tangent: &Array) -> Result<Self, LieError>;

    /// Maps elements back to tangent vectors, inverse of [`exp`](Self::exp)
    /// inside its principal domain.
    fn log(&self) -> Array;

    /// The adjoint representation `Ad(g)`, such that
    /// `g ∘ exp(v) ∘ g⁻¹ = exp(Ad(g) v)`.
    fn adjoint(&self) -> Array;

    /// The group inverse.
    fn inverse(&self) -> Self;

    /// Projects the parameters back onto the manifold.
    fn normalize(&self) -> Self;

    /// Right retraction `self ∘ exp(delta)`.
    fn rplus(&self, delta: &Array) -> Result<Self, LieError> {
        self.multiply(&Self::exp(delta)?)
    }

    /// Right difference `log(self⁻¹ ∘ other)`.
    fn rminus(&self, other: &Self) -> Result<Array, LieError> {
        Ok(self.inverse().multiply(other)?.log())
    }

    /// Left retraction `exp(delta) ∘ x`.
    fn lplus(delta: &Array, x: &Self) -> Result<Self, LieError> {
        Self::exp(delta)?.multiply(x)
    }

    /// Left difference `log(y ∘ x⁻¹)`.
    fn lminus(y: &Self, x: &Self) -> Result<Array, LieError> {
        Ok(y.multiply(&x.inverse())?.log())
    }

    /// Geodesic interpolation: `alpha = 0` gives `self`, `alpha = 1` gives `other`.
    fn interpolate(&self, other: &Self, alpha: f64) -> Result<Self, LieError> {
        let delta = self.rminus(other)?.map(|v| v * alpha);
        self.rplus(&delta)
    }
}

/// Rotation groups, compact and uniformly samplable.
pub trait SOBase: MatrixLieGroup {
    /// Draws elements uniformly distributed over the group.
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, batch_shape: &[usize]) -> Self;
}

/// Rigid-motion groups: a rotation followed by a translation.
pub trait SEBase: MatrixLieGroup {
    /// The rotation group embedded in the transform.
    type Rotation: SOBase;

    /// Builds transforms from a rotation and translations of shape
    /// `[*batch, SPACE_DIM]`; the two batch shapes are broadcast.
    fn from_rotation_and_translation(
        rotation: &Self::Rotation,
        translation: &Array,
    ) -> Result<Self, LieError>;

    /// Pure rotations.
    fn from_rotation(rotation: &Self::Rotation) -> Self;

    /// Pure translations, of shape `[*batch, SPACE_DIM]`.
    fn from_translation(translation: &Array) -> Result<Self, LieError>;

    /// The rotation part.
    fn rotation(&self) -> &Self::Rotation;

    /// The translation part, of shape `[*batch, SPACE_DIM]`.
    fn translation(&self) -> Array;

    /// Draws a uniform rotation and, independently, every translation
    /// coordinate uniformly from `translation_range`.
    ///
    /// The group is not compact, so the translation domain is up to the caller.
    fn sample_uniform<R: Rng + ?Sized>(
        rng: &mut R,
        batch_shape: &[usize],
        translation_range: Range<f64>,
    ) -> Self;
}

/// Samples a coordinate from `range`; an empty or reversed range yields its start.
pub(crate) fn sample_range<R: Rng + ?Sized>(rng: &mut R, range: &Range<f64>) -> f64 {
    let width = (range.end - range.start).max(0.0);
    range.start + width * rng.random::<f64>()
}

/// Writes `name(field=[...])` with values rounded to 5 decimals.
pub(crate) fn fmt_rounded(
    f: &mut fmt::Formatter<'_>,
    name: &str,
    fields: &[(&str, &Array)],
) -> fmt::Result {
    fn write_axis(f: &mut fmt::Formatter<'_>, shape: &[usize], data: &[f64]) -> fmt::Result {
        match shape.split_first() {
            // `+ 0.0` turns a rounded -0 into 0
            None => write!(f, "{}", (data[0] * 1e5).round() / 1e5 + 0.0),
            Some((&size, rest)) => {
                let step = numel(rest);
                write!(f, "[")?;
                for i in 0..size {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_axis(f, rest, &data[i * step..(i + 1) * step])?;
                }
                write!(f, "]")
            }
        }
    }

    write!(f, "{name}(")?;
    for (i, (field, array)) in fields.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{field}=")?;
        write_axis(f, array.shape(), array.as_slice())?;
    }
    write!(f, ")")
}
