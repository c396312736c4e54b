use std::{f64::consts::TAU, fmt};

use glam::{DMat2, DVec2};
use posekit_batch::{shape::with_trailing, Array, Batch, BatchShaped, ShapeError};
use rand::Rng;

use crate::{
    epsilon::NORMALIZE_TOLERANCE,
    error::{factory_input, LieError},
    group::{fmt_rounded, MatrixLieGroup, SOBase},
};

/// Rotations in the plane, stored as unit complex numbers `(cos, sin)`.
///
/// The tangent space is one-dimensional: the rotation angle in radians.
#[derive(Debug, Clone, PartialEq)]
pub struct SO2 {
    unit_complex: Batch<DVec2>,
}

impl SO2 {
    /// Wraps a batch of complex numbers `(cos, sin)`.
    /// NOTE: the complex numbers should have unit norm
    pub fn new(unit_complex: Batch<DVec2>) -> Self {
        Self { unit_complex }
    }

    /// Builds rotations from an array of angles; the array shape becomes the
    /// batch shape.
    pub fn from_radians(theta: &Array) -> Self {
        Self::new(theta.map(|&t| rotation_from_angle(t)))
    }

    /// A single rotation by `theta` radians.
    pub fn from_angle(theta: f64) -> Self {
        Self::new(Batch::scalar(rotation_from_angle(theta)))
    }

    /// Builds rotations from `(cos, sin)` pairs of shape `[*batch, 2]`.
    pub fn from_unit_complex(unit_complex: &Array) -> Result<Self, LieError> {
        let unit_complex = factory_input("SO2::from_unit_complex", unit_complex)?;
        Ok(Self::new(unit_complex))
    }

    /// The rotation angles in `(-π, π]`, with the batch shape.
    pub fn as_radians(&self) -> Array {
        self.unit_complex.map(|z| z.y.atan2(z.x))
    }

    /// The underlying `(cos, sin)` pairs.
    pub fn unit_complex(&self) -> &Batch<DVec2> {
        &self.unit_complex
    }
}

#[inline]
pub(crate) fn rotation_from_angle(theta: f64) -> DVec2 {
    let (sin, cos) = theta.sin_cos();
    DVec2::new(cos, sin)
}

/// Complex multiplication, which is also the rotation of a point.
#[inline]
pub(crate) fn rotate(z: DVec2, p: DVec2) -> DVec2 {
    DVec2::new(z.x * p.x - z.y * p.y, z.y * p.x + z.x * p.y)
}

#[inline]
pub(crate) fn conjugate(z: DVec2) -> DVec2 {
    DVec2::new(z.x, -z.y)
}

#[inline]
pub(crate) fn rotation_matrix(z: DVec2) -> DMat2 {
    DMat2::from_cols(DVec2::new(z.x, z.y), DVec2::new(-z.y, z.x))
}

pub(crate) fn normalize_complex(z: DVec2) -> DVec2 {
    let norm_sq = z.length_squared();
    if (norm_sq - 1.0).abs() <= NORMALIZE_TOLERANCE {
        return z;
    }
    if norm_sq == 0.0 {
        log::warn!("normalizing a zero complex number");
    }
    z / norm_sq.sqrt()
}

impl BatchShaped for SO2 {
    fn batch_shape(&self) -> &[usize] {
        self.unit_complex.shape()
    }

    fn broadcast_batch(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        Ok(Self::new(self.unit_complex.broadcast_to(shape)?))
    }
}

impl MatrixLieGroup for SO2 {
    const MATRIX_DIM: usize = 2;
    const PARAMETERS_DIM: usize = 2;
    const TANGENT_DIM: usize = 1;
    const SPACE_DIM: usize = 2;

    fn identity(batch_shape: &[usize]) -> Self {
        Self::new(Batch::from_elem(batch_shape, DVec2::X))
    }

    fn from_matrix(matrix: &Array) -> Result<Self, LieError> {
        let matrix = factory_input::<DMat2>("SO2::from_matrix", matrix)?;
        Ok(Self::new(matrix.map(|m| m.x_axis)))
    }

    fn as_matrix(&self) -> Array {
        self.unit_complex.map(|&z| rotation_matrix(z)).to_array()
    }

    fn parameters(&self) -> Array {
        self.unit_complex.to_array()
    }

    fn apply(&self, target: &Array) -> Result<Array, LieError> {
        let target = target.elements::<DVec2>()?;
        let out = self.unit_complex.zip_map(&target, |&z, &p| rotate(z, p))?;
        Ok(out.to_array())
    }

    fn multiply(&self, other: &Self) -> Result<Self, LieError> {
        let unit_complex = self
            .unit_complex
            .zip_map(&other.unit_complex, |&a, &b| rotate(a, b))?;
        Ok(Self::new(unit_complex))
    }

    fn exp(tangent: &Array) -> Result<Self, LieError> {
        let tangent = factory_input::<[f64; 1]>("SO2::exp", tangent)?;
        Ok(Self::new(tangent.map(|&[t]| rotation_from_angle(t))))
    }

    fn log(&self) -> Array {
        self.unit_complex.map(|z| [z.y.atan2(z.x)]).to_array()
    }

    fn adjoint(&self) -> Array {
        Array::from_elem(with_trailing(self.batch_shape(), &[1, 1]), 1.0)
    }

    fn inverse(&self) -> Self {
        Self::new(self.unit_complex.map(|&z| conjugate(z)))
    }

    fn normalize(&self) -> Self {
        Self::new(self.unit_complex.map(|&z| normalize_complex(z)))
    }
}

impl SOBase for SO2 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, batch_shape: &[usize]) -> Self {
        Self::new(Batch::from_shape_fn(batch_shape, |_| {
            rotation_from_angle(rng.random::<f64>() * TAU)
        }))
    }
}

impl fmt::Display for SO2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_rounded(f, "SO2", &[("unit_complex", &self.parameters())])
    }
}

impl std::ops::Mul<&SO2> for &SO2 {
    type Output = Result<SO2, LieError>;

    fn mul(self, rhs: &SO2) -> Self::Output {
        self.multiply(rhs)
    }
}

impl std::ops::Mul<&Array> for &SO2 {
    type Output = Result<Array, LieError>;

    fn mul(self, rhs: &Array) -> Self::Output {
        self.apply(rhs)
    }
}
