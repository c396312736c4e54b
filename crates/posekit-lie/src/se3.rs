//! # SE(3): rigid motions in 3D
//!
//! A rotation, stored as an [`SO3`] quaternion, followed by a translation.
//! Parameters are laid out `[w, x, y, z, tx, ty, tz]` and tangent vectors
//! `[v, ω]`: the translational velocity first, then the axis-angle rotation.
//!
//! `exp` couples the two parts through the left Jacobian of SO(3):
//!
//! ```text
//! V(ω) = I + (1 - cos θ)/θ² [ω]× + (θ - sin θ)/θ³ [ω]×²
//! ```
//!
//! and `log` applies its closed-form inverse. Near `θ = 0` both switch to
//! Taylor expansions.

use std::{fmt, ops::Range};

use glam::{DMat3, DMat4, DQuat, DVec3};
use posekit_batch::{broadcast_leading_axes, Array, Batch, BatchShaped, Element, ShapeError};
use rand::Rng;

use crate::{
    epsilon::TAYLOR_EPSILON,
    error::{factory_input, LieError},
    group::{fmt_rounded, sample_range, MatrixLieGroup, SEBase, SOBase},
    so3::{exp_quat, log_quat, quat_from_matrix, rotation_matrix, SO3},
};

/// A batch of rigid motions in 3D.
#[derive(Debug, Clone, PartialEq)]
pub struct SE3 {
    rotation: SO3,
    translation: Batch<DVec3>,
}

/// Row-major 6×6 matrix, the layout of an SE(3) adjoint.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Matrix6([[f64; 6]; 6]);

impl Element for Matrix6 {
    const SHAPE: &'static [usize] = &[6, 6];
    const SIZE: usize = 36;

    fn read(values: &[f64]) -> Self {
        let mut rows = [[0.0; 6]; 6];
        for (row, chunk) in rows.iter_mut().zip(values.chunks_exact(6)) {
            row.copy_from_slice(chunk);
        }
        Self(rows)
    }

    fn write(&self, out: &mut [f64]) {
        for (row, chunk) in self.0.iter().zip(out.chunks_exact_mut(6)) {
            chunk.copy_from_slice(row);
        }
    }
}

impl SE3 {
    // both parts must have the same batch shape
    fn from_parts(rotation: SO3, translation: Batch<DVec3>) -> Self {
        debug_assert_eq!(rotation.batch_shape(), translation.shape());
        Self {
            rotation,
            translation,
        }
    }

    /// Builds transforms from parameters `[w, x, y, z, tx, ty, tz]`.
    pub fn from_parameters(parameters: &Array) -> Result<Self, LieError> {
        let parameters = factory_input::<[f64; 7]>("SE3::from_parameters", parameters)?;
        let wxyz = parameters.map(|&[w, x, y, z, ..]| DQuat::from_xyzw(x, y, z, w));
        let translation = parameters.map(|&[.., tx, ty, tz]| DVec3::new(tx, ty, tz));
        Ok(Self::from_parts(SO3::new(wxyz), translation))
    }

    /// The translations as a batch of vectors.
    pub fn translations(&self) -> &Batch<DVec3> {
        &self.translation
    }

    fn map_parts<U>(&self, mut f: impl FnMut(DQuat, DVec3) -> U) -> Batch<U> {
        let rotation = self.rotation.quaternions().as_slice();
        let translation = self.translation.as_slice();
        Batch::from_shape_fn(self.batch_shape(), |i| f(rotation[i], translation[i]))
    }
}

/// `exp` of a single tangent vector `[v, ω]`.
fn exp_parts(v: DVec3, omega: DVec3) -> (DQuat, DVec3) {
    let theta_sq = omega.length_squared();
    let skew = SO3::hat(omega);
    let skew_sq = skew * skew;

    let (a, b) = if theta_sq < TAYLOR_EPSILON {
        (0.5 - theta_sq / 24.0, 1.0 / 6.0 - theta_sq / 120.0)
    } else {
        let theta = theta_sq.sqrt();
        let (sin, cos) = theta.sin_cos();
        ((1.0 - cos) / theta_sq, (theta - sin) / (theta_sq * theta))
    };

    let jacobian = DMat3::IDENTITY + skew * a + skew_sq * b;
    (exp_quat(omega), jacobian * v)
}

fn log_parts(q: DQuat, translation: DVec3) -> [f64; 6] {
    let omega = log_quat(q);
    let theta_sq = omega.length_squared();
    let skew = SO3::hat(omega);
    let skew_sq = skew * skew;

    let c = if theta_sq < TAYLOR_EPSILON {
        1.0 / 12.0
    } else {
        let theta = theta_sq.sqrt();
        let (sin, cos) = (0.5 * theta).sin_cos();
        (1.0 - theta * cos / (2.0 * sin)) / theta_sq
    };

    let v_inv = DMat3::IDENTITY - skew * 0.5 + skew_sq * c;
    let v = v_inv * translation;
    [v.x, v.y, v.z, omega.x, omega.y, omega.z]
}

fn adjoint_matrix(q: DQuat, translation: DVec3) -> Matrix6 {
    let r = rotation_matrix(q);
    let tr = SO3::hat(translation) * r;

    let mut rows = [[0.0; 6]; 6];
    for (i, row) in rows.iter_mut().enumerate() {
        for j in 0..3 {
            if i < 3 {
                row[j] = r.col(j)[i];
                row[j + 3] = tr.col(j)[i];
            } else {
                row[j + 3] = r.col(j)[i - 3];
            }
        }
    }
    Matrix6(rows)
}

impl BatchShaped for SE3 {
    fn batch_shape(&self) -> &[usize] {
        self.translation.shape()
    }

    fn broadcast_batch(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        Ok(Self::from_parts(
            self.rotation.broadcast_batch(shape)?,
            self.translation.broadcast_to(shape)?,
        ))
    }
}

impl MatrixLieGroup for SE3 {
    const MATRIX_DIM: usize = 4;
    const PARAMETERS_DIM: usize = 7;
    const TANGENT_DIM: usize = 6;
    const SPACE_DIM: usize = 3;

    fn identity(batch_shape: &[usize]) -> Self {
        Self::from_parts(
            SO3::identity(batch_shape),
            Batch::from_elem(batch_shape, DVec3::ZERO),
        )
    }

    fn from_matrix(matrix: &Array) -> Result<Self, LieError> {
        let matrix = factory_input::<DMat4>("SE3::from_matrix", matrix)?;
        Ok(Self::from_parts(
            SO3::new(matrix.map(|m| quat_from_matrix(&DMat3::from_mat4(*m)))),
            matrix.map(|m| m.w_axis.truncate()),
        ))
    }

    fn as_matrix(&self) -> Array {
        self.map_parts(|q, t| {
            let r = rotation_matrix(q);
            DMat4::from_cols(
                r.x_axis.extend(0.0),
                r.y_axis.extend(0.0),
                r.z_axis.extend(0.0),
                t.extend(1.0),
            )
        })
        .to_array()
    }

    fn parameters(&self) -> Array {
        self.map_parts(|q, t| [q.w, q.x, q.y, q.z, t.x, t.y, t.z])
            .to_array()
    }

    fn apply(&self, target: &Array) -> Result<Array, LieError> {
        let target = target.elements::<DVec3>()?;
        let out = self
            .map_parts(|q, t| (q, t))
            .zip_map(&target, |&(q, t), &p| q.mul_vec3(p) + t)?;
        Ok(out.to_array())
    }

    fn multiply(&self, other: &Self) -> Result<Self, LieError> {
        let rotation = self.rotation.multiply(&other.rotation)?;
        let translation = self
            .map_parts(|q, t| (q, t))
            .zip_map(&other.translation, |&(q, t), &p| q.mul_vec3(p) + t)?;
        Ok(Self::from_parts(rotation, translation))
    }

    fn exp(tangent: &Array) -> Result<Self, LieError> {
        let tangent = factory_input::<[f64; 6]>("SE3::exp", tangent)?;
        let parts = tangent.map(|&[vx, vy, vz, wx, wy, wz]| {
            exp_parts(DVec3::new(vx, vy, vz), DVec3::new(wx, wy, wz))
        });
        Ok(Self::from_parts(
            SO3::new(parts.map(|&(q, _)| q)),
            parts.map(|&(_, t)| t),
        ))
    }

    fn log(&self) -> Array {
        self.map_parts(log_parts).to_array()
    }

    fn adjoint(&self) -> Array {
        self.map_parts(adjoint_matrix).to_array()
    }

    fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let translation = self.map_parts(|q, t| -q.conjugate().mul_vec3(t));
        Self::from_parts(rotation, translation)
    }

    fn normalize(&self) -> Self {
        Self::from_parts(self.rotation.normalize(), self.translation.clone())
    }
}

impl SEBase for SE3 {
    type Rotation = SO3;

    fn from_rotation_and_translation(
        rotation: &SO3,
        translation: &Array,
    ) -> Result<Self, LieError> {
        let translation =
            factory_input::<DVec3>("SE3::from_rotation_and_translation", translation)?;
        let (rotation, translation) = broadcast_leading_axes((rotation.clone(), translation))?;
        Ok(Self::from_parts(rotation, translation))
    }

    fn from_rotation(rotation: &SO3) -> Self {
        let translation = Batch::from_elem(rotation.batch_shape(), DVec3::ZERO);
        Self::from_parts(rotation.clone(), translation)
    }

    fn from_translation(translation: &Array) -> Result<Self, LieError> {
        let translation = factory_input::<DVec3>("SE3::from_translation", translation)?;
        let rotation = SO3::identity(translation.shape());
        Ok(Self::from_parts(rotation, translation))
    }

    fn rotation(&self) -> &SO3 {
        &self.rotation
    }

    fn translation(&self) -> Array {
        self.translation.to_array()
    }

    fn sample_uniform<R: Rng + ?Sized>(
        rng: &mut R,
        batch_shape: &[usize],
        translation_range: Range<f64>,
    ) -> Self {
        let rotation = SO3::sample_uniform(rng, batch_shape);
        let translation = Batch::from_shape_fn(batch_shape, |_| {
            DVec3::new(
                sample_range(rng, &translation_range),
                sample_range(rng, &translation_range),
                sample_range(rng, &translation_range),
            )
        });
        Self::from_parts(rotation, translation)
    }
}

impl fmt::Display for SE3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_rounded(
            f,
            "SE3",
            &[
                ("wxyz", &self.rotation.parameters()),
                ("xyz", &self.translation()),
            ],
        )
    }
}

impl std::ops::Mul<&SE3> for &SE3 {
    type Output = Result<SE3, LieError>;

    fn mul(self, rhs: &SE3) -> Self::Output {
        self.multiply(rhs)
    }
}

impl std::ops::Mul<&Array> for &SE3 {
    type Output = Result<Array, LieError>;

    fn mul(self, rhs: &Array) -> Self::Output {
        self.apply(rhs)
    }
}
