//! # SO(3): rotations in 3D
//!
//! Rotations are stored as unit quaternions laid out `[w, x, y, z]`. `q` and
//! `-q` describe the same rotation, so compare rotations through their
//! matrices, or fix the quaternion sign first.
//!
//! The tangent space is the axis-angle vector `ω`: its direction is the
//! rotation axis and its norm the angle in radians.
//!
//! - `exp(ω)`: `q = (cos(θ/2), sin(θ/2) · ω/θ)` with `θ = ‖ω‖`.
//! - `log()`: the inverse map, returning angles in `[0, π]`.
//!
//! Both maps switch to Taylor expansions when the angle is close to zero, and
//! `log` has a dedicated branch for half turns, where the quaternion scalar part
//! vanishes. At a half turn `ω` and `-ω` describe the same rotation; the result
//! is the one whose first non-zero axis component is positive.

use std::{f64::consts::PI, fmt};

use glam::{DMat3, DQuat, DVec3};
use posekit_batch::{broadcast_leading_axes, Array, Batch, BatchShaped, ShapeError};
use rand::Rng;

use crate::{
    epsilon::{NORMALIZE_TOLERANCE, TAYLOR_EPSILON},
    error::{factory_input, LieError},
    group::{fmt_rounded, MatrixLieGroup, SOBase},
};

/// A batch of 3D rotations, stored as unit quaternions.
#[derive(Debug, Clone, PartialEq)]
pub struct SO3 {
    wxyz: Batch<DQuat>,
}

/// Roll, pitch and yaw angles in radians, each with the batch shape.
///
/// The rotation they describe is `Rz(yaw) · Ry(pitch) · Rx(roll)`.
#[derive(Debug, Clone, PartialEq)]
pub struct RollPitchYaw {
    /// Rotation about the x axis.
    pub roll: Array,
    /// Rotation about the y axis.
    pub pitch: Array,
    /// Rotation about the z axis.
    pub yaw: Array,
}

impl SO3 {
    /// Wraps a batch of quaternions.
    /// NOTE: quaternions should be normalized
    #[inline]
    pub fn new(wxyz: Batch<DQuat>) -> Self {
        Self { wxyz }
    }

    /// The underlying quaternions.
    #[inline]
    pub fn quaternions(&self) -> &Batch<DQuat> {
        &self.wxyz
    }

    /// Rotations about the x axis; the array shape becomes the batch shape.
    pub fn from_x_radians(theta: &Array) -> Self {
        Self::new(theta.map(|&t| exp_quat(DVec3::new(t, 0.0, 0.0))))
    }

    /// Rotations about the y axis; the array shape becomes the batch shape.
    pub fn from_y_radians(theta: &Array) -> Self {
        Self::new(theta.map(|&t| exp_quat(DVec3::new(0.0, t, 0.0))))
    }

    /// Rotations about the z axis; the array shape becomes the batch shape.
    pub fn from_z_radians(theta: &Array) -> Self {
        Self::new(theta.map(|&t| exp_quat(DVec3::new(0.0, 0.0, t))))
    }

    /// Builds `Rz(yaw) · Ry(pitch) · Rx(roll)`; the three arrays are broadcast.
    pub fn from_rpy_radians(roll: &Array, pitch: &Array, yaw: &Array) -> Result<Self, LieError> {
        let (roll, pitch, yaw) =
            broadcast_leading_axes((roll.clone(), pitch.clone(), yaw.clone()))?;
        Self::from_z_radians(&yaw)
            .multiply(&Self::from_y_radians(&pitch))?
            .multiply(&Self::from_x_radians(&roll))
    }

    /// Builds rotations from quaternions laid out `[w, x, y, z]`.
    pub fn from_quaternion_wxyz(wxyz: &Array) -> Result<Self, LieError> {
        Ok(Self::new(factory_input("SO3::from_quaternion_wxyz", wxyz)?))
    }

    /// Builds rotations from quaternions laid out `[x, y, z, w]`.
    pub fn from_quaternion_xyzw(xyzw: &Array) -> Result<Self, LieError> {
        let xyzw = factory_input::<[f64; 4]>("SO3::from_quaternion_xyzw", xyzw)?;
        let wxyz = xyzw.map(|&[x, y, z, w]| DQuat::from_xyzw(x, y, z, w));
        Ok(Self::new(wxyz))
    }

    /// The quaternions laid out `[x, y, z, w]`.
    pub fn as_quaternion_xyzw(&self) -> Array {
        self.wxyz.map(|q| [q.x, q.y, q.z, q.w]).to_array()
    }

    /// Decomposes the rotations into roll, pitch and yaw.
    pub fn as_rpy_radians(&self) -> RollPitchYaw {
        RollPitchYaw {
            roll: self.compute_roll_radians(),
            pitch: self.compute_pitch_radians(),
            yaw: self.compute_yaw_radians(),
        }
    }

    /// Roll angle, about the x axis.
    pub fn compute_roll_radians(&self) -> Array {
        self.wxyz.map(|q| {
            (2.0 * (q.w * q.x + q.y * q.z)).atan2(1.0 - 2.0 * (q.x * q.x + q.y * q.y))
        })
    }

    /// Pitch angle, about the y axis, in `[-π/2, π/2]`.
    pub fn compute_pitch_radians(&self) -> Array {
        self.wxyz
            .map(|q| (2.0 * (q.w * q.y - q.z * q.x)).clamp(-1.0, 1.0).asin())
    }

    /// Yaw angle, about the z axis.
    pub fn compute_yaw_radians(&self) -> Array {
        self.wxyz.map(|q| {
            (2.0 * (q.w * q.z + q.x * q.y)).atan2(1.0 - 2.0 * (q.y * q.y + q.z * q.z))
        })
    }

    /// Vector space -> Lie algebra: the cross-product matrix `[v]×`.
    pub fn hat(v: DVec3) -> DMat3 {
        DMat3::from_cols(
            DVec3::new(0.0, v.z, -v.y),
            DVec3::new(-v.z, 0.0, v.x),
            DVec3::new(v.y, -v.x, 0.0),
        )
    }

    /// Lie algebra -> vector space
    pub fn vee(omega: DMat3) -> DVec3 {
        DVec3::new(omega.y_axis.z, omega.z_axis.x, omega.x_axis.y)
    }
}

pub(crate) fn exp_quat(omega: DVec3) -> DQuat {
    let theta_sq = omega.length_squared();

    let (real, imag_factor) = if theta_sq < TAYLOR_EPSILON {
        // taylor series of cos(θ/2) and sin(θ/2)/θ around 0
        let theta_pow_4 = theta_sq * theta_sq;
        (
            1.0 - theta_sq / 8.0 + theta_pow_4 / 384.0,
            0.5 - theta_sq / 48.0 + theta_pow_4 / 3840.0,
        )
    } else {
        let theta = theta_sq.sqrt();
        let (sin, cos) = (0.5 * theta).sin_cos();
        (cos, sin / theta)
    };

    let xyz = omega * imag_factor;
    DQuat::from_xyzw(xyz.x, xyz.y, xyz.z, real)
}

pub(crate) fn log_quat(q: DQuat) -> DVec3 {
    let w = q.w;
    let xyz = q.xyz();
    let norm_sq = xyz.length_squared();

    let factor = if norm_sq < TAYLOR_EPSILON {
        // taylor series of 2 atan(n / w) / n around n = 0
        2.0 / w - 2.0 / 3.0 * norm_sq / (w * w * w)
    } else {
        let norm = norm_sq.sqrt();
        if w.abs() < TAYLOR_EPSILON {
            // half turn
            half_turn_sign(xyz) * PI / norm
        } else if w < 0.0 {
            // -q is the same rotation, with a positive scalar part
            2.0 * (-norm).atan2(-w) / norm
        } else {
            2.0 * norm.atan2(w) / norm
        }
    };

    xyz * factor
}

/// Sign making the first non-zero component of `axis` positive.
fn half_turn_sign(axis: DVec3) -> f64 {
    match axis.to_array().into_iter().find(|&c| c != 0.0) {
        Some(c) if c < 0.0 => -1.0,
        _ => 1.0,
    }
}

/// Shepperd's method: picks the largest of the four quaternion components to
/// divide by. The matrix is not assumed orthonormal and the result is not
/// normalized.
pub(crate) fn quat_from_matrix(m: &DMat3) -> DQuat {
    let [m00, m01, m02] = m.row(0).to_array();
    let [m10, m11, m12] = m.row(1).to_array();
    let [m20, m21, m22] = m.row(2).to_array();

    let (t, x, y, z, w) = if m22 < 0.0 {
        if m00 > m11 {
            let t = 1.0 + m00 - m11 - m22;
            (t, t, m10 + m01, m02 + m20, m21 - m12)
        } else {
            let t = 1.0 - m00 + m11 - m22;
            (t, m10 + m01, t, m21 + m12, m02 - m20)
        }
    } else if m00 < -m11 {
        let t = 1.0 - m00 - m11 + m22;
        (t, m02 + m20, m21 + m12, t, m10 - m01)
    } else {
        let t = 1.0 + m00 + m11 + m22;
        (t, m21 - m12, m02 - m20, m10 - m01, t)
    };

    DQuat::from_xyzw(x, y, z, w) * (0.5 / t.sqrt())
}

pub(crate) fn rotation_matrix(q: DQuat) -> DMat3 {
    DMat3::from_quat(normalize_quat(q))
}

pub(crate) fn normalize_quat(q: DQuat) -> DQuat {
    let norm_sq = q.length_squared();
    if (norm_sq - 1.0).abs() <= NORMALIZE_TOLERANCE {
        return q;
    }
    if norm_sq == 0.0 {
        log::warn!("normalizing a zero quaternion, result is not a rotation");
    }
    q * norm_sq.sqrt().recip()
}

impl BatchShaped for SO3 {
    fn batch_shape(&self) -> &[usize] {
        self.wxyz.shape()
    }

    fn broadcast_batch(&self, shape: &[usize]) -> Result<Self, ShapeError> {
        Ok(Self::new(self.wxyz.broadcast_to(shape)?))
    }
}

impl MatrixLieGroup for SO3 {
    const MATRIX_DIM: usize = 3;
    const PARAMETERS_DIM: usize = 4;
    const TANGENT_DIM: usize = 3;
    const SPACE_DIM: usize = 3;

    fn identity(batch_shape: &[usize]) -> Self {
        Self::new(Batch::from_elem(batch_shape, DQuat::IDENTITY))
    }

    fn from_matrix(matrix: &Array) -> Result<Self, LieError> {
        let matrix = factory_input::<DMat3>("SO3::from_matrix", matrix)?;
        Ok(Self::new(matrix.map(quat_from_matrix)))
    }

    fn as_matrix(&self) -> Array {
        self.wxyz.map(|&q| rotation_matrix(q)).to_array()
    }

    fn parameters(&self) -> Array {
        self.wxyz.to_array()
    }

    fn apply(&self, target: &Array) -> Result<Array, LieError> {
        let target = target.elements::<DVec3>()?;
        let out = self.wxyz.zip_map(&target, |q, &p| q.mul_vec3(p))?;
        Ok(out.to_array())
    }

    fn multiply(&self, other: &Self) -> Result<Self, LieError> {
        Ok(Self::new(self.wxyz.zip_map(&other.wxyz, |&a, &b| a * b)?))
    }

    fn exp(tangent: &Array) -> Result<Self, LieError> {
        let tangent = factory_input::<DVec3>("SO3::exp", tangent)?;
        Ok(Self::new(tangent.map(|&omega| exp_quat(omega))))
    }

    fn log(&self) -> Array {
        self.wxyz.map(|&q| log_quat(q)).to_array()
    }

    fn adjoint(&self) -> Array {
        self.as_matrix()
    }

    fn inverse(&self) -> Self {
        Self::new(self.wxyz.map(|q| q.conjugate()))
    }

    fn normalize(&self) -> Self {
        Self::new(self.wxyz.map(|&q| normalize_quat(q)))
    }
}

impl SOBase for SO3 {
    fn sample_uniform<R: Rng + ?Sized>(rng: &mut R, batch_shape: &[usize]) -> Self {
        Self::new(Batch::from_shape_fn(batch_shape, |_| {
            let r1: f64 = rng.random();
            let r2: f64 = rng.random();
            let r3: f64 = rng.random();

            // uniform random quaternion (Shoemake method)
            let one_minus_r1_sqrt = (1.0 - r1).sqrt();
            let r1_sqrt = r1.sqrt();

            let w = one_minus_r1_sqrt * (2.0 * PI * r2).cos();
            let x = one_minus_r1_sqrt * (2.0 * PI * r2).sin();
            let y = r1_sqrt * (2.0 * PI * r3).cos();
            let z = r1_sqrt * (2.0 * PI * r3).sin();

            normalize_quat(DQuat::from_xyzw(x, y, z, w))
        }))
    }
}

impl fmt::Display for SO3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_rounded(f, "SO3", &[("wxyz", &self.parameters())])
    }
}

impl std::ops::Mul<&SO3> for &SO3 {
    type Output = Result<SO3, LieError>;

    fn mul(self, rhs: &SO3) -> Self::Output {
        self.multiply(rhs)
    }
}

impl std::ops::Mul<&Array> for &SO3 {
    type Output = Result<Array, LieError>;

    fn mul(self, rhs: &Array) -> Self::Output {
        self.apply(rhs)
    }
}
