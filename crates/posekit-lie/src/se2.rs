use std::{fmt, ops::Range};

use glam::{DMat2, DMat3, DVec2, DVec3, DVec4};
use posekit_batch::{broadcast_leading_axes, Array, Batch, BatchShaped, ShapeError};
use rand::Rng;

use crate::{
    epsilon::TAYLOR_EPSILON,
    error::{factory_input, LieError},
    group::{fmt_rounded, sample_range, MatrixLieGroup, SEBase, SOBase},
    so2::{conjugate, rotate, rotation_from_angle, rotation_matrix, SO2},
};

/// Rigid motions in the plane: a rotation followed by a translation.
///
/// Parameters are laid out `[cos, sin, x, y]` and tangent vectors
/// `[vx, vy, ω]`, translational part first.
#[derive(Debug, Clone, PartialEq)]
pub struct SE2 {
    rotation: SO2,
    translation: Batch<DVec2>,
}

impl SE2 {
    // both parts must have the same batch shape
    fn from_parts(rotation: SO2, translation: Batch<DVec2>) -> Self {
        debug_assert_eq!(rotation.batch_shape(), translation.shape());
        Self {
            rotation,
            translation,
        }
    }

    /// Builds transforms from parameters `[cos, sin, x, y]`.
    pub fn from_parameters(parameters: &Array) -> Result<Self, LieError> {
        let parameters = factory_input::<DVec4>("SE2::from_parameters", parameters)?;
        Ok(Self::from_parts(
            SO2::new(parameters.map(|p| DVec2::new(p.x, p.y))),
            parameters.map(|p| DVec2::new(p.z, p.w)),
        ))
    }

    /// Builds transforms from positions and headings; the three arrays are
    /// broadcast.
    pub fn from_xy_theta(x: &Array, y: &Array, theta: &Array) -> Result<Self, LieError> {
        let (x, y, theta) = broadcast_leading_axes((x.clone(), y.clone(), theta.clone()))?;
        let translation = x.zip_map(&y, |&x, &y| DVec2::new(x, y))?;
        Ok(Self::from_parts(SO2::from_radians(&theta), translation))
    }

    /// The translations as a batch of vectors.
    pub fn translations(&self) -> &Batch<DVec2> {
        &self.translation
    }

    fn map_parts<U>(&self, mut f: impl FnMut(DVec2, DVec2) -> U) -> Batch<U> {
        let rotation = self.rotation.unit_complex().as_slice();
        let translation = self.translation.as_slice();
        Batch::from_shape_fn(self.batch_shape(), |i| f(rotation[i], translation[i]))
    }
}

/// `exp` of a single tangent vector, as `(unit complex, translation)`.
fn exp_parts(tangent: DVec3) -> (DVec2, DVec2) {
    let theta = tangent.z;
    let theta_sq = theta * theta;

    let (sin_over_theta, one_minus_cos_over_theta) = if theta_sq < TAYLOR_EPSILON {
        (1.0 - theta_sq / 6.0, 0.5 * theta - theta * theta_sq / 24.0)
    } else {
        // 1 - cos(θ) = 2 sin²(θ/2) keeps precision for small θ
        let sin_half = (0.5 * theta).sin();
        (theta.sin() / theta, 2.0 * sin_half * sin_half / theta)
    };

    let v = DMat2::from_cols(
        DVec2::new(sin_over_theta, one_minus_cos_over_theta),
        DVec2::new(-one_minus_cos_over_theta, sin_over_theta),
    );
    (rotation_from_angle(theta), v * tangent.truncate())
}

fn log_parts(unit_complex: DVec2, translation: DVec2) -> DVec3 {
    let theta = unit_complex.y.atan2(unit_complex.x);
    let half_theta = 0.5 * theta;

    let half_theta_over_tan_half_theta = if theta * theta < TAYLOR_EPSILON {
        1.0 - theta * theta / 12.0
    } else {
        let (sin_half, cos_half) = half_theta.sin_cos();
        half_theta * cos_half / sin_half
    };

    let v_inv = DMat2::from_cols(
        DVec2::new(half_theta_over_tan_half_theta, -half_theta),
        DVec2::new(half_theta, half_theta_over_tan_half_theta),
    );
    (v_inv * translation).extend(theta)
}

impl BatchShaped for SE2 {
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

impl MatrixLieGroup for SE2 {
    const MATRIX_DIM: usize = 3;
    const PARAMETERS_DIM: usize = 4;
    const TANGENT_DIM: usize = 3;
    const SPACE_DIM: usize = 2;

    fn identity(batch_shape: &[usize]) -> Self {
        Self::from_parts(
            SO2::identity(batch_shape),
            Batch::from_elem(batch_shape, DVec2::ZERO),
        )
    }

    fn from_matrix(matrix: &Array) -> Result<Self, LieError> {
        let matrix = factory_input::<DMat3>("SE2::from_matrix", matrix)?;
        Ok(Self::from_parts(
            SO2::new(matrix.map(|m| m.x_axis.truncate())),
            matrix.map(|m| m.z_axis.truncate()),
        ))
    }

    fn as_matrix(&self) -> Array {
        self.map_parts(|z, t| {
            let r = rotation_matrix(z);
            DMat3::from_cols(r.x_axis.extend(0.0), r.y_axis.extend(0.0), t.extend(1.0))
        })
        .to_array()
    }

    fn parameters(&self) -> Array {
        self.map_parts(|z, t| DVec4::new(z.x, z.y, t.x, t.y)).to_array()
    }

    fn apply(&self, target: &Array) -> Result<Array, LieError> {
        let target = target.elements::<DVec2>()?;
        let out = self
            .map_parts(|z, t| (z, t))
            .zip_map(&target, |&(z, t), &p| rotate(z, p) + t)?;
        Ok(out.to_array())
    }

    fn multiply(&self, other: &Self) -> Result<Self, LieError> {
        let rotation = self.rotation.multiply(&other.rotation)?;
        let translation = self
            .map_parts(|z, t| (z, t))
            .zip_map(&other.translation, |&(z, t), &p| rotate(z, p) + t)?;
        Ok(Self::from_parts(rotation, translation))
    }

    fn exp(tangent: &Array) -> Result<Self, LieError> {
        let parts = factory_input::<DVec3>("SE2::exp", tangent)?.map(|&v| exp_parts(v));
        Ok(Self::from_parts(
            SO2::new(parts.map(|&(z, _)| z)),
            parts.map(|&(_, t)| t),
        ))
    }

    fn log(&self) -> Array {
        self.map_parts(log_parts).to_array()
    }

    fn adjoint(&self) -> Array {
        self.map_parts(|z, t| {
            DMat3::from_cols(
                DVec3::new(z.x, z.y, 0.0),
                DVec3::new(-z.y, z.x, 0.0),
                DVec3::new(t.y, -t.x, 1.0),
            )
        })
        .to_array()
    }

    fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        let translation = self.map_parts(|z, t| -rotate(conjugate(z), t));
        Self::from_parts(rotation, translation)
    }

    fn normalize(&self) -> Self {
        Self::from_parts(self.rotation.normalize(), self.translation.clone())
    }
}

impl SEBase for SE2 {
    type Rotation = SO2;

    fn from_rotation_and_translation(
        rotation: &SO2,
        translation: &Array,
    ) -> Result<Self, LieError> {
        let translation =
            factory_input::<DVec2>("SE2::from_rotation_and_translation", translation)?;
        let (rotation, translation) = broadcast_leading_axes((rotation.clone(), translation))?;
        Ok(Self::from_parts(rotation, translation))
    }

    fn from_rotation(rotation: &SO2) -> Self {
        let translation = Batch::from_elem(rotation.batch_shape(), DVec2::ZERO);
        Self::from_parts(rotation.clone(), translation)
    }

    fn from_translation(translation: &Array) -> Result<Self, LieError> {
        let translation = factory_input::<DVec2>("SE2::from_translation", translation)?;
        let rotation = SO2::identity(translation.shape());
        Ok(Self::from_parts(rotation, translation))
    }

    fn rotation(&self) -> &SO2 {
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
        let rotation = SO2::sample_uniform(rng, batch_shape);
        let translation = Batch::from_shape_fn(batch_shape, |_| {
            DVec2::new(
                sample_range(rng, &translation_range),
                sample_range(rng, &translation_range),
            )
        });
        Self::from_parts(rotation, translation)
    }
}

impl fmt::Display for SE2 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_rounded(
            f,
            "SE2",
            &[
                ("unit_complex", &self.rotation.parameters()),
                ("xy", &self.translation()),
            ],
        )
    }
}

impl std::ops::Mul<&SE2> for &SE2 {
    type Output = Result<SE2, LieError>;

    fn mul(self, rhs: &SE2) -> Self::Output {
        self.multiply(rhs)
    }
}

impl std::ops::Mul<&Array> for &SE2 {
    type Output = Result<Array, LieError>;

    fn mul(self, rhs: &Array) -> Self::Output {
        self.apply(rhs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::{rngs::StdRng, SeedableRng};
    use std::f64::consts::{FRAC_PI_2, PI};

    const EPSILON: f64 = 1e-9;

    fn make_random_se2(batch_shape: &[usize]) -> SE2 {
        let mut rng = StdRng::seed_from_u64(11);
        SE2::sample_uniform(&mut rng, batch_shape, -2.0..2.0)
    }

    #[test]
    fn test_identity() {
        let se2 = SE2::identity(&[]);
        assert_eq!(se2.parameters().as_slice(), &[1.0, 0.0, 0.0, 0.0]);
        let expected = Array::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        assert_eq!(se2.as_matrix(), expected);
    }

    #[test]
    fn test_from_xy_theta() -> Result<(), LieError> {
        let se2 = SE2::from_xy_theta(
            &Array::from_vec(vec![1.0, 2.0, 3.0]),
            &Array::scalar(-1.0),
            &Array::scalar(FRAC_PI_2),
        )?;
        assert_eq!(se2.batch_shape(), &[3]);
        let expected = Array::from_rows(&[[1.0, -1.0], [2.0, -1.0], [3.0, -1.0]]);
        assert_eq!(se2.translation(), expected);
        assert_relative_eq!(
            se2.rotation().as_radians(),
            Array::from_vec(vec![FRAC_PI_2; 3]),
            epsilon = EPSILON
        );

        let err = SE2::from_xy_theta(
            &Array::from_vec(vec![1.0, 2.0]),
            &Array::from_vec(vec![1.0, 2.0, 3.0]),
            &Array::scalar(0.0),
        )
        .unwrap_err();
        assert!(err.is_shape_error());
        Ok(())
    }

    #[test]
    fn test_apply() -> Result<(), LieError> {
        let se2 = SE2::from_xy_theta(
            &Array::scalar(1.0),
            &Array::scalar(2.0),
            &Array::scalar(FRAC_PI_2),
        )?;
        let points = Array::from_rows(&[[1.0, 0.0], [0.0, 0.0]]);
        let expected = Array::from_rows(&[[1.0, 3.0], [1.0, 2.0]]);
        assert_relative_eq!(se2.apply(&points)?, expected, epsilon = EPSILON);
        Ok(())
    }

    #[test]
    fn test_from_matrix() -> Result<(), LieError> {
        let mat = Array::from_rows(&[[0.6, -0.8, 1.5], [0.8, 0.6, -2.0], [0.0, 0.0, 1.0]]);
        let se2 = SE2::from_matrix(&mat)?;
        assert_eq!(se2.parameters().as_slice(), &[0.6, 0.8, 1.5, -2.0]);
        assert_eq!(se2.as_matrix(), mat);

        let err = SE2::from_matrix(&Array::zeros([2, 2])).unwrap_err();
        assert!(err.is_domain_error());
        Ok(())
    }

    #[test]
    fn test_from_parameters() -> Result<(), LieError> {
        let params = Array::from_rows(&[[0.6, 0.8, 1.0, 2.0], [1.0, 0.0, -1.0, 0.5]]);
        let se2 = SE2::from_parameters(&params)?;
        assert_eq!(se2.parameters(), params);
        let err = SE2::from_parameters(&Array::zeros([3])).unwrap_err();
        assert!(err.is_domain_error());
        Ok(())
    }

    #[test]
    fn test_exp_log() -> Result<(), LieError> {
        let tangent = Array::from_rows(&[
            [0.5, -1.0, 0.3],
            [1.0, 2.0, 1e-8],
            [-0.2, 0.1, 2.5],
            [3.0, 0.0, -1.0],
        ]);
        let se2 = SE2::exp(&tangent)?;
        assert_relative_eq!(se2.log(), tangent, epsilon = EPSILON);

        assert_eq!(SE2::exp(&Array::zeros([3]))?, SE2::identity(&[]));
        assert_eq!(SE2::identity(&[2]).log(), Array::zeros([2, 3]));

        assert!(SE2::exp(&Array::zeros([2])).unwrap_err().is_domain_error());
        Ok(())
    }

    #[test]
    fn test_exp_log_small_angle_large_translation() -> Result<(), LieError> {
        for omega in [1.5e-5, 2e-5, 3e-5, -2e-5] {
            let tangent = Array::from_vec(vec![250.0, -250.0, omega]);
            let se2 = SE2::exp(&tangent)?;
            assert_relative_eq!(se2.log(), tangent, epsilon = 1e-8);
        }
        Ok(())
    }

    #[test]
    fn test_exp_pure_rotation_and_translation() -> Result<(), LieError> {
        let se2 = SE2::exp(&Array::from_vec(vec![1.0, -2.0, 0.0]))?;
        assert_eq!(se2.translation().as_slice(), &[1.0, -2.0]);

        let se2 = SE2::exp(&Array::from_vec(vec![0.0, 0.0, PI]))?;
        let angle = se2.rotation().as_radians().as_slice()[0];
        assert_relative_eq!(angle, PI, epsilon = EPSILON);
        assert_eq!(se2.translation().as_slice(), &[0.0, 0.0]);
        Ok(())
    }

    #[test]
    fn test_inverse() -> Result<(), LieError> {
        let se2 = make_random_se2(&[6]);
        let identity = se2.multiply(&se2.inverse())?;
        assert_relative_eq!(
            identity.as_matrix(),
            SE2::identity(&[6]).as_matrix(),
            epsilon = EPSILON
        );
        assert_relative_eq!(
            se2.inverse().inverse().parameters(),
            se2.parameters(),
            epsilon = EPSILON
        );
        Ok(())
    }

    #[test]
    fn test_multiply_matches_matrix_product() -> Result<(), LieError> {
        let a = make_random_se2(&[]);
        let b = SE2::from_xy_theta(
            &Array::scalar(0.5),
            &Array::scalar(-0.25),
            &Array::scalar(1.2),
        )?;
        let ab = a.multiply(&b)?;

        let ma = a.as_matrix().elements::<DMat3>()?.as_slice()[0];
        let mb = b.as_matrix().elements::<DMat3>()?.as_slice()[0];
        let mab = ab.as_matrix().elements::<DMat3>()?.as_slice()[0];
        assert!((ma * mb).abs_diff_eq(mab, EPSILON));
        Ok(())
    }

    #[test]
    fn test_adjoint() -> Result<(), LieError> {
        let se2 = SE2::from_parameters(&Array::from_vec(vec![0.6, 0.8, 1.0, 2.0]))?;
        assert_eq!(
            se2.adjoint(),
            Array::from_rows(&[[0.6, -0.8, 2.0], [0.8, 0.6, -1.0], [0.0, 0.0, 1.0]])
        );
        Ok(())
    }

    #[test]
    fn test_adjoint_conjugation() -> Result<(), LieError> {
        let g = make_random_se2(&[3]);
        let v = Array::from_rows(&[[0.1, -0.3, 0.2], [1.0, 0.5, -0.7], [0.0, 0.2, 0.4]]);

        let lhs = g.multiply(&SE2::exp(&v)?)?.multiply(&g.inverse())?;
        let adjoint = g.adjoint().elements::<DMat3>()?;
        let ad_v = adjoint.zip_map(&v.elements::<DVec3>()?, |&ad, &v| ad * v)?;
        let rhs = SE2::exp(&ad_v.to_array())?;
        assert_relative_eq!(lhs.as_matrix(), rhs.as_matrix(), epsilon = EPSILON);
        Ok(())
    }

    #[test]
    fn test_rotation_and_translation_broadcast() -> Result<(), LieError> {
        let rotation = SO2::from_angle(0.4);
        let translation = Array::from_rows(&[[1.0, 0.0], [0.0, 1.0], [2.0, 2.0], [3.0, -1.0]]);
        let se2 = SE2::from_rotation_and_translation(&rotation, &translation)?;
        assert_eq!(se2.batch_shape(), &[4]);
        assert_eq!(se2.rotation().batch_shape(), &[4]);
        assert_eq!(se2.translation(), translation);

        let rotation_only = SE2::from_rotation(&rotation);
        assert_eq!(rotation_only.translation().as_slice(), &[0.0, 0.0]);
        let pure = SE2::from_translation(&translation)?;
        assert_eq!(pure.rotation(), &SO2::identity(&[4]));

        let err = SE2::from_translation(&Array::zeros([4, 3])).unwrap_err();
        assert!(err.is_domain_error());
        Ok(())
    }

    #[test]
    fn test_multiply_broadcast() -> Result<(), LieError> {
        let a = make_random_se2(&[5]);
        let b = make_random_se2(&[]);
        assert_eq!(a.multiply(&b)?.batch_shape(), &[5]);
        assert!(make_random_se2(&[3])
            .multiply(&make_random_se2(&[4]))
            .unwrap_err()
            .is_shape_error());
        Ok(())
    }

    #[test]
    fn test_sample_uniform_translation_range() {
        let se2 = make_random_se2(&[50]);
        assert!(se2.translation().iter().all(|&t| (-2.0..2.0).contains(&t)));
    }

    #[test]
    fn test_normalize() {
        let se2 = SE2::from_parts(
            SO2::new(Batch::scalar(DVec2::new(0.0, 2.0))),
            Batch::scalar(DVec2::new(1.0, 1.0)),
        );
        let normalized = se2.normalize();
        assert_eq!(normalized.parameters().as_slice(), &[0.0, 1.0, 1.0, 1.0]);
        assert_eq!(normalized.normalize(), normalized);
    }

    #[test]
    fn test_display() {
        assert_eq!(
            SE2::identity(&[]).to_string(),
            "SE2(unit_complex=[1, 0], xy=[0, 0])"
        );
    }
}
