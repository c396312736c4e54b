use std::{f64::consts::FRAC_PI_2, ops::Mul};

use approx::assert_relative_eq;
use posekit_batch::shape::with_trailing;
use posekit_lie::{
    Array, BatchShaped, LieError, MatrixLieGroup, SEBase, SOBase, SE2, SE3, SO2, SO3,
};
use rand::{rngs::StdRng, Rng, SeedableRng};

const EPSILON: f64 = 1e-8;

const BATCH_SHAPES: [&[usize]; 3] = [&[], &[1], &[3, 1, 2, 1]];

trait Sampled: MatrixLieGroup {
    fn sample(rng: &mut StdRng, batch_shape: &[usize]) -> Self;
}

impl Sampled for SO2 {
    fn sample(rng: &mut StdRng, batch_shape: &[usize]) -> Self {
        SOBase::sample_uniform(rng, batch_shape)
    }
}

impl Sampled for SO3 {
    fn sample(rng: &mut StdRng, batch_shape: &[usize]) -> Self {
        SOBase::sample_uniform(rng, batch_shape)
    }
}

impl Sampled for SE2 {
    fn sample(rng: &mut StdRng, batch_shape: &[usize]) -> Self {
        SEBase::sample_uniform(rng, batch_shape, -10.0..10.0)
    }
}

impl Sampled for SE3 {
    fn sample(rng: &mut StdRng, batch_shape: &[usize]) -> Self {
        SEBase::sample_uniform(rng, batch_shape, -10.0..10.0)
    }
}

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Coordinates uniform in `[-1, 1)`: rotation angles stay well inside `(-π, π)`.
fn sample_tangent<G: MatrixLieGroup>(rng: &mut StdRng, batch_shape: &[usize]) -> Array {
    random_array(rng, with_trailing(batch_shape, &[G::TANGENT_DIM]), 1.0)
}

fn random_array(rng: &mut StdRng, shape: Vec<usize>, scale: f64) -> Array {
    Array::from_shape_fn(shape, |_| rng.random_range(-scale..scale))
}

/// Identity, uniformly sampled, and close to identity (Taylor branches).
fn strategies<G: Sampled>(rng: &mut StdRng, batch_shape: &[usize]) -> Result<Vec<G>, LieError> {
    let small = sample_tangent::<G>(rng, batch_shape).map(|v| v * 1e-6);
    Ok(vec![
        G::identity(batch_shape),
        G::sample(rng, batch_shape),
        G::exp(&small)?,
    ])
}

fn for_each_sample<G: Sampled>(
    seed: u64,
    mut check: impl FnMut(&mut StdRng, &[usize], G) -> Result<(), LieError>,
) -> Result<(), LieError> {
    init_logger();
    let mut rng = StdRng::seed_from_u64(seed);
    for batch_shape in BATCH_SHAPES {
        for g in strategies::<G>(&mut rng, batch_shape)? {
            check(&mut rng, batch_shape, g)?;
        }
    }
    Ok(())
}

/// Compares through the matrices: `q` and `-q` are the same SO(3) element.
fn assert_transforms_close<G: MatrixLieGroup>(a: &G, b: &G) {
    assert_eq!(a.batch_shape(), b.batch_shape());
    assert_relative_eq!(a.as_matrix(), b.as_matrix(), epsilon = EPSILON);
}

/// Multiplies each `[n, n]` matrix by the `[n]` vector at the same batch index.
fn batched_matvec(matrices: &Array, vectors: &Array, n: usize) -> Array {
    let out = matrices
        .as_slice()
        .chunks_exact(n * n)
        .zip(vectors.as_slice().chunks_exact(n))
        .flat_map(|(m, v)| {
            (0..n).map(move |i| (0..n).map(|j| m[i * n + j] * v[j]).sum::<f64>())
        })
        .collect();
    Array::from_shape_vec(vectors.shape(), out).expect("one output vector per input vector")
}

fn check_shapes<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(0, |_, batch_shape, g| {
        let matrix_dims = [G::MATRIX_DIM, G::MATRIX_DIM];
        let tangent_dims = [G::TANGENT_DIM, G::TANGENT_DIM];
        let shape_with = |trailing: &[usize]| with_trailing(batch_shape, trailing);
        assert_eq!(g.batch_shape(), batch_shape);
        assert_eq!(g.parameters().shape(), shape_with(&[G::PARAMETERS_DIM]));
        assert_eq!(g.as_matrix().shape(), shape_with(&matrix_dims));
        assert_eq!(g.log().shape(), shape_with(&[G::TANGENT_DIM]));
        assert_eq!(g.adjoint().shape(), shape_with(&tangent_dims));
        assert_eq!(g.inverse().batch_shape(), batch_shape);
        assert_eq!(g.normalize().batch_shape(), batch_shape);
        Ok(())
    })
}

fn check_identity<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(1, |_, batch_shape, g| {
        let identity = G::identity(batch_shape);
        assert_transforms_close(&g.multiply(&identity)?, &g);
        assert_transforms_close(&identity.multiply(&g)?, &g);
        Ok(())
    })
}

fn check_inverse<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(2, |_, batch_shape, g| {
        let identity = G::identity(batch_shape);
        assert_transforms_close(&g.multiply(&g.inverse())?, &identity);
        assert_transforms_close(&g.inverse().multiply(&g)?, &identity);
        assert_transforms_close(&g.inverse().inverse(), &g);
        Ok(())
    })
}

fn check_associativity<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(3, |rng, batch_shape, a| {
        let b = G::sample(rng, batch_shape);
        let c = G::sample(rng, batch_shape);
        let lhs = a.multiply(&b)?.multiply(&c)?;
        let rhs = a.multiply(&b.multiply(&c)?)?;
        assert_transforms_close(&lhs, &rhs);
        Ok(())
    })
}

fn check_exp_log<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(4, |rng, batch_shape, g| {
        assert_transforms_close(&G::exp(&g.log())?, &g);

        let tangent = sample_tangent::<G>(rng, batch_shape);
        assert_relative_eq!(G::exp(&tangent)?.log(), tangent, epsilon = EPSILON);
        Ok(())
    })
}

fn check_exp_log_exact_at_zero<G: Sampled>() -> Result<(), LieError> {
    init_logger();
    for batch_shape in BATCH_SHAPES {
        let zero = Array::zeros(with_trailing(batch_shape, &[G::TANGENT_DIM]));
        let identity = G::identity(batch_shape);
        assert_eq!(G::exp(&zero)?.parameters(), identity.parameters());
        assert_eq!(identity.log(), zero);
    }
    Ok(())
}

fn check_matrix_roundtrip<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(5, |_, _, g| {
        assert_transforms_close(&G::from_matrix(&g.as_matrix())?, &g);
        Ok(())
    })
}

fn check_adjoint<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(6, |rng, batch_shape, g| {
        let tangent = sample_tangent::<G>(rng, batch_shape);
        let lhs = g.multiply(&G::exp(&tangent)?)?.multiply(&g.inverse())?;
        let rhs = G::exp(&batched_matvec(&g.adjoint(), &tangent, G::TANGENT_DIM))?;
        assert_transforms_close(&lhs, &rhs);
        Ok(())
    })
}

fn check_apply_matches_matrix<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(7, |rng, batch_shape, g| {
        let (m, d) = (G::MATRIX_DIM, G::SPACE_DIM);
        let points = random_array(rng, with_trailing(batch_shape, &[d]), 5.0);

        // rotation matrices act directly, homogeneous matrices on [p, 1]
        let matrices = g.as_matrix();
        let expected: Vec<f64> = matrices
            .as_slice()
            .chunks_exact(m * m)
            .zip(points.as_slice().chunks_exact(d))
            .flat_map(|(mat, p)| {
                (0..d).map(move |i| {
                    let linear: f64 = (0..d).map(|j| mat[i * m + j] * p[j]).sum();
                    if m > d {
                        linear + mat[i * m + d]
                    } else {
                        linear
                    }
                })
            })
            .collect();

        let expected = Array::from_shape_vec(points.shape(), expected)?;
        assert_relative_eq!(g.apply(&points)?, expected, epsilon = EPSILON);
        Ok(())
    })
}

fn check_retractions<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(8, |rng, batch_shape, x| {
        let delta = sample_tangent::<G>(rng, batch_shape);

        let y = x.rplus(&delta)?;
        assert_relative_eq!(x.rminus(&y)?, delta, epsilon = EPSILON);

        let z = G::lplus(&delta, &x)?;
        assert_relative_eq!(G::lminus(&z, &x)?, delta, epsilon = EPSILON);

        assert_transforms_close(&x.interpolate(&y, 0.0)?, &x);
        assert_transforms_close(&x.interpolate(&y, 1.0)?, &y);
        let half = delta.map(|v| 0.5 * v);
        assert_transforms_close(&x.interpolate(&y, 0.5)?, &x.rplus(&half)?);
        Ok(())
    })
}

fn check_operators<G>() -> Result<(), LieError>
where
    G: Sampled,
    for<'a> &'a G: Mul<&'a G, Output = Result<G, LieError>>,
    for<'a> &'a G: Mul<&'a Array, Output = Result<Array, LieError>>,
{
    for_each_sample::<G>(11, |rng, batch_shape, t_w_b| {
        let t_b_a = G::sample(rng, batch_shape);
        let p_a = random_array(rng, with_trailing(batch_shape, &[G::SPACE_DIM]), 5.0);

        let t_w_a = (&t_w_b * &t_b_a)?;
        assert_eq!(t_w_a.parameters(), t_w_b.multiply(&t_b_a)?.parameters());
        assert_eq!((&t_b_a * &p_a)?, t_b_a.apply(&p_a)?);

        let p_b = (&t_b_a * &p_a)?;
        assert_relative_eq!((&t_w_a * &p_a)?, (&t_w_b * &p_b)?, epsilon = EPSILON);
        Ok(())
    })
}

fn check_normalize<G: Sampled>() -> Result<(), LieError> {
    for_each_sample::<G>(9, |_, _, g| {
        let normalized = g.normalize();
        assert_eq!(normalized.normalize().parameters(), normalized.parameters());
        assert_transforms_close(&normalized, &g);
        Ok(())
    })
}

fn check_broadcasting<G: Sampled>() -> Result<(), LieError> {
    init_logger();
    let mut rng = StdRng::seed_from_u64(10);

    let a = G::sample(&mut rng, &[5]);
    let b = G::sample(&mut rng, &[]);
    assert_eq!(a.multiply(&b)?.batch_shape(), &[5]);
    assert_eq!(b.multiply(&a)?.batch_shape(), &[5]);

    let c = G::sample(&mut rng, &[3, 1]);
    let d = G::sample(&mut rng, &[4]);
    assert_eq!(c.multiply(&d)?.batch_shape(), &[3, 4]);

    let points = Array::zeros([4, G::SPACE_DIM]);
    assert_eq!(c.apply(&points)?.shape(), &[3, 4, G::SPACE_DIM]);

    let e = G::sample(&mut rng, &[3]);
    assert!(e.multiply(&d).unwrap_err().is_shape_error());
    assert!(e.apply(&points).unwrap_err().is_shape_error());
    Ok(())
}

fn check_domain_errors<G: Sampled>() {
    init_logger();
    let (m, n) = (G::MATRIX_DIM, G::MATRIX_DIM + 1);
    let errors = [
        G::from_matrix(&Array::zeros([n, n])).unwrap_err(),
        G::from_matrix(&Array::zeros([m, n])).unwrap_err(),
        G::exp(&Array::zeros([G::TANGENT_DIM + 1])).unwrap_err(),
        G::exp(&Array::scalar(0.0)).unwrap_err(),
    ];
    assert!(errors.iter().all(LieError::is_domain_error));
}

macro_rules! group_tests {
    ($($module:ident: $group:ty),+ $(,)?) => {
        $(
            mod $module {
                use super::*;

                #[test]
                fn shapes() -> Result<(), LieError> {
                    check_shapes::<$group>()
                }

                #[test]
                fn identity() -> Result<(), LieError> {
                    check_identity::<$group>()
                }

                #[test]
                fn inverse() -> Result<(), LieError> {
                    check_inverse::<$group>()
                }

                #[test]
                fn associativity() -> Result<(), LieError> {
                    check_associativity::<$group>()
                }

                #[test]
                fn exp_log() -> Result<(), LieError> {
                    check_exp_log::<$group>()
                }

                #[test]
                fn exp_log_exact_at_zero() -> Result<(), LieError> {
                    check_exp_log_exact_at_zero::<$group>()
                }

                #[test]
                fn matrix_roundtrip() -> Result<(), LieError> {
                    check_matrix_roundtrip::<$group>()
                }

                #[test]
                fn adjoint() -> Result<(), LieError> {
                    check_adjoint::<$group>()
                }

                #[test]
                fn apply_matches_matrix() -> Result<(), LieError> {
                    check_apply_matches_matrix::<$group>()
                }

                #[test]
                fn retractions() -> Result<(), LieError> {
                    check_retractions::<$group>()
                }

                #[test]
                fn operators() -> Result<(), LieError> {
                    check_operators::<$group>()
                }

                #[test]
                fn normalize() -> Result<(), LieError> {
                    check_normalize::<$group>()
                }

                #[test]
                fn broadcasting() -> Result<(), LieError> {
                    check_broadcasting::<$group>()
                }

                #[test]
                fn domain_errors() {
                    check_domain_errors::<$group>()
                }
            }
        )+
    };
}

group_tests!(so2: SO2, so3: SO3, se2: SE2, se3: SE3);

#[test]
fn test_quarter_turns() -> Result<(), LieError> {
    let so2 = SO2::from_radians(&Array::scalar(FRAC_PI_2));
    let out = so2.apply(&Array::from_vec(vec![1.0, 0.0]))?;
    assert_relative_eq!(out, Array::from_vec(vec![0.0, 1.0]), epsilon = EPSILON);

    let so3 = SO3::from_x_radians(&Array::scalar(FRAC_PI_2));
    let out = so3.apply(&Array::from_vec(vec![0.0, 1.0, 0.0]))?;
    assert_relative_eq!(out, Array::from_vec(vec![0.0, 0.0, 1.0]), epsilon = EPSILON);

    let se3 = SE3::from_rotation_and_translation(&so3, &Array::from_vec(vec![0.0, 5.0, 0.0]))?;
    let origin = Array::zeros([3]);
    let moved = se3.apply(&origin)?;
    let expected = Array::from_vec(vec![0.0, 5.0, 0.0]);
    assert_relative_eq!(moved, expected, epsilon = EPSILON);
    assert_relative_eq!(se3.inverse().apply(&moved)?, origin, epsilon = EPSILON);
    Ok(())
}

#[test]
fn test_se_parts_are_consistent() -> Result<(), LieError> {
    let mut rng = StdRng::seed_from_u64(12);
    let pose = <SE3 as SEBase>::sample_uniform(&mut rng, &[4], -1.0..1.0);
    let rebuilt = SE3::from_rotation_and_translation(pose.rotation(), &pose.translation())?;
    assert_eq!(rebuilt, pose);

    // rotation first, then translation
    let translation = SE3::from_translation(&pose.translation())?;
    let composed = translation.multiply(&SE3::from_rotation(pose.rotation()))?;
    assert_transforms_close(&composed, &pose);

    let pose = <SE2 as SEBase>::sample_uniform(&mut rng, &[2, 2], 0.0..3.0);
    let translation = SE2::from_translation(&pose.translation())?;
    let composed = translation.multiply(&SE2::from_rotation(pose.rotation()))?;
    assert_transforms_close(&composed, &pose);
    Ok(())
}

#[test]
fn test_single_precision_roundtrip() -> Result<(), LieError> {
    let mut rng = StdRng::seed_from_u64(13);
    let pose = <SE3 as SEBase>::sample_uniform(&mut rng, &[4], -1.0..1.0);
    let single = pose.as_matrix().to_f32();

    let expected = pose.as_matrix();
    let restored = SE3::from_matrix(&Array::from_f32(&single))?;
    assert_relative_eq!(restored.as_matrix(), expected, epsilon = 1e-5);
    assert_relative_eq!(restored.normalize().as_matrix(), expected, epsilon = 1e-5);

    let angles = Array::from_f32(&posekit_lie::Batch::from_elem([3], 0.25f32));
    let so2 = SO2::from_radians(&angles);
    assert_eq!(so2.parameters().to_f32().shape(), &[3, 2]);
    Ok(())
}
