#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # posekit Lie groups
//!
//! Batched implementations of the rotation and rigid-motion groups used to
//! describe poses in robotics and computer vision.
//!
//! ## Supported Groups
//!
//! - **SO(2)**: 2D rotations
//! - **SE(2)**: 2D rigid motions (rotation + translation)
//! - **SO(3)**: 3D rotations
//! - **SE(3)**: 3D rigid motions (rotation + translation)
//!
//! Every value holds a whole batch of elements. Unary operations keep the
//! batch shape, binary operations broadcast it the way numerical array
//! libraries do.
//!
//! ## Example
//!
//! ```rust
//! use std::f64::consts::FRAC_PI_2;
//! use posekit_lie::{Array, LieError, MatrixLieGroup, SEBase, SE3, SO3};
//!
//! # fn main() -> Result<(), LieError> {
//! let rotation = SO3::from_x_radians(&Array::scalar(FRAC_PI_2));
//! let translation = Array::from_vec(vec![0.0, 5.0, 0.0]);
//! let pose = SE3::from_rotation_and_translation(&rotation, &translation)?;
//!
//! let points = Array::from_rows(&[[0.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
//! let moved = pose.apply(&points)?;
//! assert_eq!(moved.shape(), &[2, 3]);
//!
//! let back = pose.inverse().apply(&moved)?;
//! assert!(back.iter().zip(points.iter()).all(|(a, b)| (a - b).abs() < 1e-12));
//! # Ok(())
//! # }
//! ```

/// Numerical thresholds of the closed-form maps.
pub mod epsilon;

/// Error types for the transforms.
pub mod error;

/// The group capability traits.
pub mod group;

/// Special Euclidean group SE(2) for 2D rigid transformations.
pub mod se2;

/// Special Euclidean group SE(3) for 3D rigid transformations.
pub mod se3;

/// Special Orthogonal group SO(2) for 2D rotations.
pub mod so2;

/// Special Orthogonal group SO(3) for 3D rotations.
pub mod so3;

pub use error::LieError;
pub use group::{MatrixLieGroup, SEBase, SOBase};
pub use posekit_batch::{Array, Batch, BatchShaped, ShapeError};
pub use se2::SE2;
pub use se3::SE3;
pub use so2::SO2;
pub use so3::{RollPitchYaw, SO3};
