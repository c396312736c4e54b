#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]
//!
//! # Overview
//!
//! `posekit-batch` stores collections of fixed-size values (vectors, quaternions,
//! matrices) together with an explicit batch shape, and implements the
//! broadcasting rules used by the transform types of `posekit-lie`.
//!
//! - **Batch**: a row-major `Vec` of elements plus its leading batch shape
//! - **Array**: `Batch<f64>`, the dynamic-rank numeric array used at the API boundary
//! - **Element**: how a per-entry value is laid out in the trailing dimensions of an array
//! - **Broadcasting**: right-aligned shape matching, sizes must agree or be 1
//!
//! # Quick Start
//!
//! ```rust
//! use glam::DVec3;
//! use posekit_batch::{Array, Batch};
//!
//! // a [2, 3] array read as two 3-vectors
//! let points = Array::from_rows(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
//! let points = points.elements::<DVec3>().unwrap();
//! assert_eq!(points.shape(), &[2]);
//!
//! // broadcast against a single offset
//! let offset = Batch::scalar(DVec3::Z);
//! let moved = points.zip_map(&offset, |p, o| *p + *o).unwrap();
//! assert_eq!(moved.to_array().shape(), &[2, 3]);
//! ```

/// Batch container and numeric array.
pub mod batch;

/// Broadcasting of several batched operands.
pub mod broadcast;

/// Per-element layouts.
pub mod element;

/// Error types for shape handling.
pub mod error;

/// Shape arithmetic: element counts, strides and broadcast shapes.
pub mod shape;

pub use crate::batch::{Array, Batch};
pub use crate::broadcast::{broadcast_leading_axes, BatchShaped, BroadcastLeadingAxes};
pub use crate::element::Element;
pub use crate::error::ShapeError;
