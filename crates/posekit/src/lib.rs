#![doc = include_str!(concat!("../", env!("CARGO_PKG_README")))]

#[doc(inline)]
pub use posekit_batch as batch;

#[doc(inline)]
pub use posekit_lie as lie;
