/// Below this threshold (on a squared angle, a squared vector norm or
/// `|cos θ - 1|`) the closed-form maps switch to their Taylor expansions.
pub const TAYLOR_EPSILON: f64 = 1.0e-10;

/// Squared norms within this distance of 1 are left untouched by `normalize`,
/// which makes normalization idempotent bit for bit.
pub const NORMALIZE_TOLERANCE: f64 = 1.0e-12;
