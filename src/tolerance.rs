// Centralized tolerances for weight arithmetic

pub const EPS_SUM: f64 = 1e-6; // row-sum invariant slack
pub const EPS_MASS: f64 = 1e-9; // zero-mass guard for redistribution denominators
pub const EPS_WEIGHT: f64 = 1e-12; // "this cell is zero" threshold
pub const DEFAULT_AUTO_PRUNE: f64 = 1e-4; // auto-prune threshold for additive edits

#[inline]
pub fn clamp01(x: f64) -> f64 {
    x.max(0.0).min(1.0)
}
