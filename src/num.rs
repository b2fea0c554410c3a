//! Tolerant float predicates used throughout the planner.
//!
//! D* Lite's consistency check (`g(u) == rhs(u)`) and its queue ordering
//! both compare floats built up from sums of costs and heuristics. Strict
//! equality on `f64` lets rounding noise desynchronize the two, so every
//! comparison in this crate goes through `approx_eq`/`approx_lt`/`approx_gt`.

/// Tolerance below which two floats are considered equal.
pub const EPSILON: f64 = 1e-5;

/// Sentinel for "unreachable" / "no finite estimate yet".
pub const INFINITY: f64 = f64::INFINITY;

/// Precomputed diagonal step cost for a king-move grid.
pub const SQRT_2: f64 = std::f64::consts::SQRT_2;

/// `true` if `a` and `b` are within [`EPSILON`] of each other.
///
/// Two infinities of the same sign compare equal outright. `inf - inf` is
/// `NaN`, which would otherwise make every never-reached cell look
/// perpetually inconsistent with itself.
pub fn approx_eq(a: f64, b: f64) -> bool {
    if a == b {
        return true;
    }
    (a - b).abs() <= EPSILON
}

/// `true` if `a` is less than `b`, outside the tolerance band.
pub fn approx_lt(a: f64, b: f64) -> bool {
    a < b && !approx_eq(a, b)
}

/// `true` if `a` is greater than `b`, outside the tolerance band.
pub fn approx_gt(a: f64, b: f64) -> bool {
    a > b && !approx_eq(a, b)
}

/// `true` if `a` is less than or equal to `b` under tolerant comparison.
pub fn approx_le(a: f64, b: f64) -> bool {
    !approx_gt(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_within_epsilon() {
        assert!(approx_eq(1.0, 1.0 + EPSILON / 2.0));
        assert!(!approx_eq(1.0, 1.0 + EPSILON * 10.0));
    }

    #[test]
    fn ordering_respects_tolerance() {
        assert!(!approx_lt(1.0, 1.0 + EPSILON / 2.0));
        assert!(approx_lt(1.0, 2.0));
        assert!(approx_gt(2.0, 1.0));
        assert!(!approx_gt(1.0, 1.0 + EPSILON / 2.0));
    }

    #[test]
    fn infinity_sentinel_is_not_finite() {
        assert!(!INFINITY.is_finite());
        assert!(approx_eq(INFINITY, INFINITY));
    }
}
