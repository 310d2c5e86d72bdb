// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

/// Cumulative trapezoidal integral of `values` sampled on a uniform grid with
/// spacing `dx`. The first element of the result is 0, matching the integral
/// over a single support point.
pub fn cumulative_trapezoid(values: &[f64], dx: f64) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let mut acc = 0.0;
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            acc += 0.5 * (values[i - 1] + v) * dx;
        }
        out.push(acc);
    }
    out
}

/// Piecewise-linear interpolation of `(xs, ys)` onto `x_new`, extrapolating
/// with the first/last segment's slope beyond the support boundaries.
///
/// `xs` must be non-decreasing. A degenerate segment (two equal support
/// times, as produced by a time-warp through a zero-velocity region) yields
/// the segment's left value instead of dividing by zero.
pub fn interp_extrapolate(xs: &[f64], ys: &[f64], x_new: &[f64]) -> Vec<f64> {
    assert_eq!(
        xs.len(),
        ys.len(),
        "interpolation support and values must have equal length"
    );
    assert!(
        xs.len() >= 2,
        "interpolation needs at least two support points"
    );
    x_new
        .iter()
        .map(|&x| {
            let idx = match xs.binary_search_by(|v| v.total_cmp(&x)) {
                Ok(i) => i,
                Err(i) => i.saturating_sub(1),
            };
            let idx = idx.min(xs.len() - 2);
            let (x0, x1) = (xs[idx], xs[idx + 1]);
            let (y0, y1) = (ys[idx], ys[idx + 1]);
            if x1 == x0 {
                y0
            } else {
                y0 + (y1 - y0) * (x - x0) / (x1 - x0)
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cumulative_trapezoid() {
        // Integral of a constant 1 is the elapsed time.
        let t = cumulative_trapezoid(&[1.0, 1.0, 1.0], 0.5);
        assert_eq!(t, vec![0.0, 0.5, 1.0]);

        // Integral of a ramp 0,1,2 with dx=1 is 0, 0.5, 2.
        let t = cumulative_trapezoid(&[0.0, 1.0, 2.0], 1.0);
        assert_eq!(t, vec![0.0, 0.5, 2.0]);
    }

    #[test]
    fn test_interp_identity_grid() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [0.0, 2.0, 4.0, 6.0];
        let out = interp_extrapolate(&xs, &ys, &[0.0, 0.5, 2.5, 3.0]);
        assert_eq!(out, vec![0.0, 1.0, 5.0, 6.0]);
    }

    #[test]
    fn test_interp_extrapolates_at_boundaries() {
        let xs = [0.0, 1.0];
        let ys = [1.0, 3.0];
        let out = interp_extrapolate(&xs, &ys, &[-1.0, 2.0]);
        assert_eq!(out, vec![-1.0, 5.0]);
    }

    #[test]
    fn test_interp_degenerate_segment() {
        let xs = [0.0, 1.0, 1.0, 2.0];
        let ys = [0.0, 1.0, 2.0, 3.0];
        let out = interp_extrapolate(&xs, &ys, &[1.0]);
        assert!(out[0].is_finite());
    }
}
