// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Waveform truncation.
//!
//! A pulse can be cut off early: either with a hard zero beyond the
//! truncation length, or blending the tail into a Gaussian-CDF decay, with
//! an optional cubic-spline bridge that removes the slope discontinuity at
//! the truncation point.

use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

/// Truncation configuration of a pulse.
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Truncation length in seconds, measured from the first sample time.
    /// Best chosen as (n+0.5) samples to avoid rounding errors at the cut.
    pub length: f64,
    /// Smooth tail decay; `None` cuts hard to zero.
    pub decay: Option<TruncationDecay>,
    /// Number of samples of the cubic-spline bridge at the truncation
    /// point. 0 disables the bridge.
    pub nr_points_spline: usize,
}

impl Truncation {
    pub fn hard(length: f64) -> Self {
        Truncation {
            length,
            decay: None,
            nr_points_spline: 0,
        }
    }
}

/// Error-function decay of a truncated tail.
#[derive(Debug, Clone, PartialEq)]
pub struct TruncationDecay {
    /// Width of the decay in seconds.
    pub sigma: f64,
    /// Extent of the decay in units of `sigma`.
    pub nr_sigma: f64,
}

/// Truncate a waveform. Identity when `truncation` is `None`.
pub fn truncate(tvals: &[f64], wave: Vec<f64>, truncation: Option<&Truncation>) -> Vec<f64> {
    let Some(truncation) = truncation else {
        return wave;
    };
    if tvals.is_empty() {
        return wave;
    }
    let mut wave = wave;
    let t_cut = tvals[0] + truncation.length;

    let decay = match &truncation.decay {
        Some(decay) if decay.sigma > 0.0 => decay,
        _ => {
            for (sample, &t) in wave.iter_mut().zip(tvals) {
                if t > t_cut {
                    *sample = 0.0;
                }
            }
            return wave;
        }
    };

    // Index of the last sample kept untouched by the cut.
    let kept = tvals.iter().filter(|&&t| t <= t_cut).count();
    let splice_idx = kept.saturating_sub(1);
    let decay_start_idx = splice_idx + truncation.nr_points_spline / 2;
    if decay_start_idx >= wave.len() {
        return wave;
    }

    let decay_length = decay.sigma * decay.nr_sigma;
    let t_offset = t_cut + decay_length / 2.0;
    let amplitude = wave[decay_start_idx];
    let scaling = 1.0 / (SQRT_2 * decay.sigma);
    for i in decay_start_idx..wave.len() {
        wave[i] = amplitude * 0.5 * (1.0 - erf((tvals[i] - t_offset) * scaling));
    }

    if truncation.nr_points_spline > 0 {
        apply_spline_bridge(tvals, &mut wave, splice_idx, truncation.nr_points_spline);
    }
    wave
}

/// Replace `wave[start..start + nr_points]` with a cubic that passes through
/// the two samples before the bridge and the two samples after it, removing
/// the kink at the truncation point.
fn apply_spline_bridge(tvals: &[f64], wave: &mut [f64], start: usize, nr_points: usize) {
    let stop = start + nr_points;
    if start < 1 || stop + 1 >= wave.len() {
        return;
    }
    let mut matrix = [[0.0; 4]; 4];
    let mut rhs = [0.0; 4];
    for (row, &idx) in [start - 1, start, stop, stop + 1].iter().enumerate() {
        let t = tvals[idx];
        matrix[row] = [t * t * t, t * t, t, 1.0];
        rhs[row] = wave[idx];
    }
    let coefficients = solve4(matrix, rhs);
    for (i, sample) in wave.iter_mut().enumerate().take(stop).skip(start) {
        let t = tvals[i];
        *sample =
            coefficients[0] * t * t * t + coefficients[1] * t * t + coefficients[2] * t
                + coefficients[3];
    }
}

/// Solve a 4x4 linear system with partial pivoting.
fn solve4(mut a: [[f64; 4]; 4], mut b: [f64; 4]) -> [f64; 4] {
    for col in 0..4 {
        let mut pivot = col;
        for row in col + 1..4 {
            if a[row][col].abs() > a[pivot][col].abs() {
                pivot = row;
            }
        }
        assert!(
            a[pivot][col] != 0.0,
            "singular spline system; sample times must be distinct"
        );
        a.swap(col, pivot);
        b.swap(col, pivot);
        for row in col + 1..4 {
            let factor = a[row][col] / a[col][col];
            for k in col..4 {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }
    let mut x = [0.0; 4];
    for col in (0..4).rev() {
        let mut acc = b[col];
        for k in col + 1..4 {
            acc -= a[col][k] * x[k];
        }
        x[col] = acc / a[col][col];
    }
    x
}
