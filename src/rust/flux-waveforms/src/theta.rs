// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use std::f64::consts::PI;

use log::debug;

use crate::numerics::{cumulative_trapezoid, interp_extrapolate};

/// Keeps the trajectory away from the θ = π pole, where the detuning diverges.
const THETA_CLIP_MARGIN: f64 = 0.01;

/// Parameters of the Martinis-Geller interaction-angle trajectory.
///
/// The trajectory ramps the interaction angle from `theta_i` to `theta_f`
/// over the pulse length, shaped by the harmonic coefficients
/// `lambda_1..lambda_4`. An optional plateau ("step") can floor one half of
/// the trajectory at `theta_i + step_max * step_height`.
#[derive(Debug, Clone)]
pub struct ThetaPulseConfig {
    /// Initial interaction angle in radians.
    pub theta_i: f64,
    /// Final interaction angle in radians.
    pub theta_f: f64,
    pub lambda_1: f64,
    pub lambda_2: f64,
    pub lambda_3: f64,
    pub lambda_4: f64,
    /// Plateau height as a fraction of `step_max`.
    pub step_height: f64,
    /// Maximum plateau angle offset in radians.
    pub step_max: f64,
    /// Apply the plateau to the first half of the pulse instead of the second.
    pub step_first: bool,
    /// Enables the plateau floor.
    pub apply_wait_time: bool,
    /// When set, `theta_f` below `theta_i` is clipped up to `theta_i` and the
    /// trajectory is clipped into `[theta_i, π)` instead of `[0, π)`.
    pub theta_f_must_be_above: bool,
    /// AWG sampling rate in Hz.
    pub sampling_rate: f64,
    /// Oversampling of the proper-time grid. Affects only the grid density,
    /// not the physical length of the result.
    pub fine_sampling_factor: u32,
    /// Enables the proper-time to physical-time warp.
    pub interpolate: bool,
}

impl Default for ThetaPulseConfig {
    fn default() -> Self {
        ThetaPulseConfig {
            theta_i: 0.0,
            theta_f: PI / 2.0,
            lambda_1: 0.0,
            lambda_2: 0.0,
            lambda_3: 0.0,
            lambda_4: 0.0,
            step_height: 0.0,
            step_max: PI / 200.0,
            step_first: false,
            apply_wait_time: true,
            theta_f_must_be_above: true,
            sampling_rate: 2.4e9,
            fine_sampling_factor: 1,
            interpolate: false,
        }
    }
}

/// Generate the θ(t) trajectory of Martinis & Geller, PRA 90 022307 (2014):
///
/// ```text
/// θ(τ) = θ_i + (θ_f − θ_i) · Σ_n λ_n·(1 − cos(n·2π·τ/τ_p))
/// ```
///
/// built on a dense proper-time grid τ and optionally warped onto the
/// physical time axis by integrating sin θ, so that the transition rate stays
/// adiabatic where the coupling is weak. The result has exactly
/// `round(length * sampling_rate)` samples spanning `length` seconds.
///
/// A `theta_f` below `theta_i` is clipped (with a diagnostic log), not
/// rejected; NaN samples from degenerate boundary extrapolation are replaced
/// by 0.
pub fn martinis_theta_waveform(length: f64, config: &ThetaPulseConfig) -> Vec<f64> {
    let theta_i = config.theta_i;
    let mut theta_f = config.theta_f;
    if theta_f < theta_i && config.theta_f_must_be_above {
        debug!(
            "theta_f ({:.2} deg) < theta_i ({:.2} deg): final coupling weaker than initial coupling",
            theta_f.to_degrees(),
            theta_i.to_degrees()
        );
        theta_f = theta_f.clamp(theta_i, PI - THETA_CLIP_MARGIN);
    }

    let fine_rate = config.sampling_rate * f64::from(config.fine_sampling_factor);
    let nr_samples = (length * fine_rate).round() as usize;
    let nr_out = (length * config.sampling_rate).round() as usize;
    if nr_samples == 0 || nr_out == 0 {
        return vec![];
    }
    let rounded_length = nr_samples as f64 / fine_rate;
    let tau_step = 1.0 / fine_rate;
    let taus: Vec<f64> = (0..nr_samples).map(|i| i as f64 * tau_step).collect();

    // lambda_0 absorbs the constant part of the trajectory; the odd
    // coefficients are rescaled so their sum matches the target norm of 1/2
    // (constraint of eq. 16). The factor stays 1 when the odd sum vanishes.
    let lambda_0 = 1.0 - config.lambda_1;
    let norm_odd = config.lambda_1 + config.lambda_3 + lambda_0;
    let desired_norm = 0.5;
    let factor = if norm_odd.abs() > 0.0 {
        desired_norm / norm_odd
    } else {
        1.0
    };
    let lambda_1 = config.lambda_1 * factor;
    let lambda_3 = config.lambda_3 * factor;

    let mut theta_wave: Vec<f64> = taus
        .iter()
        .map(|&tau| {
            let base = 2.0 * PI * tau / rounded_length;
            let dtheta = lambda_0
                + lambda_1 * (1.0 - base.cos())
                + config.lambda_2 * (1.0 - (2.0 * base).cos())
                + lambda_3 * (1.0 - (3.0 * base).cos())
                + config.lambda_4 * (1.0 - (4.0 * base).cos());
            theta_i + dtheta * (theta_f - theta_i)
        })
        .collect();

    // Plateau floor on one half of the trajectory. A floor, not an override:
    // samples already above the step angle are left untouched.
    if config.apply_wait_time {
        let l_half = theta_wave.len() / 2;
        let step_angle = theta_i + config.step_max * config.step_height;
        let range = if config.step_first {
            0..l_half
        } else {
            theta_wave.len() - l_half..theta_wave.len()
        };
        for v in &mut theta_wave[range] {
            if *v < step_angle {
                *v = step_angle;
            }
        }
    }

    // Clip to avoid poles when the angle is later converted to a detuning.
    let clip_max = PI - THETA_CLIP_MARGIN;
    let clip_min = if config.theta_f_must_be_above {
        theta_i.min(clip_max)
    } else {
        0.0
    };
    let mut was_clipped = false;
    for v in &mut theta_wave {
        let clamped = v.clamp(clip_min, clip_max);
        if clamped != *v {
            was_clipped = true;
            *v = clamped;
        }
    }
    if was_clipped {
        debug!(
            "flux waveform clipped into [{:.2}, 180) deg",
            clip_min.to_degrees()
        );
    }

    let t_samples: Vec<f64> = (0..nr_out)
        .map(|i| i as f64 / config.sampling_rate)
        .collect();

    if theta_wave.len() < 2 {
        return vec![theta_wave[0]; nr_out];
    }

    // Warp proper time onto the physical axis: the physical time elapsed up
    // to τ is the integral of sin θ, rescaled so the trajectory spans exactly
    // the requested length regardless of numerical drift in the integral.
    let support: Vec<f64> = if config.interpolate {
        let sin_theta: Vec<f64> = theta_wave.iter().map(|v| v.sin()).collect();
        let mut t = cumulative_trapezoid(&sin_theta, tau_step);
        let t_end = *t.last().unwrap_or(&0.0);
        let ts_end = *t_samples.last().unwrap_or(&0.0);
        if t_end > 0.0 && ts_end > 0.0 {
            let scale = t_end / ts_end;
            for v in &mut t {
                *v /= scale;
            }
        }
        t
    } else {
        taus
    };

    let mut out = interp_extrapolate(&support, &theta_wave, &t_samples);
    for v in &mut out {
        if v.is_nan() {
            *v = 0.0;
        }
    }
    out
}

/// Converts a detuning ε into the interaction angle θ = arctan(2g/ε).
///
/// Zero detuning maps to θ = π/2, the resonant interaction point.
pub fn eps_to_theta(eps: f64, g: f64) -> f64 {
    (2.0 * g / eps).atan()
}

/// Converts an interaction angle θ into the detuning ε = 2g/tan(θ).
pub fn theta_to_eps(theta: f64, g: f64) -> f64 {
    2.0 * g / theta.tan()
}
