// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Gaussian-filtered piecewise-constant pulses.
//!
//! To avoid clipping of the filtered rising and falling edges, these pulses
//! should start and end with zero-amplitude buffer segments.

use serde::Deserialize;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

use crate::hash::HashElement;
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussianFilteredPiecewiseConstParams {
    pub channels: Vec<String>,
    /// Per-channel list of segment durations in seconds.
    pub lengths: Vec<Vec<f64>>,
    /// Per-channel list of segment amplitudes; shape must match `lengths`.
    pub amplitudes: Vec<Vec<f64>>,
    /// Width of the Gaussian edge filter in seconds. 0 produces hard edges.
    pub gaussian_filter_sigma: f64,
}

/// Arbitrary sequence of constant-amplitude segments per channel, with
/// error-function-smoothed transitions between consecutive segments.
#[derive(Debug, Clone)]
pub struct GaussianFilteredPiecewiseConstPulse {
    common: PulseCommon,
    params: GaussianFilteredPiecewiseConstParams,
}

impl GaussianFilteredPiecewiseConstPulse {
    pub const TAG: &'static str = "gaussian_filtered_piecewise_const";

    pub fn new(header: PulseHeader, params: GaussianFilteredPiecewiseConstParams) -> Self {
        assert_eq!(
            params.lengths.len(),
            params.channels.len(),
            "segment lengths must be given per channel"
        );
        assert_eq!(
            params.amplitudes.len(),
            params.channels.len(),
            "segment amplitudes must be given per channel"
        );
        for (lengths, amplitudes) in params.lengths.iter().zip(&params.amplitudes) {
            assert_eq!(
                lengths.len(),
                amplitudes.len(),
                "per-channel segment lengths and amplitudes must match"
            );
        }
        GaussianFilteredPiecewiseConstPulse {
            common: header.into_common(),
            params,
        }
    }
}

impl Pulse for GaussianFilteredPiecewiseConstPulse {
    fn common(&self) -> &PulseCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        &mut self.common
    }

    fn channels(&self) -> &[String] {
        &self.params.channels
    }

    fn length(&self) -> f64 {
        self.params
            .lengths
            .iter()
            .map(|lengths| lengths.iter().sum::<f64>())
            .fold(0.0, f64::max)
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let mut t_step = self.algorithm_time();
        let Some(idx) = self.params.channels.iter().position(|c| c == channel) else {
            return vec![0.0; tvals.len()];
        };
        let sigma = self.params.gaussian_filter_sigma;
        let mut wave = vec![0.0; tvals.len()];
        for (&seg_len, &seg_amp) in self.params.lengths[idx]
            .iter()
            .zip(&self.params.amplitudes[idx])
        {
            let t_next = t_step + seg_len;
            if sigma > 0.0 {
                let timescale = 1.0 / (SQRT_2 * sigma);
                for (sample, &t) in wave.iter_mut().zip(tvals) {
                    *sample += 0.5
                        * seg_amp
                        * (erf((t - t_step) * timescale) - erf((t - t_next) * timescale));
                }
            } else {
                for (sample, &t) in wave.iter_mut().zip(tvals) {
                    if t >= t_step && t < t_next {
                        *sample += seg_amp;
                    }
                }
            }
            t_step = t_next;
        }
        wave
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        let Some(idx) = self.params.channels.iter().position(|c| c == channel) else {
            return vec![];
        };
        let mut hashlist = vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            self.params.lengths[idx].len().into(),
        ];
        hashlist.extend(self.params.lengths[idx].iter().map(|&l| HashElement::from(l)));
        hashlist.extend(
            self.params.amplitudes[idx]
                .iter()
                .map(|&a| HashElement::from(a)),
        );
        hashlist.push(self.params.gaussian_filter_sigma.into());
        hashlist
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NzTransitionControlledParams {
    pub channels: Vec<String>,
    /// Length of each main lobe; a single value broadcasts to all channels.
    pub main_lens: Vec<f64>,
    /// Amplitude of the main lobes; single value broadcasts.
    pub main_amps: Vec<f64>,
    /// Length of the transition segment between the lobes; single value
    /// broadcasts.
    pub trans_lens: Vec<f64>,
    /// Amplitude of the transition segments; single value broadcasts.
    pub trans_amps: Vec<f64>,
    /// Amplitude offset added to both main lobes; single value broadcasts.
    pub amp_offsets: Vec<f64>,
    pub gaussian_filter_sigma: f64,
    pub buffer_start: f64,
    pub buffer_end: f64,
}

impl Default for NzTransitionControlledParams {
    fn default() -> Self {
        NzTransitionControlledParams {
            channels: vec![],
            main_lens: vec![0.0],
            main_amps: vec![0.0],
            trans_lens: vec![0.0],
            trans_amps: vec![0.0],
            amp_offsets: vec![0.0],
            gaussian_filter_sigma: 0.0,
            buffer_start: 0.0,
            buffer_end: 0.0,
        }
    }
}

/// Zero-area pulse with a controllable transition between its two main
/// halves.
///
/// The shape is the 6-segment sequence buffer, main+offset, transition,
/// -transition, -main+offset, buffer. The transition segment lengths are
/// solved so that a nonzero amplitude offset on the main lobes is exactly
/// compensated and the total area stays zero; this requires
/// `|main_len·offset| < |trans_len·trans_amp|`.
#[derive(Debug, Clone)]
pub struct NzTransitionControlledPulse {
    inner: GaussianFilteredPiecewiseConstPulse,
}

impl NzTransitionControlledPulse {
    pub const TAG: &'static str = "nz_transition_controlled";

    pub fn new(header: PulseHeader, params: NzTransitionControlledParams) -> Self {
        let n = params.channels.len();
        let main_lens = broadcast(&params.main_lens, n, "main_lens");
        let main_amps = broadcast(&params.main_amps, n, "main_amps");
        let trans_lens = broadcast(&params.trans_lens, n, "trans_lens");
        let trans_amps = broadcast(&params.trans_amps, n, "trans_amps");
        let amp_offsets = broadcast(&params.amp_offsets, n, "amp_offsets");

        let mut lengths = Vec::with_capacity(n);
        let mut amplitudes = Vec::with_capacity(n);
        for i in 0..n {
            let (ml, ma) = (main_lens[i], main_amps[i]);
            let (tl, ta) = (trans_lens[i], trans_amps[i]);
            let ao = amp_offsets[i];
            // The amplitude offset must be small enough to be compensated by
            // adjusting the lengths of the transition segments.
            assert!(
                (ml * ao).abs() < (tl * ta).abs(),
                "amplitude offset cannot be compensated within the transition segment"
            );
            amplitudes.push(vec![0.0, ma + ao, ta, -ta, -ma + ao, 0.0]);
            lengths.push(vec![
                params.buffer_start,
                ml / 2.0,
                (tl - ml * ao / ta) / 2.0,
                (tl + ml * ao / ta) / 2.0,
                ml / 2.0,
                params.buffer_end,
            ]);
        }

        NzTransitionControlledPulse {
            inner: GaussianFilteredPiecewiseConstPulse::new(
                header,
                GaussianFilteredPiecewiseConstParams {
                    channels: params.channels,
                    lengths,
                    amplitudes,
                    gaussian_filter_sigma: params.gaussian_filter_sigma,
                },
            ),
        }
    }
}

fn broadcast(values: &[f64], n: usize, what: &str) -> Vec<f64> {
    if values.len() == 1 {
        vec![values[0]; n]
    } else {
        assert_eq!(values.len(), n, "{what} must be given per channel");
        values.to_vec()
    }
}

impl Pulse for NzTransitionControlledPulse {
    fn common(&self) -> &PulseCommon {
        self.inner.common()
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        self.inner.common_mut()
    }

    fn channels(&self) -> &[String] {
        self.inner.channels()
    }

    fn length(&self) -> f64 {
        self.inner.length()
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        self.inner.chan_wf(channel, tvals)
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        // Identical segment tables produce identical samples, so the hash
        // can be shared with the generic piecewise shape.
        self.inner.hashables(tstart, channel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::waveform_uid;

    /// Sample-centered grid: edges land between samples, so hard-edged
    /// windows are unambiguous.
    fn time_grid(length: f64, dt: f64) -> Vec<f64> {
        let n = (length / dt).round() as usize;
        (0..n).map(|i| (i as f64 + 0.5) * dt).collect()
    }

    fn piecewise(sigma: f64) -> GaussianFilteredPiecewiseConstPulse {
        let mut pulse = GaussianFilteredPiecewiseConstPulse::new(
            PulseHeader::new("pw", "element_0"),
            GaussianFilteredPiecewiseConstParams {
                channels: vec!["flux1".to_string()],
                lengths: vec![vec![10e-9, 20e-9, 10e-9]],
                amplitudes: vec![vec![0.0, 0.5, 0.0]],
                gaussian_filter_sigma: sigma,
            },
        );
        pulse.set_algorithm_time(0.0);
        pulse
    }

    #[test]
    fn test_hard_edges_reproduce_segment_table() {
        let pulse = piecewise(0.0);
        let tvals = time_grid(40e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        assert!(wave[..10].iter().all(|&v| v == 0.0));
        assert!(wave[10..30].iter().all(|&v| v == 0.5));
        assert!(wave[30..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_filtered_edges_settle_to_segment_amplitudes() {
        let pulse = piecewise(0.5e-9);
        let tvals = time_grid(40e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        // Far from the transitions the waveform sits on the plateau.
        assert!((wave[20] - 0.5).abs() < 1e-6);
        assert!(wave[0].abs() < 1e-6);
        assert!(wave[39].abs() < 1e-6);
        // The rising edge crosses at half amplitude exactly on the segment
        // boundary.
        let edge = pulse.chan_wf("flux1", &[10e-9]);
        assert!((edge[0] - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_length_is_max_channel_total() {
        let pulse = GaussianFilteredPiecewiseConstPulse::new(
            PulseHeader::new("pw", "element_0"),
            GaussianFilteredPiecewiseConstParams {
                channels: vec!["a".to_string(), "b".to_string()],
                lengths: vec![vec![10e-9, 20e-9], vec![50e-9]],
                amplitudes: vec![vec![0.1, 0.2], vec![0.3]],
                gaussian_filter_sigma: 0.0,
            },
        );
        assert!((pulse.length() - 50e-9).abs() < 1e-18);
    }

    #[test]
    #[should_panic(expected = "segment lengths and amplitudes must match")]
    fn test_mismatched_segment_table_is_rejected() {
        let _ = GaussianFilteredPiecewiseConstPulse::new(
            PulseHeader::new("pw", "element_0"),
            GaussianFilteredPiecewiseConstParams {
                channels: vec!["a".to_string()],
                lengths: vec![vec![10e-9, 20e-9]],
                amplitudes: vec![vec![0.1]],
                gaussian_filter_sigma: 0.0,
            },
        );
    }

    #[test]
    fn test_hashables_track_segment_table() {
        let pulse = piecewise(0.0);
        let reference = waveform_uid(&pulse.hashables(0.0, "flux1"));
        let other = GaussianFilteredPiecewiseConstParams {
            channels: vec!["flux1".to_string()],
            lengths: vec![vec![10e-9, 20e-9, 10e-9]],
            amplitudes: vec![vec![0.0, 0.6, 0.0]],
            gaussian_filter_sigma: 0.0,
        };
        let mut changed =
            GaussianFilteredPiecewiseConstPulse::new(PulseHeader::new("pw", "element_0"), other);
        changed.set_algorithm_time(0.0);
        assert_ne!(reference, waveform_uid(&changed.hashables(0.0, "flux1")));
        assert!(pulse.hashables(0.0, "other_channel").is_empty());
    }

    fn nz_transition(amp_offset: f64) -> NzTransitionControlledPulse {
        let mut pulse = NzTransitionControlledPulse::new(
            PulseHeader::new("nzt", "element_0"),
            NzTransitionControlledParams {
                channels: vec!["flux1".to_string()],
                main_lens: vec![40e-9],
                main_amps: vec![0.5],
                trans_lens: vec![20e-9],
                trans_amps: vec![0.1],
                amp_offsets: vec![amp_offset],
                gaussian_filter_sigma: 0.0,
                buffer_start: 10e-9,
                buffer_end: 10e-9,
            },
        );
        pulse.set_algorithm_time(0.0);
        pulse
    }

    #[test]
    fn test_nz_transition_pulse_has_zero_area() {
        for offset in [0.0, 0.02, -0.04] {
            let pulse = nz_transition(offset);
            let tvals = time_grid(pulse.length(), 0.1e-9);
            let area = pulse.pulse_area("flux1", &tvals);
            assert!(
                area.abs() < 1e-12,
                "area {area} not compensated for offset {offset}"
            );
        }
    }

    #[test]
    #[should_panic(expected = "amplitude offset cannot be compensated")]
    fn test_nz_transition_infeasible_offset_is_rejected() {
        // |main_len * offset| = 40e-9*0.1 exceeds |trans_len * trans_amp| =
        // 20e-9*0.1.
        let _ = nz_transition(0.1);
    }
}
