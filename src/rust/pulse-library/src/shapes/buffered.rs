// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Buffered flux pulses: a main window framed by zero-amplitude buffers,
//! with optionally Gaussian-filtered edges.

use indexmap::IndexMap;
use serde::Deserialize;
use statrs::function::erf::erf;
use std::f64::consts::{SQRT_2, TAU};

use crate::hash::{HashElement, normalize_phase_deg};
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;
use crate::shapes::basic::resolve_channels;
use crate::Result;

/// Error-function step window `[t_start, t_end)`, hard-edged when
/// `sigma == 0`.
fn windowed(tvals: &[f64], t_start: f64, t_end: f64, amplitude: f64, sigma: f64) -> Vec<f64> {
    if sigma > 0.0 {
        let scaling = 1.0 / (SQRT_2 * sigma);
        tvals
            .iter()
            .map(|&t| {
                0.5 * amplitude * (erf((t - t_start) * scaling) - erf((t - t_end) * scaling))
            })
            .collect()
    } else {
        tvals
            .iter()
            .map(|&t| {
                if t >= t_start && t < t_end {
                    amplitude
                } else {
                    0.0
                }
            })
            .collect()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferedSquareParams {
    pub channel: Option<String>,
    pub channels: Vec<String>,
    pub amplitude: f64,
    /// Length of the main window in seconds.
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    pub gaussian_filter_sigma: f64,
}

/// Square pulse framed by zero-amplitude buffers.
#[derive(Debug, Clone)]
pub struct BufferedSquarePulse {
    common: PulseCommon,
    params: BufferedSquareParams,
    channels: Vec<String>,
}

impl BufferedSquarePulse {
    pub const TAG: &'static str = "buffered_square";

    pub fn new(header: PulseHeader, params: BufferedSquareParams) -> Result<Self> {
        let channels = resolve_channels(&params.channel, &params.channels)?;
        Ok(BufferedSquarePulse {
            common: header.into_common(),
            params,
            channels,
        })
    }
}

impl Pulse for BufferedSquarePulse {
    fn common(&self) -> &PulseCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        &mut self.common
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn length(&self) -> f64 {
        self.params.pulse_length
            + self.params.buffer_length_start
            + self.params.buffer_length_end
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) || tvals.is_empty() {
            return vec![0.0; tvals.len()];
        }
        let t_start = tvals[0] + self.params.buffer_length_start;
        let t_end = t_start + self.params.pulse_length;
        windowed(
            tvals,
            t_start,
            t_end,
            self.params.amplitude,
            self.params.gaussian_filter_sigma,
        )
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            self.params.amplitude.into(),
            self.params.pulse_length.into(),
            self.params.buffer_length_start.into(),
            self.params.buffer_length_end.into(),
            self.params.gaussian_filter_sigma.into(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferedCzParams {
    pub channel: Option<String>,
    /// Auxiliary channels and their amplitudes, widened by
    /// `extra_buffer_aux_pulse` on both sides of the main window.
    pub aux_channels_dict: IndexMap<String, f64>,
    pub amplitude: f64,
    /// Carrier frequency in Hz.
    pub frequency: f64,
    /// Carrier phase in degrees.
    pub phase: f64,
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    pub extra_buffer_aux_pulse: f64,
    pub gaussian_filter_sigma: f64,
}

impl Default for BufferedCzParams {
    fn default() -> Self {
        BufferedCzParams {
            channel: None,
            aux_channels_dict: IndexMap::new(),
            amplitude: 0.0,
            frequency: 0.0,
            phase: 0.0,
            pulse_length: 0.0,
            buffer_length_start: 0.0,
            buffer_length_end: 0.0,
            extra_buffer_aux_pulse: 5e-9,
            gaussian_filter_sigma: 0.0,
        }
    }
}

/// Buffered square pulse with a frequency/phase-modulated carrier, plus
/// optional auxiliary channels with their own amplitude and widened window.
#[derive(Debug, Clone)]
pub struct BufferedCzPulse {
    common: PulseCommon,
    params: BufferedCzParams,
    channels: Vec<String>,
}

impl BufferedCzPulse {
    pub const TAG: &'static str = "buffered_cz";

    pub fn new(header: PulseHeader, params: BufferedCzParams) -> Result<Self> {
        let mut channels = resolve_channels(&params.channel, &[])?;
        channels.extend(params.aux_channels_dict.keys().cloned());
        Ok(BufferedCzPulse {
            common: header.into_common(),
            params,
            channels,
        })
    }

    /// Amplitude, start buffer, end buffer and main-window length for one
    /// channel; auxiliary channels play wider with their own amplitude.
    fn channel_layout(&self, channel: &str) -> (f64, f64, f64, f64) {
        let params = &self.params;
        if params.channel.as_deref() == Some(channel) {
            (
                params.amplitude,
                params.buffer_length_start,
                params.buffer_length_end,
                params.pulse_length,
            )
        } else {
            let amplitude = params.aux_channels_dict[channel];
            (
                amplitude,
                params.buffer_length_start - params.extra_buffer_aux_pulse,
                params.buffer_length_end - params.extra_buffer_aux_pulse,
                params.pulse_length + 2.0 * params.extra_buffer_aux_pulse,
            )
        }
    }
}

impl Pulse for BufferedCzPulse {
    fn common(&self) -> &PulseCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        &mut self.common
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn length(&self) -> f64 {
        self.params.pulse_length
            + self.params.buffer_length_start
            + self.params.buffer_length_end
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) || tvals.is_empty() {
            return vec![0.0; tvals.len()];
        }
        let (amplitude, buffer_start, _, pulse_length) = self.channel_layout(channel);
        let t_start = tvals[0] + buffer_start;
        let t_end = t_start + pulse_length;
        let mut wave = windowed(
            tvals,
            t_start,
            t_end,
            amplitude,
            self.params.gaussian_filter_sigma,
        );
        for (sample, &t) in wave.iter_mut().zip(tvals) {
            let t_rel = t - tvals[0];
            *sample *=
                (TAU * (self.params.frequency * t_rel + self.params.phase / 360.0)).cos();
        }
        wave
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        let (amplitude, buffer_start, buffer_end, pulse_length) = self.channel_layout(channel);
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            amplitude.into(),
            pulse_length.into(),
            buffer_start.into(),
            buffer_end.into(),
            self.params.gaussian_filter_sigma.into(),
            self.params.frequency.into(),
            normalize_phase_deg(self.params.phase).into(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NzBufferedCzParams {
    pub channel: Option<String>,
    pub aux_channels_dict: IndexMap<String, f64>,
    pub amplitude: f64,
    /// Amplitude scale of the second, opposite-sign lobe. The lobe lengths
    /// are split so the pulse area is zero for any `alpha`.
    pub alpha: f64,
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    pub extra_buffer_aux_pulse: f64,
    pub gaussian_filter_sigma: f64,
}

impl Default for NzBufferedCzParams {
    fn default() -> Self {
        NzBufferedCzParams {
            channel: None,
            aux_channels_dict: IndexMap::new(),
            amplitude: 0.0,
            alpha: 1.0,
            pulse_length: 0.0,
            buffer_length_start: 0.0,
            buffer_length_end: 0.0,
            extra_buffer_aux_pulse: 5e-9,
            gaussian_filter_sigma: 0.0,
        }
    }
}

/// Net-zero buffered CZ pulse: two opposite-amplitude square lobes.
///
/// The first lobe has length `alpha·L/(alpha+1)` at the full amplitude, the
/// second fills the rest at `-alpha` times the amplitude, so the integral
/// over the pulse vanishes exactly.
#[derive(Debug, Clone)]
pub struct NzBufferedCzPulse {
    common: PulseCommon,
    params: NzBufferedCzParams,
    channels: Vec<String>,
}

struct NzLobes {
    amp1: f64,
    amp2: f64,
    buffer_start: f64,
    buffer_end: f64,
    pulse_length: f64,
    length1: f64,
}

impl NzBufferedCzPulse {
    pub const TAG: &'static str = "nz_buffered_cz";

    pub fn new(header: PulseHeader, params: NzBufferedCzParams) -> Result<Self> {
        let mut channels = resolve_channels(&params.channel, &[])?;
        channels.extend(params.aux_channels_dict.keys().cloned());
        Ok(NzBufferedCzPulse {
            common: header.into_common(),
            params,
            channels,
        })
    }

    fn lobes(&self, channel: &str) -> NzLobes {
        let params = &self.params;
        let alpha = params.alpha;
        if params.channel.as_deref() == Some(channel) {
            NzLobes {
                amp1: params.amplitude,
                amp2: -params.amplitude * alpha,
                buffer_start: params.buffer_length_start,
                buffer_end: params.buffer_length_end,
                pulse_length: params.pulse_length,
                length1: alpha * params.pulse_length / (alpha + 1.0),
            }
        } else {
            let amp1 = params.aux_channels_dict[channel] * params.amplitude;
            let pulse_length = params.pulse_length + 2.0 * params.extra_buffer_aux_pulse;
            NzLobes {
                amp1,
                amp2: -amp1 * alpha,
                buffer_start: params.buffer_length_start - params.extra_buffer_aux_pulse,
                buffer_end: params.buffer_length_end - params.extra_buffer_aux_pulse,
                pulse_length,
                length1: alpha * pulse_length / (alpha + 1.0),
            }
        }
    }
}

impl Pulse for NzBufferedCzPulse {
    fn common(&self) -> &PulseCommon {
        &self.common
    }

    fn common_mut(&mut self) -> &mut PulseCommon {
        &mut self.common
    }

    fn channels(&self) -> &[String] {
        &self.channels
    }

    fn length(&self) -> f64 {
        self.params.pulse_length
            + self.params.buffer_length_start
            + self.params.buffer_length_end
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) || tvals.is_empty() {
            return vec![0.0; tvals.len()];
        }
        let lobes = self.lobes(channel);
        let t_start = tvals[0] + lobes.buffer_start;
        let t_flip = t_start + lobes.length1;
        let t_end = t_start + lobes.pulse_length;
        let sigma = self.params.gaussian_filter_sigma;
        if sigma > 0.0 {
            let scaling = 1.0 / (SQRT_2 * sigma);
            tvals
                .iter()
                .map(|&t| {
                    0.5 * (lobes.amp1 * erf((t - t_start) * scaling)
                        - lobes.amp1 * erf((t - t_flip) * scaling)
                        + lobes.amp2 * erf((t - t_flip) * scaling)
                        - lobes.amp2 * erf((t - t_end) * scaling))
                })
                .collect()
        } else {
            let first = windowed(tvals, t_start, t_flip, lobes.amp1, 0.0);
            let second = windowed(tvals, t_flip, t_end, lobes.amp2, 0.0);
            first
                .into_iter()
                .zip(second)
                .map(|(a, b)| a + b)
                .collect()
        }
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        let lobes = self.lobes(channel);
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            lobes.amp1.into(),
            lobes.pulse_length.into(),
            lobes.buffer_start.into(),
            lobes.buffer_end.into(),
            self.params.gaussian_filter_sigma.into(),
            self.params.alpha.into(),
        ]
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

    fn buffered_square(sigma: f64) -> BufferedSquarePulse {
        let mut pulse = BufferedSquarePulse::new(
            PulseHeader::new("fp", "element_0"),
            BufferedSquareParams {
                channel: Some("flux1".to_string()),
                amplitude: 0.7,
                pulse_length: 50e-9,
                buffer_length_start: 10e-9,
                buffer_length_end: 10e-9,
                gaussian_filter_sigma: sigma,
                ..BufferedSquareParams::default()
            },
        )
        .unwrap();
        pulse.set_algorithm_time(0.0);
        pulse
    }

    #[test]
    fn test_buffered_square_buffer_pulse_buffer_pattern() {
        // 70 ns at 1 GSa/s: 10 zero samples, 50 amplitude samples, 10 zero
        // samples.
        let pulse = buffered_square(0.0);
        let tvals = time_grid(70e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        assert_eq!(wave.len(), 70);
        assert!(wave[..10].iter().all(|&v| v == 0.0));
        assert!(wave[10..60].iter().all(|&v| v == 0.7));
        assert!(wave[60..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_buffered_square_filtered_edges_settle() {
        let pulse = buffered_square(1e-9);
        let tvals = time_grid(70e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        assert!((wave[35] - 0.7).abs() < 1e-9);
        assert!(wave[0].abs() < 1e-9);
        assert!(wave[69].abs() < 1e-9);
    }

    #[test]
    fn test_buffered_square_length_includes_buffers() {
        let pulse = buffered_square(0.0);
        assert!((pulse.length() - 70e-9).abs() < 1e-18);
    }

    fn buffered_cz(aux: &[(&str, f64)]) -> BufferedCzPulse {
        let mut pulse = BufferedCzPulse::new(
            PulseHeader::new("cz", "element_0"),
            BufferedCzParams {
                channel: Some("flux1".to_string()),
                aux_channels_dict: aux
                    .iter()
                    .map(|(c, a)| (c.to_string(), *a))
                    .collect(),
                amplitude: 0.5,
                frequency: 0.0,
                phase: 0.0,
                pulse_length: 40e-9,
                buffer_length_start: 10e-9,
                buffer_length_end: 10e-9,
                extra_buffer_aux_pulse: 5e-9,
                gaussian_filter_sigma: 0.0,
            },
        )
        .unwrap();
        pulse.set_algorithm_time(0.0);
        pulse
    }

    #[test]
    fn test_buffered_cz_aux_channel_plays_wider() {
        let pulse = buffered_cz(&[("flux2", 0.2)]);
        let tvals = time_grid(60e-9, 1e-9);
        let main = pulse.chan_wf("flux1", &tvals);
        let aux = pulse.chan_wf("flux2", &tvals);
        // Main window [10, 50) ns, aux window [5, 55) ns.
        assert_eq!(main[9], 0.0);
        assert_eq!(main[10], 0.5);
        assert_eq!(main[49], 0.5);
        assert_eq!(main[50], 0.0);
        assert_eq!(aux[4], 0.0);
        assert_eq!(aux[5], 0.2);
        assert_eq!(aux[54], 0.2);
        assert_eq!(aux[55], 0.0);
    }

    #[test]
    fn test_buffered_cz_carrier_modulates_window() {
        let mut pulse = buffered_cz(&[]);
        pulse.params.frequency = 25e6;
        pulse.params.phase = 90.0;
        let tvals = time_grid(60e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        // The carrier phase is referenced to the start of the sample window.
        for idx in [10, 20, 35] {
            let t_rel = tvals[idx] - tvals[0];
            let expected = 0.5 * (TAU * (25e6 * t_rel + 0.25)).cos();
            assert!((wave[idx] - expected).abs() < 1e-12);
        }
    }

    fn nz_cz(amplitude: f64, alpha: f64, sigma: f64) -> NzBufferedCzPulse {
        let mut pulse = NzBufferedCzPulse::new(
            PulseHeader::new("nzcz", "element_0"),
            NzBufferedCzParams {
                channel: Some("flux1".to_string()),
                amplitude,
                alpha,
                pulse_length: 40e-9,
                buffer_length_start: 10e-9,
                buffer_length_end: 10e-9,
                gaussian_filter_sigma: sigma,
                ..NzBufferedCzParams::default()
            },
        )
        .unwrap();
        pulse.set_algorithm_time(0.0);
        pulse
    }

    #[test]
    fn test_nz_cz_has_zero_area_for_any_amplitude_and_alpha() {
        for (amplitude, alpha) in [(0.5, 1.0), (0.31, 3.0), (-0.7, 0.25)] {
            let pulse = nz_cz(amplitude, alpha, 0.0);
            let tvals = time_grid(70e-9, 0.01e-9);
            let area = pulse.pulse_area("flux1", &tvals);
            // The discrete sum approximates the zero integral to within one
            // sample of the lobe amplitude.
            assert!(
                area.abs() < amplitude.abs() * alpha.max(1.0) * 0.02e-9,
                "area {area} for amplitude {amplitude}, alpha {alpha}"
            );
        }
    }

    #[test]
    fn test_nz_cz_filtered_area_vanishes() {
        let pulse = nz_cz(0.5, 1.0, 1e-9);
        let tvals = time_grid(70e-9, 0.1e-9);
        let area = pulse.pulse_area("flux1", &tvals);
        assert!(area.abs() < 1e-13);
    }

    #[test]
    fn test_nz_cz_lobes_have_opposite_sign() {
        let pulse = nz_cz(0.5, 1.0, 0.0);
        let tvals = time_grid(70e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        // alpha = 1: flip at 10 + 20 = 30 ns.
        assert_eq!(wave[15], 0.5);
        assert_eq!(wave[45], -0.5);
    }

    #[test]
    fn test_nz_cz_hash_covers_alpha_and_aux_amplitude() {
        let reference = nz_cz(0.5, 1.0, 0.0);
        let reference_hash = waveform_uid(&reference.hashables(0.0, "flux1"));
        let different_alpha = nz_cz(0.5, 2.0, 0.0);
        assert_ne!(
            reference_hash,
            waveform_uid(&different_alpha.hashables(0.0, "flux1"))
        );

        // The aux channel hash must capture the scaled amplitude: changing
        // the main amplitude changes the aux waveform too.
        let mut with_aux = NzBufferedCzPulse::new(
            PulseHeader::new("nzcz", "element_0"),
            NzBufferedCzParams {
                channel: Some("flux1".to_string()),
                aux_channels_dict: [("flux2".to_string(), 0.3)].into_iter().collect(),
                amplitude: 0.5,
                alpha: 1.0,
                pulse_length: 40e-9,
                ..NzBufferedCzParams::default()
            },
        )
        .unwrap();
        with_aux.set_algorithm_time(0.0);
        let aux_hash = waveform_uid(&with_aux.hashables(0.0, "flux2"));
        with_aux.params.amplitude = 0.8;
        assert_ne!(aux_hash, waveform_uid(&with_aux.hashables(0.0, "flux2")));
    }
}
