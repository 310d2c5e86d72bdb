// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Gauss-filtered cosine I/Q pulses.
//!
//! An error-function-windowed constant envelope, single-sideband modulated
//! onto an I/Q channel pair; the multi-chromatic variant plays several
//! simultaneous tones through the same envelope.

use serde::Deserialize;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

use crate::hash::{HashElement, normalize_phase_deg};
use crate::modulation::{ModulationParams, apply_modulation};
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;
use crate::{Error, Result};

fn gauss_filtered_window(
    tvals: &[f64],
    pulse_length: f64,
    nr_sigma: f64,
    sigma: f64,
    amplitude: f64,
) -> Vec<f64> {
    if tvals.is_empty() {
        return vec![];
    }
    if sigma > 0.0 {
        let t_start = tvals[0] + 0.5 * sigma * nr_sigma;
        let t_end = t_start + pulse_length;
        let scaling = 1.0 / (SQRT_2 * sigma);
        tvals
            .iter()
            .map(|&t| {
                0.5 * amplitude * (erf((t - t_start) * scaling) - erf((t - t_end) * scaling))
            })
            .collect()
    } else {
        let t_start = tvals[0];
        let t_end = t_start + pulse_length;
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

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussFilteredCosIqParams {
    pub i_channel: Option<String>,
    pub q_channel: Option<String>,
    pub amplitude: f64,
    pub pulse_length: f64,
    /// Modulation frequency in Hz.
    pub mod_frequency: f64,
    /// Modulation phase in degrees.
    pub phase: f64,
    /// Extent of the Gaussian edges in units of the filter sigma.
    pub nr_sigma: f64,
    pub alpha: f64,
    pub phi_skew: f64,
    pub gaussian_filter_sigma: f64,
    /// Phase reference: the start of the algorithm when set, the pulse's
    /// own start time otherwise.
    pub phase_lock: bool,
}

impl Default for GaussFilteredCosIqParams {
    fn default() -> Self {
        GaussFilteredCosIqParams {
            i_channel: None,
            q_channel: None,
            amplitude: 0.0,
            pulse_length: 0.0,
            mod_frequency: 0.0,
            phase: 0.0,
            nr_sigma: 5.0,
            alpha: 1.0,
            phi_skew: 0.0,
            gaussian_filter_sigma: 0.0,
            phase_lock: false,
        }
    }
}

/// Error-function-windowed constant envelope on an I/Q channel pair.
#[derive(Debug, Clone)]
pub struct GaussFilteredCosIqPulse {
    common: PulseCommon,
    params: GaussFilteredCosIqParams,
    channels: Vec<String>,
}

impl GaussFilteredCosIqPulse {
    pub const TAG: &'static str = "gauss_filtered_cos_iq";

    pub fn new(header: PulseHeader, params: GaussFilteredCosIqParams) -> Result<Self> {
        let channels: Vec<String> = [&params.i_channel, &params.q_channel]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if channels.is_empty() {
            return Err(Error::new("IQ pulse needs an I or Q channel"));
        }
        Ok(GaussFilteredCosIqPulse {
            common: header.into_common(),
            params,
            channels,
        })
    }

    fn is_i_channel(&self, channel: &str) -> bool {
        self.params.i_channel.as_deref() == Some(channel)
    }
}

impl Pulse for GaussFilteredCosIqPulse {
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
        self.params.pulse_length + self.params.gaussian_filter_sigma * self.params.nr_sigma
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let t0 = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) {
            return vec![0.0; tvals.len()];
        }
        let envelope = gauss_filtered_window(
            tvals,
            self.params.pulse_length,
            self.params.nr_sigma,
            self.params.gaussian_filter_sigma,
            self.params.amplitude,
        );
        let zeros = vec![0.0; tvals.len()];
        let (i_mod, q_mod) = apply_modulation(
            &envelope,
            &zeros,
            tvals,
            &ModulationParams {
                mod_frequency: self.params.mod_frequency,
                phase: self.params.phase,
                phi_skew: self.params.phi_skew,
                alpha: self.params.alpha,
                tval_phaseref: if self.params.phase_lock { 0.0 } else { t0 },
            },
        );
        if self.is_i_channel(channel) {
            i_mod
        } else {
            q_mod
        }
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        let t0 = self.algorithm_time();
        // With a phase-locked carrier the modulation is referenced to
        // absolute time; fold the reference-time phase advance into the
        // hashed phase. A pulse-referenced carrier depends on relative time
        // only, so no correction applies.
        let mut phase = self.params.phase;
        if self.params.phase_lock {
            phase += 360.0 * self.params.mod_frequency * t0;
        }
        vec![
            HashElement::Str(Self::TAG),
            (t0 - tstart).into(),
            self.is_i_channel(channel).into(),
            self.params.amplitude.into(),
            self.params.mod_frequency.into(),
            self.params.gaussian_filter_sigma.into(),
            self.params.nr_sigma.into(),
            self.params.pulse_length.into(),
            self.params.alpha.into(),
            self.params.phi_skew.into(),
            normalize_phase_deg(phase).into(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GaussFilteredCosIqMultiChromaticParams {
    pub i_channel: Option<String>,
    pub q_channel: Option<String>,
    /// Per-tone amplitudes; a single value broadcasts to all tones.
    pub amplitude: Vec<f64>,
    pub pulse_length: f64,
    /// The tone frequencies in Hz; defines the number of tones.
    pub mod_frequency: Vec<f64>,
    /// Per-tone phases in degrees; single value broadcasts.
    pub phase: Vec<f64>,
    pub nr_sigma: f64,
    /// Per-tone I/Q amplitude ratios; single value broadcasts.
    pub alpha: Vec<f64>,
    /// Per-tone skews in degrees; single value broadcasts.
    pub phi_skew: Vec<f64>,
    pub gaussian_filter_sigma: f64,
    pub phase_lock: bool,
}

impl Default for GaussFilteredCosIqMultiChromaticParams {
    fn default() -> Self {
        GaussFilteredCosIqMultiChromaticParams {
            i_channel: None,
            q_channel: None,
            amplitude: vec![0.0],
            pulse_length: 0.0,
            mod_frequency: vec![0.0],
            phase: vec![0.0],
            nr_sigma: 5.0,
            alpha: vec![1.0],
            phi_skew: vec![0.0],
            gaussian_filter_sigma: 0.0,
            phase_lock: false,
        }
    }
}

/// Multi-chromatic variant: several simultaneous tones through one
/// error-function-windowed envelope.
#[derive(Debug, Clone)]
pub struct GaussFilteredCosIqMultiChromaticPulse {
    common: PulseCommon,
    params: GaussFilteredCosIqMultiChromaticParams,
    channels: Vec<String>,
}

impl GaussFilteredCosIqMultiChromaticPulse {
    pub const TAG: &'static str = "gauss_filtered_cos_iq_multi_chromatic";

    pub fn new(
        header: PulseHeader,
        mut params: GaussFilteredCosIqMultiChromaticParams,
    ) -> Result<Self> {
        let channels: Vec<String> = [&params.i_channel, &params.q_channel]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if channels.is_empty() {
            return Err(Error::new("IQ pulse needs an I or Q channel"));
        }
        let n_tones = params.mod_frequency.len();
        if n_tones == 0 {
            return Err(Error::new(
                "multi-chromatic pulse needs at least one tone frequency",
            ));
        }
        params.amplitude = broadcast_tones(&params.amplitude, n_tones, "amplitude")?;
        params.phase = broadcast_tones(&params.phase, n_tones, "phase")?;
        params.alpha = broadcast_tones(&params.alpha, n_tones, "alpha")?;
        params.phi_skew = broadcast_tones(&params.phi_skew, n_tones, "phi_skew")?;
        Ok(GaussFilteredCosIqMultiChromaticPulse {
            common: header.into_common(),
            params,
            channels,
        })
    }

    fn is_i_channel(&self, channel: &str) -> bool {
        self.params.i_channel.as_deref() == Some(channel)
    }
}

fn broadcast_tones(values: &[f64], n_tones: usize, what: &str) -> Result<Vec<f64>> {
    if values.len() == 1 {
        Ok(vec![values[0]; n_tones])
    } else if values.len() == n_tones {
        Ok(values.to_vec())
    } else {
        Err(Error::new(format!(
            "received {} {what} values but expected {} (number of tone frequencies)",
            values.len(),
            n_tones
        )))
    }
}

impl Pulse for GaussFilteredCosIqMultiChromaticPulse {
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
        self.params.pulse_length + self.params.gaussian_filter_sigma * self.params.nr_sigma
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let t0 = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) {
            return vec![0.0; tvals.len()];
        }
        let zeros = vec![0.0; tvals.len()];
        let mut total = vec![0.0; tvals.len()];
        for (tone, &frequency) in self.params.mod_frequency.iter().enumerate() {
            let envelope = gauss_filtered_window(
                tvals,
                self.params.pulse_length,
                self.params.nr_sigma,
                self.params.gaussian_filter_sigma,
                self.params.amplitude[tone],
            );
            let (i_mod, q_mod) = apply_modulation(
                &envelope,
                &zeros,
                tvals,
                &ModulationParams {
                    mod_frequency: frequency,
                    phase: self.params.phase[tone],
                    phi_skew: self.params.phi_skew[tone],
                    alpha: self.params.alpha[tone],
                    tval_phaseref: if self.params.phase_lock { 0.0 } else { t0 },
                },
            );
            let tone_wave = if self.is_i_channel(channel) { i_mod } else { q_mod };
            for (sample, value) in total.iter_mut().zip(tone_wave) {
                *sample += value;
            }
        }
        total
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        let t0 = self.algorithm_time();
        let mut hashlist = vec![
            HashElement::Str(Self::TAG),
            (t0 - tstart).into(),
            self.is_i_channel(channel).into(),
        ];
        hashlist.extend(self.params.amplitude.iter().map(|&a| HashElement::from(a)));
        hashlist.extend(
            self.params
                .mod_frequency
                .iter()
                .map(|&f| HashElement::from(f)),
        );
        hashlist.push(self.params.gaussian_filter_sigma.into());
        hashlist.push(self.params.nr_sigma.into());
        hashlist.push(self.params.pulse_length.into());
        hashlist.extend(self.params.alpha.iter().map(|&a| HashElement::from(a)));
        hashlist.extend(self.params.phi_skew.iter().map(|&s| HashElement::from(s)));
        for (tone, &frequency) in self.params.mod_frequency.iter().enumerate() {
            let mut phase = self.params.phase[tone];
            if self.params.phase_lock {
                phase += 360.0 * frequency * t0;
            }
            hashlist.push(normalize_phase_deg(phase).into());
        }
        hashlist
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::waveform_uid;

    fn iq_pulse(phase_lock: bool) -> GaussFilteredCosIqPulse {
        let mut pulse = GaussFilteredCosIqPulse::new(
            PulseHeader::new("readout qb1", "element_0"),
            GaussFilteredCosIqParams {
                i_channel: Some("ro_i".to_string()),
                q_channel: Some("ro_q".to_string()),
                amplitude: 0.4,
                pulse_length: 200e-9,
                mod_frequency: 50e6,
                gaussian_filter_sigma: 2e-9,
                phase_lock,
                ..GaussFilteredCosIqParams::default()
            },
        )
        .unwrap();
        pulse.set_algorithm_time(0.0);
        pulse
    }

    fn time_grid(length: f64, dt: f64) -> Vec<f64> {
        let n = (length / dt).round() as usize;
        (0..n).map(|i| i as f64 * dt).collect()
    }

    #[test]
    fn test_envelope_settles_and_length_includes_filter_rampup() {
        let pulse = iq_pulse(false);
        assert!((pulse.length() - 210e-9).abs() < 1e-18);
        let tvals = time_grid(210e-9, 1e-9);
        // At the envelope center both quadratures obey I² + Q² = amplitude².
        let i_wave = pulse.chan_wf("ro_i", &tvals);
        let q_wave = pulse.chan_wf("ro_q", &tvals);
        let idx = 105;
        let magnitude = (i_wave[idx].powi(2) + q_wave[idx].powi(2)).sqrt();
        assert!((magnitude - 0.4).abs() < 1e-9);
        // The filtered edge has decayed to a fraction of the amplitude at
        // the window start.
        assert!(i_wave[0].abs() < 0.01);
    }

    #[test]
    fn test_phase_lock_hash_matches_waveform_equality() {
        let tvals_a = time_grid(210e-9, 1e-9);
        let shift = 7e-9;
        let tvals_b: Vec<f64> = tvals_a.iter().map(|t| t + shift).collect();

        // Pulse-referenced carrier: equal relative placement reproduces the
        // waveform, hashes agree.
        let free_a = iq_pulse(false);
        let mut free_b = iq_pulse(false);
        free_b.set_algorithm_time(shift);
        let wave_a = free_a.chan_wf("ro_i", &tvals_a);
        let wave_b = free_b.chan_wf("ro_i", &tvals_b);
        for (a, b) in wave_a.iter().zip(&wave_b) {
            assert!((a - b).abs() < 1e-9);
        }
        assert_eq!(
            waveform_uid(&free_a.hashables(0.0, "ro_i")),
            waveform_uid(&free_b.hashables(shift, "ro_i"))
        );

        // Phase-locked carrier: the waveform depends on absolute time, so
        // the hashes must differ.
        let locked_a = iq_pulse(true);
        let mut locked_b = iq_pulse(true);
        locked_b.set_algorithm_time(shift);
        assert_ne!(
            locked_a.chan_wf("ro_i", &tvals_a),
            locked_b.chan_wf("ro_i", &tvals_b)
        );
        assert_ne!(
            waveform_uid(&locked_a.hashables(0.0, "ro_i")),
            waveform_uid(&locked_b.hashables(shift, "ro_i"))
        );
    }

    fn multi_tone(frequencies: Vec<f64>, amplitudes: Vec<f64>) -> Result<GaussFilteredCosIqMultiChromaticPulse> {
        GaussFilteredCosIqMultiChromaticPulse::new(
            PulseHeader::new("mc", "element_0"),
            GaussFilteredCosIqMultiChromaticParams {
                i_channel: Some("ro_i".to_string()),
                q_channel: Some("ro_q".to_string()),
                amplitude: amplitudes,
                pulse_length: 100e-9,
                mod_frequency: frequencies,
                ..GaussFilteredCosIqMultiChromaticParams::default()
            },
        )
    }

    #[test]
    fn test_multi_chromatic_sums_tones() {
        let mut two_tone = multi_tone(vec![30e6, 70e6], vec![0.2]).unwrap();
        two_tone.set_algorithm_time(0.0);
        let tvals = time_grid(100e-9, 1e-9);
        let combined = two_tone.chan_wf("ro_i", &tvals);

        let mut tone_sum = vec![0.0; tvals.len()];
        for f in [30e6, 70e6] {
            let mut single = multi_tone(vec![f], vec![0.2]).unwrap();
            single.set_algorithm_time(0.0);
            for (total, value) in tone_sum.iter_mut().zip(single.chan_wf("ro_i", &tvals)) {
                *total += value;
            }
        }
        for (a, b) in combined.iter().zip(&tone_sum) {
            assert!((a - b).abs() < 1e-12);
        }
    }

    #[test]
    fn test_multi_chromatic_broadcasts_scalars() {
        let pulse = multi_tone(vec![30e6, 70e6], vec![0.2]).unwrap();
        assert_eq!(pulse.params.amplitude, vec![0.2, 0.2]);
        assert_eq!(pulse.params.alpha, vec![1.0, 1.0]);
    }

    #[test]
    fn test_multi_chromatic_rejects_mismatched_lists() {
        assert!(multi_tone(vec![30e6, 70e6], vec![0.1, 0.2, 0.3]).is_err());
        assert!(multi_tone(vec![], vec![0.1]).is_err());
    }

    #[test]
    fn test_multi_chromatic_hash_tracks_every_tone() {
        let mut pulse = multi_tone(vec![30e6, 70e6], vec![0.2, 0.3]).unwrap();
        pulse.set_algorithm_time(0.0);
        let reference = waveform_uid(&pulse.hashables(0.0, "ro_i"));

        let mut changed = multi_tone(vec![30e6, 71e6], vec![0.2, 0.3]).unwrap();
        changed.set_algorithm_time(0.0);
        assert_ne!(reference, waveform_uid(&changed.hashables(0.0, "ro_i")));

        let mut changed = multi_tone(vec![30e6, 70e6], vec![0.2, 0.35]).unwrap();
        changed.set_algorithm_time(0.0);
        assert_ne!(reference, waveform_uid(&changed.hashables(0.0, "ro_i")));
    }
}
