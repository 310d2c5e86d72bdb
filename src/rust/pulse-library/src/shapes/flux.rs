// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Adiabatic flux pulse driven by an injected waveform generator.
//!
//! The physical waveform of a flux pulse depends on the qubit Hamiltonian
//! (qubit frequencies, anharmonicity, coupling), which lives outside this
//! crate. The pulse shape therefore delegates sample generation to a
//! [`FluxWaveformGenerator`] provided by the setup layer and only handles
//! channel bookkeeping, auxiliary-channel scaling and hashing here.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::Deserialize;

use crate::hash::HashElement;
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;
use crate::shapes::basic::resolve_channels;
use crate::Result;

/// Physics parameters handed to the flux waveform generator.
#[derive(Debug, Clone, PartialEq)]
pub struct FluxPulseParams {
    pub pulse_length: f64,
    /// Final interaction angle in radians.
    pub theta_f: f64,
    /// Control qubit frequency in Hz.
    pub qbc_freq: f64,
    /// Target qubit frequency in Hz.
    pub qbt_freq: f64,
    pub anharmonicity: f64,
    /// Qubit-qubit coupling strength in Hz.
    pub j_coupling: f64,
    /// Voltage per flux slope of the channel, scaled per auxiliary channel.
    pub dv_dphi: f64,
    pub loop_asym: f64,
    pub lambda_2: f64,
    pub alpha: f64,
    pub buffer_length_start: f64,
}

/// Produces the physical flux waveform for the given sample times.
///
/// Two generators with the same [`FluxWaveformGenerator::id`] must produce
/// identical samples for identical parameters; the id is folded into the
/// pulse's hash elements in place of the generator itself.
pub trait FluxWaveformGenerator: Send + Sync {
    fn id(&self) -> &str;
    fn generate(&self, tvals: &[f64], params: &FluxPulseParams) -> Vec<f64>;
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NzMartinisGellarParams {
    pub channel: Option<String>,
    /// Auxiliary channels and their coupling factors applied to `dv_dphi`.
    pub aux_channels_dict: IndexMap<String, f64>,
    pub theta_f: f64,
    pub alpha: f64,
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    pub qbc_freq: f64,
    pub qbt_freq: f64,
    pub anharmonicity: f64,
    pub j_coupling: f64,
    pub loop_asym: f64,
    pub dv_dphi: f64,
    pub lambda_2: f64,
}

impl Default for NzMartinisGellarParams {
    fn default() -> Self {
        NzMartinisGellarParams {
            channel: None,
            aux_channels_dict: IndexMap::new(),
            theta_f: std::f64::consts::FRAC_PI_2,
            alpha: 1.0,
            pulse_length: 0.0,
            buffer_length_start: 0.0,
            buffer_length_end: 0.0,
            qbc_freq: 0.0,
            qbt_freq: 0.0,
            anharmonicity: 0.0,
            j_coupling: 0.0,
            loop_asym: 0.0,
            dv_dphi: 0.0,
            lambda_2: 0.0,
        }
    }
}

/// Net-zero Martinis-Geller flux pulse.
pub struct NzMartinisGellarPulse {
    common: PulseCommon,
    params: NzMartinisGellarParams,
    channels: Vec<String>,
    generator: Arc<dyn FluxWaveformGenerator>,
}

impl NzMartinisGellarPulse {
    pub const TAG: &'static str = "nz_martinis_gellar";

    pub fn new(
        header: PulseHeader,
        params: NzMartinisGellarParams,
        generator: Arc<dyn FluxWaveformGenerator>,
    ) -> Result<Self> {
        let mut channels = resolve_channels(&params.channel, &[])?;
        channels.extend(params.aux_channels_dict.keys().cloned());
        Ok(NzMartinisGellarPulse {
            common: header.into_common(),
            params,
            channels,
            generator,
        })
    }

    /// The coupling slope for one channel: auxiliary channels scale the
    /// main channel's `dv_dphi` by their coupling factor.
    fn channel_dv_dphi(&self, channel: &str) -> f64 {
        if self.params.channel.as_deref() == Some(channel) {
            self.params.dv_dphi
        } else {
            self.params.dv_dphi * self.params.aux_channels_dict[channel]
        }
    }

    fn generator_params(&self, channel: &str) -> FluxPulseParams {
        FluxPulseParams {
            pulse_length: self.params.pulse_length,
            theta_f: self.params.theta_f,
            qbc_freq: self.params.qbc_freq,
            qbt_freq: self.params.qbt_freq,
            anharmonicity: self.params.anharmonicity,
            j_coupling: self.params.j_coupling,
            dv_dphi: self.channel_dv_dphi(channel),
            loop_asym: self.params.loop_asym,
            lambda_2: self.params.lambda_2,
            alpha: self.params.alpha,
            buffer_length_start: self.params.buffer_length_start,
        }
    }
}

impl Pulse for NzMartinisGellarPulse {
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
        if !self.channels.iter().any(|c| c == channel) {
            return vec![0.0; tvals.len()];
        }
        self.generator
            .generate(tvals, &self.generator_params(channel))
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            self.params.pulse_length.into(),
            self.params.theta_f.into(),
            self.params.qbc_freq.into(),
            self.params.qbt_freq.into(),
            self.params.anharmonicity.into(),
            self.params.j_coupling.into(),
            // The per-channel slope, so auxiliary channels with different
            // coupling factors never share a waveform.
            self.channel_dv_dphi(channel).into(),
            self.params.loop_asym.into(),
            self.params.lambda_2.into(),
            self.params.alpha.into(),
            self.params.buffer_length_start.into(),
            HashElement::Text(self.generator.id().to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hash::waveform_uid;
    use flux_waveforms::{ThetaPulseConfig, martinis_theta_waveform};

    /// Test generator built on the Martinis-Geller trajectory: plays the
    /// angle excursion scaled by the channel slope inside the buffered
    /// window.
    struct ThetaSlopeGenerator;

    impl FluxWaveformGenerator for ThetaSlopeGenerator {
        fn id(&self) -> &str {
            "theta_slope_v1"
        }

        fn generate(&self, tvals: &[f64], params: &FluxPulseParams) -> Vec<f64> {
            let config = ThetaPulseConfig {
                theta_i: 0.1,
                theta_f: params.theta_f,
                lambda_1: 1.0,
                lambda_2: params.lambda_2,
                sampling_rate: 1e9,
                ..ThetaPulseConfig::default()
            };
            let theta = martinis_theta_waveform(params.pulse_length, &config);
            let start = params.buffer_length_start;
            tvals
                .iter()
                .map(|&t| {
                    let offset = t - tvals.first().copied().unwrap_or(0.0) - start;
                    let idx = (offset * 1e9).round();
                    if idx >= 0.0 && (idx as usize) < theta.len() {
                        params.dv_dphi * (theta[idx as usize] - 0.1)
                    } else {
                        0.0
                    }
                })
                .collect()
        }
    }

    fn flux_pulse(dv_dphi: f64) -> NzMartinisGellarPulse {
        let mut pulse = NzMartinisGellarPulse::new(
            PulseHeader::new("cz_flux", "element_0"),
            NzMartinisGellarParams {
                channel: Some("flux1".to_string()),
                aux_channels_dict: [("flux2".to_string(), 0.1)].into_iter().collect(),
                theta_f: 1.2,
                pulse_length: 40e-9,
                buffer_length_start: 10e-9,
                buffer_length_end: 10e-9,
                dv_dphi,
                ..NzMartinisGellarParams::default()
            },
            Arc::new(ThetaSlopeGenerator),
        )
        .unwrap();
        pulse.set_algorithm_time(0.0);
        pulse
    }

    fn time_grid(length: f64, dt: f64) -> Vec<f64> {
        let n = (length / dt).round() as usize;
        (0..n).map(|i| (i as f64 + 0.5) * dt).collect()
    }

    #[test]
    fn test_waveform_delegates_to_generator() {
        let pulse = flux_pulse(2.0);
        let tvals = time_grid(60e-9, 1e-9);
        let wave = pulse.chan_wf("flux1", &tvals);
        assert_eq!(wave.len(), 60);
        // Buffers are silent, the pulse center carries the full excursion.
        assert_eq!(wave[0], 0.0);
        assert_eq!(wave[59], 0.0);
        assert!((wave[30] - 2.0 * (1.2 - 0.1)).abs() < 1e-6);
    }

    #[test]
    fn test_aux_channel_scales_coupling() {
        let pulse = flux_pulse(2.0);
        let tvals = time_grid(60e-9, 1e-9);
        let main = pulse.chan_wf("flux1", &tvals);
        let aux = pulse.chan_wf("flux2", &tvals);
        for (m, a) in main.iter().zip(&aux) {
            assert!((a - 0.1 * m).abs() < 1e-12);
        }
    }

    #[test]
    fn test_hash_covers_channel_coupling_and_generator() {
        let pulse = flux_pulse(2.0);
        let main_hash = waveform_uid(&pulse.hashables(0.0, "flux1"));
        let aux_hash = waveform_uid(&pulse.hashables(0.0, "flux2"));
        assert_ne!(main_hash, aux_hash);

        let stronger = flux_pulse(3.0);
        assert_ne!(
            main_hash,
            waveform_uid(&stronger.hashables(0.0, "flux1"))
        );

        struct OtherGenerator;
        impl FluxWaveformGenerator for OtherGenerator {
            fn id(&self) -> &str {
                "other"
            }
            fn generate(&self, tvals: &[f64], _params: &FluxPulseParams) -> Vec<f64> {
                vec![0.0; tvals.len()]
            }
        }
        let mut swapped = NzMartinisGellarPulse::new(
            PulseHeader::new("cz_flux", "element_0"),
            NzMartinisGellarParams {
                channel: Some("flux1".to_string()),
                aux_channels_dict: [("flux2".to_string(), 0.1)].into_iter().collect(),
                theta_f: 1.2,
                pulse_length: 40e-9,
                buffer_length_start: 10e-9,
                buffer_length_end: 10e-9,
                dv_dphi: 2.0,
                ..NzMartinisGellarParams::default()
            },
            Arc::new(OtherGenerator),
        )
        .unwrap();
        swapped.set_algorithm_time(0.0);
        assert_ne!(main_hash, waveform_uid(&swapped.hashables(0.0, "flux1")));
    }

    #[test]
    fn test_length_includes_buffers() {
        let pulse = flux_pulse(1.0);
        assert!((pulse.length() - 60e-9).abs() < 1e-18);
    }
}
