// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! In-phase Gaussian pulse with derivative quadrature and SSB modulation.

use serde::Deserialize;

use crate::hash::{HashElement, normalize_phase_deg};
use crate::modulation::{ModulationParams, apply_modulation};
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SsbDragParams {
    /// In-phase output channel name.
    pub i_channel: Option<String>,
    /// Quadrature output channel name.
    pub q_channel: Option<String>,
    /// Pulse amplitude in Volts.
    pub amplitude: f64,
    /// Gaussian width standard deviation in seconds.
    pub sigma: f64,
    /// Clipping length in units of sigma; the total pulse length is
    /// `nr_sigma * sigma`.
    pub nr_sigma: f64,
    /// Amplitude of the derivative quadrature in units of sigma.
    pub motzoi: f64,
    /// Modulation frequency in Hz.
    pub mod_frequency: f64,
    /// Modulation phase in degrees.
    pub phase: f64,
    /// Phase reference: the start of the algorithm when set, the middle of
    /// the pulse otherwise.
    pub phaselock: bool,
    /// Amplitude ratio of the I and Q outputs.
    pub alpha: f64,
    /// Phase offset between I and Q, in addition to the nominal 90 degrees.
    pub phi_skew: f64,
}

impl Default for SsbDragParams {
    fn default() -> Self {
        SsbDragParams {
            i_channel: None,
            q_channel: None,
            amplitude: 0.1,
            sigma: 10e-9,
            nr_sigma: 5.0,
            motzoi: 0.0,
            mod_frequency: 1e6,
            phase: 0.0,
            phaselock: true,
            alpha: 1.0,
            phi_skew: 0.0,
        }
    }
}

/// Gaussian envelope with DRAG correction, single-sideband modulated onto an
/// I/Q channel pair.
///
/// The envelope is offset-corrected so that it reaches exactly zero at the
/// clip edges `tc ± nr_sigma·sigma/2`.
#[derive(Debug, Clone)]
pub struct SsbDragPulse {
    common: PulseCommon,
    params: SsbDragParams,
    channels: Vec<String>,
}

impl SsbDragPulse {
    pub const TAG: &'static str = "ssb_drag";

    pub fn new(header: PulseHeader, params: SsbDragParams) -> Self {
        let channels = [&params.i_channel, &params.q_channel]
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        SsbDragPulse {
            common: header.into_common(),
            params,
            channels,
        }
    }

    fn half(&self) -> f64 {
        self.params.nr_sigma * self.params.sigma / 2.0
    }

    fn is_i_channel(&self, channel: &str) -> bool {
        self.params.i_channel.as_deref() == Some(channel)
    }

    fn is_q_channel(&self, channel: &str) -> bool {
        self.params.q_channel.as_deref() == Some(channel)
    }
}

impl Pulse for SsbDragPulse {
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
        self.params.sigma * self.params.nr_sigma
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let half = self.half();
        let tc = self.algorithm_time() + half;
        let sigma = self.params.sigma;
        // Offset-corrected Gaussian: exactly zero at the clip edges.
        let edge = (-0.5 * half * half / (sigma * sigma)).exp();
        let mut gauss_env = Vec::with_capacity(tvals.len());
        let mut deriv_env = Vec::with_capacity(tvals.len());
        for &t in tvals {
            let dt = t - tc;
            let env = if dt >= -half && dt < half {
                self.params.amplitude * ((-0.5 * dt * dt / (sigma * sigma)).exp() - edge)
            } else {
                0.0
            };
            gauss_env.push(env);
            deriv_env.push(-self.params.motzoi * dt * env / sigma);
        }

        let (i_mod, q_mod) = apply_modulation(
            &gauss_env,
            &deriv_env,
            tvals,
            &ModulationParams {
                mod_frequency: self.params.mod_frequency,
                phase: self.params.phase,
                phi_skew: self.params.phi_skew,
                alpha: self.params.alpha,
                tval_phaseref: if self.params.phaselock { 0.0 } else { tc },
            },
        );

        if self.is_i_channel(channel) {
            i_mod
        } else if self.is_q_channel(channel) {
            q_mod
        } else {
            vec![0.0; tvals.len()]
        }
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        let t0 = self.algorithm_time();
        // With a phase-locked carrier the modulation is referenced to
        // absolute time; fold the reference-time phase advance into the
        // hashed phase so it captures the absolute-time dependence.
        let mut phase = self.params.phase;
        if self.params.phaselock {
            phase += 360.0 * self.params.mod_frequency * (t0 + self.half());
        }
        vec![
            HashElement::Str(Self::TAG),
            (t0 - tstart).into(),
            self.is_i_channel(channel).into(),
            self.params.amplitude.into(),
            self.params.sigma.into(),
            self.params.nr_sigma.into(),
            self.params.motzoi.into(),
            self.params.mod_frequency.into(),
            self.params.alpha.into(),
            self.params.phi_skew.into(),
            normalize_phase_deg(phase).into(),
        ]
    }
}
