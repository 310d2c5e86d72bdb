// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The simplest conformers of the pulse contract: constant and cosine
//! waveforms, and the virtual placeholder pulse.

use serde::Deserialize;
use std::f64::consts::TAU;

use crate::hash::{HashElement, normalize_phase_deg};
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;
use crate::{Error, Result};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SquareParams {
    pub channel: Option<String>,
    pub channels: Vec<String>,
    /// Amplitude in Volts.
    pub amplitude: f64,
    /// Duration in seconds.
    pub length: f64,
}

/// Constant-amplitude pulse on one or more channels.
#[derive(Debug, Clone)]
pub struct SquarePulse {
    common: PulseCommon,
    params: SquareParams,
    channels: Vec<String>,
}

impl SquarePulse {
    pub const TAG: &'static str = "square";

    pub fn new(header: PulseHeader, params: SquareParams) -> Result<Self> {
        let channels = resolve_channels(&params.channel, &params.channels)?;
        Ok(SquarePulse {
            common: header.into_common(),
            params,
            channels,
        })
    }
}

impl Pulse for SquarePulse {
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
        self.params.length
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) {
            return vec![0.0; tvals.len()];
        }
        vec![self.params.amplitude; tvals.len()]
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            self.params.amplitude.into(),
            self.params.length.into(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CosParams {
    pub channel: Option<String>,
    /// Amplitude in Volts.
    pub amplitude: f64,
    /// Duration in seconds.
    pub length: f64,
    /// Carrier frequency in Hz.
    pub frequency: f64,
    /// Carrier phase in degrees.
    pub phase: f64,
}

impl Default for CosParams {
    fn default() -> Self {
        CosParams {
            channel: None,
            amplitude: 0.0,
            length: 0.0,
            frequency: 1e6,
            phase: 0.0,
        }
    }
}

/// Cosine pulse on a single channel, phase-referenced to absolute time.
#[derive(Debug, Clone)]
pub struct CosPulse {
    common: PulseCommon,
    params: CosParams,
    channels: Vec<String>,
}

impl CosPulse {
    pub const TAG: &'static str = "cos";

    pub fn new(header: PulseHeader, params: CosParams) -> Result<Self> {
        let channels = resolve_channels(&params.channel, &[])?;
        Ok(CosPulse {
            common: header.into_common(),
            params,
            channels,
        })
    }
}

impl Pulse for CosPulse {
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
        self.params.length
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        if !self.channels.iter().any(|c| c == channel) {
            return vec![0.0; tvals.len()];
        }
        tvals
            .iter()
            .map(|&t| {
                self.params.amplitude
                    * (TAU * (self.params.frequency * t + self.params.phase / 360.0)).cos()
            })
            .collect()
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        if !self.channels.iter().any(|c| c == channel) {
            return vec![];
        }
        // The carrier is referenced to absolute time; fold the element start
        // into the phase so equal relative placements hash equally.
        let phase = self.params.phase + self.params.frequency * tstart * 360.0;
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            self.params.amplitude.into(),
            self.params.length.into(),
            self.params.frequency.into(),
            normalize_phase_deg(phase).into(),
        ]
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct VirtualParams {
    /// Duration in seconds.
    pub pulse_length: f64,
}

/// Zero-channel placeholder reserving algorithm time without emitting
/// signal.
#[derive(Debug, Clone)]
pub struct VirtualPulse {
    common: PulseCommon,
    params: VirtualParams,
    channels: Vec<String>,
}

impl VirtualPulse {
    pub const TAG: &'static str = "virtual";

    pub fn new(header: PulseHeader, params: VirtualParams) -> Self {
        VirtualPulse {
            common: header.into_common(),
            params,
            channels: vec![],
        }
    }
}

impl Pulse for VirtualPulse {
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
    }

    fn chan_wf(&self, _channel: &str, tvals: &[f64]) -> Vec<f64> {
        vec![0.0; tvals.len()]
    }

    fn hashables(&self, _tstart: f64, _channel: &str) -> Vec<HashElement> {
        vec![]
    }
}

/// Resolve the `channel`/`channels` parameter pair into the channel list.
pub(crate) fn resolve_channels(
    channel: &Option<String>,
    channels: &[String],
) -> Result<Vec<String>> {
    if !channels.is_empty() {
        return Ok(channels.to_vec());
    }
    match channel {
        Some(channel) => Ok(vec![channel.clone()]),
        None => Err(Error::new("must specify either channel or channels")),
    }
}
