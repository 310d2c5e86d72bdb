// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Two-channel buffered FLIP pulses.
//!
//! Both channels play a buffered square (or net-zero square pair), with
//! independent amplitudes, per-channel flux-settling buffers, and a
//! channel-to-channel relative delay that is resolved into per-channel
//! buffer-length adjustments. A negative delay means the first channel's
//! pulse trails the second's.

use indexmap::IndexMap;
use serde::Deserialize;
use statrs::function::erf::erf;
use std::f64::consts::SQRT_2;

use crate::hash::HashElement;
use crate::pulse::{Pulse, PulseCommon};
use crate::registry::PulseHeader;
use crate::{Error, Result};

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BufferedFlipParams {
    pub channel: Option<String>,
    pub channel2: Option<String>,
    pub amplitude: f64,
    pub amplitude2: f64,
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    /// Settling buffer while fluxing the first qubit.
    pub flux_buffer_length: f64,
    /// Settling buffer while fluxing the second qubit.
    pub flux_buffer_length2: f64,
    /// Delay of the pulse on `channel2` with respect to the pulse on
    /// `channel`, in seconds. Negative: `channel` trails `channel2`.
    pub channel_relative_delay: f64,
    pub gaussian_filter_sigma: f64,
}

impl Default for BufferedFlipParams {
    fn default() -> Self {
        BufferedFlipParams {
            channel: None,
            channel2: None,
            amplitude: 0.0,
            amplitude2: 0.0,
            pulse_length: 0.0,
            buffer_length_start: 30e-9,
            buffer_length_end: 30e-9,
            flux_buffer_length: 0.0,
            flux_buffer_length2: 0.0,
            channel_relative_delay: 0.0,
            gaussian_filter_sigma: 1e-9,
        }
    }
}

/// Resolved per-channel window of a FLIP pulse.
#[derive(Debug, Clone, Copy)]
struct ChannelLayout {
    amp: f64,
    alpha: f64,
    length1: f64,
    length2: f64,
    flux_buffer: f64,
    buffer_start: f64,
    buffer_end: f64,
}

/// Buffered two-qubit FLIP pulse: one square window per channel.
#[derive(Debug, Clone)]
pub struct BufferedFlipPulse {
    common: PulseCommon,
    params: BufferedFlipParams,
    channels: Vec<String>,
    layouts: IndexMap<String, ChannelLayout>,
}

impl BufferedFlipPulse {
    pub const TAG: &'static str = "buffered_flip";

    pub fn new(header: PulseHeader, params: BufferedFlipParams) -> Result<Self> {
        let (channel, channel2) = match (&params.channel, &params.channel2) {
            (Some(c1), Some(c2)) => (c1.clone(), c2.clone()),
            _ => return Err(Error::new("FLIP pulse needs both channel and channel2")),
        };
        let delay = params.channel_relative_delay;
        let bls = params.buffer_length_start;
        let ble = params.buffer_length_end;
        let fbl = params.flux_buffer_length;
        let fbl2 = params.flux_buffer_length2;

        // Resolve the channel skew and the settling buffers into per-channel
        // start/end buffer lengths. A negative delay makes the first
        // channel's pulse trail the second's.
        let (bls1, bls2, ble1, ble2) = if delay < 0.0 {
            (bls - delay + fbl2, bls + fbl, ble + fbl2, ble - delay + fbl)
        } else {
            (bls + fbl2, bls + delay + fbl, ble + delay + fbl2, ble + fbl)
        };

        let mut layouts = IndexMap::new();
        layouts.insert(
            channel.clone(),
            ChannelLayout {
                amp: params.amplitude,
                alpha: 1.0,
                length1: params.pulse_length + 2.0 * fbl,
                length2: 0.0,
                flux_buffer: fbl2,
                buffer_start: bls1,
                buffer_end: ble1,
            },
        );
        layouts.insert(
            channel2.clone(),
            ChannelLayout {
                amp: params.amplitude2,
                alpha: 1.0,
                length1: params.pulse_length + 2.0 * fbl2,
                length2: 0.0,
                flux_buffer: fbl,
                buffer_start: bls2,
                buffer_end: ble2,
            },
        );

        Ok(BufferedFlipPulse {
            common: header.into_common(),
            params,
            channels: vec![channel, channel2],
            layouts,
        })
    }
}

impl Pulse for BufferedFlipPulse {
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
        let first = &self.layouts[&self.channels[0]];
        first.length1
            + first.buffer_start
            + first.buffer_end
            + 2.0 * self.params.flux_buffer_length2
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        let Some(layout) = self.layouts.get(channel) else {
            return vec![0.0; tvals.len()];
        };
        if tvals.is_empty() {
            return vec![];
        }
        let t_start = tvals[0] + layout.buffer_start;
        let t_end = t_start + layout.length1;
        if self.params.gaussian_filter_sigma > 0.0 {
            let scaling = 1.0 / (SQRT_2 * self.params.gaussian_filter_sigma);
            tvals
                .iter()
                .map(|&t| {
                    0.5 * layout.amp
                        * (erf((t - t_start) * scaling) - erf((t - t_end) * scaling))
                })
                .collect()
        } else {
            tvals
                .iter()
                .map(|&t| {
                    if t >= t_start && t < t_end {
                        layout.amp
                    } else {
                        0.0
                    }
                })
                .collect()
        }
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        let Some(layout) = self.layouts.get(channel) else {
            return vec![];
        };
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            layout.amp.into(),
            self.params.pulse_length.into(),
            layout.buffer_start.into(),
            layout.buffer_end.into(),
            self.params.gaussian_filter_sigma.into(),
        ]
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NzBufferedFlipParams {
    pub channel: Option<String>,
    pub channel2: Option<String>,
    pub amplitude: f64,
    pub amplitude2: f64,
    /// Amplitude scale of the second, opposite-sign lobe on both channels.
    pub alpha: f64,
    pub pulse_length: f64,
    pub buffer_length_start: f64,
    pub buffer_length_end: f64,
    pub flux_buffer_length: f64,
    pub flux_buffer_length2: f64,
    pub channel_relative_delay: f64,
    pub gaussian_filter_sigma: f64,
}

impl Default for NzBufferedFlipParams {
    fn default() -> Self {
        NzBufferedFlipParams {
            channel: None,
            channel2: None,
            amplitude: 0.0,
            amplitude2: 0.0,
            alpha: 1.0,
            pulse_length: 0.0,
            buffer_length_start: 30e-9,
            buffer_length_end: 30e-9,
            flux_buffer_length: 0.0,
            flux_buffer_length2: 0.0,
            channel_relative_delay: 0.0,
            gaussian_filter_sigma: 1e-9,
        }
    }
}

/// Net-zero two-qubit FLIP pulse: each channel plays two opposite-amplitude
/// square lobes separated by twice its flux-settling buffer.
#[derive(Debug, Clone)]
pub struct NzBufferedFlipPulse {
    common: PulseCommon,
    params: NzBufferedFlipParams,
    channels: Vec<String>,
    layouts: IndexMap<String, ChannelLayout>,
}

impl NzBufferedFlipPulse {
    pub const TAG: &'static str = "nz_buffered_flip";

    pub fn new(header: PulseHeader, params: NzBufferedFlipParams) -> Result<Self> {
        let (channel, channel2) = match (&params.channel, &params.channel2) {
            (Some(c1), Some(c2)) => (c1.clone(), c2.clone()),
            _ => return Err(Error::new("FLIP pulse needs both channel and channel2")),
        };
        let alpha = params.alpha;
        let delay = params.channel_relative_delay;
        let bls = params.buffer_length_start;
        let ble = params.buffer_length_end;
        // The settling buffer applied while the other qubit is fluxed.
        let flux_buffer_1 = params.flux_buffer_length2;
        let flux_buffer_2 = params.flux_buffer_length;

        let (bls1, bls2, ble1, ble2) = if delay < 0.0 {
            (
                bls - delay + flux_buffer_1,
                bls + flux_buffer_2,
                ble + flux_buffer_1,
                ble - delay + flux_buffer_2,
            )
        } else {
            (
                bls + flux_buffer_1,
                bls + delay + flux_buffer_2,
                ble + delay + flux_buffer_1,
                ble + flux_buffer_2,
            )
        };

        let mut layouts = IndexMap::new();
        layouts.insert(
            channel.clone(),
            ChannelLayout {
                amp: params.amplitude,
                alpha,
                length1: alpha * params.pulse_length / (alpha + 1.0) + 2.0 * flux_buffer_2,
                length2: params.pulse_length / (alpha + 1.0) + 2.0 * flux_buffer_2,
                flux_buffer: flux_buffer_1,
                buffer_start: bls1,
                buffer_end: ble1,
            },
        );
        layouts.insert(
            channel2.clone(),
            ChannelLayout {
                amp: params.amplitude2,
                alpha,
                length1: alpha * params.pulse_length / (alpha + 1.0) + 2.0 * flux_buffer_1,
                length2: params.pulse_length / (alpha + 1.0) + 2.0 * flux_buffer_1,
                flux_buffer: flux_buffer_2,
                buffer_start: bls2,
                buffer_end: ble2,
            },
        );

        Ok(NzBufferedFlipPulse {
            common: header.into_common(),
            params,
            channels: vec![channel, channel2],
            layouts,
        })
    }
}

impl Pulse for NzBufferedFlipPulse {
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
        let first = &self.layouts[&self.channels[0]];
        first.length1
            + first.length2
            + first.buffer_start
            + first.buffer_end
            + 2.0 * first.flux_buffer
    }

    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64> {
        let _ = self.algorithm_time();
        let Some(layout) = self.layouts.get(channel) else {
            return vec![0.0; tvals.len()];
        };
        if tvals.is_empty() {
            return vec![];
        }
        let amp1 = layout.amp;
        let amp2 = -amp1 * layout.alpha;
        let t_start1 = tvals[0] + layout.buffer_start;
        let t_end1 = t_start1 + layout.length1;
        let t_start2 = t_end1 + 2.0 * layout.flux_buffer;
        let t_end2 = t_start2 + layout.length2;
        if self.params.gaussian_filter_sigma > 0.0 {
            let scaling = 1.0 / (SQRT_2 * self.params.gaussian_filter_sigma);
            tvals
                .iter()
                .map(|&t| {
                    0.5 * (amp1 * erf((t - t_start1) * scaling)
                        - amp1 * erf((t - t_end1) * scaling)
                        + amp2 * erf((t - t_start2) * scaling)
                        - amp2 * erf((t - t_end2) * scaling))
                })
                .collect()
        } else {
            tvals
                .iter()
                .map(|&t| {
                    if t >= t_start1 && t < t_end1 {
                        amp1
                    } else if t >= t_start2 && t < t_end2 {
                        amp2
                    } else {
                        0.0
                    }
                })
                .collect()
        }
    }

    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement> {
        let Some(layout) = self.layouts.get(channel) else {
            return vec![];
        };
        vec![
            HashElement::Str(Self::TAG),
            (self.algorithm_time() - tstart).into(),
            layout.amp.into(),
            self.params.pulse_length.into(),
            layout.buffer_start.into(),
            layout.buffer_end.into(),
            self.params.gaussian_filter_sigma.into(),
            layout.alpha.into(),
        ]
    }
}
