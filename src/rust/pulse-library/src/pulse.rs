// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The pulse contract.
//!
//! A pulse is an analytically-defined segment of one or more output
//! channels. Concrete shapes implement [`Pulse`]; the provided methods
//! compose per-channel waveform generation with muting, crosstalk
//! cancellation and truncation.

use indexmap::{IndexMap, IndexSet};

use crate::hash::HashElement;
use crate::truncation::{Truncation, truncate};

/// Digital branch selector routing a pulse to one of several pre-loaded
/// waveform variants at playback time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codeword {
    #[default]
    NoCodeword,
    Index(u32),
}

/// Description of crosstalk-cancellation outputs: secondary channels whose
/// waveform is a linear combination (with optional per-pair timing shift) of
/// the pulse's own channels that appear in `channels`.
///
/// `mtx[i][j]` is the weight of contributor `channels[j]` on cancellation
/// channel `channels[i]`; `shift_mtx[i][j]` shifts that contribution in
/// time (seconds).
#[derive(Debug, Clone, PartialEq)]
pub struct CrosstalkCancellation {
    pub channels: Vec<String>,
    pub mtx: Vec<Vec<f64>>,
    pub shift_mtx: Option<Vec<Vec<f64>>>,
}

/// Identity and placement state shared by every pulse shape.
#[derive(Debug, Clone, Default)]
pub struct PulseCommon {
    /// Name of the pulse, used for referencing other pulses in a sequence.
    pub name: String,
    /// Name of the element the pulse is played in.
    pub element_name: String,
    pub codeword: Codeword,
    /// Mutes the pulse: waveforms are all-zero, areas are 0.
    pub pulse_off: bool,
    pub truncation: Option<Truncation>,
    /// Per-channel selection mask, aligned with the shape's channel list.
    pub channel_mask: Option<Vec<bool>>,
    pub crosstalk: Option<CrosstalkCancellation>,
    /// Absolute start time of the pulse, assigned once when the pulse is
    /// placed into a sequence.
    pub algorithm_time: Option<f64>,
}

impl PulseCommon {
    pub fn new(name: impl Into<String>, element_name: impl Into<String>) -> Self {
        PulseCommon {
            name: name.into(),
            element_name: element_name.into(),
            ..PulseCommon::default()
        }
    }
}

/// The contract every pulse shape satisfies.
///
/// `chan_wf` and `hashables` are pure functions of the pulse parameters and
/// the assigned algorithm time; calling them before the algorithm time is
/// assigned is a programmer error and panics. `chan_wf` returns all-zero
/// samples for channels the pulse does not drive.
pub trait Pulse {
    fn common(&self) -> &PulseCommon;
    fn common_mut(&mut self) -> &mut PulseCommon;

    /// The output channels this pulse renders.
    fn channels(&self) -> &[String];

    /// Duration of the pulse in seconds.
    fn length(&self) -> f64;

    /// Generate the waveform for one channel on the absolute sample start
    /// times `tvals`.
    fn chan_wf(&self, channel: &str, tvals: &[f64]) -> Vec<f64>;

    /// The ordered hash-element list identifying this pulse's waveform on
    /// `channel`, relative to the element start time `tstart`. Empty when
    /// the channel is not one of the pulse's channels.
    fn hashables(&self, tstart: f64, channel: &str) -> Vec<HashElement>;

    fn name(&self) -> &str {
        &self.common().name
    }

    fn element_name(&self) -> &str {
        &self.common().element_name
    }

    fn codeword(&self) -> Codeword {
        self.common().codeword
    }

    /// Absolute start time of the pulse.
    ///
    /// # Panics
    ///
    /// Panics when the pulse has not been placed into a sequence yet.
    fn algorithm_time(&self) -> f64 {
        self.common()
            .algorithm_time
            .expect("algorithm time must be assigned before waveform generation")
    }

    fn set_algorithm_time(&mut self, t0: f64) {
        self.common_mut().algorithm_time = Some(t0);
    }

    /// The pulse start time in the frame of an element starting at
    /// `element_start_time`.
    fn element_time(&self, element_start_time: f64) -> f64 {
        self.algorithm_time() - element_start_time
    }

    /// Generate waveforms for all pulse channels present in `tvals`.
    ///
    /// Ordinary channels render directly through [`Pulse::chan_wf`], muted
    /// to zero when the pulse is off. Crosstalk-cancellation channels render
    /// as the weighted, optionally time-shifted sum of the contributing
    /// channels. Every waveform passes through truncation.
    fn waveforms(&self, tvals: &IndexMap<String, Vec<f64>>) -> IndexMap<String, Vec<f64>> {
        let common = self.common();
        let cancellation: &[String] = common
            .crosstalk
            .as_ref()
            .map(|c| c.channels.as_slice())
            .unwrap_or(&[]);
        let mut wfs = IndexMap::new();
        for channel in self.channels() {
            if cancellation.contains(channel) {
                continue;
            }
            let Some(channel_tvals) = tvals.get(channel) else {
                continue;
            };
            let wave = if common.pulse_off {
                vec![0.0; channel_tvals.len()]
            } else {
                self.chan_wf(channel, channel_tvals)
            };
            let wave = truncate(channel_tvals, wave, common.truncation.as_ref());
            wfs.insert(channel.clone(), wave);
        }
        if let Some(crosstalk) = &common.crosstalk {
            for (idx_c, channel) in crosstalk.channels.iter().enumerate() {
                let Some(channel_tvals) = tvals.get(channel) else {
                    continue;
                };
                let mut wave = vec![0.0; channel_tvals.len()];
                if !common.pulse_off {
                    for (idx_c2, contributor) in crosstalk.channels.iter().enumerate() {
                        if !self.channels().contains(contributor) {
                            continue;
                        }
                        let factor = crosstalk.mtx[idx_c][idx_c2];
                        let shift = crosstalk
                            .shift_mtx
                            .as_ref()
                            .map_or(0.0, |m| m[idx_c][idx_c2]);
                        let shifted: Vec<f64> =
                            channel_tvals.iter().map(|t| t - shift).collect();
                        let contribution = self.chan_wf(contributor, &shifted);
                        for (sample, value) in wave.iter_mut().zip(contribution) {
                            *sample += factor * value;
                        }
                    }
                }
                let wave = truncate(channel_tvals, wave, common.truncation.as_ref());
                wfs.insert(channel.clone(), wave);
            }
        }
        wfs
    }

    /// Numeric integral of the (possibly crosstalk-combined) waveform on
    /// `channel`: sample sum times sample spacing. 0 when the pulse is off
    /// or the channel is not associated with the pulse.
    fn pulse_area(&self, channel: &str, tvals: &[f64]) -> f64 {
        if self.common().pulse_off || tvals.len() < 2 {
            return 0.0;
        }
        let dt = tvals[1] - tvals[0];
        let crosstalk = self.common().crosstalk.as_ref();
        let cancellation_idx =
            crosstalk.and_then(|ct| ct.channels.iter().position(|c| c == channel));
        if let (Some(ct), Some(idx_c)) = (crosstalk, cancellation_idx) {
            let mut area = 0.0;
            for (idx_c2, contributor) in ct.channels.iter().enumerate() {
                if !self.channels().contains(contributor) {
                    continue;
                }
                let factor = ct.mtx[idx_c][idx_c2];
                area += factor * self.chan_wf(contributor, tvals).iter().sum::<f64>();
            }
            area * dt
        } else if self.channels().iter().any(|c| c == channel) {
            let mut tvals_map = IndexMap::new();
            tvals_map.insert(channel.to_string(), tvals.to_vec());
            self.waveforms(&tvals_map)
                .get(channel)
                .map_or(0.0, |wave| wave.iter().sum::<f64>())
                * dt
        } else {
            0.0
        }
    }

    /// The channels that actually carry signal energy: the channel-mask
    /// selection of the pulse's channels, unioned with the
    /// crosstalk-cancellation channels.
    fn masked_channels(&self) -> IndexSet<String> {
        let common = self.common();
        let mut selected: IndexSet<String> = match &common.channel_mask {
            None => self.channels().iter().cloned().collect(),
            Some(mask) => self
                .channels()
                .iter()
                .zip(mask)
                .filter(|&(_, &keep)| keep)
                .map(|(channel, _)| channel.clone())
                .collect(),
        };
        if let Some(crosstalk) = &common.crosstalk {
            selected.extend(crosstalk.channels.iter().cloned());
        }
        selected
    }
}
