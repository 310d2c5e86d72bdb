// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

use indexmap::IndexMap;
use log::debug;

use crate::filters::{ChannelFilter, filter_fir, filter_iir};
use crate::{Error, Result};

/// Per-channel waveforms of one sequence element, as handed over by the
/// waveform generation layer, plus the distorted counterparts produced by
/// [`distort`].
#[derive(Debug, Clone, Default)]
pub struct SequenceElement {
    pub name: String,
    waveforms: IndexMap<String, Vec<f64>>,
    distorted: IndexMap<String, Vec<f64>>,
}

impl SequenceElement {
    pub fn new(name: impl Into<String>) -> Self {
        SequenceElement {
            name: name.into(),
            waveforms: IndexMap::new(),
            distorted: IndexMap::new(),
        }
    }

    pub fn insert_waveform(&mut self, channel: impl Into<String>, samples: Vec<f64>) {
        self.waveforms.insert(channel.into(), samples);
    }

    pub fn waveform(&self, channel: &str) -> Option<&[f64]> {
        self.waveforms.get(channel).map(Vec::as_slice)
    }

    pub fn distorted_waveform(&self, channel: &str) -> Option<&[f64]> {
        self.distorted.get(channel).map(Vec::as_slice)
    }

    pub fn is_distorted(&self, channel: &str) -> bool {
        self.distorted.contains_key(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.waveforms.keys().map(String::as_str)
    }

    /// The waveform to upload for `channel`: the distorted one when the
    /// channel went through the compensator, the raw one otherwise.
    pub fn upload_waveform(&self, channel: &str) -> Option<&[f64]> {
        self.distorted_waveform(channel)
            .or_else(|| self.waveform(channel))
    }
}

/// Read-only table of per-channel distortion filters. Iteration order is the
/// channel order of the hardware setup description.
#[derive(Debug, Clone, Default)]
pub struct DistortionMap {
    filters: IndexMap<String, ChannelFilter>,
}

impl DistortionMap {
    pub fn new() -> Self {
        DistortionMap {
            filters: IndexMap::new(),
        }
    }

    pub fn insert(&mut self, channel: impl Into<String>, filter: ChannelFilter) {
        self.filters.insert(channel.into(), filter);
    }

    pub fn get(&self, channel: &str) -> Option<&ChannelFilter> {
        self.filters.get(channel)
    }

    pub fn channels(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ChannelFilter)> {
        self.filters.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Distort the element's waveforms channel by channel.
///
/// For every channel listed in `distortions`, the already-generated waveform
/// is passed through the channel's FIR kernel (if any) and then through its
/// IIR sections in series, and the result is stored as the element's
/// distorted waveform for that channel. Channels not listed are left
/// untouched; a channel with neither FIR nor IIR is a pass-through copy.
///
/// A listed channel without a generated waveform is an error.
pub fn distort(element: &mut SequenceElement, distortions: &DistortionMap) -> Result<()> {
    for (channel, filter) in distortions.iter() {
        let waveform = element.waveform(channel).ok_or_else(|| {
            Error::new(format!(
                "no waveform generated for channel '{channel}' in element '{}'",
                element.name
            ))
        })?;
        let mut distorted = waveform.to_vec();
        if let Some(kernel) = &filter.fir {
            distorted = filter_fir(kernel, &distorted);
        }
        if let Some(iir) = &filter.iir {
            distorted = filter_iir(iir, &distorted);
        }
        debug!(
            "distorted channel '{channel}' of element '{}' ({} samples)",
            element.name,
            distorted.len()
        );
        element.distorted.insert(channel.to_string(), distorted);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::IirCoefficients;

    fn element_with(channel: &str, samples: Vec<f64>) -> SequenceElement {
        let mut element = SequenceElement::new("cz_segment");
        element.insert_waveform(channel, samples);
        element
    }

    #[test]
    fn test_centered_identity_fir_reproduces_input() {
        let samples = vec![0.0, 0.0, 1.0, 1.0, 1.0, 0.0];
        let mut element = element_with("flux_ch1", samples.clone());
        let mut distortions = DistortionMap::new();
        distortions.insert(
            "flux_ch1",
            ChannelFilter {
                fir: Some(vec![0.0, 1.0, 0.0]),
                iir: None,
            },
        );
        distort(&mut element, &distortions).unwrap();
        assert!(element.is_distorted("flux_ch1"));
        assert_eq!(element.distorted_waveform("flux_ch1").unwrap(), samples);
    }

    #[test]
    fn test_pass_through_channel_copies_waveform() {
        let samples = vec![1.0, 2.0, 3.0];
        let mut element = element_with("flux_ch1", samples.clone());
        let mut distortions = DistortionMap::new();
        distortions.insert("flux_ch1", ChannelFilter::default());
        distort(&mut element, &distortions).unwrap();
        assert_eq!(element.distorted_waveform("flux_ch1").unwrap(), samples);
    }

    #[test]
    fn test_unlisted_channel_is_untouched() {
        let mut element = element_with("flux_ch1", vec![1.0, 1.0]);
        element.insert_waveform("drive_i", vec![0.5, 0.5]);
        let mut distortions = DistortionMap::new();
        distortions.insert("flux_ch1", ChannelFilter::default());
        distort(&mut element, &distortions).unwrap();
        assert!(!element.is_distorted("drive_i"));
        assert_eq!(element.upload_waveform("drive_i").unwrap(), [0.5, 0.5]);
    }

    #[test]
    fn test_fir_then_iir_in_sequence() {
        let mut element = element_with("flux_ch1", vec![1.0, 0.0, 0.0]);
        let mut distortions = DistortionMap::new();
        distortions.insert(
            "flux_ch1",
            ChannelFilter {
                fir: Some(vec![1.0]),
                iir: Some(IirCoefficients {
                    a: vec![vec![1.0, -0.5]],
                    b: vec![vec![1.0, 0.0]],
                }),
            },
        );
        distort(&mut element, &distortions).unwrap();
        let got = element.distorted_waveform("flux_ch1").unwrap();
        let expected = [1.0, 0.5, 0.25];
        for (g, w) in got.iter().zip(expected.iter()) {
            assert!((g - w).abs() < 1e-12);
        }
    }

    #[test]
    fn test_missing_waveform_is_an_error() {
        let mut element = SequenceElement::new("empty");
        let mut distortions = DistortionMap::new();
        distortions.insert("flux_ch1", ChannelFilter::default());
        assert!(distort(&mut element, &distortions).is_err());
    }
}
