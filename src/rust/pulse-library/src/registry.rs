// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Pulse type registry.
//!
//! Sequence assemblers describe pulses as a `pulse_type` tag plus a keyword
//! parameter dictionary. The registry maps tags to shape constructors; each
//! factory deserializes the dictionary into the shape's typed parameter
//! struct, so unrecognized parameter names are rejected instead of silently
//! ignored.
//!
//! The registry is an explicit object built at startup by the sequence
//! assembly layer. There is no process-global registration state.

use std::sync::Arc;

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::pulse::{Codeword, Pulse, PulseCommon};
use crate::shapes;
use crate::shapes::flux::FluxWaveformGenerator;
use crate::truncation::Truncation;
use crate::{Error, Result};

/// Identity and placement attributes common to every pulse, supplied by the
/// sequence assembler alongside the shape parameters.
#[derive(Debug, Clone, Default)]
pub struct PulseHeader {
    pub name: String,
    pub element_name: String,
    pub codeword: Codeword,
    pub pulse_off: bool,
    pub truncation: Option<Truncation>,
    pub channel_mask: Option<Vec<bool>>,
}

impl PulseHeader {
    pub fn new(name: impl Into<String>, element_name: impl Into<String>) -> Self {
        PulseHeader {
            name: name.into(),
            element_name: element_name.into(),
            ..PulseHeader::default()
        }
    }

    pub(crate) fn into_common(self) -> PulseCommon {
        PulseCommon {
            name: self.name,
            element_name: self.element_name,
            codeword: self.codeword,
            pulse_off: self.pulse_off,
            truncation: self.truncation,
            channel_mask: self.channel_mask,
            crosstalk: None,
            algorithm_time: None,
        }
    }
}

type PulseFactory = Box<dyn Fn(PulseHeader, Value) -> Result<Box<dyn Pulse>> + Send + Sync>;

/// Maps `pulse_type` tags to shape constructors.
#[derive(Default)]
pub struct PulseRegistry {
    factories: IndexMap<&'static str, PulseFactory>,
}

/// Deserialize a keyword parameter dictionary into a typed parameter
/// struct. `null` stands for "all defaults".
fn decode<P>(pulse_type: &str, params: Value) -> Result<P>
where
    P: DeserializeOwned + Default,
{
    if params.is_null() {
        return Ok(P::default());
    }
    serde_json::from_value(params)
        .map_err(|err| Error::new(format!("invalid parameters for pulse type '{pulse_type}': {err}")))
}

impl PulseRegistry {
    pub fn new() -> Self {
        PulseRegistry {
            factories: IndexMap::new(),
        }
    }

    /// Registry with the full standard shape catalog. The flux pulse shape
    /// needs an injected waveform generator; register it separately through
    /// [`PulseRegistry::register_flux_shape`].
    pub fn with_standard_shapes() -> Self {
        let mut registry = PulseRegistry::new();
        registry.register(shapes::SquarePulse::TAG, |header, params| {
            let params = decode(shapes::SquarePulse::TAG, params)?;
            Ok(Box::new(shapes::SquarePulse::new(header, params)?))
        });
        registry.register(shapes::CosPulse::TAG, |header, params| {
            let params = decode(shapes::CosPulse::TAG, params)?;
            Ok(Box::new(shapes::CosPulse::new(header, params)?))
        });
        registry.register(shapes::VirtualPulse::TAG, |header, params| {
            let params = decode(shapes::VirtualPulse::TAG, params)?;
            Ok(Box::new(shapes::VirtualPulse::new(header, params)))
        });
        registry.register(shapes::SsbDragPulse::TAG, |header, params| {
            let params = decode(shapes::SsbDragPulse::TAG, params)?;
            Ok(Box::new(shapes::SsbDragPulse::new(header, params)))
        });
        registry.register(
            shapes::GaussianFilteredPiecewiseConstPulse::TAG,
            |header, params| {
                let params = decode(shapes::GaussianFilteredPiecewiseConstPulse::TAG, params)?;
                Ok(Box::new(shapes::GaussianFilteredPiecewiseConstPulse::new(
                    header, params,
                )))
            },
        );
        registry.register(
            shapes::NzTransitionControlledPulse::TAG,
            |header, params| {
                let params = decode(shapes::NzTransitionControlledPulse::TAG, params)?;
                Ok(Box::new(shapes::NzTransitionControlledPulse::new(
                    header, params,
                )))
            },
        );
        registry.register(shapes::BufferedSquarePulse::TAG, |header, params| {
            let params = decode(shapes::BufferedSquarePulse::TAG, params)?;
            Ok(Box::new(shapes::BufferedSquarePulse::new(header, params)?))
        });
        registry.register(shapes::BufferedCzPulse::TAG, |header, params| {
            let params = decode(shapes::BufferedCzPulse::TAG, params)?;
            Ok(Box::new(shapes::BufferedCzPulse::new(header, params)?))
        });
        registry.register(shapes::NzBufferedCzPulse::TAG, |header, params| {
            let params = decode(shapes::NzBufferedCzPulse::TAG, params)?;
            Ok(Box::new(shapes::NzBufferedCzPulse::new(header, params)?))
        });
        registry.register(shapes::BufferedFlipPulse::TAG, |header, params| {
            let params = decode(shapes::BufferedFlipPulse::TAG, params)?;
            Ok(Box::new(shapes::BufferedFlipPulse::new(header, params)?))
        });
        registry.register(shapes::NzBufferedFlipPulse::TAG, |header, params| {
            let params = decode(shapes::NzBufferedFlipPulse::TAG, params)?;
            Ok(Box::new(shapes::NzBufferedFlipPulse::new(header, params)?))
        });
        registry.register(shapes::GaussFilteredCosIqPulse::TAG, |header, params| {
            let params = decode(shapes::GaussFilteredCosIqPulse::TAG, params)?;
            Ok(Box::new(shapes::GaussFilteredCosIqPulse::new(
                header, params,
            )?))
        });
        registry.register(
            shapes::GaussFilteredCosIqMultiChromaticPulse::TAG,
            |header, params| {
                let params = decode(shapes::GaussFilteredCosIqMultiChromaticPulse::TAG, params)?;
                Ok(Box::new(shapes::GaussFilteredCosIqMultiChromaticPulse::new(
                    header, params,
                )?))
            },
        );
        registry
    }

    pub fn register<F>(&mut self, pulse_type: &'static str, factory: F)
    where
        F: Fn(PulseHeader, Value) -> Result<Box<dyn Pulse>> + Send + Sync + 'static,
    {
        self.factories.insert(pulse_type, Box::new(factory));
    }

    /// Register the flux pulse shape with its injected waveform generator.
    pub fn register_flux_shape(&mut self, generator: Arc<dyn FluxWaveformGenerator>) {
        self.register(shapes::NzMartinisGellarPulse::TAG, move |header, params| {
            let params = decode(shapes::NzMartinisGellarPulse::TAG, params)?;
            Ok(Box::new(shapes::NzMartinisGellarPulse::new(
                header,
                params,
                Arc::clone(&generator),
            )?))
        });
    }

    pub fn create(
        &self,
        pulse_type: &str,
        header: PulseHeader,
        params: Value,
    ) -> Result<Box<dyn Pulse>> {
        let factory = self
            .factories
            .get(pulse_type)
            .ok_or_else(|| Error::new(format!("unknown pulse type '{pulse_type}'")))?;
        factory(header, params)
    }

    pub fn pulse_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.factories.keys().copied()
    }
}
