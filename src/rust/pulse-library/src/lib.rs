// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Analytic pulse shapes and their waveform generation.
//!
//! Pulses represent an analytical form of a control signal and generate
//! voltage waveforms for the sample time-values passed to them. Every shape
//! implements the [`Pulse`] contract: per-channel waveform generation,
//! truncation, crosstalk-cancellation mixing, and a hash-element list that
//! uniquely identifies the generated samples so the upload layer can reuse
//! previously-programmed waveforms.
//!
//! The concrete shapes live in [`shapes`]; [`registry::PulseRegistry`] maps
//! `pulse_type` tags to shape constructors for sequence assemblers that work
//! from parameter dictionaries.

pub mod hash;
pub mod modulation;
pub mod pulse;
pub mod registry;
pub mod shapes;
pub mod truncation;

pub use hash::{HashElement, normalize_f64, normalize_phase_deg, signature_string, waveform_uid};
pub use modulation::{ModulationParams, apply_modulation};
pub use pulse::{Codeword, CrosstalkCancellation, Pulse, PulseCommon};
pub use registry::{PulseHeader, PulseRegistry};
pub use truncation::{Truncation, TruncationDecay};

use std::fmt::Display;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl Error {
    pub fn new<T>(msg: T) -> Self
    where
        T: Display,
    {
        Error::Anyhow(anyhow::anyhow!(msg.to_string()))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
