// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Distortion compensation for flux and drive lines.
//!
//! Waveforms played through physical output paths are distorted by the cable
//! and filter response of the line. This crate predistorts the generated
//! per-channel waveforms with measured FIR kernels and cascaded first-order
//! IIR sections, so that the signal arriving at the device matches the
//! intended pulse shape.

pub mod cache;
pub mod distortion;
pub mod filters;
pub mod import;

pub use cache::KernelCache;
pub use distortion::{DistortionMap, SequenceElement, distort};
pub use filters::{ChannelFilter, IirCoefficients, filter_fir, filter_iir};
pub use import::parse_iir_table;

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
