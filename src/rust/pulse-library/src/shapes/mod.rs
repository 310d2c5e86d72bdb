// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! The pulse shape catalog.

pub mod basic;
pub mod buffered;
pub mod cos_iq;
pub mod drag;
pub mod flip;
pub mod flux;
pub mod piecewise;

pub use basic::{CosParams, CosPulse, SquareParams, SquarePulse, VirtualParams, VirtualPulse};
pub use buffered::{
    BufferedCzParams, BufferedCzPulse, BufferedSquareParams, BufferedSquarePulse,
    NzBufferedCzParams, NzBufferedCzPulse,
};
pub use cos_iq::{
    GaussFilteredCosIqMultiChromaticParams, GaussFilteredCosIqMultiChromaticPulse,
    GaussFilteredCosIqParams, GaussFilteredCosIqPulse,
};
pub use drag::{SsbDragParams, SsbDragPulse};
pub use flip::{
    BufferedFlipParams, BufferedFlipPulse, NzBufferedFlipParams, NzBufferedFlipPulse,
};
pub use flux::{
    FluxPulseParams, FluxWaveformGenerator, NzMartinisGellarParams, NzMartinisGellarPulse,
};
pub use piecewise::{
    GaussianFilteredPiecewiseConstParams, GaussianFilteredPiecewiseConstPulse,
    NzTransitionControlledParams, NzTransitionControlledPulse,
};
