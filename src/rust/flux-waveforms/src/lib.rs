// Copyright 2025 Zurich Instruments AG
// SPDX-License-Identifier: Apache-2.0

//! Flux-bias waveforms that require knowledge of the qubit Hamiltonian.
//!
//! The main entry point is [`martinis_theta_waveform`], which constructs the
//! adiabatic interaction-angle trajectory θ(t) of Martinis & Geller,
//! Phys. Rev. A 90 022307 (2014). The returned trajectory is an angle in
//! radians; converting it into a detuning and into AWG amplitude is up to the
//! caller (see [`theta_to_eps`]).

mod numerics;
mod theta;

pub use numerics::{cumulative_trapezoid, interp_extrapolate};
pub use theta::{ThetaPulseConfig, eps_to_theta, martinis_theta_waveform, theta_to_eps};
