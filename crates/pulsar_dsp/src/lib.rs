//! Pulsar DSP - Signal Kernels
//!
//! This crate provides the leaf signal kernels for Pulsar:
//! - Band-limited additive square-wave synthesis with persistent phase
//! - Decay envelopes (linear/exponential/logarithmic/constant) evaluated
//!   in closed form from an absolute elapsed-sample count
//! - A fixed-window spectral accumulator over `rustfft`
//!
//! # Architecture
//!
//! Every kernel follows a strict "no allocation after creation" rule:
//! plans and working buffers are built once, and the per-frame paths are
//! safe to drive from a realtime callback.

mod envelope;
mod error;
mod spectrum;
mod square;

pub use envelope::{DecayKind, Envelope, EnvelopeSetting, EFFECTIVE_ZERO};
pub use error::DspError;
pub use spectrum::SpectralAccumulator;
pub use square::AdditiveSquare;
