//! Pulsar Core - Telemetry Engine
//!
//! This crate provides the engine behind Pulsar:
//! - Arena composition for the per-callback scratch regions
//! - The sample-set wire codec and the record reader that re-derives
//!   record boundaries from its self-describing header
//! - The bounded lock-free byte channel bridging threads
//! - The disk-writer thread and its flush-and-stop lifecycle
//! - The `App` orchestrator with the realtime per-callback entry point
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Realtime Thread                          │
//! │  collaborator ──poll──▶ App                                  │
//! │    square gen ─▶ strike scheduler ─▶ spectral accumulator    │
//! │                    │                                         │
//! │              sample-set codec ──try_write──▶ byte channel    │
//! │              (Zero allocation in this path)                  │
//! └──────────────────────────────────────────────────────────────┘
//!                                │ rtrb (lock-free SPSC)
//!                                ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Disk Thread                              │
//! │   poll channel ─▶ append to file ─▶ drain on flush request   │
//! └──────────────────────────────────────────────────────────────┘
//! ```

mod app;
pub mod arena;
mod channel;
mod config;
mod disk;
mod error;
pub mod sample_set;

pub use app::{App, PollOutcome};
pub use channel::{byte_channel, ByteConsumer, ByteProducer};
pub use config::{DecayConfig, EngineConfig};
pub use disk::DiskWriter;
pub use error::{CoreError, CoreResult};
pub use sample_set::{RecordReader, SampleSet, SampleSetWriter, MAX_SAMPLE_SET_BYTES};

// Re-export DSP types for convenience
pub use pulsar_dsp::{
    AdditiveSquare, DecayKind, Envelope, EnvelopeSetting, SpectralAccumulator, EFFECTIVE_ZERO,
};
