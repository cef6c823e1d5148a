//! Offline driver for the Pulsar engine
//!
//! Stands in for the audio-server collaborator: it owns the engine
//! context explicitly (no process-wide singletons), drives the
//! per-callback entry point on a synthetic monotonic clock, feeds a sine
//! as the returned input signal, and performs the two-phase shutdown.

use std::f32::consts::PI;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use pulsar_core::{App, DecayConfig, EngineConfig, PollOutcome};

#[derive(Parser, Debug)]
#[command(name = "pulsar", about = "Run a Pulsar telemetry session offline")]
struct Args {
    /// Sample rate in Hz
    #[arg(long, default_value_t = 48_000)]
    sample_rate: u64,

    /// Frames per callback
    #[arg(long, default_value_t = 128)]
    frames: usize,

    /// Session length in callbacks
    #[arg(long, default_value_t = 1000)]
    callbacks: u64,

    /// Strike period in milliseconds
    #[arg(long, default_value_t = 1000)]
    strike_period_ms: u64,

    /// Exciter decay duration in milliseconds
    #[arg(long, default_value_t = 250)]
    decay_ms: u64,

    /// Decay law for the exciter
    #[arg(long, value_enum, default_value = "exponential")]
    decay: DecayArg,

    /// Square-wave stimulus frequency in Hz
    #[arg(long, default_value_t = 440.0)]
    frequency: f32,

    /// Frequency of the synthetic input sine fed back for analysis
    #[arg(long, default_value_t = 1000.0)]
    input_frequency: f32,

    /// Spectral window size in samples
    #[arg(long, default_value_t = 1024)]
    fft_window: usize,

    /// Output data file
    #[arg(long, default_value = "data_out")]
    output: PathBuf,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum DecayArg {
    Linear,
    Exponential,
    Logarithmic,
}

impl From<DecayArg> for DecayConfig {
    fn from(value: DecayArg) -> Self {
        match value {
            DecayArg::Linear => DecayConfig::Linear,
            DecayArg::Exponential => DecayConfig::Exponential,
            DecayArg::Logarithmic => DecayConfig::Logarithmic,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = EngineConfig {
        sample_rate_hz: args.sample_rate,
        strike_period_ns: args.strike_period_ms * 1_000_000,
        decay_ns: args.decay_ms * 1_000_000,
        decay_kind: args.decay.into(),
        square_frequency_hz: args.frequency,
        fft_window: args.fft_window,
        output_path: args.output.clone(),
        ..Default::default()
    };
    info!(?config, "starting offline session");

    let mut app = App::new(config).context("failed to build the engine")?;
    app.start().context("failed to start the engine")?;

    let ns_per_frame = 1_000_000_000 / args.sample_rate;
    let mut now_ns: u64 = 1;
    let mut phase = 0.0f32;

    let mut input = vec![0.0f32; args.frames];
    let mut square = vec![0.0f32; args.frames];
    let mut exciter = vec![0.0f32; args.frames];

    let mut delivered = 0u64;
    for _ in 0..args.callbacks {
        for sample in input.iter_mut() {
            *sample = (2.0 * PI * phase).sin();
            phase = (phase + args.input_frequency / args.sample_rate as f32) % 1.0;
        }

        match app.poll(now_ns, &input, &mut square, &mut exciter)? {
            PollOutcome::Delivered => delivered += 1,
            PollOutcome::Dropped => {}
        }
        now_ns += ns_per_frame * args.frames as u64;
    }

    app.stop().context("shutdown failed")?;

    if app.dropped_sets() > 0 {
        warn!(
            dropped = app.dropped_sets(),
            delivered, "channel backpressure dropped sample sets"
        );
    }
    info!(
        delivered,
        output = %args.output.display(),
        "session complete"
    );
    Ok(())
}
