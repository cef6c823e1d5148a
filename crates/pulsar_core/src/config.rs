//! Engine Configuration

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Everything the engine consumes at creation time
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate_hz: u64,

    /// How often the exciter envelope is struck, in nanoseconds
    pub strike_period_ns: u64,

    /// Decay duration of one exciter pulse, in nanoseconds
    pub decay_ns: u64,

    /// Decay law for the exciter envelope
    pub decay_kind: DecayConfig,

    /// Square-wave stimulus frequency in Hz
    pub square_frequency_hz: f32,

    /// Spectral analysis window size in samples
    pub fft_window: usize,

    /// Capacity of the realtime-to-disk byte channel
    pub channel_capacity: usize,

    /// Where the disk writer appends sample-set records
    pub output_path: PathBuf,
}

/// Serializable mirror of the envelope decay laws
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecayConfig {
    Linear,
    Exponential,
    Logarithmic,
}

impl From<DecayConfig> for pulsar_dsp::DecayKind {
    fn from(value: DecayConfig) -> Self {
        match value {
            DecayConfig::Linear => pulsar_dsp::DecayKind::Linear,
            DecayConfig::Exponential => pulsar_dsp::DecayKind::Exponential,
            DecayConfig::Logarithmic => pulsar_dsp::DecayKind::Logarithmic,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_rate_hz: 48_000,
            strike_period_ns: 1_000_000_000,
            decay_ns: 250_000_000,
            decay_kind: DecayConfig::Exponential,
            square_frequency_hz: 440.0,
            fft_window: 1024,
            // 16 full-sized messages of headroom before drops start
            channel_capacity: 4096 * 16,
            output_path: PathBuf::from("data_out"),
        }
    }
}

impl EngineConfig {
    /// Nanoseconds represented by one frame at the configured rate
    pub fn ns_per_frame(&self) -> u64 {
        (1e9 / self.sample_rate_hz as f64) as u64
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate_hz < 8_000 || self.sample_rate_hz > 192_000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate_hz));
        }
        if self.strike_period_ns == 0 {
            return Err("Strike period must be nonzero".into());
        }
        if self.decay_ns == 0 {
            return Err("Decay duration must be nonzero".into());
        }
        if self.fft_window < 2 {
            return Err(format!("Invalid spectral window: {}", self.fft_window));
        }
        if self.channel_capacity < crate::sample_set::MAX_SAMPLE_SET_BYTES {
            return Err(format!(
                "Channel capacity {} can't hold even one message",
                self.channel_capacity
            ));
        }
        if !(self.square_frequency_hz > 0.0) {
            return Err(format!(
                "Invalid square frequency: {}",
                self.square_frequency_hz
            ));
        }
        Ok(())
    }
}
