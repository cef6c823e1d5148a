//! Additive Square Wave Generator
//!
//! Inefficient but highly accurate band-limited square synthesis: sums
//! successive odd sine harmonics up to the Nyquist frequency. Cost is
//! O(frames * nyquist / frequency), which is the deliberate trade for
//! an alias-free waveform - this is a measurement stimulus, not a voice.
//!
//! # Real-time Safety
//!
//! `generate` performs no allocations and no syscalls; the only state is
//! the persistent phase, which is what guarantees continuity across
//! buffer boundaries.

use crate::DspError;

/// Band-limited square wave generator with persistent phase
pub struct AdditiveSquare {
    /// Max frequency representable at the configured sample rate
    nyquist: f32,
    /// Normalized phase in [0, 1), carried across calls
    phase: f32,
}

impl AdditiveSquare {
    /// Create a generator for the given sample rate
    pub fn new(sample_rate_hz: u64) -> Result<Self, DspError> {
        if sample_rate_hz == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate_hz));
        }
        Ok(Self {
            nyquist: sample_rate_hz as f32 / 2.0,
            phase: 0.0,
        })
    }

    /// Highest frequency this generator can represent
    pub fn nyquist(&self) -> f32 {
        self.nyquist
    }

    /// Fill `out` with square-wave frames at `frequency_hz`
    ///
    /// A square wave is the 1st, 3rd, 5th, ... harmonics summed with
    /// 1/k amplitudes and a 4/pi Fourier normalization. The series is
    /// truncated at the highest harmonic still below Nyquist.
    pub fn generate(&mut self, frequency_hz: f32, out: &mut [f32]) {
        let nyq = self.nyquist;
        let mut phase = self.phase;

        for sample in out.iter_mut() {
            let mut acc = 0.0f32;
            let mut harmonic = 1.0f32;
            while harmonic * frequency_hz < nyq {
                acc += (2.0 * std::f32::consts::PI * harmonic * phase).sin() / harmonic;
                harmonic += 2.0;
            }
            *sample = acc * (4.0 / std::f32::consts::PI);

            phase += frequency_hz / (nyq * 2.0);
            if phase >= 1.0 {
                phase = 0.0;
            }
        }

        self.phase = phase;
    }
}
