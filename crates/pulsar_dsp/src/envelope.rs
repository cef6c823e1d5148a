//! Decay Envelope Generator
//!
//! A struck envelope jumps to 1.0 and decays back toward zero under one
//! of several decay laws. Samples are evaluated from the closed form of
//! the law at an absolute elapsed-sample count rather than through an
//! incremental recurrence, so error never accumulates across a
//! long-running decay.
//!
//! This is audio-land: define a "reasonable zero" that values are hard
//! rounded to, avoiding denormal/underflow artifacts near the tail.

use crate::DspError;

/// Values below this threshold are clamped to exactly 0.0
///
/// Policy constant, tuned empirically - the decay-duration solvers and
/// the tests both depend on this exact value.
pub const EFFECTIVE_ZERO: f32 = 1e-8;

/// Which decay law an envelope follows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecayKind {
    Constant,
    Linear,
    Exponential,
    Logarithmic,
}

/// One decay law with its solved rate parameter
///
/// Immutable once installed; replaced wholesale via
/// [`Envelope::reconfigure`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnvelopeSetting {
    /// Fixed output, no decay
    Constant { value: f32 },
    /// value(t) = 1 - m*t, floored at zero
    Linear { m: f32 },
    /// value(t) = exp(lambda*t), lambda negative by convention
    Exponential { lambda: f32 },
    /// value(t) = 1 - ln(t)/m, t >= 1 enforced
    Logarithmic { m: f32 },
}

impl EnvelopeSetting {
    /// Solve a decay law's rate so the value reaches [`EFFECTIVE_ZERO`]
    /// after `decay_ns` of wall time at `sample_rate_hz`.
    ///
    /// `Constant` has no decay and is rejected.
    pub fn for_decay(
        kind: DecayKind,
        decay_ns: u64,
        sample_rate_hz: u64,
    ) -> Result<Self, DspError> {
        if sample_rate_hz == 0 {
            return Err(DspError::InvalidSampleRate(sample_rate_hz));
        }
        let ns_per_frame = 1e9 / sample_rate_hz as f64;
        let t = (decay_ns as f64 / ns_per_frame).max(1.0);

        match kind {
            DecayKind::Constant => Err(DspError::ConstantHasNoDecay),

            // 0 = 1 - t*m
            DecayKind::Linear => Ok(Self::Linear { m: (1.0 / t) as f32 }),

            // Can never reach zero exactly, but can reach effective zero:
            //   EFFECTIVE_ZERO = e^(lambda*t)  =>  lambda = ln(EZ) / t
            DecayKind::Exponential => Ok(Self::Exponential {
                lambda: ((EFFECTIVE_ZERO as f64).ln() / t) as f32,
            }),

            // EZ = 1 - ln(t)/m  =>  m = ln(t)/(1 - EZ)
            //
            // When the decay is shorter than one frame, ln(t) is 0 and m
            // would be too; clamp to the threshold so later evaluation
            // divides by something nonzero and always yields zeros.
            DecayKind::Logarithmic => {
                let m = (t.ln() / (1.0 - EFFECTIVE_ZERO as f64)) as f32;
                Ok(Self::Logarithmic {
                    m: m.max(EFFECTIVE_ZERO),
                })
            }
        }
    }
}

/// Stateful decay envelope
pub struct Envelope {
    /// Frames elapsed since the last strike; saturates, never wraps
    samples_since_strike: u64,
    setting: EnvelopeSetting,
}

impl Envelope {
    pub fn new(setting: EnvelopeSetting) -> Self {
        Self {
            samples_since_strike: 0,
            setting,
        }
    }

    /// Reset the envelope to its peak and begin a fresh decay
    pub fn strike(&mut self) {
        self.samples_since_strike = 0;
    }

    /// Force the envelope to zero
    ///
    /// At "infinity", every decay law is at zero; the saturating counter
    /// makes that state representable without overflow.
    pub fn zero(&mut self) {
        self.samples_since_strike = u64::MAX;
    }

    /// Swap in a new decay law without resetting elapsed time
    ///
    /// A mid-decay reconfiguration switches the curve but does not
    /// restart the note; that is the contract, not an accident.
    pub fn reconfigure(&mut self, setting: EnvelopeSetting) {
        self.setting = setting;
    }

    pub fn setting(&self) -> EnvelopeSetting {
        self.setting
    }

    /// Fill `out` with the next frames of the decay
    ///
    /// Each frame i is the closed-form value at t = elapsed + i. Any
    /// value below [`EFFECTIVE_ZERO`] (including negatives from the
    /// linear law past its root) is clamped to exactly 0.0.
    pub fn generate(&mut self, out: &mut [f32]) {
        let elapsed = self.samples_since_strike;

        for (i, sample) in out.iter_mut().enumerate() {
            let t = elapsed.saturating_add(i as u64) as f64;

            let value = match self.setting {
                EnvelopeSetting::Constant { value } => value as f64,
                EnvelopeSetting::Linear { m } => 1.0 - m as f64 * t,
                EnvelopeSetting::Exponential { lambda } => (lambda as f64 * t).exp(),
                // ln(0) is a singularity; the first frame evaluates at t=1
                EnvelopeSetting::Logarithmic { m } => 1.0 - t.max(1.0).ln() / m as f64,
            };

            *sample = if value < EFFECTIVE_ZERO as f64 {
                0.0
            } else {
                value as f32
            };
        }

        debug_assert!(out.iter().all(|s| !s.is_nan()));

        self.samples_since_strike = elapsed.saturating_add(out.len() as u64);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATE: u64 = 48_000;

    fn frames_for(decay_ns: u64, sample_rate_hz: u64) -> usize {
        let ns_per_frame = 1e9 / sample_rate_hz as f64;
        (decay_ns as f64 / ns_per_frame).max(1.0) as usize
    }

    #[test]
    fn test_constant_is_rejected() {
        let err = EnvelopeSetting::for_decay(DecayKind::Constant, 1_000_000, RATE);
        assert!(matches!(err, Err(DspError::ConstantHasNoDecay)));
    }

    #[test]
    fn test_decay_reaches_effective_zero_on_schedule() {
        let kinds = [DecayKind::Linear, DecayKind::Exponential, DecayKind::Logarithmic];
        let cases: [(u64, u64); 4] = [
            (44_100, 10_000_000),    // 10ms
            (48_000, 100_000_000),   // 100ms
            (48_000, 1_000_000_000), // 1s
            (96_000, 250_000_000),   // 250ms
        ];

        for kind in kinds {
            for (rate, decay_ns) in cases {
                let setting = EnvelopeSetting::for_decay(kind, decay_ns, rate).unwrap();
                let mut env = Envelope::new(setting);
                env.strike();

                let n = frames_for(decay_ns, rate);
                let mut buf = vec![0.0f32; n + 16];
                env.generate(&mut buf);

                for (i, &s) in buf.iter().enumerate() {
                    assert!(!s.is_nan(), "{kind:?} rate={rate} NaN at {i}");
                    assert!(s >= 0.0, "{kind:?} rate={rate} negative at {i}: {s}");
                }

                // The scheduled arrival frame is at (or clamped to) the
                // effective-zero threshold.
                assert!(
                    buf[n] <= EFFECTIVE_ZERO + 1e-6,
                    "{kind:?} rate={rate} still at {} after decay",
                    buf[n]
                );
            }
        }
    }

    #[test]
    fn test_no_rebound_after_zero() {
        let setting =
            EnvelopeSetting::for_decay(DecayKind::Linear, 1_000_000, RATE).unwrap();
        let mut env = Envelope::new(setting);
        env.strike();

        // Well past the decay duration, the output stays pinned at zero.
        let mut buf = vec![0.0f32; 4096];
        env.generate(&mut buf);
        env.generate(&mut buf);
        for &s in &buf {
            assert_eq!(s, 0.0);
        }
    }

    #[test]
    fn test_zero_forces_all_laws_to_zero() {
        let settings = [
            EnvelopeSetting::Linear { m: 1e-6 },
            EnvelopeSetting::Exponential { lambda: -1e-6 },
            EnvelopeSetting::Logarithmic { m: 100.0 },
        ];
        for setting in settings {
            let mut env = Envelope::new(setting);
            env.zero();
            let mut buf = [1.0f32; 64];
            env.generate(&mut buf);
            assert!(buf.iter().all(|&s| s == 0.0), "{setting:?} not zeroed");
        }
    }

    #[test]
    fn test_strike_resets_to_peak() {
        let setting =
            EnvelopeSetting::for_decay(DecayKind::Exponential, 100_000_000, RATE).unwrap();
        let mut env = Envelope::new(setting);
        env.zero();
        env.strike();

        let mut buf = [0.0f32; 8];
        env.generate(&mut buf);
        assert_eq!(buf[0], 1.0, "peak after strike");
        assert!(buf[1] < buf[0]);
    }

    #[test]
    fn test_reconfigure_keeps_elapsed_time() {
        let slow =
            EnvelopeSetting::for_decay(DecayKind::Linear, 1_000_000_000, RATE).unwrap();
        let fast =
            EnvelopeSetting::for_decay(DecayKind::Linear, 1_000_000, RATE).unwrap();

        let mut env = Envelope::new(slow);
        env.strike();
        let mut buf = [0.0f32; 480];
        env.generate(&mut buf);

        // Switching the law mid-decay does not restart the note: the
        // fast law evaluated at the already elapsed 480 frames is past
        // its root, so output is immediately zero.
        env.reconfigure(fast);
        env.generate(&mut buf);
        assert_eq!(buf[0], 0.0);
    }

    #[test]
    fn test_constant_holds_value() {
        let mut env = Envelope::new(EnvelopeSetting::Constant { value: 0.5 });
        let mut buf = [0.0f32; 32];
        env.generate(&mut buf);
        env.generate(&mut buf);
        assert!(buf.iter().all(|&s| s == 0.5));
    }

    #[test]
    fn test_sub_frame_decay_is_valid() {
        // A decay shorter than one frame clamps t to 1; generation must
        // still be finite and non-negative.
        for kind in [DecayKind::Linear, DecayKind::Exponential, DecayKind::Logarithmic] {
            let setting = EnvelopeSetting::for_decay(kind, 1, RATE).unwrap();
            let mut env = Envelope::new(setting);
            env.strike();
            let mut buf = [0.0f32; 16];
            env.generate(&mut buf);
            for &s in &buf {
                assert!(s.is_finite() && s >= 0.0, "{kind:?} produced {s}");
            }
        }
    }
}
