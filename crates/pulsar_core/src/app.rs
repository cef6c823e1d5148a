//! Engine Orchestrator
//!
//! Owns one instance of every component and implements the per-callback
//! entry point the audio-server collaborator drives. The collaborator
//! hands in {current time, frame count, returned input signal}; the
//! engine fills the square-wave and exciter output buffers, feeds the
//! spectral accumulator, encodes the callback's sample set, and performs
//! one non-blocking channel write toward the disk thread.
//!
//! # Real-time Safety
//!
//! [`App::poll`] never allocates, locks, blocks, or logs. Everything it
//! touches was sized at creation; the only cross-thread interaction is
//! the channel's lock-free try-write. Dropped messages are counted, not
//! reported inline.

use tracing::info;

use pulsar_dsp::{AdditiveSquare, Envelope, EnvelopeSetting, SpectralAccumulator};

use crate::arena::{self, Arena, ComponentLayout};
use crate::channel::{byte_channel, ByteProducer};
use crate::config::EngineConfig;
use crate::disk::DiskWriter;
use crate::error::{CoreError, CoreResult};
use crate::sample_set::{self, SampleSetWriter};

/// Arena region index for the sample-set encode scratch
const SCRATCH: usize = 0;

/// Per-callback status: a drop is an expected, recoverable condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// The sample set was handed to the disk thread
    Delivered,
    /// The channel was full; the whole message was discarded
    Dropped,
}

/// The engine: stimulus generators, analysis, codec, and disk handoff
pub struct App {
    config: EngineConfig,
    running: bool,

    /// Time of the last strike; 0 means "never struck"
    last_strike_ns: u64,
    ns_per_frame: u64,

    square: AdditiveSquare,
    exciter: Envelope,
    spectrum: SpectralAccumulator,

    /// Single allocation behind the per-callback scratch regions
    scratch: Arena,
    producer: ByteProducer,
    disk: DiskWriter,

    dropped_sets: u64,
}

impl App {
    /// Build every component from the configuration
    ///
    /// Any failure here unwinds the components constructed so far; no
    /// partially-built engine is ever returned.
    pub fn new(config: EngineConfig) -> CoreResult<Self> {
        config.validate().map_err(CoreError::Config)?;

        let square = AdditiveSquare::new(config.sample_rate_hz)?;

        let setting = EnvelopeSetting::for_decay(
            config.decay_kind.into(),
            config.decay_ns,
            config.sample_rate_hz,
        )?;
        let exciter = Envelope::new(setting);

        let spectrum = SpectralAccumulator::new(config.fft_window)?;

        let composition =
            arena::compose(&[ComponentLayout::bytes(sample_set::MAX_SAMPLE_SET_BYTES)])?;
        info!(
            footprint = composition.total_size(),
            fft_bins = spectrum.bin_count(),
            "composed engine scratch"
        );
        let scratch = Arena::new(composition);

        let (producer, consumer) = byte_channel(config.channel_capacity);
        let disk = DiskWriter::create(&config.output_path, consumer)?;

        let ns_per_frame = config.ns_per_frame();
        Ok(Self {
            config,
            running: false,
            last_strike_ns: 0,
            ns_per_frame,
            square,
            exciter,
            spectrum,
            scratch,
            producer,
            disk,
            dropped_sets: 0,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    /// Sample sets dropped so far because the channel was full
    pub fn dropped_sets(&self) -> u64 {
        self.dropped_sets
    }

    /// Spin up the disk writer and open the engine for polling
    pub fn start(&mut self) -> CoreResult<()> {
        if self.running {
            return Err(CoreError::AlreadyRunning);
        }
        self.disk.start()?;
        self.running = true;
        info!("engine started");
        Ok(())
    }

    /// Two-phase shutdown: request a flush, then join the disk thread
    ///
    /// The engine stops accepting polls even when the join fails; the
    /// file is treated as best-effort closed in that case.
    pub fn stop(&mut self) -> CoreResult<()> {
        if !self.running {
            return Err(CoreError::NotRunning);
        }
        self.running = false;
        self.disk.flush_and_stop()?;
        info!(dropped = self.dropped_sets, "engine stopped");
        Ok(())
    }

    /// Per-callback entry point
    ///
    /// Generates `square_out.len()` frames of stimulus into the two
    /// output buffers, analyzes `input`, and streams the snapshot toward
    /// disk. A full channel yields [`PollOutcome::Dropped`]; the caller
    /// proceeds to the next callback regardless.
    pub fn poll(
        &mut self,
        now_ns: u64,
        input: &[f32],
        square_out: &mut [f32],
        exciter_out: &mut [f32],
    ) -> CoreResult<PollOutcome> {
        if !self.running {
            return Err(CoreError::NotRunning);
        }
        let nframes = square_out.len();
        if exciter_out.len() != nframes {
            return Err(CoreError::BufferSizeMismatch {
                expected: nframes,
                got: exciter_out.len(),
            });
        }
        if input.len() != nframes {
            return Err(CoreError::BufferSizeMismatch {
                expected: nframes,
                got: input.len(),
            });
        }

        // The square just ticks away; its persistent phase keeps the
        // waveform continuous across callback boundaries.
        self.square
            .generate(self.config.square_frequency_hz, square_out);

        self.run_strike_schedule(now_ns, exciter_out);

        // Window the returned signal; remember whether any transform
        // fired inside this callback.
        let mut transformed = false;
        for &sample in input {
            transformed |= self.spectrum.feed(sample);
        }
        let n_fft_bins = if transformed {
            self.spectrum.bin_count()
        } else {
            0
        };

        // Encode into the arena scratch, then hand the finished record
        // to the channel in one all-or-nothing write.
        let mut writer =
            SampleSetWriter::new(self.scratch.region_mut(SCRATCH), nframes, n_fft_bins)?;
        writer.put_square(square_out);
        writer.put_pulse(exciter_out);
        writer.put_input(input);
        if transformed {
            writer.put_fft_bins(self.spectrum.magnitudes());
        }

        let message = writer.as_bytes();
        if self.producer.try_write(message) != message.len() {
            self.dropped_sets += 1;
            return Ok(PollOutcome::Dropped);
        }
        Ok(PollOutcome::Delivered)
    }

    /// Decide whether the next scheduled strike lands inside this
    /// callback's [now, now + nframes * ns_per_frame) window, and if so
    /// split exciter generation around it.
    fn run_strike_schedule(&mut self, now_ns: u64, exciter_out: &mut [f32]) {
        // First ever callback: treat the envelope as struck one full
        // period ago, so a strike is due immediately instead of a whole
        // period from now.
        let next_strike = if self.last_strike_ns == 0 {
            now_ns
        } else {
            self.last_strike_ns + self.config.strike_period_ns
        };
        let frame_end = now_ns + self.ns_per_frame * exciter_out.len() as u64;

        if next_strike < frame_end {
            let frames_before = if next_strike > now_ns {
                (((next_strike - now_ns) / self.ns_per_frame) as usize).min(exciter_out.len())
            } else {
                0
            };

            // Old state up to the strike, fresh state after it.
            let (head, tail) = exciter_out.split_at_mut(frames_before);
            self.exciter.generate(head);
            self.exciter.strike();
            self.exciter.generate(tail);

            self.last_strike_ns = now_ns + (frames_before as u64 + 1) * self.ns_per_frame;
        } else {
            self.exciter.generate(exciter_out);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DecayConfig;
    use std::path::PathBuf;

    fn temp_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pulsar_app_{}_{}", tag, std::process::id()))
    }

    /// 50kHz gives an exact 20us frame period, keeping schedule
    /// arithmetic drift-free in assertions.
    fn test_config(tag: &str) -> EngineConfig {
        EngineConfig {
            sample_rate_hz: 50_000,
            strike_period_ns: 10_000_000,
            decay_ns: 2_000_000,
            decay_kind: DecayConfig::Exponential,
            output_path: temp_path(tag),
            ..Default::default()
        }
    }

    fn run_session<F: FnMut(&mut App)>(tag: &str, mut body: F) {
        let config = test_config(tag);
        let path = config.output_path.clone();
        let mut app = App::new(config).unwrap();
        app.start().unwrap();
        body(&mut app);
        app.stop().unwrap();
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_poll_before_start_fails() {
        let config = test_config("notstarted");
        let path = config.output_path.clone();
        let mut app = App::new(config).unwrap();

        let input = [0.0f32; 64];
        let mut square = [0.0f32; 64];
        let mut exciter = [0.0f32; 64];
        let err = app.poll(1, &input, &mut square, &mut exciter);
        assert!(matches!(err, Err(CoreError::NotRunning)));
        let _ = std::fs::remove_file(path);
    }

    #[test]
    fn test_mismatched_buffers_fail() {
        run_session("mismatch", |app| {
            let input = [0.0f32; 64];
            let mut square = [0.0f32; 64];
            let mut exciter = [0.0f32; 32];
            let err = app.poll(1, &input, &mut square, &mut exciter);
            assert!(matches!(err, Err(CoreError::BufferSizeMismatch { .. })));
        });
    }

    #[test]
    fn test_first_callback_strikes_immediately() {
        run_session("first", |app| {
            let input = [0.0f32; 64];
            let mut square = [0.0f32; 64];
            let mut exciter = [0.0f32; 64];
            app.poll(1_000_000, &input, &mut square, &mut exciter)
                .unwrap();

            // Exactly one strike, at the first frame of the window.
            assert_eq!(exciter[0], 1.0);
            assert_eq!(exciter.iter().filter(|&&s| s == 1.0).count(), 1);
        });
    }

    #[test]
    fn test_strike_lands_mid_window() {
        run_session("mid", |app| {
            let input = [0.0f32; 64];
            let mut square = [0.0f32; 64];
            let mut exciter = [0.0f32; 64];

            // First poll strikes at frame 0 and reschedules.
            let mut now: u64 = 1_000_000;
            app.poll(now, &input, &mut square, &mut exciter).unwrap();

            // Walk forward until the next strike falls inside a window;
            // at 20us frames and a 10ms period that is callback 8, frame
            // 53: last = 1_020_000, next = 11_020_000, window start
            // 9_960_000.
            let frame_ns = 20_000u64;
            for _ in 0..7 {
                now += 64 * frame_ns;
                app.poll(now, &input, &mut square, &mut exciter).unwrap();
            }
            assert_eq!(exciter[53], 1.0);
            // Pre-strike frames carry the previous decay (long finished
            // here) rather than being overwritten by the fresh one.
            assert_eq!(exciter[52], 0.0);
        });
    }

    #[test]
    fn test_square_output_is_continuous_across_polls() {
        let config = test_config("cont");
        let path = config.output_path.clone();
        let reference_config = test_config("contref");
        let ref_path = reference_config.output_path.clone();

        let mut app = App::new(config).unwrap();
        app.start().unwrap();
        let input = [0.0f32; 64];
        let mut exciter = [0.0f32; 64];
        let mut first = [0.0f32; 64];
        let mut second = [0.0f32; 64];
        let mut now = 1u64;
        app.poll(now, &input, &mut first, &mut exciter).unwrap();
        now += 64 * 20_000;
        app.poll(now, &input, &mut second, &mut exciter).unwrap();
        app.stop().unwrap();

        // One 128-frame generation must match the two 64-frame halves.
        let mut reference = App::new(reference_config).unwrap();
        reference.start().unwrap();
        let input_wide = [0.0f32; 128];
        let mut exciter_wide = [0.0f32; 128];
        let mut square_wide = [0.0f32; 128];
        reference
            .poll(1, &input_wide, &mut square_wide, &mut exciter_wide)
            .unwrap();
        reference.stop().unwrap();

        assert_eq!(&square_wide[..64], &first);
        assert_eq!(&square_wide[64..], &second);

        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(ref_path);
    }

    #[test]
    fn test_no_transform_means_no_bins() {
        run_session("bins", |app| {
            // 64-frame polls against the default 1024-sample window: the
            // first 15 polls carry no bins, the 16th fires the transform.
            let input = [0.5f32; 64];
            let mut square = [0.0f32; 64];
            let mut exciter = [0.0f32; 64];
            let mut now = 1u64;
            for _ in 0..16 {
                let outcome = app.poll(now, &input, &mut square, &mut exciter).unwrap();
                assert_eq!(outcome, PollOutcome::Delivered);
                now += 64 * 20_000;
            }
            assert_eq!(app.dropped_sets(), 0);
        });
    }
}
