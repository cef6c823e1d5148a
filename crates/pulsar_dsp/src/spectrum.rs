//! Spectral Accumulator
//!
//! Collects one sample per call into a fixed-size analysis window and
//! runs a forward FFT each time the window fills. The FFT plan and all
//! working buffers are allocated once at creation; `feed` itself never
//! allocates.
//!
//! No taper is applied to the window - analysis is rectangular. That
//! trades spectral leakage for simplicity, and downstream consumers of
//! the persisted magnitude bins depend on the untapered values, so the
//! rectangular window is a compatibility requirement.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::DspError;

/// Fixed-window spectral analyzer producing magnitude bins
pub struct SpectralAccumulator {
    /// Analysis window, filled one sample at a time
    window: Vec<f32>,
    /// Next write position; wraps to 0 when the window fills
    write_index: usize,
    /// Forward FFT plan, computed once for this window size
    fft: Arc<dyn Fft<f32>>,
    /// In-place FFT work buffer
    work: Vec<Complex<f32>>,
    /// Plan-owned scratch space
    scratch: Vec<Complex<f32>>,
    /// Magnitudes of the positive-frequency bins from the last transform
    magnitudes: Vec<f32>,
}

impl SpectralAccumulator {
    /// Plan a transform for a window of `window_size` samples
    pub fn new(window_size: usize) -> Result<Self, DspError> {
        if window_size < 2 {
            return Err(DspError::InvalidWindowSize(window_size));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(window_size);
        let scratch_len = fft.get_inplace_scratch_len();

        Ok(Self {
            window: vec![0.0; window_size],
            write_index: 0,
            fft,
            work: vec![Complex::new(0.0, 0.0); window_size],
            scratch: vec![Complex::new(0.0, 0.0); scratch_len],
            magnitudes: vec![0.0; window_size / 2 + 1],
        })
    }

    /// Number of magnitude bins a full transform produces
    ///
    /// The input is real, so only the positive half of the spectrum
    /// carries information: window/2 + 1 bins including DC and Nyquist.
    pub fn bin_count(&self) -> usize {
        self.magnitudes.len()
    }

    pub fn window_size(&self) -> usize {
        self.window.len()
    }

    /// Append one sample; returns true when this call filled the window
    /// and executed a transform.
    ///
    /// Feeding fewer than a full window's worth of samples never fires a
    /// transform, no matter how many calls it is spread across.
    pub fn feed(&mut self, sample: f32) -> bool {
        self.window[self.write_index] = sample;
        self.write_index += 1;
        if self.write_index < self.window.len() {
            return false;
        }

        self.write_index = 0;
        self.execute();
        true
    }

    /// Magnitude bins from the most recent transform
    pub fn magnitudes(&self) -> &[f32] {
        &self.magnitudes
    }

    fn execute(&mut self) {
        for (slot, &sample) in self.work.iter_mut().zip(self.window.iter()) {
            *slot = Complex::new(sample, 0.0);
        }
        self.fft.process_with_scratch(&mut self.work, &mut self.scratch);

        for (mag, bin) in self.magnitudes.iter_mut().zip(self.work.iter()) {
            *mag = bin.norm();
        }
    }
}
