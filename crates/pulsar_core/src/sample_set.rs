//! Sample Set Codec
//!
//! One callback's worth of output, serialized as a single self-describing
//! record. The persisted file is a raw concatenation of these with no
//! separators; a reader re-derives each record's length from the two
//! leading counts.
//!
//! Layout (little-endian):
//!
//! ```text
//! u64 n_samples | u64 n_fft_bins |
//! n_samples f32 square | n_samples f32 pulse | n_samples f32 input |
//! n_fft_bins f32 magnitudes   (absent entirely when n_fft_bins == 0)
//! ```

use crate::error::{CoreError, CoreResult};

/// Hard ceiling on one encoded record
///
/// Policy constant, kept in step with the channel sizing defaults; the
/// oversize check in [`SampleSetWriter::new`] and the tests depend on
/// this exact value.
pub const MAX_SAMPLE_SET_BYTES: usize = 4096;

/// Two u64 counts
pub const HEADER_BYTES: usize = 16;

const F32_BYTES: usize = std::mem::size_of::<f32>();

/// Encoded size of a record, a pure function of the two counts
///
/// Saturates instead of overflowing so a corrupt header decodes to a
/// clean truncation error rather than a panic.
pub fn required_bytes(n_samples: usize, n_fft_bins: usize) -> usize {
    HEADER_BYTES
        .saturating_add(n_samples.saturating_mul(3 * F32_BYTES))
        .saturating_add(n_fft_bins.saturating_mul(F32_BYTES))
}

/// Encodes one record into caller-provided scratch
///
/// Creation writes the header; the four sections are then filled through
/// the `put_*` methods at offsets derived purely from the counts. No
/// allocation happens anywhere in this type - it is driven from the
/// realtime callback.
pub struct SampleSetWriter<'a> {
    buf: &'a mut [u8],
    n_samples: usize,
    n_fft_bins: usize,
}

impl<'a> SampleSetWriter<'a> {
    pub fn new(
        scratch: &'a mut [u8],
        n_samples: usize,
        n_fft_bins: usize,
    ) -> CoreResult<Self> {
        let needed = required_bytes(n_samples, n_fft_bins);
        if needed > MAX_SAMPLE_SET_BYTES {
            return Err(CoreError::SampleSetTooLarge {
                needed,
                max: MAX_SAMPLE_SET_BYTES,
            });
        }
        if scratch.len() < needed {
            return Err(CoreError::TruncatedRecord {
                have: scratch.len(),
                need: needed,
            });
        }

        let buf = &mut scratch[..needed];
        buf[..8].copy_from_slice(&(n_samples as u64).to_le_bytes());
        buf[8..16].copy_from_slice(&(n_fft_bins as u64).to_le_bytes());

        Ok(Self {
            buf,
            n_samples,
            n_fft_bins,
        })
    }

    /// Encoded record length in bytes
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// The finished record, ready for a channel write
    pub fn as_bytes(&self) -> &[u8] {
        self.buf
    }

    pub fn put_square(&mut self, samples: &[f32]) {
        self.put_section(0, samples);
    }

    pub fn put_pulse(&mut self, samples: &[f32]) {
        self.put_section(1, samples);
    }

    pub fn put_input(&mut self, samples: &[f32]) {
        self.put_section(2, samples);
    }

    pub fn put_fft_bins(&mut self, bins: &[f32]) {
        debug_assert_eq!(bins.len(), self.n_fft_bins);
        let start = HEADER_BYTES + 3 * self.n_samples * F32_BYTES;
        write_floats(&mut self.buf[start..], bins);
    }

    fn put_section(&mut self, section: usize, samples: &[f32]) {
        debug_assert_eq!(samples.len(), self.n_samples);
        let start = HEADER_BYTES + section * self.n_samples * F32_BYTES;
        write_floats(&mut self.buf[start..], samples);
    }
}

fn write_floats(region: &mut [u8], values: &[f32]) {
    for (slot, value) in region.chunks_exact_mut(F32_BYTES).zip(values) {
        slot.copy_from_slice(&value.to_le_bytes());
    }
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut raw = [0u8; 8];
    raw.copy_from_slice(bytes);
    u64::from_le_bytes(raw)
}

fn read_floats(region: &[u8], count: usize) -> Vec<f32> {
    region[..count * F32_BYTES]
        .chunks_exact(F32_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// One decoded record (consumer side; allocates freely)
#[derive(Debug, Clone, PartialEq)]
pub struct SampleSet {
    pub square: Vec<f32>,
    pub pulse: Vec<f32>,
    pub input: Vec<f32>,
    pub fft_bins: Vec<f32>,
}

impl SampleSet {
    /// Decode one record from the front of `bytes`
    ///
    /// Returns the record and the number of bytes it occupied.
    pub fn decode(bytes: &[u8]) -> CoreResult<(Self, usize)> {
        if bytes.len() < HEADER_BYTES {
            return Err(CoreError::TruncatedRecord {
                have: bytes.len(),
                need: HEADER_BYTES,
            });
        }
        let n_samples = read_u64(&bytes[..8]) as usize;
        let n_fft_bins = read_u64(&bytes[8..16]) as usize;

        let needed = required_bytes(n_samples, n_fft_bins);
        if bytes.len() < needed {
            return Err(CoreError::TruncatedRecord {
                have: bytes.len(),
                need: needed,
            });
        }

        let section = n_samples * F32_BYTES;
        let body = &bytes[HEADER_BYTES..];
        Ok((
            Self {
                square: read_floats(&body[..], n_samples),
                pulse: read_floats(&body[section..], n_samples),
                input: read_floats(&body[2 * section..], n_samples),
                fft_bins: read_floats(&body[3 * section..], n_fft_bins),
            },
            needed,
        ))
    }
}

/// Iterates the records packed into a byte slice (e.g. a whole data file)
pub struct RecordReader<'a> {
    bytes: &'a [u8],
}

impl<'a> RecordReader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes }
    }
}

impl Iterator for RecordReader<'_> {
    type Item = CoreResult<SampleSet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.bytes.is_empty() {
            return None;
        }
        match SampleSet::decode(self.bytes) {
            Ok((record, consumed)) => {
                self.bytes = &self.bytes[consumed..];
                Some(Ok(record))
            }
            Err(err) => {
                // Stop after a malformed tail rather than spinning
                self.bytes = &[];
                Some(Err(err))
            }
        }
    }
}
