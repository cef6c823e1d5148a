//! Realtime-to-Disk Byte Channel
//!
//! A bounded SPSC byte queue over `rtrb`, bridging the realtime producer
//! and the disk-writer consumer. The channel performs no framing of its
//! own: the producer writes exactly one complete self-describing sample
//! set per call, and the consumer re-derives record boundaries from the
//! embedded header counts.
//!
//! # Contract
//!
//! - `try_write` is non-blocking and all-or-nothing: either the whole
//!   message is enqueued or the queue is left untouched. A short return
//!   means "message dropped"; callers never retry the same message.
//! - `read` is non-blocking and returns 0 when empty.
//! - Bytes come out in exactly the order they went in.

use rtrb::{Consumer, Producer, RingBuffer};

/// Create a bounded byte channel of `capacity` bytes
pub fn byte_channel(capacity: usize) -> (ByteProducer, ByteConsumer) {
    let (producer, consumer) = RingBuffer::<u8>::new(capacity);
    (
        ByteProducer { inner: producer },
        ByteConsumer { inner: consumer },
    )
}

/// Realtime side of the channel
pub struct ByteProducer {
    inner: Producer<u8>,
}

impl ByteProducer {
    /// Attempt to enqueue the whole message
    ///
    /// Returns `message.len()` on success or 0 when there is not enough
    /// free space, in which case nothing was enqueued.
    ///
    /// # Real-time Safety
    /// No allocations, no locks; a single memcpy into the ring.
    pub fn try_write(&mut self, message: &[u8]) -> usize {
        match self.inner.write_chunk_uninit(message.len()) {
            Ok(chunk) => chunk.fill_from_iter(message.iter().copied()),
            Err(_) => 0,
        }
    }

    /// Free space currently available to the producer
    pub fn slots(&self) -> usize {
        self.inner.slots()
    }
}

/// Disk-thread side of the channel
pub struct ByteConsumer {
    inner: Consumer<u8>,
}

impl ByteConsumer {
    /// Drain up to `buf.len()` bytes; returns 0 when the queue is empty
    pub fn read(&mut self, buf: &mut [u8]) -> usize {
        let n = self.inner.slots().min(buf.len());
        if n == 0 {
            return 0;
        }

        // slots() already observed n available bytes, so the chunk read
        // cannot come up short.
        match self.inner.read_chunk(n) {
            Ok(chunk) => {
                let (first, second) = chunk.as_slices();
                buf[..first.len()].copy_from_slice(first);
                buf[first.len()..n].copy_from_slice(second);
                chunk.commit_all();
                n
            }
            Err(_) => 0,
        }
    }
}
