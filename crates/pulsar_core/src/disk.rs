//! Disk Writer Thread
//!
//! Background consumer that drains the byte channel and appends it to
//! the output file. This is the only thread in the process allowed to
//! block: it polls the channel with a short sleep between empty reads
//! and issues blocking file writes.
//!
//! # Lifecycle
//!
//! Created (file open, thread not yet spawned) -> Running (drain loop)
//! -> Draining (flush flag observed) -> Stopped (joined, file closed).
//! The flush flag is the single point of coordination with the
//! orchestrator; a write error terminates the thread early and surfaces
//! from [`DiskWriter::flush_and_stop`], never as a process crash.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tracing::{debug, error, info};

use crate::channel::ByteConsumer;
use crate::error::{CoreError, CoreResult};

/// How much channel data one drain read can pull at once
const DRAIN_BUF_BYTES: usize = 4096 * 4;

/// Sleep between empty channel reads (bounded latency, not busy-spin)
const POLL_INTERVAL: Duration = Duration::from_millis(1);

/// Resources handed to the thread when it spawns
struct Worker {
    file: File,
    consumer: ByteConsumer,
}

/// Owns the background drain thread and its shutdown flag
pub struct DiskWriter {
    /// Set by the orchestrator to request flush-and-stop
    flush: Arc<AtomicBool>,
    /// Present only in the Created state
    worker: Option<Worker>,
    /// Present only while Running/Draining
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl DiskWriter {
    /// Open (create/truncate) the output file; the thread is not yet
    /// running.
    pub fn create(path: &Path, consumer: ByteConsumer) -> CoreResult<Self> {
        let file = File::create(path).map_err(|source| CoreError::FileOpen {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), "opened telemetry output file");

        Ok(Self {
            flush: Arc::new(AtomicBool::new(false)),
            worker: Some(Worker { file, consumer }),
            handle: None,
        })
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    /// Spawn the drain thread
    pub fn start(&mut self) -> CoreResult<()> {
        let worker = self.worker.take().ok_or(CoreError::AlreadyRunning)?;
        let flush = Arc::clone(&self.flush);

        let handle = thread::Builder::new()
            .name("pulsar-disk".into())
            .spawn(move || drain_loop(worker.file, worker.consumer, flush))?;

        self.handle = Some(handle);
        debug!("disk writer thread started");
        Ok(())
    }

    /// Request a flush, then block until the thread has drained every
    /// previously enqueued message and closed the file.
    ///
    /// A write error that killed the thread early is surfaced here; a
    /// panicked thread surfaces as [`CoreError::ThreadJoin`], after which
    /// the file state is best-effort closed.
    pub fn flush_and_stop(&mut self) -> CoreResult<()> {
        let handle = self.handle.take().ok_or(CoreError::NotRunning)?;
        self.flush.store(true, Ordering::Release);

        match handle.join() {
            Ok(result) => {
                result?;
                info!("disk writer drained and stopped");
                Ok(())
            }
            Err(_) => Err(CoreError::ThreadJoin),
        }
    }
}

fn drain_loop(
    mut file: File,
    mut consumer: ByteConsumer,
    flush: Arc<AtomicBool>,
) -> std::io::Result<()> {
    let mut buf = vec![0u8; DRAIN_BUF_BYTES];

    loop {
        // Load the flag before reading: whatever was enqueued before the
        // flush request is still drained after it.
        let flushing = flush.load(Ordering::Acquire);

        let n = consumer.read(&mut buf);
        if n == 0 {
            if flushing {
                break;
            }
            thread::sleep(POLL_INTERVAL);
            continue;
        }

        // write_all retries partial OS-level writes; once a chunk write
        // starts it completes before the flag is checked again.
        if let Err(err) = file.write_all(&buf[..n]) {
            error!(%err, "disk write failed, stopping writer thread");
            return Err(err);
        }
    }

    file.flush()?;
    Ok(())
    // file drops here, closing the descriptor
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel::byte_channel;

    fn temp_path(tag: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("pulsar_disk_{}_{}", tag, std::process::id()))
    }

    #[test]
    fn test_create_fails_on_bad_path() {
        let (_tx, rx) = byte_channel(64);
        let err = DiskWriter::create(Path::new("/nonexistent_dir/out"), rx);
        assert!(matches!(err, Err(CoreError::FileOpen { .. })));
    }

    #[test]
    fn test_stop_without_start_fails() {
        let (_tx, rx) = byte_channel(64);
        let path = temp_path("nostart");
        let mut writer = DiskWriter::create(&path, rx).unwrap();
        assert!(matches!(
            writer.flush_and_stop(),
            Err(CoreError::NotRunning)
        ));
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_drains_everything_in_order() {
        let (mut tx, rx) = byte_channel(4096);
        let path = temp_path("order");
        let mut writer = DiskWriter::create(&path, rx).unwrap();
        writer.start().unwrap();
        assert!(writer.is_running());

        let mut expected = Vec::new();
        for round in 0u8..32 {
            let msg = [round; 100];
            assert_eq!(tx.try_write(&msg), 100);
            expected.extend_from_slice(&msg);
        }

        writer.flush_and_stop().unwrap();
        assert!(!writer.is_running());

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, expected);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_flush_covers_bytes_enqueued_before_request() {
        let (mut tx, rx) = byte_channel(4096);
        let path = temp_path("flush");
        let mut writer = DiskWriter::create(&path, rx).unwrap();
        writer.start().unwrap();

        // Enqueue and immediately request the stop; the flag ordering
        // guarantees these bytes still land on disk.
        assert_eq!(tx.try_write(b"last words"), 10);
        writer.flush_and_stop().unwrap();

        let contents = std::fs::read(&path).unwrap();
        assert_eq!(contents, b"last words");
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_double_start_fails() {
        let (_tx, rx) = byte_channel(64);
        let path = temp_path("double");
        let mut writer = DiskWriter::create(&path, rx).unwrap();
        writer.start().unwrap();
        assert!(matches!(writer.start(), Err(CoreError::AlreadyRunning)));
        writer.flush_and_stop().unwrap();
        let _ = std::fs::remove_file(&path);
    }
}
