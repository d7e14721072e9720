// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Background drains of the worker's diagnostic output streams.
// One pump thread per stream; each forwards every non-empty chunk to the
// log sink as soon as it arrives and exits after the EOF drain. Ordering is
// preserved within a stream; none is guaranteed across the two streams.

use std::io::Read;
use std::sync::Arc;
use std::thread::JoinHandle;

use tracing::{info, warn};

/// Which worker stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Append-only sink for worker diagnostic output.
///
/// Both pump threads write concurrently; implementations must tolerate
/// interleaved calls and must not stall the read loop for an unbounded time.
pub trait LogSink: Send + Sync {
    fn write(&self, stream: StreamKind, chunk: &[u8]);
}

/// Default sink: forwards worker output line-wise to `tracing`.
/// Stdout chunks log at info level, stderr chunks at warn level.
#[derive(Debug, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write(&self, stream: StreamKind, chunk: &[u8]) {
        let text = String::from_utf8_lossy(chunk);
        for line in text.lines() {
            if line.is_empty() {
                continue;
            }
            match stream {
                StreamKind::Stdout => info!(target: "filterbridge::worker", "{line}"),
                StreamKind::Stderr => warn!(target: "filterbridge::worker", "{line}"),
            }
        }
    }
}

/// A background drain of one worker output stream.
pub struct StreamPump {
    handle: Option<JoinHandle<()>>,
}

impl StreamPump {
    /// Start pumping `reader` into `sink` on a dedicated thread.
    ///
    /// The thread reads whatever bytes are available, forwards each chunk
    /// immediately, and exits once the stream reports end-of-file. Reads
    /// block only this thread — the worker sees ordinary pipe buffering.
    pub fn spawn<R>(kind: StreamKind, mut reader: R, sink: Arc<dyn LogSink>) -> Self
    where
        R: Read + Send + 'static,
    {
        let handle = std::thread::spawn(move || {
            let mut buf = [0u8; 4096];
            loop {
                match reader.read(&mut buf) {
                    Ok(0) => break, // EOF — nothing left to drain
                    Ok(n) => sink.write(kind, &buf[..n]),
                    Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                    Err(_) => break, // pipe closed mid-read
                }
            }
        });
        Self {
            handle: Some(handle),
        }
    }

    /// Wait for the pump thread to finish (the stream must have reached EOF,
    /// i.e. the worker exited or closed the pipe).
    pub fn join(&mut self) {
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

impl Drop for StreamPump {
    fn drop(&mut self) {
        self.join();
    }
}
