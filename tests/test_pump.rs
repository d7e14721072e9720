// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Stream pump tests against in-memory readers: chunk forwarding, in-stream
// ordering, EOF drain, and tolerance of interrupted reads.

use std::io::{self, Read};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use filterbridge::{LogSink, StreamKind, StreamPump};

/// Records every chunk in arrival order.
#[derive(Default)]
struct RecordingSink {
    chunks: Mutex<Vec<(StreamKind, Vec<u8>)>>,
}

impl RecordingSink {
    fn bytes_for(&self, kind: StreamKind) -> Vec<u8> {
        self.chunks
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k == kind)
            .flat_map(|(_, c)| c.iter().copied())
            .collect()
    }
}

impl LogSink for RecordingSink {
    fn write(&self, stream: StreamKind, chunk: &[u8]) {
        self.chunks.lock().unwrap().push((stream, chunk.to_vec()));
    }
}

/// Feeds scripted read results: data pieces, optional interruptions, then EOF.
struct ScriptedReader {
    script: Vec<Result<Vec<u8>, io::ErrorKind>>,
}

impl Read for ScriptedReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.script.is_empty() {
            return Ok(0);
        }
        match self.script.remove(0) {
            Ok(piece) => {
                let n = piece.len().min(buf.len());
                buf[..n].copy_from_slice(&piece[..n]);
                Ok(n)
            }
            Err(kind) => Err(io::Error::from(kind)),
        }
    }
}

#[test]
fn forwards_every_chunk_in_order() {
    let sink = Arc::new(RecordingSink::default());
    let reader = ScriptedReader {
        script: vec![
            Ok(b"first ".to_vec()),
            Ok(b"second ".to_vec()),
            Ok(b"third".to_vec()),
        ],
    };

    let mut pump =
        StreamPump::spawn(StreamKind::Stdout, reader, Arc::clone(&sink) as Arc<dyn LogSink>);
    pump.join();

    assert_eq!(sink.bytes_for(StreamKind::Stdout), b"first second third");
}

#[test]
fn drains_to_eof_before_exiting() {
    let sink = Arc::new(RecordingSink::default());
    let pieces: Vec<Result<Vec<u8>, io::ErrorKind>> =
        (0..100).map(|i| Ok(vec![i as u8; 37])).collect();
    let reader = ScriptedReader { script: pieces };

    let mut pump =
        StreamPump::spawn(StreamKind::Stderr, reader, Arc::clone(&sink) as Arc<dyn LogSink>);
    pump.join();

    let bytes = sink.bytes_for(StreamKind::Stderr);
    assert_eq!(bytes.len(), 100 * 37);
    // Chunks must arrive in read order.
    for (i, chunk) in bytes.chunks(37).enumerate() {
        assert!(chunk.iter().all(|&b| b == i as u8));
    }
}

#[test]
fn interrupted_reads_are_retried() {
    let sink = Arc::new(RecordingSink::default());
    let reader = ScriptedReader {
        script: vec![
            Ok(b"before".to_vec()),
            Err(io::ErrorKind::Interrupted),
            Ok(b" after".to_vec()),
        ],
    };

    let mut pump =
        StreamPump::spawn(StreamKind::Stdout, reader, Arc::clone(&sink) as Arc<dyn LogSink>);
    pump.join();

    assert_eq!(sink.bytes_for(StreamKind::Stdout), b"before after");
}

#[test]
fn broken_pipe_stops_the_pump() {
    let sink = Arc::new(RecordingSink::default());
    let reader = ScriptedReader {
        script: vec![
            Ok(b"partial".to_vec()),
            Err(io::ErrorKind::BrokenPipe),
            Ok(b"never seen".to_vec()),
        ],
    };

    let mut pump =
        StreamPump::spawn(StreamKind::Stdout, reader, Arc::clone(&sink) as Arc<dyn LogSink>);
    pump.join();

    assert_eq!(sink.bytes_for(StreamKind::Stdout), b"partial");
}

#[test]
fn chunks_appear_as_soon_as_read() {
    // A reader that blocks after its first piece; the chunk must reach the
    // sink while the pump is still running, not only at join time.
    struct BlockThenEof {
        sent: bool,
        release: Arc<Mutex<bool>>,
    }
    impl Read for BlockThenEof {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.sent {
                self.sent = true;
                buf[..5].copy_from_slice(b"early");
                return Ok(5);
            }
            loop {
                if *self.release.lock().unwrap() {
                    return Ok(0);
                }
                std::thread::sleep(Duration::from_millis(5));
            }
        }
    }

    let sink = Arc::new(RecordingSink::default());
    let release = Arc::new(Mutex::new(false));
    let reader = BlockThenEof {
        sent: false,
        release: Arc::clone(&release),
    };
    let mut pump =
        StreamPump::spawn(StreamKind::Stdout, reader, Arc::clone(&sink) as Arc<dyn LogSink>);

    // Wait (bounded) for the first chunk to arrive while the stream is open.
    let mut seen = false;
    for _ in 0..200 {
        if sink.bytes_for(StreamKind::Stdout) == b"early" {
            seen = true;
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert!(seen, "chunk not forwarded before EOF");

    *release.lock().unwrap() = true;
    pump.join();
}
