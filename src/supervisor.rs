// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Worker process supervision: allocation of the shared objects, launch with
// readiness acknowledgment, steady-state frame requests, and crash-safe
// teardown. One supervisor owns exactly one worker process at a time; every
// cross-process wait is a bounded polling loop, never an unbounded block, so
// a crashed worker can always be detected and reaped.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use crate::channel::SharedMemoryChannel;
use crate::error::BridgeError;
use crate::handshake::{Handshake, WaitOutcome};
use crate::message::{MessageKind, STATUS_OK};
use crate::params::{frame_buffer_size, SharedParams, LAYOUT_VERSION};
use crate::pump::{LogSink, StreamKind, StreamPump};
use crate::shm_name::{segment_name, SegmentPurpose};
use crate::worker_cli::WorkerArgs;

/// Timeouts and geometry for one supervised session.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// Maximum frame width; frame slot capacity is sized from this.
    pub max_width: usize,
    /// Maximum frame height.
    pub max_height: usize,
    /// Number of concurrently buffered input frame slots.
    pub frame_slots: u32,
    /// How long to wait for the worker's readiness acknowledgment.
    pub ack_timeout: Duration,
    /// How long to wait for one filtering pass.
    pub process_timeout: Duration,
    /// How long to wait for the abort acknowledgment during teardown.
    pub abort_timeout: Duration,
    /// How long to wait for natural process exit before force-terminating.
    pub exit_grace: Duration,
    /// Length of one bounded wait slice between liveness checks.
    pub poll_slice: Duration,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            max_width: 1920,
            max_height: 1080,
            frame_slots: 2,
            ack_timeout: Duration::from_secs(10),
            process_timeout: Duration::from_secs(30),
            abort_timeout: Duration::from_secs(3),
            exit_grace: Duration::from_secs(2),
            poll_slice: Duration::from_millis(50),
        }
    }
}

/// Lifecycle of a supervised session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorState {
    Uninitialized,
    ResourcesAllocated,
    Launching,
    Running,
    ShuttingDown,
    Terminated,
}

// Per-process sequence mixed into the session token so several supervisors
// in one host process cannot collide on shared object names.
static SESSION_SEQ: AtomicU32 = AtomicU32::new(0);

fn next_session() -> u32 {
    let pid = std::process::id();
    let seq = SESSION_SEQ.fetch_add(1, Ordering::Relaxed);
    ((pid & 0x00ff_ffff) << 8) | (seq & 0xff)
}

fn child_alive(child: &mut Child) -> bool {
    matches!(child.try_wait(), Ok(None))
}

/// Supervises one GPU filter worker process.
///
/// `launch` and `teardown` take `&mut self`, so they cannot be invoked
/// concurrently on the same instance. Dropping the supervisor tears the
/// session down.
pub struct ProcessSupervisor {
    config: SupervisorConfig,
    sink: Arc<dyn LogSink>,
    state: SupervisorState,
    session: u32,
    handshake: Option<Handshake>,
    frames: Vec<SharedMemoryChannel>,
    child: Option<Child>,
    pumps: Vec<StreamPump>,
}

impl ProcessSupervisor {
    pub fn new(config: SupervisorConfig, sink: Arc<dyn LogSink>) -> Self {
        Self {
            config,
            sink,
            state: SupervisorState::Uninitialized,
            session: next_session(),
            handshake: None,
            frames: Vec::new(),
            child: None,
            pumps: Vec::new(),
        }
    }

    pub fn state(&self) -> SupervisorState {
        self.state
    }

    /// The session token the worker receives as `--ppid`.
    pub fn session(&self) -> u32 {
        self.session
    }

    /// Capacity of one frame slot, in bytes.
    pub fn frame_capacity(&self) -> usize {
        frame_buffer_size(self.config.max_width, self.config.max_height)
    }

    /// Create the handshake events, the message/params records, and all
    /// frame buffers. Any partially created object is released before the
    /// error returns (drop unlinks segments whose last handle closes).
    pub fn allocate(&mut self) -> Result<(), BridgeError> {
        if self.state != SupervisorState::Uninitialized {
            return Err(BridgeError::BadState(self.state));
        }

        let handshake = Handshake::host_allocate(self.session).map_err(BridgeError::Resource)?;

        let capacity = self.frame_capacity();
        let mut frames = Vec::with_capacity(self.config.frame_slots as usize);
        for n in 0..self.config.frame_slots {
            let name = segment_name(self.session, SegmentPurpose::Frame(n));
            let ch = SharedMemoryChannel::create(&name, capacity).map_err(BridgeError::Resource)?;
            frames.push(ch);
        }

        debug!(
            session = self.session,
            slots = self.config.frame_slots,
            capacity,
            "shared resources allocated"
        );
        self.handshake = Some(handshake);
        self.frames = frames;
        self.state = SupervisorState::ResourcesAllocated;
        Ok(())
    }

    /// Spawn the worker, start both stream pumps, and wait for the worker's
    /// readiness acknowledgment. Only after the acknowledgment does the
    /// state advance to `Running`; every failure path releases all owned
    /// resources before returning.
    pub fn launch(&mut self, executable: &Path) -> Result<(), BridgeError> {
        if self.state != SupervisorState::ResourcesAllocated {
            return Err(BridgeError::BadState(self.state));
        }
        if !executable.is_file() {
            self.teardown();
            return Err(BridgeError::NotFound(executable.to_path_buf()));
        }
        self.state = SupervisorState::Launching;

        let args = WorkerArgs::for_session(self.session, self.config.max_width, self.config.max_height);
        let spawned = Command::new(executable)
            .args(args.to_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(c) => c,
            Err(e) => {
                self.teardown();
                return Err(BridgeError::Launch(e));
            }
        };
        info!(session = self.session, pid = child.id(), "worker spawned");

        if let Some(out) = child.stdout.take() {
            self.pumps
                .push(StreamPump::spawn(StreamKind::Stdout, out, Arc::clone(&self.sink)));
        }
        if let Some(err) = child.stderr.take() {
            self.pumps
                .push(StreamPump::spawn(StreamKind::Stderr, err, Arc::clone(&self.sink)));
        }

        // First contact: the worker reports readiness via EndSignal.
        let ack_timeout = self.config.ack_timeout;
        let poll_slice = self.config.poll_slice;
        let ack = match self.handshake.as_mut() {
            Some(hs) => match hs.post_request(MessageKind::Init) {
                Ok(()) => hs
                    .wait_end(ack_timeout, poll_slice, || child_alive(&mut child))
                    .map_err(BridgeError::Resource),
                Err(e) => Err(BridgeError::Resource(e)),
            },
            None => Err(BridgeError::BadState(SupervisorState::Launching)),
        };

        match ack {
            Ok(WaitOutcome::Signalled) => {
                debug!(session = self.session, "worker acknowledged init");
                self.child = Some(child);
                self.state = SupervisorState::Running;
                Ok(())
            }
            Ok(WaitOutcome::TimedOut) | Ok(WaitOutcome::PeerDead) => {
                warn!(session = self.session, "worker never acknowledged init");
                self.child = Some(child);
                self.teardown();
                Err(BridgeError::InitTimeout)
            }
            Err(e) => {
                self.child = Some(child);
                self.teardown();
                Err(e)
            }
        }
    }

    /// Run one filtering pass: copy the frame into `slot`, publish the
    /// params, and hand the turn to the worker. The worker filters in place;
    /// read the result back with [`read_frame`](Self::read_frame).
    pub fn process_frame(
        &mut self,
        params: &mut SharedParams,
        frame: &[u8],
        slot: u32,
    ) -> Result<(), BridgeError> {
        if self.state != SupervisorState::Running {
            return Err(BridgeError::BadState(self.state));
        }
        let slot_ch = self
            .frames
            .get(slot as usize)
            .ok_or_else(|| BridgeError::InvalidArgs(format!("no frame slot {slot}")))?;
        let capacity = slot_ch.user_size();
        if frame.len() > capacity {
            return Err(BridgeError::FrameTooLarge {
                len: frame.len(),
                capacity,
            });
        }
        slot_ch.copy_in(frame).map_err(BridgeError::Resource)?;

        params.layout_version = LAYOUT_VERSION;
        params.frame_slot = slot;

        let process_timeout = self.config.process_timeout;
        let poll_slice = self.config.poll_slice;
        let (hs, child) = match (self.handshake.as_mut(), self.child.as_mut()) {
            (Some(hs), Some(child)) => (hs, child),
            _ => return Err(BridgeError::BadState(SupervisorState::Running)),
        };

        hs.write_params(params);
        hs.post_request(MessageKind::ProcessFrame)
            .map_err(BridgeError::Resource)?;

        let outcome = hs
            .wait_end(process_timeout, poll_slice, || child_alive(child))
            .map_err(BridgeError::Resource)?;
        match outcome {
            WaitOutcome::Signalled => {
                let m = hs.read_message();
                if m.status == STATUS_OK {
                    Ok(())
                } else {
                    Err(BridgeError::Worker { code: m.error_code })
                }
            }
            WaitOutcome::TimedOut => Err(BridgeError::Timeout("frame processing")),
            WaitOutcome::PeerDead => Err(BridgeError::WorkerCrashed("frame processing")),
        }
    }

    /// Copy the (filtered-in-place) contents of frame `slot` into `out`.
    pub fn read_frame(&self, slot: u32, out: &mut [u8]) -> Result<(), BridgeError> {
        let slot_ch = self
            .frames
            .get(slot as usize)
            .ok_or_else(|| BridgeError::InvalidArgs(format!("no frame slot {slot}")))?;
        slot_ch.copy_out(out).map_err(BridgeError::Resource)
    }

    /// Shut the session down. Idempotent and safe to call from any state,
    /// including partial-failure states: every exit path joins both pumps
    /// and releases every channel and event this supervisor owns.
    pub fn teardown(&mut self) {
        if self.state == SupervisorState::Terminated {
            return;
        }
        let prev = self.state;
        self.state = SupervisorState::ShuttingDown;
        debug!(session = self.session, ?prev, "tearing down");

        // Graceful phase: ask a running worker to shut itself down, but only
        // wait a bounded time and keep checking liveness.
        if prev == SupervisorState::Running {
            let session = self.session;
            let abort_timeout = self.config.abort_timeout;
            let poll_slice = self.config.poll_slice;
            if let (Some(hs), Some(ch)) = (self.handshake.as_mut(), self.child.as_mut()) {
                match hs.post_request(MessageKind::Abort) {
                    Ok(()) => {
                        match hs.wait_end(abort_timeout, poll_slice, || child_alive(ch)) {
                            Ok(WaitOutcome::Signalled) => {
                                debug!(session, "abort acknowledged")
                            }
                            Ok(WaitOutcome::TimedOut) => {
                                warn!(session, "worker ignored abort request")
                            }
                            Ok(WaitOutcome::PeerDead) => {
                                debug!(session, "worker exited before abort ack")
                            }
                            Err(e) => warn!(session, "abort wait failed: {e}"),
                        }
                    }
                    Err(e) => warn!(session, "abort request failed: {e}"),
                }
            }
        }

        // Exit phase: bounded grace period for natural exit, then force.
        if let Some(child) = self.child.as_mut() {
            let status = wait_exit_bounded(child, self.config.exit_grace, self.config.poll_slice);
            let status = match status {
                Some(s) => Some(s),
                None => {
                    warn!(session = self.session, "force-terminating worker");
                    let _ = child.kill();
                    child.wait().ok()
                }
            };
            match status {
                Some(s) if s.success() => info!(session = self.session, "worker exited cleanly"),
                Some(s) => warn!(session = self.session, "worker exited with {s}"),
                None => warn!(session = self.session, "worker exit status unavailable"),
            }
        }
        self.child = None;

        // The worker is gone, so both pipes are at EOF and the pumps finish
        // their final drain.
        for pump in self.pumps.iter_mut() {
            pump.join();
        }
        self.pumps.clear();

        // Release every owned shared object.
        self.handshake = None;
        self.frames.clear();
        for n in 0..self.config.frame_slots {
            SharedMemoryChannel::clear_storage(&segment_name(
                self.session,
                SegmentPurpose::Frame(n),
            ));
        }
        Handshake::clear_storage(self.session);

        self.state = SupervisorState::Terminated;
        debug!(session = self.session, "teardown complete");
    }
}

impl Drop for ProcessSupervisor {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Poll `try_wait` until the child exits or the grace period elapses.
fn wait_exit_bounded(child: &mut Child, grace: Duration, slice: Duration) -> Option<ExitStatus> {
    let deadline = Instant::now() + grace;
    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Some(status),
            Ok(None) => {
                if Instant::now() >= deadline {
                    return None;
                }
                std::thread::sleep(slice);
            }
            Err(e) => {
                warn!("try_wait failed: {e}");
                return None;
            }
        }
    }
}
