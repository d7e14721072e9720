// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The turn-taking handshake between host and worker.
//
// Two auto-reset events hand the active turn back and forth: the host writes
// a SharedMessage (and, for frame requests, SharedParams) and raises
// StartSignal; the worker services the request and raises EndSignal. The
// protocol — not a lock — is what keeps the two processes from mutating the
// shared records simultaneously: the host never posts a new request before
// observing the previous EndSignal, and the worker never acts before
// observing StartSignal.

use std::io;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::channel::SharedMemoryChannel;
use crate::event::HandshakeEvent;
use crate::message::{MessageKind, SharedMessage};
use crate::params::SharedParams;
use crate::shm_name::{event_name, segment_name, EventKind, SegmentPurpose};
use crate::worker_cli::WorkerArgs;

/// Result of a bounded wait on the peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitOutcome {
    /// The peer raised its signal.
    Signalled,
    /// The deadline passed with the peer still alive.
    TimedOut,
    /// The peer died without raising its signal.
    PeerDead,
}

/// The signal pair plus the message/params contract for one session.
pub struct Handshake {
    start: HandshakeEvent,
    end: HandshakeEvent,
    message: SharedMemoryChannel,
    params: SharedMemoryChannel,
    session: u32,
}

impl Handshake {
    /// Host side: create both events and both records for a new session.
    /// Creation order — events first, then channels — matches the teardown
    /// order in reverse; any partially created object is released by drop
    /// when an error propagates out.
    pub fn host_allocate(session: u32) -> io::Result<Self> {
        let start = HandshakeEvent::create(&event_name(session, EventKind::Start))?;
        let end = HandshakeEvent::create(&event_name(session, EventKind::End))?;
        let message = SharedMemoryChannel::create(
            &segment_name(session, SegmentPurpose::Message),
            std::mem::size_of::<SharedMessage>(),
        )?;
        let params = SharedMemoryChannel::create(
            &segment_name(session, SegmentPurpose::Params),
            std::mem::size_of::<SharedParams>(),
        )?;
        Ok(Self {
            start,
            end,
            message,
            params,
            session,
        })
    }

    /// Worker side: open the objects the host created, by their derived
    /// names. The record sizes come from the command line and must already
    /// have passed [`WorkerArgs::verify_layout`].
    pub fn worker_open(args: &WorkerArgs) -> io::Result<Self> {
        let start = HandshakeEvent::open(&args.event_mes_start)?;
        let end = HandshakeEvent::open(&args.event_mes_end)?;
        let message = SharedMemoryChannel::open(
            &segment_name(args.session, SegmentPurpose::Message),
            args.size_shared_mesdata,
        )?;
        let params = SharedMemoryChannel::open(
            &segment_name(args.session, SegmentPurpose::Params),
            args.size_shared_prm,
        )?;
        Ok(Self {
            start,
            end,
            message,
            params,
            session: args.session,
        })
    }

    pub fn session(&self) -> u32 {
        self.session
    }

    // --- host side ---

    /// Write a fresh request record and hand the turn to the worker.
    ///
    /// Takes `&mut self`: the host must have observed the previous EndSignal
    /// (via [`wait_end`](Self::wait_end)) before issuing the next request.
    pub fn post_request(&mut self, kind: MessageKind) -> io::Result<()> {
        trace!(?kind, session = self.session, "posting request");
        SharedMessage::request(kind).store(&self.message);
        self.start.raise()
    }

    /// Publish the filter configuration for the next frame request.
    pub fn write_params(&mut self, p: &SharedParams) {
        p.store(&self.params);
    }

    /// Current contents of the message record (status/error after a round).
    pub fn read_message(&self) -> SharedMessage {
        SharedMessage::load(&self.message)
    }

    /// Block on EndSignal using bounded repeated waits interleaved with
    /// liveness checks, so a crashed worker cannot hang the host.
    ///
    /// `alive` is polled between wait slices. When it reports the peer dead,
    /// one final short wait consumes a signal the worker may have raised on
    /// its way out.
    pub fn wait_end<F>(
        &self,
        total: Duration,
        slice: Duration,
        mut alive: F,
    ) -> io::Result<WaitOutcome>
    where
        F: FnMut() -> bool,
    {
        let deadline = Instant::now() + total;
        loop {
            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::TimedOut);
            }
            let step = slice.min(deadline - now);
            if self.end.wait(step)? {
                return Ok(WaitOutcome::Signalled);
            }
            if !alive() {
                // The worker may have signalled just before exiting.
                if self.end.wait(slice)? {
                    return Ok(WaitOutcome::Signalled);
                }
                return Ok(WaitOutcome::PeerDead);
            }
        }
    }

    // --- worker side ---

    /// Wait for the host to hand over the turn.
    pub fn wait_start(&self, timeout: Duration) -> io::Result<bool> {
        self.start.wait(timeout)
    }

    /// Read the filter configuration published by the host.
    pub fn read_params(&self) -> SharedParams {
        SharedParams::load(&self.params)
    }

    /// Write the round's outcome into the message record and hand the turn
    /// back to the host.
    pub fn finish(&self, status: u32, error_code: i32) -> io::Result<()> {
        let mut m = SharedMessage::load(&self.message);
        m.status = status;
        m.error_code = error_code;
        m.store(&self.message);
        self.end.raise()
    }

    /// Remove the kernel objects backing a session's handshake.
    /// Safe to call with no handles open; used by crash-safe teardown.
    pub fn clear_storage(session: u32) {
        HandshakeEvent::clear_storage(&event_name(session, EventKind::Start));
        HandshakeEvent::clear_storage(&event_name(session, EventKind::End));
        SharedMemoryChannel::clear_storage(&segment_name(session, SegmentPurpose::Message));
        SharedMemoryChannel::clear_storage(&segment_name(session, SegmentPurpose::Params));
    }
}
