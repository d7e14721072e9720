// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform handshake event.
// Delegates to platform::PlatformEvent (POSIX or Windows).

use std::io;
use std::time::Duration;

use crate::platform::PlatformEvent;

/// A named, one-shot, auto-resetting cross-process gate.
///
/// Each [`raise`](HandshakeEvent::raise) wakes exactly one
/// [`wait`](HandshakeEvent::wait); the signal is consumed by the wake, not
/// latched as a persistent flag. The handshake protocol's turn-taking
/// guarantees at most one signal is outstanding per event at any time.
pub struct HandshakeEvent {
    inner: PlatformEvent,
}

impl HandshakeEvent {
    /// Create a fresh event (initial state: not signalled).
    pub fn create(name: &str) -> io::Result<Self> {
        Ok(Self {
            inner: PlatformEvent::create(name)?,
        })
    }

    /// Open an event created by the peer process.
    pub fn open(name: &str) -> io::Result<Self> {
        Ok(Self {
            inner: PlatformEvent::open(name)?,
        })
    }

    /// Signal the event.
    pub fn raise(&self) -> io::Result<()> {
        self.inner.raise()
    }

    /// Wait for the event, consuming the signal on success.
    /// Returns `Ok(true)` if signalled within `timeout`, `Ok(false)` on timeout.
    pub fn wait(&self, timeout: Duration) -> io::Result<bool> {
        self.inner.wait(timeout)
    }

    /// The name the event was opened with.
    pub fn name(&self) -> &str {
        self.inner.name()
    }

    /// Remove the backing storage for a named event.
    pub fn clear_storage(name: &str) {
        PlatformEvent::unlink_by_name(name);
    }
}
