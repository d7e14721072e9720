// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Error taxonomy for the bridge. Every failure surfaces to the caller as a
// coarse variant plus a human-readable message; nothing crosses the process
// boundary unhandled.

use std::path::PathBuf;

use thiserror::Error;

/// Unified error type for the supervision bridge.
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Shared memory or handshake event allocation failed.
    #[error("resource allocation failed: {0}")]
    Resource(#[source] std::io::Error),

    /// The worker binary does not exist.
    #[error("worker binary not found: {0}")]
    NotFound(PathBuf),

    /// Worker process creation failed.
    #[error("worker launch failed: {0}")]
    Launch(#[source] std::io::Error),

    /// The worker died or stayed silent before acknowledging readiness.
    #[error("worker did not acknowledge init")]
    InitTimeout,

    /// The worker exited while a request was in flight.
    #[error("worker process died during {0}")]
    WorkerCrashed(&'static str),

    /// A bounded wait elapsed with the worker still alive.
    #[error("timed out waiting for {0}")]
    Timeout(&'static str),

    /// The worker serviced the request but reported a failure.
    #[error("worker reported error code {code}")]
    Worker { code: i32 },

    /// Device query mode failed (non-zero exit or no parsable lines).
    #[error("device query failed: {0}")]
    DeviceQuery(String),

    /// The worker command line was malformed.
    #[error("invalid worker arguments: {0}")]
    InvalidArgs(String),

    /// Host and worker disagree on a shared record layout.
    #[error("shared layout mismatch for {field}: host {host}, worker {worker}")]
    LayoutMismatch {
        field: &'static str,
        host: usize,
        worker: usize,
    },

    /// A frame write would exceed the fixed slot capacity.
    #[error("frame of {len} bytes exceeds slot capacity {capacity}")]
    FrameTooLarge { len: usize, capacity: usize },

    /// Operation is not valid in the supervisor's current state.
    #[error("supervisor is in state {0:?}")]
    BadState(crate::supervisor::SupervisorState),
}
