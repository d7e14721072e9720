// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-process coordination layer for GPU-offloaded video filtering.
// The host allocates named shared memory and handshake events, launches the
// worker, and drives a turn-taking request protocol; the worker maps the
// same objects by names derived from the session token on its command line.

pub mod shm_name;

mod platform;

mod channel;
pub use channel::{ChannelMode, SharedMemoryChannel};

mod event;
pub use event::HandshakeEvent;

mod message;
pub use message::{MessageKind, SharedMessage, STATUS_ERROR, STATUS_IDLE, STATUS_OK};

mod params;
pub use params::{
    frame_buffer_size, pitch_bytes, PixelYc, SharedParams, StageSlot, FRAME_ALIGN, LAYOUT_VERSION,
    MAX_STAGES,
};

mod handshake;
pub use handshake::{Handshake, WaitOutcome};

mod chain;
pub use chain::{
    fill_params, resolve_chain, FilterConfig, ResizeAlgo, StageSettings, StageTag, CATALOG_ORDER,
};

mod pump;
pub use pump::{LogSink, StreamKind, StreamPump, TracingSink};

mod devices;
pub use devices::{enumerate_devices, parse_device_lines, DeviceInfo};

mod worker_cli;
pub use worker_cli::{parse_worker_args, WorkerArgs, WorkerMode};

mod error;
pub use error::BridgeError;

pub mod supervisor;
pub use supervisor::{ProcessSupervisor, SupervisorConfig, SupervisorState};
