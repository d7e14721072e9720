// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The SharedMessage handshake record.
// Written by the host, read by the worker after StartSignal; the worker
// writes status/error back before raising EndSignal. The layout must be
// byte-identical between host and worker builds — the size is exchanged on
// the worker command line and a mismatch is a fatal startup condition.

use crate::channel::SharedMemoryChannel;

/// Request kinds carried by [`SharedMessage`]. Exactly one kind is active
/// per handshake round.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// No request pending.
    None = 0,
    /// First contact; the worker reports readiness via EndSignal.
    Init = 1,
    /// Run one filtering pass over the current SharedParams + frame slot.
    ProcessFrame = 2,
    /// Request graceful shutdown.
    Abort = 3,
    /// Device listing — serviced by the one-shot query mode, never by the
    /// steady-state handshake.
    QueryDevices = 4,
}

impl MessageKind {
    pub fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(Self::None),
            1 => Some(Self::Init),
            2 => Some(Self::ProcessFrame),
            3 => Some(Self::Abort),
            4 => Some(Self::QueryDevices),
            _ => None,
        }
    }
}

/// Request not yet serviced.
pub const STATUS_IDLE: u32 = 0;
/// Request serviced successfully.
pub const STATUS_OK: u32 = 1;
/// Request failed; see `error_code`.
pub const STATUS_ERROR: u32 = 2;

/// Fixed-layout handshake record living in the message channel.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SharedMessage {
    pub kind: u32,
    pub status: u32,
    pub error_code: i32,
    _reserved: u32,
}

const _: () = assert!(std::mem::size_of::<SharedMessage>() == 16);

impl SharedMessage {
    /// A fresh request of `kind` with idle status.
    pub fn request(kind: MessageKind) -> Self {
        Self {
            kind: kind as u32,
            status: STATUS_IDLE,
            error_code: 0,
            _reserved: 0,
        }
    }

    pub fn kind(&self) -> Option<MessageKind> {
        MessageKind::from_u32(self.kind)
    }

    /// Store the whole record into the message channel.
    ///
    /// The channel must be at least `size_of::<SharedMessage>()` bytes; the
    /// supervisor sizes it that way at allocation.
    pub fn store(&self, ch: &SharedMemoryChannel) {
        debug_assert!(ch.user_size() >= std::mem::size_of::<Self>());
        unsafe {
            std::ptr::write_volatile(ch.as_mut_ptr() as *mut Self, *self);
        }
    }

    /// Load the whole record from the message channel.
    pub fn load(ch: &SharedMemoryChannel) -> Self {
        debug_assert!(ch.user_size() >= std::mem::size_of::<Self>());
        unsafe { std::ptr::read_volatile(ch.as_ptr() as *const Self) }
    }
}
