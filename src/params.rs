// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The SharedParams record and frame buffer geometry.
// SharedParams carries the full filter configuration plus descriptors for
// the frame slot in use and the output geometry. Like SharedMessage, its
// layout must be byte-identical between host and worker builds; the size is
// negotiated at launch via `--size-shared-prm`.

/// One interleaved luma/chroma sample (the worker's pixel format).
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PixelYc {
    pub y: i16,
    pub cb: i16,
    pub cr: i16,
}

const _: () = assert!(std::mem::size_of::<PixelYc>() == 6);

/// Row alignment required by the GPU toolchain, in bytes.
pub const FRAME_ALIGN: usize = 64;

/// Byte stride of one row of `width` samples, rounded up to [`FRAME_ALIGN`].
pub fn pitch_bytes(width: usize) -> usize {
    let row = width * std::mem::size_of::<PixelYc>();
    ((row + FRAME_ALIGN - 1) / FRAME_ALIGN) * FRAME_ALIGN
}

/// Fixed capacity of one frame slot for the given maximum resolution.
///
/// Every frame write must fit this capacity regardless of the per-call
/// resolution; actual resolution never exceeds the maximum.
pub fn frame_buffer_size(max_width: usize, max_height: usize) -> usize {
    pitch_bytes(max_width) * max_height
}

/// Maximum number of stage slots in `SharedParams`.
pub const MAX_STAGES: usize = 16;

/// Layout revision, asserted by the worker after the raw size check passes.
pub const LAYOUT_VERSION: u32 = 1;

/// One filter stage as seen by the worker: tag, enable flag, packed params.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageSlot {
    pub tag: u32,
    pub enabled: u32,
    pub prm: [f32; 8],
}

impl StageSlot {
    pub const fn empty() -> Self {
        Self {
            tag: 0,
            enabled: 0,
            prm: [0.0; 8],
        }
    }
}

const _: () = assert!(std::mem::size_of::<StageSlot>() == 40);

/// Fixed-layout filter configuration record living in the params channel.
///
/// Mutated only during an active handshake turn: the host fills it before
/// raising StartSignal, the worker reads it before raising EndSignal.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SharedParams {
    pub layout_version: u32,
    /// Index of the frame channel holding the input for this pass.
    pub frame_slot: u32,
    pub width: i32,
    pub height: i32,
    pub out_width: i32,
    pub out_height: i32,
    /// Row stride of the frame data, in bytes.
    pub pitch: u32,
    /// Number of populated entries in `stages`.
    pub stage_count: u32,
    pub stages: [StageSlot; MAX_STAGES],
}

const _: () = assert!(std::mem::size_of::<SharedParams>() == 32 + 40 * MAX_STAGES);

impl SharedParams {
    /// An empty record for a frame of `width` x `height` samples.
    pub fn new(width: i32, height: i32) -> Self {
        Self {
            layout_version: LAYOUT_VERSION,
            frame_slot: 0,
            width,
            height,
            out_width: width,
            out_height: height,
            pitch: pitch_bytes(width.max(0) as usize) as u32,
            stage_count: 0,
            stages: [StageSlot::empty(); MAX_STAGES],
        }
    }

    /// Store the whole record into the params channel.
    pub fn store(&self, ch: &crate::channel::SharedMemoryChannel) {
        debug_assert!(ch.user_size() >= std::mem::size_of::<Self>());
        unsafe {
            std::ptr::write_volatile(ch.as_mut_ptr() as *mut Self, *self);
        }
    }

    /// Load the whole record from the params channel.
    pub fn load(ch: &crate::channel::SharedMemoryChannel) -> Self {
        debug_assert!(ch.user_size() >= std::mem::size_of::<Self>());
        unsafe { std::ptr::read_volatile(ch.as_ptr() as *const Self) }
    }
}
