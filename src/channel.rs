// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Cross-platform shared memory channel.
// Delegates to platform::PlatformShm (POSIX or Windows).

use std::io;

use crate::platform::PlatformShm;

/// Open mode for shared memory channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelMode {
    /// Create exclusively — fail if already exists.
    Create,
    /// Open existing — fail if it does not exist.
    Open,
    /// Create if missing, open if it already exists.
    CreateOrOpen,
}

/// A named, sized shared memory segment mapped into both host and worker.
///
/// `as_ptr`/`as_mut_ptr` expose a raw view of exactly `user_size()` bytes.
/// The channel performs no bounds checking on raw access; callers that need
/// a guard use [`SharedMemoryChannel::copy_in`].
pub struct SharedMemoryChannel {
    inner: PlatformShm,
    name: String,
}

impl SharedMemoryChannel {
    /// Acquire a named channel of `size` bytes.
    pub fn acquire(name: &str, size: usize, mode: ChannelMode) -> io::Result<Self> {
        #[cfg(unix)]
        let platform_mode = match mode {
            ChannelMode::Create => crate::platform::posix::ShmMode::Create,
            ChannelMode::Open => crate::platform::posix::ShmMode::Open,
            ChannelMode::CreateOrOpen => crate::platform::posix::ShmMode::CreateOrOpen,
        };
        #[cfg(windows)]
        let platform_mode = match mode {
            ChannelMode::Create => crate::platform::windows::ShmMode::Create,
            ChannelMode::Open => crate::platform::windows::ShmMode::Open,
            ChannelMode::CreateOrOpen => crate::platform::windows::ShmMode::CreateOrOpen,
        };

        let inner = PlatformShm::acquire(name, size, platform_mode)?;
        Ok(Self {
            inner,
            name: name.to_owned(),
        })
    }

    /// Create a fresh channel for a new session.
    ///
    /// Unlinks any stale segment left over from a crashed session first,
    /// so the mapping always starts zeroed.
    pub fn create(name: &str, size: usize) -> io::Result<Self> {
        PlatformShm::unlink_by_name(name);
        Self::acquire(name, size, ChannelMode::Create)
    }

    /// Open a channel created by the peer process.
    pub fn open(name: &str, size: usize) -> io::Result<Self> {
        Self::acquire(name, size, ChannelMode::Open)
    }

    /// Pointer to the start of the user-visible region.
    pub fn as_ptr(&self) -> *const u8 {
        self.inner.as_ptr()
    }

    /// Mutable pointer to the start of the user-visible region.
    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.inner.as_mut_ptr()
    }

    /// User-requested size (the usable portion).
    pub fn user_size(&self) -> usize {
        self.inner.user_size()
    }

    /// The name the channel was opened with.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Number of processes/handles currently mapping this segment.
    pub fn ref_count(&self) -> i32 {
        self.inner.ref_count()
    }

    /// Copy `buf` into the channel, rejecting writes past the capacity.
    ///
    /// # Errors
    /// Returns an error if `buf` is larger than the channel.
    pub fn copy_in(&self, buf: &[u8]) -> io::Result<()> {
        let cap = self.user_size();
        if buf.len() > cap {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("buffer too large for shared memory channel ({} > {cap})", buf.len()),
            ));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(buf.as_ptr(), self.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Copy the first `buf.len()` bytes of the channel out into `buf`.
    ///
    /// # Errors
    /// Returns an error if `buf` is larger than the channel.
    pub fn copy_out(&self, buf: &mut [u8]) -> io::Result<()> {
        let cap = self.user_size();
        if buf.len() > cap {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("read larger than shared memory channel ({} > {cap})", buf.len()),
            ));
        }
        unsafe {
            std::ptr::copy_nonoverlapping(self.as_ptr(), buf.as_mut_ptr(), buf.len());
        }
        Ok(())
    }

    /// Remove the backing storage for a named channel.
    pub fn clear_storage(name: &str) {
        PlatformShm::unlink_by_name(name);
    }
}
