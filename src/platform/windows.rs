// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Windows implementation of the shared memory and handshake event primitives.
// Shared memory: pagefile-backed file mapping. Events: kernel auto-reset
// events (one wake per SetEvent).

use std::io;
use std::ptr;
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;

// ---------------------------------------------------------------------------
// Layout helpers
// ---------------------------------------------------------------------------

const ALIGN: usize = std::mem::align_of::<AtomicI32>();

pub(crate) fn calc_size(user_size: usize) -> usize {
    let aligned = ((user_size.wrapping_sub(1) / ALIGN) + 1) * ALIGN;
    aligned + std::mem::size_of::<AtomicI32>()
}

unsafe fn acc_of(mem: *mut u8, total_size: usize) -> &'static AtomicI32 {
    let offset = total_size - std::mem::size_of::<AtomicI32>();
    &*(mem.add(offset) as *const AtomicI32)
}

/// Encode a name as a null-terminated wide string for Win32 APIs.
fn to_wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

// ---------------------------------------------------------------------------
// PlatformShm — Windows shared memory via file mapping
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShmMode {
    Create,
    Open,
    CreateOrOpen,
}

pub struct PlatformShm {
    handle: windows_sys::Win32::Foundation::HANDLE,
    mem: *mut u8,
    size: usize,      // total mapped size
    user_size: usize, // user-requested size
}

unsafe impl Send for PlatformShm {}
unsafe impl Sync for PlatformShm {}

impl PlatformShm {
    pub fn acquire(name: &str, user_size: usize, mode: ShmMode) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::*;
        use windows_sys::Win32::System::Memory::*;

        if name.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "name is empty"));
        }
        if user_size == 0 {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "size is 0"));
        }

        let wide_name = to_wide(name);
        let total_size = calc_size(user_size);

        let handle;

        if mode == ShmMode::Open {
            handle = unsafe { OpenFileMappingW(FILE_MAP_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
        } else {
            handle = unsafe {
                CreateFileMappingW(
                    INVALID_HANDLE_VALUE,
                    ptr::null(),
                    PAGE_READWRITE | SEC_COMMIT,
                    0,
                    total_size as u32,
                    wide_name.as_ptr(),
                )
            };
            let err = unsafe { GetLastError() };
            if mode == ShmMode::Create && err == ERROR_ALREADY_EXISTS {
                if handle != 0 {
                    unsafe { CloseHandle(handle) };
                }
                return Err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "shm already exists",
                ));
            }
            if handle == 0 {
                return Err(io::Error::last_os_error());
            }
        };

        let mem = unsafe { MapViewOfFile(handle, FILE_MAP_ALL_ACCESS, 0, 0, 0) };
        if mem.is_null() {
            let e = io::Error::last_os_error();
            unsafe { CloseHandle(handle) };
            return Err(e);
        }

        // When opening an existing mapping, verify the region actually holds
        // the caller's layout. The view is page-rounded, so the caller-passed
        // size (not the discovered region size) defines the user-visible view
        // and the ref counter offset; creator and opener must place the
        // counter identically.
        if mode == ShmMode::Open {
            let mut info: MEMORY_BASIC_INFORMATION = unsafe { std::mem::zeroed() };
            let ret = unsafe {
                VirtualQuery(
                    mem as *const _,
                    &mut info,
                    std::mem::size_of::<MEMORY_BASIC_INFORMATION>(),
                )
            };
            if ret == 0 {
                let e = io::Error::last_os_error();
                unsafe {
                    UnmapViewOfFile(mem);
                    CloseHandle(handle);
                }
                return Err(e);
            }
            if info.RegionSize < total_size {
                unsafe {
                    UnmapViewOfFile(mem);
                    CloseHandle(handle);
                }
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    "existing mapping is smaller than the requested layout",
                ));
            }
        }

        unsafe { acc_of(mem as *mut u8, total_size).fetch_add(1, Ordering::Release) };

        Ok(Self {
            handle,
            mem: mem as *mut u8,
            size: total_size,
            user_size,
        })
    }

    pub fn as_ptr(&self) -> *const u8 {
        self.mem
    }

    pub fn as_mut_ptr(&self) -> *mut u8 {
        self.mem
    }

    pub fn user_size(&self) -> usize {
        self.user_size
    }

    pub fn ref_count(&self) -> i32 {
        if self.mem.is_null() || self.size == 0 {
            return 0;
        }
        unsafe { acc_of(self.mem, self.size).load(Ordering::Acquire) }
    }

    pub fn unlink_by_name(_name: &str) {
        // No-op on Windows.
    }
}

impl Drop for PlatformShm {
    fn drop(&mut self) {
        use windows_sys::Win32::Foundation::CloseHandle;
        use windows_sys::Win32::System::Memory::UnmapViewOfFile;

        if !self.mem.is_null() && self.size > 0 {
            unsafe { acc_of(self.mem, self.size).fetch_sub(1, Ordering::AcqRel) };
            unsafe { UnmapViewOfFile(self.mem as *const _) };
        }
        if self.handle != 0 {
            unsafe { CloseHandle(self.handle) };
        }
    }
}

// ---------------------------------------------------------------------------
// PlatformEvent — Windows auto-reset event
// ---------------------------------------------------------------------------

pub struct PlatformEvent {
    handle: windows_sys::Win32::Foundation::HANDLE,
    name: String,
}

unsafe impl Send for PlatformEvent {}
unsafe impl Sync for PlatformEvent {}

impl PlatformEvent {
    /// Create a fresh auto-reset event (initial state: not signalled).
    pub fn create(name: &str) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::FALSE;
        use windows_sys::Win32::System::Threading::CreateEventW;

        let wide_name = to_wide(name);
        // bManualReset = FALSE: auto-reset, one wake per SetEvent.
        let h = unsafe { CreateEventW(ptr::null(), FALSE, FALSE, wide_name.as_ptr()) };
        if h == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle: h,
            name: name.to_owned(),
        })
    }

    /// Open an event created by the peer process. Fails if it does not exist.
    pub fn open(name: &str) -> io::Result<Self> {
        use windows_sys::Win32::Foundation::FALSE;
        use windows_sys::Win32::System::Threading::{OpenEventW, EVENT_ALL_ACCESS};

        let wide_name = to_wide(name);
        let h = unsafe { OpenEventW(EVENT_ALL_ACCESS, FALSE, wide_name.as_ptr()) };
        if h == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(Self {
            handle: h,
            name: name.to_owned(),
        })
    }

    /// Signal the event: exactly one pending or future wait is woken.
    pub fn raise(&self) -> io::Result<()> {
        use windows_sys::Win32::System::Threading::SetEvent;

        if unsafe { SetEvent(self.handle) } == 0 {
            return Err(io::Error::last_os_error());
        }
        Ok(())
    }

    /// Wait for the event with a timeout. Consumes the signal on success.
    /// Returns `Ok(true)` if signalled, `Ok(false)` on timeout.
    pub fn wait(&self, timeout: Duration) -> io::Result<bool> {
        use windows_sys::Win32::Foundation::{WAIT_OBJECT_0, WAIT_TIMEOUT};
        use windows_sys::Win32::System::Threading::WaitForSingleObject;

        let ms = timeout.as_millis().min(u32::MAX as u128) as u32;
        let ret = unsafe { WaitForSingleObject(self.handle, ms) };
        match ret {
            WAIT_OBJECT_0 => Ok(true),
            WAIT_TIMEOUT => Ok(false),
            _ => Err(io::Error::last_os_error()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Kernel events vanish with their last handle — nothing to unlink.
    pub fn unlink_by_name(_name: &str) {}
}

impl Drop for PlatformEvent {
    fn drop(&mut self) {
        use windows_sys::Win32::Foundation::CloseHandle;
        if self.handle != 0 {
            unsafe { CloseHandle(self.handle) };
        }
    }
}
