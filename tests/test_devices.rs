// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Device enumeration tests against the mock worker binary.
// Tests that change the process environment serialize on ENV_LOCK because
// spawned workers inherit the environment of the moment they launch.

use std::path::Path;
use std::sync::Mutex;

use filterbridge::{enumerate_devices, BridgeError};

static ENV_LOCK: Mutex<()> = Mutex::new(());

fn worker_exe() -> &'static Path {
    Path::new(env!("CARGO_BIN_EXE_mock_worker"))
}

fn lock_env() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner())
}

#[test]
fn enumerates_default_mock_devices() {
    let _g = lock_env();
    let devices = enumerate_devices(worker_exe()).expect("enumerate");
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].id, 1);
    assert_eq!(devices[0].desc, "Mock OpenCL Device");
    assert_eq!(devices[1].id, 2);
    assert_eq!(devices[1].desc, "Mock CUDA Device");
}

#[test]
fn malformed_lines_are_skipped() {
    let _g = lock_env();
    std::env::set_var("MOCK_DEVICE_LINES", "0x1/Intel GPU\n0x2/NVIDIA GPU\ngarbage");
    let devices = enumerate_devices(worker_exe());
    std::env::remove_var("MOCK_DEVICE_LINES");

    let devices = devices.expect("enumerate");
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0].desc, "Intel GPU");
    assert_eq!(devices[1].desc, "NVIDIA GPU");
}

#[test]
fn no_parsable_lines_is_an_error() {
    let _g = lock_env();
    std::env::set_var("MOCK_DEVICE_LINES", "not a device line");
    let result = enumerate_devices(worker_exe());
    std::env::remove_var("MOCK_DEVICE_LINES");

    assert!(matches!(result, Err(BridgeError::DeviceQuery(_))));
}

#[test]
fn worker_failure_exit_is_an_error() {
    let _g = lock_env();
    std::env::set_var("MOCK_DEVICE_EXIT_CODE", "7");
    let result = enumerate_devices(worker_exe());
    std::env::remove_var("MOCK_DEVICE_EXIT_CODE");

    assert!(matches!(result, Err(BridgeError::DeviceQuery(_))));
}

#[test]
fn missing_executable_is_not_found() {
    let result = enumerate_devices(Path::new("/nonexistent/gpu_worker"));
    assert!(matches!(result, Err(BridgeError::NotFound(_))));
}

#[test]
fn non_executable_file_fails_to_launch() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("gpu_worker");
    std::fs::write(&path, b"not a binary").expect("write");

    let result = enumerate_devices(&path);
    assert!(matches!(result, Err(BridgeError::Launch(_))));
}
