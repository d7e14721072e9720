// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// One-shot enumeration of the worker's compute devices.
// The worker is launched in query mode (`--check-device`), prints one line
// per platform/device as `"<hex id>/<description>"`, and exits. Malformed
// lines are skipped; a non-zero exit or an empty result is an error.

use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::error::BridgeError;

/// One compute device reported by the worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    /// Combined platform/device identifier.
    pub id: u64,
    pub desc: String,
}

/// Parse the device-listing text protocol. Lines that do not match
/// `"<hex id>/<description>"` are skipped, not fatal.
pub fn parse_device_lines(text: &str) -> Vec<DeviceInfo> {
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id_part, desc)) = line.split_once('/') else {
            debug!("skipping unparsable device line: {line:?}");
            continue;
        };
        let id_part = id_part.trim();
        let id_hex = id_part
            .strip_prefix("0x")
            .or_else(|| id_part.strip_prefix("0X"))
            .unwrap_or(id_part);
        match u64::from_str_radix(id_hex, 16) {
            Ok(id) => out.push(DeviceInfo {
                id,
                desc: desc.trim().to_string(),
            }),
            Err(_) => debug!("skipping unparsable device line: {line:?}"),
        }
    }
    out
}

/// Launch the worker in query mode and collect its device list.
///
/// Blocks until the worker exits; the query mode is a short-lived one-shot
/// run, not a supervised session.
pub fn enumerate_devices(worker_exe: &Path) -> Result<Vec<DeviceInfo>, BridgeError> {
    if !worker_exe.is_file() {
        return Err(BridgeError::NotFound(worker_exe.to_path_buf()));
    }

    let output = Command::new(worker_exe)
        .arg("--check-device")
        .output()
        .map_err(BridgeError::Launch)?;

    if !output.status.success() {
        return Err(BridgeError::DeviceQuery(format!(
            "worker exited with {}",
            output.status
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let devices = parse_device_lines(&text);
    if devices.is_empty() {
        return Err(BridgeError::DeviceQuery(
            "worker produced no parsable device lines".into(),
        ));
    }
    Ok(devices)
}
