// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// The fixed handshake parameters exchanged on the worker command line.
// The host builds the flag list, the worker parses it; both sides share the
// grammar here so the contract cannot drift. Unknown flags are rejected.

use crate::error::BridgeError;
use crate::message::SharedMessage;
use crate::params::{PixelYc, SharedParams};
use crate::shm_name::{event_name, EventKind};

/// The eight required run-mode parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerArgs {
    /// Session token; every shared object name derives from it.
    pub session: u32,
    pub max_width: usize,
    pub max_height: usize,
    /// `size_of::<SharedParams>()` in the host build.
    pub size_shared_prm: usize,
    /// `size_of::<SharedMessage>()` in the host build.
    pub size_shared_mesdata: usize,
    /// `size_of::<PixelYc>()` in the host build.
    pub size_pixelyc: usize,
    pub event_mes_start: String,
    pub event_mes_end: String,
}

/// How the worker was invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerMode {
    /// Normal supervised run.
    Run(WorkerArgs),
    /// One-shot device listing; the run-mode flags are ignored.
    CheckDevice,
}

impl WorkerArgs {
    /// Handshake parameters for a new session with the host's record sizes.
    pub fn for_session(session: u32, max_width: usize, max_height: usize) -> Self {
        Self {
            session,
            max_width,
            max_height,
            size_shared_prm: std::mem::size_of::<SharedParams>(),
            size_shared_mesdata: std::mem::size_of::<SharedMessage>(),
            size_pixelyc: std::mem::size_of::<PixelYc>(),
            event_mes_start: event_name(session, EventKind::Start),
            event_mes_end: event_name(session, EventKind::End),
        }
    }

    /// The exact command line the worker must be launched with.
    pub fn to_args(&self) -> Vec<String> {
        vec![
            "--ppid".into(),
            format!("{:x}", self.session),
            "--maxw".into(),
            self.max_width.to_string(),
            "--maxh".into(),
            self.max_height.to_string(),
            "--size-shared-prm".into(),
            self.size_shared_prm.to_string(),
            "--size-shared-mesdata".into(),
            self.size_shared_mesdata.to_string(),
            "--size-pixelyc".into(),
            self.size_pixelyc.to_string(),
            "--event-mes-start".into(),
            self.event_mes_start.clone(),
            "--event-mes-end".into(),
            self.event_mes_end.clone(),
        ]
    }

    /// Compare the exchanged sizes against this build's record layouts.
    /// Any mismatch is a fatal startup condition for the worker.
    pub fn verify_layout(&self) -> Result<(), BridgeError> {
        let checks: [(&'static str, usize, usize); 3] = [
            (
                "SharedParams",
                std::mem::size_of::<SharedParams>(),
                self.size_shared_prm,
            ),
            (
                "SharedMessage",
                std::mem::size_of::<SharedMessage>(),
                self.size_shared_mesdata,
            ),
            ("PixelYc", std::mem::size_of::<PixelYc>(), self.size_pixelyc),
        ];
        for (field, ours, theirs) in checks {
            if ours != theirs {
                return Err(BridgeError::LayoutMismatch {
                    field,
                    host: theirs,
                    worker: ours,
                });
            }
        }
        Ok(())
    }
}

/// Parse a worker command line (without the executable name).
///
/// `--check-device` selects the one-shot query mode and makes every other
/// flag irrelevant. In run mode all eight parameters are required; unknown
/// flags and malformed values are rejected.
pub fn parse_worker_args(args: &[String]) -> Result<WorkerMode, BridgeError> {
    if args.iter().any(|a| a == "--check-device") {
        return Ok(WorkerMode::CheckDevice);
    }

    let mut session: Option<u32> = None;
    let mut max_width: Option<usize> = None;
    let mut max_height: Option<usize> = None;
    let mut size_shared_prm: Option<usize> = None;
    let mut size_shared_mesdata: Option<usize> = None;
    let mut size_pixelyc: Option<usize> = None;
    let mut event_mes_start: Option<String> = None;
    let mut event_mes_end: Option<String> = None;

    let mut it = args.iter();
    while let Some(flag) = it.next() {
        let value = it
            .next()
            .ok_or_else(|| BridgeError::InvalidArgs(format!("{flag} requires a value")))?;
        match flag.as_str() {
            "--ppid" => {
                let v = u32::from_str_radix(value, 16)
                    .map_err(|_| BridgeError::InvalidArgs(format!("bad hex ppid: {value}")))?;
                session = Some(v);
            }
            "--maxw" => max_width = Some(parse_usize(flag, value)?),
            "--maxh" => max_height = Some(parse_usize(flag, value)?),
            "--size-shared-prm" => size_shared_prm = Some(parse_usize(flag, value)?),
            "--size-shared-mesdata" => size_shared_mesdata = Some(parse_usize(flag, value)?),
            "--size-pixelyc" => size_pixelyc = Some(parse_usize(flag, value)?),
            "--event-mes-start" => event_mes_start = Some(value.clone()),
            "--event-mes-end" => event_mes_end = Some(value.clone()),
            other => {
                return Err(BridgeError::InvalidArgs(format!("unknown flag: {other}")));
            }
        }
    }

    let missing = |name: &str| BridgeError::InvalidArgs(format!("missing required flag {name}"));
    Ok(WorkerMode::Run(WorkerArgs {
        session: session.ok_or_else(|| missing("--ppid"))?,
        max_width: max_width.ok_or_else(|| missing("--maxw"))?,
        max_height: max_height.ok_or_else(|| missing("--maxh"))?,
        size_shared_prm: size_shared_prm.ok_or_else(|| missing("--size-shared-prm"))?,
        size_shared_mesdata: size_shared_mesdata
            .ok_or_else(|| missing("--size-shared-mesdata"))?,
        size_pixelyc: size_pixelyc.ok_or_else(|| missing("--size-pixelyc"))?,
        event_mes_start: event_mes_start.ok_or_else(|| missing("--event-mes-start"))?,
        event_mes_end: event_mes_end.ok_or_else(|| missing("--event-mes-end"))?,
    }))
}

fn parse_usize(flag: &str, value: &str) -> Result<usize, BridgeError> {
    value
        .parse::<usize>()
        .map_err(|_| BridgeError::InvalidArgs(format!("bad value for {flag}: {value}")))
}
