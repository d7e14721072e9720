// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Stand-in GPU filter worker used by the integration tests.
// Implements the worker half of every contract: the fixed command line, the
// layout-size check, the turn-taking handshake, and the device-listing query
// mode. Failure injection is driven by environment variables so the command
// line stays exactly the one the host sends:
//   MOCK_WORKER_EXIT_BEFORE_INIT  exit(3) without ever acknowledging
//   MOCK_WORKER_EXIT_AFTER_INIT   exit(0) right after the init ack
//   MOCK_WORKER_HANG_ON_ABORT     swallow the abort request and never answer
//   MOCK_DEVICE_LINES             device listing to print in query mode
//   MOCK_DEVICE_EXIT_CODE         exit code for query mode

use std::collections::HashMap;
use std::process::exit;
use std::time::Duration;

use tracing::{debug, info, warn};

use filterbridge::shm_name::{segment_name, SegmentPurpose};
use filterbridge::{
    frame_buffer_size, parse_worker_args, Handshake, MessageKind, SharedMemoryChannel, WorkerArgs,
    WorkerMode, LAYOUT_VERSION, STATUS_ERROR, STATUS_OK,
};

// Overall patience for the host; if no request arrives for this long the
// worker assumes the host is gone and exits.
const IDLE_LIMIT: Duration = Duration::from_secs(30);

fn env_flag(name: &str) -> bool {
    std::env::var(name).map(|v| v == "1").unwrap_or(false)
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let mode = match parse_worker_args(&argv) {
        Ok(m) => m,
        Err(e) => {
            warn!("bad command line: {e}");
            exit(2);
        }
    };

    match mode {
        WorkerMode::CheckDevice => check_device(),
        WorkerMode::Run(args) => run(args),
    }
}

fn check_device() -> ! {
    let lines = std::env::var("MOCK_DEVICE_LINES")
        .unwrap_or_else(|_| "0x1/Mock OpenCL Device\n0x2/Mock CUDA Device".to_string());
    println!("{lines}");
    let code = std::env::var("MOCK_DEVICE_EXIT_CODE")
        .ok()
        .and_then(|v| v.parse::<i32>().ok())
        .unwrap_or(0);
    exit(code);
}

fn run(args: WorkerArgs) -> ! {
    if let Err(e) = args.verify_layout() {
        warn!("{e}");
        exit(4);
    }

    if env_flag("MOCK_WORKER_EXIT_BEFORE_INIT") {
        warn!("injected: exiting before init ack");
        exit(3);
    }

    let hs = match Handshake::worker_open(&args) {
        Ok(hs) => hs,
        Err(e) => {
            warn!("cannot open shared session objects: {e}");
            exit(5);
        }
    };
    println!("mock worker ready, session {:08x}", args.session);
    info!(session = args.session, "handshake objects opened");

    let frame_capacity = frame_buffer_size(args.max_width, args.max_height);
    let mut frames: HashMap<u32, SharedMemoryChannel> = HashMap::new();

    loop {
        match hs.wait_start(IDLE_LIMIT) {
            Ok(true) => {}
            Ok(false) => {
                warn!("no request within idle limit, giving up");
                exit(6);
            }
            Err(e) => {
                warn!("wait for start signal failed: {e}");
                exit(5);
            }
        }

        let message = hs.read_message();
        match message.kind() {
            Some(MessageKind::Init) => {
                debug!("init request");
                finish_or_die(&hs, STATUS_OK, 0);
                if env_flag("MOCK_WORKER_EXIT_AFTER_INIT") {
                    warn!("injected: exiting after init ack");
                    exit(0);
                }
            }
            Some(MessageKind::ProcessFrame) => {
                let params = hs.read_params();
                if params.layout_version != LAYOUT_VERSION {
                    finish_or_die(&hs, STATUS_ERROR, 100);
                    continue;
                }
                let slot = params.frame_slot;
                let ch = match frames.entry(slot) {
                    std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
                    std::collections::hash_map::Entry::Vacant(v) => {
                        let name = segment_name(args.session, SegmentPurpose::Frame(slot));
                        match SharedMemoryChannel::open(&name, frame_capacity) {
                            Ok(ch) => v.insert(ch),
                            Err(e) => {
                                warn!("cannot open frame slot {slot}: {e}");
                                finish_or_die(&hs, STATUS_ERROR, 101);
                                continue;
                            }
                        }
                    }
                };
                // "Filter" in place: bump every byte of the first row so the
                // host can observe that the pass ran.
                let row = (params.pitch as usize).min(ch.user_size());
                unsafe {
                    let p = ch.as_mut_ptr();
                    for i in 0..row {
                        *p.add(i) = (*p.add(i)).wrapping_add(1);
                    }
                }
                debug!(slot, width = params.width, height = params.height, "frame processed");
                finish_or_die(&hs, STATUS_OK, 0);
            }
            Some(MessageKind::Abort) => {
                if env_flag("MOCK_WORKER_HANG_ON_ABORT") {
                    warn!("injected: hanging on abort");
                    loop {
                        std::thread::sleep(Duration::from_secs(60));
                    }
                }
                info!("abort request, shutting down");
                finish_or_die(&hs, STATUS_OK, 0);
                exit(0);
            }
            Some(MessageKind::QueryDevices) | Some(MessageKind::None) | None => {
                warn!("unexpected request kind {}", message.kind);
                finish_or_die(&hs, STATUS_ERROR, 102);
            }
        }
    }
}

fn finish_or_die(hs: &Handshake, status: u32, code: i32) {
    if let Err(e) = hs.finish(status, code) {
        warn!("cannot raise end signal: {e}");
        exit(5);
    }
}
