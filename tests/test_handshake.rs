// SPDX-License-Identifier: MIT
// SPDX-FileCopyrightText: 2025-2026 natyamatsya contributors
//
// Turn-taking handshake tests. The worker side runs on a thread in this
// process; the kernel objects are the same ones a separate process would
// map, so the protocol exercised here is the real cross-process one.

use std::thread;
use std::time::{Duration, Instant};

use filterbridge::{
    Handshake, MessageKind, SharedParams, WaitOutcome, WorkerArgs, STATUS_ERROR, STATUS_OK,
};

// Unique session per test so concurrently running tests never share
// kernel object names.
fn test_session(tag: u32) -> u32 {
    ((std::process::id() & 0xffff) << 16) | (tag & 0xffff)
}

const SLICE: Duration = Duration::from_millis(20);

#[test]
fn init_round_trip() {
    let session = test_session(1);
    let mut host = Handshake::host_allocate(session).expect("host allocate");
    let args = WorkerArgs::for_session(session, 64, 64);

    let worker = thread::spawn(move || {
        let hs = Handshake::worker_open(&args).expect("worker open");
        assert!(hs.wait_start(Duration::from_secs(5)).expect("wait start"));
        assert_eq!(hs.read_message().kind(), Some(MessageKind::Init));
        hs.finish(STATUS_OK, 0).expect("finish");
    });

    host.post_request(MessageKind::Init).expect("post");
    let outcome = host
        .wait_end(Duration::from_secs(5), SLICE, || true)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::Signalled);
    let m = host.read_message();
    assert_eq!(m.status, STATUS_OK);
    assert_eq!(m.error_code, 0);

    worker.join().unwrap();
    drop(host);
    Handshake::clear_storage(session);
}

#[test]
fn params_reach_the_worker() {
    let session = test_session(2);
    let mut host = Handshake::host_allocate(session).expect("host allocate");
    let args = WorkerArgs::for_session(session, 1920, 1080);

    let worker = thread::spawn(move || {
        let hs = Handshake::worker_open(&args).expect("worker open");
        assert!(hs.wait_start(Duration::from_secs(5)).expect("wait start"));
        let p = hs.read_params();
        assert_eq!(p.width, 1280);
        assert_eq!(p.height, 720);
        assert_eq!(p.frame_slot, 1);
        hs.finish(STATUS_OK, 0).expect("finish");
    });

    let mut params = SharedParams::new(1280, 720);
    params.frame_slot = 1;
    host.write_params(&params);
    host.post_request(MessageKind::ProcessFrame).expect("post");
    let outcome = host
        .wait_end(Duration::from_secs(5), SLICE, || true)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::Signalled);

    worker.join().unwrap();
    drop(host);
    Handshake::clear_storage(session);
}

#[test]
fn worker_error_is_reported() {
    let session = test_session(3);
    let mut host = Handshake::host_allocate(session).expect("host allocate");
    let args = WorkerArgs::for_session(session, 64, 64);

    let worker = thread::spawn(move || {
        let hs = Handshake::worker_open(&args).expect("worker open");
        assert!(hs.wait_start(Duration::from_secs(5)).expect("wait start"));
        hs.finish(STATUS_ERROR, -7).expect("finish");
    });

    host.post_request(MessageKind::ProcessFrame).expect("post");
    let outcome = host
        .wait_end(Duration::from_secs(5), SLICE, || true)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::Signalled);
    let m = host.read_message();
    assert_eq!(m.status, STATUS_ERROR);
    assert_eq!(m.error_code, -7);

    worker.join().unwrap();
    drop(host);
    Handshake::clear_storage(session);
}

#[test]
fn wait_end_times_out_while_peer_alive() {
    let session = test_session(4);
    let host = Handshake::host_allocate(session).expect("host allocate");

    let start = Instant::now();
    let outcome = host
        .wait_end(Duration::from_millis(200), SLICE, || true)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::TimedOut);
    assert!(start.elapsed() >= Duration::from_millis(200));
    // The deadline bounds the wait; allow generous scheduling slack.
    assert!(start.elapsed() < Duration::from_secs(2));

    drop(host);
    Handshake::clear_storage(session);
}

#[test]
fn wait_end_detects_dead_peer() {
    let session = test_session(5);
    let host = Handshake::host_allocate(session).expect("host allocate");

    let outcome = host
        .wait_end(Duration::from_secs(5), SLICE, || false)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::PeerDead);

    drop(host);
    Handshake::clear_storage(session);
}

#[test]
fn signal_raised_just_before_death_is_consumed() {
    let session = test_session(6);
    let mut host = Handshake::host_allocate(session).expect("host allocate");
    let args = WorkerArgs::for_session(session, 64, 64);

    // Worker services the request and "dies" immediately after.
    let worker = thread::spawn(move || {
        let hs = Handshake::worker_open(&args).expect("worker open");
        assert!(hs.wait_start(Duration::from_secs(5)).expect("wait start"));
        hs.finish(STATUS_OK, 0).expect("finish");
    });
    host.post_request(MessageKind::Init).expect("post");
    worker.join().unwrap();

    // Liveness already reports dead, but the final slice wait must still
    // pick up the signal the worker raised on its way out.
    let outcome = host
        .wait_end(Duration::from_secs(5), SLICE, || false)
        .expect("wait end");
    assert_eq!(outcome, WaitOutcome::Signalled);

    drop(host);
    Handshake::clear_storage(session);
}
