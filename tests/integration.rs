// Copyright (c) 2024 ClusterRPC Contributors
//
// Permission is hereby granted, free of charge, to any person obtaining a copy
// of this software and associated documentation files (the "Software"), to deal
// in the Software without restriction, including without limitation the rights
// to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
// copies of the Software, and to permit persons to whom the Software is
// furnished to do so, subject to the following conditions:
//
// The above copyright notice and this permission notice shall be included in all
// copies or substantial portions of the Software.
//
// THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
// IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
// FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
// AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
// LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
// OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
// SOFTWARE.

//! End-to-end tests: every test here boots a real `Server` bound to an
//! `ipc://` socket in a background thread and drives it with a real
//! `Client`, rather than exercising any internals directly.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use clusterrpc::client::Client;
use clusterrpc::config::ServerConfig;
use clusterrpc::server::Server;
use clusterrpc::time::now_us;
use clusterrpc::wire::{Request, Status};

static NEXT_SOCK_ID: AtomicUsize = AtomicUsize::new(0);

fn unique_endpoint(dir: &tempfile::TempDir, label: &str) -> String {
    let id = NEXT_SOCK_ID.fetch_add(1, Ordering::SeqCst);
    format!("ipc://{}/{}-{}.sock", dir.path().display(), label, id)
}

fn config(dir: &tempfile::TempDir, worker_count: usize, backlog_multiplier: usize) -> ServerConfig {
    ServerConfig {
        front_endpoint: unique_endpoint(dir, "front"),
        back_endpoint: unique_endpoint(dir, "back").replacen("ipc://", "inproc://", 1),
        worker_count,
        backlog_multiplier,
        timeout_ms: 2000,
        machine: "test-machine".to_string(),
    }
}

fn request(service: &str, procedure: &str, payload: &[u8], request_id: &str) -> Request {
    Request {
        caller: "integration-test".to_string(),
        service: service.to_string(),
        procedure: procedure.to_string(),
        payload: payload.to_vec(),
        deadline_us: 0,
        trace: false,
        request_id: request_id.to_string(),
    }
}

fn client_for(front_endpoint: &str) -> Client {
    // A fresh zmq::Context per client: unlike `inproc://`, `ipc://` works
    // across independent contexts, the same way it would across processes.
    let ctx = Box::leak(Box::new(zmq::Context::new()));
    Client::connect(ctx, front_endpoint, Duration::from_millis(1500)).unwrap()
}

#[test]
fn echo_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 2, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("Echo", "Call", |ctx| {
        let input = ctx.input().to_vec();
        ctx.success(input);
    })
    .unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let resp = client.call(request("Echo", "Call", b"helloworld", "req-echo")).unwrap();
    assert_eq!(resp.status, Status::Ok);
    assert_eq!(resp.payload, Some(b"helloworld".to_vec()));
    assert_eq!(resp.request_id, "req-echo");

    server.stop().unwrap();
}

#[test]
fn missing_endpoint_returns_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let resp = client.call(request("Nope", "Nope", b"", "req-missing")).unwrap();
    assert_eq!(resp.status, Status::NotFound);

    server.stop().unwrap();
}

#[test]
fn handler_failure_surfaces_error_message() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("X", "F", |ctx| ctx.fail("bad")).unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let resp = client.call(request("X", "F", b"", "req-fail")).unwrap();
    assert_eq!(resp.status, Status::NotOk);
    assert_eq!(resp.error, Some("bad".to_string()));

    server.stop().unwrap();
}

#[test]
fn redirect_echoes_target_fields() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("X", "R", |ctx| ctx.redirect("other", 9001)).unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let resp = client.call(request("X", "R", b"", "req-redirect")).unwrap();
    assert_eq!(resp.status, Status::Redirect);
    let redirect = resp.redirect.expect("redirect fields");
    assert_eq!(redirect.host, "other");
    assert_eq!(redirect.port, 9001);

    server.stop().unwrap();
}

#[test]
fn missed_deadline_skips_the_handler() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    let called = Arc::new(AtomicBool::new(false));
    let called2 = called.clone();
    server.register("X", "Spy", move |ctx| {
        called2.store(true, Ordering::SeqCst);
        ctx.success(Vec::new());
    })
    .unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let mut req = request("X", "Spy", b"", "req-deadline");
    req.deadline_us = now_us() - 100_000;
    let resp = client.call(req).unwrap();
    assert_eq!(resp.status, Status::MissedDeadline);
    assert!(!called.load(Ordering::SeqCst));

    server.stop().unwrap();
}

#[test]
fn lameduck_only_affects_health() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("X", "Ok", |ctx| ctx.success(Vec::new())).unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let healthy = client.call(request("ClusterRPC", "Health", b"", "req-health-1")).unwrap();
    assert_eq!(healthy.status, Status::Ok);

    server.set_lameduck(true);

    let unhealthy = client.call(request("ClusterRPC", "Health", b"", "req-health-2")).unwrap();
    assert_eq!(unhealthy.status, Status::NotOk);

    let still_ok = client.call(request("X", "Ok", b"", "req-x")).unwrap();
    assert_eq!(still_ok.status, Status::Ok);

    server.stop().unwrap();
}

#[test]
fn loadshed_rejects_every_request() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    let called = Arc::new(AtomicBool::new(false));
    let called2 = called.clone();
    server.register("X", "Spy", move |ctx| {
        called2.store(true, Ordering::SeqCst);
        ctx.success(Vec::new());
    })
    .unwrap();
    server.start().unwrap();
    server.set_loadshed(true);

    let client = client_for(&front);
    for i in 0..5 {
        let resp = client.call(request("X", "Spy", b"", &format!("req-shed-{}", i))).unwrap();
        assert_eq!(resp.status, Status::Loadshed);
    }
    assert!(!called.load(Ordering::SeqCst));

    server.stop().unwrap();
}

#[test]
fn trace_round_trip_has_machine_and_endpoint_and_monotonic_time() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("Echo", "Call", |ctx| {
        let input = ctx.input().to_vec();
        ctx.success(input);
    })
    .unwrap();
    server.start().unwrap();

    let client = client_for(&front);
    let mut req = request("Echo", "Call", b"hi", "req-trace");
    req.trace = true;
    let resp = client.call(req).unwrap();
    assert_eq!(resp.status, Status::Ok);
    let trace = resp.trace.expect("trace info");
    assert_eq!(trace.machine, "test-machine");
    assert_eq!(trace.endpoint, "Echo.Call");
    assert!(trace.replied_us >= trace.received_us);

    server.stop().unwrap();
}

#[test]
fn concurrent_requests_are_correlated_by_request_id() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 4, 32);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("Echo", "Call", |ctx| {
        let input = ctx.input().to_vec();
        ctx.success(input);
    })
    .unwrap();
    server.start().unwrap();

    let handles: Vec<_> = (0..100)
        .map(|i| {
            let front = front.clone();
            thread::spawn(move || {
                let client = client_for(&front);
                let id = format!("req-{}", i);
                let resp = client.call(request("Echo", "Call", id.as_bytes(), &id)).unwrap();
                assert_eq!(resp.request_id, id);
                assert_eq!(resp.payload, Some(id.into_bytes()));
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    server.stop().unwrap();
}

#[test]
fn overload_sheds_once_the_backlog_is_full() {
    let dir = tempfile::tempdir().unwrap();
    // One worker, a backlog of 50: total admittable concurrent work is 51
    // (1 in flight + 50 queued), so 60 concurrent slow calls must shed some.
    let cfg = config(&dir, 1, 50);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.register("X", "Slow", |ctx| {
        thread::sleep(Duration::from_millis(400));
        ctx.success(Vec::new());
    })
    .unwrap();
    server.start().unwrap();

    let overloaded = Arc::new(AtomicUsize::new(0));
    let succeeded = Arc::new(AtomicUsize::new(0));

    let handles: Vec<_> = (0..60)
        .map(|i| {
            let front = front.clone();
            let overloaded = overloaded.clone();
            let succeeded = succeeded.clone();
            thread::spawn(move || {
                let client = client_for(&front);
                let id = format!("req-overload-{}", i);
                match client.call(request("X", "Slow", b"", &id)) {
                    Ok(resp) if resp.status == Status::OverloadedRetry => {
                        overloaded.fetch_add(1, Ordering::SeqCst);
                    },
                    Ok(resp) if resp.status == Status::Ok => {
                        succeeded.fetch_add(1, Ordering::SeqCst);
                    },
                    other => panic!("unexpected reply: {:?}", other),
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert!(overloaded.load(Ordering::SeqCst) >= 9, "expected at least 9 overloaded replies");
    assert_eq!(overloaded.load(Ordering::SeqCst) + succeeded.load(Ordering::SeqCst), 60);

    server.stop().unwrap();
}

#[test]
fn clean_stop_then_fresh_send_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(&dir, 1, 8);
    let front = cfg.front_endpoint.clone();

    let mut server = Server::new(cfg).unwrap();
    server.start().unwrap();
    server.stop().unwrap();

    let client = client_for(&front);
    let err = client.call(request("ClusterRPC", "Ping", b"", "req-after-stop")).unwrap_err();
    // Nothing is bound anymore, so the send/recv simply times out rather
    // than completing -- there's no front-end left to answer.
    assert!(format!("{:?}", err).contains("Timeout"));
}
