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

//! Load balancer: the single loop that matches inbound requests on the
//! front-end router against idle workers on the back-end router, and holds
//! the overflow in a bounded backlog when none are idle.
//!
//! Only one thread ever runs this loop. Everything here is single-threaded
//! by construction; no locking is needed inside it.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::queue::BoundedQueue;
use crate::wire::{self, Response, Status};

const DONE_SENTINEL: &[u8] = b"\x01CLUSTERRPC_BALANCER_DONE";

/// A request that arrived on the front-end but had no idle worker to take it
/// immediately.
struct Pending {
    request_id: Vec<u8>,
    client_identity: Vec<u8>,
    payload: Vec<u8>,
}

pub struct Balancer {
    front: zmq::Socket,
    back: zmq::Socket,
    ready_workers: VecDeque<Vec<u8>>,
    backlog: BoundedQueue<Pending>,
    loadshed: Arc<AtomicBool>,
    poll_timeout: Duration,
    warned_backlog: bool,
    worker_count: usize,
    /// Set once the shutdown handshake arrives; from then on every worker
    /// that talks to the balancer (ready announcement or reply) is told to
    /// stop instead of being offered more work.
    draining: bool,
    stopped_count: usize,
    handshake_identity: Option<Vec<u8>>,
}

impl Balancer {
    pub fn new(
        front: zmq::Socket, back: zmq::Socket, backlog_capacity: usize, worker_count: usize, loadshed: Arc<AtomicBool>,
        poll_timeout: Duration,
    ) -> Self {
        Balancer {
            front,
            back,
            ready_workers: VecDeque::new(),
            backlog: BoundedQueue::new(backlog_capacity),
            loadshed,
            poll_timeout,
            warned_backlog: false,
            worker_count,
            draining: false,
            stopped_count: 0,
            handshake_identity: None,
        }
    }

    /// Runs the loop until a shutdown handshake arrives on the back-end.
    /// Never returns `Err` under ordinary operation; poll errors propagate so
    /// the caller can log and tear down.
    pub fn run(&mut self) -> Result<(), zmq::Error> {
        loop {
            let mut items = [self.back.as_poll_item(zmq::POLLIN), self.front.as_poll_item(zmq::POLLIN)];
            zmq::poll(&mut items, self.poll_timeout.as_millis() as i64)?;

            let back_ready = items[0].is_readable();
            let front_ready = items[1].is_readable();

            if back_ready {
                if self.handle_back_event()? {
                    return Ok(());
                }
            }
            if front_ready {
                self.handle_front_event()?;
            }

            self.drain()?;
        }
    }

    /// Returns `Ok(true)` when every worker has been told to stop and the
    /// shutdown handshake has been acknowledged, so the loop should exit.
    fn handle_back_event(&mut self) -> Result<bool, zmq::Error> {
        let frames = self.back.recv_multipart(0)?;
        if frames.len() < 6 {
            log::warn!("[balancer] dropping malformed back-end frame (got {} parts)", frames.len());
            return Ok(false);
        }

        let worker_identity = frames[0].clone();
        // frames[1] is the REQ socket's own empty delimiter frame.
        let request_id = frames[2].clone();
        let client_identity = frames[3].clone();
        let payload = &frames[5];

        if payload.as_slice() == wire::STOP_SENTINEL {
            // Only the administrative shutdown handshake sends this on the
            // back-end; real workers only ever receive it, never send it.
            log::info!("[balancer] shutdown requested, draining {} idle workers", self.ready_workers.len());
            self.draining = true;
            self.handshake_identity = Some(worker_identity);
            let idle: Vec<Vec<u8>> = self.ready_workers.drain(..).collect();
            for identity in idle {
                self.send_stop_to_worker(&identity)?;
                self.stopped_count += 1;
            }
            return self.maybe_finish_draining();
        }

        if payload.as_slice() == wire::READY_SENTINEL {
            if self.draining {
                self.send_stop_to_worker(&worker_identity)?;
                self.stopped_count += 1;
                return self.maybe_finish_draining();
            }
            log::debug!("[balancer] worker became ready");
            self.ready_workers.push_back(worker_identity);
            return Ok(false);
        }

        // Otherwise it's a reply: relay to the front-end, then the worker is
        // free again (or stopped, if we're draining).
        self.send_multipart_front(&client_identity, &request_id, payload)?;
        if self.draining {
            self.send_stop_to_worker(&worker_identity)?;
            self.stopped_count += 1;
            return self.maybe_finish_draining();
        }
        self.ready_workers.push_back(worker_identity);
        Ok(false)
    }

    /// Once every worker has been sent its stop sentinel, acknowledge the
    /// handshake and signal the loop to exit. Each worker is counted exactly
    /// once, at the point its stop sentinel is actually sent -- not once per
    /// back-end event, since a single event (the handshake arriving while
    /// several workers are idle) can account for more than one worker at
    /// once.
    fn maybe_finish_draining(&mut self) -> Result<bool, zmq::Error> {
        if self.stopped_count < self.worker_count {
            return Ok(false);
        }
        if let Some(identity) = self.handshake_identity.take() {
            self.send_to_worker(&identity, b"", b"", DONE_SENTINEL)?;
        }
        Ok(true)
    }

    fn send_stop_to_worker(&mut self, worker_identity: &[u8]) -> Result<(), zmq::Error> {
        self.send_to_worker(worker_identity, b"", b"", wire::STOP_SENTINEL)
    }

    fn handle_front_event(&mut self) -> Result<(), zmq::Error> {
        let frames = self.front.recv_multipart(0)?;
        if frames.len() != 4 {
            log::warn!("[balancer] dropping malformed front-end frame (got {} parts)", frames.len());
            return Ok(());
        }

        let client_identity = frames[0].clone();
        let request_id = frames[1].clone();
        let payload = frames[3].clone();

        if self.draining || self.loadshed.load(Ordering::Relaxed) {
            return self.loadshed_reply(&client_identity, &request_id);
        }

        if let Some(worker_identity) = self.ready_workers.pop_front() {
            return self.dispatch(&worker_identity, &request_id, &client_identity, &payload);
        }

        let pending = Pending {
            request_id: request_id.clone(),
            client_identity: client_identity.clone(),
            payload,
        };
        if !self.backlog.push(pending) {
            return self.overloaded_reply(&client_identity, &request_id);
        }

        let load = self.backlog.load_factor();
        if load >= 0.8 && !self.warned_backlog {
            log::warn!("[balancer] backlog at {:.0}% of capacity", load * 100.0);
            self.warned_backlog = true;
        } else if load < 0.8 {
            self.warned_backlog = false;
        }

        Ok(())
    }

    /// Pairs idle workers with queued requests until one side runs dry, so
    /// the backlog never holds a request while a worker sits idle.
    fn drain(&mut self) -> Result<(), zmq::Error> {
        while !self.ready_workers.is_empty() && !self.backlog.is_empty() {
            let worker_identity = self.ready_workers.pop_front().expect("checked non-empty");
            let pending = self.backlog.pop().expect("checked non-empty");
            self.dispatch(&worker_identity, &pending.request_id, &pending.client_identity, &pending.payload)?;
        }
        Ok(())
    }

    fn dispatch(
        &mut self, worker_identity: &[u8], request_id: &[u8], client_identity: &[u8], payload: &[u8],
    ) -> Result<(), zmq::Error> {
        self.send_to_worker(worker_identity, request_id, client_identity, payload)
    }

    fn send_to_worker(
        &mut self, worker_identity: &[u8], request_id: &[u8], client_identity: &[u8], payload: &[u8],
    ) -> Result<(), zmq::Error> {
        let frames: [&[u8]; 6] = [worker_identity, b"", request_id, client_identity, b"", payload];
        send_multipart_raw(&self.back, &frames)
    }

    fn send_multipart_front(&mut self, client_identity: &[u8], request_id: &[u8], payload: &[u8]) -> Result<(), zmq::Error> {
        let frames: [&[u8]; 4] = [client_identity, request_id, b"", payload];
        send_multipart_raw(&self.front, &frames)
    }

    fn loadshed_reply(&mut self, client_identity: &[u8], request_id: &[u8]) -> Result<(), zmq::Error> {
        let request_id_str = String::from_utf8_lossy(request_id).into_owned();
        let response = Response::failure(request_id_str, Status::Loadshed, "server is shedding load");
        let encoded = wire::encode(&response).expect("a hand-built failure response always encodes");
        self.send_multipart_front(client_identity, request_id, &encoded)
    }

    /// Sent when the backlog is full, distinct from the loadshed-flag
    /// rejection above: the caller is expected to retry, possibly against
    /// another server.
    fn overloaded_reply(&mut self, client_identity: &[u8], request_id: &[u8]) -> Result<(), zmq::Error> {
        let request_id_str = String::from_utf8_lossy(request_id).into_owned();
        let response = Response::failure(request_id_str, Status::OverloadedRetry, "backlog is full");
        let encoded = wire::encode(&response).expect("a hand-built failure response always encodes");
        self.send_multipart_front(client_identity, request_id, &encoded)
    }
}

fn send_multipart_raw(socket: &zmq::Socket, frames: &[&[u8]]) -> Result<(), zmq::Error> {
    let len = frames.len();
    for (i, frame) in frames.iter().enumerate() {
        let more = if i + 1 < len { zmq::SNDMORE } else { 0 };
        socket.send(*frame, more)?;
    }
    Ok(())
}
