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

//! Worker protocol.
//!
//! Each worker owns a dedicated `REQ` socket connected to the back-end
//! router, identified by a short textual index. `REQ`'s send/recv lockstep
//! maps directly onto the worker lifecycle: announce readiness, block for a
//! task, reply, block for the next one.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::auth::Authenticator;
use crate::context::Context;
use crate::registry::Registry;
use crate::time::now_us;
use crate::transport::{self, TransportError};
use crate::wire::{self, Request, Response, Status};

pub struct WorkerConfig {
    pub identity: String,
    pub backend_endpoint: String,
    pub timeout: Duration,
    pub machine: String,
}

/// Runs one worker's lifetime: connect, announce readiness, serve requests
/// until a stop sentinel arrives. Blocks the calling thread.
pub fn run(
    zctx: &zmq::Context, config: WorkerConfig, registry: Arc<Registry>, authenticator: Arc<dyn Authenticator>,
) -> Result<(), TransportError> {
    let socket = transport::connect_req(zctx, &config.backend_endpoint, &config.identity, config.timeout)?;

    announce_ready(&socket)?;

    loop {
        let frames = transport::recv_multipart(&socket)?;
        if frames.len() != 4 {
            log::warn!("[worker {}] dropping malformed back-end frame (got {} parts)", config.identity, frames.len());
            continue;
        }

        let request_id_frame = frames[0].clone();
        let client_identity = frames[1].clone();
        let payload = &frames[3];

        if payload.as_slice() == wire::STOP_SENTINEL {
            log::debug!("[worker {}] received stop sentinel", config.identity);
            return Ok(());
        }

        let response = handle_request(&config.machine, &registry, authenticator.as_ref(), payload, &request_id_frame);
        let encoded = match wire::encode(&response) {
            Ok(bytes) => bytes,
            Err(e) => {
                log::error!("[worker {}] failed to encode response: {}", config.identity, e);
                wire::encode(&Response::failure(
                    String::from_utf8_lossy(&request_id_frame).into_owned(),
                    Status::ServerError,
                    "failed to encode response",
                ))
                .expect("a hand-built failure response always encodes")
            },
        };

        let reply = vec![request_id_frame, client_identity, Vec::new(), encoded];
        transport::send_multipart(&socket, &reply)?;
    }
}

fn announce_ready(socket: &zmq::Socket) -> Result<(), TransportError> {
    let frame = vec![Vec::new(), Vec::new(), Vec::new(), wire::READY_SENTINEL.to_vec()];
    transport::send_multipart(socket, &frame)
}

/// Decodes and dispatches one request, never panicking out of this function
/// even if the registered handler does -- a handler crash is caught and
/// turned into a `ServerError` response rather than taking the worker thread
/// down with it.
fn handle_request(
    machine: &str, registry: &Registry, authenticator: &dyn Authenticator, payload: &[u8], request_id_frame: &[u8],
) -> Response {
    let fallback_id = || String::from_utf8_lossy(request_id_frame).into_owned();

    let request: Request = match wire::decode(payload) {
        Ok(r) => r,
        Err(e) => {
            log::warn!("[worker] failed to decode request: {}", e);
            return Response::failure(fallback_id(), Status::ServerError, "malformed request");
        },
    };

    if let Err(reason) = authenticator.authenticate(&request) {
        return Response::failure(request.request_id, Status::ServerError, reason);
    }

    if request.has_deadline() && now_us() > request.deadline_us {
        return Response::failure(request.request_id.clone(), Status::MissedDeadline, "deadline already passed");
    }

    let handler = match registry.lookup(&request.service, &request.procedure) {
        Some(h) => h,
        None => {
            return Response::failure(
                request.request_id.clone(),
                Status::NotFound,
                format!("{}.{} is not registered", request.service, request.procedure),
            );
        },
    };

    let endpoint = format!("{}.{}", request.service, request.procedure);
    let mut context = Context::new(request.payload.clone(), endpoint, machine.to_string(), request.trace);

    let outcome = catch_unwind(AssertUnwindSafe(|| handler(&mut context)));
    match outcome {
        Ok(()) => context.into_response(request.request_id),
        Err(_) => {
            log::error!("[worker] handler for {}.{} panicked", request.service, request.procedure);
            Response::failure(request.request_id, Status::ServerError, "handler panicked")
        },
    }
}
