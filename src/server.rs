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

//! Server lifecycle: `start` spawns the worker pool and the balancer loop,
//! `stop` drains and tears both down in order, `close` releases the
//! underlying ZeroMQ context.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::auth::{Authenticator, NullAuthenticator};
use crate::balancer::Balancer;
use crate::config::ServerConfig;
use crate::context::Context;
use crate::errors::{CreationError, ServerError};
use crate::registry::Registry;
use crate::transport::{self, TransportError};
use crate::wire;
use crate::worker::{self, WorkerConfig};

pub struct Server {
    zctx: zmq::Context,
    config: ServerConfig,
    registry: Arc<Registry>,
    authenticator: Arc<dyn Authenticator>,
    lameduck: Arc<AtomicBool>,
    loadshed: Arc<AtomicBool>,
    worker_threads: Vec<JoinHandle<()>>,
    balancer_thread: Option<JoinHandle<()>>,
    started: bool,
}

impl Server {
    pub fn new(config: ServerConfig) -> Result<Self, CreationError> {
        Self::with_authenticator(config, Arc::new(NullAuthenticator))
    }

    pub fn with_authenticator(config: ServerConfig, authenticator: Arc<dyn Authenticator>) -> Result<Self, CreationError> {
        let lameduck = Arc::new(AtomicBool::new(false));
        Ok(Server {
            zctx: zmq::Context::new(),
            registry: Arc::new(Registry::new(lameduck.clone())),
            config,
            authenticator,
            lameduck,
            loadshed: Arc::new(AtomicBool::new(false)),
            worker_threads: Vec::new(),
            balancer_thread: None,
            started: false,
        })
    }

    /// Registers a handler under `service.procedure`. Must be called before
    /// `start`; the registry is shared with worker threads once they're
    /// spawned and is no longer safe to mutate after that.
    pub fn register<F>(&mut self, service: &str, procedure: &str, handler: F) -> Result<(), ServerError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        if self.started {
            return Err(ServerError::AlreadyStarted);
        }
        let registry = Arc::get_mut(&mut self.registry).expect("registry is not shared with worker threads before start");
        registry.register(service, procedure, handler)?;
        Ok(())
    }

    pub fn unregister(&mut self, service: &str, procedure: &str) -> Result<(), ServerError> {
        if self.started {
            return Err(ServerError::AlreadyStarted);
        }
        let registry = Arc::get_mut(&mut self.registry).expect("registry is not shared with worker threads before start");
        registry.unregister(service, procedure)?;
        Ok(())
    }

    /// Sets the lameduck flag read by the built-in `Health` endpoint, used
    /// to drain traffic ahead of a stop.
    pub fn set_lameduck(&self, lameduck: bool) { self.lameduck.store(lameduck, Ordering::Relaxed); }

    /// Sets the administrative loadshed flag: while `true`, the balancer
    /// rejects every new front-end request with `Loadshed` without queueing
    /// it, independent of backlog occupancy.
    pub fn set_loadshed(&self, loadshed: bool) { self.loadshed.store(loadshed, Ordering::Relaxed); }

    /// Binds both routers and spawns `worker_count` worker threads plus one
    /// dedicated balancer thread. Returns once every thread has been
    /// spawned; it does not wait for the balancer to begin polling.
    pub fn start(&mut self) -> Result<(), ServerError> {
        if self.started {
            return Err(ServerError::AlreadyStarted);
        }

        let timeout = self.config.timeout();
        let front = transport::bind_router(&self.zctx, &self.config.front_endpoint, timeout)?;
        let back = transport::bind_router(&self.zctx, &self.config.back_endpoint, timeout)?;

        for i in 0..self.config.worker_count {
            let zctx = self.zctx.clone();
            let registry = self.registry.clone();
            let authenticator = self.authenticator.clone();
            let worker_config = WorkerConfig {
                identity: worker_identity(i),
                backend_endpoint: self.config.back_endpoint.clone(),
                timeout,
                machine: self.config.machine.clone(),
            };

            let handle = thread::Builder::new()
                .name(format!("clusterrpc-worker-{}", i))
                .spawn(move || {
                    if let Err(e) = worker::run(&zctx, worker_config, registry, authenticator) {
                        log::error!("[worker] exited: {}", e);
                    }
                })
                .expect("failed to spawn worker thread");
            self.worker_threads.push(handle);
        }

        let loadshed = self.loadshed.clone();
        let backlog_capacity = self.config.backlog_capacity();
        let worker_count = self.config.worker_count;
        let balancer_handle = thread::Builder::new()
            .name("clusterrpc-balancer".to_string())
            .spawn(move || {
                let mut balancer = Balancer::new(front, back, backlog_capacity, worker_count, loadshed, timeout);
                if let Err(e) = balancer.run() {
                    log::error!("[balancer] exited: {}", e);
                }
            })
            .expect("failed to spawn balancer thread");
        self.balancer_thread = Some(balancer_handle);

        self.started = true;
        log::info!("[server] started with {} workers", self.config.worker_count);
        Ok(())
    }

    /// Stops the balancer loop and waits for it and every worker thread to
    /// exit. Idempotent only in the sense that calling it twice returns
    /// `NotStarted` the second time.
    pub fn stop(&mut self) -> Result<(), ServerError> {
        if !self.started {
            return Err(ServerError::NotStarted);
        }

        let timeout = self.config.timeout();
        self.stop_balancer(timeout)?;

        for handle in self.worker_threads.drain(..) {
            let _ = handle.join();
        }
        if let Some(handle) = self.balancer_thread.take() {
            let _ = handle.join();
        }

        self.started = false;
        log::info!("[server] stopped");
        Ok(())
    }

    /// Sends a stop sentinel through the same lifecycle path a worker's
    /// `READY`/reply uses. The balancer drains every idle worker immediately
    /// and stops each busy worker the next time it reports back, then
    /// answers with a `DONE` acknowledgment before exiting its loop.
    fn stop_balancer(&self, timeout: Duration) -> Result<(), ServerError> {
        let socket = transport::connect_req(&self.zctx, &self.config.back_endpoint, "stop-handshake", timeout)?;
        let frames = vec![Vec::new(), Vec::new(), Vec::new(), wire::STOP_SENTINEL.to_vec()];
        transport::send_multipart(&socket, &frames)?;

        match transport::recv_multipart(&socket) {
            Ok(_) => Ok(()),
            Err(TransportError::Timeout) => Err(ServerError::ShutdownTimedOut),
            Err(e) => Err(e.into()),
        }
    }

    /// Drops the underlying ZeroMQ context, releasing its sockets and
    /// background I/O threads. Consumes the server; it cannot be restarted.
    pub fn close(self) { drop(self); }
}

fn worker_identity(index: usize) -> String { format!("worker-{}", index) }

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> ServerConfig {
        ServerConfig {
            front_endpoint: "inproc://test-front".to_string(),
            back_endpoint: "inproc://test-back".to_string(),
            worker_count: 2,
            backlog_multiplier: 4,
            timeout_ms: 200,
            machine: "test-machine".to_string(),
        }
    }

    #[test]
    fn register_before_start_then_unregister() {
        let mut server = Server::new(config()).unwrap();
        server.register("Echo", "Call", |ctx| ctx.success(ctx.input().to_vec())).unwrap();
        server.unregister("Echo", "Call").unwrap();
    }

    #[test]
    fn stop_without_start_is_an_error() {
        let mut server = Server::new(config()).unwrap();
        assert!(matches!(server.stop(), Err(ServerError::NotStarted)));
    }
}
