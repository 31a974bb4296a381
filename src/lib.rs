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

//! ClusterRPC is a request/reply RPC framework over a ZeroMQ ROUTER/ROUTER
//! broker: callers connect as `DEALER`s to a front-end router, a single
//! load-balancer thread matches each request against an idle worker on an
//! in-process back-end router (or queues it in a bounded backlog, or
//! rejects it outright under overload), and workers run user-registered
//! handlers and hand back a status-tagged response.
//!
//! Start at [`server::Server`] to host procedures, or [`client::Client`] to
//! call them.

pub mod auth;
pub mod balancer;
pub mod client;
pub mod config;
pub mod context;
pub mod errors;
pub mod logging;
pub mod queue;
pub mod registry;
pub mod server;
pub mod time;
pub mod transport;
pub mod wire;
mod worker;
