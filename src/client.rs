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

//! A minimal blocking client, kept only far enough to prove wire
//! compatibility with the server side. No connection pooling, retry, or
//! redirect-following -- those are explicitly a non-goal here.

use std::time::Duration;

use crate::transport::{self, TransportError};
use crate::wire::{self, FramingError, Request, Response};

#[derive(Debug)]
pub enum ClientError {
    Transport(TransportError),
    Framing(FramingError),
    /// The front-end handed back a reply whose frame count didn't match the
    /// expected wire layout.
    MalformedReply,
    /// The reply's echoed request identifier didn't match what was sent;
    /// this should never happen against a well-behaved server, since the
    /// balancer only ever relays frames it received, untouched.
    MismatchedRequestId { sent: String, received: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Transport(e) => write!(f, "{}", e),
            ClientError::Framing(e) => write!(f, "{}", e),
            ClientError::MalformedReply => write!(f, "malformed reply from front-end router"),
            ClientError::MismatchedRequestId { sent, received } => {
                write!(f, "reply request id '{}' did not match sent id '{}'", received, sent)
            },
        }
    }
}

impl std::error::Error for ClientError {}

impl From<TransportError> for ClientError {
    fn from(e: TransportError) -> Self { ClientError::Transport(e) }
}

impl From<FramingError> for ClientError {
    fn from(e: FramingError) -> Self { ClientError::Framing(e) }
}

/// A single `DEALER` connection to a ClusterRPC front-end.
///
/// Unlike the worker's `REQ` socket, `DEALER` lets more than one request be
/// outstanding on the wire at once; this implementation only ever keeps one
/// in flight, since it exists to drive integration tests rather than to be a
/// production client library.
pub struct Client {
    socket: zmq::Socket,
}

impl Client {
    pub fn connect(zctx: &zmq::Context, front_endpoint: &str, timeout: Duration) -> Result<Self, ClientError> {
        let socket = transport::connect_dealer(zctx, front_endpoint, timeout)?;
        Ok(Client { socket })
    }

    /// Sends `request` and blocks for the matching reply.
    ///
    /// The application frames a `DEALER` sends to a `ROUTER` front-end are
    /// (request identifier, empty delimiter, serialized request); the
    /// client's peer identity is prepended automatically by the router on
    /// receipt and is never something this side constructs.
    pub fn call(&self, request: Request) -> Result<Response, ClientError> {
        let request_id = request.request_id.clone();
        let encoded = wire::encode(&request)?;

        let frames = vec![request_id.clone().into_bytes(), Vec::new(), encoded];
        transport::send_multipart(&self.socket, &frames)?;

        let reply = transport::recv_multipart(&self.socket)?;
        if reply.len() != 3 {
            return Err(ClientError::MalformedReply);
        }

        let response: Response = wire::decode(&reply[2])?;
        if response.request_id != request_id {
            return Err(ClientError::MismatchedRequestId { sent: request_id, received: response.request_id });
        }
        Ok(response)
    }
}
