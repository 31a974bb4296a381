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

//! Socket setup for the front-end/back-end ROUTER/REQ broker shape.
//!
//! The front-end and back-end routers are both `ROUTER` sockets; workers
//! connect to the back-end as `REQ` sockets (their implicit empty-delimiter
//! envelope is the empty separator frame every back-end message carries),
//! and callers connect to the front-end as `DEALER` sockets so a single
//! caller can have more than one request outstanding at a time.
//!
//! On any `ROUTER` socket, frame 0 of a received multipart message is always
//! the automatically-prepended identity of whichever peer sent it -- that's a
//! ZeroMQ invariant, not something this crate decides. Everything after frame
//! 0 is an application frame.

use std::time::Duration;

#[derive(Debug)]
pub enum TransportError {
    Zmq(zmq::Error),
    /// A send or receive did not complete within the configured timeout.
    Timeout,
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Zmq(e) => write!(f, "transport error: {}", e),
            TransportError::Timeout => write!(f, "transport timed out"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<zmq::Error> for TransportError {
    fn from(e: zmq::Error) -> Self { TransportError::Zmq(e) }
}

fn apply_timeout(socket: &zmq::Socket, timeout: Duration) -> Result<(), TransportError> {
    let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
    socket.set_rcvtimeo(millis)?;
    socket.set_sndtimeo(millis)?;
    Ok(())
}

/// Binds a `ROUTER` socket at `endpoint` (`tcp://...`, `ipc://...`, or
/// `inproc://...`).
pub fn bind_router(ctx: &zmq::Context, endpoint: &str, timeout: Duration) -> Result<zmq::Socket, TransportError> {
    let socket = ctx.socket(zmq::ROUTER)?;
    apply_timeout(&socket, timeout)?;
    socket.set_router_mandatory(true)?;
    socket.bind(endpoint)?;
    Ok(socket)
}

/// Connects a `REQ` socket to `endpoint`, setting its identity to `identity`
/// so the back-end router can address it directly.
pub fn connect_req(
    ctx: &zmq::Context, endpoint: &str, identity: &str, timeout: Duration,
) -> Result<zmq::Socket, TransportError> {
    let socket = ctx.socket(zmq::REQ)?;
    socket.set_identity(identity.as_bytes())?;
    apply_timeout(&socket, timeout)?;
    socket.connect(endpoint)?;
    Ok(socket)
}

/// Connects a `DEALER` socket to `endpoint`, used by callers so more than one
/// request can be outstanding at once.
pub fn connect_dealer(ctx: &zmq::Context, endpoint: &str, timeout: Duration) -> Result<zmq::Socket, TransportError> {
    let socket = ctx.socket(zmq::DEALER)?;
    apply_timeout(&socket, timeout)?;
    socket.connect(endpoint)?;
    Ok(socket)
}

/// Sends a multipart message, each element a frame, last frame implicit.
pub fn send_multipart(socket: &zmq::Socket, frames: &[Vec<u8>]) -> Result<(), TransportError> {
    let len = frames.len();
    for (i, frame) in frames.iter().enumerate() {
        let more = if i + 1 < len { zmq::SNDMORE } else { 0 };
        match socket.send(frame.as_slice(), more) {
            Ok(()) => {},
            Err(zmq::Error::EAGAIN) => return Err(TransportError::Timeout),
            Err(e) => return Err(TransportError::Zmq(e)),
        }
    }
    Ok(())
}

/// Receives a multipart message. Returns `TransportError::Timeout` if nothing
/// arrives within the socket's configured receive timeout.
pub fn recv_multipart(socket: &zmq::Socket) -> Result<Vec<Vec<u8>>, TransportError> {
    match socket.recv_multipart(0) {
        Ok(frames) => Ok(frames),
        Err(zmq::Error::EAGAIN) => Err(TransportError::Timeout),
        Err(e) => Err(TransportError::Zmq(e)),
    }
}
