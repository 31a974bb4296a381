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

//! Construction and lifecycle errors for a `Server`.

use crate::registry::RegistryError;
use crate::transport::TransportError;

#[derive(Debug)]
pub enum CreationError {
    /// A configuration value was missing or could not be parsed into the
    /// shape `Server::from_config` needed.
    InvalidParameter(String),

    /// Binding one of the router sockets failed.
    Transport(TransportError),
}

impl std::fmt::Display for CreationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CreationError::InvalidParameter(p) => write!(f, "invalid parameter: {}", p),
            CreationError::Transport(e) => write!(f, "transport setup failed: {}", e),
        }
    }
}

impl std::error::Error for CreationError {}

impl From<TransportError> for CreationError {
    fn from(e: TransportError) -> Self { CreationError::Transport(e) }
}

#[derive(Debug)]
pub enum ServerError {
    /// `register`/`unregister` was rejected by the handler registry.
    Registry(RegistryError),

    /// A lifecycle method was called out of order, e.g. `stop` before
    /// `start`, or `start` called twice.
    AlreadyStarted,
    NotStarted,

    /// The shutdown handshake with the balancer did not complete within the
    /// configured timeout.
    ShutdownTimedOut,

    Transport(TransportError),
}

impl std::fmt::Display for ServerError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServerError::Registry(e) => write!(f, "{}", e),
            ServerError::AlreadyStarted => write!(f, "server is already started"),
            ServerError::NotStarted => write!(f, "server has not been started"),
            ServerError::ShutdownTimedOut => write!(f, "balancer did not acknowledge shutdown in time"),
            ServerError::Transport(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for ServerError {}

impl From<RegistryError> for ServerError {
    fn from(e: RegistryError) -> Self { ServerError::Registry(e) }
}

impl From<TransportError> for ServerError {
    fn from(e: TransportError) -> Self { ServerError::Transport(e) }
}
