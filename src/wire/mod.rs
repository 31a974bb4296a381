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

//! Request/response framing.
//!
//! The serialization format itself is an implementation detail callers never
//! see directly; this module picks `bincode` so the rest of the crate has
//! something concrete to build and test against.

mod request;
mod response;
mod sentinel;
mod status;
mod trace;

pub use request::Request;
pub use response::Response;
pub use sentinel::{READY_SENTINEL, STOP_SENTINEL};
pub use status::Status;
pub use trace::{RedirectInfo, TraceInfo};

use serde::{de::DeserializeOwned, Serialize};

/// Errors that can occur while turning wire bytes into a `Request`/`Response`
/// or back again.
#[derive(Debug)]
pub enum FramingError {
    Encode(bincode::Error),
    Decode(bincode::Error),
}

impl std::fmt::Display for FramingError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FramingError::Encode(e) => write!(f, "failed to encode frame: {}", e),
            FramingError::Decode(e) => write!(f, "failed to decode frame: {}", e),
        }
    }
}

impl std::error::Error for FramingError {}

pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, FramingError> {
    bincode::serialize(value).map_err(FramingError::Encode)
}

pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, FramingError> {
    bincode::deserialize(bytes).map_err(FramingError::Decode)
}
