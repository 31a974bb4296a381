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
use serde_derive::{Deserialize, Serialize};

use super::{trace::RedirectInfo, Status, TraceInfo};

/// The framed response sent from server back to caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub status: Status,
    pub payload: Option<Vec<u8>>,
    pub error: Option<String>,
    pub redirect: Option<RedirectInfo>,
    pub trace: Option<TraceInfo>,
    pub request_id: String,
}

impl Response {
    pub fn ok(request_id: String, payload: Vec<u8>) -> Self {
        Response {
            status: Status::Ok,
            payload: Some(payload),
            error: None,
            redirect: None,
            trace: None,
            request_id,
        }
    }

    pub fn failure(request_id: String, status: Status, message: impl Into<String>) -> Self {
        Response {
            status,
            payload: None,
            error: Some(message.into()),
            redirect: None,
            trace: None,
            request_id,
        }
    }

    pub fn with_trace(mut self, trace: Option<TraceInfo>) -> Self {
        self.trace = trace;
        self
    }
}
