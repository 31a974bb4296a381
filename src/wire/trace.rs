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

/// A redirect target, echoed verbatim in both the response and any trace node
/// recorded for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedirectInfo {
    pub host: String,
    pub port: u16,
    pub service: Option<String>,
    pub procedure: Option<String>,
}

/// One node of the trace tree assembled by a `Context` during handler
/// execution.
///
/// Owned exclusively by the request thread that builds it; there is no
/// shared mutation, so this is plain value composition rather than a graph
/// of shared, ref-counted nodes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceInfo {
    pub endpoint: String,
    pub machine: String,
    pub received_us: u64,
    pub replied_us: u64,
    pub error: Option<String>,
    pub redirect: Option<RedirectInfo>,
    pub children: Vec<TraceInfo>,
}

impl TraceInfo {
    pub fn new(endpoint: String, machine: String, received_us: u64) -> Self {
        TraceInfo {
            endpoint,
            machine,
            received_us,
            replied_us: received_us,
            error: None,
            redirect: None,
            children: Vec::new(),
        }
    }
}
