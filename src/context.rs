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

//! Per-request execution context.
//!
//! A `Context` is built by the worker before a handler runs and is consumed
//! afterwards to produce the `Response`. The terminal outcome and the trace
//! tree live here as plain values, derived into a `Response` at serialize
//! time, rather than as a `Context` <-> `Response` cycle.

use crate::time::now_us;
use crate::wire::{RedirectInfo, Response, TraceInfo};

/// The terminal outcome a handler leaves behind. Handlers are expected to
/// call exactly one of `success`/`fail`/`redirect`; if more than one is
/// called, the last call wins.
enum Outcome {
    None,
    Success(Vec<u8>),
    Failure(String),
    Redirect(RedirectInfo),
}

pub struct Context {
    input: Vec<u8>,
    outcome: Outcome,
    trace: Option<TraceInfo>,
}

impl Context {
    /// `endpoint` is "service.procedure"; `trace_requested` mirrors the
    /// request's tracing flag -- tracing is opt-in per request.
    pub fn new(input: Vec<u8>, endpoint: String, machine: String, trace_requested: bool) -> Self {
        let trace = if trace_requested {
            Some(TraceInfo::new(endpoint, machine, now_us()))
        } else {
            None
        };
        Context {
            input,
            outcome: Outcome::None,
            trace,
        }
    }

    pub fn input(&self) -> &[u8] { &self.input }

    pub fn success(&mut self, payload: Vec<u8>) { self.outcome = Outcome::Success(payload); }

    pub fn fail(&mut self, message: impl Into<String>) { self.outcome = Outcome::Failure(message.into()); }

    pub fn redirect(&mut self, host: impl Into<String>, port: u16) {
        self.redirect_to(host, port, None, None);
    }

    pub fn redirect_to(
        &mut self, host: impl Into<String>, port: u16, service: Option<String>, procedure: Option<String>,
    ) {
        self.outcome = Outcome::Redirect(RedirectInfo {
            host: host.into(),
            port,
            service,
            procedure,
        });
    }

    /// Records a child trace node for a downstream call the handler made.
    /// A no-op if the request did not opt into tracing.
    pub fn append_call(&mut self, child: TraceInfo) {
        if let Some(trace) = self.trace.as_mut() {
            trace.children.push(child);
        }
    }

    pub fn trace_info(&self) -> Option<&TraceInfo> { self.trace.as_ref() }

    /// Consumes the context and produces the wire response, filling in the
    /// trace's terminal fields (replied time, error, redirect) from whichever
    /// outcome won.
    ///
    /// Priority when more than one outcome was set: failure > redirect >
    /// success. A handler that never calls any of the three produces an
    /// empty-payload success, treating the missing call as a no-op rather
    /// than an error.
    pub fn into_response(mut self, request_id: String) -> Response {
        let replied_us = now_us();

        let (status, payload, error, redirect) = match self.outcome {
            Outcome::Failure(msg) => (crate::wire::Status::NotOk, None, Some(msg), None),
            Outcome::Redirect(r) => (crate::wire::Status::Redirect, None, None, Some(r)),
            Outcome::Success(bytes) => (crate::wire::Status::Ok, Some(bytes), None, None),
            Outcome::None => (crate::wire::Status::Ok, Some(Vec::new()), None, None),
        };

        if let Some(trace) = self.trace.as_mut() {
            trace.replied_us = replied_us;
            trace.error = error.clone();
            trace.redirect = redirect.clone();
        }

        Response {
            status,
            payload,
            error,
            redirect,
            trace: self.trace,
            request_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(trace: bool) -> Context {
        Context::new(b"hi".to_vec(), "Echo.Call".to_string(), "m1".to_string(), trace)
    }

    #[test]
    fn success_round_trips_payload() {
        let mut c = ctx(false);
        c.success(b"ok".to_vec());
        let resp = c.into_response("req-1".to_string());
        assert_eq!(resp.status, crate::wire::Status::Ok);
        assert_eq!(resp.payload, Some(b"ok".to_vec()));
        assert!(resp.error.is_none());
    }

    #[test]
    fn failure_beats_success_when_both_are_called() {
        let mut c = ctx(false);
        c.success(b"ok".to_vec());
        c.fail("bad");
        let resp = c.into_response("req-1".to_string());
        assert_eq!(resp.status, crate::wire::Status::NotOk);
        assert_eq!(resp.error, Some("bad".to_string()));
        assert!(resp.payload.is_none());
    }

    #[test]
    fn redirect_sets_fields() {
        let mut c = ctx(false);
        c.redirect("other", 9001);
        let resp = c.into_response("req-1".to_string());
        assert_eq!(resp.status, crate::wire::Status::Redirect);
        let redirect = resp.redirect.expect("redirect info");
        assert_eq!(redirect.host, "other");
        assert_eq!(redirect.port, 9001);
    }

    #[test]
    fn untouched_context_yields_empty_success() {
        let c = ctx(false);
        let resp = c.into_response("req-1".to_string());
        assert_eq!(resp.status, crate::wire::Status::Ok);
        assert_eq!(resp.payload, Some(Vec::new()));
    }

    #[test]
    fn trace_is_only_built_when_requested() {
        let c = ctx(false);
        assert!(c.trace_info().is_none());

        let c = ctx(true);
        assert!(c.trace_info().is_some());
    }

    #[test]
    fn trace_replied_time_is_not_before_received_time() {
        let mut c = ctx(true);
        c.success(b"x".to_vec());
        let resp = c.into_response("req-1".to_string());
        let trace = resp.trace.expect("trace");
        assert!(trace.replied_us >= trace.received_us);
        assert_eq!(trace.machine, "m1");
        assert_eq!(trace.endpoint, "Echo.Call");
    }

    #[test]
    fn append_call_adds_child_when_tracing() {
        let mut c = ctx(true);
        let child = TraceInfo::new("Down.Stream".to_string(), "m2".to_string(), now_us());
        c.append_call(child.clone());
        c.success(Vec::new());
        let resp = c.into_response("req-1".to_string());
        let trace = resp.trace.expect("trace");
        assert_eq!(trace.children.len(), 1);
        assert_eq!(trace.children[0].endpoint, "Down.Stream");
    }

    #[test]
    fn append_call_is_noop_without_tracing() {
        let mut c = ctx(false);
        c.append_call(TraceInfo::new("x".to_string(), "m".to_string(), 0));
        c.success(Vec::new());
        let resp = c.into_response("req-1".to_string());
        assert!(resp.trace.is_none());
    }
}
