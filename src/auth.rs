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

//! Caller authentication boundary. Left mostly as an extension point: this
//! crate ships the trait and a no-op implementation, and leaves the decision
//! of what "authenticated" means (mTLS, a shared token, something else) to
//! whoever deploys a `Server`.

use crate::wire::Request;

/// Decides whether a request is allowed to reach the registry at all.
/// Called by the worker before handler dispatch, ahead of the deadline
/// check.
pub trait Authenticator: Send + Sync {
    /// Returns `Ok(())` to let the request proceed, or `Err(reason)` to have
    /// the worker synthesize a failure response with `reason` as the error
    /// message, never invoking the handler.
    fn authenticate(&self, request: &Request) -> Result<(), String>;
}

/// Accepts every request. The default when a `Server` is built without an
/// explicit `Authenticator`.
pub struct NullAuthenticator;

impl Authenticator for NullAuthenticator {
    fn authenticate(&self, _request: &Request) -> Result<(), String> { Ok(()) }
}
