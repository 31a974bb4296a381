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

//! Server configuration, loaded with the `config` crate so a deployment can
//! layer a JSON file under environment variable overrides the same way the
//! rest of this family of daemons does.

use std::time::Duration;

use serde_derive::Deserialize;

use crate::errors::CreationError;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind endpoint for the external, caller-facing router, e.g.
    /// `tcp://0.0.0.0:7878`.
    pub front_endpoint: String,

    /// Bind endpoint for the in-process worker router, e.g.
    /// `inproc://clusterrpc-backend`.
    #[serde(default = "default_back_endpoint")]
    pub back_endpoint: String,

    /// Number of worker threads `start` spawns.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Multiplier applied to `worker_count` to size the bounded backlog.
    #[serde(default = "default_backlog_multiplier")]
    pub backlog_multiplier: usize,

    /// Socket send/receive timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// This process's name, recorded on every trace node it produces.
    #[serde(default = "default_machine")]
    pub machine: String,
}

fn default_back_endpoint() -> String { "inproc://clusterrpc-backend".to_string() }
fn default_worker_count() -> usize { 4 }
fn default_backlog_multiplier() -> usize { 50 }
fn default_timeout_ms() -> u64 { 3000 }
fn default_machine() -> String { "clusterrpc-0".to_string() }

impl ServerConfig {
    pub fn backlog_capacity(&self) -> usize { self.worker_count * self.backlog_multiplier }

    pub fn timeout(&self) -> Duration { Duration::from_millis(self.timeout_ms) }

    /// Loads configuration from an optional JSON file plus `CRPC_`-prefixed
    /// environment variable overrides, e.g. `CRPC_WORKER_COUNT=8`.
    pub fn load(path: Option<&str>) -> Result<Self, CreationError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path));
        }
        builder = builder.add_source(config::Environment::with_prefix("CRPC"));

        let built = builder
            .build()
            .map_err(|e| CreationError::InvalidParameter(e.to_string()))?;

        built
            .try_deserialize()
            .map_err(|e| CreationError::InvalidParameter(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backlog_capacity_is_worker_count_times_multiplier() {
        let cfg = ServerConfig {
            front_endpoint: "tcp://0.0.0.0:7878".to_string(),
            back_endpoint: default_back_endpoint(),
            worker_count: 4,
            backlog_multiplier: 8,
            timeout_ms: 3000,
            machine: "m".to_string(),
        };
        assert_eq!(cfg.backlog_capacity(), 32);
    }
}
