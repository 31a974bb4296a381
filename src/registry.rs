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

//! The (service, procedure) -> handler mapping.
//!
//! Mutated only before `Server::start`; read concurrently by every worker
//! thread afterwards. Concurrent mutation during serving is not supported.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use fnv::FnvHashMap;

use crate::context::Context;

/// The service name reserved for built-in endpoints. Handlers may not
/// register under this name themselves.
pub const RESERVED_SERVICE: &str = "ClusterRPC";

pub type Handler = Box<dyn Fn(&mut Context) + Send + Sync>;

#[derive(Debug, PartialEq, Eq)]
pub enum RegistryError {
    AlreadyRegistered(String, String),
    NotFound(String, String),
    ReservedService(String),
}

impl std::fmt::Display for RegistryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RegistryError::AlreadyRegistered(s, p) => write!(f, "{}.{} is already registered", s, p),
            RegistryError::NotFound(s, p) => write!(f, "{}.{} is not registered", s, p),
            RegistryError::ReservedService(s) => write!(f, "service name '{}' is reserved", s),
        }
    }
}

impl std::error::Error for RegistryError {}

pub struct Registry {
    handlers: FnvHashMap<(String, String), Handler>,
}

impl Registry {
    /// Builds a registry with the two built-ins already present. `lameduck`
    /// is shared with the server so the health endpoint reflects the live
    /// flag rather than a snapshot taken at construction time.
    pub fn new(lameduck: Arc<AtomicBool>) -> Self {
        let mut registry = Registry {
            handlers: FnvHashMap::default(),
        };

        registry
            .register_builtin(RESERVED_SERVICE, "Health", move |ctx: &mut Context| {
                if lameduck.load(Ordering::Relaxed) {
                    ctx.fail("lameduck");
                } else {
                    ctx.success(Vec::new());
                }
            })
            .expect("built-in registration cannot collide");

        registry
            .register_builtin(RESERVED_SERVICE, "Ping", |ctx: &mut Context| {
                ctx.success(Vec::new());
            })
            .expect("built-in registration cannot collide");

        registry
    }

    fn register_builtin<F>(&mut self, service: &str, procedure: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        let key = (service.to_string(), procedure.to_string());
        self.handlers.insert(key, Box::new(handler));
        Ok(())
    }

    /// Registers a user handler under `service.procedure`. Rejects
    /// re-registration of an existing pair and registration under the
    /// reserved built-in service name.
    pub fn register<F>(&mut self, service: &str, procedure: &str, handler: F) -> Result<(), RegistryError>
    where
        F: Fn(&mut Context) + Send + Sync + 'static,
    {
        if service == RESERVED_SERVICE {
            return Err(RegistryError::ReservedService(service.to_string()));
        }

        let key = (service.to_string(), procedure.to_string());
        if self.handlers.contains_key(&key) {
            return Err(RegistryError::AlreadyRegistered(service.to_string(), procedure.to_string()));
        }

        self.handlers.insert(key, Box::new(handler));
        Ok(())
    }

    pub fn unregister(&mut self, service: &str, procedure: &str) -> Result<(), RegistryError> {
        let key = (service.to_string(), procedure.to_string());
        if self.handlers.remove(&key).is_none() {
            return Err(RegistryError::NotFound(service.to_string(), procedure.to_string()));
        }
        Ok(())
    }

    pub fn lookup(&self, service: &str, procedure: &str) -> Option<&Handler> {
        self.handlers.get(&(service.to_string(), procedure.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> Registry { Registry::new(Arc::new(AtomicBool::new(false))) }

    #[test]
    fn builtins_are_present_at_construction() {
        let r = registry();
        assert!(r.lookup(RESERVED_SERVICE, "Health").is_some());
        assert!(r.lookup(RESERVED_SERVICE, "Ping").is_some());
    }

    #[test]
    fn register_then_lookup_round_trips() {
        let mut r = registry();
        r.register("Echo", "Call", |ctx| {
            let input = ctx.input().to_vec();
            ctx.success(input);
        })
        .unwrap();
        assert!(r.lookup("Echo", "Call").is_some());
        assert!(r.lookup("Echo", "Missing").is_none());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let mut r = registry();
        r.register("X", "F", |ctx| ctx.success(Vec::new())).unwrap();
        let err = r.register("X", "F", |ctx| ctx.success(Vec::new())).unwrap_err();
        assert_eq!(err, RegistryError::AlreadyRegistered("X".to_string(), "F".to_string()));
    }

    #[test]
    fn cannot_register_under_reserved_service() {
        let mut r = registry();
        let err = r.register(RESERVED_SERVICE, "Whatever", |ctx| ctx.success(Vec::new())).unwrap_err();
        assert_eq!(err, RegistryError::ReservedService(RESERVED_SERVICE.to_string()));
    }

    #[test]
    fn unregister_unknown_is_an_error() {
        let mut r = registry();
        let err = r.unregister("Nope", "Nope").unwrap_err();
        assert_eq!(err, RegistryError::NotFound("Nope".to_string(), "Nope".to_string()));
    }

    #[test]
    fn unregister_then_lookup_fails() {
        let mut r = registry();
        r.register("X", "F", |ctx| ctx.success(Vec::new())).unwrap();
        r.unregister("X", "F").unwrap();
        assert!(r.lookup("X", "F").is_none());
    }

    #[test]
    fn health_reflects_lameduck_flag() {
        let lameduck = Arc::new(AtomicBool::new(false));
        let r = Registry::new(lameduck.clone());
        let handler = r.lookup(RESERVED_SERVICE, "Health").unwrap();

        let mut ctx = Context::new(Vec::new(), "ClusterRPC.Health".to_string(), "m".to_string(), false);
        handler(&mut ctx);
        let resp = ctx.into_response("r".to_string());
        assert_eq!(resp.status, crate::wire::Status::Ok);

        lameduck.store(true, Ordering::Relaxed);
        let mut ctx = Context::new(Vec::new(), "ClusterRPC.Health".to_string(), "m".to_string(), false);
        handler(&mut ctx);
        let resp = ctx.into_response("r".to_string());
        assert_eq!(resp.status, crate::wire::Status::NotOk);
    }

    #[test]
    fn ping_always_returns_ok() {
        let r = registry();
        let handler = r.lookup(RESERVED_SERVICE, "Ping").unwrap();
        let mut ctx = Context::new(Vec::new(), "ClusterRPC.Ping".to_string(), "m".to_string(), false);
        handler(&mut ctx);
        let resp = ctx.into_response("r".to_string());
        assert_eq!(resp.status, crate::wire::Status::Ok);
        assert_eq!(resp.payload, Some(Vec::new()));
    }
}
