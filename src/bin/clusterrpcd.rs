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

//! The `clusterrpcd` binary hosts a bare `Server` built straight from
//! configuration: no handlers of its own beyond the built-in `Health`/`Ping`
//! pair, with `SIGUSR1`/`SIGUSR2` wired to lameduck/loadshed and
//! `SIGINT`/`SIGTERM` to a clean stop. Real deployments embed `Server`
//! directly and register their own procedures before calling `start`; this
//! binary exists so the crate is runnable on its own for smoke-testing a
//! configuration and for operators who only need the built-ins.

use std::env;
use std::process;

use signal_hook::consts::{SIGINT, SIGTERM, SIGUSR1, SIGUSR2};
use signal_hook::iterator::Signals;

use clusterrpc::config::ServerConfig;
use clusterrpc::logging;
use clusterrpc::server::Server;

fn main() {
    logging::init();

    let config_path = env::args().nth(1);
    let config = match ServerConfig::load(config_path.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("[clusterrpcd] failed to load configuration: {}", e);
            process::exit(1);
        },
    };

    let mut server = match Server::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[clusterrpcd] failed to construct server: {}", e);
            process::exit(1);
        },
    };

    if let Err(e) = server.start() {
        log::error!("[clusterrpcd] failed to start: {}", e);
        process::exit(1);
    }

    let mut signals = match Signals::new([SIGINT, SIGTERM, SIGUSR1, SIGUSR2]) {
        Ok(s) => s,
        Err(e) => {
            log::error!("[clusterrpcd] failed to install signal handlers: {}", e);
            process::exit(1);
        },
    };

    for signal in signals.forever() {
        match signal {
            SIGUSR1 => {
                log::info!("[clusterrpcd] SIGUSR1 received, entering lameduck");
                server.set_lameduck(true);
            },
            SIGUSR2 => {
                log::info!("[clusterrpcd] SIGUSR2 received, shedding load");
                server.set_loadshed(true);
            },
            SIGINT | SIGTERM => {
                log::info!("[clusterrpcd] shutdown signal received");
                break;
            },
            _ => {},
        }
    }

    if let Err(e) = server.stop() {
        log::error!("[clusterrpcd] error during stop: {}", e);
        process::exit(1);
    }
}
