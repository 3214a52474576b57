mod logging;
pub use logging::setup_logging;
mod cli;
pub use cli::Args;
mod config;
pub use config::{resolve_upstream, Config};
mod connection;
pub use connection::Connection;
mod resolver;
pub use resolver::{resolve_query, triage, Verdict};
mod server;
pub use server::DnsServer;
mod app;
pub use app::App;

use std::net::SocketAddr;

use homeblocker_rules::BlockRegistry;

/// Largest UDP message accepted from clients and upstream resolvers
pub const MAX_UDP_PACKET_SIZE: usize = 4096;

/// Shared by all workers. Built once at startup and never mutated, so no locking is needed.
pub struct State {
    pub upstream_resolver: SocketAddr,
    pub registry: BlockRegistry,
}

impl State {
    pub fn new(upstream_resolver: SocketAddr, registry: BlockRegistry) -> Self {
        State {
            upstream_resolver,
            registry,
        }
    }
}
