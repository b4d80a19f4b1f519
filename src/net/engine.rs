//! Entry point tying the connection table, routing and configuration
//! together.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Instant;

use super::connection::{Connection, ConnectionInfo};
use super::driver::Driver;
use super::headers::TcpSegment;
use super::ports::PortAllocator;
use super::route::{RandomSource, Router, ThreadRandom};
use super::table::ConnectionTable;
use super::tuple::ConnectionTuple;
use crate::config::Config;
use crate::{Result, debug, info};

/// State shared by the engine and every connection it created.
pub(crate) struct Shared {
    pub(crate) config: Config,
    pub(crate) table: ConnectionTable,
    pub(crate) ports: PortAllocator,
    pub(crate) router: Arc<dyn Router>,
    pub(crate) random: Arc<dyn RandomSource>,
}

impl fmt::Debug for Shared {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Shared")
            .field("config", &self.config)
            .field("table", &self.table)
            .field("ports", &self.ports)
            .finish_non_exhaustive()
    }
}

/// TCP engine: owns the connection table and hands out connections.
///
/// Cloning is cheap and yields a handle to the same engine.
#[derive(Debug, Clone)]
pub struct Engine {
    shared: Arc<Shared>,
}

impl Engine {
    /// Creates an engine sending through `router` and drawing initial
    /// sequence numbers and port offsets from `random`.
    pub fn new(config: Config, router: Arc<dyn Router>, random: Arc<dyn RandomSource>) -> Self {
        let ports = PortAllocator::new(config.ephemeral_ports.clone());

        Self {
            shared: Arc::new(Shared {
                config,
                table: ConnectionTable::new(),
                ports,
                router,
                random,
            }),
        }
    }

    /// Creates an engine with the default configuration and the thread-local
    /// random generator.
    pub fn with_router(router: Arc<dyn Router>) -> Self {
        Self::new(Config::default(), router, Arc::new(ThreadRandom))
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &Config {
        &self.shared.config
    }

    /// Returns the connection table.
    pub fn table(&self) -> &ConnectionTable {
        &self.shared.table
    }

    /// Creates a new connection in the `Closed` state.
    pub fn socket(&self) -> Arc<Connection> {
        Connection::new(Arc::clone(&self.shared))
    }

    /// Handles a TCP segment carried by an IPv4 datagram from `source` to
    /// `destination`.
    ///
    /// Segments failing their checksum are rejected; segments matching no
    /// connection are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment cannot be parsed or its checksum does
    /// not match.
    pub fn handle_segment(&self, source: Ipv4Addr, destination: Ipv4Addr, bytes: &[u8]) -> Result<()> {
        let segment = match TcpSegment::parse_verified(bytes, source, destination) {
            Ok(segment) => segment,
            Err(err) => {
                debug!("[{source} -> {destination}] segment dropped: {err}");
                return Err(err);
            }
        };

        let tuple = ConnectionTuple::new(destination, segment.dst_port(), source, segment.src_port());

        match self.shared.table.lookup(&tuple) {
            Some(connection) => connection.on_segment(&tuple, &segment),
            None => debug!("[{tuple}] no connection, {} dropped", segment.flags()),
        }

        Ok(())
    }

    /// Flushes the retransmission queue of every connection and closes
    /// connections whose `TimeWait` period is over.
    pub fn send_outgoing_packets(&self) {
        self.send_outgoing_packets_at(Instant::now());
    }

    /// Same as [send_outgoing_packets](Self::send_outgoing_packets), as if
    /// called at `now`.
    pub fn send_outgoing_packets_at(&self, now: Instant) {
        for connection in self.shared.table.snapshot() {
            connection.send_outgoing_packets(now);
        }
    }

    /// Calls `f` with a snapshot of every registered or closing connection.
    pub fn for_each_connection<F>(&self, mut f: F)
    where
        F: FnMut(&ConnectionInfo),
    {
        for connection in self.shared.table.snapshot() {
            f(&connection.info());
        }
    }

    /// Aborts every connection still finishing its termination handshake.
    ///
    /// Closing connections keep the engine alive, so this should be called
    /// before the last handle to the engine is dropped.
    pub fn shutdown(&self) {
        let closing = self.shared.table.drain_closing();

        if !closing.is_empty() {
            info!("shutting down, aborting {} closing connection(s)", closing.len());
        }

        for connection in closing {
            connection.abort();
        }
    }

    /// Spawns a thread calling [send_outgoing_packets](Self::send_outgoing_packets)
    /// every [Config::flush_interval].
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_driver(&self) -> io::Result<Driver> {
        Driver::spawn(self.clone())
    }
}
