//! Ephemeral port allocation.

use std::net::Ipv4Addr;
use std::ops::RangeInclusive;
use std::sync::Arc;

use super::connection::Connection;
use super::route::RandomSource;
use super::table::ConnectionTable;
use super::tuple::{ConnectionTuple, Endpoint};
use crate::{Result, SocketError, debug};

/// Picks local ports for connections that were not bound to one.
#[derive(Debug, Clone)]
pub struct PortAllocator {
    first: u16,
    len: u32,
}

impl PortAllocator {
    /// Creates an allocator drawing from `range`.
    ///
    /// An empty range is treated as the single port `range.start()`.
    pub fn new(range: RangeInclusive<u16>) -> Self {
        let first = *range.start();
        let last = (*range.end()).max(first);

        Self {
            first,
            len: (last - first) as u32 + 1,
        }
    }

    /// Returns the number of ports in the range.
    pub fn len(&self) -> usize {
        self.len as usize
    }

    /// Returns `true` if the range holds no port. Never the case, the range
    /// always holds at least one port.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns every port of the range exactly once, starting at the port
    /// `offset` positions into it and wrapping from the top back to the
    /// bottom.
    pub fn scan(&self, offset: u16) -> impl Iterator<Item = u16> + use<> {
        let (first, len) = (self.first, self.len);
        let start = offset as u32 % len;

        (0..len).map(move |i| first + ((start + i) % len) as u16)
    }

    /// Finds a port for which `(local, port, peer)` is free and reserves that
    /// tuple for `connection` in `table`, all under the table's exclusive
    /// lock. The scan starts at a random port of the range.
    ///
    /// # Errors
    ///
    /// Returns [SocketError::AddressInUse] if every port of the range is
    /// taken for this peer.
    pub fn allocate(
        &self,
        table: &ConnectionTable,
        random: &dyn RandomSource,
        local: Ipv4Addr,
        peer: Endpoint,
        connection: &Arc<Connection>,
    ) -> Result<u16> {
        let candidates = self
            .scan(random.random_u16())
            .map(|port| ConnectionTuple::new(local, port, peer.addr, peer.port));

        match table.reserve_first(candidates, connection) {
            Some(tuple) => Ok(tuple.local.port),
            None => {
                debug!("[{local}:* -> {peer}] ephemeral port range exhausted");
                Err(SocketError::AddressInUse.into())
            }
        }
    }
}
