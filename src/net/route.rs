//! Collaborators consumed by the engine: IPv4 routing, network adapters and
//! the source of randomness.

use std::fmt;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// A network interface able to carry IPv4 datagrams.
pub trait Adapter: Send + Sync {
    /// Returns the IPv4 address assigned to the adapter.
    fn ipv4_address(&self) -> Ipv4Addr;

    /// Wraps `payload` in an IPv4 datagram addressed to `destination` and
    /// transmits it towards `next_hop`.
    ///
    /// # Errors
    ///
    /// Returns an error if the datagram could not be handed to the link.
    fn send_ipv4(
        &self,
        next_hop: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: u8,
        payload: &[u8],
        ttl: u8,
    ) -> io::Result<()>;
}

/// Routing decision towards a peer.
#[derive(Clone)]
pub struct Route {
    /// Adapter the datagram leaves through.
    pub adapter: Arc<dyn Adapter>,
    /// Next hop on the adapter's link.
    pub next_hop: Ipv4Addr,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("adapter", &self.adapter.ipv4_address())
            .field("next_hop", &self.next_hop)
            .finish()
    }
}

/// IPv4 routing table.
pub trait Router: Send + Sync {
    /// Returns the route towards `peer`, preferring the adapter owning
    /// `local` when it is specified. `None` means the peer is unreachable.
    fn route_to(&self, peer: Ipv4Addr, local: Ipv4Addr) -> Option<Route>;

    /// Returns the adapter that owns the address `local`.
    fn adapter_for(&self, local: Ipv4Addr) -> Option<Arc<dyn Adapter>>;
}

/// Source of unpredictable values for port jitter and initial sequence
/// numbers.
pub trait RandomSource: Send + Sync {
    /// Returns an unpredictable `u16`.
    fn random_u16(&self) -> u16;

    /// Returns an unpredictable `u32`.
    fn random_u32(&self) -> u32;
}

/// [RandomSource] backed by the thread-local generator of the `rand` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRandom;

impl RandomSource for ThreadRandom {
    fn random_u16(&self) -> u16 {
        rand::random::<u16>()
    }

    fn random_u32(&self) -> u32 {
        rand::random::<u32>()
    }
}
