//! Identifying TCP connections through their local and peer endpoints.

use std::fmt;
use std::net::Ipv4Addr;

/// An IPv4 address and a port number.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct Endpoint {
    /// IPv4 address.
    pub addr: Ipv4Addr,
    /// Port number.
    pub port: u16,
}

impl Endpoint {
    /// The all-zero endpoint (`0.0.0.0:0`).
    pub const UNSPECIFIED: Endpoint = Endpoint::new(Ipv4Addr::UNSPECIFIED, 0);

    /// Creates a new endpoint.
    pub const fn new(addr: Ipv4Addr, port: u16) -> Self {
        Self { addr, port }
    }

    /// Returns `true` if both the address and the port are zero.
    pub fn is_unspecified(&self) -> bool {
        self.addr.is_unspecified() && self.port == 0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.addr, self.port)
    }
}

/// Unique TCP connection, identified by both the local and the peer
/// endpoints.
///
/// A tuple whose peer is [Endpoint::UNSPECIFIED] is a wildcard: it belongs to
/// a listening connection and matches any peer.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub struct ConnectionTuple {
    /// The local endpoint (our IP and port).
    pub local: Endpoint,
    /// The peer endpoint (remote IP and port).
    pub peer: Endpoint,
}

impl ConnectionTuple {
    /// Creates a new tuple from its four components.
    pub const fn new(
        local_addr: Ipv4Addr,
        local_port: u16,
        peer_addr: Ipv4Addr,
        peer_port: u16,
    ) -> Self {
        Self {
            local: Endpoint::new(local_addr, local_port),
            peer: Endpoint::new(peer_addr, peer_port),
        }
    }

    /// Returns the tuple with the peer replaced by the wildcard peer.
    pub fn with_wildcard_peer(&self) -> Self {
        Self {
            local: self.local,
            peer: Endpoint::UNSPECIFIED,
        }
    }

    /// Returns the tuple matching any local address and any peer on the same
    /// local port.
    pub fn any_local(&self) -> Self {
        Self::new(Ipv4Addr::UNSPECIFIED, self.local.port, Ipv4Addr::UNSPECIFIED, 0)
    }

    /// Returns `true` if the peer is the wildcard peer.
    pub fn is_wildcard(&self) -> bool {
        self.peer.is_unspecified()
    }
}

impl fmt::Display for ConnectionTuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.local, self.peer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tuple_display() {
        let tuple = ConnectionTuple::new(Ipv4Addr::new(10, 0, 0, 1), 80, Ipv4Addr::new(10, 0, 0, 2), 1234);

        assert_eq!(tuple.to_string(), "10.0.0.1:80 -> 10.0.0.2:1234");
    }

    #[test]
    fn wildcard_forms() {
        let tuple = ConnectionTuple::new(Ipv4Addr::new(10, 0, 0, 1), 80, Ipv4Addr::new(10, 0, 0, 2), 1234);

        assert!(!tuple.is_wildcard());
        assert!(tuple.with_wildcard_peer().is_wildcard());
        assert_eq!(tuple.with_wildcard_peer().local, tuple.local);
        assert_eq!(
            tuple.any_local(),
            ConnectionTuple::new(Ipv4Addr::UNSPECIFIED, 80, Ipv4Addr::UNSPECIFIED, 0)
        );
    }
}
