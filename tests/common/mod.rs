//! In-memory IPv4 network connecting engines for tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use tcp_engine::Engine;
use tcp_engine::net::{Adapter, Route, Router, TcpFlags, TcpSegment};

pub const CLIENT: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
pub const SERVER: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);

/// IPv4 datagram carrying a TCP segment.
#[derive(Debug, Clone)]
pub struct Datagram {
    pub source: Ipv4Addr,
    pub destination: Ipv4Addr,
    pub bytes: Vec<u8>,
}

impl Datagram {
    pub fn segment(&self) -> TcpSegment<'_> {
        TcpSegment::parse_verified(&self.bytes, self.source, self.destination).unwrap()
    }

    pub fn flags(&self) -> TcpFlags {
        self.segment().flags()
    }
}

/// Queue of datagrams in flight, shared by every adapter.
#[derive(Debug, Clone, Default)]
pub struct Network {
    in_flight: Arc<Mutex<VecDeque<Datagram>>>,
}

impl Network {
    /// Builds an engine whose single adapter owns `address`.
    pub fn host(&self, address: Ipv4Addr) -> Engine {
        let adapter = Arc::new(NetworkAdapter {
            address,
            network: self.clone(),
        });

        Engine::with_router(Arc::new(NetworkRouter { adapter }))
    }

    /// Number of datagrams in flight.
    pub fn len(&self) -> usize {
        self.in_flight.lock().len()
    }

    /// Removes every datagram in flight.
    pub fn take(&self) -> Vec<Datagram> {
        self.in_flight.lock().drain(..).collect()
    }

    /// Removes the oldest datagram in flight.
    pub fn next(&self) -> Option<Datagram> {
        self.in_flight.lock().pop_front()
    }

    /// Delivers the oldest datagram to the host owning its destination.
    pub fn deliver_next(&self, hosts: &[(Ipv4Addr, &Engine)]) -> Option<Datagram> {
        let datagram = self.next()?;
        deliver(&datagram, hosts);
        Some(datagram)
    }

    /// Delivers datagrams until none is in flight.
    pub fn pump(&self, hosts: &[(Ipv4Addr, &Engine)]) -> usize {
        let mut delivered = 0;
        while self.deliver_next(hosts).is_some() {
            delivered += 1;
        }
        delivered
    }
}

pub fn deliver(datagram: &Datagram, hosts: &[(Ipv4Addr, &Engine)]) {
    if let Some((_, engine)) = hosts.iter().find(|(addr, _)| *addr == datagram.destination) {
        engine
            .handle_segment(datagram.source, datagram.destination, &datagram.bytes)
            .unwrap();
    }
}

/// Polls `condition` until it holds or a few seconds passed.
pub fn wait_until(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);

    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(1));
    }

    condition()
}

#[derive(Debug)]
struct NetworkAdapter {
    address: Ipv4Addr,
    network: Network,
}

impl Adapter for NetworkAdapter {
    fn ipv4_address(&self) -> Ipv4Addr {
        self.address
    }

    fn send_ipv4(
        &self,
        _next_hop: Ipv4Addr,
        destination: Ipv4Addr,
        protocol: u8,
        payload: &[u8],
        _ttl: u8,
    ) -> io::Result<()> {
        assert_eq!(protocol, tcp_engine::net::PROTOCOL_TCP);

        self.network.in_flight.lock().push_back(Datagram {
            source: self.address,
            destination,
            bytes: payload.to_vec(),
        });

        Ok(())
    }
}

#[derive(Debug)]
struct NetworkRouter {
    adapter: Arc<NetworkAdapter>,
}

impl Router for NetworkRouter {
    fn route_to(&self, peer: Ipv4Addr, _local: Ipv4Addr) -> Option<Route> {
        // Everything in 10.0.0.0/24 is on-link.
        (peer.octets()[..3] == [10, 0, 0]).then(|| Route {
            adapter: self.adapter.clone(),
            next_hop: peer,
        })
    }

    fn adapter_for(&self, local: Ipv4Addr) -> Option<Arc<dyn Adapter>> {
        (local == self.adapter.address).then(|| self.adapter.clone() as Arc<dyn Adapter>)
    }
}
