//! Test doubles for the engine's collaborators.

use std::io;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use super::engine::Engine;
use super::route::{Adapter, RandomSource, Route, Router};
use crate::config::Config;

/// Address of the loopback adapter.
pub const LOCAL: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

/// Segments handed to the loopback adapter.
#[derive(Debug, Clone, Default)]
pub struct Wire(Arc<Mutex<Vec<Vec<u8>>>>);

impl Wire {
    /// Removes and returns every captured segment.
    pub fn take(&self) -> Vec<Vec<u8>> {
        std::mem::take(&mut *self.0.lock())
    }

    /// Returns the number of captured segments.
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }
}

#[derive(Debug)]
struct LoopbackAdapter {
    wire: Wire,
}

impl Adapter for LoopbackAdapter {
    fn ipv4_address(&self) -> Ipv4Addr {
        LOCAL
    }

    fn send_ipv4(&self, _: Ipv4Addr, _: Ipv4Addr, _: u8, payload: &[u8], _: u8) -> io::Result<()> {
        self.wire.0.lock().push(payload.to_vec());
        Ok(())
    }
}

/// Routes every peer through a single capturing adapter owning [LOCAL].
#[derive(Debug)]
struct LoopbackRouter {
    adapter: Arc<LoopbackAdapter>,
}

impl Router for LoopbackRouter {
    fn route_to(&self, peer: Ipv4Addr, _: Ipv4Addr) -> Option<Route> {
        Some(Route {
            adapter: self.adapter.clone(),
            next_hop: peer,
        })
    }

    fn adapter_for(&self, local: Ipv4Addr) -> Option<Arc<dyn Adapter>> {
        (local == LOCAL).then(|| self.adapter.clone() as Arc<dyn Adapter>)
    }
}

/// Router without any route or adapter.
#[derive(Debug)]
struct NullRouter;

impl Router for NullRouter {
    fn route_to(&self, _: Ipv4Addr, _: Ipv4Addr) -> Option<Route> {
        None
    }

    fn adapter_for(&self, _: Ipv4Addr) -> Option<Arc<dyn Adapter>> {
        None
    }
}

/// Deterministic [RandomSource] counting up from zero.
#[derive(Debug, Default)]
pub struct SeqRandom(AtomicU32);

impl RandomSource for SeqRandom {
    fn random_u16(&self) -> u16 {
        self.0.fetch_add(1, Ordering::Relaxed) as u16
    }

    fn random_u32(&self) -> u32 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}

/// Engine that cannot reach anything.
pub fn engine() -> Engine {
    Engine::new(Config::default(), Arc::new(NullRouter), Arc::new(SeqRandom::default()))
}

/// Engine whose segments are captured on the returned [Wire].
pub fn loopback_engine() -> (Engine, Wire) {
    loopback_engine_with(Config::default())
}

/// [loopback_engine] with a custom configuration.
pub fn loopback_engine_with(config: Config) -> (Engine, Wire) {
    let wire = Wire::default();
    let router = LoopbackRouter {
        adapter: Arc::new(LoopbackAdapter { wire: wire.clone() }),
    };

    let engine = Engine::new(config, Arc::new(router), Arc::new(SeqRandom::default()));

    (engine, wire)
}
