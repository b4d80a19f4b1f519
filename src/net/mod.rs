//! TCP connection engine.
//!
//! Connections are created by an [Engine], registered in its
//! [ConnectionTable], and fed inbound segments through
//! [Engine::handle_segment]. Outbound segments leave through the [Router]
//! the engine was built with.

mod connection;
mod driver;
mod engine;
mod headers;
mod intake;
mod ports;
mod retransmit;
mod route;
mod seq;
mod table;
mod tuple;

#[cfg(test)]
pub(crate) mod testing;

pub use connection::{Connection, ConnectionInfo, Direction, Role, State, Stats};
pub use driver::Driver;
pub use engine::Engine;
pub use headers::*;
pub use ports::PortAllocator;
pub use retransmit::{FlushOutcome, PendingSegment, RetransmissionQueue};
pub use route::{Adapter, RandomSource, Route, Router, ThreadRandom};
pub use seq::{is_between_wrapped, wrapping_le, wrapping_lt};
pub use table::ConnectionTable;
pub use tuple::{ConnectionTuple, Endpoint};
