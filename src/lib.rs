//! TCP connection engine, built for learning purposes: connection state
//! machine, retransmission, connection table and segment codec over an
//! abstract IPv4 layer.
//!
//! The IPv4 layer is supplied by the caller through the [net::Router] and
//! [net::Adapter] traits; inbound segments are handed to
//! [net::Engine::handle_segment].
//!
//! Not suitable for production use.

#![warn(missing_docs, missing_debug_implementations, rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod log;
pub mod net;

pub use config::Config;
pub use error::{Error, HeaderError, ParseError, Result, SocketError};
pub use net::{Connection, Engine};
