//! Parsing and construction of TCP segments.

mod tcp;

pub use tcp::{PROTOCOL_TCP, TcpFlags, TcpHeader, TcpSegment, checksum, verify_checksum};
