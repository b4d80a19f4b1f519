//! Error types for the TCP engine, covering socket-level failures reported to
//! callers as well as segment parsing and construction errors.

use std::{error, fmt, io, result};

/// A convenience wrapper around `Result` for [crate::Error].
pub type Result<T> = result::Result<T, Error>;

/// Set of errors that can occur while operating a TCP connection.
#[derive(Debug)]
#[non_exhaustive]
pub enum Error {
    /// Error while handing a segment to the network adapter.
    Io(io::Error),
    /// Error parsing an inbound TCP segment.
    Parse(ParseError),
    /// Error constructing an outbound TCP segment.
    Header(HeaderError),
    /// Error reported by a connection operation.
    Socket(SocketError),
}

impl Error {
    /// Returns the [SocketError] carried by this error, if any.
    pub fn socket_error(&self) -> Option<SocketError> {
        match *self {
            Error::Socket(err) => Some(err),
            _ => None,
        }
    }
}

impl error::Error for Error {}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<ParseError> for Error {
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<HeaderError> for Error {
    fn from(err: HeaderError) -> Error {
        Error::Header(err)
    }
}

impl From<SocketError> for Error {
    fn from(err: SocketError) -> Error {
        Error::Socket(err)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Error::Io(ref err) => fmt::Display::fmt(err, f),
            Error::Parse(ref err) => fmt::Display::fmt(err, f),
            Error::Header(ref err) => fmt::Display::fmt(err, f),
            Error::Socket(ref err) => fmt::Display::fmt(err, f),
        }
    }
}

/// Failures surfaced by connection operations (`bind`, `listen`, `connect`,
/// `send`, `receive`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketError {
    /// The connection tuple is already reserved by another connection.
    AddressInUse,
    /// The requested local address does not belong to any network adapter.
    AddressNotAvailable,
    /// No route to the peer exists.
    HostUnreachable,
    /// The active open was reset before reaching `Established`.
    ConnectionRefused,
    /// The peer reset a synchronized connection.
    ConnectionReset,
    /// A blocking `connect()` was interrupted.
    Interrupted,
    /// An argument provided by the caller was invalid.
    InvalidArgument,
    /// The destination buffer is too small for the received payload.
    Fault,
    /// The connection is not in a state that can carry application data.
    NotConnected,
    /// The operation is not valid in the connection's current state.
    InvalidState,
    /// No data is queued yet and the peer has not closed its side.
    WouldBlock,
}

impl error::Error for SocketError {}

impl fmt::Display for SocketError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match *self {
            SocketError::AddressInUse => "address already in use",
            SocketError::AddressNotAvailable => "address not available",
            SocketError::HostUnreachable => "no route to host",
            SocketError::ConnectionRefused => "connection refused",
            SocketError::ConnectionReset => "connection reset by peer",
            SocketError::Interrupted => "operation interrupted",
            SocketError::InvalidArgument => "invalid argument",
            SocketError::Fault => "destination buffer too small for received payload",
            SocketError::NotConnected => "connection is not established",
            SocketError::InvalidState => "operation not valid in the current connection state",
            SocketError::WouldBlock => "operation would block",
        };

        f.write_str(msg)
    }
}

/// Error occurred while trying to parse an inbound TCP segment.
#[derive(Debug)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum ParseError {
    /// Input buffer shorter than the fixed TCP header.
    InvalidBufferLength { provided: usize, min: u16 },
    /// Invalid TCP data offset.
    InvalidDataOffset { provided: u16, min: u16, max: u16 },
    /// Mismatch between the provided and expected TCP header length.
    ///
    /// Value provided is less than `data_offset << 2`.
    HeaderLengthMismatch { provided: usize, expected: u16 },
    /// The checksum carried by the segment does not match its contents.
    InvalidChecksum { provided: u16, computed: u16 },
}

impl error::Error for ParseError {}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ParseError::InvalidBufferLength { provided, min } => {
                write!(
                    f,
                    "invalid segment length: {provided} bytes (less than minimum required {min} bytes)"
                )
            }
            ParseError::InvalidDataOffset { provided, min, max } => {
                write!(
                    f,
                    "invalid TCP data offset: {provided} (not within the valid range: {min}..={max})"
                )
            }
            ParseError::HeaderLengthMismatch { provided, expected } => {
                write!(
                    f,
                    "invalid TCP header length: {provided} bytes (less than indicated by data offset: {expected} bytes)"
                )
            }
            ParseError::InvalidChecksum { provided, computed } => {
                write!(
                    f,
                    "invalid TCP checksum: 0x{provided:04x} (computed 0x{computed:04x})"
                )
            }
        }
    }
}

/// Error occurred while trying to construct an outbound TCP segment.
#[derive(Debug)]
#[non_exhaustive]
#[allow(missing_docs)]
pub enum HeaderError {
    /// Segment length does not fit in the 16-bit pseudo-header length field.
    PayloadTooLarge { provided: usize, max: usize },
}

impl error::Error for HeaderError {}

impl fmt::Display for HeaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HeaderError::PayloadTooLarge { provided, max } => {
                write!(
                    f,
                    "failed to build TCP segment: {provided} bytes (exceeds maximum allowed {max} bytes)"
                )
            }
        }
    }
}
