//! TCP connection state machine, as described in [RFC 793].
//!
//! [RFC 793]: https://www.rfc-editor.org/rfc/rfc793

use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::{Arc, Weak};
use std::time::Instant;
use std::{fmt, mem};

use parking_lot::{Condvar, Mutex};

use super::engine::Shared;
use super::headers::{PROTOCOL_TCP, TcpFlags, TcpHeader};
use super::retransmit::{FlushOutcome, RetransmissionQueue};
use super::route::Route;
use super::tuple::{ConnectionTuple, Endpoint};
use crate::{Result, SocketError, debug, info, warn};

/// Different TCP connection states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum State {
    /// Represents no connection state at all.
    Closed,
    /// Represents waiting for a connection request from any remote TCP and
    /// port.
    Listen,
    /// Represents waiting for a matching connection request after having sent a
    /// connection request.
    SynSent,
    /// Represents waiting for a confirming connection request acknowledgment
    /// after having both received and sent a connection request.
    SynReceived,
    /// Represents an open connection, data received can be delivered to the
    /// user. The normal state for the data transfer phase of the connection.
    Established,
    /// Represents waiting for a connection termination request from the remote
    /// TCP, or an acknowledgment of the connection termination request
    /// previously sent.
    FinWait1,
    /// Represents waiting for a connection termination request from the remote
    /// TCP.
    FinWait2,
    /// Represents waiting for a connection termination request from the local
    /// user.
    CloseWait,
    /// Represents waiting for an acknowledgment of the connection termination
    /// request previously sent to the remote TCP (which includes an
    /// acknowledgment of its connection termination request).
    LastAck,
    /// Represents waiting for a connection termination request acknowledgment
    /// from the remote TCP.
    Closing,
    /// Represents waiting for enough time to pass to be sure the remote TCP
    /// received the acknowledgment of its connection termination request.
    TimeWait,
}

impl State {
    /// Returns `true` in every state where the connection no longer accepts
    /// application writes as a live connection.
    pub fn is_disconnected(self) -> bool {
        matches!(
            self,
            State::Closed
                | State::CloseWait
                | State::LastAck
                | State::FinWait1
                | State::FinWait2
                | State::Closing
                | State::TimeWait
        )
    }
}

/// Readiness of a connection as seen by its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Neither connecting nor connected.
    None,
    /// Active open in progress.
    Connecting,
    /// Handshake completed.
    Connected,
}

/// How the connection was opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Spawned by a listener for an inbound `SYN`.
    Incoming,
    /// Opened with `connect()`.
    Outgoing,
    /// Opened with `listen()`, or not opened yet.
    Passive,
}

/// Traffic counters of a connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    /// Segments received.
    pub packets_in: u64,
    /// Bytes received, headers included.
    pub bytes_in: u64,
    /// Segments handed to the adapter.
    pub packets_out: u64,
    /// Bytes handed to the adapter, headers included.
    pub bytes_out: u64,
}

impl Stats {
    pub(super) fn record_in(&mut self, len: usize) {
        self.packets_in += 1;
        self.bytes_in += len as u64;
    }

    fn record_out(&mut self, packets: usize, len: usize) {
        self.packets_out += packets as u64;
        self.bytes_out += len as u64;
    }
}

/// Point-in-time view of a connection, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionInfo {
    /// Connection tuple.
    pub tuple: ConnectionTuple,
    /// Current state.
    pub state: State,
    /// Current role.
    pub role: Role,
    /// How the connection was opened.
    pub direction: Direction,
    /// Next sequence number to send.
    pub sequence_number: u32,
    /// Next sequence number expected from the peer.
    pub ack_number: u32,
    /// Segments awaiting acknowledgment.
    pub unacknowledged: usize,
    /// Traffic counters.
    pub stats: Stats,
}

/// Mutable state of a connection, guarded by the connection's lock.
#[derive(Debug)]
pub(super) struct Inner {
    pub(super) state: State,
    pub(super) role: Role,
    pub(super) direction: Direction,
    pub(super) tuple: ConnectionTuple,
    /// SND.NXT - next sequence number to send.
    pub(super) sequence_number: u32,
    /// RCV.NXT - next sequence number expected from the peer.
    pub(super) ack_number: u32,
    /// Registered under `tuple` in the table's `by_tuple` map.
    pub(super) reserved: bool,
    /// Held in the table's `closing` map.
    pub(super) closing: bool,
    /// Error recorded for the owner (`so_error`).
    pub(super) error: Option<SocketError>,
    interrupted: bool,
    pub(super) backlog: usize,
    /// Children spawned by a listener whose handshake is not complete.
    pub(super) pending: HashMap<ConnectionTuple, Arc<Connection>>,
    /// Children handed off and waiting for `accept()`.
    pub(super) accept_queue: VecDeque<Arc<Connection>>,
    /// Listener that spawned this connection, until the hand-off.
    pub(super) originator: Weak<Connection>,
    /// In-order payloads received from the peer.
    pub(super) receive_queue: VecDeque<Vec<u8>>,
    /// The peer's `FIN` has been received.
    pub(super) peer_closed: bool,
    time_wait_since: Option<Instant>,
    pub(super) stats: Stats,
}

impl Inner {
    pub(super) fn new() -> Self {
        Self {
            state: State::Closed,
            role: Role::None,
            direction: Direction::Passive,
            tuple: ConnectionTuple {
                local: Endpoint::UNSPECIFIED,
                peer: Endpoint::UNSPECIFIED,
            },
            sequence_number: 0,
            ack_number: 0,
            reserved: false,
            closing: false,
            error: None,
            interrupted: false,
            backlog: 0,
            pending: HashMap::new(),
            accept_queue: VecDeque::new(),
            originator: Weak::new(),
            receive_queue: VecDeque::new(),
            peer_closed: false,
            time_wait_since: None,
            stats: Stats::default(),
        }
    }
}

/// Side effects of entering a state, applied by [Connection::set_state].
#[derive(Debug, Default, PartialEq, Eq)]
struct Effects {
    /// Role of an active open becomes `Connected`, waking a blocked
    /// `connect()`.
    connect: bool,
    /// Hand the connection to the listener it was spawned from.
    hand_off: bool,
    /// Start the `TimeWait` timer.
    start_time_wait: bool,
    /// Drop unacknowledged segments and leave both tables.
    finish: bool,
}

impl Effects {
    fn of(old: State, new: State, direction: Direction) -> Self {
        match (old, new) {
            (old, new) if old == new => Effects::default(),
            (_, State::Established) => Effects {
                connect: direction == Direction::Outgoing,
                hand_off: direction == Direction::Incoming,
                ..Default::default()
            },
            (_, State::TimeWait) => Effects {
                start_time_wait: true,
                ..Default::default()
            },
            (_, State::Closed) => Effects {
                finish: true,
                ..Default::default()
            },
            _ => Effects::default(),
        }
    }
}

/// A TCP connection.
///
/// Created by [crate::Engine::socket] or, for inbound connections, by a
/// listener receiving a `SYN`. Always handled through an `Arc`.
pub struct Connection {
    pub(super) shared: Arc<Shared>,
    me: Weak<Connection>,
    pub(super) inner: Mutex<Inner>,
    state_changed: Condvar,
    retransmission: Mutex<RetransmissionQueue>,
}

impl Connection {
    pub(super) fn new(shared: Arc<Shared>) -> Arc<Self> {
        Self::with_inner(shared, Inner::new())
    }

    pub(super) fn with_inner(shared: Arc<Shared>, inner: Inner) -> Arc<Self> {
        Arc::new_cyclic(|me| Self {
            shared,
            me: me.clone(),
            inner: Mutex::new(inner),
            state_changed: Condvar::new(),
            retransmission: Mutex::new(RetransmissionQueue::new()),
        })
    }

    /// Returns a weak handle to this connection.
    pub(super) fn downgrade(&self) -> Weak<Connection> {
        self.me.clone()
    }

    fn strong(&self) -> Result<Arc<Connection>> {
        self.me.upgrade().ok_or_else(|| SocketError::InvalidState.into())
    }

    /// Binds the local end of the connection.
    ///
    /// An unspecified `addr` binds every local address; port `0` lets
    /// `listen()`/`connect()` pick an ephemeral port.
    ///
    /// # Errors
    ///
    /// - [SocketError::InvalidState] unless the connection is `Closed` and
    ///   unbound.
    /// - [SocketError::AddressNotAvailable] if no adapter owns `addr`.
    pub fn bind(&self, addr: Ipv4Addr, port: u16) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.state != State::Closed || !inner.tuple.local.is_unspecified() {
            return Err(SocketError::InvalidState.into());
        }

        if !addr.is_unspecified() && self.shared.router.adapter_for(addr).is_none() {
            return Err(SocketError::AddressNotAvailable.into());
        }

        inner.tuple.local = Endpoint::new(addr, port);

        Ok(())
    }

    /// Starts accepting inbound connections on the bound endpoint. A
    /// `backlog` of zero selects the configured default.
    ///
    /// # Errors
    ///
    /// - [SocketError::InvalidState] unless the connection is `Closed` or
    ///   already listening.
    /// - [SocketError::AddressInUse] if another connection listens on the
    ///   same endpoint.
    pub fn listen(&self, backlog: usize) -> Result<()> {
        let mut inner = self.inner.lock();

        let backlog = match backlog {
            0 => self.shared.config.default_backlog,
            n => n,
        };

        match inner.state {
            State::Listen => {
                inner.backlog = backlog;
                return Ok(());
            }
            State::Closed => {}
            _ => return Err(SocketError::InvalidState.into()),
        }

        let me = self.strong()?;
        let local = inner.tuple.local;

        let port = if local.port == 0 {
            self.shared.ports.allocate(
                &self.shared.table,
                &*self.shared.random,
                local.addr,
                Endpoint::UNSPECIFIED,
                &me,
            )?
        } else {
            let tuple = ConnectionTuple {
                local,
                peer: Endpoint::UNSPECIFIED,
            };
            self.shared.table.reserve(tuple, &me)?;
            local.port
        };

        inner.tuple = ConnectionTuple {
            local: Endpoint::new(local.addr, port),
            peer: Endpoint::UNSPECIFIED,
        };
        inner.reserved = true;
        inner.direction = Direction::Passive;
        inner.role = Role::None;
        inner.backlog = backlog;
        inner.peer_closed = false;
        inner.error = None;

        self.set_state(&mut inner, State::Listen);

        Ok(())
    }

    /// Opens a connection to `peer` by sending a `SYN`.
    ///
    /// Returns right after the `SYN` is sent unless `blocking` is set, in
    /// which case the caller is suspended until the connection reaches
    /// `Established`, fails, or is [interrupted](Self::interrupt).
    ///
    /// # Errors
    ///
    /// - [SocketError::InvalidState] unless the connection is `Closed`.
    /// - [SocketError::InvalidArgument] if `peer` is unspecified.
    /// - [SocketError::HostUnreachable] if no route to `peer` exists.
    /// - [SocketError::AddressInUse] if the tuple is taken or no ephemeral
    ///   port is free.
    /// - [SocketError::ConnectionRefused] if the peer reset the connection.
    /// - [SocketError::Interrupted] if a blocked call was interrupted.
    pub fn connect(&self, peer: Endpoint, blocking: bool) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.state != State::Closed {
            return Err(SocketError::InvalidState.into());
        }

        if peer.addr.is_unspecified() || peer.port == 0 {
            return Err(SocketError::InvalidArgument.into());
        }

        let bound = inner.tuple.local;

        let route = self
            .shared
            .router
            .route_to(peer.addr, bound.addr)
            .ok_or(SocketError::HostUnreachable)?;

        let local_addr = if bound.addr.is_unspecified() {
            route.adapter.ipv4_address()
        } else {
            bound.addr
        };

        let me = self.strong()?;

        let port = if bound.port == 0 {
            self.shared.ports.allocate(
                &self.shared.table,
                &*self.shared.random,
                local_addr,
                peer,
                &me,
            )?
        } else {
            let tuple = ConnectionTuple {
                local: Endpoint::new(local_addr, bound.port),
                peer,
            };
            self.shared.table.reserve(tuple, &me)?;
            bound.port
        };

        inner.tuple = ConnectionTuple {
            local: Endpoint::new(local_addr, port),
            peer,
        };
        inner.reserved = true;
        inner.sequence_number = self.shared.random.random_u32();
        inner.ack_number = 0;
        inner.direction = Direction::Outgoing;
        inner.role = Role::Connecting;
        inner.peer_closed = false;
        inner.error = None;
        inner.interrupted = false;

        self.set_state(&mut inner, State::SynSent);
        self.send_tcp_packet(&mut inner, TcpFlags::SYN, &[])?;

        if !blocking {
            return Ok(());
        }

        loop {
            if inner.role == Role::Connected {
                return Ok(());
            }

            if let Some(err) = inner.error.take() {
                return Err(err.into());
            }

            if mem::take(&mut inner.interrupted) {
                return Err(SocketError::Interrupted.into());
            }

            if inner.state == State::Closed {
                return Err(SocketError::ConnectionRefused.into());
            }

            // Re-validated on every wake-up.
            self.state_changed.wait(&mut inner);
        }
    }

    /// Wakes a blocked `connect()`, which then fails with
    /// [SocketError::Interrupted].
    pub fn interrupt(&self) {
        let mut inner = self.inner.lock();

        if inner.role == Role::Connecting {
            inner.interrupted = true;
            self.state_changed.notify_all();
        }
    }

    /// Pops the next connection handed off by the listener, if any.
    pub fn accept(&self) -> Option<Arc<Connection>> {
        let mut inner = self.inner.lock();

        if inner.state != State::Listen {
            return None;
        }

        inner.accept_queue.pop_front()
    }

    /// Number of handed-off connections waiting for `accept()`.
    pub fn pending_accepts(&self) -> usize {
        self.inner.lock().accept_queue.len()
    }

    /// Queues `payload` for transmission, splitting it into segments of at
    /// most [Config::max_segment_size](crate::Config::max_segment_size)
    /// bytes. Returns the number of bytes queued.
    ///
    /// # Errors
    ///
    /// Returns [SocketError::NotConnected] unless the connection is
    /// `Established` or `CloseWait`.
    pub fn send(&self, payload: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();

        if !matches!(inner.state, State::Established | State::CloseWait) {
            return Err(SocketError::NotConnected.into());
        }

        for chunk in payload.chunks(self.shared.config.max_segment_size) {
            self.send_tcp_packet(&mut inner, TcpFlags::PSH | TcpFlags::ACK, chunk)?;
        }

        Ok(payload.len())
    }

    /// Copies the next received payload into `buf`, returning its length.
    /// Returns `Ok(0)` once the peer has closed and every payload was read.
    ///
    /// # Errors
    ///
    /// - [SocketError::Fault] if `buf` is smaller than the next payload,
    ///   which stays queued.
    /// - [SocketError::WouldBlock] if nothing is queued yet.
    /// - [SocketError::ConnectionReset] once, after the peer reset the
    ///   connection and every payload was read.
    /// - [SocketError::NotConnected] if the connection never carried data.
    pub fn receive(&self, buf: &mut [u8]) -> Result<usize> {
        let mut inner = self.inner.lock();

        if let Some(front) = inner.receive_queue.front() {
            let len = front.len();

            if buf.len() < len {
                return Err(SocketError::Fault.into());
            }

            if let Some(payload) = inner.receive_queue.pop_front() {
                buf[..len].copy_from_slice(&payload);
            }

            return Ok(len);
        }

        if let Some(err) = inner.error.take() {
            return Err(err.into());
        }

        if inner.peer_closed {
            return Ok(0);
        }

        match inner.state {
            State::SynSent
            | State::SynReceived
            | State::Established
            | State::FinWait1
            | State::FinWait2 => Err(SocketError::WouldBlock.into()),
            _ => Err(SocketError::NotConnected.into()),
        }
    }

    /// Sends a `FIN` and moves to `FinWait1`. Outside `Established` this is
    /// a no-op.
    pub fn shutdown_for_writing(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.state != State::Established {
            debug!(
                "[{}] ({:?}) shutdown for writing ignored",
                inner.tuple, inner.state
            );
            return Ok(());
        }

        self.send_tcp_packet(&mut inner, TcpFlags::FIN | TcpFlags::ACK, &[])?;
        self.set_state(&mut inner, State::FinWait1);

        Ok(())
    }

    /// Closes the connection on behalf of its owner.
    ///
    /// The connection is kept alive by the table until it reaches `Closed`,
    /// so the termination handshake completes without an owner.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.inner.lock();

        if inner.state == State::Closed {
            return Ok(());
        }

        let me = self.strong()?;
        let _replaced = self.shared.table.mark_closing(inner.tuple, me);
        inner.closing = true;

        match inner.state {
            State::Established => {
                self.send_tcp_packet(&mut inner, TcpFlags::FIN | TcpFlags::ACK, &[])?;
                self.set_state(&mut inner, State::FinWait1);
            }
            State::CloseWait => {
                self.send_tcp_packet(&mut inner, TcpFlags::FIN | TcpFlags::ACK, &[])?;
                self.set_state(&mut inner, State::LastAck);
            }
            State::Listen | State::SynSent | State::SynReceived => {
                self.set_state(&mut inner, State::Closed);
            }
            _ => {}
        }

        Ok(())
    }

    /// Takes the error recorded for the connection.
    pub fn error(&self) -> Option<SocketError> {
        self.inner.lock().error.take()
    }

    /// Returns the current state.
    pub fn state(&self) -> State {
        self.inner.lock().state
    }

    /// Returns the current role.
    pub fn role(&self) -> Role {
        self.inner.lock().role
    }

    /// Returns how the connection was opened.
    pub fn direction(&self) -> Direction {
        self.inner.lock().direction
    }

    /// Returns the connection tuple.
    pub fn tuple(&self) -> ConnectionTuple {
        self.inner.lock().tuple
    }

    /// Returns the next sequence number to send.
    pub fn sequence_number(&self) -> u32 {
        self.inner.lock().sequence_number
    }

    /// Returns the next sequence number expected from the peer.
    pub fn ack_number(&self) -> u32 {
        self.inner.lock().ack_number
    }

    /// Returns the traffic counters.
    pub fn stats(&self) -> Stats {
        self.inner.lock().stats
    }

    /// Returns the number of segments awaiting acknowledgment.
    pub fn unacknowledged(&self) -> usize {
        self.retransmission.lock().len()
    }

    /// Returns `true` if the connection no longer accepts application writes
    /// as a live connection.
    pub fn protocol_is_disconnected(&self) -> bool {
        self.inner.lock().state.is_disconnected()
    }

    /// Returns a snapshot of the connection.
    pub fn info(&self) -> ConnectionInfo {
        let inner = self.inner.lock();
        let unacknowledged = self.retransmission.lock().len();

        ConnectionInfo {
            tuple: inner.tuple,
            state: inner.state,
            role: inner.role,
            direction: inner.direction,
            sequence_number: inner.sequence_number,
            ack_number: inner.ack_number,
            unacknowledged,
            stats: inner.stats,
        }
    }

    /// Transmits due segments of the retransmission queue, and closes the
    /// connection once its `TimeWait` period is over.
    pub fn send_outgoing_packets(&self, now: Instant) {
        let mut inner = self.inner.lock();

        if inner.state == State::TimeWait
            && inner.time_wait_since.is_some_and(|since| {
                now.saturating_duration_since(since) >= self.shared.config.time_wait
            })
        {
            self.set_state(&mut inner, State::Closed);
            return;
        }

        self.flush(&mut inner, now);
    }

    /// Moves the connection straight to `Closed`, dropping unacknowledged
    /// segments.
    pub(super) fn abort(&self) {
        let mut inner = self.inner.lock();

        if inner.state != State::Closed {
            info!("[{}] ({:?}) aborted", inner.tuple, inner.state);
            self.set_state(&mut inner, State::Closed);
        }
    }

    /// Moves the connection to `new`, applying the side effects of the
    /// transition.
    pub(super) fn set_state(&self, inner: &mut Inner, new: State) {
        let old = inner.state;
        if old == new {
            return;
        }

        inner.state = new;
        info!("[{}] ({old:?}) -> {new:?}", inner.tuple);

        let effects = Effects::of(old, new, inner.direction);

        if effects.connect {
            inner.role = Role::Connected;
        }

        if effects.hand_off {
            self.release_to_originator(inner);
        }

        if effects.start_time_wait {
            inner.time_wait_since = Some(Instant::now());
        }

        if effects.finish {
            self.finish(inner);
        }

        self.state_changed.notify_all();
    }

    fn finish(&self, inner: &mut Inner) {
        self.retransmission.lock().clear();

        inner.role = Role::None;
        inner.time_wait_since = None;

        if mem::take(&mut inner.closing) {
            let _released = self.shared.table.unmark_closing(&inner.tuple);
        }

        if mem::take(&mut inner.reserved) {
            self.shared.table.release_owned(&inner.tuple, self);
        }

        if let Some(originator) = mem::take(&mut inner.originator).upgrade() {
            let _child = originator.inner.lock().pending.remove(&inner.tuple);
        }

        inner.pending.clear();
        inner.accept_queue.clear();
    }

    /// Moves this connection from its listener's pending children to the
    /// listener's accept queue.
    fn release_to_originator(&self, inner: &mut Inner) {
        let Some(originator) = mem::take(&mut inner.originator).upgrade() else {
            debug!("[{}] listener gone before hand-off", inner.tuple);
            return;
        };

        let mut listener = originator.inner.lock();

        match listener.pending.remove(&inner.tuple) {
            Some(child) => {
                listener.accept_queue.push_back(child);
                originator.state_changed.notify_all();

                info!("[{}] connection ready for accept", inner.tuple);
            }
            None => debug!("[{}] not pending on listener", inner.tuple),
        }
    }

    /// Builds a segment from the current sequence numbers and sends it.
    ///
    /// `SYN` and `FIN` consume one sequence number, payload consumes its
    /// length. Segments carrying a `SYN` or payload are queued for
    /// retransmission; other control segments are sent once.
    pub(super) fn send_tcp_packet(&self, inner: &mut Inner, flags: TcpFlags, payload: &[u8]) -> Result<()> {
        let tuple = inner.tuple;

        let mut header = TcpHeader::new(
            tuple.local.port,
            tuple.peer.port,
            inner.sequence_number,
            self.shared.config.window,
        );
        header.set_flags(flags);

        if flags.contains(TcpFlags::ACK) {
            header.set_ack_number(inner.ack_number);
        }

        let bytes = header.to_segment(tuple.local.addr, tuple.peer.addr, payload)?;

        let consumed = payload.len() as u32
            + flags.contains(TcpFlags::SYN) as u32
            + flags.contains(TcpFlags::FIN) as u32;
        inner.sequence_number = inner.sequence_number.wrapping_add(consumed);

        debug!(
            "[{tuple}] ({:?}) sending {flags} seq={} ack={} len={}",
            inner.state,
            header.seq_number(),
            header.ack_number(),
            payload.len()
        );

        if flags.contains(TcpFlags::SYN) || !payload.is_empty() {
            self.retransmission
                .lock()
                .push(inner.sequence_number, bytes);
            self.flush(inner, Instant::now());
        } else {
            self.transmit_once(inner, &bytes);
        }

        Ok(())
    }

    /// Retires every queued segment covered by the cumulative `ack`.
    pub(super) fn acknowledge(&self, ack: u32) -> usize {
        self.retransmission.lock().acknowledge(ack)
    }

    fn route(&self, tuple: &ConnectionTuple) -> Option<Route> {
        self.shared.router.route_to(tuple.peer.addr, tuple.local.addr)
    }

    fn transmit_once(&self, inner: &mut Inner, bytes: &[u8]) {
        let tuple = inner.tuple;

        let Some(route) = self.route(&tuple) else {
            warn!("[{tuple}] ({:?}) no route to peer, segment dropped", inner.state);
            return;
        };

        match route.adapter.send_ipv4(
            route.next_hop,
            tuple.peer.addr,
            PROTOCOL_TCP,
            bytes,
            self.shared.config.ttl,
        ) {
            Ok(()) => inner.stats.record_out(1, bytes.len()),
            Err(err) => warn!("[{tuple}] ({:?}) failed to send segment: {err}", inner.state),
        }
    }

    /// Flushes the retransmission queue with a single route lookup.
    fn flush(&self, inner: &mut Inner, now: Instant) -> FlushOutcome {
        let tuple = inner.tuple;
        let state = inner.state;
        let mut queue = self.retransmission.lock();

        if queue.is_empty() {
            return FlushOutcome::default();
        }

        let Some(route) = self.route(&tuple) else {
            warn!("[{tuple}] ({state:?}) no route to peer, {} segment(s) kept", queue.len());
            return FlushOutcome {
                failed: queue.len(),
                ..Default::default()
            };
        };

        let config = &self.shared.config;
        let mut bytes_out = 0;

        let outcome = queue.flush(now, config.retransmission_timeout, |bytes| {
            let result = route.adapter.send_ipv4(
                route.next_hop,
                tuple.peer.addr,
                PROTOCOL_TCP,
                bytes,
                config.ttl,
            );

            match result {
                Ok(()) => bytes_out += bytes.len(),
                Err(ref err) => warn!("[{tuple}] ({state:?}) failed to send segment: {err}"),
            }

            result
        });

        drop(queue);

        if outcome.resent > 0 {
            debug!("[{tuple}] ({state:?}) retransmitted {} segment(s)", outcome.resent);
        }

        inner.stats.record_out(outcome.sent + outcome.resent, bytes_out);

        outcome
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.try_lock() {
            Some(inner) => f
                .debug_struct("Connection")
                .field("tuple", &inner.tuple)
                .field("state", &inner.state)
                .field("role", &inner.role)
                .field("direction", &inner.direction)
                .finish_non_exhaustive(),
            None => f.debug_struct("Connection").finish_non_exhaustive(),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let ptr: *const Connection = self;
        let inner = self.inner.get_mut();

        if inner.reserved {
            self.shared.table.release_owned(&inner.tuple, ptr);
            debug!("[{}] ({:?}) connection dropped", inner.tuple, inner.state);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::net::testing;

    #[test]
    fn disconnected_states() {
        let disconnected = [
            State::Closed,
            State::CloseWait,
            State::LastAck,
            State::FinWait1,
            State::FinWait2,
            State::Closing,
            State::TimeWait,
        ];

        for state in disconnected {
            assert!(state.is_disconnected(), "{state:?}");
        }

        for state in [State::Listen, State::SynSent, State::SynReceived, State::Established] {
            assert!(!state.is_disconnected(), "{state:?}");
        }
    }

    #[test]
    fn transition_effects() {
        assert_eq!(
            Effects::of(State::SynReceived, State::Established, Direction::Incoming),
            Effects {
                hand_off: true,
                ..Default::default()
            }
        );
        assert_eq!(
            Effects::of(State::SynSent, State::Established, Direction::Outgoing),
            Effects {
                connect: true,
                ..Default::default()
            }
        );
        assert!(Effects::of(State::LastAck, State::Closed, Direction::Outgoing).finish);
        assert_eq!(
            Effects::of(State::Closed, State::Closed, Direction::Passive),
            Effects::default()
        );
    }

    #[test]
    fn operations_outside_their_states_fail() {
        let engine = testing::engine();
        let connection = engine.socket();

        let err = connection.send(b"data").unwrap_err();
        assert_eq!(err.socket_error(), Some(SocketError::NotConnected));

        let err = connection.receive(&mut [0; 4]).unwrap_err();
        assert_eq!(err.socket_error(), Some(SocketError::NotConnected));

        assert!(connection.accept().is_none());

        // Lenient no-op outside `Established`.
        connection.shutdown_for_writing().unwrap();
        assert_eq!(connection.state(), State::Closed);
    }

    #[test]
    fn connect_without_route_is_unreachable() {
        let engine = testing::engine();
        let connection = engine.socket();

        let peer = Endpoint::new(Ipv4Addr::new(10, 0, 0, 2), 80);
        let err = connection.connect(peer, false).unwrap_err();

        assert_eq!(err.socket_error(), Some(SocketError::HostUnreachable));
        assert_eq!(connection.state(), State::Closed);
        assert!(engine.table().is_empty());
    }

    #[test]
    fn bind_requires_local_adapter() {
        let engine = testing::engine();
        let connection = engine.socket();

        let err = connection.bind(Ipv4Addr::new(192, 168, 1, 1), 80).unwrap_err();
        assert_eq!(err.socket_error(), Some(SocketError::AddressNotAvailable));

        connection.bind(Ipv4Addr::UNSPECIFIED, 80).unwrap();

        let err = connection.bind(Ipv4Addr::UNSPECIFIED, 81).unwrap_err();
        assert_eq!(err.socket_error(), Some(SocketError::InvalidState));
    }

    #[test]
    fn listen_registers_wildcard_tuple() {
        let engine = testing::engine();
        let listener = engine.socket();
        listener.bind(Ipv4Addr::UNSPECIFIED, 8080).unwrap();
        listener.listen(0).unwrap();

        assert_eq!(listener.state(), State::Listen);
        assert_eq!(listener.direction(), Direction::Passive);

        let tuple = listener.tuple();
        assert!(tuple.is_wildcard());
        assert!(Arc::ptr_eq(&engine.table().get(&tuple).unwrap(), &listener));

        let other = engine.socket();
        other.bind(Ipv4Addr::UNSPECIFIED, 8080).unwrap();
        let err = other.listen(4).unwrap_err();
        assert_eq!(err.socket_error(), Some(SocketError::AddressInUse));

        listener.close().unwrap();
        assert_eq!(listener.state(), State::Closed);
        assert!(engine.table().get(&tuple).is_none());
        assert_eq!(engine.table().closing_len(), 0);

        other.listen(4).unwrap();
    }

    #[test]
    fn listen_on_port_zero_picks_ephemeral_port() {
        let engine = testing::engine();
        let listener = engine.socket();
        listener.listen(1).unwrap();

        let port = listener.tuple().local.port;
        assert!(engine.config().ephemeral_ports.contains(&port));
    }

    #[test]
    fn dropping_listener_releases_tuple() {
        let engine = testing::engine();
        let listener = engine.socket();
        listener.bind(Ipv4Addr::UNSPECIFIED, 8080).unwrap();
        listener.listen(0).unwrap();

        let tuple = listener.tuple();
        drop(listener);

        assert!(engine.table().get(&tuple).is_none());
    }
}
