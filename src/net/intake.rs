//! Processing of inbound segments, per connection state.

use std::sync::Arc;

use super::connection::{Connection, Direction, Inner, State};
use super::headers::{TcpFlags, TcpSegment};
use super::seq::{is_between_wrapped, wrapping_le};
use super::tuple::ConnectionTuple;
use crate::{SocketError, debug, info};

impl Connection {
    /// Handles a segment addressed to `tuple` (local endpoint first) that
    /// the table resolved to this connection.
    pub(crate) fn on_segment(&self, tuple: &ConnectionTuple, segment: &TcpSegment<'_>) {
        let mut inner = self.inner.lock();
        let flags = segment.flags();

        inner.stats.record_in(segment.as_bytes().len());

        debug!(
            "[{}] ({:?}) received {flags} seq={} ack={} len={}",
            tuple,
            inner.state,
            segment.seq_number(),
            segment.ack_number(),
            segment.payload().len()
        );

        if flags.contains(TcpFlags::RST) {
            self.on_reset(&mut inner);
            return;
        }

        if flags.contains(TcpFlags::ACK) && inner.state != State::Listen {
            // Acknowledgments of data never sent are ignored.
            if wrapping_le(segment.ack_number(), inner.sequence_number) {
                self.acknowledge(segment.ack_number());
            } else {
                debug!(
                    "[{}] ({:?}) ack {} beyond next sequence number {}",
                    tuple,
                    inner.state,
                    segment.ack_number(),
                    inner.sequence_number
                );
            }
        }

        let state = inner.state;

        match state {
            State::Closed => {
                debug!("[{tuple}] (Closed) segment dropped");
            }
            State::Listen => {
                let child = self.create_client(&mut inner, tuple, segment);

                // The listener's lock is released before the child takes its
                // own.
                drop(inner);

                if let Some(child) = child {
                    child.accept_open();
                }
            }
            State::SynSent => self.on_syn_sent(&mut inner, segment),
            State::SynReceived => {
                if flags.contains(TcpFlags::ACK) && segment.ack_number() == inner.sequence_number {
                    self.set_state(&mut inner, State::Established);
                    self.on_synchronized(&mut inner, segment);
                } else {
                    debug!("[{tuple}] (SynReceived) waiting for ACK, {flags} dropped");
                }
            }
            State::Established
            | State::FinWait1
            | State::FinWait2
            | State::CloseWait
            | State::Closing
            | State::LastAck
            | State::TimeWait => self.on_synchronized(&mut inner, segment),
        }
    }

    fn on_reset(&self, inner: &mut Inner) {
        match inner.state {
            State::Closed | State::Listen => {
                debug!("[{}] ({:?}) RST ignored", inner.tuple, inner.state);
            }
            State::SynSent => {
                info!("[{}] (SynSent) connection refused", inner.tuple);

                inner.error = Some(SocketError::ConnectionRefused);
                self.set_state(inner, State::Closed);
            }
            _ => {
                info!("[{}] ({:?}) connection reset by peer", inner.tuple, inner.state);

                inner.error = Some(SocketError::ConnectionReset);
                self.set_state(inner, State::Closed);
            }
        }
    }

    /// Spawns a child connection for an inbound `SYN` on a listener.
    ///
    /// Returns `None` if the segment is not a bare `SYN`, the backlog is
    /// full, or the tuple is already taken.
    fn create_client(
        &self,
        listener: &mut Inner,
        tuple: &ConnectionTuple,
        segment: &TcpSegment<'_>,
    ) -> Option<Arc<Connection>> {
        let flags = segment.flags();

        if !flags.contains(TcpFlags::SYN) || flags.contains(TcpFlags::ACK) {
            debug!("[{tuple}] (Listen) expected SYN, {flags} dropped");
            return None;
        }

        if listener.pending.len() + listener.accept_queue.len() >= listener.backlog {
            debug!(
                "[{}] (Listen) backlog of {} full, SYN from {} dropped",
                listener.tuple, listener.backlog, tuple.peer
            );
            return None;
        }

        let mut inner = Inner::new();
        inner.tuple = *tuple;
        inner.direction = Direction::Incoming;
        inner.sequence_number = self.shared.random.random_u32();
        inner.ack_number = segment.seq_number().wrapping_add(1);
        inner.originator = self.downgrade();
        inner.reserved = true;

        let child = Connection::with_inner(Arc::clone(&self.shared), inner);

        if self.shared.table.reserve(*tuple, &child).is_err() {
            debug!("[{tuple}] (Listen) tuple already in use, no connection created");
            return None;
        }

        listener.pending.insert(*tuple, Arc::clone(&child));

        Some(child)
    }

    /// Answers the `SYN` that created this child connection.
    fn accept_open(&self) {
        let mut inner = self.inner.lock();

        if inner.state != State::Closed {
            return;
        }

        self.set_state(&mut inner, State::SynReceived);

        let flags = TcpFlags::SYN | TcpFlags::ACK;
        if let Err(err) = self.send_tcp_packet(&mut inner, flags, &[]) {
            debug!("[{}] (SynReceived) failed to build SYN+ACK: {err}", inner.tuple);
        }
    }

    fn on_syn_sent(&self, inner: &mut Inner, segment: &TcpSegment<'_>) {
        let flags = segment.flags();

        if !flags.contains(TcpFlags::SYN | TcpFlags::ACK)
            || segment.ack_number() != inner.sequence_number
        {
            debug!("[{}] (SynSent) expected SYN+ACK, {flags} dropped", inner.tuple);
            return;
        }

        inner.ack_number = segment.seq_number().wrapping_add(1);

        self.send_control(inner, TcpFlags::ACK);
        self.set_state(inner, State::Established);
    }

    /// Handles payload, `FIN` and acknowledgment of our `FIN` once both sides
    /// are synchronized.
    fn on_synchronized(&self, inner: &mut Inner, segment: &TcpSegment<'_>) {
        let flags = segment.flags();
        let payload = segment.payload();
        let state = inner.state;

        if flags.contains(TcpFlags::SYN) || !self.is_acceptable(inner, segment) {
            // Also answers a SYN+ACK retransmitted after our handshake ACK was
            // lost.
            debug!(
                "[{}] ({state:?}) unacceptable {flags} seq={} (expected {}), re-acknowledged",
                inner.tuple,
                segment.seq_number(),
                inner.ack_number
            );
            self.send_control(inner, TcpFlags::ACK);
            return;
        }

        let accepts_data = matches!(state, State::Established | State::FinWait1 | State::FinWait2);

        let mut need_ack = false;

        if !payload.is_empty() {
            need_ack = true;

            if accepts_data && segment.seq_number() == inner.ack_number {
                inner.ack_number = inner.ack_number.wrapping_add(payload.len() as u32);
                inner.receive_queue.push_back(payload.to_vec());
            } else {
                // No reassembly, the peer retransmits after our re-ACK.
                debug!(
                    "[{}] ({state:?}) unexpected data at seq={} (expected {}), dropped",
                    inner.tuple,
                    segment.seq_number(),
                    inner.ack_number
                );
            }
        }

        let mut fin = false;

        if flags.contains(TcpFlags::FIN) {
            need_ack = true;

            let fin_seq = segment.seq_number().wrapping_add(payload.len() as u32);

            if accepts_data && fin_seq == inner.ack_number {
                inner.ack_number = inner.ack_number.wrapping_add(1);
                inner.peer_closed = true;
                fin = true;
            }
        }

        let fin_acked = flags.contains(TcpFlags::ACK)
            && segment.ack_number() == inner.sequence_number
            && matches!(state, State::FinWait1 | State::Closing | State::LastAck);

        let next = match (state, fin, fin_acked) {
            (State::Established, true, _) => Some(State::CloseWait),
            (State::FinWait1, true, true) => Some(State::TimeWait),
            (State::FinWait1, true, false) => Some(State::Closing),
            (State::FinWait1, false, true) => Some(State::FinWait2),
            (State::FinWait2, true, _) => Some(State::TimeWait),
            (State::Closing, _, true) => Some(State::TimeWait),
            (State::LastAck, _, true) => Some(State::Closed),
            _ => None,
        };

        if need_ack {
            self.send_control(inner, TcpFlags::ACK);
        }

        if let Some(next) = next {
            self.set_state(inner, next);
        }
    }

    /// Returns `true` if the segment starts inside the receive window
    /// (RFC 793, 3.3).
    fn is_acceptable(&self, inner: &Inner, segment: &TcpSegment<'_>) -> bool {
        let seq = segment.seq_number();
        let window = u32::from(self.shared.config.window);

        seq == inner.ack_number
            || is_between_wrapped(
                inner.ack_number.wrapping_sub(1),
                seq,
                inner.ack_number.wrapping_add(window),
            )
    }

    fn send_control(&self, inner: &mut Inner, flags: TcpFlags) {
        if let Err(err) = self.send_tcp_packet(inner, flags, &[]) {
            debug!("[{}] ({:?}) failed to build {flags}: {err}", inner.tuple, inner.state);
        }
    }
}
