//! Per-connection queue of segments awaiting acknowledgment.

use std::collections::VecDeque;
use std::io;
use std::time::{Duration, Instant};

use super::seq::wrapping_le;

/// TCP segment queued for retransmission.
#[derive(Debug, Clone)]
pub struct PendingSegment {
    /// Cumulative acknowledgment number which retires this segment.
    ack: u32,
    /// Serialized segment, checksum included.
    bytes: Vec<u8>,
    /// When the segment was last handed to the adapter. `None` until the
    /// first successful transmission.
    last_transmit: Option<Instant>,
    /// The number of times the segment has been retransmitted.
    retry_count: usize,
}

impl PendingSegment {
    /// Returns the acknowledgment number which retires this segment.
    pub fn ack(&self) -> u32 {
        self.ack
    }

    /// Returns the serialized segment.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns when the segment was last transmitted.
    pub fn last_transmit(&self) -> Option<Instant> {
        self.last_transmit
    }

    /// Returns the number of retransmissions so far.
    pub fn retry_count(&self) -> usize {
        self.retry_count
    }
}

/// Outcome of a single [RetransmissionQueue::flush].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushOutcome {
    /// Segments transmitted for the first time.
    pub sent: usize,
    /// Segments retransmitted after the timeout elapsed.
    pub resent: usize,
    /// Transmissions the adapter rejected. Those segments stay queued.
    pub failed: usize,
}

/// Ordered list of unacknowledged segments.
///
/// Segments are appended in sequence order, so the acknowledgment numbers
/// retiring them increase from front to back and acknowledgment only ever
/// pops from the front.
#[derive(Debug, Default)]
pub struct RetransmissionQueue {
    segments: VecDeque<PendingSegment>,
}

impl RetransmissionQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a serialized segment retired by `ack`. It is transmitted on
    /// the next [flush](Self::flush).
    pub fn push(&mut self, ack: u32, bytes: Vec<u8>) {
        self.segments.push_back(PendingSegment {
            ack,
            bytes,
            last_transmit: None,
            retry_count: 0,
        });
    }

    /// Discards every segment at the front of the queue that is fully
    /// covered by the cumulative acknowledgment `ack`, returning how many were
    /// removed.
    pub fn acknowledge(&mut self, ack: u32) -> usize {
        let mut removed = 0;

        while let Some(front) = self.segments.front() {
            if !wrapping_le(front.ack, ack) {
                break;
            }

            self.segments.pop_front();
            removed += 1;
        }

        removed
    }

    /// Transmits, oldest first, every segment that was never sent or whose
    /// last transmission is at least `rto` before `now`.
    ///
    /// A segment whose transmission fails keeps its timestamp and retry count
    /// and is attempted again on the next flush.
    pub fn flush<F>(&mut self, now: Instant, rto: Duration, mut transmit: F) -> FlushOutcome
    where
        F: FnMut(&[u8]) -> io::Result<()>,
    {
        let mut outcome = FlushOutcome::default();

        for segment in self.segments.iter_mut() {
            let resend = match segment.last_transmit {
                None => false,
                Some(at) if now.saturating_duration_since(at) >= rto => true,
                // Peer still has time to ACK the segment.
                Some(_) => continue,
            };

            if transmit(&segment.bytes).is_err() {
                outcome.failed += 1;
                continue;
            }

            segment.last_transmit = Some(now);

            if resend {
                segment.retry_count += 1;
                outcome.resent += 1;
            } else {
                outcome.sent += 1;
            }
        }

        outcome
    }

    /// Returns the queued segments, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingSegment> {
        self.segments.iter()
    }

    /// Returns the number of queued segments.
    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Returns `true` if no segment awaits acknowledgment.
    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    /// Drops every queued segment.
    pub fn clear(&mut self) {
        self.segments.clear();
    }
}
