//! Tunables for the TCP engine.

use std::ops::RangeInclusive;
use std::time::Duration;

/// Retransmission timeout (`RTO`). Fixed, no backoff is applied.
pub const RTO: Duration = Duration::from_millis(500);

/// Window size advertised to the peer on every outbound segment.
pub const DEFAULT_WINDOW: u16 = 64240;

/// Largest payload of a segment sent by default, fitting a 1500-byte MTU
/// under 20-byte IPv4 and TCP headers.
pub const DEFAULT_MSS: usize = 1460;

/// Largest payload a segment can carry inside a single IPv4 datagram.
pub const MAX_MSS: usize = u16::MAX as usize - 20 - 20;

/// Time-to-live handed to the adapter for outbound datagrams.
pub const DEFAULT_TTL: u8 = 64;

/// First port of the ephemeral range.
pub const EPHEMERAL_PORT_FIRST: u16 = 32768;

/// Last port (inclusive) of the ephemeral range.
pub const EPHEMERAL_PORT_LAST: u16 = 60999;

/// Backlog used when `listen()` is called with a backlog of zero.
pub const DEFAULT_BACKLOG: usize = 16;

/// Engine configuration, handed to [crate::Engine::new].
#[derive(Debug, Clone)]
pub struct Config {
    /// Delay after which an unacknowledged segment is resent.
    pub retransmission_timeout: Duration,
    /// Advertised receive window.
    pub window: u16,
    /// Largest payload carried by one outbound segment.
    pub max_segment_size: usize,
    /// IPv4 time-to-live for outbound segments.
    pub ttl: u8,
    /// Range the port allocator draws ephemeral ports from.
    pub ephemeral_ports: RangeInclusive<u16>,
    /// Backlog used when `listen(0)` is requested.
    pub default_backlog: usize,
    /// Period of the background retransmission driver.
    pub flush_interval: Duration,
    /// How long a connection lingers in `TimeWait` before it is closed.
    pub time_wait: Duration,
}

impl Config {
    /// Sets the retransmission timeout.
    pub fn with_retransmission_timeout(mut self, rto: Duration) -> Self {
        self.retransmission_timeout = rto;
        self
    }

    /// Sets the advertised receive window.
    pub fn with_window(mut self, window: u16) -> Self {
        self.window = window;
        self
    }

    /// Sets the largest payload of an outbound segment, clamped to
    /// `1..=MAX_MSS`.
    pub fn with_max_segment_size(mut self, mss: usize) -> Self {
        self.max_segment_size = mss.clamp(1, MAX_MSS);
        self
    }

    /// Sets the IPv4 time-to-live.
    pub fn with_ttl(mut self, ttl: u8) -> Self {
        self.ttl = ttl;
        self
    }

    /// Sets the ephemeral port range.
    ///
    /// An empty range is replaced by the single port `range.start()`.
    pub fn with_ephemeral_ports(mut self, range: RangeInclusive<u16>) -> Self {
        self.ephemeral_ports = if range.is_empty() {
            *range.start()..=*range.start()
        } else {
            range
        };
        self
    }

    /// Sets the backlog used for `listen(0)`.
    pub fn with_default_backlog(mut self, backlog: usize) -> Self {
        self.default_backlog = backlog.max(1);
        self
    }

    /// Sets the period of the background retransmission driver.
    pub fn with_flush_interval(mut self, interval: Duration) -> Self {
        self.flush_interval = interval;
        self
    }

    /// Sets the `TimeWait` linger duration.
    pub fn with_time_wait(mut self, time_wait: Duration) -> Self {
        self.time_wait = time_wait;
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            retransmission_timeout: RTO,
            window: DEFAULT_WINDOW,
            max_segment_size: DEFAULT_MSS,
            ttl: DEFAULT_TTL,
            ephemeral_ports: EPHEMERAL_PORT_FIRST..=EPHEMERAL_PORT_LAST,
            default_backlog: DEFAULT_BACKLOG,
            flush_interval: Duration::from_millis(100),
            time_wait: Duration::from_secs(2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = Config::default();

        assert_eq!(config.retransmission_timeout, Duration::from_millis(500));
        assert_eq!(config.ephemeral_ports, 32768..=60999);
        assert_eq!(config.ttl, 64);
    }

    #[test]
    fn segment_size_fits_ipv4_datagram() {
        assert_eq!(Config::default().max_segment_size, 1460);
        assert_eq!(Config::default().with_max_segment_size(usize::MAX).max_segment_size, 65495);
        assert_eq!(Config::default().with_max_segment_size(0).max_segment_size, 1);
    }

    #[test]
    fn empty_port_range_collapses_to_start() {
        #[allow(clippy::reversed_empty_ranges)]
        let config = Config::default().with_ephemeral_ports(5000..=4000);

        assert_eq!(config.ephemeral_ports, 5000..=5000);
    }
}
