use std::fmt;
use std::net::Ipv4Addr;
use std::ops::{BitOr, BitOrAssign};

use crate::{Error, HeaderError, ParseError, Result};

/// IP protocol number for TCP.
pub const PROTOCOL_TCP: u8 = 6;

/// Control bits of a TCP segment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TcpFlags(u8);

impl TcpFlags {
    /// No more data from sender.
    pub const FIN: TcpFlags = TcpFlags(1 << 0);
    /// Synchronize sequence numbers.
    pub const SYN: TcpFlags = TcpFlags(1 << 1);
    /// Reset the connection.
    pub const RST: TcpFlags = TcpFlags(1 << 2);
    /// Push function.
    pub const PSH: TcpFlags = TcpFlags(1 << 3);
    /// Acknowledgment field significant.
    pub const ACK: TcpFlags = TcpFlags(1 << 4);
    /// Urgent pointer field significant.
    pub const URG: TcpFlags = TcpFlags(1 << 5);

    /// Returns an empty set of flags.
    pub const fn empty() -> Self {
        TcpFlags(0)
    }

    /// Creates flags from the low 6 bits of `bits`.
    pub const fn from_bits(bits: u8) -> Self {
        TcpFlags(bits & 0b0011_1111)
    }

    /// Returns the raw control bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every flag in `other` is also set in `self`.
    pub const fn contains(self, other: TcpFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for TcpFlags {
    type Output = TcpFlags;

    fn bitor(self, rhs: TcpFlags) -> TcpFlags {
        TcpFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for TcpFlags {
    fn bitor_assign(&mut self, rhs: TcpFlags) {
        self.0 |= rhs.0;
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(TcpFlags, &str); 6] = [
            (TcpFlags::URG, "URG"),
            (TcpFlags::ACK, "ACK"),
            (TcpFlags::PSH, "PSH"),
            (TcpFlags::RST, "RST"),
            (TcpFlags::SYN, "SYN"),
            (TcpFlags::FIN, "FIN"),
        ];

        let mut first = true;
        for (flag, name) in NAMES {
            if self.contains(flag) {
                if !first {
                    f.write_str("|")?;
                }
                f.write_str(name)?;
                first = false;
            }
        }

        if first {
            f.write_str("-")?;
        }

        Ok(())
    }
}

/// TCP Segment Header.
///
/// RFC 793 (3.1)
///
/// ```text
///   0                   1                   2                   3
///     0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |          Source Port          |       Destination Port        |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |                        Sequence Number                        |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |                    Acknowledgment Number                      |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |  Data |           |U|A|P|R|S|F|                               |
///    | Offset| Reserved  |R|C|S|S|Y|I|            Window             |
///    |       |           |G|K|H|T|N|N|                               |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |           Checksum            |         Urgent Pointer        |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
///    |                             data                              |
///    +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Options are never emitted. Inbound options are skipped using the data
/// offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TcpHeader {
    /// The source port number.
    src_port: u16,
    /// The destination port number.
    dst_port: u16,
    /// The sequence number of the first data octet in this segment
    /// (except when SYN is present). If SYN is present the sequence number is
    /// the initial sequence number (ISN) and the first data octet is ISN+1.
    seq_number: u32,
    /// If the ACK control bit is set this field contains the value of the next
    /// sequence number the sender of the segment is expecting to receive.
    ack_number: u32,
    /// Data offset (4 bits), reserved (6 bits) and control bits (6 bits).
    offset_and_control_bits: u16,
    /// The number of data octets beginning with the one indicated in the
    /// acknowledgment field which the sender of this segment is willing to
    /// accept.
    window: u16,
    /// The 16 bit one's complement of the one's complement sum of the pseudo
    /// header, TCP header, and payload.
    checksum: u16,
    /// Current value of the urgent pointer as a positive offset from the
    /// sequence number in this segment.
    urgent_pointer: u16,
}

impl TcpHeader {
    /// Length of the fixed TCP header in bytes. This is the only header
    /// length emitted.
    pub const HEADER_LEN: usize = 20;

    /// Maximum length of an inbound TCP header in bytes (data offset 15).
    pub const MAX_HEADER_LEN: usize = 60;

    /// Minimum data offset of a TCP header.
    pub const MIN_DATA_OFFSET: u16 = 5;

    /// Maximum data offset of a TCP header.
    pub const MAX_DATA_OFFSET: u16 = 15;

    /// Largest segment (header and payload) whose length still fits in the
    /// pseudo-header length field.
    pub const MAX_SEGMENT_LEN: usize = u16::MAX as usize;

    /// Creates a new TCP header with the specified source and destination
    /// ports, sequence number, and window size, while setting default values
    /// for other fields.
    pub fn new(src_port: u16, dst_port: u16, seq_number: u32, window: u16) -> Self {
        Self {
            src_port,
            dst_port,
            seq_number,
            window,
            ..Default::default()
        }
    }

    /// Returns the `source port` field of the TCP header.
    pub fn src_port(&self) -> u16 {
        self.src_port
    }

    /// Returns the `destination port` field of the TCP header.
    pub fn dst_port(&self) -> u16 {
        self.dst_port
    }

    /// Returns the `sequence number` field of the TCP header.
    pub fn seq_number(&self) -> u32 {
        self.seq_number
    }

    /// Returns the `acknowledgment number` field of the TCP header.
    pub fn ack_number(&self) -> u32 {
        self.ack_number
    }

    /// Sets the `acknowledgment number` field of the TCP header.
    pub fn set_ack_number(&mut self, ack: u32) {
        self.ack_number = ack;
    }

    /// Returns the `data offset` field of the TCP header, in 32-bit words.
    pub fn data_offset(&self) -> u8 {
        // Stored in the higher 4 bits.
        (self.offset_and_control_bits >> 12) as u8
    }

    /// Returns the length of the TCP header in bytes, as indicated by the
    /// data offset.
    pub fn header_len(&self) -> usize {
        (self.data_offset() as usize) << 2
    }

    /// Returns the control bits of the TCP header.
    pub fn flags(&self) -> TcpFlags {
        TcpFlags::from_bits(self.offset_and_control_bits as u8)
    }

    /// Sets the given control bits, keeping the ones already set.
    pub fn set_flags(&mut self, flags: TcpFlags) {
        self.offset_and_control_bits |= flags.bits() as u16;
    }

    /// Returns `true` if the ACK (Acknowledgment) control bit is set.
    pub fn ack(&self) -> bool {
        self.flags().contains(TcpFlags::ACK)
    }

    /// Returns `true` if the RST (Reset) control bit is set.
    pub fn rst(&self) -> bool {
        self.flags().contains(TcpFlags::RST)
    }

    /// Returns `true` if the SYN (Synchronize) control bit is set.
    pub fn syn(&self) -> bool {
        self.flags().contains(TcpFlags::SYN)
    }

    /// Returns `true` if the FIN (Finish) control bit is set.
    pub fn fin(&self) -> bool {
        self.flags().contains(TcpFlags::FIN)
    }

    /// Returns the `window` field of the TCP header.
    pub fn window(&self) -> u16 {
        self.window
    }

    /// Returns the `checksum` field of the TCP header.
    pub fn checksum(&self) -> u16 {
        self.checksum
    }

    /// Returns the `urgent pointer` field of the TCP header.
    pub fn urgent_pointer(&self) -> u16 {
        self.urgent_pointer
    }

    /// Returns the fixed 20-byte header in big-endian (network) byte order.
    ///
    /// The data offset written is always [Self::MIN_DATA_OFFSET], since
    /// options are never emitted.
    pub fn to_be_bytes(&self) -> [u8; Self::HEADER_LEN] {
        let mut raw = [0u8; Self::HEADER_LEN];

        let offset_and_control_bits =
            (Self::MIN_DATA_OFFSET << 12) | (self.offset_and_control_bits & 0x0FFF);

        raw[0..2].copy_from_slice(&self.src_port.to_be_bytes());
        raw[2..4].copy_from_slice(&self.dst_port.to_be_bytes());
        raw[4..8].copy_from_slice(&self.seq_number.to_be_bytes());
        raw[8..12].copy_from_slice(&self.ack_number.to_be_bytes());
        raw[12..14].copy_from_slice(&offset_and_control_bits.to_be_bytes());
        raw[14..16].copy_from_slice(&self.window.to_be_bytes());
        raw[16..18].copy_from_slice(&self.checksum.to_be_bytes());
        raw[18..20].copy_from_slice(&self.urgent_pointer.to_be_bytes());

        raw
    }

    /// Serializes the header followed by `payload` into an owned buffer of
    /// exactly the required size, computing and embedding the checksum over
    /// the pseudo-header built from `src` and `dst`.
    ///
    /// # Errors
    ///
    /// Returns an error if the segment is too large to describe in the
    /// pseudo-header length field.
    pub fn to_segment(&mut self, src: Ipv4Addr, dst: Ipv4Addr, payload: &[u8]) -> Result<Vec<u8>> {
        let total_len = Self::HEADER_LEN + payload.len();

        if total_len > Self::MAX_SEGMENT_LEN {
            return Err(Error::Header(HeaderError::PayloadTooLarge {
                provided: total_len,
                max: Self::MAX_SEGMENT_LEN,
            }));
        }

        self.offset_and_control_bits =
            (Self::MIN_DATA_OFFSET << 12) | (self.offset_and_control_bits & 0x0FFF);
        self.checksum = 0;
        self.checksum = checksum(src, dst, &self.to_be_bytes(), payload);

        let mut buf = Vec::with_capacity(total_len);
        buf.extend_from_slice(&self.to_be_bytes());
        buf.extend_from_slice(payload);

        Ok(buf)
    }
}

impl TryFrom<&[u8]> for TcpHeader {
    type Error = Error;

    fn try_from(header_raw: &[u8]) -> Result<Self> {
        if header_raw.len() < Self::HEADER_LEN {
            return Err(Error::Parse(ParseError::InvalidBufferLength {
                provided: header_raw.len(),
                min: Self::HEADER_LEN as u16,
            }));
        }

        let offset_and_control_bits = u16::from_be_bytes([header_raw[12], header_raw[13]]);
        let data_offset = offset_and_control_bits >> 12;

        if data_offset < Self::MIN_DATA_OFFSET {
            return Err(Error::Parse(ParseError::InvalidDataOffset {
                provided: data_offset,
                min: Self::MIN_DATA_OFFSET,
                max: Self::MAX_DATA_OFFSET,
            }));
        }

        // There are less bytes in the buffer than advertised by data offset.
        if (data_offset << 2) as usize > header_raw.len() {
            return Err(Error::Parse(ParseError::HeaderLengthMismatch {
                provided: header_raw.len(),
                expected: data_offset << 2,
            }));
        }

        Ok(Self {
            src_port: u16::from_be_bytes([header_raw[0], header_raw[1]]),
            dst_port: u16::from_be_bytes([header_raw[2], header_raw[3]]),
            seq_number: u32::from_be_bytes([
                header_raw[4],
                header_raw[5],
                header_raw[6],
                header_raw[7],
            ]),
            ack_number: u32::from_be_bytes([
                header_raw[8],
                header_raw[9],
                header_raw[10],
                header_raw[11],
            ]),
            offset_and_control_bits,
            window: u16::from_be_bytes([header_raw[14], header_raw[15]]),
            checksum: u16::from_be_bytes([header_raw[16], header_raw[17]]),
            urgent_pointer: u16::from_be_bytes([header_raw[18], header_raw[19]]),
        })
    }
}

impl Default for TcpHeader {
    fn default() -> Self {
        Self {
            src_port: 0,
            dst_port: 0,
            seq_number: 0,
            ack_number: 0,
            // Bits 0..4 (Data Offset) = 5, everything else cleared.
            offset_and_control_bits: 0b0101_000000_000000,
            window: 0,
            checksum: 0,
            urgent_pointer: 0,
        }
    }
}

/// View over an inbound TCP segment. The header is decoded; the payload is
/// borrowed from the input buffer.
#[derive(Debug, Clone, Copy)]
pub struct TcpSegment<'a> {
    header: TcpHeader,
    raw: &'a [u8],
}

impl<'a> TcpSegment<'a> {
    /// Parses `raw` as a TCP segment, skipping any options indicated by the
    /// data offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the buffer is shorter than the fixed header or the
    /// length indicated by the data offset.
    pub fn parse(raw: &'a [u8]) -> Result<Self> {
        let header = TcpHeader::try_from(raw)?;

        Ok(Self { header, raw })
    }

    /// Parses `raw` and checks its checksum against the pseudo-header built
    /// from `src` and `dst` (the addresses of the datagram carrying it).
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the checksum does not match.
    pub fn parse_verified(raw: &'a [u8], src: Ipv4Addr, dst: Ipv4Addr) -> Result<Self> {
        let segment = Self::parse(raw)?;

        if !verify_checksum(src, dst, raw) {
            return Err(Error::Parse(ParseError::InvalidChecksum {
                provided: segment.header.checksum(),
                computed: checksum(src, dst, &raw[..segment.header.header_len()], segment.payload()),
            }));
        }

        Ok(segment)
    }

    /// Returns the decoded header.
    pub fn header(&self) -> &TcpHeader {
        &self.header
    }

    /// Returns the control bits.
    pub fn flags(&self) -> TcpFlags {
        self.header.flags()
    }

    /// Returns the sequence number.
    pub fn seq_number(&self) -> u32 {
        self.header.seq_number()
    }

    /// Returns the acknowledgment number.
    pub fn ack_number(&self) -> u32 {
        self.header.ack_number()
    }

    /// Returns the advertised window.
    pub fn window(&self) -> u16 {
        self.header.window()
    }

    /// Returns the source port.
    pub fn src_port(&self) -> u16 {
        self.header.src_port()
    }

    /// Returns the destination port.
    pub fn dst_port(&self) -> u16 {
        self.header.dst_port()
    }

    /// Returns the payload, starting at `data_offset * 4`.
    pub fn payload(&self) -> &'a [u8] {
        &self.raw[self.header.header_len()..]
    }

    /// Returns the whole segment as received.
    pub fn as_bytes(&self) -> &'a [u8] {
        self.raw
    }
}

/// Computes the TCP checksum of a segment.
///
/// The checksum field is the 16 bit one's complement of the one's complement
/// sum of all 16 bit words in the pseudo header, TCP header, and payload. For
/// purposes of computing the checksum, the value of the checksum field
/// (`header[16..18]`) is taken to be zero.
///
/// ```text
///        +--------+--------+--------+--------+
///        |           Source Address          |
///        +--------+--------+--------+--------+
///        |         Destination Address       |
///        +--------+--------+--------+--------+
///        |  zero  |  PTCL  |    TCP Length   |
///        +--------+--------+--------+--------+
/// ```
pub fn checksum(src: Ipv4Addr, dst: Ipv4Addr, header: &[u8], payload: &[u8]) -> u16 {
    let pseudo_header = pseudo_header(src, dst, header.len() + payload.len());

    let header_bytes = header
        .iter()
        .enumerate()
        .map(|(i, byte)| if i == 16 || i == 17 { 0 } else { *byte });

    // Chain together byte slices so each can be processed together.
    !ones_complement_sum(
        pseudo_header
            .iter()
            .copied()
            .chain(header_bytes)
            .chain(payload.iter().copied()),
    )
}

/// Returns `true` if the checksum embedded in `segment` is valid, i.e. the
/// one's complement sum over the pseudo-header and the segment, checksum
/// field included, is `0xFFFF`.
pub fn verify_checksum(src: Ipv4Addr, dst: Ipv4Addr, segment: &[u8]) -> bool {
    let pseudo_header = pseudo_header(src, dst, segment.len());

    !ones_complement_sum(
        pseudo_header
            .iter()
            .copied()
            .chain(segment.iter().copied()),
    ) == 0
}

fn pseudo_header(src: Ipv4Addr, dst: Ipv4Addr, tcp_len: usize) -> [u8; 12] {
    let mut pseudo_header = [0u8; 12];

    pseudo_header[0..4].copy_from_slice(&src.octets());
    pseudo_header[4..8].copy_from_slice(&dst.octets());
    pseudo_header[8] = 0;
    pseudo_header[9] = PROTOCOL_TCP;
    pseudo_header[10..12].copy_from_slice(&(tcp_len as u16).to_be_bytes());

    pseudo_header
}

/// One's complement sum of big-endian 16-bit words, with an odd trailing
/// byte padded on the right with zero.
fn ones_complement_sum(mut bytes: impl Iterator<Item = u8>) -> u16 {
    let mut sum = 0u32;

    loop {
        let word = match (bytes.next(), bytes.next()) {
            (Some(h), Some(l)) => u16::from_be_bytes([h, l]),
            (Some(h), None) => u16::from_be_bytes([h, 0x00]),
            _ => break,
        };

        sum += word as u32;

        // Handle potential overflow with carry folding.
        if sum > 0xFFFF {
            sum = (sum & 0xFFFF) + (sum >> 16);
        }
    }

    while sum > 0xFFFF {
        sum = (sum & 0xFFFF) + (sum >> 16);
    }

    sum as u16
}

#[cfg(test)]
mod tests {
    use super::*;

    const SRC: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 1);
    const DST: Ipv4Addr = Ipv4Addr::new(192, 168, 0, 44);

    #[test]
    fn tcp_header_basic_valid() {
        // SYN with 20 bytes of options (data offset 10).
        let header_bytes: [u8; 40] = [
            0xa0, 0x16, 0x01, 0xbb, 0xbc, 0xbb, 0x54, 0xa8, 0x00, 0x00, 0x00, 0x00, 0xa0, 0x02,
            0xfa, 0xf0, 0xbb, 0x4c, 0x00, 0x00, 0x02, 0x04, 0x05, 0xb4, 0x04, 0x02, 0x08, 0x0a,
            0x78, 0x27, 0xe4, 0xe7, 0x00, 0x00, 0x00, 0x00, 0x01, 0x03, 0x03, 0x07,
        ];

        let segment = TcpSegment::parse(&header_bytes[..]).unwrap();
        let header = segment.header();

        assert_eq!(header.src_port(), 40982);
        assert_eq!(header.dst_port(), 443);
        assert_eq!(header.seq_number(), 3166393512);
        assert_eq!(header.ack_number(), 0);
        assert_eq!(header.data_offset(), 10);
        assert_eq!(header.header_len(), 40);
        assert_eq!(segment.flags(), TcpFlags::SYN);
        assert_eq!(header.window(), 64240);
        assert_eq!(header.checksum(), 0xBB4C);

        // Options are skipped rather than read as payload.
        assert!(segment.payload().is_empty());
    }

    #[test]
    fn tcp_header_checksum_matches_captured_segment() {
        // Captured SYN from 192.168.0.1 to 192.168.0.44.
        let header_bytes: [u8; 40] = [
            0xa0, 0x16, 0x01, 0xbb, 0xbc, 0xbb, 0x54, 0xa8, 0x00, 0x00, 0x00, 0x00, 0xa0, 0x02,
            0xfa, 0xf0, 0xbb, 0x4c, 0x00, 0x00, 0x02, 0x04, 0x05, 0xb4, 0x04, 0x02, 0x08, 0x0a,
            0x78, 0x27, 0xe4, 0xe7, 0x00, 0x00, 0x00, 0x00, 0x01, 0x03, 0x03, 0x07,
        ];

        assert_eq!(checksum(SRC, DST, &header_bytes, &[]), 0xBB4C);
        assert!(verify_checksum(SRC, DST, &header_bytes));

        let mut corrupted = header_bytes;
        corrupted[8] = 22;

        assert!(!verify_checksum(SRC, DST, &corrupted));
    }

    #[test]
    fn built_segment_verifies_with_odd_payload() {
        let mut header = TcpHeader::new(1234, 80, 0xDEAD_BEEF, 4096);
        header.set_flags(TcpFlags::PSH | TcpFlags::ACK);
        header.set_ack_number(77);

        let payload = b"hello";
        let bytes = header.to_segment(SRC, DST, payload).unwrap();

        assert_eq!(bytes.len(), TcpHeader::HEADER_LEN + payload.len());
        assert!(verify_checksum(SRC, DST, &bytes));

        // The stored checksum equals the one computed with the field zeroed.
        let stored = u16::from_be_bytes([bytes[16], bytes[17]]);
        assert_eq!(
            stored,
            checksum(SRC, DST, &bytes[..TcpHeader::HEADER_LEN], payload)
        );

        // Swapping the pseudo-header addresses is detected.
        assert!(!verify_checksum(DST, Ipv4Addr::new(10, 0, 0, 1), &bytes));
    }

    #[test]
    fn built_segment_parses_back() {
        let mut header = TcpHeader::new(40000, 80, 1000, 512);
        header.set_flags(TcpFlags::FIN | TcpFlags::ACK);
        header.set_ack_number(2000);

        let bytes = header.to_segment(SRC, DST, &[1, 2, 3]).unwrap();
        let segment = TcpSegment::parse_verified(&bytes, SRC, DST).unwrap();

        assert_eq!(segment.header().data_offset(), 5);
        assert_eq!(segment.flags(), TcpFlags::FIN | TcpFlags::ACK);
        assert_eq!(segment.seq_number(), 1000);
        assert_eq!(segment.ack_number(), 2000);
        assert_eq!(segment.window(), 512);
        assert_eq!(segment.payload(), &[1, 2, 3]);
    }

    #[test]
    fn parse_verified_rejects_bad_checksum() {
        let mut header = TcpHeader::new(40000, 80, 1, 512);
        header.set_flags(TcpFlags::SYN);

        let mut bytes = header.to_segment(SRC, DST, &[]).unwrap();
        bytes[4] ^= 0xFF;

        let err = TcpSegment::parse_verified(&bytes, SRC, DST).unwrap_err();
        assert!(matches!(err, Error::Parse(ParseError::InvalidChecksum { .. })));
    }

    #[test]
    fn tcp_header_flags_bit_isolation_valid() {
        for bits in 0u8..=0b0011_1111 {
            let mut header_bytes = TcpHeader::new(1, 2, 3, 4).to_be_bytes();
            header_bytes[13] = bits;

            let header = TcpHeader::try_from(&header_bytes[..]).unwrap();
            let flags = header.flags();

            assert_eq!(flags.bits(), bits, "flags failed for {bits:06b}");
            assert_eq!(header.ack(), bits & 0b0001_0000 != 0);
            assert_eq!(header.rst(), bits & 0b0000_0100 != 0);
            assert_eq!(header.syn(), bits & 0b0000_0010 != 0);
            assert_eq!(header.fin(), bits & 0b0000_0001 != 0);
        }
    }

    #[test]
    fn tcp_header_short_buffer_invalid() {
        let header_bytes = [0u8; 19];

        assert!(matches!(
            TcpHeader::try_from(&header_bytes[..]),
            Err(Error::Parse(ParseError::InvalidBufferLength { provided: 19, .. }))
        ));
    }

    #[test]
    fn tcp_header_data_offset_invalid() {
        let mut header_bytes = TcpHeader::new(1, 2, 3, 4).to_be_bytes();

        // Data offset of 4 is below the fixed header.
        header_bytes[12] = 0x40;
        assert!(matches!(
            TcpHeader::try_from(&header_bytes[..]),
            Err(Error::Parse(ParseError::InvalidDataOffset { provided: 4, .. }))
        ));

        // Data offset of 6 needs 24 bytes.
        header_bytes[12] = 0x60;
        assert!(matches!(
            TcpHeader::try_from(&header_bytes[..]),
            Err(Error::Parse(ParseError::HeaderLengthMismatch { expected: 24, .. }))
        ));
    }

    #[test]
    fn flags_display() {
        assert_eq!((TcpFlags::FIN | TcpFlags::ACK).to_string(), "ACK|FIN");
        assert_eq!(TcpFlags::empty().to_string(), "-");
    }
}
