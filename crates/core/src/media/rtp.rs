use std::io;

use super::Frame;
use crate::error::Result;

/// Length of the RTP fixed header (no CSRCs, no extension).
pub const RTP_HEADER_LEN: usize = 12;

/// Length of the `$`-framing prefix used for TCP-interleaved RTP.
pub const INTERLEAVED_HEADER_LEN: usize = 4;

/// Dynamic payload type advertised for H.264 in the SDP.
pub const PAYLOAD_TYPE: u8 = 96;

/// Fixed synchronization source identifier for the single stream.
pub const SSRC: u32 = 0x13F9_7E67;

/// RTP packetizer for one session (RFC 3550 §5.1).
///
/// ```text
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       Sequence Number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           Timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                             SSRC                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// Every frame becomes exactly one packet: V=2, no padding, no extension,
/// no CSRCs, marker set, payload type 96. The timestamp is the low 32 bits
/// of the frame timestamp. The payload is copied unmodified; frames larger
/// than the path MTU are not fragmented.
///
/// The sequence number is session-local, starts at 0 and advances (wrapping)
/// once per packet built.
#[derive(Debug)]
pub struct RtpPacketizer {
    pt: u8,
    ssrc: u32,
    sequence: u16,
}

impl RtpPacketizer {
    pub fn new() -> Self {
        Self::with_ssrc(PAYLOAD_TYPE, SSRC)
    }

    pub fn with_ssrc(pt: u8, ssrc: u32) -> Self {
        Self {
            pt,
            ssrc,
            sequence: 0,
        }
    }

    /// Sequence number the next packet will carry.
    pub fn sequence(&self) -> u16 {
        self.sequence
    }

    /// Serialize the fixed header for `timestamp` and advance the sequence number.
    pub fn write_header(&mut self, timestamp: u64) -> [u8; RTP_HEADER_LEN] {
        let mut header = [0u8; RTP_HEADER_LEN];
        header[0] = 2 << 6;
        header[1] = 0x80 | self.pt;
        header[2..4].copy_from_slice(&self.sequence.to_be_bytes());
        header[4..8].copy_from_slice(&(timestamp as u32).to_be_bytes());
        header[8..12].copy_from_slice(&self.ssrc.to_be_bytes());

        self.sequence = self.sequence.wrapping_add(1);
        header
    }

    /// Build the RTP packet for `frame` (header + payload) for UDP delivery.
    pub fn packetize(&mut self, frame: &Frame) -> Vec<u8> {
        let mut packet = Vec::with_capacity(RTP_HEADER_LEN + frame.payload.len());
        packet.extend_from_slice(&self.write_header(frame.timestamp));
        packet.extend_from_slice(&frame.payload);
        packet
    }

    /// Build the packet prefixed with `$`, `channel` and the 16-bit packet length.
    ///
    /// Fails without consuming a sequence number when the packet does not fit
    /// the 16-bit length field.
    pub fn packetize_interleaved(&mut self, frame: &Frame, channel: u8) -> Result<Vec<u8>> {
        let rtp_len = RTP_HEADER_LEN + frame.payload.len();
        let len = u16::try_from(rtp_len).map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("{rtp_len}-byte RTP packet exceeds interleaved framing limit"),
            )
        })?;

        let mut packet = Vec::with_capacity(INTERLEAVED_HEADER_LEN + rtp_len);
        packet.push(b'$');
        packet.push(channel);
        packet.extend_from_slice(&len.to_be_bytes());
        packet.extend_from_slice(&self.write_header(frame.timestamp));
        packet.extend_from_slice(&frame.payload);
        Ok(packet)
    }
}

impl Default for RtpPacketizer {
    fn default() -> Self {
        Self::new()
    }
}

/// Fields of a received RTP fixed header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RtpHeader {
    pub version: u8,
    pub marker: bool,
    pub payload_type: u8,
    pub sequence: u16,
    pub timestamp: u32,
    pub ssrc: u32,
}

impl RtpHeader {
    /// Read the fixed header from the start of `packet`.
    pub fn parse(packet: &[u8]) -> Option<Self> {
        let header = packet.get(..RTP_HEADER_LEN)?;
        Some(RtpHeader {
            version: header[0] >> 6,
            marker: header[1] & 0x80 != 0,
            payload_type: header[1] & 0x7f,
            sequence: u16::from_be_bytes([header[2], header[3]]),
            timestamp: u32::from_be_bytes([header[4], header[5], header[6], header[7]]),
            ssrc: u32::from_be_bytes([header[8], header[9], header[10], header[11]]),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(timestamp: u64, payload: &[u8]) -> Frame {
        Frame::new(timestamp, false, payload.to_vec())
    }

    #[test]
    fn fixed_header_bytes() {
        let mut p = RtpPacketizer::new();
        let packet = p.packetize(&frame(0, &[0xAB]));
        assert_eq!(packet[0], 0x80);
        assert_eq!(packet[1], 0xE0);
        assert_eq!(&packet[8..12], &[0x13, 0xF9, 0x7E, 0x67]);
        assert_eq!(&packet[12..], &[0xAB]);
    }

    #[test]
    fn header_round_trip_keeps_low_timestamp_bits() {
        let mut p = RtpPacketizer::new();
        let ts = 0x1234_5678_9ABC_DEF0u64;
        let header = RtpHeader::parse(&p.packetize(&frame(ts, &[]))).unwrap();
        assert_eq!(header.version, 2);
        assert!(header.marker);
        assert_eq!(header.payload_type, PAYLOAD_TYPE);
        assert_eq!(header.timestamp, (ts % (1u64 << 32)) as u32);
        assert_eq!(header.ssrc, SSRC);
    }

    #[test]
    fn sequence_increments_per_packet() {
        let mut p = RtpPacketizer::new();
        for expected in 0..5u16 {
            let header = RtpHeader::parse(&p.packetize(&frame(0, &[1, 2]))).unwrap();
            assert_eq!(header.sequence, expected);
        }
        assert_eq!(p.sequence(), 5);
    }

    #[test]
    fn sequence_wraps() {
        let mut p = RtpPacketizer::new();
        p.sequence = u16::MAX;
        let header = RtpHeader::parse(&p.packetize(&frame(0, &[]))).unwrap();
        assert_eq!(header.sequence, u16::MAX);
        assert_eq!(p.sequence(), 0);
    }

    #[test]
    fn interleaved_prefix() {
        let mut p = RtpPacketizer::new();
        let payload = vec![0x65; 300];
        let packet = p.packetize_interleaved(&frame(90_000, &payload), 0).unwrap();
        assert_eq!(packet[0], b'$');
        assert_eq!(packet[1], 0);
        assert_eq!(u16::from_be_bytes([packet[2], packet[3]]) as usize, 12 + 300);
        assert_eq!(packet.len(), 4 + 12 + 300);

        let header = RtpHeader::parse(&packet[INTERLEAVED_HEADER_LEN..]).unwrap();
        assert_eq!(header.timestamp, 90_000);
        assert_eq!(header.sequence, 0);
    }

    #[test]
    fn oversized_interleaved_frame_keeps_sequence() {
        let mut p = RtpPacketizer::new();
        let payload = vec![0; u16::MAX as usize];
        assert!(p.packetize_interleaved(&frame(0, &payload), 0).is_err());
        assert_eq!(p.sequence(), 0);
    }

    #[test]
    fn large_udp_payload_is_not_fragmented() {
        let mut p = RtpPacketizer::new();
        let payload = vec![0x41; 4000];
        assert_eq!(p.packetize(&frame(0, &payload)).len(), 12 + 4000);
    }

    #[test]
    fn parse_rejects_short_buffer() {
        assert!(RtpHeader::parse(&[0x80, 0xE0, 0, 1]).is_none());
    }
}
