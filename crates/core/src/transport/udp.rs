use std::net::{IpAddr, SocketAddr, UdpSocket};

use crate::error::{Result, RtspError};

/// First even port tried for server RTP sockets.
pub const DEFAULT_RTP_PORT_BASE: u16 = 6970;

/// Exclusive upper bound for RTP candidates, leaving room for RTCP at `P + 1`.
const RTP_PORT_LIMIT: u16 = 0xFFFE;

/// A bound server-side RTP/RTCP socket pair for one UDP session.
///
/// Ports stay reserved until the pair is dropped, so concurrently configured
/// sessions always hold disjoint pairs. No RTCP messages are produced; the
/// RTCP socket only reserves its port.
#[derive(Debug)]
pub struct UdpPortPair {
    rtp: UdpSocket,
    _rtcp: UdpSocket,
    rtp_port: u16,
    rtcp_port: u16,
    destination: SocketAddr,
}

impl UdpPortPair {
    /// Bind the first free even/odd pair at or above `base` on `server_ip`.
    ///
    /// For each even candidate `P`, RTP is bound at `P` and RTCP at `P + 1`;
    /// if RTCP fails the RTP socket is released and the scan moves on.
    /// `destination` is the client's RTP address.
    pub fn allocate(server_ip: IpAddr, base: u16, destination: SocketAddr) -> Result<Self> {
        let start = base.saturating_add(base % 2);

        for port in (start..RTP_PORT_LIMIT).step_by(2) {
            let rtp = match UdpSocket::bind((server_ip, port)) {
                Ok(socket) => socket,
                Err(_) => continue,
            };
            let rtcp = match UdpSocket::bind((server_ip, port + 1)) {
                Ok(socket) => socket,
                Err(e) => {
                    tracing::trace!(port = port + 1, error = %e, "RTCP port busy, releasing RTP port");
                    drop(rtp);
                    continue;
                }
            };

            tracing::debug!(rtp_port = port, rtcp_port = port + 1, %destination, "UDP port pair bound");
            return Ok(UdpPortPair {
                rtp,
                _rtcp: rtcp,
                rtp_port: port,
                rtcp_port: port + 1,
                destination,
            });
        }

        Err(RtspError::PortRangeExhausted { base })
    }

    pub fn rtp_port(&self) -> u16 {
        self.rtp_port
    }

    pub fn rtcp_port(&self) -> u16 {
        self.rtcp_port
    }

    pub fn destination(&self) -> SocketAddr {
        self.destination
    }

    /// Send one RTP packet to the client's RTP port.
    pub fn send(&self, packet: &[u8]) -> Result<usize> {
        Ok(self.rtp.send_to(packet, self.destination)?)
    }
}
