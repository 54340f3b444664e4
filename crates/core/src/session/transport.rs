use std::fmt;
use std::net::IpAddr;

use crate::transport::udp::UdpPortPair;

/// How a session receives media, decided once by SETUP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransportMode {
    #[default]
    Undetermined,
    /// RTP framed with a 4-byte `$` header on the RTSP control connection.
    TcpInterleaved,
    /// RTP to the client's UDP port, from a server-bound RTP/RTCP port pair.
    Udp,
}

/// Media transport owned by a session worker after SETUP.
///
/// Interleaved transport needs no extra sockets; UDP holds the bound
/// server port pair for as long as the session lives.
#[derive(Debug)]
pub enum Transport {
    Interleaved { channel: u8 },
    Udp(UdpPortPair),
}

impl Transport {
    pub fn mode(&self) -> TransportMode {
        match self {
            Transport::Interleaved { .. } => TransportMode::TcpInterleaved,
            Transport::Udp(_) => TransportMode::Udp,
        }
    }
}

/// Value of the `Transport` header in a SETUP response.
///
/// ```text
/// RTP/AVP/TCP;unicast;interleaved=0-1
/// RTP/AVP;unicast;destination=10.0.0.9;source=10.0.0.5;client_port=5000-5001;server_port=6970-6971
/// ```
///
/// Server ports are reported as 0 when UDP allocation failed.
#[derive(Debug, Clone)]
pub enum TransportHeader {
    Interleaved,
    Udp {
        destination: IpAddr,
        source: IpAddr,
        client_ports: (u16, u16),
        server_ports: (u16, u16),
    },
}

impl fmt::Display for TransportHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportHeader::Interleaved => write!(f, "RTP/AVP/TCP;unicast;interleaved=0-1"),
            TransportHeader::Udp {
                destination,
                source,
                client_ports,
                server_ports,
            } => write!(
                f,
                "RTP/AVP;unicast;destination={};source={};client_port={}-{};server_port={}-{}",
                destination, source, client_ports.0, client_ports.1, server_ports.0, server_ports.1
            ),
        }
    }
}
