//! Sockets for RTSP signaling and RTP media.
//!
//! - **TCP** ([`tcp`]): the listener's accept loop and each session's
//!   receive loop. With interleaved transport, RTP also travels on the
//!   session's control connection, framed with a 4-byte `$` header.
//!
//! - **UDP** ([`udp`]): per-session RTP/RTCP port pairs, bound on even
//!   ports from 6970 upward.

pub mod tcp;
pub mod udp;

pub use udp::{DEFAULT_RTP_PORT_BASE, UdpPortPair};
