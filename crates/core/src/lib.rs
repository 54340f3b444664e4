//! Live H.264 RTSP server.
//!
//! Publishes one fixed stream (`rtsp://<host>:<port>/stream/1` by default)
//! to any number of clients over TCP-interleaved or UDP RTP. The host
//! application supplies encoded frames through [`Server::push_frame`] and is
//! told through a [`StreamController`] when streaming should start and stop.
//!
//! ```no_run
//! use std::net::{IpAddr, Ipv4Addr};
//! use std::sync::Arc;
//!
//! use rtsp::{Callbacks, Server};
//!
//! let controller = Callbacks::new(|| println!("start"), || println!("stop"));
//! let mut server = Server::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 8554, Arc::new(controller));
//! server.start()?;
//! server.push_frame(0, true, &[0x65, 0x88, 0x84])?;
//! # Ok::<(), rtsp::RtspError>(())
//! ```

pub mod error;
pub mod media;
pub mod protocol;
pub mod server;
pub mod session;
pub mod stream;
pub mod transport;

pub use error::{Result, RtspError};
pub use media::{Callbacks, Frame, FrameSource, NoopController, StreamController};
pub use server::{Server, ServerConfig, Viewer};
pub use session::{BroadcastPolicy, SessionState, TransportMode};
