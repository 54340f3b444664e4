//! RTSP signaling (RFC 2326 subset).
//!
//! A request arrives in a single read and is parsed into an
//! [`RtspRequest`]; the session actor picks the response builder from
//! [`handler`] that matches its method.
//!
//! ```text
//! DESCRIBE rtsp://server:8554/stream/1 RTSP/1.0\r\n
//! CSeq: 2\r\n
//! Accept: application/sdp\r\n
//! \r\n
//! ```
//!
//! | Method | Response | State change |
//! |--------|----------|--------------|
//! | OPTIONS | `Public` method list | none |
//! | DESCRIBE | SDP, or `404 Stream Not Found` | none |
//! | SETUP | `Transport`, `Session` | Connected -> TransportConfigured |
//! | PLAY | `Range`, `Session`, `RTP-Info` | TransportConfigured -> Playing |
//! | PAUSE | acknowledgement | none |
//! | TEARDOWN | acknowledgement | -> Closed |
//! | GET_PARAMETER / SET_PARAMETER | acknowledgement | none |
//!
//! Unparseable requests and unknown methods get no response.

pub mod handler;
pub mod request;
pub mod response;
pub mod sdp;

pub use request::{Method, RtspRequest};
pub use response::RtspResponse;
