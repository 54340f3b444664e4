//! Media frames and the boundary to whatever produces them.
//!
//! The server never encodes anything itself. A host application owns the
//! encoder, and the two sides meet at three points:
//!
//! - [`Frame`]: one encoded access unit plus its timestamp, handed to
//!   [`Server::push_frame`](crate::Server::push_frame).
//! - [`StreamController`]: notified when the first client starts playing and
//!   when the last one goes away, so encoding can be switched on and off.
//! - [`FrameSource`]: a pull interface a host can implement for its encoder.
//!
//! Each frame becomes exactly one RTP packet per playing session
//! ([`rtp::RtpPacketizer`]).

pub mod annexb;
pub mod rtp;

/// One encoded video frame.
///
/// Frames are transient: a frame exists for the length of one broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Capture-clock timestamp; only the low 32 bits reach the RTP header.
    pub timestamp: u64,
    /// Informational; it does not change how the frame is sent.
    pub is_keyframe: bool,
    pub payload: Vec<u8>,
}

impl Frame {
    pub fn new(timestamp: u64, is_keyframe: bool, payload: Vec<u8>) -> Self {
        Self {
            timestamp,
            is_keyframe,
            payload,
        }
    }
}

/// Produces frames on demand.
pub trait FrameSource {
    /// The next frame, or `None` when the source is exhausted.
    fn next_frame(&mut self) -> Option<Frame>;
}

/// Receives start/stop notifications from the server.
///
/// `start_streaming` fires when the number of playing sessions goes from
/// zero to one, `stop_streaming` when it drops back to zero. Both run on a
/// session thread: they must return promptly and must not wait for a
/// [`Server::push_frame`](crate::Server::push_frame) call to finish.
pub trait StreamController: Send + Sync {
    fn start_streaming(&self);
    fn stop_streaming(&self);
}

/// [`StreamController`] built from a pair of closures.
pub struct Callbacks<S, T> {
    on_start: S,
    on_stop: T,
}

impl<S, T> Callbacks<S, T>
where
    S: Fn() + Send + Sync,
    T: Fn() + Send + Sync,
{
    pub fn new(on_start: S, on_stop: T) -> Self {
        Self { on_start, on_stop }
    }
}

impl<S, T> StreamController for Callbacks<S, T>
where
    S: Fn() + Send + Sync,
    T: Fn() + Send + Sync,
{
    fn start_streaming(&self) {
        (self.on_start)()
    }

    fn stop_streaming(&self) {
        (self.on_stop)()
    }
}

/// Controller for hosts that push frames unconditionally.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopController;

impl StreamController for NoopController {
    fn start_streaming(&self) {}
    fn stop_streaming(&self) {}
}
