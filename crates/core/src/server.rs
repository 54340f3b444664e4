use std::net::{IpAddr, SocketAddr, TcpListener};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};

use crate::error::{Result, RtspError};
use crate::media::{Frame, StreamController};
use crate::protocol::sdp::DEFAULT_SESSION_NAME;
use crate::session::{BroadcastPolicy, SessionRegistry, SessionState, TransportMode};
use crate::stream::{DEFAULT_STREAM_NAME, DEFAULT_STREAM_TRACK, StreamIdentity};
use crate::transport::tcp;
use crate::transport::udp::DEFAULT_RTP_PORT_BASE;

/// Largest request accepted in a single read.
pub const DEFAULT_MAX_REQUEST_SIZE: usize = 2000;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// First port tried for UDP RTP sockets; rounded up to even.
    pub rtp_port_base: u16,
    /// Receive buffer size; a request must fit in one read of this size.
    pub max_request_size: usize,
    /// First path segment of the published stream (`/<name>/<track>`).
    pub stream_name: String,
    pub stream_track: String,
    /// SDP session name (`s=`).
    pub sdp_session_name: String,
    /// Frame rate advertised in the SDP `a=framerate` attribute.
    pub framerate: f64,
    pub broadcast_policy: BroadcastPolicy,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            rtp_port_base: DEFAULT_RTP_PORT_BASE,
            max_request_size: DEFAULT_MAX_REQUEST_SIZE,
            stream_name: DEFAULT_STREAM_NAME.to_string(),
            stream_track: DEFAULT_STREAM_TRACK.to_string(),
            sdp_session_name: DEFAULT_SESSION_NAME.to_string(),
            framerate: 60.0,
            broadcast_policy: BroadcastPolicy::default(),
        }
    }
}

impl ServerConfig {
    pub fn stream(&self) -> StreamIdentity {
        StreamIdentity::new(&self.stream_name, &self.stream_track)
    }
}

/// RTSP server publishing one live H.264 stream.
///
/// Owns the listener thread and the [`SessionRegistry`]. Frames pushed with
/// [`push_frame`](Self::push_frame) are sent synchronously to every playing
/// session; the [`StreamController`] hears when the first client starts
/// playing and when the last one leaves.
pub struct Server {
    bind_addr: SocketAddr,
    local_addr: Option<SocketAddr>,
    running: Arc<AtomicBool>,
    registry: SessionRegistry,
    config: Arc<ServerConfig>,
    listener: Option<JoinHandle<()>>,
}

impl Server {
    pub fn new(ip: IpAddr, port: u16, controller: Arc<dyn StreamController>) -> Self {
        Self::with_config(ip, port, controller, ServerConfig::default())
    }

    pub fn with_config(
        ip: IpAddr,
        port: u16,
        controller: Arc<dyn StreamController>,
        config: ServerConfig,
    ) -> Self {
        Self {
            bind_addr: SocketAddr::new(ip, port),
            local_addr: None,
            running: Arc::new(AtomicBool::new(false)),
            registry: SessionRegistry::new(controller, config.broadcast_policy),
            config: Arc::new(config),
            listener: None,
        }
    }

    /// Bind the listener and start accepting clients.
    ///
    /// Failing to bind is fatal and returned as [`RtspError::Io`].
    pub fn start(&mut self) -> Result<()> {
        if self.running.load(Ordering::SeqCst) {
            return Err(RtspError::AlreadyRunning);
        }

        let listener = TcpListener::bind(self.bind_addr)?;
        listener.set_nonblocking(true)?;
        let local_addr = listener.local_addr()?;

        self.running.store(true, Ordering::SeqCst);

        let running = self.running.clone();
        let registry = self.registry.clone();
        let config = self.config.clone();

        tracing::info!(
            addr = %local_addr,
            stream = %self.config.stream().path(),
            "RTSP server listening"
        );

        let spawned = thread::Builder::new()
            .name("rtsp-listener".to_string())
            .spawn(move || tcp::accept_loop(listener, registry, config, running));
        match spawned {
            Ok(handle) => {
                self.listener = Some(handle);
                self.local_addr = Some(local_addr);
                Ok(())
            }
            Err(e) => {
                self.running.store(false, Ordering::SeqCst);
                Err(e.into())
            }
        }
    }

    /// Stop accepting clients and close every session.
    pub fn stop(&mut self) {
        let was_running = self.running.swap(false, Ordering::SeqCst);
        if let Some(listener) = self.listener.take()
            && listener.join().is_err()
        {
            tracing::error!("listener thread panicked");
        }
        self.registry.shutdown_all();
        self.local_addr = None;
        if was_running {
            tracing::info!("server stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Address the listener is bound to, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// Send one frame to every playing session.
    ///
    /// Returns the number of sessions that received it. With
    /// [`BroadcastPolicy::FailFast`] the first failed send aborts the
    /// broadcast and is returned as the error.
    pub fn push_frame(&self, timestamp: u64, is_keyframe: bool, payload: &[u8]) -> Result<usize> {
        if !self.is_running() {
            return Err(RtspError::NotStarted);
        }
        self.registry
            .broadcast(Frame::new(timestamp, is_keyframe, payload.to_vec()))
    }

    /// Snapshot of every registered session, including closed ones not yet pruned.
    pub fn viewers(&self) -> Vec<Viewer> {
        self.registry
            .sessions()
            .iter()
            .map(|session| Viewer {
                session_id: session.id(),
                peer_addr: session.peer_addr(),
                transport: session.transport_mode(),
                state: session.state(),
            })
            .collect()
    }

    /// Number of sessions currently playing.
    pub fn playing_count(&self) -> usize {
        self.registry.playing_count()
    }

    pub fn registry(&self) -> &SessionRegistry {
        &self.registry
    }

    pub fn config(&self) -> Arc<ServerConfig> {
        self.config.clone()
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Information about one client session.
#[derive(Debug, Clone)]
pub struct Viewer {
    pub session_id: u32,
    pub peer_addr: SocketAddr,
    pub transport: TransportMode,
    pub state: SessionState,
}
