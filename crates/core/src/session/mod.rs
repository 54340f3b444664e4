//! Client sessions and the registry that fans frames out to them.
//!
//! Each accepted connection becomes one session, driven by a dedicated
//! actor thread ([`actor`]) that exclusively owns the control socket, the
//! negotiated [`Transport`] and the RTP sequence counter. Everything else
//! talks to a session through its [`SessionHandle`]: requests from the
//! receive loop, frames from [`SessionRegistry::broadcast`], and shutdown.
//!
//! ## Session lifecycle
//!
//! ```text
//! accept          -> Connected
//! SETUP           -> TransportConfigured   (only if transport allocation succeeded)
//! PLAY            -> Playing               (only from TransportConfigured)
//! TEARDOWN        -> Closed
//! read/write error -> Closed
//! ```
//!
//! PAUSE, OPTIONS, DESCRIBE and the parameter methods never change state.

pub(crate) mod actor;
pub mod transport;

use std::net::{SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, RtspError};
use crate::media::{Frame, StreamController};
use crate::server::ServerConfig;
use actor::Command;
pub use transport::{Transport, TransportMode};

/// Session state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Control connection accepted, no transport yet.
    Connected,
    /// SETUP succeeded and the transport is usable.
    TransportConfigured,
    /// Receives every broadcast frame.
    Playing,
    /// Terminal; the session's threads have finished and its sockets are released.
    Closed,
}

/// What [`SessionRegistry::broadcast`] does when delivery to one session fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BroadcastPolicy {
    /// Stop at the first failed session and report the error; sessions later
    /// in the list miss this frame.
    #[default]
    FailFast,
    /// Log the failure and keep delivering to the remaining sessions.
    SkipFailed,
}

/// Shared view of one session.
///
/// Only the session's actor mutates the state; everyone else reads it or
/// sends commands.
#[derive(Debug)]
pub struct SessionHandle {
    id: u32,
    peer_addr: SocketAddr,
    state: RwLock<SessionState>,
    transport: RwLock<TransportMode>,
    commands: Sender<Command>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl SessionHandle {
    /// 31-bit session identifier, sent in decimal in `Session:` headers.
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    pub fn state(&self) -> SessionState {
        *self.state.read()
    }

    pub fn transport_mode(&self) -> TransportMode {
        *self.transport.read()
    }

    /// Whether broadcasts reach this session.
    pub fn is_ready(&self) -> bool {
        self.state() == SessionState::Playing
    }

    /// Whether the session has fully shut down.
    pub fn is_dead(&self) -> bool {
        self.state() == SessionState::Closed
    }

    /// Hand `frame` to the session actor and wait for the send result.
    ///
    /// Returns the number of bytes written to the socket, or
    /// [`RtspError::SessionClosed`] when the actor has already stopped.
    pub fn deliver(&self, frame: Arc<Frame>) -> Result<usize> {
        let (reply, result) = crossbeam_channel::bounded(1);
        self.commands
            .send(Command::Frame { frame, reply })
            .map_err(|_| RtspError::SessionClosed(self.id))?;
        result.recv().map_err(|_| RtspError::SessionClosed(self.id))?
    }

    /// Ask the actor to close the session. Does not wait.
    pub fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown);
    }

    /// Block until the session's actor thread has exited.
    pub fn join(&self) {
        let worker = self.worker.lock().take();
        if let Some(worker) = worker
            && worker.join().is_err()
        {
            tracing::error!(session_id = self.id, "session thread panicked");
        }
    }

    pub(crate) fn set_state(&self, state: SessionState) -> SessionState {
        let mut current = self.state.write();
        let previous = std::mem::replace(&mut *current, state);
        tracing::debug!(session_id = self.id, old_state = ?previous, new_state = ?state, "state transition");
        previous
    }

    pub(crate) fn set_transport_mode(&self, mode: TransportMode) {
        *self.transport.write() = mode;
    }
}

/// Edge-triggered start/stop notifications for the controller.
///
/// Counts playing sessions; the controller hears about 0 -> 1 and 1 -> 0
/// transitions only. The count and the callback share one lock so
/// notifications are never reordered.
pub(crate) struct ReadySignal {
    playing: Mutex<usize>,
    controller: Arc<dyn StreamController>,
}

impl ReadySignal {
    pub(crate) fn new(controller: Arc<dyn StreamController>) -> Self {
        Self {
            playing: Mutex::new(0),
            controller,
        }
    }

    pub(crate) fn session_started(&self) {
        let mut playing = self.playing.lock();
        *playing += 1;
        if *playing == 1 {
            tracing::info!("first session playing, starting stream");
            self.controller.start_streaming();
        }
    }

    pub(crate) fn session_stopped(&self) {
        let mut playing = self.playing.lock();
        if *playing == 0 {
            return;
        }
        *playing -= 1;
        if *playing == 0 {
            tracing::info!("no sessions playing, stopping stream");
            self.controller.stop_streaming();
        }
    }

    pub(crate) fn playing(&self) -> usize {
        *self.playing.lock()
    }
}

/// Ordered set of live sessions.
///
/// Sessions are appended at accept time, and dead ones are pruned lazily
/// when the next client connects.
#[derive(Clone)]
pub struct SessionRegistry {
    sessions: Arc<Mutex<Vec<Arc<SessionHandle>>>>,
    signal: Arc<ReadySignal>,
    policy: BroadcastPolicy,
}

impl SessionRegistry {
    pub fn new(controller: Arc<dyn StreamController>, policy: BroadcastPolicy) -> Self {
        SessionRegistry {
            sessions: Arc::new(Mutex::new(Vec::new())),
            signal: Arc::new(ReadySignal::new(controller)),
            policy,
        }
    }

    /// Prune dead sessions, then start and register a session for `stream`.
    pub fn register(
        &self,
        stream: TcpStream,
        config: &Arc<ServerConfig>,
    ) -> Result<Arc<SessionHandle>> {
        let (session, pruned) = {
            let mut sessions = self.sessions.lock();
            let pruned = prune(&mut sessions);
            let session = actor::spawn(stream, config.clone(), self.signal.clone())?;
            sessions.push(session.clone());
            tracing::debug!(
                session_id = session.id(),
                total_sessions = sessions.len(),
                "session registered"
            );
            (session, pruned)
        };

        for dead in &pruned {
            dead.join();
        }
        if !pruned.is_empty() {
            tracing::debug!(pruned = pruned.len(), "pruned closed sessions");
        }
        Ok(session)
    }

    /// Send `frame` to every playing session, in registration order.
    ///
    /// Returns how many sessions the frame reached. Sessions that close
    /// while the broadcast is in progress are skipped silently; any other
    /// failure is handled according to the [`BroadcastPolicy`].
    pub fn broadcast(&self, frame: Frame) -> Result<usize> {
        let frame = Arc::new(frame);
        let sessions = self.sessions.lock().clone();

        let mut delivered = 0;
        for session in sessions.iter().filter(|s| s.is_ready()) {
            match session.deliver(frame.clone()) {
                Ok(_) => delivered += 1,
                Err(RtspError::SessionClosed(id)) => {
                    tracing::debug!(session_id = id, "session closed during broadcast");
                }
                Err(e) => {
                    tracing::warn!(session_id = session.id(), error = %e, "frame delivery failed");
                    if self.policy == BroadcastPolicy::FailFast {
                        return Err(e);
                    }
                }
            }
        }
        Ok(delivered)
    }

    /// Snapshot of the registered sessions, dead ones included until pruned.
    pub fn sessions(&self) -> Vec<Arc<SessionHandle>> {
        self.sessions.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }

    /// Number of sessions currently in [`SessionState::Playing`].
    pub fn playing_count(&self) -> usize {
        self.signal.playing()
    }

    /// Close every session and wait for their threads.
    pub fn shutdown_all(&self) {
        let sessions = std::mem::take(&mut *self.sessions.lock());
        for session in &sessions {
            session.shutdown();
        }
        for session in &sessions {
            session.join();
        }
        if !sessions.is_empty() {
            tracing::info!(closed = sessions.len(), "all sessions shut down");
        }
    }
}

fn prune(sessions: &mut Vec<Arc<SessionHandle>>) -> Vec<Arc<SessionHandle>> {
    let mut dead = Vec::new();
    sessions.retain(|session| {
        if session.is_dead() {
            dead.push(session.clone());
            false
        } else {
            true
        }
    });
    dead
}
