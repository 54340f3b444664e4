use std::io::{ErrorKind, Read};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::protocol::RtspRequest;
use crate::server::ServerConfig;
use crate::session::SessionRegistry;
use crate::session::actor::Command;

/// Non-blocking TCP accept loop.
///
/// Checks the `running` flag between accepts with a 50ms poll interval
/// so that [`crate::server::Server::stop`] can terminate it promptly.
pub fn accept_loop(
    listener: TcpListener,
    registry: SessionRegistry,
    config: Arc<ServerConfig>,
    running: Arc<AtomicBool>,
) {
    while running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer_addr)) => {
                if let Err(e) = stream.set_nonblocking(false) {
                    tracing::warn!(%peer_addr, error = %e, "failed to configure client socket");
                    continue;
                }
                if let Err(e) = registry.register(stream, &config) {
                    tracing::warn!(%peer_addr, error = %e, "failed to start session");
                }
            }
            Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => {
                if running.load(Ordering::SeqCst) {
                    tracing::warn!(error = %e, "TCP accept error");
                }
            }
        }
    }
    tracing::debug!("accept loop exited");
}

/// Per-session receive loop.
///
/// Each read is parsed as one complete request; there is no reassembly
/// across reads. Parsed requests go to the session actor in order.
/// Unparseable input is logged and dropped without a response. Returns once
/// the connection fails or the actor stops listening, after telling the
/// actor why.
pub(crate) fn receive_loop(
    mut stream: TcpStream,
    commands: Sender<Command>,
    max_request_size: usize,
    session_id: u32,
) {
    let mut buf = vec![0u8; max_request_size.max(1)];

    let reason = loop {
        let n = match stream.read(&mut buf) {
            Ok(0) => break "connection closed by client",
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(_) => break "read error",
        };

        match RtspRequest::parse(&buf[..n]) {
            Ok(request) => {
                if commands.send(Command::Request(request)).is_err() {
                    break "session closed";
                }
            }
            Err(e) => {
                tracing::warn!(session_id, bytes = n, error = %e, "dropping unparseable request");
            }
        }
    };

    tracing::debug!(session_id, reason, "receive loop exited");
    let _ = commands.send(Command::ReaderClosed(reason));
}
