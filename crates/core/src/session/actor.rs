use std::io::{self, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use super::transport::{Transport, TransportHeader, TransportMode};
use super::{ReadySignal, SessionHandle, SessionState};
use crate::error::Result;
use crate::media::Frame;
use crate::media::rtp::RtpPacketizer;
use crate::protocol::handler;
use crate::protocol::{Method, RtspRequest, RtspResponse};
use crate::server::ServerConfig;
use crate::transport::tcp;
use crate::transport::udp::UdpPortPair;

/// Interleaved channel carrying RTP; RTCP would use `channel + 1`.
const RTP_CHANNEL: u8 = 0;

/// Messages processed by a session actor, in arrival order.
pub(crate) enum Command {
    /// A parsed request from the receive loop.
    Request(RtspRequest),
    /// The receive loop stopped; carries the reason.
    ReaderClosed(&'static str),
    /// Packetize and send one frame, then report the outcome.
    Frame {
        frame: Arc<Frame>,
        reply: Sender<Result<usize>>,
    },
    Shutdown,
}

/// Accept a session for `stream`: start its receive loop and its actor.
pub(crate) fn spawn(
    stream: TcpStream,
    config: Arc<ServerConfig>,
    signal: Arc<ReadySignal>,
) -> Result<Arc<SessionHandle>> {
    let peer_addr = stream.peer_addr()?;
    let server_ip = stream.local_addr()?.ip();
    let id = rand::random::<u32>() & 0x7FFF_FFFF;

    let (commands, inbox) = crossbeam_channel::unbounded();
    let reader_commands = commands.clone();

    let handle = Arc::new(SessionHandle {
        id,
        peer_addr,
        state: RwLock::new(SessionState::Connected),
        transport: RwLock::new(TransportMode::Undetermined),
        commands,
        worker: Mutex::new(None),
    });

    let actor = SessionActor {
        handle: handle.clone(),
        stream,
        inbox,
        reader: None,
        transport: None,
        packetizer: RtpPacketizer::new(),
        config,
        signal,
        server_ip,
        exit: None,
    };
    let worker = thread::Builder::new()
        .name(format!("rtsp-session-{id}"))
        .spawn(move || actor.run(reader_commands))?;
    *handle.worker.lock() = Some(worker);

    tracing::info!(session_id = id, peer = %peer_addr, "client connected");
    Ok(handle)
}

/// Owner of one session's sockets and protocol state.
struct SessionActor {
    handle: Arc<SessionHandle>,
    stream: TcpStream,
    inbox: Receiver<Command>,
    reader: Option<JoinHandle<()>>,
    transport: Option<Transport>,
    packetizer: RtpPacketizer,
    config: Arc<ServerConfig>,
    signal: Arc<ReadySignal>,
    /// Local address of the control connection, used as the UDP source.
    server_ip: IpAddr,
    exit: Option<&'static str>,
}

impl SessionActor {
    fn run(mut self, reader_commands: Sender<Command>) {
        match self.start_receive_loop(reader_commands) {
            Ok(reader) => self.reader = Some(reader),
            Err(e) => {
                tracing::error!(session_id = self.handle.id, error = %e, "failed to start receive loop");
                self.exit = Some("receive loop failed to start");
            }
        }

        while self.exit.is_none() {
            match self.inbox.recv() {
                Ok(Command::Request(request)) => self.handle_request(&request),
                Ok(Command::Frame { frame, reply }) => {
                    let result = self.send_frame(&frame);
                    let _ = reply.send(result);
                }
                Ok(Command::ReaderClosed(reason)) => self.exit = Some(reason),
                Ok(Command::Shutdown) | Err(_) => self.exit = Some("server shutting down"),
            }
        }
        self.close();
    }

    fn start_receive_loop(&self, commands: Sender<Command>) -> io::Result<JoinHandle<()>> {
        let stream = self.stream.try_clone()?;
        let max_request_size = self.config.max_request_size;
        let id = self.handle.id;
        thread::Builder::new()
            .name(format!("rtsp-recv-{id}"))
            .spawn(move || tcp::receive_loop(stream, commands, max_request_size, id))
    }

    fn handle_request(&mut self, request: &RtspRequest) {
        let id = self.handle.id;
        tracing::debug!(
            session_id = id,
            method = request.method.as_str(),
            cseq = %request.cseq,
            url = %request.url,
            "request"
        );

        let response = match request.method {
            Method::Options => handler::options(&request.cseq),
            Method::Describe => handler::describe(request, &self.config, self.server_ip),
            Method::Setup => self.setup(request),
            Method::Play => self.play(request),
            Method::Pause => handler::pause(&request.cseq),
            Method::Teardown => {
                self.exit = Some("teardown");
                handler::acknowledge(&request.cseq)
            }
            Method::GetParameter => handler::get_parameter(&request.cseq, id),
            Method::SetParameter => handler::acknowledge(&request.cseq),
            Method::Unknown => {
                tracing::debug!(session_id = id, cseq = %request.cseq, "ignoring unknown method");
                return;
            }
        };

        if let Err(e) = self.respond(&response) {
            tracing::warn!(session_id = id, error = %e, "failed to send response");
            self.exit = Some("write error");
            return;
        }

        if request.method == Method::Play {
            self.start_playing();
        }
    }

    fn respond(&mut self, response: &RtspResponse) -> io::Result<()> {
        tracing::debug!(
            session_id = self.handle.id,
            status = response.status_code,
            "response"
        );
        self.stream.write_all(response.serialize().as_bytes())
    }

    /// Negotiate the transport once; a repeated SETUP reports the existing one.
    fn setup(&mut self, request: &RtspRequest) -> RtspResponse {
        if self.transport.is_none() {
            self.transport = self.allocate_transport(request);
            if let Some(transport) = &self.transport {
                self.handle.set_transport_mode(transport.mode());
                self.handle.set_state(SessionState::TransportConfigured);
            }
        }

        let header = match &self.transport {
            Some(Transport::Interleaved { .. }) => TransportHeader::Interleaved,
            Some(Transport::Udp(pair)) => TransportHeader::Udp {
                destination: self.handle.peer_addr.ip(),
                source: self.server_ip,
                client_ports: (pair.destination().port(), pair.destination().port().wrapping_add(1)),
                server_ports: (pair.rtp_port(), pair.rtcp_port()),
            },
            None if request.transport == TransportMode::TcpInterleaved => {
                TransportHeader::Interleaved
            }
            None => TransportHeader::Udp {
                destination: self.handle.peer_addr.ip(),
                source: self.server_ip,
                client_ports: (request.client_rtp_port, request.client_rtcp_port),
                server_ports: (0, 0),
            },
        };

        handler::setup(&request.cseq, self.handle.id, &header)
    }

    fn allocate_transport(&self, request: &RtspRequest) -> Option<Transport> {
        let id = self.handle.id;
        match request.transport {
            TransportMode::TcpInterleaved => {
                tracing::info!(session_id = id, "transport: TCP interleaved");
                Some(Transport::Interleaved {
                    channel: RTP_CHANNEL,
                })
            }
            TransportMode::Udp if request.client_rtp_port == 0 => {
                tracing::warn!(session_id = id, "SETUP without usable client_port, no UDP transport");
                None
            }
            TransportMode::Udp => {
                let destination = SocketAddr::new(self.handle.peer_addr.ip(), request.client_rtp_port);
                match UdpPortPair::allocate(self.server_ip, self.config.rtp_port_base, destination) {
                    Ok(pair) => {
                        tracing::info!(
                            session_id = id,
                            %destination,
                            server_rtp_port = pair.rtp_port(),
                            server_rtcp_port = pair.rtcp_port(),
                            "transport: UDP"
                        );
                        Some(Transport::Udp(pair))
                    }
                    Err(e) => {
                        tracing::warn!(session_id = id, error = %e, "UDP transport allocation failed");
                        None
                    }
                }
            }
            TransportMode::Undetermined => None,
        }
    }

    fn play(&mut self, request: &RtspRequest) -> RtspResponse {
        if self.handle.state() == SessionState::Connected {
            tracing::warn!(session_id = self.handle.id, "PLAY without a configured transport");
        }
        handler::play(request, self.handle.id, self.packetizer.sequence())
    }

    /// Runs after the PLAY response is on the wire, so the client sees the
    /// response before the first RTP packet.
    fn start_playing(&mut self) {
        if self.handle.state() != SessionState::TransportConfigured {
            return;
        }
        self.handle.set_state(SessionState::Playing);
        tracing::info!(session_id = self.handle.id, peer = %self.handle.peer_addr, "session playing");
        self.signal.session_started();
    }

    fn send_frame(&mut self, frame: &Frame) -> Result<usize> {
        let sent = match &self.transport {
            Some(Transport::Interleaved { channel }) => {
                let packet = self.packetizer.packetize_interleaved(frame, *channel)?;
                if let Err(e) = self.stream.write_all(&packet) {
                    self.exit = Some("write error");
                    return Err(e.into());
                }
                packet.len()
            }
            Some(Transport::Udp(pair)) => {
                let packet = self.packetizer.packetize(frame);
                pair.send(&packet)?
            }
            None => {
                return Err(io::Error::new(
                    io::ErrorKind::NotConnected,
                    "no transport configured",
                )
                .into());
            }
        };

        tracing::trace!(
            session_id = self.handle.id,
            bytes = sent,
            seq = self.packetizer.sequence().wrapping_sub(1),
            "sent RTP packet"
        );
        Ok(sent)
    }

    /// Tear down in order: stop accepting commands, unblock and join the
    /// receive loop, release the sockets, then publish `Closed`.
    fn close(self) {
        let SessionActor {
            handle,
            stream,
            inbox,
            reader,
            transport,
            signal,
            exit,
            ..
        } = self;

        drop(inbox);
        let _ = stream.shutdown(Shutdown::Both);
        if let Some(reader) = reader
            && reader.join().is_err()
        {
            tracing::error!(session_id = handle.id, "receive loop panicked");
        }
        drop(transport);
        drop(stream);

        if handle.state() == SessionState::Playing {
            signal.session_stopped();
        }
        handle.set_state(SessionState::Closed);

        tracing::info!(
            session_id = handle.id,
            peer = %handle.peer_addr,
            reason = exit.unwrap_or("unknown"),
            "client disconnected"
        );
    }
}
