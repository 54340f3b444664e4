//! Error types for the RTSP server library.

use std::fmt;

/// Errors that can occur in the RTSP server library.
///
/// Variants map to specific failure modes across the stack:
///
/// - **Protocol**: [`Parse`](Self::Parse) for malformed RTSP requests. These
///   are logged and dropped; the client gets no response.
/// - **Transport**: [`Io`](Self::Io) for socket failures, and
///   [`PortRangeExhausted`](Self::PortRangeExhausted) when no UDP port pair
///   could be bound for a session.
/// - **Session**: [`SessionClosed`](Self::SessionClosed) when a frame is
///   addressed to a session whose actor has already stopped.
/// - **Server**: [`NotStarted`](Self::NotStarted),
///   [`AlreadyRunning`](Self::AlreadyRunning).
#[derive(Debug, thiserror::Error)]
pub enum RtspError {
    /// Underlying I/O or socket error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse an RTSP request.
    #[error("RTSP parse error: {kind}")]
    Parse { kind: ParseErrorKind },

    /// [`Server::start`](crate::Server::start) has not been called yet.
    #[error("server not started")]
    NotStarted,

    /// [`Server::start`](crate::Server::start) was called while already running.
    #[error("server already running")]
    AlreadyRunning,

    /// The session's worker is gone; nothing more can be sent to it.
    #[error("session {0} is closed")]
    SessionClosed(u32),

    /// Every even port from `base` upward failed to bind an RTP/RTCP pair.
    #[error("no free RTP/RTCP port pair at or above {base}")]
    PortRangeExhausted { base: u16 },
}

/// Specific kind of RTSP parse failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Input was empty.
    EmptyRequest,
    /// No space or tab after the method within the token limit.
    UnterminatedMethod,
    /// The request line has no `RTSP/` version token.
    MissingVersion,
    /// No `CSeq:` header.
    MissingCSeq,
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyRequest => write!(f, "empty request"),
            Self::UnterminatedMethod => write!(f, "method not delimited by whitespace"),
            Self::MissingVersion => write!(f, "missing RTSP/ version token"),
            Self::MissingCSeq => write!(f, "missing CSeq header"),
        }
    }
}

impl From<ParseErrorKind> for RtspError {
    fn from(kind: ParseErrorKind) -> Self {
        RtspError::Parse { kind }
    }
}

/// Convenience alias for `Result<T, RtspError>`.
pub type Result<T> = std::result::Result<T, RtspError>;
