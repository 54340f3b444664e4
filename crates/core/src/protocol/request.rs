use crate::error::{ParseErrorKind, Result};
use crate::session::transport::TransportMode;

/// Longest method token accepted before giving up on the request line.
pub const MAX_TOKEN_LEN: usize = 200;

/// RTSP methods understood by the server.
///
/// Classification is by case-sensitive substring match on the method token,
/// checked in declaration order, so `XSETUPX` still reads as [`Method::Setup`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Options,
    Describe,
    Setup,
    Play,
    Teardown,
    Pause,
    GetParameter,
    SetParameter,
    Unknown,
}

impl Method {
    const KEYWORDS: [(&'static str, Method); 8] = [
        ("OPTIONS", Method::Options),
        ("DESCRIBE", Method::Describe),
        ("SETUP", Method::Setup),
        ("PLAY", Method::Play),
        ("TEARDOWN", Method::Teardown),
        ("PAUSE", Method::Pause),
        ("GET_PARAMETER", Method::GetParameter),
        ("SET_PARAMETER", Method::SetParameter),
    ];

    pub fn classify(token: &str) -> Self {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| token.contains(keyword))
            .map(|(_, method)| *method)
            .unwrap_or(Method::Unknown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Options => "OPTIONS",
            Method::Describe => "DESCRIBE",
            Method::Setup => "SETUP",
            Method::Play => "PLAY",
            Method::Teardown => "TEARDOWN",
            Method::Pause => "PAUSE",
            Method::GetParameter => "GET_PARAMETER",
            Method::SetParameter => "SET_PARAMETER",
            Method::Unknown => "UNKNOWN",
        }
    }
}

/// A parsed RTSP request.
///
/// A request must arrive in a single read; there is no reassembly across
/// partial reads. Parsing extracts exactly what the session state machine
/// needs:
///
/// ```text
/// SETUP rtsp://10.0.0.5:8554/stream/1 RTSP/1.0\r\n
///       ^^^^^^^ ^^^^^^^^^^^^ ^^^^^^ ^
///       scheme  host_port    pre    suffix
/// CSeq: 3\r\n                               -> cseq (echoed verbatim)
/// Transport: RTP/AVP;unicast;client_port=5000-5001\r\n
///                                            -> client_rtp_port / rtcp = rtp + 1
/// \r\n
/// ```
#[derive(Debug, Clone)]
pub struct RtspRequest {
    pub method: Method,
    /// Request URL exactly as written on the request line.
    pub url: String,
    /// `host[:port]` following `rtsp://`, empty when the URL has none.
    pub host_port: String,
    /// Path between the host and the last `/` (e.g. `stream`).
    pub url_pre_suffix: String,
    /// Path component after the last `/` (e.g. `1`).
    pub url_suffix: String,
    /// Opaque CSeq token, echoed back unchanged.
    pub cseq: String,
    pub content_length: Option<u32>,
    /// Client RTP port from `client_port=`, 0 when absent or malformed.
    pub client_rtp_port: u16,
    /// Always `client_rtp_port + 1` when a port was parsed.
    pub client_rtcp_port: u16,
    /// Requested transport; only determined for SETUP.
    pub transport: TransportMode,
    /// Headers as ordered (name, value) pairs.
    pub headers: Vec<(String, String)>,
}

impl RtspRequest {
    /// Parse one RTSP request from a raw receive buffer.
    ///
    /// Fails when the method is not followed by whitespace within
    /// [`MAX_TOKEN_LEN`] bytes, when the request line has no `RTSP/` token,
    /// or when there is no `CSeq:` header. A malformed `client_port` is not a
    /// failure; it leaves both client ports at 0.
    pub fn parse(raw: &[u8]) -> Result<Self> {
        let text = String::from_utf8_lossy(raw);
        if text.trim().is_empty() {
            return Err(ParseErrorKind::EmptyRequest.into());
        }

        let mut lines = text.split('\n').map(|line| line.trim_end_matches('\r'));
        let request_line = lines.next().unwrap_or_default();

        let method_end = request_line
            .char_indices()
            .take(MAX_TOKEN_LEN)
            .find(|&(_, c)| c == ' ' || c == '\t')
            .map(|(i, _)| i)
            .ok_or(ParseErrorKind::UnterminatedMethod)?;
        let method = Method::classify(&request_line[..method_end]);

        let target = request_line[method_end..].trim_start_matches([' ', '\t']);
        let url = parse_url(target)?;

        let mut cseq = None;
        let mut content_length = None;
        let mut headers = Vec::new();

        for line in lines {
            if line.is_empty() {
                break;
            }
            if cseq.is_none()
                && let Some(value) = line.strip_prefix("CSeq:")
            {
                cseq = Some(value.trim_start_matches([' ', '\t']).to_string());
            }
            if let Some(value) = line
                .strip_prefix("Content-Length:")
                .or_else(|| line.strip_prefix("Content-length:"))
            {
                content_length = leading_digits(value.trim_start_matches([' ', '\t']));
            }
            if let Some((name, value)) = line.split_once(':') {
                headers.push((name.trim().to_string(), value.trim().to_string()));
            }
        }

        let cseq = cseq.ok_or(ParseErrorKind::MissingCSeq)?;
        let (client_rtp_port, client_rtcp_port) = parse_client_port(&text).unwrap_or((0, 0));

        let transport = match method {
            Method::Setup if text.contains("RTP/AVP/TCP") => TransportMode::TcpInterleaved,
            Method::Setup => TransportMode::Udp,
            _ => TransportMode::Undetermined,
        };

        Ok(RtspRequest {
            method,
            url: url.full,
            host_port: url.host_port,
            url_pre_suffix: url.pre_suffix,
            url_suffix: url.suffix,
            cseq,
            content_length,
            client_rtp_port,
            client_rtcp_port,
            transport,
            headers,
        })
    }

    /// Look up a header value by name (case-insensitive).
    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

struct ParsedUrl {
    full: String,
    host_port: String,
    pre_suffix: String,
    suffix: String,
}

/// Split `rtsp://host:port/pre/suffix RTSP/1.0` into its parts.
///
/// The scheme match is case-insensitive and also accepts the `rtsp:/path`
/// form without a host. Without any scheme the path starts right after the
/// method.
fn parse_url(target: &str) -> Result<ParsedUrl> {
    let lowered = target.to_ascii_lowercase();
    let (host_port, path_start) = match lowered.find("rtsp:/") {
        Some(pos) => {
            let after_scheme = pos + "rtsp:/".len();
            if target[after_scheme..].starts_with('/') {
                let host_start = after_scheme + 1;
                let host_len = target[host_start..]
                    .find(['/', ' '])
                    .unwrap_or(target.len() - host_start);
                (
                    &target[host_start..host_start + host_len],
                    host_start + host_len,
                )
            } else {
                ("", after_scheme - 1)
            }
        }
        None => ("", 0),
    };

    let tail = &target[path_start..];
    let version_pos = tail.find("RTSP/").ok_or(ParseErrorKind::MissingVersion)?;
    let path = tail[..version_pos].trim_end_matches([' ', '\t']);

    let (pre_suffix, suffix) = match path.rfind('/') {
        Some(slash) => (path[..slash].trim_start_matches('/'), &path[slash + 1..]),
        None => ("", path),
    };

    Ok(ParsedUrl {
        full: target[..path_start + path.len()].to_string(),
        host_port: host_port.to_string(),
        pre_suffix: pre_suffix.to_string(),
        suffix: suffix.to_string(),
    })
}

/// Extract `client_port=<low>-...` anywhere in the request.
///
/// Only the low port is read; RTCP is always `low + 1`.
fn parse_client_port(text: &str) -> Option<(u16, u16)> {
    let start = text.find("client_port=")? + "client_port=".len();
    let value = &text[start..];
    let value = &value[..value.find(['\r', '\n']).unwrap_or(value.len())];
    let (low, _) = value.split_once('-')?;
    let rtp = leading_digits(low.trim_start())?;
    let rtp = u16::try_from(rtp).ok()?;
    Some((rtp, rtp.wrapping_add(1)))
}

fn leading_digits(s: &str) -> Option<u32> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    s[..end].parse().ok()
}
