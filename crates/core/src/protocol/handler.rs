//! Response construction for each supported method.
//!
//! These builders only render; state transitions and transport allocation
//! happen in the session actor, which passes in whatever the response has to
//! report.

use std::net::IpAddr;

use crate::protocol::request::RtspRequest;
use crate::protocol::response::RtspResponse;
use crate::protocol::sdp::{self, SessionDescription};
use crate::server::ServerConfig;
use crate::session::transport::TransportHeader;

/// Methods listed in the OPTIONS `Public` header.
pub const PUBLIC_METHODS: &str = "OPTIONS, DESCRIBE, SETUP, TEARDOWN, PLAY, PAUSE";

fn base(cseq: &str) -> RtspResponse {
    RtspResponse::ok().add_header("CSeq", cseq).with_date()
}

pub fn options(cseq: &str) -> RtspResponse {
    base(cseq).add_header("Public", PUBLIC_METHODS)
}

/// SDP for the configured stream, or `404 Stream Not Found`.
///
/// The origin line uses the URL host without its port, falling back to
/// `server_ip` when the URL names no host.
pub fn describe(request: &RtspRequest, config: &ServerConfig, server_ip: IpAddr) -> RtspResponse {
    let stream = config.stream();
    if !stream.matches(&request.url_pre_suffix, &request.url_suffix) {
        tracing::warn!(
            pre_suffix = %request.url_pre_suffix,
            suffix = %request.url_suffix,
            expected = %stream.path(),
            "DESCRIBE for unknown stream"
        );
        return RtspResponse::stream_not_found()
            .add_header("CSeq", &request.cseq)
            .with_date();
    }

    let server_ip = server_ip.to_string();
    let host = match sdp::strip_port(&request.host_port) {
        "" => server_ip.as_str(),
        host => host,
    };
    let body = SessionDescription {
        origin_id: rand::random::<u32>() & 0x7FFF_FFFF,
        host,
        session_name: &config.sdp_session_name,
        framerate: config.framerate,
    }
    .render();

    RtspResponse::ok()
        .add_header("CSeq", &request.cseq)
        .add_header("Content-Type", "application/sdp")
        .add_header("Content-Base", &format!("{}/", request.url))
        .with_date()
        .with_body(body)
}

pub fn setup(cseq: &str, session_id: u32, transport: &TransportHeader) -> RtspResponse {
    base(cseq)
        .add_header("Transport", &transport.to_string())
        .add_header("Session", &session_id.to_string())
}

/// `next_sequence` is the sequence number the session's first packet will carry.
pub fn play(request: &RtspRequest, session_id: u32, next_sequence: u16) -> RtspResponse {
    base(&request.cseq)
        .add_header("Range", "npt=0.000-")
        .add_header("Session", &session_id.to_string())
        .add_header(
            "RTP-Info",
            &format!("url={};seq={}", request.url, next_sequence),
        )
}

pub fn pause(cseq: &str) -> RtspResponse {
    base(cseq)
}

/// GET_PARAMETER keepalive; echoes the session id.
pub fn get_parameter(cseq: &str, session_id: u32) -> RtspResponse {
    base(cseq).add_header("Session", &session_id.to_string())
}

/// Bare acknowledgement for TEARDOWN and SET_PARAMETER.
pub fn acknowledge(cseq: &str) -> RtspResponse {
    base(cseq)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    const SERVER_IP: IpAddr = IpAddr::V4(Ipv4Addr::new(10, 0, 0, 5));

    fn request(raw: &str) -> RtspRequest {
        RtspRequest::parse(raw.as_bytes()).unwrap()
    }

    #[test]
    fn options_lists_public_methods() {
        let s = options("7").serialize();
        assert!(s.starts_with("RTSP/1.0 200 OK\r\n"));
        assert!(s.contains("CSeq: 7\r\n"));
        assert!(s.contains("Public: OPTIONS, DESCRIBE, SETUP, TEARDOWN, PLAY, PAUSE\r\n"));
        assert!(s.contains("Date: "));
    }

    #[test]
    fn describe_known_stream() {
        let req = request("DESCRIBE rtsp://10.0.0.5:8554/stream/1 RTSP/1.0\r\nCSeq: 2\r\n\r\n");
        let resp = describe(&req, &ServerConfig::default(), SERVER_IP);
        assert_eq!(resp.status_code, 200);
        assert_eq!(resp.get_header("Content-Type"), Some("application/sdp"));
        assert_eq!(
            resp.get_header("Content-Base"),
            Some("rtsp://10.0.0.5:8554/stream/1/")
        );

        let s = resp.serialize();
        let (head, body) = s.split_once("\r\n\r\n").unwrap();
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert!(body.contains("IN IP4 10.0.0.5\r\n"), "origin host drops the port");
        assert!(body.contains("m=video 0 RTP/AVP 96\r\n"));
    }

    #[test]
    fn describe_without_host_uses_server_ip() {
        let req = request("DESCRIBE /stream/1 RTSP/1.0\r\nCSeq: 2\r\n\r\n");
        let body = describe(&req, &ServerConfig::default(), SERVER_IP).body.unwrap();
        assert!(body.contains("IN IP4 10.0.0.5\r\n"));
    }

    #[test]
    fn describe_unknown_stream_is_404() {
        let req = request("DESCRIBE rtsp://h/other/2 RTSP/1.0\r\nCSeq: 3\r\n\r\n");
        let resp = describe(&req, &ServerConfig::default(), SERVER_IP);
        assert_eq!(resp.status_code, 404);
        assert!(resp.body.is_none());
        let s = resp.serialize();
        assert!(s.starts_with("RTSP/1.0 404 Stream Not Found\r\nServer: "));
        assert!(s.contains("CSeq: 3\r\n"));
    }

    #[test]
    fn setup_reports_transport_and_session() {
        let resp = setup("4", 12345, &TransportHeader::Interleaved);
        assert_eq!(
            resp.get_header("Transport"),
            Some("RTP/AVP/TCP;unicast;interleaved=0-1")
        );
        assert_eq!(resp.get_header("Session"), Some("12345"));
        assert_eq!(resp.get_header("CSeq"), Some("4"));
    }

    #[test]
    fn play_headers() {
        let req = request(
            "PLAY rtsp://h:8554/stream/1 RTSP/1.0\r\nCSeq: 5\r\nSession: 12345\r\n\r\n",
        );
        let resp = play(&req, 12345, 0);
        assert_eq!(resp.get_header("Range"), Some("npt=0.000-"));
        assert_eq!(resp.get_header("Session"), Some("12345"));
        assert_eq!(
            resp.get_header("RTP-Info"),
            Some("url=rtsp://h:8554/stream/1;seq=0")
        );
    }

    #[test]
    fn keepalive_and_acknowledgements() {
        assert_eq!(get_parameter("8", 99).get_header("Session"), Some("99"));
        assert_eq!(acknowledge("9").status_code, 200);
        assert!(acknowledge("9").get_header("Session").is_none());
        assert_eq!(pause("10").get_header("CSeq"), Some("10"));
    }
}
