//! SDP (Session Description Protocol) body for DESCRIBE (RFC 4566).
//!
//! The description is fixed apart from the origin id, the host and the
//! frame rate:
//!
//! ```text
//! v=0
//! o=- <rand> 1 IN IP4 <host>
//! s=<session-name>
//! i=RTSP-server
//! t=0 0
//! a=type:broadcast
//! a=range:npt=now-
//! m=video 0 RTP/AVP 96
//! c=IN IP4 0.0.0.0
//! a=rtpmap:96 H264/90000
//! a=fmtp:96 level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e033
//! a=framerate:60.000000
//! ```

use crate::media::rtp::PAYLOAD_TYPE;

/// Default `s=` line contents.
pub const DEFAULT_SESSION_NAME: &str = "Session streamed with rtsp-live";

/// H.264 Constrained Baseline, level 5.1.
const FMTP: &str = "level-asymmetry-allowed=1;packetization-mode=1;profile-level-id=42e033";

/// Fields that vary between DESCRIBE responses.
#[derive(Debug, Clone)]
pub struct SessionDescription<'a> {
    /// Origin session id (`o=- <id> ...`).
    pub origin_id: u32,
    /// Address written into the origin line.
    pub host: &'a str,
    pub session_name: &'a str,
    pub framerate: f64,
}

impl SessionDescription<'_> {
    /// Render the description with CRLF line endings.
    pub fn render(&self) -> String {
        let lines = [
            "v=0".to_string(),
            format!("o=- {} 1 IN IP4 {}", self.origin_id, self.host),
            format!("s={}", self.session_name),
            "i=RTSP-server".to_string(),
            "t=0 0".to_string(),
            "a=type:broadcast".to_string(),
            "a=range:npt=now-".to_string(),
            format!("m=video 0 RTP/AVP {}", PAYLOAD_TYPE),
            "c=IN IP4 0.0.0.0".to_string(),
            format!("a=rtpmap:{} H264/90000", PAYLOAD_TYPE),
            format!("a=fmtp:{} {}", PAYLOAD_TYPE, FMTP),
            format!("a=framerate:{:.6}", self.framerate),
        ];

        let mut sdp = String::new();
        for line in &lines {
            sdp.push_str(line);
            sdp.push_str("\r\n");
        }
        sdp
    }
}

/// Host part of a `host[:port]` string, without the port.
pub fn strip_port(host_port: &str) -> &str {
    host_port
        .split_once(':')
        .map_or(host_port, |(host, _)| host)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn describe(host: &str) -> String {
        SessionDescription {
            origin_id: 1804289383,
            host,
            session_name: DEFAULT_SESSION_NAME,
            framerate: 60.0,
        }
        .render()
    }

    #[test]
    fn renders_fixed_h264_description() {
        let sdp = describe("192.168.1.100");
        assert!(sdp.starts_with("v=0\r\no=- 1804289383 1 IN IP4 192.168.1.100\r\n"));
        assert!(sdp.contains(&format!("s={}\r\n", DEFAULT_SESSION_NAME)));
        assert!(sdp.contains("m=video 0 RTP/AVP 96\r\n"));
        assert!(sdp.contains("a=rtpmap:96 H264/90000\r\n"));
        assert!(sdp.contains("packetization-mode=1;profile-level-id=42e033\r\n"));
        assert!(sdp.ends_with("a=framerate:60.000000\r\n"));
    }

    #[test]
    fn media_attributes_follow_media_line() {
        let sdp = describe("10.0.0.1");
        let m_idx = sdp.find("m=video").unwrap();
        let rtpmap_idx = sdp.find("a=rtpmap").unwrap();
        let fmtp_idx = sdp.find("a=fmtp").unwrap();
        assert!(sdp.find("a=type:broadcast").unwrap() < m_idx);
        assert!(m_idx < rtpmap_idx, "a=rtpmap must follow m=video");
        assert!(rtpmap_idx < fmtp_idx, "a=rtpmap must precede a=fmtp");
    }

    #[test]
    fn every_line_ends_with_crlf() {
        let sdp = describe("10.0.0.1");
        assert_eq!(sdp.matches("\r\n").count(), 12);
        assert!(!sdp.replace("\r\n", "").contains('\n'));
    }

    #[test]
    fn framerate_uses_six_decimals() {
        let sdp = SessionDescription {
            origin_id: 0,
            host: "h",
            session_name: "s",
            framerate: 29.97,
        }
        .render();
        assert!(sdp.contains("a=framerate:29.970000\r\n"));
    }

    #[test]
    fn strip_port_variants() {
        assert_eq!(strip_port("10.0.0.5:8554"), "10.0.0.5");
        assert_eq!(strip_port("camera.local"), "camera.local");
        assert_eq!(strip_port(""), "");
    }
}
