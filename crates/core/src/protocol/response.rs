use chrono::{DateTime, Utc};

/// An RTSP response (RFC 2326 §7).
///
/// Serializes to the standard text format:
///
/// ```text
/// RTSP/1.0 200 OK\r\n
/// Server: rtsp-live/0.1\r\n
/// CSeq: 2\r\n
/// Date: Sat, Oct 18 2026 09:14:03 GMT\r\n
/// Content-Type: application/sdp\r\n
/// Content-Length: 281\r\n
/// \r\n
/// v=0\r\n...
/// ```
///
/// Chain [`add_header`](Self::add_header) and [`with_body`](Self::with_body),
/// then call [`serialize`](Self::serialize). `Content-Length` is computed
/// from the body in bytes.
#[must_use]
#[derive(Debug, Clone)]
pub struct RtspResponse {
    pub status_code: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// Server identification string included in every RTSP response.
pub const SERVER_AGENT: &str = concat!("rtsp-live/", env!("CARGO_PKG_VERSION"));

/// `strftime` layout of the `Date` header value.
pub const DATE_FORMAT: &str = "%a, %b %d %Y %H:%M:%S GMT";

impl RtspResponse {
    pub fn new(status_code: u16, status_text: &str) -> Self {
        RtspResponse {
            status_code,
            status_text: status_text.to_string(),
            headers: vec![("Server".to_string(), SERVER_AGENT.to_string())],
            body: None,
        }
    }

    pub fn ok() -> Self {
        Self::new(200, "OK")
    }

    /// `404 Stream Not Found`, sent when DESCRIBE names an unknown stream.
    pub fn stream_not_found() -> Self {
        Self::new(404, "Stream Not Found")
    }

    pub fn add_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    /// Append a `Date` header for the current UTC time.
    pub fn with_date(self) -> Self {
        self.with_date_at(Utc::now())
    }

    pub fn with_date_at(self, at: DateTime<Utc>) -> Self {
        let value = at.format(DATE_FORMAT).to_string();
        self.add_header("Date", &value)
    }

    pub fn with_body(mut self, body: String) -> Self {
        self.body = Some(body);
        self
    }

    pub fn get_header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Serialize to the RTSP text wire format.
    pub fn serialize(&self) -> String {
        let mut response = format!("RTSP/1.0 {} {}\r\n", self.status_code, self.status_text);

        for (name, value) in &self.headers {
            response.push_str(&format!("{}: {}\r\n", name, value));
        }

        if let Some(body) = &self.body {
            response.push_str(&format!("Content-Length: {}\r\n", body.len()));
            response.push_str("\r\n");
            response.push_str(body);
        } else {
            response.push_str("\r\n");
        }
        response
    }
}
