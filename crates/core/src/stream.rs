pub const DEFAULT_STREAM_NAME: &str = "stream";
pub const DEFAULT_STREAM_TRACK: &str = "1";

/// The single stream this server publishes, addressed as `/<name>/<track>`.
///
/// Only DESCRIBE checks the requested path against it; SETUP and PLAY are
/// accepted for any URL on the connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamIdentity {
    name: String,
    track: String,
}

impl StreamIdentity {
    pub fn new(name: &str, track: &str) -> Self {
        Self {
            name: name.trim_matches('/').to_string(),
            track: track.trim_matches('/').to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn track(&self) -> &str {
        &self.track
    }

    /// Exact match of the URL path parts split at the last `/`.
    pub fn matches(&self, pre_suffix: &str, suffix: &str) -> bool {
        pre_suffix == self.name && suffix == self.track
    }

    /// Path form, e.g. `/stream/1`.
    pub fn path(&self) -> String {
        format!("/{}/{}", self.name, self.track)
    }
}

impl Default for StreamIdentity {
    fn default() -> Self {
        Self::new(DEFAULT_STREAM_NAME, DEFAULT_STREAM_TRACK)
    }
}
