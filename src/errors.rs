use thiserror::Error;

/// A classified live-fetch failure. The fallback decision is made on the
/// classification, never on "any exception".
#[derive(Debug, Error)]
pub enum LiveFetchError {
    #[error("request timed out")]
    Timeout,
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("upstream returned HTTP {0}")]
    Status(u16),
    #[error("malformed response body: {0}")]
    Malformed(String),
}

impl From<reqwest::Error> for LiveFetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_decode() {
            Self::Malformed(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum PulseError {
    /// Missing or blank startup configuration. Fatal, no fallback.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Live fetch failed and no snapshot exists to fall back on. Distinct
    /// from a genuinely empty result set.
    #[error("no data available: live fetch failed ({live}) and no snapshot exists")]
    SnapshotUnavailable { live: LiveFetchError },

    /// The snapshot file exists but does not parse. Never downgraded to
    /// "no snapshot".
    #[error("snapshot file is corrupt: {0}")]
    SnapshotParse(serde_json::Error),

    #[error("snapshot file is unreadable: {0}")]
    SnapshotIo(std::io::Error),
}
