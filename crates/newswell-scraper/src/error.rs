use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("rate limited at {url} (retry after {retry_after_secs}s)")]
    RateLimited { url: String, retry_after_secs: u64 },

    /// Hard block (HTTP 403). Never retried; the caller trips the run-level
    /// circuit breaker after a streak of these.
    #[error("blocked (403) at {url}")]
    Blocked { url: String },

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid JSONP wrapper in response from {url}")]
    Jsonp { url: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("render service error {status}: {message}")]
    Render { status: u16, message: String },

    #[error("request pool closed")]
    PoolClosed,
}

impl ScrapeError {
    #[must_use]
    pub fn is_blocked(&self) -> bool {
        matches!(self, ScrapeError::Blocked { .. })
    }
}
