use thiserror::Error;

/// Any failure to obtain the remote price table.
///
/// Every variant means the same thing to the sync layer: the feed is
/// unavailable right now and the cached prices keep being served.
#[derive(Error, Debug)]
pub enum FeedError {
    #[error("Feed request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(#[source] reqwest::Error),

    #[error("Feed not found: {0}")]
    NotFound(String),

    #[error("Rate limited by feed host")]
    RateLimited,

    #[error("Feed server error: {0}")]
    ServerError(String),

    #[error("Unexpected feed response: {0}")]
    InvalidResponse(String),

    #[error("Malformed feed payload: {0}")]
    Malformed(String),
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl FeedError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: reqwest::StatusCode, body: &str) -> Self {
        let truncated = Self::truncate_body(body);
        match status.as_u16() {
            404 => FeedError::NotFound(truncated),
            429 => FeedError::RateLimited,
            500..=599 => FeedError::ServerError(truncated),
            _ => FeedError::InvalidResponse(format!("Status {}: {}", status, truncated)),
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Timeout
        } else if err.is_decode() {
            FeedError::Malformed(err.to_string())
        } else {
            FeedError::Network(err)
        }
    }
}
