use thiserror::Error;

/// Application-wide error types for jobscan.
#[derive(Error, Debug)]
pub enum AppError {
    /// The scraping proxy answered with a non-success status.
    #[error("Proxy returned HTTP {status} for {url}")]
    UpstreamStatus { status: u16, url: String },

    /// HTTP client setup or body read failed.
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request or harvest timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// A built-in selector rule failed to compile.
    #[error("Extractor error: {0}")]
    ExtractorError(String),

    /// Caller input was rejected (missing query fields, malformed body).
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Database operation failed.
    #[error("Database error: {0}")]
    DatabaseError(String),

    /// Missing or invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// HTTP status code reported by the proxy, if any.
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            AppError::UpstreamStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
