use thiserror::Error;

/// Application-wide error types for toolscout.
#[derive(Error, Debug)]
pub enum AppError {
    /// HTTP request failed (fetching a page).
    #[error("HTTP error: {0}")]
    HttpError(String),

    /// Network/connection error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Request timed out.
    #[error("Request timed out after {0} seconds")]
    Timeout(u64),

    /// Headless browser launch, navigation, or evaluation failed.
    #[error("Browser error: {0}")]
    BrowserError(String),

    /// A single candidate could not be extracted from a page.
    #[error("Extraction error: {0}")]
    ExtractionError(String),

    /// Invalid crawl input or configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Appending a record to the output dataset failed.
    #[error("Sink error: {0}")]
    SinkError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Generic error.
    #[error("{0}")]
    Generic(String),
}

impl AppError {
    /// Returns true if this error is transient and worth retrying.
    ///
    /// The crawl controller retries every fetch failure up to its bound;
    /// this classification is used for logging and by callers that want
    /// to fail fast.
    pub fn is_retryable(&self) -> bool {
        match self {
            AppError::NetworkError(_) | AppError::Timeout(_) | AppError::BrowserError(_) => true,
            AppError::HttpError(msg) => {
                msg.contains("HTTP 429")
                    || msg.contains("HTTP 5")
                    || msg.contains("timeout")
                    || msg.contains("connect")
                    || msg.contains("reset")
            }
            _ => false,
        }
    }
}
