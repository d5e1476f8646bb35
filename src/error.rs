use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("failed to load {url} after {attempts} attempt(s): {reason}")]
    DocumentLoad {
        url: String,
        attempts: u32,
        reason: String,
    },

    #[error("navigation mismatch: expected \"{expected}\", got \"{actual}\" after {attempts} attempt(s)")]
    NavigationMismatch {
        expected: String,
        actual: String,
        attempts: u32,
    },

    #[error("malformed structured data block #{index}: {source}")]
    StructuredDataParse {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to start rendering engine: {0}")]
    BrowserLaunch(String),

    #[error("failed to build worker pool: {0}")]
    WorkerPool(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ScrapeError {
    pub(crate) fn load(url: &str, attempts: u32, reason: impl ToString) -> Self {
        ScrapeError::DocumentLoad {
            url: url.to_string(),
            attempts,
            reason: reason.to_string(),
        }
    }
}
