use thiserror::Error;

/// Errors returned by the fetch collaborator.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("bank fetch request failed: {reason}")]
    Request { reason: String },

    #[error("bank fetch timed out")]
    Timeout,

    #[error("bank source returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("failed to decode bank source response: {reason}")]
    Decode { reason: String },

    #[error("pagination failed: {reason}")]
    Pagination { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid bank source configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else if err.is_decode() {
            FetchError::Decode {
                reason: err.to_string(),
            }
        } else {
            FetchError::Request {
                reason: err.to_string(),
            }
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Decode {
            reason: err.to_string(),
        }
    }
}

/// Errors returned by the knowledge bank cache.
#[derive(Debug, Error)]
pub enum BankError {
    /// Fetching rows failed and no earlier bank could be served instead.
    #[error("bank refresh failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("invalid bank configuration: {reason}")]
    Config { reason: String },
}

pub type BankResult<T> = Result<T, BankError>;
